// Report query construction. Every clause is optional and ANDed; the same
// WHERE clause drives both the page query and the total count.

use std::ops::RangeInclusive;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::{ReportRow, COMMENTS_WITH_POST, REPORT_COLUMNS};
use crate::pagination::{total_pages, Pagination};

/// Sphere id that means "every sphere".
pub const ALL_SPHERES: i64 = 999;
pub const SPHERE_IDS: RangeInclusive<i32> = 1..=18;
pub const DEFAULT_REPORT_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategorySelector {
    /// No category restriction.
    #[default]
    Any,
    /// Every sphere in [`SPHERE_IDS`]; excludes rows outside the range.
    AllInRange,
    Exact(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    Unbounded,
    From(DateTime<Utc>),
    To(DateTime<Utc>),
    Between(DateTime<Utc>, DateTime<Utc>),
}

impl DateRange {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        match (start, end) {
            (Some(start), Some(end)) => DateRange::Between(start, end),
            (Some(start), None) => DateRange::From(start),
            (None, Some(end)) => DateRange::To(end),
            (None, None) => DateRange::Unbounded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilters {
    pub moods: Vec<String>,
    pub socials: Vec<String>,
    pub category: CategorySelector,
    pub created: DateRange,
    pub pagination: Pagination,
}

impl Default for ReportFilters {
    fn default() -> Self {
        Self {
            moods: Vec::new(),
            socials: Vec::new(),
            category: CategorySelector::Any,
            created: DateRange::Unbounded,
            pagination: Pagination::or_defaults(None, None, DEFAULT_REPORT_LIMIT),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPage {
    pub data: Vec<ReportRow>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

impl ReportFilters {
    fn push_where(&self, qb: &mut QueryBuilder<'static, Postgres>) {
        qb.push(" WHERE TRUE");

        match self.moods.as_slice() {
            [] => {}
            [mood] => {
                qb.push(" AND c.label = ");
                qb.push_bind(mood.clone());
            }
            moods => {
                qb.push(" AND c.label = ANY(");
                qb.push_bind(moods.to_vec());
                qb.push(")");
            }
        }

        if !self.socials.is_empty() {
            qb.push(" AND c.tip_social = ANY(");
            qb.push_bind(self.socials.clone());
            qb.push(")");
        }

        match self.category {
            CategorySelector::Any => {}
            CategorySelector::AllInRange => {
                qb.push(" AND c.category_id = ANY(");
                qb.push_bind(SPHERE_IDS.collect::<Vec<i32>>());
                qb.push(")");
            }
            CategorySelector::Exact(id) => {
                qb.push(" AND c.category_id = ");
                qb.push_bind(id);
            }
        }

        match self.created {
            DateRange::Unbounded => {}
            DateRange::From(start) => {
                qb.push(" AND c.created >= ");
                qb.push_bind(start);
            }
            DateRange::To(end) => {
                qb.push(" AND c.created <= ");
                qb.push_bind(end);
            }
            DateRange::Between(start, end) => {
                qb.push(" AND c.created BETWEEN ");
                qb.push_bind(start);
                qb.push(" AND ");
                qb.push_bind(end);
            }
        }
    }

    pub fn count_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM comments c");
        self.push_where(&mut qb);
        qb
    }

    pub fn page_query(&self) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT {REPORT_COLUMNS} {COMMENTS_WITH_POST}"));
        self.push_where(&mut qb);
        qb.push(" ORDER BY c.created DESC, c.id DESC LIMIT ");
        qb.push_bind(self.pagination.limit());
        qb.push(" OFFSET ");
        qb.push_bind(self.pagination.offset());
        qb
    }

    /// One page of matching rows plus the pre-pagination total.
    pub async fn fetch_page(&self, pool: &PgPool) -> Result<(Vec<ReportRow>, i64)> {
        let rows = self
            .page_query()
            .build_query_as::<ReportRow>()
            .fetch_all(pool)
            .await?;

        let total = self
            .count_query()
            .build_query_scalar::<i64>()
            .fetch_one(pool)
            .await?;

        Ok((rows, total))
    }

    pub async fn run(&self, pool: &PgPool) -> Result<ReportPage> {
        let (data, total) = self.fetch_page(pool).await?;
        debug!(rows = data.len(), total, "report generated");

        Ok(ReportPage {
            data,
            total,
            page: self.pagination.page(),
            limit: self.pagination.limit(),
            total_pages: total_pages(total, self.pagination.limit()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn jan(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn no_filters_means_no_predicates() {
        let filters = ReportFilters::default();
        assert_eq!(
            filters.count_query().sql(),
            "SELECT COUNT(*) FROM comments c WHERE TRUE"
        );
    }

    #[test]
    fn single_mood_uses_equality() {
        let filters = ReportFilters {
            moods: vec!["positive".into()],
            ..Default::default()
        };
        assert!(filters.count_query().sql().ends_with("WHERE TRUE AND c.label = $1"));
    }

    #[test]
    fn several_moods_use_any() {
        let filters = ReportFilters {
            moods: vec!["positive".into(), "negative".into()],
            ..Default::default()
        };
        assert!(filters.count_query().sql().ends_with("WHERE TRUE AND c.label = ANY($1)"));
    }

    #[test]
    fn socials_use_any() {
        let filters = ReportFilters {
            socials: vec!["instagram".into()],
            ..Default::default()
        };
        assert!(filters.count_query().sql().contains("c.tip_social = ANY($1)"));
    }

    #[test]
    fn sphere_selectors() {
        let all = ReportFilters {
            category: CategorySelector::AllInRange,
            ..Default::default()
        };
        assert!(all.count_query().sql().contains("c.category_id = ANY($1)"));

        let exact = ReportFilters {
            category: CategorySelector::Exact(4),
            ..Default::default()
        };
        assert!(exact.count_query().sql().contains("c.category_id = $1"));
    }

    #[test]
    fn date_bounds() {
        let from = ReportFilters {
            created: DateRange::new(Some(jan(1)), None),
            ..Default::default()
        };
        assert!(from.count_query().sql().contains("c.created >= $1"));

        let to = ReportFilters {
            created: DateRange::new(None, Some(jan(31))),
            ..Default::default()
        };
        assert!(to.count_query().sql().contains("c.created <= $1"));

        let between = ReportFilters {
            created: DateRange::new(Some(jan(1)), Some(jan(31))),
            ..Default::default()
        };
        assert_eq!(between.created, DateRange::Between(jan(1), jan(31)));
        assert!(between
            .count_query()
            .sql()
            .contains("c.created BETWEEN $1 AND $2"));
    }

    #[test]
    fn combined_filters_number_binds_in_order() {
        let filters = ReportFilters {
            moods: vec!["positive".into()],
            socials: vec!["instagram".into(), "vk".into()],
            category: CategorySelector::Exact(3),
            created: DateRange::new(Some(jan(1)), Some(jan(31))),
            pagination: Pagination::new(2, 10).unwrap(),
        };

        let sql = filters.page_query().sql().to_string();
        assert!(sql.contains(
            "WHERE TRUE AND c.label = $1 AND c.tip_social = ANY($2) \
             AND c.category_id = $3 AND c.created BETWEEN $4 AND $5"
        ));
        assert!(sql.ends_with("ORDER BY c.created DESC, c.id DESC LIMIT $6 OFFSET $7"));
    }

    #[test]
    fn page_query_joins_parent_post() {
        let sql = ReportFilters::default().page_query().sql().to_string();
        assert!(sql.starts_with("SELECT c.id, c.text"));
        assert!(sql.contains("p.post_url, p.id AS post_id"));
        assert!(sql.contains("LEFT JOIN posts p ON p.id = c.post_id"));
    }

    #[test]
    fn default_pagination_is_first_hundred() {
        let filters = ReportFilters::default();
        assert_eq!(filters.pagination.page(), 1);
        assert_eq!(filters.pagination.limit(), 100);
        assert_eq!(filters.pagination.offset(), 0);
    }
}
