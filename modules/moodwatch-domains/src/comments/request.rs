use serde::Deserialize;

use super::report::{CategorySelector, DateRange, ReportFilters, ALL_SPHERES, DEFAULT_REPORT_LIMIT};
use crate::error::ValidationError;
use crate::pagination::Pagination;
use crate::params::{parse_timestamp, IntParam};

/// Report filters as the dashboard sends them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    pub moods: Option<Vec<String>>,
    pub tip_social: Option<Vec<String>>,
    pub sphere_id: Option<IntParam>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<IntParam>,
    pub limit: Option<IntParam>,
}

impl ReportRequest {
    pub fn into_filters(self) -> Result<ReportFilters, ValidationError> {
        let category = match &self.sphere_id {
            Some(param) => category_from(param)?,
            None => CategorySelector::Any,
        };

        let start = match self.start_date.as_deref() {
            Some(raw) => parse_timestamp("start_date", raw)?,
            None => None,
        };
        let end = match self.end_date.as_deref() {
            Some(raw) => parse_timestamp("end_date", raw)?,
            None => None,
        };

        let page = optional_int(self.page.as_ref(), "page")?;
        let limit = optional_int(self.limit.as_ref(), "limit")?;

        Ok(ReportFilters {
            moods: non_blank(self.moods),
            socials: non_blank(self.tip_social),
            category,
            created: DateRange::new(start, end),
            pagination: Pagination::or_defaults(page, limit, DEFAULT_REPORT_LIMIT),
        })
    }
}

fn optional_int(param: Option<&IntParam>, field: &'static str) -> Result<Option<i64>, ValidationError> {
    match param {
        Some(param) => param.parse(field),
        None => Ok(None),
    }
}

fn category_from(param: &IntParam) -> Result<CategorySelector, ValidationError> {
    match param.parse("sphere_id")? {
        None | Some(0) => Ok(CategorySelector::Any),
        Some(ALL_SPHERES) => Ok(CategorySelector::AllInRange),
        Some(id) if id > 0 => i32::try_from(id)
            .map(CategorySelector::Exact)
            .map_err(|_| ValidationError::invalid("sphere_id", "a sphere id", id.to_string())),
        Some(id) => Err(ValidationError::invalid(
            "sphere_id",
            "a positive sphere id",
            id.to_string(),
        )),
    }
}

fn non_blank(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<ReportFilters, ValidationError> {
        serde_json::from_value::<ReportRequest>(body).unwrap().into_filters()
    }

    #[test]
    fn empty_body_is_unfiltered_first_page() {
        let filters = parse(json!({})).unwrap();
        assert_eq!(filters, ReportFilters::default());
    }

    #[test]
    fn nulls_are_treated_as_absent() {
        let filters = parse(json!({"moods": null, "sphere_id": null, "page": null})).unwrap();
        assert_eq!(filters, ReportFilters::default());
    }

    #[test]
    fn full_request() {
        let filters = parse(json!({
            "moods": ["positive"],
            "tip_social": ["instagram", " "],
            "sphere_id": "7",
            "start_date": "2024-01-01",
            "end_date": "2024-01-31",
            "page": 2,
            "limit": "10"
        }))
        .unwrap();

        assert_eq!(filters.moods, vec!["positive"]);
        assert_eq!(filters.socials, vec!["instagram"]);
        assert_eq!(filters.category, CategorySelector::Exact(7));
        assert_eq!(
            filters.created,
            DateRange::Between(
                Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap()
            )
        );
        assert_eq!(filters.pagination, Pagination::new(2, 10).unwrap());
    }

    #[test]
    fn sentinel_sphere_selects_full_range() {
        assert_eq!(parse(json!({"sphere_id": 999})).unwrap().category, CategorySelector::AllInRange);
        assert_eq!(parse(json!({"sphere_id": "999"})).unwrap().category, CategorySelector::AllInRange);
    }

    #[test]
    fn zero_or_blank_sphere_means_no_filter() {
        assert_eq!(parse(json!({"sphere_id": 0})).unwrap().category, CategorySelector::Any);
        assert_eq!(parse(json!({"sphere_id": ""})).unwrap().category, CategorySelector::Any);
    }

    #[test]
    fn malformed_sphere_is_rejected() {
        assert!(parse(json!({"sphere_id": "sport"})).is_err());
        assert!(parse(json!({"sphere_id": -3})).is_err());
    }

    #[test]
    fn malformed_dates_and_pages_are_rejected() {
        assert!(parse(json!({"start_date": "yesterday"})).is_err());
        assert!(parse(json!({"end_date": "31/01/2024"})).is_err());
        assert!(parse(json!({"page": "second"})).is_err());
    }

    #[test]
    fn non_positive_paging_falls_back_to_defaults() {
        let filters = parse(json!({"page": 0, "limit": -5})).unwrap();
        assert_eq!(filters.pagination.page(), 1);
        assert_eq!(filters.pagination.limit(), 100);
    }

    #[test]
    fn whole_float_paging_is_accepted() {
        let filters = parse(json!({"page": 2.0, "limit": 10.0, "sphere_id": 999.0})).unwrap();
        assert_eq!(filters.pagination, Pagination::new(2, 10).unwrap());
        assert_eq!(filters.category, CategorySelector::AllInRange);
        assert!(parse(json!({"page": 1.5})).is_err());
    }

    #[test]
    fn only_end_date_is_upper_bound() {
        let filters = parse(json!({"end_date": "2024-01-31"})).unwrap();
        assert!(matches!(filters.created, DateRange::To(_)));
    }
}
