pub mod report;
pub mod request;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

/// Columns of a comment joined with its parent post (`c` / `p` aliases).
pub(crate) const REPORT_COLUMNS: &str = "c.id, c.text, c.label, c.likes, c.tip_social, \
     c.created, c.category_id, c.is_read, p.post_url, p.id AS post_id";

pub(crate) const COMMENTS_WITH_POST: &str = "FROM comments c LEFT JOIN posts p ON p.id = c.post_id";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i32,
    pub text: String,
    pub label: String,
    pub likes: i32,
    pub tip_social: String,
    pub category_id: i32,
    pub created: DateTime<Utc>,
    pub is_read: bool,
    pub post_id: Option<i32>,
}

/// Comment projection used by reports: the parent post contributes only its
/// public URL and id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReportRow {
    pub id: i32,
    pub text: String,
    pub label: String,
    pub likes: i32,
    pub tip_social: String,
    pub created: DateTime<Utc>,
    pub category_id: i32,
    pub is_read: bool,
    pub post_url: Option<String>,
    pub post_id: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadOutcome {
    pub success: bool,
    pub marked_count: u64,
}

impl Comment {
    pub async fn find_by_id(id: i32, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn unread_ids(pool: &PgPool) -> Result<Vec<i32>> {
        sqlx::query_scalar::<_, i32>("SELECT id FROM comments WHERE is_read = false")
            .fetch_all(pool)
            .await
            .map_err(Into::into)
    }

    /// Flag the given comments as read in one statement. Returns the number
    /// of rows the update touched.
    pub async fn mark_read(ids: &[i32], pool: &PgPool) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query("UPDATE comments SET is_read = true WHERE id = ANY($1)")
            .bind(ids)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Bulk unread→read transition. Not wrapped in a transaction: concurrent
    /// callers may each report the rows their own update matched.
    pub async fn mark_all_unread_as_read(pool: &PgPool) -> Result<MarkReadOutcome> {
        let ids = Self::unread_ids(pool).await?;
        if ids.is_empty() {
            return Ok(MarkReadOutcome {
                success: true,
                marked_count: 0,
            });
        }

        let marked_count = Self::mark_read(&ids, pool).await?;
        info!(marked_count, "comments: marked all unread as read");

        Ok(MarkReadOutcome {
            success: true,
            marked_count,
        })
    }
}

impl ReportRow {
    /// Every unread comment, newest first. Read flags are left untouched.
    pub async fn list_unread(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {REPORT_COLUMNS} {COMMENTS_WITH_POST} \
             WHERE c.is_read = false ORDER BY c.created DESC, c.id DESC"
        ))
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    /// Every unread comment, newest first, flagged read as it is handed out.
    /// The returned rows already report `is_read: true`.
    pub async fn list_unread_and_mark_read(pool: &PgPool) -> Result<Vec<Self>> {
        let mut rows = Self::list_unread(pool).await?;
        if rows.is_empty() {
            return Ok(rows);
        }

        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let marked = Comment::mark_read(&ids, pool).await?;
        info!(fetched = rows.len(), marked, "comments: unread handed out and marked read");

        for row in &mut rows {
            row.is_read = true;
        }
        Ok(rows)
    }
}
