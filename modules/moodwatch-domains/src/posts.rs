use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::pagination::Pagination;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: i32,
    pub account_id: i32,
    pub post_url: Option<String>,
    pub image_url: Option<String>,
    pub caption: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    pub account_id: i32,
    pub post_url: Option<String>,
    pub image_url: Option<String>,
    pub caption: Option<String>,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePost {
    pub post_url: Option<String>,
    pub image_url: Option<String>,
    pub caption: Option<String>,
}

impl Post {
    pub async fn find_by_id(id: i32, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM posts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    /// One page of an account's posts, newest first, plus the account's total.
    pub async fn find_by_account(
        account_id: i32,
        pagination: &Pagination,
        pool: &PgPool,
    ) -> Result<(Vec<Self>, i64)> {
        let posts = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM posts
            WHERE account_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(pool)
        .await?;

        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(pool)
            .await?;

        Ok((posts, total))
    }

    pub async fn create(input: &CreatePost, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO posts (account_id, post_url, image_url, caption)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(input.account_id)
        .bind(&input.post_url)
        .bind(&input.image_url)
        .bind(&input.caption)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn update(id: i32, input: &UpdatePost, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE posts SET
                post_url = COALESCE($2, post_url),
                image_url = COALESCE($3, image_url),
                caption = COALESCE($4, caption)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.post_url)
        .bind(&input.image_url)
        .bind(&input.caption)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Returns whether a row was deleted.
    pub async fn delete(id: i32, pool: &PgPool) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
