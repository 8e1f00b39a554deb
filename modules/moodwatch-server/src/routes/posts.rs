use std::borrow::Cow;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, VARY},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use moodwatch_domains::params::parse_int;
use moodwatch_domains::{Account, CreatePost, PageMeta, Pagination, Post, UpdatePost, ValidationError};
use moodwatch_media::{ImageProxy, ProxyInput};
use serde::{Deserialize, Serialize};

use crate::enrich::{enrich, enrich_all, RequestOrigin};
use crate::error::{ApiError, Result};
use crate::state::AppState;

const DEFAULT_POSTS_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct PostsQuery {
    page: Option<String>,
    limit: Option<String>,
    #[serde(rename = "accountId")]
    account_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostsPage {
    account: Option<Account>,
    data: Vec<Post>,
    meta: PageMeta,
}

impl PostsQuery {
    fn validate(&self) -> std::result::Result<(i32, Pagination), ValidationError> {
        let account_id = match self.account_id.as_deref().map(|raw| parse_int("accountId", raw)) {
            Some(Ok(Some(id))) => id,
            Some(Err(e)) => return Err(e),
            Some(Ok(None)) | None => return Err(ValidationError::Missing("accountId")),
        };
        let account_id = i32::try_from(account_id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                ValidationError::invalid("accountId", "a positive id", account_id.to_string())
            })?;

        let page = positive_or_default("page", self.page.as_deref(), Pagination::DEFAULT_PAGE)?;
        let limit = positive_or_default("limit", self.limit.as_deref(), DEFAULT_POSTS_LIMIT)?;
        let pagination = Pagination::new(page, limit)
            .ok_or_else(|| ValidationError::invalid("limit", "at least 1", limit.to_string()))?;

        Ok((account_id, pagination))
    }
}

fn positive_or_default(
    field: &'static str,
    raw: Option<&str>,
    default: i64,
) -> std::result::Result<i64, ValidationError> {
    match raw.map(|raw| parse_int(field, raw)).transpose()?.flatten() {
        None => Ok(default),
        Some(value) if value >= 1 => Ok(value),
        Some(value) => Err(ValidationError::invalid(field, "at least 1", value.to_string())),
    }
}

pub async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<PostsQuery>,
) -> Result<Json<PostsPage>> {
    let (account_id, pagination) = params.validate()?;

    let (posts, total) = Post::find_by_account(account_id, &pagination, &state.pool).await?;
    let account = Account::find_by_id(account_id, &state.pool).await?;

    let origin = RequestOrigin::from_headers(&headers);
    let account = match account {
        Some(account) => Some(enrich(&state.media, &origin, account).await),
        None => None,
    };
    let data = enrich_all(&state.media, &origin, posts).await;

    Ok(Json(PostsPage {
        account,
        data,
        meta: pagination.meta(total),
    }))
}

pub async fn create_post(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CreatePost>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>)> {
    let Json(input) = payload?;
    let post = Post::create(&input, &state.pool).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Post>> {
    Post::find_by_id(id, &state.pool)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("post {id}")))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: std::result::Result<Json<UpdatePost>, JsonRejection>,
) -> Result<Json<Post>> {
    let Json(input) = payload?;
    Post::update(id, &input, &state.pool)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("post {id}")))
}

pub async fn delete_post(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if Post::delete(id, &state.pool).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("post {id}")))
    }
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    url: Option<String>,
}

pub async fn proxy_image(
    State(state): State<AppState>,
    Query(params): Query<ProxyQuery>,
) -> Result<Response> {
    let raw = params
        .url
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::BadRequest("url query parameter is required".to_string()))?;

    // Clients encode inline payloads once more on top of query encoding.
    // Remote URLs are fetched as received so escapes in signed queries survive.
    let decoded = urlencoding::decode(&raw)
        .map(Cow::into_owned)
        .unwrap_or_else(|_| raw.clone());

    let image = match ProxyInput::classify(&decoded) {
        ProxyInput::Inline(payload) => ImageProxy::inline(payload),
        ProxyInput::Remote(_) => state.proxy.remote(&raw).await,
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&image.content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("image/jpeg")),
    );
    if let Some(cache_control) = image.cache_control {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static(cache_control));
        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));
    }

    Ok((headers, image.body).into_response())
}
