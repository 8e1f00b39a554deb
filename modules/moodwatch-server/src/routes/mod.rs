pub mod accounts;
pub mod posts;
pub mod report;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::state::AppState;

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // JSON listings change constantly; the image proxy sets its own caching.
    let api = Router::new()
        .route("/accounts", get(accounts::list_accounts))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/proxy", get(posts::proxy_image))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/report", post(report::generate_report))
        .route("/report/unread", get(report::take_unread))
        .route("/report/read", get(report::peek_unread))
        .route("/report/mark-all-read", post(report::mark_all_read))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ));

    let media = ServeDir::new(state.media.root());

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .nest_service("/media", media)
        .layer(cors)
        // Logging layer: method + path only (proxy URLs may carry signed params)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use moodwatch_media::testing::StubFetcher;
    use moodwatch_media::{ImageProxy, MediaStore, PLACEHOLDER_PNG};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;

    const PNG_B64: &str =
        "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    /// Router over a pool that never connects: only paths that finish
    /// before touching the database can be exercised.
    fn app(fetcher: Arc<StubFetcher>, media_root: &std::path::Path) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://moodwatch@localhost:1/unused")
            .unwrap();
        let state = AppState {
            pool,
            media: MediaStore::new(media_root, fetcher.clone()),
            proxy: ImageProxy::new(fetcher),
        };
        build_router(state, &[])
    }

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(Arc::new(StubFetcher::status(500)), dir.path()), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn posts_require_account_id() {
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(Arc::new(StubFetcher::status(500)), dir.path()), "/posts?page=1").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["message"], "accountId is required");
    }

    #[tokio::test]
    async fn posts_reject_malformed_paging() {
        let dir = tempfile::tempdir().unwrap();
        for uri in [
            "/posts?accountId=abc",
            "/posts?accountId=1&page=two",
            "/posts?accountId=1&limit=0",
            "/posts?accountId=-4",
        ] {
            let response = get(app(Arc::new(StubFetcher::status(500)), dir.path()), uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }
    }

    #[tokio::test]
    async fn proxy_requires_url() {
        let dir = tempfile::tempdir().unwrap();
        let response = get(app(Arc::new(StubFetcher::status(500)), dir.path()), "/posts/proxy").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn proxy_serves_placeholder_when_upstream_fails() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::failing("timeout"));
        let response = get(
            app(fetcher.clone(), dir.path()),
            "/posts/proxy?url=https%3A%2F%2Fcdn.example.com%2Fa.jpg",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), PLACEHOLDER_PNG);
        assert_eq!(fetcher.requests()[0].url, "https://cdn.example.com/a.jpg");
    }

    #[tokio::test]
    async fn proxy_relays_upstream_with_day_long_cache() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::ok("image/webp", b"webp-bytes"));
        let response = get(
            app(fetcher.clone(), dir.path()),
            "/posts/proxy?url=https%3A%2F%2Fcdn.example.com%2Fb.webp",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/webp");
        assert_eq!(response.headers()["cache-control"], "public, max-age=86400");
        assert_eq!(response.headers()["vary"], "Accept-Encoding");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"webp-bytes");
        assert_eq!(fetcher.requests()[0].url, "https://cdn.example.com/b.webp");
    }

    #[tokio::test]
    async fn proxy_keeps_escapes_in_upstream_query() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::ok("image/jpeg", b"jpeg-bytes"));
        let upstream = "https://cdn.example.com/a.jpg?sig=a%2Bb%26c%3D";
        let uri = format!("/posts/proxy?url={}", urlencoding::encode(upstream));

        let response = get(app(fetcher.clone(), dir.path()), &uri).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/jpeg");
        assert_eq!(fetcher.requests()[0].url, upstream);
    }

    #[tokio::test]
    async fn proxy_decodes_inline_payload() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(StubFetcher::failing("unused"));
        let uri = format!("/posts/proxy?url={}", urlencoding::encode(&format!("data:image/png;base64,{PNG_B64}")));
        let response = get(app(fetcher.clone(), dir.path()), &uri).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");
        assert_eq!(response.headers()["cache-control"], "no-store");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), PLACEHOLDER_PNG);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn report_rejects_bad_filters_before_querying() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/report")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"sphere_id": "sport"}"#))
            .unwrap();
        let response = app(Arc::new(StubFetcher::status(500)), dir.path())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "sphere_id must be an integer, got \"sport\"");
    }

    #[tokio::test]
    async fn malformed_report_body_uses_error_shape() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/report")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"page": [1]}"#))
            .unwrap();
        let response = app(Arc::new(StubFetcher::status(500)), dir.path())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn report_rejects_fractional_page() {
        let dir = tempfile::tempdir().unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/report")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"page": 2.5}"#))
            .unwrap();
        let response = app(Arc::new(StubFetcher::status(500)), dir.path())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "page must be an integer, got \"2.5\"");
    }

    #[tokio::test]
    async fn mirrored_media_is_served_statically() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("posts")).unwrap();
        std::fs::write(dir.path().join("posts/post_1.jpg"), b"jpeg-bytes").unwrap();

        let response = get(
            app(Arc::new(StubFetcher::status(500)), dir.path()),
            "/media/posts/post_1.jpg",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(body.as_ref(), b"jpeg-bytes");
    }
}
