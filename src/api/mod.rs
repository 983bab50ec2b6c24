use std::sync::Arc;

use axum::{
    http::{HeaderName, Method, StatusCode},
    routing::{get, patch},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::store::NotificationStore;

pub mod handlers;

pub type ApiState = Arc<dyn NotificationStore>;

/// Notification routes. The caller mounts this under `/api/v1`.
pub fn api_router() -> Router<ApiState> {
    Router::new()
        .route(
            "/notifications",
            get(handlers::list_notifications)
                .post(handlers::create_notification)
                .patch(handlers::mark_all_notifications_read),
        )
        .route(
            "/notifications/unread",
            get(handlers::count_unread_notifications),
        )
        .route(
            "/notifications/:id",
            patch(handlers::mark_notification_read),
        )
        .fallback(fallback_404)
}

/// Full dev store application: health check, API, tracing and CORS.
pub fn app(store: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .nest("/api/v1", api_router())
        .with_state(store)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

async fn fallback_404() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// Browser clients of the dev store run on localhost.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin, _| {
            let origin_str = origin.to_str().unwrap_or("");
            origin_str.starts_with("http://localhost:")
                || origin_str.starts_with("http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("apikey"),
        ])
}
