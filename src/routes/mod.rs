pub mod ingest;
pub mod submissions;
pub mod websites;

use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Submissions
        .route("/api/submissions", get(submissions::list))
        .route("/api/submissions/export", get(submissions::export))
        .route(
            "/api/submissions/{website}/{id}",
            get(submissions::get).delete(submissions::delete),
        )
        // Websites
        .route("/api/websites", get(websites::list))
}

/// The public collector. Any origin may post to it.
pub fn ingest_routes() -> Router<SharedState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(86400));

    Router::new()
        .route("/api/submit", post(ingest::ingest))
        .layer(cors)
}

pub(crate) fn no_store() -> (header::HeaderName, HeaderValue) {
    (header::CACHE_CONTROL, HeaderValue::from_static("no-store"))
}
