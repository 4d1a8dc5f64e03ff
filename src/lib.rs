pub mod aggregate;
pub mod config;
pub mod email;
pub mod error;
pub mod ids;
pub mod models;
pub mod query;
pub mod routes;
pub mod state;
pub mod store;
pub mod submission;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::email::SubmissionNotifier;
use crate::ids::IdGenerator;
use crate::state::{AppState, SharedState};
use crate::store::RecordStore;

pub fn build_app(store: Arc<dyn RecordStore>, ids: Arc<dyn IdGenerator>, config: Config) -> Router {
    let notifier = match (config.smtp.as_ref(), config.notify_email.as_deref()) {
        (Some(smtp), Some(to)) => match SubmissionNotifier::new(smtp, to) {
            Ok(notifier) => {
                tracing::info!("Submission notifications enabled for {to}");
                Some(Arc::new(notifier))
            }
            Err(e) => {
                tracing::warn!("Submission notifications not available: {e}");
                None
            }
        },
        _ => None,
    };

    let max_body_size = config.max_body_size;

    let state: SharedState = Arc::new(AppState {
        store,
        ids,
        config,
        notifier,
    });

    Router::new()
        .merge(routes::api_routes())
        .merge(routes::ingest_routes())
        .route("/health", axum::routing::get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body_size))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-content-type-options"),
                    HeaderValue::from_static("nosniff"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("x-frame-options"),
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    HeaderName::from_static("referrer-policy"),
                    HeaderValue::from_static("strict-origin-when-cross-origin"),
                )),
        )
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
