use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, call};
use crate::state::AppState;
use std::sync::Arc;

/// Create the HTTP API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(api::health_check))
        .route("/call", get(call::initiate_call))
        // Answer URL probe for the Vonage application
        .route("/vonage/answer", get(call::vonage_answer))
        .layer(TraceLayer::new_for_http())
}
