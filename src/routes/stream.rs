//! Telephony media-stream route configuration
//!
//! | Path                         | Leg    | Pipeline  |
//! |------------------------------|--------|-----------|
//! | `/custom-stream`             | Twilio | managed   |
//! | `/elevenlabs-stream`         | Twilio | delegated |
//! | `/vonage-custom-stream`      | Vonage | managed   |
//! | `/vonage-elevenlabs-stream`  | Vonage | delegated |

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::stream::{
    twilio_delegated_handler, twilio_managed_handler, vonage_delegated_handler,
    vonage_managed_handler,
};
use crate::state::AppState;
use crate::telephony::{
    TWILIO_DELEGATED_PATH, TWILIO_MANAGED_PATH, VONAGE_DELEGATED_PATH, VONAGE_MANAGED_PATH,
};
use std::sync::Arc;

/// Create the media-stream WebSocket router
pub fn create_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(TWILIO_MANAGED_PATH, get(twilio_managed_handler))
        .route(TWILIO_DELEGATED_PATH, get(twilio_delegated_handler))
        .route(VONAGE_MANAGED_PATH, get(vonage_managed_handler))
        .route(VONAGE_DELEGATED_PATH, get(vonage_delegated_handler))
        .layer(TraceLayer::new_for_http())
}
