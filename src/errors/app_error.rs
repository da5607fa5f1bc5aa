//! Errors returned by the HTTP API.
//!
//! Every error renders as `{"success": false, "message": ..}`; call-initiation
//! failures also carry the provider detail in `error`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::telephony::TelephonyError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Request rejected before any provider was contacted.
    #[error("{0}")]
    Validation(String),

    #[error("Failed to initiate call: {0}")]
    CallInitiation(#[from] TelephonyError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::CallInitiation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(message) => json!({
                "success": false,
                "message": message,
            }),
            AppError::CallInitiation(e) => {
                error!("Call initiation failed: {e}");
                json!({
                    "success": false,
                    "message": "Failed to initiate call",
                    "error": e.to_string(),
                })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telephony::CallerService;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(TelephonyError::Network("timeout".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display() {
        let err = AppError::from(TelephonyError::NotConfigured(
            CallerService::Vonage,
            "VONAGE_APPLICATION_ID is not set".into(),
        ));
        assert_eq!(
            err.to_string(),
            "Failed to initiate call: vonage is not configured: VONAGE_APPLICATION_ID is not set"
        );
    }
}
