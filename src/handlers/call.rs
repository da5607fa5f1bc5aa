//! Session-creation API: validates the request, then asks the caller service to
//! dial out and connect the answered call to one of the stream endpoints.

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::core::llm::LLMBackend;
use crate::errors::{AppError, AppResult};
use crate::state::AppState;
use crate::telephony::{CallRequest, CallerService, Pipeline, vonage::answer_probe_ncco};
use crate::utils::validate_phone_number;

#[derive(Debug, Default, Deserialize)]
pub struct CallQuery {
    pub callerservice: Option<String>,
    pub pipeline: Option<String>,
    pub llm: Option<String>,
    #[serde(rename = "toNumber")]
    pub to_number: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub success: bool,
    pub message: String,
    pub call_id: String,
    pub callerservice: CallerService,
    pub pipeline: Pipeline,
    /// Requested backend, or `"default"` when none was given.
    pub llm: String,
}

/// Empty query values count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Validate a `/call` query without contacting any provider.
pub fn validate_call_query(query: &CallQuery) -> AppResult<(CallerService, CallRequest)> {
    let (Some(service), Some(pipeline), Some(to_number)) = (
        present(&query.callerservice),
        present(&query.pipeline),
        present(&query.to_number),
    ) else {
        return Err(AppError::Validation(
            "Missing required parameters: callerservice, pipeline, toNumber".to_string(),
        ));
    };

    let service: CallerService = service.parse().map_err(|_| {
        AppError::Validation(r#"callerservice must be either "twilio" or "vonage""#.to_string())
    })?;
    let pipeline: Pipeline = pipeline.parse().map_err(|_| {
        AppError::Validation(r#"pipeline must be either "new_custom" or "elevenlabs""#.to_string())
    })?;

    let llm = match (pipeline, present(&query.llm)) {
        (Pipeline::NewCustom, Some(llm)) => Some(LLMBackend::from_name(llm).ok_or_else(|| {
            AppError::Validation(
                r#"llm must be either "mistral" or "openai" (only for new_custom pipeline)"#
                    .to_string(),
            )
        })?),
        _ => None,
    };

    let to_number =
        validate_phone_number(to_number).map_err(|e| AppError::Validation(e.to_string()))?;

    Ok((
        service,
        CallRequest {
            to_number,
            pipeline,
            llm,
        },
    ))
}

/// `GET /call?callerservice=..&pipeline=..&llm=..&toNumber=..`
pub async fn initiate_call(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallQuery>,
) -> AppResult<Json<CallResponse>> {
    let (service, request) = validate_call_query(&query)?;
    info!(
        callerservice = %service,
        pipeline = %request.pipeline,
        llm = ?request.llm,
        "Initiating outbound call"
    );

    let initiator = state.initiator(service)?;
    let call = initiator.initiate(&request).await?;

    let label = match service {
        CallerService::Twilio => "Twilio",
        CallerService::Vonage => "Vonage",
    };
    Ok(Json(CallResponse {
        success: true,
        message: format!("{label} call initiated"),
        call_id: call.call_id,
        callerservice: service,
        pipeline: request.pipeline,
        llm: present(&query.llm).unwrap_or("default").to_string(),
    }))
}

/// `GET /vonage/answer`
pub async fn vonage_answer() -> Json<Value> {
    Json(answer_probe_ncco())
}
