//! Normalizes caller requests into the backend's request schema and interprets the
//! backend's replies.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    error::{AnalysisError, BACKEND_FAILURE_MESSAGE},
    models::{
        AnalysisRequest, AnalysisResult, AnalyzeRequest, BackendEnvelope, BackendReply,
        PatientInfo, PrescriptionInfo,
    },
};

/// The external analysis service. One call per submission, never retried.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<BackendReply, AnalysisError>;
}

/// Builds the backend request, rejecting empty drug or disease names.
///
/// An empty or absent description is omitted from both `medical_history` and
/// `clinical_context` instead of being sent as `""`.
pub fn build_request(request: &AnalyzeRequest) -> Result<AnalysisRequest, AnalysisError> {
    let drug_name = required(request.drug_name.as_deref(), "drug_name")?;
    let disease_name = required(request.disease_name.as_deref(), "disease_name")?;
    let description = non_empty(request.description.as_deref());

    Ok(AnalysisRequest {
        patient: PatientInfo {
            diagnosis: disease_name,
            medical_history: description.clone(),
        },
        prescription: PrescriptionInfo { drug_name },
        clinical_context: description,
    })
}

fn required(value: Option<&str>, field: &str) -> Result<String, AnalysisError> {
    non_empty(value).ok_or_else(|| AnalysisError::Validation(field.to_string()))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Validates the caller request and performs the single backend call.
pub async fn analyze(
    backend: &dyn AnalysisBackend,
    request: &AnalyzeRequest,
) -> Result<BackendReply, AnalysisError> {
    let outbound = build_request(request)?;
    debug!(
        drug = %outbound.prescription.drug_name,
        diagnosis = %outbound.patient.diagnosis,
        has_context = outbound.clinical_context.is_some(),
        "Forwarding analysis request"
    );
    backend.analyze(&outbound).await
}

/// Interprets a non-success backend reply. A string `detail` field becomes the message;
/// anything else falls back to the generic failure message. The status is preserved.
pub fn backend_error(status: u16, body: &str) -> AnalysisError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|payload| match payload.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => Some(detail.clone()),
            _ => None,
        });

    if detail.is_none() {
        warn!(status, "Backend error without a usable detail message");
    }

    AnalysisError::Backend {
        status,
        message: detail.unwrap_or_else(|| BACKEND_FAILURE_MESSAGE.to_string()),
    }
}

/// Decodes a success reply, enveloped (`{success, data, timestamp}`) or bare.
pub fn parse_backend_reply(body: &str) -> Result<BackendReply, AnalysisError> {
    let payload: Value = serde_json::from_str(body)
        .map_err(|e| AnalysisError::Transport(format!("invalid backend JSON: {}", e)))?;

    if payload.get("data").is_some() {
        let envelope: BackendEnvelope = serde_json::from_value(payload)
            .map_err(|e| AnalysisError::Transport(format!("invalid analysis envelope: {}", e)))?;
        return Ok(BackendReply {
            data: envelope.data,
            timestamp: envelope.timestamp,
        });
    }

    let data: AnalysisResult = serde_json::from_value(payload)
        .map_err(|e| AnalysisError::Transport(format!("invalid analysis result: {}", e)))?;
    Ok(BackendReply {
        data,
        timestamp: None,
    })
}
