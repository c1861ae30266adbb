use std::time::Duration;

use async_trait::async_trait;
use offlabel_view::{
    AnalysisBackend, AnalysisError, AnalysisRequest, BackendReply, backend_error,
    parse_backend_reply,
};
use tracing::{error, info};

pub const ANALYZE_PATH: &str = "/api/v1/analyze";

/// Analysis backend reached over HTTP.
#[derive(Clone)]
pub struct HttpAnalysisBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAnalysisBackend {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), ANALYZE_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn transport_error(context: &str, e: reqwest::Error) -> AnalysisError {
    if e.is_timeout() {
        error!("Backend request timed out while {}: {}", context, e);
    } else {
        error!("Backend request failed while {}: {}", context, e);
    }
    AnalysisError::Transport(format!("{}: {}", context, e))
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<BackendReply, AnalysisError> {
        info!(
            endpoint = %self.endpoint,
            drug = %request.prescription.drug_name,
            diagnosis = %request.patient.diagnosis,
            "Calling analysis backend"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error("sending request", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "Analysis backend returned an error");
            return Err(backend_error(status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error("reading response", e))?;

        parse_backend_reply(&body).inspect_err(|e| {
            error!("Failed to decode backend response: {}", e);
        })
    }
}
