use offlabel_view::{AnalysisResult, ViewModel};
use serde::Serialize;

/// Success body of `POST /api/analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: AnalysisResult,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: String,
    pub view: ViewModel,
}

#[derive(Debug, Serialize)]
pub struct SessionDeleted {
    pub session_id: String,
    pub deleted: bool,
}
