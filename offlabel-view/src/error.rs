use thiserror::Error;

/// User-facing message when a required field is missing.
pub const VALIDATION_MESSAGE: &str = "药品名称和疾病名称不能为空";
/// User-facing message when the backend fails without a usable `detail`.
pub const BACKEND_FAILURE_MESSAGE: &str = "后端服务请求失败";
/// User-facing message for transport and parse failures.
pub const INTERNAL_ERROR_MESSAGE: &str = "服务器内部错误";

pub const VALIDATION_STATUS: u16 = 400;
pub const INTERNAL_ERROR_STATUS: u16 = 500;

/// Outcome of a failed analysis submission. Every variant is terminal: nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    /// The caller omitted a required field. Carries the field name for logs only.
    #[error("missing required field: {0}")]
    Validation(String),

    /// The backend answered with a non-success status.
    #[error("backend responded with status {status}: {message}")]
    Backend { status: u16, message: String },

    /// The backend could not be reached or its reply could not be decoded.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl AnalysisError {
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisError::Validation(_) => VALIDATION_STATUS,
            AnalysisError::Backend { status, .. } => *status,
            AnalysisError::Transport(_) => INTERNAL_ERROR_STATUS,
        }
    }

    /// The message shown to the reviewer. Transport detail never leaks out.
    pub fn user_message(&self) -> &str {
        match self {
            AnalysisError::Validation(_) => VALIDATION_MESSAGE,
            AnalysisError::Backend { message, .. } => message,
            AnalysisError::Transport(_) => INTERNAL_ERROR_MESSAGE,
        }
    }
}

/// Failures of the view-session layer itself.
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Submission in progress for session: {0}")]
    SubmissionInProgress(String),
}

pub type Result<T> = std::result::Result<T, ViewError>;
