pub mod adapter;
pub mod aggregate;
pub mod assembler;
pub mod classify;
pub mod error;
pub mod models;
pub mod runner;
pub mod session;
pub mod stage;
pub mod storage;

// Re-export commonly used types
pub use adapter::{AnalysisBackend, analyze, backend_error, build_request, parse_backend_reply};
pub use aggregate::{aggregate_similarity, format_percent};
pub use assembler::{ResultView, SessionBlock, ViewModel, assemble_result, assemble_view};
pub use classify::{
    FinalCategory, IndicationMatchKind, RatioBand, classify_final_category,
    classify_indication_match, classify_ratio, evidence_count,
};
pub use error::{AnalysisError, Result, ViewError};
pub use models::{AnalysisRequest, AnalysisResult, AnalyzeRequest, BackendReply};
pub use runner::SubmissionRunner;
pub use session::{FormFields, ViewSession, ViewState};
pub use stage::{StageKind, StageView};
pub use storage::{InMemorySessionStorage, SessionStorage};
