//! SubmissionRunner – wraps the _begin → call backend → resolve_ cycle for one view
//! session.
//!
//! Each submission takes a fresh generation token before the backend call is made and
//! presents it when the response arrives. If another submission (or a reset) happened
//! in between, the response is dropped and the newer state stays on screen. Nothing is
//! cancelled; the stale call simply runs to completion and is ignored.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    adapter::{self, AnalysisBackend},
    error::{Result, ViewError},
    models::AnalyzeRequest,
    session::{FormFields, ViewSession},
    storage::SessionStorage,
};

#[derive(Clone)]
pub struct SubmissionRunner {
    storage: Arc<dyn SessionStorage>,
    backend: Arc<dyn AnalysisBackend>,
}

impl SubmissionRunner {
    pub fn new(storage: Arc<dyn SessionStorage>, backend: Arc<dyn AnalysisBackend>) -> Self {
        Self { storage, backend }
    }

    /// Submits the form for `session_id` and returns the session as it stands once this
    /// submission's response has been applied or discarded.
    pub async fn submit(&self, session_id: &str, request: AnalyzeRequest) -> Result<ViewSession> {
        let generation = self
            .storage
            .begin_submission(session_id, FormFields::from(&request))
            .await?;

        info!(
            session_id = %session_id,
            generation,
            "Submission started"
        );

        let outcome = adapter::analyze(self.backend.as_ref(), &request)
            .await
            .map(|reply| reply.data);

        if let Err(e) = &outcome {
            warn!(
                session_id = %session_id,
                generation,
                status = e.status_code(),
                error = %e,
                "Submission failed"
            );
        }

        let applied = self
            .storage
            .resolve_submission(session_id, generation, outcome)
            .await?;

        if applied {
            info!(session_id = %session_id, generation, "Submission applied");
        } else {
            debug!(
                session_id = %session_id,
                generation,
                "Discarding stale response"
            );
        }

        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| ViewError::SessionNotFound(session_id.to_string()))
    }

    pub async fn reset(&self, session_id: &str) -> Result<ViewSession> {
        let session = self.storage.reset(session_id).await?;
        info!(session_id = %session_id, "Session reset");
        Ok(session)
    }
}
