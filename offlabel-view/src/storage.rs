use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AnalysisError, Result, ViewError},
    models::AnalysisResult,
    session::{FormFields, ViewSession},
};

/// Trait for storing view sessions. The submission methods must be atomic per session
/// so that two overlapping submissions always observe distinct generations.
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn create(&self) -> Result<ViewSession>;
    async fn get(&self, id: &str) -> Result<Option<ViewSession>>;
    async fn delete(&self, id: &str) -> Result<()>;

    /// Moves the session to `Loading` and returns the new generation token.
    async fn begin_submission(&self, id: &str, form: FormFields) -> Result<u64>;

    /// Applies the outcome if `generation` is still current. Returns whether it applied.
    async fn resolve_submission(
        &self,
        id: &str,
        generation: u64,
        outcome: std::result::Result<AnalysisResult, AnalysisError>,
    ) -> Result<bool>;

    async fn reset(&self, id: &str) -> Result<ViewSession>;

    /// Drops sessions untouched for longer than `max_idle`. Loading sessions are kept.
    /// Returns how many were removed.
    async fn evict_idle(&self, max_idle: Duration) -> Result<usize>;
}

/// In-memory implementation of SessionStorage
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, ViewSession>>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn with_session<R>(
        &self,
        id: &str,
        apply: impl FnOnce(&mut ViewSession) -> R,
    ) -> Result<R> {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| ViewError::SessionNotFound(id.to_string()))?;
        Ok(apply(entry.value_mut()))
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn create(&self) -> Result<ViewSession> {
        let session = ViewSession::new(Uuid::new_v4().to_string());
        self.sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Option<ViewSession>> {
        Ok(self.sessions.get(id).map(|entry| entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.sessions.remove(id);
        Ok(())
    }

    async fn begin_submission(&self, id: &str, form: FormFields) -> Result<u64> {
        self.with_session(id, |session| session.begin_submission(form))
    }

    async fn resolve_submission(
        &self,
        id: &str,
        generation: u64,
        outcome: std::result::Result<AnalysisResult, AnalysisError>,
    ) -> Result<bool> {
        self.with_session(id, |session| session.resolve(generation, outcome))
    }

    async fn reset(&self, id: &str) -> Result<ViewSession> {
        self.with_session(id, |session| -> Result<ViewSession> {
            session.reset()?;
            Ok(session.clone())
        })?
    }

    async fn evict_idle(&self, max_idle: Duration) -> Result<usize> {
        let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
            return Ok(0);
        };
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| session.is_loading() || session.updated_at >= cutoff);
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
