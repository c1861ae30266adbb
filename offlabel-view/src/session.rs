use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{AnalysisError, Result, ViewError},
    models::{AnalysisResult, AnalyzeRequest},
};

/// The form fields as last submitted by the reviewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormFields {
    pub drug_name: String,
    pub disease_name: String,
    pub description: String,
}

impl From<&AnalyzeRequest> for FormFields {
    fn from(request: &AnalyzeRequest) -> Self {
        Self {
            drug_name: request.drug_name.clone().unwrap_or_default(),
            disease_name: request.disease_name.clone().unwrap_or_default(),
            description: request.description.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState {
    #[default]
    Idle,
    Loading,
    Success(AnalysisResult),
    Error(String),
}

impl ViewState {
    pub fn name(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::Loading => "loading",
            ViewState::Success(_) => "success",
            ViewState::Error(_) => "error",
        }
    }
}

/// One reviewer's view: form, current state, and the generation token that decides
/// whether an arriving backend response is still current.
#[derive(Debug, Clone)]
pub struct ViewSession {
    pub id: String,
    pub form: FormFields,
    pub state: ViewState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    generation: u64,
}

impl ViewSession {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            form: FormFields::default(),
            state: ViewState::Idle,
            created_at: now,
            updated_at: now,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, ViewState::Loading)
    }

    /// The help footer is only shown before anything has happened.
    pub fn show_footer(&self) -> bool {
        matches!(self.state, ViewState::Idle)
    }

    /// Enters `Loading`, clearing any previous result or error, and returns the token
    /// the eventual response must present. Supersedes any submission still pending.
    pub fn begin_submission(&mut self, form: FormFields) -> u64 {
        self.generation += 1;
        self.form = form;
        self.state = ViewState::Loading;
        self.touch();
        self.generation
    }

    /// Applies a response if it belongs to the current submission. Returns `false` and
    /// leaves the session untouched when the response is stale.
    pub fn resolve(
        &mut self,
        generation: u64,
        outcome: std::result::Result<AnalysisResult, AnalysisError>,
    ) -> bool {
        if generation != self.generation || !self.is_loading() {
            return false;
        }

        self.state = match outcome {
            Ok(result) => ViewState::Success(result),
            Err(error) => ViewState::Error(error.user_message().to_string()),
        };
        self.touch();
        true
    }

    /// Back to `Idle` with empty form fields. Rejected while a submission is pending.
    pub fn reset(&mut self) -> Result<()> {
        if self.is_loading() {
            return Err(ViewError::SubmissionInProgress(self.id.clone()));
        }

        self.generation += 1;
        self.form = FormFields::default();
        self.state = ViewState::Idle;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
