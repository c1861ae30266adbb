//! Composes stage view models into the ordered page view.

use serde::Serialize;

use crate::{
    models::AnalysisResult,
    session::{FormFields, ViewSession, ViewState},
    stage::{
        AiAnalysisView, EntityRecognitionView, FinalResultView, IndicationAnalysisView, StageView,
    },
};

/// Renders one stage if its document is present.
pub type StageRenderer = fn(&AnalysisResult) -> Option<StageView>;

/// Stage renderers in display order. Stages are never reordered by content.
pub const STAGE_RENDERERS: [StageRenderer; 4] = [
    render_entity_recognition,
    render_indication_analysis,
    render_ai_analysis,
    render_final_result,
];

fn render_entity_recognition(result: &AnalysisResult) -> Option<StageView> {
    result
        .entity_recognition
        .as_ref()
        .map(|stage| StageView::EntityRecognition(EntityRecognitionView::render(stage)))
}

fn render_indication_analysis(result: &AnalysisResult) -> Option<StageView> {
    result
        .indication_analysis
        .as_ref()
        .map(|stage| StageView::IndicationAnalysis(IndicationAnalysisView::render(stage)))
}

fn render_ai_analysis(result: &AnalysisResult) -> Option<StageView> {
    result
        .analysis
        .as_ref()
        .map(|stage| StageView::AiAnalysis(AiAnalysisView::render(stage)))
}

fn render_final_result(result: &AnalysisResult) -> Option<StageView> {
    result
        .final_result
        .as_ref()
        .map(|stage| StageView::FinalResult(FinalResultView::render(stage)))
}

/// Session metadata shown under the stages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionBlock {
    pub id: String,
    pub timestamp: String,
}

/// The present stages of a result plus its session block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub stages: Vec<StageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionBlock>,
}

pub fn assemble_stages(result: &AnalysisResult) -> Vec<StageView> {
    STAGE_RENDERERS
        .iter()
        .fold(Vec::with_capacity(STAGE_RENDERERS.len()), |mut stages, render| {
            stages.extend(render(result));
            stages
        })
}

pub fn session_block(result: &AnalysisResult) -> Option<SessionBlock> {
    result
        .final_result
        .as_ref()
        .and_then(|final_result| final_result.analysis_session.as_ref())
        .map(|session| SessionBlock {
            id: session.id.clone(),
            timestamp: session.timestamp.clone(),
        })
}

pub fn assemble_result(result: &AnalysisResult) -> ResultView {
    ResultView {
        stages: assemble_stages(result),
        session: session_block(result),
    }
}

/// Everything the page needs to render one reviewer's session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub session_id: String,
    pub state: &'static str,
    pub generation: u64,
    pub form: FormFields,
    pub stages: Vec<StageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionBlock>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub show_footer: bool,
}

pub fn assemble_view(session: &ViewSession) -> ViewModel {
    let (stages, block, error) = match &session.state {
        ViewState::Success(result) => (assemble_stages(result), session_block(result), None),
        ViewState::Error(message) => (Vec::new(), None, Some(message.clone())),
        ViewState::Idle | ViewState::Loading => (Vec::new(), None, None),
    };

    ViewModel {
        session_id: session.id.clone(),
        state: session.state.name(),
        generation: session.generation(),
        form: session.form.clone(),
        stages,
        session: block,
        error,
        show_footer: session.show_footer(),
    }
}
