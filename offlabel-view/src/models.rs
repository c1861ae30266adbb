//! Wire types for the caller-facing request, the backend request, and the
//! analysis result document the backend returns.

use serde::{Deserialize, Serialize};

/// Minimal request accepted from callers. Every field is optional on the wire so that
/// a missing field surfaces as a validation error rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub drug_name: Option<String>,
    #[serde(default)]
    pub disease_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(
        drug_name: impl Into<String>,
        disease_name: impl Into<String>,
        description: Option<&str>,
    ) -> Self {
        Self {
            drug_name: Some(drug_name.into()),
            disease_name: Some(disease_name.into()),
            description: description.map(str::to_string),
        }
    }
}

/// Request shape expected by the analysis backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub patient: PatientInfo,
    pub prescription: PrescriptionInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInfo {
    pub diagnosis: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionInfo {
    pub drug_name: String,
}

/// A complete or partial analysis. Presence of a stage field means that stage finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_recognition: Option<EntityRecognition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indication_analysis: Option<IndicationAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AiAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_result: Option<FinalResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecognition {
    pub drug: DrugEntity,
    pub disease: DiseaseEntity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugEntity {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub indications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseEntity {
    pub name: String,
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<DiseaseAttributes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_diseases: Option<Vec<SubDisease>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiseaseAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubDisease {
    pub name: String,
    /// `"primary"` or `"secondary"`; kept as text and classified on display.
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationAnalysis {
    pub indication_match: IndicationMatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contraindication_check: Option<ContraindicationCheck>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationMatch {
    /// Free-text label such as `完全匹配` or `部分匹配`.
    pub result: String,
    pub confidence: f64,
    #[serde(default)]
    pub matched_indications: Vec<String>,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContraindicationCheck {
    pub has_contraindications: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_contraindications: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub similarity_analysis: SimilarityAnalysis,
    pub evidence_analysis: EvidenceAnalysis,
    pub risk_assessment: RiskAssessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityAnalysis {
    pub mechanism: ScoredExplanation,
    pub clinical: ScoredExplanation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredExplanation {
    pub score: f64,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceAnalysis {
    pub drug_label: EvidenceSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clinical_guidelines: Option<EvidenceSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert_consensus: Option<EvidenceSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSource {
    pub content: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub benefit_risk_ratio: f64,
    #[serde(default)]
    pub benefit_factors: Vec<WeightedFactor>,
    #[serde(default)]
    pub risk_factors: Vec<WeightedFactor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedFactor {
    pub factor: String,
    pub score: f64,
    #[serde(default)]
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub final_judgment: FinalJudgment,
    pub summary: ResultSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_plan: Option<MonitoringPlan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_session: Option<AnalysisSession>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalJudgment {
    /// Free-text label such as `标准用药` or `合理超说明书用药`.
    pub category: String,
    pub confidence: f64,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub indication_match: SummaryIndicationMatch,
    pub similarity_score: f64,
    pub evidence_strength: f64,
    pub benefit_risk_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryIndicationMatch {
    pub confidence: f64,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringPlan {
    #[serde(default)]
    pub efficacy_indicators: Vec<String>,
    #[serde(default)]
    pub safety_monitoring: Vec<String>,
    #[serde(default)]
    pub follow_up_schedule: String,
    pub adjustment_criteria: AdjustmentCriteria,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentCriteria {
    #[serde(default)]
    pub dose_reduction: Vec<String>,
    #[serde(default)]
    pub discontinuation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSession {
    pub id: String,
    pub timestamp: String,
}

/// A successful backend reply, with the envelope timestamp when one was sent.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendReply {
    pub data: AnalysisResult,
    pub timestamp: Option<String>,
}

/// Success envelope the backend wraps results in.
#[derive(Debug, Deserialize)]
pub(crate) struct BackendEnvelope {
    pub data: AnalysisResult,
    #[serde(default)]
    pub timestamp: Option<String>,
}
