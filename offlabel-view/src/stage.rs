//! View models for the four pipeline stages, each carrying the presentation states
//! derived from its stage document.

use serde::Serialize;

use crate::{
    aggregate::{composite_similarity, format_percent},
    classify::{
        BadgeVariant, FinalCategory, IconKind, IndicationMatchKind, RatioBand,
        classify_final_category, classify_indication_match, classify_ratio,
        contraindication_status, evidence_count, evidence_count_label, sub_disease_badge,
    },
    models::{
        AiAnalysis, EntityRecognition, EvidenceSource, FinalResult, IndicationAnalysis,
        MonitoringPlan, ScoredExplanation, WeightedFactor,
    },
};

const UNSPECIFIED_SPEC: &str = "未指定";

/// Pipeline stages in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    EntityRecognition,
    IndicationAnalysis,
    AiAnalysis,
    FinalResult,
}

impl StageKind {
    pub fn title(self) -> &'static str {
        match self {
            StageKind::EntityRecognition => "步骤1: 实体识别",
            StageKind::IndicationAnalysis => "步骤2: 规则判断",
            StageKind::AiAnalysis => "步骤3: AI辅助分析",
            StageKind::FinalResult => "最终判断结果",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub variant: BadgeVariant,
    pub label: String,
}

impl Badge {
    pub fn new(variant: BadgeVariant, label: impl Into<String>) -> Self {
        Self {
            variant,
            label: label.into(),
        }
    }

    fn percent(variant: BadgeVariant, score: f64) -> Self {
        Self::new(variant, format_percent(score))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageView {
    EntityRecognition(EntityRecognitionView),
    IndicationAnalysis(IndicationAnalysisView),
    AiAnalysis(AiAnalysisView),
    FinalResult(FinalResultView),
}

impl StageView {
    pub fn kind(&self) -> StageKind {
        match self {
            StageView::EntityRecognition(_) => StageKind::EntityRecognition,
            StageView::IndicationAnalysis(_) => StageKind::IndicationAnalysis,
            StageView::AiAnalysis(_) => StageKind::AiAnalysis,
            StageView::FinalResult(_) => StageKind::FinalResult,
        }
    }
}

// Stage 1

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecognitionView {
    pub title: &'static str,
    pub confidence: String,
    pub drug: DrugView,
    pub disease: DiseaseView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrugView {
    pub name: String,
    pub spec: String,
    pub categories: Vec<String>,
    pub indications: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiseaseView {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    pub sub_diseases: Vec<SubDiseaseView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubDiseaseView {
    pub name: String,
    pub badge: Badge,
}

impl EntityRecognitionView {
    pub fn render(stage: &EntityRecognition) -> Self {
        let drug = &stage.drug;
        let disease = &stage.disease;

        let sub_diseases = disease
            .sub_diseases
            .iter()
            .flatten()
            .map(|sub| {
                let (variant, label) = sub_disease_badge(&sub.kind);
                SubDiseaseView {
                    name: sub.name.clone(),
                    badge: Badge::new(variant, label),
                }
            })
            .collect();

        Self {
            title: StageKind::EntityRecognition.title(),
            confidence: format_percent(disease.confidence_score),
            drug: DrugView {
                name: drug.name.clone(),
                spec: drug
                    .spec
                    .clone()
                    .filter(|spec| !spec.is_empty())
                    .unwrap_or_else(|| UNSPECIFIED_SPEC.to_string()),
                categories: drug.categories.clone(),
                indications: drug.indications.clone(),
            },
            disease: DiseaseView {
                name: disease.name.clone(),
                severity: disease
                    .attributes
                    .as_ref()
                    .and_then(|attributes| attributes.severity.clone()),
                sub_diseases,
            },
        }
    }
}

// Stage 2

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicationAnalysisView {
    pub title: &'static str,
    pub confidence: String,
    pub classification: IndicationMatchKind,
    pub icon: IconKind,
    pub badge: Badge,
    pub matched_indications: Vec<String>,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contraindication: Option<ContraindicationView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContraindicationView {
    pub icon: IconKind,
    pub badge: Badge,
    pub matched: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl IndicationAnalysisView {
    pub fn render(stage: &IndicationAnalysis) -> Self {
        let indication = &stage.indication_match;
        let classification = classify_indication_match(&indication.result);

        let contraindication = stage.contraindication_check.as_ref().map(|check| {
            let (icon, variant, label) = contraindication_status(check);
            ContraindicationView {
                icon,
                badge: Badge::new(variant, label),
                matched: check.matched_contraindications.clone().unwrap_or_default(),
                explanation: check.explanation.clone().filter(|e| !e.is_empty()),
            }
        });

        Self {
            title: StageKind::IndicationAnalysis.title(),
            confidence: format_percent(indication.confidence),
            classification,
            icon: classification.icon(),
            badge: Badge::new(classification.variant(), indication.result.clone()),
            matched_indications: indication.matched_indications.clone(),
            explanation: indication.explanation.clone(),
            contraindication,
        }
    }
}

// Stage 3

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AiAnalysisView {
    pub title: &'static str,
    /// Mean of the two similarity scores, unrounded.
    pub composite_score: f64,
    pub composite_label: String,
    pub mechanism: ScoreView,
    pub clinical: ScoreView,
    pub evidence: EvidenceView,
    pub risk: RiskView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreView {
    pub score: String,
    pub explanation: String,
}

impl From<&ScoredExplanation> for ScoreView {
    fn from(scored: &ScoredExplanation) -> Self {
        Self {
            score: format_percent(scored.score),
            explanation: scored.explanation.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceView {
    pub count: u8,
    pub badge: Badge,
    pub sources: Vec<EvidenceSourceView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvidenceSourceView {
    pub title: &'static str,
    pub confidence: String,
    pub content: String,
}

impl EvidenceSourceView {
    fn new(title: &'static str, source: &EvidenceSource) -> Self {
        Self {
            title,
            confidence: format_percent(source.confidence),
            content: source.content.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskView {
    pub band: RatioBand,
    pub badge: Badge,
    pub benefit_factors: Vec<FactorView>,
    pub risk_factors: Vec<FactorView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorView {
    pub factor: String,
    pub score: String,
    pub evidence: String,
}

impl From<&WeightedFactor> for FactorView {
    fn from(factor: &WeightedFactor) -> Self {
        Self {
            factor: factor.factor.clone(),
            score: format_percent(factor.score),
            evidence: factor.evidence.clone(),
        }
    }
}

impl AiAnalysisView {
    pub fn render(stage: &AiAnalysis) -> Self {
        let similarity = &stage.similarity_analysis;
        let evidence = &stage.evidence_analysis;
        let risk = &stage.risk_assessment;

        let composite_score = composite_similarity(similarity);
        let count = evidence_count(evidence);

        let sources = std::iter::once(EvidenceSourceView::new("药品说明书", &evidence.drug_label))
            .chain(
                evidence
                    .clinical_guidelines
                    .as_ref()
                    .map(|source| EvidenceSourceView::new("临床指南", source)),
            )
            .chain(
                evidence
                    .expert_consensus
                    .as_ref()
                    .map(|source| EvidenceSourceView::new("专家共识", source)),
            )
            .collect();

        let band = classify_ratio(risk.benefit_risk_ratio);

        Self {
            title: StageKind::AiAnalysis.title(),
            composite_score,
            composite_label: format!("综合评分: {}", format_percent(composite_score)),
            mechanism: ScoreView::from(&similarity.mechanism),
            clinical: ScoreView::from(&similarity.clinical),
            evidence: EvidenceView {
                count,
                badge: Badge::new(BadgeVariant::Outline, evidence_count_label(count)),
                sources,
            },
            risk: RiskView {
                band,
                badge: Badge::percent(band.variant(), risk.benefit_risk_ratio),
                benefit_factors: risk.benefit_factors.iter().map(FactorView::from).collect(),
                risk_factors: risk.risk_factors.iter().map(FactorView::from).collect(),
            },
        }
    }
}

// Final stage

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinalResultView {
    pub title: &'static str,
    pub confidence: String,
    pub category: FinalCategory,
    pub icon: IconKind,
    pub badge: Badge,
    pub explanation: String,
    pub recommendation: String,
    pub summary: SummaryView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monitoring_plan: Option<MonitoringPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub indication_match: String,
    pub similarity_score: String,
    pub evidence_strength: String,
    pub benefit_risk_band: RatioBand,
    pub benefit_risk: Badge,
    pub notes: String,
}

impl FinalResultView {
    pub fn render(stage: &FinalResult) -> Self {
        let judgment = &stage.final_judgment;
        let summary = &stage.summary;
        let category = classify_final_category(&judgment.category);
        let band = classify_ratio(summary.benefit_risk_ratio);

        Self {
            title: StageKind::FinalResult.title(),
            confidence: format_percent(judgment.confidence),
            category,
            icon: category.icon(),
            badge: Badge::new(category.variant(), judgment.category.clone()),
            explanation: judgment.explanation.clone(),
            recommendation: judgment.recommendation.clone(),
            summary: SummaryView {
                indication_match: format_percent(summary.indication_match.confidence),
                similarity_score: format_percent(summary.similarity_score),
                evidence_strength: format_percent(summary.evidence_strength),
                benefit_risk_band: band,
                benefit_risk: Badge::percent(band.variant(), summary.benefit_risk_ratio),
                notes: summary.indication_match.notes.clone(),
            },
            monitoring_plan: stage.monitoring_plan.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;

    #[test]
    fn entity_recognition_defaults_missing_spec() {
        let stage = EntityRecognition {
            drug: DrugEntity {
                name: "美托洛尔".to_string(),
                spec: None,
                categories: vec!["β受体阻滞剂".to_string()],
                indications: vec!["高血压".to_string()],
            },
            disease: DiseaseEntity {
                name: "心力衰竭".to_string(),
                confidence_score: 0.92,
                attributes: Some(DiseaseAttributes {
                    severity: Some("中度".to_string()),
                }),
                sub_diseases: Some(vec![
                    SubDisease {
                        name: "慢性心力衰竭".to_string(),
                        kind: "primary".to_string(),
                    },
                    SubDisease {
                        name: "心律失常".to_string(),
                        kind: "secondary".to_string(),
                    },
                ]),
            },
        };

        let view = EntityRecognitionView::render(&stage);

        assert_eq!(view.confidence, "92%");
        assert_eq!(view.drug.spec, UNSPECIFIED_SPEC);
        assert_eq!(view.disease.severity.as_deref(), Some("中度"));
        assert_eq!(view.disease.sub_diseases[0].badge.label, "原发");
        assert_eq!(view.disease.sub_diseases[1].badge.variant, BadgeVariant::Secondary);
    }

    #[test]
    fn ai_analysis_lists_only_present_evidence() {
        let stage = AiAnalysis {
            similarity_analysis: SimilarityAnalysis {
                mechanism: ScoredExplanation {
                    score: 0.8,
                    explanation: "同属β受体阻滞剂".to_string(),
                },
                clinical: ScoredExplanation {
                    score: 0.6,
                    explanation: "临床表现相近".to_string(),
                },
            },
            evidence_analysis: EvidenceAnalysis {
                drug_label: EvidenceSource {
                    content: "说明书未收载".to_string(),
                    confidence: 0.9,
                },
                clinical_guidelines: None,
                expert_consensus: Some(EvidenceSource {
                    content: "专家共识推荐".to_string(),
                    confidence: 0.7,
                }),
            },
            risk_assessment: RiskAssessment {
                benefit_risk_ratio: 0.5,
                benefit_factors: vec![],
                risk_factors: vec![WeightedFactor {
                    factor: "低血压".to_string(),
                    score: 0.3,
                    evidence: "剂量相关".to_string(),
                }],
            },
        };

        let view = AiAnalysisView::render(&stage);

        assert_eq!(view.composite_score, 0.7);
        assert_eq!(view.composite_label, "综合评分: 70%");
        assert_eq!(view.evidence.count, 2);
        assert_eq!(view.evidence.badge.label, "2项证据");
        let titles: Vec<_> = view.evidence.sources.iter().map(|s| s.title).collect();
        assert_eq!(titles, vec!["药品说明书", "专家共识"]);
        assert_eq!(view.risk.band, RatioBand::Neutral);
        assert_eq!(view.risk.badge, Badge::new(BadgeVariant::Secondary, "50%"));
        assert_eq!(view.risk.risk_factors[0].score, "30%");
    }

    #[test]
    fn indication_view_without_contraindication_check() {
        let stage = IndicationAnalysis {
            indication_match: IndicationMatch {
                result: "部分匹配".to_string(),
                confidence: 0.65,
                matched_indications: vec!["高血压".to_string()],
                explanation: "适应症部分重叠".to_string(),
            },
            contraindication_check: None,
        };

        let view = IndicationAnalysisView::render(&stage);

        assert_eq!(view.classification, IndicationMatchKind::PartialMatch);
        assert_eq!(view.icon, IconKind::AlertCircle);
        assert_eq!(view.badge.label, "部分匹配");
        assert!(view.contraindication.is_none());
    }
}
