use crate::models::SimilarityAnalysis;

/// Unweighted mean of the mechanism and clinical similarity scores. Not rounded.
pub fn aggregate_similarity(mechanism_score: f64, clinical_score: f64) -> f64 {
    (mechanism_score + clinical_score) / 2.0
}

pub fn composite_similarity(similarity: &SimilarityAnalysis) -> f64 {
    aggregate_similarity(similarity.mechanism.score, similarity.clinical.score)
}

/// Renders a [0,1] score as a whole percentage, halves rounded away from zero.
pub fn format_percent(score: f64) -> String {
    format!("{}%", (score * 100.0).round() as i64)
}
