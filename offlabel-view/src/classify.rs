//! Presentation classifications derived from free-text labels and scores.
//!
//! The backend emits category labels as free text, so the text classifiers are ordered
//! rule lists evaluated top to bottom. The first rule whose patterns occur in the text
//! wins; text no rule recognises falls through to the most conservative category.

use serde::Serialize;

use crate::models::{ContraindicationCheck, EvidenceAnalysis};

/// Lower bound (inclusive) of the favorable ratio band.
pub const FAVORABLE_RATIO: f64 = 0.7;
/// Lower bound (inclusive) of the neutral ratio band.
pub const NEUTRAL_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeVariant {
    Default,
    Secondary,
    Destructive,
    Outline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IconKind {
    CheckCircle,
    AlertCircle,
    AlertTriangle,
    XCircle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicationMatchKind {
    ExactMatch,
    PartialMatch,
    NoMatch,
}

impl IndicationMatchKind {
    pub fn variant(self) -> BadgeVariant {
        match self {
            IndicationMatchKind::ExactMatch => BadgeVariant::Default,
            IndicationMatchKind::PartialMatch => BadgeVariant::Secondary,
            IndicationMatchKind::NoMatch => BadgeVariant::Destructive,
        }
    }

    pub fn icon(self) -> IconKind {
        match self {
            IndicationMatchKind::ExactMatch => IconKind::CheckCircle,
            IndicationMatchKind::PartialMatch => IconKind::AlertCircle,
            IndicationMatchKind::NoMatch => IconKind::XCircle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinalCategory {
    StandardUse,
    ReasonableOffLabel,
    NotRecommended,
}

impl FinalCategory {
    pub fn variant(self) -> BadgeVariant {
        match self {
            FinalCategory::StandardUse => BadgeVariant::Default,
            FinalCategory::ReasonableOffLabel => BadgeVariant::Secondary,
            FinalCategory::NotRecommended => BadgeVariant::Destructive,
        }
    }

    pub fn icon(self) -> IconKind {
        match self {
            FinalCategory::StandardUse => IconKind::CheckCircle,
            FinalCategory::ReasonableOffLabel => IconKind::AlertTriangle,
            FinalCategory::NotRecommended => IconKind::XCircle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RatioBand {
    Favorable,
    Neutral,
    Unfavorable,
}

impl RatioBand {
    pub fn variant(self) -> BadgeVariant {
        match self {
            RatioBand::Favorable => BadgeVariant::Default,
            RatioBand::Neutral => BadgeVariant::Secondary,
            RatioBand::Unfavorable => BadgeVariant::Destructive,
        }
    }
}

/// One step of a classification cascade: matches when the text contains any pattern.
struct Rule<T> {
    any_of: &'static [&'static str],
    category: T,
}

impl<T: Copy> Rule<T> {
    fn matches(&self, text: &str) -> bool {
        self.any_of.iter().any(|pattern| text.contains(pattern))
    }
}

fn cascade<T: Copy>(text: &str, rules: &[Rule<T>], fallback: T) -> T {
    rules
        .iter()
        .find(|rule| rule.matches(text))
        .map(|rule| rule.category)
        .unwrap_or(fallback)
}

const INDICATION_MATCH_RULES: &[Rule<IndicationMatchKind>] = &[
    Rule {
        any_of: &["完全匹配", "精确匹配"],
        category: IndicationMatchKind::ExactMatch,
    },
    Rule {
        any_of: &["部分匹配"],
        category: IndicationMatchKind::PartialMatch,
    },
];

const FINAL_CATEGORY_RULES: &[Rule<FinalCategory>] = &[
    Rule {
        any_of: &["标准用药", "符合说明书"],
        category: FinalCategory::StandardUse,
    },
    Rule {
        any_of: &["合理超说明书", "可考虑"],
        category: FinalCategory::ReasonableOffLabel,
    },
];

/// Classifies `indication_match.result`.
pub fn classify_indication_match(result: &str) -> IndicationMatchKind {
    cascade(result, INDICATION_MATCH_RULES, IndicationMatchKind::NoMatch)
}

/// Classifies `final_judgment.category`.
pub fn classify_final_category(category: &str) -> FinalCategory {
    cascade(category, FINAL_CATEGORY_RULES, FinalCategory::NotRecommended)
}

/// Bands a benefit/risk ratio. NaN fails both comparisons and lands in `Unfavorable`.
pub fn classify_ratio(ratio: f64) -> RatioBand {
    if ratio >= FAVORABLE_RATIO {
        RatioBand::Favorable
    } else if ratio >= NEUTRAL_RATIO {
        RatioBand::Neutral
    } else {
        RatioBand::Unfavorable
    }
}

/// Number of evidence sources present. The drug label is mandatory and always counts.
pub fn evidence_count(evidence: &EvidenceAnalysis) -> u8 {
    let optional_present = [
        evidence.clinical_guidelines.is_some(),
        evidence.expert_consensus.is_some(),
    ]
    .into_iter()
    .filter(|present| *present)
    .count() as u8;

    1 + optional_present
}

pub fn evidence_count_label(count: u8) -> String {
    format!("{}项证据", count)
}

pub fn contraindication_status(
    check: &ContraindicationCheck,
) -> (IconKind, BadgeVariant, &'static str) {
    if check.has_contraindications {
        (IconKind::XCircle, BadgeVariant::Destructive, "存在禁忌")
    } else {
        (IconKind::CheckCircle, BadgeVariant::Default, "无禁忌")
    }
}

/// Sub-disease badge; anything other than `primary` is shown as secondary.
pub fn sub_disease_badge(kind: &str) -> (BadgeVariant, &'static str) {
    if kind == "primary" {
        (BadgeVariant::Default, "原发")
    } else {
        (BadgeVariant::Secondary, "继发")
    }
}
