use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::FailureKind;
use crate::metrics::Metrics;

/// The schema-validated scoring payload, produced either by the external
/// model or by the deterministic fallback. Field names mirror the wire
/// format the model is instructed to emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub question_answered: bool,
    #[validate(range(min = 0, max = 5))]
    pub answer_quality: u8,
    #[validate(length(min = 2, max = 4))]
    pub what_was_right: Vec<String>,
    #[validate(length(max = 3))]
    #[serde(default)]
    pub better_wording: Vec<String>,
    #[validate(length(max = 4))]
    #[serde(default)]
    pub dont_forget: Vec<String>,
    #[validate(range(min = 0, max = 5))]
    pub star_score: u8,
    #[validate(range(min = 0, max = 5))]
    pub impact_score: u8,
    #[validate(range(min = 0, max = 5))]
    pub clarity_score: u8,
    #[validate(range(min = 0, max = 5))]
    pub technical_accuracy: u8,
    #[validate(range(min = 0, max = 5))]
    pub terminology_usage: u8,
    #[validate(length(equal = 5))]
    pub tips: Vec<String>,
}

impl AnalysisResult {
    /// The five dimensions session aggregation averages over.
    pub fn dimension_scores(&self) -> [u8; 5] {
        [
            self.star_score,
            self.impact_score,
            self.clarity_score,
            self.technical_accuracy,
            self.terminology_usage,
        ]
    }
}

/// Deterministic result used when every scoring attempt has failed. The
/// shape is indistinguishable from a model result; one tip names the
/// failure category so downstream UI can flag degraded feedback.
pub fn fallback_result(metrics: &Metrics, kind: FailureKind) -> AnalysisResult {
    let cause_tip = match kind {
        FailureKind::Timeout => {
            "Automated scoring timed out for this answer; these scores are provisional \
             defaults, not a judgement of your content."
        }
        FailureKind::Network => {
            "The scoring service could not be reached; these scores are provisional \
             defaults, not a judgement of your content."
        }
        FailureKind::Other => {
            "Automated scoring was unavailable for this answer; these scores are \
             provisional defaults."
        }
    };

    AnalysisResult {
        question_answered: metrics.word_count > 20,
        answer_quality: 2,
        what_was_right: vec![
            "You completed a full practice answer.".to_string(),
            "Your response was captured and will count toward your progress.".to_string(),
        ],
        better_wording: vec![
            "Re-run the analysis on this answer to get wording suggestions.".to_string(),
        ],
        dont_forget: vec![],
        star_score: 2,
        impact_score: 2,
        clarity_score: 2,
        technical_accuracy: 2,
        terminology_usage: 2,
        tips: vec![
            cause_tip.to_string(),
            "Structure behavioral answers with STAR: Situation, Task, Action, Result."
                .to_string(),
            "Quantify your impact with at least one concrete number.".to_string(),
            "Open with a direct answer before adding context.".to_string(),
            "Close with the result and what you learned.".to_string(),
        ],
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AnalysisResult;

    /// A minimal valid result for cache and aggregation tests.
    pub fn sample_result() -> AnalysisResult {
        AnalysisResult {
            question_answered: true,
            answer_quality: 4,
            what_was_right: vec![
                "Clear structure".to_string(),
                "Concrete metrics".to_string(),
            ],
            better_wording: vec![],
            dont_forget: vec![],
            star_score: 4,
            impact_score: 4,
            clarity_score: 4,
            technical_accuracy: 4,
            terminology_usage: 4,
            tips: vec![
                "t1".to_string(),
                "t2".to_string(),
                "t3".to_string(),
                "t4".to_string(),
                "t5".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::sample_result;
    use super::*;
    use validator::Validate;

    #[test]
    fn sample_result_passes_validation() {
        assert!(sample_result().validate().is_ok());
    }

    #[test]
    fn out_of_band_scores_fail_validation() {
        let mut result = sample_result();
        result.answer_quality = 6;
        assert!(result.validate().is_err());
    }

    #[test]
    fn tips_must_have_exactly_five_entries() {
        let mut result = sample_result();
        result.tips.pop();
        assert!(result.validate().is_err());
        result.tips.extend(["a".to_string(), "b".to_string()]);
        assert!(result.validate().is_err());
    }

    #[test]
    fn what_was_right_bounds_are_enforced() {
        let mut result = sample_result();
        result.what_was_right = vec!["only one".to_string()];
        assert!(result.validate().is_err());
        result.what_was_right = (0..5).map(|i| format!("point {}", i)).collect();
        assert!(result.validate().is_err());
    }

    #[test]
    fn fallback_is_deterministic_and_names_the_failure() {
        let metrics = Metrics {
            word_count: 25,
            ..Metrics::default()
        };
        let result = fallback_result(&metrics, FailureKind::Timeout);
        assert!(result.question_answered);
        assert_eq!(result.answer_quality, 2);
        assert_eq!(result.dimension_scores(), [2, 2, 2, 2, 2]);
        assert_eq!(result.tips.len(), 5);
        assert!(result.tips[0].contains("timed out"));
        assert!(result.validate().is_ok());

        let short = Metrics {
            word_count: 10,
            ..Metrics::default()
        };
        let result = fallback_result(&short, FailureKind::Network);
        assert!(!result.question_answered);
        assert!(result.tips[0].contains("could not be reached"));
        assert!(result.dont_forget.is_empty());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json = serde_json::to_value(sample_result()).unwrap();
        assert!(json.get("questionAnswered").is_some());
        assert!(json.get("whatWasRight").is_some());
        assert!(json.get("technicalAccuracy").is_some());
    }
}
