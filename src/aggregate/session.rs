use std::collections::{BTreeMap, BTreeSet};

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::mining::{AnswerRecord, ForgottenPoint, MistakePattern, PatternMiner, TerminologyCorrection};
use crate::store::{SessionItem, SummaryStore};

use super::{mean_of_present, round_to};

/// Mean score and coverage for one tag within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagPerformance {
    pub mean_score: f64,
    pub question_count: usize,
}

/// The durable record created once per completed session or quiz.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub common_mistakes: Vec<MistakePattern>,
    pub frequently_forgotten_points: Vec<ForgottenPoint>,
    pub frequently_misused_terms: Vec<TerminologyCorrection>,
    pub weak_tags: Vec<String>,
    pub strong_tags: Vec<String>,
    pub recommended_focus: Vec<String>,
    pub performance_by_tag: BTreeMap<String, TagPerformance>,
    pub overall_score: f64,
    pub question_count: usize,
}

/// One scored quiz attempt. `score` is the attempt's 0-100 percentage;
/// unscored attempts carry `None` and are excluded from means.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub tags: Vec<String>,
    pub score: Option<f64>,
    pub question_ids: Vec<String>,
}

#[derive(Default)]
struct TagBucket {
    scores: Vec<f64>,
    question_count: usize,
}

/// Summarizes one completed session: per-tag means, the weak/strong
/// partition, the bounded focus list, the overall score, and the mined
/// pattern collections.
pub fn summarize_session(records: &[AnswerRecord], config: &EngineConfig) -> SessionSummary {
    let mut buckets: BTreeMap<String, TagBucket> = BTreeMap::new();
    let mut all_scores: Vec<f64> = Vec::new();

    for record in records {
        let item_scores: Vec<Option<f64>> = record
            .analysis
            .dimension_scores()
            .iter()
            .map(|&s| Some(f64::from(s)))
            .collect();
        let present: Vec<f64> = item_scores.iter().filter_map(|v| *v).collect();
        all_scores.extend(present.iter().copied());

        for tag in &record.tags {
            let bucket = buckets.entry(tag.clone()).or_default();
            bucket.scores.extend(present.iter().copied());
            bucket.question_count += 1;
        }
    }

    let mined = PatternMiner::new(config.session_pattern_limit).mine(records);
    let mut summary = partition_tags(buckets, config);
    summary.overall_score = mean_of_present(
        &all_scores.iter().map(|&s| Some(s)).collect::<Vec<_>>(),
    )
    .map(|m| round_to(m, 1))
    .unwrap_or(0.0);
    summary.question_count = records.len();
    summary.common_mistakes = mined.mistakes;
    summary.frequently_forgotten_points = mined.forgotten_points;
    summary.frequently_misused_terms = mined.corrections;

    info!(
        "Session summarized: {} questions, {} weak tags, {} strong tags, overall {:.1}",
        summary.question_count,
        summary.weak_tags.len(),
        summary.strong_tags.len(),
        summary.overall_score
    );
    summary
}

/// Reads one session's answered items from the store and summarizes them.
pub async fn summarize_stored_session(
    store: &dyn SummaryStore,
    session_id: &str,
    config: &EngineConfig,
) -> Result<SessionSummary> {
    let items = store.session_items(session_id).await?;
    let records: Vec<AnswerRecord> = items.iter().map(SessionItem::to_answer_record).collect();
    Ok(summarize_session(&records, config))
}

/// Summarizes a quiz over its attempts, scaling the 0-100 attempt score to
/// the 0-5 band. Quizzes produce no free-text analysis, so the mined
/// collections stay empty.
pub fn summarize_quiz(attempts: &[QuizAttempt], config: &EngineConfig) -> SessionSummary {
    let mut buckets: BTreeMap<String, TagBucket> = BTreeMap::new();
    let mut all_scores: Vec<f64> = Vec::new();
    let mut distinct_questions: BTreeSet<&str> = BTreeSet::new();

    for attempt in attempts {
        distinct_questions.extend(attempt.question_ids.iter().map(String::as_str));
        let scaled = attempt.score.map(|s| s / 20.0);
        if let Some(score) = scaled {
            all_scores.push(score);
        }
        for tag in &attempt.tags {
            let bucket = buckets.entry(tag.clone()).or_default();
            if let Some(score) = scaled {
                bucket.scores.push(score);
            }
            bucket.question_count += 1;
        }
    }

    let mut summary = partition_tags(buckets, config);
    summary.overall_score = mean_of_present(
        &all_scores.iter().map(|&s| Some(s)).collect::<Vec<_>>(),
    )
    .map(|m| round_to(m, 1))
    .unwrap_or(0.0);
    summary.question_count = distinct_questions.len();
    summary
}

/// Shared weak/strong/focus computation over per-tag score buckets.
fn partition_tags(buckets: BTreeMap<String, TagBucket>, config: &EngineConfig) -> SessionSummary {
    let mut performance_by_tag: BTreeMap<String, TagPerformance> = BTreeMap::new();
    let mut weak: Vec<(String, f64, usize)> = Vec::new();
    let mut strong: Vec<String> = Vec::new();

    for (tag, bucket) in buckets {
        let scores: Vec<Option<f64>> = bucket.scores.iter().map(|&s| Some(s)).collect();
        let mean = match mean_of_present(&scores) {
            Some(m) => m,
            None => continue,
        };
        performance_by_tag.insert(
            tag.clone(),
            TagPerformance {
                mean_score: round_to(mean, 2),
                question_count: bucket.question_count,
            },
        );
        if mean < config.weak_threshold {
            weak.push((tag, mean, bucket.question_count));
        } else if mean >= config.strong_threshold {
            strong.push(tag);
        }
    }

    // Focus goes to frequently tested weak areas first, then to the weakest
    // performance.
    let mut focus = weak.clone();
    focus.sort_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.0.cmp(&b.0))
    });

    SessionSummary {
        weak_tags: weak.into_iter().map(|(tag, _, _)| tag).collect(),
        strong_tags: strong,
        recommended_focus: focus
            .into_iter()
            .map(|(tag, _, _)| tag)
            .take(config.focus_limit)
            .collect(),
        performance_by_tag,
        ..SessionSummary::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mining::AnswerRecord;
    use crate::scoring::result::test_support::sample_result;
    use crate::scoring::AnalysisResult;

    fn uniform(score: u8) -> AnalysisResult {
        let mut analysis = sample_result();
        analysis.star_score = score;
        analysis.impact_score = score;
        analysis.clarity_score = score;
        analysis.technical_accuracy = score;
        analysis.terminology_usage = score;
        analysis
    }

    fn record(question_id: &str, tags: &[&str], score: u8) -> AnswerRecord {
        AnswerRecord {
            question_id: question_id.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            analysis: uniform(score),
        }
    }

    #[test]
    fn weak_and_strong_tags_partition_disjointly() {
        // caching sees scores [2, 2, 3] (mean 2.33), leadership [5, 4] (mean 4.5)
        let records = vec![
            record("q1", &["caching"], 2),
            record("q2", &["caching"], 2),
            record("q3", &["caching"], 3),
            record("q4", &["leadership"], 5),
            record("q5", &["leadership"], 4),
        ];
        let summary = summarize_session(&records, &EngineConfig::default());

        assert!(summary.weak_tags.contains(&"caching".to_string()));
        assert!(summary.strong_tags.contains(&"leadership".to_string()));
        assert!(!summary.strong_tags.contains(&"caching".to_string()));
        assert!(!summary.weak_tags.contains(&"leadership".to_string()));
        let caching = &summary.performance_by_tag["caching"];
        assert!((caching.mean_score - 2.33).abs() < 0.01);
        assert_eq!(caching.question_count, 3);
    }

    #[test]
    fn middle_band_tags_are_neither_weak_nor_strong() {
        let records = vec![record("q1", &["testing"], 3)];
        let summary = summarize_session(&records, &EngineConfig::default());
        assert!(summary.weak_tags.is_empty());
        assert!(summary.strong_tags.is_empty());
        assert!(summary.performance_by_tag.contains_key("testing"));
    }

    #[test]
    fn recommended_focus_prefers_frequent_then_weakest() {
        // algorithms: tested twice at mean 2.0; databases: once at 1.0;
        // networking: once at 2.0
        let records = vec![
            record("q1", &["algorithms"], 2),
            record("q2", &["algorithms"], 2),
            record("q3", &["databases"], 1),
            record("q4", &["networking"], 2),
        ];
        let summary = summarize_session(&records, &EngineConfig::default());
        assert_eq!(
            summary.recommended_focus,
            vec!["algorithms", "databases", "networking"]
        );
    }

    #[test]
    fn recommended_focus_is_capped() {
        let records: Vec<AnswerRecord> = (0..8)
            .map(|i| record(&format!("q{}", i), &[&format!("tag{}", i)], 1))
            .collect();
        let summary = summarize_session(&records, &EngineConfig::default());
        assert_eq!(summary.weak_tags.len(), 8);
        assert_eq!(summary.recommended_focus.len(), 5);
    }

    #[test]
    fn overall_score_is_mean_of_all_dimensions() {
        // 5 dims at 2 and 5 dims at 4 -> 3.0
        let records = vec![record("q1", &["a"], 2), record("q2", &["b"], 4)];
        let summary = summarize_session(&records, &EngineConfig::default());
        assert_eq!(summary.overall_score, 3.0);
        assert_eq!(summary.question_count, 2);
    }

    #[test]
    fn empty_session_produces_zeroed_summary() {
        let summary = summarize_session(&[], &EngineConfig::default());
        assert_eq!(summary.overall_score, 0.0);
        assert_eq!(summary.question_count, 0);
        assert!(summary.weak_tags.is_empty());
        assert!(summary.common_mistakes.is_empty());
    }

    #[test]
    fn session_summary_carries_mined_patterns() {
        let mut analysis = uniform(2);
        analysis.better_wording = vec!["Instead of 'server', say 'API gateway'".to_string()];
        analysis.dont_forget = vec!["Mention rate limiting".to_string()];
        let records = vec![AnswerRecord {
            question_id: "q1".to_string(),
            tags: vec!["api".to_string()],
            analysis,
        }];
        let summary = summarize_session(&records, &EngineConfig::default());
        assert_eq!(summary.frequently_misused_terms.len(), 1);
        assert_eq!(summary.frequently_forgotten_points.len(), 1);
        assert!(!summary.common_mistakes.is_empty());
    }

    #[test]
    fn quiz_scores_scale_to_the_five_band() {
        let attempts = vec![
            QuizAttempt {
                tags: vec!["sql".to_string()],
                score: Some(40.0), // scales to 2.0 -> weak
                question_ids: vec!["q1".to_string(), "q2".to_string()],
            },
            QuizAttempt {
                tags: vec!["indexing".to_string()],
                score: Some(90.0), // scales to 4.5 -> strong
                question_ids: vec!["q2".to_string(), "q3".to_string()],
            },
            QuizAttempt {
                tags: vec!["sql".to_string()],
                score: None, // unscored, excluded from means
                question_ids: vec!["q1".to_string()],
            },
        ];
        let summary = summarize_quiz(&attempts, &EngineConfig::default());
        assert_eq!(summary.weak_tags, vec!["sql"]);
        assert_eq!(summary.strong_tags, vec!["indexing"]);
        // distinct questions q1, q2, q3
        assert_eq!(summary.question_count, 3);
        assert!(summary.frequently_forgotten_points.is_empty());
        assert!((summary.performance_by_tag["sql"].mean_score - 2.0).abs() < 1e-9);
    }
}
