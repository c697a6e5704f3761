use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::store::{StoreError, SummaryStore};

use super::session::SessionSummary;

/// A forgotten point merged across a user's sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPoint {
    pub point_text: String,
    pub frequency: u32,
    /// How many distinct session summaries mention this point.
    pub session_count: usize,
}

/// The single durable learning profile per user. Recomputed idempotently on
/// every aggregation run; this is a materialized view, not an incremental
/// accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLearningInsight {
    pub user_id: String,
    pub aggregated_weak_tags: Vec<String>,
    pub aggregated_strong_tags: Vec<String>,
    pub top_focus_areas: Vec<String>,
    pub top_forgotten_points: Vec<AggregatedPoint>,
    pub total_sessions: usize,
    pub total_questions: usize,
    pub last_updated: DateTime<Utc>,
}

#[derive(Default)]
struct TagTally {
    weak: usize,
    strong: usize,
    focus: usize,
}

/// Merges every session and quiz summary for one user into a learning
/// profile. Zero summaries still produce a (zeroed) insight so the profile
/// always exists.
pub fn aggregate_insights(
    user_id: &str,
    sessions: &[SessionSummary],
    quizzes: &[SessionSummary],
    config: &EngineConfig,
) -> UserLearningInsight {
    let mut tallies: BTreeMap<&str, TagTally> = BTreeMap::new();
    let summary_count = sessions.len() + quizzes.len();

    for summary in sessions.iter().chain(quizzes.iter()) {
        for tag in &summary.weak_tags {
            tallies.entry(tag.as_str()).or_default().weak += 1;
        }
        for tag in &summary.strong_tags {
            tallies.entry(tag.as_str()).or_default().strong += 1;
        }
        for tag in &summary.recommended_focus {
            tallies.entry(tag.as_str()).or_default().focus += 1;
        }
    }

    // Small samples use an appears-anywhere rule; larger samples require
    // majority presence so one noisy session cannot permanently label a
    // topic weak.
    let threshold = if summary_count <= 2 {
        1
    } else {
        (summary_count as f64 * config.majority_ratio).ceil() as usize
    };

    let aggregated_weak_tags: Vec<String> = tallies
        .iter()
        .filter(|(_, t)| t.weak >= threshold)
        .map(|(tag, _)| tag.to_string())
        .collect();
    let aggregated_strong_tags: Vec<String> = tallies
        .iter()
        .filter(|(_, t)| t.strong >= threshold)
        .map(|(tag, _)| tag.to_string())
        .collect();

    let mut by_focus: Vec<(&str, usize)> = tallies
        .iter()
        .filter(|(_, t)| t.focus > 0)
        .map(|(tag, t)| (*tag, t.focus))
        .collect();
    by_focus.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let top_focus_areas: Vec<String> = by_focus
        .into_iter()
        .map(|(tag, _)| tag.to_string())
        .take(config.focus_limit)
        .collect();

    // Forgotten points come from session summaries only; quizzes carry none.
    let mut merged_points: BTreeMap<String, AggregatedPoint> = BTreeMap::new();
    for summary in sessions {
        for point in &summary.frequently_forgotten_points {
            let key = point.point_text.trim().to_lowercase();
            let entry = merged_points.entry(key).or_insert_with(|| AggregatedPoint {
                point_text: point.point_text.clone(),
                frequency: 0,
                session_count: 0,
            });
            entry.frequency += point.frequency;
            entry.session_count += 1;
        }
    }
    let mut top_forgotten_points: Vec<AggregatedPoint> = merged_points.into_values().collect();
    top_forgotten_points.sort_by(|a, b| {
        b.frequency
            .cmp(&a.frequency)
            .then_with(|| a.point_text.cmp(&b.point_text))
    });
    top_forgotten_points.truncate(config.insight_pattern_limit);

    let quiz_with_attempts = quizzes.iter().filter(|q| q.question_count > 0).count();
    let total_questions = sessions
        .iter()
        .chain(quizzes.iter())
        .map(|s| s.question_count)
        .sum();

    UserLearningInsight {
        user_id: user_id.to_string(),
        aggregated_weak_tags,
        aggregated_strong_tags,
        top_focus_areas,
        top_forgotten_points,
        total_sessions: sessions.len() + quiz_with_attempts,
        total_questions,
        last_updated: Utc::now(),
    }
}

/// Reads every summary for the user, recomputes the insight and upserts it.
/// An upsert rejected for the forgotten-points field degrades to writing
/// the insight without that field instead of failing the aggregation.
pub async fn refresh_user_insight(
    store: &dyn SummaryStore,
    user_id: &str,
    config: &EngineConfig,
) -> Result<UserLearningInsight> {
    let sessions = store.session_summaries(user_id).await?;
    let quizzes = store.quiz_summaries(user_id).await?;
    let insight = aggregate_insights(user_id, &sessions, &quizzes, config);

    match store.upsert_insight(&insight).await {
        Ok(()) => {
            info!(
                "Upserted learning insight for user {} over {} summaries",
                user_id,
                sessions.len() + quizzes.len()
            );
            Ok(insight)
        }
        Err(StoreError::SchemaMismatch(field)) => {
            warn!(
                "Insight write for user {} rejected on field '{}', retrying without forgotten points",
                user_id, field
            );
            let mut reduced = insight;
            reduced.top_forgotten_points.clear();
            store.upsert_insight(&reduced).await?;
            Ok(reduced)
        }
        Err(err) => Err(err.into()),
    }
}
