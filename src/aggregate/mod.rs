//! Per-session and cross-session aggregation of analysis results into
//! weak/strong topic partitions and a durable per-user learning profile.

pub mod insight;
pub mod session;

pub use insight::{aggregate_insights, refresh_user_insight, AggregatedPoint, UserLearningInsight};
pub use session::{
    summarize_quiz, summarize_session, summarize_stored_session, QuizAttempt, SessionSummary,
    TagPerformance,
};

/// Mean over the values that are present; `None` when nothing is.
/// Missing values are excluded from the mean, never treated as zero.
pub(crate) fn mean_of_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
