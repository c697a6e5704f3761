//! Persistence seam for session summaries and user learning insights.
//!
//! The engine is storage-agnostic: callers hand it anything implementing
//! [`SummaryStore`]. [`InMemorySummaryStore`] backs tests and embedded use.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

use serde::{Deserialize, Serialize};

use crate::aggregate::{SessionSummary, UserLearningInsight};
use crate::metrics::Metrics;
use crate::mining::AnswerRecord;
use crate::scoring::AnalysisResult;

/// One answered item as persisted for a session, in answer order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    pub question_id: String,
    pub question_tags: Vec<String>,
    pub transcript: String,
    pub metrics: Metrics,
    pub analysis: AnalysisResult,
}

impl SessionItem {
    /// The slice of an item the session aggregator consumes.
    pub fn to_answer_record(&self) -> AnswerRecord {
        AnswerRecord {
            question_id: self.question_id.clone(),
            tags: self.question_tags.clone(),
            analysis: self.analysis.clone(),
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store schema does not accept field: {0}")]
    SchemaMismatch(String),
    #[error("Store query failed: {0}")]
    QueryFailed(String),
}

/// Backing storage for session items, per-user summaries and the
/// materialized insight.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Ordered answered items for one session.
    async fn session_items(&self, session_id: &str) -> Result<Vec<SessionItem>, StoreError>;
    async fn session_summaries(&self, user_id: &str) -> Result<Vec<SessionSummary>, StoreError>;
    async fn quiz_summaries(&self, user_id: &str) -> Result<Vec<SessionSummary>, StoreError>;
    async fn upsert_insight(&self, insight: &UserLearningInsight) -> Result<(), StoreError>;
}

#[derive(Default)]
struct StoreState {
    items: HashMap<String, Vec<SessionItem>>,
    sessions: HashMap<String, Vec<SessionSummary>>,
    quizzes: HashMap<String, Vec<SessionSummary>>,
    insights: HashMap<String, UserLearningInsight>,
}

/// Hash-map backed store. One insight row per user, last write wins.
#[derive(Default)]
pub struct InMemorySummaryStore {
    state: Mutex<StoreState>,
}

impl InMemorySummaryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_item(&self, session_id: &str, item: SessionItem) {
        self.state
            .lock()
            .items
            .entry(session_id.to_string())
            .or_default()
            .push(item);
    }

    pub fn push_session(&self, user_id: &str, summary: SessionSummary) {
        self.state
            .lock()
            .sessions
            .entry(user_id.to_string())
            .or_default()
            .push(summary);
    }

    pub fn push_quiz(&self, user_id: &str, summary: SessionSummary) {
        self.state
            .lock()
            .quizzes
            .entry(user_id.to_string())
            .or_default()
            .push(summary);
    }

    pub fn insight(&self, user_id: &str) -> Option<UserLearningInsight> {
        self.state.lock().insights.get(user_id).cloned()
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    async fn session_items(&self, session_id: &str) -> Result<Vec<SessionItem>, StoreError> {
        Ok(self
            .state
            .lock()
            .items
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn session_summaries(&self, user_id: &str) -> Result<Vec<SessionSummary>, StoreError> {
        Ok(self
            .state
            .lock()
            .sessions
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn quiz_summaries(&self, user_id: &str) -> Result<Vec<SessionSummary>, StoreError> {
        Ok(self
            .state
            .lock()
            .quizzes
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_insight(&self, insight: &UserLearningInsight) -> Result<(), StoreError> {
        self.state
            .lock()
            .insights
            .insert(insight.user_id.clone(), insight.clone());
        Ok(())
    }
}
