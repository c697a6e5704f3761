//! Answer-performance analysis engine for interview and pitch practice.
//!
//! Pipeline for one answer: transcript (+ optional word timings) →
//! [`metrics::extract_metrics`] → [`heuristics::analyze`] delivery signals
//! alongside a model-backed content review through [`ScoringClient`], with
//! caching and a deterministic fallback when the model is unreachable.
//! Session-level rollups live in [`aggregate`] and [`mining`]; cross-session
//! learning profiles in [`aggregate::insight`] over a [`store::SummaryStore`].

pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod heuristics;
pub mod metrics;
pub mod mining;
pub mod scoring;
pub mod store;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::aggregate::{
    aggregate_insights, refresh_user_insight, summarize_quiz, summarize_session,
    summarize_stored_session, AggregatedPoint, QuizAttempt, SessionSummary, TagPerformance,
    UserLearningInsight,
};
pub use crate::cache::{shared_cache, AnalysisCache, InMemoryCache, NoopCache};
pub use crate::config::EngineConfig;
pub use crate::error::{AnalysisError, FailureKind, Result};
pub use crate::heuristics::{Domain, HeuristicScores};
pub use crate::metrics::{extract_metrics, Metrics, WordTiming};
pub use crate::mining::{AnswerRecord, MinedPatterns, PatternMiner};
pub use crate::scoring::{
    AnalysisResult, CoachingPreferences, ExperienceLevel, HttpModelService, ModelService,
    QuestionContext, ScoringClient, ScoringRequest,
};
pub use crate::store::{InMemorySummaryStore, SessionItem, StoreError, SummaryStore};

/// Everything the engine knows about one answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerAnalysis {
    pub id: Uuid,
    pub metrics: Metrics,
    pub heuristics: HeuristicScores,
    pub result: AnalysisResult,
}

/// Facade running the full per-answer pipeline: objective metrics, local
/// delivery heuristics and the model-backed content review.
pub struct AnswerAnalyzer {
    client: ScoringClient,
}

impl AnswerAnalyzer {
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self {
            client: ScoringClient::new(service),
        }
    }

    pub fn with_client(client: ScoringClient) -> Self {
        Self { client }
    }

    /// Analyzes one answer. Metrics and heuristics are computed locally and
    /// always succeed; the content review goes through the scoring client
    /// with its cache, retry and fallback behavior.
    pub async fn analyze(
        &self,
        transcript: &str,
        timings: Option<&[WordTiming]>,
        question: &QuestionContext,
        preferences: &CoachingPreferences,
    ) -> Result<AnswerAnalysis> {
        let metrics = extract_metrics(transcript, timings);
        let domain = question
            .tags
            .first()
            .map(|t| Domain::from_name(t))
            .unwrap_or_default();
        let heuristics = heuristics::analyze(transcript, &metrics, domain);

        let result = self
            .client
            .analyze(&ScoringRequest {
                transcript,
                question,
                metrics: &metrics,
                preferences,
            })
            .await?;

        Ok(AnswerAnalysis {
            id: Uuid::new_v4(),
            metrics,
            heuristics,
            result,
        })
    }
}
