use config::{Config, Environment};
use log::warn;
use serde::Deserialize;

/// Product-tuning knobs. The defaults mirror the shipped product behavior
/// and should not change without product sign-off.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// A tag with a mean score below this is weak.
    pub weak_threshold: f64,
    /// A tag with a mean score at or above this is strong.
    pub strong_threshold: f64,
    /// Fraction of summaries a tag must appear in to survive cross-session
    /// aggregation (only applied once there are more than two summaries).
    pub majority_ratio: f64,
    pub cache_capacity: usize,
    pub cache_evict_batch: usize,
    pub cache_ttl_secs: u64,
    /// Scoring-service attempt budget before degrading to the fallback.
    pub retry_attempts: u32,
    /// Base backoff; the sleep is this value multiplied by the attempt number.
    pub retry_backoff_ms: u64,
    /// Word budget for transcripts embedded in prompts.
    pub transcript_word_budget: usize,
    /// Minimum transcript length accepted for scoring.
    pub min_transcript_chars: usize,
    /// Cap on recommendedFocus and topFocusAreas lists.
    pub focus_limit: usize,
    /// Cap on mined pattern collections at session scope.
    pub session_pattern_limit: usize,
    /// Cap on forgotten-point lists at cross-session scope.
    pub insight_pattern_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weak_threshold: 3.0,
            strong_threshold: 4.0,
            majority_ratio: 0.5,
            cache_capacity: 1000,
            cache_evict_batch: 100,
            cache_ttl_secs: 24 * 60 * 60,
            retry_attempts: 2,
            retry_backoff_ms: 500,
            transcript_word_budget: 400,
            min_transcript_chars: 10,
            focus_limit: 5,
            session_pattern_limit: 10,
            insight_pattern_limit: 5,
        }
    }
}

impl EngineConfig {
    /// Loads overrides from `PREPSCORE_`-prefixed environment variables,
    /// falling back to the defaults when the environment is unusable.
    pub fn from_env() -> Self {
        let loaded = Config::builder()
            .add_source(Environment::with_prefix("PREPSCORE"))
            .build()
            .and_then(|c| c.try_deserialize::<EngineConfig>());

        match loaded {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("Failed to load engine config from environment, using defaults: {}", e);
                EngineConfig::default()
            }
        }
    }
}
