use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::cache::{cache_key, shared_cache, AnalysisCache};
use crate::config::EngineConfig;
use crate::error::{AnalysisError, FailureKind, Result};
use crate::metrics::Metrics;

use super::prompt::{build_system_prompt, build_user_prompt, CoachingPreferences, QuestionContext};
use super::result::{fallback_result, AnalysisResult};

/// One scoring round trip: structured prompt in, raw model text out.
/// Implemented over HTTP in production and by canned services in tests.
#[async_trait]
pub trait ModelService: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Chat-completions-compatible HTTP backend for the scoring service.
#[derive(Clone)]
pub struct HttpModelService {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl HttpModelService {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ModelService for HttpModelService {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: 1200,
            temperature: 0.2,
            stream: false,
        };

        debug!("Sending scoring request to {} with model {}", self.base_url, self.model);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            warn!("Scoring service returned HTTP {}: {}", status, body);
            return Err(AnalysisError::ServiceStatus { status, body });
        }

        let parsed: ChatResponse = response.json().await.map_err(classify_reqwest_error)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AnalysisError::MalformedOutput("no choices in model response".into()))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> AnalysisError {
    if err.is_timeout() {
        AnalysisError::Timeout(err.to_string())
    } else {
        AnalysisError::Network(err.to_string())
    }
}

/// Everything one scoring call needs, borrowed from the caller.
pub struct ScoringRequest<'a> {
    pub transcript: &'a str,
    pub question: &'a QuestionContext,
    pub metrics: &'a Metrics,
    pub preferences: &'a CoachingPreferences,
}

/// Explicit retry state machine: `Trying(n)` either succeeds, advances to
/// `Trying(n + 1)` after a backoff sleep, or exhausts the budget into
/// `Fallback`.
enum AttemptState {
    Trying(u32),
    Fallback(FailureKind),
}

/// Model-backed scoring with caching, bounded retries and graceful
/// degradation. Always returns some feedback for a valid transcript.
pub struct ScoringClient {
    service: Arc<dyn ModelService>,
    cache: Arc<dyn AnalysisCache>,
    config: EngineConfig,
}

impl ScoringClient {
    /// Uses the process-wide shared cache and default configuration.
    pub fn new(service: Arc<dyn ModelService>) -> Self {
        Self::with_cache(service, shared_cache(), EngineConfig::default())
    }

    pub fn with_cache(
        service: Arc<dyn ModelService>,
        cache: Arc<dyn AnalysisCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            service,
            cache,
            config,
        }
    }

    /// Scores one answer. Transcript validation errors surface immediately;
    /// service failures are retried and then degraded to the deterministic
    /// fallback, never propagated.
    pub async fn analyze(&self, request: &ScoringRequest<'_>) -> Result<AnalysisResult> {
        let transcript = request.transcript.trim();
        if transcript.chars().count() < self.config.min_transcript_chars {
            return Err(AnalysisError::TranscriptTooShort {
                min: self.config.min_transcript_chars,
            });
        }

        let key = cache_key(
            transcript,
            &request.question.id,
            &request.question.tags,
            request.preferences,
        );
        if let Some(hit) = self.cache.get(&key) {
            debug!("Analysis cache hit for question {}", request.question.id);
            return Ok(hit);
        }

        let system = build_system_prompt(request.preferences);
        let user = build_user_prompt(
            request.question,
            transcript,
            request.metrics,
            self.config.transcript_word_budget,
        );

        let mut state = AttemptState::Trying(1);
        loop {
            match state {
                AttemptState::Trying(attempt) => match self.attempt(&system, &user).await {
                    Ok(result) => {
                        self.cache.set(
                            &key,
                            result.clone(),
                            Duration::from_secs(self.config.cache_ttl_secs),
                        );
                        info!("Scored answer for question {}", request.question.id);
                        return Ok(result);
                    }
                    Err(err) => {
                        warn!(
                            "Scoring attempt {}/{} failed: {}",
                            attempt, self.config.retry_attempts, err
                        );
                        if attempt >= self.config.retry_attempts || !err.is_retryable() {
                            state = AttemptState::Fallback(FailureKind::from(&err));
                        } else {
                            tokio::time::sleep(Duration::from_millis(
                                self.config.retry_backoff_ms * u64::from(attempt),
                            ))
                            .await;
                            state = AttemptState::Trying(attempt + 1);
                        }
                    }
                },
                AttemptState::Fallback(kind) => {
                    info!(
                        "Scoring degraded to fallback ({:?}) for question {}",
                        kind, request.question.id
                    );
                    return Ok(fallback_result(request.metrics, kind));
                }
            }
        }
    }

    async fn attempt(&self, system: &str, user: &str) -> Result<AnalysisResult> {
        let raw = self.service.complete(system, user).await?;
        let result = parse_analysis(&raw)?;
        result
            .validate()
            .map_err(|e| AnalysisError::SchemaViolation(e.to_string()))?;
        Ok(result)
    }
}

/// Parses model output as JSON; models occasionally wrap the object in
/// prose or markdown fences, so a brace-delimited substring is tried before
/// giving up.
pub(crate) fn parse_analysis(raw: &str) -> Result<AnalysisResult> {
    match serde_json::from_str::<AnalysisResult>(raw) {
        Ok(result) => Ok(result),
        Err(first_err) => {
            if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
                if start < end {
                    if let Ok(result) = serde_json::from_str::<AnalysisResult>(&raw[start..=end]) {
                        return Ok(result);
                    }
                }
            }
            Err(AnalysisError::MalformedOutput(first_err.to_string()))
        }
    }
}
