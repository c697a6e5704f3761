use thiserror::Error;

/// Errors raised by the analysis engine.
///
/// Three classes with different handling: caller/validation errors are
/// surfaced immediately and never retried; transient service errors are
/// retried up to the attempt budget and then converted into a degraded
/// fallback result; aggregation data errors are recovered locally by
/// omitting the affected field from the write.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("transcript is empty or shorter than {min} characters")]
    TranscriptTooShort { min: usize },

    #[error("scoring service timed out: {0}")]
    Timeout(String),

    #[error("scoring service request failed: {0}")]
    Network(String),

    #[error("scoring service returned HTTP {status}: {body}")]
    ServiceStatus { status: u16, body: String },

    #[error("model output is not valid JSON: {0}")]
    MalformedOutput(String),

    #[error("model output failed schema validation: {0}")]
    SchemaViolation(String),

    #[error("stored summary data is malformed: {0}")]
    MalformedSummary(String),

    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    /// Transient service errors count toward the retry budget;
    /// everything else is surfaced as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AnalysisError::Timeout(_)
                | AnalysisError::Network(_)
                | AnalysisError::ServiceStatus { .. }
                | AnalysisError::MalformedOutput(_)
                | AnalysisError::SchemaViolation(_)
        )
    }
}

/// Coarse failure category carried into the fallback result's tips, so the
/// UI can tell transient infra issues from content problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    Network,
    Other,
}

impl From<&AnalysisError> for FailureKind {
    fn from(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::Timeout(_) => FailureKind::Timeout,
            AnalysisError::Network(_) | AnalysisError::ServiceStatus { .. } => {
                FailureKind::Network
            }
            _ => FailureKind::Other,
        }
    }
}
