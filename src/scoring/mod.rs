//! Model-backed answer scoring: prompt construction, the external-service
//! client with caching/retry/fallback discipline, and the validated result
//! schema.

pub mod client;
pub mod prompt;
pub mod result;

pub use client::{HttpModelService, ModelService, ScoringClient, ScoringRequest};
pub use prompt::{
    build_system_prompt, build_user_prompt, truncate_transcript, CoachingPreferences,
    ExperienceLevel, QuestionContext,
};
pub use result::{fallback_result, AnalysisResult};
