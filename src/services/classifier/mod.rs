/// Mood classifier strategies
///
/// A mood is mapped to an ordered list of catalog genres by exactly one
/// strategy, chosen once at startup from configuration:
/// - `StaticFallback`: bilingual keyword table, never fails
/// - `LocalZeroShotClassifier`: in-process zero-shot model, probed once
/// - `GeminiClassifier` / `HuggingFaceClassifier`: remote inference
///
/// Strategies report success or a typed error. Falling back to the static
/// table is the orchestrator's job.
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::{AiMode, Config, RemoteProvider},
    error::{CallTrace, ClassifierError, ConfigError},
    models::Genre,
};

pub mod fallback;
pub mod gemini;
pub mod huggingface;
pub mod local;
pub mod prompt;

pub use fallback::{fallback_genres_for, StaticFallback};
pub use gemini::GeminiClassifier;
pub use huggingface::HuggingFaceClassifier;
pub use local::{LexiconLoader, LocalZeroShotClassifier};

/// Genres inferred for a mood, most relevant first
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MoodClassification {
    pub genres: Vec<Genre>,
    /// Remote call detail; `None` for in-process strategies
    pub trace: Option<CallTrace>,
}

impl MoodClassification {
    pub fn new(genres: Vec<Genre>) -> Self {
        Self {
            genres,
            trace: None,
        }
    }
}

/// Whether a strategy can currently serve requests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub available: bool,
    pub error: Option<String>,
}

impl Availability {
    pub fn ready() -> Self {
        Self {
            available: true,
            error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            error: Some(error.into()),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MoodClassifier: Send + Sync {
    /// Up to `top_k` vocabulary genres for `mood`, most relevant first
    async fn classify(
        &self,
        mood: &str,
        top_k: usize,
    ) -> Result<MoodClassification, ClassifierError>;

    /// Availability probe for diagnostics
    async fn availability(&self) -> Availability;

    /// Model identifier requests are currently sent to, if any
    fn effective_model(&self) -> Option<String>;

    /// Strategy name for logging and diagnostics
    fn name(&self) -> &'static str;
}

/// Builds the strategy selected by `AI_MODE` (and `REMOTE_PROVIDER`)
///
/// Missing credentials do not fail construction: the strategy reports a
/// `ClassifierError::Config` on every call so the misconfiguration stays
/// visible in logs and diagnostics.
pub fn build_classifier(config: &Config) -> Result<Arc<dyn MoodClassifier>, ConfigError> {
    let timeout = config.request_timeout();

    let classifier: Arc<dyn MoodClassifier> = match config.ai_mode {
        AiMode::Off => Arc::new(StaticFallback),
        AiMode::Local => {
            let loader = LexiconLoader::new(config.local_model_path.clone().map(Into::into));
            Arc::new(LocalZeroShotClassifier::new(Arc::new(loader)))
        }
        AiMode::Remote => match config.remote_provider {
            RemoteProvider::Gemini => Arc::new(GeminiClassifier::new(
                config.gemini_key(),
                config.gemini_api_url.clone(),
                config.gemini_model.clone(),
                config.gemini_prompt_template.clone(),
                timeout,
            )?),
            RemoteProvider::Huggingface => Arc::new(HuggingFaceClassifier::new(
                config.hf_key(),
                config.hf_api_url.clone(),
                config.hf_model.clone(),
                timeout,
            )?),
        },
    };

    tracing::info!(
        ai_mode = %config.ai_mode,
        classifier = classifier.name(),
        "Mood classifier initialized"
    );

    Ok(classifier)
}

pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Invalid(format!("Failed to create HTTP client: {}", e)))
}
