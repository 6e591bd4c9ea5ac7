use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::time::Duration;

use crate::error::ConfigError;

/// Which genre-inference strategy the service runs with
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AiMode {
    /// Remote inference provider
    Remote,
    /// In-process zero-shot model
    Local,
    /// Static keyword table only
    Off,
}

impl Display for AiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiMode::Remote => write!(f, "remote"),
            AiMode::Local => write!(f, "local"),
            AiMode::Off => write!(f, "off"),
        }
    }
}

/// Remote inference provider used when `AI_MODE=remote`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RemoteProvider {
    Gemini,
    Huggingface,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Timeout applied to every outbound HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// TMDB v3 API key
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// Language requested from TMDB
    #[serde(default = "default_tmdb_language")]
    pub tmdb_language: String,

    /// ISO 3166-1 region used for watch providers
    #[serde(default = "default_tmdb_region")]
    pub tmdb_region: String,

    /// Fetch streaming providers for every recommended title
    #[serde(default)]
    pub tmdb_include_providers: bool,

    #[serde(default = "default_ai_mode")]
    pub ai_mode: AiMode,

    #[serde(default = "default_remote_provider")]
    pub remote_provider: RemoteProvider,

    #[serde(default)]
    pub gemini_api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Custom prompt with `{mood}`, `{labels}` and `{top_k}` placeholders
    #[serde(default)]
    pub gemini_prompt_template: Option<String>,

    #[serde(default)]
    pub hf_api_key: Option<String>,

    #[serde(default = "default_hf_model")]
    pub hf_model: String,

    #[serde(default = "default_hf_api_url")]
    pub hf_api_url: String,

    /// Lexicon file backing the local zero-shot classifier
    #[serde(default)]
    pub local_model_path: Option<String>,

    /// Lifetime of a cached recommendation list
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Maximum number of cached moods
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_language() -> String {
    "pt-BR".to_string()
}

fn default_tmdb_region() -> String {
    "BR".to_string()
}

fn default_ai_mode() -> AiMode {
    AiMode::Remote
}

fn default_remote_provider() -> RemoteProvider {
    RemoteProvider::Gemini
}

fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_hf_model() -> String {
    "facebook/bart-large-mnli".to_string()
}

fn default_hf_api_url() -> String {
    "https://api-inference.huggingface.co".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    600
}

fn default_cache_capacity() -> usize {
    512
}

/// Treats blank secrets the same as unset ones
fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the service cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid(
                "CACHE_CAPACITY must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Reports a missing credential for the selected classifier strategy
    pub fn classifier_credential_error(&self) -> Option<ConfigError> {
        match (self.ai_mode, self.remote_provider) {
            (AiMode::Remote, RemoteProvider::Gemini) if self.gemini_key().is_none() => {
                Some(ConfigError::MissingCredential("GEMINI_API_KEY"))
            }
            (AiMode::Remote, RemoteProvider::Huggingface) if self.hf_key().is_none() => {
                Some(ConfigError::MissingCredential("HF_API_KEY"))
            }
            _ => None,
        }
    }

    pub fn tmdb_key(&self) -> Option<String> {
        non_blank(&self.tmdb_api_key)
    }

    pub fn gemini_key(&self) -> Option<String> {
        non_blank(&self.gemini_api_key)
    }

    pub fn hf_key(&self) -> Option<String> {
        non_blank(&self.hf_api_key)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            tmdb_api_url: default_tmdb_api_url(),
            tmdb_api_key: None,
            tmdb_language: default_tmdb_language(),
            tmdb_region: default_tmdb_region(),
            tmdb_include_providers: false,
            ai_mode: default_ai_mode(),
            remote_provider: default_remote_provider(),
            gemini_api_key: None,
            gemini_model: default_gemini_model(),
            gemini_api_url: default_gemini_api_url(),
            gemini_prompt_template: None,
            hf_api_key: None,
            hf_model: default_hf_model(),
            hf_api_url: default_hf_api_url(),
            local_model_path: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize_from_empty_env() {
        let config: Config = envy::from_iter(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.ai_mode, AiMode::Remote);
        assert_eq!(config.remote_provider, RemoteProvider::Gemini);
        assert_eq!(config.gemini_model, "gemini-pro");
        assert_eq!(config.tmdb_region, "BR");
        assert_eq!(config.cache_ttl_secs, 600);
        assert_eq!(config.cache_capacity, 512);
        assert!(!config.tmdb_include_providers);
    }

    #[test]
    fn test_modes_parse_lowercase() {
        let vars = vec![
            ("AI_MODE".to_string(), "off".to_string()),
            ("REMOTE_PROVIDER".to_string(), "huggingface".to_string()),
            ("TMDB_INCLUDE_PROVIDERS".to_string(), "true".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.ai_mode, AiMode::Off);
        assert_eq!(config.remote_provider, RemoteProvider::Huggingface);
        assert!(config.tmdb_include_providers);
    }

    #[test]
    fn test_blank_keys_count_as_missing() {
        let config = Config {
            gemini_api_key: Some("   ".to_string()),
            ..Config::default()
        };
        assert_eq!(config.gemini_key(), None);
        assert_eq!(
            config.classifier_credential_error(),
            Some(ConfigError::MissingCredential("GEMINI_API_KEY"))
        );
    }

    #[test]
    fn test_off_mode_needs_no_credentials() {
        let config = Config {
            ai_mode: AiMode::Off,
            ..Config::default()
        };
        assert_eq!(config.classifier_credential_error(), None);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = Config {
            cache_capacity: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_ai_mode_display() {
        assert_eq!(AiMode::Local.to_string(), "local");
    }
}
