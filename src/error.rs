use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

/// Maximum number of characters of an upstream body kept in an error
pub const ERROR_BODY_LIMIT: usize = 300;

/// Truncates an upstream response body for inclusion in error messages
pub fn truncate_body(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}

/// Configuration problems detected at startup or when a strategy is invoked
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} not configured")]
    MissingCredential(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the movie catalog client
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} {status} :: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint} returned an unreadable payload: {message}")]
    Decode { endpoint: String, message: String },
}

impl CatalogError {
    /// Whether the failure is worth another attempt
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::Transport { .. } => true,
            CatalogError::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            CatalogError::Config(_) | CatalogError::Decode { .. } => false,
        }
    }
}

/// Detail of a single remote classifier call, returned instead of kept in globals
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallTrace {
    /// Model identifier the final request was sent to
    pub model: Option<String>,
    /// HTTP status of the last request performed
    pub http_status: Option<u16>,
    /// Outbound request payload
    pub request_payload: Option<Value>,
    /// Raw (parsed) body of the last response
    pub raw_response: Option<Value>,
}

/// Failures of a mood classifier strategy
#[derive(thiserror::Error, Debug)]
pub enum ClassifierError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {message}")]
    Transport {
        message: String,
        trace: Box<CallTrace>,
    },

    #[error("Inference provider non-2xx ({status}): {message}")]
    Upstream {
        status: u16,
        message: String,
        trace: Box<CallTrace>,
    },

    #[error("Failed to parse inference response: {message}")]
    Parse {
        message: String,
        trace: Box<CallTrace>,
    },

    #[error("No valid genres found in response: {returned:?}")]
    NoValidGenres {
        returned: Vec<String>,
        trace: Option<Box<CallTrace>>,
    },

    #[error("Classifier unavailable: {0}")]
    Unavailable(String),
}

impl ClassifierError {
    /// Call trace attached to the failure, when an HTTP call was made
    pub fn trace(&self) -> Option<&CallTrace> {
        match self {
            ClassifierError::Transport { trace, .. }
            | ClassifierError::Upstream { trace, .. }
            | ClassifierError::Parse { trace, .. } => Some(&**trace),
            ClassifierError::NoValidGenres { trace, .. } => trace.as_deref(),
            ClassifierError::Config(_) | ClassifierError::Unavailable(_) => None,
        }
    }
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Catalog(_) | AppError::Classifier(_) => {
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::Config(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
