/// Hugging Face Inference API classifier
///
/// Runs a zero-shot classification model with the full genre vocabulary as
/// candidate labels and keeps the best scoring genres.
use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::{
    error::{truncate_body, CallTrace, ClassifierError, ConfigError, ERROR_BODY_LIMIT},
    models::Genre,
    services::classifier::{build_http_client, Availability, MoodClassification, MoodClassifier},
};

#[derive(Debug, Deserialize)]
struct ZeroShotScores {
    labels: Vec<String>,
    scores: Vec<f64>,
}

/// Single-input responses are an object, batched ones a list
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Single(ZeroShotScores),
    Batch(Vec<ZeroShotScores>),
}

impl ZeroShotResponse {
    fn into_scores(self) -> Option<ZeroShotScores> {
        match self {
            ZeroShotResponse::Single(scores) => Some(scores),
            ZeroShotResponse::Batch(batch) => batch.into_iter().next(),
        }
    }
}

/// Pairs labels with scores, best first, keeping vocabulary genres only
fn rank_labels(scores: ZeroShotScores, top_k: usize) -> Vec<Genre> {
    let mut pairs: Vec<(String, f64)> = scores.labels.into_iter().zip(scores.scores).collect();
    pairs.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut genres = Vec::new();
    for (label, _) in pairs {
        if genres.len() == top_k {
            break;
        }
        if let Some(genre) = Genre::from_name(&label) {
            if !genres.contains(&genre) {
                genres.push(genre);
            }
        }
    }
    genres
}

#[derive(Clone)]
pub struct HuggingFaceClassifier {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

impl HuggingFaceClassifier {
    pub fn new(
        api_key: Option<String>,
        api_url: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        })
    }

    fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("HF_API_KEY"))
    }
}

#[async_trait::async_trait]
impl MoodClassifier for HuggingFaceClassifier {
    async fn classify(
        &self,
        mood: &str,
        top_k: usize,
    ) -> Result<MoodClassification, ClassifierError> {
        let api_key = self.api_key()?;
        let url = format!("{}/models/{}", self.api_url, self.model);

        let payload = json!({
            "inputs": mood,
            "parameters": {
                "candidate_labels": Genre::names(),
                "multi_label": true
            }
        });

        let mut trace = CallTrace {
            model: Some(self.model.clone()),
            request_payload: Some(payload.clone()),
            ..Default::default()
        };

        let response = match self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return Err(ClassifierError::Transport {
                    message: e.to_string(),
                    trace: Box::new(trace),
                })
            }
        };

        let status = response.status();
        trace.http_status = Some(status.as_u16());

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return Err(ClassifierError::Transport {
                    message: e.to_string(),
                    trace: Box::new(trace),
                })
            }
        };
        tracing::debug!(model = %self.model, status = status.as_u16(), response = %text, "Raw Hugging Face response");

        let body: Value =
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()));
        trace.raw_response = Some(body.clone());

        if !status.is_success() {
            let message = body
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| truncate_body(&text, ERROR_BODY_LIMIT));
            return Err(ClassifierError::Upstream {
                status: status.as_u16(),
                message,
                trace: Box::new(trace),
            });
        }

        let scores = match serde_json::from_value::<ZeroShotResponse>(body) {
            Ok(response) => response.into_scores(),
            Err(e) => {
                return Err(ClassifierError::Parse {
                    message: e.to_string(),
                    trace: Box::new(trace),
                })
            }
        };
        let Some(scores) = scores else {
            return Err(ClassifierError::Parse {
                message: "Empty batch response".to_string(),
                trace: Box::new(trace),
            });
        };

        let returned = scores.labels.clone();
        let genres = rank_labels(scores, top_k);
        if genres.is_empty() {
            return Err(ClassifierError::NoValidGenres {
                returned,
                trace: Some(Box::new(trace)),
            });
        }

        tracing::info!(mood = %mood, model = %self.model, genres = ?genres, "Hugging Face classified mood");

        Ok(MoodClassification {
            genres,
            trace: Some(trace),
        })
    }

    async fn availability(&self) -> Availability {
        match self.api_key() {
            Ok(_) => Availability::ready(),
            Err(e) => Availability::unavailable(e.to_string()),
        }
    }

    fn effective_model(&self) -> Option<String> {
        Some(self.model.clone())
    }

    fn name(&self) -> &'static str {
        "huggingface"
    }
}
