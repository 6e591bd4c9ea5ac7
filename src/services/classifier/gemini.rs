/// Gemini remote classifier
///
/// Sends a single `generateContent` request per mood and expects a bare JSON
/// array of genre names back. When the configured model has been retired the
/// API answers 404; the classifier then lists the models visible to the key,
/// picks a substitute, retries once and keeps the substitute for the rest of
/// the process.
use parking_lot::RwLock;
use reqwest::Client as HttpClient;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::{
    error::{truncate_body, CallTrace, ClassifierError, ConfigError, ERROR_BODY_LIMIT},
    services::classifier::{
        build_http_client,
        prompt::{build_prompt, parse_genre_names, select_genres},
        Availability, MoodClassification, MoodClassifier,
    },
};

/// Substitutes tried in order before any other listed model
const PREFERRED_MODELS: [&str; 6] = [
    "gemini-2.0-flash",
    "gemini-2.0-flash-001",
    "gemini-2.0-flash-lite",
    "gemini-1.5-flash",
    "gemini-1.5-flash-latest",
    "gemini-pro",
];

const API_VERSIONS: [&str; 2] = ["v1", "v1beta"];

/// Newer model families are only served by the beta API
pub fn api_version(model: &str) -> &'static str {
    if model.contains("1.5") || model.contains("2.0") {
        "v1beta"
    } else {
        "v1"
    }
}

/// Picks a replacement for `current` among the models the key can see
pub fn choose_fallback_model(available: &[String], current: &str) -> Option<String> {
    let candidates: Vec<&str> = available
        .iter()
        .map(String::as_str)
        .filter(|name| *name != current)
        .collect();

    PREFERRED_MODELS
        .iter()
        .copied()
        .find(|preferred| candidates.contains(preferred))
        .or_else(|| {
            candidates
                .iter()
                .copied()
                .find(|name| name.starts_with("gemini-") && name.contains("flash"))
        })
        .or_else(|| {
            candidates
                .iter()
                .copied()
                .find(|name| name.starts_with("gemini-"))
        })
        .map(str::to_string)
}

/// Reads `candidates[0].content.parts[0].text`
fn extract_text(body: &Value) -> Result<String, String> {
    if let Some(error) = body.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(message);
    }

    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| "Missing candidates in response".to_string())
}

fn is_model_not_found(err: &ClassifierError) -> bool {
    matches!(
        err,
        ClassifierError::Upstream { status: 404, message, .. }
            if message.to_lowercase().contains("not found")
    )
}

pub struct GeminiClassifier {
    http_client: HttpClient,
    api_key: Option<String>,
    api_url: String,
    /// Model requests go to; replaced once if the configured one is retired
    model: RwLock<String>,
    prompt_template: Option<String>,
}

impl GeminiClassifier {
    pub fn new(
        api_key: Option<String>,
        api_url: String,
        model: String,
        prompt_template: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            http_client: build_http_client(timeout)?,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model: RwLock::new(model),
            prompt_template,
        })
    }

    fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("GEMINI_API_KEY"))
    }

    /// One `generateContent` call; the trace is returned on success and failure
    async fn generate(
        &self,
        api_key: &str,
        model: &str,
        payload: &Value,
    ) -> Result<(Value, CallTrace), ClassifierError> {
        let url = format!(
            "{}/{}/models/{}:generateContent",
            self.api_url,
            api_version(model),
            model
        );

        let mut trace = CallTrace {
            model: Some(model.to_string()),
            request_payload: Some(payload.clone()),
            ..Default::default()
        };

        let response = match self
            .http_client
            .post(&url)
            .query(&[("key", api_key)])
            .json(payload)
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
        tracing::debug!(model = %model, status = status.as_u16(), response = %text, "Raw Gemini response");

        let body: Value =
            serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.clone()));
        trace.raw_response = Some(body.clone());

        if !status.is_success() {
            let message = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| truncate_body(&text, ERROR_BODY_LIMIT));
            return Err(ClassifierError::Upstream {
                status: status.as_u16(),
                message,
                trace: Box::new(trace),
            });
        }

        Ok((body, trace))
    }

    /// Model ids visible to the key across both API versions, sorted and unique
    async fn list_models(&self, api_key: &str) -> Vec<String> {
        let mut names = BTreeSet::new();

        for version in API_VERSIONS {
            let url = format!("{}/{}/models", self.api_url, version);
            let result = self
                .http_client
                .get(&url)
                .query(&[("key", api_key)])
                .send()
                .await;

            let body: Value = match result {
                Ok(response) if response.status().is_success() => {
                    match response.json().await {
                        Ok(body) => body,
                        Err(e) => {
                            tracing::debug!(version, error = %e, "Unreadable Gemini model list");
                            continue;
                        }
                    }
                }
                Ok(response) => {
                    tracing::debug!(version, status = response.status().as_u16(), "Gemini model list unavailable");
                    continue;
                }
                Err(e) => {
                    tracing::debug!(version, error = %e, "Gemini model list request failed");
                    continue;
                }
            };

            let models = body
                .get("models")
                .and_then(Value::as_array)
                .into_iter()
                .flatten();
            for model in models {
                if let Some(name) = model.get("name").and_then(Value::as_str) {
                    if let Some(short) = name.rsplit('/').next().filter(|s| !s.is_empty()) {
                        names.insert(short.to_string());
                    }
                }
            }
        }

        names.into_iter().collect()
    }

    /// Generates with `model`, substituting a listed model once on "not found"
    async fn generate_with_substitution(
        &self,
        api_key: &str,
        model: &str,
        payload: &Value,
    ) -> Result<(Value, CallTrace), ClassifierError> {
        let err = match self.generate(api_key, model, payload).await {
            Ok(reply) => return Ok(reply),
            Err(err) if is_model_not_found(&err) => err,
            Err(err) => return Err(err),
        };

        let available = self.list_models(api_key).await;
        let Some(substitute) = choose_fallback_model(&available, model) else {
            tracing::warn!(
                model = %model,
                available = available.len(),
                "Gemini model not found and no substitute available"
            );
            return Err(err);
        };

        tracing::warn!(
            model = %model,
            substitute = %substitute,
            "Gemini model not found, retrying with substitute"
        );

        let reply = self.generate(api_key, &substitute, payload).await?;
        *self.model.write() = substitute;
        Ok(reply)
    }
}

#[async_trait::async_trait]
impl MoodClassifier for GeminiClassifier {
    async fn classify(
        &self,
        mood: &str,
        top_k: usize,
    ) -> Result<MoodClassification, ClassifierError> {
        let api_key = self.api_key()?;
        let model = self.model.read().clone();

        let prompt = build_prompt(self.prompt_template.as_deref(), mood, top_k);
        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let (body, trace) = self
            .generate_with_substitution(api_key, &model, &payload)
            .await?;

        let names = match extract_text(&body).and_then(|text| parse_genre_names(&text)) {
            Ok(names) => names,
            Err(message) => {
                return Err(ClassifierError::Parse {
                    message,
                    trace: Box::new(trace),
                })
            }
        };

        let genres = select_genres(&names, top_k);
        if genres.is_empty() {
            return Err(ClassifierError::NoValidGenres {
                returned: names,
                trace: Some(Box::new(trace)),
            });
        }

        tracing::info!(
            mood = %mood,
            model = trace.model.as_deref().unwrap_or_default(),
            genres = ?genres,
            "Gemini classified mood"
        );

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
        Some(self.model.read().clone())
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Genre;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn classifier(server: &MockServer, model: &str) -> GeminiClassifier {
        GeminiClassifier::new(
            Some("test-key".to_string()),
            server.uri(),
            model.to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn reply(text: &str) -> Value {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }] } }]
        })
    }

    fn not_found(model: &str) -> Value {
        json!({
            "error": {
                "code": 404,
                "message": format!("models/{} is not found for API version v1", model),
                "status": "NOT_FOUND"
            }
        })
    }

    #[test]
    fn test_api_version() {
        assert_eq!(api_version("gemini-pro"), "v1");
        assert_eq!(api_version("gemini-1.5-flash"), "v1beta");
        assert_eq!(api_version("gemini-2.0-flash-lite"), "v1beta");
    }

    #[test]
    fn test_choose_fallback_model_preference() {
        let available: Vec<String> = ["gemini-1.5-flash", "gemini-2.0-flash-001", "gemini-pro"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            choose_fallback_model(&available, "gemini-pro").as_deref(),
            Some("gemini-2.0-flash-001")
        );

        let only_current = vec!["gemini-pro".to_string()];
        assert_eq!(choose_fallback_model(&only_current, "gemini-pro"), None);
    }

    #[test]
    fn test_choose_fallback_model_generic_matches() {
        let flash = vec!["gemini-exp-flash-8b".to_string(), "gemini-ultra".to_string()];
        assert_eq!(
            choose_fallback_model(&flash, "gemini-pro").as_deref(),
            Some("gemini-exp-flash-8b")
        );

        let other = vec!["text-bison".to_string(), "gemini-ultra".to_string()];
        assert_eq!(
            choose_fallback_model(&other, "gemini-pro").as_deref(),
            Some("gemini-ultra")
        );

        let none = vec!["text-bison".to_string()];
        assert_eq!(choose_fallback_model(&none, "gemini-pro"), None);
    }

    #[tokio::test]
    async fn test_classify_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-pro:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(reply("[\"Comedy\", \"Romance\"]")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = classifier(&server, "gemini-pro")
            .classify("feliz", 2)
            .await
            .unwrap();

        assert_eq!(result.genres, vec![Genre::Comedy, Genre::Romance]);
        let trace = result.trace.unwrap();
        assert_eq!(trace.http_status, Some(200));
        assert_eq!(trace.model.as_deref(), Some("gemini-pro"));
        let prompt = trace
            .request_payload
            .as_ref()
            .and_then(|p| p.pointer("/contents/0/parts/0/text"))
            .and_then(Value::as_str)
            .unwrap();
        assert!(prompt.contains("'feliz'"));
    }

    #[tokio::test]
    async fn test_classify_strips_code_fences_and_truncates() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply(
                "```json\n[\"Horror\", \"Thriller\", \"Mystery\"]\n```",
            )))
            .mount(&server)
            .await;

        let result = classifier(&server, "gemini-1.5-flash")
            .classify("medo", 2)
            .await
            .unwrap();

        assert_eq!(result.genres, vec![Genre::Horror, Genre::Thriller]);
    }

    #[tokio::test]
    async fn test_unknown_genres_are_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-pro:generateContent"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(reply("[\"Feelgood\", \"Rom-Com\"]")),
            )
            .mount(&server)
            .await;

        let err = classifier(&server, "gemini-pro")
            .classify("feliz", 2)
            .await
            .unwrap_err();

        match err {
            ClassifierError::NoValidGenres { returned, trace } => {
                assert_eq!(returned, vec!["Feelgood", "Rom-Com"]);
                assert_eq!(trace.and_then(|t| t.http_status), Some(200));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_list_response_is_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Comedy and Romance")))
            .mount(&server)
            .await;

        let err = classifier(&server, "gemini-pro")
            .classify("feliz", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Parse { .. }));
        assert!(err.trace().and_then(|t| t.raw_response.as_ref()).is_some());
    }

    #[tokio::test]
    async fn test_upstream_error_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-pro:generateContent"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "API key not valid" }
            })))
            .mount(&server)
            .await;

        let err = classifier(&server, "gemini-pro")
            .classify("feliz", 2)
            .await
            .unwrap_err();

        match err {
            ClassifierError::Upstream { status, message, .. } => {
                assert_eq!(status, 403);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    async fn mount_model_lists(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "models/gemini-pro" }, { "name": "models/gemini-1.5-flash" }]
            })))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1beta/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "models/gemini-2.0-flash" }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_retired_model_is_substituted_and_remembered() {
        let server = MockServer::start().await;
        mount_model_lists(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-pro:generateContent"))
            .respond_with(ResponseTemplate::new(404).set_body_json(not_found("gemini-pro")))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("[\"Drama\"]")))
            .expect(2)
            .mount(&server)
            .await;

        let classifier = classifier(&server, "gemini-pro");

        let first = classifier.classify("triste", 2).await.unwrap();
        assert_eq!(first.genres, vec![Genre::Drama]);
        assert_eq!(
            first.trace.and_then(|t| t.model).as_deref(),
            Some("gemini-2.0-flash")
        );
        assert_eq!(
            classifier.effective_model().as_deref(),
            Some("gemini-2.0-flash")
        );

        // Second call goes straight to the substitute
        classifier.classify("triste", 2).await.unwrap();
    }

    #[tokio::test]
    async fn test_not_found_without_substitute_keeps_model() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "models/gemini-pro" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-pro:generateContent"))
            .respond_with(ResponseTemplate::new(404).set_body_json(not_found("gemini-pro")))
            .mount(&server)
            .await;

        let classifier = classifier(&server, "gemini-pro");
        let err = classifier.classify("feliz", 2).await.unwrap_err();

        assert!(matches!(err, ClassifierError::Upstream { status: 404, .. }));
        assert_eq!(classifier.effective_model().as_deref(), Some("gemini-pro"));
    }

    #[tokio::test]
    async fn test_concurrent_substitution_publishes_one_model() {
        let server = MockServer::start().await;
        mount_model_lists(&server).await;

        Mock::given(method("POST"))
            .and(path("/v1/models/gemini-pro:generateContent"))
            .respond_with(ResponseTemplate::new(404).set_body_json(not_found("gemini-pro")))
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("[\"Comedy\"]")))
            .mount(&server)
            .await;

        let classifier = Arc::new(classifier(&server, "gemini-pro"));
        let moods = [
            "feliz", "triste", "com medo", "calmo", "curioso", "tenso", "animado", "entediado",
        ];
        let calls = moods.into_iter().map(|mood| {
            let classifier = Arc::clone(&classifier);
            async move { classifier.classify(mood, 2).await }
        });

        for result in futures::future::join_all(calls).await {
            let classification = result.unwrap();
            assert_eq!(classification.genres, vec![Genre::Comedy]);
            assert_eq!(
                classification.trace.and_then(|t| t.model).as_deref(),
                Some("gemini-2.0-flash")
            );
        }
        assert_eq!(
            classifier.effective_model().as_deref(),
            Some("gemini-2.0-flash")
        );
    }

    #[tokio::test]
    async fn test_missing_key_makes_no_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let classifier = GeminiClassifier::new(
            None,
            server.uri(),
            "gemini-pro".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap();

        let err = classifier.classify("feliz", 2).await.unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::Config(ConfigError::MissingCredential("GEMINI_API_KEY"))
        ));
        assert!(!classifier.availability().await.available);
    }
}
