/// In-process zero-shot classifier
///
/// The backing model is loaded lazily by the first call and the outcome is
/// memoized: a failed load leaves the strategy unavailable until restart, and
/// the load error is kept for diagnostics.
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::{
    error::ClassifierError,
    models::Genre,
    services::classifier::{Availability, MoodClassification, MoodClassifier},
};

/// Scores candidate genres against free text
pub trait ZeroShotModel: Send + Sync {
    /// One score in `[0, 1]` per label, in label order
    fn score(&self, text: &str, labels: &[Genre]) -> Vec<f64>;

    fn name(&self) -> String;
}

/// Produces the model on first use
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ZeroShotLoader: Send + Sync {
    async fn load(&self) -> Result<Arc<dyn ZeroShotModel>, String>;
}

/// Genre name to descriptor terms, as stored on disk
#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct LexiconFile(HashMap<String, Vec<String>>);

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Term-overlap model built from a genre lexicon
#[derive(Debug, Clone)]
pub struct LexiconModel {
    source: String,
    terms: HashMap<Genre, HashSet<String>>,
}

impl LexiconModel {
    /// Builds the model, rejecting genre names outside the vocabulary
    pub fn from_terms(
        source: impl Into<String>,
        lexicon: HashMap<String, Vec<String>>,
    ) -> Result<Self, String> {
        let mut terms: HashMap<Genre, HashSet<String>> = Genre::ALL
            .iter()
            .map(|genre| (*genre, tokenize(genre.name()).into_iter().collect()))
            .collect();

        for (name, descriptors) in lexicon {
            let genre = Genre::from_name(name.trim())
                .ok_or_else(|| format!("Unknown genre in lexicon: {}", name))?;
            let entry = terms.entry(genre).or_default();
            for descriptor in descriptors {
                entry.extend(tokenize(&descriptor));
            }
        }

        Ok(Self {
            source: source.into(),
            terms,
        })
    }
}

impl ZeroShotModel for LexiconModel {
    /// Fraction of the text's tokens that describe each genre
    fn score(&self, text: &str, labels: &[Genre]) -> Vec<f64> {
        let tokens = tokenize(text);

        labels
            .iter()
            .map(|genre| {
                if tokens.is_empty() {
                    return 0.0;
                }
                let matched = self
                    .terms
                    .get(genre)
                    .map(|terms| tokens.iter().filter(|t| terms.contains(*t)).count())
                    .unwrap_or(0);
                matched as f64 / tokens.len() as f64
            })
            .collect()
    }

    fn name(&self) -> String {
        format!("lexicon:{}", self.source)
    }
}

/// Loads a [`LexiconModel`] from a JSON file
#[derive(Debug, Clone)]
pub struct LexiconLoader {
    path: Option<PathBuf>,
}

impl LexiconLoader {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

#[async_trait::async_trait]
impl ZeroShotLoader for LexiconLoader {
    async fn load(&self) -> Result<Arc<dyn ZeroShotModel>, String> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| "LOCAL_MODEL_PATH not configured".to_string())?;

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

        let LexiconFile(lexicon) = serde_json::from_str(&raw)
            .map_err(|e| format!("Invalid lexicon {}: {}", path.display(), e))?;

        let model = LexiconModel::from_terms(path.display().to_string(), lexicon)?;
        Ok(Arc::new(model))
    }
}

pub struct LocalZeroShotClassifier {
    loader: Arc<dyn ZeroShotLoader>,
    model: OnceCell<Result<Arc<dyn ZeroShotModel>, String>>,
}

impl LocalZeroShotClassifier {
    pub fn new(loader: Arc<dyn ZeroShotLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    /// Loads the model once; later calls reuse the outcome
    async fn probe(&self) -> &Result<Arc<dyn ZeroShotModel>, String> {
        self.model
            .get_or_init(|| async {
                let outcome = self.loader.load().await;
                match &outcome {
                    Ok(model) => {
                        tracing::info!(model = %model.name(), "Local zero-shot model loaded")
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Local zero-shot model unavailable")
                    }
                }
                outcome
            })
            .await
    }
}

#[async_trait::async_trait]
impl MoodClassifier for LocalZeroShotClassifier {
    async fn classify(
        &self,
        mood: &str,
        top_k: usize,
    ) -> Result<MoodClassification, ClassifierError> {
        let model = match self.probe().await {
            Ok(model) => Arc::clone(model),
            Err(e) => return Err(ClassifierError::Unavailable(e.clone())),
        };

        let scores = model.score(mood, &Genre::ALL);
        let mut ranked: Vec<(Genre, f64)> = Genre::ALL
            .into_iter()
            .zip(scores)
            .filter(|(_, score)| *score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let genres: Vec<Genre> = ranked.into_iter().take(top_k).map(|(g, _)| g).collect();
        if genres.is_empty() {
            return Err(ClassifierError::NoValidGenres {
                returned: Vec::new(),
                trace: None,
            });
        }

        tracing::debug!(mood = %mood, genres = ?genres, "Local model classified mood");
        Ok(MoodClassification::new(genres))
    }

    async fn availability(&self) -> Availability {
        match self.probe().await {
            Ok(_) => Availability::ready(),
            Err(e) => Availability::unavailable(e.clone()),
        }
    }

    fn effective_model(&self) -> Option<String> {
        self.model
            .get()
            .and_then(|outcome| outcome.as_ref().ok())
            .map(|model| model.name())
    }

    fn name(&self) -> &'static str {
        "local-zero-shot"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lexicon_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn classifier_for(file: &NamedTempFile) -> LocalZeroShotClassifier {
        let loader = LexiconLoader::new(Some(file.path().to_path_buf()));
        LocalZeroShotClassifier::new(Arc::new(loader))
    }

    const LEXICON: &str = r#"{
        "Comedy": ["leve", "engraçado", "divertido", "funny"],
        "Romance": ["amor", "leve", "love"],
        "Drama": ["inspirador", "emocionante"],
        "Horror": ["medo", "terror"]
    }"#;

    #[test]
    fn test_lexicon_scores_are_token_fractions() {
        let lexicon: HashMap<String, Vec<String>> = serde_json::from_str(LEXICON).unwrap();
        let model = LexiconModel::from_terms("test", lexicon).unwrap();

        let scores = model.score(
            "quero algo leve e inspirador",
            &[Genre::Comedy, Genre::Drama, Genre::War],
        );
        assert_eq!(scores, vec![0.2, 0.2, 0.0]);
    }

    #[test]
    fn test_genre_name_counts_as_descriptor() {
        let model = LexiconModel::from_terms("test", HashMap::new()).unwrap();
        let scores = model.score("science fiction", &[Genre::ScienceFiction, Genre::Drama]);
        assert_eq!(scores, vec![1.0, 0.0]);
    }

    #[test]
    fn test_unknown_genre_is_rejected() {
        let lexicon = HashMap::from([("Feelgood".to_string(), vec!["leve".to_string()])]);
        let err = LexiconModel::from_terms("test", lexicon).unwrap_err();
        assert!(err.contains("Feelgood"));
    }

    #[tokio::test]
    async fn test_classify_ranks_matching_genres() {
        let file = lexicon_file(LEXICON);
        let classifier = classifier_for(&file);

        let result = classifier.classify("Medo e terror", 2).await.unwrap();
        assert_eq!(result.genres, vec![Genre::Horror]);

        let result = classifier.classify("amor leve", 2).await.unwrap();
        assert_eq!(result.genres, vec![Genre::Romance, Genre::Comedy]);

        assert!(classifier.effective_model().unwrap().starts_with("lexicon:"));
    }

    #[tokio::test]
    async fn test_all_zero_scores_fail() {
        let file = lexicon_file(LEXICON);
        let err = classifier_for(&file)
            .classify("xyz", 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ClassifierError::NoValidGenres { trace: None, .. }));
    }

    #[tokio::test]
    async fn test_missing_path_is_unavailable() {
        let classifier = LocalZeroShotClassifier::new(Arc::new(LexiconLoader::new(None)));

        let err = classifier.classify("feliz", 2).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));

        let availability = classifier.availability().await;
        assert!(!availability.available);
        assert_eq!(
            availability.error.as_deref(),
            Some("LOCAL_MODEL_PATH not configured")
        );
        assert!(classifier.effective_model().is_none());
    }

    #[tokio::test]
    async fn test_invalid_lexicon_is_unavailable() {
        let file = lexicon_file(r#"{"Feelgood": ["leve"]}"#);
        let err = classifier_for(&file).classify("leve", 2).await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(msg) if msg.contains("Feelgood")));
    }

    #[tokio::test]
    async fn test_load_is_attempted_once() {
        let mut loader = MockZeroShotLoader::new();
        loader
            .expect_load()
            .times(1)
            .returning(|| Err("model weights missing".to_string()));

        let classifier = LocalZeroShotClassifier::new(Arc::new(loader));
        assert!(classifier.classify("feliz", 2).await.is_err());
        assert!(classifier.classify("triste", 2).await.is_err());
        assert!(!classifier.availability().await.available);
    }
}
