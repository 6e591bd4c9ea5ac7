use crate::{
    error::ClassifierError,
    models::Genre,
    services::classifier::{Availability, MoodClassification, MoodClassifier},
};

/// Genre used for any non-blank mood missing from the keyword table
pub const DEFAULT_GENRE: Genre = Genre::Drama;

/// Bilingual (pt/en) keywords, matched exactly against the normalized mood
const MOOD_TABLE: &[(&[&str], &[Genre])] = &[
    (
        &["feliz", "happy", "alegre", "cheerful"],
        &[Genre::Comedy, Genre::Romance],
    ),
    (&["triste", "sad"], &[Genre::Drama, Genre::Romance]),
    (
        &["animado", "excited", "energetic", "energético"],
        &[Genre::Action, Genre::Adventure],
    ),
    (
        &["medo", "assustado", "scared", "spooky"],
        &[Genre::Horror, Genre::Thriller],
    ),
    (
        &["romântico", "romantico", "romantic", "apaixonado", "in love"],
        &[Genre::Romance, Genre::Drama],
    ),
    (&["entediado", "bored"], &[Genre::Adventure, Genre::Comedy]),
    (
        &["relaxado", "relaxed", "calmo", "calm"],
        &[Genre::Animation, Genre::Family],
    ),
    (&["curioso", "curious"], &[Genre::Documentary, Genre::Mystery]),
    (
        &["nostálgico", "nostalgico", "nostalgic"],
        &[Genre::Family, Genre::Animation],
    ),
    (
        &["pensativo", "thoughtful", "reflexivo"],
        &[Genre::Drama, Genre::ScienceFiction],
    ),
    (
        &["tenso", "tense", "ansioso", "anxious"],
        &[Genre::Thriller, Genre::Crime],
    ),
    (
        &["aventureiro", "adventurous"],
        &[Genre::Adventure, Genre::Fantasy],
    ),
    (
        &["inspirado", "inspired", "motivado"],
        &[Genre::Drama, Genre::History],
    ),
];

/// Static keyword mapping, also the last rung of every other strategy
pub fn fallback_genres_for(mood: &str, top_k: usize) -> Vec<Genre> {
    let normalized = mood.trim().to_lowercase();
    if normalized.is_empty() {
        return Vec::new();
    }

    let genres = MOOD_TABLE
        .iter()
        .find(|(keywords, _)| keywords.contains(&normalized.as_str()))
        .map(|(_, genres)| genres.to_vec())
        .unwrap_or_else(|| vec![DEFAULT_GENRE]);

    genres.into_iter().take(top_k).collect()
}

/// Strategy used when `AI_MODE=off`
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticFallback;

#[async_trait::async_trait]
impl MoodClassifier for StaticFallback {
    async fn classify(
        &self,
        mood: &str,
        top_k: usize,
    ) -> Result<MoodClassification, ClassifierError> {
        Ok(MoodClassification::new(fallback_genres_for(mood, top_k)))
    }

    async fn availability(&self) -> Availability {
        Availability::ready()
    }

    fn effective_model(&self) -> Option<String> {
        None
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
