//! Prompt construction and response parsing shared by remote classifiers.

use crate::models::Genre;

/// Used when no custom template is configured or the custom one is unusable
pub const DEFAULT_PROMPT: &str = "Given the mood or emotion '{mood}', select the most relevant movie genres from this list: {labels}.\n\
Respond ONLY with a pure JSON array (no extra text, no code fences), containing the top {top_k} exact genre names.\n\
Example: [\"Action\", \"Adventure\"]";

/// Renders `template`, falling back to [`DEFAULT_PROMPT`] when it cannot be used
pub fn build_prompt(template: Option<&str>, mood: &str, top_k: usize) -> String {
    let labels = Genre::names().join(", ");

    template
        .and_then(|t| render_template(t, mood, &labels, top_k))
        .or_else(|| render_template(DEFAULT_PROMPT, mood, &labels, top_k))
        .unwrap_or_default()
}

/// Substitutes `{mood}`, `{labels}` and `{top_k}`
///
/// Returns `None` for an unknown or unterminated placeholder, or when the
/// template never mentions the mood.
fn render_template(template: &str, mood: &str, labels: &str, top_k: usize) -> Option<String> {
    let mut out = String::with_capacity(template.len() + labels.len());
    let mut rest = template;
    let mut has_mood = false;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}')?;
        match &after[..end] {
            "mood" => {
                out.push_str(mood);
                has_mood = true;
            }
            "labels" => out.push_str(labels),
            "top_k" => out.push_str(&top_k.to_string()),
            _ => return None,
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);

    has_mood.then_some(out)
}

/// Strips a Markdown code fence around a JSON array, if present
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

/// Parses model output as a JSON array of genre names
pub fn parse_genre_names(text: &str) -> Result<Vec<String>, String> {
    let value: serde_json::Value =
        serde_json::from_str(strip_code_fences(text)).map_err(|e| e.to_string())?;

    let items = value
        .as_array()
        .ok_or_else(|| "Invalid response format: expected a list".to_string())?;

    Ok(items
        .iter()
        .filter_map(|item| item.as_str().map(str::to_string))
        .collect())
}

/// Keeps vocabulary genres only, first occurrence wins, at most `top_k`
pub fn select_genres<S: AsRef<str>>(names: &[S], top_k: usize) -> Vec<Genre> {
    let mut genres = Vec::new();
    for name in names {
        if genres.len() == top_k {
            break;
        }
        if let Some(genre) = Genre::from_name(name.as_ref().trim()) {
            if !genres.contains(&genre) {
                genres.push(genre);
            }
        }
    }
    genres
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_lists_vocabulary() {
        let prompt = build_prompt(None, "feliz", 2);
        assert!(prompt.starts_with("Given the mood or emotion 'feliz'"));
        assert!(prompt.contains("Action, Adventure, Animation"));
        assert!(prompt.contains("Science Fiction"));
        assert!(prompt.contains("the top 2 exact genre names"));
    }

    #[test]
    fn test_custom_template() {
        let prompt = build_prompt(Some("Humor: {mood}. Escolha {top_k} de {labels}"), "triste", 3);
        assert!(prompt.starts_with("Humor: triste. Escolha 3 de Action"));
    }

    #[test]
    fn test_unusable_template_falls_back_to_default() {
        let default = build_prompt(None, "feliz", 2);
        assert_eq!(build_prompt(Some("Pick {genres} for {mood}"), "feliz", 2), default);
        assert_eq!(build_prompt(Some("No placeholders"), "feliz", 2), default);
        assert_eq!(build_prompt(Some("Broken {mood"), "feliz", 2), default);
    }

    #[test]
    fn test_mood_braces_are_not_placeholders() {
        let prompt = build_prompt(None, "{labels}", 2);
        assert!(prompt.starts_with("Given the mood or emotion '{labels}'"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```json\n[\"Comedy\", \"Romance\"]\n```"),
            "[\"Comedy\", \"Romance\"]"
        );
        assert_eq!(strip_code_fences("  [\"Drama\"]  "), "[\"Drama\"]");
    }

    #[test]
    fn test_parse_genre_names() {
        assert_eq!(
            parse_genre_names("```\n[\"Comedy\", 3, \"Romance\"]\n```").unwrap(),
            vec!["Comedy", "Romance"]
        );
        assert!(parse_genre_names("{\"genres\": []}").is_err());
        assert!(parse_genre_names("Comedy, Romance").is_err());
    }

    #[test]
    fn test_select_genres_filters_unknown_names() {
        let names = ["Rom-Com", "Comedy", "Comedy", " Drama ", "Horror"];
        assert_eq!(select_genres(&names, 2), vec![Genre::Comedy, Genre::Drama]);
        assert!(select_genres(&["Sci-Fi", "Feelgood"], 2).is_empty());
    }
}
