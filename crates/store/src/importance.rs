//! Importance scoring and topic extraction (spec §4.C), pinned from
//! `original_source/src/models/memory_system.py` (`_analyze_importance`,
//! `_extract_topic`).

const HIGH_IMPORTANCE_WORDS: &[&str] = &[
    "love", "hate", "important", "secret", "personal", "family", "work", "passion", "dream",
    "goal",
];

const LOW_IMPORTANCE_WORDS: &[&str] = &["maybe", "perhaps", "casual", "random", "whatever", "small talk"];

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "i", "you", "he", "she",
    "it", "we", "they", "to", "of", "in", "on", "at", "for", "with", "that", "this", "my", "your",
];

/// Maps a caller-supplied hint string to the base score (spec §4.C).
pub fn hint_to_base_score(hint: &str) -> f32 {
    match hint.to_lowercase().as_str() {
        "critical" => 0.9,
        "high" => 0.7,
        "medium" => 0.5,
        "low" => 0.3,
        "minimal" => 0.1,
        _ => 0.5,
    }
}

/// Applies the keyword/length adjustments on top of the base score.
pub fn score_importance(base_score: f32, content: &str) -> f32 {
    let lower = content.to_lowercase();
    let mut score = base_score;

    for word in HIGH_IMPORTANCE_WORDS {
        if lower.contains(word) {
            score += 0.1;
        }
    }
    for word in LOW_IMPORTANCE_WORDS {
        if lower.contains(word) {
            score -= 0.1;
        }
    }
    if content.len() > 100 {
        score += 0.05;
    }

    score.clamp(0.1, 1.0)
}

/// First non-stopword token `>= 3` chars, lowercased; else `"general"`.
pub fn extract_topic(content: &str) -> String {
    content
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .find(|w| w.len() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .unwrap_or_else(|| "general".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_salience_words_raise_importance_capped_at_one() {
        let score = score_importance(
            hint_to_base_score("high"),
            "this is very important, it's about my family and my dream and goal",
        );
        assert!((score - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn low_salience_words_lower_importance_floored_at_point_one() {
        let score = score_importance(hint_to_base_score("minimal"), "maybe whatever, just random casual talk, perhaps");
        assert!((score - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn long_content_gets_length_bonus() {
        let short = score_importance(0.5, "short text");
        let long_content = "x".repeat(150);
        let long = score_importance(0.5, &long_content);
        assert!((long - short - 0.05).abs() < 1e-6);
    }

    #[test]
    fn topic_extraction_skips_stopwords() {
        assert_eq!(extract_topic("the dog ran fast"), "dog");
        assert_eq!(extract_topic("a an in on"), "general");
        assert_eq!(extract_topic(""), "general");
    }
}
