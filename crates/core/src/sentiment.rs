//! Shared emotional-tone heuristic, reused for the store's conversation
//! summaries and the conversation core's per-turn avatar-state nudging
//! (both described in spec §4.D/§3). Word lists pinned from
//! `original_source/src/models/memory_system.py::_analyze_emotional_tone`.

const POSITIVE_WORDS: &[&str] = &[
    "happy", "good", "great", "excellent", "love", "like", "wonderful", "amazing", "fantastic",
];

const NEGATIVE_WORDS: &[&str] = &[
    "sad", "bad", "terrible", "hate", "dislike", "awful", "horrible", "disappointing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmotionalTone {
    Positive,
    Neutral,
    Negative,
}

/// Majority-count classification over the two word lists; a tie (including
/// zero matches either way) is `Neutral`.
pub fn analyze_emotional_tone(text: &str) -> EmotionalTone {
    let lower = text.to_lowercase();
    let positive_count = POSITIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();
    let negative_count = NEGATIVE_WORDS.iter().filter(|w| lower.contains(*w)).count();

    if positive_count > negative_count {
        EmotionalTone::Positive
    } else if negative_count > positive_count {
        EmotionalTone::Negative
    } else {
        EmotionalTone::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_positive() {
        assert_eq!(analyze_emotional_tone("I love this, it's wonderful!"), EmotionalTone::Positive);
    }

    #[test]
    fn detects_negative() {
        assert_eq!(analyze_emotional_tone("this is terrible and sad"), EmotionalTone::Negative);
    }

    #[test]
    fn detects_neutral_on_tie_or_no_match() {
        assert_eq!(analyze_emotional_tone("the weather today"), EmotionalTone::Neutral);
        assert_eq!(analyze_emotional_tone("good but bad"), EmotionalTone::Neutral);
    }
}
