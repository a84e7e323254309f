//! Memory cue scanning (spec §4.D step 7 "scan the user input for a small
//! set of preference/interest/fact cues"). Keyword lists and the
//! surrounding-context extraction window are pinned from
//! `original_source/src/models/llm_handler.py::_analyze_and_store_insights`.

use avatar_core::MemoryType;

const PREFERENCE_KEYWORDS: &[&str] = &["like", "love", "enjoy", "favorite", "prefer"];
const INTEREST_KEYWORDS: &[&str] = &["interested in", "hobby", "passion"];
const FACT_KEYWORDS: &[&str] = &["my name is", "i am", "i work", "i live"];

/// One memory cue found in a user turn: the type to file it under, the
/// keyword that triggered it (used as the topic), and the extracted
/// context snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryCue {
    pub memory_type: MemoryType,
    pub topic: String,
    pub content: String,
}

fn first_cue(user_input: &str, keywords: &[&str], memory_type: MemoryType) -> Option<MemoryCue> {
    let lower = user_input.to_ascii_lowercase();
    for keyword in keywords {
        if let Some(start) = lower.find(keyword) {
            let window_start = start.saturating_sub(20);
            let window_end = (start + keyword.len() + 50).min(user_input.len());
            let window_start = find_char_boundary_at_or_before(user_input, window_start);
            let window_end = find_char_boundary_at_or_after(user_input, window_end);
            let context = user_input[window_start..window_end].trim().to_string();
            return Some(MemoryCue { memory_type, topic: keyword.to_string(), content: context });
        }
    }
    None
}

fn find_char_boundary_at_or_before(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn find_char_boundary_at_or_after(s: &str, mut idx: usize) -> usize {
    while idx < s.len() && !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Scans one user turn for at most one cue per category (spec says "a
/// small set of cues", the original scans for the first preference match
/// only; this completes the interest/fact branches the original left as
/// "simplified implementation" in the same style).
pub fn scan_cues(user_input: &str) -> Vec<MemoryCue> {
    [
        first_cue(user_input, PREFERENCE_KEYWORDS, MemoryType::Preference),
        first_cue(user_input, INTEREST_KEYWORDS, MemoryType::Interest),
        first_cue(user_input, FACT_KEYWORDS, MemoryType::Fact),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_preference_cue() {
        let cues = scan_cues("I really like hiking in the mountains on weekends");
        let pref = cues.iter().find(|c| c.memory_type == MemoryType::Preference).unwrap();
        assert_eq!(pref.topic, "like");
        assert!(pref.content.contains("hiking"));
    }

    #[test]
    fn detects_fact_cue() {
        let cues = scan_cues("my name is Alex and I study biology");
        let fact = cues.iter().find(|c| c.memory_type == MemoryType::Fact).unwrap();
        assert_eq!(fact.topic, "my name is");
    }

    #[test]
    fn like_keyword_triggers_preference_cue() {
        assert!(!scan_cues("What's the weather like tomorrow").is_empty());
    }

    #[test]
    fn no_cues_when_nothing_matches() {
        assert!(scan_cues("The sky is blue today").is_empty());
    }
}
