//! Naming-pattern grouping (spec §4.E), taken verbatim from
//! `original_source/routes/app_routes_live2d.py` (`smart_group_motions`).

use crate::analysis::{MotionAnalysis, MotionClassification};

/// Emotion vocabulary used for grouping (superset of spec.md's example
/// list, taken from the original).
const EMOTION_KEYWORDS: &[&str] = &[
    "angry", "anger", "mad", "rage", "sad", "cry", "tear", "upset", "sorrow", "happy", "smile",
    "laugh", "joy", "glad", "surprise", "shock", "gasp", "wow", "blushed", "blush", "shy",
    "embarrassed", "normal", "neutral", "default", "wink", "closeeye", "blink", "trouble",
    "worry", "concern", "disgust", "yuck", "ew", "eat", "delicious", "yum", "hawawa", "confusion",
    "daze",
];

/// Motion/pose vocabulary used for grouping (superset, taken from the
/// original).
const MOTION_KEYWORDS: &[&str] = &[
    "pose", "tilt", "head", "nod", "shake", "tap", "touch", "pat", "stroke", "wave", "point",
    "gesture", "dance", "move", "sway", "jump", "hop", "bounce", "idle", "stand", "wait",
];

/// Models with more than this many declared motions receive smart
/// grouping; models with fewer use their declared groups verbatim (spec
/// §4.E).
pub const SMART_GROUPING_THRESHOLD: usize = 50;

fn first_matching<'a>(haystack: &str, keywords: &'a [&'a str]) -> Option<&'a str> {
    keywords.iter().find(|kw| haystack.contains(*kw)).copied()
}

/// Classifies and assigns a group name for one motion, reproducing the
/// original's branching exactly. A pure function of `(name, analysis)` so
/// it is independently unit-testable (spec §8 determinism property).
pub fn classify_and_group(name: &str, analysis: &MotionAnalysis) -> String {
    let lower = name.to_lowercase();

    match analysis.classification {
        MotionClassification::Face => group_face_motion(&lower),
        MotionClassification::Body => group_body_motion(&lower),
        MotionClassification::Mixed => group_mixed_motion(&lower),
        MotionClassification::Unknown => group_unknown_motion(&lower),
    }
}

fn group_face_motion(lower: &str) -> String {
    if lower.starts_with("face_") {
        match first_matching(lower, EMOTION_KEYWORDS) {
            Some(emotion) if lower.contains("band") => format!("face_band_{emotion}"),
            Some(emotion) if lower.contains("idol") => format!("face_idol_{emotion}"),
            Some(emotion) => format!("face_{emotion}"),
            None => "face_other".to_string(),
        }
    } else {
        match first_matching(lower, EMOTION_KEYWORDS) {
            Some(emotion) => format!("expressions_{emotion}"),
            None => "expressions_other".to_string(),
        }
    }
}

fn group_body_motion(lower: &str) -> String {
    if let Some(keyword) = first_matching(lower, MOTION_KEYWORDS) {
        if lower.contains("adult") {
            return format!("adult_{keyword}");
        }
        if lower.contains("pose") {
            return "poses".to_string();
        }
        if lower.contains("nod") {
            return "nod".to_string();
        }
        if lower.contains("idle") {
            return "idle".to_string();
        }
        "body_motion".to_string()
    } else {
        match first_matching(lower, EMOTION_KEYWORDS) {
            Some(emotion) if lower.contains("adult") => format!("adult_{emotion}"),
            Some(emotion) => format!("body_{emotion}"),
            None => "body_other".to_string(),
        }
    }
}

fn group_mixed_motion(lower: &str) -> String {
    match first_matching(lower, EMOTION_KEYWORDS) {
        Some(emotion) => format!("mixed_{emotion}"),
        None => "mixed_motion".to_string(),
    }
}

fn group_unknown_motion(lower: &str) -> String {
    if lower.starts_with("face_") {
        return group_face_motion(lower);
    }
    if first_matching(lower, MOTION_KEYWORDS).is_some() {
        return group_body_motion(lower);
    }
    match first_matching(lower, EMOTION_KEYWORDS) {
        Some(emotion) if lower.contains("adult") => format!("adult_{emotion}"),
        Some(emotion) => format!("emotion_{emotion}"),
        None => "default".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn analysis(classification: MotionClassification) -> MotionAnalysis {
        MotionAnalysis {
            classification,
            face_param_count: 0,
            body_param_count: 0,
            affected_face_params: BTreeSet::new(),
            affected_body_params: BTreeSet::new(),
        }
    }

    #[test]
    fn face_prefixed_happy_motion_groups_by_emotion() {
        let group = classify_and_group("face_happy_01", &analysis(MotionClassification::Face));
        assert_eq!(group, "face_happy");
    }

    #[test]
    fn non_face_prefixed_facial_motion_goes_to_expressions() {
        let group = classify_and_group("smile_loop", &analysis(MotionClassification::Face));
        assert_eq!(group, "expressions_smile");
    }

    #[test]
    fn body_motion_with_idle_keyword_groups_to_idle() {
        let group = classify_and_group("idle_loop", &analysis(MotionClassification::Body));
        assert_eq!(group, "idle");
    }

    #[test]
    fn adult_tap_groups_as_adult_tap() {
        let group = classify_and_group("adult_tap_01", &analysis(MotionClassification::Body));
        assert_eq!(group, "adult_tap");
    }

    #[test]
    fn mixed_motion_without_emotion_keyword_falls_back() {
        let group = classify_and_group("combo_01", &analysis(MotionClassification::Mixed));
        assert_eq!(group, "mixed_motion");
    }

    #[test]
    fn unknown_classification_falls_back_to_name_based_rules() {
        let group = classify_and_group("face_surprise", &analysis(MotionClassification::Unknown));
        assert_eq!(group, "face_surprise");
    }
}
