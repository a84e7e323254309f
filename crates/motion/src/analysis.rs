//! Motion file parsing and facial/body classification (spec §4.E), pinned
//! verbatim from `original_source/routes/app_routes_live2d.py`
//! (`analyze_motion_type`) where spec.md names the rule but not the exact
//! keyword lists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::MotionError;

/// Substrings that mark a curve id as touching a facial parameter.
const FACIAL_INDICATORS: &[&str] = &[
    "eye", "brow", "mouth", "tere", "tear", "sweat", "rage", "parameye", "parambrow",
    "parammouth", "paramteary",
];

/// Substrings that mark a curve id as touching a body parameter.
const BODY_INDICATORS: &[&str] = &[
    "body_angle", "arm", "breath", "hair", "position", "rotation", "paramposition",
    "paramrotation", "paramarm", "parambreath",
];

/// The `*.motion3.json` document shape the resolver reads: only the
/// `Curves[*].Id` field is used (spec §6 "Motion file format").
#[derive(Debug, Clone, Deserialize)]
struct MotionFile {
    #[serde(rename = "Curves", default)]
    curves: Vec<MotionCurve>,
}

#[derive(Debug, Clone, Deserialize)]
struct MotionCurve {
    #[serde(rename = "Id", default)]
    id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MotionClassification {
    Face,
    Body,
    Mixed,
    Unknown,
}

/// Per-motion analysis summary (spec §3 "Motion Metadata").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionAnalysis {
    pub classification: MotionClassification,
    pub face_param_count: usize,
    pub body_param_count: usize,
    pub affected_face_params: BTreeSet<String>,
    pub affected_body_params: BTreeSet<String>,
}

impl MotionAnalysis {
    pub fn unknown() -> Self {
        Self {
            classification: MotionClassification::Unknown,
            face_param_count: 0,
            body_param_count: 0,
            affected_face_params: BTreeSet::new(),
            affected_body_params: BTreeSet::new(),
        }
    }

    pub fn touches_face(&self) -> bool {
        self.face_param_count > 0
    }

    pub fn touches_body(&self) -> bool {
        self.body_param_count > 0
    }
}

/// Parses a `*.motion3.json` document and classifies it. A pure function
/// of the `Curves[*].Id` multiset (spec §8 "Motion classification
/// determinism").
pub fn analyze_motion_json(json: &str) -> Result<MotionAnalysis, MotionError> {
    let motion_file: MotionFile =
        serde_json::from_str(json).map_err(|e| MotionError::DecodeFailed(e.to_string()))?;
    Ok(classify_curves(motion_file.curves.iter().map(|c| c.id.as_str())))
}

fn classify_curves<'a>(curve_ids: impl Iterator<Item = &'a str>) -> MotionAnalysis {
    let mut face_params = BTreeSet::new();
    let mut body_params = BTreeSet::new();

    for id in curve_ids {
        let lower = id.to_lowercase();
        if FACIAL_INDICATORS.iter().any(|ind| lower.contains(ind)) {
            face_params.insert(lower);
        } else if BODY_INDICATORS.iter().any(|ind| lower.contains(ind)) {
            body_params.insert(lower);
        }
    }

    let face_count = face_params.len();
    let body_count = body_params.len();

    let classification = if face_count == 0 && body_count == 0 {
        MotionClassification::Unknown
    } else if face_count > body_count * 2 {
        MotionClassification::Face
    } else if body_count > face_count * 2 {
        MotionClassification::Body
    } else {
        MotionClassification::Mixed
    };

    MotionAnalysis {
        classification,
        face_param_count: face_count,
        body_param_count: body_count,
        affected_face_params: face_params,
        affected_body_params: body_params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn motion_json(curve_ids: &[&str]) -> String {
        let curves: Vec<_> = curve_ids.iter().map(|id| serde_json::json!({"Id": id})).collect();
        serde_json::json!({ "Curves": curves }).to_string()
    }

    #[test]
    fn classifies_pure_face_motion() {
        let json = motion_json(&["ParamEyeLOpen", "ParamBrowLY", "ParamMouthOpenY"]);
        let analysis = analyze_motion_json(&json).unwrap();
        assert_eq!(analysis.classification, MotionClassification::Face);
        assert!(analysis.face_param_count > 0);
        assert_eq!(analysis.body_param_count, 0);
    }

    #[test]
    fn classifies_pure_body_motion() {
        let json = motion_json(&["ParamArmLA", "ParamBodyAngleX", "ParamBreath"]);
        let analysis = analyze_motion_json(&json).unwrap();
        assert_eq!(analysis.classification, MotionClassification::Body);
    }

    #[test]
    fn classifies_mixed_motion_with_comparable_magnitudes() {
        let json = motion_json(&["ParamEyeLOpen", "ParamArmLA"]);
        let analysis = analyze_motion_json(&json).unwrap();
        assert_eq!(analysis.classification, MotionClassification::Mixed);
    }

    #[test]
    fn classifies_unknown_when_no_indicator_matches() {
        let json = motion_json(&["ParamAngleX", "ParamAngleY"]);
        let analysis = analyze_motion_json(&json).unwrap();
        assert_eq!(analysis.classification, MotionClassification::Unknown);
    }

    #[test]
    fn classification_is_deterministic_over_curve_order() {
        let forward = motion_json(&["ParamEyeLOpen", "ParamBrowLY", "ParamArmLA"]);
        let reversed = motion_json(&["ParamArmLA", "ParamBrowLY", "ParamEyeLOpen"]);
        assert_eq!(analyze_motion_json(&forward).unwrap(), analyze_motion_json(&reversed).unwrap());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(analyze_motion_json("not json").is_err());
    }
}
