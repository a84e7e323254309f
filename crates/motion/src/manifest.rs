//! Avatar manifest parsing (spec §6 "Avatar manifest").

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::MotionError;

#[derive(Debug, Clone, Deserialize)]
struct RawManifest {
    #[serde(rename = "FileReferences")]
    file_references: FileReferences,
}

#[derive(Debug, Clone, Deserialize)]
struct FileReferences {
    #[serde(rename = "Motions")]
    motions: BTreeMap<String, Vec<RawMotionEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMotionEntry {
    #[serde(rename = "File")]
    file: String,
    #[serde(rename = "FadeInTime", default = "default_fade")]
    fade_in_time: f32,
    #[serde(rename = "FadeOutTime", default = "default_fade")]
    fade_out_time: f32,
}

fn default_fade() -> f32 {
    0.5
}

/// One declared motion reference, prior to file analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredMotion {
    pub name: String,
    pub file: String,
    pub fade_in_time: f32,
    pub fade_out_time: f32,
}

/// The parsed `FileReferences.Motions` section. Either a map of
/// groups -> motion lists, or (for "ungrouped" models) a flat map of
/// names -> single-element lists (spec §6).
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarManifest {
    pub declared: BTreeMap<String, Vec<DeclaredMotion>>,
}

impl AvatarManifest {
    pub fn parse(json: &str) -> Result<Self, MotionError> {
        let raw: RawManifest =
            serde_json::from_str(json).map_err(|e| MotionError::InvalidManifest(e.to_string()))?;

        let mut declared = BTreeMap::new();
        for (key, entries) in raw.file_references.motions {
            let group = if key.trim().is_empty() { "default".to_string() } else { key };
            let motions = entries
                .into_iter()
                .enumerate()
                .map(|(i, entry)| DeclaredMotion {
                    name: motion_name_from_file(&entry.file, &group, i),
                    file: entry.file,
                    fade_in_time: entry.fade_in_time,
                    fade_out_time: entry.fade_out_time,
                })
                .collect();
            declared.insert(group, motions);
        }
        Ok(Self { declared })
    }

    /// Total declared motion count across every top-level key, used to
    /// decide whether smart grouping applies (spec §4.E).
    pub fn declared_motion_count(&self) -> usize {
        self.declared.values().map(Vec::len).sum()
    }
}

fn motion_name_from_file(file: &str, group: &str, index: usize) -> String {
    if file.is_empty() {
        return format!("{group}_{index:02}");
    }
    file.rsplit('/').next().unwrap_or(file).trim_end_matches(".motion3.json").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_grouped_manifest() {
        let json = r#"{
            "FileReferences": {
                "Motions": {
                    "idle": [{"File": "motions/idle_01.motion3.json", "FadeInTime": 0.3, "FadeOutTime": 0.3}]
                }
            }
        }"#;
        let manifest = AvatarManifest::parse(json).unwrap();
        assert_eq!(manifest.declared["idle"][0].name, "idle_01");
        assert_eq!(manifest.declared_motion_count(), 1);
    }

    #[test]
    fn parses_flat_ungrouped_manifest() {
        let json = r#"{
            "FileReferences": {
                "Motions": {
                    "face_happy_01": [{"File": "motions/face_happy_01.motion3.json"}],
                    "face_sad_01": [{"File": "motions/face_sad_01.motion3.json"}]
                }
            }
        }"#;
        let manifest = AvatarManifest::parse(json).unwrap();
        assert_eq!(manifest.declared_motion_count(), 2);
    }
}
