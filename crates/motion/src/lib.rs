//! Live2D Motion Resolver (spec §4.E): parses motion files, classifies
//! them as facial/body/mixed, groups them by naming heuristic, and
//! computes a non-conflicting animation combination plan.

pub mod analysis;
pub mod compatibility;
mod error;
pub mod grouping;
pub mod manifest;

pub use analysis::{analyze_motion_json, MotionAnalysis, MotionClassification};
pub use compatibility::{CombinationConflict, CombinationPair, CompatibilityPlan, GroupTouch};
pub use error::MotionError;
pub use grouping::{classify_and_group, SMART_GROUPING_THRESHOLD};
pub use manifest::AvatarManifest;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tracing::warn;

/// Reads the raw bytes of a motion file given the manifest's `File`
/// reference, so the resolver stays decoupled from any particular
/// filesystem layout in tests.
pub trait MotionFileLoader: Send + Sync {
    fn load(&self, file_ref: &str) -> Result<String, MotionError>;
}

/// Reads motion files relative to `<data_dir>/live2d_models/<model_id>/`
/// (spec §6 filesystem layout).
pub struct FilesystemMotionLoader {
    model_root: PathBuf,
}

impl FilesystemMotionLoader {
    pub fn new(live2d_models_dir: &Path, model_id: &str) -> Self {
        Self { model_root: live2d_models_dir.join(model_id) }
    }
}

impl MotionFileLoader for FilesystemMotionLoader {
    fn load(&self, file_ref: &str) -> Result<String, MotionError> {
        let path = self.model_root.join(file_ref);
        std::fs::read_to_string(&path)
            .map_err(|e| MotionError::DecodeFailed(format!("{}: {e}", path.display())))
    }
}

/// A single resolved motion: its declared metadata plus its analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMotion {
    pub name: String,
    pub file: String,
    pub fade_in_time: f32,
    pub fade_out_time: f32,
    pub analysis: MotionAnalysis,
}

/// The full per-model output: grouped motions plus the compatibility
/// plan computed over those groups.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelMotionPlan {
    pub groups: BTreeMap<String, Vec<ResolvedMotion>>,
    pub compatibility: CompatibilityPlan,
}

impl ModelMotionPlan {
    pub fn group_names(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    pub fn total_motions(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Caches per-model plans copy-on-write: a refresh computes an entirely
/// new `Arc<ModelMotionPlan>` and swaps it in, so callers already holding
/// the previous plan keep reading a consistent snapshot (spec §5 "The
/// motion-analysis cache is copy-on-write per model").
#[derive(Default)]
pub struct MotionResolver {
    cache: DashMap<String, Arc<ModelMotionPlan>>,
}

impl MotionResolver {
    pub fn new() -> Self {
        Self { cache: DashMap::new() }
    }

    /// Returns the cached plan if present, otherwise computes and caches
    /// it (spec §5 "cold start lazily populates per-model analysis").
    pub fn resolve(
        &self,
        model_id: &str,
        manifest: &AvatarManifest,
        loader: &dyn MotionFileLoader,
    ) -> Arc<ModelMotionPlan> {
        if let Some(cached) = self.cache.get(model_id) {
            return cached.clone();
        }
        self.refresh(model_id, manifest, loader)
    }

    /// Forces recomputation regardless of cache state.
    pub fn refresh(
        &self,
        model_id: &str,
        manifest: &AvatarManifest,
        loader: &dyn MotionFileLoader,
    ) -> Arc<ModelMotionPlan> {
        let plan = Arc::new(build_plan(manifest, loader));
        self.cache.insert(model_id.to_string(), plan.clone());
        plan
    }

    pub fn cached(&self, model_id: &str) -> Option<Arc<ModelMotionPlan>> {
        self.cache.get(model_id).map(|entry| entry.clone())
    }
}

fn build_plan(manifest: &AvatarManifest, loader: &dyn MotionFileLoader) -> ModelMotionPlan {
    let mut groups: BTreeMap<String, Vec<ResolvedMotion>> = BTreeMap::new();

    // Models that declare more than SMART_GROUPING_THRESHOLD ungrouped
    // motions receive smart grouping; models with fewer use their
    // declared groups verbatim (spec §4.E).
    let smart_grouping = manifest.declared.len() > SMART_GROUPING_THRESHOLD;

    for (declared_name, motions) in &manifest.declared {
        for motion in motions {
            let analysis = analyze_file(loader, &motion.file);
            let group = if smart_grouping {
                classify_and_group(declared_name, &analysis)
            } else {
                declared_name.clone()
            };
            groups.entry(group).or_default().push(ResolvedMotion {
                name: motion.name.clone(),
                file: motion.file.clone(),
                fade_in_time: motion.fade_in_time,
                fade_out_time: motion.fade_out_time,
                analysis,
            });
        }
    }

    let touches: BTreeMap<String, GroupTouch> = groups
        .iter()
        .map(|(name, motions)| {
            let mut touch = GroupTouch::default();
            for motion in motions {
                touch.merge(GroupTouch {
                    touches_face: motion.analysis.touches_face(),
                    touches_body: motion.analysis.touches_body(),
                });
            }
            (name.clone(), touch)
        })
        .collect();

    let compatibility = compatibility::compute_compatibility_plan(&touches);
    ModelMotionPlan { groups, compatibility }
}

/// A motion file that fails to load or parse is analyzed as `unknown`
/// rather than failing the whole resolve (mirrors the original's
/// broad `except` around `analyze_motion_type`).
fn analyze_file(loader: &dyn MotionFileLoader, file_ref: &str) -> MotionAnalysis {
    match loader.load(file_ref) {
        Ok(json) => analyze_motion_json(&json).unwrap_or_else(|e| {
            warn!("motion file {file_ref} failed to parse: {e}");
            MotionAnalysis::unknown()
        }),
        Err(e) => {
            warn!("motion file {file_ref} unavailable: {e}");
            MotionAnalysis::unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct InMemoryLoader {
        files: HashMap<String, String>,
    }

    impl MotionFileLoader for InMemoryLoader {
        fn load(&self, file_ref: &str) -> Result<String, MotionError> {
            self.files
                .get(file_ref)
                .cloned()
                .ok_or_else(|| MotionError::DecodeFailed(format!("no such file: {file_ref}")))
        }
    }

    fn motion_json(curve_ids: &[&str]) -> String {
        let curves: Vec<_> = curve_ids.iter().map(|id| serde_json::json!({"Id": id})).collect();
        serde_json::json!({ "Curves": curves }).to_string()
    }

    #[test]
    fn declared_groups_are_kept_verbatim_under_threshold() {
        let manifest_json = r#"{
            "FileReferences": {
                "Motions": {
                    "idle": [{"File": "idle_01.motion3.json"}],
                    "tap": [{"File": "tap_01.motion3.json"}]
                }
            }
        }"#;
        let manifest = AvatarManifest::parse(manifest_json).unwrap();
        let loader = InMemoryLoader {
            files: HashMap::from([
                ("idle_01.motion3.json".to_string(), motion_json(&["ParamBreath"])),
                ("tap_01.motion3.json".to_string(), motion_json(&["ParamArmLA"])),
            ]),
        };

        let resolver = MotionResolver::new();
        let plan = resolver.resolve("model-a", &manifest, &loader);
        assert_eq!(plan.group_names(), vec!["idle".to_string(), "tap".to_string()]);
    }

    #[test]
    fn resolve_caches_and_refresh_recomputes() {
        let manifest_json = r#"{
            "FileReferences": { "Motions": { "idle": [{"File": "idle_01.motion3.json"}] } }
        }"#;
        let manifest = AvatarManifest::parse(manifest_json).unwrap();
        let loader = InMemoryLoader {
            files: HashMap::from([("idle_01.motion3.json".to_string(), motion_json(&["ParamBreath"]))]),
        };

        let resolver = MotionResolver::new();
        let first = resolver.resolve("model-a", &manifest, &loader);
        let second = resolver.resolve("model-a", &manifest, &loader);
        assert!(Arc::ptr_eq(&first, &second));

        let refreshed = resolver.refresh("model-a", &manifest, &loader);
        assert!(!Arc::ptr_eq(&first, &refreshed));
    }

    #[test]
    fn missing_motion_file_degrades_to_unknown_instead_of_failing() {
        let manifest_json = r#"{
            "FileReferences": { "Motions": { "ghost": [{"File": "missing.motion3.json"}] } }
        }"#;
        let manifest = AvatarManifest::parse(manifest_json).unwrap();
        let loader = InMemoryLoader { files: HashMap::new() };

        let resolver = MotionResolver::new();
        let plan = resolver.resolve("model-a", &manifest, &loader);
        assert_eq!(plan.groups["ghost"][0].analysis.classification, MotionClassification::Unknown);
    }
}
