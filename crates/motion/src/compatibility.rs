//! "Which groups may be played simultaneously?" (spec §4.E "Compatibility
//! plan").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What a single motion group touches, aggregated across every motion
/// assigned to it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupTouch {
    pub touches_face: bool,
    pub touches_body: bool,
}

impl GroupTouch {
    pub fn merge(&mut self, other: GroupTouch) {
        self.touches_face |= other.touches_face;
        self.touches_body |= other.touches_body;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationConflict {
    pub group_a: String,
    pub group_b: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationPair {
    pub group_a: String,
    pub group_b: String,
}

/// Distinguishes disjoint-category pairs from conflicting ones (spec
/// §4.E).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompatibilityPlan {
    pub face_only_groups: Vec<String>,
    pub body_only_groups: Vec<String>,
    pub mixed_groups: Vec<String>,
    pub safe_combinations: Vec<CombinationPair>,
    pub conflicting_combinations: Vec<CombinationConflict>,
}

/// Scans every pair of groups and reports a conflict if both touch the
/// same category (spec §4.E).
pub fn compute_compatibility_plan(groups: &BTreeMap<String, GroupTouch>) -> CompatibilityPlan {
    let mut plan = CompatibilityPlan::default();

    for (name, touch) in groups {
        match (touch.touches_face, touch.touches_body) {
            (true, true) => plan.mixed_groups.push(name.clone()),
            (true, false) => plan.face_only_groups.push(name.clone()),
            (false, true) => plan.body_only_groups.push(name.clone()),
            (false, false) => {}
        }
    }

    let names: Vec<&String> = groups.keys().collect();
    for i in 0..names.len() {
        for j in (i + 1)..names.len() {
            let a = names[i];
            let b = names[j];
            let touch_a = groups[a];
            let touch_b = groups[b];

            let face_conflict = touch_a.touches_face && touch_b.touches_face;
            let body_conflict = touch_a.touches_body && touch_b.touches_body;

            if face_conflict || body_conflict {
                let reason = match (face_conflict, body_conflict) {
                    (true, true) => "face,body".to_string(),
                    (true, false) => "face".to_string(),
                    (false, true) => "body".to_string(),
                    (false, false) => unreachable!(),
                };
                plan.conflicting_combinations.push(CombinationConflict {
                    group_a: a.clone(),
                    group_b: b.clone(),
                    reason,
                });
            } else {
                plan.safe_combinations.push(CombinationPair { group_a: a.clone(), group_b: b.clone() });
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(face: bool, body: bool) -> GroupTouch {
        GroupTouch { touches_face: face, touches_body: body }
    }

    #[test]
    fn seed_scenario_5_motion_conflict_detection() {
        // A: eyes only (facial). B: arms only (body). C: eyes+arms (mixed).
        let mut groups = BTreeMap::new();
        groups.insert("a".to_string(), touch(true, false));
        groups.insert("b".to_string(), touch(false, true));
        groups.insert("c".to_string(), touch(true, true));

        let plan = compute_compatibility_plan(&groups);
        assert_eq!(plan.face_only_groups, vec!["a".to_string()]);
        assert_eq!(plan.body_only_groups, vec!["b".to_string()]);
        assert_eq!(plan.mixed_groups, vec!["c".to_string()]);

        let safe: Vec<(String, String)> =
            plan.safe_combinations.iter().map(|p| (p.group_a.clone(), p.group_b.clone())).collect();
        assert!(safe.contains(&("a".to_string(), "b".to_string())));

        let conflicts: Vec<(String, String, String)> = plan
            .conflicting_combinations
            .iter()
            .map(|c| (c.group_a.clone(), c.group_b.clone(), c.reason.clone()))
            .collect();
        assert!(conflicts.iter().any(|(a, b, reason)| a == "a" && b == "c" && reason == "face"));
        assert!(conflicts.iter().any(|(a, b, reason)| a == "b" && b == "c" && reason == "body"));
    }
}
