//! Shared data model (spec §3).
//!
//! Every record here is isolated by an [`crate::key::InteractionKey`] — the
//! store never returns or mutates a record for one (user, model) pair using
//! another pair's key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::InteractionKey;

/// A registered chat user. Distinct from `InteractionKey::user_id` only in
/// that it carries profile fields beyond the bare id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A Live2D avatar model identity. `model_id` is the other half of every
/// [`InteractionKey`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarModel {
    pub model_id: String,
    pub display_name: String,
    pub motion_config_path: String,
}

/// Speaker turn in a conversation, persisted for context assembly and
/// later summarization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub key: KeyFields,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub detected_emotion: Option<String>,
    pub response_latency_ms: Option<u64>,
}

/// Memory classification (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryType {
    Preference,
    Fact,
    Interest,
    Relationship,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    pub id: String,
    pub key: KeyFields,
    pub memory_type: MemoryType,
    pub topic: String,
    pub content: String,
    pub importance: f32,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
}

/// One personality trait's current value, independently adjustable and
/// independently decaying back toward `base_value` (spec §4.D / §8).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityState {
    pub key: KeyFields,
    pub trait_name: String,
    pub base_value: f32,
    pub current_value: f32,
    pub last_reason: Option<String>,
}

/// Named relationship tiers a bond progresses through as `xp` accrues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipStage {
    Stranger,
    Acquaintance,
    Friend,
    CloseFriend,
    BestFriend,
}

impl RelationshipStage {
    /// Stage thresholds on `bond_level` per spec §3: `<=2` stranger, `<=5`
    /// acquaintance, `<=10` friend, `<=20` close_friend, else best_friend.
    pub fn from_bond_level(bond_level: u32) -> Self {
        match bond_level {
            0..=2 => Self::Stranger,
            3..=5 => Self::Acquaintance,
            6..=10 => Self::Friend,
            11..=20 => Self::CloseFriend,
            _ => Self::BestFriend,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondingProgress {
    pub key: KeyFields,
    pub xp: u32,
    pub bond_level: u32,
    pub relationship_stage: RelationshipStage,
    pub trust: f32,
    pub affection: f32,
}

impl BondingProgress {
    /// `bond_level = floor(xp / 100) + 1`, per spec §8.
    pub fn bond_level_for_xp(xp: u32) -> u32 {
        xp / 100 + 1
    }
}

/// Transient affective state layered on top of the slower-moving
/// [`PersonalityState`] (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    pub key: KeyFields,
    pub mood: String,
    pub energy: f32,
    pub happiness: f32,
    pub stress: f32,
}

/// The serializable half of an [`InteractionKey`], used on entity structs so
/// they can round-trip through SQLite/JSON without depending on the
/// fallible constructor. Construct an [`InteractionKey`] from this when the
/// invariant needs re-checking at a trust boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyFields {
    pub user_id: String,
    pub model_id: String,
}

impl From<&InteractionKey> for KeyFields {
    fn from(key: &InteractionKey) -> Self {
        Self {
            user_id: key.user_id().to_string(),
            model_id: key.model_id().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_stage_thresholds() {
        assert_eq!(RelationshipStage::from_bond_level(2), RelationshipStage::Stranger);
        assert_eq!(RelationshipStage::from_bond_level(5), RelationshipStage::Acquaintance);
        assert_eq!(RelationshipStage::from_bond_level(10), RelationshipStage::Friend);
        assert_eq!(RelationshipStage::from_bond_level(20), RelationshipStage::CloseFriend);
        assert_eq!(RelationshipStage::from_bond_level(21), RelationshipStage::BestFriend);
    }

    #[test]
    fn bonding_progression_scenario() {
        // Seed scenario 3: grant_experience(50) x10 => xp=500, bond_level=6, stage=friend.
        let xp = 50 * 10;
        let level = BondingProgress::bond_level_for_xp(xp);
        assert_eq!(level, 6);
        assert_eq!(RelationshipStage::from_bond_level(level), RelationshipStage::Friend);
    }

    #[test]
    fn bond_level_formula() {
        assert_eq!(BondingProgress::bond_level_for_xp(0), 1);
        assert_eq!(BondingProgress::bond_level_for_xp(99), 1);
        assert_eq!(BondingProgress::bond_level_for_xp(100), 2);
        assert_eq!(BondingProgress::bond_level_for_xp(250), 3);
    }
}
