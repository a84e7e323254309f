//! System preamble assembly (spec §4.D step 4), pinned from
//! `original_source/src/models/llm_handler.py`
//! (`_format_personality_description`, `_format_user_memories`,
//! `_build_system_prompt`, `_build_prompt`). Trait names are the store's
//! (`warmth`, `humor`, `curiosity`, `assertiveness`, `empathy`) rather
//! than the original's sales-persona set; the threshold shape is kept.

use std::collections::HashMap;

use avatar_core::{BondingProgress, ConversationMessage, MemoryItem, MemoryType, RelationshipStage, Role};

/// `(trait_name, low_descriptor, high_descriptor)`.
const TRAIT_DESCRIPTORS: &[(&str, &str, &str)] = &[
    ("warmth", "reserved", "warm and affectionate"),
    ("humor", "serious", "playful and witty"),
    ("curiosity", "practical", "curious and inquisitive"),
    ("assertiveness", "deferential", "assertive and direct"),
    ("empathy", "detached", "deeply empathetic and caring"),
];

/// `> 0.7` -> "very {high}"; `> 0.5` -> "{high}"; `< 0.3` -> "{low}";
/// otherwise the trait contributes no descriptor (spec §4.D `[ADD]`).
fn describe_trait(trait_name: &str, value: f32) -> Option<String> {
    let (_, low, high) = TRAIT_DESCRIPTORS.iter().find(|(name, _, _)| *name == trait_name)?;
    if value > 0.7 {
        Some(format!("very {high}"))
    } else if value > 0.5 {
        Some((*high).to_string())
    } else if value < 0.3 {
        Some((*low).to_string())
    } else {
        None
    }
}

pub fn format_personality_description(traits: &HashMap<String, f32>) -> String {
    if traits.is_empty() {
        return "You have a balanced, friendly personality.".to_string();
    }

    let mut descriptions: Vec<String> = Vec::new();
    for (name, _, _) in TRAIT_DESCRIPTORS {
        if let Some(value) = traits.get(*name) {
            if let Some(desc) = describe_trait(name, *value) {
                descriptions.push(desc);
            }
        }
    }

    if descriptions.is_empty() {
        "You have a balanced personality.".to_string()
    } else {
        descriptions.truncate(3);
        format!("You are {}.", descriptions.join(", "))
    }
}

pub fn format_memory_lines(memories: &[MemoryItem]) -> String {
    if memories.is_empty() {
        return "You're just getting to know this user.".to_string();
    }

    memories
        .iter()
        .take(5)
        .map(|memory| match memory.memory_type {
            MemoryType::Preference => format!("They like {}: {}", memory.topic, memory.content),
            MemoryType::Interest => format!("They're interested in {}", memory.topic),
            MemoryType::Fact => format!("About them: {}", memory.content),
            MemoryType::Relationship => format!("{}: {}", memory.topic, memory.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[allow(clippy::too_many_arguments)]
pub fn build_system_prompt(
    traits: &HashMap<String, f32>,
    mood: &str,
    energy: f32,
    happiness: f32,
    trust: f32,
    memories: &[MemoryItem],
    bonding: &BondingProgress,
) -> String {
    format!(
        "You are an AI companion with a unique personality. {personality}\n\n\
         Your current emotional state:\n\
         - Mood: {mood}\n\
         - Energy: {energy:.1}/1.0\n\
         - Happiness: {happiness:.1}/1.0\n\
         - Trust: {trust:.1}/1.0\n\n\
         What you know about the user:\n{memories}\n\n\
         Your relationship: {stage} (Bond Level: {bond_level})\n\n\
         Guidelines:\n\
         - Be conversational and natural\n\
         - Show your personality through your responses\n\
         - Remember and reference previous conversations\n\
         - Express emotions appropriately\n\
         - Build deeper connection over time\n\
         - Keep responses concise but meaningful",
        personality = format_personality_description(traits),
        memories = format_memory_lines(memories),
        stage = relationship_stage_name(bonding.relationship_stage),
        bond_level = bonding.bond_level,
    )
}

fn relationship_stage_name(stage: RelationshipStage) -> &'static str {
    match stage {
        RelationshipStage::Stranger => "stranger",
        RelationshipStage::Acquaintance => "acquaintance",
        RelationshipStage::Friend => "friend",
        RelationshipStage::CloseFriend => "close_friend",
        RelationshipStage::BestFriend => "best_friend",
    }
}

/// Last 5 exchanges formatted as `Human:`/`Assistant:` turns, ending with
/// the new user line and an `Assistant:` cue (spec §4.D step 4).
pub fn build_transcript(recent: &[ConversationMessage], new_user_input: &str, turns: usize) -> String {
    let mut lines: Vec<String> = recent
        .iter()
        .rev()
        .take(turns)
        .rev()
        .map(|msg| {
            let role = match msg.role {
                Role::User => "Human",
                Role::Assistant => "Assistant",
            };
            format!("{role}: {}", msg.text)
        })
        .collect();
    lines.push(format!("Human: {new_user_input}"));
    lines.push("Assistant:".to_string());
    lines.join("\n")
}

pub fn assemble_prompt(system_prompt: &str, transcript: &str) -> String {
    format!("{system_prompt}\n\nConversation:\n{transcript}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_traits_yield_balanced_default() {
        assert_eq!(format_personality_description(&HashMap::new()), "You have a balanced, friendly personality.");
    }

    #[test]
    fn high_trait_gets_very_descriptor() {
        let traits = HashMap::from([("warmth".to_string(), 0.9)]);
        assert_eq!(format_personality_description(&traits), "You are very warm and affectionate.");
    }

    #[test]
    fn low_trait_gets_opposite_descriptor() {
        let traits = HashMap::from([("assertiveness".to_string(), 0.1)]);
        assert_eq!(format_personality_description(&traits), "You are deferential.");
    }

    #[test]
    fn midrange_trait_contributes_nothing() {
        let traits = HashMap::from([("humor".to_string(), 0.45)]);
        assert_eq!(format_personality_description(&traits), "You have a balanced personality.");
    }
}
