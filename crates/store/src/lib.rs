//! Memory & Personality Store (spec §4.C).
//!
//! Backed by eight embedded SQLite databases, one per named store in the
//! filesystem layout (spec §6). Every public operation takes a full
//! [`InteractionKey`]; the key's own constructor is the only place
//! `InvalidKey` can originate, so every store method that accepts one is
//! guaranteed isolation-safe by construction.

mod db;
mod error;
mod importance;
mod schema;

pub use error::StoreError;

use std::collections::HashMap;
use std::path::Path;

use avatar_core::{
    analyze_emotional_tone, BondingProgress, ConversationMessage, EmotionalTone, InteractionKey,
    KeyFields, MemoryItem, MemoryType, PersonalityState, Role,
};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;
use uuid::Uuid;

/// Default trait template applied when a (user, model) pair has never
/// adapted away from the model's baseline.
const DEFAULT_PERSONALITY_TEMPLATE: &[(&str, f32)] = &[
    ("warmth", 0.6),
    ("humor", 0.5),
    ("curiosity", 0.6),
    ("assertiveness", 0.4),
    ("empathy", 0.7),
];

#[derive(Debug, Clone, PartialEq)]
struct CacheEntry {
    text: String,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// A derived, periodically-computed digest of recent conversation (spec
/// §3 `[ADD]`, from `original_source`'s `create_conversation_summary`).
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub summary_text: String,
    pub key_topics: Vec<String>,
    pub emotional_tone: EmotionalTone,
}

/// The Memory & Personality Store.
pub struct Store {
    conversations: Mutex<Connection>,
    personality: Mutex<Connection>,
    #[allow(dead_code)]
    live2d: Mutex<Connection>,
    #[allow(dead_code)]
    system: Mutex<Connection>,
    #[allow(dead_code)]
    users: Mutex<Connection>,
    #[allow(dead_code)]
    user_profiles: Mutex<Connection>,
    #[allow(dead_code)]
    user_sessions: Mutex<Connection>,
    app_state: Mutex<Connection>,
    /// Hot path for `cached_response`; `app_state.llm_cache` backs it so a
    /// restart doesn't lose entries (spec §4.C `[ADD]`).
    llm_cache: DashMap<(String, String), CacheEntry>,
}

impl Store {
    /// Open (or create) all eight named databases under
    /// `<data_dir>/databases/`.
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            conversations: db::open_named(data_dir, "conversations", schema::CONVERSATIONS_SCHEMA)?,
            personality: db::open_named(data_dir, "personality", schema::PERSONALITY_SCHEMA)?,
            live2d: db::open_named(data_dir, "live2d", schema::LIVE2D_SCHEMA)?,
            system: db::open_named(data_dir, "system", schema::SYSTEM_SCHEMA)?,
            users: db::open_named(data_dir, "users", schema::USERS_SCHEMA)?,
            user_profiles: db::open_named(data_dir, "user_profiles", schema::USER_PROFILES_SCHEMA)?,
            user_sessions: db::open_named(data_dir, "user_sessions", schema::USER_SESSIONS_SCHEMA)?,
            app_state: db::open_named(data_dir, "app_state", schema::APP_STATE_SCHEMA)?,
            llm_cache: DashMap::new(),
        })
    }

    // ---- Conversation messages -------------------------------------------------

    #[instrument(skip(self, text))]
    pub fn append_message(
        &self,
        key: &InteractionKey,
        role: Role,
        text: &str,
        emotion: Option<&str>,
        latency_ms: Option<u64>,
    ) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        let role_str = match role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        let conn = self.conversations.lock();
        conn.execute(
            "INSERT INTO conversation_messages
             (id, user_id, model_id, role, text, detected_emotion, response_latency_ms, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id,
                key.user_id(),
                key.model_id(),
                role_str,
                text,
                emotion,
                latency_ms.map(|v| v as i64),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(id)
    }

    /// Chronologically ordered, newest last (spec §4.C).
    pub fn recent_messages(&self, key: &InteractionKey, limit: usize) -> Result<Vec<ConversationMessage>, StoreError> {
        let conn = self.conversations.lock();
        let mut stmt = conn.prepare(
            "SELECT role, text, detected_emotion, response_latency_ms, created_at
             FROM conversation_messages
             WHERE user_id = ?1 AND model_id = ?2
             ORDER BY created_at DESC
             LIMIT ?3",
        )?;
        let key_fields = KeyFields::from(key);
        let mut rows = stmt
            .query_map(params![key.user_id(), key.model_id(), limit as i64], |row| {
                let role_str: String = row.get(0)?;
                Ok(ConversationMessage {
                    key: key_fields.clone(),
                    role: if role_str == "assistant" { Role::Assistant } else { Role::User },
                    text: row.get(1)?,
                    timestamp: parse_timestamp(row.get::<_, String>(4)?),
                    detected_emotion: row.get(2)?,
                    response_latency_ms: row.get::<_, Option<i64>>(3)?.map(|v| v as u64),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.reverse(); // oldest first, newest last
        Ok(rows)
    }

    pub fn put_session_context(
        &self,
        key: &InteractionKey,
        session_id: &str,
        messages: &[ConversationMessage],
    ) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(messages)?;
        let conn = self.conversations.lock();
        conn.execute(
            "INSERT INTO session_context (user_id, model_id, session_id, messages, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, model_id, session_id) DO UPDATE SET messages = excluded.messages,
                updated_at = excluded.updated_at",
            params![key.user_id(), key.model_id(), session_id, serialized, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_session_context(
        &self,
        key: &InteractionKey,
        session_id: &str,
    ) -> Result<Vec<ConversationMessage>, StoreError> {
        let conn = self.conversations.lock();
        let messages_json: Option<String> = conn
            .query_row(
                "SELECT messages FROM session_context WHERE user_id = ?1 AND model_id = ?2 AND session_id = ?3",
                params![key.user_id(), key.model_id(), session_id],
                |row| row.get(0),
            )
            .optional()?;
        match messages_json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    // ---- Memory ------------------------------------------------------------

    #[instrument(skip(self, content))]
    pub fn add_memory(
        &self,
        key: &InteractionKey,
        memory_type: MemoryType,
        topic: Option<&str>,
        content: &str,
        importance_hint: &str,
    ) -> Result<String, StoreError> {
        let base = importance::hint_to_base_score(importance_hint);
        let importance = importance::score_importance(base, content);
        let topic = topic
            .map(|t| t.to_string())
            .unwrap_or_else(|| importance::extract_topic(content));
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let conn = self.personality.lock();
        conn.execute(
            "INSERT INTO memory_items
             (id, user_id, model_id, memory_type, topic, content, importance, created_at, last_accessed, access_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)",
            params![
                id,
                key.user_id(),
                key.model_id(),
                memory_type_str(memory_type),
                topic,
                content,
                importance,
                now,
                now,
            ],
        )?;
        Ok(id)
    }

    /// Each returned memory's `access_count` is incremented and
    /// `last_accessed` set to now (spec §4.C), and an audit row recorded
    /// (spec §3 `[ADD]`).
    pub fn memories_by_topic(&self, key: &InteractionKey, topic_substring: &str) -> Result<Vec<MemoryItem>, StoreError> {
        let conn = self.personality.lock();
        let pattern = format!("%{}%", topic_substring.to_lowercase());
        let mut stmt = conn.prepare(
            "SELECT id, memory_type, topic, content, importance, created_at, last_accessed, access_count
             FROM memory_items
             WHERE user_id = ?1 AND model_id = ?2 AND LOWER(topic) LIKE ?3",
        )?;
        let key_fields = KeyFields::from(key);
        let items = stmt
            .query_map(params![key.user_id(), key.model_id(), pattern], |row| {
                row_to_memory_item(row, &key_fields)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let now = Utc::now().to_rfc3339();
        for item in &items {
            conn.execute(
                "UPDATE memory_items SET access_count = access_count + 1, last_accessed = ?1 WHERE id = ?2",
                params![now, item.id],
            )?;
            conn.execute(
                "INSERT INTO memory_audit (id, user_id, model_id, memory_id, accessed_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![Uuid::new_v4().to_string(), key.user_id(), key.model_id(), item.id, now],
            )?;
        }
        Ok(items)
    }

    /// Ordered by `(importance, access_count)` desc (spec §4.C).
    pub fn top_important_memories(&self, key: &InteractionKey, limit: usize) -> Result<Vec<MemoryItem>, StoreError> {
        let conn = self.personality.lock();
        let mut stmt = conn.prepare(
            "SELECT id, memory_type, topic, content, importance, created_at, last_accessed, access_count
             FROM memory_items
             WHERE user_id = ?1 AND model_id = ?2
             ORDER BY importance DESC, access_count DESC
             LIMIT ?3",
        )?;
        let key_fields = KeyFields::from(key);
        let items = stmt
            .query_map(params![key.user_id(), key.model_id(), limit as i64], |row| {
                row_to_memory_item(row, &key_fields)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Deletes memories older than `older_than_days` AND below
    /// `min_importance`. Never invoked implicitly during a hot path (spec
    /// §4.C).
    pub fn cleanup(&self, key: &InteractionKey, older_than_days: i64, min_importance: f32) -> Result<usize, StoreError> {
        let cutoff = (Utc::now() - ChronoDuration::days(older_than_days)).to_rfc3339();
        let conn = self.personality.lock();
        let deleted = conn.execute(
            "DELETE FROM memory_items
             WHERE user_id = ?1 AND model_id = ?2 AND created_at < ?3 AND importance < ?4",
            params![key.user_id(), key.model_id(), cutoff, min_importance],
        )?;
        Ok(deleted)
    }

    // ---- Personality ---------------------------------------------------------

    pub fn personality(&self, key: &InteractionKey) -> Result<HashMap<String, f32>, StoreError> {
        let conn = self.personality.lock();
        let mut stmt = conn.prepare(
            "SELECT trait_name, current_value FROM personality_state WHERE user_id = ?1 AND model_id = ?2",
        )?;
        let rows: HashMap<String, f32> = stmt
            .query_map(params![key.user_id(), key.model_id()], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<_, _>>()?;
        if rows.is_empty() {
            Ok(DEFAULT_PERSONALITY_TEMPLATE.iter().map(|(k, v)| (k.to_string(), *v)).collect())
        } else {
            Ok(rows)
        }
    }

    /// Clamped to `[0,1]`; logs a personality-interaction record with the
    /// signed delta (spec §4.C, §8 trait-clamping property).
    #[instrument(skip(self, reason))]
    pub fn adapt_trait(
        &self,
        key: &InteractionKey,
        trait_name: &str,
        new_value: f32,
        reason: Option<&str>,
    ) -> Result<PersonalityState, StoreError> {
        let clamped = new_value.clamp(0.0, 1.0);
        let conn = self.personality.lock();

        let existing: Option<(f32, f32)> = conn
            .query_row(
                "SELECT base_value, current_value FROM personality_state
                 WHERE user_id = ?1 AND model_id = ?2 AND trait_name = ?3",
                params![key.user_id(), key.model_id(), trait_name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (base_value, old_value) = existing.unwrap_or((
            DEFAULT_PERSONALITY_TEMPLATE
                .iter()
                .find(|(name, _)| *name == trait_name)
                .map(|(_, v)| *v)
                .unwrap_or(0.5),
            DEFAULT_PERSONALITY_TEMPLATE
                .iter()
                .find(|(name, _)| *name == trait_name)
                .map(|(_, v)| *v)
                .unwrap_or(0.5),
        ));
        let delta = clamped - old_value;

        conn.execute(
            "INSERT INTO personality_state (user_id, model_id, trait_name, base_value, current_value, last_reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, model_id, trait_name) DO UPDATE SET
                current_value = excluded.current_value, last_reason = excluded.last_reason",
            params![key.user_id(), key.model_id(), trait_name, base_value, clamped, reason],
        )?;
        conn.execute(
            "INSERT INTO personality_log (id, user_id, model_id, trait_name, reason, delta, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Uuid::new_v4().to_string(),
                key.user_id(),
                key.model_id(),
                trait_name,
                reason,
                delta,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(PersonalityState {
            key: KeyFields::from(key),
            trait_name: trait_name.to_string(),
            base_value,
            current_value: clamped,
            last_reason: reason.map(str::to_string),
        })
    }

    // ---- Bonding ---------------------------------------------------------

    /// Creates a default row if missing: `bond_level=1, xp=0, stranger,
    /// trust=affection=0.5` (spec §4.C).
    pub fn bonding(&self, key: &InteractionKey) -> Result<BondingProgress, StoreError> {
        let conn = self.personality.lock();
        let existing = read_bonding(&conn, key)?;
        match existing {
            Some(progress) => Ok(progress),
            None => {
                let progress = default_bonding(key);
                write_bonding(&conn, &progress)?;
                Ok(progress)
            }
        }
    }

    /// Adds XP, recomputes `bond_level`/`relationship_stage`, and nudges
    /// trust/affection by `min(1.0, current + 0.01 * xp_gain)` (spec §4.C).
    #[instrument(skip(self))]
    pub fn grant_experience(&self, key: &InteractionKey, xp_gain: u32) -> Result<BondingProgress, StoreError> {
        let conn = self.personality.lock();
        let mut progress = read_bonding(&conn, key)?.unwrap_or_else(|| default_bonding(key));

        progress.xp += xp_gain;
        progress.bond_level = BondingProgress::bond_level_for_xp(progress.xp);
        progress.relationship_stage =
            avatar_core::RelationshipStage::from_bond_level(progress.bond_level);
        progress.trust = (progress.trust + 0.01 * xp_gain as f32).min(1.0);
        progress.affection = (progress.affection + 0.01 * xp_gain as f32).min(1.0);

        write_bonding(&conn, &progress)?;

        if avatar_core::RelationshipStage::from_bond_level(progress.bond_level) != progress.relationship_stage {
            return Err(StoreError::InvariantViolation(
                "relationship_stage disagrees with bond_level after update".to_string(),
            ));
        }
        Ok(progress)
    }

    // ---- Avatar state ------------------------------------------------------

    pub fn avatar_state(&self, key: &InteractionKey) -> Result<avatar_core::AvatarState, StoreError> {
        let conn = self.app_state.lock();
        let row = conn
            .query_row(
                "SELECT mood, energy, happiness, stress FROM avatar_state WHERE user_id = ?1 AND model_id = ?2",
                params![key.user_id(), key.model_id()],
                |row| {
                    Ok(avatar_core::AvatarState {
                        key: KeyFields::from(key),
                        mood: row.get(0)?,
                        energy: row.get(1)?,
                        happiness: row.get(2)?,
                        stress: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row.unwrap_or(avatar_core::AvatarState {
            key: KeyFields::from(key),
            mood: "neutral".to_string(),
            energy: 0.5,
            happiness: 0.5,
            stress: 0.2,
        }))
    }

    pub fn update_avatar_state(
        &self,
        key: &InteractionKey,
        mood: Option<&str>,
        energy: Option<f32>,
        happiness: Option<f32>,
        stress: Option<f32>,
    ) -> Result<avatar_core::AvatarState, StoreError> {
        let mut state = self.avatar_state(key)?;
        if let Some(m) = mood {
            state.mood = m.to_string();
        }
        if let Some(e) = energy {
            state.energy = e.clamp(0.0, 1.0);
        }
        if let Some(h) = happiness {
            state.happiness = h.clamp(0.0, 1.0);
        }
        if let Some(s) = stress {
            state.stress = s.clamp(0.0, 1.0);
        }

        let conn = self.app_state.lock();
        conn.execute(
            "INSERT INTO avatar_state (user_id, model_id, mood, energy, happiness, stress)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(user_id, model_id) DO UPDATE SET
                mood = excluded.mood, energy = excluded.energy,
                happiness = excluded.happiness, stress = excluded.stress",
            params![key.user_id(), key.model_id(), state.mood, state.energy, state.happiness, state.stress],
        )?;
        Ok(state)
    }

    // ---- LLM response cache --------------------------------------------------

    /// In-memory first (never blocks on disk for reads), persisted to
    /// `app_state` lazily so a restart doesn't lose hot entries (spec §4.C
    /// `[ADD]`).
    pub fn cache_response(
        &self,
        prompt_fingerprint: &str,
        text: &str,
        model_id: &str,
        temperature: f32,
        ttl: std::time::Duration,
    ) -> Result<(), StoreError> {
        let now = Utc::now();
        let expires_at = now + ChronoDuration::from_std(ttl).unwrap_or(ChronoDuration::hours(24));
        let entry = CacheEntry {
            text: text.to_string(),
            cached_at: now,
            expires_at,
        };
        self.llm_cache
            .insert((prompt_fingerprint.to_string(), model_id.to_string()), entry);

        let conn = self.app_state.lock();
        conn.execute(
            "INSERT INTO llm_cache (fingerprint, model_id, text, temperature, cached_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(fingerprint, model_id) DO UPDATE SET
                text = excluded.text, temperature = excluded.temperature,
                cached_at = excluded.cached_at, expires_at = excluded.expires_at",
            params![prompt_fingerprint, model_id, text, temperature, now.to_rfc3339(), expires_at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// `(prompt_fingerprint, model_id)` only — never cross-reads across
    /// models (spec §4.C isolation invariant).
    pub fn cached_response(&self, prompt_fingerprint: &str, model_id: &str) -> Result<Option<String>, StoreError> {
        let cache_key = (prompt_fingerprint.to_string(), model_id.to_string());
        if let Some(entry) = self.llm_cache.get(&cache_key) {
            if Utc::now() < entry.expires_at {
                return Ok(Some(entry.text.clone()));
            }
            drop(entry);
            self.llm_cache.remove(&cache_key);
            return Ok(None);
        }

        let conn = self.app_state.lock();
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT text, cached_at, expires_at FROM llm_cache WHERE fingerprint = ?1 AND model_id = ?2",
                params![prompt_fingerprint, model_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((text, cached_at, expires_at)) => {
                let expires_at = parse_timestamp(expires_at);
                if Utc::now() < expires_at {
                    self.llm_cache.insert(
                        cache_key,
                        CacheEntry { text: text.clone(), cached_at: parse_timestamp(cached_at), expires_at },
                    );
                    Ok(Some(text))
                } else {
                    Ok(None)
                }
            }
            None => Ok(None),
        }
    }

    // ---- Conversation summary (spec §3 `[ADD]`) ------------------------------

    /// Builds and persists a rolling digest of the last `window` messages.
    /// Opportunistic — the conversation core calls this off the per-turn
    /// hot path.
    pub fn summarize_recent(&self, key: &InteractionKey, window: usize) -> Result<ConversationSummary, StoreError> {
        let messages = self.recent_messages(key, window)?;
        let window_start = messages.first().map(|m| m.timestamp).unwrap_or_else(Utc::now);
        let window_end = messages.last().map(|m| m.timestamp).unwrap_or_else(Utc::now);

        let joined: String = messages.iter().map(|m| m.text.as_str()).collect::<Vec<_>>().join(" ");
        let emotional_tone = analyze_emotional_tone(&joined);
        let key_topics = top_word_frequencies(&joined, 5);
        let summary_text = if messages.is_empty() {
            "No recent conversation.".to_string()
        } else {
            format!("{} exchanges covering {}", messages.len(), key_topics.join(", "))
        };

        let conn = self.conversations.lock();
        conn.execute(
            "INSERT INTO conversation_summaries
             (user_id, model_id, window_start, window_end, summary_text, key_topics, emotional_tone, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                key.user_id(),
                key.model_id(),
                window_start.to_rfc3339(),
                window_end.to_rfc3339(),
                summary_text,
                serde_json::to_string(&key_topics)?,
                emotional_tone_str(emotional_tone),
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(ConversationSummary { window_start, window_end, summary_text, key_topics, emotional_tone })
    }
}

fn memory_type_str(memory_type: MemoryType) -> &'static str {
    match memory_type {
        MemoryType::Preference => "preference",
        MemoryType::Fact => "fact",
        MemoryType::Interest => "interest",
        MemoryType::Relationship => "relationship",
    }
}

fn memory_type_from_str(s: &str) -> MemoryType {
    match s {
        "fact" => MemoryType::Fact,
        "interest" => MemoryType::Interest,
        "relationship" => MemoryType::Relationship,
        _ => MemoryType::Preference,
    }
}

fn emotional_tone_str(tone: EmotionalTone) -> &'static str {
    match tone {
        EmotionalTone::Positive => "positive",
        EmotionalTone::Neutral => "neutral",
        EmotionalTone::Negative => "negative",
    }
}

fn row_to_memory_item(row: &rusqlite::Row, key_fields: &KeyFields) -> rusqlite::Result<MemoryItem> {
    Ok(MemoryItem {
        id: row.get(0)?,
        key: key_fields.clone(),
        memory_type: memory_type_from_str(&row.get::<_, String>(1)?),
        topic: row.get(2)?,
        content: row.get(3)?,
        importance: row.get(4)?,
        created_at: parse_timestamp(row.get::<_, String>(5)?),
        last_accessed: parse_timestamp(row.get::<_, String>(6)?),
        access_count: row.get::<_, i64>(7)? as u32,
    })
}

fn read_bonding(conn: &Connection, key: &InteractionKey) -> Result<Option<BondingProgress>, StoreError> {
    let row: Option<(u32, u32, String, f32, f32)> = conn
        .query_row(
            "SELECT xp, bond_level, relationship_stage, trust, affection
             FROM bonding_progress WHERE user_id = ?1 AND model_id = ?2",
            params![key.user_id(), key.model_id()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?)),
        )
        .optional()?;
    Ok(row.map(|(xp, bond_level, stage, trust, affection)| BondingProgress {
        key: KeyFields::from(key),
        xp,
        bond_level,
        relationship_stage: stage_from_str(&stage),
        trust,
        affection,
    }))
}

fn write_bonding(conn: &Connection, progress: &BondingProgress) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO bonding_progress (user_id, model_id, xp, bond_level, relationship_stage, trust, affection)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(user_id, model_id) DO UPDATE SET
            xp = excluded.xp, bond_level = excluded.bond_level,
            relationship_stage = excluded.relationship_stage,
            trust = excluded.trust, affection = excluded.affection",
        params![
            progress.key.user_id,
            progress.key.model_id,
            progress.xp,
            progress.bond_level,
            stage_str(progress.relationship_stage),
            progress.trust,
            progress.affection,
        ],
    )?;
    Ok(())
}

fn default_bonding(key: &InteractionKey) -> BondingProgress {
    BondingProgress {
        key: KeyFields::from(key),
        xp: 0,
        bond_level: 1,
        relationship_stage: avatar_core::RelationshipStage::Stranger,
        trust: 0.5,
        affection: 0.5,
    }
}

fn stage_str(stage: avatar_core::RelationshipStage) -> &'static str {
    use avatar_core::RelationshipStage::*;
    match stage {
        Stranger => "stranger",
        Acquaintance => "acquaintance",
        Friend => "friend",
        CloseFriend => "close_friend",
        BestFriend => "best_friend",
    }
}

fn stage_from_str(s: &str) -> avatar_core::RelationshipStage {
    use avatar_core::RelationshipStage::*;
    match s {
        "acquaintance" => Acquaintance,
        "friend" => Friend,
        "close_friend" => CloseFriend,
        "best_friend" => BestFriend,
        _ => Stranger,
    }
}

fn parse_timestamp(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}

/// Word-frequency top-N, used as the "key topics" of a conversation
/// summary (spec §3 `[ADD]`, grounded in the original's `_extract_topics`).
fn top_word_frequencies(text: &str, n: usize) -> Vec<String> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for word in text.split_whitespace() {
        let cleaned: String = word.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase();
        if cleaned.len() >= 3 {
            *counts.entry(cleaned).or_insert(0) += 1;
        }
    }
    let mut pairs: Vec<(String, u32)> = counts.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    pairs.into_iter().take(n).map(|(word, _)| word).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_test_store() -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn append_and_read_messages_in_order() {
        let (_dir, store) = open_test_store();
        let key = InteractionKey::new("u1", "m1").unwrap();
        store.append_message(&key, Role::User, "hi", None, None).unwrap();
        store.append_message(&key, Role::Assistant, "hello", None, None).unwrap();

        let messages = store.recent_messages(&key, 10).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "hi");
        assert_eq!(messages[1].text, "hello");
    }

    #[test]
    fn append_monotonicity() {
        let (_dir, store) = open_test_store();
        let key = InteractionKey::new("u1", "m1").unwrap();
        store.append_message(&key, Role::User, "one", None, None).unwrap();
        let first_read = store.recent_messages(&key, 10).unwrap();
        store.append_message(&key, Role::Assistant, "two", None, None).unwrap();
        let second_read = store.recent_messages(&key, 10).unwrap();

        assert!(second_read.len() >= first_read.len());
        let suffix = &second_read[second_read.len() - first_read.len()..];
        assert_eq!(suffix.iter().map(|m| &m.text).collect::<Vec<_>>(), first_read.iter().map(|m| &m.text).collect::<Vec<_>>());
    }

    #[test]
    fn cross_model_isolation() {
        let (_dir, store) = open_test_store();
        let k1 = InteractionKey::new("u1", "m1").unwrap();
        let k2 = InteractionKey::new("u1", "m2").unwrap();
        store.append_message(&k1, Role::User, "hi", None, None).unwrap();
        assert!(store.recent_messages(&k2, 10).unwrap().is_empty());
    }

    #[test]
    fn bonding_progression_matches_seed_scenario() {
        let (_dir, store) = open_test_store();
        let key = InteractionKey::new("u1", "m1").unwrap();
        let mut progress = store.bonding(&key).unwrap();
        assert_eq!(progress.bond_level, 1);

        for _ in 0..10 {
            progress = store.grant_experience(&key, 50).unwrap();
        }
        assert_eq!(progress.bond_level, 6);
        assert_eq!(progress.relationship_stage, avatar_core::RelationshipStage::Friend);
        assert!((progress.trust - 1.0).abs() < f32::EPSILON);
        assert!((progress.affection - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn adapt_trait_clamps_and_logs_delta() {
        let (_dir, store) = open_test_store();
        let key = InteractionKey::new("u1", "m1").unwrap();
        let state = store.adapt_trait(&key, "warmth", 1.5, Some("generous gift")).unwrap();
        assert!((state.current_value - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn cache_hit_within_ttl_and_miss_after() {
        let (_dir, store) = open_test_store();
        store
            .cache_response("fp1", "hello cached", "model-a", 0.7, std::time::Duration::from_secs(3600))
            .unwrap();
        assert_eq!(store.cached_response("fp1", "model-a").unwrap(), Some("hello cached".to_string()));
        assert_eq!(store.cached_response("fp1", "model-b").unwrap(), None);
    }

    #[test]
    fn memories_by_topic_increments_access_count() {
        let (_dir, store) = open_test_store();
        let key = InteractionKey::new("u1", "m1").unwrap();
        store.add_memory(&key, MemoryType::Fact, Some("pets"), "I have a dog", "high").unwrap();
        let first = store.memories_by_topic(&key, "pets").unwrap();
        assert_eq!(first[0].access_count, 1);
        let second = store.memories_by_topic(&key, "pets").unwrap();
        assert_eq!(second[0].access_count, 2);
    }
}
