//! SQLite DDL for each named store under `<data_dir>/databases/` (spec §6).
//!
//! Every statement uses `IF NOT EXISTS` so `apply_schema` is idempotent,
//! mirroring the schema idiom used elsewhere in the retrieved pack for
//! embedded SQLite stores.

use rusqlite::Connection;

/// `conversations.sqlite3` — append-only message log and session context.
pub const CONVERSATIONS_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS conversation_messages (
    id              TEXT PRIMARY KEY,
    user_id         TEXT NOT NULL,
    model_id        TEXT NOT NULL,
    role            TEXT NOT NULL,
    text            TEXT NOT NULL,
    detected_emotion TEXT,
    response_latency_ms INTEGER,
    created_at      TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_key_time
    ON conversation_messages(user_id, model_id, created_at);

CREATE TABLE IF NOT EXISTS session_context (
    user_id    TEXT NOT NULL,
    model_id   TEXT NOT NULL,
    session_id TEXT NOT NULL,
    messages   TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (user_id, model_id, session_id)
);

CREATE TABLE IF NOT EXISTS conversation_summaries (
    user_id        TEXT NOT NULL,
    model_id       TEXT NOT NULL,
    window_start   TEXT NOT NULL,
    window_end     TEXT NOT NULL,
    summary_text   TEXT NOT NULL,
    key_topics     TEXT NOT NULL,
    emotional_tone TEXT NOT NULL,
    created_at     TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_summaries_key
    ON conversation_summaries(user_id, model_id, created_at);
"#;

/// `personality.sqlite3` — personality traits, bonding, and memory items.
///
/// Memory lives here rather than in its own file: spec §6's filesystem
/// layout names no separate "memory" database, and memory content feeds the
/// same personality-conditioned prompt assembly as trait/bonding state.
pub const PERSONALITY_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS personality_state (
    user_id       TEXT NOT NULL,
    model_id      TEXT NOT NULL,
    trait_name    TEXT NOT NULL,
    base_value    REAL NOT NULL,
    current_value REAL NOT NULL,
    last_reason   TEXT,
    PRIMARY KEY (user_id, model_id, trait_name)
);

CREATE TABLE IF NOT EXISTS bonding_progress (
    user_id            TEXT NOT NULL,
    model_id           TEXT NOT NULL,
    xp                 INTEGER NOT NULL,
    bond_level         INTEGER NOT NULL,
    relationship_stage TEXT NOT NULL,
    trust              REAL NOT NULL,
    affection          REAL NOT NULL,
    PRIMARY KEY (user_id, model_id)
);

CREATE TABLE IF NOT EXISTS memory_items (
    id            TEXT PRIMARY KEY,
    user_id       TEXT NOT NULL,
    model_id      TEXT NOT NULL,
    memory_type   TEXT NOT NULL,
    topic         TEXT NOT NULL,
    content       TEXT NOT NULL,
    importance    REAL NOT NULL,
    created_at    TEXT NOT NULL,
    last_accessed TEXT NOT NULL,
    access_count  INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_memory_key_topic ON memory_items(user_id, model_id, topic);
CREATE INDEX IF NOT EXISTS idx_memory_key_importance
    ON memory_items(user_id, model_id, importance DESC, access_count DESC);

CREATE TABLE IF NOT EXISTS personality_log (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    model_id    TEXT NOT NULL,
    trait_name  TEXT NOT NULL,
    reason      TEXT,
    delta       REAL NOT NULL,
    recorded_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_personality_log_key ON personality_log(user_id, model_id, recorded_at);

CREATE TABLE IF NOT EXISTS memory_audit (
    id          TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    model_id    TEXT NOT NULL,
    memory_id   TEXT NOT NULL,
    accessed_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memory_audit_key ON memory_audit(user_id, model_id, accessed_at);
"#;

/// `live2d.sqlite3` — cached motion analyses (avatar-motion's cold-start
/// populate target; not written by any operation in this crate).
pub const LIVE2D_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS motion_analysis_cache (
    model_id   TEXT NOT NULL,
    motion_name TEXT NOT NULL,
    analysis_json TEXT NOT NULL,
    computed_at TEXT NOT NULL,
    PRIMARY KEY (model_id, motion_name)
);
"#;

/// `system.sqlite3` — host profile snapshots for observability.
pub const SYSTEM_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS host_profile_snapshots (
    id              TEXT PRIMARY KEY,
    detected_at     TEXT NOT NULL,
    performance_tier TEXT NOT NULL,
    profile_json    TEXT NOT NULL
);
"#;

/// `users.sqlite3` — user identities.
pub const USERS_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    display_name TEXT,
    created_at   TEXT NOT NULL
);
"#;

/// `user_profiles.sqlite3` — optional per-user profile attributes (spec §3
/// "optional profile (age range, language, content preferences)").
pub const USER_PROFILES_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS user_profiles (
    user_id            TEXT PRIMARY KEY,
    age_range          TEXT,
    language           TEXT,
    content_preferences TEXT
);
"#;

/// `user_sessions.sqlite3` — active session bookkeeping for the external
/// adapter (not part of the core contract, kept minimal).
pub const USER_SESSIONS_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS user_sessions (
    session_id TEXT PRIMARY KEY,
    user_id    TEXT NOT NULL,
    model_id   TEXT NOT NULL,
    started_at TEXT NOT NULL,
    last_seen_at TEXT NOT NULL
);
"#;

/// `app_state.sqlite3` — avatar affective state and the persisted LLM
/// response cache.
pub const APP_STATE_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS avatar_state (
    user_id   TEXT NOT NULL,
    model_id  TEXT NOT NULL,
    mood      TEXT NOT NULL,
    energy    REAL NOT NULL,
    happiness REAL NOT NULL,
    stress    REAL NOT NULL,
    PRIMARY KEY (user_id, model_id)
);

CREATE TABLE IF NOT EXISTS llm_cache (
    fingerprint TEXT NOT NULL,
    model_id    TEXT NOT NULL,
    text        TEXT NOT NULL,
    temperature REAL NOT NULL,
    cached_at   TEXT NOT NULL,
    expires_at  TEXT NOT NULL,
    PRIMARY KEY (fingerprint, model_id)
);
"#;

pub fn apply_schema(conn: &Connection, schema_sql: &str) -> rusqlite::Result<()> {
    conn.execute_batch(schema_sql)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_schema_applies_idempotently() {
        for schema in [
            CONVERSATIONS_SCHEMA,
            PERSONALITY_SCHEMA,
            LIVE2D_SCHEMA,
            SYSTEM_SCHEMA,
            USERS_SCHEMA,
            USER_PROFILES_SCHEMA,
            USER_SESSIONS_SCHEMA,
            APP_STATE_SCHEMA,
        ] {
            let conn = Connection::open_in_memory().unwrap();
            apply_schema(&conn, schema).unwrap();
            apply_schema(&conn, schema).unwrap();
        }
    }
}
