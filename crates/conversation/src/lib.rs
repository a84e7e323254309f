//! Conversation Core (spec §4.D): on `TranscriptReady`, assembles context,
//! calls the LLM, post-processes and stores the result, and emits
//! `ResponseReady`. Grounded in
//! `original_source/src/models/llm_handler.py` (`LLMHandler.generate_response`
//! and its helpers) for the algorithm shape; the personality/memory/bonding
//! data itself comes from [`avatar_store::Store`].

mod cues;
mod error;
mod fingerprint;
mod persona;
mod postprocess;

pub use error::ConversationError;
pub use postprocess::CANNED_APOLOGY;

use std::sync::Arc;
use std::time::Duration;

use avatar_bus::{EventBus, EventPayload};
use avatar_core::{analyze_emotional_tone, EmotionalTone, InteractionKey, LanguageModel, Role};
use avatar_store::Store;
use dashmap::DashMap;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, instrument, warn};

/// Tunable context-assembly parameters (spec §4.D defaults).
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    pub context_message_count: usize,
    pub top_memories: usize,
    pub transcript_turns: usize,
    pub response_cache_ttl: Duration,
    pub default_xp_grant: u32,
    pub max_response_chars: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            context_message_count: avatar_config::constants::conversation::CONTEXT_MESSAGE_COUNT,
            top_memories: avatar_config::constants::conversation::TOP_MEMORIES,
            transcript_turns: avatar_config::constants::conversation::TRANSCRIPT_TURNS,
            response_cache_ttl: Duration::from_secs(
                avatar_config::constants::conversation::RESPONSE_CACHE_TTL_HOURS as u64 * 3600,
            ),
            default_xp_grant: avatar_config::constants::conversation::DEFAULT_XP_GRANT,
            max_response_chars: avatar_config::constants::conversation::MAX_RESPONSE_CHARS,
        }
    }
}

/// The full response produced for one turn, returned to callers (e.g. the
/// external adapter) in addition to being emitted on the bus.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub text: String,
    pub detected_emotion: Option<String>,
    pub cache_hit: bool,
}

/// Owns the LLM engine and drives the 8-step algorithm. Safe to share
/// across many concurrently active interaction keys: generation for a
/// given key is serialized, but distinct keys run fully in parallel
/// (spec §5, §4.D `[ADD]`).
pub struct ConversationCore {
    store: Arc<Store>,
    llm: Arc<dyn LanguageModel>,
    bus: EventBus,
    config: ConversationConfig,
    locks: DashMap<InteractionKey, Arc<AsyncMutex<()>>>,
}

impl ConversationCore {
    pub fn new(store: Arc<Store>, llm: Arc<dyn LanguageModel>, bus: EventBus, config: ConversationConfig) -> Self {
        Self { store, llm, bus, config, locks: DashMap::new() }
    }

    fn lock_for(&self, key: &InteractionKey) -> Arc<AsyncMutex<()>> {
        self.locks.entry(key.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Runs the full algorithm for one `TranscriptReady` turn and emits
    /// `ResponseReady` on the bus. Never returns an `Err` for an LLM
    /// failure — a canned apology is emitted instead (spec §4.D "Failure
    /// semantics"); only a truly unrecoverable store error propagates.
    #[instrument(skip(self, user_input))]
    pub async fn handle_transcript(
        &self,
        key: &InteractionKey,
        user_input: &str,
    ) -> Result<TurnOutcome, ConversationError> {
        let lock = self.lock_for(key);
        let _guard = lock.lock().await;

        // Step 1: load context via one logical batched call.
        let recent = self.store.recent_messages(key, self.config.context_message_count)?;
        let traits = self.store.personality(key)?;
        let memories = self.store.top_important_memories(key, self.config.top_memories)?;
        let bonding = self.store.bonding(key)?;
        let avatar_state = self.store.avatar_state(key)?;

        // Step 2: fingerprint the normalized prompt.
        let system_prompt = persona::build_system_prompt(
            &traits,
            &avatar_state.mood,
            avatar_state.energy,
            avatar_state.happiness,
            bonding.trust,
            &memories,
            &bonding,
        );
        let transcript = persona::build_transcript(&recent, user_input, self.config.transcript_turns);
        let full_prompt = persona::assemble_prompt(&system_prompt, &transcript);
        let normalized = fingerprint::normalize_prompt(&full_prompt);
        let prompt_fingerprint = fingerprint::fingerprint(&normalized);

        // Step 3: cache lookup. A cache-read error is treated as a miss
        // rather than failing the turn (spec §4.D "Failure semantics").
        let cached = self.store.cached_response(&prompt_fingerprint, key.model_id()).unwrap_or_else(|e| {
            warn!("cache read failed, proceeding as miss: {e}");
            None
        });

        let (text, cache_hit) = match cached {
            Some(text) => (text, true),
            None => {
                // Step 4/5: assemble (done above) and invoke the LLM.
                let params = avatar_core::GenerationParams::default();
                match self.llm.generate(&full_prompt, &params).await {
                    Ok(raw) => {
                        // Step 6: post-process.
                        let text = postprocess::post_process(&raw, self.config.max_response_chars);
                        // Cache the response with a 24h TTL (not written on failure).
                        if let Err(e) =
                            self.store.cache_response(&prompt_fingerprint, &text, key.model_id(), params.temperature, self.config.response_cache_ttl)
                        {
                            warn!("failed to persist response cache entry: {e}");
                        }
                        (text, false)
                    }
                    Err(e) => {
                        warn!("LLM generation failed, emitting canned apology: {e}");
                        (CANNED_APOLOGY.to_string(), false)
                    }
                }
            }
        };

        // Step 7: store and react.
        self.store.append_message(key, Role::User, user_input, None, None)?;
        self.store.append_message(key, Role::Assistant, &text, None, None)?;
        self.store.grant_experience(key, self.config.default_xp_grant)?;

        for cue in cues::scan_cues(user_input) {
            if let Err(e) = self.store.add_memory(key, cue.memory_type, Some(&cue.topic), &cue.content, "medium") {
                warn!("failed to store memory cue: {e}");
            }
        }

        let tone = analyze_emotional_tone(user_input);
        let detected_emotion = match tone {
            EmotionalTone::Positive => {
                self.store.update_avatar_state(
                    key,
                    Some("happy"),
                    Some((avatar_state.energy + 0.03).min(1.0)),
                    Some((avatar_state.happiness + 0.05).min(1.0)),
                    None,
                )?;
                Some("happy".to_string())
            }
            EmotionalTone::Negative => {
                self.store.update_avatar_state(
                    key,
                    Some("concerned"),
                    None,
                    Some((avatar_state.happiness - 0.03).max(0.0)),
                    None,
                )?;
                Some("concerned".to_string())
            }
            EmotionalTone::Neutral => None,
        };
        // "Trust rises every turn" is already satisfied by grant_experience's
        // xp-proportional trust nudge above; a separate flat bump here would
        // double count it.

        // Step 8: emit ResponseReady.
        self.bus.publish(EventPayload::ResponseReady {
            user_id: key.user_id().to_string(),
            model_id: key.model_id().to_string(),
            text: text.clone(),
            detected_emotion: detected_emotion.clone(),
        });

        info!(cache_hit, "turn completed");
        Ok(TurnOutcome { text, detected_emotion, cache_hit })
    }

    /// Runs the conversation loop: subscribes to `bus` for
    /// `TranscriptReady` events and dispatches each to
    /// [`ConversationCore::handle_transcript`]. Intended to be `tokio::spawn`ed
    /// by `avatar-server`'s `RuntimeHandles`.
    pub async fn run(self: Arc<Self>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let sub = self.bus.subscribe();
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                event = sub.recv() => {
                    if let EventPayload::TranscriptReady { user_id, model_id, text, .. } = event.payload {
                        match InteractionKey::new(user_id, model_id) {
                            Ok(key) => {
                                let this = self.clone();
                                tokio::spawn(async move {
                                    if let Err(e) = this.handle_transcript(&key, &text).await {
                                        warn!("conversation turn failed: {e}");
                                    }
                                });
                            }
                            Err(e) => warn!("dropping transcript with invalid key: {e}"),
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use avatar_core::{EngineError, EngineResourceProfile};
    use tempfile::tempdir;

    struct EchoLlm;

    #[async_trait]
    impl LanguageModel for EchoLlm {
        async fn generate(&self, _prompt: &str, _params: &avatar_core::GenerationParams) -> Result<String, EngineError> {
            Ok("Assistant: That sounds wonderful!".to_string())
        }
        fn resource_profile(&self) -> EngineResourceProfile {
            EngineResourceProfile { approx_ram_mb: 0, approx_cpu_cores: 0.0, needs_gpu: false }
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl LanguageModel for FailingLlm {
        async fn generate(&self, _prompt: &str, _params: &avatar_core::GenerationParams) -> Result<String, EngineError> {
            Err(EngineError::EngineUnavailable("model not loaded".to_string()))
        }
        fn resource_profile(&self) -> EngineResourceProfile {
            EngineResourceProfile { approx_ram_mb: 0, approx_cpu_cores: 0.0, needs_gpu: false }
        }
    }

    fn core_with(llm: Arc<dyn LanguageModel>) -> (tempfile::TempDir, Arc<ConversationCore>, EventBus) {
        let dir = tempdir().unwrap();
        let store = Arc::new(Store::open(dir.path()).unwrap());
        let bus = EventBus::new();
        let core = Arc::new(ConversationCore::new(store, llm, bus.clone(), ConversationConfig::default()));
        (dir, core, bus)
    }

    #[tokio::test]
    async fn happy_path_stores_messages_and_emits_response() {
        let (_dir, core, bus) = core_with(Arc::new(EchoLlm));
        let sub = bus.subscribe();
        let key = InteractionKey::new("u1", "m1").unwrap();

        let outcome = core.handle_transcript(&key, "I love hiking, it's wonderful").await.unwrap();
        assert_eq!(outcome.text, "That sounds wonderful!");
        assert!(!outcome.cache_hit);
        assert_eq!(outcome.detected_emotion.as_deref(), Some("happy"));

        let event = sub.recv().await;
        assert!(matches!(event.payload, EventPayload::ResponseReady { .. }));
    }

    #[tokio::test]
    async fn first_turn_writes_a_cache_entry_under_its_own_fingerprint() {
        let (_dir, core, _bus) = core_with(Arc::new(EchoLlm));
        let key = InteractionKey::new("u1", "m1").unwrap();

        // Context going into the very first turn on a fresh key is fully
        // deterministic (empty history, default personality/bonding/avatar
        // state), so the fingerprint can be reconstructed independently.
        let traits = core.store.personality(&key).unwrap();
        let bonding = core.store.bonding(&key).unwrap();
        let avatar_state = core.store.avatar_state(&key).unwrap();
        let system_prompt = persona::build_system_prompt(
            &traits,
            &avatar_state.mood,
            avatar_state.energy,
            avatar_state.happiness,
            bonding.trust,
            &[],
            &bonding,
        );
        let transcript = persona::build_transcript(&[], "tell me a story", core.config.transcript_turns);
        let expected_fingerprint = fingerprint::fingerprint(&fingerprint::normalize_prompt(&persona::assemble_prompt(
            &system_prompt,
            &transcript,
        )));

        let outcome = core.handle_transcript(&key, "tell me a story").await.unwrap();
        assert!(!outcome.cache_hit);

        let cached = core.store.cached_response(&expected_fingerprint, "m1").unwrap();
        assert_eq!(cached.as_deref(), Some(outcome.text.as_str()));
    }

    #[tokio::test]
    async fn llm_failure_emits_canned_apology_without_caching() {
        let (_dir, core, _bus) = core_with(Arc::new(FailingLlm));
        let key = InteractionKey::new("u1", "m1").unwrap();

        let outcome = core.handle_transcript(&key, "hello").await.unwrap();
        assert_eq!(outcome.text, CANNED_APOLOGY);
    }

    #[tokio::test]
    async fn memory_cue_is_recorded_from_user_input() {
        let (_dir, core, _bus) = core_with(Arc::new(EchoLlm));
        let key = InteractionKey::new("u1", "m1").unwrap();

        core.handle_transcript(&key, "my name is Sam and I love painting").await.unwrap();
        let memories = core.store.top_important_memories(&key, 10).unwrap();
        assert!(!memories.is_empty());
    }
}
