//! Shared application state handed to every axum handler.

use std::sync::Arc;

use avatar_bus::EventBus;
use avatar_config::{HostProfile, Settings};
use avatar_conversation::ConversationCore;
use avatar_core::InteractionKey;
use avatar_motion::MotionResolver;
use avatar_pipeline::VoicePipeline;
use avatar_store::Store;
use dashmap::DashMap;

/// Everything a handler needs to serve a request. Cheap to clone: every
/// field is an `Arc` (or already a cloneable handle), so cloning just
/// bumps refcounts (same pattern as the teacher's `AppState`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub host_profile: Arc<HostProfile>,
    pub bus: EventBus,
    pub store: Arc<Store>,
    pub conversation: Arc<ConversationCore>,
    pub motion: Arc<MotionResolver>,
    /// Sessions with a live `VoicePipeline`, keyed by the (user, model)
    /// pair the pipeline captures audio for. `/status` reports its size.
    pub pipelines: Arc<DashMap<InteractionKey, Arc<VoicePipeline>>>,
}
