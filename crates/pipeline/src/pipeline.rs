//! Three-worker wiring: capture producer, VAD/wake-word consumer, STT
//! worker (spec §4.B "Concurrency contract").

use std::sync::Arc;
use std::time::Duration;

use avatar_bus::{EventBus, EventPayload};
use avatar_core::{EngineError, InteractionKey, SpeechToText};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::ring_buffer::RingBuffer;
use crate::state_machine::{PipelineEvent, PipelineState};
use crate::vad::EnhancedOrBasicVad;
use crate::WakeWordMatcherHandle;

/// Tunable timing parameters (spec §4.B "Parameters").
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sample_rate_hz: u32,
    pub frame_ms: u32,
    pub wake_timeout: Duration,
    pub silence_timeout: Duration,
    pub min_speech_duration: Duration,
    pub capture_queue_capacity: usize,
    pub stt_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: avatar_config::constants::audio::SAMPLE_RATE_HZ,
            frame_ms: avatar_config::constants::audio::FRAME_MS,
            wake_timeout: Duration::from_secs_f32(avatar_config::constants::audio::WAKE_TIMEOUT_SECS),
            silence_timeout: Duration::from_secs_f32(avatar_config::constants::audio::SILENCE_TIMEOUT_SECS),
            min_speech_duration: Duration::from_secs_f32(avatar_config::constants::audio::MIN_SPEECH_SECS),
            capture_queue_capacity: 320, // ~10s of 30ms frames
            stt_timeout: avatar_config::constants::timeouts::STT,
        }
    }
}

/// Owns the pipeline's state and the channels connecting its three
/// workers. `state` is mutated only from within the consumer/STT worker
/// tasks, never by an external caller (spec §4.B ownership model).
pub struct VoicePipeline {
    state: Arc<SyncMutex<PipelineState>>,
    bus: EventBus,
    config: PipelineConfig,
    capture_tx: mpsc::Sender<Vec<i16>>,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    consumer_handle: SyncMutex<Option<tokio::task::JoinHandle<()>>>,
    stt_handle: SyncMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl VoicePipeline {
    /// `key` identifies the (user, model) this pipeline instance captures
    /// audio for; it is stamped onto every `TranscriptReady` event so a
    /// bus shared across concurrently active sessions still lets a single
    /// Conversation Core dispatch by key (spec §4.D `[ADD]`).
    pub fn new(
        key: InteractionKey,
        config: PipelineConfig,
        bus: EventBus,
        vad: EnhancedOrBasicVad,
        wake_word: WakeWordMatcherHandle,
        stt: Arc<dyn SpeechToText>,
    ) -> Self {
        let (capture_tx, capture_rx) = mpsc::channel(config.capture_queue_capacity);
        let (stt_tx, stt_rx) = mpsc::channel::<Vec<i16>>(4);
        let (shutdown_tx, shutdown_rx_consumer) = tokio::sync::watch::channel(false);
        let shutdown_rx_stt = shutdown_rx_consumer.clone();
        let state = Arc::new(SyncMutex::new(PipelineState::Idle));

        let consumer_handle = tokio::spawn(run_consumer(
            state.clone(),
            bus.clone(),
            config.clone(),
            vad,
            wake_word,
            capture_rx,
            stt_tx,
            shutdown_rx_consumer,
        ));
        let stt_worker_handle = tokio::spawn(run_stt_worker(
            key,
            state.clone(),
            bus.clone(),
            config.clone(),
            stt,
            stt_rx,
            shutdown_rx_stt,
        ));

        Self {
            state,
            bus,
            config,
            capture_tx,
            shutdown_tx,
            consumer_handle: SyncMutex::new(Some(consumer_handle)),
            stt_handle: SyncMutex::new(Some(stt_worker_handle)),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    /// Transitions `IDLE -> LISTENING` and emits `state_changed`.
    pub fn start(&self) {
        let mut state = self.state.lock();
        if let Ok(next) = state.transition(PipelineEvent::Start) {
            let old = *state;
            *state = next;
            self.bus.publish(EventPayload::StateChanged { old: format!("{old:?}"), new: format!("{next:?}") });
        }
    }

    /// Push a captured audio frame into the bounded capture queue. A full
    /// queue indicates the consumer is falling behind; the frame is
    /// dropped rather than applying backpressure to the capture device.
    pub async fn push_frame(&self, frame: Vec<i16>) {
        if self.capture_tx.try_send(frame).is_err() {
            warn!("capture queue full, dropping frame");
        }
    }

    /// Drains the queue, aborts any in-flight STT, and deterministically
    /// transitions to `IDLE` within the bounded shutdown window (spec
    /// §4.B "Cancellation").
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let deadline = avatar_config::constants::timeouts::SHUTDOWN;

        if let Some(handle) = self.consumer_handle.lock().take() {
            if tokio::time::timeout(deadline, handle).await.is_err() {
                warn!("consumer worker did not stop within the shutdown deadline");
            }
        }
        if let Some(handle) = self.stt_handle.lock().take() {
            if tokio::time::timeout(deadline, handle).await.is_err() {
                warn!("stt worker did not stop within the shutdown deadline");
            }
        }
        *self.state.lock() = PipelineState::Idle;
    }
}

async fn run_consumer(
    state: Arc<SyncMutex<PipelineState>>,
    bus: EventBus,
    config: PipelineConfig,
    vad: EnhancedOrBasicVad,
    mut wake_word: WakeWordMatcherHandle,
    mut capture_rx: mpsc::Receiver<Vec<i16>>,
    stt_tx: mpsc::Sender<Vec<i16>>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    let mut ring = RingBuffer::with_capacity_seconds(config.sample_rate_hz, 10);
    let mut utterance = Vec::<i16>::new();
    let mut wake_window: Vec<i16> = Vec::new();
    let min_speech_samples = (config.min_speech_duration.as_secs_f32() * config.sample_rate_hz as f32) as usize;
    let wake_window_samples = (2.5 * config.sample_rate_hz as f32) as usize;

    let mut wake_deadline: Option<tokio::time::Instant> = None;
    let mut silence_since: Option<tokio::time::Instant> = None;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            frame = capture_rx.recv() => {
                let Some(frame) = frame else { break };
                ring.push_frame(&frame);

                let is_speech = vad.is_speech(&frame).unwrap_or(false);
                let current = *state.lock();

                match current {
                    PipelineState::Listening => {
                        wake_window.extend_from_slice(&frame);
                        if wake_window.len() > wake_window_samples {
                            let overflow = wake_window.len() - wake_window_samples;
                            wake_window.drain(0..overflow);
                        }
                        if wake_window.len() >= wake_window_samples {
                            if let Ok(Some(word)) = wake_word.detect(&wake_window) {
                                transition(&state, &bus, PipelineEvent::WakeWordDetected);
                                bus.publish(EventPayload::WakeWordDetected { word });
                                wake_deadline = Some(tokio::time::Instant::now() + config.wake_timeout);
                                wake_window.clear();
                            } else if is_speech {
                                transition(&state, &bus, PipelineEvent::SpeechStarted);
                                bus.publish(EventPayload::SpeechStarted);
                                utterance = ring.drain_last(min_speech_samples);
                                silence_since = None;
                            }
                        }
                    }
                    PipelineState::WakeDetected => {
                        if is_speech {
                            transition(&state, &bus, PipelineEvent::SpeechStarted);
                            bus.publish(EventPayload::SpeechStarted);
                            utterance = ring.drain_last(min_speech_samples);
                            silence_since = None;
                            wake_deadline = None;
                        } else if wake_deadline.map(|deadline| tokio::time::Instant::now() >= deadline).unwrap_or(false) {
                            transition(&state, &bus, PipelineEvent::WakeTimeout);
                            wake_deadline = None;
                        }
                    }
                    PipelineState::Recording => {
                        utterance.extend_from_slice(&frame);
                        if is_speech {
                            silence_since = None;
                        } else {
                            let now = tokio::time::Instant::now();
                            let since = *silence_since.get_or_insert(now);
                            if now.duration_since(since) >= config.silence_timeout && utterance.len() >= min_speech_samples {
                                bus.publish(EventPayload::SpeechEnded { utterance_len_bytes: utterance.len() * 2 });
                                transition(&state, &bus, PipelineEvent::Silence);
                                let moved = std::mem::take(&mut utterance);
                                if stt_tx.try_send(moved).is_err() {
                                    warn!("stt worker busy, dropping utterance");
                                    transition(&state, &bus, PipelineEvent::Error);
                                    bus.publish(EventPayload::Error {
                                        kind: "stt_busy".to_string(),
                                        message: "stt worker queue full".to_string(),
                                    });
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }
}

async fn run_stt_worker(
    key: InteractionKey,
    state: Arc<SyncMutex<PipelineState>>,
    bus: EventBus,
    config: PipelineConfig,
    stt: Arc<dyn SpeechToText>,
    mut stt_rx: mpsc::Receiver<Vec<i16>>,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    break;
                }
            }
            utterance = stt_rx.recv() => {
                let Some(utterance) = utterance else { break };
                match tokio::time::timeout(config.stt_timeout, stt.transcribe(&utterance)).await {
                    Ok(Ok(transcript)) => {
                        bus.publish(EventPayload::TranscriptReady {
                            user_id: key.user_id().to_string(),
                            model_id: key.model_id().to_string(),
                            text: transcript.text,
                            confidence: transcript.confidence,
                            language: transcript.language,
                            latency_ms: transcript.latency_ms,
                        });
                        transition(&state, &bus, PipelineEvent::TranscriptReady);
                    }
                    Ok(Err(err)) => {
                        emit_engine_error(&bus, &err);
                        transition(&state, &bus, PipelineEvent::Error);
                        transition(&state, &bus, PipelineEvent::Recover);
                    }
                    Err(_) => {
                        emit_engine_error(&bus, &EngineError::Timeout(config.stt_timeout));
                        transition(&state, &bus, PipelineEvent::Error);
                        transition(&state, &bus, PipelineEvent::Recover);
                    }
                }
            }
        }
    }
    info!("stt worker stopped");
}

fn emit_engine_error(bus: &EventBus, err: &EngineError) {
    bus.publish(EventPayload::Error { kind: err.kind().as_str().to_string(), message: err.to_string() });
}

fn transition(state: &Arc<SyncMutex<PipelineState>>, bus: &EventBus, event: PipelineEvent) {
    let mut guard = state.lock();
    if let Ok(next) = guard.transition(event) {
        let old = *guard;
        *guard = next;
        drop(guard);
        bus.publish(EventPayload::StateChanged { old: format!("{old:?}"), new: format!("{next:?}") });
    }
}
