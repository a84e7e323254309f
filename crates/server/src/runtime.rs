//! Coordinated shutdown for the background workers the server owns
//! (spec §5 `[ADD]`): a `CancellationToken` plus a `watch` channel, since
//! the components already built against a plain `watch::Receiver<bool>`
//! shutdown signal (`VoicePipeline`, `ConversationCore::run`) predate this
//! struct; the token is cancelled alongside the channel send so both
//! signalling styles converge on the same `stop()` call.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub struct RuntimeHandles {
    token: CancellationToken,
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl RuntimeHandles {
    /// Returns the handle registry plus the receiver every long-running
    /// worker should select on (e.g. `ConversationCore::run`).
    pub fn new() -> (Self, tokio::sync::watch::Receiver<bool>) {
        let token = CancellationToken::new();
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        (Self { token, shutdown_tx, handles: Vec::new() }, shutdown_rx)
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Registers a spawned task so `stop()` waits for it.
    pub fn track(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    /// Cancels the token, signals the watch channel, then joins every
    /// tracked task within the shutdown deadline (spec §4.B "bounded
    /// shutdown window"). A task still running past the deadline is
    /// abandoned rather than awaited further.
    pub async fn stop(mut self) {
        self.token.cancel();
        let _ = self.shutdown_tx.send(true);
        for handle in self.handles.drain(..) {
            if tokio::time::timeout(avatar_config::constants::timeouts::SHUTDOWN, handle).await.is_err() {
                warn!("background worker did not stop within the shutdown deadline");
            }
        }
    }
}
