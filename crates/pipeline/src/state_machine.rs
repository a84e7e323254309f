//! The audio pipeline's single-writer state machine (spec §4.B).

use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PipelineState {
    Idle,
    Listening,
    WakeDetected,
    Recording,
    Processing,
    Error,
}

/// The inputs that drive a state transition; named after the events in
/// spec §4.B's diagram rather than after the audio that caused them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    Start,
    WakeWordDetected,
    SpeechStarted,
    WakeTimeout,
    Silence,
    TranscriptReady,
    Error,
    Recover,
}

impl PipelineState {
    /// The one legal next state for `(self, event)`, or `IllegalTransition`.
    ///
    /// `error` is legal from any state (spec: "any -> error"); every other
    /// transition is an exact match against the diagram in spec §4.B.
    pub fn transition(self, event: PipelineEvent) -> Result<PipelineState, PipelineError> {
        use PipelineEvent::*;
        use PipelineState::*;

        if matches!(event, Error) {
            return Ok(PipelineState::Error);
        }

        let next = match (self, event) {
            (Idle, Start) => Listening,
            (Listening, WakeWordDetected) => WakeDetected,
            (Listening, SpeechStarted) => Recording,
            (WakeDetected, SpeechStarted) => Recording,
            (WakeDetected, WakeTimeout) => Listening,
            (Recording, Silence) => Processing,
            (Processing, TranscriptReady) => Listening,
            (PipelineState::Error, Recover) => Listening,
            _ => {
                return Err(PipelineError::IllegalTransition {
                    state: self,
                    event: format!("{event:?}"),
                })
            }
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PipelineEvent::*;
    use PipelineState::*;

    #[test]
    fn happy_path_wake_then_speak_then_transcribe() {
        let mut state = Idle;
        state = state.transition(Start).unwrap();
        assert_eq!(state, Listening);
        state = state.transition(WakeWordDetected).unwrap();
        assert_eq!(state, WakeDetected);
        state = state.transition(SpeechStarted).unwrap();
        assert_eq!(state, Recording);
        state = state.transition(Silence).unwrap();
        assert_eq!(state, Processing);
        state = state.transition(TranscriptReady).unwrap();
        assert_eq!(state, Listening);
    }

    #[test]
    fn direct_listen_mode_skips_wake_detected() {
        let state = Listening.transition(SpeechStarted).unwrap();
        assert_eq!(state, Recording);
    }

    #[test]
    fn wake_timeout_returns_to_listening_without_entering_recording() {
        let state = WakeDetected.transition(WakeTimeout).unwrap();
        assert_eq!(state, Listening);
    }

    #[test]
    fn error_is_reachable_from_any_state_and_recovers_to_listening() {
        for state in [Idle, Listening, WakeDetected, Recording, Processing] {
            assert_eq!(state.transition(PipelineEvent::Error).unwrap(), PipelineState::Error);
        }
        assert_eq!(PipelineState::Error.transition(Recover).unwrap(), Listening);
    }

    #[test]
    fn illegal_transitions_are_rejected() {
        assert!(Idle.transition(Silence).is_err());
        assert!(Processing.transition(SpeechStarted).is_err());
    }
}
