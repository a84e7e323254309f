//! Enhanced/basic VAD selection and fallback (spec §4.B "Enhanced mode &
//! fallback"), grounded on the teacher's `Arc<dyn ProcessableVad>`
//! selection in `VoicePipeline::simple`/`with_indicconformer`.

use avatar_core::{EngineError, EngineResourceProfile, VoiceActivityDetector};
use avatar_bus::{EventBus, EventPayload};
use parking_lot::Mutex;

/// Owns both a basic and an optional enhanced VAD. Routes frames to the
/// enhanced engine when present; on any enhanced-engine failure it
/// atomically switches to basic and emits `pipeline_switched`.
pub struct EnhancedOrBasicVad {
    enhanced: Option<Box<dyn VoiceActivityDetector>>,
    basic: Box<dyn VoiceActivityDetector>,
    active_is_enhanced: Mutex<bool>,
    bus: EventBus,
}

impl EnhancedOrBasicVad {
    pub fn new(
        enhanced: Option<Box<dyn VoiceActivityDetector>>,
        basic: Box<dyn VoiceActivityDetector>,
        bus: EventBus,
    ) -> Self {
        let active_is_enhanced = enhanced.is_some();
        Self { enhanced, basic, active_is_enhanced: Mutex::new(active_is_enhanced), bus }
    }

    fn fall_back_to_basic(&self, reason: &str) {
        let mut active = self.active_is_enhanced.lock();
        if *active {
            *active = false;
            self.bus.publish(EventPayload::PipelineSwitched {
                from: "enhanced".to_string(),
                to: "basic".to_string(),
                reason: reason.to_string(),
            });
        }
    }
}

impl VoiceActivityDetector for EnhancedOrBasicVad {
    fn is_speech(&self, frame: &[i16]) -> Result<bool, EngineError> {
        let active_is_enhanced = *self.active_is_enhanced.lock();
        if active_is_enhanced {
            if let Some(enhanced) = &self.enhanced {
                match enhanced.is_speech(frame) {
                    Ok(result) => return Ok(result),
                    Err(err) => {
                        self.fall_back_to_basic(&err.to_string());
                    }
                }
            }
        }
        self.basic.is_speech(frame)
    }

    fn set_aggressiveness(&mut self, level: u8) {
        if let Some(enhanced) = &mut self.enhanced {
            enhanced.set_aggressiveness(level);
        }
        self.basic.set_aggressiveness(level);
    }

    fn resource_profile(&self) -> EngineResourceProfile {
        if *self.active_is_enhanced.lock() {
            self.enhanced.as_ref().map(|e| e.resource_profile()).unwrap_or_else(|| self.basic.resource_profile())
        } else {
            self.basic.resource_profile()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatar_core::EngineResourceProfile;

    struct AlwaysFails;
    impl VoiceActivityDetector for AlwaysFails {
        fn is_speech(&self, _frame: &[i16]) -> Result<bool, EngineError> {
            Err(EngineError::EngineUnavailable("enhanced model missing".to_string()))
        }
        fn set_aggressiveness(&mut self, _level: u8) {}
        fn resource_profile(&self) -> EngineResourceProfile {
            EngineResourceProfile { approx_ram_mb: 500, approx_cpu_cores: 1.0, needs_gpu: true }
        }
    }

    #[tokio::test]
    async fn falls_back_to_basic_on_enhanced_failure_and_emits_switch_event() {
        let bus = EventBus::new();
        let sub = bus.subscribe();
        let wrapper = EnhancedOrBasicVad::new(
            Some(Box::new(AlwaysFails)),
            Box::new(crate::engines::EnergyVad::new()),
            bus,
        );

        let loud = vec![5000_i16; 480];
        let result = wrapper.is_speech(&loud).unwrap();
        assert!(result);

        let event = sub.recv().await;
        assert!(matches!(event.payload, EventPayload::PipelineSwitched { .. }));
    }
}
