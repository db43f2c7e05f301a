use shared::{fcu_hal::FlightPhase, ControllerState};

use crate::Fcu;

use super::FsmState;

/// On the pad. Arming is time gated, never sensor gated.
#[derive(Debug)]
pub struct Prelaunch {
    entered_ms: u32,
}

impl<'f> ControllerState<FlightPhase, Fcu<'f>> for Prelaunch {
    fn update(&mut self, fcu: &mut Fcu<'f>, timestamp_ms: u32) -> Option<FlightPhase> {
        if timestamp_ms.wrapping_sub(self.entered_ms) >= fcu.config.arming_delay_ms {
            return Some(FlightPhase::Armed);
        }

        None
    }

    fn enter_state(&mut self, fcu: &mut Fcu<'f>) {
        self.entered_ms = fcu.driver.timestamp_ms();
    }

    fn exit_state(&mut self, _fcu: &mut Fcu<'f>) {
        // Nothing
    }
}

impl Prelaunch {
    pub fn new() -> FsmState {
        FsmState::Prelaunch(Self { entered_ms: 0 })
    }
}
