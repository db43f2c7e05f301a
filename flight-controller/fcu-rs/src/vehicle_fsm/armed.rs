use shared::{fcu_hal::FlightPhase, ControllerState};

use crate::Fcu;

use super::FsmState;

#[derive(Debug)]
pub struct Armed;

impl<'f> ControllerState<FlightPhase, Fcu<'f>> for Armed {
    fn update(&mut self, fcu: &mut Fcu<'f>, _timestamp_ms: u32) -> Option<FlightPhase> {
        if self.launch_detected(fcu) {
            return Some(FlightPhase::Ascent);
        }

        None
    }

    fn enter_state(&mut self, fcu: &mut Fcu<'f>) {
        fcu.flight_state.launch_debounce_count = 0;
    }

    fn exit_state(&mut self, _fcu: &mut Fcu<'f>) {
        // Nothing
    }
}

impl Armed {
    pub fn new() -> FsmState {
        FsmState::Armed(Self)
    }

    /// Needs `launch_debounce_count + 1` consecutive samples at or above
    /// the threshold, so a single spike never counts as a launch.
    fn launch_detected(&mut self, fcu: &mut Fcu) -> bool {
        let magnitude = fcu.last_reading.acceleration_magnitude();
        let state = &mut fcu.flight_state;

        if magnitude >= fcu.config.launch_accel_threshold_mps2 {
            state.launch_debounce_count += 1;
        } else {
            state.launch_debounce_count = 0;
        }

        state.launch_debounce_count > fcu.config.launch_debounce_count
    }
}
