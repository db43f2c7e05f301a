use shared::{fcu_hal::FlightPhase, ControllerState};

use crate::Fcu;

use super::FsmState;

#[derive(Debug)]
pub struct MainOut;

impl<'f> ControllerState<FlightPhase, Fcu<'f>> for MainOut {
    fn update(&mut self, fcu: &mut Fcu<'f>, timestamp_ms: u32) -> Option<FlightPhase> {
        let height_m = fcu.flight_state.update_height(fcu.last_reading.pressure_pa);
        let since_apogee_ms = fcu
            .flight_state
            .time_since_apogee_ms(timestamp_ms)
            .unwrap_or(0);

        if height_m < fcu.config.landed_height_m {
            return Some(FlightPhase::Landed);
        }

        // Fail-safe for a stuck or failed altitude reading
        if since_apogee_ms >= fcu.config.landed_timeout_after_apogee_ms {
            fcu_warn!("Landed timeout after {} ms", since_apogee_ms);
            return Some(FlightPhase::Landed);
        }

        None
    }

    fn enter_state(&mut self, fcu: &mut Fcu<'f>) {
        fcu.deploy(fcu.config.main_channel);
    }

    fn exit_state(&mut self, _fcu: &mut Fcu<'f>) {
        // Nothing
    }
}

impl MainOut {
    pub fn new() -> FsmState {
        FsmState::MainOut(Self)
    }
}
