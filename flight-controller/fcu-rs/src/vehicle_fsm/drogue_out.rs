use shared::{fcu_hal::FlightPhase, ControllerState};

use crate::Fcu;

use super::FsmState;

/// Drogue deployed at apogee, waiting for main deployment height.
#[derive(Debug)]
pub struct DrogueOut;

impl<'f> ControllerState<FlightPhase, Fcu<'f>> for DrogueOut {
    fn update(&mut self, fcu: &mut Fcu<'f>, timestamp_ms: u32) -> Option<FlightPhase> {
        let height_m = fcu.flight_state.update_height(fcu.last_reading.pressure_pa);
        let since_apogee_ms = fcu
            .flight_state
            .time_since_apogee_ms(timestamp_ms)
            .unwrap_or(0);

        if height_m < fcu.config.main_deploy_height_m
            && since_apogee_ms >= fcu.config.main_min_time_after_drogue_ms
        {
            return Some(FlightPhase::MainOut);
        }

        None
    }

    fn enter_state(&mut self, fcu: &mut Fcu<'f>) {
        fcu.deploy(fcu.config.drogue_channel);
    }

    fn exit_state(&mut self, _fcu: &mut Fcu<'f>) {
        // Nothing
    }
}

impl DrogueOut {
    pub fn new() -> FsmState {
        FsmState::DrogueOut(Self)
    }
}
