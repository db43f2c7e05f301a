use shared::{fcu_hal::FlightPhase, ControllerState};

use crate::Fcu;

use super::FsmState;

#[derive(Debug)]
pub struct Landed;

impl<'f> ControllerState<FlightPhase, Fcu<'f>> for Landed {
    fn update(&mut self, _fcu: &mut Fcu<'f>, _timestamp_ms: u32) -> Option<FlightPhase> {
        None
    }

    fn enter_state(&mut self, fcu: &mut Fcu<'f>) {
        fcu_info!(
            "Landed, apogee was {} m",
            fcu.flight_state.max_height_m
        );
    }

    fn exit_state(&mut self, _fcu: &mut Fcu<'f>) {
        // Nothing
    }
}

impl Landed {
    pub fn new() -> FsmState {
        FsmState::Landed(Self)
    }
}
