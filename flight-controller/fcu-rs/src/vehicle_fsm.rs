use shared::{
    fcu_hal::{FcuAlertCondition, FlightPhase},
    pyro_hal::PyroChannelId,
    ControllerFsm, ControllerState, MeasurementKind,
};

use crate::Fcu;

mod armed;
mod ascent;
mod drogue_out;
mod landed;
mod main_out;
mod prelaunch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransitionError {
    /// `(from, to)` is not an edge of the flight graph.
    Illegal { from: FlightPhase, to: FlightPhase },
}

#[derive(Debug)]
pub enum FsmState {
    Prelaunch(prelaunch::Prelaunch),
    Armed(armed::Armed),
    Ascent(ascent::Ascent),
    DrogueOut(drogue_out::DrogueOut),
    MainOut(main_out::MainOut),
    Landed(landed::Landed),
}

impl FsmState {
    pub fn for_phase(phase: FlightPhase) -> Self {
        match phase {
            FlightPhase::Prelaunch => prelaunch::Prelaunch::new(),
            FlightPhase::Armed => armed::Armed::new(),
            FlightPhase::Ascent => ascent::Ascent::new(),
            FlightPhase::DrogueOut => drogue_out::DrogueOut::new(),
            FlightPhase::MainOut => main_out::MainOut::new(),
            FlightPhase::Landed => landed::Landed::new(),
        }
    }
}

impl<'a> ControllerFsm<FlightPhase, Fcu<'a>, FlightPhase> for FsmState {
    fn to_controller_state(&mut self) -> &mut dyn ControllerState<FlightPhase, Fcu<'a>> {
        match self {
            FsmState::Prelaunch(state) => state,
            FsmState::Armed(state) => state,
            FsmState::Ascent(state) => state,
            FsmState::DrogueOut(state) => state,
            FsmState::MainOut(state) => state,
            FsmState::Landed(state) => state,
        }
    }

    fn hal_state(&self) -> FlightPhase {
        match self {
            FsmState::Prelaunch(_) => FlightPhase::Prelaunch,
            FsmState::Armed(_) => FlightPhase::Armed,
            FsmState::Ascent(_) => FlightPhase::Ascent,
            FsmState::DrogueOut(_) => FlightPhase::DrogueOut,
            FsmState::MainOut(_) => FlightPhase::MainOut,
            FsmState::Landed(_) => FlightPhase::Landed,
        }
    }
}

impl<'a> Fcu<'a> {
    pub(crate) fn update_vehicle_fsm(&mut self, timestamp_ms: u32) {
        let Some(mut current_state) = self.vehicle_fsm_state.take() else {
            return;
        };

        let requested_phase = current_state
            .to_controller_state()
            .update(self, timestamp_ms);
        self.vehicle_fsm_state = Some(current_state);

        if let Some(requested_phase) = requested_phase {
            // Rejections are logged by try_transition
            let _ = self.try_transition(requested_phase);
        }
    }

    /// Moves the vehicle to `new_phase` if that is a legal edge. The new
    /// phase's entry actions, including any deployment charge, finish
    /// before the phase is committed. Illegal requests change nothing.
    pub fn try_transition(&mut self, new_phase: FlightPhase) -> Result<(), TransitionError> {
        let current_phase = self.flight_state.phase;

        if !current_phase.can_transition_to(new_phase) {
            fcu_warn!(
                "Rejected illegal transition {:?} -> {:?}",
                current_phase,
                new_phase
            );
            return Err(TransitionError::Illegal {
                from: current_phase,
                to: new_phase,
            });
        }

        let old_state = self.vehicle_fsm_state.take();
        self.transition_vehicle_state(old_state, FsmState::for_phase(new_phase));

        Ok(())
    }

    fn transition_vehicle_state(&mut self, old_state: Option<FsmState>, mut new_state: FsmState) {
        if let Some(mut old_state) = old_state {
            old_state.to_controller_state().exit_state(self);
        }

        new_state.to_controller_state().enter_state(self);

        let old_phase = self.flight_state.phase;
        self.flight_state.phase = new_state.hal_state();
        self.vehicle_fsm_state = Some(new_state);

        let timestamp_ms = self.driver.timestamp_ms();
        self.push_record(
            timestamp_ms,
            MeasurementKind::FlightPhase,
            self.flight_state.phase as u8 as f32,
        );
        self.refresh_indicator();

        fcu_info!(
            "Flight phase {:?} -> {:?}",
            old_phase,
            self.flight_state.phase
        );
    }

    pub(crate) fn init_vehicle_fsm(&mut self) {
        self.transition_vehicle_state(None, prelaunch::Prelaunch::new());
    }

    /// Energizes a deployment charge and holds the control loop until its
    /// active time is over. A failed fire is latched as a pyro fault.
    pub(crate) fn deploy(&mut self, channel: PyroChannelId) {
        let duration_ms = self.config.pyro_active_time_ms;

        match self.pyro.fire(channel, duration_ms) {
            Ok(()) => {
                let timestamp_ms = self.driver.timestamp_ms();
                self.push_record(timestamp_ms, MeasurementKind::PyroFired, channel as f32);
                self.driver.delay_ms(duration_ms);
            }
            Err(err) => {
                fcu_error!("Deployment on pyro channel {} failed: {:?}", channel, err);
                self.alert_manager
                    .set_condition(FcuAlertCondition::PyroFault);
            }
        }
    }
}
