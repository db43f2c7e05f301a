use shared::{
    fcu_hal::{DeploymentMode, FlightPhase},
    ControllerState,
};

use crate::Fcu;

use super::FsmState;

#[derive(Debug)]
pub struct Ascent;

impl<'f> ControllerState<FlightPhase, Fcu<'f>> for Ascent {
    fn update(&mut self, fcu: &mut Fcu<'f>, timestamp_ms: u32) -> Option<FlightPhase> {
        fcu.flight_state
            .update_ascent_height(fcu.last_reading.pressure_pa);

        if self.apogee_detected(fcu, timestamp_ms) || self.apogee_timed_out(fcu, timestamp_ms) {
            fcu.flight_state.apogee_time_ms = Some(timestamp_ms);
            fcu_info!("Apogee at {} m", fcu.flight_state.max_height_m);

            return Some(match fcu.config.deployment_mode {
                DeploymentMode::Dual => FlightPhase::DrogueOut,
                DeploymentMode::Single => FlightPhase::MainOut,
            });
        }

        None
    }

    fn enter_state(&mut self, fcu: &mut Fcu<'f>) {
        // Single sample baseline, taken while the vehicle is already moving
        let reading = fcu.last_reading;
        fcu.flight_state
            .capture_baseline(reading.pressure_pa, reading.temperature_c);
        fcu.flight_state.takeoff_time_ms = Some(fcu.driver.timestamp_ms());

        fcu_info!(
            "Launch detected, baseline {} Pa / {} K",
            fcu.flight_state.reference_pressure_pa,
            fcu.flight_state.reference_temperature_k
        );
    }

    fn exit_state(&mut self, _fcu: &mut Fcu<'f>) {
        // Nothing
    }
}

impl Ascent {
    pub fn new() -> FsmState {
        FsmState::Ascent(Self)
    }

    /// Counts consecutive samples more than the margin below the maximum,
    /// once the minimum time after launch has passed.
    fn apogee_detected(&mut self, fcu: &mut Fcu, timestamp_ms: u32) -> bool {
        let config = &fcu.config;
        let state = &mut fcu.flight_state;

        let since_takeoff_ms = state.time_since_takeoff_ms(timestamp_ms).unwrap_or(0);
        let descending = state.current_height_m < state.max_height_m - config.apogee_height_margin_m;

        if descending && since_takeoff_ms > config.apogee_min_time_after_launch_ms {
            if state.apogee_debounce_count == 0 {
                fcu_debug!(
                    "Apogee candidate at {} m, max {} m",
                    state.current_height_m,
                    state.max_height_m
                );
            }
            state.apogee_debounce_count += 1;
        } else {
            state.apogee_debounce_count = 0;
        }

        state.apogee_debounce_count > config.apogee_debounce_count
    }

    /// Fail-safe for a barometer that never shows a descent.
    fn apogee_timed_out(&self, fcu: &Fcu, timestamp_ms: u32) -> bool {
        let timed_out = fcu
            .flight_state
            .time_since_takeoff_ms(timestamp_ms)
            .map_or(false, |elapsed_ms| {
                elapsed_ms >= fcu.config.apogee_timeout_after_launch_ms
            });

        if timed_out {
            fcu_warn!("No apogee detected before the ascent timeout");
        }

        timed_out
    }
}
