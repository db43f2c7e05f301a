#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod alerts;
pub mod fcu_hal;
pub mod fcu_mock;
pub mod logger;
pub mod pyro_hal;
pub mod standard_atmosphere;
pub mod util;

pub use logger::{LogRecord, LogSink, MeasurementKind};

pub const GRAVITY: f32 = 9.80665; // In m/s^2

/// One phase of a controller's state machine. `R` is what the phase asks
/// the owning controller to do next, `C` is the controller itself.
pub trait ControllerState<R, C> {
    fn update(&mut self, controller: &mut C, timestamp_ms: u32) -> Option<R>;
    fn enter_state(&mut self, controller: &mut C);
    fn exit_state(&mut self, controller: &mut C);
}

pub trait ControllerFsm<R, C, S> {
    fn to_controller_state(&mut self) -> &mut dyn ControllerState<R, C>;
    fn hal_state(&self) -> S;
}
