use mint::Vector3;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumCount as EnumCountMacro, EnumIter};

use crate::{
    alerts::AlertBitmaskType,
    pyro_hal::{PyroChannelId, PYRO_CHANNEL_COUNT},
};

pub const LAUNCH_ACCEL_THRESHOLD_MPS2: f32 = 12.0;
pub const LAUNCH_ACCEL_COUNT: u32 = 5;

pub const APOGEE_HEIGHT_THRESHOLD_M: f64 = 2.0;
pub const APOGEE_MIN_TIME_AFTER_LAUNCH_MS: u32 = 10_200;
pub const APOGEE_HEIGHT_COUNT: u32 = 10;
/// Ascent fail-safe for a barometer that never shows a descent. Sized for
/// a motor burn plus coast of under 30 s, roughly three times the apogee
/// lockout. Vehicles that coast longer must raise it in `FlightConfig`,
/// or the drogue fires while still climbing.
pub const APOGEE_TIMEOUT_AFTER_LAUNCH_MS: u32 = 30_000;

pub const PYRO_ACTIVE_TIME_MS: u32 = 1_000;

pub const MAIN_HEIGHT_DEPLOY_M: f64 = 500.0;
pub const MAIN_TIME_AFTER_DROGUE_MS: u32 = 2_000;

pub const LANDED_HEIGHT_THRESHOLD_M: f64 = 100.0;
pub const LANDED_TIMEOUT_AFTER_APOGEE_MS: u32 = 60_000;

pub const ARMING_DELAY_MS: u32 = 5_000;

pub const DROGUE_CHANNEL: u8 = 0;
pub const MAIN_CHANNEL: u8 = 1;

pub const MEASUREMENT_LOG_INTERVAL_MS: u32 = 100;
pub const SENSOR_FAULT_ALERT_COUNT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, EnumIter, EnumCountMacro)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlightPhase {
    Prelaunch,
    Armed,
    Ascent,
    DrogueOut,
    MainOut,
    Landed,
}

impl FlightPhase {
    /// Whether `(self, next)` is an edge of the flight graph. Same-phase
    /// re-entry and backward motion are never edges.
    pub const fn can_transition_to(self, next: FlightPhase) -> bool {
        matches!(
            (self, next),
            (FlightPhase::Prelaunch, FlightPhase::Armed)
                | (FlightPhase::Armed, FlightPhase::Ascent)
                | (FlightPhase::Ascent, FlightPhase::DrogueOut)
                | (FlightPhase::Ascent, FlightPhase::MainOut)
                | (FlightPhase::DrogueOut, FlightPhase::MainOut)
                | (FlightPhase::MainOut, FlightPhase::Landed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeploymentMode {
    /// Drogue at apogee, main at `main_deploy_height_m`.
    Dual,
    /// Main at apogee.
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    Barometer,
    Accelerometer,
}

/// A `FlightConfig` that could never fire its recovery charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    ChannelOutOfRange(PyroChannelId),
    SharedDeploymentChannel(PyroChannelId),
    ZeroPyroActiveTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Indicator {
    Booting,
    Prelaunch,
    Armed,
    Ascent,
    DrogueOut,
    MainOut,
    Landed,
    Fault,
}

impl Indicator {
    pub const fn for_phase(phase: FlightPhase) -> Self {
        match phase {
            FlightPhase::Prelaunch => Indicator::Prelaunch,
            FlightPhase::Armed => Indicator::Armed,
            FlightPhase::Ascent => Indicator::Ascent,
            FlightPhase::DrogueOut => Indicator::DrogueOut,
            FlightPhase::MainOut => Indicator::MainOut,
            FlightPhase::Landed => Indicator::Landed,
        }
    }

    pub const fn rgb(self) -> (u8, u8, u8) {
        match self {
            Indicator::Booting => (255, 255, 255),
            Indicator::Prelaunch => (0, 50, 0),
            Indicator::Armed => (255, 160, 0),
            Indicator::Ascent => (0, 0, 255),
            Indicator::DrogueOut => (0, 255, 255),
            Indicator::MainOut => (255, 0, 255),
            Indicator::Landed => (0, 255, 0),
            Indicator::Fault => (255, 0, 0),
        }
    }
}

/// Status bits published by the power and system monitors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SystemStatus(pub u8);

impl SystemStatus {
    pub const INIT_OK: u8 = 1 << 0;
    pub const ERROR: u8 = 1 << 1;
    pub const BATTERY_LOW: u8 = 1 << 2;
    pub const BATTERY_CRITICAL: u8 = 1 << 3;
    pub const BATTERY_CHARGING: u8 = 1 << 4;
    pub const BATTERY_FULL: u8 = 1 << 5;
    pub const USB_POWERED: u8 = 1 << 6;

    pub const fn contains(&self, bits: u8) -> bool {
        self.0 & bits == bits
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FcuAlertCondition {
    SensorFault,
    PersistentSensorFault,
    PyroFault,
    LogQueueOverflow,
    BatteryLow,
    BatteryCritical,
}

impl From<FcuAlertCondition> for AlertBitmaskType {
    fn from(condition: FcuAlertCondition) -> Self {
        condition as AlertBitmaskType
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcuTelemetryFrame {
    pub timestamp_ms: u32,
    pub flight_phase: FlightPhase,
    pub current_height_m: f32,
    pub max_height_m: f32,
    pub pyro_fired_bitmask: u8,
    pub alert_bitmask: AlertBitmaskType,
    pub dropped_log_records: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightConfig {
    pub deployment_mode: DeploymentMode,
    pub arming_delay_ms: u32,
    pub launch_accel_threshold_mps2: f32,
    pub launch_debounce_count: u32,
    pub apogee_height_margin_m: f64,
    pub apogee_min_time_after_launch_ms: u32,
    pub apogee_debounce_count: u32,
    pub apogee_timeout_after_launch_ms: u32,
    pub main_deploy_height_m: f64,
    pub main_min_time_after_drogue_ms: u32,
    pub landed_height_m: f64,
    pub landed_timeout_after_apogee_ms: u32,
    pub pyro_active_time_ms: u32,
    pub drogue_channel: u8,
    pub main_channel: u8,
    pub measurement_log_interval_ms: u32,
    pub sensor_fault_alert_count: u32,
}

impl FlightConfig {
    pub const fn default() -> Self {
        Self {
            deployment_mode: DeploymentMode::Dual,
            arming_delay_ms: ARMING_DELAY_MS,
            launch_accel_threshold_mps2: LAUNCH_ACCEL_THRESHOLD_MPS2,
            launch_debounce_count: LAUNCH_ACCEL_COUNT,
            apogee_height_margin_m: APOGEE_HEIGHT_THRESHOLD_M,
            apogee_min_time_after_launch_ms: APOGEE_MIN_TIME_AFTER_LAUNCH_MS,
            apogee_debounce_count: APOGEE_HEIGHT_COUNT,
            apogee_timeout_after_launch_ms: APOGEE_TIMEOUT_AFTER_LAUNCH_MS,
            main_deploy_height_m: MAIN_HEIGHT_DEPLOY_M,
            main_min_time_after_drogue_ms: MAIN_TIME_AFTER_DROGUE_MS,
            landed_height_m: LANDED_HEIGHT_THRESHOLD_M,
            landed_timeout_after_apogee_ms: LANDED_TIMEOUT_AFTER_APOGEE_MS,
            pyro_active_time_ms: PYRO_ACTIVE_TIME_MS,
            drogue_channel: DROGUE_CHANNEL,
            main_channel: MAIN_CHANNEL,
            measurement_log_interval_ms: MEASUREMENT_LOG_INTERVAL_MS,
            sensor_fault_alert_count: SENSOR_FAULT_ALERT_COUNT,
        }
    }

    pub const fn single_deployment() -> Self {
        let mut config = Self::default();
        config.deployment_mode = DeploymentMode::Single;
        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for channel in [self.drogue_channel, self.main_channel] {
            if channel as usize >= PYRO_CHANNEL_COUNT {
                return Err(ConfigError::ChannelOutOfRange(channel));
            }
        }

        if self.drogue_channel == self.main_channel {
            return Err(ConfigError::SharedDeploymentChannel(self.main_channel));
        }

        if self.pyro_active_time_ms == 0 {
            return Err(ConfigError::ZeroPyroActiveTime);
        }

        Ok(())
    }
}

/// Monotonic millisecond counter. Wraps after ~49 days, so elapsed times
/// must be taken with `wrapping_sub`.
pub trait Clock: Sync {
    fn timestamp_ms(&self) -> u32;
}

pub trait FcuDriver {
    fn timestamp_ms(&self) -> u32;

    /// Calibrated barometer reading as `(pressure_pa, temperature_c)`.
    fn read_pressure_temperature(&mut self) -> Result<(f64, f64), SensorError>;
    /// Calibrated acceleration in m/s^2.
    fn read_acceleration(&mut self) -> Result<Vector3<f32>, SensorError>;

    fn set_indicator(&mut self, indicator: Indicator);
    fn system_status(&self) -> SystemStatus;

    /// Busy-waits for `duration_ms`. Only used to hold the control loop
    /// while a deployment charge is energized.
    fn delay_ms(&mut self, duration_ms: u32);
}
