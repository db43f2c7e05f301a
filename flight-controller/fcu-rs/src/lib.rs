// Define no_std except for testing and sil feature
#![cfg_attr(not(any(test, feature = "sil")), no_std)]
#![deny(unsafe_code)]

// Diagnostic logging. Goes to defmt on the board, stdout/stderr under
// test or sil, and nowhere otherwise. The silent arm still type-checks
// its arguments.

macro_rules! fcu_debug {
    ($($arg:tt)*) => {{
        #[cfg(all(feature = "defmt", not(any(test, feature = "sil"))))]
        defmt::debug!($($arg)*);

        #[cfg(any(test, feature = "sil"))]
        println!("[DEBUG] {}", format_args!($($arg)*));

        #[cfg(not(any(feature = "defmt", test, feature = "sil")))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! fcu_info {
    ($($arg:tt)*) => {{
        #[cfg(all(feature = "defmt", not(any(test, feature = "sil"))))]
        defmt::info!($($arg)*);

        #[cfg(any(test, feature = "sil"))]
        println!("[INFO] {}", format_args!($($arg)*));

        #[cfg(not(any(feature = "defmt", test, feature = "sil")))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! fcu_warn {
    ($($arg:tt)*) => {{
        #[cfg(all(feature = "defmt", not(any(test, feature = "sil"))))]
        defmt::warn!($($arg)*);

        #[cfg(any(test, feature = "sil"))]
        eprintln!("[WARN] {}", format_args!($($arg)*));

        #[cfg(not(any(feature = "defmt", test, feature = "sil")))]
        let _ = format_args!($($arg)*);
    }};
}

macro_rules! fcu_error {
    ($($arg:tt)*) => {{
        #[cfg(all(feature = "defmt", not(any(test, feature = "sil"))))]
        defmt::error!($($arg)*);

        #[cfg(any(test, feature = "sil"))]
        eprintln!("[ERROR] {}", format_args!($($arg)*));

        #[cfg(not(any(feature = "defmt", test, feature = "sil")))]
        let _ = format_args!($($arg)*);
    }};
}

mod alert_watchdog;
pub mod flight_state;
pub mod pyro;
pub mod vehicle_fsm;

use flight_state::FlightState;
use mint::Vector3;
use pyro::PyroChannelBank;
use shared::{
    alerts::{AlertBitmaskType, AlertManager},
    fcu_hal::{
        ConfigError, FcuAlertCondition, FcuDriver, FcuTelemetryFrame, FlightConfig, FlightPhase,
        Indicator, SensorError,
    },
    util::LoopTimer,
    LogRecord, LogSink, MeasurementKind,
};

pub use vehicle_fsm::TransitionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FcuError {
    /// The boot self-test could not read a sensor. The vehicle must not
    /// be armed.
    InitFailure(SensorError),
    /// Configuration can only change on the pad.
    ConfigurationLocked(FlightPhase),
    /// The configuration names channels or timings no charge could fire with.
    InvalidConfiguration(ConfigError),
}

/// Last good value of every sensor channel. Failed reads leave the
/// previous value in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub pressure_pa: f64,
    pub temperature_c: f64,
    pub acceleration: Vector3<f32>,
}

impl SensorReading {
    /// Magnitude of the acceleration vector in m/s^2.
    pub fn acceleration_magnitude(&self) -> f32 {
        nalgebra::Vector3::from(self.acceleration).magnitude()
    }
}

pub struct Fcu<'a> {
    config: FlightConfig,
    flight_state: FlightState,
    driver: &'a mut dyn FcuDriver,
    pyro: &'a PyroChannelBank<'a>,
    log_sink: &'a mut dyn LogSink,
    alert_manager: AlertManager<FcuAlertCondition>,
    vehicle_fsm_state: Option<vehicle_fsm::FsmState>,
    last_reading: SensorReading,
    consecutive_sensor_faults: u32,
    measurement_log_timer: LoopTimer<u32>,
    last_update_ms: u32,
    dropped_log_records: u32,
    log_overflowing: bool,
}

impl<'a> Fcu<'a> {
    /// Checks the configuration, runs the boot self-test and enters
    /// `Prelaunch`. On failure the fault indicator is left on and nothing
    /// else is touched.
    pub fn init(
        config: FlightConfig,
        driver: &'a mut dyn FcuDriver,
        pyro: &'a PyroChannelBank<'a>,
        log_sink: &'a mut dyn LogSink,
    ) -> Result<Self, FcuError> {
        driver.set_indicator(Indicator::Booting);

        if let Err(err) = config.validate() {
            fcu_error!("Rejected flight configuration: {:?}", err);
            driver.set_indicator(Indicator::Fault);

            return Err(FcuError::InvalidConfiguration(err));
        }

        let last_reading = match Self::self_test(driver) {
            Ok(reading) => reading,
            Err(err) => {
                fcu_error!("Sensor self-test failed: {:?}", err);
                driver.set_indicator(Indicator::Fault);

                return Err(FcuError::InitFailure(err));
            }
        };

        let timestamp_ms = driver.timestamp_ms();
        let measurement_log_timer = LoopTimer::new(config.measurement_log_interval_ms);

        let mut fcu = Self {
            config,
            flight_state: FlightState::new(),
            driver,
            pyro,
            log_sink,
            alert_manager: AlertManager::new(),
            vehicle_fsm_state: None,
            last_reading,
            consecutive_sensor_faults: 0,
            measurement_log_timer,
            last_update_ms: timestamp_ms,
            dropped_log_records: 0,
            log_overflowing: false,
        };
        fcu.init_vehicle_fsm();

        fcu_info!(
            "Flight controller ready, {:?} deployment",
            fcu.config.deployment_mode
        );

        Ok(fcu)
    }

    /// One control cycle. Meant to be called every ~10 ms.
    pub fn update(&mut self) {
        let timestamp_ms = self.driver.timestamp_ms();
        let dt_ms = timestamp_ms.wrapping_sub(self.last_update_ms);
        self.last_update_ms = timestamp_ms;

        self.poll_sensors(timestamp_ms);
        self.update_alert_watchdog();
        self.update_vehicle_fsm(timestamp_ms);

        if self.measurement_log_timer.should_update(dt_ms) {
            self.log_measurements(timestamp_ms);
        }
    }

    pub fn configure(&mut self, config: FlightConfig) -> Result<(), FcuError> {
        if self.flight_state.phase != FlightPhase::Prelaunch {
            fcu_warn!(
                "Ignoring configuration change during {:?}",
                self.flight_state.phase
            );
            return Err(FcuError::ConfigurationLocked(self.flight_state.phase));
        }

        if let Err(err) = config.validate() {
            fcu_warn!("Rejected flight configuration: {:?}", err);
            return Err(FcuError::InvalidConfiguration(err));
        }

        self.measurement_log_timer
            .set_interval(config.measurement_log_interval_ms);
        self.config = config;

        Ok(())
    }

    pub fn generate_telemetry_frame(&self) -> FcuTelemetryFrame {
        FcuTelemetryFrame {
            timestamp_ms: self.driver.timestamp_ms(),
            flight_phase: self.flight_state.phase,
            current_height_m: self.flight_state.current_height_m as f32,
            max_height_m: self.flight_state.max_height_m as f32,
            pyro_fired_bitmask: self.pyro.fired_bitmask(),
            alert_bitmask: self.alert_manager.condition_bitmask(),
            dropped_log_records: self.dropped_log_records,
        }
    }

    pub fn flight_state(&self) -> &FlightState {
        &self.flight_state
    }

    pub fn phase(&self) -> FlightPhase {
        self.flight_state.phase
    }

    pub fn config(&self) -> &FlightConfig {
        &self.config
    }

    pub fn last_reading(&self) -> &SensorReading {
        &self.last_reading
    }

    pub fn alert_bitmask(&self) -> AlertBitmaskType {
        self.alert_manager.condition_bitmask()
    }

    pub fn is_alert_set(&self, condition: FcuAlertCondition) -> bool {
        self.alert_manager.is_set(condition)
    }

    pub fn dropped_log_records(&self) -> u32 {
        self.dropped_log_records
    }

    /// Shows the phase color, or the fault color while a sensor or pyro
    /// fault is latched.
    pub(crate) fn refresh_indicator(&mut self) {
        let faulted = self
            .alert_manager
            .is_set(FcuAlertCondition::PersistentSensorFault)
            || self.alert_manager.is_set(FcuAlertCondition::PyroFault);

        let indicator = if faulted {
            Indicator::Fault
        } else {
            Indicator::for_phase(self.flight_state.phase)
        };
        self.driver.set_indicator(indicator);
    }

    fn self_test(driver: &mut dyn FcuDriver) -> Result<SensorReading, SensorError> {
        let (pressure_pa, temperature_c) = driver.read_pressure_temperature()?;
        let acceleration = driver.read_acceleration()?;

        Ok(SensorReading {
            pressure_pa,
            temperature_c,
            acceleration,
        })
    }

    fn poll_sensors(&mut self, timestamp_ms: u32) {
        let mut faulted = false;

        match self.driver.read_pressure_temperature() {
            Ok((pressure_pa, temperature_c)) => {
                self.last_reading.pressure_pa = pressure_pa;
                self.last_reading.temperature_c = temperature_c;
            }
            Err(err) => {
                faulted = true;
                self.report_sensor_fault(timestamp_ms, err);
            }
        }

        match self.driver.read_acceleration() {
            Ok(acceleration) => self.last_reading.acceleration = acceleration,
            Err(err) => {
                faulted = true;
                self.report_sensor_fault(timestamp_ms, err);
            }
        }

        if faulted {
            self.consecutive_sensor_faults = self.consecutive_sensor_faults.saturating_add(1);
        } else {
            self.consecutive_sensor_faults = 0;
        }
    }

    fn report_sensor_fault(&mut self, timestamp_ms: u32, err: SensorError) {
        fcu_warn!("Sensor read failed ({:?}), keeping last value", err);
        self.push_record(timestamp_ms, MeasurementKind::SensorFault, err as u8 as f32);
    }

    fn log_measurements(&mut self, timestamp_ms: u32) {
        let reading = self.last_reading;

        self.push_record(
            timestamp_ms,
            MeasurementKind::Temperature,
            reading.temperature_c as f32,
        );
        self.push_record(
            timestamp_ms,
            MeasurementKind::Pressure,
            reading.pressure_pa as f32,
        );
        self.push_record(
            timestamp_ms,
            MeasurementKind::Altitude,
            self.flight_state.current_height_m as f32,
        );
        self.push_record(
            timestamp_ms,
            MeasurementKind::Acceleration,
            reading.acceleration_magnitude(),
        );
    }

    /// Hands a record to the log sink without ever waiting on it.
    pub(crate) fn push_record(&mut self, timestamp_ms: u32, kind: MeasurementKind, value: f32) {
        if self
            .log_sink
            .try_enqueue(LogRecord::new(timestamp_ms, kind, value))
        {
            if self.log_overflowing {
                fcu_info!(
                    "Log queue drained, {} records dropped so far",
                    self.dropped_log_records
                );
                self.log_overflowing = false;
            }
            return;
        }

        self.dropped_log_records = self.dropped_log_records.saturating_add(1);
        if !self.log_overflowing {
            fcu_warn!("Log queue full, dropping records");
            self.log_overflowing = true;
        }
    }
}
