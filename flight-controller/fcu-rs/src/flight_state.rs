use shared::{
    fcu_hal::FlightPhase,
    standard_atmosphere::{calculate_height, CELSIUS_TO_KELVIN},
};

/// Everything the flight logic remembers between control cycles. Heights
/// are relative to the baseline captured at launch.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightState {
    pub phase: FlightPhase,
    pub reference_temperature_k: f64,
    pub reference_pressure_pa: f64,
    pub current_height_m: f64,
    pub max_height_m: f64,
    pub launch_debounce_count: u32,
    pub apogee_debounce_count: u32,
    pub takeoff_time_ms: Option<u32>,
    pub apogee_time_ms: Option<u32>,
}

impl FlightState {
    pub const fn new() -> Self {
        Self {
            phase: FlightPhase::Prelaunch,
            reference_temperature_k: 0.0,
            reference_pressure_pa: 0.0,
            current_height_m: 0.0,
            max_height_m: 0.0,
            launch_debounce_count: 0,
            apogee_debounce_count: 0,
            takeoff_time_ms: None,
            apogee_time_ms: None,
        }
    }

    /// Takes the given barometer sample as ground level. Heights and the
    /// apogee counter start over from zero.
    pub fn capture_baseline(&mut self, pressure_pa: f64, temperature_c: f64) {
        self.reference_temperature_k = temperature_c + CELSIUS_TO_KELVIN;
        self.reference_pressure_pa = pressure_pa;
        self.current_height_m = 0.0;
        self.max_height_m = 0.0;
        self.apogee_debounce_count = 0;
    }

    pub fn has_baseline(&self) -> bool {
        self.reference_pressure_pa > 0.0
    }

    /// Recomputes the current height from a pressure sample. Without a
    /// baseline the height stays at zero. The maximum is left alone.
    pub fn update_height(&mut self, pressure_pa: f64) -> f64 {
        if self.has_baseline() {
            self.current_height_m = calculate_height(
                pressure_pa,
                self.reference_temperature_k,
                self.reference_pressure_pa,
            );
        }

        self.current_height_m
    }

    /// Height update for the climb. Only here does the maximum move.
    pub fn update_ascent_height(&mut self, pressure_pa: f64) -> f64 {
        let height_m = self.update_height(pressure_pa);
        self.max_height_m = self.max_height_m.max(height_m);

        height_m
    }

    pub fn time_since_takeoff_ms(&self, timestamp_ms: u32) -> Option<u32> {
        self.takeoff_time_ms
            .map(|takeoff_ms| timestamp_ms.wrapping_sub(takeoff_ms))
    }

    pub fn time_since_apogee_ms(&self, timestamp_ms: u32) -> Option<u32> {
        self.apogee_time_ms
            .map(|apogee_ms| timestamp_ms.wrapping_sub(apogee_ms))
    }
}

impl Default for FlightState {
    fn default() -> Self {
        Self::new()
    }
}
