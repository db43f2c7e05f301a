use libm::pow;

pub const CELSIUS_TO_KELVIN: f64 = 273.15;

const LAPSE_RATE_K_PER_M: f64 = -0.0065;
const PRESSURE_EXPONENT: f64 = 0.190263;

/// Height above the reference point from the ISA troposphere model. The
/// constants must stay bit-for-bit identical to keep recorded flight data
/// comparable.
pub fn calculate_height(pressure_pa: f64, reference_temperature_k: f64, reference_pressure_pa: f64) -> f64 {
    (reference_temperature_k / LAPSE_RATE_K_PER_M)
        * (pow(pressure_pa / reference_pressure_pa, PRESSURE_EXPONENT) - 1.0)
}

/// Inverse of [`calculate_height`].
pub fn pressure_at_height(height_m: f64, reference_temperature_k: f64, reference_pressure_pa: f64) -> f64 {
    let ratio = 1.0 + height_m * LAPSE_RATE_K_PER_M / reference_temperature_k;

    reference_pressure_pa * pow(ratio, 1.0 / PRESSURE_EXPONENT)
}
