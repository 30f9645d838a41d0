//! Dew point via the Magnus formula (base-10 form).
//!
//! Coefficients switch below 0 °C to the over-ice parameterisation.

const SATURATION_BASE_HPA: f64 = 6.1078;

fn magnus_coefficients(temp: f64) -> (f64, f64) {
    if temp >= 0.0 {
        (7.5, 237.3)
    } else {
        (7.6, 250.7)
    }
}

/// Saturation vapour pressure in hPa.
pub fn saturation_vapour_pressure(temp: f64) -> f64 {
    let (a, b) = magnus_coefficients(temp);
    SATURATION_BASE_HPA * 10f64.powf((a * temp) / (b + temp))
}

/// Actual vapour pressure in hPa for a relative humidity in percent.
pub fn vapour_pressure(temp: f64, humidity: f64) -> f64 {
    (humidity / 100.0) * saturation_vapour_pressure(temp)
}

/// Dew point in °C. Returns NaN for non-positive humidity.
pub fn dew_point(temp: f64, humidity: f64) -> f64 {
    let (a, b) = magnus_coefficients(temp);
    let v = (vapour_pressure(temp, humidity) / SATURATION_BASE_HPA).log10();
    b * v / (a - v)
}
