//! Calibration offset computation.
//!
//! Thermostat firmware accepts offsets in half-degree steps, so the raw
//! difference between the reference sensor and the thermostat's measured
//! temperature is quantized before publishing. The function is pure and
//! total; the boundary behavior at 1/3 and 2/3 of a degree is part of the
//! contract and covered by the tests below.

/// Computes the calibration offset a thermostat should apply so that its
/// reported temperature matches the reference sensor.
///
/// `measured` is the thermostat's raw temperature, i.e. its reported
/// temperature minus the offset it is currently applying.
pub fn calibrate(sensor_temperature: f64, measured_temperature: f64) -> f64 {
    let delta = sensor_temperature - measured_temperature;
    delta.trunc() + quantize_to_half(delta.fract())
}

/// Quantizes a fractional degree to the nearest supported half step.
///
/// The sign is extracted once, the magnitude is thresholded, and the sign
/// is reapplied: |f| <= 1/3 maps to 0.0, |f| <= 2/3 maps to 0.5, anything
/// larger maps to 1.0.
fn quantize_to_half(frac: f64) -> f64 {
    let sign = if frac < 0.0 { -1.0 } else { 1.0 };
    let magnitude = frac.abs();

    let step = if magnitude <= 1.0 / 3.0 {
        0.0
    } else if magnitude <= 2.0 / 3.0 {
        0.5
    } else {
        1.0
    };

    sign * step
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantization_boundary_table() {
        // (sensor, measured, expected offset)
        let cases = [
            ("4.6 -> 4.5", 21.6, 17.0, 4.5),
            ("-2.4 -> -2.5", 21.6, 24.0, -2.5),
            ("0.6 -> 0.5", 21.6, 21.0, 0.5),
            ("0.1 -> 0.0", 21.6, 21.5, 0.0),
            ("0.33 -> 0.0", 21.33, 21.0, 0.0),
            ("0.34 -> 0.5", 21.34, 21.0, 0.5),
            ("0.66 -> 0.5", 21.66, 21.0, 0.5),
            ("0.67 -> 1.0", 21.67, 21.0, 1.0),
            ("1.33 -> 1.0", 22.33, 21.0, 1.0),
            ("1.34 -> 1.5", 22.34, 21.0, 1.5),
            ("1.66 -> 1.5", 22.66, 21.0, 1.5),
            ("1.67 -> 2.0", 22.67, 21.0, 2.0),
            ("-1.33 -> -1.0", 21.00, 22.33, -1.0),
            ("-1.34 -> -1.5", 21.00, 22.34, -1.5),
            ("-1.66 -> -1.5", 21.00, 22.66, -1.5),
            ("-1.67 -> -2.0", 21.00, 22.67, -2.0),
        ];

        for (desc, sensor, measured, expected) in cases {
            assert_eq!(calibrate(sensor, measured), expected, "{desc}");
        }
    }

    #[test]
    fn deterministic() {
        for _ in 0..10 {
            assert_eq!(calibrate(21.6, 17.0), 4.5);
        }
    }

    #[test]
    fn sign_symmetry() {
        let pairs = [(21.6, 17.0), (21.34, 21.0), (22.67, 21.0), (19.2, 19.2)];
        for (a, b) in pairs {
            assert_eq!(calibrate(a, b), -calibrate(b, a));
        }
    }

    #[test]
    fn equal_inputs_give_zero_offset() {
        assert_eq!(calibrate(20.0, 20.0), 0.0);
        assert_eq!(calibrate(-5.0, -5.0), 0.0);
    }

    #[test]
    fn works_below_freezing() {
        // Negative temperatures are legitimate inputs, not sentinels.
        assert_eq!(calibrate(-2.6, -5.0), 2.5);
        assert_eq!(calibrate(-5.0, -2.6), -2.5);
    }
}
