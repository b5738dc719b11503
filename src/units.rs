//! Unit conversion helpers for raw gateway values.
//!
//! The gateway reports imperial units as loosely typed strings. Everything in
//! here is pure and infallible: anything that does not parse as a finite
//! number becomes `0.0` so that a malformed upload can never fail ingestion.

/// Sentinel returned by the compass helpers when the input is not a number.
pub const UNKNOWN_DIRECTION: &str = "unknown";

const COMPASS_16: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

const COMPASS_8: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

// ---

/// Parse a raw field, falling back to `0.0` for missing, non-numeric, NaN or
/// infinite input.
pub fn parse_or_default(raw: Option<&str>) -> f64 {
    // ---
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Clamp a non-finite value to `0.0`.
pub fn finite_or_default(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

pub fn mph_to_kmh(mph: f64) -> f64 {
    mph * 1.60934
}

pub fn inhg_to_hpa(inhg: f64) -> f64 {
    inhg * 33.8639
}

pub fn inches_to_mm(inches: f64) -> f64 {
    inches * 25.4
}

/// Round to a fixed number of decimal places. Values too large to scale are
/// returned as is; they carry no fractional digits anyway.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let scaled = value * factor;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / factor
}

/// Compass rose granularity used for cardinal labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompassRose {
    /// N, NNE, NE, ... (22.5° sectors)
    Sixteen,
    /// N, NE, E, ... (45° sectors)
    Eight,
}

impl CompassRose {
    fn labels(self) -> &'static [&'static str] {
        match self {
            CompassRose::Sixteen => &COMPASS_16,
            CompassRose::Eight => &COMPASS_8,
        }
    }

    /// Label for a bearing in degrees. Any real value is accepted; bearings
    /// outside `[0, 360)` wrap around.
    pub fn label(self, degrees: f64) -> &'static str {
        // ---
        if !degrees.is_finite() {
            return UNKNOWN_DIRECTION;
        }
        let labels = self.labels();
        let n = labels.len() as f64;
        let sector = 360.0 / n;
        let index = ((degrees + sector / 2.0) / sector).floor().rem_euclid(n) as usize;
        labels[index]
    }

    /// Label for a raw, possibly non-numeric, bearing string.
    pub fn label_raw(self, raw: &str) -> &'static str {
        match raw.trim().parse::<f64>() {
            Ok(deg) => self.label(deg),
            Err(_) => UNKNOWN_DIRECTION,
        }
    }
}

pub fn cardinal16(degrees: f64) -> &'static str {
    CompassRose::Sixteen.label(degrees)
}

pub fn cardinal8(degrees: f64) -> &'static str {
    CompassRose::Eight.label(degrees)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fahrenheit_fixed_points() {
        // ---
        assert!(close(fahrenheit_to_celsius(32.0), 0.0));
        assert!(close(fahrenheit_to_celsius(212.0), 100.0));
        assert!(close(fahrenheit_to_celsius(-40.0), -40.0));

        for f in [-20.5, 0.0, 41.0, 68.0, 99.9] {
            assert!(close(fahrenheit_to_celsius(f), (f - 32.0) * 5.0 / 9.0));
        }
    }

    #[test]
    fn test_other_conversions() {
        // ---
        assert!(close(mph_to_kmh(5.0), 8.0467));
        assert!(close(inhg_to_hpa(1.0), 33.8639));
        assert!(close(inches_to_mm(2.0), 50.8));
    }

    #[test]
    fn test_round_to_large_values_stay_finite() {
        // ---
        assert_eq!(round_to(1.005e3, 1), 1005.0);
        assert_eq!(round_to(1e307, 2), 1e307);
        assert_eq!(round_to(-1e308, 3), -1e308);
        assert!(round_to(f64::MAX, 2).is_finite());
    }

    #[test]
    fn test_parse_or_default() {
        // ---
        assert_eq!(parse_or_default(Some("12.5")), 12.5);
        assert_eq!(parse_or_default(Some(" 7 ")), 7.0);
        assert_eq!(parse_or_default(Some("-3.25")), -3.25);
        assert_eq!(parse_or_default(Some("abc")), 0.0);
        assert_eq!(parse_or_default(Some("")), 0.0);
        assert_eq!(parse_or_default(None), 0.0);

        // Rust parses these, the pipeline must not let them through
        assert_eq!(parse_or_default(Some("NaN")), 0.0);
        assert_eq!(parse_or_default(Some("inf")), 0.0);
        assert_eq!(parse_or_default(Some("-infinity")), 0.0);
    }

    #[test]
    fn test_cardinal16_points() {
        // ---
        assert_eq!(cardinal16(0.0), "N");
        assert_eq!(cardinal16(90.0), "E");
        assert_eq!(cardinal16(180.0), "S");
        assert_eq!(cardinal16(270.0), "W");
        assert_eq!(cardinal16(22.5), "NNE");
        assert_eq!(cardinal16(11.24), "N");
        assert_eq!(cardinal16(11.25), "NNE");
        assert_eq!(cardinal16(359.0), "N");
    }

    #[test]
    fn test_cardinal16_always_in_set() {
        // ---
        let mut deg = 0.0;
        while deg < 360.0 {
            assert!(COMPASS_16.contains(&cardinal16(deg)), "{deg} out of set");
            deg += 0.7;
        }
    }

    #[test]
    fn test_cardinal_wraps_out_of_range() {
        // ---
        assert_eq!(cardinal16(360.0), "N");
        assert_eq!(cardinal16(450.0), "E");
        assert_eq!(cardinal16(-90.0), "W");
        assert_eq!(cardinal16(-5.0), "N");
        assert_eq!(cardinal8(-45.0), "NW");
        assert_eq!(cardinal8(725.0), "N");
    }

    #[test]
    fn test_cardinal8_points() {
        // ---
        assert_eq!(cardinal8(0.0), "N");
        assert_eq!(cardinal8(45.0), "NE");
        assert_eq!(cardinal8(135.0), "SE");
        assert_eq!(cardinal8(180.0), "S");
        assert_eq!(cardinal8(22.4), "N");
        assert_eq!(cardinal8(22.5), "NE");
    }

    #[test]
    fn test_non_numeric_direction_is_unknown() {
        // ---
        assert_eq!(CompassRose::Sixteen.label_raw("north"), UNKNOWN_DIRECTION);
        assert_eq!(CompassRose::Eight.label_raw(""), UNKNOWN_DIRECTION);
        assert_eq!(CompassRose::Sixteen.label_raw("NaN"), UNKNOWN_DIRECTION);
        assert_eq!(CompassRose::Sixteen.label_raw("180"), "S");
    }
}
