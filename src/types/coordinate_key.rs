//! The canonical cache key for coordinates rounded to a fixed precision.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimal places used when no precision is configured.
///
/// Four decimals trade roughly 11 m (latitude) to 70 m (worst-case longitude) of
/// positional accuracy for a much higher hit rate on clustered observations.
pub const DEFAULT_PRECISION: u8 = 4;

/// Largest supported precision. Beyond this the scaled value no longer fits the
/// exact integer range of an `f64`.
pub const MAX_PRECISION: u8 = 9;

/// A latitude/longitude pair rounded to `precision` decimal places.
///
/// The rounded values are stored as scaled integers, so equality and hashing are
/// exact and independent of float formatting. Keys built from already rounded
/// coordinates are identical to keys built from the raw ones.
///
/// # Examples
///
/// ```
/// use eco_enrich::CoordinateKey;
///
/// let key = CoordinateKey::new(-30.4900714453, 151.6392706226, 4);
/// assert_eq!(key.to_string(), "-30.4901,151.6393");
/// assert_eq!(key, CoordinateKey::new(-30.4901, 151.6393, 4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinateKey {
    lat: i64,
    lon: i64,
    precision: u8,
}

#[derive(Debug, Error, PartialEq)]
pub enum CoordinateKeyError {
    #[error("Coordinate key '{0}' is not of the form 'lat,lon'")]
    Format(String),

    #[error("Coordinate key '{0}' contains a non-numeric component")]
    Number(String),
}

impl CoordinateKey {
    /// Rounds `latitude` and `longitude` to `precision` decimals (clamped to
    /// [`MAX_PRECISION`]). Halfway values round away from zero.
    pub fn new(latitude: f64, longitude: f64, precision: u8) -> Self {
        let precision = precision.min(MAX_PRECISION);
        let scale = Self::scale(precision);
        Self {
            lat: (latitude * scale).round() as i64,
            lon: (longitude * scale).round() as i64,
            precision,
        }
    }

    /// Parses the text encoding (`"lat,lon"`) and re-rounds it to `precision`.
    ///
    /// Whitespace around the components is ignored, so keys written as
    /// `"52.52, 13.405"` are accepted too.
    pub fn parse_with_precision(raw: &str, precision: u8) -> Result<Self, CoordinateKeyError> {
        let (lat, lon) = raw
            .split_once(',')
            .ok_or_else(|| CoordinateKeyError::Format(raw.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| CoordinateKeyError::Number(raw.to_string()))?;
        let lon: f64 = lon
            .trim()
            .parse()
            .map_err(|_| CoordinateKeyError::Number(raw.to_string()))?;
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateKeyError::Number(raw.to_string()));
        }
        Ok(Self::new(lat, lon, precision))
    }

    pub fn latitude(&self) -> f64 {
        self.lat as f64 / Self::scale(self.precision)
    }

    pub fn longitude(&self) -> f64 {
        self.lon as f64 / Self::scale(self.precision)
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    fn scale(precision: u8) -> f64 {
        10f64.powi(precision as i32)
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.precision as usize;
        write!(
            f,
            "{:.*},{:.*}",
            digits,
            self.latitude(),
            digits,
            self.longitude()
        )
    }
}

/// Parses a key at [`DEFAULT_PRECISION`].
impl FromStr for CoordinateKey {
    type Err = CoordinateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_with_precision(s, DEFAULT_PRECISION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(value: f64, precision: u8) -> f64 {
        let scale = 10f64.powi(precision as i32);
        (value * scale).round() / scale
    }

    #[test]
    fn test_rounding_is_idempotent() {
        let samples = [
            (-30.4900714453, 151.6392706226),
            (43.1196234274, -7.6788841188),
            (50.6864393301, 7.1697807312),
            (-40.9498116654, 174.9710916171),
            (43.952764223, -110.6115040714),
            (-18.83915, 16.9536),
            (0.00004, -0.00006),
            (89.99999, -179.99999),
        ];
        for (lat, lon) in samples {
            assert_eq!(
                CoordinateKey::new(lat, lon, 4),
                CoordinateKey::new(round(lat, 4), round(lon, 4), 4),
                "rounding not idempotent for ({}, {})",
                lat,
                lon
            );
        }
    }

    #[test]
    fn test_nearby_points_share_a_key() {
        let a = CoordinateKey::new(52.520_01, 13.404_98, 4);
        let b = CoordinateKey::new(52.519_96, 13.405_03, 4);
        assert_eq!(a, b);
        assert_ne!(a, CoordinateKey::new(52.5210, 13.405, 4));
    }

    #[test]
    fn test_display_uses_fixed_decimals() {
        assert_eq!(CoordinateKey::new(10.0, -5.5, 4).to_string(), "10.0000,-5.5000");
        assert_eq!(CoordinateKey::new(-0.00001, 0.0, 4).to_string(), "0.0000,0.0000");
        assert_eq!(CoordinateKey::new(1.23456, 2.0, 2).to_string(), "1.23,2.00");
    }

    #[test]
    fn test_parse_accepts_both_separators() -> Result<(), CoordinateKeyError> {
        let key = CoordinateKey::new(-18.83917, 16.9536, 4);
        assert_eq!(key.to_string().parse::<CoordinateKey>()?, key);
        assert_eq!("-18.8392, 16.9536".parse::<CoordinateKey>()?, key);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "52.52".parse::<CoordinateKey>(),
            Err(CoordinateKeyError::Format(_))
        ));
        assert!(matches!(
            "north,east".parse::<CoordinateKey>(),
            Err(CoordinateKeyError::Number(_))
        ));
        assert!(matches!(
            "NaN,1".parse::<CoordinateKey>(),
            Err(CoordinateKeyError::Number(_))
        ));
    }

    #[test]
    fn test_precision_is_part_of_identity() {
        assert_ne!(
            CoordinateKey::new(1.0, 2.0, 3),
            CoordinateKey::new(1.0, 2.0, 4)
        );
        assert_eq!(CoordinateKey::new(1.0, 2.0, 30).precision(), MAX_PRECISION);
    }
}
