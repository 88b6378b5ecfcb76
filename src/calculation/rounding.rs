//! Two-decimal rounding and fixed-point output.
//!
//! Pay is computed in `f64`. Every quantity that is stored or leaves the
//! engine goes through [`round2`] first and is rendered by [`Fixed2`] with
//! exactly two decimals.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

/// Rounds to two decimal places, half away from zero.
///
/// # Example
///
/// ```
/// use payslip_engine::calculation::round2;
///
/// assert_eq!(round2(38043.478260869565), 38043.48);
/// assert_eq!(round2(0.125), 0.13);
/// assert_eq!(round2(-0.125), -0.13);
/// ```
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// A money or hour quantity that crosses the boundary as a two-decimal string.
///
/// The wrapped value is rounded with [`round2`] on construction.
///
/// # Example
///
/// ```
/// use payslip_engine::calculation::Fixed2;
///
/// let total = Fixed2::new(6480000.0);
/// assert_eq!(total.to_string(), "6480000.00");
/// assert_eq!(serde_json::to_string(&total).unwrap(), "\"6480000.00\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Fixed2(f64);

impl Fixed2 {
    /// Wraps `value` after rounding it to two decimals.
    pub fn new(value: f64) -> Self {
        Self(round2(value))
    }

    /// Returns the rounded value.
    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Fixed2 {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for Fixed2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // -0.00 would leak through for tiny negative residues
        let value = if self.0 == 0.0 { 0.0 } else { self.0 };
        write!(f, "{:.2}", value)
    }
}

impl FromStr for Fixed2 {
    type Err = std::num::ParseFloatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<f64>().map(Self::new)
    }
}

impl Serialize for Fixed2 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fixed2 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Fixed2Visitor;

        impl Visitor<'_> for Fixed2Visitor {
            type Value = Fixed2;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a two-decimal string or a number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Fixed2, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Fixed2, E> {
                Ok(Fixed2::new(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Fixed2, E> {
                Ok(Fixed2::new(v as f64))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Fixed2, E> {
                Ok(Fixed2::new(v as f64))
            }
        }

        deserializer.deserialize_any(Fixed2Visitor)
    }
}
