//! Unit conversion utilities
//!
//! The kernel computes in millimeters. Inch setups and drawings are scaled by
//! [`INCH_TO_MM`] at the configuration boundary.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimeters per inch.
pub const INCH_TO_MM: f64 = 25.4;

/// Length unit of a setup or drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Millimeters
    #[default]
    Mm,
    /// Inches
    Inch,
}

impl Unit {
    /// Factor that converts a value in this unit to millimeters.
    pub fn to_mm_factor(self) -> f64 {
        match self {
            Self::Mm => 1.0,
            Self::Inch => INCH_TO_MM,
        }
    }

    /// Converts a length in this unit to millimeters.
    pub fn to_mm(self, value: f64) -> f64 {
        value * self.to_mm_factor()
    }

    /// Converts a length in millimeters to this unit.
    pub fn from_mm(self, value_mm: f64) -> f64 {
        value_mm / self.to_mm_factor()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mm => write!(f, "mm"),
            Self::Inch => write!(f, "inch"),
        }
    }
}

impl FromStr for Unit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mm" | "metric" => Ok(Self::Mm),
            "inch" | "in" | "imperial" => Ok(Self::Inch),
            _ => Err(CoreError::UnknownUnit(s.to_string())),
        }
    }
}
