//! Glucose and insulin reading value types

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::MmolL;

/// A single glucose sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseReading {
    pub timestamp: NaiveDateTime,
    /// mmol/L
    pub value: f64,
}

impl GlucoseReading {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn mmol(&self) -> MmolL {
        MmolL(self.value)
    }

    pub fn mgdl(&self) -> f64 {
        self.mmol().to_mgdl().0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsulinType {
    Bolus,
    Basal,
}

impl InsulinType {
    pub fn as_str(self) -> &'static str {
        match self {
            InsulinType::Bolus => "bolus",
            InsulinType::Basal => "basal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bolus" => Some(InsulinType::Bolus),
            "basal" => Some(InsulinType::Basal),
            _ => None,
        }
    }
}

impl fmt::Display for InsulinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single insulin delivery event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsulinReading {
    pub timestamp: NaiveDateTime,
    /// Units
    pub dose: f64,
    pub insulin_type: InsulinType,
}

impl InsulinReading {
    pub fn new(timestamp: NaiveDateTime, dose: f64, insulin_type: InsulinType) -> Self {
        Self { timestamp, dose, insulin_type }
    }
}

/// True when readings are in non-decreasing timestamp order
pub fn is_chronological(readings: &[GlucoseReading]) -> bool {
    readings.windows(2).all(|w| w[0].timestamp <= w[1].timestamp)
}

/// Chronologically sorted copy; the input is never reordered in place.
/// The sort is stable so same-instant samples keep their relative order.
pub fn sorted_glucose(readings: &[GlucoseReading]) -> Vec<GlucoseReading> {
    let mut sorted = readings.to_vec();
    sorted.sort_by_key(|r| r.timestamp);
    sorted
}

pub fn sorted_insulin(readings: &[InsulinReading]) -> Vec<InsulinReading> {
    let mut sorted = readings.to_vec();
    sorted.sort_by_key(|r| r.timestamp);
    sorted
}

/// Split a mixed insulin stream into (boluses, basals)
pub fn split_insulin(readings: &[InsulinReading]) -> (Vec<InsulinReading>, Vec<InsulinReading>) {
    readings
        .iter()
        .copied()
        .partition(|r| r.insulin_type == InsulinType::Bolus)
}
