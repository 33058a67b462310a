//! Glucose unit types and clinical thresholds
//!
//! The engine works in mmol/L internally. Enriched events and the risk
//! transform restate values in mg/dL, so both units get a newtype here and
//! the conversion factor lives in one place.

use serde::{Deserialize, Serialize};

use crate::error::HypoError;

/// mg/dL per mmol/L for glucose
pub const MGDL_PER_MMOL: f64 = 18.0;

/// Glucose value in mg/dL (milligrams per deciliter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MgDl(pub f64);

/// Glucose value in mmol/L (millimoles per liter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MmolL(pub f64);

impl MgDl {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.0} mg/dL", self.0)
    }

    pub fn to_mmol(self) -> MmolL {
        MmolL(self.0 / MGDL_PER_MMOL)
    }
}

impl MmolL {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.1} mmol/L", self.0)
    }

    pub fn to_mgdl(self) -> MgDl {
        MgDl(self.0 * MGDL_PER_MMOL)
    }
}

/// Unit a configuration file expresses its thresholds in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL")]
    MgDl,
    #[serde(rename = "mmol/L")]
    #[default]
    MmolL,
}

impl GlucoseUnit {
    /// Parse a unit label as written in config files
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "mg/dl" | "mgdl" => Some(GlucoseUnit::MgDl),
            "mmol/l" | "mmol" => Some(GlucoseUnit::MmolL),
            _ => None,
        }
    }

    /// Convert a value in this unit to mmol/L
    pub fn to_mmol(self, value: f64) -> f64 {
        match self {
            GlucoseUnit::MgDl => MgDl(value).to_mmol().0,
            GlucoseUnit::MmolL => value,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => "mg/dL",
            GlucoseUnit::MmolL => "mmol/L",
        }
    }
}

/// Clinical glucose thresholds in mmol/L
///
/// Ordering `very_low < low < high < very_high` is required; use
/// [`GlucoseThresholds::new`] or [`GlucoseThresholds::validate`] before
/// handing externally supplied values to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseThresholds {
    /// Severe hypoglycemia - default 3.0
    pub very_low: f64,
    /// Hypoglycemia - default 3.9
    pub low: f64,
    /// Hyperglycemia - default 10.0
    pub high: f64,
    /// Severe hyperglycemia - default 13.9
    pub very_high: f64,
}

impl Default for GlucoseThresholds {
    fn default() -> Self {
        Self {
            very_low: 3.0,
            low: 3.9,
            high: 10.0,
            very_high: 13.9,
        }
    }
}

impl GlucoseThresholds {
    /// Build validated thresholds from mmol/L values
    pub fn new(very_low: f64, low: f64, high: f64, very_high: f64) -> Result<Self, HypoError> {
        let thresholds = Self { very_low, low, high, very_high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Build validated thresholds from values given in `unit`
    pub fn from_unit(
        unit: GlucoseUnit,
        very_low: f64,
        low: f64,
        high: f64,
        very_high: f64,
    ) -> Result<Self, HypoError> {
        Self::new(
            unit.to_mmol(very_low),
            unit.to_mmol(low),
            unit.to_mmol(high),
            unit.to_mmol(very_high),
        )
    }

    pub fn validate(&self) -> Result<(), HypoError> {
        let values = [self.very_low, self.low, self.high, self.very_high];
        let finite = values.iter().all(|v| v.is_finite());
        let ordered = values.windows(2).all(|w| w[0] < w[1]);

        if finite && ordered {
            Ok(())
        } else {
            Err(HypoError::InvalidThresholds {
                very_low: self.very_low,
                low: self.low,
                high: self.high,
                very_high: self.very_high,
            })
        }
    }

    /// Get threshold display string for the hypoglycemia band
    pub fn format_low_band(&self) -> String {
        format!("<{:.1} mmol/L (severe <{:.1})", self.low, self.very_low)
    }
}
