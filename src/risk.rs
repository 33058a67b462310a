//! Low Blood Glucose Index (LBGI)
//!
//! Kovatchev's symmetrizing transform maps mg/dL onto a scale that is zero at
//! 112.5 mg/dL. Only the low branch contributes: each reading below the
//! center adds `10 * f(bg)^2`, and the index is the mean over all readings.

use serde::{Deserialize, Serialize};

use crate::reading::GlucoseReading;

/// LBGI above this marks a day as moderate risk or worse
pub const MODERATE_RISK_LBGI: f64 = 2.5;

/// LBGI above this marks a day as high risk
pub const HIGH_RISK_LBGI: f64 = 5.0;

/// Where the symmetrized scale crosses zero; values at or above carry no risk
pub const RISK_CENTER_MGDL: f64 = 112.5;

/// Floor applied before the logarithm so non-positive inputs stay finite
const MIN_MGDL: f64 = 1.0;

/// Symmetrized glucose, negative below the clinical center point
fn symmetrize(mgdl: f64) -> f64 {
    1.509 * (mgdl.max(MIN_MGDL).ln().powf(1.084) - 5.381)
}

/// Low-side risk contribution of a single value in mg/dL
pub fn low_risk(mgdl: f64) -> f64 {
    let f = symmetrize(mgdl);
    if f < 0.0 {
        10.0 * f * f
    } else {
        0.0
    }
}

/// LBGI over a set of readings; 0.0 for an empty set
pub fn lbgi(readings: &[GlucoseReading]) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    let total: f64 = readings.iter().map(|r| low_risk(r.mgdl())).sum();
    total / readings.len() as f64
}

/// Risk band of an LBGI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    Low,
    Moderate,
    High,
}

impl RiskBand {
    pub fn classify(lbgi: f64) -> Self {
        if lbgi > HIGH_RISK_LBGI {
            RiskBand::High
        } else if lbgi > MODERATE_RISK_LBGI {
            RiskBand::Moderate
        } else {
            RiskBand::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskBand::Low => "Low",
            RiskBand::Moderate => "Moderate",
            RiskBand::High => "High",
        }
    }
}
