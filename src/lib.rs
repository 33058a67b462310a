//! hypostat - hypoglycemia episode detection and statistics
//!
//! Turns a batch of continuous glucose monitor readings (plus optional insulin
//! records) into clinically meaningful hypoglycemia episodes:
//! detection → feature extraction → daily/overall aggregation → CSV/JSON.
//!
//! The engine modules (`detector`, `risk`, `features`, `stats`, `report`) are
//! pure and synchronous. `source`, `storage` and `config` supply their inputs.

pub mod config;
pub mod detector;
pub mod error;
pub mod export;
pub mod features;
pub mod reading;
pub mod report;
pub mod risk;
pub mod source;
pub mod stats;
pub mod storage;
pub mod units;

pub use detector::{classify_severity, detect, HypoPeriod};
pub use error::HypoError;
pub use features::{enrich, enrich_all, DetailedHypoEvent};
pub use reading::{GlucoseReading, InsulinReading, InsulinType};
pub use report::{analyze, HypoReport};
pub use risk::lbgi;
pub use stats::{summarize_daily, summarize_overall, DailyHypoSummary, OverallHypoStats};
pub use units::GlucoseThresholds;
