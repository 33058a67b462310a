//! Daily and overall hypoglycemia statistics
//!
//! Readings are grouped by calendar date (naive, no timezone) and detection
//! runs on each day independently. An episode crossing midnight is therefore
//! cut at the day boundary and appears in both days' counts.

use chrono::{Datelike, NaiveDate, Weekday};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::detector::{classify_severity, detect};
use crate::error::HypoError;
use crate::reading::{sorted_glucose, GlucoseReading};
use crate::risk::{lbgi, RiskBand, HIGH_RISK_LBGI, MODERATE_RISK_LBGI};
use crate::units::GlucoseThresholds;

/// Hypoglycemia summary for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyHypoSummary {
    pub date: NaiveDate,
    pub day_of_week: Weekday,
    pub severe_count: usize,
    pub non_severe_count: usize,
    pub total_count: usize,
    /// Lowest episode nadir of the day (mmol/L), none without episodes
    pub lowest_value: Option<f64>,
    pub longest_duration_minutes: i64,
    pub total_duration_minutes: i64,
    pub lbgi: f64,
}

impl DailyHypoSummary {
    pub fn risk_band(&self) -> RiskBand {
        RiskBand::classify(self.lbgi)
    }

    pub fn has_hypos(&self) -> bool {
        self.total_count > 0
    }
}

/// Rollup over all daily summaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallHypoStats {
    pub total_days: usize,
    pub days_with_hypos: usize,
    pub total_hypo_events: usize,
    pub total_severe_events: usize,
    pub total_non_severe_events: usize,
    pub average_lbgi: f64,
    /// Days with LBGI above 2.5
    pub days_moderate_risk: usize,
    /// Days with LBGI above 5.0
    pub days_high_risk: usize,
    pub lowest_value: Option<f64>,
    pub longest_duration_minutes: i64,
    pub average_events_per_day: f64,
}

impl OverallHypoStats {
    /// Percentage of days with at least one episode
    pub fn hypo_day_percent(&self) -> f64 {
        if self.total_days == 0 {
            0.0
        } else {
            (self.days_with_hypos as f64 / self.total_days as f64) * 100.0
        }
    }
}

/// Summarize a single day's readings
pub fn summarize_day(
    date: NaiveDate,
    readings: &[GlucoseReading],
    thresholds: &GlucoseThresholds,
) -> DailyHypoSummary {
    let sorted = sorted_glucose(readings);
    let periods = classify_severity(&detect(&sorted, thresholds.low, false), thresholds.very_low);

    let severe_count = periods.iter().filter(|p| p.is_severe).count();
    let lowest_value = periods
        .iter()
        .map(|p| p.nadir)
        .fold(None, |low: Option<f64>, v| Some(low.map_or(v, |l| l.min(v))));

    DailyHypoSummary {
        date,
        day_of_week: date.weekday(),
        severe_count,
        non_severe_count: periods.len() - severe_count,
        total_count: periods.len(),
        lowest_value,
        longest_duration_minutes: periods.iter().map(|p| p.duration_minutes).max().unwrap_or(0),
        total_duration_minutes: periods.iter().map(|p| p.duration_minutes).sum(),
        lbgi: lbgi(&sorted),
    }
}

/// Summarize every calendar day present in `readings`, in date order
pub fn summarize_daily(
    readings: &[GlucoseReading],
    thresholds: &GlucoseThresholds,
) -> Result<Vec<DailyHypoSummary>, HypoError> {
    thresholds.validate()?;

    let mut by_day: BTreeMap<NaiveDate, Vec<GlucoseReading>> = BTreeMap::new();
    for reading in readings {
        by_day.entry(reading.timestamp.date()).or_default().push(*reading);
    }

    Ok(by_day
        .into_iter()
        .map(|(date, day)| summarize_day(date, &day, thresholds))
        .collect())
}

/// Roll daily summaries up into overall statistics
pub fn summarize_overall(daily: &[DailyHypoSummary]) -> OverallHypoStats {
    let total_days = daily.len();
    let total_hypo_events: usize = daily.iter().map(|d| d.total_count).sum();

    let (average_lbgi, average_events_per_day) = if total_days == 0 {
        (0.0, 0.0)
    } else {
        (
            daily.iter().map(|d| d.lbgi).sum::<f64>() / total_days as f64,
            total_hypo_events as f64 / total_days as f64,
        )
    };

    let stats = OverallHypoStats {
        total_days,
        days_with_hypos: daily.iter().filter(|d| d.has_hypos()).count(),
        total_hypo_events,
        total_severe_events: daily.iter().map(|d| d.severe_count).sum(),
        total_non_severe_events: daily.iter().map(|d| d.non_severe_count).sum(),
        average_lbgi,
        days_moderate_risk: daily.iter().filter(|d| d.lbgi > MODERATE_RISK_LBGI).count(),
        days_high_risk: daily.iter().filter(|d| d.lbgi > HIGH_RISK_LBGI).count(),
        lowest_value: daily
            .iter()
            .filter_map(|d| d.lowest_value)
            .fold(None, |low: Option<f64>, v| Some(low.map_or(v, |l| l.min(v)))),
        longest_duration_minutes: daily.iter().map(|d| d.longest_duration_minutes).max().unwrap_or(0),
        average_events_per_day,
    };

    info!(
        "{} hypo events over {} days ({} severe), average LBGI {:.2}",
        stats.total_hypo_events, stats.total_days, stats.total_severe_events, stats.average_lbgi
    );
    stats
}
