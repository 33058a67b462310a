//! One-shot analysis of a reading batch

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::detector::{classify_severity, detect, HypoPeriod};
use crate::error::HypoError;
use crate::features::{enrich_all, DetailedHypoEvent};
use crate::reading::{
    is_chronological, sorted_glucose, sorted_insulin, split_insulin, GlucoseReading,
    InsulinReading,
};
use crate::risk::lbgi;
use crate::stats::{summarize_daily, summarize_overall, DailyHypoSummary, OverallHypoStats};
use crate::units::GlucoseThresholds;

/// Everything the engine derives from one batch of readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypoReport {
    pub thresholds: GlucoseThresholds,
    pub reading_count: usize,
    pub episodes: Vec<HypoPeriod>,
    pub events: Vec<DetailedHypoEvent>,
    pub daily: Vec<DailyHypoSummary>,
    pub overall: OverallHypoStats,
    /// LBGI over the whole batch
    pub lbgi: f64,
}

/// Detect, enrich and summarize hypoglycemia in a batch of readings
///
/// Inputs are copied and sorted; the caller's slices are left untouched.
/// `insulin` may mix bolus and basal records.
pub fn analyze(
    glucose: &[GlucoseReading],
    insulin: &[InsulinReading],
    thresholds: &GlucoseThresholds,
) -> Result<HypoReport, HypoError> {
    thresholds.validate()?;

    if !is_chronological(glucose) {
        warn!("Glucose readings were not in chronological order, sorting a copy");
    }
    let readings = sorted_glucose(glucose);
    let (boluses, basals) = split_insulin(&sorted_insulin(insulin));

    let episodes = classify_severity(&detect(&readings, thresholds.low, false), thresholds.very_low);
    let events = enrich_all(&episodes, &readings, &boluses, &basals);
    let daily = summarize_daily(&readings, thresholds)?;
    let overall = summarize_overall(&daily);

    info!(
        "Analyzed {} readings and {} insulin records: {} episodes",
        readings.len(),
        insulin.len(),
        episodes.len()
    );

    Ok(HypoReport {
        thresholds: *thresholds,
        reading_count: readings.len(),
        lbgi: lbgi(&readings),
        episodes,
        events,
        daily,
        overall,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::InsulinType;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn at(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap()
            + Duration::minutes(minutes)
    }

    fn series(values: &[f64]) -> Vec<GlucoseReading> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| GlucoseReading::new(at(5 * i as i64), v))
            .collect()
    }

    #[test]
    fn test_two_excursions() {
        let mut values = vec![6.0; 10];
        values.extend([3.5, 3.4, 3.3, 4.5, 4.6, 4.7]);
        values.extend(vec![7.0; 30]);
        values.extend([2.9, 2.8, 2.9, 4.5, 4.6, 4.7]);
        values.extend(vec![6.0; 5]);
        let glucose = series(&values);
        let insulin = vec![
            InsulinReading::new(at(20), 4.0, InsulinType::Bolus),
            InsulinReading::new(at(30), 0.5, InsulinType::Basal),
        ];

        let report = analyze(&glucose, &insulin, &GlucoseThresholds::default()).unwrap();

        assert_eq!(report.episodes.len(), 2);
        assert_eq!(report.events.len(), 2);
        assert!(report.episodes[0].end_time < report.episodes[1].start_time);
        assert!(!report.episodes[0].is_severe);
        assert!(report.episodes[1].is_severe);
        assert_eq!(report.overall.total_hypo_events, 2);
        assert_eq!(report.overall.total_severe_events, 1);
        assert_eq!(report.events[0].insulin.last_bolus.map(|b| b.minutes_before), Some(30));
        assert_eq!(report.events[0].insulin.basal_hour_1, Some(0.5));
        assert!(report.lbgi > 0.0);
    }

    #[test]
    fn test_unsorted_input_is_sorted() {
        let mut glucose = series(&[6.0, 3.5, 3.4, 3.3, 4.5, 4.6, 4.7]);
        let sorted = analyze(&glucose, &[], &GlucoseThresholds::default()).unwrap();
        glucose.reverse();
        let reversed = analyze(&glucose, &[], &GlucoseThresholds::default()).unwrap();

        assert_eq!(sorted, reversed);
        assert_eq!(glucose[0].value, 4.7);
    }

    #[test]
    fn test_empty_batch() {
        let report = analyze(&[], &[], &GlucoseThresholds::default()).unwrap();
        assert!(report.episodes.is_empty());
        assert!(report.events.is_empty());
        assert!(report.daily.is_empty());
        assert_eq!(report.overall.total_hypo_events, 0);
        assert_eq!(report.lbgi, 0.0);
    }

    #[test]
    fn test_invalid_thresholds() {
        let bad = GlucoseThresholds { very_low: 3.0, low: 12.0, high: 10.0, very_high: 13.9 };
        assert!(analyze(&[], &[], &bad).is_err());
    }
}
