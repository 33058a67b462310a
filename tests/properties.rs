//! Property-based tests for the detection and risk engine
//!
//! Uses proptest for randomized streams with shrinking.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

use hypostat::detector::{classify_severity, detect, MIN_RUN, RECOVERY_MARGIN_MMOL};
use hypostat::reading::{sorted_glucose, GlucoseReading};
use hypostat::risk::{lbgi, RISK_CENTER_MGDL};
use hypostat::units::MGDL_PER_MMOL;
use hypostat::stats::{summarize_daily, summarize_overall};
use hypostat::{analyze, GlucoseThresholds};

const LOW: f64 = 3.9;

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
}

/// Readings at 5-minute spacing
fn series(values: &[f64]) -> Vec<GlucoseReading> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| GlucoseReading::new(base() + Duration::minutes(5 * i as i64), v))
        .collect()
}

/// Values rounded to 0.1 mmol/L, biased around the low threshold
fn glucose_values() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec((15u32..90).prop_map(|v| v as f64 / 10.0), 0..200)
}

fn index_of(readings: &[GlucoseReading], time: NaiveDateTime) -> usize {
    readings.iter().position(|r| r.timestamp == time).unwrap()
}

#[test]
fn scenario_a_single_episode() {
    let readings = series(&[5.0, 5.0, 3.5, 3.4, 3.3, 4.5, 4.6, 4.7]);
    let periods = detect(&readings, LOW, false);

    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].nadir, 3.3);
    assert_eq!(periods[0].duration_minutes, 15);
    assert_eq!(periods[0].start_time, readings[2].timestamp);
    assert_eq!(periods[0].end_time, readings[5].timestamp);
}

#[test]
fn scenario_b_two_lows_are_not_enough() {
    let readings = series(&[5.0, 5.0, 3.5, 3.6, 4.5, 4.6, 4.7]);
    assert!(detect(&readings, LOW, false).is_empty());
}

#[test]
fn scenario_c_stream_ends_low() {
    let readings = series(&[5.0, 5.0, 3.5, 3.4, 3.3, 3.2]);
    let periods = detect(&readings, LOW, false);

    assert_eq!(periods.len(), 1);
    assert_eq!(periods[0].end_time, readings.last().unwrap().timestamp);
}

#[test]
fn scenario_d_two_excursions() {
    let mut values = vec![5.0, 3.5, 3.4, 3.3, 4.5, 4.6, 4.7];
    values.extend(vec![6.0; 40]);
    values.extend([3.6, 3.1, 3.3, 4.5, 4.6, 4.7, 5.0]);
    let readings = series(&values);

    let periods = detect(&readings, LOW, false);
    assert_eq!(periods.len(), 2);
    assert!(periods[0].end_time < periods[1].start_time);

    let daily = summarize_daily(&readings, &GlucoseThresholds::default()).unwrap();
    assert_eq!(summarize_overall(&daily).total_hypo_events, 2);
}

#[test]
fn scenario_e_empty_input() {
    let thresholds = GlucoseThresholds::default();

    assert!(detect(&[], LOW, false).is_empty());
    assert_eq!(lbgi(&[]), 0.0);
    assert!(hypostat::enrich_all(&[], &[], &[], &[]).is_empty());
    let daily = summarize_daily(&[], &thresholds).unwrap();
    assert!(daily.is_empty());
    assert_eq!(summarize_overall(&daily).total_hypo_events, 0);
    assert!(analyze(&[], &[], &thresholds).unwrap().events.is_empty());
}

proptest! {
    /// Each episode opens on MIN_RUN consecutive lows and, unless cut by the
    /// end of data, closes on MIN_RUN consecutive recovered readings
    #[test]
    fn minimum_run_at_both_ends(values in glucose_values()) {
        let readings = series(&values);
        for p in detect(&readings, LOW, false) {
            let start = index_of(&readings, p.start_time);
            let end = index_of(&readings, p.end_time);
            prop_assert!(start + MIN_RUN <= readings.len());
            prop_assert!(readings[start..start + MIN_RUN].iter().all(|r| r.value < LOW));

            if end + MIN_RUN <= readings.len() && end > start + MIN_RUN - 1 {
                let line = LOW.max(p.nadir + RECOVERY_MARGIN_MMOL);
                prop_assert!(readings[end..end + MIN_RUN].iter().all(|r| r.value >= line));
            } else {
                prop_assert_eq!(end, readings.len() - 1, "episode not confirmed or truncated");
            }
        }
    }

    /// The nadir is the minimum over the episode's span
    #[test]
    fn nadir_is_span_minimum(values in glucose_values()) {
        let readings = series(&values);
        for p in detect(&readings, LOW, false) {
            let min = readings
                .iter()
                .filter(|r| p.contains(r.timestamp))
                .map(|r| r.value)
                .fold(f64::INFINITY, f64::min);
            prop_assert_eq!(p.nadir, min);
            prop_assert!(p.start_time <= p.nadir_time && p.nadir_time <= p.end_time);
            prop_assert_eq!(readings[p.nadir_index].timestamp, p.nadir_time);
            prop_assert!(p.duration_minutes >= 0);
        }
    }

    /// Episodes come back in order and never overlap
    #[test]
    fn episodes_do_not_overlap(values in glucose_values()) {
        let readings = series(&values);
        let periods = detect(&readings, LOW, false);
        for pair in periods.windows(2) {
            prop_assert!(pair[0].end_time < pair[1].start_time);
        }
    }

    /// Changing very_low only changes severity
    #[test]
    fn severity_follows_very_low(values in glucose_values(), very_low in 2.0..3.8f64) {
        let readings = series(&values);
        let periods = detect(&readings, LOW, false);
        let classified = classify_severity(&periods, very_low);

        prop_assert_eq!(periods.len(), classified.len());
        for (raw, p) in periods.iter().zip(&classified) {
            prop_assert_eq!(p.is_severe, p.nadir < very_low);
            prop_assert_eq!(raw.start_time, p.start_time);
            prop_assert_eq!(raw.end_time, p.end_time);
        }
    }

    /// Detection is deterministic and sorting sorted input changes nothing
    #[test]
    fn detection_is_idempotent(values in glucose_values()) {
        let readings = series(&values);
        let first = detect(&readings, LOW, false);
        let again = detect(&readings, LOW, false);
        let resorted = detect(&sorted_glucose(&readings), LOW, false);

        prop_assert_eq!(&first, &again);
        prop_assert_eq!(&first, &resorted);
    }

    /// Readings at or above the risk center carry no low-glucose risk
    #[test]
    fn lbgi_zero_at_or_above_risk_center(
        values in proptest::collection::vec(RISK_CENTER_MGDL / MGDL_PER_MMOL + 0.01..25.0f64, 0..100),
    ) {
        prop_assert_eq!(lbgi(&series(&values)), 0.0);
    }

    /// Swapping a no-risk reading for a low one never lowers LBGI
    #[test]
    fn lbgi_non_decreasing_when_reading_replaced_by_low(
        values in proptest::collection::vec(6.5..12.0f64, 1..60),
        low in 1.5..3.9f64,
        slot in any::<prop::sample::Index>(),
    ) {
        let before = lbgi(&series(&values));
        let mut replaced = values.clone();
        replaced[slot.index(values.len())] = low;
        let after = lbgi(&series(&replaced));

        prop_assert!(before >= 0.0);
        prop_assert!(after >= before);
    }

    /// Appending a low to a set with no risk raises LBGI above zero
    #[test]
    fn lbgi_positive_after_appending_low_to_no_risk_set(
        values in proptest::collection::vec(6.5..12.0f64, 0..60),
        low in 1.5..3.9f64,
    ) {
        let mut appended = values.clone();
        appended.push(low);
        prop_assert!(lbgi(&series(&appended)) > lbgi(&series(&values)));
    }
}
