//! Per-episode feature extraction
//!
//! Enriches each detected episode with:
//! - Dynamics: steepest drop before onset, initial rate of change, time to nadir
//! - Insulin context: the two most recent boluses and basal totals per hour
//! - Glucose snapshots at fixed offsets from onset and nadir
//!
//! Every feature is independently optional. Glucose values are in mg/dL and
//! rates in mg/dL per minute, positive when glucose is falling.

use chrono::{Duration, NaiveDateTime, Timelike};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::detector::HypoPeriod;
use crate::reading::{GlucoseReading, InsulinReading};
use crate::units::MmolL;

/// Minutes before onset scanned for the steepest drop
pub const RATE_WINDOW_MINUTES: i64 = 60;

/// Reading pairs this far apart (minutes, inclusive) count toward the steepest drop
pub const RATE_PAIR_GAP_MINUTES: (f64, f64) = (4.0, 6.0);

/// Offsets before onset used for the initial rate of change
pub const INITIAL_RATE_OFFSETS_MINUTES: (i64, i64) = (15, 5);

/// How far a reading may sit from a target time and still match it
pub const MATCH_TOLERANCE_MINUTES: i64 = 5;

pub const BOLUS_LOOKBACK_HOURS: i64 = 6;

/// Hours before onset whose basal deliveries are totalled
pub const BASAL_HOURS: [i64; 3] = [1, 3, 5];

/// A bolus relative to episode onset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BolusContext {
    pub dose: f64,
    pub minutes_before: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InsulinContext {
    pub last_bolus: Option<BolusContext>,
    pub previous_bolus: Option<BolusContext>,
    /// Basal units delivered in the hour before onset
    pub basal_hour_1: Option<f64>,
    /// Basal units delivered three hours before onset
    pub basal_hour_3: Option<f64>,
    /// Basal units delivered five hours before onset
    pub basal_hour_5: Option<f64>,
}

/// Glucose (mg/dL) near fixed offsets from the episode
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GlucoseSnapshots {
    pub minus_60: Option<f64>,
    pub minus_30: Option<f64>,
    pub minus_10: Option<f64>,
    /// 15 minutes after the nadir
    pub plus_15: Option<f64>,
}

/// A hypoglycemia episode with its surrounding context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedHypoEvent {
    pub event_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_minutes: i64,
    pub nadir_mgdl: f64,
    pub nadir_time: NaiveDateTime,
    pub is_severe: bool,
    pub max_rate_of_change: Option<f64>,
    pub time_to_nadir_minutes: Option<i64>,
    pub initial_rate_of_change: Option<f64>,
    pub insulin: InsulinContext,
    /// Hour of onset, 0-23
    pub time_of_day: u32,
    pub snapshots: GlucoseSnapshots,
}

/// Identifier for the `sequence`-th event of a batch, 1-based
pub fn event_id(sequence: usize) -> String {
    format!("HYPO_{:03}", sequence)
}

/// Enrich one episode
///
/// `readings`, `boluses` and `basals` are expected in chronological order.
pub fn enrich(
    sequence: usize,
    episode: &HypoPeriod,
    readings: &[GlucoseReading],
    boluses: &[InsulinReading],
    basals: &[InsulinReading],
) -> DetailedHypoEvent {
    let onset = episode.start_time;
    let snapshot = |target: NaiveDateTime| nearest(readings, target).map(|r| r.mgdl());

    let (last_bolus, previous_bolus) = recent_boluses(boluses, onset);

    DetailedHypoEvent {
        event_id: event_id(sequence),
        start_time: onset,
        end_time: episode.end_time,
        duration_minutes: episode.duration_minutes,
        nadir_mgdl: MmolL(episode.nadir).to_mgdl().0,
        nadir_time: episode.nadir_time,
        is_severe: episode.is_severe,
        max_rate_of_change: max_rate_of_change(readings, onset),
        time_to_nadir_minutes: time_to_nadir(episode),
        initial_rate_of_change: initial_rate_of_change(readings, onset),
        insulin: InsulinContext {
            last_bolus,
            previous_bolus,
            basal_hour_1: basal_in_hour(basals, onset, BASAL_HOURS[0]),
            basal_hour_3: basal_in_hour(basals, onset, BASAL_HOURS[1]),
            basal_hour_5: basal_in_hour(basals, onset, BASAL_HOURS[2]),
        },
        time_of_day: onset.hour(),
        snapshots: GlucoseSnapshots {
            minus_60: snapshot(onset - Duration::minutes(60)),
            minus_30: snapshot(onset - Duration::minutes(30)),
            minus_10: snapshot(onset - Duration::minutes(10)),
            plus_15: snapshot(episode.nadir_time + Duration::minutes(15)),
        },
    }
}

/// Enrich a batch of episodes, numbering events from 1 in the given order
pub fn enrich_all(
    episodes: &[HypoPeriod],
    readings: &[GlucoseReading],
    boluses: &[InsulinReading],
    basals: &[InsulinReading],
) -> Vec<DetailedHypoEvent> {
    let events: Vec<DetailedHypoEvent> = episodes
        .iter()
        .enumerate()
        .map(|(i, episode)| enrich(i + 1, episode, readings, boluses, basals))
        .collect();
    debug!("Enriched {} episodes", events.len());
    events
}

/// Readings with timestamps in `[from, to]`
fn between(readings: &[GlucoseReading], from: NaiveDateTime, to: NaiveDateTime) -> &[GlucoseReading] {
    let lo = readings.partition_point(|r| r.timestamp < from);
    let hi = readings.partition_point(|r| r.timestamp <= to).max(lo);
    &readings[lo..hi]
}

/// Closest reading to `target` within the match tolerance, earlier on ties
fn nearest(readings: &[GlucoseReading], target: NaiveDateTime) -> Option<&GlucoseReading> {
    let tolerance = Duration::minutes(MATCH_TOLERANCE_MINUTES);
    between(readings, target - tolerance, target + tolerance)
        .iter()
        .min_by_key(|r| (r.timestamp - target).num_milliseconds().abs())
}

fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 60_000.0
}

/// Steepest drop between closely spaced readings in the hour up to onset
fn max_rate_of_change(readings: &[GlucoseReading], onset: NaiveDateTime) -> Option<f64> {
    let window = between(readings, onset - Duration::minutes(RATE_WINDOW_MINUTES), onset);
    if window.len() < 2 {
        return None;
    }

    let (min_gap, max_gap) = RATE_PAIR_GAP_MINUTES;
    let mut steepest = 0.0_f64;

    for (i, earlier) in window.iter().enumerate() {
        for later in &window[i + 1..] {
            let gap = minutes_between(earlier.timestamp, later.timestamp);
            if gap > max_gap {
                break;
            }
            if gap < min_gap {
                continue;
            }
            steepest = steepest.max((earlier.mgdl() - later.mgdl()) / gap);
        }
    }

    Some(steepest)
}

/// Drop per minute between the readings nearest 15 and 5 minutes before onset
fn initial_rate_of_change(readings: &[GlucoseReading], onset: NaiveDateTime) -> Option<f64> {
    let (early_offset, late_offset) = INITIAL_RATE_OFFSETS_MINUTES;
    let early = nearest(readings, onset - Duration::minutes(early_offset))?;
    let late = nearest(readings, onset - Duration::minutes(late_offset))?;

    let minutes = minutes_between(early.timestamp, late.timestamp);
    if minutes <= 0.0 {
        return None;
    }
    Some((early.mgdl() - late.mgdl()) / minutes)
}

fn time_to_nadir(episode: &HypoPeriod) -> Option<i64> {
    let minutes = (episode.nadir_time - episode.start_time).num_minutes();
    (minutes >= 0).then_some(minutes)
}

/// The two most recent boluses before onset within the lookback
fn recent_boluses(
    boluses: &[InsulinReading],
    onset: NaiveDateTime,
) -> (Option<BolusContext>, Option<BolusContext>) {
    let lookback = onset - Duration::hours(BOLUS_LOOKBACK_HOURS);
    let mut recent: Vec<&InsulinReading> = boluses
        .iter()
        .filter(|b| b.timestamp < onset && b.timestamp >= lookback)
        .collect();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let context = |b: &&InsulinReading| BolusContext {
        dose: b.dose,
        minutes_before: (onset - b.timestamp).num_minutes(),
    };
    (recent.first().map(context), recent.get(1).map(context))
}

/// Basal units in `[onset - hour h, onset - (hour - 1) h)`
fn basal_in_hour(basals: &[InsulinReading], onset: NaiveDateTime, hour: i64) -> Option<f64> {
    let from = onset - Duration::hours(hour);
    let to = onset - Duration::hours(hour - 1);

    basals
        .iter()
        .filter(|b| b.timestamp >= from && b.timestamp < to)
        .map(|b| b.dose)
        .fold(None, |total, dose| Some(total.unwrap_or(0.0) + dose))
}
