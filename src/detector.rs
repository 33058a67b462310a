//! Hypoglycemia episode detection
//!
//! A single pass over chronologically sorted readings with two states. An
//! episode opens after [`MIN_RUN`] consecutive readings below the threshold
//! and closes after [`MIN_RUN`] consecutive recovered readings, where a
//! recovered reading clears both the threshold and the running nadir plus
//! [`RECOVERY_MARGIN_MMOL`]. Both ends are anchored to the first reading of
//! their run.

use chrono::NaiveDateTime;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::reading::GlucoseReading;

/// Consecutive readings needed to open or close an episode
pub const MIN_RUN: usize = 3;

/// Distance above the nadir a reading must clear to count as recovered (mmol/L)
pub const RECOVERY_MARGIN_MMOL: f64 = 0.6;

/// A detected hypoglycemia episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HypoPeriod {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub duration_minutes: i64,
    /// Lowest value in the episode (mmol/L)
    pub nadir: f64,
    pub nadir_time: NaiveDateTime,
    /// Index of the nadir reading in the slice the episode was detected from
    pub nadir_index: usize,
    pub is_severe: bool,
}

impl HypoPeriod {
    /// Copy of this episode with severity derived from its nadir
    pub fn with_severity(self, very_low: f64) -> Self {
        Self {
            is_severe: self.nadir < very_low,
            ..self
        }
    }

    /// True when `time` falls inside the episode, both ends inclusive
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.start_time <= time && time <= self.end_time
    }
}

enum State {
    Normal {
        low_run: usize,
    },
    InEpisode {
        start: usize,
        nadir: usize,
        recovery_run: usize,
        recovery_start: usize,
    },
}

/// Detect hypoglycemia episodes below `threshold` (mmol/L)
///
/// `readings` must be sorted by timestamp; unsorted input is not rejected
/// but yields best-effort episodes. Every returned episode carries
/// `is_severe` as given; use [`classify_severity`] to derive it from the
/// nadir afterwards.
pub fn detect(readings: &[GlucoseReading], threshold: f64, is_severe: bool) -> Vec<HypoPeriod> {
    let mut periods = Vec::new();
    if readings.len() < MIN_RUN {
        return periods;
    }

    let mut state = State::Normal { low_run: 0 };

    for (i, reading) in readings.iter().enumerate() {
        state = match state {
            State::Normal { low_run } => {
                if reading.value >= threshold {
                    State::Normal { low_run: 0 }
                } else if low_run + 1 < MIN_RUN {
                    State::Normal { low_run: low_run + 1 }
                } else {
                    let start = i + 1 - MIN_RUN;
                    let nadir = lowest_in(readings, start, i);
                    debug!(
                        "Episode opened at {} (nadir so far {:.1})",
                        readings[start].timestamp, readings[nadir].value
                    );
                    State::InEpisode {
                        start,
                        nadir,
                        recovery_run: 0,
                        recovery_start: i,
                    }
                }
            }
            State::InEpisode { start, nadir, recovery_run, recovery_start } => {
                let nadir = if reading.value < readings[nadir].value { i } else { nadir };
                let recovery_line = threshold.max(readings[nadir].value + RECOVERY_MARGIN_MMOL);

                if reading.value < recovery_line {
                    State::InEpisode { start, nadir, recovery_run: 0, recovery_start: i }
                } else {
                    let recovery_start = if recovery_run == 0 { i } else { recovery_start };
                    if recovery_run + 1 < MIN_RUN {
                        State::InEpisode {
                            start,
                            nadir,
                            recovery_run: recovery_run + 1,
                            recovery_start,
                        }
                    } else {
                        let period = build_period(readings, start, recovery_start, nadir, is_severe);
                        debug!(
                            "Episode closed at {} ({} min, nadir {:.1})",
                            period.end_time, period.duration_minutes, period.nadir
                        );
                        periods.push(period);
                        State::Normal { low_run: 0 }
                    }
                }
            }
        };
    }

    // Stream ended mid-episode: close on the last reading without confirmation
    if let State::InEpisode { start, nadir, .. } = state {
        let period = build_period(readings, start, readings.len() - 1, nadir, is_severe);
        debug!("Episode truncated by end of data at {}", period.end_time);
        periods.push(period);
    }

    periods
}

/// Derive `is_severe` for each episode from its nadir against `very_low`
///
/// Episode boundaries are untouched; only severity changes.
pub fn classify_severity(periods: &[HypoPeriod], very_low: f64) -> Vec<HypoPeriod> {
    periods.iter().map(|p| p.with_severity(very_low)).collect()
}

/// Index of the lowest reading in `start..=end`, earliest on ties
fn lowest_in(readings: &[GlucoseReading], start: usize, end: usize) -> usize {
    (start..=end).fold(start, |best, i| {
        if readings[i].value < readings[best].value { i } else { best }
    })
}

fn build_period(
    readings: &[GlucoseReading],
    start: usize,
    end: usize,
    nadir: usize,
    is_severe: bool,
) -> HypoPeriod {
    let start_time = readings[start].timestamp;
    let end_time = readings[end].timestamp;

    HypoPeriod {
        start_time,
        end_time,
        duration_minutes: (end_time - start_time).num_minutes().max(0),
        nadir: readings[nadir].value,
        nadir_time: readings[nadir].timestamp,
        nadir_index: nadir,
        is_severe,
    }
}
