//! CSV and JSON projections of analysis results
//!
//! The CSV column order is consumed positionally downstream; add columns at
//! the end only. Missing values are written as [`MISSING`], never as empty
//! fields.

use csv::Writer;
use std::io::{self, Write};

use crate::error::HypoError;
use crate::features::DetailedHypoEvent;
use crate::report::HypoReport;
use crate::stats::DailyHypoSummary;

/// Placeholder for absent values
pub const MISSING: &str = "N/A";

/// Round-trippable timestamp format for CSV cells
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Event columns in output order
///
/// Glucose values (`nadir_mgdl`, `glucose_*`) are whole mg/dL rounded half
/// away from zero, so 58.5 is written as `59`. Rates and insulin units carry
/// two decimals, durations and offsets are whole minutes.
pub const EVENT_COLUMNS: [&str; 19] = [
    "event_id",
    "start_time",
    "nadir_mgdl",
    "duration_minutes",
    "max_rate_of_change",
    "time_to_nadir_minutes",
    "initial_rate_of_change",
    "last_bolus_units",
    "last_bolus_minutes_before",
    "prev_bolus_units",
    "prev_bolus_minutes_before",
    "basal_hour_1",
    "basal_hour_3",
    "basal_hour_5",
    "time_of_day",
    "glucose_minus_60",
    "glucose_minus_30",
    "glucose_minus_10",
    "glucose_plus_15",
];

pub const DAILY_COLUMNS: [&str; 9] = [
    "date",
    "day_of_week",
    "severe_count",
    "non_severe_count",
    "total_count",
    "lowest_value",
    "longest_duration_minutes",
    "total_duration_minutes",
    "lbgi",
];

fn opt<T>(value: Option<T>, fmt: impl Fn(T) -> String) -> String {
    value.map(fmt).unwrap_or_else(|| MISSING.to_string())
}

/// Whole mg/dL, ties away from zero
fn mgdl(v: f64) -> String {
    format!("{:.0}", v.round())
}

/// Rates and insulin units
fn two_places(v: f64) -> String {
    format!("{:.2}", v)
}

fn event_record(event: &DetailedHypoEvent) -> Vec<String> {
    let insulin = &event.insulin;
    let snapshots = &event.snapshots;

    vec![
        event.event_id.clone(),
        event.start_time.format(TIMESTAMP_FORMAT).to_string(),
        mgdl(event.nadir_mgdl),
        event.duration_minutes.to_string(),
        opt(event.max_rate_of_change, two_places),
        opt(event.time_to_nadir_minutes, |m| m.to_string()),
        opt(event.initial_rate_of_change, two_places),
        opt(insulin.last_bolus.map(|b| b.dose), two_places),
        opt(insulin.last_bolus.map(|b| b.minutes_before), |m| m.to_string()),
        opt(insulin.previous_bolus.map(|b| b.dose), two_places),
        opt(insulin.previous_bolus.map(|b| b.minutes_before), |m| m.to_string()),
        opt(insulin.basal_hour_1, two_places),
        opt(insulin.basal_hour_3, two_places),
        opt(insulin.basal_hour_5, two_places),
        event.time_of_day.to_string(),
        opt(snapshots.minus_60, mgdl),
        opt(snapshots.minus_30, mgdl),
        opt(snapshots.minus_10, mgdl),
        opt(snapshots.plus_15, mgdl),
    ]
}

fn daily_record(day: &DailyHypoSummary) -> Vec<String> {
    vec![
        day.date.format("%Y-%m-%d").to_string(),
        day.day_of_week.to_string(),
        day.severe_count.to_string(),
        day.non_severe_count.to_string(),
        day.total_count.to_string(),
        opt(day.lowest_value, |v| format!("{:.1}", v)),
        day.longest_duration_minutes.to_string(),
        day.total_duration_minutes.to_string(),
        format!("{:.2}", day.lbgi),
    ]
}

fn write_records<W: Write>(
    out: W,
    header: &[&str],
    records: impl Iterator<Item = Vec<String>>,
) -> Result<(), HypoError> {
    let mut writer = Writer::from_writer(out);
    writer.write_record(header)?;
    for record in records {
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn render(header: &[&str], records: impl Iterator<Item = Vec<String>>) -> Result<String, HypoError> {
    let mut buf = Vec::new();
    write_records(&mut buf, header, records)?;
    String::from_utf8(buf).map_err(|e| HypoError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

/// Events as CSV text, header included
pub fn events_to_csv(events: &[DetailedHypoEvent]) -> Result<String, HypoError> {
    render(&EVENT_COLUMNS, events.iter().map(event_record))
}

/// Daily summaries as CSV text, header included
pub fn daily_to_csv(daily: &[DailyHypoSummary]) -> Result<String, HypoError> {
    render(&DAILY_COLUMNS, daily.iter().map(daily_record))
}

pub fn write_events_csv<W: Write>(out: W, events: &[DetailedHypoEvent]) -> Result<(), HypoError> {
    write_records(out, &EVENT_COLUMNS, events.iter().map(event_record))
}

pub fn write_daily_csv<W: Write>(out: W, daily: &[DailyHypoSummary]) -> Result<(), HypoError> {
    write_records(out, &DAILY_COLUMNS, daily.iter().map(daily_record))
}

/// Full report as pretty JSON
pub fn report_to_json(report: &HypoReport) -> Result<String, HypoError> {
    Ok(serde_json::to_string_pretty(report)?)
}
