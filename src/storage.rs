//! SQLite storage for glucose and insulin readings
//!
//! Only raw readings are stored; analysis results are recomputed per run.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, Result};
use std::path::Path;

use crate::reading::{GlucoseReading, InsulinReading, InsulinType};

/// Timestamp layout in the database; sorts lexicographically in time order
const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// SQLite database for storing readings
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Create or open a database at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Database that lives only as long as this value
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS glucose_readings (
                id INTEGER PRIMARY KEY,
                timestamp TEXT NOT NULL UNIQUE,
                mmol_l REAL NOT NULL,
                imported_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS insulin_readings (
                id INTEGER PRIMARY KEY,
                timestamp TEXT NOT NULL,
                dose REAL NOT NULL,
                insulin_type TEXT NOT NULL,
                imported_at TEXT DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (timestamp, insulin_type)
            );

            CREATE INDEX IF NOT EXISTS idx_glucose_timestamp
                ON glucose_readings(timestamp);

            CREATE INDEX IF NOT EXISTS idx_insulin_timestamp
                ON insulin_readings(timestamp);"
        )?;

        Ok(Self { conn })
    }

    /// Bulk import glucose readings, returns count of new entries
    ///
    /// A reading whose timestamp is already stored is skipped.
    pub fn import_glucose(&mut self, readings: &[GlucoseReading]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO glucose_readings (timestamp, mmol_l) VALUES (?1, ?2)",
            )?;
            for reading in readings {
                count += stmt.execute(params![format_timestamp(reading.timestamp), reading.value])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Bulk import insulin records, returns count of new entries
    pub fn import_insulin(&mut self, readings: &[InsulinReading]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO insulin_readings (timestamp, dose, insulin_type)
                 VALUES (?1, ?2, ?3)",
            )?;
            for reading in readings {
                count += stmt.execute(params![
                    format_timestamp(reading.timestamp),
                    reading.dose,
                    reading.insulin_type.as_str(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// All glucose readings in chronological order
    pub fn glucose_readings(&self) -> Result<Vec<GlucoseReading>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, mmol_l FROM glucose_readings ORDER BY timestamp"
        )?;

        let readings = stmt
            .query_map([], Self::row_to_glucose)?
            .collect::<Result<Vec<_>>>()?;

        Ok(readings)
    }

    /// Glucose readings with timestamps in `[start, end]`
    pub fn glucose_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<GlucoseReading>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, mmol_l
             FROM glucose_readings
             WHERE timestamp BETWEEN ?1 AND ?2
             ORDER BY timestamp"
        )?;

        let readings = stmt
            .query_map(
                params![format_timestamp(start), format_timestamp(end)],
                Self::row_to_glucose,
            )?
            .collect::<Result<Vec<_>>>()?;

        Ok(readings)
    }

    /// Glucose readings on the calendar days `from` through `to`, inclusive
    pub fn glucose_on_days(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<GlucoseReading>> {
        let start = from.and_time(NaiveTime::MIN);
        let end = to.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1);
        self.glucose_in_range(start, end)
    }

    /// All insulin records in chronological order
    pub fn insulin_readings(&self) -> Result<Vec<InsulinReading>> {
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, dose, insulin_type FROM insulin_readings ORDER BY timestamp, insulin_type"
        )?;

        let readings = stmt
            .query_map([], |row| {
                let kind: String = row.get(2)?;
                let insulin_type = InsulinType::parse(&kind).ok_or_else(|| {
                    conversion_error(2, format!("unknown insulin type '{}'", kind))
                })?;
                Ok(InsulinReading {
                    timestamp: parse_timestamp(row, 0)?,
                    dose: row.get(1)?,
                    insulin_type,
                })
            })?
            .collect::<Result<Vec<_>>>()?;

        Ok(readings)
    }

    /// Get total glucose reading count
    pub fn count(&self) -> Result<i64> {
        self.conn.query_row("SELECT COUNT(*) FROM glucose_readings", [], |row| row.get(0))
    }

    fn row_to_glucose(row: &rusqlite::Row) -> Result<GlucoseReading> {
        Ok(GlucoseReading {
            timestamp: parse_timestamp(row, 0)?,
            value: row.get(1)?,
        })
    }
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(DB_TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DB_TIMESTAMP_FORMAT)
        .map_err(|e| conversion_error(idx, format!("bad timestamp '{}': {}", raw, e)))
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        rusqlite::types::Type::Text,
        Box::new(crate::error::HypoError::Timestamp(message)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::minutes(minutes)
    }

    #[test]
    fn test_import_skips_duplicates() {
        let mut storage = Storage::in_memory().unwrap();
        let readings = vec![
            GlucoseReading::new(at(10), 5.0),
            GlucoseReading::new(at(0), 6.0),
        ];

        assert_eq!(storage.import_glucose(&readings).unwrap(), 2);
        assert_eq!(storage.import_glucose(&readings).unwrap(), 0);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_glucose_returned_in_order() {
        let mut storage = Storage::in_memory().unwrap();
        storage
            .import_glucose(&[
                GlucoseReading::new(at(10), 5.0),
                GlucoseReading::new(at(0), 6.0),
                GlucoseReading::new(at(5), 5.5),
            ])
            .unwrap();

        let values: Vec<f64> = storage.glucose_readings().unwrap().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![6.0, 5.5, 5.0]);

        let slice = storage.glucose_in_range(at(5), at(10)).unwrap();
        assert_eq!(slice.len(), 2);
        assert_eq!(slice[0].timestamp, at(5));
    }

    #[test]
    fn test_glucose_on_days_covers_whole_days() {
        let day = |d: u32, h: u32, m: u32| {
            NaiveDate::from_ymd_opt(2024, 3, d).unwrap().and_hms_opt(h, m, 0).unwrap()
        };
        let mut storage = Storage::in_memory().unwrap();
        storage
            .import_glucose(&[
                GlucoseReading::new(day(1, 23, 55), 5.0),
                GlucoseReading::new(day(2, 0, 0), 5.1),
                GlucoseReading::new(day(3, 23, 59), 5.2),
                GlucoseReading::new(day(4, 0, 0), 5.3),
            ])
            .unwrap();

        let from = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let values: Vec<f64> = storage
            .glucose_on_days(from, to)
            .unwrap()
            .iter()
            .map(|r| r.value)
            .collect();
        assert_eq!(values, vec![5.1, 5.2]);
        assert!(storage.glucose_on_days(to, from).unwrap().is_empty());
    }

    #[test]
    fn test_insulin_round_trip() {
        let mut storage = Storage::in_memory().unwrap();
        let insulin = vec![
            InsulinReading::new(at(30), 4.0, InsulinType::Bolus),
            InsulinReading::new(at(30), 0.7, InsulinType::Basal),
        ];

        assert_eq!(storage.import_insulin(&insulin).unwrap(), 2);
        assert_eq!(storage.import_insulin(&insulin).unwrap(), 0);

        let stored = storage.insulin_readings().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].insulin_type, InsulinType::Basal);
        assert_eq!(stored[1].dose, 4.0);
    }
}
