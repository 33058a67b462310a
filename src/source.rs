//! Reading import from CSV and JSON files
//!
//! CSV files carry a header row: `timestamp,value` for glucose and
//! `timestamp,dose,insulin_type` for insulin. JSON files hold an array of the
//! serialized reading structs. Timestamps are naive local date-times such as
//! `2024-03-01T07:30:00`.

use log::info;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::error::HypoError;
use crate::reading::{GlucoseReading, InsulinReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, HypoError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("csv") => Ok(FileFormat::Csv),
            Some("json") => Ok(FileFormat::Json),
            _ => Err(HypoError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Deserialize records of type `T` from a reader in the given format
pub fn read_records<T, R>(reader: R, format: FileFormat) -> Result<Vec<T>, HypoError>
where
    T: DeserializeOwned,
    R: Read,
{
    match format {
        FileFormat::Csv => {
            let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
            let records = csv_reader.deserialize().collect::<Result<Vec<T>, csv::Error>>()?;
            Ok(records)
        }
        FileFormat::Json => Ok(serde_json::from_reader(reader)?),
    }
}

fn load<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, HypoError> {
    let format = FileFormat::from_path(path)?;
    let file = File::open(path)?;
    let records = read_records(BufReader::new(file), format)?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

pub fn load_glucose<P: AsRef<Path>>(path: P) -> Result<Vec<GlucoseReading>, HypoError> {
    load(path.as_ref())
}

pub fn load_insulin<P: AsRef<Path>>(path: P) -> Result<Vec<InsulinReading>, HypoError> {
    load(path.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::InsulinType;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a/b.CSV")).unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path(Path::new("x.json")).unwrap(), FileFormat::Json);
        assert!(FileFormat::from_path(Path::new("x.txt")).is_err());
        assert!(FileFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_glucose_csv() {
        let data = "timestamp,value\n2024-03-01T07:30:00,5.4\n2024-03-01T07:35:00, 5.1\n";
        let readings: Vec<GlucoseReading> = read_records(data.as_bytes(), FileFormat::Csv).unwrap();

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[1].value, 5.1);
        assert_eq!(readings[0].timestamp.to_string(), "2024-03-01 07:30:00");
    }

    #[test]
    fn test_insulin_csv() {
        let data = "timestamp,dose,insulin_type\n2024-03-01T07:00:00,4.5,bolus\n2024-03-01T07:00:00,0.8,basal\n";
        let insulin: Vec<InsulinReading> = read_records(data.as_bytes(), FileFormat::Csv).unwrap();

        assert_eq!(insulin[0].insulin_type, InsulinType::Bolus);
        assert_eq!(insulin[1].dose, 0.8);
    }

    #[test]
    fn test_glucose_json() {
        let data = r#"[{"timestamp":"2024-03-01T07:30:00","value":3.2}]"#;
        let readings: Vec<GlucoseReading> = read_records(data.as_bytes(), FileFormat::Json).unwrap();
        assert_eq!(readings[0].value, 3.2);
    }

    #[test]
    fn test_malformed_csv_is_an_error() {
        let data = "timestamp,value\nyesterday,5.4\n";
        let result: Result<Vec<GlucoseReading>, _> = read_records(data.as_bytes(), FileFormat::Csv);
        assert!(matches!(result, Err(HypoError::Csv(_))));
    }
}
