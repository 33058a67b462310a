//! Configuration file parsing

use log::warn;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::HypoError;
use crate::units::{GlucoseThresholds, GlucoseUnit};

const APP_DIR: &str = "hypostat";

/// Configuration loaded from config.txt
///
/// Threshold keys are stored in `unit` as written and converted to mmol/L by
/// [`Config::thresholds`].
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub unit: GlucoseUnit,
    pub very_low: f64,
    pub low: f64,
    pub high: f64,
    pub very_high: f64,
    pub database_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let t = GlucoseThresholds::default();
        Self {
            unit: GlucoseUnit::MmolL,
            very_low: t.very_low,
            low: t.low,
            high: t.high,
            very_high: t.very_high,
            database_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, HypoError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut config = Config::default();

        for line in reader.lines() {
            config.apply_line(&line?)?;
        }

        Ok(config)
    }

    /// Parse configuration from text in config.txt format
    pub fn parse(text: &str) -> Result<Self, HypoError> {
        let mut config = Config::default();
        for line in text.lines() {
            config.apply_line(line)?;
        }
        Ok(config)
    }

    fn apply_line(&mut self, line: &str) -> Result<(), HypoError> {
        // Skip empty lines and comments
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        // Parse "key value" or "key value # comment"
        let Some((key, rest)) = Self::parse_line(line) else {
            warn!("Ignoring config line without a value: {}", line);
            return Ok(());
        };
        let value = rest.split('#').next().unwrap_or("").trim();

        match key {
            "unit" => {
                self.unit = GlucoseUnit::parse(value)
                    .ok_or_else(|| HypoError::Config(format!("unknown unit '{}'", value)))?;
            }
            "very_low" => self.very_low = Self::parse_number(key, value)?,
            "low" => self.low = Self::parse_number(key, value)?,
            "high" => self.high = Self::parse_number(key, value)?,
            "very_high" => self.very_high = Self::parse_number(key, value)?,
            "database_path" => self.database_path = Some(value.to_string()),
            _ => warn!("Ignoring unknown config key: {}", key),
        }
        Ok(())
    }

    /// Parse a single config line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        // Find first whitespace to separate key from value
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    fn parse_number(key: &str, value: &str) -> Result<f64, HypoError> {
        value
            .parse()
            .map_err(|_| HypoError::Config(format!("{} must be a number, got '{}'", key, value)))
    }

    /// Validated thresholds in mmol/L
    pub fn thresholds(&self) -> Result<GlucoseThresholds, HypoError> {
        GlucoseThresholds::from_unit(self.unit, self.very_low, self.low, self.high, self.very_high)
    }

    /// Configured database path or the OS-specific default
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(default_database_path)
    }

    /// Write a commented default config file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<(), HypoError> {
        let defaults = Config::default();
        let mut file = File::create(path)?;
        writeln!(file, "# hypostat configuration")?;
        writeln!(file, "# Threshold unit: mmol/L or mg/dL")?;
        writeln!(file, "unit {}", defaults.unit.label())?;
        writeln!(file, "very_low {}   # severe hypoglycemia", defaults.very_low)?;
        writeln!(file, "low {}        # hypoglycemia", defaults.low)?;
        writeln!(file, "high {}", defaults.high)?;
        writeln!(file, "very_high {}", defaults.very_high)?;
        writeln!(file, "# database_path /path/to/readings.db")?;
        Ok(())
    }
}

/// OS-specific data directory, e.g. ~/.local/share/hypostat
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn ensure_data_dir() -> Result<PathBuf, HypoError> {
    let dir = get_data_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn default_database_path() -> PathBuf {
    get_data_dir().join("readings.db")
}

pub fn config_file_path() -> PathBuf {
    get_data_dir().join("config.txt")
}
