use std::{fs::File, io::Read, path::PathBuf};

use csv::StringRecord;
use nem_domain::domain::IntervalReading;
use time::{format_description::FormatItem, macros::format_description, PrimitiveDateTime};

use crate::error::{NemError, Result};

const TIMESTAMP_FORMATS: &[&[FormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
];

/// Delimited-file loader for `IntervalReading`s.
///
/// Expected header columns (by name):
/// - interval_end (`YYYY-MM-DD HH:MM[:SS]`, `T` separator also accepted)
/// - value
/// - quality (optional)
/// - event (optional)
pub struct IntervalCsvFileSource {
    path: PathBuf,
    delimiter: u8,
}

impl IntervalCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
        }
    }

    /// Use `|` for pipe-delimited `.dat` exports.
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn read(&self) -> Result<Vec<IntervalReading>> {
        let file = File::open(&self.path).map_err(|e| {
            NemError::Configuration(format!("failed to open readings file '{}': {e}", self.path.display()))
        })?;
        read_delimited(file, self.delimiter)
    }
}

/// Reads comma-separated interval readings from `reader`.
pub fn read_interval_readings<R: Read>(reader: R) -> Result<Vec<IntervalReading>> {
    read_delimited(reader, b',')
}

fn read_delimited<R: Read>(reader: R, delimiter: u8) -> Result<Vec<IntervalReading>> {
    let mut rdr = csv::ReaderBuilder::new().delimiter(delimiter).from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| NemError::MalformedReading(format!("failed to read headers: {e}")))?
        .clone();

    let mut readings = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| NemError::MalformedReading(format!("failed to read record: {e}")))?;

        match record_to_reading(&record, &headers) {
            Ok(r) => readings.push(r),
            Err(e) => {
                metrics::counter!("nem_reading_parse_errors_total").increment(1);
                return Err(e);
            }
        }
    }

    tracing::debug!(readings = readings.len(), "interval readings loaded");
    Ok(readings)
}

fn parse_optional_string(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_timestamp(s: &str) -> Option<PrimitiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| PrimitiveDateTime::parse(s, *format).ok())
}

fn record_to_reading(record: &StringRecord, headers: &StringRecord) -> Result<IntervalReading> {
    let line = record.position().map_or(0, |p| p.line());
    let get = |name: &str| -> Option<&str> {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
    };
    let required = |name: &str| -> Result<&str> {
        get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| NemError::MalformedReading(format!("line {line}: missing '{name}'")))
    };

    let end_str = required("interval_end")?;
    let end = parse_timestamp(end_str).ok_or_else(|| {
        NemError::MalformedReading(format!("line {line}: invalid interval_end '{end_str}'"))
    })?;

    let value_str = required("value")?;
    let value: f64 = value_str
        .parse()
        .map_err(|e| NemError::MalformedReading(format!("line {line}: invalid value '{value_str}': {e}")))?;

    Ok(IntervalReading {
        end,
        value,
        quality: get("quality").and_then(parse_optional_string),
        event: get("event").and_then(parse_optional_string),
    })
}
