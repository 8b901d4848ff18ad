//! Interval bucketing and quality/event run-length compression for NEM12.

use indexmap::IndexMap;
use nem_domain::domain::IntervalReading;
use time::{Date, Duration, PrimitiveDateTime, Time};

use crate::{
    error::{NemError, Result},
    record::{NemRecord, Row},
};

pub const MINUTES_PER_DAY: u32 = 24 * 60;
pub const EVENT_RECORD: u16 = 400;
/// Quality method used on a 300 row when quality varies across the day.
pub const VARIABLE_QUALITY: &str = "V";

/// Number of intervals in a day for the given interval length.
pub fn num_intervals(interval_length: u32) -> Result<usize> {
    if interval_length == 0 || MINUTES_PER_DAY % interval_length != 0 {
        return Err(NemError::Configuration(format!(
            "interval length {interval_length} does not divide a day evenly"
        )));
    }
    Ok((MINUTES_PER_DAY / interval_length) as usize)
}

/// Position of the interval starting at `start` within its day.
///
/// Seconds are ignored, so a start that is not aligned to an interval
/// boundary falls into the interval containing it. `interval_length` must
/// already have passed [`num_intervals`].
pub fn interval_index(start: Time, interval_length: u32) -> usize {
    let minutes = u32::from(start.hour()) * 60 + u32::from(start.minute());
    let intervals = MINUTES_PER_DAY / interval_length;
    (minutes * intervals / MINUTES_PER_DAY) as usize
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalRecord {
    pub index: usize,
    pub start: PrimitiveDateTime,
    pub end: PrimitiveDateTime,
    pub value: f64,
    pub quality: Option<String>,
    pub event: Option<String>,
}

/// Point within a day where the (quality, reason, event) triple changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBoundary {
    pub index: usize,
    pub quality: Option<String>,
    /// Always absent; carried so a boundary has the shape of a 400 row.
    pub reason_code: Option<String>,
    pub event: Option<String>,
}

/// A 400 row: intervals `start..=end`, 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRange {
    pub start: usize,
    pub end: usize,
    pub quality: Option<String>,
    pub reason_code: Option<String>,
    pub event: Option<String>,
}

impl NemRecord for EventRange {
    fn to_row(&self) -> Row {
        let mut row = Row::new(EVENT_RECORD);
        row.push_int(self.start as u64)
            .push_int(self.end as u64)
            .push_opt(self.quality.as_deref())
            .push_opt(self.reason_code.as_deref())
            .push_opt(self.event.as_deref());
        row
    }
}

/// Quality summary of one day: either a single quality method for the whole
/// day, or "V" with one [`EventRange`] per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySummary {
    pub quality_method: Option<String>,
    pub reason_code: Option<String>,
    pub events: Vec<EventRange>,
}

/// Walks a day's slots in order and records where the quality/event
/// triple changes. Missing slots neither break nor start a run.
pub fn compress_events(slots: &[Option<IntervalRecord>]) -> Vec<EventBoundary> {
    let mut boundaries: Vec<EventBoundary> = Vec::new();
    let mut state: (Option<&str>, Option<&str>, Option<&str>) = (None, None, None);

    for record in slots.iter().flatten() {
        let current = (record.quality.as_deref(), None, record.event.as_deref());
        if current == state {
            continue;
        }
        boundaries.push(EventBoundary {
            index: record.index,
            quality: record.quality.clone(),
            reason_code: None,
            event: record.event.clone(),
        });
        state = current;
    }

    boundaries
}

pub fn summarize_day(slots: &[Option<IntervalRecord>]) -> DaySummary {
    let boundaries = compress_events(slots);

    if let [only] = boundaries.as_slice() {
        return DaySummary {
            quality_method: only.quality.clone(),
            reason_code: only.reason_code.clone(),
            events: Vec::new(),
        };
    }

    let events = boundaries
        .iter()
        .enumerate()
        .map(|(i, b)| EventRange {
            start: b.index + 1,
            end: boundaries.get(i + 1).map_or(slots.len(), |next| next.index),
            quality: b.quality.clone(),
            reason_code: b.reason_code.clone(),
            event: b.event.clone(),
        })
        .collect();

    DaySummary {
        quality_method: Some(VARIABLE_QUALITY.to_string()),
        reason_code: None,
        events,
    }
}

/// Per-day interval slots for one channel.
///
/// Days keep the order in which they were first seen; they are not sorted by
/// date.
#[derive(Debug, Clone)]
pub struct IntervalGrid {
    interval_length: u32,
    num_intervals: usize,
    days: IndexMap<Date, Vec<Option<IntervalRecord>>>,
    accepted: usize,
}

impl IntervalGrid {
    pub fn new(interval_length: u32) -> Result<Self> {
        Ok(Self {
            interval_length,
            num_intervals: num_intervals(interval_length)?,
            days: IndexMap::new(),
            accepted: 0,
        })
    }

    /// Builds a grid from `readings`. Fails on the first bad reading, in
    /// which case no grid is produced.
    pub fn from_readings<I>(interval_length: u32, readings: I) -> Result<Self>
    where
        I: IntoIterator<Item = IntervalReading>,
    {
        let mut grid = Self::new(interval_length)?;
        for reading in readings {
            grid.insert(reading)?;
        }
        Ok(grid)
    }

    /// Buckets one reading under the calendar day of its interval start.
    /// A later reading for the same slot overwrites the earlier one.
    pub fn insert(&mut self, reading: IntervalReading) -> Result<()> {
        if !reading.value.is_finite() {
            return Err(NemError::MalformedReading(format!(
                "value for interval ending {} is not a finite number",
                reading.end
            )));
        }

        let start = reading
            .end
            .checked_sub(Duration::minutes(i64::from(self.interval_length)))
            .ok_or_else(|| {
                NemError::MalformedReading(format!("interval ending {} is out of range", reading.end))
            })?;
        let index = interval_index(start.time(), self.interval_length);

        let num_intervals = self.num_intervals;
        let slots = self
            .days
            .entry(start.date())
            .or_insert_with(|| vec![None; num_intervals]);
        slots[index] = Some(IntervalRecord {
            index,
            start,
            end: reading.end,
            value: reading.value,
            quality: reading.quality,
            event: reading.event,
        });
        self.accepted += 1;

        Ok(())
    }

    /// Number of readings inserted, overwritten ones included.
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    pub fn day(&self, date: Date) -> Option<&[Option<IntervalRecord>]> {
        self.days.get(&date).map(Vec::as_slice)
    }

    pub fn days(&self) -> impl Iterator<Item = (Date, &[Option<IntervalRecord>])> + '_ {
        self.days.iter().map(|(date, slots)| (*date, slots.as_slice()))
    }
}
