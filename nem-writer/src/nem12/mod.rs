pub mod grid;

use std::{collections::BTreeMap, fmt, io::Write};

use nem_domain::domain::{ChannelHeader, IntervalReading};
use time::{Date, PrimitiveDateTime};

use crate::{
    config::WriterConfig,
    error::{NemError, Result},
    file::{FileHeader, NemFile, RowWriter, Version},
    record::{NemRecord, Row},
};

pub use grid::{DaySummary, EventRange, IntervalGrid, IntervalRecord};

pub const DATA_DETAILS_RECORD: u16 = 200;
pub const INTERVAL_DATA_RECORD: u16 = 300;

impl NemRecord for ChannelHeader {
    fn to_row(&self) -> Row {
        let mut row = Row::new(DATA_DETAILS_RECORD);
        row.push_str(&self.nmi)
            .push_str(&self.nmi_configuration)
            .push_opt(self.register_id.as_deref())
            .push_str(&self.nmi_suffix)
            .push_opt(self.mdm_datastream_identifier.as_deref())
            .push_opt(self.meter_serial_number.as_deref())
            .push_str(&self.uom)
            .push_int(u64::from(self.interval_length))
            .push_opt_date(self.next_scheduled_read_date);
        row
    }
}

/// Builds the 300 row for one day: date, one value per interval (empty where
/// no reading exists), then quality method, reason code, and three fields
/// that are always empty (reason description, update time, load time).
pub fn interval_data_row(date: Date, slots: &[Option<IntervalRecord>], summary: &DaySummary) -> Row {
    let mut row = Row::new(INTERVAL_DATA_RECORD);
    row.push_date(date);
    for slot in slots {
        row.push_opt_decimal(slot.as_ref().map(|r| r.value));
    }
    row.push_opt(summary.quality_method.as_deref())
        .push_opt(summary.reason_code.as_deref())
        .push_empty()
        .push_empty()
        .push_empty();
    row
}

#[derive(Debug, Clone)]
pub struct Nem12Channel {
    header: ChannelHeader,
    grid: IntervalGrid,
}

impl Nem12Channel {
    pub fn header(&self) -> &ChannelHeader {
        &self.header
    }

    pub fn grid(&self) -> &IntervalGrid {
        &self.grid
    }
}

/// In-memory NEM12 file: one header plus interval data keyed by NMI and
/// channel suffix.
#[derive(Debug, Clone)]
pub struct Nem12File {
    header: FileHeader,
    meters: BTreeMap<String, BTreeMap<String, Nem12Channel>>,
}

impl Nem12File {
    pub fn new(to_participant: impl Into<String>, from_participant: Option<String>) -> Result<Self> {
        Ok(Self {
            header: FileHeader::new(Version::Nem12, to_participant, from_participant)?,
            meters: BTreeMap::new(),
        })
    }

    pub fn from_config(cfg: &WriterConfig) -> Result<Self> {
        Self::new(cfg.participants.to.clone(), cfg.participants.from.clone())
    }

    /// Overrides the capture time written to the 100 row.
    pub fn with_file_time(mut self, at: PrimitiveDateTime) -> Self {
        self.header.set_file_time(at);
        self
    }

    /// Same as [`Nem12File::upsert_channel`].
    pub fn add_readings<I>(&mut self, header: ChannelHeader, readings: I) -> Result<()>
    where
        I: IntoIterator<Item = IntervalReading>,
    {
        self.upsert_channel(header, readings)
    }

    /// Stores `readings` as the complete data for the channel identified by
    /// (`header.nmi`, `header.nmi_suffix`).
    ///
    /// Replaces, never merges: whatever an earlier call stored for the same
    /// channel is discarded. On error the file is left unchanged.
    pub fn upsert_channel<I>(&mut self, header: ChannelHeader, readings: I) -> Result<()>
    where
        I: IntoIterator<Item = IntervalReading>,
    {
        if header.nmi.trim().is_empty() {
            return Err(NemError::Configuration("nmi is required".to_string()));
        }
        if header.nmi_suffix.trim().is_empty() {
            return Err(NemError::Configuration(format!("nmi_suffix is required for nmi {}", header.nmi)));
        }

        let grid = IntervalGrid::from_readings(header.interval_length, readings)?;

        metrics::counter!("nem_readings_bucketed_total").increment(grid.accepted() as u64);
        tracing::debug!(
            nmi = %header.nmi,
            suffix = %header.nmi_suffix,
            interval_length = header.interval_length,
            readings = grid.accepted(),
            days = grid.day_count(),
            "nem12 channel stored"
        );

        self.meters
            .entry(header.nmi.clone())
            .or_default()
            .insert(header.nmi_suffix.clone(), Nem12Channel { header, grid });

        Ok(())
    }

    pub fn channel(&self, nmi: &str, suffix: &str) -> Option<&Nem12Channel> {
        self.meters.get(nmi).and_then(|channels| channels.get(suffix))
    }

    /// Channels in output order: NMI ascending, then suffix ascending.
    pub fn channels(&self) -> impl Iterator<Item = &Nem12Channel> + '_ {
        self.meters.values().flat_map(|channels| channels.values())
    }
}

impl NemFile for Nem12File {
    fn header(&self) -> &FileHeader {
        &self.header
    }

    fn write_body<W: Write>(&self, out: &mut RowWriter<W>) -> Result<()> {
        for channel in self.channels() {
            out.write(&channel.header.to_row())?;

            for (date, slots) in channel.grid.days() {
                let summary = grid::summarize_day(slots);
                out.write(&interval_data_row(date, slots, &summary))?;
                for event in &summary.events {
                    out.write(&event.to_row())?;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Nem12File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.header, f)
    }
}
