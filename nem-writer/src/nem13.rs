use std::{fmt, io::Write};

use indexmap::IndexMap;
use nem_domain::domain::BasicRead;
use time::PrimitiveDateTime;

use crate::{
    config::WriterConfig,
    error::{NemError, Result},
    file::{FileHeader, NemFile, RowWriter, Version},
    record::{NemRecord, Row},
};

pub const BASIC_DATA_RECORD: u16 = 250;

impl NemRecord for BasicRead {
    fn to_row(&self) -> Row {
        let mut row = Row::new(BASIC_DATA_RECORD);
        row.push_str(&self.nmi)
            .push_str(&self.nmi_configuration)
            .push_str(&self.register_id)
            .push_str(&self.nmi_suffix)
            .push_opt(self.mdm_datastream_identifier.as_deref())
            .push_opt(self.meter_serial_number.as_deref())
            .push_str(&self.direction_indicator)
            .push_decimal(self.previous.value)
            .push_datetime14(self.previous.read_at)
            .push_opt(self.previous_quality_method.as_deref())
            .push_opt(self.previous_reason_code.as_deref())
            .push_opt(self.previous_reason_desc.as_deref())
            .push_decimal(self.current.value)
            .push_datetime14(self.current.read_at)
            .push_opt(self.current_quality_method.as_deref())
            .push_opt(self.current_reason_code.as_deref())
            .push_opt(self.current_reason_desc.as_deref())
            .push_decimal(self.quantity)
            .push_str(&self.uom)
            .push_opt_date(self.next_scheduled_read_date)
            .push_opt_datetime14(self.update_datetime)
            .push_opt_datetime14(self.mstats_load_datetime);
        row
    }
}

fn validate(read: &BasicRead) -> Result<()> {
    for (name, value) in [
        ("nmi", &read.nmi),
        ("nmi_suffix", &read.nmi_suffix),
        ("register_id", &read.register_id),
    ] {
        if value.trim().is_empty() {
            return Err(NemError::Configuration(format!("{name} is required")));
        }
    }

    for (name, value) in [
        ("previous read", read.previous.value),
        ("current read", read.current.value),
        ("quantity", read.quantity),
    ] {
        if !value.is_finite() {
            return Err(NemError::MalformedReading(format!(
                "{name} for nmi {} register {} is not a finite number",
                read.nmi, read.register_id
            )));
        }
    }

    Ok(())
}

/// In-memory NEM13 file. Reads are appended per (NMI, suffix) and written
/// back in the order they were added.
#[derive(Debug, Clone)]
pub struct Nem13File {
    header: FileHeader,
    meters: IndexMap<String, IndexMap<String, Vec<BasicRead>>>,
}

impl Nem13File {
    pub fn new(to_participant: impl Into<String>, from_participant: Option<String>) -> Result<Self> {
        Ok(Self {
            header: FileHeader::new(Version::Nem13, to_participant, from_participant)?,
            meters: IndexMap::new(),
        })
    }

    pub fn from_config(cfg: &WriterConfig) -> Result<Self> {
        Self::new(cfg.participants.to.clone(), cfg.participants.from.clone())
    }

    pub fn with_file_time(mut self, at: PrimitiveDateTime) -> Self {
        self.header.set_file_time(at);
        self
    }

    /// Appends one read. Nothing is deduplicated or reordered.
    pub fn add_reading(&mut self, read: BasicRead) -> Result<()> {
        validate(&read)?;

        tracing::debug!(
            nmi = %read.nmi,
            suffix = %read.nmi_suffix,
            register_id = %read.register_id,
            "nem13 read appended"
        );

        self.meters
            .entry(read.nmi.clone())
            .or_default()
            .entry(read.nmi_suffix.clone())
            .or_default()
            .push(read);

        Ok(())
    }

    pub fn reads(&self, nmi: &str, suffix: &str) -> &[BasicRead] {
        self.meters
            .get(nmi)
            .and_then(|channels| channels.get(suffix))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

impl NemFile for Nem13File {
    fn header(&self) -> &FileHeader {
        &self.header
    }

    fn write_body<W: Write>(&self, out: &mut RowWriter<W>) -> Result<()> {
        for reads in self.meters.values().flat_map(|channels| channels.values()) {
            for read in reads {
                out.write(&read.to_row())?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Nem13File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.header, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nem_domain::domain::MeterRead;
    use time::macros::{date, datetime};

    fn read(nmi: &str, suffix: &str, quantity: f64) -> BasicRead {
        BasicRead::new(
            nmi,
            "E1",
            "1",
            suffix,
            MeterRead::new(1000.0, datetime!(2024-01-01 09:15:30)),
            MeterRead::new(1000.0 + quantity, datetime!(2024-04-01 10:00)),
            quantity,
        )
    }

    fn output(f: &Nem13File) -> Vec<String> {
        let mut buf = Vec::new();
        f.write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap().lines().map(str::to_string).collect()
    }

    fn file() -> Nem13File {
        Nem13File::new("RETAILER1", Some("MDP1".to_string()))
            .unwrap()
            .with_file_time(datetime!(2024-04-02 07:00))
    }

    #[test]
    fn file_displays_version_time_and_recipient() {
        assert_eq!(file().to_string(), "<NEM13 202404020700 RETAILER1>");
    }

    #[test]
    fn basic_read_row_has_all_fields_in_order() {
        let r = read("NMI1", "11", 42.5)
            .with_meter_serial_number("SER9")
            .with_previous_quality("A", None, None)
            .with_current_quality("E", Some("12".to_string()), Some("Locked gate".to_string()))
            .with_next_scheduled_read_date(date!(2024-07-01))
            .with_update_datetime(datetime!(2024-04-01 12:00:01));

        let row = r.to_row();
        assert_eq!(row.fields().len(), 23);
        assert_eq!(
            row.fields(),
            &[
                "250",
                "NMI1",
                "E1",
                "1",
                "11",
                "",
                "SER9",
                "E",
                "1000.000000",
                "20240101091530",
                "A",
                "",
                "",
                "1042.500000",
                "20240401100000",
                "E",
                "12",
                "Locked gate",
                "42.500000",
                "kWh",
                "20240701",
                "20240401120001",
                "",
            ]
        );
    }

    #[test]
    fn reads_are_written_in_insertion_order() {
        let mut f = file();
        f.add_reading(read("NMI2", "11", 1.0)).unwrap();
        f.add_reading(read("NMI1", "11", 2.0)).unwrap();
        f.add_reading(read("NMI2", "11", 3.0)).unwrap();
        f.add_reading(read("NMI2", "12", 4.0)).unwrap();

        let lines = output(&f);
        assert_eq!(lines.first().map(String::as_str), Some("100,NEM13,202404020700,MDP1,RETAILER1"));
        assert_eq!(lines.last().map(String::as_str), Some("900"));

        let quantities: Vec<String> = lines[1..lines.len() - 1]
            .iter()
            .map(|l| l.split(',').nth(18).unwrap_or_default().to_string())
            .collect();
        assert_eq!(quantities, vec!["1.000000", "3.000000", "4.000000", "2.000000"]);
    }

    #[test]
    fn duplicate_reads_are_kept() {
        let mut f = file();
        f.add_reading(read("NMI1", "11", 1.0)).unwrap();
        f.add_reading(read("NMI1", "11", 1.0)).unwrap();

        assert_eq!(f.reads("NMI1", "11").len(), 2);
        assert_eq!(output(&f).len(), 4);
    }

    #[test]
    fn invalid_reads_are_rejected() {
        let mut f = file();

        let res = f.add_reading(read("", "11", 1.0));
        assert!(matches!(res, Err(NemError::Configuration(_))));

        let res = f.add_reading(read("NMI1", "11", f64::NAN));
        assert!(matches!(res, Err(NemError::MalformedReading(_))));

        assert!(f.reads("NMI1", "11").is_empty());
    }
}
