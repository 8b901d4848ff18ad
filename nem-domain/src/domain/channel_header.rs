use time::Date;

/// Metadata for one NEM12 data stream (the 200 record).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelHeader {
    pub nmi: String,
    pub nmi_configuration: String,
    pub register_id: Option<String>,
    pub nmi_suffix: String,
    pub mdm_datastream_identifier: Option<String>,
    pub meter_serial_number: Option<String>,
    pub uom: String,
    /// Minutes per interval. Must divide a day evenly.
    pub interval_length: u32,
    pub next_scheduled_read_date: Option<Date>,
}

impl ChannelHeader {
    pub fn new(
        nmi: impl Into<String>,
        nmi_configuration: impl Into<String>,
        nmi_suffix: impl Into<String>,
        uom: impl Into<String>,
        interval_length: u32,
    ) -> Self {
        Self {
            nmi: nmi.into(),
            nmi_configuration: nmi_configuration.into(),
            register_id: None,
            nmi_suffix: nmi_suffix.into(),
            mdm_datastream_identifier: None,
            meter_serial_number: None,
            uom: uom.into(),
            interval_length,
            next_scheduled_read_date: None,
        }
    }

    pub fn with_register_id(mut self, register_id: impl Into<String>) -> Self {
        self.register_id = Some(register_id.into());
        self
    }

    pub fn with_datastream_identifier(mut self, id: impl Into<String>) -> Self {
        self.mdm_datastream_identifier = Some(id.into());
        self
    }

    pub fn with_meter_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.meter_serial_number = Some(serial.into());
        self
    }

    pub fn with_next_scheduled_read_date(mut self, date: Date) -> Self {
        self.next_scheduled_read_date = Some(date);
        self
    }
}
