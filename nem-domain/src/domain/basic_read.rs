use time::{Date, PrimitiveDateTime};

/// A register value and the time it was read.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeterRead {
    pub value: f64,
    pub read_at: PrimitiveDateTime,
}

impl MeterRead {
    pub fn new(value: f64, read_at: PrimitiveDateTime) -> Self {
        Self { value, read_at }
    }
}

/// One accumulation read pair for a register (the NEM13 250 record).
///
/// Defaults:
/// - direction_indicator: "E"
/// - uom: "kWh"
/// - every other optional field absent
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasicRead {
    pub nmi: String,
    pub nmi_configuration: String,
    pub register_id: String,
    pub nmi_suffix: String,
    pub mdm_datastream_identifier: Option<String>,
    pub meter_serial_number: Option<String>,
    pub direction_indicator: String,
    pub previous: MeterRead,
    pub previous_quality_method: Option<String>,
    pub previous_reason_code: Option<String>,
    pub previous_reason_desc: Option<String>,
    pub current: MeterRead,
    pub current_quality_method: Option<String>,
    pub current_reason_code: Option<String>,
    pub current_reason_desc: Option<String>,
    pub quantity: f64,
    pub uom: String,
    pub next_scheduled_read_date: Option<Date>,
    pub update_datetime: Option<PrimitiveDateTime>,
    pub mstats_load_datetime: Option<PrimitiveDateTime>,
}

impl BasicRead {
    pub fn new(
        nmi: impl Into<String>,
        nmi_configuration: impl Into<String>,
        register_id: impl Into<String>,
        nmi_suffix: impl Into<String>,
        previous: MeterRead,
        current: MeterRead,
        quantity: f64,
    ) -> Self {
        Self {
            nmi: nmi.into(),
            nmi_configuration: nmi_configuration.into(),
            register_id: register_id.into(),
            nmi_suffix: nmi_suffix.into(),
            mdm_datastream_identifier: None,
            meter_serial_number: None,
            direction_indicator: "E".to_string(),
            previous,
            previous_quality_method: None,
            previous_reason_code: None,
            previous_reason_desc: None,
            current,
            current_quality_method: None,
            current_reason_code: None,
            current_reason_desc: None,
            quantity,
            uom: "kWh".to_string(),
            next_scheduled_read_date: None,
            update_datetime: None,
            mstats_load_datetime: None,
        }
    }

    pub fn with_datastream_identifier(mut self, id: impl Into<String>) -> Self {
        self.mdm_datastream_identifier = Some(id.into());
        self
    }

    pub fn with_meter_serial_number(mut self, serial: impl Into<String>) -> Self {
        self.meter_serial_number = Some(serial.into());
        self
    }

    pub fn with_direction_indicator(mut self, direction: impl Into<String>) -> Self {
        self.direction_indicator = direction.into();
        self
    }

    pub fn with_previous_quality(
        mut self,
        method: impl Into<String>,
        reason_code: Option<String>,
        reason_desc: Option<String>,
    ) -> Self {
        self.previous_quality_method = Some(method.into());
        self.previous_reason_code = reason_code;
        self.previous_reason_desc = reason_desc;
        self
    }

    pub fn with_current_quality(
        mut self,
        method: impl Into<String>,
        reason_code: Option<String>,
        reason_desc: Option<String>,
    ) -> Self {
        self.current_quality_method = Some(method.into());
        self.current_reason_code = reason_code;
        self.current_reason_desc = reason_desc;
        self
    }

    pub fn with_uom(mut self, uom: impl Into<String>) -> Self {
        self.uom = uom.into();
        self
    }

    pub fn with_next_scheduled_read_date(mut self, date: Date) -> Self {
        self.next_scheduled_read_date = Some(date);
        self
    }

    pub fn with_update_datetime(mut self, at: PrimitiveDateTime) -> Self {
        self.update_datetime = Some(at);
        self
    }

    pub fn with_mstats_load_datetime(mut self, at: PrimitiveDateTime) -> Self {
        self.mstats_load_datetime = Some(at);
        self
    }
}
