use time::{Date, PrimitiveDateTime};

/// A single CSV row in the order the fields will be written.
///
/// Absent values are kept as empty fields so field positions never shift.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    fields: Vec<String>,
}

impl Row {
    /// Starts a row with its record indicator (100, 200, 300, ...).
    pub fn new(indicator: u16) -> Self {
        Self {
            fields: vec![indicator.to_string()],
        }
    }

    pub fn push_str(&mut self, value: &str) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    pub fn push_opt(&mut self, value: Option<&str>) -> &mut Self {
        self.fields.push(value.unwrap_or_default().to_string());
        self
    }

    pub fn push_empty(&mut self) -> &mut Self {
        self.fields.push(String::new());
        self
    }

    pub fn push_int(&mut self, value: u64) -> &mut Self {
        self.fields.push(value.to_string());
        self
    }

    pub fn push_decimal(&mut self, value: f64) -> &mut Self {
        self.fields.push(format_decimal(value));
        self
    }

    pub fn push_opt_decimal(&mut self, value: Option<f64>) -> &mut Self {
        match value {
            Some(v) => self.push_decimal(v),
            None => self.push_empty(),
        }
    }

    pub fn push_date(&mut self, value: Date) -> &mut Self {
        self.fields.push(format_date8(value));
        self
    }

    pub fn push_opt_date(&mut self, value: Option<Date>) -> &mut Self {
        match value {
            Some(d) => self.push_date(d),
            None => self.push_empty(),
        }
    }

    pub fn push_datetime14(&mut self, value: PrimitiveDateTime) -> &mut Self {
        self.fields.push(format_datetime14(value));
        self
    }

    pub fn push_opt_datetime14(&mut self, value: Option<PrimitiveDateTime>) -> &mut Self {
        match value {
            Some(at) => self.push_datetime14(at),
            None => self.push_empty(),
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Anything that serializes to exactly one row of a NEM file.
pub trait NemRecord {
    fn to_row(&self) -> Row;
}

/// Fixed-point rendering with six decimals. Never uses exponent notation,
/// whatever the magnitude.
pub fn format_decimal(value: f64) -> String {
    format!("{value:.6}")
}

/// `YYYYMMDD`
pub fn format_date8(date: Date) -> String {
    format!("{:04}{:02}{:02}", date.year(), u8::from(date.month()), date.day())
}

/// `YYYYMMDDHHMM`
pub fn format_datetime12(at: PrimitiveDateTime) -> String {
    format!("{}{:02}{:02}", format_date8(at.date()), at.hour(), at.minute())
}

/// `YYYYMMDDHHMMSS`
pub fn format_datetime14(at: PrimitiveDateTime) -> String {
    format!("{}{:02}", format_datetime12(at), at.second())
}
