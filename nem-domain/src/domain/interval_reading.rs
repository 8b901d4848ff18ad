use time::PrimitiveDateTime;

/// A single interval value as supplied by the caller.
///
/// `end` is the end of the interval in market (local) time; the interval
/// start is derived from the channel's interval length.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntervalReading {
    pub end: PrimitiveDateTime,
    pub value: f64,
    pub quality: Option<String>,
    pub event: Option<String>,
}

impl IntervalReading {
    pub fn new(end: PrimitiveDateTime, value: f64) -> Self {
        Self {
            end,
            value,
            quality: None,
            event: None,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn optional_fields_default_to_absent() {
        let r = IntervalReading::new(datetime!(2024-01-01 00:30), 1.5);
        assert!(r.quality.is_none());
        assert!(r.event.is_none());

        let r = r.with_quality("A").with_event("79");
        assert_eq!(r.quality.as_deref(), Some("A"));
        assert_eq!(r.event.as_deref(), Some("79"));
    }
}
