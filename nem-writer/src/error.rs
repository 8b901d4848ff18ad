/// Errors raised while building or writing a NEM file.
///
/// Every failure is fatal for the call that raised it; nothing retries.
#[derive(thiserror::Error, Debug)]
pub enum NemError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("malformed reading: {0}")]
    MalformedReading(String),
    #[error("sink error: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, NemError>;
