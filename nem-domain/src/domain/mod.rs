pub mod basic_read;
pub mod channel_header;
pub mod interval_reading;

pub use basic_read::{BasicRead, MeterRead};
pub use channel_header::ChannelHeader;
pub use interval_reading::IntervalReading;
