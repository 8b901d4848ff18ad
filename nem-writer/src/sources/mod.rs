pub mod interval_csv_file;

pub use interval_csv_file::{read_interval_readings, IntervalCsvFileSource};
