//! NEM12 / NEM13 meter data file writer.
//!
//! Build a [`Nem12File`] or [`Nem13File`], add readings in any order, then
//! write it out once with [`NemFile::nem_output`] or [`NemFile::write_to`].

pub mod config;
pub mod error;
pub mod file;
pub mod nem12;
pub mod nem13;
pub mod observability;
pub mod record;
pub mod sources;

pub use error::{NemError, Result};
pub use file::{FileHeader, NemFile, Version};
pub use nem12::Nem12File;
pub use nem13::Nem13File;
pub use nem_domain::domain::{BasicRead, ChannelHeader, IntervalReading, MeterRead};
