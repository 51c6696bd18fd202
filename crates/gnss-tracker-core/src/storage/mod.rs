//! Readings table persistence
//!
//! The application only ever creates the table, appends rows and enumerates
//! them. Rows are postcard-encoded [`SensorRecord`]s behind a small length
//! prefix, so the same byte format backs both the RAM table used by the
//! simulator and tests and the SD card file on the device.

pub mod codec;
pub mod database;
pub mod memory;
#[cfg(feature = "sd-card")]
pub mod sd_card;

use alloc::vec::Vec;

use thiserror_no_std::Error;

use crate::model::SensorRecord;

pub use database::Database;
pub use memory::MemoryTable;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("Table has not been created")]
    NotCreated,
    #[error("Record could not be encoded")]
    Encode,
    #[error("Record {0} is corrupt")]
    Corrupt(usize),
    #[error("Record of {0} bytes exceeds the frame limit")]
    TooLarge(usize),
    #[error("Storage I/O failed: {0}")]
    Io(&'static str),
}

/// An append-only table of sensor records.
pub trait Table {
    /// Create the table if missing. With `reset`, existing rows are discarded.
    fn create_table(&mut self, reset: bool) -> Result<(), StorageError>;

    /// Append a record, assigning and returning its id.
    fn insert(&mut self, record: &SensorRecord) -> Result<u32, StorageError>;

    /// All records in insertion order.
    fn records(&mut self) -> Result<Vec<SensorRecord>, StorageError>;
}
