//! Readings table on a FAT formatted SD card
//!
//! SD card access is blocking, as is the display on the same SPI bus. Every
//! operation opens the volume, the root directory and the file, then closes
//! them again so a card pulled between writes loses at most one row. A row
//! torn by such a pull is cut from the file the next time the table is
//! created.

use alloc::vec::Vec;
use core::fmt::Debug;

use chrono::{Datelike, NaiveDateTime, Timelike};
use embedded_sdmmc::{BlockDevice, File, Mode, TimeSource, Timestamp, VolumeIdx, VolumeManager};
use log::{debug, error, warn};

use super::codec::{decode_prefix, encode_frame};
use super::{StorageError, Table};
use crate::model::SensorRecord;

pub const READINGS_FILE: &str = "READINGS.DAT";

const READ_CHUNK: usize = 512;

type CardFile<'a, D, T> = File<'a, D, T, 4, 4, 1>;

fn io_error<E: Debug>(operation: &'static str) -> impl FnOnce(E) -> StorageError {
    move |e| {
        error!("SD card {} failed: {:?}", operation, e);
        StorageError::Io(operation)
    }
}

pub struct SdCardTable<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    volume_mgr: VolumeManager<D, T, 4, 4, 1>,
    next_id: Option<u32>,
}

impl<D, T> SdCardTable<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    pub fn new(block_device: D, time_source: T) -> Self {
        Self {
            volume_mgr: VolumeManager::new(block_device, time_source),
            next_id: None,
        }
    }

    /// Open the readings file with `mode`, run `f` on it and close everything.
    fn with_file<R>(
        &self,
        mode: Mode,
        f: impl FnOnce(&CardFile<'_, D, T>) -> Result<R, StorageError>,
    ) -> Result<R, StorageError> {
        let volume0 = self
            .volume_mgr
            .open_volume(VolumeIdx(0))
            .map_err(io_error("open volume"))?;
        let root_dir = volume0.open_root_dir().map_err(io_error("open root"))?;
        let file = root_dir
            .open_file_in_dir(READINGS_FILE, mode)
            .map_err(io_error("open file"))?;

        let result = f(&file)?;

        file.close().map_err(io_error("close file"))?;
        root_dir.close().map_err(io_error("close root"))?;
        volume0.close().map_err(io_error("close volume"))?;
        Ok(result)
    }

    fn write_with(&self, mode: Mode, bytes: &[u8]) -> Result<(), StorageError> {
        self.with_file(mode, |file| file.write(bytes).map_err(io_error("write")))
    }

    fn read_log(&self) -> Result<Vec<u8>, StorageError> {
        self.with_file(Mode::ReadOnly, |file| {
            let mut log = Vec::new();
            let mut chunk = [0u8; READ_CHUNK];
            loop {
                let read = file.read(&mut chunk).map_err(io_error("read"))?;
                if read == 0 {
                    break;
                }
                log.extend_from_slice(&chunk[..read]);
            }
            Ok(log)
        })
    }

    /// Give the block device back, e.g. to inspect the card image.
    pub fn free(self) -> (D, T) {
        self.volume_mgr.free()
    }
}

impl<D, T> Table for SdCardTable<D, T>
where
    D: BlockDevice,
    T: TimeSource,
{
    fn create_table(&mut self, reset: bool) -> Result<(), StorageError> {
        let mode = if reset {
            Mode::ReadWriteCreateOrTruncate
        } else {
            Mode::ReadWriteCreateOrAppend
        };
        self.with_file(mode, |_| Ok(()))?;

        let log = self.read_log()?;
        let prefix = decode_prefix(&log);
        if let Some(damage) = &prefix.damage {
            warn!(
                "{} damaged after {} rows ({}), dropping {} bytes",
                READINGS_FILE,
                prefix.records.len(),
                damage,
                log.len() - prefix.len
            );
            self.write_with(Mode::ReadWriteCreateOrTruncate, &log[..prefix.len])?;
        }

        let last_id = prefix.records.iter().map(|record| record.id).max();
        debug!("{} opened, last id {:?}", READINGS_FILE, last_id);

        self.next_id = Some(last_id.map_or(1, |id| id + 1));
        Ok(())
    }

    fn insert(&mut self, record: &SensorRecord) -> Result<u32, StorageError> {
        let id = self.next_id.ok_or(StorageError::NotCreated)?;
        let frame = encode_frame(&SensorRecord {
            id,
            ..record.clone()
        })?;

        self.write_with(Mode::ReadWriteCreateOrAppend, &frame)?;
        self.next_id = Some(id + 1);
        Ok(id)
    }

    fn records(&mut self) -> Result<Vec<SensorRecord>, StorageError> {
        if self.next_id.is_none() {
            return Err(StorageError::NotCreated);
        }
        Ok(decode_prefix(&self.read_log()?).records)
    }
}

/// FAT file timestamps taken from the device clock.
pub struct ClockTimeSource<F>
where
    F: Fn() -> NaiveDateTime,
{
    now: F,
}

impl<F> ClockTimeSource<F>
where
    F: Fn() -> NaiveDateTime,
{
    pub fn new(now: F) -> Self {
        Self { now }
    }
}

impl<F> TimeSource for ClockTimeSource<F>
where
    F: Fn() -> NaiveDateTime,
{
    fn get_timestamp(&self) -> Timestamp {
        to_fat_timestamp((self.now)())
    }
}

/// Convert to a FAT timestamp. FAT covers 1980 to 2107; other years clamp.
pub fn to_fat_timestamp(time: NaiveDateTime) -> Timestamp {
    let year = time.year().clamp(1980, 2107);
    Timestamp {
        year_since_1970: (year - 1970) as u8,
        zero_indexed_month: time.month0() as u8,
        zero_indexed_day: time.day0() as u8,
        hours: time.hour() as u8,
        minutes: time.minute() as u8,
        seconds: time.second() as u8,
    }
}
