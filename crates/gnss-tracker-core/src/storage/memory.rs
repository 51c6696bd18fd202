use alloc::vec::Vec;

use log::warn;

use super::codec::{decode_prefix, encode_frame};
use super::{StorageError, Table};
use crate::model::SensorRecord;

/// Readings table held in RAM, using the same framing as the card file.
///
/// Used by the simulator and by tests; contents are lost on reset.
#[derive(Debug, Default)]
pub struct MemoryTable {
    log: Option<Vec<u8>>,
    next_id: u32,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing byte log, as if read back from a card.
    pub fn from_log(log: Vec<u8>) -> Self {
        Self {
            log: Some(log),
            next_id: 0,
        }
    }

    pub fn log(&self) -> Option<&[u8]> {
        self.log.as_deref()
    }
}

impl Table for MemoryTable {
    fn create_table(&mut self, reset: bool) -> Result<(), StorageError> {
        let log = self.log.get_or_insert_with(Vec::new);
        if reset {
            log.clear();
        }

        let prefix = decode_prefix(log);
        if let Some(damage) = &prefix.damage {
            warn!(
                "Readings log damaged after {} rows ({}), dropping {} bytes",
                prefix.records.len(),
                damage,
                log.len() - prefix.len
            );
            log.truncate(prefix.len);
        }

        self.next_id = prefix
            .records
            .iter()
            .map(|record| record.id)
            .max()
            .map_or(1, |id| id + 1);
        Ok(())
    }

    fn insert(&mut self, record: &SensorRecord) -> Result<u32, StorageError> {
        let log = self.log.as_mut().ok_or(StorageError::NotCreated)?;

        let id = self.next_id;
        let frame = encode_frame(&SensorRecord {
            id,
            ..record.clone()
        })?;
        log.extend_from_slice(&frame);
        self.next_id += 1;
        Ok(id)
    }

    fn records(&mut self) -> Result<Vec<SensorRecord>, StorageError> {
        let log = self.log.as_ref().ok_or(StorageError::NotCreated)?;
        Ok(decode_prefix(log).records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(temperature: f64) -> SensorRecord {
        SensorRecord {
            temperature_c: Some(temperature),
            ..SensorRecord::default()
        }
    }

    #[test]
    fn test_insert_before_create_fails() {
        let mut table = MemoryTable::new();
        assert_eq!(table.insert(&reading(1.0)), Err(StorageError::NotCreated));
        assert_eq!(table.records(), Err(StorageError::NotCreated));
    }

    #[test]
    fn test_ids_autoincrement_from_one() {
        let mut table = MemoryTable::new();
        table.create_table(true).unwrap();

        assert_eq!(table.insert(&reading(20.0)).unwrap(), 1);
        assert_eq!(table.insert(&reading(21.0)).unwrap(), 2);

        let records = table.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].temperature_c, Some(21.0));
    }

    #[test]
    fn test_create_without_reset_keeps_rows_and_ids() {
        let mut table = MemoryTable::new();
        table.create_table(true).unwrap();
        table.insert(&reading(20.0)).unwrap();
        table.insert(&reading(21.0)).unwrap();

        let mut reopened = MemoryTable::from_log(table.log().unwrap().to_vec());
        reopened.create_table(false).unwrap();
        assert_eq!(reopened.insert(&reading(22.0)).unwrap(), 3);
        assert_eq!(reopened.records().unwrap().len(), 3);
    }

    #[test]
    fn test_torn_tail_is_cut_and_rows_survive() {
        let mut table = MemoryTable::new();
        table.create_table(true).unwrap();
        table.insert(&reading(20.0)).unwrap();
        table.insert(&reading(21.0)).unwrap();

        // Power lost three bytes before the second frame was complete.
        let mut log = table.log().unwrap().to_vec();
        log.truncate(log.len() - 3);

        let mut reopened = MemoryTable::from_log(log);
        reopened.create_table(false).unwrap();
        let records = reopened.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].temperature_c, Some(20.0));

        assert_eq!(reopened.insert(&reading(22.0)).unwrap(), 2);
        let records = reopened.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].temperature_c, Some(22.0));
    }

    #[test]
    fn test_reset_discards_rows() {
        let mut table = MemoryTable::new();
        table.create_table(true).unwrap();
        table.insert(&reading(20.0)).unwrap();

        table.create_table(true).unwrap();
        assert!(table.records().unwrap().is_empty());
        assert_eq!(table.insert(&reading(5.0)).unwrap(), 1);
    }
}
