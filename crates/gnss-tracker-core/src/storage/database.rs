use core::fmt;

use chrono::NaiveDateTime;
use log::{debug, info};

use super::{StorageError, Table};
use crate::model::{CurrentConditions, SensorRecord};

/// Persistence controller over a readings [`Table`].
pub struct Database<T: Table> {
    table: T,
    echo_rows: bool,
}

impl<T: Table> Database<T> {
    pub fn new(table: T, echo_rows: bool) -> Self {
        Self { table, echo_rows }
    }

    /// Create the readings table, discarding old rows when `reset` is set.
    pub fn configure(&mut self, reset: bool) -> Result<(), StorageError> {
        self.table.create_table(reset)?;
        info!("Readings table ready (reset: {})", reset);
        Ok(())
    }

    /// Append a snapshot of `conditions` and return the new row id.
    pub fn save(
        &mut self,
        conditions: &CurrentConditions,
        timestamp: NaiveDateTime,
    ) -> Result<u32, StorageError> {
        let record = SensorRecord::from_conditions(conditions, timestamp);
        let id = self.table.insert(&record)?;
        debug!("Saved reading {}", id);

        if self.echo_rows {
            self.retrieve()?;
        }
        Ok(id)
    }

    /// Log every stored row and return how many there are.
    pub fn retrieve(&mut self) -> Result<usize, StorageError> {
        let records = self.table.records()?;
        for record in &records {
            info!("{}", RowSummary(record));
        }
        Ok(records.len())
    }

    pub fn table(&self) -> &T {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut T {
        &mut self.table
    }
}

/// `21.50C, @ 19°42'39.0"/-173°45'47.9" - 12:30:15`
pub struct RowSummary<'a>(pub &'a SensorRecord);

impl fmt::Display for RowSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.0;
        match record.temperature_c {
            Some(t) => write!(f, "{:.2}C", t)?,
            None => f.write_str("--C")?,
        }
        write!(
            f,
            ", @ {}/{} - ",
            record.latitude.as_deref().unwrap_or("--"),
            record.longitude.as_deref().unwrap_or("--"),
        )?;
        match record.timestamp() {
            Some(time) => write!(f, "{}", time.format("%H:%M:%S")),
            None => f.write_str("--:--:--"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::tests::datetime;
    use crate::storage::MemoryTable;
    use crate::units::Temperature;
    use alloc::string::{String, ToString};

    #[test]
    fn test_save_assigns_increasing_ids() {
        let mut db = Database::new(MemoryTable::new(), false);
        db.configure(true).unwrap();

        let mut conditions = CurrentConditions::default();
        conditions.atmospheric.temperature = Some(Temperature::from_celsius(20.25));
        assert_eq!(db.save(&conditions, datetime(2024, 3, 1, 8, 0, 0)).unwrap(), 1);
        assert_eq!(db.save(&conditions, datetime(2024, 3, 1, 8, 1, 0)).unwrap(), 2);
        assert_eq!(db.retrieve().unwrap(), 2);
    }

    #[test]
    fn test_save_without_configure_fails() {
        let mut db = Database::new(MemoryTable::new(), true);
        let result = db.save(&CurrentConditions::default(), datetime(2024, 3, 1, 8, 0, 0));
        assert_eq!(result, Err(StorageError::NotCreated));
    }

    #[test]
    fn test_row_summary_format() {
        let record = SensorRecord {
            id: 7,
            timestamp_utc: datetime(2024, 3, 1, 12, 30, 15).and_utc().timestamp(),
            temperature_c: Some(21.5),
            latitude: Some(String::from("19°42'39.0\"")),
            longitude: Some(String::from("-173°45'47.9\"")),
            ..SensorRecord::default()
        };
        assert_eq!(
            RowSummary(&record).to_string(),
            "21.50C, @ 19°42'39.0\"/-173°45'47.9\" - 12:30:15"
        );

        let empty = SensorRecord::default();
        assert_eq!(RowSummary(&empty).to_string(), "--C, @ --/-- - 00:00:00");
    }
}
