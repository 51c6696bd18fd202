//! Length-prefixed record framing
//!
//! Frame layout (little-endian):
//! - length: 2 bytes (u16), size of the payload
//! - payload: postcard encoding of a [`SensorRecord`]

use alloc::vec::Vec;

use super::StorageError;
use crate::model::SensorRecord;

/// Size of the length prefix in bytes
pub const FRAME_HEADER_LEN: usize = 2;

/// Largest payload a frame may carry
pub const MAX_FRAME_LEN: usize = 256;

/// Encode a record into a complete frame.
pub fn encode_frame(record: &SensorRecord) -> Result<Vec<u8>, StorageError> {
    let payload = postcard::to_allocvec(record).map_err(|_| StorageError::Encode)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(StorageError::TooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Iterator over the records stored in a byte log.
///
/// Yields an error (and then stops) on a truncated or undecodable frame.
pub struct FrameReader<'a> {
    bytes: &'a [u8],
    total: usize,
    index: usize,
    failed: bool,
}

impl<'a> FrameReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            total: bytes.len(),
            index: 0,
            failed: false,
        }
    }

    /// Byte offset just past the last frame decoded successfully.
    pub fn offset(&self) -> usize {
        self.total - self.bytes.len()
    }

    fn fail(&mut self) -> Option<Result<SensorRecord, StorageError>> {
        self.failed = true;
        Some(Err(StorageError::Corrupt(self.index)))
    }
}

impl Iterator for FrameReader<'_> {
    type Item = Result<SensorRecord, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.bytes.is_empty() {
            return None;
        }

        let Some((header, rest)) = self.bytes.split_first_chunk::<FRAME_HEADER_LEN>() else {
            return self.fail();
        };
        let len = u16::from_le_bytes(*header) as usize;
        if len > MAX_FRAME_LEN || rest.len() < len {
            return self.fail();
        }

        let (payload, remaining) = rest.split_at(len);
        match postcard::from_bytes::<SensorRecord>(payload) {
            Ok(record) => {
                self.bytes = remaining;
                self.index += 1;
                Some(Ok(record))
            }
            Err(_) => self.fail(),
        }
    }
}

/// The intact start of a byte log.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidPrefix {
    pub records: Vec<SensorRecord>,
    /// Length in bytes of the intact frames
    pub len: usize,
    /// Why decoding stopped before the end of the log
    pub damage: Option<StorageError>,
}

/// Decode frames up to the first truncated or undecodable one.
///
/// A write interrupted by power loss or card removal leaves a torn frame at
/// the tail; the frames before it remain readable.
pub fn decode_prefix(bytes: &[u8]) -> ValidPrefix {
    let mut reader = FrameReader::new(bytes);
    let mut records = Vec::new();
    let mut damage = None;
    for frame in reader.by_ref() {
        match frame {
            Ok(record) => records.push(record),
            Err(e) => damage = Some(e),
        }
    }

    ValidPrefix {
        records,
        len: reader.offset(),
        damage,
    }
}
