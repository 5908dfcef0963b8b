use std::fs::OpenOptions;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::types::{Key, Value};

/// Status bit marking a record as logically deleted.
///
/// A tombstoned record keeps its key and value bytes — the bit is the sole
/// deletion signal, and a later compaction stage decides when the bytes
/// actually disappear.
pub const TOMBSTONE: u8 = 1 << 0;

/// Fixed portion of the on-disk frame:
/// crc(4) + timestamp(8) + status(1) + type_info(1) + key_size(8) + value_size(8).
pub const HEADER_SIZE: usize = 30;

/// Upper bound on a single decoded key or value (1 GiB).
/// A length field beyond this is treated as corruption, not an allocation request.
const MAX_FIELD_LEN: u64 = 1 << 30;

/// One versioned key/value entry — the atomic unit of durable storage.
///
/// On-disk format (little-endian, no delimiters, no whole-frame length):
/// ```text
/// ┌──────────┬───────────────┬───────────┬─────────────┬─────────────┬───────────────┬──────────┬──────────┐
/// │ CRC (4B) │ Timestamp(8B) │ Status(1B)│ TypeInfo(1B)│ KeySize(8B) │ ValueSize(8B) │ Key (var)│ Val (var)│
/// └──────────┴───────────────┴───────────┴─────────────┴─────────────┴───────────────┴──────────┴──────────┘
/// ```
///
/// The CRC covers the key and value bytes ONLY, never the metadata fields.
/// A reader must already know where the previous record ended — records are
/// located by sequential consumption, not by scanning for delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Checksum of key and value bytes only.
    pub crc: u32,
    /// Creation/refresh instant, UNIX seconds.
    pub timestamp: i64,
    /// Status bits; bit 0 is the tombstone, the rest are reserved.
    pub status: u8,
    /// Opaque type tag carried through round trips. 0 = untyped.
    pub type_info: u8,
    /// Length of `key` in bytes.
    pub key_size: u64,
    /// Length of `value` in bytes.
    pub value_size: u64,
    pub key: Key,
    pub value: Value,
}

/// CRC over key ++ value without materializing the concatenation.
fn checksum(key: &[u8], value: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(key);
    hasher.update(value);
    hasher.finalize()
}

fn unix_now() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(e) => -(e.duration().as_secs() as i64),
    }
}

impl Record {
    /// Create a record from key and value bytes.
    /// Checksum and timestamp are computed here; status defaults to live, type to untyped.
    pub fn new(key: Key, value: Value) -> Self {
        Record {
            crc: checksum(&key, &value),
            timestamp: unix_now(),
            status: 0,
            type_info: 0,
            key_size: key.len() as u64,
            value_size: value.len() as u64,
            key,
            value,
        }
    }

    /// Like [`Record::new`] but with an explicit type tag.
    /// The engine attaches no semantics to the tag.
    pub fn with_type(key: Key, value: Value, type_info: u8) -> Self {
        let mut rec = Record::new(key, value);
        rec.type_info = type_info;
        rec
    }

    /// Convenience constructor from string slices.
    pub fn from_strs(key: &str, value: &str) -> Self {
        Record::new(key.as_bytes().to_vec(), value.as_bytes().to_vec())
    }

    /// Zero-length key/value placeholder, typically the target of a decode.
    pub fn empty() -> Self {
        Record::new(Vec::new(), Vec::new())
    }

    /// Copy of this record with the timestamp refreshed to now.
    /// Used to "touch" a record when rewriting it without changing identity.
    pub fn clone_refreshed(&self) -> Self {
        Record {
            timestamp: unix_now(),
            ..self.clone()
        }
    }

    /// Refresh the timestamp to now, in place.
    pub fn touch(&mut self) {
        self.timestamp = unix_now();
    }

    /// True iff the tombstone bit is set.
    pub fn is_deleted(&self) -> bool {
        self.status & TOMBSTONE != 0
    }

    /// Set the tombstone bit. Key and value bytes are retained.
    pub fn mark_deleted(&mut self) {
        self.status |= TOMBSTONE;
    }

    /// Re-sync the checksum and size fields after direct key/value mutation.
    pub fn recalc_crc(&mut self) {
        self.key_size = self.key.len() as u64;
        self.value_size = self.value.len() as u64;
        self.crc = checksum(&self.key, &self.value);
    }

    /// Size of this record when serialized on disk.
    pub fn encoded_size(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }

    /// Append the record's fields, in wire order, to an output stream.
    ///
    /// Only appends — never repositions or overwrites. Flushing/persisting the
    /// destination and serializing concurrent appenders is the caller's job.
    pub fn encode_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(&self.crc.to_le_bytes())?;
        w.write_all(&self.timestamp.to_le_bytes())?;
        w.write_all(&[self.status])?;
        w.write_all(&[self.type_info])?;
        w.write_all(&self.key_size.to_le_bytes())?;
        w.write_all(&self.value_size.to_le_bytes())?;
        w.write_all(&self.key)?;
        w.write_all(&self.value)?;
        Ok(())
    }

    /// Serialize the record to an in-memory buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.encoded_size());
        // Writing into a Vec cannot fail.
        self.encode_to(&mut buf).unwrap();
        buf
    }

    /// Append this record to a file, opening, flushing, syncing, and closing
    /// within the call. No handle outlives the append.
    pub fn append_to_path(&self, path: &Path) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        self.encode_to(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    }

    /// Read one record from the stream, overwriting every field of `self`.
    ///
    /// The checksum is recomputed over the decoded key and value and compared
    /// to the stored one; a mismatch is `Error::Corruption`. Consumption is
    /// forward-only and non-restartable — on failure the stream position is
    /// unspecified and the caller must re-establish it.
    pub fn decode_from<R: Read>(&mut self, r: &mut R) -> Result<()> {
        let mut u32_buf = [0u8; 4];
        let mut u64_buf = [0u8; 8];
        let mut byte_buf = [0u8; 1];

        r.read_exact(&mut u32_buf)?;
        let crc = u32::from_le_bytes(u32_buf);

        r.read_exact(&mut u64_buf)?;
        let timestamp = i64::from_le_bytes(u64_buf);

        r.read_exact(&mut byte_buf)?;
        let status = byte_buf[0];

        r.read_exact(&mut byte_buf)?;
        let type_info = byte_buf[0];

        r.read_exact(&mut u64_buf)?;
        let key_size = u64::from_le_bytes(u64_buf);

        r.read_exact(&mut u64_buf)?;
        let value_size = u64::from_le_bytes(u64_buf);

        if key_size > MAX_FIELD_LEN || value_size > MAX_FIELD_LEN {
            return Err(Error::Corruption(format!(
                "implausible record lengths: key {key_size}, value {value_size}"
            )));
        }

        let mut key = vec![0u8; key_size as usize];
        r.read_exact(&mut key)?;

        let mut value = vec![0u8; value_size as usize];
        r.read_exact(&mut value)?;

        let computed = checksum(&key, &value);
        if computed != crc {
            return Err(Error::Corruption(format!(
                "record CRC mismatch: stored {crc:#010x}, computed {computed:#010x}"
            )));
        }

        self.crc = crc;
        self.timestamp = timestamp;
        self.status = status;
        self.type_info = type_info;
        self.key_size = key_size;
        self.value_size = value_size;
        self.key = key;
        self.value = value;
        Ok(())
    }

    /// Read one record from the stream.
    pub fn decode<R: Read>(r: &mut R) -> Result<Record> {
        let mut rec = Record::empty();
        rec.decode_from(r)?;
        Ok(rec)
    }
}
