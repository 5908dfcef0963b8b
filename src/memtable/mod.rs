pub mod skiplist;

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use self::skiplist::{DEFAULT_MAX_LEVEL, SkipList, SkipListIter};

use crate::error::Result;
use crate::filter::BloomFilter;
use crate::integrity::MerkleTree;
use crate::record::Record;
use crate::sketch::CountMinSketch;
use crate::types::{Key, Value};

/// In-memory sorted buffer for writes. Wraps a [`SkipList`].
///
/// Every write lands here first. When size exceeds the threshold, the
/// memtable is flushed as a sorted run of records and cleared.
///
/// Deletes are logical: the record stays, tombstoned. You can't just drop
/// the key because older versions may exist in flushed segments on disk —
/// the tombstone has to travel to the flush so compaction can see it.
pub struct MemTable {
    data: SkipList,
    size_limit: usize,
}

impl MemTable {
    /// Create an empty memtable with the given flush threshold.
    pub fn new(size_limit: usize) -> Self {
        MemTable::with_max_level(DEFAULT_MAX_LEVEL, size_limit)
    }

    /// Create an empty memtable with an explicit skip list level cap.
    pub fn with_max_level(max_level: usize, size_limit: usize) -> Self {
        MemTable {
            data: SkipList::new(max_level),
            size_limit,
        }
    }

    /// Insert or update a key-value pair.
    pub fn put(&mut self, key: Key, value: Value) {
        self.data.write(Record::new(key, value));
    }

    /// Insert or update a pre-built record (caller controls type tag, status).
    pub fn put_record(&mut self, record: Record) {
        self.data.write(record);
    }

    /// Look up a key. `None` if absent OR tombstoned.
    pub fn get(&self, key: &[u8]) -> Option<&Record> {
        self.data.find(key, true).filter(|r| !r.is_deleted())
    }

    /// Look up a key without filtering tombstones.
    pub fn find_record(&self, key: &[u8]) -> Option<&Record> {
        self.data.find(key, true)
    }

    /// Mark a key as deleted. No-op if the key was never written.
    pub fn delete(&mut self, key: &[u8]) {
        self.data.remove(key);
    }

    /// Sorted iterator over all entries, tombstones included.
    pub fn iter(&self) -> SkipListIter<'_> {
        self.data.iter()
    }

    /// Number of retained entries, tombstoned ones included.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current approximate memory usage in bytes.
    pub fn size(&self) -> usize {
        self.data.size_bytes()
    }

    /// Check if the memtable has reached the flush threshold.
    pub fn is_full(&self) -> bool {
        self.data.size_bytes() >= self.size_limit
    }

    /// Drop every entry. Flushed durable data is unaffected.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Append every retained record, in ascending key order and tombstones
    /// included, to the file at `path` through the record codec. The handle
    /// is opened, flushed, synced, and closed within the call.
    ///
    /// Returns the number of records written.
    pub fn flush_to_path(&self, path: &Path) -> Result<usize> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;
        for record in self.data.iter() {
            record.encode_to(&mut writer)?;
            count += 1;
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(count)
    }

    /// Flush like [`flush_to_path`](MemTable::flush_to_path) while feeding the
    /// advisory collaborators: every flushed key goes into the existence
    /// filter and the frequency sketch, and the encoded record frames become
    /// the leaves of the returned integrity tree (in flush order).
    pub fn flush_with(
        &self,
        path: &Path,
        filter: &mut BloomFilter,
        sketch: &mut CountMinSketch,
    ) -> Result<MerkleTree> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        let mut leaves: Vec<Vec<u8>> = Vec::with_capacity(self.data.len());
        for record in self.data.iter() {
            let frame = record.encode();
            writer.write_all(&frame)?;
            filter.insert(&record.key);
            sketch.insert(&record.key);
            leaves.push(frame);
        }
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(MerkleTree::build(&leaves))
    }
}
