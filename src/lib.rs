//! # Log-Structured KV Engine Core
//!
//! The foundation of an LSM-style key-value store: a durable,
//! checksum-verified record encoding and a skip-list memtable that absorbs
//! writes before they're flushed as sorted runs.
//!
//! ## Core idea
//! Instead of updating data in place (B-Tree), buffer writes in a sorted
//! in-memory index, then flush them sequentially through a fixed binary
//! record format. Deletes are tombstones — a status bit, not a removal —
//! so they survive the flush and a later compaction stage can reconcile
//! them against older segments.
//!
//! Alongside the core sit three advisory probabilistic structures the
//! flush can feed: a bloom filter (existence pre-checks), a count-min
//! sketch (popularity estimates), and a merkle tree (segment integrity).
//! All three are oracles, never authorities.

pub mod error;
pub mod filter;
pub mod integrity;
pub mod memtable;
pub mod record;
pub mod sketch;
pub mod types;

// Public re-exports for the top-level API
pub use error::{Error, Result};
pub use filter::BloomFilter;
pub use integrity::MerkleTree;
pub use memtable::MemTable;
pub use memtable::skiplist::SkipList;
pub use record::Record;
pub use sketch::CountMinSketch;
