use std::f64::consts::E;
use std::fs;
use std::path::Path;

use xxhash_rust::xxh3::xxh3_64_with_seed;

use crate::error::{Error, Result};

/// Probabilistic frequency estimator: "roughly how often was this key written?"
///
/// A depth × width grid of counters. Each insert bumps one counter per row
/// (row index = seeded hash of the key mod width); a query takes the minimum
/// across rows. Collisions only ever inflate counters, so the estimate never
/// undercounts — the engine reads it as "at most this popular is a lie,
/// at least this popular is not".
///
/// Sizing from the accuracy parameters:
///   width = ceil(e / epsilon)     — error at most epsilon * total inserts
///   depth = ceil(ln(1 / delta))   — with probability at least 1 - delta
pub struct CountMinSketch {
    width: u32,
    depth: u32,
    counters: Vec<u64>, // row-major, depth rows of width counters
}

impl CountMinSketch {
    /// Create a sketch with additive error `epsilon` at confidence `1 - delta`.
    ///
    /// # Panics
    /// Panics if either parameter is not in (0, 1).
    pub fn new(epsilon: f64, delta: f64) -> Self {
        assert!(epsilon > 0.0 && epsilon < 1.0, "epsilon must be in (0, 1)");
        assert!(delta > 0.0 && delta < 1.0, "delta must be in (0, 1)");

        let width = ((E / epsilon).ceil() as u32).max(1);
        let depth = (((1.0 / delta).ln()).ceil() as u32).max(1);

        CountMinSketch {
            width,
            depth,
            counters: vec![0u64; (width as usize) * (depth as usize)],
        }
    }

    /// Count one occurrence of a key.
    pub fn insert(&mut self, key: &[u8]) {
        for row in 0..self.depth {
            let idx = self.cell(row, key);
            self.counters[idx] = self.counters[idx].saturating_add(1);
        }
    }

    /// Estimated occurrence count. Never less than the true count.
    pub fn query(&self, key: &[u8]) -> u64 {
        (0..self.depth)
            .map(|row| self.counters[self.cell(row, key)])
            .min()
            .unwrap_or(0)
    }

    /// Serialize to bytes. Format: [width(4B)][depth(4B)][counters(8B each)].
    /// An encode/decode pair round-trips byte-identically.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.counters.len() * 8);
        buf.extend_from_slice(&self.width.to_le_bytes());
        buf.extend_from_slice(&self.depth.to_le_bytes());
        for counter in &self.counters {
            buf.extend_from_slice(&counter.to_le_bytes());
        }
        buf
    }

    /// Deserialize from bytes produced by [`encode`](CountMinSketch::encode).
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Corruption("count-min sketch too short".into()));
        }
        let width = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let depth = u32::from_le_bytes(data[4..8].try_into().unwrap());
        if width == 0 || depth == 0 {
            return Err(Error::Corruption("count-min sketch has empty grid".into()));
        }

        let expected = (width as usize) * (depth as usize) * 8;
        let body = &data[8..];
        if body.len() != expected {
            return Err(Error::Corruption(format!(
                "count-min sketch counter grid truncated: expected {expected} bytes, got {}",
                body.len()
            )));
        }

        let counters = body
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();

        Ok(CountMinSketch {
            width,
            depth,
            counters,
        })
    }

    /// Write the encoded sketch to a file (whole-file overwrite).
    pub fn encode_to_path(&self, path: &Path) -> Result<()> {
        fs::write(path, self.encode())?;
        Ok(())
    }

    /// Read a sketch back from a file written by
    /// [`encode_to_path`](CountMinSketch::encode_to_path).
    pub fn decode_from_path(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        CountMinSketch::decode(&data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Flattened index of the counter `key` maps to in `row`.
    /// The row number seeds the hash, giving one independent function per row.
    fn cell(&self, row: u32, key: &[u8]) -> usize {
        let hash = xxh3_64_with_seed(key, row as u64);
        (row as usize) * (self.width as usize) + (hash % self.width as u64) as usize
    }
}
