use std::fs;
use std::path::Path;

use xxhash_rust::xxh3::xxh3_128;

use crate::error::{Error, Result};

/// Probabilistic existence pre-filter: "was this key ever written?"
///
/// - If any probed bit is 0 → the key is DEFINITELY NOT in the set.
/// - If all probed bits are 1 → the key is PROBABLY in the set.
///
/// False positives happen at roughly the configured rate; false negatives
/// never do, which is the property the read path leans on — a negative
/// answer lets it skip a segment entirely. The filter is advisory, never
/// authoritative: a positive answer still needs the real lookup.
///
/// Sizing:
///   bits_per_key = -1.44 * log2(false_positive_rate)
///   num_hashes = bits_per_key * ln(2)
///
/// Hash trick: no need for k independent hash functions. Double hashing —
/// h_i(key) = h1(key) + i * h2(key) (mod m) — with h1, h2 from splitting a
/// 128-bit xxh3 into two 64-bit halves.
pub struct BloomFilter {
    bits: Vec<u64>,
    num_hashes: u32,
    num_bits: u32,
}

impl BloomFilter {
    /// Create a filter sized for `expected_items` at the given false
    /// positive rate.
    ///
    /// # Panics
    /// Panics if `expected_items` is 0 or the rate is not in (0, 1).
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "FPR must be in (0, 1)"
        );

        let bits_per_key = -1.44 * false_positive_rate.log2();

        let num_bits = (((expected_items as f64) * bits_per_key).ceil() as u32).max(64);
        let num_hashes = ((bits_per_key * 2.0f64.ln()).ceil() as u32).max(1);

        let num_words = (num_bits as usize).div_ceil(64);
        BloomFilter {
            bits: vec![0u64; num_words],
            num_hashes,
            num_bits,
        }
    }

    /// Add a key to the set.
    pub fn insert(&mut self, key: &[u8]) {
        let (h1, h2) = hash_key(key);
        for i in 0..self.num_hashes {
            let pos = self.position(h1, h2, i);
            self.bits[(pos / 64) as usize] |= 1 << (pos % 64);
        }
    }

    /// Check membership. `false` → definitely absent. `true` → probably present.
    pub fn query(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_key(key);
        for i in 0..self.num_hashes {
            let pos = self.position(h1, h2, i);
            if (self.bits[(pos / 64) as usize] >> (pos % 64)) & 1 == 0 {
                return false;
            }
        }
        true
    }

    /// Serialize to bytes. Format: [num_bits(4B)][num_hashes(4B)][words(8B each)].
    /// An encode/decode pair round-trips byte-identically.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.bits.len() * 8);
        buf.extend_from_slice(&self.num_bits.to_le_bytes());
        buf.extend_from_slice(&self.num_hashes.to_le_bytes());
        for word in &self.bits {
            buf.extend_from_slice(&word.to_le_bytes());
        }
        buf
    }

    /// Deserialize from bytes produced by [`encode`](BloomFilter::encode).
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 8 {
            return Err(Error::Corruption("bloom filter too short".into()));
        }
        let num_bits = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let num_hashes = u32::from_le_bytes(data[4..8].try_into().unwrap());
        if num_bits == 0 || num_hashes == 0 {
            return Err(Error::Corruption("bloom filter has empty geometry".into()));
        }

        let num_words = (num_bits as usize).div_ceil(64);
        let body = &data[8..];
        if body.len() != num_words * 8 {
            return Err(Error::Corruption(format!(
                "bloom filter bit array truncated: expected {} words, got {} bytes",
                num_words,
                body.len()
            )));
        }

        let bits = body
            .chunks_exact(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();

        Ok(BloomFilter {
            bits,
            num_hashes,
            num_bits,
        })
    }

    /// Write the encoded filter to a file (whole-file overwrite).
    pub fn encode_to_path(&self, path: &Path) -> Result<()> {
        fs::write(path, self.encode())?;
        Ok(())
    }

    /// Read a filter back from a file written by
    /// [`encode_to_path`](BloomFilter::encode_to_path).
    pub fn decode_from_path(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        BloomFilter::decode(&data)
    }

    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// Bit position for probe `i` via double hashing: (h1 + i * h2) mod m.
    fn position(&self, h1: u64, h2: u64, i: u32) -> u32 {
        (h1.wrapping_add((i as u64).wrapping_mul(h2)) % self.num_bits as u64) as u32
    }
}

/// Split a 128-bit xxh3 into the two halves double hashing needs.
fn hash_key(key: &[u8]) -> (u64, u64) {
    let hash128 = xxh3_128(key);
    ((hash128 & u64::MAX as u128) as u64, (hash128 >> 64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basics() {
        let mut bf = BloomFilter::new(100, 0.01);
        bf.insert(b"hello");
        assert!(bf.query(b"hello"));
        assert!(!bf.query(b"world"));
    }

    #[test]
    fn test_encode_round_trip_is_byte_identical() {
        let mut bf = BloomFilter::new(50, 0.05);
        bf.insert(b"alpha");
        bf.insert(b"beta");
        let encoded = bf.encode();
        let decoded = BloomFilter::decode(&encoded).unwrap();
        assert_eq!(decoded.encode(), encoded);
        assert!(decoded.query(b"alpha"));
        assert!(decoded.query(b"beta"));
    }
}
