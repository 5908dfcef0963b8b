use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Width of a SHA-256 digest.
pub const DIGEST_SIZE: usize = 32;

/// Hash tree over an ordered list of leaf blobs — the anti-corruption check
/// for a flushed segment.
///
/// Leaves are the encoded record frames in flush order. Each interior node
/// is SHA-256(left ++ right); an odd node at any level is paired with
/// itself. The root digest commits to every byte of every leaf, so a reader
/// that trusts the root can detect any later mutation of the segment by
/// rebuilding the tree and comparing.
///
/// Persistence keeps the leaf digests alongside the root, which is what
/// makes [`validate`](MerkleTree::validate) meaningful after a round trip:
/// it recomputes the root bottom-up from the stored leaves and compares.
pub struct MerkleTree {
    root: [u8; DIGEST_SIZE],
    leaf_hashes: Vec<[u8; DIGEST_SIZE]>,
}

fn hash_leaf(data: &[u8]) -> [u8; DIGEST_SIZE] {
    Sha256::digest(data).into()
}

fn hash_pair(left: &[u8; DIGEST_SIZE], right: &[u8; DIGEST_SIZE]) -> [u8; DIGEST_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Fold one level of digests into the next. Odd trailing node pairs with itself.
fn fold_level(level: &[[u8; DIGEST_SIZE]]) -> Vec<[u8; DIGEST_SIZE]> {
    level
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => hash_pair(left, right),
            [odd] => hash_pair(odd, odd),
            _ => unreachable!(),
        })
        .collect()
}

fn root_from_leaves(leaf_hashes: &[[u8; DIGEST_SIZE]]) -> [u8; DIGEST_SIZE] {
    if leaf_hashes.is_empty() {
        // Empty tree commits to the empty input.
        return Sha256::digest(b"").into();
    }
    let mut level = leaf_hashes.to_vec();
    while level.len() > 1 {
        level = fold_level(&level);
    }
    level[0]
}

impl MerkleTree {
    /// Build a tree from ordered leaf blobs.
    pub fn build<B: AsRef<[u8]>>(leaves: &[B]) -> Self {
        let leaf_hashes: Vec<[u8; DIGEST_SIZE]> =
            leaves.iter().map(|b| hash_leaf(b.as_ref())).collect();
        let root = root_from_leaves(&leaf_hashes);
        MerkleTree { root, leaf_hashes }
    }

    /// The root digest committing to every leaf.
    pub fn root_hash(&self) -> &[u8; DIGEST_SIZE] {
        &self.root
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_hashes.len()
    }

    /// Recompute the root bottom-up from the stored leaf digests and compare
    /// against the stored root. `false` means the tree (or its persisted
    /// form) was tampered with or corrupted.
    pub fn validate(&self) -> bool {
        root_from_leaves(&self.leaf_hashes) == self.root
    }

    /// Serialize to bytes.
    /// Format: [leaf_count(4B)][root(32B)][leaf digests(32B each)].
    /// An encode/decode pair round-trips byte-identically.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + DIGEST_SIZE * (1 + self.leaf_hashes.len()));
        buf.extend_from_slice(&(self.leaf_hashes.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.root);
        for leaf in &self.leaf_hashes {
            buf.extend_from_slice(leaf);
        }
        buf
    }

    /// Deserialize from bytes produced by [`encode`](MerkleTree::encode).
    /// Structural checks only — call [`validate`](MerkleTree::validate) to
    /// verify the digests themselves.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 4 + DIGEST_SIZE {
            return Err(Error::Corruption("merkle tree too short".into()));
        }
        let leaf_count = u32::from_le_bytes(data[0..4].try_into().unwrap()) as usize;

        let expected = 4 + DIGEST_SIZE * (1 + leaf_count);
        if data.len() != expected {
            return Err(Error::Corruption(format!(
                "merkle tree truncated: expected {expected} bytes, got {}",
                data.len()
            )));
        }

        let root: [u8; DIGEST_SIZE] = data[4..4 + DIGEST_SIZE].try_into().unwrap();
        let leaf_hashes = data[4 + DIGEST_SIZE..]
            .chunks_exact(DIGEST_SIZE)
            .map(|c| c.try_into().unwrap())
            .collect();

        Ok(MerkleTree { root, leaf_hashes })
    }

    /// Write the encoded tree to a file (whole-file overwrite).
    pub fn encode_to_path(&self, path: &Path) -> Result<()> {
        fs::write(path, self.encode())?;
        Ok(())
    }

    /// Read a tree back from a file written by
    /// [`encode_to_path`](MerkleTree::encode_to_path).
    pub fn decode_from_path(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        MerkleTree::decode(&data)
    }
}
