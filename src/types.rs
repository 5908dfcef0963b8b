/// Raw key bytes. Keys compare lexicographically; the empty key sorts first.
pub type Key = Vec<u8>;

/// Raw value bytes.
pub type Value = Vec<u8>;
