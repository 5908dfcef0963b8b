use lsm_core::BloomFilter;

#[test]
fn test_empty_filter_returns_false() {
    let bf = BloomFilter::new(100, 0.01);

    // Empty filter should never return true
    assert!(!bf.query(b"any_key"));
    assert!(!bf.query(b"hello"));
    assert!(!bf.query(b""));
}

#[test]
fn test_inserted_key_found() {
    let mut bf = BloomFilter::new(100, 0.01);

    bf.insert(b"hello");

    assert!(bf.query(b"hello"));
}

#[test]
fn test_different_key_not_found() {
    let mut bf = BloomFilter::new(100, 0.01);

    bf.insert(b"hello");

    // Different key should (probably) not be found
    // Note: there's a small chance of false positive
    // but with 100 capacity and 1% FPR, it's unlikely
    assert!(!bf.query(b"world"));
    assert!(!bf.query(b"hello!"));
    assert!(!bf.query(b"hell"));
}

#[test]
fn test_duplicate_insert_no_error() {
    let mut bf = BloomFilter::new(100, 0.01);

    bf.insert(b"key");
    bf.insert(b"key");
    bf.insert(b"key");

    assert!(bf.query(b"key"));
}

#[test]
fn test_no_false_negatives() {
    let mut bf = BloomFilter::new(1000, 0.01);

    // Whatever else the filter gets wrong, an inserted key must never
    // come back negative.
    for i in 0..1000u32 {
        bf.insert(format!("key_{i:04}").as_bytes());
    }
    for i in 0..1000u32 {
        assert!(
            bf.query(format!("key_{i:04}").as_bytes()),
            "false negative for key_{i:04}"
        );
    }
}

#[test]
fn test_false_positive_rate_in_the_ballpark() {
    let mut bf = BloomFilter::new(1000, 0.01);
    for i in 0..1000u32 {
        bf.insert(format!("present_{i}").as_bytes());
    }

    let mut false_positives = 0;
    for i in 0..10_000u32 {
        if bf.query(format!("absent_{i}").as_bytes()) {
            false_positives += 1;
        }
    }

    // 1% target; allow generous slack, this is probabilistic.
    assert!(
        false_positives < 500,
        "false positive rate way off: {false_positives}/10000"
    );
}

#[test]
fn test_encode_decode_byte_identical() {
    let mut bf = BloomFilter::new(200, 0.05);
    for i in 0..200u32 {
        bf.insert(format!("key_{i}").as_bytes());
    }

    let encoded = bf.encode();
    let decoded = BloomFilter::decode(&encoded).unwrap();

    assert_eq!(decoded.encode(), encoded);
    assert_eq!(decoded.num_bits(), bf.num_bits());
    assert_eq!(decoded.num_hashes(), bf.num_hashes());
    for i in 0..200u32 {
        assert!(decoded.query(format!("key_{i}").as_bytes()));
    }
}

#[test]
fn test_decode_garbage_fails() {
    assert!(BloomFilter::decode(&[]).is_err());
    assert!(BloomFilter::decode(&[1, 2, 3]).is_err());

    // Valid geometry header but a short bit array
    let mut bf = BloomFilter::new(100, 0.01);
    bf.insert(b"key");
    let mut encoded = bf.encode();
    encoded.truncate(encoded.len() - 8);
    assert!(BloomFilter::decode(&encoded).is_err());
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("filter.db");

    let mut bf = BloomFilter::new(10, 0.2);
    bf.insert(b"KEY00");
    bf.insert(b"KEY01");
    bf.insert(b"KEY04");

    bf.encode_to_path(&path).unwrap();
    let restored = BloomFilter::decode_from_path(&path).unwrap();

    assert!(restored.query(b"KEY00"));
    assert!(restored.query(b"KEY01"));
    assert!(restored.query(b"KEY04"));
    assert_eq!(restored.encode(), bf.encode());
}
