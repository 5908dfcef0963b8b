use lsm_core::CountMinSketch;

#[test]
fn test_counts_small_scenario() {
    let mut cms = CountMinSketch::new(0.01, 0.1);

    cms.insert(b"blue");
    cms.insert(b"blue");
    cms.insert(b"red");
    cms.insert(b"green");
    cms.insert(b"blue");

    assert_eq!(cms.query(b"blue"), 3);
    assert_eq!(cms.query(b"red"), 1);
    assert_eq!(cms.query(b"green"), 1);
    assert_eq!(cms.query(b"yellow"), 0);
    assert_eq!(cms.query(b"orange"), 0);
}

#[test]
fn test_empty_sketch_queries_zero() {
    let cms = CountMinSketch::new(0.01, 0.01);
    assert_eq!(cms.query(b"anything"), 0);
    assert_eq!(cms.query(b""), 0);
}

#[test]
fn test_never_undercounts() {
    let mut cms = CountMinSketch::new(0.1, 0.1);

    // Skewed workload: key i inserted i times.
    for i in 1..=50u64 {
        let key = format!("key_{i}");
        for _ in 0..i {
            cms.insert(key.as_bytes());
        }
    }

    // Collisions may inflate an estimate, never deflate it.
    for i in 1..=50u64 {
        let key = format!("key_{i}");
        assert!(
            cms.query(key.as_bytes()) >= i,
            "undercount for {key}: got {} want >= {i}",
            cms.query(key.as_bytes())
        );
    }
}

#[test]
fn test_tight_parameters_are_accurate() {
    let mut cms = CountMinSketch::new(0.001, 0.01);
    for _ in 0..100 {
        cms.insert(b"hot");
    }
    cms.insert(b"cold");

    // With a wide grid and few distinct keys these should be exact.
    assert_eq!(cms.query(b"hot"), 100);
    assert_eq!(cms.query(b"cold"), 1);
}

#[test]
fn test_encode_decode_byte_identical() {
    let mut cms = CountMinSketch::new(0.1, 0.1);
    cms.insert(b"blue");
    cms.insert(b"blue");
    cms.insert(b"red");

    let encoded = cms.encode();
    let decoded = CountMinSketch::decode(&encoded).unwrap();

    assert_eq!(decoded.encode(), encoded);
    assert_eq!(decoded.width(), cms.width());
    assert_eq!(decoded.depth(), cms.depth());
    assert_eq!(decoded.query(b"blue"), 3);
    assert_eq!(decoded.query(b"red"), 1);
    assert_eq!(decoded.query(b"green"), 0);
}

#[test]
fn test_decode_garbage_fails() {
    assert!(CountMinSketch::decode(&[]).is_err());
    assert!(CountMinSketch::decode(&[0; 8]).is_err()); // zero-sized grid

    let cms = CountMinSketch::new(0.1, 0.1);
    let mut encoded = cms.encode();
    encoded.truncate(encoded.len() - 1);
    assert!(CountMinSketch::decode(&encoded).is_err());
}

#[test]
fn test_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cms.bin");

    let mut cms = CountMinSketch::new(0.1, 0.1);
    cms.insert(b"blue");
    cms.insert(b"blue");
    cms.insert(b"green");

    cms.encode_to_path(&path).unwrap();
    let restored = CountMinSketch::decode_from_path(&path).unwrap();

    assert_eq!(restored.query(b"blue"), 2);
    assert_eq!(restored.query(b"green"), 1);
    assert_eq!(restored.encode(), cms.encode());
}
