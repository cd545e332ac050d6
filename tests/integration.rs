use chimp::{
    decode_values, encode_values, frame, BitReader, BufferFull, Compressor, CsvSource,
    Decompressor, FrameError, WindowSize, SENTINEL,
};

/// Round-trip: compress then decompress, verify bit-for-bit equality.
fn roundtrip(input: &[f64]) -> Vec<f64> {
    roundtrip_with(input, WindowSize::default())
}

fn roundtrip_with(input: &[f64], window: WindowSize) -> Vec<f64> {
    let mut c = Compressor::new(window);
    for v in input {
        c.add_f64(*v).unwrap();
    }
    c.close().unwrap();
    let block = c.into_compressed();
    Decompressor::new(&block.bytes, window, input.len())
        .values()
        .expect("decode failed")
}

fn assert_bits_eq(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert_eq!(x.to_bits(), y.to_bits());
    }
}

/// Raw values whose low 14 bits are distinct and non-zero, so they never hit
/// each other in the index table.
fn distinct_words(n: usize) -> Vec<u64> {
    (0..n as u64)
        .map(|i| 0x4059_0000_0000_0000 | ((i + 1) * 3))
        .collect()
}

#[test]
fn test_single_value_roundtrip() {
    assert_eq!(roundtrip(&[3.14159]), vec![3.14159]);
}

#[test]
fn test_end_to_end_example() {
    let input = [1.0, 1.0, 1.0, 2.0];
    let mut c = Compressor::new(WindowSize::default());
    for v in input {
        c.add_f64(v).unwrap();
    }
    let stats = c.stats();
    assert_eq!(stats.repeats, 2);
    assert_eq!(stats.indexed, 1);
    c.close().unwrap();

    let mut reader = BitReader::new(c.output());
    assert_eq!(reader.read_bits64(64), Some(1.0f64.to_bits()));
    // Two exact repeats: flag 00 plus a 7-bit window slot.
    assert_eq!(reader.read_bits(9), Some(0));
    assert_eq!(reader.read_bits(9), Some(1));

    let mut d = Decompressor::new(c.output(), WindowSize::default(), input.len());
    assert_eq!(d.values().unwrap(), input);
}

#[test]
fn test_constant_values() {
    let input = vec![42.0; 1000];
    assert_eq!(roundtrip(&input), input);
}

#[test]
fn test_constant_sequence_is_compact() {
    let n = 10_000u64;
    let mut c = Compressor::new(WindowSize::default());
    for _ in 0..n {
        c.add_f64(42.0).unwrap();
    }
    let flag_zero_size = WindowSize::default().flag_zero_size() as u64;
    assert_eq!(c.size_in_bits(), 64 + (n - 1) * flag_zero_size);
    assert!(c.size_in_bits() < 64 * n);
}

#[test]
fn test_slowly_varying_values() {
    let input: Vec<f64> = (0..500)
        .map(|i| (i as f64) * 0.1 + (i as f64).sin())
        .collect();
    assert_eq!(roundtrip(&input), input);
}

#[test]
fn test_negative_values_and_signed_zero() {
    let input = vec![-100.5, -99.3, 0.0, 99.3, -0.0, 0.0];
    assert_bits_eq(&roundtrip(&input), &input);
}

#[test]
fn test_special_float_values() {
    let input = vec![
        f64::MIN,
        f64::MAX,
        f64::EPSILON,
        f64::MIN_POSITIVE,
        f64::INFINITY,
        f64::NEG_INFINITY,
        0.0,
    ];
    assert_eq!(roundtrip(&input), input);
}

#[test]
fn test_other_nan_patterns_roundtrip() {
    // Only the exact end-marker pattern is reserved.
    let input = vec![
        1.0,
        f64::from_bits(0x7FF8_0000_0000_0001),
        f64::from_bits(0xFFF8_0000_0000_0000),
        2.0,
    ];
    assert_bits_eq(&roundtrip(&input), &input);
}

#[test]
fn test_large_dataset_roundtrip() {
    let input: Vec<f64> = (0..10_000)
        .map(|i| 20.0 + 5.0 * ((i as f64) * 0.01).sin() + (i as f64) * 0.001)
        .collect();
    assert_bits_eq(&roundtrip(&input), &input);
}

#[test]
fn test_periodic_values_use_window() {
    // A period longer than one but within the window.
    let input: Vec<f64> = (0..2_000).map(|i| ((i % 24) as f64) + 0.37).collect();
    let mut c = Compressor::new(WindowSize::default());
    for v in &input {
        c.add_f64(*v).unwrap();
    }
    // After the first period every value shares its key with a value in the
    // window, so it is never written as a plain delta.
    let stats = c.stats();
    assert!(stats.repeats + stats.indexed >= (input.len() - 24) as u64);
    c.close().unwrap();
    let block = c.into_compressed();
    let ratio = (input.len() * 8) as f64 / block.bytes.len() as f64;
    assert!(ratio > 2.0, "compression ratio too low: {ratio:.2}x");

    let mut d = Decompressor::new(&block.bytes, WindowSize::default(), input.len());
    assert_eq!(d.values().unwrap(), input);
}

#[test]
fn test_window_sizes() {
    let input: Vec<f64> = (0..3_000)
        .map(|i| ((i % 97) as f64).sqrt() + ((i / 97) as f64))
        .collect();
    for size in [1, 2, 16, 128, 1024, WindowSize::MAX] {
        let window = WindowSize::new(size).unwrap();
        assert_eq!(roundtrip_with(&input, window), input, "window {size}");
    }
}

#[test]
fn test_window_edge_exact_repeat_references_oldest_slot() {
    let window = WindowSize::default();
    let words = distinct_words(window.get());
    let mut c = Compressor::new(window);
    for w in &words {
        c.add_value(*w).unwrap();
    }
    assert_eq!(c.stats().repeats, 0);
    assert_eq!(c.stats().indexed, 0);

    // words[0] sits W - 1 positions back, still inside the window.
    c.add_value(words[0]).unwrap();
    assert_eq!(c.stats().repeats, 1);
    c.close().unwrap();

    let mut d = Decompressor::new(c.output(), window, words.len() + 1);
    let mut decoded = Vec::new();
    while let Some(bits) = d.next_bits().unwrap() {
        decoded.push(bits);
    }
    assert_eq!(&decoded[..words.len()], &words[..]);
    assert_eq!(decoded[words.len()], words[0]);
}

#[test]
fn test_window_edge_near_repeat_uses_indexed_delta() {
    let window = WindowSize::default();
    let words = distinct_words(window.get());
    let mut c = Compressor::new(window);
    for w in &words {
        c.add_value(*w).unwrap();
    }
    // Same low bits as words[0], different high bits.
    let near = words[0] ^ (1 << 40);
    c.add_value(near).unwrap();
    let stats = c.stats();
    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.new_bucket + stats.same_bucket, (words.len() - 1) as u64);
    c.close().unwrap();

    let mut d = Decompressor::new(c.output(), window, words.len() + 1);
    let mut last = 0;
    while let Some(bits) = d.next_bits().unwrap() {
        last = bits;
    }
    assert_eq!(last, near);
}

#[test]
fn test_window_edge_value_aged_out() {
    let window = WindowSize::default();
    let words = distinct_words(window.get() + 1);
    let mut c = Compressor::new(window);
    for w in &words {
        c.add_value(*w).unwrap();
    }
    // words[0] is W positions back and no longer referenceable.
    c.add_value(words[0]).unwrap();
    assert_eq!(c.stats().repeats, 0);
    assert_eq!(c.stats().indexed, 0);
    c.close().unwrap();

    let mut d = Decompressor::new(c.output(), window, words.len() + 1);
    let mut decoded = Vec::new();
    while let Some(bits) = d.next_bits().unwrap() {
        decoded.push(bits);
    }
    assert_eq!(decoded.last(), Some(&words[0]));
    assert_eq!(decoded.len(), words.len() + 1);
}

#[test]
fn test_deterministic_output() {
    let input: Vec<f64> = (0..1_000).map(|i| (i as f64 * 0.37).cos() * 100.0).collect();
    let a = encode_values(&input).unwrap();
    let b = encode_values(&input).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_sentinel_as_data_truncates_stream() {
    let sentinel = f64::from_bits(SENTINEL);
    let input = [1.0, 2.0, sentinel, 3.0];
    let mut c = Compressor::new(WindowSize::default());
    for v in input {
        c.add_f64(v).unwrap();
    }
    c.close().unwrap();

    let mut d = Decompressor::new(c.output(), WindowSize::default(), input.len());
    assert_eq!(d.values().unwrap(), vec![1.0, 2.0]);
    assert!(d.is_end_of_stream());

    let framed = encode_values(&input).unwrap();
    assert_eq!(
        decode_values(&framed),
        Err(FrameError::Truncated {
            expected: 4,
            decoded: 2
        })
    );
}

#[test]
fn test_sentinel_as_first_value_yields_nothing() {
    let mut c = Compressor::new(WindowSize::default());
    c.add_value(SENTINEL).unwrap();
    c.add_f64(5.0).unwrap();
    c.close().unwrap();
    let mut d = Decompressor::new(c.output(), WindowSize::default(), 2);
    assert_eq!(d.read_value().unwrap(), None);
}

#[test]
fn test_iterator_matches_values() {
    let input: Vec<f64> = (0..200).map(|i| (i as f64).sqrt()).collect();
    let mut c = Compressor::new(WindowSize::default());
    for v in &input {
        c.add_f64(*v).unwrap();
    }
    c.close().unwrap();
    let block = c.into_compressed();

    let values = Decompressor::new(&block.bytes, WindowSize::default(), input.len())
        .values()
        .unwrap();
    let iterated: Vec<f64> = Decompressor::new(&block.bytes, WindowSize::default(), input.len())
        .map(|r| r.unwrap())
        .collect();
    assert_eq!(values, iterated);
    assert_eq!(values, input);
}

// ── Framing ────────────────────────────────────────────────────────────

#[test]
fn test_frame_roundtrip_bytes() {
    let input: Vec<f64> = (0..3_600).map(|i| 15.0 + ((i % 365) as f64) * 0.1).collect();
    let source: Vec<u8> = input.iter().flat_map(|v| v.to_le_bytes()).collect();

    let mut compressed = vec![0u8; frame::compressed_bound(input.len())];
    let len = frame::compress(&source, &mut compressed).unwrap();
    assert!(len < source.len());

    let mut restored = vec![0u8; source.len()];
    assert_eq!(
        frame::decompress(&compressed[..len], &mut restored).unwrap(),
        source.len()
    );
    assert_eq!(restored, source);
}

#[test]
fn test_frame_exact_destination_fits() {
    let input = [10.0, 10.5, 11.0, 10.5];
    let encoded = encode_values(&input).unwrap();
    let source: Vec<u8> = input.iter().flat_map(|v| v.to_le_bytes()).collect();

    let mut exact = vec![0u8; encoded.len()];
    assert_eq!(frame::compress(&source, &mut exact).unwrap(), encoded.len());
    assert_eq!(exact, encoded);

    let mut short = vec![0u8; encoded.len() - 1];
    assert_eq!(
        frame::compress(&source, &mut short),
        Err(FrameError::BufferTooSmall {
            required: encoded.len(),
            available: encoded.len() - 1
        })
    );
}

#[test]
fn test_frame_decompress_larger_destination() {
    let input = [1.5, 2.5];
    let encoded = encode_values(&input).unwrap();
    let mut dest = vec![0xAAu8; 64];
    assert_eq!(frame::decompress(&encoded, &mut dest).unwrap(), 16);
    assert_eq!(&dest[..8], &1.5f64.to_le_bytes());
    assert_eq!(&dest[8..16], &2.5f64.to_le_bytes());
    assert!(dest[16..].iter().all(|b| *b == 0xAA));
}

#[test]
fn test_frame_corrupt_payload() {
    let input: Vec<f64> = (0..100).map(|i| (i as f64).ln_1p()).collect();
    let encoded = encode_values(&input).unwrap();
    let cut = &encoded[..encoded.len() / 3];
    let err = decode_values(cut).unwrap_err();
    assert!(matches!(err, FrameError::Decode(_)));
    assert_eq!(err.code(), -5);
}

// ── Buffer limit tests ─────────────────────────────────────────────────

#[test]
fn test_limit_too_small_for_first_value() {
    let mut c = Compressor::with_limit(WindowSize::default(), 7);
    assert_eq!(c.add_f64(42.0), Err(BufferFull));
    assert_eq!(c.count(), 0);
}

#[test]
fn test_limit_encodes_until_full() {
    let mut c = Compressor::with_limit(WindowSize::default(), 32);
    let mut count = 0u64;
    for i in 0..1000 {
        match c.add_f64((i as f64) * 1.234_567) {
            Ok(()) => count += 1,
            Err(_) => break,
        }
    }
    assert!(count >= 1, "should encode at least one value");
    assert!(count < 1000, "should hit the limit before 1000 values");
    assert_eq!(c.count(), count);
    assert!(c.output().len() <= 32);
}

#[test]
fn test_limit_constant_values_high_count() {
    // First value 8 bytes, then 9 bits per repeat.
    let mut c = Compressor::with_limit(WindowSize::default(), 256);
    let mut count = 0u64;
    for _ in 0..100_000 {
        if c.add_f64(42.0).is_err() {
            break;
        }
        count += 1;
    }
    assert!(count > 200, "got {count}");
}

// ── Value source ───────────────────────────────────────────────────────

#[test]
fn test_csv_blocks_roundtrip() {
    let csv: String = (0..1_000)
        .map(|i| format!("2020-01-{:02},Station,{:.1}\n", i % 28 + 1, 10.0 + (i % 50) as f64 * 0.5))
        .collect();
    let mut source = CsvSource::new(csv.as_bytes());
    let mut blocks = 0;
    loop {
        let block = source.next_block(360).unwrap();
        if block.is_empty() {
            break;
        }
        let encoded = encode_values(&block).unwrap();
        assert_eq!(decode_values(&encoded).unwrap(), block);
        blocks += 1;
    }
    assert_eq!(blocks, 3);
}
