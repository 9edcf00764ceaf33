//! Wire-level coverage: cursor primitives, varints, strings, the header
//! sniff, and the decoder's failure modes.

use nrbf::cursor::{ByteReader, ByteWriter};
use nrbf::{looks_like_nrbf, Nrbf, NrbfError, PrimitiveValue, Result};

fn stream_header(root_id: i32) -> ByteWriter {
    let mut w = ByteWriter::new();
    w.write_u8(0x00);
    w.write_i32(root_id);
    w.write_i32(-1);
    w.write_i32(1);
    w.write_i32(0);
    w
}

fn string_record(w: &mut ByteWriter, object_id: i32, value: &str) {
    w.write_u8(0x06);
    w.write_i32(object_id);
    w.write_string(value);
}

// --- VARINTS ---

#[test]
fn varint_round_trips_at_every_width_boundary() -> Result<()> {
    let cases: [(u32, usize); 11] = [
        (0, 1),
        (1, 1),
        (0x7F, 1),
        (0x80, 2),
        (0x3FFF, 2),
        (0x4000, 3),
        (0x1F_FFFF, 3),
        (0x20_0000, 4),
        (0xFFF_FFFF, 4),
        (0x1000_0000, 5),
        (i32::MAX as u32, 5),
    ];
    for (value, expected_len) in cases {
        let mut w = ByteWriter::new();
        w.write_varint(value);
        let bytes = w.finish();
        assert_eq!(bytes.len(), expected_len, "encoded width of {value}");

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_varint()?, value);
        assert_eq!(r.remaining(), 0);
    }
    Ok(())
}

#[test]
fn varint_with_six_continuations_is_malformed() {
    let mut r = ByteReader::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
    assert_eq!(r.read_varint(), Err(NrbfError::MalformedVarint { offset: 0 }));
}

#[test]
fn varint_past_32_bits_is_malformed() {
    // Five bytes whose payload needs 33 bits.
    let mut r = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x1F]);
    assert_eq!(r.read_varint(), Err(NrbfError::MalformedVarint { offset: 0 }));
}

// --- STRINGS, CHARS, DECIMALS ---

#[test]
fn strings_round_trip_including_empty() -> Result<()> {
    for text in ["", "a", "héllo wörld", "日本語"] {
        let mut w = ByteWriter::new();
        w.write_string(text);
        let bytes = w.finish();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_string()?, text);
        assert_eq!(r.remaining(), 0);
    }
    Ok(())
}

#[test]
fn negative_string_length_is_rejected() {
    // 0xFFFFFFFF reinterpreted as i32 is -1.
    let mut r = ByteReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    assert_eq!(
        r.read_string(),
        Err(NrbfError::NegativeStringLength { length: -1, offset: 0 })
    );
}

#[test]
fn invalid_utf8_is_rejected() {
    let mut r = ByteReader::new(&[0x02, 0xFF, 0xFE]);
    assert_eq!(r.read_string(), Err(NrbfError::InvalidUtf8 { offset: 1 }));
}

#[test]
fn truncated_reads_carry_their_offset() {
    let mut r = ByteReader::new(&[0x01, 0x02]);
    assert_eq!(r.read_u8().unwrap(), 1);
    assert_eq!(
        r.read_i32(),
        Err(NrbfError::TruncatedStream { offset: 1, needed: 4 })
    );
}

#[test]
fn chars_round_trip_across_utf8_widths() -> Result<()> {
    for (ch, width) in [('A', 1usize), ('é', 2), ('€', 3), ('𝄞', 4)] {
        let mut w = ByteWriter::new();
        w.write_char(ch);
        let bytes = w.finish();
        assert_eq!(bytes.len(), width, "wire width of {ch:?}");
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_char()?, ch);
    }
    Ok(())
}

#[test]
fn decimal_bits_and_hex_rendering() {
    let bytes: [u8; 16] = [
        0xDE, 0xAD, 0xBE, 0xEF, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 0x0A, 0x0B,
    ];
    let value = PrimitiveValue::Decimal(bytes);
    let hex = value.decimal_hex().expect("decimal");
    assert_eq!(hex, "deadbeef000102030405060708090a0b");
    assert_eq!(PrimitiveValue::decimal_from_hex(&hex), Some(value));
    assert_eq!(PrimitiveValue::decimal_from_hex("deadbeef"), None);
    assert_eq!(PrimitiveValue::decimal_from_hex(&hex[..31]), None);
}

// --- HEADER SNIFF ---

#[test]
fn sniff_accepts_everything_the_encoder_produces() -> Result<()> {
    let mut w = stream_header(1);
    string_record(&mut w, 1, "x");
    w.write_u8(0x0B);
    let bytes = w.finish();

    assert!(looks_like_nrbf(&bytes));
    assert!(looks_like_nrbf(&Nrbf::encode(&Nrbf::decode(&bytes)?)?));
    Ok(())
}

#[test]
fn sniff_rejects_near_misses() {
    assert!(!looks_like_nrbf(&[]));
    assert!(!looks_like_nrbf(&[0u8; 16])); // too short
    let mut shifted = [0u8; 24];
    shifted[0] = 1; // wrong lead byte
    shifted[9] = 1;
    assert!(!looks_like_nrbf(&shifted));
    let mut wrong_version = [0u8; 24];
    wrong_version[9] = 2; // major version 2
    assert!(!looks_like_nrbf(&wrong_version));
}

// --- DECODER FAILURE MODES ---

#[test]
fn bad_record_tag_reports_offset_and_context() {
    let mut w = stream_header(1);
    w.write_u8(0x2A); // not a record tag
    w.write_bytes(b"garbage follows");
    let bytes = w.finish();

    match Nrbf::decode(&bytes) {
        Err(NrbfError::BadRecordTag { byte, offset, context }) => {
            assert_eq!(byte, 0x2A);
            assert_eq!(offset, 17);
            assert_eq!(context[0], 0x2A);
            assert!(context.len() <= 32);
        }
        other => panic!("expected BadRecordTag, got {other:?}"),
    }
}

#[test]
fn missing_header_tag_is_rejected() {
    assert!(matches!(
        Nrbf::decode(&[0x06, 0, 0, 0, 0]),
        Err(NrbfError::BadRecordTag { byte: 0x06, offset: 0, .. })
    ));
}

#[test]
fn duplicate_object_ids_are_fatal() {
    let mut w = stream_header(1);
    string_record(&mut w, 1, "first");
    string_record(&mut w, 1, "second");
    w.write_u8(0x0B);
    assert_eq!(
        Nrbf::decode(&w.finish()),
        Err(NrbfError::DuplicateObjectId { id: 1 })
    );
}

#[test]
fn class_with_id_without_metadata_is_fatal() {
    let mut w = stream_header(1);
    w.write_u8(0x01);
    w.write_i32(1);
    w.write_i32(42); // no class registered under 42
    w.write_u8(0x0B);
    assert_eq!(
        Nrbf::decode(&w.finish()),
        Err(NrbfError::UnknownMetadata { metadata_id: 42 })
    );
}

#[test]
fn absent_root_is_fatal() {
    let mut w = stream_header(42);
    string_record(&mut w, 1, "not the root");
    w.write_u8(0x0B);
    assert_eq!(
        Nrbf::decode(&w.finish()),
        Err(NrbfError::RootNotFound { root_id: 42 })
    );
}

#[test]
fn bytes_after_message_end_are_rejected() {
    let mut w = stream_header(1);
    string_record(&mut w, 1, "x");
    w.write_u8(0x0B);
    w.write_u8(0x00); // trailing junk
    assert!(matches!(
        Nrbf::decode(&w.finish()),
        Err(NrbfError::BadRecordTag { .. })
    ));
}

#[test]
fn truncated_stream_is_fatal() {
    let mut w = stream_header(1);
    w.write_u8(0x06);
    w.write_i32(1);
    w.write_varint(200); // promises 200 bytes, delivers none
    assert!(matches!(
        Nrbf::decode(&w.finish()),
        Err(NrbfError::TruncatedStream { .. })
    ));
}

#[test]
fn message_end_inside_an_array_is_fatal() {
    let mut w = stream_header(1);
    w.write_u8(0x10);
    w.write_i32(1);
    w.write_i32(3);
    w.write_u8(0x0A); // one of three elements
    w.write_u8(0x0B); // trailer where two more elements belong
    assert!(matches!(
        Nrbf::decode(&w.finish()),
        Err(NrbfError::TruncatedStream { .. })
    ));
}

#[test]
fn null_run_overflowing_its_array_is_fatal() {
    let mut w = stream_header(1);
    w.write_u8(0x10);
    w.write_i32(1);
    w.write_i32(3);
    w.write_u8(0x0E);
    w.write_i32(300); // run larger than the array
    w.write_u8(0x0B);
    assert!(matches!(
        Nrbf::decode(&w.finish()),
        Err(NrbfError::InvalidCount { count: 300, .. })
    ));
}

#[test]
fn negative_counts_are_fatal() {
    let mut w = stream_header(1);
    w.write_u8(0x10);
    w.write_i32(1);
    w.write_i32(-4);
    w.write_u8(0x0B);
    assert!(matches!(
        Nrbf::decode(&w.finish()),
        Err(NrbfError::InvalidCount { count: -4, .. })
    ));
}

#[test]
fn record_cap_stops_pathological_streams() {
    let mut w = stream_header(1);
    for i in 0..10 {
        string_record(&mut w, i + 1, "spam");
    }
    w.write_u8(0x0B);
    let bytes = w.finish();

    assert_eq!(
        Nrbf::builder().record_limit(4).read(&bytes),
        Err(NrbfError::RecordLimitExceeded { limit: 4 })
    );
    // The same stream is fine under the default cap.
    assert!(Nrbf::decode(&bytes).is_ok());
}
