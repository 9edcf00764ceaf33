//! Byte-exact round-trip coverage: every stream here decodes to a graph and
//! re-encodes to the identical bytes.

use nrbf::cursor::ByteWriter;
use nrbf::{
    AdditionalTypeInfo, BinaryType, ClassInfo, ClassRecord, MemberTypeInfo, Nrbf, ObjectGraph,
    PrimitiveType, PrimitiveValue, Record, RecordKind, Result, Value,
};

// --- STREAM BUILDING ---

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

fn assert_round_trip(bytes: &[u8]) -> Result<()> {
    let graph = Nrbf::decode(bytes)?;
    assert_eq!(Nrbf::encode(&graph)?, bytes, "re-encode must reproduce the source bytes");
    Ok(())
}

// --- TESTS ---

#[test]
fn minimal_string_stream() -> Result<()> {
    let bytes = [
        0x00, 1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 1, 0, 0, 0, 0, 0, 0, 0,
        0x06, 1, 0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o',
        0x0B,
    ];

    let graph = Nrbf::decode(&bytes)?;
    let root = graph.root().expect("root");
    assert_eq!(graph.record(root).object_id(), Some(1));
    assert_eq!(graph.record(root).as_string(), Some("hello"));

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn class_with_id_reuses_metadata() -> Result<()> {
    // Root is an object array of two Game.Point instances: the first a full
    // ClassWithMembersAndTypes, the second a ClassWithId reusing its layout.
    let mut w = stream_header(3);
    w.write_u8(0x10); // ArraySingleObject
    w.write_i32(3);
    w.write_i32(2);
    w.write_u8(0x0C); // BinaryLibrary, interleaved before first use
    w.write_i32(4);
    w.write_string("GameLib");
    w.write_u8(0x05); // ClassWithMembersAndTypes
    w.write_i32(1);
    w.write_string("Game.Point");
    w.write_i32(2);
    w.write_string("x");
    w.write_string("y");
    w.write_u8(0); // BinaryType::Primitive x2
    w.write_u8(0);
    w.write_u8(8); // PrimitiveType::Int32 x2
    w.write_u8(8);
    w.write_i32(4); // library ID
    w.write_i32(10);
    w.write_i32(20);
    w.write_u8(0x01); // ClassWithId
    w.write_i32(2);
    w.write_i32(1);
    w.write_i32(30);
    w.write_i32(40);
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    let root = graph.root().expect("root");
    let Record::ObjectArray(array) = graph.record(root) else {
        panic!("expected object array root");
    };
    assert_eq!(array.elements.len(), 2);

    let first = graph.record(array.elements.get(0).unwrap().as_record().unwrap());
    let second = graph.record(array.elements.get(1).unwrap().as_record().unwrap());
    let (full, reused) = (first.as_class().unwrap(), second.as_class().unwrap());

    assert_eq!(full.original_kind, RecordKind::ClassWithMembersAndTypes);
    assert_eq!(reused.original_kind, RecordKind::ClassWithId);
    assert_eq!(reused.type_name(), "Game.Point");
    assert_eq!(reused.member_names(), full.member_names());
    assert_eq!(reused.metadata_id, Some(1));
    assert_eq!(
        reused.get_value("x"),
        Some(&Value::Primitive(PrimitiveValue::Int32(30)))
    );
    assert_eq!(graph.libraries().get(&4).map(String::as_str), Some("GameLib"));

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn forward_reference_resolves_after_decode() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x02); // SystemClassWithMembers (untyped)
    w.write_i32(1);
    w.write_string("Holder");
    w.write_i32(1);
    w.write_string("slot");
    w.write_u8(0x09); // MemberReference to a record that appears later
    w.write_i32(5);
    string_record(&mut w, 5, "target");
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    let resolved = graph.get_path("slot")?.expect("slot resolves");
    let target = resolved.as_record().expect("record handle");
    assert_eq!(graph.record(target).as_string(), Some("target"));

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn reference_cycle_navigates_and_terminates() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x02);
    w.write_i32(1);
    w.write_string("NodeA");
    w.write_i32(1);
    w.write_string("next");
    w.write_u8(0x09);
    w.write_i32(2);
    w.write_u8(0x02);
    w.write_i32(2);
    w.write_string("NodeB");
    w.write_i32(1);
    w.write_string("next");
    w.write_u8(0x09);
    w.write_i32(1);
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;

    // Two hops around the cycle land back on A.
    let back = graph.get_path("next.next")?.expect("cycle navigates");
    assert_eq!(back.as_record(), graph.object(1));

    // Encoding terminates because the emitted set stops re-emission.
    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn null_run_expands_and_replays() -> Result<()> {
    // Ten slots: two strings, a run of seven nulls, one string.
    let mut w = stream_header(1);
    w.write_u8(0x10);
    w.write_i32(1);
    w.write_i32(10);
    string_record(&mut w, 2, "first");
    string_record(&mut w, 3, "second");
    w.write_u8(0x0E); // ObjectNullMultiple
    w.write_i32(7);
    string_record(&mut w, 4, "last");
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    let root = graph.root().expect("root");
    let Record::ObjectArray(array) = graph.record(root) else {
        panic!("expected object array root");
    };
    assert_eq!(array.elements.len(), 10);
    for i in 2..9 {
        assert!(array.elements.get(i).unwrap().is_null(), "slot {i} expands to null");
    }
    assert_eq!(array.elements.null_runs().len(), 1);
    assert_eq!(array.elements.null_runs()[0].count, 7);
    assert_eq!(array.elements.null_runs()[0].kind, RecordKind::ObjectNullMultiple);

    // One run record comes back out, not seven singleton nulls.
    assert_round_trip(&bytes)
}

#[test]
fn null_run_256_keeps_its_kind() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x10);
    w.write_i32(1);
    w.write_i32(3);
    w.write_u8(0x0D); // ObjectNullMultiple256
    w.write_u8(2);
    string_record(&mut w, 2, "tail");
    w.write_u8(0x0B);
    assert_round_trip(&w.finish())
}

#[test]
fn zero_length_null_run_is_preserved() -> Result<()> {
    // Legal on the wire: a run of zero nulls expands to nothing.
    let mut w = stream_header(1);
    w.write_u8(0x10);
    w.write_i32(1);
    w.write_i32(2);
    w.write_u8(0x0D);
    w.write_u8(0);
    string_record(&mut w, 2, "a");
    string_record(&mut w, 3, "b");
    w.write_u8(0x0B);
    assert_round_trip(&w.finish())
}

#[test]
fn rectangular_primitive_binary_array() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x07); // BinaryArray
    w.write_i32(1);
    w.write_u8(2); // Rectangular
    w.write_i32(2); // rank
    w.write_i32(2);
    w.write_i32(3);
    w.write_u8(0); // BinaryType::Primitive
    w.write_u8(8); // PrimitiveType::Int32
    for v in 1..=6 {
        w.write_i32(v);
    }
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    let root = graph.root().expect("root");
    let Record::Array(array) = graph.record(root) else {
        panic!("expected binary array root");
    };
    assert_eq!(array.rank(), 2);
    assert_eq!(array.lengths, vec![2, 3]);
    assert_eq!(array.total_len(), 6);
    assert_eq!(
        array.elements.get(4),
        Some(&Value::Primitive(PrimitiveValue::Int32(5)))
    );

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn offset_array_of_strings() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x07);
    w.write_i32(1);
    w.write_u8(3); // SingleOffset
    w.write_i32(1);
    w.write_i32(2); // length
    w.write_i32(5); // lower bound
    w.write_u8(1); // BinaryType::String
    string_record(&mut w, 2, "alpha");
    string_record(&mut w, 3, "beta");
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    let root = graph.root().expect("root");
    let Record::Array(array) = graph.record(root) else {
        panic!("expected binary array root");
    };
    assert_eq!(array.lower_bounds, Some(vec![5]));

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn primitive_array_keeps_64_bit_precision() -> Result<()> {
    // 2^53 + 1 is not representable in an f64; it must survive untouched.
    let big = (1i64 << 53) + 1;
    let mut w = stream_header(1);
    w.write_u8(0x0F); // ArraySinglePrimitive
    w.write_i32(1);
    w.write_i32(3);
    w.write_u8(9); // PrimitiveType::Int64
    w.write_i64(1);
    w.write_i64(-5);
    w.write_i64(big);
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    let value = graph.get_path("2")?.expect("index 2");
    assert_eq!(value, Value::Primitive(PrimitiveValue::Int64(big)));

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn member_primitive_typed_in_untyped_class() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x02);
    w.write_i32(1);
    w.write_string("Counter");
    w.write_i32(1);
    w.write_string("value");
    w.write_u8(0x08); // MemberPrimitiveTyped
    w.write_u8(8); // Int32
    w.write_i32(777);
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    let value = graph.get_path("value")?.expect("member");
    let Record::PrimitiveTyped(pt) = graph.record(value.as_record().unwrap()) else {
        panic!("expected wrapped primitive");
    };
    assert_eq!(pt.value, Value::Primitive(PrimitiveValue::Int32(777)));

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn typed_members_cover_every_primitive_width() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x04); // SystemClassWithMembersAndTypes
    w.write_i32(1);
    w.write_string("Everything");
    w.write_i32(8);
    for name in ["flag", "glyph", "ticks", "price", "ratio", "text", "stamp", "wide"] {
        w.write_string(name);
    }
    for _ in 0..8 {
        w.write_u8(0); // all Primitive
    }
    w.write_u8(1); // Boolean
    w.write_u8(3); // Char
    w.write_u8(12); // TimeSpan
    w.write_u8(5); // Decimal
    w.write_u8(6); // Double
    w.write_u8(18); // String (inline primitive form)
    w.write_u8(13); // DateTime
    w.write_u8(16); // UInt64
    w.write_bool(true);
    w.write_char('é'); // two UTF-8 bytes on the wire
    w.write_i64(-42);
    w.write_decimal(&[
        0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
    ]);
    w.write_f64(2.5);
    w.write_string("inline");
    w.write_i64((1i64 << 60) + 7);
    w.write_u64(u64::MAX);
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    assert_eq!(
        graph.get_path("glyph")?,
        Some(Value::Primitive(PrimitiveValue::Char('é')))
    );
    assert_eq!(
        graph.get_path("stamp")?,
        Some(Value::Primitive(PrimitiveValue::DateTime((1i64 << 60) + 7)))
    );
    let decimal = graph.get_path("price")?.expect("decimal member");
    let hex = decimal.as_primitive().unwrap().decimal_hex().expect("decimal");
    assert_eq!(hex, "000102030405060708090a0b0c0d0e0f");

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}

#[test]
fn empty_object_array() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x10);
    w.write_i32(1);
    w.write_i32(0);
    w.write_u8(0x0B);
    assert_round_trip(&w.finish())
}

#[test]
fn string_array_round_trips() -> Result<()> {
    let mut w = stream_header(1);
    w.write_u8(0x11); // ArraySingleString
    w.write_i32(1);
    w.write_i32(3);
    string_record(&mut w, 2, "uno");
    w.write_u8(0x0A); // ObjectNull
    string_record(&mut w, 3, "tres");
    w.write_u8(0x0B);
    assert_round_trip(&w.finish())
}

#[test]
fn hand_built_graph_emits_library_before_first_use() -> Result<()> {
    let mut graph = ObjectGraph::new();
    graph.register_library(2, "Assembly-CSharp".to_owned())?;

    let mut class = ClassRecord::new(
        ClassInfo {
            object_id: 1,
            name: "Player".to_owned(),
            member_names: vec!["hp".to_owned()],
        },
        Some(MemberTypeInfo {
            binary_types: vec![BinaryType::Primitive],
            infos: vec![AdditionalTypeInfo::Primitive(PrimitiveType::Int32)],
        }),
        Some(2),
        RecordKind::ClassWithMembersAndTypes,
    );
    class.set_value("hp", Value::Primitive(PrimitiveValue::Int32(100)))?;
    let root = graph.add_record(Record::Class(class))?;
    graph.set_root(root);

    let bytes = Nrbf::encode(&graph)?;
    assert_eq!(bytes[17], 0x0C, "library frame precedes the class that uses it");

    let reloaded = Nrbf::decode(&bytes)?;
    assert_eq!(
        reloaded.libraries().get(&2).map(String::as_str),
        Some("Assembly-CSharp")
    );
    assert_eq!(
        reloaded.get_path("hp")?,
        Some(Value::Primitive(PrimitiveValue::Int32(100)))
    );
    assert_eq!(Nrbf::encode(&reloaded)?, bytes);
    Ok(())
}

#[test]
fn nested_string_root() -> Result<()> {
    // The root may be a record nested inside another top-level record.
    let mut w = stream_header(5);
    w.write_u8(0x02);
    w.write_i32(1);
    w.write_string("Wrapper");
    w.write_i32(1);
    w.write_string("inner");
    string_record(&mut w, 5, "the actual root");
    w.write_u8(0x0B);
    let bytes = w.finish();

    let graph = Nrbf::decode(&bytes)?;
    let root = graph.root().expect("root");
    assert_eq!(graph.record(root).as_string(), Some("the actual root"));

    assert_eq!(Nrbf::encode(&graph)?, bytes);
    Ok(())
}
