//! `System.Guid` parsing, construction, and raw-buffer patching.

use nrbf::{
    build_guid_record, find_guid_in_buffer, guid_to_bytes, parse_guid, replace_guid_at_offset,
    AdditionalTypeInfo, BinaryType, ClassInfo, ClassRecord, MemberTypeInfo, Nrbf, NrbfError,
    ObjectGraph, Record, RecordKind, Result, Value,
};

const GUID_A: &str = "037b1f7c-871e-4c44-8c0f-451bb24805ac";
const GUID_B: &str = "522911f7-18ab-40c2-a749-1332e9aa7b96";

/// A save-file shaped graph: one class holding a `System.Guid` member.
fn guid_holder_graph(guid: &str) -> Result<ObjectGraph> {
    let mut graph = ObjectGraph::new();
    let guid_record = build_guid_record(2, guid)?;
    let guid_id = graph.add_record(Record::Class(guid_record))?;

    let mut holder = ClassRecord::new(
        ClassInfo {
            object_id: 1,
            name: "SaveData".to_owned(),
            member_names: vec!["id".to_owned()],
        },
        Some(MemberTypeInfo {
            binary_types: vec![BinaryType::SystemClass],
            infos: vec![AdditionalTypeInfo::SystemClass("System.Guid".to_owned())],
        }),
        None,
        RecordKind::SystemClassWithMembersAndTypes,
    );
    holder.set_value("id", Value::Record(guid_id))?;
    let root = graph.add_record(Record::Class(holder))?;
    graph.set_root(root);
    Ok(graph)
}

#[test]
fn text_form_round_trips_through_a_record() -> Result<()> {
    let record = build_guid_record(7, GUID_A)?;
    assert_eq!(parse_guid(&record)?, GUID_A);

    // Uppercase input parses back lowercase.
    let record = build_guid_record(7, "522911F7-18AB-40C2-A749-1332E9AA7B96")?;
    assert_eq!(parse_guid(&record)?, GUID_B);
    Ok(())
}

#[test]
fn binary_form_is_mixed_endian() -> Result<()> {
    let bytes = guid_to_bytes("00112233-4455-6677-8899-aabbccddeeff")?;
    assert_eq!(
        bytes,
        [
            0x33, 0x22, 0x11, 0x00, // _a, little-endian
            0x55, 0x44, // _b
            0x77, 0x66, // _c
            0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, // _d.._k verbatim
        ]
    );
    Ok(())
}

#[test]
fn malformed_text_forms_are_rejected() {
    for bad in [
        "",
        "037b1f7c871e4c448c0f451bb24805ac",
        "037b1f7c-871e-4c44-8c0f",
        "037b1f7c-871e-4c44-8c0f-451bb24805zz",
        "037b1f7c-871e-4c44-8c0f-451bb24805ac-ff",
        "+37b1f7c-871e-4c44-8c0f-451bb24805ac",
    ] {
        assert!(
            matches!(guid_to_bytes(bad), Err(NrbfError::InvalidGuid { .. })),
            "'{bad}' must be rejected"
        );
    }
}

#[test]
fn wrong_shaped_class_is_rejected() {
    let class = ClassRecord::new(
        ClassInfo {
            object_id: 1,
            name: "NotAGuid".to_owned(),
            member_names: vec!["_a".to_owned()],
        },
        None,
        None,
        RecordKind::SystemClassWithMembers,
    );
    assert!(matches!(parse_guid(&class), Err(NrbfError::InvalidGuid { .. })));
}

#[test]
fn locate_and_patch_in_an_encoded_stream() -> Result<()> {
    let graph = guid_holder_graph(GUID_A)?;
    let bytes = Nrbf::encode(&graph)?;

    // The eleven typed members serialize to one contiguous 16-byte window.
    let offsets = find_guid_in_buffer(&bytes, GUID_A)?;
    assert_eq!(offsets.len(), 1, "exactly one occurrence");
    assert!(find_guid_in_buffer(&bytes, GUID_B)?.is_empty());

    let patched = replace_guid_at_offset(&bytes, offsets[0], GUID_B)?;
    assert_eq!(patched.len(), bytes.len());

    // Both buffers stay decodable, and the class now parses to the new GUID.
    let before = Nrbf::decode(&bytes)?;
    let after = Nrbf::decode(&patched)?;
    for (expected, g) in [(GUID_A, &before), (GUID_B, &after)] {
        let hits = g.find_class("System.Guid");
        assert_eq!(hits.len(), 1);
        let class = g.record(hits[0]).as_class().expect("guid class");
        assert_eq!(parse_guid(class)?, expected);
    }
    Ok(())
}

#[test]
fn patch_past_the_end_is_rejected() -> Result<()> {
    let graph = guid_holder_graph(GUID_A)?;
    let bytes = Nrbf::encode(&graph)?;
    let err = replace_guid_at_offset(&bytes, bytes.len() - 8, GUID_B).expect_err("short window");
    assert!(matches!(err, NrbfError::TruncatedStream { needed: 16, .. }));
    Ok(())
}
