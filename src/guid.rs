//! `System.Guid` helpers: record parsing/building plus a raw-buffer
//! locator and patcher.
//!
//! A serialized `System.Guid` is a system class with eleven members
//! `_a` through `_k`: an `Int32`, two `Int16`s, then eight `Byte`s. Because
//! typed class members are written back to back with no per-member tags,
//! those eleven values occupy exactly 16 contiguous bytes on the wire, in
//! the GUID's little-endian binary form. That is what makes the raw-buffer
//! locator possible: the canonical text form maps to one fixed 16-byte
//! pattern.
//!
//! ```text
//! text   xxxxxxxx - xxxx - xxxx - xxxx - xxxxxxxxxxxx
//!        └ _a(LE) ┘ └_b(LE)┘└_c(LE)┘ └_d,_e┘ └ _f ... _k ┘
//! ```

use crate::error::{NrbfError, Result};
use crate::record::{
    AdditionalTypeInfo, BinaryType, ClassInfo, ClassRecord, MemberTypeInfo, PrimitiveType,
    PrimitiveValue, RecordKind, Value,
};

/// Type name of the serialized GUID struct.
pub const GUID_CLASS_NAME: &str = "System.Guid";

const GUID_MEMBERS: [&str; 11] = ["_a", "_b", "_c", "_d", "_e", "_f", "_g", "_h", "_i", "_j", "_k"];

/// Reads a `System.Guid` class record into its canonical lowercase text
/// form (`xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`).
///
/// ## Errors
///
/// [`NrbfError::InvalidGuid`] when the record does not have the eleven
/// `_a`..`_k` members with the expected primitive kinds.
pub fn parse_guid(class: &ClassRecord) -> Result<String> {
    let bytes = guid_record_bytes(class)?;
    Ok(format_guid(&bytes))
}

/// Builds a typed `System.Guid` class record from its text form.
///
/// The record is a `SystemClassWithMembersAndTypes` carrying the standard
/// eleven-member layout, ready to be inserted into a graph and placed into
/// a member slot.
pub fn build_guid_record(object_id: i32, guid: &str) -> Result<ClassRecord> {
    let bytes = guid_to_bytes(guid)?;

    let class_info = ClassInfo {
        object_id,
        name: GUID_CLASS_NAME.to_owned(),
        member_names: GUID_MEMBERS.iter().map(|n| (*n).to_owned()).collect(),
    };
    let mut infos = vec![
        AdditionalTypeInfo::Primitive(PrimitiveType::Int32),
        AdditionalTypeInfo::Primitive(PrimitiveType::Int16),
        AdditionalTypeInfo::Primitive(PrimitiveType::Int16),
    ];
    infos.resize(11, AdditionalTypeInfo::Primitive(PrimitiveType::Byte));
    let member_type_info = MemberTypeInfo {
        binary_types: vec![BinaryType::Primitive; 11],
        infos,
    };

    let mut record = ClassRecord::new(
        class_info,
        Some(member_type_info),
        None,
        RecordKind::SystemClassWithMembersAndTypes,
    );
    let a = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let b = i16::from_le_bytes([bytes[4], bytes[5]]);
    let c = i16::from_le_bytes([bytes[6], bytes[7]]);
    record.set_value("_a", Value::Primitive(PrimitiveValue::Int32(a)))?;
    record.set_value("_b", Value::Primitive(PrimitiveValue::Int16(b)))?;
    record.set_value("_c", Value::Primitive(PrimitiveValue::Int16(c)))?;
    for (name, byte) in GUID_MEMBERS[3..].iter().copied().zip(bytes[8..].iter().copied()) {
        record.set_value(name, Value::Primitive(PrimitiveValue::Byte(byte)))?;
    }
    Ok(record)
}

/// Scans a raw buffer for the 16-byte little-endian form of a GUID and
/// returns every byte offset at which it occurs.
pub fn find_guid_in_buffer(buffer: &[u8], guid: &str) -> Result<Vec<usize>> {
    let needle = guid_to_bytes(guid)?;
    Ok(buffer
        .windows(needle.len())
        .enumerate()
        .filter(|(_, window)| *window == needle)
        .map(|(offset, _)| offset)
        .collect())
}

/// Returns a copy of the buffer with 16 bytes at `offset` overwritten by
/// the little-endian form of `guid`.
///
/// ## Errors
///
/// [`NrbfError::TruncatedStream`] when fewer than 16 bytes remain at the
/// offset.
pub fn replace_guid_at_offset(buffer: &[u8], offset: usize, guid: &str) -> Result<Vec<u8>> {
    let needle = guid_to_bytes(guid)?;
    if offset + 16 > buffer.len() {
        return Err(NrbfError::TruncatedStream { offset, needed: 16 });
    }
    let mut patched = buffer.to_vec();
    patched[offset..offset + 16].copy_from_slice(&needle);
    Ok(patched)
}

/// Converts a GUID's text form to its 16-byte little-endian binary form:
/// the first three groups byte-swapped, the last two verbatim.
pub fn guid_to_bytes(guid: &str) -> Result<[u8; 16]> {
    let invalid = || NrbfError::InvalidGuid { value: guid.to_owned() };

    let parts: Vec<&str> = guid.split('-').collect();
    if parts.len() != 5 {
        return Err(invalid());
    }
    let expected = [8usize, 4, 4, 4, 12];
    for (part, len) in parts.iter().zip(expected) {
        if part.len() != len || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
    }

    let a = u32::from_str_radix(parts[0], 16).map_err(|_| invalid())?;
    let b = u16::from_str_radix(parts[1], 16).map_err(|_| invalid())?;
    let c = u16::from_str_radix(parts[2], 16).map_err(|_| invalid())?;

    let mut bytes = [0u8; 16];
    bytes[0..4].copy_from_slice(&a.to_le_bytes());
    bytes[4..6].copy_from_slice(&b.to_le_bytes());
    bytes[6..8].copy_from_slice(&c.to_le_bytes());
    for (i, slot) in bytes[8..10].iter_mut().enumerate() {
        *slot = u8::from_str_radix(&parts[3][i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
    }
    for (i, slot) in bytes[10..16].iter_mut().enumerate() {
        *slot = u8::from_str_radix(&parts[4][i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
    }
    Ok(bytes)
}

fn format_guid(bytes: &[u8; 16]) -> String {
    let a = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let b = u16::from_le_bytes([bytes[4], bytes[5]]);
    let c = u16::from_le_bytes([bytes[6], bytes[7]]);
    format!(
        "{a:08x}-{b:04x}-{c:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[8],
        bytes[9],
        bytes[10],
        bytes[11],
        bytes[12],
        bytes[13],
        bytes[14],
        bytes[15]
    )
}

fn guid_record_bytes(class: &ClassRecord) -> Result<[u8; 16]> {
    let invalid = || NrbfError::InvalidGuid { value: class.type_name().to_owned() };

    let mut bytes = [0u8; 16];
    let a = match class.get_value("_a").and_then(Value::as_primitive) {
        Some(PrimitiveValue::Int32(v)) => *v,
        _ => return Err(invalid()),
    };
    bytes[0..4].copy_from_slice(&a.to_le_bytes());
    for (name, range_start) in [("_b", 4usize), ("_c", 6)] {
        let v = match class.get_value(name).and_then(Value::as_primitive) {
            Some(PrimitiveValue::Int16(v)) => *v,
            _ => return Err(invalid()),
        };
        bytes[range_start..range_start + 2].copy_from_slice(&v.to_le_bytes());
    }
    for (i, name) in GUID_MEMBERS[3..].iter().copied().enumerate() {
        bytes[8 + i] = match class.get_value(name).and_then(Value::as_primitive) {
            Some(PrimitiveValue::Byte(v)) => *v,
            _ => return Err(invalid()),
        };
    }
    Ok(bytes)
}
