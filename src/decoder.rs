//! The read-side engine: a recursive-descent parser over the record stream.
//!
//! One [`Decoder`] instance owns the cursor, the graph under construction,
//! and the per-stream tables. Control flow is a single recursive descent
//! driven by the lead byte of each record:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │ read_header     (tag 0, root ID, versions)                 │
//! ├────────────────────────────────────────────────────────────┤
//! │ loop: read_frame                                           │
//! │   ├─ class tags 1-5 → register, then read member values    │
//! │   │    ├─ typed member   → inline primitive                │
//! │   │    └─ untyped member → read_frame (recursion)          │
//! │   ├─ array tags 7/15/16/17 → element loop (null-run aware) │
//! │   ├─ library tag 12 → absorbed into the library table      │
//! │   └─ trailer tag 11 → stop                                 │
//! ├────────────────────────────────────────────────────────────┤
//! │ resolve header.root_id through the record table            │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ordering Invariants
//!
//! - A class record is registered into the record table **before** its
//!   member values are read, so a member that refers back to the object
//!   being decoded (a direct cycle) resolves.
//! - Full class records (tags 2-5) register their layout into the metadata
//!   table before their values; a later `ClassWithId` fabricates its own
//!   `ClassInfo` from that layout but keeps its own object ID.
//! - Forward references are legal: a `MemberReference` is stored as-is and
//!   resolved lazily through the record table, because its target may not
//!   have been decoded yet.
//!
//! ## Failure Semantics
//!
//! Malformed input surfaces as a typed [`NrbfError`]; the decoder never
//! truncates, coerces, or skips, and no partial graph is exposed on failure.
//! A configurable frame cap guards against pathological inputs such as
//! endless zero-length null runs.

use crate::constants::DEFAULT_RECORD_LIMIT;
use crate::cursor::ByteReader;
use crate::error::{NrbfError, Result};
use crate::graph::{ClassMetadata, ObjectGraph, RecordId};
use crate::record::{
    AdditionalTypeInfo, ArrayElements, ArrayRecord, BinaryArrayKind, BinaryType, ClassInfo,
    ClassRecord, MemberTypeInfo, ObjectArrayRecord, PrimitiveArrayRecord, PrimitiveType,
    PrimitiveTypedRecord, PrimitiveValue, Record, RecordKind, StringArrayRecord, StringRecord,
    Value,
};

/// Bytes of stream included in a bad-tag error.
const CONTEXT_WINDOW: usize = 32;

/// Outcome of reading one frame from the stream.
enum Frame {
    /// A record was materialized into the graph.
    Node(RecordId),
    /// A null token: tag 10 (count 1) or a run (tags 13/14).
    Nulls { count: i32, kind: RecordKind },
    /// A library registration, absorbed into the library table.
    Library,
    /// The stream trailer.
    End,
}

/// Stateful stream parser producing an [`ObjectGraph`].
#[derive(Debug)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    cursor: ByteReader<'a>,
    graph: ObjectGraph,
    record_limit: usize,
    frames: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder with the default frame cap.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_limit(bytes, DEFAULT_RECORD_LIMIT)
    }

    /// Creates a decoder with an explicit frame cap.
    pub fn with_limit(bytes: &'a [u8], record_limit: usize) -> Self {
        Self {
            bytes,
            cursor: ByteReader::new(bytes),
            graph: ObjectGraph::new(),
            record_limit,
            frames: 0,
        }
    }

    /// Decodes a complete stream with default options.
    pub fn decode(bytes: &'a [u8]) -> Result<ObjectGraph> {
        Self::new(bytes).run()
    }

    /// Consumes the decoder and parses the whole stream.
    pub fn run(mut self) -> Result<ObjectGraph> {
        self.read_header()?;

        loop {
            match self.read_frame()? {
                Frame::End => break,
                Frame::Node(id) => self.graph.push_top_level(id),
                Frame::Nulls { count, kind } => {
                    // Null tokens at the top level are unusual but accepted;
                    // they keep their wire form so re-encode replays them.
                    let record = match kind {
                        RecordKind::ObjectNull => Record::Null,
                        RecordKind::ObjectNullMultiple256 => {
                            Record::NullMultiple256 { count: count as u8 }
                        }
                        _ => Record::NullMultiple { count },
                    };
                    let id = self.graph.add_record(record)?;
                    self.graph.push_top_level(id);
                }
                Frame::Library => {}
            }
        }

        // MessageEnd must be the last record: anything after it would be
        // dropped by a re-encode, so it is rejected up front.
        if self.cursor.remaining() > 0 {
            let offset = self.cursor.position();
            return Err(self.bad_tag(self.cursor.peek(1)[0], offset));
        }

        let root_id = self.graph.header().root_id;
        let root = self
            .graph
            .object(root_id)
            .ok_or(NrbfError::RootNotFound { root_id })?;
        self.graph.set_root(root);

        log::debug!(
            "decoded {} records ({} top-level, {} libraries)",
            self.graph.len(),
            self.graph.top_level().len(),
            self.graph.libraries().len()
        );
        Ok(self.graph)
    }

    // --- FRAMING ---

    fn read_header(&mut self) -> Result<()> {
        let offset = self.cursor.position();
        let tag = self.cursor.read_u8()?;
        if RecordKind::from_byte(tag) != Some(RecordKind::Header) {
            return Err(self.bad_tag(tag, offset));
        }
        *self.graph.header_mut() = crate::graph::StreamHeader {
            root_id: self.cursor.read_i32()?,
            header_id: self.cursor.read_i32()?,
            major_version: self.cursor.read_i32()?,
            minor_version: self.cursor.read_i32()?,
        };
        Ok(())
    }

    /// Reads one record frame and dispatches on its lead byte.
    fn read_frame(&mut self) -> Result<Frame> {
        self.frames += 1;
        if self.frames > self.record_limit {
            return Err(NrbfError::RecordLimitExceeded { limit: self.record_limit });
        }

        let offset = self.cursor.position();
        let byte = self.cursor.read_u8()?;
        let kind = RecordKind::from_byte(byte).ok_or_else(|| self.bad_tag(byte, offset))?;
        log::trace!("record {kind:?} at offset {offset}");

        match kind {
            // The header is stream framing, not a record position.
            RecordKind::Header => Err(self.bad_tag(byte, offset)),
            RecordKind::ClassWithId => self.read_class_with_id().map(Frame::Node),
            RecordKind::SystemClassWithMembers
            | RecordKind::ClassWithMembers
            | RecordKind::SystemClassWithMembersAndTypes
            | RecordKind::ClassWithMembersAndTypes => self.read_class(kind).map(Frame::Node),
            RecordKind::BinaryObjectString => {
                let object_id = self.cursor.read_i32()?;
                let value = self.cursor.read_string()?;
                let id = self
                    .graph
                    .add_record(Record::ObjectString(StringRecord { object_id, value }))?;
                Ok(Frame::Node(id))
            }
            RecordKind::BinaryArray => self.read_binary_array().map(Frame::Node),
            RecordKind::MemberPrimitiveTyped => {
                let at = self.cursor.position();
                let pt_byte = self.cursor.read_u8()?;
                let primitive_type = PrimitiveType::from_byte(pt_byte)
                    .ok_or_else(|| self.bad_tag(pt_byte, at))?;
                let value = self.read_primitive(primitive_type)?;
                let id = self.graph.add_record(Record::PrimitiveTyped(PrimitiveTypedRecord {
                    primitive_type,
                    value,
                }))?;
                Ok(Frame::Node(id))
            }
            RecordKind::MemberReference => {
                let id_ref = self.cursor.read_i32()?;
                let id = self.graph.add_record(Record::Reference { id_ref })?;
                Ok(Frame::Node(id))
            }
            RecordKind::ObjectNull => Ok(Frame::Nulls { count: 1, kind }),
            RecordKind::ObjectNullMultiple256 => {
                let count = self.cursor.read_u8()?;
                Ok(Frame::Nulls { count: i32::from(count), kind })
            }
            RecordKind::ObjectNullMultiple => {
                let at = self.cursor.position();
                let count = self.cursor.read_i32()?;
                if count < 0 {
                    return Err(NrbfError::InvalidCount { count: i64::from(count), offset: at });
                }
                Ok(Frame::Nulls { count, kind })
            }
            RecordKind::MessageEnd => Ok(Frame::End),
            RecordKind::BinaryLibrary => {
                let library_id = self.cursor.read_i32()?;
                let library_name = self.cursor.read_string()?;
                self.graph.register_library(library_id, library_name)?;
                Ok(Frame::Library)
            }
            RecordKind::ArraySinglePrimitive => self.read_array_single_primitive().map(Frame::Node),
            RecordKind::ArraySingleObject => {
                let (object_id, elements) = self.read_array_single()?;
                let id = self
                    .graph
                    .add_record(Record::ObjectArray(ObjectArrayRecord { object_id, elements }))?;
                Ok(Frame::Node(id))
            }
            RecordKind::ArraySingleString => {
                let (object_id, elements) = self.read_array_single()?;
                let id = self
                    .graph
                    .add_record(Record::StringArray(StringArrayRecord { object_id, elements }))?;
                Ok(Frame::Node(id))
            }
        }
    }

    // --- CLASS RECORDS ---

    fn read_class(&mut self, kind: RecordKind) -> Result<RecordId> {
        let class_info = self.read_class_info()?;
        let typed = matches!(
            kind,
            RecordKind::SystemClassWithMembersAndTypes | RecordKind::ClassWithMembersAndTypes
        );
        let member_type_info = if typed {
            Some(self.read_member_type_info(class_info.member_names.len())?)
        } else {
            None
        };
        let in_library = matches!(
            kind,
            RecordKind::ClassWithMembers | RecordKind::ClassWithMembersAndTypes
        );
        let library_id = if in_library { Some(self.cursor.read_i32()?) } else { None };

        // Layout goes into the metadata table first so a nested ClassWithId
        // (even a self-referential one) can resolve it.
        self.graph.register_metadata(
            class_info.object_id,
            ClassMetadata {
                name: class_info.name.clone(),
                member_names: class_info.member_names.clone(),
                member_type_info: member_type_info.clone(),
                library_id,
            },
        );

        let record = ClassRecord::new(class_info, member_type_info, library_id, kind);
        let id = self.graph.add_record(Record::Class(record))?;
        self.read_members(id)?;
        Ok(id)
    }

    fn read_class_with_id(&mut self) -> Result<RecordId> {
        let object_id = self.cursor.read_i32()?;
        let metadata_id = self.cursor.read_i32()?;
        let meta = self
            .graph
            .metadata(metadata_id)
            .cloned()
            .ok_or(NrbfError::UnknownMetadata { metadata_id })?;

        // Fabricated ClassInfo: the new object ID, the referenced layout.
        let class_info = ClassInfo {
            object_id,
            name: meta.name,
            member_names: meta.member_names,
        };
        let mut record = ClassRecord::new(
            class_info,
            meta.member_type_info,
            meta.library_id,
            RecordKind::ClassWithId,
        );
        record.metadata_id = Some(metadata_id);

        let id = self.graph.add_record(Record::Class(record))?;
        self.read_members(id)?;
        Ok(id)
    }

    fn read_class_info(&mut self) -> Result<ClassInfo> {
        let object_id = self.cursor.read_i32()?;
        let name = self.cursor.read_string()?;
        let at = self.cursor.position();
        let member_count = self.cursor.read_i32()?;
        if member_count < 0 {
            return Err(NrbfError::InvalidCount { count: i64::from(member_count), offset: at });
        }
        let mut member_names = Vec::new();
        for _ in 0..member_count {
            member_names.push(self.cursor.read_string()?);
        }
        Ok(ClassInfo { object_id, name, member_names })
    }

    fn read_member_type_info(&mut self, member_count: usize) -> Result<MemberTypeInfo> {
        let mut binary_types = Vec::with_capacity(member_count);
        for _ in 0..member_count {
            let at = self.cursor.position();
            let byte = self.cursor.read_u8()?;
            let bt = BinaryType::from_byte(byte).ok_or_else(|| self.bad_tag(byte, at))?;
            binary_types.push(bt);
        }
        let mut infos = Vec::with_capacity(member_count);
        for i in 0..member_count {
            infos.push(self.read_additional_info(binary_types[i])?);
        }
        Ok(MemberTypeInfo { binary_types, infos })
    }

    fn read_additional_info(&mut self, binary_type: BinaryType) -> Result<AdditionalTypeInfo> {
        match binary_type {
            // Primitive arrays carry the element type the same way inline
            // primitives do.
            BinaryType::Primitive | BinaryType::PrimitiveArray => {
                let at = self.cursor.position();
                let byte = self.cursor.read_u8()?;
                let pt = PrimitiveType::from_byte(byte).ok_or_else(|| self.bad_tag(byte, at))?;
                Ok(AdditionalTypeInfo::Primitive(pt))
            }
            BinaryType::SystemClass => Ok(AdditionalTypeInfo::SystemClass(self.cursor.read_string()?)),
            BinaryType::Class => Ok(AdditionalTypeInfo::Class {
                name: self.cursor.read_string()?,
                library_id: self.cursor.read_i32()?,
            }),
            _ => Ok(AdditionalTypeInfo::None),
        }
    }

    /// Reads the member values of an already-registered class record.
    fn read_members(&mut self, id: RecordId) -> Result<()> {
        // Pull the layout out first; the cursor recursion below needs the
        // decoder mutably.
        let (count, mti) = match self.graph.record(id) {
            Record::Class(c) => (c.member_names().len(), c.member_type_info.clone()),
            _ => (0, None),
        };

        for i in 0..count {
            let value = match &mti {
                Some(info) if info.binary_types[i] == BinaryType::Primitive => {
                    match &info.infos[i] {
                        AdditionalTypeInfo::Primitive(pt) => self.read_primitive(*pt)?,
                        // A Primitive binary type always carries a primitive
                        // qualifier; anything else reads as a record.
                        _ => self.read_value()?,
                    }
                }
                _ => self.read_value()?,
            };
            if let Record::Class(c) = self.graph.record_mut(id) {
                c.push_value(value);
            }
        }
        Ok(())
    }

    // --- ARRAYS ---

    fn read_binary_array(&mut self) -> Result<RecordId> {
        let object_id = self.cursor.read_i32()?;

        let kind_at = self.cursor.position();
        let kind_byte = self.cursor.read_u8()?;
        let array_kind = BinaryArrayKind::from_byte(kind_byte)
            .ok_or_else(|| self.bad_tag(kind_byte, kind_at))?;

        let rank_at = self.cursor.position();
        let rank = self.cursor.read_i32()?;
        if rank <= 0 {
            return Err(NrbfError::InvalidCount { count: i64::from(rank), offset: rank_at });
        }

        // Grown one read at a time: a hostile rank field must not size an
        // allocation before its dimension bytes are actually present.
        let mut lengths = Vec::new();
        for _ in 0..rank {
            let at = self.cursor.position();
            let len = self.cursor.read_i32()?;
            if len < 0 {
                return Err(NrbfError::InvalidCount { count: i64::from(len), offset: at });
            }
            lengths.push(len);
        }

        let lower_bounds = if array_kind.has_lower_bounds() {
            let mut bounds = Vec::new();
            for _ in 0..rank {
                bounds.push(self.cursor.read_i32()?);
            }
            Some(bounds)
        } else {
            None
        };

        let et_at = self.cursor.position();
        let et_byte = self.cursor.read_u8()?;
        let element_type =
            BinaryType::from_byte(et_byte).ok_or_else(|| self.bad_tag(et_byte, et_at))?;
        let element_info = self.read_additional_info(element_type)?;

        let total = lengths
            .iter()
            .try_fold(1i64, |acc, &len| acc.checked_mul(i64::from(len)))
            .filter(|&t| t <= i64::from(i32::MAX))
            .ok_or(NrbfError::InvalidCount { count: i64::MAX, offset: rank_at })?;

        let elements = if element_type == BinaryType::Primitive {
            let pt = match &element_info {
                AdditionalTypeInfo::Primitive(pt) => *pt,
                _ => return Err(self.bad_tag(et_byte, et_at)),
            };
            let mut elems = ArrayElements::new();
            for _ in 0..total {
                elems.push_value(self.read_primitive(pt)?);
            }
            elems
        } else {
            self.read_elements(total as usize)?
        };

        let id = self.graph.add_record(Record::Array(ArrayRecord {
            object_id,
            array_kind,
            lengths,
            lower_bounds,
            element_type,
            element_info,
            elements,
        }))?;
        Ok(id)
    }

    fn read_array_single_primitive(&mut self) -> Result<RecordId> {
        let object_id = self.cursor.read_i32()?;
        let len_at = self.cursor.position();
        let length = self.cursor.read_i32()?;
        if length < 0 {
            return Err(NrbfError::InvalidCount { count: i64::from(length), offset: len_at });
        }
        let pt_at = self.cursor.position();
        let pt_byte = self.cursor.read_u8()?;
        let element_type =
            PrimitiveType::from_byte(pt_byte).ok_or_else(|| self.bad_tag(pt_byte, pt_at))?;
        if element_type == PrimitiveType::Null {
            return Err(self.bad_tag(pt_byte, pt_at));
        }
        let mut values = Vec::new();
        for _ in 0..length {
            values.push(self.read_primitive_value(element_type)?);
        }
        let id = self.graph.add_record(Record::PrimitiveArray(PrimitiveArrayRecord {
            object_id,
            element_type,
            values,
        }))?;
        Ok(id)
    }

    fn read_array_single(&mut self) -> Result<(i32, ArrayElements)> {
        let object_id = self.cursor.read_i32()?;
        let len_at = self.cursor.position();
        let length = self.cursor.read_i32()?;
        if length < 0 {
            return Err(NrbfError::InvalidCount { count: i64::from(length), offset: len_at });
        }
        let elements = self.read_elements(length as usize)?;
        Ok((object_id, elements))
    }

    /// Reads array element slots with null-run expansion.
    ///
    /// Each frame accounts for one slot, except a run token (tags 13/14),
    /// which expands to `count` null slots. This is the only place in the
    /// format where one record fills more than one logical slot.
    fn read_elements(&mut self, total: usize) -> Result<ArrayElements> {
        let mut elems = ArrayElements::new();
        while elems.len() < total {
            let at = self.cursor.position();
            match self.read_frame()? {
                Frame::Node(id) => elems.push_value(Value::Record(id)),
                Frame::Nulls { kind: RecordKind::ObjectNull, .. } => elems.push_value(Value::Null),
                Frame::Nulls { count, kind } => {
                    if elems.len() + count as usize > total {
                        return Err(NrbfError::InvalidCount {
                            count: i64::from(count),
                            offset: at,
                        });
                    }
                    elems.push_null_run(count, kind);
                }
                Frame::Library => {}
                Frame::End => {
                    return Err(NrbfError::TruncatedStream { offset: at, needed: 1 })
                }
            }
        }
        Ok(elems)
    }

    // --- VALUES ---

    /// Reads one member value as a record, absorbing interleaved libraries.
    fn read_value(&mut self) -> Result<Value> {
        loop {
            let at = self.cursor.position();
            match self.read_frame()? {
                Frame::Node(id) => return Ok(Value::Record(id)),
                Frame::Nulls { kind: RecordKind::ObjectNull, .. } => return Ok(Value::Null),
                Frame::Nulls { count, kind } => {
                    // A run token outside an array is kept verbatim so the
                    // encoder can replay it.
                    let record = if kind == RecordKind::ObjectNullMultiple256 {
                        Record::NullMultiple256 { count: count as u8 }
                    } else {
                        Record::NullMultiple { count }
                    };
                    return Ok(Value::Record(self.graph.add_record(record)?));
                }
                Frame::Library => continue,
                Frame::End => {
                    return Err(NrbfError::TruncatedStream { offset: at, needed: 1 })
                }
            }
        }
    }

    /// Reads an inline primitive; the `Null` kind is zero bytes of payload.
    fn read_primitive(&mut self, primitive_type: PrimitiveType) -> Result<Value> {
        if primitive_type == PrimitiveType::Null {
            return Ok(Value::Null);
        }
        Ok(Value::Primitive(self.read_primitive_value(primitive_type)?))
    }

    fn read_primitive_value(&mut self, primitive_type: PrimitiveType) -> Result<PrimitiveValue> {
        Ok(match primitive_type {
            PrimitiveType::Boolean => PrimitiveValue::Boolean(self.cursor.read_bool()?),
            PrimitiveType::Byte => PrimitiveValue::Byte(self.cursor.read_u8()?),
            PrimitiveType::SByte => PrimitiveValue::SByte(self.cursor.read_i8()?),
            PrimitiveType::Char => PrimitiveValue::Char(self.cursor.read_char()?),
            PrimitiveType::Decimal => PrimitiveValue::Decimal(self.cursor.read_decimal()?),
            PrimitiveType::Double => PrimitiveValue::Double(self.cursor.read_f64()?),
            PrimitiveType::Single => PrimitiveValue::Single(self.cursor.read_f32()?),
            PrimitiveType::Int16 => PrimitiveValue::Int16(self.cursor.read_i16()?),
            PrimitiveType::Int32 => PrimitiveValue::Int32(self.cursor.read_i32()?),
            PrimitiveType::Int64 => PrimitiveValue::Int64(self.cursor.read_i64()?),
            PrimitiveType::UInt16 => PrimitiveValue::UInt16(self.cursor.read_u16()?),
            PrimitiveType::UInt32 => PrimitiveValue::UInt32(self.cursor.read_u32()?),
            PrimitiveType::UInt64 => PrimitiveValue::UInt64(self.cursor.read_u64()?),
            PrimitiveType::TimeSpan => PrimitiveValue::TimeSpan(self.cursor.read_i64()?),
            PrimitiveType::DateTime => PrimitiveValue::DateTime(self.cursor.read_i64()?),
            PrimitiveType::String => PrimitiveValue::String(self.cursor.read_string()?),
            PrimitiveType::Null => {
                let offset = self.cursor.position();
                return Err(self.bad_tag(PrimitiveType::Null.as_u8(), offset));
            }
        })
    }

    // --- DIAGNOSTICS ---

    fn bad_tag(&self, byte: u8, offset: usize) -> NrbfError {
        let end = usize::min(offset + CONTEXT_WINDOW, self.bytes.len());
        let context = self.bytes.get(offset..end).unwrap_or_default().to_vec();
        NrbfError::BadRecordTag { byte, offset, context }
    }
}
