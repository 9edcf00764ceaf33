//! The write-side engine: replays a graph onto the wire.
//!
//! Encoding preserves rather than normalizes: every record is emitted with
//! its original tag (`ClassWithId` stays `ClassWithId`), null runs are
//! replayed with their original kind and count, and libraries are written
//! immediately before the first record that references them, matching the
//! producer discipline the format grew up with.
//!
//! ## Emission Order
//!
//! For a decoded graph the encoder replays the top-level records in the
//! order the main decode loop saw them; records nested in member or element
//! slots are emitted inline by recursion, exactly where the decoder read
//! them. This reproduces the source bytes for streams with forward
//! references and dead branches, not just for tree-shaped graphs. A graph
//! built by hand (no recorded top-level order) is emitted by recursion from
//! its root.
//!
//! ## Double-Emission
//!
//! A set of already-emitted object IDs keeps shared and cyclic structures
//! from being written twice: the second occurrence of an ID emits nothing,
//! because the occurrence that reached it was a `MemberReference` record
//! (which emits its own five-byte frame) or the top-level replay. An ID
//! enters the set before the record's member values are recursed, mirroring
//! the decoder's register-before-members step, so cycles terminate.

use std::collections::HashSet;

use crate::cursor::ByteWriter;
use crate::error::{NrbfError, Result};
use crate::graph::{ObjectGraph, RecordId};
use crate::record::{
    AdditionalTypeInfo, ArrayElements, ArrayRecord, BinaryType, ClassRecord, NullRun,
    PrimitiveArrayRecord, PrimitiveType, PrimitiveTypedRecord, PrimitiveValue, Record, RecordKind,
    Value,
};

/// Record serializer over a read-only graph.
#[derive(Debug)]
pub struct Encoder<'a> {
    graph: &'a ObjectGraph,
    writer: ByteWriter,
    emitted: HashSet<i32>,
    emitted_libraries: HashSet<i32>,
}

impl<'a> Encoder<'a> {
    /// Encodes a graph from its root, using the root's object ID in the
    /// header.
    ///
    /// ## Errors
    ///
    /// [`NrbfError::RootNotFound`] when the graph has no root set.
    pub fn encode(graph: &'a ObjectGraph) -> Result<Vec<u8>> {
        let root = graph
            .root()
            .ok_or(NrbfError::RootNotFound { root_id: graph.header().root_id })?;
        Self::encode_from(graph, root, None)
    }

    /// Encodes a graph from an explicit root record.
    ///
    /// `root_id` overrides the header's root object ID; when omitted it
    /// falls back to the root record's own ID, then to 1. Passing a record
    /// other than the graph's root encodes just the subgraph reachable from
    /// it.
    pub fn encode_from(
        graph: &'a ObjectGraph,
        root: RecordId,
        root_id: Option<i32>,
    ) -> Result<Vec<u8>> {
        let mut encoder = Self {
            graph,
            writer: ByteWriter::new(),
            emitted: HashSet::new(),
            emitted_libraries: HashSet::new(),
        };

        let root_object_id = root_id
            .or_else(|| graph.record(root).object_id())
            .unwrap_or(1);
        encoder.writer.write_u8(RecordKind::Header.as_u8());
        encoder.writer.write_i32(root_object_id);
        encoder.writer.write_i32(-1);
        encoder.writer.write_i32(1);
        encoder.writer.write_i32(0);

        if graph.root() == Some(root) && !graph.top_level().is_empty() {
            for &id in graph.top_level() {
                encoder.emit_record(id)?;
            }
        } else {
            encoder.emit_record(root)?;
        }

        encoder.writer.write_u8(RecordKind::MessageEnd.as_u8());

        log::debug!(
            "encoded {} bytes ({} records, {} libraries)",
            encoder.writer.len(),
            encoder.emitted.len(),
            encoder.emitted_libraries.len()
        );
        Ok(encoder.writer.finish())
    }

    // --- RECORDS ---

    fn emit_record(&mut self, id: RecordId) -> Result<()> {
        let record = self.graph.record(id);

        if let Some(object_id) = record.object_id() {
            if !self.emitted.insert(object_id) {
                // Already on the wire; whatever got us here referenced it by
                // ID, so there is nothing to write.
                return Ok(());
            }
        }

        match record {
            Record::Class(c) => self.emit_class(c),
            Record::ObjectString(s) => {
                self.writer.write_u8(RecordKind::BinaryObjectString.as_u8());
                self.writer.write_i32(s.object_id);
                self.writer.write_string(&s.value);
                Ok(())
            }
            Record::Array(a) => self.emit_binary_array(a),
            Record::PrimitiveTyped(p) => self.emit_primitive_typed(p),
            Record::Reference { id_ref } => {
                self.writer.write_u8(RecordKind::MemberReference.as_u8());
                self.writer.write_i32(*id_ref);
                Ok(())
            }
            Record::Null => {
                self.writer.write_u8(RecordKind::ObjectNull.as_u8());
                Ok(())
            }
            Record::NullMultiple256 { count } => {
                self.writer.write_u8(RecordKind::ObjectNullMultiple256.as_u8());
                self.writer.write_u8(*count);
                Ok(())
            }
            Record::NullMultiple { count } => {
                self.writer.write_u8(RecordKind::ObjectNullMultiple.as_u8());
                self.writer.write_i32(*count);
                Ok(())
            }
            Record::PrimitiveArray(a) => self.emit_primitive_array(a),
            Record::ObjectArray(a) => {
                self.writer.write_u8(RecordKind::ArraySingleObject.as_u8());
                self.writer.write_i32(a.object_id);
                self.writer.write_i32(a.elements.len() as i32);
                self.emit_elements(&a.elements, "ArraySingleObject")
            }
            Record::StringArray(a) => {
                self.writer.write_u8(RecordKind::ArraySingleString.as_u8());
                self.writer.write_i32(a.object_id);
                self.writer.write_i32(a.elements.len() as i32);
                self.emit_elements(&a.elements, "ArraySingleString")
            }
        }
    }

    fn emit_class(&mut self, class: &ClassRecord) -> Result<()> {
        if let Some(library_id) = class.library_id {
            self.ensure_library(library_id);
        }

        let kind = class.original_kind;
        self.writer.write_u8(kind.as_u8());

        if kind == RecordKind::ClassWithId {
            self.writer.write_i32(class.class_info.object_id);
            self.writer
                .write_i32(class.metadata_id.unwrap_or(class.class_info.object_id));
        } else {
            // ClassInfo
            self.writer.write_i32(class.class_info.object_id);
            self.writer.write_string(&class.class_info.name);
            self.writer.write_i32(class.class_info.member_names.len() as i32);
            for name in &class.class_info.member_names {
                self.writer.write_string(name);
            }
            // MemberTypeInfo for the typed tags
            if matches!(
                kind,
                RecordKind::SystemClassWithMembersAndTypes | RecordKind::ClassWithMembersAndTypes
            ) {
                if let Some(mti) = &class.member_type_info {
                    for bt in &mti.binary_types {
                        self.writer.write_u8(bt.as_u8());
                    }
                    for info in &mti.infos {
                        self.write_additional_info(info);
                    }
                }
            }
            // Library ID for the user-library tags
            if matches!(
                kind,
                RecordKind::ClassWithMembers | RecordKind::ClassWithMembersAndTypes
            ) {
                self.writer.write_i32(class.library_id.unwrap_or(0));
            }
        }

        self.emit_members(class)
    }

    fn emit_members(&mut self, class: &ClassRecord) -> Result<()> {
        for (i, value) in class.values().iter().enumerate() {
            let declared = class.member_type_info.as_ref().and_then(|mti| {
                match (mti.binary_types.get(i), mti.infos.get(i)) {
                    (Some(BinaryType::Primitive), Some(AdditionalTypeInfo::Primitive(pt))) => {
                        Some(*pt)
                    }
                    _ => None,
                }
            });
            let member = class
                .member_names()
                .get(i)
                .map(String::as_str)
                .unwrap_or("")
                .to_owned();

            match declared {
                // Typed primitive slot: the value is written inline, no tag.
                Some(PrimitiveType::Null) if value.is_null() => {}
                Some(_) => match value {
                    Value::Primitive(p) => self.write_primitive(p),
                    _ => {
                        return Err(NrbfError::EncodeTypeAmbiguous {
                            class: class.type_name().to_owned(),
                            member,
                        })
                    }
                },
                None => self.emit_value(class.type_name(), &member, value)?,
            }
        }
        Ok(())
    }

    /// Writes a slot that holds a record, null, or (erroneously) a bare
    /// primitive outside any typed context.
    fn emit_value(&mut self, class: &str, member: &str, value: &Value) -> Result<()> {
        match value {
            Value::Record(id) => self.emit_record(*id),
            Value::Null => {
                self.writer.write_u8(RecordKind::ObjectNull.as_u8());
                Ok(())
            }
            Value::Primitive(_) => Err(NrbfError::EncodeTypeAmbiguous {
                class: class.to_owned(),
                member: member.to_owned(),
            }),
        }
    }

    // --- ARRAYS ---

    fn emit_binary_array(&mut self, array: &ArrayRecord) -> Result<()> {
        if let AdditionalTypeInfo::Class { library_id, .. } = &array.element_info {
            self.ensure_library(*library_id);
        }

        self.writer.write_u8(RecordKind::BinaryArray.as_u8());
        self.writer.write_i32(array.object_id);
        self.writer.write_u8(array.array_kind.as_u8());
        self.writer.write_i32(array.rank());
        for len in &array.lengths {
            self.writer.write_i32(*len);
        }
        if let Some(bounds) = &array.lower_bounds {
            for bound in bounds {
                self.writer.write_i32(*bound);
            }
        }
        self.writer.write_u8(array.element_type.as_u8());
        self.write_additional_info(&array.element_info);

        if array.element_type == BinaryType::Primitive {
            for (i, value) in array.elements.iter().enumerate() {
                match value {
                    Value::Primitive(p) => self.write_primitive(p),
                    _ => {
                        return Err(NrbfError::EncodeTypeAmbiguous {
                            class: "BinaryArray".to_owned(),
                            member: i.to_string(),
                        })
                    }
                }
            }
            Ok(())
        } else {
            self.emit_elements(&array.elements, "BinaryArray")
        }
    }

    fn emit_primitive_array(&mut self, array: &PrimitiveArrayRecord) -> Result<()> {
        self.writer.write_u8(RecordKind::ArraySinglePrimitive.as_u8());
        self.writer.write_i32(array.object_id);
        self.writer.write_i32(array.values.len() as i32);
        self.writer.write_u8(array.element_type.as_u8());
        for value in &array.values {
            self.write_primitive(value);
        }
        Ok(())
    }

    /// Writes element slots, replaying null runs where they still hold.
    ///
    /// A recorded run is re-emitted with its original kind and count when
    /// every covered slot is still null; a run broken by mutation falls back
    /// to singleton `ObjectNull` frames.
    fn emit_elements(&mut self, elements: &ArrayElements, label: &str) -> Result<()> {
        let values = elements.values();
        let mut runs = elements.null_runs().iter().peekable();
        let mut i = 0usize;

        while i < values.len() {
            while runs.peek().is_some_and(|r| r.start < i) {
                runs.next();
            }
            if let Some(run) = runs.peek().copied() {
                if run.start == i {
                    runs.next();
                    let end = i + run.count as usize;
                    if end <= values.len() && values[i..end].iter().all(|v| v.is_null()) {
                        self.write_null_run(run);
                        i = end;
                    }
                    // A broken run falls through and re-checks this index.
                    continue;
                }
            }
            match &values[i] {
                Value::Null => self.writer.write_u8(RecordKind::ObjectNull.as_u8()),
                Value::Record(id) => self.emit_record(*id)?,
                Value::Primitive(_) => {
                    return Err(NrbfError::EncodeTypeAmbiguous {
                        class: label.to_owned(),
                        member: i.to_string(),
                    })
                }
            }
            i += 1;
        }

        // Zero-length runs recorded at the end of the element stream.
        for run in runs {
            if run.start == values.len() && run.count == 0 {
                self.write_null_run(run);
            }
        }
        Ok(())
    }

    fn write_null_run(&mut self, run: &NullRun) {
        if run.kind == RecordKind::ObjectNullMultiple256 {
            self.writer.write_u8(RecordKind::ObjectNullMultiple256.as_u8());
            self.writer.write_u8(run.count as u8);
        } else {
            self.writer.write_u8(RecordKind::ObjectNullMultiple.as_u8());
            self.writer.write_i32(run.count);
        }
    }

    // --- LEAVES ---

    fn emit_primitive_typed(&mut self, record: &PrimitiveTypedRecord) -> Result<()> {
        self.writer.write_u8(RecordKind::MemberPrimitiveTyped.as_u8());
        self.writer.write_u8(record.primitive_type.as_u8());
        match &record.value {
            Value::Primitive(p) => {
                self.write_primitive(p);
                Ok(())
            }
            Value::Null => Ok(()),
            Value::Record(_) => Err(NrbfError::EncodeTypeAmbiguous {
                class: "MemberPrimitiveTyped".to_owned(),
                member: String::new(),
            }),
        }
    }

    fn write_primitive(&mut self, value: &PrimitiveValue) {
        match value {
            PrimitiveValue::Boolean(v) => self.writer.write_bool(*v),
            PrimitiveValue::Byte(v) => self.writer.write_u8(*v),
            PrimitiveValue::SByte(v) => self.writer.write_i8(*v),
            PrimitiveValue::Char(v) => self.writer.write_char(*v),
            PrimitiveValue::Decimal(v) => self.writer.write_decimal(v),
            PrimitiveValue::Double(v) => self.writer.write_f64(*v),
            PrimitiveValue::Single(v) => self.writer.write_f32(*v),
            PrimitiveValue::Int16(v) => self.writer.write_i16(*v),
            PrimitiveValue::Int32(v) => self.writer.write_i32(*v),
            PrimitiveValue::Int64(v) => self.writer.write_i64(*v),
            PrimitiveValue::UInt16(v) => self.writer.write_u16(*v),
            PrimitiveValue::UInt32(v) => self.writer.write_u32(*v),
            PrimitiveValue::UInt64(v) => self.writer.write_u64(*v),
            PrimitiveValue::TimeSpan(v) => self.writer.write_i64(*v),
            PrimitiveValue::DateTime(v) => self.writer.write_i64(*v),
            PrimitiveValue::String(v) => self.writer.write_string(v),
        }
    }

    fn write_additional_info(&mut self, info: &AdditionalTypeInfo) {
        match info {
            AdditionalTypeInfo::Primitive(pt) => self.writer.write_u8(pt.as_u8()),
            AdditionalTypeInfo::SystemClass(name) => self.writer.write_string(name),
            AdditionalTypeInfo::Class { name, library_id } => {
                self.writer.write_string(name);
                self.writer.write_i32(*library_id);
            }
            AdditionalTypeInfo::None => {}
        }
    }

    /// Emits the library frame for `library_id` if it has not been written
    /// yet. Unknown IDs are skipped; the referencing record still carries
    /// the ID, which is all a reader resolves.
    fn ensure_library(&mut self, library_id: i32) {
        if self.emitted_libraries.insert(library_id) {
            if let Some(name) = self.graph.libraries().get(&library_id) {
                self.writer.write_u8(RecordKind::BinaryLibrary.as_u8());
                self.writer.write_i32(library_id);
                self.writer.write_string(name);
            }
        }
    }
}
