use std::collections::HashMap;

use super::id::RecordId;
use crate::error::{NrbfError, Result};
use crate::record::{MemberTypeInfo, Record, Value};

/// The stream header frame: root pointer plus format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamHeader {
    /// Object ID of the root record.
    pub root_id: i32,
    /// Header ID; producers emit -1.
    pub header_id: i32,
    /// Major format version; always 1.
    pub major_version: i32,
    /// Minor format version; always 0.
    pub minor_version: i32,
}

impl Default for StreamHeader {
    fn default() -> Self {
        Self { root_id: 1, header_id: -1, major_version: 1, minor_version: 0 }
    }
}

/// Class layout registered by a full class record (tags 2-5), reusable by
/// later `ClassWithId` records.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassMetadata {
    /// Fully qualified type name.
    pub name: String,
    /// Member names in wire order.
    pub member_names: Vec<String>,
    /// Per-member type info, when the registering record carried one.
    pub member_type_info: Option<MemberTypeInfo>,
    /// Library ID, when the registering record carried one.
    pub library_id: Option<i32>,
}

/// The container for a decoded object graph.
///
/// Acts as an arena allocator for records: every record lives in the arena,
/// indexed by [`RecordId`], and cross-record links are stored as object IDs
/// resolved through the record table. Ownership is therefore a DAG (arena +
/// tables) even when the object graph itself contains cycles.
///
/// # Lifecycle
///
/// 1. **Built:** the decoder inserts records as it walks the stream, or a
///    caller inserts them by hand.
/// 2. **Navigated:** path lookups and mutation go through the arena; shared
///    nodes are reached through the record table, so every path to an object
///    ID yields the same node identity.
/// 3. **Encoded:** the encoder walks the arena read-only and replays the
///    records onto the wire.
#[derive(Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectGraph {
    records: Vec<Record>,
    record_table: HashMap<i32, RecordId>,
    metadata: HashMap<i32, ClassMetadata>,
    libraries: HashMap<i32, String>,
    header: StreamHeader,
    root: Option<RecordId>,
    top_level: Vec<RecordId>,
}

impl ObjectGraph {
    /// Creates an empty graph with a default header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record into the arena and returns its handle.
    ///
    /// ID-bearing records are also registered into the record table.
    ///
    /// ## Errors
    ///
    /// [`NrbfError::DuplicateObjectId`] when the record claims an object ID
    /// that is already taken.
    pub fn add_record(&mut self, record: Record) -> Result<RecordId> {
        let id = RecordId::new(self.records.len() as u32);
        if let Some(object_id) = record.object_id() {
            if self.record_table.contains_key(&object_id) {
                return Err(NrbfError::DuplicateObjectId { id: object_id });
            }
            self.record_table.insert(object_id, id);
        }
        self.records.push(record);
        Ok(id)
    }

    /// Returns a reference to a record.
    pub fn record(&self, id: RecordId) -> &Record {
        &self.records[id.index()]
    }

    /// Returns a mutable reference to a record.
    pub fn record_mut(&mut self, id: RecordId) -> &mut Record {
        &mut self.records[id.index()]
    }

    /// All records in arena order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records in the arena.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Looks up the record registered under an object ID.
    pub fn object(&self, object_id: i32) -> Option<RecordId> {
        self.record_table.get(&object_id).copied()
    }

    /// Resolves a reference's object ID to its target record.
    ///
    /// ## Errors
    ///
    /// [`NrbfError::UnresolvedReference`] when no record claimed that ID.
    pub fn resolve(&self, id_ref: i32) -> Result<RecordId> {
        self.object(id_ref).ok_or(NrbfError::UnresolvedReference { id_ref })
    }

    /// The root record, when one has been set.
    pub fn root(&self) -> Option<RecordId> {
        self.root
    }

    /// Marks a record as the graph's root.
    pub fn set_root(&mut self, id: RecordId) {
        self.root = Some(id);
    }

    /// The stream header.
    pub fn header(&self) -> &StreamHeader {
        &self.header
    }

    /// Mutable access to the stream header.
    pub fn header_mut(&mut self) -> &mut StreamHeader {
        &mut self.header
    }

    /// The library table: library ID to library name.
    pub fn libraries(&self) -> &HashMap<i32, String> {
        &self.libraries
    }

    /// Registers a library name under its ID.
    ///
    /// ## Errors
    ///
    /// [`NrbfError::DuplicateObjectId`] when the ID is already registered.
    pub fn register_library(&mut self, library_id: i32, name: String) -> Result<()> {
        if self.libraries.contains_key(&library_id) {
            return Err(NrbfError::DuplicateObjectId { id: library_id });
        }
        self.libraries.insert(library_id, name);
        Ok(())
    }

    /// Looks up class metadata registered under an object ID.
    pub fn metadata(&self, object_id: i32) -> Option<&ClassMetadata> {
        self.metadata.get(&object_id)
    }

    pub(crate) fn register_metadata(&mut self, object_id: i32, meta: ClassMetadata) {
        self.metadata.insert(object_id, meta);
    }

    /// Records decoded by the main stream loop, in stream order.
    ///
    /// The first entry is usually the root; the rest are forward-reference
    /// targets and dead branches. The encoder replays any of them that the
    /// root recursion did not reach.
    pub fn top_level(&self) -> &[RecordId] {
        &self.top_level
    }

    pub(crate) fn push_top_level(&mut self, id: RecordId) {
        self.top_level.push(id);
    }

    /// Handles of every class record whose type name matches `name`.
    ///
    /// Linear scan; this is how tooling locates e.g. every `System.Guid`
    /// instance in a save file.
    pub fn find_class(&self, name: &str) -> Vec<RecordId> {
        self.records
            .iter()
            .enumerate()
            .filter_map(|(i, record)| match record {
                Record::Class(c) if c.type_name() == name => {
                    Some(RecordId::new(i as u32))
                }
                _ => None,
            })
            .collect()
    }

    /// Follows a chain of reference records to a concrete value.
    ///
    /// Non-reference inputs come back unchanged. A reference chain longer
    /// than the arena itself means the chain is circular.
    ///
    /// ## Errors
    ///
    /// [`NrbfError::UnresolvedReference`] on a dangling or circular chain.
    pub fn resolve_value(&self, value: Value) -> Result<Value> {
        let mut current = value;
        let mut hops = 0usize;
        while let Value::Record(id) = current {
            match self.record(id) {
                Record::Reference { id_ref } => {
                    hops += 1;
                    if hops > self.records.len() {
                        return Err(NrbfError::UnresolvedReference { id_ref: *id_ref });
                    }
                    current = Value::Record(self.resolve(*id_ref)?);
                }
                _ => break,
            }
        }
        Ok(current)
    }
}
