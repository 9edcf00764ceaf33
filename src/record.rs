//! The record model: wire enumerations, class layout metadata, primitive
//! values, and the tagged record union the decoder materializes.
//!
//! Every multi-variant wire enumeration follows the same shape as the codec's
//! other byte-mapped types: `from_byte` returns `None` for unassigned codes
//! (callers turn that into a tag error with stream context) and `as_u8`
//! returns the exact byte that round-trips onto the wire.
//!
//! ## Record Tags
//!
//! ```text
//! 0  Header                          9  MemberReference
//! 1  ClassWithId                    10  ObjectNull
//! 2  SystemClassWithMembers         11  MessageEnd
//! 3  ClassWithMembers               12  BinaryLibrary
//! 4  SystemClassWithMembersAndTypes 13  ObjectNullMultiple256
//! 5  ClassWithMembersAndTypes       14  ObjectNullMultiple
//! 6  BinaryObjectString             15  ArraySinglePrimitive
//! 7  BinaryArray                    16  ArraySingleObject
//! 8  MemberPrimitiveTyped           17  ArraySingleString
//! ```
//!
//! `Header` and `MessageEnd` frame the stream, and `BinaryLibrary` frames
//! are absorbed into the graph's library table, so none of those three
//! become graph nodes; the remaining fifteen tags map onto the [`Record`]
//! union (the five class tags collapse into [`ClassRecord`], which
//! remembers its original tag so the encoder can replay the exact wire
//! form).

use crate::error::{NrbfError, Result};
use crate::graph::RecordId;

// --- WIRE ENUMERATIONS ---

/// One of the eighteen record tags, numbered as on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecordKind {
    /// Stream header carrying the root object ID and format version.
    Header,
    /// Class instance reusing the layout of an earlier class record.
    ClassWithId,
    /// System-library class without member type info.
    SystemClassWithMembers,
    /// User-library class without member type info.
    ClassWithMembers,
    /// System-library class with per-member type info.
    SystemClassWithMembersAndTypes,
    /// User-library class with per-member type info.
    ClassWithMembersAndTypes,
    /// Length-prefixed string with an object ID.
    BinaryObjectString,
    /// General array: jagged, rectangular, or offset.
    BinaryArray,
    /// Inline primitive wrapped in its own record.
    MemberPrimitiveTyped,
    /// Reference to another record by object ID.
    MemberReference,
    /// A single null slot.
    ObjectNull,
    /// Stream trailer.
    MessageEnd,
    /// Library (assembly) name registration.
    BinaryLibrary,
    /// Run of up to 255 null slots, one count byte.
    ObjectNullMultiple256,
    /// Run of null slots with a 32-bit count.
    ObjectNullMultiple,
    /// Single-dimension array of inline primitives.
    ArraySinglePrimitive,
    /// Single-dimension array of arbitrary records.
    ArraySingleObject,
    /// Single-dimension array of strings.
    ArraySingleString,
}

impl RecordKind {
    /// Decodes a record tag byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Header,
            1 => Self::ClassWithId,
            2 => Self::SystemClassWithMembers,
            3 => Self::ClassWithMembers,
            4 => Self::SystemClassWithMembersAndTypes,
            5 => Self::ClassWithMembersAndTypes,
            6 => Self::BinaryObjectString,
            7 => Self::BinaryArray,
            8 => Self::MemberPrimitiveTyped,
            9 => Self::MemberReference,
            10 => Self::ObjectNull,
            11 => Self::MessageEnd,
            12 => Self::BinaryLibrary,
            13 => Self::ObjectNullMultiple256,
            14 => Self::ObjectNullMultiple,
            15 => Self::ArraySinglePrimitive,
            16 => Self::ArraySingleObject,
            17 => Self::ArraySingleString,
            _ => return None,
        })
    }

    /// Returns the wire tag byte.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Header => 0,
            Self::ClassWithId => 1,
            Self::SystemClassWithMembers => 2,
            Self::ClassWithMembers => 3,
            Self::SystemClassWithMembersAndTypes => 4,
            Self::ClassWithMembersAndTypes => 5,
            Self::BinaryObjectString => 6,
            Self::BinaryArray => 7,
            Self::MemberPrimitiveTyped => 8,
            Self::MemberReference => 9,
            Self::ObjectNull => 10,
            Self::MessageEnd => 11,
            Self::BinaryLibrary => 12,
            Self::ObjectNullMultiple256 => 13,
            Self::ObjectNullMultiple => 14,
            Self::ArraySinglePrimitive => 15,
            Self::ArraySingleObject => 16,
            Self::ArraySingleString => 17,
        }
    }
}

/// How a member or element slot is typed on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryType {
    /// Inline primitive; the additional info names the primitive type.
    Primitive,
    /// A `BinaryObjectString` record.
    String,
    /// Any record.
    Object,
    /// A system-library class; the additional info names it.
    SystemClass,
    /// A user-library class; the additional info names it and its library.
    Class,
    /// An object array record.
    ObjectArray,
    /// A string array record.
    StringArray,
    /// A primitive array record; the additional info names the element type.
    PrimitiveArray,
}

impl BinaryType {
    /// Decodes a binary type byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Primitive,
            1 => Self::String,
            2 => Self::Object,
            3 => Self::SystemClass,
            4 => Self::Class,
            5 => Self::ObjectArray,
            6 => Self::StringArray,
            7 => Self::PrimitiveArray,
            _ => return None,
        })
    }

    /// Returns the wire byte.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Primitive => 0,
            Self::String => 1,
            Self::Object => 2,
            Self::SystemClass => 3,
            Self::Class => 4,
            Self::ObjectArray => 5,
            Self::StringArray => 6,
            Self::PrimitiveArray => 7,
        }
    }
}

/// The seventeen primitive kinds a slot or array element can carry.
///
/// Code 4 is unassigned on the wire, which is why `from_byte` skips it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveType {
    /// One-byte boolean.
    Boolean,
    /// Unsigned 8-bit integer.
    Byte,
    /// UTF-8 encoded character.
    Char,
    /// 16 opaque bytes; no arithmetic is ever performed on them.
    Decimal,
    /// IEEE-754 double.
    Double,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Signed 64-bit integer.
    Int64,
    /// Signed 8-bit integer.
    SByte,
    /// IEEE-754 single.
    Single,
    /// Raw 64-bit tick count.
    TimeSpan,
    /// Raw 64-bit tick-and-kind field.
    DateTime,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Unsigned 64-bit integer.
    UInt64,
    /// Zero-byte null marker.
    Null,
    /// Length-prefixed UTF-8 string.
    String,
}

impl PrimitiveType {
    /// Decodes a primitive type byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::Boolean,
            2 => Self::Byte,
            3 => Self::Char,
            5 => Self::Decimal,
            6 => Self::Double,
            7 => Self::Int16,
            8 => Self::Int32,
            9 => Self::Int64,
            10 => Self::SByte,
            11 => Self::Single,
            12 => Self::TimeSpan,
            13 => Self::DateTime,
            14 => Self::UInt16,
            15 => Self::UInt32,
            16 => Self::UInt64,
            17 => Self::Null,
            18 => Self::String,
            _ => return None,
        })
    }

    /// Returns the wire byte.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Boolean => 1,
            Self::Byte => 2,
            Self::Char => 3,
            Self::Decimal => 5,
            Self::Double => 6,
            Self::Int16 => 7,
            Self::Int32 => 8,
            Self::Int64 => 9,
            Self::SByte => 10,
            Self::Single => 11,
            Self::TimeSpan => 12,
            Self::DateTime => 13,
            Self::UInt16 => 14,
            Self::UInt32 => 15,
            Self::UInt64 => 16,
            Self::Null => 17,
            Self::String => 18,
        }
    }
}

/// Shape of a `BinaryArray` record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinaryArrayKind {
    /// One dimension, zero-based.
    Single,
    /// Array of arrays.
    Jagged,
    /// Multi-dimensional, row-major.
    Rectangular,
    /// One dimension with a lower bound.
    SingleOffset,
    /// Jagged with lower bounds.
    JaggedOffset,
    /// Rectangular with lower bounds.
    RectangularOffset,
}

impl BinaryArrayKind {
    /// Decodes an array kind byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0 => Self::Single,
            1 => Self::Jagged,
            2 => Self::Rectangular,
            3 => Self::SingleOffset,
            4 => Self::JaggedOffset,
            5 => Self::RectangularOffset,
            _ => return None,
        })
    }

    /// Returns the wire byte.
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Single => 0,
            Self::Jagged => 1,
            Self::Rectangular => 2,
            Self::SingleOffset => 3,
            Self::JaggedOffset => 4,
            Self::RectangularOffset => 5,
        }
    }

    /// Whether this kind carries per-dimension lower bounds.
    pub fn has_lower_bounds(self) -> bool {
        matches!(self, Self::SingleOffset | Self::JaggedOffset | Self::RectangularOffset)
    }
}

// --- CLASS LAYOUT METADATA ---

/// Identity and member order of a class record.
///
/// Member order is significant: it is the order of the value slots on the
/// wire, so the names are kept as an ordered sequence, never a map.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassInfo {
    /// The object ID the record claims.
    pub object_id: i32,
    /// Fully qualified type name.
    pub name: String,
    /// Member names in wire order.
    pub member_names: Vec<String>,
}

/// Per-member type description carried by the typed class tags (4 and 5).
///
/// The two arrays are parallel: `infos[i]` qualifies `binary_types[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MemberTypeInfo {
    /// One binary type per member, in member order.
    pub binary_types: Vec<BinaryType>,
    /// One qualifier per member, in member order.
    pub infos: Vec<AdditionalTypeInfo>,
}

/// Qualifier for a member's binary type.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AdditionalTypeInfo {
    /// The slot holds an inline primitive (or a primitive array element type).
    Primitive(PrimitiveType),
    /// The slot holds a system-library class with this name.
    SystemClass(String),
    /// The slot holds a user-library class.
    Class {
        /// Fully qualified type name.
        name: String,
        /// Library ID the type lives in.
        library_id: i32,
    },
    /// The binary type needs no qualifier.
    None,
}

// --- VALUES ---

/// A decoded primitive, tagged with its exact wire width.
///
/// 64-bit integral kinds stay 64-bit end-to-end; nothing is narrowed
/// through a float on the way in or out.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveValue {
    /// One-byte boolean.
    Boolean(bool),
    /// Unsigned 8-bit integer.
    Byte(u8),
    /// Signed 8-bit integer.
    SByte(i8),
    /// A character (UTF-8 on the wire).
    Char(char),
    /// 16 opaque decimal bytes.
    Decimal([u8; 16]),
    /// IEEE-754 double.
    Double(f64),
    /// IEEE-754 single.
    Single(f32),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// Raw 64-bit tick count.
    TimeSpan(i64),
    /// Raw 64-bit tick-and-kind field.
    DateTime(i64),
    /// Length-prefixed UTF-8 string.
    String(String),
}

impl PrimitiveValue {
    /// The wire type this value serializes as.
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            Self::Boolean(_) => PrimitiveType::Boolean,
            Self::Byte(_) => PrimitiveType::Byte,
            Self::SByte(_) => PrimitiveType::SByte,
            Self::Char(_) => PrimitiveType::Char,
            Self::Decimal(_) => PrimitiveType::Decimal,
            Self::Double(_) => PrimitiveType::Double,
            Self::Single(_) => PrimitiveType::Single,
            Self::Int16(_) => PrimitiveType::Int16,
            Self::Int32(_) => PrimitiveType::Int32,
            Self::Int64(_) => PrimitiveType::Int64,
            Self::UInt16(_) => PrimitiveType::UInt16,
            Self::UInt32(_) => PrimitiveType::UInt32,
            Self::UInt64(_) => PrimitiveType::UInt64,
            Self::TimeSpan(_) => PrimitiveType::TimeSpan,
            Self::DateTime(_) => PrimitiveType::DateTime,
            Self::String(_) => PrimitiveType::String,
        }
    }

    /// Returns the boolean payload, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `i32` when the conversion is lossless.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Byte(v) => Some(i32::from(*v)),
            Self::SByte(v) => Some(i32::from(*v)),
            Self::Int16(v) => Some(i32::from(*v)),
            Self::UInt16(v) => Some(i32::from(*v)),
            Self::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `i64` when the conversion is lossless.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Byte(v) => Some(i64::from(*v)),
            Self::SByte(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::UInt16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::UInt32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            Self::TimeSpan(v) | Self::DateTime(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as `f64` when the conversion is lossless.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            Self::Single(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// Returns the string payload, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Renders a decimal's 16 bytes as a 32-character lowercase hex string.
    pub fn decimal_hex(&self) -> Option<String> {
        match self {
            Self::Decimal(bytes) => {
                let mut out = String::with_capacity(32);
                for b in bytes {
                    out.push_str(&format!("{b:02x}"));
                }
                Some(out)
            }
            _ => None,
        }
    }

    /// Builds a decimal value from a 32-character hex string.
    ///
    /// Returns `None` when the input is not exactly 32 hex digits.
    pub fn decimal_from_hex(hex: &str) -> Option<Self> {
        if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let mut bytes = [0u8; 16];
        for (i, slot) in bytes.iter_mut().enumerate() {
            *slot = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Self::Decimal(bytes))
    }
}

/// What a member or element slot holds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    /// An inline primitive.
    Primitive(PrimitiveValue),
    /// A null slot.
    Null,
    /// A handle to another record in the graph.
    Record(RecordId),
}

impl Value {
    /// Whether the slot is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The primitive payload, if the slot holds one inline.
    pub fn as_primitive(&self) -> Option<&PrimitiveValue> {
        match self {
            Self::Primitive(v) => Some(v),
            _ => None,
        }
    }

    /// The record handle, if the slot holds one.
    pub fn as_record(&self) -> Option<RecordId> {
        match self {
            Self::Record(id) => Some(*id),
            _ => None,
        }
    }
}

// --- ARRAY ELEMENT STORAGE ---

/// A run of consecutive null slots as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NullRun {
    /// Index of the first covered slot.
    pub start: usize,
    /// Number of covered slots (zero is legal on the wire).
    pub count: i32,
    /// `ObjectNullMultiple256` or `ObjectNullMultiple`.
    pub kind: RecordKind,
}

/// Expanded element slots of an object or string array, plus the null runs
/// observed while decoding them.
///
/// Elements are stored fully expanded so indexed navigation is O(1); the run
/// list exists only so the encoder can replay a run with its original kind
/// and count. A run whose covered slots are no longer all null (the caller
/// overwrote one) degrades to singleton nulls on the next encode.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayElements {
    values: Vec<Value>,
    null_runs: Vec<NullRun>,
}

impl ArrayElements {
    /// Creates empty element storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates storage from fully expanded values, with no recorded runs.
    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values, null_runs: Vec::new() }
    }

    /// Number of logical slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the array has no slots.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The expanded slots.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// One slot by index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Overwrites one slot. Returns `false` when the index is out of range.
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Iterates over the expanded slots.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.values.iter()
    }

    /// The null runs observed on the wire, in stream order.
    pub fn null_runs(&self) -> &[NullRun] {
        &self.null_runs
    }

    pub(crate) fn push_value(&mut self, value: Value) {
        self.values.push(value);
    }

    pub(crate) fn push_null_run(&mut self, count: i32, kind: RecordKind) {
        self.null_runs.push(NullRun { start: self.values.len(), count, kind });
        for _ in 0..count {
            self.values.push(Value::Null);
        }
    }
}

// --- RECORD VARIANTS ---

/// A class instance: any of the five class tags, unified.
///
/// `original_kind` remembers which tag the record arrived as, so the encoder
/// replays the exact wire form instead of normalizing (a `ClassWithId` is
/// never inlined into a full class record).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassRecord {
    /// Identity and member order.
    pub class_info: ClassInfo,
    /// Per-member type info; present only for the typed tags (4 and 5).
    pub member_type_info: Option<MemberTypeInfo>,
    /// Library ID; present only for the user-library tags (3 and 5).
    pub library_id: Option<i32>,
    /// The tag the record arrived as (one of the five class tags).
    pub original_kind: RecordKind,
    /// For a `ClassWithId`, the object ID whose layout this record reuses.
    pub metadata_id: Option<i32>,
    values: Vec<Value>,
}

impl ClassRecord {
    /// Creates a class record with empty value slots.
    ///
    /// The decoder registers the record into the graph before reading its
    /// member values (so self-references resolve), then pushes the values.
    pub fn new(
        class_info: ClassInfo,
        member_type_info: Option<MemberTypeInfo>,
        library_id: Option<i32>,
        original_kind: RecordKind,
    ) -> Self {
        Self {
            class_info,
            member_type_info,
            library_id,
            original_kind,
            metadata_id: None,
            values: Vec::new(),
        }
    }

    /// The fully qualified type name.
    pub fn type_name(&self) -> &str {
        &self.class_info.name
    }

    /// The object ID this record claims.
    pub fn object_id(&self) -> i32 {
        self.class_info.object_id
    }

    /// Member names in wire order.
    pub fn member_names(&self) -> &[String] {
        &self.class_info.member_names
    }

    /// Member values in wire order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Whether this record carries per-member type info (typed tags 4/5).
    pub fn is_typed(&self) -> bool {
        self.member_type_info.is_some()
    }

    /// Looks up a member value by name.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        let index = self.member_index(name)?;
        self.values.get(index)
    }

    /// Overwrites a member value by name.
    ///
    /// No type checking is performed against the member's wire type; the
    /// caller must supply a value compatible with the encoded form.
    ///
    /// ## Errors
    ///
    /// [`NrbfError::UnknownMember`] when the class has no such member.
    pub fn set_value(&mut self, name: &str, value: Value) -> Result<()> {
        let index = self.member_index(name).ok_or_else(|| NrbfError::UnknownMember {
            class: self.class_info.name.clone(),
            name: name.to_owned(),
        })?;
        if index < self.values.len() {
            self.values[index] = value;
        } else {
            // A record still being decoded has fewer values than names.
            self.values.resize(index + 1, Value::Null);
            self.values[index] = value;
        }
        Ok(())
    }

    pub(crate) fn push_value(&mut self, value: Value) {
        self.values.push(value);
    }

    fn member_index(&self, name: &str) -> Option<usize> {
        self.class_info.member_names.iter().position(|n| n == name)
    }
}

/// A length-prefixed string with an object ID (tag 6).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringRecord {
    /// The object ID this record claims.
    pub object_id: i32,
    /// The string payload.
    pub value: String,
}

/// A general array (tag 7): jagged, rectangular, or offset.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayRecord {
    /// The object ID this record claims.
    pub object_id: i32,
    /// Shape of the array.
    pub array_kind: BinaryArrayKind,
    /// Per-dimension lengths; the rank is the number of entries.
    pub lengths: Vec<i32>,
    /// Per-dimension lower bounds for the offset kinds.
    pub lower_bounds: Option<Vec<i32>>,
    /// Element slot typing.
    pub element_type: BinaryType,
    /// Qualifier for the element typing.
    pub element_info: AdditionalTypeInfo,
    /// Expanded element slots in row-major order.
    pub elements: ArrayElements,
}

impl ArrayRecord {
    /// Number of dimensions.
    pub fn rank(&self) -> i32 {
        self.lengths.len() as i32
    }

    /// Total logical element count: the product of the dimension lengths.
    pub fn total_len(&self) -> usize {
        self.lengths.iter().map(|l| *l as usize).product()
    }
}

/// A single-dimension array of inline primitives (tag 15).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimitiveArrayRecord {
    /// The object ID this record claims.
    pub object_id: i32,
    /// Element type of every slot.
    pub element_type: PrimitiveType,
    /// The elements; never null, so no run bookkeeping.
    pub values: Vec<PrimitiveValue>,
}

/// A single-dimension array of arbitrary records (tag 16).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectArrayRecord {
    /// The object ID this record claims.
    pub object_id: i32,
    /// Expanded element slots.
    pub elements: ArrayElements,
}

/// A single-dimension array of strings (tag 17).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringArrayRecord {
    /// The object ID this record claims.
    pub object_id: i32,
    /// Expanded element slots.
    pub elements: ArrayElements,
}

/// An inline primitive wrapped in its own record (tag 8).
///
/// The value is a [`Value`] rather than a bare primitive so the zero-byte
/// `Null` primitive type stays representable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimitiveTypedRecord {
    /// The declared primitive type.
    pub primitive_type: PrimitiveType,
    /// The payload.
    pub value: Value,
}

/// A decoded record: the tagged union the graph stores.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Record {
    /// Any of the five class tags (1-5).
    Class(ClassRecord),
    /// Tag 6.
    ObjectString(StringRecord),
    /// Tag 7.
    Array(ArrayRecord),
    /// Tag 8.
    PrimitiveTyped(PrimitiveTypedRecord),
    /// Tag 9.
    Reference {
        /// The object ID this reference points at.
        id_ref: i32,
    },
    /// Tag 10.
    Null,
    /// Tag 13.
    NullMultiple256 {
        /// Run length, 0-255.
        count: u8,
    },
    /// Tag 14.
    NullMultiple {
        /// Run length.
        count: i32,
    },
    /// Tag 15.
    PrimitiveArray(PrimitiveArrayRecord),
    /// Tag 16.
    ObjectArray(ObjectArrayRecord),
    /// Tag 17.
    StringArray(StringArrayRecord),
}

impl Record {
    /// The wire tag this record serializes as.
    ///
    /// Class records report their `original_kind`, so a `ClassWithId` stays
    /// a `ClassWithId` across a round-trip.
    pub fn record_kind(&self) -> RecordKind {
        match self {
            Self::Class(c) => c.original_kind,
            Self::ObjectString(_) => RecordKind::BinaryObjectString,
            Self::Array(_) => RecordKind::BinaryArray,
            Self::PrimitiveTyped(_) => RecordKind::MemberPrimitiveTyped,
            Self::Reference { .. } => RecordKind::MemberReference,
            Self::Null => RecordKind::ObjectNull,
            Self::NullMultiple256 { .. } => RecordKind::ObjectNullMultiple256,
            Self::NullMultiple { .. } => RecordKind::ObjectNullMultiple,
            Self::PrimitiveArray(_) => RecordKind::ArraySinglePrimitive,
            Self::ObjectArray(_) => RecordKind::ArraySingleObject,
            Self::StringArray(_) => RecordKind::ArraySingleString,
        }
    }

    /// The object ID, for the ID-bearing kinds.
    pub fn object_id(&self) -> Option<i32> {
        match self {
            Self::Class(c) => Some(c.class_info.object_id),
            Self::ObjectString(s) => Some(s.object_id),
            Self::Array(a) => Some(a.object_id),
            Self::PrimitiveArray(a) => Some(a.object_id),
            Self::ObjectArray(a) => Some(a.object_id),
            Self::StringArray(a) => Some(a.object_id),
            _ => None,
        }
    }

    /// Borrows the class payload, if this is a class record.
    pub fn as_class(&self) -> Option<&ClassRecord> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Mutably borrows the class payload, if this is a class record.
    pub fn as_class_mut(&mut self) -> Option<&mut ClassRecord> {
        match self {
            Self::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Borrows the string payload, if this is a string record.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::ObjectString(s) => Some(&s.value),
            _ => None,
        }
    }

    /// The referenced object ID, if this is a reference record.
    pub fn as_reference(&self) -> Option<i32> {
        match self {
            Self::Reference { id_ref } => Some(*id_ref),
            _ => None,
        }
    }
}
