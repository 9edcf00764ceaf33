//! Centralized error handling for the codec.
//!
//! All failure conditions are represented as `Result` values; the library
//! enforces this through `#![deny(clippy::panic)]` and
//! `#![deny(clippy::unwrap_used)]`. Errors are cheap to `Clone` so they can
//! be stored for later analysis or compared in tests.
//!
//! ## Error Categories
//!
//! Errors are categorized by the operation that produced them:
//!
//! - **Stream errors** ([`NrbfError::TruncatedStream`], [`NrbfError::BadRecordTag`],
//!   [`NrbfError::MalformedVarint`], [`NrbfError::NegativeStringLength`],
//!   [`NrbfError::InvalidUtf8`], [`NrbfError::InvalidCount`]): the input bytes
//!   do not form a well-formed stream.
//! - **Graph errors** ([`NrbfError::UnknownMetadata`], [`NrbfError::DuplicateObjectId`],
//!   [`NrbfError::RootNotFound`], [`NrbfError::UnresolvedReference`]): the records
//!   are individually well-formed but their cross-references are not.
//! - **Consumer errors** ([`NrbfError::UnknownMember`], [`NrbfError::EncodeTypeAmbiguous`],
//!   [`NrbfError::InvalidGuid`]): a caller asked for something the graph cannot
//!   satisfy.
//!
//! Every error is fatal to the operation that produced it; no partial result
//! is ever returned alongside one.

use std::fmt;

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, NrbfError>;

/// The master error enum covering all failure domains in the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NrbfError {
    /// A read crossed the end of the input buffer.
    TruncatedStream {
        /// Byte offset at which the read started.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
    },

    /// A record lead byte was not a valid tag for its position.
    ///
    /// Carries the offending byte, its stream offset, and up to 32 bytes of
    /// surrounding stream for diagnosis. Also raised for invalid enumeration
    /// bytes inside a record (primitive type, binary type, array kind), which
    /// are tags in the same sense.
    BadRecordTag {
        /// The byte that was read.
        byte: u8,
        /// Stream offset of the byte.
        offset: usize,
        /// Up to 32 bytes of stream starting at `offset`.
        context: Vec<u8>,
    },

    /// A variable-length integer ran past its 5-byte limit or overflowed 32 bits.
    MalformedVarint {
        /// Stream offset at which the varint started.
        offset: usize,
    },

    /// A length-prefixed string declared a negative byte length.
    NegativeStringLength {
        /// The declared length.
        length: i32,
        /// Stream offset of the length prefix.
        offset: usize,
    },

    /// String bytes were not valid UTF-8.
    InvalidUtf8 {
        /// Stream offset of the first string byte.
        offset: usize,
    },

    /// A count field (member count, array length, rank, null-run length) was
    /// negative or expanded past the structure that contains it.
    InvalidCount {
        /// The declared count.
        count: i64,
        /// Stream offset of the count field.
        offset: usize,
    },

    /// A `ClassWithId` record referenced a metadata entry that does not exist.
    UnknownMetadata {
        /// The metadata object ID that failed to resolve.
        metadata_id: i32,
    },

    /// Two records (or two libraries) claimed the same ID in one stream.
    DuplicateObjectId {
        /// The duplicated ID.
        id: i32,
    },

    /// The header's root object ID was not found in the record table.
    RootNotFound {
        /// The root ID the header declared.
        root_id: i32,
    },

    /// `set_value` named a member the class does not have.
    UnknownMember {
        /// Type name of the class record.
        class: String,
        /// The member name that was requested.
        name: String,
    },

    /// A reference record pointed at an object ID with no decoded record.
    ///
    /// Surfaced lazily, when a consumer dereferences the broken reference;
    /// streams that carry dangling references in dead branches decode fine.
    UnresolvedReference {
        /// The object ID the reference carried.
        id_ref: i32,
    },

    /// A bare primitive sat in an untyped slot, so the encoder could not
    /// commit to a wire form for it.
    EncodeTypeAmbiguous {
        /// Type name of the record holding the slot.
        class: String,
        /// Member name (or element index) of the slot.
        member: String,
    },

    /// A GUID string or `System.Guid` record did not have the expected shape.
    InvalidGuid {
        /// The offending GUID string or class type name.
        value: String,
    },

    /// The stream produced more record frames than the configured cap.
    RecordLimitExceeded {
        /// The configured limit.
        limit: usize,
    },
}

impl fmt::Display for NrbfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TruncatedStream { offset, needed } => {
                write!(f, "truncated stream: {needed} byte(s) needed at offset {offset}")
            }
            Self::BadRecordTag { byte, offset, .. } => {
                write!(f, "bad record tag 0x{byte:02x} at offset {offset}")
            }
            Self::MalformedVarint { offset } => {
                write!(f, "malformed varint at offset {offset}")
            }
            Self::NegativeStringLength { length, offset } => {
                write!(f, "negative string length {length} at offset {offset}")
            }
            Self::InvalidUtf8 { offset } => {
                write!(f, "invalid UTF-8 in string at offset {offset}")
            }
            Self::InvalidCount { count, offset } => {
                write!(f, "invalid count {count} at offset {offset}")
            }
            Self::UnknownMetadata { metadata_id } => {
                write!(f, "no class metadata registered under object ID {metadata_id}")
            }
            Self::DuplicateObjectId { id } => {
                write!(f, "object ID {id} claimed by more than one record")
            }
            Self::RootNotFound { root_id } => {
                write!(f, "root object ID {root_id} not present in the record table")
            }
            Self::UnknownMember { class, name } => {
                write!(f, "class '{class}' has no member named '{name}'")
            }
            Self::UnresolvedReference { id_ref } => {
                write!(f, "reference to object ID {id_ref} cannot be resolved")
            }
            Self::EncodeTypeAmbiguous { class, member } => {
                write!(
                    f,
                    "cannot infer a wire type for the bare primitive in '{class}.{member}'"
                )
            }
            Self::InvalidGuid { value } => {
                write!(f, "'{value}' is not a well-formed GUID")
            }
            Self::RecordLimitExceeded { limit } => {
                write!(f, "stream exceeded the record cap of {limit}")
            }
        }
    }
}

impl std::error::Error for NrbfError {}
