//! # nrbf
//!
//! A round-trip codec for the .NET Remoting Binary Format: the
//! self-describing, record-oriented serialization format legacy .NET binary
//! formatters emit, still found in Unity save files and other persisted
//! object graphs.
//!
//! ## Overview
//!
//! The codec decodes a byte buffer into an in-memory graph of tagged
//! records, exposes that graph for navigation and mutation by dotted path,
//! and re-encodes it into bytes the original producer accepts. Round-trip
//! fidelity drives the whole design: record tags, metadata identity, null
//! runs, and emission order are preserved, never normalized.
//!
//! ### The Graph Model
//!
//! Decoding produces an [`ObjectGraph`]: an arena of [`Record`]s addressed
//! by [`RecordId`] handles, plus the per-stream tables (record table,
//! metadata table, library table) that tie the records together. Ownership
//! is a DAG — arena plus tables — while object-level cycles are expressed
//! as integer object IDs resolved through the record table, so there are no
//! owning cycles to leak.
//!
//! ### Pipeline
//!
//! ```text
//! bytes ──► Decoder ──► ObjectGraph ──► get_path / set_path ──► Encoder ──► bytes
//! ```
//!
//! ## Usage
//!
//! ```
//! let bytes = [
//!     0x00, 1, 0, 0, 0, 0xFF, 0xFF, 0xFF, 0xFF, 1, 0, 0, 0, 0, 0, 0, 0,
//!     0x06, 1, 0, 0, 0, 5, b'h', b'e', b'l', b'l', b'o',
//!     0x0B,
//! ];
//! let graph = nrbf::Nrbf::decode(&bytes)?;
//! let root = graph.root().ok_or(nrbf::NrbfError::RootNotFound { root_id: 1 })?;
//! assert_eq!(graph.record(root).as_string(), Some("hello"));
//!
//! // Re-encoding a decoded graph reproduces the source bytes.
//! assert_eq!(nrbf::Nrbf::encode(&graph)?, bytes);
//! # Ok::<(), nrbf::NrbfError>(())
//! ```
//!
//! ## Safety and Error Handling
//!
//! * **No Panics:** no `unwrap()` or `panic!()` in the library (enforced by
//!   clippy lints); malformed input surfaces as a typed [`NrbfError`].
//! * **No Partial Results:** a failed decode exposes nothing.
//! * **Single-Threaded Core:** decode and encode are pure functions over
//!   byte buffers, with no I/O and no suspension points. A decoded graph
//!   may be shared freely for read-only traversal; callers that need
//!   parallelism run independent decoders on independent buffers.

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![warn(missing_docs)]

// --- PUBLIC API MODULES ---
pub mod api;
pub mod cursor;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod graph;
pub mod guid;
pub mod record;

// Private modules
mod path;

// --- RE-EXPORTS ---

pub use api::{looks_like_nrbf, Nrbf};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use error::{NrbfError, Result};
pub use graph::{ClassMetadata, ObjectGraph, RecordId, StreamHeader};
pub use guid::{
    build_guid_record, find_guid_in_buffer, guid_to_bytes, parse_guid, replace_guid_at_offset,
};
pub use record::{
    AdditionalTypeInfo, ArrayElements, ArrayRecord, BinaryArrayKind, BinaryType, ClassInfo,
    ClassRecord, MemberTypeInfo, NullRun, ObjectArrayRecord, PrimitiveArrayRecord, PrimitiveType,
    PrimitiveTypedRecord, PrimitiveValue, Record, RecordKind, StringArrayRecord, StringRecord,
    Value,
};

/// Constants used throughout the library.
pub mod constants {
    /// Default cap on record frames per decoded stream.
    pub const DEFAULT_RECORD_LIMIT: usize = 100_000;

    /// Minimum buffer length for the header sniff.
    pub const SNIFF_LEN: usize = 17;
}
