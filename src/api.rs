//! The high-level facade: decode, encode, and the header sniff.

use crate::constants::{DEFAULT_RECORD_LIMIT, SNIFF_LEN};
use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::Result;
use crate::graph::{ObjectGraph, RecordId};

/// High-level entry point with builder-style options.
///
/// The associated functions ([`Nrbf::decode`], [`Nrbf::encode`]) run with
/// default options; a configured instance is built with [`Nrbf::builder`].
#[derive(Debug, Clone)]
pub struct Nrbf {
    record_limit: usize,
}

impl Default for Nrbf {
    fn default() -> Self {
        Self { record_limit: DEFAULT_RECORD_LIMIT }
    }
}

impl Nrbf {
    /// Starts building a configured codec instance.
    pub fn builder() -> Self {
        Self::default()
    }

    /// Caps the number of record frames one decode may read.
    pub fn record_limit(mut self, limit: usize) -> Self {
        self.record_limit = limit;
        self
    }

    /// Decodes a stream using this instance's options.
    pub fn read(&self, bytes: &[u8]) -> Result<ObjectGraph> {
        Decoder::with_limit(bytes, self.record_limit).run()
    }

    /// Decodes a complete stream into an object graph.
    pub fn decode(bytes: &[u8]) -> Result<ObjectGraph> {
        Self::default().read(bytes)
    }

    /// Encodes a graph back to a byte stream, rooted at the graph's root.
    pub fn encode(graph: &ObjectGraph) -> Result<Vec<u8>> {
        Encoder::encode(graph)
    }

    /// Encodes from an explicit root record, optionally overriding the
    /// header's root object ID.
    pub fn encode_from(
        graph: &ObjectGraph,
        root: RecordId,
        root_id: Option<i32>,
    ) -> Result<Vec<u8>> {
        Encoder::encode_from(graph, root, root_id)
    }
}

/// Best-effort test for whether a buffer could be a serialized stream.
///
/// Checks the header shape only (leading tag byte 0 and version words 1.0);
/// intended for file-type dispatch, not validation. A `true` here does not
/// mean the buffer will decode.
///
/// ```
/// assert!(!nrbf::looks_like_nrbf(b"\x00too short"));
/// ```
pub fn looks_like_nrbf(bytes: &[u8]) -> bool {
    bytes.len() >= SNIFF_LEN && bytes[0] == 0 && bytes[9..17] == [1, 0, 0, 0, 0, 0, 0, 0]
}
