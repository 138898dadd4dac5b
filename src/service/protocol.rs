//! Messages exchanged between callers and decode workers.
//!
//! Byte buffers are moved, never copied: the compressed input moves from the caller into
//! the request, and the packed output moves from the worker back through the response.

use crate::decode;
use crate::pack::MeshLayout;

/// Correlation id of a request. Ids start at 0 and are never reused by a service.
pub type RequestId = u64;

/// caller → worker
#[derive(Debug)]
pub struct DecodeRequest {
    pub id: RequestId,
    pub input: Vec<u8>,
    /// upper bound on the packed output; `None` sizes the output exactly.
    pub buffer_length: Option<usize>,
    pub with_config: bool,
}

/// worker → caller
#[derive(Debug)]
pub struct DecodeResponse {
    pub id: RequestId,
    pub result: Result<Decoded, decode::Err>,
}

/// Payload of a successful response. `config` is present iff the request asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub buffer: Vec<u8>,
    pub config: Option<MeshLayout>,
}

/// What a configuration-aware call resolves to.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWithConfig {
    pub decoded: Vec<u8>,
    pub config: Option<MeshLayout>,
}
