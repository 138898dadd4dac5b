// lib.rs

/// Contains the shared definitions: decoded mesh, attributes, scalars and byte coders.
pub mod core;

/// Contains the contract of the external Draco decoding engine.
pub mod engine;

/// Defines the flat little-endian buffer layout and the packer.
pub mod pack;

/// Defines the decode adapter driving an engine over one input.
pub mod decode;

/// Defines the worker-backed decoding service and its request multiplexer.
pub mod service;


/// Contains the most commonly used traits, types, and objects.
pub mod prelude {
    pub use crate::core::attribute::{ComponentDataType, DecodedAttribute};
    pub use crate::core::mesh::{DecodedMesh, GeometryType};
    pub use crate::core::shared::{ConfigType, DataValue, Scalar};
    pub use crate::core::bit_coder::{ByteReader, ByteWriter};
    pub use crate::engine::{DecoderEngine, Status};
    pub use crate::pack::{self, pack, unpack, MeshLayout, Packed, ScalarPolicy};
    pub use crate::decode::{self, decode_and_pack, decode_to_mesh};
    pub use crate::service::{self, Config, DecodeHandle, DecodeService, DecodedWithConfig, RequestId};
}
