//! Contract of the external Draco decoding engine.
//!
//! The engine hands out handles with manual lifetimes (decoder, input buffer, mesh,
//! attribute, typed value array). Every `create_*`/`attribute` call must be paired with
//! exactly one `release_*` call; the decode adapter holds each handle in a [`Scoped`]
//! guard so that this holds on every exit path.

#[cfg(test)]
pub(crate) mod mock;

use std::ops::{Deref, DerefMut};

use crate::core::attribute::ComponentDataType;
use crate::core::mesh::GeometryType;
use crate::core::shared::Scalar;

/// Outcome of a decode call as reported by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    ok: bool,
    message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self { ok: true, message: String::new() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { ok: false, message: message.into() }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// the engine's diagnostic message; empty when ok.
    #[inline]
    pub fn error_msg(&self) -> &str {
        &self.message
    }
}

/// A Draco-style decoding engine.
///
/// Implementations wrap a foreign decoder (a wasm module, a C++ library, ...) or a
/// native one. An engine is created and used on a single worker thread, so it does
/// not need to be `Send` or `Sync`.
pub trait DecoderEngine {
    type Decoder;
    type Buffer;
    type Mesh;
    type Attribute;
    type Array;

    fn create_decoder(&self) -> Self::Decoder;
    /// wraps the compressed bytes; ownership of the bytes passes to the engine.
    fn create_buffer(&self, data: Vec<u8>) -> Self::Buffer;
    fn create_mesh(&self) -> Self::Mesh;
    /// creates an empty scratch array for values of `data_type`.
    fn create_array(&self, data_type: ComponentDataType) -> Self::Array;

    fn release_decoder(&self, decoder: Self::Decoder);
    fn release_buffer(&self, buffer: Self::Buffer);
    fn release_mesh(&self, mesh: Self::Mesh);
    fn release_attribute(&self, attribute: Self::Attribute);
    fn release_array(&self, array: Self::Array);

    fn encoded_geometry_type(&self, decoder: &Self::Decoder, buffer: &Self::Buffer) -> GeometryType;
    fn decode_buffer_to_mesh(&self, decoder: &mut Self::Decoder, buffer: &Self::Buffer, mesh: &mut Self::Mesh) -> Status;

    fn num_faces(&self, mesh: &Self::Mesh) -> usize;
    fn num_points(&self, mesh: &Self::Mesh) -> usize;
    fn num_attributes(&self, mesh: &Self::Mesh) -> usize;

    /// fills `out` with the three point indices of `face`. Returns `false` on failure.
    fn face_from_mesh(&self, decoder: &Self::Decoder, mesh: &Self::Mesh, face: usize, out: &mut Self::Array) -> bool;

    fn attribute(&self, decoder: &Self::Decoder, mesh: &Self::Mesh, index: usize) -> Self::Attribute;
    /// raw element type id of the attribute (Draco `DataType` numbering).
    fn attribute_data_type(&self, attribute: &Self::Attribute) -> u32;
    fn attribute_num_components(&self, attribute: &Self::Attribute) -> usize;

    /// fills `out` with the values of `attribute` for all points, as `data_type`.
    /// Returns `false` on failure.
    fn attribute_values_for_all_points(
        &self,
        decoder: &Self::Decoder,
        mesh: &Self::Mesh,
        attribute: &Self::Attribute,
        data_type: ComponentDataType,
        out: &mut Self::Array,
    ) -> bool;

    fn array_len(&self, array: &Self::Array) -> usize;
    fn array_value(&self, array: &Self::Array, index: usize) -> Scalar;
}

/// Owns one engine handle and releases it when dropped.
pub struct Scoped<'e, E: DecoderEngine, T> {
    engine: &'e E,
    // `None` only while dropping
    handle: Option<T>,
    release: fn(&E, T),
}

impl<'e, E: DecoderEngine, T> Scoped<'e, E, T> {
    pub fn new(engine: &'e E, handle: T, release: fn(&E, T)) -> Self {
        Self { engine, handle: Some(handle), release }
    }
}

impl<E: DecoderEngine, T> Deref for Scoped<'_, E, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &self.handle {
            Some(handle) => handle,
            None => unreachable!("engine handle used after release"),
        }
    }
}

impl<E: DecoderEngine, T> DerefMut for Scoped<'_, E, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.handle {
            Some(handle) => handle,
            None => unreachable!("engine handle used after release"),
        }
    }
}

impl<E: DecoderEngine, T> Drop for Scoped<'_, E, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            (self.release)(self.engine, handle);
        }
    }
}
