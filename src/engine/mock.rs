//! A scripted engine for tests. The "compressed" input is a JSON [`Script`] describing
//! what the engine should report; every live handle is counted so tests can check
//! that nothing leaks.

use std::sync::atomic::{AtomicIsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::attribute::ComponentDataType;
use crate::core::mesh::{DecodedMesh, GeometryType};
use crate::core::shared::Scalar;

use super::{DecoderEngine, Status};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct Script {
    pub geometry: GeometryType,
    pub error: Option<String>,
    pub mesh: DecodedMesh,
    pub fail_face: Option<usize>,
    pub panic: bool,
    pub delay_ms: u64,
}

impl Script {
    pub fn mesh(mesh: DecodedMesh) -> Self {
        Self {
            geometry: GeometryType::TriangularMesh,
            error: None,
            mesh,
            fail_face: None,
            panic: false,
            delay_ms: 0,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap()
    }
}

#[derive(Clone, Default)]
pub(crate) struct MockEngine {
    live: Arc<AtomicIsize>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// number of handles created and not yet released.
    pub fn live_handles(&self) -> isize {
        self.live.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.live.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(crate) struct MockAttribute {
    index: usize,
    data_type: u32,
    num_components: usize,
}

impl DecoderEngine for MockEngine {
    type Decoder = ();
    type Buffer = Option<Script>;
    type Mesh = Option<Script>;
    type Attribute = MockAttribute;
    type Array = Vec<Scalar>;

    fn create_decoder(&self) -> Self::Decoder {
        self.acquire();
    }

    fn create_buffer(&self, data: Vec<u8>) -> Self::Buffer {
        self.acquire();
        serde_json::from_slice(&data).ok()
    }

    fn create_mesh(&self) -> Self::Mesh {
        self.acquire();
        None
    }

    fn create_array(&self, _data_type: ComponentDataType) -> Self::Array {
        self.acquire();
        Vec::new()
    }

    fn release_decoder(&self, _decoder: Self::Decoder) {
        self.release();
    }

    fn release_buffer(&self, _buffer: Self::Buffer) {
        self.release();
    }

    fn release_mesh(&self, _mesh: Self::Mesh) {
        self.release();
    }

    fn release_attribute(&self, _attribute: Self::Attribute) {
        self.release();
    }

    fn release_array(&self, _array: Self::Array) {
        self.release();
    }

    fn encoded_geometry_type(&self, _decoder: &Self::Decoder, buffer: &Self::Buffer) -> GeometryType {
        buffer.as_ref().map_or(GeometryType::Invalid, |script| script.geometry)
    }

    fn decode_buffer_to_mesh(&self, _decoder: &mut Self::Decoder, buffer: &Self::Buffer, mesh: &mut Self::Mesh) -> Status {
        let Some(script) = buffer else {
            return Status::error("Not a Draco file");
        };
        if script.delay_ms > 0 {
            std::thread::sleep(Duration::from_millis(script.delay_ms));
        }
        if script.panic {
            panic!("engine crashed");
        }
        if let Some(message) = &script.error {
            return Status::error(message.clone());
        }
        *mesh = Some(script.clone());
        Status::ok()
    }

    fn num_faces(&self, mesh: &Self::Mesh) -> usize {
        mesh.as_ref().map_or(0, |s| s.mesh.num_faces())
    }

    fn num_points(&self, mesh: &Self::Mesh) -> usize {
        mesh.as_ref().map_or(0, |s| s.mesh.num_points())
    }

    fn num_attributes(&self, mesh: &Self::Mesh) -> usize {
        mesh.as_ref().map_or(0, |s| s.mesh.num_attributes())
    }

    fn face_from_mesh(&self, _decoder: &Self::Decoder, mesh: &Self::Mesh, face: usize, out: &mut Self::Array) -> bool {
        let Some(script) = mesh else { return false };
        if script.fail_face == Some(face) {
            return false;
        }
        let Some(f) = script.mesh.get_faces().get(face) else { return false };
        out.clear();
        out.extend(f.iter().map(|&i| Scalar::I32(i as i32)));
        true
    }

    fn attribute(&self, _decoder: &Self::Decoder, mesh: &Self::Mesh, index: usize) -> Self::Attribute {
        self.acquire();
        let att = mesh.as_ref().and_then(|s| s.mesh.get_attributes().get(index));
        MockAttribute {
            index,
            data_type: att.map_or(0, |a| a.get_data_type_id()),
            num_components: att.map_or(0, |a| a.get_num_components()),
        }
    }

    fn attribute_data_type(&self, attribute: &Self::Attribute) -> u32 {
        attribute.data_type
    }

    fn attribute_num_components(&self, attribute: &Self::Attribute) -> usize {
        attribute.num_components
    }

    fn attribute_values_for_all_points(
        &self,
        _decoder: &Self::Decoder,
        mesh: &Self::Mesh,
        attribute: &Self::Attribute,
        _data_type: ComponentDataType,
        out: &mut Self::Array,
    ) -> bool {
        let Some(att) = mesh.as_ref().and_then(|s| s.mesh.get_attributes().get(attribute.index)) else {
            return false;
        };
        out.clear();
        out.extend_from_slice(att.values());
        true
    }

    fn array_len(&self, array: &Self::Array) -> usize {
        array.len()
    }

    fn array_value(&self, array: &Self::Array, index: usize) -> Scalar {
        array[index]
    }
}
