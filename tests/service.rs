use std::cell::Cell;
use std::rc::Rc;

use draco_worker::prelude::*;

const STRIP: u8 = 0;
const POINTS: u8 = 1;
const CORRUPT: u8 = 2;

/// Decodes a two byte "format": a kind tag followed by a face count. Strips are
/// meshes whose face `i` is `[i, i+1, i+2]`.
///
/// Holds an `Rc`, so it can only live on the thread that built it.
struct StripEngine {
    live: Rc<Cell<isize>>,
}

impl StripEngine {
    fn new() -> Self {
        Self { live: Rc::new(Cell::new(0)) }
    }

    fn acquire(&self) {
        self.live.set(self.live.get() + 1);
    }

    fn release(&self) {
        self.live.set(self.live.get() - 1);
    }
}

fn strip(num_faces: usize) -> DecodedMesh {
    let num_points = num_faces + 2;
    let faces = (0..num_faces as u32).map(|i| [i, i + 1, i + 2]).collect();
    let positions = (0..num_points * 3).map(|i| Scalar::F32(i as f32 * 0.5)).collect();
    let ids = (0..num_points).map(|i| Scalar::U16(i as u16)).collect();
    DecodedMesh::new(
        faces,
        num_points,
        vec![
            DecodedAttribute::typed(ComponentDataType::F32, 3, positions),
            DecodedAttribute::typed(ComponentDataType::U16, 1, ids),
        ],
    )
}

impl DecoderEngine for StripEngine {
    type Decoder = ();
    type Buffer = Vec<u8>;
    type Mesh = Option<DecodedMesh>;
    type Attribute = usize;
    type Array = Vec<Scalar>;

    fn create_decoder(&self) -> Self::Decoder {
        self.acquire();
    }

    fn create_buffer(&self, data: Vec<u8>) -> Self::Buffer {
        self.acquire();
        data
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
        match buffer.first() {
            Some(&STRIP) | Some(&CORRUPT) => GeometryType::TriangularMesh,
            Some(&POINTS) => GeometryType::PointCloud,
            _ => GeometryType::Invalid,
        }
    }

    fn decode_buffer_to_mesh(&self, _decoder: &mut Self::Decoder, buffer: &Self::Buffer, mesh: &mut Self::Mesh) -> Status {
        match buffer.as_slice() {
            [STRIP, n] => {
                *mesh = Some(strip(*n as usize));
                Status::ok()
            }
            _ => Status::error("Failed to parse Draco header."),
        }
    }

    fn num_faces(&self, mesh: &Self::Mesh) -> usize {
        mesh.as_ref().map_or(0, |m| m.num_faces())
    }

    fn num_points(&self, mesh: &Self::Mesh) -> usize {
        mesh.as_ref().map_or(0, |m| m.num_points())
    }

    fn num_attributes(&self, mesh: &Self::Mesh) -> usize {
        mesh.as_ref().map_or(0, |m| m.num_attributes())
    }

    fn face_from_mesh(&self, _decoder: &Self::Decoder, mesh: &Self::Mesh, face: usize, out: &mut Self::Array) -> bool {
        let Some(f) = mesh.as_ref().and_then(|m| m.get_faces().get(face)) else {
            return false;
        };
        out.clear();
        out.extend(f.iter().map(|&i| Scalar::U32(i)));
        true
    }

    fn attribute(&self, _decoder: &Self::Decoder, _mesh: &Self::Mesh, index: usize) -> Self::Attribute {
        self.acquire();
        index
    }

    fn attribute_data_type(&self, attribute: &Self::Attribute) -> u32 {
        [ComponentDataType::F32, ComponentDataType::U16][*attribute].get_id()
    }

    fn attribute_num_components(&self, attribute: &Self::Attribute) -> usize {
        [3, 1][*attribute]
    }

    fn attribute_values_for_all_points(
        &self,
        _decoder: &Self::Decoder,
        mesh: &Self::Mesh,
        attribute: &Self::Attribute,
        _data_type: ComponentDataType,
        out: &mut Self::Array,
    ) -> bool {
        let Some(att) = mesh.as_ref().and_then(|m| m.get_attributes().get(*attribute)) else {
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

fn default_config() -> Config {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    <Config as ConfigType>::default()
}

#[test]
fn adapter_releases_every_handle() {
    let engine = StripEngine::new();
    for input in [vec![STRIP, 3], vec![POINTS, 3], vec![CORRUPT], vec![]] {
        let _ = decode_and_pack(&engine, input, None, ScalarPolicy::Strict);
        assert_eq!(engine.live.get(), 0);
    }
    let packed = decode_and_pack(&engine, vec![STRIP, 3], Some(10), ScalarPolicy::Strict);
    assert!(matches!(packed, Err(decode::Err::Pack(pack::Err::BufferTooSmall { .. }))));
    assert_eq!(engine.live.get(), 0);
}

#[test]
fn blocking_callers_get_their_buffers() {
    let service = DecodeService::spawn(default_config(), StripEngine::new).unwrap();

    let buffer = service.decode_mesh(vec![STRIP, 1], 64).blocking_wait().unwrap();
    // 3 u16 indices, 3 points of f32x3, 3 u16 ids
    assert_eq!(buffer.len(), 6 + 36 + 6);
    assert_eq!(&buffer[..6], &[0, 0, 1, 0, 2, 0]);
    assert_eq!(&buffer[42..], &[0, 0, 1, 0, 2, 0]);

    let err = service.decode_mesh(vec![CORRUPT], 64).blocking_wait().unwrap_err();
    assert_eq!(err.to_string(), "Draco decoding failed: Failed to parse Draco header.");

    service.shutdown();
}

#[tokio::test(flavor = "multi_thread")]
async fn config_aware_decoding_round_trips() {
    let service = DecodeService::spawn(default_config(), StripEngine::new).unwrap();

    let DecodedWithConfig { decoded, config } = service.decode_mesh_with_config(vec![STRIP, 20]).await.unwrap();
    let layout = config.unwrap();
    assert_eq!(layout.num_faces, 20);
    assert_eq!(layout.num_points, 22);
    assert_eq!(layout.attributes.len(), 2);
    assert_eq!(decoded.len(), layout.total_len());

    let mesh = unpack(&decoded, &layout).unwrap();
    assert_eq!(mesh, strip(20));
}

#[tokio::test(flavor = "multi_thread")]
async fn pool_serves_interleaved_requests() {
    let cfg = Config::from_json_str(r#"{ "worker_count": 3 }"#).unwrap();
    let service = DecodeService::spawn(cfg, StripEngine::new).unwrap();

    let inputs = (0..24u8).map(|i| match i % 4 {
        3 => vec![POINTS, i],
        _ => vec![STRIP, i],
    });
    let handles = inputs.map(|input| service.decode_mesh(input, 4096)).collect::<Vec<_>>();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await;
        if i % 4 == 3 {
            assert_eq!(
                result,
                Err(service::Err::Decode(decode::Err::UnsupportedGeometry(GeometryType::PointCloud)))
            );
        } else {
            let expected = pack(&strip(i), 4096, ScalarPolicy::Skip).unwrap();
            assert_eq!(result.unwrap(), expected.bytes);
        }
    }
    assert_eq!(service.pending_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn dropped_service_rejects_nothing_it_accepted() {
    let service = DecodeService::spawn(default_config(), StripEngine::new).unwrap();
    let handle = service.decode_mesh(vec![STRIP, 2], 4096);
    drop(service);
    assert_eq!(handle.await.unwrap().len(), 2 * 3 * 2 + 12 * 4 + 4 * 2);
}

#[test]
fn engine_factory_panic_leaves_requests_unavailable() {
    let service = DecodeService::spawn(default_config(), || -> StripEngine { panic!("no engine") }).unwrap();
    let handle = service.decode_mesh(vec![STRIP, 1], 64);
    assert_eq!(handle.blocking_wait(), Err(service::Err::WorkerUnavailable));
}
