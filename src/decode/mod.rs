//! Drives a [`DecoderEngine`] over one compressed input.
//!
//! All engine handles live in [`Scoped`] guards owned by a [`Session`], so they are
//! released exactly once whether decoding succeeds, returns early, or unwinds.

use std::time::Instant;

use crate::core::attribute::{ComponentDataType, DecodedAttribute};
use crate::core::mesh::{DecodedMesh, GeometryType};
use crate::engine::{DecoderEngine, Scoped};
use crate::pack::{self, index_from_scalar, MeshLayout, Packed, Packer, ScalarPolicy};

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
    #[error("Draco decoding failed: {0}")]
    DecodeFailed(String),
    #[error("Decoder engine panicked: {0}")]
    EnginePanicked(String),
    #[error("Packing error: {0}")]
    Pack(#[from] pack::Err),
    #[error("Unsupported geometry type: {0:?}")]
    UnsupportedGeometry(GeometryType),
}

/// A successfully decoded mesh together with the engine handles backing it.
struct Session<'e, E: DecoderEngine> {
    engine: &'e E,
    mesh: Scoped<'e, E, E::Mesh>,
    decoder: Scoped<'e, E, E::Decoder>,
    _buffer: Scoped<'e, E, E::Buffer>,
}

impl<'e, E: DecoderEngine> Session<'e, E> {
    fn open(engine: &'e E, input: Vec<u8>) -> Result<Self, Err> {
        let mut decoder = Scoped::new(engine, engine.create_decoder(), E::release_decoder);
        let buffer = Scoped::new(engine, engine.create_buffer(input), E::release_buffer);

        let geometry = engine.encoded_geometry_type(&decoder, &buffer);
        if geometry != GeometryType::TriangularMesh {
            return Err(Err::UnsupportedGeometry(geometry));
        }

        let mut mesh = Scoped::new(engine, engine.create_mesh(), E::release_mesh);
        let status = engine.decode_buffer_to_mesh(&mut decoder, &buffer, &mut mesh);
        if !status.is_ok() {
            return Err(Err::DecodeFailed(status.error_msg().to_owned()));
        }

        Ok(Self { engine, mesh, decoder, _buffer: buffer })
    }

    fn num_faces(&self) -> usize {
        self.engine.num_faces(&self.mesh)
    }

    fn num_points(&self) -> usize {
        self.engine.num_points(&self.mesh)
    }

    fn attributes(&self) -> Vec<Scoped<'e, E, E::Attribute>> {
        (0..self.engine.num_attributes(&self.mesh))
            .map(|i| {
                let att = self.engine.attribute(&self.decoder, &self.mesh, i);
                Scoped::new(self.engine, att, E::release_attribute)
            })
            .collect()
    }

    /// reads one face through the reusable `scratch` array.
    fn face(&self, face: usize, scratch: &mut E::Array) -> Result<[u32; 3], Err> {
        if !self.engine.face_from_mesh(&self.decoder, &self.mesh, face, scratch)
            || self.engine.array_len(scratch) < 3
        {
            return Err(Err::DecodeFailed(format!("failed to read face {face}")));
        }
        Ok([
            index_from_scalar(self.engine.array_value(scratch, 0)),
            index_from_scalar(self.engine.array_value(scratch, 1)),
            index_from_scalar(self.engine.array_value(scratch, 2)),
        ])
    }

    /// bulk-extracts the values of one attribute into a fresh typed scratch array.
    fn values(
        &self,
        index: usize,
        attribute: &E::Attribute,
        data_type: ComponentDataType,
        num_values: usize,
    ) -> Result<Scoped<'e, E, E::Array>, Err> {
        let mut array = Scoped::new(self.engine, self.engine.create_array(data_type), E::release_array);
        if !self.engine.attribute_values_for_all_points(&self.decoder, &self.mesh, attribute, data_type, &mut array) {
            return Err(Err::DecodeFailed(format!("failed to read values of attribute {index}")));
        }
        let len = self.engine.array_len(&array);
        if len < num_values {
            return Err(Err::DecodeFailed(format!(
                "attribute {index} returned {len} values, expected {num_values}"
            )));
        }
        Ok(array)
    }
}

/// Decodes `input` and packs it straight from the engine's scratch arrays.
/// With `bound == None` the output is sized exactly from the layout.
pub fn decode_and_pack<E>(engine: &E, input: Vec<u8>, bound: Option<usize>, policy: ScalarPolicy) -> Result<Packed, Err>
    where E: DecoderEngine
{
    let start = Instant::now();
    let session = Session::open(engine, input)?;
    let attributes = session.attributes();

    let num_faces = session.num_faces();
    let num_points = session.num_points();
    let layout = MeshLayout::plan(
        num_faces,
        num_points,
        attributes
            .iter()
            .map(|att| (engine.attribute_data_type(att), engine.attribute_num_components(att))),
        policy,
    )?;

    let capacity = bound.unwrap_or_else(|| layout.total_len());
    let mut packer = Packer::new(&layout, capacity)?;

    let mut scratch = Scoped::new(engine, engine.create_array(ComponentDataType::I32), E::release_array);
    for i in 0..num_faces {
        packer.write_face(session.face(i, &mut scratch)?)?;
    }
    drop(scratch);

    for att in &layout.attributes {
        let num_values = att.len / att.data_type.size();
        let values = session.values(att.index, &attributes[att.index], att.data_type, num_values)?;
        for j in 0..num_values {
            packer.write_scalar(engine.array_value(&values, j), att.data_type)?;
        }
    }

    let bytes = packer.finish();
    tracing::debug!(
        faces = num_faces,
        points = num_points,
        bytes = bytes.len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "decoded and packed mesh"
    );
    Ok(Packed { bytes, layout })
}

/// Decodes `input` into an owned mesh. Attributes with an unknown element type keep
/// their place in the attribute list with no values under [`ScalarPolicy::Skip`].
pub fn decode_to_mesh<E>(engine: &E, input: Vec<u8>, policy: ScalarPolicy) -> Result<DecodedMesh, Err>
    where E: DecoderEngine
{
    let session = Session::open(engine, input)?;
    let num_faces = session.num_faces();
    let num_points = session.num_points();

    let mut scratch = Scoped::new(engine, engine.create_array(ComponentDataType::I32), E::release_array);
    let faces = (0..num_faces)
        .map(|i| session.face(i, &mut scratch))
        .collect::<Result<Vec<_>, _>>()?;
    drop(scratch);

    let mut attributes = Vec::new();
    for (index, att) in session.attributes().iter().enumerate() {
        let data_type_id = engine.attribute_data_type(att);
        let num_components = engine.attribute_num_components(att);
        let Some(data_type) = ComponentDataType::from_id(data_type_id) else {
            if policy == ScalarPolicy::Strict {
                return Err(pack::Err::UnknownScalarType(data_type_id).into());
            }
            attributes.push(DecodedAttribute::new(data_type_id, num_components, Vec::new()));
            continue;
        };
        let num_values = num_points
            .checked_mul(num_components)
            .ok_or_else(|| Err::DecodeFailed(format!("attribute {index} has too many values")))?;
        let array = session.values(index, att, data_type, num_values)?;
        let values = (0..num_values).map(|j| engine.array_value(&array, j)).collect();
        attributes.push(DecodedAttribute::new(data_type_id, num_components, values));
    }

    Ok(DecodedMesh::new(faces, num_points, attributes))
}
