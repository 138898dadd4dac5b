use crate::core::attribute::DecodedAttribute;
use crate::core::bit_coder::ByteReader;
use crate::core::mesh::DecodedMesh;
use crate::core::shared::Scalar;

use super::{Err, IndexWidth, MeshLayout};

/// Recomputes the buffer length `layout` describes from its counts and element types,
/// checking every stored offset and length against it.
fn checked_len(layout: &MeshLayout) -> Result<usize, Err> {
    let overflow = || Err::InvalidLayout("size overflows usize".to_owned());

    if layout.index_width != IndexWidth::for_face_count(layout.num_faces) {
        return Err(Err::InvalidLayout(format!(
            "{:?} indices do not match {} faces",
            layout.index_width, layout.num_faces
        )));
    }
    let mut offset = layout
        .num_faces
        .checked_mul(3)
        .and_then(|n| n.checked_mul(layout.index_width.size()))
        .ok_or_else(overflow)?;

    for att in &layout.attributes {
        let len = layout
            .num_points
            .checked_mul(att.num_components)
            .and_then(|n| n.checked_mul(att.data_type.size()))
            .ok_or_else(overflow)?;
        if att.offset != offset || att.len != len {
            return Err(Err::InvalidLayout(format!(
                "attribute {} spans {}+{}, expected {}+{}",
                att.index, att.offset, att.len, offset, len
            )));
        }
        offset = offset.checked_add(len).ok_or_else(overflow)?;
    }
    Ok(offset)
}

/// Reads a packed buffer back into a mesh using its layout.
/// The layout must be self-consistent and describe exactly `bytes.len()` bytes.
pub fn unpack(bytes: &[u8], layout: &MeshLayout) -> Result<DecodedMesh, Err> {
    let expected = checked_len(layout)?;
    if bytes.len() != expected {
        return Err(Err::LengthMismatch { expected, actual: bytes.len() });
    }

    // every count below is bounded by `bytes.len()` from here on
    let mut reader = bytes.iter();

    let mut faces = Vec::with_capacity(layout.num_faces);
    for _ in 0..layout.num_faces {
        let mut face = [0_u32; 3];
        for idx in face.iter_mut() {
            *idx = match layout.index_width {
                IndexWidth::U16 => reader.read_u16()? as u32,
                IndexWidth::U32 => reader.read_u32()?,
            };
        }
        faces.push(face);
    }

    let mut attributes = Vec::with_capacity(layout.attributes.len());
    for att in &layout.attributes {
        let num_values = att.len / att.data_type.size();
        let values = (0..num_values)
            .map(|_| Scalar::read_as(att.data_type, &mut reader))
            .collect::<Result<Vec<_>, _>>()?;
        attributes.push(DecodedAttribute::typed(att.data_type, att.num_components, values));
    }

    Ok(DecodedMesh::new(faces, layout.num_points, attributes))
}
