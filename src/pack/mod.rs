//! Flat binary layout for decoded meshes.
//!
//! A packed mesh is a single little-endian buffer without tags or padding:
//!
//! ```text
//! [ face 0: i0 i1 i2 ][ face 1: ... ] ... [ attribute 0 values ][ attribute 1 values ] ...
//! ```
//!
//! Indices are `u16` when `num_faces * 3 <= 65535` and `u32` otherwise. Nothing in the
//! buffer records the choice; a reader derives it from the face count. Attribute values
//! are written point by point, component by component, at the attribute's native width.

mod unpack;

pub use unpack::unpack;

use serde::{Deserialize, Serialize};

use crate::core::attribute::ComponentDataType;
use crate::core::bit_coder::{ByteWriter, ReaderErr};
use crate::core::mesh::DecodedMesh;
use crate::core::shared::{DataValue, Scalar};

/// Largest index count that still uses 16-bit indices.
pub const MAX_U16_INDICES: usize = 0xFFFF;

#[remain::sorted]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Err {
	#[error("Output buffer too small: {required} bytes required, {capacity} available")]
	BufferTooSmall { required: usize, capacity: usize },
	#[error("Inconsistent layout: {0}")]
	InvalidLayout(String),
	#[error("Packed buffer is {actual} bytes but the layout describes {expected}")]
	LengthMismatch { expected: usize, actual: usize },
	#[error("Packed buffer ended early: {0}")]
	NotEnoughData(#[from] ReaderErr),
	#[error("Unknown scalar type id {0}")]
	UnknownScalarType(u32),
	#[error("Attribute {attribute} holds {actual} values, expected {expected}")]
	ValueCountMismatch { attribute: usize, expected: usize, actual: usize },
}

/// Width of the values in the index section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexWidth {
	U16,
	U32,
}

impl IndexWidth {
	#[inline]
	pub fn for_index_count(num_indices: usize) -> Self {
		if num_indices <= MAX_U16_INDICES {
			IndexWidth::U16
		} else {
			IndexWidth::U32
		}
	}

	#[inline]
	pub fn for_face_count(num_faces: usize) -> Self {
		Self::for_index_count(num_faces.saturating_mul(3))
	}

	/// size of one index in bytes.
	#[inline]
	pub fn size(self) -> usize {
		match self {
			IndexWidth::U16 => 2,
			IndexWidth::U32 => 4,
		}
	}
}

/// What to do with an attribute whose element type has no packed representation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarPolicy {
	/// The attribute contributes zero bytes and is left out of the layout.
	#[default]
	Skip,
	/// The attribute fails the whole pack with [`Err::UnknownScalarType`].
	Strict,
}

/// Placement of one attribute inside a packed buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeLayout {
	/// position of the attribute in the decoder's attribute enumeration.
	pub index: usize,
	pub data_type: ComponentDataType,
	pub num_components: usize,
	/// byte offset of the first value.
	pub offset: usize,
	/// byte length of the section.
	pub len: usize,
}

/// Describes everything a consumer needs to read a packed buffer back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshLayout {
	pub num_faces: usize,
	pub num_points: usize,
	pub index_width: IndexWidth,
	pub attributes: Vec<AttributeLayout>,
}

impl MeshLayout {
	/// Computes the layout from mesh introspection alone. `attributes` yields the raw
	/// element type id and the component count of each attribute in enumeration order.
	/// Sizes that do not fit in `usize` are rejected with [`Err::InvalidLayout`].
	pub fn plan<I>(num_faces: usize, num_points: usize, attributes: I, policy: ScalarPolicy) -> Result<Self, Err>
		where I: IntoIterator<Item = (u32, usize)>
	{
		let overflow = || Err::InvalidLayout("size overflows usize".to_owned());
		let index_width = IndexWidth::for_face_count(num_faces);
		let mut offset = num_faces
			.checked_mul(3)
			.and_then(|n| n.checked_mul(index_width.size()))
			.ok_or_else(overflow)?;

		let mut out = Vec::new();
		for (index, (data_type_id, num_components)) in attributes.into_iter().enumerate() {
			let Some(data_type) = ComponentDataType::from_id(data_type_id) else {
				match policy {
					ScalarPolicy::Strict => return Err(Err::UnknownScalarType(data_type_id)),
					ScalarPolicy::Skip => {
						tracing::warn!(
							attribute = index,
							data_type = data_type_id,
							"skipping attribute with unknown scalar type"
						);
						continue;
					}
				}
			};
			let len = num_points
				.checked_mul(num_components)
				.and_then(|n| n.checked_mul(data_type.size()))
				.ok_or_else(overflow)?;
			out.push(AttributeLayout { index, data_type, num_components, offset, len });
			offset = offset.checked_add(len).ok_or_else(overflow)?;
		}

		Ok(Self { num_faces, num_points, index_width, attributes: out })
	}

	/// byte length of the index section.
	#[inline]
	pub fn index_len(&self) -> usize {
		self.num_faces
			.saturating_mul(3)
			.saturating_mul(self.index_width.size())
	}

	/// byte length of the whole packed buffer.
	pub fn total_len(&self) -> usize {
		self.attributes
			.last()
			.map_or(self.index_len(), |att| att.offset.saturating_add(att.len))
	}

	/// returns the layout of the attribute at the given enumeration index, if it was packed.
	pub fn attribute(&self, index: usize) -> Option<&AttributeLayout> {
		self.attributes.iter().find(|att| att.index == index)
	}
}

/// A packed buffer together with its layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Packed {
	pub bytes: Vec<u8>,
	pub layout: MeshLayout,
}

/// Streaming writer for the packed layout. Every write is checked against the
/// capacity the packer was created with, so the output never grows past it.
#[derive(Debug)]
pub struct Packer {
	buffer: Vec<u8>,
	index_width: IndexWidth,
	capacity: usize,
}

impl Packer {
	/// Creates a packer for `layout`, failing up front when the layout does not fit in `capacity`.
	pub fn new(layout: &MeshLayout, capacity: usize) -> Result<Self, Err> {
		let required = layout.total_len();
		if required > capacity {
			return Err(Err::BufferTooSmall { required, capacity });
		}
		Ok(Self {
			buffer: Vec::with_capacity(required),
			index_width: layout.index_width,
			capacity,
		})
	}

	fn reserve(&mut self, size: usize) -> Result<(), Err> {
		let required = self.buffer.len().saturating_add(size);
		if required > self.capacity {
			return Err(Err::BufferTooSmall { required, capacity: self.capacity });
		}
		Ok(())
	}

	pub fn write_face(&mut self, face: [u32; 3]) -> Result<(), Err> {
		self.reserve(3 * self.index_width.size())?;
		for idx in face {
			match self.index_width {
				IndexWidth::U16 => self.buffer.write_u16(idx as u16),
				IndexWidth::U32 => self.buffer.write_u32(idx),
			}
		}
		Ok(())
	}

	pub fn write_scalar(&mut self, value: Scalar, data_type: ComponentDataType) -> Result<(), Err> {
		self.reserve(data_type.size())?;
		value.write_as(data_type, &mut self.buffer);
		Ok(())
	}

	/// returns exactly the bytes written.
	pub fn finish(self) -> Vec<u8> {
		self.buffer
	}
}

/// Packs an owned mesh into at most `max_output_bytes` bytes.
pub fn pack(mesh: &DecodedMesh, max_output_bytes: usize, policy: ScalarPolicy) -> Result<Packed, Err> {
	let layout = MeshLayout::plan(
		mesh.num_faces(),
		mesh.num_points(),
		mesh.get_attributes()
			.iter()
			.map(|att| (att.get_data_type_id(), att.get_num_components())),
		policy,
	)?;

	let mut packer = Packer::new(&layout, max_output_bytes)?;
	for face in mesh.get_faces() {
		packer.write_face(*face)?;
	}

	for att_layout in &layout.attributes {
		let att = &mesh.get_attributes()[att_layout.index];
		let expected = att_layout.len / att_layout.data_type.size();
		if att.values().len() != expected {
			return Err(Err::ValueCountMismatch {
				attribute: att_layout.index,
				expected,
				actual: att.values().len(),
			});
		}
		for value in att.values() {
			packer.write_scalar(*value, att_layout.data_type)?;
		}
	}

	Ok(Packed { bytes: packer.finish(), layout })
}

/// Converts a decoder index value into a point index.
#[inline]
pub(crate) fn index_from_scalar(value: Scalar) -> u32 {
	u32::from_scalar(value)
}
