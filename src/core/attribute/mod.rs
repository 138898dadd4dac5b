use serde::{Deserialize, Serialize};

use super::shared::Scalar;

/// Scalar element types that can appear in a packed attribute section.
/// The ids follow the decoder's `DataType` numbering; 64-bit integers and
/// booleans have ids but no packed representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentDataType {
	I8,
	U8,
	I16,
	U16,
	I32,
	U32,
	F32,
	F64,
}

impl ComponentDataType {
	/// returns the size of the data type in bytes e.g. 4 for F32
	#[inline]
	pub fn size(self) -> usize {
		match self {
			ComponentDataType::I8 | ComponentDataType::U8 => 1,
			ComponentDataType::I16 | ComponentDataType::U16 => 2,
			ComponentDataType::I32 | ComponentDataType::U32 | ComponentDataType::F32 => 4,
			ComponentDataType::F64 => 8,
		}
	}

	/// returns the decoder's id for the data type.
	#[inline]
	pub fn get_id(self) -> u32 {
		match self {
			ComponentDataType::I8 => 1,
			ComponentDataType::U8 => 2,
			ComponentDataType::I16 => 3,
			ComponentDataType::U16 => 4,
			ComponentDataType::I32 => 5,
			ComponentDataType::U32 => 6,
			ComponentDataType::F32 => 9,
			ComponentDataType::F64 => 10,
		}
	}

	/// returns the data type for the given decoder id, or `None` for ids
	/// without a packed representation (invalid, 64-bit integers, bool, ...).
	#[inline]
	pub fn from_id(id: u32) -> Option<Self> {
		match id {
			1 => Some(ComponentDataType::I8),
			2 => Some(ComponentDataType::U8),
			3 => Some(ComponentDataType::I16),
			4 => Some(ComponentDataType::U16),
			5 => Some(ComponentDataType::I32),
			6 => Some(ComponentDataType::U32),
			9 => Some(ComponentDataType::F32),
			10 => Some(ComponentDataType::F64),
			_ => None,
		}
	}
}

/// An attribute as extracted from the decoder: its raw element type id,
/// its dimensionality and `num_points * num_components` values in
/// point-major order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecodedAttribute {
	data_type: u32,
	num_components: usize,
	values: Vec<Scalar>,
}

impl DecodedAttribute {
	pub fn new(data_type: u32, num_components: usize, values: Vec<Scalar>) -> Self {
		Self { data_type, num_components, values }
	}

	/// Builds an attribute of a supported type.
	pub fn typed(data_type: ComponentDataType, num_components: usize, values: Vec<Scalar>) -> Self {
		Self::new(data_type.get_id(), num_components, values)
	}

	/// raw element type id as reported by the decoder.
	#[inline]
	pub fn get_data_type_id(&self) -> u32 {
		self.data_type
	}

	#[inline]
	pub fn get_component_type(&self) -> Option<ComponentDataType> {
		ComponentDataType::from_id(self.data_type)
	}

	#[inline]
	pub fn get_num_components(&self) -> usize {
		self.num_components
	}

	#[inline]
	pub fn values(&self) -> &[Scalar] {
		&self.values
	}
}
