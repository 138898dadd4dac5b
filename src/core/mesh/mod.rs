use serde::{Deserialize, Serialize};

use super::attribute::DecodedAttribute;

/// Geometry kinds a compressed stream can announce in its header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryType {
    Invalid,
    PointCloud,
    TriangularMesh,
}

/// Represents a decoded triangular mesh.
/// It consists of a list of faces, where each face is defined by three point indices,
/// and a list of per-point attributes ([DecodedAttribute]).
/// A decoded mesh only lives for the duration of one decode call unless the caller
/// asks for it explicitly.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodedMesh {
    pub(crate) faces: Vec<[u32; 3]>,
    pub(crate) num_points: usize,
    pub(crate) attributes: Vec<DecodedAttribute>,
}

impl DecodedMesh {
    pub fn new(faces: Vec<[u32; 3]>, num_points: usize, attributes: Vec<DecodedAttribute>) -> Self {
        Self { faces, num_points, attributes }
    }

    pub fn get_faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn get_attributes(&self) -> &[DecodedAttribute] {
        &self.attributes
    }

    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn num_points(&self) -> usize {
        self.num_points
    }

    #[inline]
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }
}
