//! Triangle records.

use serde::Serialize;

use crate::util::{Axis, DVec2, DVec3};

/// Triangle corner: position plus texture coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vertex {
    pub position: DVec3,
    pub uv: DVec2,
}

/// Coefficients precomputed by the scene exporter for the projected
/// (dominant-axis) intersection test.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IntersectCoefficients {
    pub nu: f64,
    pub nv: f64,
    pub nd: f64,
    pub bu: f64,
    pub bv: f64,
    pub cu: f64,
    pub cv: f64,
}

impl IntersectCoefficients {
    /// Wire order of the seven coefficients.
    pub fn from_array(v: [f64; 7]) -> Self {
        Self { nu: v[0], nv: v[1], nd: v[2], bu: v[3], bv: v[4], cu: v[5], cv: v[6] }
    }

    pub fn to_array(&self) -> [f64; 7] {
        [self.nu, self.nv, self.nd, self.bu, self.bv, self.cu, self.cv]
    }
}

/// A scene triangle as stored in the geometry database.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Triangle {
    pub a: Vertex,
    pub b: Vertex,
    pub c: Vertex,
    /// Axis the normal is most aligned with.
    pub dominant_axis: Axis,
    /// Cross-product derived normal vector.
    pub normal: DVec3,
    pub coefficients: IntersectCoefficients,
    /// Index into the material table, assigned per batch.
    pub material: usize,
}

impl Triangle {
    pub fn vertices(&self) -> [Vertex; 3] {
        [self.a, self.b, self.c]
    }
}
