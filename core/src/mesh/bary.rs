use crate::geometry::EPSILON;
use serde::{Deserialize, Serialize};

/// A point on the surface of a triangulated mesh, expressed as barycentric
/// coordinates inside one face.
///
/// `u` weighs the face's second vertex and `v` its third; the weight of the
/// first vertex is the implied `w = 1 - u - v`. This matches the order the
/// wire protocol and the persisted editor state use, so the value is
/// serialized as a plain `(face, u, v)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(usize, f64, f64)", into = "(usize, f64, f64)")]
pub struct BarycentricPoint {
    pub face: usize,
    pub u: f64,
    pub v: f64,
}

impl BarycentricPoint {
    pub fn new(face: usize, u: f64, v: f64) -> Self {
        Self { face, u, v }
    }

    /// Implied weight of the face's first vertex.
    pub fn w(&self) -> f64 {
        1.0 - self.u - self.v
    }

    /// True if the weights describe a point inside the closed triangle,
    /// within tolerance. Points on an edge (one weight zero) or a vertex
    /// (two weights zero) are valid.
    pub fn is_inside(&self) -> bool {
        self.u >= -EPSILON && self.v >= -EPSILON && self.u + self.v <= 1.0 + EPSILON
    }

    /// Clamp near-zero weights to the closed triangle. Degenerate crossings
    /// that land a hair outside an edge get snapped back instead of feeding
    /// garbage into the next traversal step.
    pub fn clamped(&self) -> Self {
        let mut u = self.u.max(0.0);
        let mut v = self.v.max(0.0);
        let s = u + v;
        if s > 1.0 {
            u /= s;
            v /= s;
        }
        Self { face: self.face, u, v }
    }

    /// Same surface location, compared with tolerance. Points on different
    /// faces are never considered coincident here, even if the world
    /// positions agree on a shared edge.
    pub fn coincides(&self, other: &Self) -> bool {
        self.face == other.face
            && (self.u - other.u).abs() < EPSILON
            && (self.v - other.v).abs() < EPSILON
    }
}

impl From<(usize, f64, f64)> for BarycentricPoint {
    fn from((face, u, v): (usize, f64, f64)) -> Self {
        Self { face, u, v }
    }
}

impl From<BarycentricPoint> for (usize, f64, f64) {
    fn from(p: BarycentricPoint) -> Self {
        (p.face, p.u, p.v)
    }
}
