//! Indexed triangle mesh shared by the curve engine and the protocol layer.
//!
//! The mesh is immutable for the lifetime of a session: the editor exports it
//! once (OBJ subset, see [`obj`]) and every barycentric point exchanged over
//! the protocol refers to this snapshot. Any topology change on the editor
//! side invalidates the session rather than mutating the mesh in place.

use std::collections::HashMap;

use thiserror::Error;

use crate::geometry::{Point3, Vector3, EPSILON};

pub mod bary;
pub mod obj;

pub use bary::BarycentricPoint;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("face {face} references vertex {vertex} but mesh has {vertex_count} vertices")]
    VertexOutOfRange {
        face: usize,
        vertex: usize,
        vertex_count: usize,
    },

    #[error("face index {0} out of range ({1} faces)")]
    FaceOutOfRange(usize, usize),

    #[error("barycentric point ({u}, {v}) lies outside face {face}")]
    PointOutsideFace { face: usize, u: f64, v: f64 },

    #[error("mesh has no faces")]
    Empty,

    #[error("malformed mesh file: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Immutable indexed triangle mesh with precomputed edge adjacency.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Point3>,
    faces: Vec<[usize; 3]>,
    /// Faces incident to each undirected edge, keyed by sorted vertex pair.
    /// Interior manifold edges have exactly two entries.
    edge_faces: HashMap<(usize, usize), Vec<usize>>,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Mesh {
    pub fn new(vertices: Vec<Point3>, faces: Vec<[usize; 3]>) -> Result<Self, MeshError> {
        if faces.is_empty() {
            return Err(MeshError::Empty);
        }
        for (fi, face) in faces.iter().enumerate() {
            for &vi in face {
                if vi >= vertices.len() {
                    return Err(MeshError::VertexOutOfRange {
                        face: fi,
                        vertex: vi,
                        vertex_count: vertices.len(),
                    });
                }
            }
        }

        let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (fi, face) in faces.iter().enumerate() {
            for i in 0..3 {
                let key = edge_key(face[i], face[(i + 1) % 3]);
                edge_faces.entry(key).or_default().push(fi);
            }
        }

        Ok(Self {
            vertices,
            faces,
            edge_faces,
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn vertex(&self, i: usize) -> Point3 {
        self.vertices[i]
    }

    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    pub fn face(&self, f: usize) -> Result<[usize; 3], MeshError> {
        self.faces
            .get(f)
            .copied()
            .ok_or(MeshError::FaceOutOfRange(f, self.faces.len()))
    }

    pub fn face_points(&self, f: usize) -> Result<[Point3; 3], MeshError> {
        let [a, b, c] = self.face(f)?;
        Ok([self.vertices[a], self.vertices[b], self.vertices[c]])
    }

    /// Unit normal of a face, `None` when the face is degenerate.
    pub fn face_normal(&self, f: usize) -> Result<Option<Vector3>, MeshError> {
        let [a, b, c] = self.face_points(f)?;
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        if len < EPSILON * EPSILON {
            return Ok(None);
        }
        Ok(Some(n / len))
    }

    /// The face across edge `(a, b)` from `from_face`.
    ///
    /// `None` for boundary edges and for non-manifold edges (more than two
    /// incident faces): the geodesic walk must not traverse either.
    pub fn neighbor_across(&self, from_face: usize, a: usize, b: usize) -> Option<usize> {
        let faces = self.edge_faces.get(&edge_key(a, b))?;
        if faces.len() != 2 {
            return None;
        }
        if faces[0] == from_face {
            Some(faces[1])
        } else if faces[1] == from_face {
            Some(faces[0])
        } else {
            None
        }
    }

    /// Faces sharing at least one edge with `f`, in edge order.
    pub fn face_neighbors(&self, f: usize) -> Result<Vec<usize>, MeshError> {
        let [a, b, c] = self.face(f)?;
        Ok([(a, b), (b, c), (c, a)]
            .iter()
            .filter_map(|&(x, y)| self.neighbor_across(f, x, y))
            .collect())
    }

    /// Exact affine map from barycentric to world coordinates:
    /// `(1-u-v)·V0 + u·V1 + v·V2`.
    pub fn barycentric_to_world(&self, p: &BarycentricPoint) -> Result<Point3, MeshError> {
        let [v0, v1, v2] = self.face_points(p.face)?;
        Ok(Point3::from(
            v0.coords * p.w() + v1.coords * p.u + v2.coords * p.v,
        ))
    }

    /// Barycentric coordinates of a world point assumed to lie in the plane
    /// of `face` (2×2 Gram solve against the face edge basis).
    pub fn world_to_barycentric(&self, face: usize, p: &Point3) -> Result<BarycentricPoint, MeshError> {
        let [v0, v1, v2] = self.face_points(face)?;
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let d = p - v0;

        let a11 = e1.dot(&e1);
        let a12 = e1.dot(&e2);
        let a22 = e2.dot(&e2);
        let det = a11 * a22 - a12 * a12;
        if det.abs() < EPSILON * EPSILON * EPSILON {
            // Degenerate face, collapse onto its first vertex.
            return Ok(BarycentricPoint::new(face, 0.0, 0.0));
        }
        let b1 = d.dot(&e1);
        let b2 = d.dot(&e2);
        let u = (b1 * a22 - b2 * a12) / det;
        let v = (b2 * a11 - b1 * a12) / det;
        Ok(BarycentricPoint::new(face, u, v))
    }

    /// Validate a protocol-supplied point against this mesh: the face index
    /// must exist and the weights must describe a point in the closed
    /// triangle within tolerance.
    pub fn check_point(&self, p: &BarycentricPoint) -> Result<(), MeshError> {
        self.face(p.face)?;
        if !p.is_inside() {
            return Err(MeshError::PointOutsideFace {
                face: p.face,
                u: p.u,
                v: p.v,
            });
        }
        Ok(())
    }
}
