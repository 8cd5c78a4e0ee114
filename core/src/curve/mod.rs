//! Cubic Bézier segments on the mesh surface.
//!
//! The evaluator is ordinary de Casteljau with one substitution: linear
//! interpolation between control points is replaced by arc-length
//! interpolation along the traced geodesic between them, so every
//! intermediate point stays on the surface and the curve bends with it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mesh::{BarycentricPoint, Mesh, MeshError};
use crate::trace::{straight_path, TraceError};

pub mod tangent;

pub use tangent::{extend_tangent, mirror_tangent, TangentEnd};

#[derive(Debug, Error)]
pub enum CurveError {
    /// A tangent handle was pushed off the mesh through a boundary edge.
    #[error("tangent extension leaves the mesh through a boundary edge")]
    ExtensionOutOfBounds,

    #[error(transparent)]
    Trace(TraceError),

    #[error(transparent)]
    Mesh(#[from] MeshError),
}

impl From<TraceError> for CurveError {
    fn from(e: TraceError) -> Self {
        match e {
            TraceError::OutOfBounds(_) => CurveError::ExtensionOutOfBounds,
            other => CurveError::Trace(other),
        }
    }
}

pub type CurveResult<T> = Result<T, CurveError>;

/// One cubic segment: anchor, outgoing tangent, incoming tangent, anchor.
pub type Segment = [BarycentricPoint; 4];

/// How a session turns four control points into a sampled curve.
///
/// Both constructions converge to the same curve; they differ in how the
/// sample points are produced. The selection is made once per session by the
/// `o<mode>` handshake and honored for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConstructionMode {
    /// Recursive midpoint subdivision of the control polygon (`od`).
    DeCasteljau,
    /// Direct evaluation at uniformly spaced parameters (`os`).
    Parametric,
}

impl ConstructionMode {
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'd' => Some(ConstructionMode::DeCasteljau),
            's' => Some(ConstructionMode::Parametric),
            _ => None,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            ConstructionMode::DeCasteljau => 'd',
            ConstructionMode::Parametric => 's',
        }
    }
}

/// Geodesic replacement for linear interpolation: the point at arc-length
/// fraction `t` along the traced straight path from `a` to `b`.
pub fn geodesic_lerp(
    mesh: &Mesh,
    a: &BarycentricPoint,
    b: &BarycentricPoint,
    t: f64,
) -> CurveResult<BarycentricPoint> {
    let path = straight_path(mesh, a, b)?;
    Ok(path.point_at(mesh, t)?)
}

/// Single point of the cubic segment at `t ∈ [0, 1]`.
///
/// Exact at the ends: `t = 0` yields `p0` and `t = 1` yields `p3`.
pub fn evaluate_point(mesh: &Mesh, seg: &Segment, t: f64) -> CurveResult<BarycentricPoint> {
    let t = t.clamp(0.0, 1.0);
    let [p0, p1, p2, p3] = seg;

    let l01 = geodesic_lerp(mesh, p0, p1, t)?;
    let l12 = geodesic_lerp(mesh, p1, p2, t)?;
    let l23 = geodesic_lerp(mesh, p2, p3, t)?;
    let l012 = geodesic_lerp(mesh, &l01, &l12, t)?;
    let l123 = geodesic_lerp(mesh, &l12, &l23, t)?;
    geodesic_lerp(mesh, &l012, &l123, t)
}

/// De Casteljau split of a segment at `t`, producing the two halves.
///
/// The halves share the split point: `left[3] == right[0]`, `left[0] == p0`
/// and `right[3] == p3` are preserved exactly.
pub fn subdivide(mesh: &Mesh, seg: &Segment, t: f64) -> CurveResult<(Segment, Segment)> {
    let t = t.clamp(0.0, 1.0);
    let [p0, p1, p2, p3] = seg;

    let l01 = geodesic_lerp(mesh, p0, p1, t)?;
    let l12 = geodesic_lerp(mesh, p1, p2, t)?;
    let l23 = geodesic_lerp(mesh, p2, p3, t)?;
    let l012 = geodesic_lerp(mesh, &l01, &l12, t)?;
    let l123 = geodesic_lerp(mesh, &l12, &l23, t)?;
    let mid = geodesic_lerp(mesh, &l012, &l123, t)?;

    Ok(([*p0, l01, l012, mid], [mid, l123, l23, *p3]))
}

/// Sampled on-surface polyline for one segment.
///
/// `subdivisions` controls the density: `2^subdivisions` parameter steps.
/// Consecutive samples are joined by geodesic straight paths so the returned
/// polyline lies on the surface everywhere, not just at the samples.
pub fn evaluate_segment(
    mesh: &Mesh,
    seg: &Segment,
    mode: ConstructionMode,
    subdivisions: u32,
) -> CurveResult<Vec<BarycentricPoint>> {
    let samples = match mode {
        ConstructionMode::DeCasteljau => {
            let mut out = Vec::with_capacity((1usize << subdivisions) + 1);
            collect_by_subdivision(mesh, seg, subdivisions, &mut out)?;
            out.push(seg[3]);
            out
        }
        ConstructionMode::Parametric => {
            let n = 1usize << subdivisions;
            let mut out = Vec::with_capacity(n + 1);
            for i in 0..=n {
                out.push(evaluate_point(mesh, seg, i as f64 / n as f64)?);
            }
            out
        }
    };

    stitch(mesh, &samples)
}

/// Anchors of the fully subdivided control polygons, in curve order. The
/// closing anchor is left for the caller so recursion does not duplicate
/// shared split points.
fn collect_by_subdivision(
    mesh: &Mesh,
    seg: &Segment,
    depth: u32,
    out: &mut Vec<BarycentricPoint>,
) -> CurveResult<()> {
    if depth == 0 {
        out.push(seg[0]);
        return Ok(());
    }
    let (left, right) = subdivide(mesh, seg, 0.5)?;
    collect_by_subdivision(mesh, &left, depth - 1, out)?;
    collect_by_subdivision(mesh, &right, depth - 1, out)
}

/// Join curve samples with geodesic paths, dropping duplicated joints.
fn stitch(mesh: &Mesh, samples: &[BarycentricPoint]) -> CurveResult<Vec<BarycentricPoint>> {
    let mut out = vec![samples[0]];
    for w in samples.windows(2) {
        let path = straight_path(mesh, &w[0], &w[1])?;
        out.extend(path.points.into_iter().skip(1));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ApproxEq, Point3};

    fn flat_square() -> Mesh {
        Mesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    fn segment_on(mesh: &Mesh, world: [[f64; 2]; 4]) -> Segment {
        let mut seg = [BarycentricPoint::new(0, 0.0, 0.0); 4];
        for (i, [x, y]) in world.iter().enumerate() {
            let face = if x >= y { 0 } else { 1 };
            seg[i] = mesh
                .world_to_barycentric(face, &Point3::new(*x, *y, 0.0))
                .unwrap()
                .clamped();
        }
        seg
    }

    /// Planar reference: on a flat mesh the geodesic construction reduces to
    /// the ordinary cubic Bézier of the world positions.
    fn planar_bezier(world: [[f64; 2]; 4], t: f64) -> Point3 {
        let s = 1.0 - t;
        let b = [s * s * s, 3.0 * s * s * t, 3.0 * s * t * t, t * t * t];
        let mut x = 0.0;
        let mut y = 0.0;
        for i in 0..4 {
            x += b[i] * world[i][0];
            y += b[i] * world[i][1];
        }
        Point3::new(x, y, 0.0)
    }

    const WORLD: [[f64; 2]; 4] = [[0.2, 0.1], [0.8, 0.1], [0.9, 0.8], [0.2, 0.9]];

    #[test]
    fn test_evaluate_point_endpoints_exact() {
        let mesh = flat_square();
        let seg = segment_on(&mesh, WORLD);
        assert!(evaluate_point(&mesh, &seg, 0.0).unwrap().coincides(&seg[0]));
        assert!(evaluate_point(&mesh, &seg, 1.0).unwrap().coincides(&seg[3]));
    }

    #[test]
    fn test_evaluate_point_matches_planar_bezier_on_flat_mesh() {
        let mesh = flat_square();
        let seg = segment_on(&mesh, WORLD);
        for &t in &[0.1, 0.25, 0.5, 0.75, 0.9] {
            let p = evaluate_point(&mesh, &seg, t).unwrap();
            let w = mesh.barycentric_to_world(&p).unwrap();
            let expect = planar_bezier(WORLD, t);
            assert!(w.approx_eq(&expect), "t={t}: {w:?} vs {expect:?}");
        }
    }

    #[test]
    fn test_subdivide_shares_split_point() {
        let mesh = flat_square();
        let seg = segment_on(&mesh, WORLD);
        let (left, right) = subdivide(&mesh, &seg, 0.4).unwrap();

        assert!(left[0].coincides(&seg[0]));
        assert!(right[3].coincides(&seg[3]));
        assert!(left[3].coincides(&right[0]));

        let split = mesh.barycentric_to_world(&left[3]).unwrap();
        assert!(split.approx_eq(&planar_bezier(WORLD, 0.4)));
    }

    #[test]
    fn test_subdivide_round_trip() {
        let mesh = flat_square();
        let seg = segment_on(&mesh, WORLD);
        let (left, right) = subdivide(&mesh, &seg, 0.5).unwrap();

        // Original parameter t remaps to 2t on the left half, 2t-1 on the right.
        for &t in &[0.1, 0.3, 0.45] {
            let orig = mesh
                .barycentric_to_world(&evaluate_point(&mesh, &seg, t).unwrap())
                .unwrap();
            let half = mesh
                .barycentric_to_world(&evaluate_point(&mesh, &left, t * 2.0).unwrap())
                .unwrap();
            assert!(orig.approx_eq(&half), "left t={t}");
        }
        for &t in &[0.6, 0.8, 0.95] {
            let orig = mesh
                .barycentric_to_world(&evaluate_point(&mesh, &seg, t).unwrap())
                .unwrap();
            let half = mesh
                .barycentric_to_world(&evaluate_point(&mesh, &right, t * 2.0 - 1.0).unwrap())
                .unwrap();
            assert!(orig.approx_eq(&half), "right t={t}");
        }
    }

    #[test]
    fn test_evaluate_segment_spans_and_stays_on_surface() {
        let mesh = flat_square();
        let seg = segment_on(&mesh, WORLD);
        for mode in [ConstructionMode::DeCasteljau, ConstructionMode::Parametric] {
            let poly = evaluate_segment(&mesh, &seg, mode, 3).unwrap();
            assert!(poly.len() >= 9, "{mode:?}");
            assert!(poly[0].coincides(&seg[0]));
            assert!(poly[poly.len() - 1].coincides(&seg[3]));
            for p in &poly {
                assert!(p.is_inside(), "{mode:?}: {p:?}");
                assert!(p.face < mesh.face_count());
            }
        }
    }

    #[test]
    fn test_modes_agree_at_dyadic_samples() {
        let mesh = flat_square();
        let seg = segment_on(&mesh, WORLD);
        // Quarter points produced by two subdivision levels equal direct
        // evaluation at t = 0.25, 0.5, 0.75 on a flat mesh.
        let mut anchors = Vec::new();
        collect_by_subdivision(&mesh, &seg, 2, &mut anchors).unwrap();
        anchors.push(seg[3]);
        for (i, anchor) in anchors.iter().enumerate() {
            let t = i as f64 / 4.0;
            let direct = evaluate_point(&mesh, &seg, t).unwrap();
            let a = mesh.barycentric_to_world(anchor).unwrap();
            let b = mesh.barycentric_to_world(&direct).unwrap();
            assert!(a.approx_eq(&b), "t={t}");
        }
    }

    #[test]
    fn test_degenerate_segment_collapses() {
        let mesh = flat_square();
        let p = BarycentricPoint::new(0, 0.3, 0.2);
        let seg = [p, p, p, p];
        let poly = evaluate_segment(&mesh, &seg, ConstructionMode::Parametric, 2).unwrap();
        for q in &poly {
            assert!(q.coincides(&p));
        }
    }
}
