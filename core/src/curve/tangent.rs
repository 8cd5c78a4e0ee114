//! Tangent handle solvers.
//!
//! Continuity at an anchor is expressed on the surface: the outgoing handle
//! is the geodesic continuation of the incoming one, found by walking
//! straight past the anchor instead of reflecting in 3D space (which would
//! leave the surface). Handle lengths are measured as geodesic arc length.

use crate::geometry::EPSILON;
use crate::mesh::{BarycentricPoint, Mesh};
use crate::trace::{straight_path, walk_from};

use super::{CurveError, CurveResult};

/// Which side of a smooth anchor is recomputed by [`mirror_tangent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TangentEnd {
    /// Replace the first of the three points (wire command `r0`).
    Before,
    /// Replace the last of the three points (wire command `r1`).
    After,
}

impl TangentEnd {
    pub fn from_digit(c: char) -> Option<Self> {
        match c {
            '0' => Some(TangentEnd::Before),
            '1' => Some(TangentEnd::After),
            _ => None,
        }
    }

    pub fn digit(&self) -> char {
        match self {
            TangentEnd::Before => '0',
            TangentEnd::After => '1',
        }
    }
}

/// Continue the geodesic through `prev → last` past `last` by the same arc
/// length, giving the first tangent of an appended segment (or the mirrored
/// tangent when closing a loop smoothly).
///
/// A zero-length handle has no direction to continue; the anchor itself is
/// returned so the appended segment starts sharp, matching how the editor
/// seeds a fresh curve with a duplicated last point.
pub fn extend_tangent(
    mesh: &Mesh,
    prev: &BarycentricPoint,
    last: &BarycentricPoint,
) -> CurveResult<BarycentricPoint> {
    let path = straight_path(mesh, prev, last)?;
    let Some((_, dir)) = path.end_direction(mesh)? else {
        return Ok(last.clamped());
    };
    let len = path.total_length(mesh)?;
    walk_from(mesh, &path.end(), &dir, len).map_err(CurveError::from)
}

/// Recompute the opposite tangent of a smooth anchor after one side moved.
///
/// Of the three points `a`, `anchor`, `b`, the side named by `end` is
/// replaced: the new handle leaves the anchor opposite to the kept handle's
/// direction, preserving the replaced handle's arc length.
pub fn mirror_tangent(
    mesh: &Mesh,
    a: &BarycentricPoint,
    anchor: &BarycentricPoint,
    b: &BarycentricPoint,
    end: TangentEnd,
) -> CurveResult<BarycentricPoint> {
    let (kept, replaced) = match end {
        TangentEnd::Before => (b, a),
        TangentEnd::After => (a, b),
    };

    let out = straight_path(mesh, anchor, kept)?;
    let Some((_, dir)) = out.start_direction(mesh)? else {
        return Ok(anchor.clamped());
    };
    let len = straight_path(mesh, anchor, replaced)?.total_length(mesh)?;
    if len < EPSILON {
        return Ok(anchor.clamped());
    }
    walk_from(mesh, &anchor.clamped(), &(-dir), len).map_err(CurveError::from)
}
