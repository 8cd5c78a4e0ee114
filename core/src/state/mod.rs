//! Persistent editor-side curve state.
//!
//! The engine itself is stateless across requests; everything the editor
//! needs to rebuild a curve (control points, closed/smooth flags) lives here
//! and round-trips through serde as plain `(face, u, v)` triples. Curves are
//! grouped per mesh object in an explicit registry keyed by a typed id, so
//! there is no ambient lookup by string key anywhere.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::mesh::BarycentricPoint;

pub mod editor;

pub use editor::{transition, EditEvent, EditState, SideEffect};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("control polygon must hold 3n+1 points with n ≥ 1, got {0}")]
    InvalidControlPolygon(usize),

    #[error("segment index {index} out of range for {segments} segments")]
    SegmentOutOfRange { index: usize, segments: usize },

    #[error("anchor index {index} out of range for {points} control points")]
    AnchorOutOfRange { index: usize, points: usize },

    #[error("cannot delete the only segment of a curve")]
    LastSegment,
}

/// Identifier of one mesh object under edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One Bézier chain glued to a mesh object.
///
/// A chain of `n` segments holds `3n + 1` control points; interior anchors
/// are shared between consecutive segments. Indices `≡ 0 (mod 3)` are
/// anchors, the rest tangents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveInfo {
    pub points: Vec<BarycentricPoint>,
    pub is_closed: bool,
    pub smooth: bool,
}

impl CurveInfo {
    pub fn new(points: Vec<BarycentricPoint>) -> Result<Self, StateError> {
        if points.len() < 4 || points.len() % 3 != 1 {
            return Err(StateError::InvalidControlPolygon(points.len()));
        }
        Ok(Self {
            points,
            is_closed: false,
            smooth: true,
        })
    }

    pub fn segment_count(&self) -> usize {
        (self.points.len() - 1) / 3
    }

    pub fn segment(&self, index: usize) -> Result<[BarycentricPoint; 4], StateError> {
        let segments = self.segment_count();
        if index >= segments {
            return Err(StateError::SegmentOutOfRange { index, segments });
        }
        let i = index * 3;
        Ok([
            self.points[i],
            self.points[i + 1],
            self.points[i + 2],
            self.points[i + 3],
        ])
    }

    /// Indices of the on-curve anchors.
    pub fn anchor_indices(&self) -> impl Iterator<Item = usize> {
        (0..self.points.len()).step_by(3)
    }

    /// Append one segment: the new tangent pair and closing anchor. The
    /// previous last anchor becomes the shared anchor of the new segment.
    pub fn append_segment(&mut self, tail: [BarycentricPoint; 3]) {
        self.points.extend_from_slice(&tail);
    }

    /// Splice the seven control points produced by splitting `segment` in
    /// two back into the chain, growing it by one segment.
    pub fn apply_split(
        &mut self,
        segment: usize,
        replacement: [BarycentricPoint; 7],
    ) -> Result<(), StateError> {
        let segments = self.segment_count();
        if segment >= segments {
            return Err(StateError::SegmentOutOfRange {
                index: segment,
                segments,
            });
        }
        let i = segment * 3;
        self.points.splice(i..i + 4, replacement);
        Ok(())
    }

    /// Remove the segment around the anchor at `anchor_index` (its two
    /// tangents and the anchor itself), merging the neighbors. End anchors
    /// fall back to their only adjacent segment, as the editor does.
    pub fn delete_segment_at(&mut self, anchor_index: usize) -> Result<(), StateError> {
        if self.segment_count() == 1 {
            return Err(StateError::LastSegment);
        }
        if anchor_index >= self.points.len() {
            return Err(StateError::AnchorOutOfRange {
                index: anchor_index,
                points: self.points.len(),
            });
        }
        let mut idx = anchor_index - anchor_index % 3;
        if idx == 0 {
            idx = 3;
        }
        if idx == self.points.len() - 1 {
            idx -= 3;
        }
        self.points.drain(idx - 1..=idx + 1);
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.points.len() >= 4 && self.points.len() % 3 == 1
    }
}

/// All curves authored on one mesh object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectCurves {
    pub curves: Vec<CurveInfo>,
}

/// Explicit per-object curve store owned by the editor and passed into
/// adapter calls; invalidating an object drops all of its curves at once
/// (fail closed when the underlying mesh topology changed).
#[derive(Debug, Default)]
pub struct CurveRegistry {
    objects: HashMap<ObjectId, ObjectCurves>,
}

impl CurveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self) -> ObjectId {
        let id = ObjectId::new();
        self.objects.insert(id, ObjectCurves::default());
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&ObjectCurves> {
        self.objects.get(&id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut ObjectCurves> {
        self.objects.get_mut(&id)
    }

    pub fn add_curve(&mut self, id: ObjectId, curve: CurveInfo) -> bool {
        match self.objects.get_mut(&id) {
            Some(obj) => {
                obj.curves.push(curve);
                true
            }
            None => false,
        }
    }

    /// Drop every curve on the object. Called when the mesh topology under
    /// an annotation changed and the session was torn down.
    pub fn invalidate(&mut self, id: ObjectId) -> Option<ObjectCurves> {
        self.objects.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
