//! Per-connection session logic, independent of transport.
//!
//! A session serves one editor connection over one mesh. It starts waiting
//! for the `o<mode>` setup request, then answers geometry requests until
//! the client terminates or the stream breaks. Geometry failures are
//! answered with an error reply and the session stays usable; only
//! transport-level damage closes it.

use std::sync::Arc;

use tracing::{debug, warn};

use spline_core::curve::{
    evaluate_point, evaluate_segment, extend_tangent, mirror_tangent, subdivide,
    ConstructionMode, CurveError,
};
use spline_core::mesh::Mesh;
use spline_core::protocol::{ErrorCode, Reply, Request};
use spline_core::trace::{straight_path, TraceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingInit,
    Ready,
}

/// What the transport loop must do after handling one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Nothing to send (session setup).
    Continue,
    Reply(Reply),
    /// Tear the connection down.
    Close,
}

pub struct Session {
    mesh: Arc<Mesh>,
    phase: Phase,
    mode: ConstructionMode,
    subdivisions: u32,
}

/// Sample counts grow as `2^subdivisions`; a hostile or buggy client must
/// not be able to pin the process with one line.
const MAX_SUBDIVISIONS: u32 = 16;

impl Session {
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            phase: Phase::AwaitingInit,
            mode: ConstructionMode::DeCasteljau,
            subdivisions: 4,
        }
    }

    pub fn handle(&mut self, req: Request) -> Action {
        match req {
            Request::Terminate => {
                debug!("session terminated by client");
                Action::Close
            }
            Request::Init { mode, subdivisions } => {
                self.mode = mode;
                self.subdivisions = (subdivisions as u32).min(MAX_SUBDIVISIONS);
                self.phase = Phase::Ready;
                debug!(?mode, subdivisions, "session ready");
                Action::Continue
            }
            req if self.phase == Phase::AwaitingInit => {
                warn!(?req, "request before session setup");
                Action::Reply(Reply::Error(ErrorCode::MalformedRequest))
            }
            Request::EvalPoint { t, points } => self.reply_point(
                evaluate_point(&self.mesh, &points, t),
            ),
            Request::Split { t, points } => {
                match subdivide(&self.mesh, &points, t) {
                    Ok((left, right)) => {
                        // left[3] == right[0]; the editor splices seven points.
                        let mut seven = Vec::with_capacity(7);
                        seven.extend_from_slice(&left);
                        seven.extend_from_slice(&right[1..]);
                        Action::Reply(Reply::Polyline(seven))
                    }
                    Err(e) => self.geometry_error(e),
                }
            }
            Request::StraightPath { from, to } => {
                match straight_path(&self.mesh, &from, &to) {
                    Ok(path) => Action::Reply(Reply::Polyline(path.points)),
                    Err(e) => self.trace_error(e),
                }
            }
            Request::ExtendTangent { prev, last } => self.reply_point(
                extend_tangent(&self.mesh, &prev, &last),
            ),
            Request::MirrorTangent { end, points } => self.reply_point(
                mirror_tangent(&self.mesh, &points[0], &points[1], &points[2], end),
            ),
            Request::EvalSegment { points } => {
                match evaluate_segment(&self.mesh, &points, self.mode, self.subdivisions) {
                    Ok(curve) => Action::Reply(Reply::Polyline(curve)),
                    Err(e) => self.geometry_error(e),
                }
            }
        }
    }

    fn reply_point(
        &self,
        result: Result<spline_core::mesh::BarycentricPoint, CurveError>,
    ) -> Action {
        match result {
            Ok(p) => Action::Reply(Reply::Point(p)),
            Err(e) => self.geometry_error(e),
        }
    }

    fn geometry_error(&self, e: CurveError) -> Action {
        let code = match &e {
            CurveError::ExtensionOutOfBounds => ErrorCode::ExtensionOutOfBounds,
            CurveError::Trace(TraceError::PathUnreachable { .. }) => ErrorCode::PathUnreachable,
            CurveError::Trace(_) | CurveError::Mesh(_) => ErrorCode::MalformedRequest,
        };
        warn!(error = %e, code = %code, "geometry request failed");
        Action::Reply(Reply::Error(code))
    }

    fn trace_error(&self, e: TraceError) -> Action {
        self.geometry_error(CurveError::from(e))
    }
}
