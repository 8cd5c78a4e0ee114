//! Wire protocol between the editor and the session engine.
//!
//! Plain line-oriented text over a local TCP stream. A request is a header
//! line followed by a fixed number of body lines determined by the header;
//! a surface point travels as three lines (face index, u, v). Replies are
//! either a single point line `face u v`, a framed polyline (a count line
//! followed by that many point lines), or an error line `! <code>`.
//!
//! Header forms:
//!
//! | header       | body lines | meaning                         | reply    |
//! |--------------|------------|---------------------------------|----------|
//! | `o<d\|s>`    | 1          | session setup                   | none     |
//! | `p`          | 13         | evaluate one curve parameter    | point    |
//! | `s`          | 13         | split a segment at a parameter  | framed 7 |
//! | `l`          | 6          | geodesic between two points     | framed   |
//! | `n`          | 6          | extend tangent past an anchor   | point    |
//! | `r<0\|1>`    | 9          | mirror a smooth-anchor tangent  | point    |
//! | `<digit>…`   | 11 more    | tessellate a segment (4 points) | framed   |
//! | `a`          | 0          | terminate session               | none     |

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::curve::{ConstructionMode, Segment, TangentEnd};
use crate::mesh::BarycentricPoint;

pub mod framing;

pub use framing::{FrameReader, RequestParser};

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The header line named no known command. Recoverable: the session
    /// answers with an error reply and keeps reading.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// A body line did not parse. The stream position is ambiguous from
    /// here on, so the session must close.
    #[error("malformed body line {0:?}")]
    MalformedBody(String),

    /// The peer streamed more than [`framing::MAX_LINE_LENGTH`] bytes
    /// without a newline. No valid line is that long; the session must
    /// close rather than buffer without bound.
    #[error("line exceeds {} bytes without a terminator", framing::MAX_LINE_LENGTH)]
    LineTooLong,

    #[error("malformed reply line {0:?}")]
    MalformedReply(String),
}

impl ProtocolError {
    /// Whether the session may answer with an error reply and continue.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ProtocolError::UnknownCommand(_))
    }
}

/// Machine-readable error tag carried in an `! <code>` reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    PathUnreachable,
    ExtensionOutOfBounds,
    MalformedRequest,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::PathUnreachable => "path-unreachable",
            ErrorCode::ExtensionOutOfBounds => "out-of-bounds",
            ErrorCode::MalformedRequest => "malformed-request",
        };
        f.write_str(s)
    }
}

impl FromStr for ErrorCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "path-unreachable" => Ok(ErrorCode::PathUnreachable),
            "out-of-bounds" => Ok(ErrorCode::ExtensionOutOfBounds),
            "malformed-request" => Ok(ErrorCode::MalformedRequest),
            other => Err(ProtocolError::MalformedReply(other.to_string())),
        }
    }
}

/// One fully parsed request.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Init {
        mode: ConstructionMode,
        subdivisions: usize,
    },
    EvalPoint {
        t: f64,
        points: Segment,
    },
    Split {
        t: f64,
        points: Segment,
    },
    StraightPath {
        from: BarycentricPoint,
        to: BarycentricPoint,
    },
    ExtendTangent {
        prev: BarycentricPoint,
        last: BarycentricPoint,
    },
    MirrorTangent {
        end: TangentEnd,
        points: [BarycentricPoint; 3],
    },
    EvalSegment {
        points: Segment,
    },
    Terminate,
}

/// One reply, ready for encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Point(BarycentricPoint),
    Polyline(Vec<BarycentricPoint>),
    Error(ErrorCode),
}

/// Format a point as one reply line.
pub fn point_line(p: &BarycentricPoint) -> String {
    format!("{} {} {}", p.face, p.u, p.v)
}

/// Parse a `face u v` line.
pub fn parse_point_line(line: &str) -> ProtocolResult<BarycentricPoint> {
    let mut fields = line.split_whitespace();
    let bad = || ProtocolError::MalformedReply(line.to_string());
    let face = fields.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
    let u = fields.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
    let v = fields.next().and_then(|s| s.parse().ok()).ok_or_else(bad)?;
    if fields.next().is_some() {
        return Err(bad());
    }
    Ok(BarycentricPoint::new(face, u, v))
}

impl Reply {
    pub fn encode(&self) -> String {
        match self {
            Reply::Point(p) => {
                let mut line = point_line(p);
                line.push('\n');
                line
            }
            Reply::Polyline(points) => {
                let mut out = format!("{}\n", points.len());
                for p in points {
                    out.push_str(&point_line(p));
                    out.push('\n');
                }
                out
            }
            Reply::Error(code) => format!("! {}\n", code),
        }
    }
}

impl Request {
    /// Encode as the header plus body lines the engine reads.
    pub fn encode(&self) -> String {
        fn push_point(out: &mut String, p: &BarycentricPoint) {
            out.push_str(&format!("{}\n{}\n{}\n", p.face, p.u, p.v));
        }

        let mut out = String::new();
        match self {
            Request::Init { mode, subdivisions } => {
                out.push('o');
                out.push(mode.letter());
                out.push('\n');
                out.push_str(&format!("{subdivisions}\n"));
            }
            Request::EvalPoint { t, points } => {
                out.push_str(&format!("p\n{t}\n"));
                for p in points {
                    push_point(&mut out, p);
                }
            }
            Request::Split { t, points } => {
                out.push_str(&format!("s\n{t}\n"));
                for p in points {
                    push_point(&mut out, p);
                }
            }
            Request::StraightPath { from, to } => {
                out.push_str("l\n");
                push_point(&mut out, from);
                push_point(&mut out, to);
            }
            Request::ExtendTangent { prev, last } => {
                out.push_str("n\n");
                push_point(&mut out, prev);
                push_point(&mut out, last);
            }
            Request::MirrorTangent { end, points } => {
                out.push('r');
                out.push(end.digit());
                out.push('\n');
                for p in points {
                    push_point(&mut out, p);
                }
            }
            Request::EvalSegment { points } => {
                for p in points {
                    push_point(&mut out, p);
                }
            }
            Request::Terminate => out.push_str("a\n"),
        }
        out
    }
}
