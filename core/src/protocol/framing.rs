//! Line framing and request assembly.
//!
//! TCP gives the session byte chunks with no relation to line boundaries:
//! one read may carry half a line or several requests. [`FrameReader`]
//! holds the single carry buffer and hands out complete lines;
//! [`RequestParser`] consumes those lines and assembles full requests,
//! since only the header line says how many body lines follow.

use crate::curve::{ConstructionMode, TangentEnd};
use crate::mesh::BarycentricPoint;

use super::{ProtocolError, ProtocolResult, Request};

/// Longest line the framer will buffer. The widest legitimate line is a
/// face index plus two full-precision floats, far under this.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Splits a byte stream into lines across arbitrary read boundaries.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Pop the next complete line, without its terminator. Returns
    /// `Ok(None)` until a newline arrives; the partial tail stays buffered.
    /// A peer that exceeds [`MAX_LINE_LENGTH`] without sending a newline
    /// gets the unrecoverable [`ProtocolError::LineTooLong`].
    pub fn try_line(&mut self) -> ProtocolResult<Option<String>> {
        match self.buf.iter().position(|&b| b == b'\n') {
            Some(nl) if nl > MAX_LINE_LENGTH => Err(ProtocolError::LineTooLong),
            Some(nl) => {
                let mut line: Vec<u8> = self.buf.drain(..=nl).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                Ok(Some(String::from_utf8_lossy(&line).into_owned()))
            }
            None if self.buf.len() > MAX_LINE_LENGTH => Err(ProtocolError::LineTooLong),
            None => Ok(None),
        }
    }
}

/// How many body lines each header expects. A surface point is three lines.
fn body_lines(header: &Header) -> usize {
    match header {
        Header::Init { .. } => 1,
        Header::EvalPoint | Header::Split => 1 + 4 * 3,
        Header::StraightPath | Header::ExtendTangent => 2 * 3,
        Header::MirrorTangent { .. } => 3 * 3,
        // The first body line already arrived as the header itself.
        Header::EvalSegment => 4 * 3 - 1,
    }
}

#[derive(Debug, Clone, Copy)]
enum Header {
    Init { mode: ConstructionMode },
    EvalPoint,
    Split,
    StraightPath,
    ExtendTangent,
    MirrorTangent { end: TangentEnd },
    EvalSegment,
}

/// Assembles requests from complete lines.
#[derive(Debug, Default)]
pub struct RequestParser {
    pending: Option<(Header, Vec<String>)>,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns a request once its last body line arrives.
    ///
    /// An unknown header is reported without consuming further lines, so
    /// the caller may reply with an error and keep the session open. Any
    /// other error means the stream is out of step and must be closed.
    pub fn push_line(&mut self, line: &str) -> ProtocolResult<Option<Request>> {
        let (header, mut body) = match self.pending.take() {
            Some(pending) => pending,
            None => match Self::parse_header(line)? {
                HeaderLine::Complete(req) => return Ok(Some(req)),
                HeaderLine::Partial(header) => {
                    let mut body = Vec::with_capacity(body_lines(&header));
                    if matches!(header, Header::EvalSegment) {
                        body.push(line.to_string());
                    }
                    self.pending = Some((header, body));
                    return Ok(None);
                }
            },
        };

        body.push(line.to_string());
        let expected = match header {
            Header::EvalSegment => body_lines(&header) + 1,
            _ => body_lines(&header),
        };
        if body.len() < expected {
            self.pending = Some((header, body));
            return Ok(None);
        }
        Self::assemble(header, &body).map(Some)
    }

    /// Whether a request is partially assembled.
    pub fn mid_request(&self) -> bool {
        self.pending.is_some()
    }

    fn parse_header(line: &str) -> ProtocolResult<HeaderLine> {
        let unknown = || ProtocolError::UnknownCommand(line.to_string());
        let mut chars = line.chars();
        let head = chars.next().ok_or_else(unknown)?;
        let rest: String = chars.collect();

        let header = match head {
            'a' if rest.is_empty() => return Ok(HeaderLine::Complete(Request::Terminate)),
            'o' => {
                let mode = rest
                    .chars()
                    .next()
                    .filter(|_| rest.len() == 1)
                    .and_then(ConstructionMode::from_letter)
                    .ok_or_else(unknown)?;
                Header::Init { mode }
            }
            'p' if rest.is_empty() => Header::EvalPoint,
            's' if rest.is_empty() => Header::Split,
            'l' if rest.is_empty() => Header::StraightPath,
            'n' if rest.is_empty() => Header::ExtendTangent,
            'r' => {
                let end = rest
                    .chars()
                    .next()
                    .filter(|_| rest.len() == 1)
                    .and_then(TangentEnd::from_digit)
                    .ok_or_else(unknown)?;
                Header::MirrorTangent { end }
            }
            // A bare control polygon opens with its first face index.
            c if c.is_ascii_digit() => Header::EvalSegment,
            _ => return Err(unknown()),
        };
        Ok(HeaderLine::Partial(header))
    }

    fn assemble(header: Header, body: &[String]) -> ProtocolResult<Request> {
        match header {
            Header::Init { mode } => Ok(Request::Init {
                mode,
                subdivisions: parse_num(&body[0])?,
            }),
            Header::EvalPoint => Ok(Request::EvalPoint {
                t: parse_num(&body[0])?,
                points: parse_points::<4>(&body[1..])?,
            }),
            Header::Split => Ok(Request::Split {
                t: parse_num(&body[0])?,
                points: parse_points::<4>(&body[1..])?,
            }),
            Header::StraightPath => {
                let [from, to] = parse_points::<2>(body)?;
                Ok(Request::StraightPath { from, to })
            }
            Header::ExtendTangent => {
                let [prev, last] = parse_points::<2>(body)?;
                Ok(Request::ExtendTangent { prev, last })
            }
            Header::MirrorTangent { end } => Ok(Request::MirrorTangent {
                end,
                points: parse_points::<3>(body)?,
            }),
            Header::EvalSegment => Ok(Request::EvalSegment {
                points: parse_points::<4>(body)?,
            }),
        }
    }
}

enum HeaderLine {
    Complete(Request),
    Partial(Header),
}

fn parse_num<T: std::str::FromStr>(line: &str) -> ProtocolResult<T> {
    line.trim()
        .parse()
        .map_err(|_| ProtocolError::MalformedBody(line.to_string()))
}

fn parse_points<const N: usize>(lines: &[String]) -> ProtocolResult<[BarycentricPoint; N]> {
    debug_assert_eq!(lines.len(), N * 3);
    let mut points = [BarycentricPoint::new(0, 0.0, 0.0); N];
    for (i, chunk) in lines.chunks_exact(3).enumerate() {
        points[i] = BarycentricPoint::new(
            parse_num(&chunk[0])?,
            parse_num(&chunk[1])?,
            parse_num(&chunk[2])?,
        );
    }
    Ok(points)
}
