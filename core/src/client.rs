//! Blocking editor-side session client.
//!
//! Thin typed wrapper over the wire protocol for tools that drive the
//! engine over a stream. Generic over `Read + Write` so tests can script a
//! fake stream; production use hands it a connected `TcpStream`.

use std::io::{Read, Write};

use thiserror::Error;

use crate::curve::{ConstructionMode, Segment, TangentEnd};
use crate::mesh::BarycentricPoint;
use crate::protocol::{parse_point_line, ErrorCode, FrameReader, ProtocolError, Request};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The engine closed the stream; every curve bound to this session is
    /// stale and must be rebuilt over a fresh session.
    #[error("session invalidated by the engine")]
    SessionInvalidated,

    /// The engine answered with an error reply.
    #[error("engine error: {0}")]
    Engine(ErrorCode),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

pub type ClientResult<T> = Result<T, ClientError>;

pub struct SessionClient<S> {
    stream: S,
    reader: FrameReader,
}

impl<S: Read + Write> SessionClient<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            reader: FrameReader::new(),
        }
    }

    /// Session setup. The engine sends no acknowledgement.
    pub fn init(&mut self, mode: ConstructionMode, subdivisions: usize) -> ClientResult<()> {
        self.send(&Request::Init { mode, subdivisions })
    }

    /// Geodesic polyline between two surface points.
    pub fn straight_path(
        &mut self,
        from: &BarycentricPoint,
        to: &BarycentricPoint,
    ) -> ClientResult<Vec<BarycentricPoint>> {
        self.send(&Request::StraightPath {
            from: *from,
            to: *to,
        })?;
        self.read_polyline()
    }

    /// Tessellated curve for one control polygon, at the session's mode and
    /// subdivision depth.
    pub fn get_curve(&mut self, points: &Segment) -> ClientResult<Vec<BarycentricPoint>> {
        self.send(&Request::EvalSegment { points: *points })?;
        self.read_polyline()
    }

    /// Curve point at parameter `t` of the given segment.
    pub fn eval_point(&mut self, t: f64, points: &Segment) -> ClientResult<BarycentricPoint> {
        self.send(&Request::EvalPoint { t, points: *points })?;
        self.read_point()
    }

    /// Split a segment at `t`: seven control points, the original end
    /// anchors at both ends and the split point in the middle.
    pub fn split(&mut self, t: f64, points: &Segment) -> ClientResult<[BarycentricPoint; 7]> {
        self.send(&Request::Split { t, points: *points })?;
        let poly = self.read_polyline()?;
        poly.try_into()
            .map_err(|_| ProtocolError::MalformedReply("split reply is not 7 points".into()).into())
    }

    /// First tangent of a segment appended after `last`.
    pub fn extend_tangent(
        &mut self,
        prev: &BarycentricPoint,
        last: &BarycentricPoint,
    ) -> ClientResult<BarycentricPoint> {
        self.send(&Request::ExtendTangent {
            prev: *prev,
            last: *last,
        })?;
        self.read_point()
    }

    /// Re-solved opposite tangent of a smooth anchor.
    pub fn mirror_tangent(
        &mut self,
        points: &[BarycentricPoint; 3],
        end: TangentEnd,
    ) -> ClientResult<BarycentricPoint> {
        self.send(&Request::MirrorTangent {
            end,
            points: *points,
        })?;
        self.read_point()
    }

    /// Ask the engine to shut the session down.
    pub fn close(&mut self) -> ClientResult<()> {
        self.send(&Request::Terminate)
    }

    fn send(&mut self, req: &Request) -> ClientResult<()> {
        self.stream.write_all(req.encode().as_bytes())?;
        self.stream.flush()?;
        Ok(())
    }

    fn next_line(&mut self) -> ClientResult<String> {
        loop {
            if let Some(line) = self.reader.try_line()? {
                return Ok(line);
            }
            let mut buf = [0u8; 2048];
            let n = self.stream.read(&mut buf)?;
            if n == 0 {
                return Err(ClientError::SessionInvalidated);
            }
            self.reader.feed(&buf[..n]);
        }
    }

    /// Read one reply line, surfacing `! <code>` replies as errors.
    fn reply_line(&mut self) -> ClientResult<String> {
        let line = self.next_line()?;
        match line.strip_prefix("! ") {
            Some(code) => Err(ClientError::Engine(code.parse()?)),
            None => Ok(line),
        }
    }

    fn read_point(&mut self) -> ClientResult<BarycentricPoint> {
        let line = self.reply_line()?;
        Ok(parse_point_line(&line)?)
    }

    fn read_polyline(&mut self) -> ClientResult<Vec<BarycentricPoint>> {
        let count_line = self.reply_line()?;
        let count: usize = count_line
            .trim()
            .parse()
            .map_err(|_| ProtocolError::MalformedReply(count_line.clone()))?;
        let mut points = Vec::with_capacity(count);
        for _ in 0..count {
            let line = self.next_line()?;
            points.push(parse_point_line(&line)?);
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted peer: hands back canned reply chunks regardless of what was
    /// written, recording every outgoing byte.
    struct FakeStream {
        written: Vec<u8>,
        replies: VecDeque<Vec<u8>>,
    }

    impl FakeStream {
        fn new(replies: &[&[u8]]) -> Self {
            Self {
                written: Vec::new(),
                replies: replies.iter().map(|r| r.to_vec()).collect(),
            }
        }
    }

    impl Read for FakeStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.replies.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Ok(0),
            }
        }
    }

    impl Write for FakeStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn p(face: usize, u: f64, v: f64) -> BarycentricPoint {
        BarycentricPoint::new(face, u, v)
    }

    #[test]
    fn test_init_writes_handshake_and_reads_nothing() {
        let mut client = SessionClient::new(FakeStream::new(&[]));
        client.init(ConstructionMode::Parametric, 4).unwrap();
        assert_eq!(client.stream.written, b"os\n4\n");
    }

    #[test]
    fn test_point_reply() {
        let mut client = SessionClient::new(FakeStream::new(&[b"2 0.25 0.5\n"]));
        let got = client
            .extend_tangent(&p(0, 0.1, 0.1), &p(0, 0.2, 0.2))
            .unwrap();
        assert_eq!(got, p(2, 0.25, 0.5));
        assert!(client.stream.written.starts_with(b"n\n0\n0.1\n"));
    }

    #[test]
    fn test_polyline_reply_reassembled_across_chunks() {
        // Frame split mid-line to exercise the carry buffer.
        let mut client = SessionClient::new(FakeStream::new(&[
            b"3\n0 0.1 0.1\n1 0.",
            b"5 0.5\n1 0.9 0\n",
        ]));
        let path = client
            .straight_path(&p(0, 0.1, 0.1), &p(1, 0.9, 0.0))
            .unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[1], p(1, 0.5, 0.5));
    }

    #[test]
    fn test_split_reply_must_be_seven_points() {
        let seg = [p(0, 0.1, 0.1), p(0, 0.2, 0.2), p(0, 0.3, 0.3), p(0, 0.4, 0.4)];
        let reply = b"7\n0 0 0\n0 0.1 0\n0 0.2 0\n0 0.3 0\n0 0.4 0\n0 0.5 0\n0 0.6 0\n";
        let mut client = SessionClient::new(FakeStream::new(&[reply]));
        let parts = client.split(0.5, &seg).unwrap();
        assert_eq!(parts[3], p(0, 0.3, 0.0));

        let mut client = SessionClient::new(FakeStream::new(&[b"2\n0 0 0\n0 0.1 0\n"]));
        assert!(matches!(
            client.split(0.5, &seg),
            Err(ClientError::Protocol(_))
        ));
    }

    #[test]
    fn test_engine_error_reply() {
        let mut client = SessionClient::new(FakeStream::new(&[b"! path-unreachable\n"]));
        let err = client
            .straight_path(&p(0, 0.1, 0.1), &p(9, 0.1, 0.1))
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Engine(ErrorCode::PathUnreachable)
        ));
    }

    #[test]
    fn test_closed_stream_invalidates_session() {
        let mut client = SessionClient::new(FakeStream::new(&[]));
        let err = client
            .eval_point(0.5, &[p(0, 0.1, 0.1); 4])
            .unwrap_err();
        assert!(matches!(err, ClientError::SessionInvalidated));
    }
}
