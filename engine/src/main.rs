//! Geodesic spline session engine.
//!
//! Started by the editor as a subprocess with the exported OBJ mesh as its
//! only argument. The editor waits for two readiness lines on stdout before
//! connecting, so exactly those two go to stdout; all logging goes to
//! stderr.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info, warn};

use spline_core::mesh::{obj, Mesh};
use spline_core::protocol::{FrameReader, Reply, RequestParser};

mod session;

use session::{Action, Session};

const LISTEN_ADDR: &str = "127.0.0.1:27015";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let Some(mesh_path) = std::env::args().nth(1) else {
        error!("usage: spline-engine <mesh.obj>");
        return ExitCode::FAILURE;
    };

    let mesh = match obj::load(mesh_path.as_ref()) {
        Ok(mesh) => Arc::new(mesh),
        Err(e) => {
            error!(path = %mesh_path, error = %e, "failed to load mesh");
            return ExitCode::FAILURE;
        }
    };

    let listener = match TcpListener::bind(LISTEN_ADDR).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = LISTEN_ADDR, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };

    // Readiness handshake read by the editor before it connects.
    println!(
        "spline-engine {}: {} vertices, {} faces",
        spline_core::version(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    println!("listening on {LISTEN_ADDR}");

    info!(addr = LISTEN_ADDR, "accepting sessions");
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        info!(%peer, "session opened");
        let mesh = Arc::clone(&mesh);
        tokio::spawn(async move {
            if let Err(e) = serve(stream, mesh).await {
                warn!(%peer, error = %e, "session i/o error");
            }
            info!(%peer, "session closed");
        });
    }
}

async fn serve(mut stream: TcpStream, mesh: Arc<Mesh>) -> std::io::Result<()> {
    let mut session = Session::new(mesh);
    let mut reader = FrameReader::new();
    let mut parser = RequestParser::new();
    let mut buf = [0u8; 2048];

    loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        reader.feed(&buf[..n]);

        loop {
            let line = match reader.try_line() {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "oversized line, closing session");
                    return Ok(());
                }
            };
            let req = match parser.push_line(&line) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(e) if e.is_recoverable() => {
                    warn!(error = %e, "bad request header");
                    let reply = Reply::Error(spline_core::protocol::ErrorCode::MalformedRequest);
                    stream.write_all(reply.encode().as_bytes()).await?;
                    continue;
                }
                Err(e) => {
                    // Stream position is lost; nothing sane can follow.
                    warn!(error = %e, "unrecoverable protocol error");
                    return Ok(());
                }
            };

            match session.handle(req) {
                Action::Continue => {}
                Action::Reply(reply) => {
                    stream.write_all(reply.encode().as_bytes()).await?;
                }
                Action::Close => return Ok(()),
            }
        }
    }
}
