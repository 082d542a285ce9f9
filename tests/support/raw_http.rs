//! Hand-driven HTTP/1.1 server for body-level failures wiremock can't fake.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What one connection receives after its request head is read.
#[derive(Debug, Clone)]
pub enum Reply {
    /// `Content-Length` matches the body.
    Full(Vec<u8>),
    /// Declares `declared` bytes, sends `body`, then keeps the socket open
    /// without writing.
    Hang { declared: usize, body: Vec<u8> },
    /// Declares `declared` bytes, sends `body`, then closes the socket.
    Close { declared: usize, body: Vec<u8> },
}

/// A running scripted server.
pub struct RawServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
}

impl RawServer {
    /// Connections accepted so far.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Serves `script[n]` to the n-th connection; later connections get the
/// last entry. `path` is appended to the returned URL.
pub async fn serve_script(script: Vec<Reply>, path: &str) -> RawServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}{path}", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&hits);
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let n = counter.fetch_add(1, Ordering::SeqCst);
            let reply = script
                .get(n)
                .or_else(|| script.last())
                .cloned()
                .unwrap_or(Reply::Full(Vec::new()));
            tokio::spawn(respond(stream, reply));
        }
    });

    RawServer { url, hits }
}

async fn respond(mut stream: TcpStream, reply: Reply) {
    if read_head(&mut stream).await.is_none() {
        return;
    }
    let (declared, body) = match &reply {
        Reply::Full(body) => (body.len(), body),
        Reply::Hang { declared, body } | Reply::Close { declared, body } => (*declared, body),
    };
    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/pdf\r\nContent-Length: {declared}\r\n\r\n"
    );
    if stream.write_all(head.as_bytes()).await.is_err()
        || stream.write_all(body).await.is_err()
        || stream.flush().await.is_err()
    {
        return;
    }

    match reply {
        Reply::Full(_) => {
            let _ = stream.shutdown().await;
        }
        Reply::Hang { .. } => {
            // Held until the client gives up and drops its end.
            let mut sink = [0_u8; 64];
            let _ = tokio::time::timeout(Duration::from_secs(60), stream.read(&mut sink)).await;
        }
        Reply::Close { .. } => {
            let _ = stream.shutdown().await;
        }
    }
}

/// Reads up to the blank line ending the request head.
async fn read_head(stream: &mut TcpStream) -> Option<()> {
    let mut head = Vec::new();
    let mut buf = [0_u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
    }
    Some(())
}
