//! Shared utilities for integration tests.

use std::net::SocketAddr;

use echomirror::{MirrorConfig, MirrorServer, Shutdown, Transcript, TranscriptSink};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Start the server on an ephemeral loopback port.
pub async fn start_mirror(config: MirrorConfig) -> (SocketAddr, Shutdown) {
    let (addr, shutdown, _transcripts) = start_mirror_recording(config).await;
    (addr, shutdown)
}

/// Start the server on an ephemeral loopback port, collecting its transcripts.
pub async fn start_mirror_recording(
    config: MirrorConfig,
) -> (SocketAddr, Shutdown, mpsc::UnboundedReceiver<Transcript>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    let (sink, transcripts) = TranscriptSink::channel();
    let server = MirrorServer::new(config).unwrap();
    tokio::spawn(async move {
        let _ = server.run_with_transcripts(listener, signal, sink).await;
    });

    (addr, shutdown, transcripts)
}

/// Wait for the next transcript.
#[allow(dead_code)]
pub async fn next_transcript(transcripts: &mut mpsc::UnboundedReceiver<Transcript>) -> Transcript {
    tokio::time::timeout(std::time::Duration::from_secs(5), transcripts.recv())
        .await
        .expect("no transcript")
        .expect("transcript channel closed")
}

/// Client that neither uses system proxies nor decodes bodies itself.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .no_gzip()
        .no_deflate()
        .no_brotli()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

/// Start a mock upstream that answers every connection with `response` verbatim
/// and reports each raw request (head and body) it received.
#[allow(dead_code)]
pub async fn start_mock_upstream(response: Vec<u8>) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            let response = response.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                let _ = tx.send(request);
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Build a raw HTTP/1.1 response with `Content-Length` and `Connection: close`.
#[allow(dead_code)]
pub fn fixed_response(status_line: &str, extra_headers: &[(&str, &str)], body: &str) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in extra_headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let mut bytes = head.into_bytes();
    bytes.extend_from_slice(body.as_bytes());
    bytes
}

/// A port nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return String::from_utf8_lossy(&buf).into_owned(),
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let body_len = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + body_len {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
