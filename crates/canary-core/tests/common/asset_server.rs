//! Minimal HTTP/1.1 server serving fixed assets for integration tests.
//!
//! Each path maps to a status and body. Paths can also simulate a connection
//! that drops mid-body. The server counts connections that are waiting for
//! their response headers so tests can check the client-side fetch cap.
//! It also acts as its own CONNECT proxy: a tunnel request is acknowledged
//! and the tunnelled GET is served from the same asset map.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Asset {
    Ok(Vec<u8>),
    Status(u16, Vec<u8>),
    /// Advertise the full length but close after the first half.
    Truncated(Vec<u8>),
}

#[derive(Debug, Default)]
pub struct ServerStats {
    waiting: AtomicUsize,
    peak_waiting: AtomicUsize,
    requests: AtomicUsize,
    tunnels: AtomicUsize,
}

impl ServerStats {
    pub fn peak_waiting(&self) -> usize {
        self.peak_waiting.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn tunnels(&self) -> usize {
        self.tunnels.load(Ordering::SeqCst)
    }
}

pub struct AssetServer {
    pub base: String,
    pub stats: Arc<ServerStats>,
}

impl AssetServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// This server addressed as an HTTP proxy.
    pub fn proxy_url(&self) -> String {
        self.base.trim_end_matches('/').to_string()
    }
}

/// Starts a server in a background thread. `header_delay` is how long each
/// request waits before its response headers go out. Runs until process exit.
pub fn start(assets: HashMap<String, Asset>, header_delay: Duration) -> AssetServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let assets = Arc::new(assets);
    let stats = Arc::new(ServerStats::default());
    let server_stats = Arc::clone(&stats);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let assets = Arc::clone(&assets);
            let stats = Arc::clone(&server_stats);
            thread::spawn(move || handle(stream, &assets, &stats, header_delay));
        }
    });
    AssetServer {
        base: format!("http://127.0.0.1:{}/", port),
        stats,
    }
}

/// A URL on a port nothing listens on.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/gone.bin", port)
}

fn handle(
    mut stream: TcpStream,
    assets: &HashMap<String, Asset>,
    stats: &ServerStats,
    header_delay: Duration,
) {
    let now = stats.waiting.fetch_add(1, Ordering::SeqCst) + 1;
    stats.peak_waiting.fetch_max(now, Ordering::SeqCst);
    stats.requests.fetch_add(1, Ordering::SeqCst);

    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let path = match read_request(&mut stream) {
        Some((method, target)) if method.eq_ignore_ascii_case("CONNECT") => {
            stats.tunnels.fetch_add(1, Ordering::SeqCst);
            let _ = stream.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n");
            match read_request(&mut stream) {
                Some((_, target)) => target,
                None => String::new(),
            }
        }
        Some((method, target)) if method.eq_ignore_ascii_case("GET") => target,
        _ => String::new(),
    };

    if !header_delay.is_zero() {
        thread::sleep(header_delay);
    }

    let (status, reason, body, truncate) = match assets.get(&path) {
        Some(Asset::Ok(body)) => (200, "OK", body.as_slice(), false),
        Some(Asset::Status(code, body)) => (*code, "Status", body.as_slice(), false),
        Some(Asset::Truncated(body)) => (200, "OK", body.as_slice(), true),
        None => (404, "Not Found", &b"not found"[..], false),
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        reason,
        body.len()
    );
    stats.waiting.fetch_sub(1, Ordering::SeqCst);

    let _ = stream.write_all(head.as_bytes());
    if truncate {
        let _ = stream.write_all(&body[..body.len() / 2]);
        let _ = stream.flush();
        return;
    }
    let _ = stream.write_all(body);
}

/// Method and target of the next request on `stream`.
fn read_request(stream: &mut TcpStream) -> Option<(String, String)> {
    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf).ok().filter(|&n| n > 0)?;
    let request = std::str::from_utf8(&buf[..n]).ok()?;
    let mut parts = request.lines().next()?.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();
    Some((method, target))
}
