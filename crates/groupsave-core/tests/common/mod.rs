//! In-process stand-in for the savings backend.
//!
//! Speaks just enough HTTP/1.1 for reqwest: one request per connection,
//! `Connection: close` on every response.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use groupsave_core::storage::MemoryBackend;
use groupsave_core::{ApiClient, LocalStore, Notifier, SessionStore};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Path prefix the stub serves the API under.
pub const API_PREFIX: &str = "/api";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

#[derive(Debug, Clone)]
struct StubResponse {
    status: u16,
    body: String,
    delay: Option<Duration>,
}

type Routes = Arc<Mutex<HashMap<(String, String), StubResponse>>>;
type Requests = Arc<Mutex<Vec<RecordedRequest>>>;

pub struct StubBackend {
    port: u16,
    routes: Routes,
    requests: Requests,
}

impl StubBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind stub");
        let port = listener.local_addr().expect("local addr").port();
        let routes: Routes = Arc::default();
        let requests: Requests = Arc::default();

        let (r, q) = (routes.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let (r, q) = (r.clone(), q.clone());
                tokio::spawn(async move {
                    let _ = handle(stream, r, q).await;
                });
            }
        });

        Self {
            port,
            routes,
            requests,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}{}", self.port, API_PREFIX)
    }

    /// Answer `method path` with `status` and a JSON body until replaced.
    pub fn route(&self, method: &str, path: &str, status: u16, body: Value) {
        self.insert(method, path, status, body.to_string(), None);
    }

    /// Like `route`, but hold each answer back for `delay`.
    pub fn route_delayed(&self, method: &str, path: &str, status: u16, body: Value, delay: Duration) {
        self.insert(method, path, status, body.to_string(), Some(delay));
    }

    /// Answer with a raw, possibly non-JSON body.
    pub fn route_raw(&self, method: &str, path: &str, status: u16, body: &str) {
        self.insert(method, path, status, body.to_string(), None);
    }

    fn insert(&self, method: &str, path: &str, status: u16, body: String, delay: Option<Duration>) {
        self.routes.lock().unwrap().insert(
            (method.to_string(), format!("{}{}", API_PREFIX, path)),
            StubResponse { status, body, delay },
        );
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests made to `path` (without the API prefix).
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        let full = format!("{}{}", API_PREFIX, path);
        self.requests()
            .into_iter()
            .filter(|r| r.path == full)
            .collect()
    }
}

/// Wrap a payload in the backend's success envelope.
pub fn envelope(data: Value) -> Value {
    serde_json::json!({"status": "success", "data": data})
}

pub fn error_body(message: &str) -> Value {
    serde_json::json!({"status": "error", "message": message})
}

/// Base URL on a port nobody listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}{}", port, API_PREFIX)
}

/// Session wired to `base_url` with an in-memory store.
pub fn session_for(base_url: &str) -> (SessionStore, LocalStore) {
    let store = LocalStore::in_memory();
    let api = ApiClient::new(base_url, store.clone()).expect("build client");
    (SessionStore::new(api, Notifier::new()), store)
}

/// Session over a memory backend the test can inspect directly.
pub fn session_with_backend(base_url: &str) -> (SessionStore, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::new());
    let store = LocalStore::new(backend.clone());
    let api = ApiClient::new(base_url, store).expect("build client");
    (SessionStore::new(api, Notifier::new()), backend)
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|pos| pos + 4)
}

async fn handle(mut stream: TcpStream, routes: Routes, requests: Requests) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_header_end(&buf) {
            break end;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next().unwrap_or_default().split_whitespace();
    let method = request_line.next().unwrap_or_default().to_string();
    let path = request_line.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization,
        body,
    });

    let response = routes
        .lock()
        .unwrap()
        .get(&(method, path))
        .cloned()
        .unwrap_or_else(|| StubResponse {
            status: 404,
            body: error_body("Not found").to_string(),
            delay: None,
        });

    if let Some(delay) = response.delay {
        tokio::time::sleep(delay).await;
    }

    let reply = format!(
        "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await
}
