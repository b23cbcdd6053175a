//! Test helpers: a scripted local HTTP server.
//!
//! The server plays a fixed sequence of responses, one connection per
//! request, and captures everything it was sent so tests can assert on
//! the wire traffic.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// One request as seen by the server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    /// Header names lowercased, values verbatim, in wire order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// One scripted response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub delay: Duration,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Hold the response back for a while; used to pin in-flight drains.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        302 => "Found",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

/// A local HTTP/1.1 server playing a scripted response sequence.
pub struct TestServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl TestServer {
    /// Bind on an ephemeral port and serve. When the script runs out the
    /// server answers 200 with an empty body.
    pub async fn start(responses: Vec<Response>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("test server addr");
        let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let script: Arc<Mutex<VecDeque<Response>>> =
            Arc::new(Mutex::new(responses.into_iter().collect()));

        let captured = requests.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                let captured = captured.clone();
                let script = script.clone();
                tokio::spawn(async move {
                    let _ = serve_one(stream, captured, script).await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

async fn serve_one(
    mut stream: tokio::net::TcpStream,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    script: Arc<Mutex<VecDeque<Response>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    // Read the head, then as much body as Content-Length promises.
    let head_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or("");
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();

    let mut headers = Vec::new();
    let mut content_length = 0usize;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            headers.push((name, value));
        }
    }

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    captured.lock().expect("capture lock").push(CapturedRequest {
        method,
        path,
        headers,
        body,
    });

    let response = script
        .lock()
        .expect("script lock")
        .pop_front()
        .unwrap_or_else(|| Response::new(200));
    if response.delay > Duration::ZERO {
        tokio::time::sleep(response.delay).await;
    }

    let mut extra = String::new();
    for (name, value) in &response.headers {
        extra.push_str(&format!("{}: {}\r\n", name, value));
    }
    let payload = format!(
        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
        response.status,
        reason(response.status),
        response.body.len(),
        extra,
        response.body
    );
    stream.write_all(payload.as_bytes()).await?;
    stream.shutdown().await
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Write a script file into `dir` and return its path.
pub fn write_script(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write script");
    path
}

/// Run a single session over a script file and wait for it to finish.
pub async fn run_session(script_path: &Path, engine_config: &korra::EngineConfig) {
    let script = korra::SessionScript::parse_file(script_path).expect("parse script");
    let engine = korra::Engine::new(engine_config).expect("build engine");
    let (log_tx, mut log_rx) = korra::logging::channel();
    // Keep the channel drained so the runner never blocks on it.
    tokio::spawn(async move { while log_rx.recv().await.is_some() {} });

    let (session, _handle) =
        korra::Session::new(script_path.to_path_buf(), script, engine, log_tx, false);
    session.run().await;
}
