//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_switch::config::loader::parse_config;
use api_switch::{HttpServer, ProxyService, Shutdown};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Secret every test proxy is configured with.
pub const AUTH_KEY: &str = "test-secret";

/// What a mock backend answers.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
    /// `Content-Length` to announce instead of the body's real length.
    pub declared_length: Option<usize>,
}

impl Reply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
            declared_length: None,
        }
    }

    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Announce `length` bytes but send only the body, then close.
    pub fn truncated(mut self, length: usize) -> Self {
        self.declared_length = Some(length);
        self
    }
}

/// A request as seen by a mock backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    /// Header names lowercased, in arrival order.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A programmable HTTP/1.1 backend on an ephemeral port.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockBackend {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a backend that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move |_| Reply::ok(body)).await
}

/// Start a backend whose reply depends on the zero-based call number.
pub async fn start_programmable_backend<F>(reply: F) -> MockBackend
where
    F: Fn(u32) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        calls: Arc::new(AtomicU32::new(0)),
        requests: Arc::new(Mutex::new(Vec::new())),
    };
    let reply = Arc::new(reply);

    let state = backend.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let state = state.clone();
            let reply = reply.clone();
            tokio::spawn(async move {
                let _ = serve_one(socket, state, reply).await;
            });
        }
    });

    backend
}

async fn serve_one<F>(socket: TcpStream, state: MockBackend, reply: Arc<F>) -> std::io::Result<()>
where
    F: Fn(u32) -> Reply,
{
    let mut reader = BufReader::new(socket);
    let request = read_request(&mut reader).await?;

    let call = state.calls.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push(request);

    let reply = reply(call);
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }

    let response = format!(
        "HTTP/1.1 {} Mock\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reply.status,
        reply.declared_length.unwrap_or(reply.body.len()),
        reply.body
    );
    let socket = reader.get_mut();
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

async fn read_request(reader: &mut BufReader<TcpStream>) -> std::io::Result<CapturedRequest> {
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut headers = Vec::new();
    loop {
        line.clear();
        reader.read_line(&mut line).await?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_string()));
        }
    }

    let mut request = CapturedRequest {
        method,
        target,
        headers,
        body: Vec::new(),
    };

    let chunked = request
        .header("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"));
    let length = request
        .header("content-length")
        .and_then(|v| v.parse::<usize>().ok());

    if chunked {
        loop {
            line.clear();
            reader.read_line(&mut line).await?;
            let size = usize::from_str_radix(line.trim(), 16).unwrap_or(0);
            if size == 0 {
                line.clear();
                reader.read_line(&mut line).await?;
                break;
            }
            let mut chunk = vec![0; size];
            reader.read_exact(&mut chunk).await?;
            request.body.extend_from_slice(&chunk);
            line.clear();
            reader.read_line(&mut line).await?;
        }
    } else if let Some(length) = length {
        request.body = vec![0; length];
        reader.read_exact(&mut request.body).await?;
    }

    Ok(request)
}

/// A running switch on an ephemeral port; shuts down when dropped.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub proxy: Arc<ProxyService>,
    shutdown: Shutdown,
}

impl TestProxy {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn failures(&self, platform: &str) -> u32 {
        self.proxy
            .directory()
            .platform(platform)
            .unwrap()
            .health()
            .snapshot()
            .consecutive_failures
    }
}

impl Drop for TestProxy {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the switch with a TOML configuration.
pub async fn start_proxy(config: &str) -> TestProxy {
    let config = parse_config(config).unwrap();
    let server = HttpServer::new(config).unwrap();
    let proxy = server.proxy().clone();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let signal = shutdown.signal();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });

    TestProxy {
        addr,
        proxy,
        shutdown,
    }
}

/// Client without connection pooling or system proxy.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// `Authorization` value accepted by every test proxy.
pub fn bearer() -> String {
    format!("Bearer {}", AUTH_KEY)
}
