//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use uuid::Uuid;

use patient_records::auth::{TokenClaims, TokenVerifier};
use patient_records::config::{PeerServiceConfig, ServiceConfig};
use patient_records::data::{InMemoryRecordStore, PatientRecord, RecordStore};
use patient_records::{HttpServer, Shutdown};

pub const TEST_SECRET: &str = "integration-test-secret";

/// What a mock peer saw.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// A running mock peer.
#[derive(Clone)]
pub struct MockPeer {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
    seen: Arc<std::sync::Mutex<Vec<MockRequest>>>,
}

impl MockPeer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<MockRequest> {
        self.seen.lock().unwrap().clone()
    }
}

/// JSON envelope body as peers send it.
pub fn envelope(status: u16, data: serde_json::Value) -> String {
    serde_json::json!({
        "status": status,
        "code": if status < 400 { "OK" } else { "ERROR" },
        "message": if status < 400 { "Success" } else { "Request failed" },
        "data": data,
        "errors": [],
    })
    .to_string()
}

/// Start a programmable mock peer on an ephemeral port.
///
/// `f` gets each request and returns `(status, body)`; it may sleep to
/// simulate a slow peer.
pub async fn start_programmable_peer<F, Fut>(f: F) -> MockPeer
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let peer = MockPeer {
        addr: listener.local_addr().unwrap(),
        hits: Arc::new(AtomicU32::new(0)),
        seen: Arc::new(std::sync::Mutex::new(Vec::new())),
    };
    let f = Arc::new(f);
    let state = peer.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let state = state.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        state.hits.fetch_add(1, Ordering::SeqCst);
                        state.seen.lock().unwrap().push(request.clone());

                        let (status, body) = f(request).await;
                        let response = format!(
                            "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    peer
}

/// A peer answering every request with the same status and `data`.
pub async fn start_fixed_peer(status: u16, data: serde_json::Value) -> MockPeer {
    let body = envelope(status, data);
    start_programmable_peer(move |_| {
        let body = body.clone();
        async move { (status, body) }
    })
    .await
}

/// Read the request head and body so the client never sees a reset.
async fn read_request(socket: &mut TcpStream) -> Option<MockRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            } else if name.eq_ignore_ascii_case("authorization") {
                authorization = Some(value.trim().to_string());
            }
        }
    }

    let mut body_read = buf.len() - head_end;
    while body_read < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body_read += n;
    }

    Some(MockRequest {
        method,
        path,
        authorization,
    })
}

/// An address nothing listens on.
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Peer config tuned for fast tests.
pub fn fast_peer(name: &str, base_url: &str) -> PeerServiceConfig {
    let mut peer = PeerServiceConfig::named(name, base_url);
    peer.timeout_ms = 500;
    peer.retry.max_attempts = 3;
    peer.retry.base_delay_ms = 10;
    peer.retry.max_delay_ms = 20;
    peer
}

/// Service config with the four peers at the given URLs.
pub fn test_config(users: &str, addresses: &str, schedule: &str, accounts: &str) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.auth.jwt_secret = TEST_SECRET.into();
    config.peers = vec![
        fast_peer("user-service", users),
        fast_peer("address-service", addresses),
        fast_peer("schedule-service", schedule),
        fast_peer("auth-service", accounts),
    ];
    config
}

/// Sign a token with the test secret.
pub fn mint_token(sub: &str, roles: &[&str], branches: &[Uuid]) -> String {
    let claims = TokenClaims {
        sub: Some(sub.to_string()),
        roles: roles.iter().map(|r| r.to_string()).collect(),
        context_ids: if branches.is_empty() {
            None
        } else {
            Some(branches.iter().map(Uuid::to_string).collect())
        },
        exp: Some(now_secs() + 300),
        ..Default::default()
    };
    TokenVerifier::new(TEST_SECRET, 0).sign(&claims).unwrap()
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

pub async fn seed_patient(store: &InMemoryRecordStore, user_id: Uuid, branch_id: Option<Uuid>) -> PatientRecord {
    let patient = PatientRecord {
        id: Uuid::new_v4(),
        user_id,
        branch_id,
        first_name: "Mary".into(),
        last_name: "Seacole".into(),
        date_of_birth: "1805-11-23".into(),
    };
    store.save_patient(patient.clone()).await.unwrap();
    patient
}

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(5), self.handle).await;
    }
}

pub async fn start_server(config: ServiceConfig, store: Arc<InMemoryRecordStore>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, store).unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();

    let handle = tokio::spawn(async move {
        let _ = server.run(listener, &server_shutdown).await;
    });
    TestServer {
        addr,
        shutdown,
        handle,
    }
}

/// Client that never pools or proxies.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
