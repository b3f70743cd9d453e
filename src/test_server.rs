// In-process stand-in for the upload backend, used by the HTTP tests.

use axum::{
    extract::{Multipart, Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::{Config, EndpointConfig};
use crate::source::Platform;
use crate::transport::Endpoints;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub location: Option<String>,
}

impl Reply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            location: None,
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            body: String::new(),
            location: Some(location.into()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReceivedUpload {
    pub path: String,
    pub query: HashMap<String, String>,
    pub content_type: String,
    pub field_names: Vec<String>,
    pub file_name: Option<String>,
    pub file_content_type: Option<String>,
    pub file_data: Vec<u8>,
}

#[derive(Default)]
struct BackendState {
    replies: Mutex<VecDeque<Reply>>,
    received: Mutex<Vec<ReceivedUpload>>,
    login_hits: AtomicUsize,
}

pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
}

impl MockBackend {
    /// Starts a backend that answers with `replies` in order. Once they run
    /// out it answers `200` with `https://cdn/upload-<n>.jpg`.
    pub async fn start(replies: Vec<Reply>) -> Self {
        let state = Arc::new(BackendState {
            replies: Mutex::new(replies.into()),
            received: Mutex::new(Vec::new()),
            login_hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/api/uploadavatar", post(handle_upload))
            .route("/mobile/uploadImagev2", post(handle_upload))
            .route("/login", get(handle_login))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig {
            base_url: format!("http://{}/api", self.addr),
            mobile_base_url: format!("http://{}/mobile", self.addr),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::from(&self.endpoint_config())
    }

    pub fn config(&self, platform: Platform) -> Config {
        Config {
            endpoints: self.endpoint_config(),
            platform,
        }
    }

    pub async fn received(&self) -> Vec<ReceivedUpload> {
        self.state.received.lock().await.clone()
    }

    /// Requests that reached the redirect target.
    pub fn login_hits(&self) -> usize {
        self.state.login_hits.load(Ordering::SeqCst)
    }
}

/// A local address with nothing listening on it.
pub fn closed_port_url(path: &str) -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/{}", addr, path)
}

async fn handle_upload(
    State(state): State<Arc<BackendState>>,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let mut received = ReceivedUpload {
        path: uri.path().to_string(),
        query,
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            received.file_name = field.file_name().map(|s| s.to_string());
            received.file_content_type = field.content_type().map(|s| s.to_string());
            received.file_data = field.bytes().await.unwrap().to_vec();
        }
        received.field_names.push(name);
    }

    let mut log = state.received.lock().await;
    log.push(received);
    let count = log.len();
    drop(log);

    let reply = state
        .replies
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| Reply::ok(format!("https://cdn/upload-{}.jpg", count)));

    let status = StatusCode::from_u16(reply.status).unwrap();
    match reply.location {
        Some(location) => (status, [(header::LOCATION, location)], reply.body).into_response(),
        None => (status, reply.body).into_response(),
    }
}

async fn handle_login(State(state): State<Arc<BackendState>>) -> &'static str {
    state.login_hits.fetch_add(1, Ordering::SeqCst);
    "<html>login</html>"
}
