//! In-process mock Git LFS server.
//!
//! Serves the batch API and a basic transfer adapter over an in-memory
//! object store. Runs on its own thread and runtime so synchronous tests can
//! point a client at it.
//!
//! Routes:
//! - `POST /objects/batch`: batch API
//! - `PUT /objects/:oid`: store content (SHA-256 must match the oid)
//! - `GET /objects/:oid`: fetch content
//! - `POST /verify`: confirm an upload (`{oid, size}`)

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{post, put};
use lfs_api::{
    Action, Actions, BatchRequest, BatchResponse, ErrorBody, ObjectError, ObjectResponse,
    ObjectSpec, Operation,
};
use parking_lot::RwLock;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::repo::sha256_hex;

struct ServerState {
    base_url: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
    fail_batch: AtomicBool,
}

/// Handle to a running mock server. Dropping it shuts the server down.
pub struct MockServer {
    state: Arc<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Bind `127.0.0.1` on an ephemeral port and start serving.
    pub fn start() -> std::io::Result<Self> {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let state = Arc::new(ServerState {
            base_url: format!("http://{addr}"),
            objects: RwLock::new(HashMap::new()),
            fail_batch: AtomicBool::new(false),
        });

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let router = Router::new()
            .route("/objects/batch", post(batch))
            .route("/objects/:oid", put(store_object).get(fetch_object))
            .route("/verify", post(verify))
            .with_state(state.clone());

        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let thread = std::thread::Builder::new()
            .name("lfs-mock-server".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    let listener = match tokio::net::TcpListener::from_std(listener) {
                        Ok(l) => l,
                        Err(e) => {
                            warn!(error = %e, "mock server failed to register listener");
                            return;
                        }
                    };
                    let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                        let _ = shutdown_rx.await;
                    });
                    if let Err(e) = serve.await {
                        warn!(error = %e, "mock server stopped");
                    }
                });
            })?;

        debug!(%addr, "mock LFS server listening");
        Ok(Self {
            state,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }

    /// API base URL to hand to an endpoint.
    pub fn api_url(&self) -> String {
        self.state.base_url.clone()
    }

    /// Make every batch request fail with 500.
    pub fn set_fail_batch(&self, fail: bool) {
        self.state.fail_batch.store(fail, Ordering::SeqCst);
    }

    /// Store an object directly, bypassing the API.
    pub fn insert(&self, content: &[u8]) -> String {
        let oid = sha256_hex(content);
        self.state
            .objects
            .write()
            .insert(oid.clone(), content.to_vec());
        oid
    }

    pub fn contains(&self, oid: &str) -> bool {
        self.state.objects.read().contains_key(oid)
    }

    pub fn object_count(&self) -> usize {
        self.state.objects.read().len()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        message: message.into(),
        documentation_url: None,
        request_id: None,
    };
    (status, axum::Json(body)).into_response()
}

fn is_valid_oid(oid: &str) -> bool {
    oid.len() == 64 && oid.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

async fn batch(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    if state.fail_batch.load(Ordering::SeqCst) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "batch API unavailable");
    }

    let request: BatchRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("malformed request: {e}")),
    };

    let Some(operation) = Operation::parse(&request.operation) else {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("unsupported operation {:?}", request.operation),
        );
    };

    let objects = state.objects.read();
    let response = BatchResponse {
        transfer: Some("basic".to_string()),
        objects: request
            .objects
            .iter()
            .map(|spec| batch_object(&state.base_url, &objects, operation, spec))
            .collect(),
    };

    (StatusCode::OK, axum::Json(response)).into_response()
}

fn batch_object(
    base_url: &str,
    objects: &HashMap<String, Vec<u8>>,
    operation: Operation,
    spec: &ObjectSpec,
) -> ObjectResponse {
    let mut entry = ObjectResponse {
        oid: spec.oid.clone(),
        size: spec.size,
        ..ObjectResponse::default()
    };

    let rejection = if !is_valid_oid(&spec.oid) {
        Some((422, "invalid object id"))
    } else if spec.size < 0 {
        Some((422, "invalid object size"))
    } else {
        None
    };
    if let Some((code, message)) = rejection {
        entry.error = Some(ObjectError {
            code,
            message: message.to_string(),
        });
        return entry;
    }

    let present = objects.contains_key(&spec.oid);
    let href = format!("{base_url}/objects/{}", spec.oid);
    match (operation, present) {
        (Operation::Upload, true) => {}
        (Operation::Upload, false) => {
            entry.actions = Some(Actions {
                upload: Some(Action::new(href)),
                verify: Some(Action::new(format!("{base_url}/verify"))),
                ..Actions::default()
            });
        }
        (Operation::Download, true) => {
            entry.actions = Some(Actions {
                download: Some(Action::new(href)),
                ..Actions::default()
            });
        }
        (Operation::Download, false) => {
            entry.error = Some(ObjectError {
                code: 404,
                message: "object does not exist".to_string(),
            });
        }
    }
    entry
}

async fn store_object(
    State(state): State<Arc<ServerState>>,
    Path(oid): Path<String>,
    body: Bytes,
) -> Response {
    let actual = sha256_hex(&body);
    if actual != oid {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("content hashes to {actual}, expected {oid}"),
        );
    }
    state.objects.write().insert(oid, body.to_vec());
    StatusCode::OK.into_response()
}

async fn fetch_object(State(state): State<Arc<ServerState>>, Path(oid): Path<String>) -> Response {
    match state.objects.read().get(&oid) {
        Some(content) => (StatusCode::OK, content.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "object does not exist"),
    }
}

async fn verify(State(state): State<Arc<ServerState>>, body: Bytes) -> Response {
    let spec: ObjectSpec = match serde_json::from_slice(&body) {
        Ok(s) => s,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, format!("malformed request: {e}")),
    };
    match state.objects.read().get(&spec.oid) {
        Some(content) if content.len() as i64 == spec.size => StatusCode::OK.into_response(),
        Some(content) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("size mismatch: stored {}, claimed {}", content.len(), spec.size),
        ),
        None => error_response(StatusCode::NOT_FOUND, "object does not exist"),
    }
}
