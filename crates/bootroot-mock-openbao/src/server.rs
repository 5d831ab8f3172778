//! HTTP surface of the simulator
//!
//! Serves the three OpenBao endpoints the agent touches plus the test-only
//! `/control/*` API. All state lives in one [`SecretStore`] behind a mutex;
//! every handler takes the lock exactly once, so a control call that has
//! returned is visible to the very next read.

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::{future::Future, net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::{
    config::SimulatorConfig,
    control::{ControlError, FailNext, SetVersion},
    item::{SecretItem, SecretKey},
    payload,
    store::{ReadOutcome, SecretStore},
};

/// Failures starting or running the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    /// Host and port did not form a socket address.
    #[error("invalid bind address {address}: {source}")]
    InvalidAddress {
        /// The `host:port` string that failed to parse.
        address: String,
        /// Parser error.
        source: std::net::AddrParseError,
    },

    /// The listener could not be bound.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address the bind was attempted on.
        address: SocketAddr,
        /// OS error.
        source: std::io::Error,
    },

    /// The accept loop failed or the server task died.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Errors rendered as `{"errors": [...]}` bodies.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Unknown path, method or secret item (404).
    #[error("not found")]
    NotFound,

    /// Rejected control payload (400).
    #[error(transparent)]
    Control(#[from] ControlError),

    /// A read consumed an armed failure (500).
    #[error("injected failure for {0}")]
    InjectedFailure(SecretKey),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Control(_) => StatusCode::BAD_REQUEST,
            ApiError::InjectedFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "errors": [self.to_string()] });
        (self.status(), Json(body)).into_response()
    }
}

/// Shared state handed to every handler.
#[derive(Debug, Clone, Default)]
pub struct SimulatorState {
    store: Arc<Mutex<SecretStore>>,
}

impl SimulatorState {
    /// Fresh state with every key at its defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to the store.
    pub fn with_store<R>(&self, f: impl FnOnce(&mut SecretStore) -> R) -> R {
        let mut store = self.store.lock();
        f(&mut store)
    }
}

/// Build the router over `state`.
pub fn router(state: SimulatorState) -> Router {
    Router::new()
        .route("/v1/auth/approle/login", post(login).fallback(not_found))
        .route("/v1/sys/health", get(health).fallback(not_found))
        .route(
            "/v1/secret/data/bootroot/services/:service/:item",
            get(read_secret).fallback(not_found),
        )
        .route("/control/set-version", post(set_version).fallback(not_found))
        .route("/control/fail-next", post(fail_next).fallback(not_found))
        .route("/control/reset", post(reset).fallback(not_found))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn login() -> Json<Value> {
    Json(payload::login_response())
}

async fn health() -> Json<Value> {
    Json(payload::health_response())
}

async fn read_secret(
    State(state): State<SimulatorState>,
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    // Undecodable segments are a bad path shape, not a bad request.
    let Path((service, item)) = path.map_err(|rejection| {
        debug!(%rejection, "rejected secret path");
        ApiError::NotFound
    })?;
    let item: SecretItem = item.parse().map_err(|_| ApiError::NotFound)?;
    let key = SecretKey::new(service, item);

    match state.with_store(|store| store.read(&key)) {
        ReadOutcome::InjectedFailure { .. } => Err(ApiError::InjectedFailure(key)),
        ReadOutcome::Serve { version } => {
            Ok(Json(payload::render(&key.service, key.item, version)))
        }
    }
}

async fn set_version(
    State(state): State<SimulatorState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let req = SetVersion::from_body(&body)?;
    state.with_store(|store| store.set_version(req.key, req.version));
    Ok(ok())
}

async fn fail_next(
    State(state): State<SimulatorState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let req = FailNext::from_body(&body)?;
    state.with_store(|store| store.fail_next(req.key, req.count));
    Ok(ok())
}

async fn reset(State(state): State<SimulatorState>) -> Json<Value> {
    state.with_store(SecretStore::reset);
    ok()
}

async fn not_found() -> ApiError {
    debug!("unmatched request");
    ApiError::NotFound
}

fn ok() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// The simulator server.
#[derive(Debug)]
pub struct MockOpenBao {
    config: SimulatorConfig,
    state: SimulatorState,
}

/// A server running on a background task.
#[derive(Debug)]
pub struct RunningServer {
    /// Address actually bound (resolves port 0).
    pub addr: SocketAddr,
    /// State shared with the server, for direct inspection in tests.
    pub state: SimulatorState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<(), SimulatorError>>,
}

impl MockOpenBao {
    /// Create a server with fresh default state.
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            config,
            state: SimulatorState::new(),
        }
    }

    /// Handle to the state this server will serve.
    pub fn state(&self) -> SimulatorState {
        self.state.clone()
    }

    async fn bind(&self) -> Result<TcpListener, SimulatorError> {
        let address = self.config.bind_address();
        let addr: SocketAddr =
            address
                .parse()
                .map_err(|source| SimulatorError::InvalidAddress {
                    address: address.clone(),
                    source,
                })?;
        TcpListener::bind(addr)
            .await
            .map_err(|source| SimulatorError::Bind {
                address: addr,
                source,
            })
    }

    /// Serve until `shutdown` resolves.
    pub async fn serve_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), SimulatorError> {
        let listener = self.bind().await?;
        let local = listener.local_addr().map_err(SimulatorError::Serve)?;
        info!("mock OpenBao listening on {}", local);

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(SimulatorError::Serve)?;

        info!("mock OpenBao stopped");
        Ok(())
    }

    /// Bind now and serve on a background task.
    pub async fn spawn(self) -> Result<RunningServer, SimulatorError> {
        let listener = self.bind().await?;
        let addr = listener.local_addr().map_err(SimulatorError::Serve)?;
        let state = self.state.clone();
        let app = router(self.state);
        let (tx, rx) = oneshot::channel::<()>();

        info!("mock OpenBao listening on {}", addr);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .map_err(SimulatorError::Serve)
        });

        Ok(RunningServer {
            addr,
            state,
            shutdown: Some(tx),
            handle,
        })
    }
}

impl RunningServer {
    /// Base URL for clients, e.g. `http://127.0.0.1:18200`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections and wait for the server task.
    pub async fn shutdown(mut self) -> Result<(), SimulatorError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.handle.await {
            Ok(result) => result,
            Err(join) => Err(SimulatorError::Serve(std::io::Error::other(join))),
        }
    }
}
