//! RPC server assembly and lifecycle.
//!
//! [`RpcServerBuilder`] collects service routers, the authenticator and the
//! exemption list, then wraps everything in the interceptor chain:
//!
//! 1. request logging (`tower-http` trace spans)
//! 2. panic recovery (a panicking handler becomes `Internal`)
//! 3. authentication
//! 4. per-call deadline
//!
//! [`RpcServerBuilder::start`] binds the listener and serves on a background
//! task; [`RunningServer::stop`] drains in-flight calls within the configured
//! timeout and cancels whatever is still running after it.

use std::any::Any;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use thiserror::Error;
use tokio::{
    net::TcpListener,
    sync::{oneshot, watch},
    task::JoinHandle,
};
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use super::Status;
use super::auth::{AuthGate, Authenticator, authenticate};
use super::protocol::{HealthResponse, TIMEOUT_HEADER, methods};
use crate::Result;
use crate::config::ServerConfig;

/// Server lifecycle errors.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("no authenticator configured")]
    MissingAuthenticator,

    #[error("server task failed: {reason}")]
    Task { reason: String },
}

/// Collects routes and settings, then starts a [`RunningServer`].
pub struct RpcServerBuilder {
    config: ServerConfig,
    router: Router,
    authenticator: Option<Arc<dyn Authenticator>>,
    exempt: HashSet<String>,
}

impl RpcServerBuilder {
    pub fn new(config: ServerConfig) -> Self {
        let mut exempt = HashSet::new();
        exempt.insert(methods::HEALTH.to_string());

        Self {
            config,
            router: Router::new().route(methods::HEALTH, get(health)),
            authenticator: None,
            exempt,
        }
    }

    /// Register a service's routes.
    pub fn service(mut self, routes: Router) -> Self {
        self.router = self.router.merge(routes);
        self
    }

    pub fn authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// Let `method` through without authentication.
    pub fn exempt(mut self, method: impl Into<String>) -> Self {
        self.exempt.insert(method.into());
        self
    }

    /// The fully layered router, without binding a listener.
    pub fn into_router(self) -> Result<Router> {
        self.layered(InFlight::new())
    }

    fn layered(self, in_flight: InFlight) -> Result<Router> {
        let authenticator = self
            .authenticator
            .ok_or(ServerError::MissingAuthenticator)?;
        let gate = AuthGate::new(authenticator, self.exempt);

        // ServiceBuilder applies top to bottom: the first layer is outermost.
        let chain = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(middleware::from_fn_with_state(in_flight, track_in_flight))
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(gate, authenticate))
            .layer(middleware::from_fn_with_state(
                self.config.max_request_timeout,
                enforce_deadline,
            ));

        Ok(self.router.layer(chain))
    }

    /// Bind the listener and start serving in the background.
    pub async fn start(self) -> Result<RunningServer> {
        let address = self.config.listen_addr;
        let drain_timeout = self.config.drain_timeout;
        let in_flight = InFlight::new();
        let router = self.layered(in_flight.clone())?;

        let listener = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind { address, source })?;
        // The resolved address matters when binding port 0.
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { address, source })?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!(component = "rpc", address = %local_addr, "server listening");

        Ok(RunningServer {
            local_addr,
            drain_timeout,
            in_flight,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }
}

/// A server serving on a background task.
#[derive(Debug)]
pub struct RunningServer {
    local_addr: SocketAddr,
    drain_timeout: Duration,
    in_flight: InFlight,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight calls.
    ///
    /// Calls still running when the drain timeout elapses are cancelled, and
    /// this returns only once none of them is running any more.
    pub async fn stop(mut self) -> Result<()> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        match tokio::time::timeout(self.drain_timeout, &mut self.handle).await {
            Ok(Ok(Ok(()))) => {
                info!(component = "rpc", address = %self.local_addr, "server stopped");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(ServerError::Task {
                reason: e.to_string(),
            }
            .into()),
            Ok(Err(e)) => Err(ServerError::Task {
                reason: e.to_string(),
            }
            .into()),
            Err(_) => {
                warn!(
                    component = "rpc",
                    timeout = ?self.drain_timeout,
                    active = self.in_flight.active(),
                    "drain timeout elapsed, cancelling in-flight calls"
                );
                self.in_flight.cancel();
                self.in_flight.idle().await;
                self.handle.abort();
                let _ = (&mut self.handle).await;
                Ok(())
            }
        }
    }
}

/// Counts running calls and lets the server cancel them.
#[derive(Debug, Clone)]
struct InFlight {
    active: Arc<watch::Sender<usize>>,
    cancelled: Arc<watch::Sender<bool>>,
}

impl InFlight {
    fn new() -> Self {
        Self {
            active: Arc::new(watch::Sender::new(0)),
            cancelled: Arc::new(watch::Sender::new(false)),
        }
    }

    fn active(&self) -> usize {
        *self.active.borrow()
    }

    fn cancel(&self) {
        self.cancelled.send_replace(true);
    }

    async fn idle(&self) {
        let mut active = self.active.subscribe();
        let _ = active.wait_for(|count| *count == 0).await;
    }

    fn enter(&self) -> CallGuard {
        self.active.send_modify(|count| *count += 1);
        CallGuard {
            active: self.active.clone(),
        }
    }
}

/// Decrements the running-call count when the call's future is dropped.
struct CallGuard {
    active: Arc<watch::Sender<usize>>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.active.send_modify(|count| *count -= 1);
    }
}

/// Run the call unless the server cancels it first.
async fn track_in_flight(
    State(in_flight): State<InFlight>,
    request: Request,
    next: Next,
) -> Response {
    let mut cancelled = in_flight.cancelled.subscribe();
    if *cancelled.borrow() {
        return Status::unavailable("server is shutting down").into_response();
    }

    let _guard = in_flight.enter();
    tokio::select! {
        response = next.run(request) => response,
        _ = cancelled.wait_for(|cancelled| *cancelled) => {
            Status::unavailable("server is shutting down").into_response()
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else {
        "unknown panic"
    };
    error!(component = "rpc", panic = detail, "handler panicked");

    Status::internal("internal error").into_response()
}

/// Bound the call by the caller's requested deadline, capped at `max`.
async fn enforce_deadline(State(max): State<Duration>, request: Request, next: Next) -> Response {
    let requested = match request.headers().get(TIMEOUT_HEADER) {
        None => None,
        Some(value) => match value.to_str().ok().and_then(|v| v.trim().parse::<u64>().ok()) {
            Some(millis) => Some(Duration::from_millis(millis)),
            None => {
                return Status::invalid_argument(format!("invalid {TIMEOUT_HEADER} header"))
                    .into_response();
            }
        },
    };
    let deadline = requested.map_or(max, |requested| requested.min(max));

    match tokio::time::timeout(deadline, next.run(request)).await {
        Ok(response) => response,
        Err(_) => Status::deadline_exceeded("deadline exceeded").into_response(),
    }
}
