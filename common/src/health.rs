use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Request, Response, Server, StatusCode};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Read/write/shutdown timeouts the probe server is configured with.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTimeouts {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub shutdown_timeout: Duration,
}

/// Shared liveness/readiness state polled by the probe server.
///
/// Liveness is unconditional: the process is alive if it can answer HTTP at
/// all. Readiness flips to `true` once the StreamClass controller has listed
/// its CRD at least once, and is meant to keep a freshly-rolled replica out
/// of traffic-independent consideration (there's no Service in front of it,
/// but orchestrators still gate restarts on it) until startup work finishes.
pub struct HealthState {
    ready: AtomicBool,
}

impl HealthState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            ready: AtomicBool::new(false),
        })
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

fn respond(status: StatusCode) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(status.canonical_reason().unwrap_or_default()))
        .expect("building a static health response never fails")
}

fn route(req: &Request<Body>, state: &HealthState) -> Response<Body> {
    match req.uri().path() {
        "/startup" | "/health" => respond(StatusCode::OK),
        "/health/ready" => {
            if state.is_ready() {
                respond(StatusCode::OK)
            } else {
                respond(StatusCode::SERVICE_UNAVAILABLE)
            }
        }
        _ => respond(StatusCode::NOT_FOUND),
    }
}

async fn handle(req: Request<Body>, state: Arc<HealthState>, write_timeout: Duration) -> Result<Response<Body>, Infallible> {
    match tokio::time::timeout(write_timeout, async { route(&req, &state) }).await {
        Ok(response) => Ok(response),
        Err(_) => Ok(respond(StatusCode::GATEWAY_TIMEOUT)),
    }
}

/// Serves `/startup`, `/health` and `/health/ready` until `shutdown` fires,
/// applying `timeouts.read_timeout` to header reads and bounding graceful
/// shutdown by `timeouts.shutdown_timeout`.
pub async fn serve(addr: SocketAddr, state: Arc<HealthState>, shutdown: CancellationToken, timeouts: ProbeTimeouts) -> anyhow::Result<()> {
    let write_timeout = timeouts.write_timeout;
    let make_svc = make_service_fn(move |_conn| {
        let state = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, state.clone(), write_timeout))) }
    });

    info!(%addr, "starting health probe server");
    let shutdown_timeout = timeouts.shutdown_timeout;
    let shutdown_for_server = shutdown.clone();
    let server = Server::bind(&addr)
        .http1_header_read_timeout(timeouts.read_timeout)
        .serve(make_svc)
        .with_graceful_shutdown(async move { shutdown_for_server.cancelled().await });

    let forced_deadline = async move {
        shutdown.cancelled().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = server => {
            if let Err(err) = result {
                warn!(error = %err, "health probe server exited with an error");
            }
        }
        _ = forced_deadline => {
            warn!(?shutdown_timeout, "health probe server did not drain in-flight connections within the configured shutdown timeout");
        }
    }

    Ok(())
}
