//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::Args;
use crate::records::RecordStore;
use crate::routes;
use crate::types::ApiError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// In-memory record store behind the REST surface
    pub store: Arc<RecordStore>,
    pub started_at: Instant,
}

impl AppState {
    /// Create AppState with an empty store
    pub fn new(args: Args) -> Self {
        Self::with_store(args, Arc::new(RecordStore::new()))
    }

    /// Create AppState over an existing store (shared with an in-process mirror)
    pub fn with_store(args: Args, store: Arc<RecordStore>) -> Self {
        Self {
            args,
            store,
            started_at: Instant::now(),
        }
    }
}

/// Bind `args.listen` and serve until the process exits
pub async fn run(state: Arc<AppState>) -> Result<(), ApiError> {
    let listener = TcpListener::bind(state.args.listen).await?;
    serve(listener, state).await
}

/// Serve connections from an already bound listener
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ApiError> {
    info!("atomgate listening on {}", listener.local_addr()?);
    info!(
        "Request bodies limited to {} bytes",
        state.args.max_body_bytes
    );

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        (Method::OPTIONS, _) => to_boxed(preflight_response()),

        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        (Method::GET, "/version") => to_boxed(routes::version_info()),

        (_, p) if p.starts_with("/api/") => {
            to_boxed(routes::handle_api_request(Arc::clone(&state), req).await)
        }

        _ => to_boxed(routes::not_found_response(&path)),
    };

    Ok(response)
}

/// Convert a Full<Bytes> body to BoxBody
fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap()
}
