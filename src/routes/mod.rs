//! HTTP routes for atomgate
//!
//! ## Routes
//!
//! - `GET/POST /api/atoms`, `GET/PUT /api/atoms/{id}`
//! - `GET/POST /api/transactions`, `GET/PUT /api/transactions/{hash}`
//! - `GET/POST /api/contract-events`
//! - `GET/POST /api/staking-positions[?user=|?atom=]`
//! - `GET /api/stats`
//! - `GET /health`, `GET /version`

pub mod atoms;
pub mod contract_events;
pub mod health;
pub mod staking;
pub mod stats;
pub mod transactions;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, warn};

use crate::server::AppState;
use crate::types::{ApiError, Result};

pub use health::{health_check, version_info};

/// Serialize `value` as a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Full<Bytes>>> {
    let body = serde_json::to_vec(value)?;
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Cache-Control", "no-store")
        .body(Full::new(Bytes::from(body)))
        .unwrap())
}

/// Map an error to its status and JSON body
pub fn error_response(err: &ApiError) -> Response<Full<Bytes>> {
    let status = err.status();
    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        warn!(status = status.as_u16(), error = %err, "Request rejected");
    }

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(err.body().to_string())))
        .unwrap()
}

/// Collect the request body, refusing anything over `limit` bytes
pub async fn read_body(req: Request<Incoming>, limit: usize) -> Result<Bytes> {
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(ApiError::PayloadTooLarge(limit));
    }

    match Limited::new(req.into_body(), limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(ApiError::PayloadTooLarge(limit))
        }
        Err(e) => Err(ApiError::Validation {
            entity: "request",
            issues: vec![crate::types::FieldIssue::new(
                "",
                format!("Failed to read request body: {e}"),
            )],
        }),
    }
}

/// `{prefix}{segment}` with a single non-empty trailing segment
fn tail<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
}

/// Route a request under `/api/`
pub async fn handle_api_request(state: Arc<AppState>, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().trim_end_matches('/').to_string();
    let query = req.uri().query().map(str::to_string);
    let limit = state.args.max_body_bytes;
    let store = &state.store;

    let result = match (method, path.as_str()) {
        (Method::GET, "/api/atoms") => atoms::list(store),
        (Method::POST, "/api/atoms") => match read_body(req, limit).await {
            Ok(body) => atoms::create(store, &body),
            Err(e) => Err(e),
        },
        (Method::GET, p) if tail(p, "/api/atoms/").is_some() => {
            atoms::get(store, tail(p, "/api/atoms/").unwrap_or_default())
        }
        (Method::PUT, p) if tail(p, "/api/atoms/").is_some() => {
            let id = tail(p, "/api/atoms/").unwrap_or_default().to_string();
            match read_body(req, limit).await {
                Ok(body) => atoms::update(store, &id, &body),
                Err(e) => Err(e),
            }
        }

        (Method::GET, "/api/transactions") => transactions::list(store),
        (Method::POST, "/api/transactions") => match read_body(req, limit).await {
            Ok(body) => transactions::create(store, &body),
            Err(e) => Err(e),
        },
        (Method::GET, p) if tail(p, "/api/transactions/").is_some() => {
            transactions::get(store, tail(p, "/api/transactions/").unwrap_or_default())
        }
        (Method::PUT, p) if tail(p, "/api/transactions/").is_some() => {
            let hash = tail(p, "/api/transactions/").unwrap_or_default().to_string();
            match read_body(req, limit).await {
                Ok(body) => transactions::update(store, &hash, &body),
                Err(e) => Err(e),
            }
        }

        (Method::GET, "/api/contract-events") => contract_events::list(store),
        (Method::POST, "/api/contract-events") => match read_body(req, limit).await {
            Ok(body) => contract_events::create(store, &body),
            Err(e) => Err(e),
        },

        (Method::GET, "/api/staking-positions") => staking::list(store, query.as_deref()),
        (Method::POST, "/api/staking-positions") => match read_body(req, limit).await {
            Ok(body) => staking::create(store, &body),
            Err(e) => Err(e),
        },

        (Method::GET, "/api/stats") => stats::get(store),

        _ => return not_found_response(&path),
    };

    result.unwrap_or_else(|e| error_response(&e))
}

/// Not found response
pub fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": "Not Found",
        "path": path,
    });

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
