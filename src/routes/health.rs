//! Liveness and build information

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;

use crate::chain::networks;
use crate::server::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    /// Seconds since the server started
    pub uptime: u64,
    pub timestamp: String,
    pub total_atoms: usize,
    pub total_transactions: usize,
}

/// Handle liveness probe (/health)
pub fn health_check(state: Arc<AppState>) -> Response<Full<Bytes>> {
    let response = HealthResponse {
        healthy: true,
        version: env!("CARGO_PKG_VERSION"),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        total_atoms: state.store.stats().total_atoms,
        total_transactions: state.store.list_transactions().len(),
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"healthy":true,"error":"Serialization failed"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

/// Build stamp and the chains this build knows about
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionResponse {
    pub service: &'static str,
    pub version: &'static str,
    /// Short commit hash, `-dirty` when built from a modified tree
    pub commit: &'static str,
    pub built_at: &'static str,
    pub supported_chains: Vec<u64>,
}

/// Handle version endpoint (/version)
pub fn version_info() -> Response<Full<Bytes>> {
    let response = VersionResponse {
        service: "atomgate",
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("ATOMGATE_COMMIT").unwrap_or("unknown"),
        built_at: option_env!("ATOMGATE_BUILT_AT").unwrap_or("unknown"),
        supported_chains: networks::SUPPORTED_NETWORKS
            .iter()
            .map(|n| n.chain_id)
            .collect(),
    };

    let body = serde_json::to_string(&response)
        .unwrap_or_else(|_| r#"{"service":"atomgate","version":"unknown"}"#.to_string());

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_version_reports_build_stamp() {
        let response = version_info();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["service"], "atomgate");
        assert_ne!(json["commit"], "");
        assert_ne!(json["builtAt"], "unknown");
        assert_eq!(json["supportedChains"][0], 1337);
    }
}
