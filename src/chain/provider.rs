//! EIP-1193 style wallet provider surface
//!
//! Anything that can answer `request(method, params)` and push
//! account/chain notifications can back a [`WalletConnector`]. The
//! JSON-RPC implementation lives in [`super::rpc::HttpProvider`]; tests
//! script their own.
//!
//! [`WalletClient`] plugs any provider into `ethers-providers`, so typed
//! reads, receipts and logs use [`ethers_providers::Middleware`] over the
//! same seam.
//!
//! [`WalletConnector`]: super::wallet::WalletConnector

use async_trait::async_trait;
use ethers_providers::{JsonRpcClient, JsonRpcError, RpcError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// User rejected the request
pub const USER_REJECTED: i64 = 4001;
/// The requested method is not supported by this provider
pub const UNSUPPORTED_METHOD: i64 = 4200;
/// `wallet_switchEthereumChain` for a chain the wallet does not know
pub const UNRECOGNIZED_CHAIN: i64 = 4902;
/// Execution reverted (JSON-RPC error code used by geth and most nodes)
pub const EXECUTION_REVERTED: i64 = 3;

/// Notifications pushed by the wallet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(u64),
    Disconnected,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn rpc(code: i64, message: impl Into<String>) -> Self {
        ProviderError::Rpc(JsonRpcError {
            code,
            message: message.into(),
            data: None,
        })
    }

    pub fn code(&self) -> Option<i64> {
        match self {
            ProviderError::Rpc(err) => Some(err.code),
            _ => None,
        }
    }
}

/// Error message with the node's decoded revert reason, when `data`
/// carries one as text
pub(crate) fn rpc_message(err: &JsonRpcError) -> String {
    match err.data.as_ref().and_then(Value::as_str) {
        Some(data) if !data.starts_with("0x") => format!("{}: {}", err.message, data),
        _ => err.message.clone(),
    }
}

impl RpcError for ProviderError {
    fn as_error_response(&self) -> Option<&JsonRpcError> {
        match self {
            ProviderError::Rpc(err) => Some(err),
            _ => None,
        }
    }

    fn as_serde_error(&self) -> Option<&serde_json::Error> {
        match self {
            ProviderError::InvalidResponse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProviderError> for ethers_providers::ProviderError {
    fn from(err: ProviderError) -> Self {
        ethers_providers::ProviderError::JsonRpcClientError(Box::new(err))
    }
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Send one JSON-RPC style request; `params` is a JSON array
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError>;

    /// Receive account/chain notifications from now on
    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// A [`WalletProvider`] as an ethers [`JsonRpcClient`]
#[derive(Clone)]
pub struct WalletClient(Arc<dyn WalletProvider>);

impl WalletClient {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self(provider)
    }
}

impl fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WalletClient")
    }
}

#[async_trait]
impl JsonRpcClient for WalletClient {
    type Error = ProviderError;

    async fn request<T, R>(&self, method: &str, params: T) -> Result<R, ProviderError>
    where
        T: fmt::Debug + Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let params = serde_json::to_value(params)?;
        let value = self.0.request(method, params).await?;
        Ok(serde_json::from_value(value)?)
    }
}
