//! Client-side error taxonomy

use ethers_providers::{JsonRpcError, RpcError};
use thiserror::Error;

use super::provider::{rpc_message, ProviderError, EXECUTION_REVERTED, USER_REJECTED};

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("No wallet provider is available")]
    WalletUnavailable,

    #[error("User rejected the request")]
    UserRejected,

    #[error("Unsupported network: chain {0}")]
    UnsupportedChain(u64),

    #[error("Wallet not connected")]
    NotInitialized,

    /// Revert reason, verbatim from the node
    #[error("{0}")]
    ChainRevert(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Transaction {hash} not confirmed within {secs}s")]
    ConfirmationTimeout { hash: String, secs: u64 },

    #[error("Provider error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("ABI error: {0}")]
    Abi(String),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

impl ChainError {
    /// Classify a provider failure
    pub fn from_provider(err: ProviderError) -> Self {
        match err {
            ProviderError::Rpc(rpc) => ChainError::from_rpc(&rpc),
            ProviderError::Transport(msg) => ChainError::NetworkError(msg),
            ProviderError::InvalidResponse(e) => ChainError::InvalidResponse(e.to_string()),
        }
    }

    fn from_rpc(err: &JsonRpcError) -> Self {
        let message = rpc_message(err);
        if err.code == USER_REJECTED {
            ChainError::UserRejected
        } else if err.code == EXECUTION_REVERTED || message.to_lowercase().contains("revert") {
            ChainError::ChainRevert(message)
        } else {
            ChainError::Provider {
                code: err.code,
                message,
            }
        }
    }
}

impl From<ProviderError> for ChainError {
    fn from(err: ProviderError) -> Self {
        ChainError::from_provider(err)
    }
}

/// Failures surfaced through `Middleware` calls
impl From<ethers_providers::ProviderError> for ChainError {
    fn from(err: ethers_providers::ProviderError) -> Self {
        match err {
            ethers_providers::ProviderError::JsonRpcClientError(inner) => {
                if let Some(rpc) = inner.as_error_response() {
                    ChainError::from_rpc(rpc)
                } else if let Some(e) = inner.as_serde_error() {
                    ChainError::InvalidResponse(e.to_string())
                } else {
                    ChainError::NetworkError(inner.to_string())
                }
            }
            ethers_providers::ProviderError::SerdeJson(e) => {
                ChainError::InvalidResponse(e.to_string())
            }
            other => ChainError::NetworkError(other.to_string()),
        }
    }
}

impl From<ethers_core::abi::Error> for ChainError {
    fn from(err: ethers_core::abi::Error) -> Self {
        ChainError::Abi(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
