//! Chain side: network registry, wallet session and contract calls

pub mod contracts;
pub mod error;
pub mod networks;
pub mod provider;
pub mod rpc;
pub mod wallet;

use ethers_core::types::U256;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use contracts::{
    AtomWalletCall, ChainEvent, ChainEventKind, ContractAddresses, ContractGateway,
    EventSubscription, OnChainAtom, PendingTx, Receipt, VaultCall,
};
pub use error::{ChainError, Result};
pub use networks::NetworkConfig;
pub use provider::{ProviderError, ProviderEvent, WalletClient, WalletProvider};
pub use rpc::HttpProvider;
pub use wallet::{Connection, Signer, WalletConnector, WalletState, WatchHandle};

/// Deserialize an RPC result, naming the method on failure
pub(crate) fn decode_json<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))
}

/// Hex quantity (`"0x1bc16d674ec80000"`)
pub(crate) fn decode_quantity(method: &str, value: Value) -> Result<U256> {
    decode_json(method, value)
}
