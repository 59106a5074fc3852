//! Static registry of supported networks

use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeCurrency {
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub block_explorer_url: &'static str,
    pub native_currency: NativeCurrency,
}

const ETH: NativeCurrency = NativeCurrency {
    name: "Ethereum",
    symbol: "ETH",
    decimals: 18,
};

pub const INTUITION_TESTNET: NetworkConfig = NetworkConfig {
    chain_id: 1337,
    name: "Intuition Testnet",
    rpc_url: "https://intuition-testnet.caldera.xyz",
    block_explorer_url: "https://intuition-testnet.explorer.caldera.xyz",
    native_currency: ETH,
};

pub const SUPPORTED_NETWORKS: &[NetworkConfig] = &[
    INTUITION_TESTNET,
    NetworkConfig {
        chain_id: 1,
        name: "Ethereum Mainnet",
        rpc_url: "https://mainnet.infura.io/v3/",
        block_explorer_url: "https://etherscan.io",
        native_currency: ETH,
    },
    NetworkConfig {
        chain_id: 11155111,
        name: "Sepolia Testnet",
        rpc_url: "https://sepolia.infura.io/v3/",
        block_explorer_url: "https://sepolia.etherscan.io",
        native_currency: ETH,
    },
];

pub fn find(chain_id: u64) -> Option<&'static NetworkConfig> {
    SUPPORTED_NETWORKS.iter().find(|n| n.chain_id == chain_id)
}

/// `0x`-prefixed lowercase hex, as wallets expect chain ids
pub fn hex_chain_id(chain_id: u64) -> String {
    format!("{chain_id:#x}")
}

/// Parse a chain id reported as hex quantity (`"0x539"`) or decimal
pub fn parse_chain_id(raw: &str) -> Option<u64> {
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => raw.parse().ok(),
    }
}

impl NetworkConfig {
    /// Parameter object for `wallet_addEthereumChain`
    pub fn add_chain_params(&self) -> Value {
        json!({
            "chainId": hex_chain_id(self.chain_id),
            "chainName": self.name,
            "rpcUrls": [self.rpc_url],
            "blockExplorerUrls": [self.block_explorer_url],
            "nativeCurrency": self.native_currency,
        })
    }

    pub fn explorer_tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.block_explorer_url.trim_end_matches('/'), hash)
    }
}
