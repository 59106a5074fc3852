//! Configuration for atomgate
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use ethers_core::types::{Address, U256};
use ethers_core::utils::parse_ether;
use std::net::SocketAddr;
use std::time::Duration;

use crate::chain::networks;

/// atomgate - record store for Intuition atoms, stakes and transactions
#[derive(Parser, Debug, Clone)]
#[command(name = "atomgate")]
#[command(about = "REST record store mirroring Intuition protocol activity")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Maximum accepted request body size in bytes
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "1048576")]
    pub max_body_bytes: usize,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Connection settings shared by every `atomgate-cli` subcommand
#[derive(Parser, Debug, Clone)]
pub struct ClientArgs {
    /// Base URL of the atomgate REST surface
    #[arg(long, env = "API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// JSON-RPC endpoint holding the user's unlocked accounts.
    /// Without it no wallet is available and signing commands fail.
    #[arg(long, env = "WALLET_URL")]
    pub wallet_url: Option<String>,

    /// Read-only JSON-RPC endpoint (defaults to the network registry entry)
    #[arg(long, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Target chain id
    #[arg(long, env = "CHAIN_ID", default_value = "1337")]
    pub chain_id: u64,

    /// EthMultiVault contract address
    #[arg(long, env = "VAULT_ADDRESS")]
    pub vault_address: Address,

    /// AtomWallet contract address
    #[arg(long, env = "ATOM_WALLET_ADDRESS")]
    pub atom_wallet_address: Address,

    /// ERC-20 protocol token, if one is deployed on the target chain
    #[arg(long, env = "PROTOCOL_TOKEN_ADDRESS")]
    pub protocol_token_address: Option<Address>,

    /// Fee attached to atom creation, in ether
    #[arg(long, env = "CREATE_FEE_ETH", default_value = "0.0003")]
    pub create_fee_eth: String,

    /// Seconds to wait for a receipt before giving up
    #[arg(long, env = "CONFIRMATION_TIMEOUT_SECS", default_value = "120")]
    pub confirmation_timeout_secs: u64,

    /// Receipt, log and wallet polling interval in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value = "2000")]
    pub poll_interval_ms: u64,

    /// Timeout for a single JSON-RPC request in milliseconds
    #[arg(long, env = "RPC_TIMEOUT_MS", default_value = "30000")]
    pub rpc_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs (on stderr) as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl ClientArgs {
    /// Read endpoint: explicit `RPC_URL`, else the registry default
    pub fn effective_rpc_url(&self) -> Option<String> {
        self.rpc_url
            .clone()
            .or_else(|| networks::find(self.chain_id).map(|n| n.rpc_url.to_string()))
    }

    pub fn create_fee(&self) -> Result<U256, String> {
        parse_ether(self.create_fee_eth.as_str())
            .map_err(|e| format!("CREATE_FEE_ETH is not a valid ether amount: {e}"))
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if networks::find(self.chain_id).is_none() {
            return Err(format!(
                "CHAIN_ID {} is not a supported network",
                self.chain_id
            ));
        }
        if self.effective_rpc_url().is_none() {
            return Err("RPC_URL is required for this network".to_string());
        }
        self.create_fee()?;
        if self.confirmation_timeout_secs == 0 {
            return Err("CONFIRMATION_TIMEOUT_SECS must be greater than zero".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("POLL_INTERVAL_MS must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_defaults() {
        let args = Args::parse_from(["atomgate"]);
        assert_eq!(args.listen.port(), 5000);
        assert_eq!(args.max_body_bytes, 1024 * 1024);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_zero_body_limit_rejected() {
        let args = Args::parse_from(["atomgate", "--max-body-bytes", "0"]);
        assert!(args.validate().is_err());
    }

    fn client(extra: &[&str]) -> ClientArgs {
        let mut argv = vec![
            "atomgate-cli",
            "--vault-address",
            "0x1111111111111111111111111111111111111111",
            "--atom-wallet-address",
            "0x2222222222222222222222222222222222222222",
        ];
        argv.extend_from_slice(extra);
        ClientArgs::parse_from(argv)
    }

    #[test]
    fn test_client_defaults() {
        let args = client(&[]);
        assert_eq!(args.chain_id, 1337);
        assert_eq!(
            args.create_fee().unwrap(),
            U256::from(300_000_000_000_000u64)
        );
        assert_eq!(args.confirmation_timeout(), Duration::from_secs(120));
        assert_eq!(
            args.effective_rpc_url().as_deref(),
            Some("https://intuition-testnet.caldera.xyz")
        );
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_client_log_format() {
        assert!(!client(&[]).log_json);
        assert!(client(&["--log-json"]).log_json);
    }

    #[test]
    fn test_unsupported_chain_rejected() {
        let args = client(&["--chain-id", "42"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_bad_fee_rejected() {
        let args = client(&["--create-fee-eth", "lots"]);
        assert!(args.validate().is_err());
    }
}
