//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use clap::Parser;
use ethers_core::abi::{self, Token};
use ethers_core::types::{Address, Log, H256, U256, U64};
use ethers_core::utils::keccak256;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use atomgate::chain::provider::{UNRECOGNIZED_CHAIN, UNSUPPORTED_METHOD};
use atomgate::chain::{
    networks, ContractAddresses, ContractGateway, ProviderError, ProviderEvent, WalletConnector,
    WalletProvider,
};
use atomgate::config::Args;
use atomgate::records::RecordStore;
use atomgate::server::{self, AppState};

pub const ACCOUNT: &str = "0x1111111111111111111111111111111111111111";

pub fn vault() -> Address {
    Address::repeat_byte(0xaa)
}

pub fn atom_wallet() -> Address {
    Address::repeat_byte(0xbb)
}

fn topic(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

/// Vault `AtomCreated` log mined in `block` by transaction `tx`
pub fn atom_created_log(atom_id: u64, name: &str, block: u64, tx: u64) -> Log {
    Log {
        address: vault(),
        topics: vec![
            topic("AtomCreated(uint256,string,address)"),
            H256::from_low_u64_be(atom_id),
            H256::from(ACCOUNT.parse::<Address>().unwrap()),
        ],
        data: abi::encode(&[Token::String(name.to_string())]).into(),
        block_number: Some(U64::from(block)),
        transaction_hash: Some(H256::from_low_u64_be(tx)),
        log_index: Some(U256::zero()),
        ..Default::default()
    }
}

/// Vault `Staked` log mined in `block` by transaction `tx`
pub fn staked_log(atom_id: u64, amount: U256, block: u64, tx: u64) -> Log {
    Log {
        address: vault(),
        topics: vec![
            topic("Staked(uint256,address,uint256)"),
            H256::from_low_u64_be(atom_id),
            H256::from(ACCOUNT.parse::<Address>().unwrap()),
        ],
        data: abi::encode(&[Token::Uint(amount)]).into(),
        block_number: Some(U64::from(block)),
        transaction_hash: Some(H256::from_low_u64_be(tx)),
        log_index: Some(U256::zero()),
        ..Default::default()
    }
}

/// How the fake node answers `eth_getTransactionReceipt`
#[derive(Debug, Clone)]
pub enum ReceiptScript {
    /// Never mined
    Never,
    /// Mined with status 1 and an `AtomCreated` log carrying this id
    AtomCreated(u64),
    /// Mined with status 1 and no logs
    Success,
    /// Mined with status 0
    Reverted,
}

struct FakeState {
    accounts: Vec<String>,
    chain_id: u64,
    known_chains: Vec<u64>,
    receipt: ReceiptScript,
    sent: Vec<Value>,
    methods: Vec<String>,
    reject_send: bool,
    head: u64,
    logs: Vec<Log>,
    log_queries: Vec<(u64, u64)>,
    fail_logs_from: Option<u64>,
}

/// In-process wallet and node: answers the RPC methods the connector and
/// gateway use from a mutable script
pub struct FakeWallet {
    state: Mutex<FakeState>,
    events: broadcast::Sender<ProviderEvent>,
}

impl FakeWallet {
    pub fn new(chain_id: u64) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            state: Mutex::new(FakeState {
                accounts: vec![ACCOUNT.to_string()],
                chain_id,
                known_chains: vec![chain_id],
                receipt: ReceiptScript::Success,
                sent: Vec::new(),
                methods: Vec::new(),
                reject_send: false,
                head: 0x10,
                logs: Vec::new(),
                log_queries: Vec::new(),
                fail_logs_from: None,
            }),
            events,
        })
    }

    pub fn set_receipt(&self, script: ReceiptScript) {
        self.state.lock().unwrap().receipt = script;
    }

    pub fn set_accounts(&self, accounts: Vec<String>) {
        self.state.lock().unwrap().accounts = accounts;
    }

    pub fn reject_send(&self) {
        self.state.lock().unwrap().reject_send = true;
    }

    pub fn set_head(&self, head: u64) {
        self.state.lock().unwrap().head = head;
    }

    /// Logs served by `eth_getLogs`, filtered by block range
    pub fn set_logs(&self, logs: Vec<Log>) {
        self.state.lock().unwrap().logs = logs;
    }

    /// Make `eth_getLogs` fail for ranges starting at `block`
    pub fn fail_logs_from(&self, block: Option<u64>) {
        self.state.lock().unwrap().fail_logs_from = block;
    }

    /// `(fromBlock, toBlock)` of every `eth_getLogs` call so far
    pub fn log_queries(&self) -> Vec<(u64, u64)> {
        self.state.lock().unwrap().log_queries.clone()
    }

    pub fn chain_id(&self) -> u64 {
        self.state.lock().unwrap().chain_id
    }

    pub fn sent(&self) -> Vec<Value> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.state.lock().unwrap().methods.clone()
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn receipt(&self, hash: &Value) -> Value {
        let script = self.state.lock().unwrap().receipt.clone();
        let status = match script {
            ReceiptScript::Never => return Value::Null,
            ReceiptScript::Reverted => "0x0",
            _ => "0x1",
        };
        let logs = match script {
            ReceiptScript::AtomCreated(atom_id) => vec![json!({
                "address": vault(),
                "topics": [
                    H256::from(keccak256("AtomCreated(uint256,string,address)".as_bytes())),
                    H256::from_low_u64_be(atom_id),
                    H256::from(ACCOUNT.parse::<Address>().unwrap()),
                ],
                "data": "0x",
                "blockNumber": "0x10",
                "transactionHash": hash,
                "logIndex": "0x0",
            })],
            _ => vec![],
        };
        json!({
            "transactionHash": hash,
            "transactionIndex": "0x0",
            "blockHash": H256::repeat_byte(0x10),
            "from": ACCOUNT,
            "to": vault(),
            "cumulativeGasUsed": "0x5208",
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "status": status,
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0x3b9aca00",
            "logs": logs,
        })
    }

    fn logs(&self, params: &Value) -> Result<Value, ProviderError> {
        let block = |key: &str| {
            params[0][key]
                .as_str()
                .and_then(|b| u64::from_str_radix(b.trim_start_matches("0x"), 16).ok())
                .unwrap_or_default()
        };
        let (from, to) = (block("fromBlock"), block("toBlock"));

        let mut state = self.state.lock().unwrap();
        if state.fail_logs_from == Some(from) {
            return Err(ProviderError::Transport("connection reset".into()));
        }
        state.log_queries.push((from, to));
        let matching: Vec<&Log> = state
            .logs
            .iter()
            .filter(|log| {
                log.block_number
                    .map(|b| b.as_u64())
                    .is_some_and(|b| from <= b && b <= to)
            })
            .collect();
        Ok(json!(matching))
    }

    fn requested_chain(params: &Value) -> Option<u64> {
        params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(Value::as_str)
            .and_then(networks::parse_chain_id)
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.state.lock().unwrap().methods.push(method.to_string());

        match method {
            "eth_requestAccounts" | "eth_accounts" => {
                Ok(json!(self.state.lock().unwrap().accounts.clone()))
            }
            "eth_chainId" => Ok(json!(networks::hex_chain_id(self.chain_id()))),
            "eth_getBalance" => Ok(json!(U256::exp10(18))),
            "wallet_switchEthereumChain" => {
                let requested = Self::requested_chain(&params).unwrap_or_default();
                let mut state = self.state.lock().unwrap();
                if state.known_chains.contains(&requested) {
                    state.chain_id = requested;
                    Ok(Value::Null)
                } else {
                    Err(ProviderError::rpc(UNRECOGNIZED_CHAIN, "Unrecognized chain ID"))
                }
            }
            "wallet_addEthereumChain" => {
                let requested = Self::requested_chain(&params).unwrap_or_default();
                let mut state = self.state.lock().unwrap();
                state.known_chains.push(requested);
                state.chain_id = requested;
                Ok(Value::Null)
            }
            "eth_sendTransaction" => {
                let mut state = self.state.lock().unwrap();
                if state.reject_send {
                    return Err(ProviderError::rpc(4001, "User rejected the request"));
                }
                state.sent.push(params);
                let hash = H256::from_low_u64_be(state.sent.len() as u64);
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => Ok(self.receipt(&params[0])),
            "eth_blockNumber" => Ok(json!(U64::from(self.state.lock().unwrap().head))),
            "eth_getLogs" => self.logs(&params),
            _ => Err(ProviderError::rpc(UNSUPPORTED_METHOD, format!("{method} not scripted"))),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Connector and gateway over one fake, polling quickly
pub fn gateway(wallet: &Arc<FakeWallet>, timeout: Duration) -> (Arc<WalletConnector>, Arc<ContractGateway>) {
    let provider: Arc<dyn WalletProvider> = wallet.clone();
    let connector = Arc::new(WalletConnector::new(Some(Arc::clone(&provider)), None));
    let gateway = ContractGateway::new(
        provider,
        Arc::clone(&connector),
        ContractAddresses {
            vault: vault(),
            atom_wallet: atom_wallet(),
        },
    )
    .with_poll_interval(Duration::from_millis(10))
    .with_confirmation_timeout(timeout);
    (connector, Arc::new(gateway))
}

/// Start a server on an ephemeral port
pub async fn spawn_server(max_body_bytes: usize) -> (SocketAddr, Arc<RecordStore>) {
    let args = Args::parse_from([
        "atomgate",
        "--listen",
        "127.0.0.1:0",
        "--max-body-bytes",
        &max_body_bytes.to_string(),
    ]);
    let store = Arc::new(RecordStore::new());
    let state = Arc::new(AppState::with_store(args, Arc::clone(&store)));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server::serve(listener, state).await;
    });
    (addr, store)
}
