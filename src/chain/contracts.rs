//! EthMultiVault and AtomWallet calls
//!
//! Each contract method is a variant of a call enum carrying its typed
//! arguments. Encoding is `selector ++ abi(args)`; return values are
//! decoded by a dedicated function per method.
//!
//! Reads, receipts and logs go through an `ethers-providers`
//! [`Provider`] over the read endpoint. Writes need a connected
//! [`Signer`](super::Signer) and return a [`PendingTx`] immediately;
//! [`ContractGateway::wait_for_confirmation`] polls for the receipt under
//! an explicit timeout.

use ethers_core::abi::{self, ParamType, Token};
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{
    Address, Bytes, Filter, Log, TransactionReceipt, TransactionRequest, H256, U256, U64,
};
use ethers_core::utils::{id, keccak256};
use ethers_providers::{Middleware, Provider};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::{ChainError, Result};
use super::provider::{WalletClient, WalletProvider};
use super::wallet::WalletConnector;

/// 0.0003 ETH
pub const DEFAULT_CREATE_FEE_WEI: u64 = 300_000_000_000_000;
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// `AtomCreated` is the first log of a creation receipt; its first indexed
/// topic (after the signature hash) is the new atom id.
pub const ATOM_ID_LOG_INDEX: usize = 0;
pub const ATOM_ID_TOPIC_INDEX: usize = 1;

pub const ATOM_CREATED_EVENT: &str = "AtomCreated(uint256,string,address)";
pub const STAKED_EVENT: &str = "Staked(uint256,address,uint256)";

const EVENT_BUFFER: usize = 256;

/// Widest block range asked of `eth_getLogs` in one request
pub const MAX_LOG_RANGE: u64 = 2000;

fn selector_and_args(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend(abi::encode(args));
    Bytes::from(data)
}

/// EthMultiVault methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultCall {
    CreateAtom { name: String, data: String },
    Stake { atom_id: U256 },
    GetAtom { atom_id: U256 },
    GetAtomCount,
    GetUserStake { atom_id: U256, user: Address },
}

impl VaultCall {
    pub fn signature(&self) -> &'static str {
        match self {
            VaultCall::CreateAtom { .. } => "createAtom(string,string)",
            VaultCall::Stake { .. } => "stake(uint256)",
            VaultCall::GetAtom { .. } => "getAtom(uint256)",
            VaultCall::GetAtomCount => "getAtomCount()",
            VaultCall::GetUserStake { .. } => "getUserStake(uint256,address)",
        }
    }

    pub fn encode(&self) -> Bytes {
        let args = match self {
            VaultCall::CreateAtom { name, data } => {
                vec![Token::String(name.clone()), Token::String(data.clone())]
            }
            VaultCall::Stake { atom_id } | VaultCall::GetAtom { atom_id } => {
                vec![Token::Uint(*atom_id)]
            }
            VaultCall::GetAtomCount => vec![],
            VaultCall::GetUserStake { atom_id, user } => {
                vec![Token::Uint(*atom_id), Token::Address(*user)]
            }
        };
        selector_and_args(self.signature(), &args)
    }
}

/// AtomWallet methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtomWalletCall {
    GetOwner,
    Execute { to: Address, value: U256, data: Bytes },
    GetBalance,
}

impl AtomWalletCall {
    pub fn signature(&self) -> &'static str {
        match self {
            AtomWalletCall::GetOwner => "getOwner()",
            AtomWalletCall::Execute { .. } => "execute(address,uint256,bytes)",
            AtomWalletCall::GetBalance => "getBalance()",
        }
    }

    pub fn encode(&self) -> Bytes {
        let args = match self {
            AtomWalletCall::GetOwner | AtomWalletCall::GetBalance => vec![],
            AtomWalletCall::Execute { to, value, data } => vec![
                Token::Address(*to),
                Token::Uint(*value),
                Token::Bytes(data.to_vec()),
            ],
        };
        selector_and_args(self.signature(), &args)
    }
}

/// `getAtom` return tuple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainAtom {
    pub name: String,
    pub data: String,
    pub creator: Address,
    pub total_stake: U256,
    pub stakeholder_count: U256,
}

pub fn decode_atom(output: &[u8]) -> Result<OnChainAtom> {
    let tuple = ParamType::Tuple(vec![
        ParamType::String,
        ParamType::String,
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
    ]);
    let mut tokens = abi::decode(&[tuple], output)?;
    let fields = tokens
        .pop()
        .and_then(Token::into_tuple)
        .ok_or_else(|| ChainError::Abi("getAtom: expected a tuple".into()))?;

    let mut fields = fields.into_iter();
    let mut next = || {
        fields
            .next()
            .ok_or_else(|| ChainError::Abi("getAtom: short tuple".into()))
    };
    let bad = |field: &str| ChainError::Abi(format!("getAtom: bad {field}"));

    Ok(OnChainAtom {
        name: next()?.into_string().ok_or_else(|| bad("name"))?,
        data: next()?.into_string().ok_or_else(|| bad("data"))?,
        creator: next()?.into_address().ok_or_else(|| bad("creator"))?,
        total_stake: next()?.into_uint().ok_or_else(|| bad("totalStake"))?,
        stakeholder_count: next()?.into_uint().ok_or_else(|| bad("stakeholderCount"))?,
    })
}

pub fn decode_uint(output: &[u8]) -> Result<U256> {
    abi::decode(&[ParamType::Uint(256)], output)?
        .pop()
        .and_then(Token::into_uint)
        .ok_or_else(|| ChainError::Abi("expected uint256".into()))
}

pub fn decode_address(output: &[u8]) -> Result<Address> {
    abi::decode(&[ParamType::Address], output)?
        .pop()
        .and_then(Token::into_address)
        .ok_or_else(|| ChainError::Abi("expected address".into()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "call", rename_all = "camelCase")]
pub enum SubmittedCall {
    CreateAtom,
    Stake { atom_id: U256 },
    WalletExecute,
}

/// A submitted, not yet mined transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTx {
    pub hash: H256,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub chain_id: u64,
    pub call: SubmittedCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub hash: H256,
    pub success: bool,
    pub block_number: Option<u64>,
    pub gas_used: Option<U256>,
    pub effective_gas_price: Option<U256>,
    pub logs: Vec<Log>,
}

impl Receipt {
    /// Id assigned by the vault to a freshly created atom
    pub fn created_atom_id(&self) -> Result<U256> {
        self.logs
            .get(ATOM_ID_LOG_INDEX)
            .and_then(|log| log.topics.get(ATOM_ID_TOPIC_INDEX))
            .map(|topic| U256::from_big_endian(topic.as_bytes()))
            .ok_or_else(|| {
                ChainError::Abi(format!(
                    "receipt {:?} has no atom id at log {ATOM_ID_LOG_INDEX} topic {ATOM_ID_TOPIC_INDEX}",
                    self.hash
                ))
            })
    }
}

impl From<TransactionReceipt> for Receipt {
    fn from(raw: TransactionReceipt) -> Self {
        Receipt {
            hash: raw.transaction_hash,
            // Pre-Byzantium receipts carry no status
            success: raw.status.map_or(true, |s| s == U64::one()),
            block_number: raw.block_number.map(|b| b.as_u64()),
            gas_used: raw.gas_used,
            effective_gas_price: raw.effective_gas_price,
            logs: raw.logs,
        }
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum ChainEventKind {
    AtomCreated {
        atom_id: U256,
        name: String,
        creator: Address,
    },
    Staked {
        atom_id: U256,
        staker: Address,
        amount: U256,
    },
}

/// A decoded vault log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEvent {
    pub contract: Address,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<H256>,
    pub kind: ChainEventKind,
}

fn topic_hash(signature: &str) -> H256 {
    H256::from(keccak256(signature.as_bytes()))
}

fn topic_uint(log: &Log, index: usize) -> Result<U256> {
    log.topics
        .get(index)
        .map(|t| U256::from_big_endian(t.as_bytes()))
        .ok_or_else(|| ChainError::Abi(format!("log is missing topic {index}")))
}

fn topic_address(log: &Log, index: usize) -> Result<Address> {
    log.topics
        .get(index)
        .map(|t| Address::from_slice(&t.as_bytes()[12..]))
        .ok_or_else(|| ChainError::Abi(format!("log is missing topic {index}")))
}

impl ChainEvent {
    /// Decode a vault log; `Ok(None)` for logs of other events
    pub fn from_log(log: &Log) -> Result<Option<Self>> {
        let Some(signature) = log.topics.first() else {
            return Ok(None);
        };

        let kind = if *signature == topic_hash(ATOM_CREATED_EVENT) {
            let name = abi::decode(&[ParamType::String], &log.data)?
                .pop()
                .and_then(Token::into_string)
                .ok_or_else(|| ChainError::Abi("AtomCreated: expected name".into()))?;
            ChainEventKind::AtomCreated {
                atom_id: topic_uint(log, 1)?,
                name,
                creator: topic_address(log, 2)?,
            }
        } else if *signature == topic_hash(STAKED_EVENT) {
            ChainEventKind::Staked {
                atom_id: topic_uint(log, 1)?,
                staker: topic_address(log, 2)?,
                amount: decode_uint(&log.data)?,
            }
        } else {
            return Ok(None);
        };

        Ok(Some(ChainEvent {
            contract: log.address,
            block_number: log.block_number.map(|b| b.as_u64()),
            transaction_hash: log.transaction_hash,
            kind,
        }))
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            ChainEventKind::AtomCreated { .. } => "AtomCreated",
            ChainEventKind::Staked { .. } => "Staked",
        }
    }

    /// Event arguments as JSON, numbers as decimal strings
    pub fn payload(&self) -> Value {
        match &self.kind {
            ChainEventKind::AtomCreated {
                atom_id,
                name,
                creator,
            } => json!({
                "atomId": atom_id.to_string(),
                "name": name,
                "creator": format!("{creator:?}"),
            }),
            ChainEventKind::Staked {
                atom_id,
                staker,
                amount,
            } => json!({
                "atomId": atom_id.to_string(),
                "staker": format!("{staker:?}"),
                "amount": amount.to_string(),
            }),
        }
    }
}

/// Live vault events; dropping it stops the poller
pub struct EventSubscription {
    events: mpsc::Receiver<ChainEvent>,
    task: JoinHandle<()>,
}

impl EventSubscription {
    /// Next event, or `None` once the poller has stopped
    pub async fn recv(&mut self) -> Option<ChainEvent> {
        self.events.recv().await
    }
}

impl Drop for EventSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Gateway
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractAddresses {
    pub vault: Address,
    pub atom_wallet: Address,
}

pub struct ContractGateway {
    reader: Provider<WalletClient>,
    connector: Arc<WalletConnector>,
    addresses: ContractAddresses,
    create_fee: U256,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl ContractGateway {
    /// `reader` serves read-only calls, receipts and logs; writes go through
    /// the connector's signer.
    pub fn new(
        reader: Arc<dyn WalletProvider>,
        connector: Arc<WalletConnector>,
        addresses: ContractAddresses,
    ) -> Self {
        Self {
            reader: Provider::new(WalletClient::new(reader)),
            connector,
            addresses,
            create_fee: U256::from(DEFAULT_CREATE_FEE_WEI),
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_create_fee(mut self, fee: U256) -> Self {
        self.create_fee = fee;
        self
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn addresses(&self) -> ContractAddresses {
        self.addresses
    }

    pub fn create_fee(&self) -> U256 {
        self.create_fee
    }

    pub fn connector(&self) -> &Arc<WalletConnector> {
        &self.connector
    }

    async fn submit(&self, to: Address, value: U256, data: Bytes, call: SubmittedCall) -> Result<PendingTx> {
        let signer = self.connector.signer()?;
        let hash = signer.send_transaction(to, value, data).await?;

        info!(hash = ?hash, from = ?signer.address(), call = ?call, "Transaction submitted");
        Ok(PendingTx {
            hash,
            from: signer.address(),
            to,
            value,
            chain_id: signer.chain_id(),
            call,
        })
    }

    /// `createAtom(name, description)` with the creation fee attached
    pub async fn submit_create_identity(&self, name: &str, description: &str) -> Result<PendingTx> {
        let call = VaultCall::CreateAtom {
            name: name.to_string(),
            data: description.to_string(),
        };
        self.submit(self.addresses.vault, self.create_fee, call.encode(), SubmittedCall::CreateAtom)
            .await
    }

    /// `stake(atomId)` with `amount` wei attached
    pub async fn submit_stake(&self, atom_id: U256, amount: U256) -> Result<PendingTx> {
        let call = VaultCall::Stake { atom_id };
        self.submit(self.addresses.vault, amount, call.encode(), SubmittedCall::Stake { atom_id })
            .await
    }

    /// `execute(to, value, data)` on the AtomWallet
    pub async fn submit_wallet_execute(&self, to: Address, value: U256, data: Bytes) -> Result<PendingTx> {
        let call = AtomWalletCall::Execute { to, value, data };
        self.submit(self.addresses.atom_wallet, U256::zero(), call.encode(), SubmittedCall::WalletExecute)
            .await
    }

    async fn poll_receipt(&self, hash: H256) -> Result<Receipt> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        loop {
            ticker.tick().await;
            match self.reader.get_transaction_receipt(hash).await? {
                Some(raw) => return Ok(Receipt::from(raw)),
                None => debug!(hash = ?hash, "Receipt not available yet"),
            }
        }
    }

    /// Poll for the receipt until it appears or the timeout expires
    pub async fn wait_for_confirmation(&self, pending: &PendingTx) -> Result<Receipt> {
        let receipt = tokio::time::timeout(self.confirmation_timeout, self.poll_receipt(pending.hash))
            .await
            .map_err(|_| ChainError::ConfirmationTimeout {
                hash: format!("{:?}", pending.hash),
                secs: self.confirmation_timeout.as_secs(),
            })??;

        info!(
            hash = ?receipt.hash,
            success = receipt.success,
            block = ?receipt.block_number,
            "Transaction mined"
        );
        Ok(receipt)
    }

    async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        Ok(self.reader.call(&tx, None).await?)
    }

    pub async fn read_identity(&self, atom_id: U256) -> Result<OnChainAtom> {
        let output = self
            .eth_call(self.addresses.vault, VaultCall::GetAtom { atom_id }.encode())
            .await?;
        decode_atom(&output)
    }

    /// Stake of `user` on `atom_id`, in wei
    pub async fn read_stake(&self, atom_id: U256, user: Address) -> Result<U256> {
        let output = self
            .eth_call(
                self.addresses.vault,
                VaultCall::GetUserStake { atom_id, user }.encode(),
            )
            .await?;
        decode_uint(&output)
    }

    pub async fn read_atom_count(&self) -> Result<U256> {
        let output = self
            .eth_call(self.addresses.vault, VaultCall::GetAtomCount.encode())
            .await?;
        decode_uint(&output)
    }

    pub async fn atom_wallet_owner(&self) -> Result<Address> {
        let output = self
            .eth_call(self.addresses.atom_wallet, AtomWalletCall::GetOwner.encode())
            .await?;
        decode_address(&output)
    }

    pub async fn atom_wallet_balance(&self) -> Result<U256> {
        let output = self
            .eth_call(self.addresses.atom_wallet, AtomWalletCall::GetBalance.encode())
            .await?;
        decode_uint(&output)
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.reader.get_block_number().await?.as_u64())
    }

    async fn vault_logs(&self, from: u64, to: u64) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(self.addresses.vault)
            .from_block(from)
            .to_block(to)
            .events([ATOM_CREATED_EVENT, STAKED_EVENT]);
        Ok(self.reader.get_logs(&filter).await?)
    }

    /// Follow `AtomCreated` and `Staked` from `from_block` (or from the
    /// current head when `None`).
    ///
    /// Each tick walks from the cursor to the head in ranges of at most
    /// [`MAX_LOG_RANGE`] blocks, advancing after every range. A failed
    /// request is logged and retried from the same block on the next tick.
    pub fn subscribe_events(self: &Arc<Self>, from_block: Option<u64>) -> EventSubscription {
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let gateway = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(gateway.poll_interval);
            let mut next_block = from_block;

            loop {
                ticker.tick().await;

                let head = match gateway.block_number().await {
                    Ok(head) => head,
                    Err(e) => {
                        warn!(error = %e, "Failed to read block number");
                        continue;
                    }
                };
                let mut from = *next_block.get_or_insert(head);

                while let Some(to) = log_range_end(from, head) {
                    let logs = match gateway.vault_logs(from, to).await {
                        Ok(logs) => logs,
                        Err(e) => {
                            warn!(from, to, error = %e, "Failed to fetch vault logs");
                            break;
                        }
                    };

                    for log in &logs {
                        match ChainEvent::from_log(log) {
                            Ok(Some(event)) => {
                                if tx.send(event).await.is_err() {
                                    return;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => warn!(tx = ?log.transaction_hash, error = %e, "Undecodable vault log"),
                        }
                    }

                    from = to + 1;
                    next_block = Some(from);
                }
            }
        });

        EventSubscription { events, task }
    }
}

/// Last block of the next `eth_getLogs` range starting at `from`, or `None`
/// when `from` is already past `head`
fn log_range_end(from: u64, head: u64) -> Option<u64> {
    (from <= head).then(|| head.min(from.saturating_add(MAX_LOG_RANGE - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    #[test]
    fn test_selectors() {
        // Well-known ERC-20 selector as a sanity check of the helper
        assert_eq!(hex::encode(id("balanceOf(address)")), "70a08231");

        let data = VaultCall::GetAtomCount.encode();
        assert_eq!(data.len(), 4);
        assert_eq!(&data[..], &id("getAtomCount()")[..]);
    }

    #[test]
    fn test_stake_encoding() {
        let data = VaultCall::Stake {
            atom_id: U256::from(7u64),
        }
        .encode();
        assert_eq!(&data[..4], &id("stake(uint256)")[..]);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 7);
    }

    #[test]
    fn test_create_atom_encoding_decodes_back() {
        let data = VaultCall::CreateAtom {
            name: "Rust".into(),
            data: "A language".into(),
        }
        .encode();
        let tokens = abi::decode(&[ParamType::String, ParamType::String], &data[4..]).unwrap();
        assert_eq!(tokens[0], Token::String("Rust".into()));
        assert_eq!(tokens[1], Token::String("A language".into()));
    }

    #[test]
    fn test_decode_atom() {
        let encoded = abi::encode(&[Token::Tuple(vec![
            Token::String("Rust".into()),
            Token::String("ipfs://x".into()),
            Token::Address(addr(0x11)),
            Token::Uint(U256::from(5u64)),
            Token::Uint(U256::from(2u64)),
        ])]);
        let atom = decode_atom(&encoded).unwrap();
        assert_eq!(atom.name, "Rust");
        assert_eq!(atom.creator, addr(0x11));
        assert_eq!(atom.stakeholder_count, U256::from(2u64));
    }

    #[test]
    fn test_decode_short_output_fails() {
        assert!(matches!(decode_uint(&[1, 2, 3]), Err(ChainError::Abi(_))));
    }

    fn atom_created_log(atom_id: u64, creator: Address) -> Log {
        Log {
            address: addr(0xaa),
            topics: vec![
                topic_hash(ATOM_CREATED_EVENT),
                H256::from_low_u64_be(atom_id),
                H256::from(creator),
            ],
            data: Bytes::from(abi::encode(&[Token::String("Rust".into())])),
            block_number: Some(U64::from(12u64)),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_atom_created_log() {
        let event = ChainEvent::from_log(&atom_created_log(42, addr(0x11)))
            .unwrap()
            .unwrap();
        assert_eq!(event.name(), "AtomCreated");
        assert_eq!(event.block_number, Some(12));
        assert_eq!(
            event.kind,
            ChainEventKind::AtomCreated {
                atom_id: U256::from(42u64),
                name: "Rust".into(),
                creator: addr(0x11),
            }
        );
        assert_eq!(event.payload()["atomId"], "42");
    }

    #[test]
    fn test_decode_staked_log() {
        let log = Log {
            address: addr(0xaa),
            topics: vec![
                topic_hash(STAKED_EVENT),
                H256::from_low_u64_be(3),
                H256::from(addr(0x22)),
            ],
            data: Bytes::from(abi::encode(&[Token::Uint(U256::exp10(18))])),
            ..Default::default()
        };
        let event = ChainEvent::from_log(&log).unwrap().unwrap();
        assert_eq!(event.payload()["amount"], "1000000000000000000");
        assert_eq!(
            event.payload()["staker"],
            "0x2222222222222222222222222222222222222222"
        );
    }

    #[test]
    fn test_foreign_log_ignored() {
        let log = Log {
            topics: vec![topic_hash("Transfer(address,address,uint256)")],
            ..Default::default()
        };
        assert!(ChainEvent::from_log(&log).unwrap().is_none());
    }

    #[test]
    fn test_created_atom_id_from_receipt() {
        let receipt = Receipt {
            hash: H256::zero(),
            success: true,
            block_number: Some(1),
            gas_used: None,
            effective_gas_price: None,
            logs: vec![atom_created_log(99, addr(0x11))],
        };
        assert_eq!(receipt.created_atom_id().unwrap(), U256::from(99u64));

        let empty = Receipt {
            logs: vec![],
            ..receipt
        };
        assert!(empty.created_atom_id().is_err());
    }

    #[test]
    fn test_log_ranges_are_bounded() {
        assert_eq!(log_range_end(0, 10), Some(10));
        assert_eq!(log_range_end(0, 5000), Some(1999));
        assert_eq!(log_range_end(2000, 5000), Some(3999));
        assert_eq!(log_range_end(4000, 5000), Some(5000));
        assert_eq!(log_range_end(5001, 5000), None);
        assert_eq!(log_range_end(7, 7), Some(7));
    }

    #[test]
    fn test_receipt_status() {
        let raw: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": format!("{:?}", H256::repeat_byte(1)),
            "transactionIndex": "0x0",
            "from": format!("{:?}", addr(0x11)),
            "cumulativeGasUsed": "0x5208",
            "logsBloom": format!("0x{}", "0".repeat(512)),
            "logs": [],
            "status": "0x0",
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
        }))
        .unwrap();
        let receipt = Receipt::from(raw);
        assert!(!receipt.success);
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.gas_used, Some(U256::from(21000u64)));
    }
}
