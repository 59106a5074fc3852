//! Wallet connector
//!
//! Owns the client session: which account is connected, on which chain,
//! and its balances. Every provider notification funnels through
//! [`WalletConnector::reconcile`], so state is re-derived the same way
//! whether a change comes from the user, the wallet or a poll.

use ethers_core::abi::{self, Token};
use ethers_core::types::{Address, Bytes, H256, U256};
use ethers_core::utils::{format_ether, id};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::{ChainError, Result};
use super::networks::{self, parse_chain_id};
use super::provider::{ProviderEvent, WalletProvider, UNRECOGNIZED_CHAIN};
use super::{decode_json, decode_quantity};

/// Transient session state, rebuilt on connect and on every wallet event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub connected: bool,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    /// Native balance in ether
    pub eth_balance: Option<String>,
    /// Protocol token balance ("0" when no token is configured)
    pub protocol_token_balance: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub address: Address,
    pub chain_id: u64,
}

/// Handle for submitting transactions from the connected account
#[derive(Clone)]
pub struct Signer {
    address: Address,
    chain_id: u64,
    provider: Arc<dyn WalletProvider>,
}

impl Signer {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Submit a transaction; returns as soon as the wallet hands back a hash
    pub async fn send_transaction(&self, to: Address, value: U256, data: Bytes) -> Result<H256> {
        let params = json!([{
            "from": self.address,
            "to": to,
            "value": value,
            "data": data,
        }]);
        let hash = self.provider.request("eth_sendTransaction", params).await?;
        decode_json("eth_sendTransaction", hash)
    }
}

pub struct WalletConnector {
    provider: Option<Arc<dyn WalletProvider>>,
    protocol_token: Option<Address>,
    state: watch::Sender<WalletState>,
}

impl WalletConnector {
    /// `provider` is `None` when no wallet is configured; every wallet
    /// operation then fails with `WalletUnavailable`.
    pub fn new(provider: Option<Arc<dyn WalletProvider>>, protocol_token: Option<Address>) -> Self {
        let (state, _) = watch::channel(WalletState::default());
        Self {
            provider,
            protocol_token,
            state,
        }
    }

    fn provider(&self) -> Result<&Arc<dyn WalletProvider>> {
        self.provider.as_ref().ok_or(ChainError::WalletUnavailable)
    }

    pub fn state(&self) -> WalletState {
        self.state.borrow().clone()
    }

    /// Receive every state change from now on
    pub fn subscribe_state(&self) -> watch::Receiver<WalletState> {
        self.state.subscribe()
    }

    /// Request account access and load balances
    pub async fn connect(&self) -> Result<Connection> {
        let provider = self.provider()?;

        let accounts = provider
            .request("eth_requestAccounts", json!([]))
            .await
            .map_err(ChainError::from)?;
        let accounts: Vec<String> = decode_json("eth_requestAccounts", accounts)?;
        let address = first_account(&accounts)?.ok_or(ChainError::UserRejected)?;

        let chain_id = self.current_chain_id().await?;
        let (eth_balance, protocol_token_balance) = self.load_balances(address).await;

        self.state.send_replace(WalletState {
            connected: true,
            address: Some(address),
            chain_id: Some(chain_id),
            eth_balance,
            protocol_token_balance,
        });

        info!(address = ?address, chain_id, "Wallet connected");
        Ok(Connection { address, chain_id })
    }

    /// Ask the wallet to switch networks, registering the chain if the
    /// wallet does not know it yet
    pub async fn switch_chain(&self, chain_id: u64) -> Result<()> {
        let network = networks::find(chain_id).ok_or(ChainError::UnsupportedChain(chain_id))?;
        let provider = self.provider()?;

        let params = json!([{ "chainId": networks::hex_chain_id(chain_id) }]);
        match provider.request("wallet_switchEthereumChain", params).await {
            Ok(_) => {}
            Err(e) if e.code() == Some(UNRECOGNIZED_CHAIN) => {
                info!(chain_id, name = network.name, "Chain unknown to wallet, adding it");
                provider
                    .request("wallet_addEthereumChain", json!([network.add_chain_params()]))
                    .await?;
            }
            Err(e) => return Err(e.into()),
        }

        self.reconcile(ProviderEvent::ChainChanged(chain_id)).await;
        Ok(())
    }

    /// Native balance of `address`, in ether
    pub async fn get_balance(&self, address: Address) -> Result<String> {
        let provider = self.provider()?;
        let raw = provider
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        Ok(format_ether(decode_quantity("eth_getBalance", raw)?))
    }

    /// ERC-20 `balanceOf` on the protocol token, in whole tokens (18 decimals)
    pub async fn token_balance(&self, address: Address) -> Result<String> {
        let Some(token) = self.protocol_token else {
            return Ok("0".to_string());
        };
        let provider = self.provider()?;

        let mut data = id("balanceOf(address)").to_vec();
        data.extend(abi::encode(&[Token::Address(address)]));

        let raw = provider
            .request(
                "eth_call",
                json!([{ "to": token, "data": Bytes::from(data) }, "latest"]),
            )
            .await?;
        let bytes: Bytes = decode_json("eth_call", raw)?;
        let balance = U256::from_big_endian(bytes.get(..32).ok_or_else(|| {
            ChainError::Abi(format!("balanceOf returned {} bytes", bytes.len()))
        })?);
        Ok(format_ether(balance))
    }

    /// Forget the local session. The wallet itself stays connected.
    pub fn disconnect(&self) {
        self.state.send_replace(WalletState::default());
        debug!("Wallet session cleared");
    }

    /// Signer for the connected account
    pub fn signer(&self) -> Result<Signer> {
        let provider = self.provider()?;
        let state = self.state.borrow();
        match (state.connected, state.address, state.chain_id) {
            (true, Some(address), Some(chain_id)) => Ok(Signer {
                address,
                chain_id,
                provider: Arc::clone(provider),
            }),
            _ => Err(ChainError::NotInitialized),
        }
    }

    /// Re-derive session state from a wallet notification. Idempotent.
    pub async fn reconcile(&self, event: ProviderEvent) {
        match event {
            ProviderEvent::Disconnected => {
                self.disconnect();
            }
            ProviderEvent::AccountsChanged(accounts) => {
                let address = match first_account(&accounts) {
                    Ok(Some(address)) => address,
                    Ok(None) => {
                        info!("Wallet reports no accounts, disconnecting");
                        self.disconnect();
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, "Ignoring malformed accountsChanged");
                        return;
                    }
                };

                let known_chain = self.state.borrow().chain_id;
                let chain_id = match known_chain {
                    Some(chain_id) => Some(chain_id),
                    None => self.current_chain_id().await.ok(),
                };
                let (eth_balance, protocol_token_balance) = self.load_balances(address).await;

                self.state.send_replace(WalletState {
                    connected: chain_id.is_some(),
                    address: Some(address),
                    chain_id,
                    eth_balance,
                    protocol_token_balance,
                });
                info!(address = ?address, "Wallet account changed");
            }
            ProviderEvent::ChainChanged(chain_id) => {
                let address = {
                    let state = self.state.borrow();
                    if !state.connected {
                        return;
                    }
                    state.address
                };
                let Some(address) = address else { return };

                let (eth_balance, protocol_token_balance) = self.load_balances(address).await;
                self.state.send_modify(|state| {
                    state.chain_id = Some(chain_id);
                    state.eth_balance = eth_balance;
                    state.protocol_token_balance = protocol_token_balance;
                });
                info!(chain_id, "Wallet chain changed");
            }
        }
    }

    /// Follow the provider's notifications until the handle is dropped
    pub fn watch(self: &Arc<Self>) -> Result<WatchHandle> {
        let mut events = self.provider()?.subscribe();
        let connector = Arc::clone(self);

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => connector.reconcile(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Wallet event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Ok(WatchHandle { task })
    }

    async fn current_chain_id(&self) -> Result<u64> {
        let raw = self.provider()?.request("eth_chainId", json!([])).await?;
        raw.as_str()
            .and_then(parse_chain_id)
            .ok_or_else(|| ChainError::InvalidResponse(format!("eth_chainId returned {raw}")))
    }

    /// Balances are display data; a failed read leaves the field empty
    async fn load_balances(&self, address: Address) -> (Option<String>, Option<String>) {
        let eth = match self.get_balance(address).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(address = ?address, error = %e, "Failed to read native balance");
                None
            }
        };
        let token = match self.token_balance(address).await {
            Ok(balance) => Some(balance),
            Err(e) => {
                warn!(address = ?address, error = %e, "Failed to read protocol token balance");
                None
            }
        };
        (eth, token)
    }
}

/// Stops the wallet event subscription when dropped
pub struct WatchHandle {
    task: JoinHandle<()>,
}

impl WatchHandle {
    pub fn stop(self) {}
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn first_account(accounts: &[String]) -> Result<Option<Address>> {
    accounts
        .first()
        .map(|raw| {
            raw.parse::<Address>()
                .map_err(|e| ChainError::InvalidResponse(format!("bad account {raw}: {e}")))
        })
        .transpose()
}
