//! JSON-RPC 2.0 transport over HTTP
//!
//! [`HttpProvider`] wraps an `ethers-providers` [`Provider<Http>`] as a
//! [`WalletProvider`] for node-managed accounts (a dev node or a signer
//! proxy). There are no push notifications over plain HTTP, so account and
//! chain changes are detected by polling.

use async_trait::async_trait;
use ethers_providers::{Http, HttpClientError, JsonRpcClient, Middleware, Provider};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::networks::parse_chain_id;
use super::provider::{ProviderError, ProviderEvent, WalletProvider, UNSUPPORTED_METHOD};

const EVENT_CAPACITY: usize = 64;

impl From<HttpClientError> for ProviderError {
    fn from(err: HttpClientError) -> Self {
        match err {
            HttpClientError::JsonRpcError(e) => ProviderError::Rpc(e),
            HttpClientError::SerdeJson { err, .. } => ProviderError::InvalidResponse(err),
            other => ProviderError::Transport(other.to_string()),
        }
    }
}

/// Turns polled snapshots into [`ProviderEvent`]s.
///
/// The first snapshot only seeds the baseline. A failure after a snapshot
/// reports `Disconnected` once; the first snapshot after that republishes
/// accounts and chain, since listeners dropped their state on disconnect.
#[derive(Debug, Default)]
struct ChangeTracker {
    last: Option<(Vec<String>, u64)>,
    offline: bool,
}

impl ChangeTracker {
    fn observe(&mut self, accounts: Vec<String>, chain: u64) -> Vec<ProviderEvent> {
        let mut events = Vec::new();
        if let Some((prev_accounts, prev_chain)) = &self.last {
            if self.offline || *prev_accounts != accounts {
                events.push(ProviderEvent::AccountsChanged(accounts.clone()));
            }
            if self.offline || *prev_chain != chain {
                events.push(ProviderEvent::ChainChanged(chain));
            }
        }
        self.offline = false;
        self.last = Some((accounts, chain));
        events
    }

    fn fail(&mut self) -> Option<ProviderEvent> {
        if self.offline || self.last.is_none() {
            return None;
        }
        self.offline = true;
        Some(ProviderEvent::Disconnected)
    }
}

/// [`WalletProvider`] backed by a node's unlocked accounts
pub struct HttpProvider {
    provider: Provider<Http>,
    url: String,
    timeout: Duration,
    events: broadcast::Sender<ProviderEvent>,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let url = url.into();
        let provider = Provider::<Http>::try_from(url.as_str())
            .map_err(|e| ProviderError::Transport(format!("Invalid RPC URL {url}: {e}")))?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            provider,
            url,
            timeout,
            events,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                ProviderError::Transport(format!(
                    "{} did not answer within {}ms",
                    self.url,
                    self.timeout.as_millis()
                ))
            })?
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        debug!(method, url = %self.url, "RPC request");
        self.bounded(async {
            let http: &Http = self.provider.as_ref();
            let value: Value = JsonRpcClient::request(http, method, params).await?;
            Ok(value)
        })
        .await
    }

    async fn accounts(&self) -> Result<Vec<String>, ProviderError> {
        self.bounded(async {
            let accounts = self
                .provider
                .get_accounts()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?;
            Ok(accounts.iter().map(|a| format!("{a:?}")).collect())
        })
        .await
    }

    async fn chain_id(&self) -> Result<u64, ProviderError> {
        self.bounded(async {
            let chain = self
                .provider
                .get_chainid()
                .await
                .map_err(|e| ProviderError::Transport(e.to_string()))?;
            Ok(chain.low_u64())
        })
        .await
    }

    /// Node-managed accounts live on exactly one chain. Switching to it is a
    /// no-op; anything else is unsupported.
    async fn switch_chain(&self, params: &Value) -> Result<Value, ProviderError> {
        let requested = params
            .get(0)
            .and_then(|p| p.get("chainId"))
            .and_then(Value::as_str)
            .and_then(parse_chain_id);

        let current = self.chain_id().await?;
        if requested == Some(current) {
            return Ok(Value::Null);
        }
        Err(ProviderError::rpc(
            UNSUPPORTED_METHOD,
            format!("Node at {} only serves chain {current}", self.url),
        ))
    }

    /// Poll accounts and chain id, publishing changes as [`ProviderEvent`]s
    pub fn spawn_poller(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            let mut tracker = ChangeTracker::default();

            loop {
                ticker.tick().await;

                let polled = async {
                    let accounts = provider.accounts().await?;
                    let chain = provider.chain_id().await?;
                    Ok::<_, ProviderError>((accounts, chain))
                }
                .await;

                let events = match polled {
                    Ok((accounts, chain)) => {
                        let events = tracker.observe(accounts, chain);
                        if !events.is_empty() {
                            info!(url = %provider.url(), changes = events.len(), "Wallet endpoint state changed");
                        }
                        events
                    }
                    Err(e) => {
                        let event = tracker.fail();
                        if event.is_some() {
                            warn!(url = %provider.url(), error = %e, "Wallet endpoint unreachable");
                        }
                        event.into_iter().collect()
                    }
                };

                for event in events {
                    let _ = provider.events.send(event);
                }
            }
        })
    }
}

#[async_trait]
impl WalletProvider for HttpProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        match method {
            // Node accounts are already unlocked; there is no approval step
            "eth_requestAccounts" => self.call("eth_accounts", Value::Array(vec![])).await,
            "wallet_switchEthereumChain" => self.switch_chain(&params).await,
            m if m.starts_with("wallet_") => Err(ProviderError::rpc(
                UNSUPPORTED_METHOD,
                format!("{m} is not supported by a JSON-RPC node"),
            )),
            _ => self.call(method, params).await,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}
