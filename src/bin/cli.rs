//! atomgate-cli - submit Intuition protocol calls and mirror them
//!
//! Usage:
//!   atomgate-cli --vault-address 0x.. --atom-wallet-address 0x.. status
//!   atomgate-cli ... create-atom --name "Rust" --description "A language"
//!   atomgate-cli ... stake --atom-id 7 --amount 0.01
//!   atomgate-cli ... watch-events
//!
//! Writes go through the wallet at WALLET_URL; reads, receipts and logs use
//! RPC_URL (or the network registry default). Confirmed activity is written
//! to the atomgate server at API_URL.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use ethers_core::types::{Address, Bytes, U256};
use ethers_core::utils::{format_ether, parse_ether};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use atomgate::chain::{
    networks, ContractAddresses, ContractGateway, HttpProvider, WalletConnector, WalletProvider,
    WatchHandle,
};
use atomgate::config::ClientArgs;
use atomgate::mirror::{parse_stake_amount, MirrorOutcome, RestSink, TransactionMirror};

#[derive(Parser, Debug)]
#[command(name = "atomgate-cli")]
#[command(about = "Create and stake on Intuition atoms, mirroring results into atomgate")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    client: ClientArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect the wallet and show account, network and balances
    Status,

    /// Ask the wallet to switch to a supported network
    SwitchChain {
        /// Target chain id (defaults to CHAIN_ID)
        #[arg(long)]
        to: Option<u64>,
    },

    /// Create an atom on-chain and mirror it
    CreateAtom {
        /// Atom name (1-100 characters)
        #[arg(short, long)]
        name: String,
        /// Optional description (up to 500 characters)
        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Stake ether on an atom and mirror the position
    Stake {
        /// Protocol atom id
        #[arg(long, value_parser = parse_atom_id)]
        atom_id: U256,
        /// Amount in ether (minimum 0.001)
        #[arg(long)]
        amount: String,
    },

    /// Read an atom from the vault
    ReadAtom {
        #[arg(long, value_parser = parse_atom_id)]
        atom_id: U256,
    },

    /// Read a user's stake on an atom
    ReadStake {
        #[arg(long, value_parser = parse_atom_id)]
        atom_id: U256,
        /// Staker address (defaults to the connected account)
        #[arg(long)]
        user: Option<Address>,
    },

    /// Show the vault's atom count and the atom wallet's owner and balance
    Contracts,

    /// Have the AtomWallet execute a call and wait for it to be mined
    WalletExecute {
        /// Call target
        #[arg(long)]
        to: Address,
        /// Value forwarded with the call, in ether
        #[arg(long, default_value = "0")]
        value: String,
        /// Hex calldata
        #[arg(long, default_value = "0x")]
        data: Bytes,
    },

    /// Follow vault events and record them as contract events
    WatchEvents {
        /// First block to scan (defaults to the current head)
        #[arg(long)]
        from_block: Option<u64>,
    },
}

/// Atom ids are decimal on the command line
fn parse_atom_id(raw: &str) -> Result<U256, String> {
    U256::from_dec_str(raw).map_err(|e| format!("invalid atom id {raw:?}: {e}"))
}

/// Wiring shared by every command
struct Session {
    args: ClientArgs,
    wallet: Option<Arc<HttpProvider>>,
    connector: Arc<WalletConnector>,
    gateway: Arc<ContractGateway>,
}

impl Session {
    fn new(args: ClientArgs) -> anyhow::Result<Self> {
        let rpc_url = args
            .effective_rpc_url()
            .context("no RPC endpoint for this network")?;
        let reader: Arc<dyn WalletProvider> = Arc::new(HttpProvider::new(rpc_url, args.rpc_timeout())?);

        let wallet = args
            .wallet_url
            .as_ref()
            .map(|url| HttpProvider::new(url.clone(), args.rpc_timeout()).map(Arc::new))
            .transpose()?;
        let connector = Arc::new(WalletConnector::new(
            wallet.clone().map(|w| w as Arc<dyn WalletProvider>),
            args.protocol_token_address,
        ));

        let create_fee = args.create_fee().map_err(anyhow::Error::msg)?;
        let gateway = ContractGateway::new(
            reader,
            Arc::clone(&connector),
            ContractAddresses {
                vault: args.vault_address,
                atom_wallet: args.atom_wallet_address,
            },
        )
        .with_create_fee(create_fee)
        .with_confirmation_timeout(args.confirmation_timeout())
        .with_poll_interval(args.poll_interval());

        Ok(Self {
            args,
            wallet,
            connector,
            gateway: Arc::new(gateway),
        })
    }

    fn mirror(&self) -> TransactionMirror {
        let sink = RestSink::new(self.args.api_url.clone(), self.args.rpc_timeout());
        TransactionMirror::new(Arc::clone(&self.gateway), Arc::new(sink))
    }

    /// Connect and make sure the wallet is on the configured chain. The
    /// returned guard keeps the session in sync with the wallet endpoint
    /// while a write is in flight.
    async fn connect_on_target_chain(&self) -> anyhow::Result<WalletTracking> {
        let connection = self.connector.connect().await?;
        if connection.chain_id != self.args.chain_id {
            info!(
                from = connection.chain_id,
                to = self.args.chain_id,
                "Switching wallet network"
            );
            self.connector.switch_chain(self.args.chain_id).await?;
        }

        let poller = self
            .wallet
            .as_ref()
            .map(|w| w.spawn_poller(self.args.poll_interval()));
        let watch = match self.connector.watch() {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Wallet events unavailable");
                None
            }
        };
        Ok(WalletTracking {
            poller,
            _watch: watch,
        })
    }
}

/// Wallet poller and event watch for a connected session; both stop on drop
struct WalletTracking {
    poller: Option<JoinHandle<()>>,
    _watch: Option<WatchHandle>,
}

impl Drop for WalletTracking {
    fn drop(&mut self) {
        if let Some(poller) = &self.poller {
            poller.abort();
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_outcome(outcome: &MirrorOutcome, chain_id: u64) -> anyhow::Result<()> {
    let explorer = networks::find(chain_id).map(|n| n.explorer_tx_url(&format!("{:?}", outcome.pending.hash)));
    print_json(&serde_json::json!({
        "pending": outcome.pending,
        "receipt": outcome.receipt,
        "transaction": outcome.transaction,
        "atom": outcome.atom,
        "position": outcome.position,
        "explorer": explorer,
    }))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let session = Session::new(cli.client)?;

    match cli.command {
        Command::Status => {
            session.connector.connect().await?;
            let state = session.connector.state();
            let network = state.chain_id.and_then(networks::find).map(|n| n.name);
            print_json(&serde_json::json!({
                "wallet": state,
                "network": network,
                "targetChainId": session.args.chain_id,
            }))?;
        }

        Command::SwitchChain { to } => {
            session.connector.connect().await?;
            let target = to.unwrap_or(session.args.chain_id);
            session.connector.switch_chain(target).await?;
            print_json(&session.connector.state())?;
        }

        Command::CreateAtom { name, description } => {
            let _tracking = session.connect_on_target_chain().await?;
            let outcome = session.mirror().create_identity(&name, &description).await?;
            print_outcome(&outcome, outcome.pending.chain_id)?;
        }

        Command::Stake { atom_id, amount } => {
            let amount = parse_stake_amount(&amount)?;
            let _tracking = session.connect_on_target_chain().await?;
            let outcome = session.mirror().stake(atom_id, amount).await?;
            print_outcome(&outcome, outcome.pending.chain_id)?;
        }

        Command::ReadAtom { atom_id } => {
            let atom = session.gateway.read_identity(atom_id).await?;
            print_json(&atom)?;
        }

        Command::ReadStake { atom_id, user } => {
            let user = match user {
                Some(user) => user,
                None => session.connector.connect().await?.address,
            };
            let stake = session.gateway.read_stake(atom_id, user).await?;
            print_json(&serde_json::json!({
                "atomId": atom_id.to_string(),
                "user": user,
                "stake": stake.to_string(),
                "stakeEth": format_ether(stake),
            }))?;
        }

        Command::Contracts => {
            let count = session.gateway.read_atom_count().await?;
            let owner = session.gateway.atom_wallet_owner().await?;
            let balance = session.gateway.atom_wallet_balance().await?;
            print_json(&serde_json::json!({
                "addresses": session.gateway.addresses(),
                "atomCount": count.to_string(),
                "atomWalletOwner": owner,
                "atomWalletBalance": format_ether(balance),
            }))?;
        }

        Command::WalletExecute { to, value, data } => {
            let value = parse_ether(value.as_str()).context("invalid --value")?;
            let _tracking = session.connect_on_target_chain().await?;
            let pending = session.gateway.submit_wallet_execute(to, value, data).await?;
            let receipt = session.gateway.wait_for_confirmation(&pending).await?;
            print_json(&serde_json::json!({ "pending": pending, "receipt": receipt }))?;
            if !receipt.success {
                bail!("Transaction {:?} reverted", pending.hash);
            }
        }

        Command::WatchEvents { from_block } => {
            // Read-only: logs come from the RPC endpoint, no wallet involved
            let mirror = session.mirror();
            let subscription = session.gateway.subscribe_events(from_block);
            info!(vault = ?session.args.vault_address, "Following vault events");

            tokio::select! {
                recorded = mirror.follow_events(subscription) => {
                    info!(recorded, "Event stream ended");
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted");
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the JSON results
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("atomgate={},warn", cli.client.log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if cli.client.log_json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    if let Err(e) = cli.client.validate() {
        bail!("Configuration error: {e}");
    }

    run(cli).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: [&str; 5] = [
        "atomgate-cli",
        "--vault-address",
        "0x1111111111111111111111111111111111111111",
        "--atom-wallet-address",
        "0x2222222222222222222222222222222222222222",
    ];

    fn cli(extra: &[&str]) -> Cli {
        Cli::parse_from(BASE.iter().chain(extra).copied())
    }

    #[tokio::test]
    async fn test_watch_events_needs_no_wallet() {
        let cli = cli(&["watch-events", "--from-block", "5"]);
        assert!(matches!(
            cli.command,
            Command::WatchEvents {
                from_block: Some(5)
            }
        ));

        let session = Session::new(cli.client).unwrap();
        assert!(session.wallet.is_none());
        assert!(!session.connector.state().connected);
    }

    #[tokio::test]
    async fn test_tracking_stops_poller_on_drop() {
        let cli = cli(&["--wallet-url", "http://127.0.0.1:1", "status"]);
        let session = Session::new(cli.client).unwrap();
        let wallet = session.wallet.as_ref().unwrap();

        let poller = wallet.spawn_poller(session.args.poll_interval());
        let handle = poller.abort_handle();
        drop(WalletTracking {
            poller: Some(poller),
            _watch: session.connector.watch().ok(),
        });
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while !handle.is_finished() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_atom_id_is_decimal() {
        assert_eq!(parse_atom_id("10").unwrap(), U256::from(10u64));
        assert!(parse_atom_id("0x10").is_err());
    }
}
