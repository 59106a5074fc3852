//! Transaction mirror
//!
//! Drives a contract call from submission to a settled record:
//!
//! 1. submit through the [`ContractGateway`],
//! 2. write a `pending` transaction record,
//! 3. wait for the receipt (bounded by the gateway's timeout),
//! 4. settle the record as `confirmed` or `failed`,
//! 5. on success write the derived row (atom or staking position),
//! 6. publish invalidations for the collections that changed.
//!
//! This is a best-effort display copy. A failure between steps leaves the
//! store behind the chain and nothing reconciles it later.

pub mod invalidation;
pub mod sink;

use ethers_core::types::{Address, H256, U256};
use ethers_core::utils::parse_ether;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::chain::{ChainError, ChainEvent, ContractGateway, EventSubscription, PendingTx, Receipt};
use crate::records::{
    Atom, ContractEventRecord, NewAtom, NewContractEvent, NewStakingPosition, NewTransaction,
    StakingPosition, TransactionPatch, TransactionRecord, TxKind, TxStatus,
};

pub use invalidation::{Invalidations, QueryKey};
pub use sink::{RecordSink, RestSink, SinkError};

pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 500;
/// 0.001 ETH
pub const MIN_STAKE_WEI: u64 = 1_000_000_000_000_000;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

pub type Result<T> = std::result::Result<T, MirrorError>;

/// What a completed flow wrote
#[derive(Debug, Clone)]
pub struct MirrorOutcome {
    pub pending: PendingTx,
    pub receipt: Receipt,
    pub transaction: Option<TransactionRecord>,
    pub atom: Option<Atom>,
    pub position: Option<StakingPosition>,
}

pub(crate) fn hex_string<T: std::fmt::Debug>(value: &T) -> String {
    format!("{value:?}")
}

/// Check atom form input before anything is submitted
pub fn validate_identity(name: &str, description: &str) -> Result<()> {
    let name_len = name.trim().chars().count();
    if name_len == 0 {
        return Err(MirrorError::InvalidInput("Atom name is required".into()));
    }
    if name_len > MAX_NAME_CHARS {
        return Err(MirrorError::InvalidInput(format!(
            "Atom name must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(MirrorError::InvalidInput(format!(
            "Description must be at most {MAX_DESCRIPTION_CHARS} characters"
        )));
    }
    Ok(())
}

/// Parse an ether amount and enforce the minimum stake
pub fn parse_stake_amount(eth: &str) -> Result<U256> {
    let amount = parse_ether(eth.trim())
        .map_err(|e| MirrorError::InvalidInput(format!("Invalid stake amount {eth:?}: {e}")))?;
    check_stake_amount(amount)?;
    Ok(amount)
}

fn check_stake_amount(amount: U256) -> Result<()> {
    if amount < U256::from(MIN_STAKE_WEI) {
        return Err(MirrorError::InvalidInput(
            "Minimum stake is 0.001 ETH".to_string(),
        ));
    }
    Ok(())
}

pub struct TransactionMirror {
    gateway: Arc<ContractGateway>,
    sink: Arc<dyn RecordSink>,
    invalidations: Invalidations,
}

impl TransactionMirror {
    pub fn new(gateway: Arc<ContractGateway>, sink: Arc<dyn RecordSink>) -> Self {
        Self {
            gateway,
            sink,
            invalidations: Invalidations::new(),
        }
    }

    pub fn gateway(&self) -> &Arc<ContractGateway> {
        &self.gateway
    }

    pub fn invalidations(&self) -> &Invalidations {
        &self.invalidations
    }

    /// Create an atom on-chain and mirror it
    pub async fn create_identity(&self, name: &str, description: &str) -> Result<MirrorOutcome> {
        self.create_identity_inner(name, description)
            .await
            .inspect_err(|e| error!(name, error = %e, "Create atom failed"))
    }

    /// Stake `amount` wei on `atom_id` and mirror the position
    pub async fn stake(&self, atom_id: U256, amount: U256) -> Result<MirrorOutcome> {
        self.stake_inner(atom_id, amount)
            .await
            .inspect_err(|e| error!(atom_id = %atom_id, error = %e, "Stake failed"))
    }

    async fn create_identity_inner(&self, name: &str, description: &str) -> Result<MirrorOutcome> {
        validate_identity(name, description)?;
        let name = name.trim();

        let pending = self.gateway.submit_create_identity(name, description).await?;
        self.record_pending(&pending, TxKind::CreateAtom, None).await?;

        let receipt = self.gateway.wait_for_confirmation(&pending).await?;
        let atom_id = receipt
            .success
            .then(|| receipt.created_atom_id())
            .transpose();

        // Settle first so a missing log still leaves a confirmed record
        let settled_id = atom_id.as_ref().ok().copied().flatten();
        let transaction = self.settle(&pending, &receipt, settled_id).await?;
        if !receipt.success {
            self.invalidations.publish(&[QueryKey::Transactions]);
            return Err(reverted(&pending).into());
        }

        let atom_id = match atom_id {
            Ok(atom_id) => atom_id,
            Err(e) => {
                self.invalidations.publish(&[QueryKey::Transactions]);
                return Err(e.into());
            }
        };
        let atom = match atom_id {
            Some(atom_id) => Some(
                self.sink
                    .create_atom(NewAtom {
                        chain_id: pending.chain_id,
                        atom_id: atom_id.to_string(),
                        name: name.to_string(),
                        description: Some(description.to_string()).filter(|d| !d.is_empty()),
                        creator: hex_string(&pending.from),
                        ..Default::default()
                    })
                    .await?,
            ),
            None => None,
        };

        self.invalidations
            .publish(&[QueryKey::Atoms, QueryKey::Transactions, QueryKey::Stats]);
        info!(hash = ?pending.hash, atom_id = ?atom_id.map(|id| id.to_string()), "Atom mirrored");

        Ok(MirrorOutcome {
            pending,
            receipt,
            transaction,
            atom,
            position: None,
        })
    }

    async fn stake_inner(&self, atom_id: U256, amount: U256) -> Result<MirrorOutcome> {
        check_stake_amount(amount)?;

        let pending = self.gateway.submit_stake(atom_id, amount).await?;
        self.record_pending(&pending, TxKind::Stake, Some(atom_id)).await?;

        let receipt = self.gateway.wait_for_confirmation(&pending).await?;
        let transaction = self.settle(&pending, &receipt, None).await?;
        if !receipt.success {
            self.invalidations.publish(&[QueryKey::Transactions]);
            return Err(reverted(&pending).into());
        }

        let position = self
            .sink
            .create_staking_position(NewStakingPosition {
                user_address: hex_string(&pending.from),
                atom_id: atom_id.to_string(),
                amount: amount.to_string(),
            })
            .await?;

        self.invalidations.publish(&[
            QueryKey::Atoms,
            QueryKey::Transactions,
            QueryKey::StakingPositions,
            QueryKey::Stats,
        ]);
        info!(hash = ?pending.hash, atom_id = %atom_id, amount = %amount, "Stake mirrored");

        Ok(MirrorOutcome {
            pending,
            receipt,
            transaction,
            atom: None,
            position: Some(position),
        })
    }

    async fn record_pending(
        &self,
        pending: &PendingTx,
        kind: TxKind,
        atom_id: Option<U256>,
    ) -> Result<TransactionRecord> {
        let record = self
            .sink
            .create_transaction(NewTransaction {
                hash: hex_string(&pending.hash),
                kind,
                from: hex_string(&pending.from),
                to: Some(hex_string(&pending.to)),
                value: Some(pending.value.to_string()),
                gas_used: None,
                gas_price: None,
                status: TxStatus::Pending,
                block_number: None,
                atom_id: atom_id.map(|id| id.to_string()),
            })
            .await?;
        self.invalidations.publish(&[QueryKey::Transactions]);
        Ok(record)
    }

    /// Write the terminal status. A missing record (the pending write was
    /// lost) is logged, not fatal.
    async fn settle(
        &self,
        pending: &PendingTx,
        receipt: &Receipt,
        atom_id: Option<U256>,
    ) -> Result<Option<TransactionRecord>> {
        let status = if receipt.success {
            TxStatus::Confirmed
        } else {
            TxStatus::Failed
        };
        let mut patch = TransactionPatch::settled(
            status,
            receipt.block_number,
            receipt.gas_used.map(|g| g.to_string()),
            receipt.effective_gas_price.map(|p| p.to_string()),
        );
        patch.atom_id = atom_id.map(|id| id.to_string());

        let hash = hex_string(&pending.hash);
        let updated = self.sink.update_transaction(&hash, patch).await?;
        if updated.is_none() {
            warn!(hash = %hash, "No pending record to settle");
        }
        Ok(updated)
    }

    /// Append a contract event record
    pub async fn record_event(&self, event: &ChainEvent) -> Result<ContractEventRecord> {
        let transaction_hash = event
            .transaction_hash
            .as_ref()
            .map(hex_string::<H256>)
            .ok_or_else(|| MirrorError::InvalidInput(format!("{} log has no transaction hash", event.name())))?;

        let record = self
            .sink
            .create_contract_event(NewContractEvent {
                contract_address: hex_string::<Address>(&event.contract),
                event_name: event.name().to_string(),
                block_number: event.block_number.unwrap_or_default(),
                transaction_hash,
                event_data: Some(event.payload()),
            })
            .await?;

        self.invalidations.publish(&[QueryKey::ContractEvents]);
        Ok(record)
    }

    /// Record every event from `subscription` until it ends. Returns the
    /// number of events recorded.
    pub async fn follow_events(&self, mut subscription: EventSubscription) -> usize {
        let mut recorded = 0;
        while let Some(event) = subscription.recv().await {
            match self.record_event(&event).await {
                Ok(record) => {
                    recorded += 1;
                    info!(
                        event = %record.event_name,
                        block = record.block_number,
                        tx = %record.transaction_hash,
                        "Contract event recorded"
                    );
                }
                Err(e) => warn!(event = event.name(), error = %e, "Failed to record contract event"),
            }
        }
        recorded
    }
}

fn reverted(pending: &PendingTx) -> ChainError {
    ChainError::ChainRevert(format!("Transaction {:?} reverted", pending.hash))
}
