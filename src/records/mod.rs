//! Record types mirrored from on-chain state
//!
//! These are the display copies of protocol data: atoms, transactions,
//! contract events and staking positions. The chain is the source of truth;
//! nothing here is reconciled against it.
//!
//! Wire format is camelCase JSON. `New*` types are request bodies for
//! creates, `*Patch` types are partial updates.

pub mod schema;
pub mod store;
pub mod units;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use schema::{parse_body, Schema};
pub use store::{RecordStore, StoreStats};

fn zero() -> String {
    "0".to_string()
}

// ============================================================================
// Atoms
// ============================================================================

/// An on-chain identity mirrored for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Atom {
    pub id: Uuid,
    #[serde(deserialize_with = "schema::de_u64_lenient")]
    pub chain_id: u64,
    /// Protocol-assigned atom id (decimal string)
    pub atom_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub total_stake: String,
    pub stakeholder_count: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAtom {
    #[serde(deserialize_with = "schema::de_u64_lenient")]
    pub chain_id: u64,
    pub atom_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub creator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_stake: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakeholder_count: Option<String>,
}

impl NewAtom {
    pub(crate) fn into_atom(self, id: Uuid, created_at: DateTime<Utc>) -> Atom {
        Atom {
            id,
            chain_id: self.chain_id,
            atom_id: self.atom_id,
            name: self.name,
            description: self.description,
            creator: self.creator,
            uri: self.uri,
            created_at,
            total_stake: self.total_stake.unwrap_or_else(zero),
            stakeholder_count: self.stakeholder_count.unwrap_or_else(zero),
        }
    }
}

/// Mutable atom fields. Identity fields (id, chainId, atomId, creator) are fixed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_stake: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stakeholder_count: Option<String>,
}

impl AtomPatch {
    pub(crate) fn apply(self, atom: &mut Atom) {
        if let Some(name) = self.name {
            atom.name = name;
        }
        if let Some(description) = self.description {
            atom.description = Some(description);
        }
        if let Some(uri) = self.uri {
            atom.uri = Some(uri);
        }
        if let Some(total_stake) = self.total_stake {
            atom.total_stake = total_stake;
        }
        if let Some(count) = self.stakeholder_count {
            atom.stakeholder_count = count;
        }
    }
}

// ============================================================================
// Transactions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    CreateAtom,
    Stake,
    Reward,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::CreateAtom => "create_atom",
            TxKind::Stake => "stake",
            TxKind::Reward => "reward",
        }
    }
}

/// Transaction lifecycle: `pending -> {confirmed, failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Confirmed,
    Failed,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }

    /// Re-asserting the current status is always allowed. Records in a
    /// terminal status are frozen as a whole, see
    /// [`RecordStore::update_transaction`](store::RecordStore::update_transaction).
    pub fn can_transition_to(&self, next: TxStatus) -> bool {
        *self == next || *self == TxStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub id: Uuid,
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    pub status: TxStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "schema::de_opt_u64_lenient"
    )]
    pub block_number: Option<u64>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atom_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub hash: String,
    #[serde(rename = "type")]
    pub kind: TxKind,
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    pub status: TxStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "schema::de_opt_u64_lenient"
    )]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atom_id: Option<String>,
}

impl NewTransaction {
    pub(crate) fn into_record(self, id: Uuid, timestamp: DateTime<Utc>) -> TransactionRecord {
        TransactionRecord {
            id,
            hash: self.hash,
            kind: self.kind,
            from: self.from,
            to: self.to,
            value: self.value,
            gas_used: self.gas_used,
            gas_price: self.gas_price,
            status: self.status,
            block_number: self.block_number,
            timestamp,
            atom_id: self.atom_id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TxStatus>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "schema::de_opt_u64_lenient"
    )]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atom_id: Option<String>,
}

impl TransactionPatch {
    /// Terminal outcome as written by the mirror after a receipt arrives
    pub fn settled(
        status: TxStatus,
        block_number: Option<u64>,
        gas_used: Option<String>,
        gas_price: Option<String>,
    ) -> Self {
        Self {
            status: Some(status),
            block_number,
            gas_used,
            gas_price,
            ..Default::default()
        }
    }

    /// Whether applying this patch would alter `tx`
    pub fn changes(&self, tx: &TransactionRecord) -> bool {
        self.status.is_some_and(|s| s != tx.status)
            || (self.block_number.is_some() && self.block_number != tx.block_number)
            || (self.gas_used.is_some() && self.gas_used != tx.gas_used)
            || (self.gas_price.is_some() && self.gas_price != tx.gas_price)
            || (self.to.is_some() && self.to != tx.to)
            || (self.value.is_some() && self.value != tx.value)
            || (self.atom_id.is_some() && self.atom_id != tx.atom_id)
    }

    pub(crate) fn apply(self, tx: &mut TransactionRecord) {
        if let Some(status) = self.status {
            tx.status = status;
        }
        if self.block_number.is_some() {
            tx.block_number = self.block_number;
        }
        if self.gas_used.is_some() {
            tx.gas_used = self.gas_used;
        }
        if self.gas_price.is_some() {
            tx.gas_price = self.gas_price;
        }
        if self.to.is_some() {
            tx.to = self.to;
        }
        if self.value.is_some() {
            tx.value = self.value;
        }
        if self.atom_id.is_some() {
            tx.atom_id = self.atom_id;
        }
    }
}

// ============================================================================
// Contract events
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractEventRecord {
    pub id: Uuid,
    pub contract_address: String,
    pub event_name: String,
    #[serde(deserialize_with = "schema::de_u64_lenient")]
    pub block_number: u64,
    pub transaction_hash: String,
    #[serde(default)]
    pub event_data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContractEvent {
    pub contract_address: String,
    pub event_name: String,
    #[serde(deserialize_with = "schema::de_u64_lenient")]
    pub block_number: u64,
    pub transaction_hash: String,
    #[serde(default)]
    pub event_data: Option<serde_json::Value>,
}

impl NewContractEvent {
    pub(crate) fn into_record(self, id: Uuid, timestamp: DateTime<Utc>) -> ContractEventRecord {
        ContractEventRecord {
            id,
            contract_address: self.contract_address,
            event_name: self.event_name,
            block_number: self.block_number,
            transaction_hash: self.transaction_hash,
            event_data: self.event_data,
            timestamp,
        }
    }
}

// ============================================================================
// Staking positions
// ============================================================================

/// One stake action. Repeated stakes by the same user append new rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakingPosition {
    pub id: Uuid,
    pub user_address: String,
    pub atom_id: String,
    /// Base units (wei)
    pub amount: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStakingPosition {
    pub user_address: String,
    pub atom_id: String,
    pub amount: String,
}

impl NewStakingPosition {
    pub(crate) fn into_position(self, id: Uuid, timestamp: DateTime<Utc>) -> StakingPosition {
        StakingPosition {
            id,
            user_address: self.user_address,
            atom_id: self.atom_id,
            amount: self.amount,
            timestamp,
        }
    }
}

// ============================================================================
// Users
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Argon2id PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
}

/// Staking position filter for list queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionFilter {
    All,
    /// Case-insensitive address match
    User(String),
    Atom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(TxStatus::Pending.can_transition_to(TxStatus::Confirmed));
        assert!(TxStatus::Pending.can_transition_to(TxStatus::Failed));
        assert!(TxStatus::Confirmed.can_transition_to(TxStatus::Confirmed));
        assert!(!TxStatus::Confirmed.can_transition_to(TxStatus::Pending));
        assert!(!TxStatus::Failed.can_transition_to(TxStatus::Confirmed));
        assert!(TxStatus::Failed.is_terminal());
        assert!(!TxStatus::Pending.is_terminal());
    }

    #[test]
    fn test_transaction_wire_format() {
        let json = serde_json::json!({
            "hash": "0xabc",
            "type": "create_atom",
            "from": "0x1111111111111111111111111111111111111111",
            "value": "300000000000000",
            "status": "pending",
        });
        let tx: NewTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(tx.kind, TxKind::CreateAtom);
        assert_eq!(tx.status, TxStatus::Pending);
        assert!(tx.block_number.is_none());

        let record = tx.into_record(Uuid::new_v4(), Utc::now());
        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["type"], "create_atom");
        assert!(out.get("gasUsed").is_none());
    }

    #[test]
    fn test_new_atom_defaults_aggregates() {
        let atom = NewAtom {
            chain_id: 1337,
            atom_id: "7".into(),
            name: "Rust".into(),
            creator: "0xabc".into(),
            ..Default::default()
        }
        .into_atom(Uuid::new_v4(), Utc::now());
        assert_eq!(atom.total_stake, "0");
        assert_eq!(atom.stakeholder_count, "0");
    }

    #[test]
    fn test_atom_patch_keeps_identity() {
        let mut atom = NewAtom {
            chain_id: 1,
            atom_id: "1".into(),
            name: "old".into(),
            creator: "0xabc".into(),
            ..Default::default()
        }
        .into_atom(Uuid::new_v4(), Utc::now());
        let id = atom.id;

        AtomPatch {
            name: Some("new".into()),
            total_stake: Some("10".into()),
            ..Default::default()
        }
        .apply(&mut atom);

        assert_eq!(atom.id, id);
        assert_eq!(atom.atom_id, "1");
        assert_eq!(atom.name, "new");
        assert_eq!(atom.total_stake, "10");
    }

    #[test]
    fn test_user_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            password_hash: "$argon2id$...".into(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
    }
}
