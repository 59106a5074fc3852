//! In-memory record store
//!
//! One concurrent map per entity. The store is constructed once at startup
//! and shared with handlers through `AppState`; there is no global instance.
//!
//! Writes to a single key are atomic (DashMap entry locking). Writes across
//! entities are independent: creating a staking position does not touch the
//! atom's aggregates.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use ethers_core::types::U256;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;
use uuid::Uuid;

use super::units::{format_scaled, parse_base_units, NATIVE_DECIMALS};
use super::{
    Atom, AtomPatch, ContractEventRecord, NewAtom, NewContractEvent, NewStakingPosition,
    NewTransaction, NewUser, PositionFilter, StakingPosition, TransactionPatch,
    TransactionRecord, User,
};
use crate::types::{ApiError, Result};

/// Aggregate numbers for the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_atoms: usize,
    /// Sum of all staking positions in ether, two decimals
    pub total_staked: String,
}

/// A stored record plus its insertion sequence (tie-breaker for ordering)
#[derive(Debug, Clone)]
struct Slot<T> {
    seq: u64,
    record: T,
}

pub struct RecordStore {
    users: DashMap<Uuid, Slot<User>>,
    usernames: DashMap<String, Uuid>,
    atoms: DashMap<Uuid, Slot<Atom>>,
    /// (chainId, atomId) -> record id
    atom_keys: DashMap<(u64, String), Uuid>,
    /// Keyed by transaction hash
    transactions: DashMap<String, Slot<TransactionRecord>>,
    contract_events: DashMap<Uuid, Slot<ContractEventRecord>>,
    staking_positions: DashMap<Uuid, Slot<StakingPosition>>,
    seq: AtomicU64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            usernames: DashMap::new(),
            atoms: DashMap::new(),
            atom_keys: DashMap::new(),
            transactions: DashMap::new(),
            contract_events: DashMap::new(),
            staking_positions: DashMap::new(),
            seq: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: &Uuid) -> Option<User> {
        self.users.get(id).map(|slot| slot.record.clone())
    }

    pub fn get_user_by_username(&self, username: &str) -> Option<User> {
        let id = *self.usernames.get(username)?;
        self.get_user(&id)
    }

    /// Create a user; the password is hashed with Argon2id before storage
    pub fn create_user(&self, new: NewUser) -> Result<User> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(new.password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?;

        let id = Uuid::new_v4();
        match self.usernames.entry(new.username.clone()) {
            Entry::Occupied(_) => {
                return Err(ApiError::Conflict(format!(
                    "username {} already exists",
                    new.username
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let user = User {
            id,
            username: new.username,
            password_hash,
        };
        self.users.insert(
            id,
            Slot {
                seq: self.next_seq(),
                record: user.clone(),
            },
        );
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Atoms
    // ------------------------------------------------------------------

    pub fn list_atoms(&self) -> Vec<Atom> {
        newest_first(
            self.atoms.iter().map(|e| e.value().clone()),
            |a: &Atom| a.created_at,
        )
    }

    pub fn get_atom(&self, id: &Uuid) -> Option<Atom> {
        self.atoms.get(id).map(|slot| slot.record.clone())
    }

    pub fn get_atom_by_protocol_id(&self, chain_id: u64, atom_id: &str) -> Option<Atom> {
        let id = *self.atom_keys.get(&(chain_id, atom_id.to_string()))?;
        self.get_atom(&id)
    }

    /// Create an atom; `(chainId, atomId)` must be unused
    pub fn create_atom(&self, new: NewAtom) -> Result<Atom> {
        let id = Uuid::new_v4();
        match self.atom_keys.entry((new.chain_id, new.atom_id.clone())) {
            Entry::Occupied(_) => {
                return Err(ApiError::Conflict(format!(
                    "atom {} already exists on chain {}",
                    new.atom_id, new.chain_id
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        let atom = new.into_atom(id, Utc::now());
        self.atoms.insert(
            id,
            Slot {
                seq: self.next_seq(),
                record: atom.clone(),
            },
        );
        debug!(id = %id, atom_id = %atom.atom_id, "Atom stored");
        Ok(atom)
    }

    /// Merge `patch` into an atom; `None` if the id is unknown
    pub fn update_atom(&self, id: &Uuid, patch: AtomPatch) -> Option<Atom> {
        let mut slot = self.atoms.get_mut(id)?;
        patch.apply(&mut slot.record);
        Some(slot.record.clone())
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    pub fn list_transactions(&self) -> Vec<TransactionRecord> {
        newest_first(
            self.transactions.iter().map(|e| e.value().clone()),
            |t: &TransactionRecord| t.timestamp,
        )
    }

    pub fn get_transaction(&self, hash: &str) -> Option<TransactionRecord> {
        self.transactions.get(hash).map(|slot| slot.record.clone())
    }

    /// Create a transaction record; the hash must be unused
    pub fn create_transaction(&self, new: NewTransaction) -> Result<TransactionRecord> {
        match self.transactions.entry(new.hash.clone()) {
            Entry::Occupied(_) => Err(ApiError::Conflict(format!(
                "transaction {} already recorded",
                new.hash
            ))),
            Entry::Vacant(slot) => {
                let record = new.into_record(Uuid::new_v4(), Utc::now());
                slot.insert(Slot {
                    seq: self.next_seq(),
                    record: record.clone(),
                });
                debug!(hash = %record.hash, status = ?record.status, "Transaction stored");
                Ok(record)
            }
        }
    }

    /// Merge `patch` into the record for `hash`.
    ///
    /// `Ok(None)` if the hash is unknown (nothing is created). Once a record
    /// is confirmed or failed it is frozen: a patch that would change any
    /// field is a conflict, while re-sending the stored values is accepted
    /// as a no-op.
    pub fn update_transaction(
        &self,
        hash: &str,
        patch: TransactionPatch,
    ) -> Result<Option<TransactionRecord>> {
        let Some(mut slot) = self.transactions.get_mut(hash) else {
            return Ok(None);
        };

        let current = slot.record.status;
        if let Some(next) = patch.status {
            if !current.can_transition_to(next) {
                return Err(ApiError::Conflict(format!(
                    "transaction {hash} is already {current:?}, cannot become {next:?}"
                )));
            }
        }
        if current.is_terminal() && patch.changes(&slot.record) {
            return Err(ApiError::Conflict(format!(
                "transaction {hash} is already {current:?} and can no longer be modified"
            )));
        }

        patch.apply(&mut slot.record);
        Ok(Some(slot.record.clone()))
    }

    // ------------------------------------------------------------------
    // Contract events
    // ------------------------------------------------------------------

    pub fn list_contract_events(&self) -> Vec<ContractEventRecord> {
        newest_first(
            self.contract_events.iter().map(|e| e.value().clone()),
            |e: &ContractEventRecord| e.timestamp,
        )
    }

    pub fn create_contract_event(&self, new: NewContractEvent) -> ContractEventRecord {
        let id = Uuid::new_v4();
        let record = new.into_record(id, Utc::now());
        self.contract_events.insert(
            id,
            Slot {
                seq: self.next_seq(),
                record: record.clone(),
            },
        );
        record
    }

    // ------------------------------------------------------------------
    // Staking positions
    // ------------------------------------------------------------------

    pub fn list_staking_positions(&self, filter: &PositionFilter) -> Vec<StakingPosition> {
        let matches = |p: &StakingPosition| match filter {
            PositionFilter::All => true,
            PositionFilter::User(user) => p.user_address.eq_ignore_ascii_case(user),
            PositionFilter::Atom(atom) => p.atom_id == *atom,
        };

        newest_first(
            self.staking_positions
                .iter()
                .filter(|e| matches(&e.value().record))
                .map(|e| e.value().clone()),
            |p: &StakingPosition| p.timestamp,
        )
    }

    pub fn create_staking_position(&self, new: NewStakingPosition) -> StakingPosition {
        let id = Uuid::new_v4();
        let position = new.into_position(id, Utc::now());
        self.staking_positions.insert(
            id,
            Slot {
                seq: self.next_seq(),
                record: position.clone(),
            },
        );
        position
    }

    // ------------------------------------------------------------------
    // Stats
    // ------------------------------------------------------------------

    /// Atom count and the sum of all staked amounts, scaled from wei.
    ///
    /// Amounts that are not base-unit integers (only possible for records
    /// written before validation existed) are skipped.
    pub fn stats(&self) -> StoreStats {
        let total = self
            .staking_positions
            .iter()
            .filter_map(|e| parse_base_units(&e.value().record.amount))
            .fold(U256::zero(), |acc, amount| acc.saturating_add(amount));

        StoreStats {
            total_atoms: self.atoms.len(),
            total_staked: format_scaled(total, NATIVE_DECIMALS, 2),
        }
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort by timestamp descending, newest insertion first on ties
fn newest_first<T, I, F>(slots: I, timestamp: F) -> Vec<T>
where
    I: Iterator<Item = Slot<T>>,
    F: Fn(&T) -> DateTime<Utc>,
{
    let mut slots: Vec<Slot<T>> = slots.collect();
    slots.sort_by(|a, b| {
        timestamp(&b.record)
            .cmp(&timestamp(&a.record))
            .then(b.seq.cmp(&a.seq))
    });
    slots.into_iter().map(|slot| slot.record).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{TxKind, TxStatus};

    fn new_atom(atom_id: &str) -> NewAtom {
        NewAtom {
            chain_id: 1337,
            atom_id: atom_id.to_string(),
            name: format!("atom-{atom_id}"),
            creator: "0x1111111111111111111111111111111111111111".into(),
            ..Default::default()
        }
    }

    fn pending_tx(hash: &str) -> NewTransaction {
        NewTransaction {
            hash: hash.to_string(),
            kind: TxKind::Stake,
            from: "0x1111111111111111111111111111111111111111".into(),
            to: None,
            value: Some("1000".into()),
            gas_used: None,
            gas_price: None,
            status: TxStatus::Pending,
            block_number: None,
            atom_id: Some("1".into()),
        }
    }

    fn stake(user: &str, atom: &str, amount: &str) -> NewStakingPosition {
        NewStakingPosition {
            user_address: user.into(),
            atom_id: atom.into(),
            amount: amount.into(),
        }
    }

    #[test]
    fn test_create_and_get_atom() {
        let store = RecordStore::new();
        let atom = store.create_atom(new_atom("1")).unwrap();

        let fetched = store.get_atom(&atom.id).unwrap();
        assert_eq!(fetched, atom);
        assert_eq!(fetched.total_stake, "0");
        assert_eq!(fetched.stakeholder_count, "0");
        assert_eq!(
            store.get_atom_by_protocol_id(1337, "1").map(|a| a.id),
            Some(atom.id)
        );
    }

    #[test]
    fn test_duplicate_atom_rejected() {
        let store = RecordStore::new();
        store.create_atom(new_atom("1")).unwrap();
        assert!(matches!(
            store.create_atom(new_atom("1")),
            Err(ApiError::Conflict(_))
        ));

        // Same protocol id on another chain is a different atom
        let mut other = new_atom("1");
        other.chain_id = 1;
        assert!(store.create_atom(other).is_ok());
        assert_eq!(store.list_atoms().len(), 2);
    }

    #[test]
    fn test_list_atoms_newest_first_and_stable() {
        let store = RecordStore::new();
        for i in 0..5 {
            store.create_atom(new_atom(&i.to_string())).unwrap();
        }
        let first = store.list_atoms();
        let second = store.list_atoms();
        assert_eq!(first, second);
        assert_eq!(first[0].atom_id, "4");
        assert_eq!(first[4].atom_id, "0");
    }

    #[test]
    fn test_update_missing_atom() {
        let store = RecordStore::new();
        assert!(store.update_atom(&Uuid::new_v4(), AtomPatch::default()).is_none());
    }

    #[test]
    fn test_transaction_lifecycle() {
        let store = RecordStore::new();
        store.create_transaction(pending_tx("0xaaa")).unwrap();
        store.create_transaction(pending_tx("0xbbb")).unwrap();

        let updated = store
            .update_transaction(
                "0xaaa",
                TransactionPatch::settled(TxStatus::Confirmed, Some(10), Some("21000".into()), None),
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, TxStatus::Confirmed);
        assert_eq!(updated.block_number, Some(10));

        // The other record is untouched
        assert_eq!(store.get_transaction("0xbbb").unwrap().status, TxStatus::Pending);

        // Terminal records cannot go back
        let back = TransactionPatch {
            status: Some(TxStatus::Pending),
            ..Default::default()
        };
        assert!(matches!(
            store.update_transaction("0xaaa", back),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn test_settled_transaction_is_frozen() {
        let store = RecordStore::new();
        store.create_transaction(pending_tx("0xaaa")).unwrap();
        let settle = TransactionPatch::settled(
            TxStatus::Failed,
            Some(10),
            Some("21000".into()),
            Some("1000000000".into()),
        );
        let failed = store
            .update_transaction("0xaaa", settle.clone())
            .unwrap()
            .unwrap();

        // Same outcome written twice is accepted and changes nothing
        let again = store.update_transaction("0xaaa", settle).unwrap().unwrap();
        assert_eq!(again, failed);

        let rewrite = TransactionPatch {
            block_number: Some(11),
            gas_used: Some("1".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_transaction("0xaaa", rewrite),
            Err(ApiError::Conflict(_))
        ));

        let late_atom = TransactionPatch {
            atom_id: Some("9".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update_transaction("0xaaa", late_atom),
            Err(ApiError::Conflict(_))
        ));
        assert_eq!(store.get_transaction("0xaaa").unwrap(), failed);
    }

    #[test]
    fn test_update_unknown_hash_creates_nothing() {
        let store = RecordStore::new();
        let result = store
            .update_transaction("0xmissing", TransactionPatch::default())
            .unwrap();
        assert!(result.is_none());
        assert!(store.list_transactions().is_empty());
    }

    #[test]
    fn test_duplicate_hash_rejected() {
        let store = RecordStore::new();
        store.create_transaction(pending_tx("0xaaa")).unwrap();
        assert!(store.create_transaction(pending_tx("0xaaa")).is_err());
    }

    #[test]
    fn test_position_filters() {
        let store = RecordStore::new();
        store.create_staking_position(stake("0xAbC", "1", "10"));
        store.create_staking_position(stake("0xabc", "2", "20"));
        store.create_staking_position(stake("0xdef", "1", "30"));

        let by_user = store.list_staking_positions(&PositionFilter::User("0xABC".into()));
        assert_eq!(by_user.len(), 2);
        assert_eq!(by_user[0].amount, "20");

        let by_atom = store.list_staking_positions(&PositionFilter::Atom("1".into()));
        assert_eq!(by_atom.len(), 2);

        assert_eq!(store.list_staking_positions(&PositionFilter::All).len(), 3);
    }

    #[test]
    fn test_stats_sums_wei() {
        let store = RecordStore::new();
        store.create_atom(new_atom("1")).unwrap();
        store.create_staking_position(stake("0xa", "1", "1000000000000000000"));
        store.create_staking_position(stake("0xb", "1", "2000000000000000000"));

        let stats = store.stats();
        assert_eq!(stats.total_atoms, 1);
        assert_eq!(stats.total_staked, "3.00");
    }

    #[test]
    fn test_stats_empty() {
        let stats = RecordStore::new().stats();
        assert_eq!(stats.total_atoms, 0);
        assert_eq!(stats.total_staked, "0.00");
    }

    #[test]
    fn test_users() {
        let store = RecordStore::new();
        let user = store
            .create_user(NewUser {
                username: "alice".into(),
                password: "correct-horse".into(),
            })
            .unwrap();
        assert!(user.password_hash.starts_with("$argon2"));
        assert_eq!(store.get_user_by_username("alice").unwrap().id, user.id);
        assert!(store.get_user(&user.id).is_some());

        let dup = store.create_user(NewUser {
            username: "alice".into(),
            password: "other".into(),
        });
        assert!(matches!(dup, Err(ApiError::Conflict(_))));
    }
}
