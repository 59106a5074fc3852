//! Notices telling readers which REST collections changed

use tokio::sync::broadcast;

const CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Atoms,
    Transactions,
    StakingPositions,
    ContractEvents,
    Stats,
}

impl QueryKey {
    /// REST collection to re-fetch
    pub fn path(&self) -> &'static str {
        match self {
            QueryKey::Atoms => "/api/atoms",
            QueryKey::Transactions => "/api/transactions",
            QueryKey::StakingPositions => "/api/staking-positions",
            QueryKey::ContractEvents => "/api/contract-events",
            QueryKey::Stats => "/api/stats",
        }
    }
}

#[derive(Clone)]
pub struct Invalidations {
    tx: broadcast::Sender<QueryKey>,
}

impl Invalidations {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    /// Nobody listening is fine
    pub fn publish(&self, keys: &[QueryKey]) {
        for key in keys {
            let _ = self.tx.send(*key);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.tx.subscribe()
    }
}

impl Default for Invalidations {
    fn default() -> Self {
        Self::new()
    }
}
