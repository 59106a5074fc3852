//! Where mirrored records are written
//!
//! The CLI writes through [`RestSink`] to a running atomgate server.
//! Embedders and tests can hand the mirror an `Arc<RecordStore>` directly;
//! it goes through the same schema checks as the REST surface.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::records::{
    Atom, ContractEventRecord, NewAtom, NewContractEvent, NewStakingPosition, NewTransaction,
    RecordStore, Schema, StakingPosition, TransactionPatch, TransactionRecord,
};
use crate::types::ApiError;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Record store rejected write ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Record store unreachable: {0}")]
    Transport(String),

    #[error("Unexpected record store response: {0}")]
    InvalidResponse(String),
}

impl From<ApiError> for SinkError {
    fn from(err: ApiError) -> Self {
        SinkError::Rejected {
            status: err.status().as_u16(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SinkError>;

#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn create_transaction(&self, tx: NewTransaction) -> Result<TransactionRecord>;

    /// `Ok(None)` when no record exists for `hash`
    async fn update_transaction(
        &self,
        hash: &str,
        patch: TransactionPatch,
    ) -> Result<Option<TransactionRecord>>;

    async fn create_atom(&self, atom: NewAtom) -> Result<Atom>;

    async fn create_staking_position(&self, position: NewStakingPosition) -> Result<StakingPosition>;

    async fn create_contract_event(&self, event: NewContractEvent) -> Result<ContractEventRecord>;
}

#[async_trait]
impl RecordSink for RecordStore {
    async fn create_transaction(&self, tx: NewTransaction) -> Result<TransactionRecord> {
        tx.validate()?;
        Ok(RecordStore::create_transaction(self, tx)?)
    }

    async fn update_transaction(
        &self,
        hash: &str,
        patch: TransactionPatch,
    ) -> Result<Option<TransactionRecord>> {
        patch.validate()?;
        Ok(RecordStore::update_transaction(self, hash, patch)?)
    }

    async fn create_atom(&self, atom: NewAtom) -> Result<Atom> {
        atom.validate()?;
        Ok(RecordStore::create_atom(self, atom)?)
    }

    async fn create_staking_position(&self, position: NewStakingPosition) -> Result<StakingPosition> {
        position.validate()?;
        Ok(RecordStore::create_staking_position(self, position))
    }

    async fn create_contract_event(&self, event: NewContractEvent) -> Result<ContractEventRecord> {
        event.validate()?;
        Ok(RecordStore::create_contract_event(self, event))
    }
}

/// Writes over HTTP to the REST surface
pub struct RestSink {
    base_url: String,
    http_client: reqwest::Client,
}

impl RestSink {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("atomgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client,
        }
    }

    async fn send<B, T>(&self, method: reqwest::Method, path: &str, body: &B) -> Result<Option<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Mirroring record");

        let response = self
            .http_client
            .request(method, &url)
            .json(body)
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| SinkError::InvalidResponse(e.to_string()))
    }

    async fn create<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        self.send(reqwest::Method::POST, path, body)
            .await?
            .ok_or_else(|| SinkError::Rejected {
                status: 404,
                message: format!("{path} not found"),
            })
    }
}

#[async_trait]
impl RecordSink for RestSink {
    async fn create_transaction(&self, tx: NewTransaction) -> Result<TransactionRecord> {
        self.create("/api/transactions", &tx).await
    }

    async fn update_transaction(
        &self,
        hash: &str,
        patch: TransactionPatch,
    ) -> Result<Option<TransactionRecord>> {
        self.send(
            reqwest::Method::PUT,
            &format!("/api/transactions/{hash}"),
            &patch,
        )
        .await
    }

    async fn create_atom(&self, atom: NewAtom) -> Result<Atom> {
        self.create("/api/atoms", &atom).await
    }

    async fn create_staking_position(&self, position: NewStakingPosition) -> Result<StakingPosition> {
        self.create("/api/staking-positions", &position).await
    }

    async fn create_contract_event(&self, event: NewContractEvent) -> Result<ContractEventRecord> {
        self.create("/api/contract-events", &event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{TxKind, TxStatus};

    #[tokio::test]
    async fn test_store_sink_validates() {
        let store = RecordStore::new();
        let bad = NewStakingPosition {
            user_address: "0xabc".into(),
            atom_id: "1".into(),
            amount: "1.5".into(),
        };
        match RecordSink::create_staking_position(&store, bad).await {
            Err(SinkError::Rejected { status, .. }) => assert_eq!(status, 400),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_sink_update_missing() {
        let store = RecordStore::new();
        let result = RecordSink::update_transaction(&store, "0xnope", TransactionPatch::default())
            .await
            .unwrap();
        assert!(result.is_none());

        let tx = NewTransaction {
            hash: "0x01".into(),
            kind: TxKind::Reward,
            from: "0xabc".into(),
            to: None,
            value: None,
            gas_used: None,
            gas_price: None,
            status: TxStatus::Pending,
            block_number: None,
            atom_id: None,
        };
        RecordSink::create_transaction(&store, tx.clone()).await.unwrap();
        match RecordSink::create_transaction(&store, tx).await {
            Err(SinkError::Rejected { status, .. }) => assert_eq!(status, 409),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rest_sink_unreachable() {
        let sink = RestSink::new("http://127.0.0.1:1/", Duration::from_millis(500));
        let err = sink
            .create_atom(NewAtom::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Transport(_)));
    }
}
