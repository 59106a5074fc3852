//! Transaction records, addressed by hash

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use super::json_response;
use crate::records::{parse_body, NewTransaction, RecordStore, TransactionPatch};
use crate::types::{ApiError, Result};

pub fn list(store: &RecordStore) -> Result<Response<Full<Bytes>>> {
    json_response(StatusCode::OK, &store.list_transactions())
}

pub fn get(store: &RecordStore, hash: &str) -> Result<Response<Full<Bytes>>> {
    let tx = store
        .get_transaction(hash)
        .ok_or(ApiError::NotFound("Transaction"))?;
    json_response(StatusCode::OK, &tx)
}

pub fn create(store: &RecordStore, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let new: NewTransaction = parse_body(body)?;
    let tx = store.create_transaction(new)?;
    json_response(StatusCode::CREATED, &tx)
}

/// Partial update. An unknown hash is a 404; nothing is created.
pub fn update(store: &RecordStore, hash: &str, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let patch: TransactionPatch = parse_body(body)?;
    let tx = store
        .update_transaction(hash, patch)?
        .ok_or(ApiError::NotFound("Transaction"))?;
    json_response(StatusCode::OK, &tx)
}
