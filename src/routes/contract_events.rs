//! Contract event log (append-only)

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use super::json_response;
use crate::records::{parse_body, NewContractEvent, RecordStore};
use crate::types::Result;

pub fn list(store: &RecordStore) -> Result<Response<Full<Bytes>>> {
    json_response(StatusCode::OK, &store.list_contract_events())
}

pub fn create(store: &RecordStore, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let new: NewContractEvent = parse_body(body)?;
    json_response(StatusCode::CREATED, &store.create_contract_event(new))
}
