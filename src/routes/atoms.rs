//! Atom records

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use uuid::Uuid;

use super::json_response;
use crate::records::{parse_body, AtomPatch, NewAtom, RecordStore};
use crate::types::{ApiError, Result};

pub fn list(store: &RecordStore) -> Result<Response<Full<Bytes>>> {
    json_response(StatusCode::OK, &store.list_atoms())
}

/// Ids that are not UUIDs cannot exist, so they are plain 404s
pub fn get(store: &RecordStore, id: &str) -> Result<Response<Full<Bytes>>> {
    let atom = Uuid::parse_str(id)
        .ok()
        .and_then(|id| store.get_atom(&id))
        .ok_or(ApiError::NotFound("Atom"))?;
    json_response(StatusCode::OK, &atom)
}

pub fn create(store: &RecordStore, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let new: NewAtom = parse_body(body)?;
    let atom = store.create_atom(new)?;
    json_response(StatusCode::CREATED, &atom)
}

pub fn update(store: &RecordStore, id: &str, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let id = Uuid::parse_str(id).map_err(|_| ApiError::NotFound("Atom"))?;
    let patch: AtomPatch = parse_body(body)?;
    let atom = store.update_atom(&id, patch).ok_or(ApiError::NotFound("Atom"))?;
    json_response(StatusCode::OK, &atom)
}
