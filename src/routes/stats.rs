//! Dashboard totals

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use super::json_response;
use crate::records::RecordStore;
use crate::types::Result;

pub fn get(store: &RecordStore) -> Result<Response<Full<Bytes>>> {
    json_response(StatusCode::OK, &store.stats())
}
