//! Staking positions

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Deserialize;

use super::json_response;
use crate::records::{parse_body, NewStakingPosition, PositionFilter, RecordStore};
use crate::types::{ApiError, FieldIssue, Result};

#[derive(Debug, Default, Deserialize)]
struct PositionQuery {
    user: Option<String>,
    atom: Option<String>,
}

impl PositionQuery {
    /// `user` wins when both are given; empty values are ignored
    fn into_filter(self) -> PositionFilter {
        match (
            self.user.filter(|u| !u.is_empty()),
            self.atom.filter(|a| !a.is_empty()),
        ) {
            (Some(user), _) => PositionFilter::User(user),
            (None, Some(atom)) => PositionFilter::Atom(atom),
            (None, None) => PositionFilter::All,
        }
    }
}

fn parse_filter(query: Option<&str>) -> Result<PositionFilter> {
    let Some(query) = query else {
        return Ok(PositionFilter::All);
    };
    serde_urlencoded::from_str::<PositionQuery>(query)
        .map(PositionQuery::into_filter)
        .map_err(|e| ApiError::Validation {
            entity: "query",
            issues: vec![FieldIssue::new("", e.to_string())],
        })
}

pub fn list(store: &RecordStore, query: Option<&str>) -> Result<Response<Full<Bytes>>> {
    let filter = parse_filter(query)?;
    json_response(StatusCode::OK, &store.list_staking_positions(&filter))
}

pub fn create(store: &RecordStore, body: &[u8]) -> Result<Response<Full<Bytes>>> {
    let new: NewStakingPosition = parse_body(body)?;
    json_response(StatusCode::CREATED, &store.create_staking_position(new))
}
