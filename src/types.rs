//! Server-side error type shared by the record store and the REST routes

use hyper::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// One schema violation in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Dotted path of the offending field ("" for the whole body)
    pub path: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid {entity} data")]
    Validation {
        entity: &'static str,
        issues: Vec<FieldIssue>,
    },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) | ApiError::Io(_) | ApiError::Json(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body sent to clients. Internal details stay in the logs.
    pub fn body(&self) -> serde_json::Value {
        match self {
            ApiError::Validation { issues, .. } => serde_json::json!({
                "error": self.to_string(),
                "details": issues,
            }),
            ApiError::Internal(_) | ApiError::Io(_) | ApiError::Json(_) => {
                serde_json::json!({ "error": "Internal server error" })
            }
            _ => serde_json::json!({ "error": self.to_string() }),
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_body_lists_issues() {
        let err = ApiError::Validation {
            entity: "atom",
            issues: vec![FieldIssue::new("name", "Required")],
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = err.body();
        assert_eq!(body["error"], "Invalid atom data");
        assert_eq!(body["details"][0]["path"], "name");
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err = ApiError::Internal("lock poisoned at store.rs".into());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body()["error"], "Internal server error");
    }

    #[test]
    fn test_not_found_message() {
        let err = ApiError::NotFound("Transaction");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.body()["error"], "Transaction not found");
    }
}
