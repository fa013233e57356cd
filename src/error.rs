//! Error types for the herd cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache layer, its store clients and the HTTP surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found (arithmetic on an absent key, or a miss over HTTP)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid key, oversized value or bad configuration value
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store could not be reached or broke the protocol
    #[error("Store error: {0}")]
    Store(String),

    /// The store refused the operation on this key, the connection is fine
    #[error("Rejected by store: {0}")]
    Rejected(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Returns true for failures that leave the store client unusable.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, CacheError::Store(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Serialization(_) => StatusCode::BAD_REQUEST,
            CacheError::Store(_) => StatusCode::BAD_GATEWAY,
            CacheError::Rejected(_) => StatusCode::CONFLICT,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache layer.
pub type Result<T> = std::result::Result<T, CacheError>;
