use thiserror::Error;

/// Errors produced while building response metadata.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    #[error("invalid request target: {0}")]
    InvalidUri(String),

    #[error("invalid status code: {0}")]
    InvalidStatus(u16),
}
