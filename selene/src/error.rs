use selene_normalized_cache::StoreError;
use std::{error::Error, fmt};

/// Errors produced by the transport layer.
#[derive(Debug)]
pub enum TransportError {
    /// The request never produced a response.
    Network(Box<dyn Error + Send + Sync>),
    /// The response body couldn't be decoded.
    Decode(String),
    /// The result stream closed without delivering a response.
    Closed
}

impl Error for TransportError {}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Network(e) => write!(f, "fetch error: {}", e),
            TransportError::Decode(msg) => write!(f, "decoding error: {}", msg),
            TransportError::Closed => {
                write!(f, "result stream closed without delivering a response")
            }
        }
    }
}

/// Errors surfaced synchronously by [`Client`](crate::Client) operations.
#[derive(Debug)]
pub enum QueryError {
    /// The requested fetch policy doesn't exist.
    InvalidFetchPolicy(String),
    /// The cache rejected the operation.
    Store(StoreError),
    /// The transport failed outright.
    Transport(TransportError)
}

impl Error for QueryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            QueryError::InvalidFetchPolicy(_) => None,
            QueryError::Store(e) => Some(e),
            QueryError::Transport(e) => Some(e)
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::InvalidFetchPolicy(name) => write!(f, "invalid fetch policy: {}", name),
            QueryError::Store(e) => write!(f, "{}", e),
            QueryError::Transport(e) => write!(f, "{}", e)
        }
    }
}

impl From<StoreError> for QueryError {
    fn from(e: StoreError) -> Self {
        QueryError::Store(e)
    }
}

impl From<TransportError> for QueryError {
    fn from(e: TransportError) -> Self {
        QueryError::Transport(e)
    }
}
