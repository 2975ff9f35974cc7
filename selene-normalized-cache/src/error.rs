use std::{error::Error, fmt};

/// Errors surfaced by cache reads and writes.
///
/// A failed write never partially applies: the previous snapshot stays
/// installed. A failed read yields no data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A selection could not be turned into a field key.
    Encode(String),
    /// A map mixed entity and non-entity values during normalization.
    MixedEntityMap(String),
    /// A pull pattern recursed into a field whose value is not a reference.
    PullNotRef(String),
    /// The pull pattern contained an unrecognized form.
    InvalidPullForm(String),
    /// A fragment spread referenced a fragment the document doesn't define.
    UnknownFragment(String),
    /// The document contains no operation the cache can process.
    UnsupportedOperation(String)
}

impl Error for StoreError {}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Encode(msg) => write!(f, "couldn't encode field key: {}", msg),
            StoreError::MixedEntityMap(field) => {
                write!(f, "map under {} mixes entity and non-entity values", field)
            }
            StoreError::PullNotRef(field) => {
                write!(f, "can't recurse into {}: stored value is not a reference", field)
            }
            StoreError::InvalidPullForm(msg) => write!(f, "invalid pull pattern: {}", msg),
            StoreError::UnknownFragment(name) => write!(f, "unknown fragment {}", name),
            StoreError::UnsupportedOperation(msg) => write!(f, "unsupported operation: {}", msg)
        }
    }
}
