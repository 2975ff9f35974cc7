//! A GraphQL client core built around a normalized in-memory cache.
//!
//! Responses are normalized into a flat entity store
//! ([`selene_normalized_cache`]) so an update to one entity is visible to
//! every query that touches it. Queries run under one of four fetch
//! policies governing the interplay of cache and network, and deliver an
//! ordered stream of status messages.
//!
//! # Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use selene::{transport::HttpTransport, Client, FetchPolicy, Variables};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let document = graphql_parser::parse_query::<String>("{ viewer { id name } }")?
//!     .into_static();
//!
//! let client = Client::builder(HttpTransport::new("http://localhost:8080/graphql"))
//!     .with_id_attrs(["Person/id"])
//!     .with_fetch_policy(FetchPolicy::LocalFirst)
//!     .build();
//!
//! let mut messages = client.query(document, Variables::new())?;
//! while let Some(message) = messages.next().await {
//!     println!("{:?}: {:?}", message.network_status, message.data);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Fetch policies
//!
//! * [`FetchPolicy::LocalOnly`] — read the cache, never fetch.
//! * [`FetchPolicy::LocalFirst`] — fetch only on a cache miss.
//! * [`FetchPolicy::LocalThenRemote`] — deliver the cached tree, then the
//!   merged network result.
//! * [`FetchPolicy::RemoteOnly`] — skip the cache on the way in; the
//!   result still merges back.
//!
//! Mutations take an optional optimistic result that is written to the
//! store and delivered immediately, then overwritten by the real response
//! field by field. Optimistic state is not rolled back on failure: the
//! `Failed` message is the caller's signal to reconcile.
//!
//! # Transports
//!
//! The network layer is one async operation:
//! [`Transport::execute`] returns a stream delivering exactly one
//! response. The default [`transport::HttpTransport`] POSTs JSON with
//! `reqwest`; anything else (test doubles, batching layers, websockets)
//! just implements the trait.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::HashMap, fmt, fmt::Display};

pub mod client;
mod engine;
mod error;
#[cfg(feature = "http")]
pub mod transport;
mod types;

pub use client::{Client, ClientBuilder};
pub use error::{QueryError, TransportError};
pub use selene_normalized_cache as cache;
pub use selene_normalized_cache::{Document, EntityRef, Store, StoreConfig, Variables};
pub use types::{
    Context, FetchPolicy, Messages, NetworkStatus, Operation, OperationType, QueryBody,
    QueryMessage, QueryOptions, ResultStream, Transport
};

/// The generic shape of a GraphQL response body.
///
/// ```
/// # use serde_json::json;
/// use selene::Response;
///
/// let body: Response = serde_json::from_value(json!({
///     "data": { "viewer": { "id": "p1" } }
/// })).unwrap();
/// assert!(body.data.is_some());
/// assert!(body.errors.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// The absent, partial or complete response data.
    pub data: Option<Value>,
    /// The top-level errors returned by the server.
    pub errors: Option<Vec<Error>>
}

/// An element in the top-level `errors` array of a response body.
///
/// [Spec](https://github.com/facebook/graphql/blob/master/spec/Section%207%20--%20Response.md)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Error {
    /// The error text. Servers must send this; everything else is optional.
    pub message: String,
    /// Positions in the query string the error points at.
    pub locations: Option<Vec<Location>>,
    /// The response path the error applies to, e.g. `["users", 0, "email"]`.
    pub path: Option<Vec<PathFragment>>,
    /// Server-defined extra payload.
    pub extensions: Option<HashMap<String, Value>>
}

impl Display for Error {
    /// Renders as `path:line:column: message`, with the path segments
    /// slash-separated and `<query>` standing in when no path was given.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.path.as_deref() {
            Some(fragments) => {
                for (index, fragment) in fragments.iter().enumerate() {
                    if index > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{}", fragment)?;
                }
            }
            None => f.write_str("<query>")?
        }
        let (line, column) = self
            .locations
            .as_deref()
            .and_then(<[Location]>::first)
            .map(|location| (location.line, location.column))
            .unwrap_or((0, 0));
        write!(f, ":{}:{}: {}", line, column, self.message)
    }
}

/// One step of an error path: an object key or an array index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PathFragment {
    Key(String),
    Index(i32)
}

impl Display for PathFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFragment::Key(key) => f.write_str(key),
            PathFragment::Index(index) => write!(f, "{}", index)
        }
    }
}

/// A 1-based line/column position inside the query string.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub line: i32,
    pub column: i32
}
