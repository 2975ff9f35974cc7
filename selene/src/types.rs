use crate::{error::TransportError, QueryError, Response, Variables};
use async_trait::async_trait;
use futures::{channel::mpsc, stream::BoxStream, Stream};
use serde::Serialize;
use serde_json::{Map, Value};
use std::{
    fmt,
    pin::Pin,
    str::FromStr,
    task::{Context as TaskContext, Poll}
};

pub use selene_normalized_cache::OperationKind as OperationType;

/// Governs the interplay of the local cache and the network for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Read the cache, never fetch.
    LocalOnly,
    /// Read the cache; fetch only when the local read came up empty.
    LocalFirst,
    /// Deliver the local read, then always fetch.
    LocalThenRemote,
    /// Skip the cache entirely on the way in; the result still merges back.
    RemoteOnly
}

impl FromStr for FetchPolicy {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, QueryError> {
        match s {
            "local-only" => Ok(FetchPolicy::LocalOnly),
            "local-first" => Ok(FetchPolicy::LocalFirst),
            "local-then-remote" => Ok(FetchPolicy::LocalThenRemote),
            "remote-only" => Ok(FetchPolicy::RemoteOnly),
            other => Err(QueryError::InvalidFetchPolicy(other.to_string()))
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchPolicy::LocalOnly => "local-only",
            FetchPolicy::LocalFirst => "local-first",
            FetchPolicy::LocalThenRemote => "local-then-remote",
            FetchPolicy::RemoteOnly => "remote-only"
        };
        write!(f, "{}", name)
    }
}

/// Where an operation currently stands with respect to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    Ready,
    Fetching,
    Failed
}

/// One element of the ordered stream a query or mutation delivers.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMessage {
    /// The denormalized data, possibly null.
    pub data: Option<Value>,
    /// The variables the operation ran with.
    pub variables: Variables,
    /// Whether a network fetch is still outstanding.
    pub in_flight: bool,
    pub network_status: NetworkStatus
}

/// An opaque map forwarded to the transport untouched.
pub type Context = Map<String, Value>;

/// The form in which operations are sent over HTTP.
#[derive(Debug, Clone, Serialize)]
pub struct QueryBody {
    pub variables: Value,
    pub query: String,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>
}

/// Everything a transport needs to execute one operation.
#[derive(Debug, Clone)]
pub struct Operation {
    pub body: QueryBody,
    pub operation_type: OperationType,
    pub context: Context
}

/// Delivers exactly one response, then closes.
pub type ResultStream = BoxStream<'static, Response>;

/// The single operation the network layer must provide.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn execute(&self, operation: Operation) -> Result<ResultStream, TransportError>;
}

/// Per-operation options.
#[derive(Default)]
pub struct QueryOptions {
    /// Overrides the client's default fetch policy.
    pub fetch_policy: Option<FetchPolicy>,
    /// Forwarded to the transport untouched.
    pub context: Option<Context>,
    /// Accepted for interface parity; the reader tolerates missing fields
    /// either way.
    pub return_partial: bool,
    /// Deliver messages onto this sender instead of a fresh stream. The
    /// returned [`Messages`] is then empty.
    pub out_stream: Option<mpsc::Sender<QueryMessage>>,
    /// Mutations only: written to the store before the network round-trip.
    pub optimistic_result: Option<Value>
}

/// The ordered message stream returned by `query` and `mutate`.
///
/// Dropping it cancels delivery of further messages; it does not abort the
/// in-flight transport request, and a late response is still written to
/// the store.
#[derive(Debug)]
pub struct Messages {
    receiver: Option<mpsc::Receiver<QueryMessage>>
}

impl Messages {
    pub(crate) fn new(receiver: mpsc::Receiver<QueryMessage>) -> Self {
        Self {
            receiver: Some(receiver)
        }
    }

    /// Placeholder returned when the caller supplied their own out stream.
    pub(crate) fn detached() -> Self {
        Self { receiver: None }
    }
}

impl Stream for Messages {
    type Item = QueryMessage;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>
    ) -> Poll<Option<QueryMessage>> {
        match self.receiver.as_mut() {
            Some(receiver) => Pin::new(receiver).poll_next(cx),
            None => Poll::Ready(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FetchPolicy;
    use crate::QueryError;

    #[test]
    fn fetch_policies_parse_from_their_names() {
        assert_eq!("local-only".parse::<FetchPolicy>().unwrap(), FetchPolicy::LocalOnly);
        assert_eq!("local-first".parse::<FetchPolicy>().unwrap(), FetchPolicy::LocalFirst);
        assert_eq!(
            "local-then-remote".parse::<FetchPolicy>().unwrap(),
            FetchPolicy::LocalThenRemote
        );
        assert_eq!("remote-only".parse::<FetchPolicy>().unwrap(), FetchPolicy::RemoteOnly);
    }

    #[test]
    fn unknown_fetch_policies_are_rejected() {
        let err = "cache-and-network".parse::<FetchPolicy>().unwrap_err();
        assert!(matches!(err, QueryError::InvalidFetchPolicy(name) if name == "cache-and-network"));
    }

    #[test]
    fn fetch_policies_display_as_their_names() {
        assert_eq!(FetchPolicy::LocalThenRemote.to_string(), "local-then-remote");
    }
}
