use std::sync::Arc;

mod builder;
mod r#impl;

use crate::{
    error::QueryError,
    types::{Messages, QueryOptions, Transport}
};
pub use builder::ClientBuilder;
pub use r#impl::ClientImpl;
use selene_normalized_cache::{Document, Store, Variables};
use serde_json::Value;

/// A GraphQL client: one transport plus one atomically swapped store
/// snapshot. Cloning is cheap and shares both.
#[derive(Clone)]
pub struct Client<T: Transport>(pub Arc<ClientImpl<T>>);

impl<T: Transport> Client<T> {
    pub fn builder(transport: T) -> ClientBuilder<T> {
        ClientBuilder::new(transport)
    }

    /// Run a query under the client's default fetch policy. Must be called
    /// within a tokio runtime; the operation runs on its own task.
    pub fn query(
        &self,
        document: Document,
        variables: Variables
    ) -> Result<Messages, QueryError> {
        self.0
            .query_with_options(document, variables, QueryOptions::default())
    }

    pub fn query_with_options(
        &self,
        document: Document,
        variables: Variables,
        options: QueryOptions
    ) -> Result<Messages, QueryError> {
        self.0.query_with_options(document, variables, options)
    }

    /// Run a mutation. Must be called within a tokio runtime.
    pub fn mutate(
        &self,
        document: Document,
        variables: Variables
    ) -> Result<Messages, QueryError> {
        self.0
            .mutate_with_options(document, variables, QueryOptions::default())
    }

    pub fn mutate_with_options(
        &self,
        document: Document,
        variables: Variables,
        options: QueryOptions
    ) -> Result<Messages, QueryError> {
        self.0.mutate_with_options(document, variables, options)
    }

    /// Read an operation from the current snapshot, without the network.
    pub fn read(
        &self,
        document: &Document,
        variables: &Variables
    ) -> Result<Option<Value>, QueryError> {
        self.0.read(document, variables)
    }

    /// Write response data for an operation straight into the store.
    pub fn write(
        &self,
        data: &Value,
        document: &Document,
        variables: &Variables
    ) -> Result<(), QueryError> {
        self.0.write(data, document, variables)
    }

    /// The current store snapshot.
    pub fn store(&self) -> Arc<Store> {
        self.0.snapshot()
    }
}
