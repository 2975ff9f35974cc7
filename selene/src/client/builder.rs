use crate::{
    client::{Client, ClientImpl},
    types::{FetchPolicy, Transport}
};
use parking_lot::Mutex;
use selene_normalized_cache::{Store, StoreConfig};
use std::sync::Arc;

pub struct ClientBuilder<T: Transport> {
    transport: T,
    store_config: StoreConfig,
    fetch_policy: FetchPolicy
}

impl<T: Transport> ClientBuilder<T> {
    pub fn new(transport: T) -> Self {
        ClientBuilder {
            transport,
            store_config: StoreConfig::default(),
            fetch_policy: FetchPolicy::LocalOnly
        }
    }

    /// Replace the whole store configuration.
    pub fn with_store_config(mut self, store_config: StoreConfig) -> Self {
        self.store_config = store_config;
        self
    }

    /// Add identifying fields, in stored form such as `"Person/id"`.
    pub fn with_id_attrs<I, S>(mut self, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>
    {
        self.store_config
            .id_attrs
            .extend(attrs.into_iter().map(Into::into));
        self
    }

    /// The fetch policy used when an operation doesn't pick its own.
    pub fn with_fetch_policy(mut self, fetch_policy: FetchPolicy) -> Self {
        self.fetch_policy = fetch_policy;
        self
    }

    pub fn build(self) -> Client<T> {
        let client = ClientImpl {
            transport: self.transport,
            store: Mutex::new(Arc::new(Store::new(self.store_config))),
            fetch_policy: self.fetch_policy
        };

        Client(Arc::new(client))
    }
}
