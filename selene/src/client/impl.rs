use crate::{
    engine::{self, Plan},
    error::QueryError,
    types::{FetchPolicy, Messages, QueryMessage, QueryOptions, Transport}
};
use futures::channel::mpsc;
use parking_lot::Mutex;
use selene_normalized_cache::{
    operation_meta, Document, EntityRecord, OperationKind, Store, StoreError, Variables
};
use serde_json::Value;
use std::sync::Arc;

pub struct ClientImpl<T: Transport> {
    pub(crate) transport: T,
    /// The single cell holding the current store snapshot.
    pub(crate) store: Mutex<Arc<Store>>,
    pub(crate) fetch_policy: FetchPolicy
}

impl<T: Transport> ClientImpl<T> {
    /// The current snapshot, by value. Readers never block writers for
    /// longer than the clone of an `Arc`.
    pub fn snapshot(&self) -> Arc<Store> {
        self.store.lock().clone()
    }

    /// Compute a new snapshot from the current one and install it. The
    /// closure runs under the cell lock and must not block; a failed
    /// update leaves the previous snapshot in place.
    pub(crate) fn commit<F>(&self, update: F) -> Result<(Arc<Store>, EntityRecord), StoreError>
    where
        F: FnOnce(&Store) -> Result<(Store, EntityRecord), StoreError>
    {
        let mut cell = self.store.lock();
        let (next, record) = update(&cell)?;
        let next = Arc::new(next);
        *cell = next.clone();
        Ok((next, record))
    }

    pub fn read(
        &self,
        document: &Document,
        variables: &Variables
    ) -> Result<Option<Value>, QueryError> {
        Ok(self.snapshot().read(document, variables, false)?)
    }

    pub fn write(
        &self,
        data: &Value,
        document: &Document,
        variables: &Variables
    ) -> Result<(), QueryError> {
        self.commit(|store| store.write(data, document, variables))?;
        Ok(())
    }

    pub fn query_with_options(
        self: &Arc<Self>,
        document: Document,
        variables: Variables,
        options: QueryOptions
    ) -> Result<Messages, QueryError> {
        let meta = operation_meta(&document)?;
        if meta.kind != OperationKind::Query {
            return Err(QueryError::Store(StoreError::UnsupportedOperation(
                "non-query documents go through Client::mutate".into()
            )));
        }
        let policy = options.fetch_policy.unwrap_or(self.fetch_policy);
        let (sender, messages) = channel_for(options.out_stream);
        let plan = Plan {
            document: Arc::new(document),
            operation_name: meta.name,
            variables,
            context: options.context.unwrap_or_default(),
            return_partial: options.return_partial
        };
        tokio::spawn(engine::run_query(self.clone(), plan, policy, sender));
        Ok(messages)
    }

    pub fn mutate_with_options(
        self: &Arc<Self>,
        document: Document,
        variables: Variables,
        options: QueryOptions
    ) -> Result<Messages, QueryError> {
        let meta = operation_meta(&document)?;
        if meta.kind != OperationKind::Mutation {
            return Err(QueryError::Store(StoreError::UnsupportedOperation(
                "non-mutation documents go through Client::query".into()
            )));
        }
        let (sender, messages) = channel_for(options.out_stream);
        let plan = Plan {
            document: Arc::new(document),
            operation_name: meta.name,
            variables,
            context: options.context.unwrap_or_default(),
            return_partial: options.return_partial
        };
        tokio::spawn(engine::run_mutation(
            self.clone(),
            plan,
            options.optimistic_result,
            sender
        ));
        Ok(messages)
    }
}

fn channel_for(out_stream: Option<mpsc::Sender<QueryMessage>>) -> (mpsc::Sender<QueryMessage>, Messages) {
    match out_stream {
        Some(sender) => (sender, Messages::detached()),
        None => {
            let (sender, receiver) = mpsc::channel(8);
            (sender, Messages::new(receiver))
        }
    }
}
