//! The fetch-policy state machine and the mutation flow.
//!
//! Each operation runs on its own task and pushes messages onto a bounded
//! channel in the order the policy prescribes. All store updates happen
//! between suspension points, so a write is atomic with respect to every
//! other cache operation. A dropped receiver stops delivery only: the
//! transport wait and the merge into the store still run to completion.

use crate::{
    client::ClientImpl,
    error::TransportError,
    types::{
        Context, FetchPolicy, NetworkStatus, Operation, OperationType, QueryBody, QueryMessage,
        Transport
    },
    Response, Variables
};
use futures::{channel::mpsc::Sender, SinkExt, StreamExt};
use selene_normalized_cache::Document;
use serde_json::Value;
use std::sync::Arc;

pub(crate) struct Plan {
    pub document: Arc<Document>,
    pub operation_name: Option<String>,
    pub variables: Variables,
    pub context: Context,
    pub return_partial: bool
}

impl Plan {
    fn operation(&self, operation_type: OperationType) -> Operation {
        Operation {
            body: QueryBody {
                variables: Value::Object(self.variables.clone()),
                query: self.document.to_string(),
                operation_name: self.operation_name.clone()
            },
            operation_type,
            context: self.context.clone()
        }
    }

    fn message(
        &self,
        data: Option<Value>,
        in_flight: bool,
        network_status: NetworkStatus
    ) -> QueryMessage {
        QueryMessage {
            data,
            variables: self.variables.clone(),
            in_flight,
            network_status
        }
    }
}

pub(crate) async fn run_query<T: Transport>(
    client: Arc<ClientImpl<T>>,
    plan: Plan,
    policy: FetchPolicy,
    mut out: Sender<QueryMessage>
) {
    tracing::trace!(%policy, "query start");
    let local = match policy {
        FetchPolicy::RemoteOnly => None,
        _ => read_local(&client, &plan)
    };

    match policy {
        FetchPolicy::LocalOnly => {
            deliver(&mut out, plan.message(local, false, NetworkStatus::Ready)).await;
        }
        FetchPolicy::LocalFirst => {
            if local.is_some() {
                deliver(&mut out, plan.message(local, false, NetworkStatus::Ready)).await;
            } else {
                deliver(&mut out, plan.message(None, true, NetworkStatus::Fetching)).await;
                fetch_merge_deliver(&client, &plan, &mut out).await;
            }
        }
        FetchPolicy::LocalThenRemote => {
            deliver(&mut out, plan.message(local, true, NetworkStatus::Fetching)).await;
            fetch_merge_deliver(&client, &plan, &mut out).await;
        }
        FetchPolicy::RemoteOnly => {
            deliver(&mut out, plan.message(None, true, NetworkStatus::Fetching)).await;
            fetch_merge_deliver(&client, &plan, &mut out).await;
        }
    }
}

pub(crate) async fn run_mutation<T: Transport>(
    client: Arc<ClientImpl<T>>,
    plan: Plan,
    optimistic_result: Option<Value>,
    mut out: Sender<QueryMessage>
) {
    if let Some(optimistic) = &optimistic_result {
        let written =
            client.commit(|store| store.write(optimistic, &plan.document, &plan.variables));
        if let Err(error) = written {
            tracing::warn!(%error, "optimistic write failed");
        }
    }
    deliver(
        &mut out,
        plan.message(optimistic_result, true, NetworkStatus::Fetching)
    )
    .await;

    match fetch(&client, &plan, OperationType::Mutation).await {
        Ok(Response {
            data: Some(data), ..
        }) => {
            let written =
                client.commit(|store| store.write(&data, &plan.document, &plan.variables));
            match written {
                Ok((snapshot, record)) => {
                    let read_back = snapshot
                        .read_response(&plan.document, &plan.variables, &record)
                        .ok()
                        .flatten();
                    let data = read_back.or(Some(data));
                    deliver(&mut out, plan.message(data, false, NetworkStatus::Ready)).await;
                }
                Err(error) => {
                    tracing::warn!(%error, "mutation write failed");
                    deliver(&mut out, plan.message(None, false, NetworkStatus::Failed)).await;
                }
            }
        }
        Ok(response) => {
            tracing::debug!(errors = ?response.errors, "mutation returned no data");
            deliver(&mut out, plan.message(None, false, NetworkStatus::Failed)).await;
        }
        Err(error) => {
            tracing::debug!(%error, "mutation transport failed");
            deliver(&mut out, plan.message(None, false, NetworkStatus::Failed)).await;
        }
    }
}

/// Fetch, merge into the store, read the merged form back, deliver it.
/// This runs even when the output stream is already closed, so a late
/// response for a cancelled query still lands in the cache.
async fn fetch_merge_deliver<T: Transport>(
    client: &Arc<ClientImpl<T>>,
    plan: &Plan,
    out: &mut Sender<QueryMessage>
) {
    match fetch(client, plan, OperationType::Query).await {
        Ok(Response {
            data: Some(data), ..
        }) => {
            let written =
                client.commit(|store| store.write(&data, &plan.document, &plan.variables));
            match written {
                Ok((snapshot, _)) => {
                    let merged = snapshot
                        .read(&plan.document, &plan.variables, plan.return_partial)
                        .ok()
                        .flatten();
                    let data = merged.or(Some(data));
                    deliver(out, plan.message(data, false, NetworkStatus::Ready)).await;
                }
                Err(error) => {
                    tracing::warn!(%error, "cache write failed");
                    deliver(out, plan.message(None, false, NetworkStatus::Failed)).await;
                }
            }
        }
        Ok(response) => {
            tracing::debug!(errors = ?response.errors, "server returned no data");
            deliver(out, plan.message(None, false, NetworkStatus::Failed)).await;
        }
        Err(error) => {
            tracing::debug!(%error, "transport failed");
            deliver(out, plan.message(None, false, NetworkStatus::Failed)).await;
        }
    }
}

fn read_local<T: Transport>(client: &ClientImpl<T>, plan: &Plan) -> Option<Value> {
    match client
        .snapshot()
        .read(&plan.document, &plan.variables, plan.return_partial)
    {
        Ok(data) => data,
        Err(error) => {
            tracing::debug!(%error, "local read failed");
            None
        }
    }
}

async fn fetch<T: Transport>(
    client: &Arc<ClientImpl<T>>,
    plan: &Plan,
    operation_type: OperationType
) -> Result<Response, TransportError> {
    let mut results = client
        .transport
        .execute(plan.operation(operation_type))
        .await?;
    results.next().await.ok_or(TransportError::Closed)
}

/// A dropped receiver cancels delivery, never the operation.
async fn deliver(out: &mut Sender<QueryMessage>, message: QueryMessage) {
    let _ = out.send(message).await;
}
