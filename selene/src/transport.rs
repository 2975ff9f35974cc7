//! The default HTTP transport.
//!
//! Serializes the operation as JSON, POSTs it with `reqwest` and delivers
//! the decoded response as a one-element result stream.

use crate::{
    error::TransportError,
    types::{Operation, ResultStream, Transport},
    Response
};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

pub struct HeaderPair(pub &'static str, pub &'static str);

pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    extra_headers: Option<Arc<dyn Fn() -> Vec<HeaderPair> + Send + Sync>>
}

impl HttpTransport {
    pub fn new<U: Into<String>>(url: U) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            extra_headers: None
        }
    }

    /// Headers recomputed per request, e.g. for rotating auth tokens.
    pub fn with_extra_headers(
        mut self,
        header_fn: impl Fn() -> Vec<HeaderPair> + Send + Sync + 'static
    ) -> Self {
        self.extra_headers = Some(Arc::new(header_fn));
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, operation: Operation) -> Result<ResultStream, TransportError> {
        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&operation.body);

        if let Some(extra_headers) = &self.extra_headers {
            for HeaderPair(key, value) in extra_headers() {
                request = request.header(key, value);
            }
        }

        let response: Response = request
            .send()
            .await
            .map_err(|e| TransportError::Network(Box::new(e)))?
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        Ok(futures::stream::once(async move { response }).boxed())
    }
}
