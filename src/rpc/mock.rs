//! Mock bus transport for testing.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{BusTransport, RemoteCall};
use crate::error::TransportError;

type Scripted = Result<Vec<Value>, TransportError>;

/// Mock bus transport for testing.
///
/// Responses are scripted per method name. Queued responses are consumed one
/// per call, in order; once a method's queue is empty its default response
/// (if any) is returned. Unscripted methods answer like the bus does for an
/// unknown method. Every call is recorded.
#[derive(Default)]
pub struct MockTransport {
    queued: RwLock<HashMap<String, VecDeque<Scripted>>>,
    defaults: RwLock<HashMap<String, Scripted>>,
    calls: RwLock<Vec<RemoteCall>>,
    latency: RwLock<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a payload for the next call to `method`.
    pub async fn push_response(&self, method: &str, payload: Vec<Value>) {
        self.push(method, Ok(payload)).await;
    }

    /// Queue a transport failure for the next call to `method`.
    pub async fn push_error(&self, method: &str, err: TransportError) {
        self.push(method, Err(err)).await;
    }

    /// Payload returned for `method` whenever its queue is empty.
    pub async fn set_default(&self, method: &str, payload: Vec<Value>) {
        self.defaults
            .write()
            .await
            .insert(method.to_string(), Ok(payload));
    }

    /// Delay every response by `latency`.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = Some(latency);
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Recorded calls to one method.
    pub async fn calls_to(&self, method: &str) -> Vec<RemoteCall> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }

    async fn push(&self, method: &str, scripted: Scripted) {
        self.queued
            .write()
            .await
            .entry(method.to_string())
            .or_default()
            .push_back(scripted);
    }
}

#[async_trait]
impl BusTransport for MockTransport {
    async fn raw_call(&self, call: &RemoteCall) -> Result<Vec<Value>, TransportError> {
        self.calls.write().await.push(call.clone());

        let latency = *self.latency.read().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let queued = self
            .queued
            .write()
            .await
            .get_mut(&call.method)
            .and_then(VecDeque::pop_front);
        if let Some(scripted) = queued {
            return scripted;
        }

        match self.defaults.read().await.get(&call.method) {
            Some(scripted) => scripted.clone(),
            None => Err(TransportError::Status {
                status: 404,
                debug: format!("Method [{}] not found for {}", call.method, call.service),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
