//! Remote procedure calls on the ILS service bus.
//!
//! This module contains:
//! - `RemoteCall` / `RemoteResponse`: one invocation and its payload list
//! - `AuthParam`: how the auth token is placed in the parameter list
//! - `BusTransport` trait: the raw call primitive (HTTP gateway, mock)
//! - `RpcInvoker`: issues calls without interpreting results

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{GatewayError, Result, TransportError};
use crate::event::{self, Event};
use crate::fieldmapper::{EntityCodec, Record};
use crate::value::BusValue;

pub mod http;
pub mod mock;

pub use http::{BusConfig, HttpBusTransport};
pub use mock::MockTransport;

// ============================================================================
// Call / response
// ============================================================================

/// Placement of the auth token in a call's parameter list.
///
/// Omitting the token and sending an explicit null are different wire calls;
/// some methods reject one or the other, so the caller must choose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthParam {
    /// Unauthenticated method: no leading parameter.
    Omit,
    /// Leading parameter is an explicit JSON null.
    Null,
    /// Leading parameter is the token.
    Token(String),
}

impl AuthParam {
    pub fn token(token: impl Into<String>) -> Self {
        AuthParam::Token(token.into())
    }

    /// The leading wire parameter, if any.
    pub fn leading_param(&self) -> Option<Value> {
        match self {
            AuthParam::Omit => None,
            AuthParam::Null => Some(Value::Null),
            AuthParam::Token(token) => Some(Value::String(token.clone())),
        }
    }
}

/// One bus invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteCall {
    pub service: String,
    pub method: String,
    pub params: Vec<Value>,
}

impl RemoteCall {
    pub fn new(service: &str, method: &str, params: Vec<Value>) -> Self {
        Self {
            service: service.to_string(),
            method: method.to_string(),
            params,
        }
    }

    /// Build a call with the auth token placed first.
    pub fn with_auth(auth: &AuthParam, service: &str, method: &str, params: Vec<Value>) -> Self {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.extend(auth.leading_param());
        all.extend(params);
        Self::new(service, method, all)
    }
}

/// The payload list the bus returned for one call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemoteResponse {
    pub payload: Vec<Value>,
}

impl RemoteResponse {
    pub fn new(payload: Vec<Value>) -> Self {
        Self { payload }
    }

    /// First payload element, where single-result methods put their answer.
    pub fn first(&self) -> Option<&Value> {
        self.payload.first()
    }

    pub fn into_first(self) -> Option<Value> {
        self.payload.into_iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// First event anywhere in the payload, at any list depth.
    pub fn find_event(&self) -> Option<Event> {
        self.payload.iter().find_map(event::find_event)
    }

    /// The event gate: fails with `RemoteEvent` if any element is an event.
    pub fn ensure_no_event(self) -> Result<Self> {
        match self.find_event() {
            Some(event) => Err(GatewayError::RemoteEvent(event)),
            None => Ok(self),
        }
    }

    /// Payload elements classified into bus value variants.
    pub fn classified(&self) -> Vec<BusValue> {
        self.payload.iter().map(BusValue::from_json).collect()
    }

    /// Gate events, then decode the first element as one entity.
    ///
    /// `Ok(None)` when the method returned nothing or null.
    pub fn into_record(self, codec: &EntityCodec, class: &str) -> Result<Option<Record>> {
        let response = self.ensure_no_event()?;
        match response.first() {
            None | Some(Value::Null) => Ok(None),
            Some(value) => codec.decode(class, value).map(Some),
        }
    }

    /// Gate events, then decode every entity of the result.
    ///
    /// Handles both batch shapes: one payload element holding a list, and
    /// streaming methods that return one payload element per entity.
    pub fn into_records(self, codec: &EntityCodec, class: &str) -> Result<Vec<Record>> {
        let response = self.ensure_no_event()?;
        match response.payload.as_slice() {
            [Value::Array(_)] => codec.decode_list(class, &response.payload[0]),
            items => items
                .iter()
                .filter(|item| !item.is_null())
                .map(|item| codec.decode(class, item))
                .collect(),
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// The raw bus call primitive.
///
/// Implementations own network transport, framing, and any transport-level
/// retry. They return the decoded payload list and never interpret it.
#[async_trait]
pub trait BusTransport: Send + Sync {
    /// Issue one call and return its payload list.
    async fn raw_call(&self, call: &RemoteCall) -> std::result::Result<Vec<Value>, TransportError>;

    /// Transport name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Invoker
// ============================================================================

/// Issues remote calls and returns raw payloads, without business interpretation.
///
/// Holds no mutable state; clones share the transport and may be used from
/// any number of tasks at once.
#[derive(Clone)]
pub struct RpcInvoker {
    transport: Arc<dyn BusTransport>,
}

impl RpcInvoker {
    pub fn new(transport: Arc<dyn BusTransport>) -> Self {
        Self { transport }
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Invoke `service`/`method` with the auth token placed per `auth`.
    ///
    /// Transport failures come back as `TransportError`; events come back as
    /// ordinary payload and must be checked by the caller.
    pub async fn invoke(
        &self,
        auth: &AuthParam,
        service: &str,
        method: &str,
        params: Vec<Value>,
    ) -> std::result::Result<RemoteResponse, TransportError> {
        self.call(&RemoteCall::with_auth(auth, service, method, params))
            .await
    }

    /// Issue a fully built call.
    pub async fn call(
        &self,
        call: &RemoteCall,
    ) -> std::result::Result<RemoteResponse, TransportError> {
        // Params are not logged: the first one is usually an auth token.
        debug!(
            transport = %self.transport.name(),
            service = %call.service,
            method = %call.method,
            param_count = call.params.len(),
            "Invoking bus method"
        );

        let payload = self.transport.raw_call(call).await.map_err(|e| {
            debug!(method = %call.method, error = %e, "Bus call failed");
            e
        })?;

        debug!(
            method = %call.method,
            payload_len = payload.len(),
            "Bus call returned"
        );
        Ok(RemoteResponse::new(payload))
    }

    /// Like [`invoke`](Self::invoke), abandoning the call when `cancel` resolves.
    ///
    /// A cancelled call yields `TransportError::Cancelled`.
    pub async fn invoke_cancellable<F>(
        &self,
        cancel: F,
        auth: &AuthParam,
        service: &str,
        method: &str,
        params: Vec<Value>,
    ) -> std::result::Result<RemoteResponse, TransportError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            response = self.invoke(auth, service, method, params) => response,
            _ = cancel => {
                debug!(service = %service, method = %method, "Bus call cancelled by caller");
                Err(TransportError::Cancelled)
            }
        }
    }

    /// Issue independent calls concurrently; results keep the input order.
    pub async fn invoke_all(
        &self,
        calls: &[RemoteCall],
    ) -> Vec<std::result::Result<RemoteResponse, TransportError>> {
        join_all(calls.iter().map(|call| self.call(call))).await
    }
}
