//! Gateway facade.
//!
//! Bundles the invoker, entity codec and permission resolver behind one
//! cheaply cloneable handle for route orchestrators.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;

use crate::config::Config;
use crate::error::{Result, TransportError};
use crate::event;
use crate::fieldmapper::{EntityCodec, FieldRegistry, Mutation, Record};
use crate::permissions::{PermissionConfig, PermissionGrants, PermissionResolver};
use crate::rpc::{AuthParam, BusTransport, HttpBusTransport, RemoteResponse, RpcInvoker};

/// Entry point for orchestrators talking to the ILS.
#[derive(Clone)]
pub struct IlsGateway {
    invoker: RpcInvoker,
    codec: EntityCodec,
    permissions: PermissionResolver,
}

impl IlsGateway {
    /// Assemble a gateway over an existing transport.
    pub fn new(
        transport: Arc<dyn BusTransport>,
        registry: Arc<FieldRegistry>,
        permissions: PermissionConfig,
    ) -> Self {
        let invoker = RpcInvoker::new(transport);
        Self {
            codec: EntityCodec::new(registry),
            permissions: PermissionResolver::new(invoker.clone(), permissions),
            invoker,
        }
    }

    /// Build the HTTP transport and field tables described by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = HttpBusTransport::new(config.bus.clone())?;
        let registry = FieldRegistry::from_config(&config.fieldmapper)?;

        info!(
            gateway_url = %config.bus.gateway_url,
            classes = registry.len(),
            schema = registry.version().unwrap_or("unversioned"),
            "ILS gateway configured"
        );

        Ok(Self::new(
            Arc::new(transport),
            Arc::new(registry),
            config.permissions.clone(),
        ))
    }

    pub fn invoker(&self) -> &RpcInvoker {
        &self.invoker
    }

    pub fn codec(&self) -> &EntityCodec {
        &self.codec
    }

    pub fn permissions(&self) -> &PermissionResolver {
        &self.permissions
    }

    /// Issue one call; see [`RpcInvoker::invoke`].
    pub async fn invoke(
        &self,
        auth: &AuthParam,
        service: &str,
        method: &str,
        params: Vec<Value>,
    ) -> std::result::Result<RemoteResponse, TransportError> {
        self.invoker.invoke(auth, service, method, params).await
    }

    /// Call a single-entity method, gate events, decode the result.
    pub async fn fetch_record(
        &self,
        auth: &AuthParam,
        service: &str,
        method: &str,
        params: Vec<Value>,
        class: &str,
    ) -> Result<Option<Record>> {
        let response = self.invoke(auth, service, method, params).await?;
        response.into_record(&self.codec, class)
    }

    /// Call a list method, gate events, decode every entity.
    pub async fn fetch_records(
        &self,
        auth: &AuthParam,
        service: &str,
        method: &str,
        params: Vec<Value>,
        class: &str,
    ) -> Result<Vec<Record>> {
        let response = self.invoke(auth, service, method, params).await?;
        response.into_records(&self.codec, class)
    }

    pub fn encode(
        &self,
        class: &str,
        fields: &Map<String, Value>,
        mutation: Mutation,
    ) -> Result<Value> {
        self.codec.encode(class, fields, mutation)
    }

    pub fn decode(&self, class: &str, value: &Value) -> Result<Record> {
        self.codec.decode(class, value)
    }

    pub fn is_event(&self, value: &Value) -> bool {
        event::is_event(value)
    }

    pub fn error_message(&self, value: &Value, fallback: &str) -> String {
        event::error_message(value, fallback)
    }

    /// Resolve permissions; an empty result means deny.
    pub async fn resolve_permissions<S: AsRef<str>>(
        &self,
        auth_token: &str,
        org_id: Option<i64>,
        perms: &[S],
    ) -> Result<PermissionGrants> {
        self.permissions.resolve(auth_token, org_id, perms).await
    }
}
