//! Shared helpers for gateway scenarios.

use std::sync::Arc;

use serde_json::{Map, Value};

use ils_gateway::permissions::PermissionConfig;
use ils_gateway::rpc::MockTransport;
use ils_gateway::{FieldRegistry, IlsGateway};

pub const AUTH_TOKEN: &str = "0123456789abcdef";

/// Gateway over a fresh mock bus with the built-in field tables.
pub fn mock_gateway() -> (IlsGateway, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let gateway = IlsGateway::new(
        transport.clone(),
        Arc::new(FieldRegistry::builtin()),
        PermissionConfig::default(),
    );
    (gateway, transport)
}

/// Unwrap a `json!({...})` literal into a field map.
pub fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object literal, got {other}"),
    }
}
