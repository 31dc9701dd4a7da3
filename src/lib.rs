//! ils-gateway - ILS service-bus protocol gateway
//!
//! Client-side plumbing for talking to an OpenSRF-style service bus:
//!
//! - [`rpc`]: remote method invocation over a pluggable [`rpc::BusTransport`]
//! - [`event`]: recognizing in-band error events in call results
//! - [`fieldmapper`]: decoding and encoding positional/named entities
//! - [`permissions`]: batch permission checks across signature variants
//!
//! [`IlsGateway`] bundles all of these behind one handle.

pub mod config;
pub mod error;
pub mod event;
pub mod fieldmapper;
pub mod gateway;
pub mod permissions;
pub mod rpc;
pub mod utils;
pub mod value;

pub use error::{GatewayError, Result, TransportError};
pub use event::Event;
pub use fieldmapper::{EntityCodec, FieldRegistry, FieldValue, Mutation, Record};
pub use gateway::IlsGateway;
pub use permissions::{PermissionGrants, PermissionResolver};
pub use rpc::{AuthParam, BusTransport, RemoteCall, RemoteResponse, RpcInvoker};
pub use value::BusValue;
