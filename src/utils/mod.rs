//! Shared helpers: tracing bootstrap and transport retry policy.

pub mod bootstrap;
pub mod retry;
