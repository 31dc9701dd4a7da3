//! End-to-end gateway scenarios against a scripted bus.

#[path = "gateway_scenarios/common.rs"]
mod common;

#[path = "gateway_scenarios/codec_test.rs"]
mod codec_test;

#[path = "gateway_scenarios/invoker_test.rs"]
mod invoker_test;

#[path = "gateway_scenarios/permissions_test.rs"]
mod permissions_test;
