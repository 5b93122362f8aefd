//! Integration test utilities for the gateway client
//!
//! This crate provides a scripted in-memory transport and frame fixtures for
//! driving a real `GatewaySession` end to end.

pub mod fixtures;
pub mod helpers;

pub use fixtures::*;
pub use helpers::*;
