//!
//! Utilities and helpers for unit and integration testing.
//!

mod rpc_core_mock;
pub use rpc_core_mock::*;

mod processor;
