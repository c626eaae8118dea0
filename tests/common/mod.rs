//! Shared test utilities for snmp-sync-bridge integration tests.

// Not every test binary uses every helper
#![allow(dead_code)]
#![allow(unused_imports)]

mod fixtures;
mod harness;

pub use fixtures::*;
pub use harness::*;
