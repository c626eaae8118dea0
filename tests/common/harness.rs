//! Bridge and session setup for tests.

use snmp_sync_bridge::engine::{MockEngine, MockHandle};
use snmp_sync_bridge::{Bridge, Session};
use std::net::SocketAddr;
use std::time::Duration;

pub const AGENT: &str = "192.0.2.1:161";

pub fn agent_addr() -> SocketAddr {
    AGENT.parse().unwrap()
}

/// Spawn a bridge over a fresh mock engine on the current runtime.
pub fn setup() -> (Bridge, MockHandle) {
    init_tracing();
    let engine = MockEngine::new();
    let mock = engine.handle();
    (Bridge::spawn(engine), mock)
}

/// Session with a 200ms timeout and no retries.
pub fn session() -> Session {
    Session::builder(agent_addr())
        .timeout(Duration::from_millis(200))
        .retries(0)
        .build()
}

/// Install a subscriber honoring `RUST_LOG`; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
