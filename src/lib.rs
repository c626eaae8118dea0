// Error::Snmp carries the response var-binds inline so callers can inspect them.
#![allow(clippy::result_large_err)]

//! # snmp-sync-bridge
//!
//! Blocking-style request/response calls over a callback-driven SNMP engine.
//!
//! An [`Engine`](engine::Engine) accepts PDUs and later reports either a
//! response or a timeout. A [`Bridge`] runs that engine inside a single
//! dispatch loop and offers [`Bridge::sync_send`], which returns only once
//! exactly one outcome is known:
//!
//! - the response var-binds, as an owned [`VarBindList`]
//! - a protocol error ([`Error::Snmp`]) with the status translated by [`label()`]
//! - a timeout ([`Error::Timeout`])
//! - a send failure ([`Error::Send`])
//!
//! ## Quick Start
//!
//! ```rust
//! use snmp_sync_bridge::engine::MockEngine;
//! use snmp_sync_bridge::pdu::Response;
//! use snmp_sync_bridge::{Bridge, Error, Session, Value, VarBind, oid, release_varbind_list};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> snmp_sync_bridge::Result<()> {
//! let engine = MockEngine::new();
//! let mock = engine.handle();
//! let bridge = Bridge::spawn(engine);
//! let session = Session::builder("192.0.2.1:161".parse().unwrap()).build();
//!
//! let sys_uptime = oid!(1, 3, 6, 1, 2, 1, 1, 3, 0);
//! mock.queue_response(Response::ok(vec![VarBind::new(
//!     sys_uptime.clone(),
//!     Value::TimeTicks(4200),
//! )]));
//!
//! let list = bridge.sync_get(&session, &[sys_uptime.clone()]).await?;
//! assert_eq!(list[0].value, Value::TimeTicks(4200));
//! release_varbind_list(list);
//!
//! mock.queue_response(Response::error(2, 1, vec![VarBind::null(sys_uptime.clone())]));
//! match bridge.sync_get(&session, &[sys_uptime]).await {
//!     Err(Error::Snmp { label, index, varbinds, .. }) => {
//!         assert_eq!(label, "noSuchName");
//!         assert_eq!(index, 1);
//!         varbinds.release();
//!     }
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Tracing
//!
//! The crate logs through [`tracing`] with `snmp.*` structured fields
//! (`snmp.target`, `snmp.pdu_type`, `snmp.handle`). Install any subscriber to
//! see them; nothing is printed otherwise.

pub mod bridge;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod label;
pub mod oid;
pub mod pdu;
pub mod prelude;
pub mod query;
pub mod session;
pub mod value;
pub mod varbind;
pub mod version;

// Re-exports for convenience
pub use bridge::{Bridge, BridgeBuilder};
pub use dispatch::PendingRequest;
pub use engine::{DispatchArgs, Engine, EngineEvent, RequestHandle};
pub use error::{Error, Result, SendError};
pub use label::{ErrorStatus, UNKNOWN_ERROR_LABEL, label};
pub use oid::Oid;
pub use pdu::{PduRequest, PduType, Response};
pub use session::{Session, SessionBuilder, SessionConfig, SessionStats};
pub use value::Value;
pub use varbind::{VarBind, VarBindList, release_varbind_list};
pub use version::Version;
