//! Engine abstraction.
//!
//! The engine is the collaborator that does the real SNMP work: PDU
//! encoding, transport I/O, retransmission and timers. The bridge never
//! touches any of that; it hands requests to an [`Engine`] from inside the
//! dispatch loop and reacts to the [`EngineEvent`]s it produces.

mod mock;

pub use mock::*;

use crate::error::SendError;
use crate::pdu::{PduRequest, Response};
use crate::session::Session;
use std::future::Future;

/// Identifies one in-flight request inside an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestHandle(u64);

impl RequestHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two opaque tuning arguments forwarded with every request.
///
/// The bridge never interprets them. Engines typically read them as
/// non-repeaters / max-repetitions for GETBULK and ignore them otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchArgs {
    pub arg1: u32,
    pub arg2: u32,
}

impl DispatchArgs {
    pub const fn new(arg1: u32, arg2: u32) -> Self {
        Self { arg1, arg2 }
    }
}

/// Outcome reported by an engine for a request it accepted.
#[derive(Debug)]
pub enum EngineEvent {
    /// A response arrived.
    Response {
        handle: RequestHandle,
        response: Response,
    },
    /// Every attempt went unanswered.
    Timeout { handle: RequestHandle },
}

impl EngineEvent {
    pub fn handle(&self) -> RequestHandle {
        match self {
            Self::Response { handle, .. } | Self::Timeout { handle } => *handle,
        }
    }
}

/// Callback-driven SNMP engine driven by the dispatch loop.
///
/// The dispatch loop owns the engine exclusively, so implementations need no
/// internal locking for their own state.
pub trait Engine: Send + 'static {
    /// Queue one PDU for transmission.
    ///
    /// Must not wait for the response. Returning an error means the request
    /// was never queued and no event will be produced for it.
    fn send(
        &mut self,
        session: &Session,
        request: &PduRequest,
        args: DispatchArgs,
    ) -> Result<RequestHandle, SendError>;

    /// Wait for the next response or timeout.
    ///
    /// Must be cancel safe: the dispatch loop drops this future whenever a
    /// new request arrives first. Returning `None` stops the dispatch loop.
    fn next_event(&mut self) -> impl Future<Output = Option<EngineEvent>> + Send;
}
