//! Error types for snmp-sync-bridge.
//!
//! All errors are `#[non_exhaustive]` to allow adding new variants without breaking changes.

use std::net::SocketAddr;
use std::time::Duration;

use crate::label::ErrorStatus;
use crate::oid::Oid;
use crate::pdu::PduType;
use crate::varbind::VarBindList;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Reasons a PDU could not be queued for transmission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SendError {
    /// GET, GETNEXT, SET and GETBULK need at least one var-bind.
    #[error("{pdu_type} requires at least one varbind")]
    EmptyVarBinds { pdu_type: PduType },

    /// The PDU type is not something a manager sends.
    #[error("{pdu_type} is not a request PDU")]
    NotARequest { pdu_type: PduType },

    /// The engine could not encode the PDU.
    #[error("encode failed: {reason}")]
    Encode { reason: Box<str> },

    /// The engine's transport refused to queue the message.
    #[error("transport unavailable: {reason}")]
    TransportUnavailable { reason: Box<str> },
}

impl SendError {
    /// Create a transport error.
    pub fn transport(reason: impl Into<Box<str>>) -> Self {
        Self::TransportUnavailable {
            reason: reason.into(),
        }
    }

    /// Create an encode error.
    pub fn encode(reason: impl Into<Box<str>>) -> Self {
        Self::Encode {
            reason: reason.into(),
        }
    }
}

/// Library error type.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The PDU was never queued; no callback will fire for it.
    #[error("send failed{}: {source}", target.map(|t| format!(" to {}", t)).unwrap_or_default())]
    Send {
        target: Option<SocketAddr>,
        #[source]
        source: SendError,
    },

    /// No response arrived within the session's window.
    #[error("timeout after {elapsed:?}{} (retries={retries})", target.map(|t| format!(" waiting for {}", t)).unwrap_or_default())]
    Timeout {
        target: Option<SocketAddr>,
        elapsed: Duration,
        retries: u32,
    },

    /// Response carried a non-zero error status.
    ///
    /// The response var-binds are still owned by the caller; take them with
    /// [`Error::into_varbinds`].
    #[error("SNMP error{}: {label} at index {index}", target.map(|t| format!(" from {}", t)).unwrap_or_default())]
    Snmp {
        target: Option<SocketAddr>,
        status: ErrorStatus,
        label: &'static str,
        index: u32,
        varbinds: VarBindList,
    },

    /// A synchronous call is already in flight on this session.
    #[error("session busy: a request to {target} is still in flight")]
    SessionBusy { target: SocketAddr },

    /// The dispatch loop has shut down.
    #[error("dispatch loop closed")]
    DispatcherClosed,

    /// Invalid OID format.
    #[error("invalid OID: {input}")]
    InvalidOid { input: Box<str> },

    /// Invalid SNMP URI.
    #[error("invalid SNMP URI <{uri}>: {reason}")]
    InvalidUri { uri: Box<str>, reason: &'static str },

    /// The host named in a URI could not be resolved.
    #[error("could not resolve {host}: {source}")]
    Resolve {
        host: Box<str>,
        #[source]
        source: std::io::Error,
    },

    /// Too many OIDs in a single request.
    #[error("number of OIDs is greater than max ({count}/{max})")]
    TooManyOids { count: usize, max: usize },

    /// Non-increasing OID detected during walk (agent misbehavior).
    #[error("walk detected non-increasing OID: {previous} >= {current}")]
    NonIncreasingOid { previous: Oid, current: Oid },

    /// The dedicated dispatch thread or its runtime could not be started.
    #[error("failed to start dispatch thread: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a send error.
    pub fn send(target: Option<SocketAddr>, source: SendError) -> Self {
        Self::Send { target, source }
    }

    /// Create a protocol error from a response's status fields.
    pub fn snmp(target: Option<SocketAddr>, code: i32, index: u32, varbinds: VarBindList) -> Self {
        let status = ErrorStatus::from_i32(code);
        Self::Snmp {
            target,
            status,
            label: crate::label::label(code),
            index,
            varbinds,
        }
    }

    /// Create an invalid URI error.
    pub fn invalid_uri(uri: impl Into<Box<str>>, reason: &'static str) -> Self {
        Self::InvalidUri {
            uri: uri.into(),
            reason,
        }
    }

    /// Whether this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Take the var-binds carried by a protocol error.
    pub fn into_varbinds(self) -> Option<VarBindList> {
        match self {
            Self::Snmp { varbinds, .. } => Some(varbinds),
            _ => None,
        }
    }

    /// Get the target address if this error has one.
    pub fn target(&self) -> Option<SocketAddr> {
        match self {
            Self::Send { target, .. } => *target,
            Self::Timeout { target, .. } => *target,
            Self::Snmp { target, .. } => *target,
            Self::SessionBusy { target } => Some(*target),
            _ => None,
        }
    }
}
