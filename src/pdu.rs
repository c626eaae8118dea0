//! PDU types exchanged between the bridge and the engine.

use crate::varbind::{VarBind, VarBindList};

/// PDU type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduType {
    GetRequest = 0xA0,
    GetNextRequest = 0xA1,
    Response = 0xA2,
    SetRequest = 0xA3,
    TrapV1 = 0xA4,
    GetBulkRequest = 0xA5,
    InformRequest = 0xA6,
    TrapV2 = 0xA7,
    Report = 0xA8,
}

impl PduType {
    /// Create from tag byte.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0xA0 => Some(Self::GetRequest),
            0xA1 => Some(Self::GetNextRequest),
            0xA2 => Some(Self::Response),
            0xA3 => Some(Self::SetRequest),
            0xA4 => Some(Self::TrapV1),
            0xA5 => Some(Self::GetBulkRequest),
            0xA6 => Some(Self::InformRequest),
            0xA7 => Some(Self::TrapV2),
            0xA8 => Some(Self::Report),
            _ => None,
        }
    }

    /// Get the tag byte.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Whether an agent answers this PDU type with a Response.
    pub fn expects_response(self) -> bool {
        matches!(
            self,
            Self::GetRequest
                | Self::GetNextRequest
                | Self::SetRequest
                | Self::GetBulkRequest
                | Self::InformRequest
        )
    }

    /// Whether a request of this type is meaningless without var-binds.
    pub fn requires_varbinds(self) -> bool {
        matches!(
            self,
            Self::GetRequest | Self::GetNextRequest | Self::SetRequest | Self::GetBulkRequest
        )
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GetRequest => write!(f, "GetRequest"),
            Self::GetNextRequest => write!(f, "GetNextRequest"),
            Self::Response => write!(f, "Response"),
            Self::SetRequest => write!(f, "SetRequest"),
            Self::TrapV1 => write!(f, "TrapV1"),
            Self::GetBulkRequest => write!(f, "GetBulkRequest"),
            Self::InformRequest => write!(f, "InformRequest"),
            Self::TrapV2 => write!(f, "TrapV2"),
            Self::Report => write!(f, "Report"),
        }
    }
}

/// Outbound request handed to the engine.
///
/// The engine receives its own copy; the caller's var-binds are never
/// touched.
#[derive(Debug, Clone, PartialEq)]
pub struct PduRequest {
    pub pdu_type: PduType,
    pub varbinds: Vec<VarBind>,
}

impl PduRequest {
    pub fn new(pdu_type: PduType, varbinds: &[VarBind]) -> Self {
        Self {
            pdu_type,
            varbinds: varbinds.to_vec(),
        }
    }
}

/// Decoded response delivered to a session's completion callback.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Error status from the response PDU (0 = noError).
    pub error_status: i32,
    /// 1-based index of the offending var-bind, 0 when not applicable.
    pub error_index: u32,
    pub varbinds: VarBindList,
}

impl Response {
    /// A successful response carrying `varbinds`.
    pub fn ok(varbinds: impl Into<VarBindList>) -> Self {
        Self {
            error_status: 0,
            error_index: 0,
            varbinds: varbinds.into(),
        }
    }

    /// A response carrying a non-zero error status.
    pub fn error(error_status: i32, error_index: u32, varbinds: impl Into<VarBindList>) -> Self {
        Self {
            error_status,
            error_index,
            varbinds: varbinds.into(),
        }
    }
}
