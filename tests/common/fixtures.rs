//! Common test fixtures and constants.

use bytes::Bytes;
use snmp_sync_bridge::{Oid, Value, VarBind, oid};

// =============================================================================
// Standard system MIB OIDs (1.3.6.1.2.1.1.*)
// =============================================================================

pub fn sys_descr() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 1, 0)
}
pub fn sys_uptime() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 3, 0)
}
pub fn sys_name() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)
}

// =============================================================================
// Subtree roots (for walks)
// =============================================================================

/// System subtree root: 1.3.6.1.2.1.1
pub fn system_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 1)
}

/// Interfaces subtree root: 1.3.6.1.2.1.2
pub fn interfaces_subtree() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2)
}

/// ifNumber.0, the first object past the system subtree
pub fn if_number() -> Oid {
    oid!(1, 3, 6, 1, 2, 1, 2, 1, 0)
}

/// Nonexistent OID for noSuchName / noSuchObject cases
pub fn nonexistent_oid() -> Oid {
    oid!(1, 3, 6, 1, 99, 99, 99, 0)
}

// =============================================================================
// Values
// =============================================================================

pub const SYS_DESCR: &str = "Linux router 6.1.0";
pub const SYS_NAME: &str = "core-sw1";

pub fn sys_descr_vb() -> VarBind {
    VarBind::new(
        sys_descr(),
        Value::OctetString(Bytes::from_static(SYS_DESCR.as_bytes())),
    )
}

pub fn sys_name_vb() -> VarBind {
    VarBind::new(
        sys_name(),
        Value::OctetString(Bytes::from_static(SYS_NAME.as_bytes())),
    )
}

pub fn sys_uptime_vb(ticks: u32) -> VarBind {
    VarBind::new(sys_uptime(), Value::TimeTicks(ticks))
}

/// V2c read-only community
pub const COMMUNITY_RO: &[u8] = b"public";
/// V2c read-write community
pub const COMMUNITY_RW: &[u8] = b"private";
