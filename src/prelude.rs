//! Prelude module for convenient imports.
//!
//! ```rust
//! use snmp_sync_bridge::prelude::*;
//! ```
//!
//! This imports:
//! - Core types: [`Bridge`], [`Session`], [`Oid`], [`Value`], [`VarBind`], [`VarBindList`]
//! - Error handling: [`Error`], [`Result`]
//! - The [`oid!`] macro

pub use crate::bridge::Bridge;
pub use crate::error::{Error, Result};
pub use crate::oid::Oid;
pub use crate::pdu::PduType;
pub use crate::session::Session;
pub use crate::value::Value;
pub use crate::varbind::{VarBind, VarBindList, release_varbind_list};
pub use crate::version::Version;

#[doc(no_inline)]
pub use crate::oid;
