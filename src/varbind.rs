//! Variable bindings and var-bind lists.
//!
//! A [`VarBind`] pairs an OID with a value. A [`VarBindList`] is the ordered
//! list a completed exchange hands back to the caller. The caller owns it and
//! gives it up exactly once, either by calling [`release_varbind_list`] or by
//! letting it go out of scope.

use crate::oid::Oid;
use crate::value::Value;

/// Variable binding - an OID-value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    /// The object identifier.
    pub oid: Oid,
    /// The value.
    pub value: Value,
}

impl VarBind {
    /// Create a new VarBind.
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// Create a VarBind with a NULL value (for GET requests).
    pub fn null(oid: Oid) -> Self {
        Self {
            oid,
            value: Value::Null,
        }
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// Ordered list of var-binds returned by a completed exchange.
///
/// Releasing consumes the list, so a list cannot be released twice or read
/// after release:
///
/// ```compile_fail
/// use snmp_sync_bridge::{VarBindList, release_varbind_list};
///
/// let list = VarBindList::new();
/// release_varbind_list(list);
/// release_varbind_list(list); // use of moved value
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarBindList {
    entries: Vec<VarBind>,
}

impl VarBindList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the entries in order.
    pub fn iter(&self) -> std::slice::Iter<'_, VarBind> {
        self.entries.iter()
    }

    /// Borrow the entries as a slice.
    pub fn as_slice(&self) -> &[VarBind] {
        &self.entries
    }

    /// Take the entries out of the list.
    pub fn into_vec(self) -> Vec<VarBind> {
        self.entries
    }

    /// Release every entry, then the list itself.
    pub fn release(self) {
        release_varbind_list(self);
    }
}

impl From<Vec<VarBind>> for VarBindList {
    fn from(entries: Vec<VarBind>) -> Self {
        Self { entries }
    }
}

impl FromIterator<VarBind> for VarBindList {
    fn from_iter<I: IntoIterator<Item = VarBind>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for VarBindList {
    type Item = VarBind;
    type IntoIter = std::vec::IntoIter<VarBind>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a VarBindList {
    type Item = &'a VarBind;
    type IntoIter = std::slice::Iter<'a, VarBind>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl std::ops::Index<usize> for VarBindList {
    type Output = VarBind;

    fn index(&self, index: usize) -> &VarBind {
        &self.entries[index]
    }
}

/// Release a var-bind list: every entry's owned data, then the container.
///
/// Releasing an empty list is a no-op.
pub fn release_varbind_list(list: VarBindList) {
    let mut released = 0usize;
    for entry in list.entries {
        drop(entry);
        released += 1;
    }
    tracing::trace!(snmp.varbinds = released, "released varbind list");
}
