//! Object Identifier (OID) type.
//!
//! OIDs are stored as `SmallVec<[u32; 16]>` to avoid heap allocation for common OIDs.

use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// Object Identifier.
///
/// Ordering is arc-wise numeric: `1.9 < 1.10`, and a prefix sorts before
/// any OID it is a prefix of (`1.2 < 1.2.0`). The empty OID sorts first.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Oid {
    arcs: SmallVec<[u32; 16]>,
}

impl Oid {
    /// Create an empty OID.
    pub fn empty() -> Self {
        Self {
            arcs: SmallVec::new(),
        }
    }

    /// Create an OID from arc values.
    pub fn new(arcs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            arcs: arcs.into_iter().collect(),
        }
    }

    /// Create an OID from a slice of arcs.
    pub fn from_slice(arcs: &[u32]) -> Self {
        Self {
            arcs: SmallVec::from_slice(arcs),
        }
    }

    /// Parse an OID from dotted notation.
    ///
    /// A leading dot is accepted (`.1.3.6.1` and `1.3.6.1` are the same OID).
    ///
    /// ```
    /// use snmp_sync_bridge::Oid;
    ///
    /// let oid = Oid::parse(".1.3.6.1.2.1.1.1.0").unwrap();
    /// assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1, 1, 1, 0]);
    /// assert!(Oid::parse("1.3.x").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let mut arcs = SmallVec::new();

        for part in s.split('.') {
            if part.is_empty() {
                continue;
            }

            let arc: u32 = part.parse().map_err(|_| Error::InvalidOid {
                input: s.to_string().into_boxed_str(),
            })?;

            arcs.push(arc);
        }

        Ok(Self { arcs })
    }

    /// Get the arc values.
    pub fn arcs(&self) -> &[u32] {
        &self.arcs
    }

    /// Get the number of arcs.
    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    /// Check if the OID is empty.
    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    /// Check if this OID starts with another OID.
    ///
    /// An OID always starts with itself, and any OID starts with an empty OID.
    pub fn starts_with(&self, other: &Oid) -> bool {
        self.arcs.len() >= other.arcs.len() && self.arcs[..other.arcs.len()] == other.arcs[..]
    }
}

impl Default for Oid {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Oid({})", self)
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for arc in &self.arcs {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{}", arc)?;
            first = false;
        }
        Ok(())
    }
}

impl std::str::FromStr for Oid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.arcs.cmp(&other.arcs)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Oid {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Macro to create an OID from literal arcs.
///
/// ```
/// use snmp_sync_bridge::oid;
///
/// let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
/// assert_eq!(sys_descr.to_string(), "1.3.6.1.2.1.1.1.0");
/// ```
#[macro_export]
macro_rules! oid {
    ($($arc:expr),* $(,)?) => {
        $crate::oid::Oid::from_slice(&[$($arc),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let oid = Oid::parse("1.3.6.1.2.1.1.1.0").unwrap();
        assert_eq!(oid.arcs(), &[1, 3, 6, 1, 2, 1, 1, 1, 0]);
    }

    #[test]
    fn test_parse_empty() {
        assert!(Oid::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Oid::parse("1.3.6.one").is_err());
        assert!(Oid::parse("1.3.-6").is_err());
    }

    #[test]
    fn test_display() {
        let oid = Oid::from_slice(&[1, 3, 6, 1, 4, 1, 2680, 1, 2, 7, 3, 2, 0]);
        assert_eq!(oid.to_string(), "1.3.6.1.4.1.2680.1.2.7.3.2.0");
        assert_eq!(Oid::empty().to_string(), "");
    }

    #[test]
    fn test_ordering() {
        let cases = [
            ("1.2.3", "1.2.4", true),
            ("1.2.3", "1.2.3.4", true),
            ("1.2.3", "1.2", false),
            ("", "1.2", true),
            ("1.2", "", false),
            ("", "", false),
            ("1.9", "1.10", true),
            ("1.12", "1.10", false),
            ("1.12.2", "1.12.1", false),
            ("1.12.1", "1.12.2", true),
        ];
        for (a, b, less) in cases {
            let a = Oid::parse(a).unwrap();
            let b = Oid::parse(b).unwrap();
            assert_eq!(a < b, less, "{} < {}", a, b);
        }
    }

    #[test]
    fn test_starts_with() {
        let sys_descr = oid!(1, 3, 6, 1, 2, 1, 1, 1, 0);
        assert!(sys_descr.starts_with(&oid!(1, 3, 6, 1, 2, 1, 1)));
        assert!(!sys_descr.starts_with(&oid!(1, 3, 6, 1, 2, 1, 2)));
        assert!(sys_descr.starts_with(&Oid::empty()));
    }
}
