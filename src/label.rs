//! Error status codes and their display labels.
//!
//! The engine reports two kinds of numeric codes through the same field:
//! negative values are its own procedural outcomes, `0..=18` are the RFC 3416
//! error-status values carried in a response PDU. [`label()`] maps either to
//! the name used in diagnostics.

/// Label returned for codes that are not in [`ERROR_LABELS`].
pub const UNKNOWN_ERROR_LABEL: &str = "unknown error";

/// Static code-to-label table.
pub static ERROR_LABELS: &[(i32, &str)] = &[
    (-4, "done"),
    (-3, "procedure"),
    (-2, "internal"),
    (-1, "noResponse"),
    (0, "noError"),
    (1, "tooBig"),
    (2, "noSuchName"),
    (3, "badValue"),
    (4, "readOnly"),
    (5, "genErr"),
    (6, "noAccess"),
    (7, "wrongType"),
    (8, "wrongLength"),
    (9, "wrongEncoding"),
    (10, "wrongValue"),
    (11, "noCreation"),
    (12, "inconsistentValue"),
    (13, "resourceUnavailable"),
    (14, "commitFailed"),
    (15, "undoFailed"),
    (16, "authorizationError"),
    (17, "notWritable"),
    (18, "inconsistentName"),
];

/// Look up the display label for an error code.
///
/// Never fails: codes outside the table yield [`UNKNOWN_ERROR_LABEL`].
///
/// ```
/// use snmp_sync_bridge::label;
///
/// assert_eq!(label(2), "noSuchName");
/// assert_eq!(label(-1), "noResponse");
/// assert_eq!(label(999), "unknown error");
/// ```
pub fn label(code: i32) -> &'static str {
    ERROR_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or(UNKNOWN_ERROR_LABEL)
}

/// SNMP error status codes (RFC 3416), plus the engine's procedural codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorStatus {
    Done,
    Procedure,
    Internal,
    NoResponse,
    NoError,
    TooBig,
    NoSuchName,
    BadValue,
    ReadOnly,
    GenErr,
    NoAccess,
    WrongType,
    WrongLength,
    WrongEncoding,
    WrongValue,
    NoCreation,
    InconsistentValue,
    ResourceUnavailable,
    CommitFailed,
    UndoFailed,
    AuthorizationError,
    NotWritable,
    InconsistentName,
    /// Unknown/future error status code.
    Unknown(i32),
}

impl ErrorStatus {
    /// Create from raw status code.
    pub fn from_i32(value: i32) -> Self {
        match value {
            -4 => Self::Done,
            -3 => Self::Procedure,
            -2 => Self::Internal,
            -1 => Self::NoResponse,
            0 => Self::NoError,
            1 => Self::TooBig,
            2 => Self::NoSuchName,
            3 => Self::BadValue,
            4 => Self::ReadOnly,
            5 => Self::GenErr,
            6 => Self::NoAccess,
            7 => Self::WrongType,
            8 => Self::WrongLength,
            9 => Self::WrongEncoding,
            10 => Self::WrongValue,
            11 => Self::NoCreation,
            12 => Self::InconsistentValue,
            13 => Self::ResourceUnavailable,
            14 => Self::CommitFailed,
            15 => Self::UndoFailed,
            16 => Self::AuthorizationError,
            17 => Self::NotWritable,
            18 => Self::InconsistentName,
            other => Self::Unknown(other),
        }
    }

    /// Convert to raw status code.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Done => -4,
            Self::Procedure => -3,
            Self::Internal => -2,
            Self::NoResponse => -1,
            Self::NoError => 0,
            Self::TooBig => 1,
            Self::NoSuchName => 2,
            Self::BadValue => 3,
            Self::ReadOnly => 4,
            Self::GenErr => 5,
            Self::NoAccess => 6,
            Self::WrongType => 7,
            Self::WrongLength => 8,
            Self::WrongEncoding => 9,
            Self::WrongValue => 10,
            Self::NoCreation => 11,
            Self::InconsistentValue => 12,
            Self::ResourceUnavailable => 13,
            Self::CommitFailed => 14,
            Self::UndoFailed => 15,
            Self::AuthorizationError => 16,
            Self::NotWritable => 17,
            Self::InconsistentName => 18,
            Self::Unknown(code) => *code,
        }
    }

    /// Display label from the static table.
    pub fn label(&self) -> &'static str {
        label(self.as_i32())
    }
}

impl std::fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({})", code),
            known => f.write_str(known.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_label_known_codes() {
        assert_eq!(label(0), "noError");
        assert_eq!(label(2), "noSuchName");
        assert_eq!(label(5), "genErr");
        assert_eq!(label(18), "inconsistentName");
        assert_eq!(label(-4), "done");
    }

    #[test]
    fn test_label_unknown_code_is_sentinel() {
        assert_eq!(label(19), UNKNOWN_ERROR_LABEL);
        assert_eq!(label(-5), UNKNOWN_ERROR_LABEL);
        assert_eq!(label(i32::MAX), UNKNOWN_ERROR_LABEL);
        assert_eq!(label(i32::MIN), UNKNOWN_ERROR_LABEL);
    }

    #[test]
    fn test_table_codes_unique() {
        let mut codes: Vec<i32> = ERROR_LABELS.iter().map(|(c, _)| *c).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ERROR_LABELS.len());
    }

    #[test]
    fn test_error_status_roundtrips_table() {
        for (code, name) in ERROR_LABELS {
            let status = ErrorStatus::from_i32(*code);
            assert_eq!(status.as_i32(), *code);
            assert_eq!(status.label(), *name);
            assert_eq!(status.to_string(), *name);
        }
    }

    #[test]
    fn test_error_status_unknown_display() {
        let status = ErrorStatus::from_i32(42);
        assert_eq!(status, ErrorStatus::Unknown(42));
        assert_eq!(status.to_string(), "unknown(42)");
        assert_eq!(status.label(), UNKNOWN_ERROR_LABEL);
    }

    proptest! {
        #[test]
        fn prop_label_is_pure(code in any::<i32>()) {
            prop_assert_eq!(label(code), label(code));
        }

        #[test]
        fn prop_label_total(code in any::<i32>()) {
            let name = label(code);
            let known = ERROR_LABELS.iter().any(|(c, _)| *c == code);
            prop_assert_eq!(name == UNKNOWN_ERROR_LABEL, !known);
        }
    }
}
