use std::fmt;

/// Machine-readable error codes for console and integration-layer decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ItemNotFound,
    DuplicateItem,
    UnknownField,
    InvalidFieldValue,
    UnknownRole,
    NumberAlreadyAssigned,
    BlankCustomerName,
    VersionConflict,
    CorruptRecord,
    StorageFailed,
    LockContention,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::ItemNotFound => "E2001",
            Self::DuplicateItem => "E2002",
            Self::UnknownField => "E2003",
            Self::InvalidFieldValue => "E2004",
            Self::UnknownRole => "E2005",
            Self::NumberAlreadyAssigned => "E2006",
            Self::BlankCustomerName => "E2007",
            Self::VersionConflict => "E3001",
            Self::CorruptRecord => "E3002",
            Self::StorageFailed => "E5001",
            Self::LockContention => "E5002",
        }
    }

    /// Short human-facing summary for logs and console output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ItemNotFound => "List item not found",
            Self::DuplicateItem => "Duplicate list item",
            Self::UnknownField => "Unknown tracked field",
            Self::InvalidFieldValue => "Invalid field value",
            Self::UnknownRole => "Unknown actor role",
            Self::NumberAlreadyAssigned => "List number already assigned",
            Self::BlankCustomerName => "Blank customer name",
            Self::VersionConflict => "List version conflict",
            Self::CorruptRecord => "Corrupt stored record",
            Self::StorageFailed => "Storage operation failed",
            Self::LockContention => "Lock contention",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in waybill.toml and retry."),
            Self::ItemNotFound => Some("Reload the list; the item may have been removed."),
            Self::DuplicateItem => None,
            Self::UnknownField => Some("Use one of the documented field names."),
            Self::InvalidFieldValue => Some("Check the expected type for this field."),
            Self::UnknownRole => Some("Only `admin` and `customer` are valid roles."),
            Self::NumberAlreadyAssigned => None,
            Self::BlankCustomerName => Some("Set a customer display name before numbering lists."),
            Self::VersionConflict => Some("Reload the list and reapply the change."),
            Self::CorruptRecord => Some("Restore the store file from backup."),
            Self::StorageFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Retry after the other process releases its lock."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
