use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The two roles that may edit a shared list.
///
/// The set is closed: anything other than `admin` or `customer` is rejected
/// at the boundary instead of being carried around as a free-form string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Customer,
}

impl ActorRole {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a role from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError {
    pub got: String,
}

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid actor role: '{}' (expected admin|customer)", self.got)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for ActorRole {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            _ => Err(ParseRoleError { got: s.to_string() }),
        }
    }
}

/// An acting user: role plus the caller-supplied account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub role: ActorRole,
    pub id: String,
}

impl Actor {
    #[must_use]
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            role: ActorRole::Admin,
            id: id.into(),
        }
    }

    #[must_use]
    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            role: ActorRole::Customer,
            id: id.into(),
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, ActorRole::Admin)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.role, self.id)
    }
}
