//! Field identifiers for change tracking.
//!
//! Log and pending entries name the field they touched. The identifier is
//! either one of the closed line-item business fields or the synthetic
//! `delivery_<period>` form used for per-period delivery records. The string
//! representation is what gets persisted and what the console filters on.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The line-item business fields that participate in diff tracking.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ItemField {
    /// Item display name.
    Name,
    /// Ordered amount, non-negative.
    Quantity,
    /// Unit of measure (kg, pcs, ...).
    Unit,
    /// Free-text note on the line.
    Comment,
}

impl ItemField {
    /// All tracked item fields in catalog order.
    pub const ALL: [Self; 4] = [Self::Name, Self::Quantity, Self::Unit, Self::Comment];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Quantity => "quantity",
            Self::Unit => "unit",
            Self::Comment => "comment",
        }
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A delivery schedule period key, e.g. `2026-W34` or `2026-08`.
///
/// Opaque to this crate beyond validation: non-empty, at most 32 bytes,
/// ASCII alphanumeric plus `-` and `_`. Case is preserved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period(String);

/// Error returned when a period key fails validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPeriod {
    /// The rejected input.
    pub raw: String,
    pub reason: &'static str,
}

impl fmt::Display for InvalidPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid delivery period '{}': {}", self.raw, self.reason)
    }
}

impl std::error::Error for InvalidPeriod {}

impl Period {
    pub const MAX_LEN: usize = 32;

    /// Validate and wrap a period key.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidPeriod`] when the key is empty, longer than
    /// [`Self::MAX_LEN`] bytes, or contains characters outside
    /// `[A-Za-z0-9_-]`.
    pub fn new(raw: impl Into<String>) -> Result<Self, InvalidPeriod> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(InvalidPeriod {
                raw,
                reason: "must not be empty",
            });
        }
        if raw.len() > Self::MAX_LEN {
            return Err(InvalidPeriod {
                raw,
                reason: "longer than 32 bytes",
            });
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(InvalidPeriod {
                raw,
                reason: "only ASCII alphanumerics, '-' and '_' are allowed",
            });
        }
        Ok(Self(raw))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Period {
    type Error = InvalidPeriod;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.0
    }
}

/// The field identifier recorded on log and pending entries.
///
/// Serialized as its string form: the bare field name for item fields, the
/// `delivery_<period>` form for delivery records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TrackedField {
    Item(ItemField),
    Delivery(Period),
}

/// Error returned when parsing an unknown field identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFieldError {
    /// The unrecognised input string.
    pub raw: String,
}

impl fmt::Display for ParseFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown tracked field '{}': expected one of name, quantity, unit, \
             comment, or delivery_<period>",
            self.raw
        )
    }
}

impl std::error::Error for ParseFieldError {}

impl TrackedField {
    /// The synthetic field identifier for a delivery period.
    #[must_use]
    pub const fn delivery(period: Period) -> Self {
        Self::Delivery(period)
    }

    #[must_use]
    pub const fn is_delivery(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

impl From<ItemField> for TrackedField {
    fn from(field: ItemField) -> Self {
        Self::Item(field)
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item(field) => f.write_str(field.as_str()),
            Self::Delivery(period) => write!(f, "delivery_{period}"),
        }
    }
}

impl FromStr for TrackedField {
    type Err = ParseFieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "name" => return Ok(Self::Item(ItemField::Name)),
            "quantity" => return Ok(Self::Item(ItemField::Quantity)),
            "unit" => return Ok(Self::Item(ItemField::Unit)),
            "comment" => return Ok(Self::Item(ItemField::Comment)),
            _ => {}
        }
        // The `delivery_` prefix is canonical lowercase; the period keeps case.
        if let Some(rest) = trimmed.strip_prefix("delivery_") {
            let period = Period::new(rest).map_err(|_| ParseFieldError {
                raw: s.to_string(),
            })?;
            return Ok(Self::Delivery(period));
        }
        Err(ParseFieldError { raw: s.to_string() })
    }
}

// Custom serde: serialize as the string form.
impl Serialize for TrackedField {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TrackedField {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(serde::de::Error::custom)
    }
}
