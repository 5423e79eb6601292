use std::fmt;

use serde::{Deserialize, Serialize};

/// Human-readable one-time list number, e.g. `MERT-3`.
///
/// The prefix is derived from the customer display name, the counter from the
/// per-customer sequence owned by the store. Assigned to a list exactly once.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListNumber(String);

/// Error returned when an operation needs a non-blank customer display name:
/// composing a number prefix, or saving a list head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlankCustomerName;

impl fmt::Display for BlankCustomerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("customer display name is blank")
    }
}

impl std::error::Error for BlankCustomerName {}

impl ListNumber {
    /// Wrap an already-composed number, e.g. when loading from storage.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Compose `PREFIX-<seq>` from a customer display name and sequence value.
    ///
    /// The prefix is the first `prefix_len` characters of the trimmed name,
    /// uppercased; names shorter than `prefix_len` contribute whole.
    ///
    /// # Errors
    ///
    /// Returns [`BlankCustomerName`] when the trimmed name is empty.
    pub fn compose(
        customer_name: &str,
        seq: u64,
        prefix_len: usize,
    ) -> Result<Self, BlankCustomerName> {
        let trimmed = customer_name.trim();
        if trimmed.is_empty() {
            return Err(BlankCustomerName);
        }
        let prefix: String = trimmed.chars().take(prefix_len).collect();
        Ok(Self(format!("{}-{seq}", prefix.to_uppercase())))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_uppercases_prefix() {
        let number = ListNumber::compose("Mertens Backwaren", 3, 4).expect("compose");
        assert_eq!(number.as_str(), "MERT-3");
    }

    #[test]
    fn short_names_contribute_whole() {
        assert_eq!(ListNumber::compose("Oz", 1, 4).unwrap().as_str(), "OZ-1");
    }

    #[test]
    fn name_is_trimmed_before_slicing() {
        assert_eq!(
            ListNumber::compose("  kaya trade  ", 12, 4).unwrap().as_str(),
            "KAYA-12"
        );
    }

    #[test]
    fn blank_names_are_rejected() {
        assert!(ListNumber::compose("   ", 1, 4).is_err());
        assert!(ListNumber::compose("", 1, 4).is_err());
    }

    #[test]
    fn non_ascii_names_uppercase_per_character() {
        let number = ListNumber::compose("Özkan GmbH", 2, 4).expect("compose");
        assert_eq!(number.as_str(), "ÖZKA-2");
    }
}
