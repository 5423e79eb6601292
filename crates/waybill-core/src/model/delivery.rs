use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Lifecycle of a per-period delivery record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Open,
    Packed,
    Shipped,
    Delivered,
}

impl Default for DeliveryStatus {
    fn default() -> Self {
        Self::Open
    }
}

impl DeliveryStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Packed => "packed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a delivery status from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDeliveryStatusError {
    pub got: String,
}

impl fmt::Display for ParseDeliveryStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid delivery status: '{}' (expected open|packed|shipped|delivered)",
            self.got
        )
    }
}

impl std::error::Error for ParseDeliveryStatusError {}

impl FromStr for DeliveryStatus {
    type Err = ParseDeliveryStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "packed" => Ok(Self::Packed),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            _ => Err(ParseDeliveryStatusError { got: s.to_string() }),
        }
    }
}

/// Delivery record for one schedule period of one line item.
///
/// Materialized lazily: a period without a record behaves as the default
/// (`open`, no quantity, no note) until a patch actually changes something.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Delivery {
    pub status: DeliveryStatus,
    pub quantity: Option<i64>,
    pub note: Option<String>,
}

/// Partial delivery payload. Absent fields leave the current value untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryPatch {
    pub status: Option<DeliveryStatus>,
    pub quantity: Option<i64>,
    pub note: Option<String>,
}

impl DeliveryPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none() && self.quantity.is_none() && self.note.is_none()
    }
}

/// One changed sub-field of a delivery record, rendered for log messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDelta {
    pub name: &'static str,
    pub from: String,
    pub to: String,
}

impl fmt::Display for FieldDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.name, self.from, self.to)
    }
}

fn render_opt_i64(value: Option<i64>) -> String {
    value.map_or_else(|| "(none)".to_string(), |v| v.to_string())
}

fn render_opt_str(value: Option<&str>) -> String {
    value.map_or_else(|| "(none)".to_string(), str::to_string)
}

impl Delivery {
    /// The record as a JSON object, the shape stored on log and pending
    /// entries as old/new value.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "quantity": self.quantity,
            "note": self.note,
        })
    }

    /// Apply a patch, returning the merged record. `self` is untouched.
    #[must_use]
    pub fn merged(&self, patch: &DeliveryPatch) -> Self {
        Self {
            status: patch.status.unwrap_or(self.status),
            quantity: patch.quantity.or(self.quantity),
            note: patch.note.clone().or_else(|| self.note.clone()),
        }
    }

    /// Sub-field deltas from `self` to `other`, in record order.
    ///
    /// Empty when the records are equal; this is the no-op signal for
    /// delivery updates.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<FieldDelta> {
        let mut deltas = Vec::new();
        if self.status != other.status {
            deltas.push(FieldDelta {
                name: "status",
                from: self.status.to_string(),
                to: other.status.to_string(),
            });
        }
        if self.quantity != other.quantity {
            deltas.push(FieldDelta {
                name: "quantity",
                from: render_opt_i64(self.quantity),
                to: render_opt_i64(other.quantity),
            });
        }
        if self.note != other.note {
            deltas.push(FieldDelta {
                name: "note",
                from: render_opt_str(self.note.as_deref()),
                to: render_opt_str(other.note.as_deref()),
            });
        }
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_open_and_empty() {
        let delivery = Delivery::default();
        assert_eq!(delivery.status, DeliveryStatus::Open);
        assert_eq!(delivery.quantity, None);
        assert_eq!(delivery.note, None);
    }

    #[test]
    fn merge_keeps_absent_fields() {
        let current = Delivery {
            status: DeliveryStatus::Packed,
            quantity: Some(3),
            note: Some("ring the bell".to_string()),
        };
        let merged = current.merged(&DeliveryPatch {
            status: Some(DeliveryStatus::Shipped),
            ..DeliveryPatch::default()
        });
        assert_eq!(merged.status, DeliveryStatus::Shipped);
        assert_eq!(merged.quantity, Some(3));
        assert_eq!(merged.note.as_deref(), Some("ring the bell"));
    }

    #[test]
    fn diff_lists_changed_subfields_in_order() {
        let old = Delivery::default();
        let new = Delivery {
            status: DeliveryStatus::Shipped,
            quantity: Some(5),
            note: None,
        };
        let deltas = old.diff(&new);
        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[0].to_string(), "status open -> shipped");
        assert_eq!(deltas[1].to_string(), "quantity (none) -> 5");
    }

    #[test]
    fn diff_of_equal_records_is_empty() {
        let delivery = Delivery {
            status: DeliveryStatus::Delivered,
            quantity: Some(1),
            note: None,
        };
        assert!(delivery.diff(&delivery.clone()).is_empty());
    }

    #[test]
    fn empty_patch_merges_to_same_record() {
        let current = Delivery {
            status: DeliveryStatus::Packed,
            quantity: None,
            note: Some("dock 4".to_string()),
        };
        let patch = DeliveryPatch::default();
        assert!(patch.is_empty());
        assert_eq!(current.merged(&patch), current);
    }

    #[test]
    fn status_parse_and_serde() {
        assert_eq!(
            "Shipped".parse::<DeliveryStatus>().unwrap(),
            DeliveryStatus::Shipped
        );
        assert!("lost".parse::<DeliveryStatus>().is_err());
        assert_eq!(
            serde_json::to_string(&DeliveryStatus::Open).unwrap(),
            "\"open\""
        );
    }

    #[test]
    fn record_deserializes_with_defaults() {
        let delivery: Delivery = serde_json::from_str("{}").expect("defaults");
        assert_eq!(delivery, Delivery::default());
        let delivery: Delivery =
            serde_json::from_str(r#"{"status":"packed","quantity":2}"#).expect("partial");
        assert_eq!(delivery.status, DeliveryStatus::Packed);
        assert_eq!(delivery.quantity, Some(2));
    }
}
