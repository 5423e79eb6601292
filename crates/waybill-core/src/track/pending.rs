use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AckStamp, ChangeStatus, truncate_to_micros};
use crate::model::field::TrackedField;
use crate::model::ids::ItemId;

/// Key of the pending-change collection: one slot per item and field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PendingKey {
    pub item_id: ItemId,
    pub field: TrackedField,
}

/// The console's attention marker for one `(item, field)` slot.
///
/// Written only by customer updates (last write wins in its slot), flipped by
/// the acknowledgment workflow, removed by retention cleanup once it has been
/// acknowledged for long enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChange {
    pub item_id: ItemId,
    pub field: TrackedField,
    pub old_value: Value,
    pub new_value: Value,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    pub status: ChangeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<AckStamp>,
}

impl PendingChange {
    /// Fresh pending slot content for a customer edit.
    pub(crate) fn customer_edit(
        item_id: ItemId,
        field: TrackedField,
        old_value: Value,
        new_value: Value,
        changed_by: impl Into<String>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            item_id,
            field,
            old_value,
            new_value,
            changed_by: changed_by.into(),
            changed_at: truncate_to_micros(changed_at),
            status: ChangeStatus::Pending,
            ack: None,
        }
    }

    #[must_use]
    pub fn key(&self) -> PendingKey {
        PendingKey {
            item_id: self.item_id.clone(),
            field: self.field.clone(),
        }
    }

    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.status.is_pending()
    }

    /// Flip to acknowledged with a stamp. Returns whether anything changed.
    pub(crate) fn acknowledge(&mut self, by: &str, at: DateTime<Utc>) -> bool {
        if !self.is_pending() {
            return false;
        }
        self.status = ChangeStatus::Acknowledged;
        self.ack = Some(AckStamp::new(by, at));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 20, 9, 30, 0).unwrap()
    }

    fn change() -> PendingChange {
        PendingChange::customer_edit(
            ItemId::new("i-1"),
            "quantity".parse().unwrap(),
            json!(5),
            json!(10),
            "aylin",
            ts(),
        )
    }

    #[test]
    fn customer_edit_starts_pending() {
        let pending = change();
        assert!(pending.is_pending());
        assert_eq!(pending.ack, None);
        assert_eq!(pending.changed_by, "aylin");
    }

    #[test]
    fn key_carries_item_and_field() {
        let pending = change();
        let key = pending.key();
        assert_eq!(key.item_id, ItemId::new("i-1"));
        assert_eq!(key.field, "quantity".parse().unwrap());
    }

    #[test]
    fn acknowledge_is_monotonic() {
        let mut pending = change();
        assert!(pending.acknowledge("gert", ts()));
        assert!(!pending.is_pending());
        assert!(!pending.acknowledge("gert", ts()));
        assert_eq!(pending.ack, Some(AckStamp::new("gert", ts())));
    }

    #[test]
    fn keys_order_by_item_then_field() {
        let a = PendingKey {
            item_id: ItemId::new("i-1"),
            field: "name".parse().unwrap(),
        };
        let b = PendingKey {
            item_id: ItemId::new("i-1"),
            field: "quantity".parse().unwrap(),
        };
        let c = PendingKey {
            item_id: ItemId::new("i-2"),
            field: "name".parse().unwrap(),
        };
        assert!(a < b);
        assert!(b < c);
    }
}
