use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::{AckStamp, ChangeStatus, truncate_to_micros};
use crate::model::actor::{Actor, ActorRole};
use crate::model::delivery::FieldDelta;
use crate::model::field::TrackedField;
use crate::model::ids::{EntryId, ItemId};

/// One line of a list's activity log.
///
/// Append-only: everything except `status` and `ack` is fixed at creation.
/// Customer-authored entries are born `pending`, admin-authored entries are
/// born `acknowledged` with no stamp (nobody reviewed them, they never needed
/// review).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: EntryId,
    pub message: String,
    pub actor_role: ActorRole,
    pub actor_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<TrackedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,
    pub recorded_at: DateTime<Utc>,
    pub status: ChangeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<AckStamp>,
}

impl ActivityEntry {
    /// Entry for a scalar field update, message per the
    /// `<actor> changed <field> from <old> to <new> at <ts>` template.
    pub(crate) fn field_change(
        id: EntryId,
        actor: &Actor,
        item_id: ItemId,
        field: TrackedField,
        old: Value,
        new: Value,
        at: DateTime<Utc>,
    ) -> Self {
        let message = format!(
            "{} changed {} from {} to {} at {}",
            actor.id,
            field,
            render_value(&old),
            render_value(&new),
            format_ts(at),
        );
        Self::from_change(id, actor, item_id, field, old, new, message, at)
    }

    /// Entry for a delivery update: one entry per period, the message
    /// aggregates all changed sub-fields.
    pub(crate) fn delivery_change(
        id: EntryId,
        actor: &Actor,
        item_id: ItemId,
        field: TrackedField,
        old: Value,
        new: Value,
        deltas: &[FieldDelta],
        at: DateTime<Utc>,
    ) -> Self {
        let detail = deltas
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let message = format!(
            "{} changed {}: {} at {}",
            actor.id,
            field,
            detail,
            format_ts(at),
        );
        Self::from_change(id, actor, item_id, field, old, new, message, at)
    }

    #[allow(clippy::too_many_arguments)]
    fn from_change(
        id: EntryId,
        actor: &Actor,
        item_id: ItemId,
        field: TrackedField,
        old: Value,
        new: Value,
        message: String,
        at: DateTime<Utc>,
    ) -> Self {
        let status = if actor.is_admin() {
            ChangeStatus::Acknowledged
        } else {
            ChangeStatus::Pending
        };
        Self {
            id,
            message,
            actor_role: actor.role,
            actor_id: actor.id.clone(),
            item_id: Some(item_id),
            field: Some(field),
            old_value: Some(old),
            new_value: Some(new),
            recorded_at: truncate_to_micros(at),
            status,
            ack: None,
        }
    }

    #[must_use]
    pub const fn is_acknowledged(&self) -> bool {
        matches!(self.status, ChangeStatus::Acknowledged)
    }

    /// True for entries the acknowledgment workflow still owes a review:
    /// customer-authored and not yet acknowledged.
    #[must_use]
    pub const fn awaits_review(&self) -> bool {
        matches!(self.actor_role, ActorRole::Customer) && self.status.is_pending()
    }

    /// Flip to acknowledged with a stamp. Returns whether anything changed;
    /// already-acknowledged entries are left untouched.
    pub(crate) fn acknowledge(&mut self, by: &str, at: DateTime<Utc>) -> bool {
        if self.is_acknowledged() {
            return false;
        }
        self.status = ChangeStatus::Acknowledged;
        self.ack = Some(AckStamp::new(by, at));
        true
    }
}

impl fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.message)
    }
}

/// Render a JSON value for log messages: strings bare, `null` as `(none)`,
/// everything else in compact JSON form.
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "(none)".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}
