//! The list aggregate.
//!
//! A [`List`] owns its line items, its append-only activity log, and the
//! pending-change collection the admin console works through. All tracked
//! mutations run through the list so that:
//!
//! - every effective field change is diffed and logged exactly once,
//! - customer edits maintain at most one pending slot per `(item, field)`,
//! - admin edits never create pending work,
//! - acknowledgment only ever moves `pending -> acknowledged`.
//!
//! Mutating operations come in pairs: a convenience form stamped with
//! `Utc::now()` and an `_at` form taking the timestamp explicitly, which is
//! what the tests and any queue-driven caller use.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::actor::Actor;
use super::delivery::DeliveryPatch;
use super::field::{ItemField, Period, TrackedField};
use super::ids::{EntryId, ItemId, ListId};
use super::item::{InvalidValue, ListItem};
use super::number::ListNumber;
use crate::config::DEFAULT_RETENTION_DAYS;
use crate::error::ErrorCode;
use crate::track::{ActivityEntry, PendingChange, PendingKey, truncate_to_micros};

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

/// Error returned by tracked list operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListError {
    #[error("item '{0}' not found in list")]
    ItemNotFound(ItemId),
    #[error("item '{0}' already exists in list")]
    DuplicateItem(ItemId),
    #[error(transparent)]
    InvalidValue(#[from] InvalidValue),
    #[error("list number '{0}' refused: a number is already assigned")]
    NumberAlreadyAssigned(ListNumber),
}

impl ListError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ItemNotFound(_) => ErrorCode::ItemNotFound,
            Self::DuplicateItem(_) => ErrorCode::DuplicateItem,
            Self::InvalidValue(_) => ErrorCode::InvalidFieldValue,
            Self::NumberAlreadyAssigned(_) => ErrorCode::NumberAlreadyAssigned,
        }
    }
}

/// Whether an update actually changed anything.
///
/// Equal old/new values are a no-op: nothing is logged, no pending slot is
/// touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Changed,
    Unchanged,
}

impl UpdateOutcome {
    #[must_use]
    pub const fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }
}

/// Counts reported by the acknowledgment operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AckOutcome {
    pub logs_acknowledged: usize,
    pub pending_acknowledged: usize,
    pub pending_purged: usize,
}

// ---------------------------------------------------------------------------
// The aggregate
// ---------------------------------------------------------------------------

/// A customer's shared order list with its full tracking state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    id: ListId,
    customer_id: String,
    customer_name: String,
    number: Option<ListNumber>,
    items: Vec<ListItem>,
    log: Vec<ActivityEntry>,
    pending: BTreeMap<PendingKey, PendingChange>,
    next_entry_id: u64,
    version: u64,
    created_at: DateTime<Utc>,
}

/// Raw field bundle used when reassembling a list from storage.
pub(crate) struct ListParts {
    pub id: ListId,
    pub customer_id: String,
    pub customer_name: String,
    pub number: Option<ListNumber>,
    pub items: Vec<ListItem>,
    pub log: Vec<ActivityEntry>,
    pub pending: BTreeMap<PendingKey, PendingChange>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

impl List {
    #[must_use]
    pub fn new(
        id: ListId,
        customer_id: impl Into<String>,
        customer_name: impl Into<String>,
    ) -> Self {
        Self::new_at(id, customer_id, customer_name, Utc::now())
    }

    #[must_use]
    pub fn new_at(
        id: ListId,
        customer_id: impl Into<String>,
        customer_name: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            customer_id: customer_id.into(),
            customer_name: customer_name.into(),
            number: None,
            items: Vec::new(),
            log: Vec::new(),
            pending: BTreeMap::new(),
            next_entry_id: 1,
            version: 0,
            created_at: truncate_to_micros(created_at),
        }
    }

    pub(crate) fn from_parts(parts: ListParts) -> Self {
        let next_entry_id = parts.log.last().map_or(1, |entry| entry.id.get() + 1);
        Self {
            id: parts.id,
            customer_id: parts.customer_id,
            customer_name: parts.customer_name,
            number: parts.number,
            items: parts.items,
            log: parts.log,
            pending: parts.pending,
            next_entry_id,
            version: parts.version,
            created_at: parts.created_at,
        }
    }

    // -- accessors ----------------------------------------------------------

    #[must_use]
    pub const fn id(&self) -> &ListId {
        &self.id
    }

    #[must_use]
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    #[must_use]
    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    #[must_use]
    pub const fn number(&self) -> Option<&ListNumber> {
        self.number.as_ref()
    }

    #[must_use]
    pub fn items(&self) -> &[ListItem] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, item_id: &ItemId) -> Option<&ListItem> {
        self.items.iter().find(|item| &item.id == item_id)
    }

    /// The activity log in insertion order (entry ids ascending).
    #[must_use]
    pub fn log_entries(&self) -> &[ActivityEntry] {
        &self.log
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) const fn pending_map(&self) -> &BTreeMap<PendingKey, PendingChange> {
        &self.pending
    }

    // -- item and number lifecycle ------------------------------------------

    /// Attach a line item.
    ///
    /// Attaching is not a tracked change; only field-level updates are
    /// diffed and logged.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::DuplicateItem`] when the id is already present.
    pub fn add_item(&mut self, item: ListItem) -> Result<(), ListError> {
        if self.item(&item.id).is_some() {
            return Err(ListError::DuplicateItem(item.id));
        }
        self.items.push(item);
        Ok(())
    }

    /// Record the one-time list number.
    ///
    /// The creation flow obtains the number from the store's per-customer
    /// sequence and assigns it exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`ListError::NumberAlreadyAssigned`] on any second assignment.
    pub fn assign_number(&mut self, number: ListNumber) -> Result<(), ListError> {
        if self.number.is_some() {
            return Err(ListError::NumberAlreadyAssigned(number));
        }
        self.number = Some(number);
        Ok(())
    }

    // -- tracked updates ----------------------------------------------------

    /// [`Self::update_field_at`] stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::update_field_at`].
    pub fn update_field(
        &mut self,
        item_id: &ItemId,
        field: ItemField,
        new_value: &Value,
        actor: &Actor,
    ) -> Result<UpdateOutcome, ListError> {
        self.update_field_at(item_id, field, new_value, actor, Utc::now())
    }

    /// Diff-and-log update of one business field.
    ///
    /// No-ops (old equals new after normalization) record nothing. Customer
    /// edits upsert the `(item, field)` pending slot; admin edits are logged
    /// pre-acknowledged and stamp any outstanding pending slot for the same
    /// key as acknowledged (the overwrite supersedes it).
    ///
    /// # Errors
    ///
    /// [`ListError::ItemNotFound`] for an unknown item id,
    /// [`ListError::InvalidValue`] when the payload has the wrong shape;
    /// either way the aggregate is untouched.
    pub fn update_field_at(
        &mut self,
        item_id: &ItemId,
        field: ItemField,
        new_value: &Value,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<UpdateOutcome, ListError> {
        let index = self.item_index(item_id)?;
        ListItem::validate_value(field, new_value)?;
        let new_value = ListItem::normalize_value(field, new_value);

        if self.items[index].field_value(field) == new_value {
            debug!(item = %item_id, field = %field, "field update is a no-op");
            return Ok(UpdateOutcome::Unchanged);
        }

        let old_value = self.items[index].apply_value(field, &new_value)?;
        let entry = ActivityEntry::field_change(
            self.next_id(),
            actor,
            item_id.clone(),
            TrackedField::Item(field),
            old_value,
            new_value,
            at,
        );
        self.record(actor, entry, at);
        Ok(UpdateOutcome::Changed)
    }

    /// [`Self::update_fields_at`] stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::update_fields_at`].
    pub fn update_fields(
        &mut self,
        item_id: &ItemId,
        updates: &[(ItemField, Value)],
        actor: &Actor,
    ) -> Result<Vec<ItemField>, ListError> {
        self.update_fields_at(item_id, updates, actor, Utc::now())
    }

    /// Batch form of [`Self::update_field_at`], all-or-nothing.
    ///
    /// Every payload is validated before anything is applied; the first
    /// invalid one fails the whole batch with zero mutations. Returns the
    /// fields that actually changed, in application order (no-ops excluded).
    ///
    /// # Errors
    ///
    /// As [`Self::update_field_at`]; on error nothing was applied or logged.
    pub fn update_fields_at(
        &mut self,
        item_id: &ItemId,
        updates: &[(ItemField, Value)],
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<Vec<ItemField>, ListError> {
        self.item_index(item_id)?;
        for (field, value) in updates {
            ListItem::validate_value(*field, value)?;
        }

        let mut changed = Vec::new();
        for (field, value) in updates {
            if self.update_field_at(item_id, *field, value, actor, at)?.is_changed() {
                changed.push(*field);
            }
        }
        Ok(changed)
    }

    /// [`Self::update_delivery_at`] stamped with the current time.
    ///
    /// # Errors
    ///
    /// See [`Self::update_delivery_at`].
    pub fn update_delivery(
        &mut self,
        item_id: &ItemId,
        period: &Period,
        patch: &DeliveryPatch,
        actor: &Actor,
    ) -> Result<UpdateOutcome, ListError> {
        self.update_delivery_at(item_id, period, patch, actor, Utc::now())
    }

    /// Merge a partial payload into the item's delivery record for `period`.
    ///
    /// An absent record behaves as the default (`open`) one; it is only
    /// materialized when the merge changes something. Effective changes
    /// produce exactly one log entry under the synthetic
    /// `delivery_<period>` field whose message aggregates every changed
    /// sub-field; pending semantics match [`Self::update_field_at`].
    ///
    /// # Errors
    ///
    /// [`ListError::ItemNotFound`] for an unknown item id.
    pub fn update_delivery_at(
        &mut self,
        item_id: &ItemId,
        period: &Period,
        patch: &DeliveryPatch,
        actor: &Actor,
        at: DateTime<Utc>,
    ) -> Result<UpdateOutcome, ListError> {
        let index = self.item_index(item_id)?;
        let current = self.items[index]
            .deliveries
            .get(period)
            .cloned()
            .unwrap_or_default();
        let merged = current.merged(patch);
        let deltas = current.diff(&merged);
        if deltas.is_empty() {
            debug!(item = %item_id, period = %period, "delivery update is a no-op");
            return Ok(UpdateOutcome::Unchanged);
        }

        let old_value = current.to_json();
        let new_value = merged.to_json();
        let field = TrackedField::Delivery(period.clone());
        let entry = ActivityEntry::delivery_change(
            self.next_id(),
            actor,
            item_id.clone(),
            field,
            old_value,
            new_value,
            &deltas,
            at,
        );
        self.items[index].deliveries.insert(period.clone(), merged);
        self.record(actor, entry, at);
        Ok(UpdateOutcome::Changed)
    }

    // -- acknowledgment workflow --------------------------------------------

    /// [`Self::acknowledge_changes_at`] with the current time and the
    /// default retention window.
    pub fn acknowledge_changes(
        &mut self,
        admin_id: &str,
        filter: Option<&[EntryId]>,
    ) -> AckOutcome {
        self.acknowledge_changes_at(admin_id, filter, Utc::now(), default_retention())
    }

    /// Acknowledge customer changes, then run retention cleanup.
    ///
    /// Flips every unacknowledged customer-authored log entry (restricted to
    /// `filter` when given) and the pending slots correlated with them: with
    /// no filter every pending slot flips, with a filter a slot flips when
    /// one of the entries acknowledged in this call touched the same
    /// `(item, field)` key. Idempotent; a repeat call reports zeros.
    pub fn acknowledge_changes_at(
        &mut self,
        admin_id: &str,
        filter: Option<&[EntryId]>,
        now: DateTime<Utc>,
        retention: Duration,
    ) -> AckOutcome {
        let mut outcome = AckOutcome::default();
        let mut acked_keys: BTreeSet<PendingKey> = BTreeSet::new();

        for entry in &mut self.log {
            if !entry.awaits_review() {
                continue;
            }
            if let Some(ids) = filter {
                if !ids.contains(&entry.id) {
                    continue;
                }
            }
            if entry.acknowledge(admin_id, now) {
                outcome.logs_acknowledged += 1;
                if let (Some(item_id), Some(field)) = (&entry.item_id, &entry.field) {
                    acked_keys.insert(PendingKey {
                        item_id: item_id.clone(),
                        field: field.clone(),
                    });
                }
            }
        }

        for pending in self.pending.values_mut() {
            if !pending.is_pending() {
                continue;
            }
            let correlated = filter.is_none() || acked_keys.contains(&pending.key());
            if correlated && pending.acknowledge(admin_id, now) {
                outcome.pending_acknowledged += 1;
            }
        }

        outcome.pending_purged = self.cleanup_acknowledged_at(now, retention);
        info!(
            admin = admin_id,
            logs = outcome.logs_acknowledged,
            pending = outcome.pending_acknowledged,
            purged = outcome.pending_purged,
            "acknowledged customer changes"
        );
        outcome
    }

    /// [`Self::acknowledge_fields_at`] stamped with the current time.
    pub fn acknowledge_fields(&mut self, admin_id: &str, fields: &[TrackedField]) -> AckOutcome {
        self.acknowledge_fields_at(admin_id, fields, Utc::now())
    }

    /// Acknowledge by field name, across all items.
    ///
    /// Correlation is deliberately by field name only: every pending slot and
    /// every unacknowledged customer log entry whose field is in `fields`
    /// flips, whichever item it belongs to. A customer edit racing this call
    /// may therefore be acknowledged sight-unseen; callers that need
    /// precision use [`Self::acknowledge_changes_at`] with explicit ids.
    /// Does not run retention cleanup. Idempotent.
    pub fn acknowledge_fields_at(
        &mut self,
        admin_id: &str,
        fields: &[TrackedField],
        now: DateTime<Utc>,
    ) -> AckOutcome {
        let mut outcome = AckOutcome::default();
        for pending in self.pending.values_mut() {
            if pending.is_pending()
                && fields.contains(&pending.field)
                && pending.acknowledge(admin_id, now)
            {
                outcome.pending_acknowledged += 1;
            }
        }
        for entry in &mut self.log {
            if entry.awaits_review()
                && entry.field.as_ref().is_some_and(|f| fields.contains(f))
                && entry.acknowledge(admin_id, now)
            {
                outcome.logs_acknowledged += 1;
            }
        }
        info!(
            admin = admin_id,
            logs = outcome.logs_acknowledged,
            pending = outcome.pending_acknowledged,
            "acknowledged changes by field"
        );
        outcome
    }

    /// [`Self::cleanup_acknowledged_at`] with the current time and default
    /// retention window.
    pub fn cleanup_acknowledged(&mut self) -> usize {
        self.cleanup_acknowledged_at(Utc::now(), default_retention())
    }

    /// Drop acknowledged pending slots older than the retention window.
    ///
    /// "Older" is strict: a slot acknowledged exactly `retention` ago stays.
    /// `pending` slots are never dropped, and the activity log is never
    /// touched. Returns the number of purged slots.
    pub fn cleanup_acknowledged_at(&mut self, now: DateTime<Utc>, retention: Duration) -> usize {
        let before = self.pending.len();
        self.pending.retain(|_, pending| {
            if pending.is_pending() {
                return true;
            }
            let acked_at = pending.ack.as_ref().map_or(pending.changed_at, |ack| ack.at);
            now.signed_duration_since(acked_at) <= retention
        });
        let purged = before - self.pending.len();
        if purged > 0 {
            debug!(list = %self.id, purged, "purged acknowledged pending changes");
        }
        purged
    }

    // -- queries ------------------------------------------------------------

    /// Customer-authored log entries still awaiting review, insertion order.
    #[must_use]
    pub fn unacknowledged_customer_changes(&self) -> Vec<&ActivityEntry> {
        self.log.iter().filter(|e| e.awaits_review()).collect()
    }

    /// Customer changes still awaiting review, key order.
    #[must_use]
    pub fn pending_field_changes(&self) -> Vec<&PendingChange> {
        self.pending.values().filter(|p| p.is_pending()).collect()
    }

    /// Every slot currently in the pending collection, key order. Alongside
    /// the `pending` slots this includes acknowledged ones still inside the
    /// retention window.
    #[must_use]
    pub fn retained_field_changes(&self) -> Vec<&PendingChange> {
        self.pending.values().collect()
    }

    /// Log entries touching one item, insertion order.
    #[must_use]
    pub fn item_activity(&self, item_id: &ItemId) -> Vec<&ActivityEntry> {
        self.log
            .iter()
            .filter(|e| e.item_id.as_ref() == Some(item_id))
            .collect()
    }

    /// Pending-collection slots of one item, key order.
    #[must_use]
    pub fn item_pending(&self, item_id: &ItemId) -> Vec<&PendingChange> {
        self.pending
            .values()
            .filter(|p| &p.item_id == item_id)
            .collect()
    }

    /// The full activity log, newest first.
    ///
    /// Sorted by timestamp descending; equal timestamps order by entry id
    /// descending, so same-instant entries come out newest-insertion-first.
    #[must_use]
    pub fn activity_log(&self) -> Vec<&ActivityEntry> {
        let mut entries: Vec<&ActivityEntry> = self.log.iter().collect();
        entries.sort_by(|a, b| {
            b.recorded_at
                .cmp(&a.recorded_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        entries
    }

    /// Whether any slot is still `pending`. True exactly when
    /// [`Self::pending_field_changes`] returns entries.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.pending.values().any(PendingChange::is_pending)
    }

    /// Fields of one item with a `pending` slot.
    #[must_use]
    pub fn unacknowledged_fields(&self, item_id: &ItemId) -> BTreeSet<TrackedField> {
        self.pending
            .values()
            .filter(|p| &p.item_id == item_id && p.is_pending())
            .map(|p| p.field.clone())
            .collect()
    }

    /// Whether one `(item, field)` slot is `pending`.
    #[must_use]
    pub fn has_pending_field_change(&self, item_id: &ItemId, field: &TrackedField) -> bool {
        self.slot(item_id, field).is_some_and(PendingChange::is_pending)
    }

    /// The `pending` slot for `(item, field)`, when there is one.
    ///
    /// The upsert discipline guarantees this is the most recent customer
    /// edit of that field.
    #[must_use]
    pub fn latest_unacknowledged_change(
        &self,
        item_id: &ItemId,
        field: &TrackedField,
    ) -> Option<&PendingChange> {
        self.slot(item_id, field).filter(|p| p.is_pending())
    }

    /// Whether the item carries any `pending` slot.
    #[must_use]
    pub fn needs_attention(&self, item_id: &ItemId) -> bool {
        self.pending
            .values()
            .any(|p| &p.item_id == item_id && p.is_pending())
    }

    // -- internals ----------------------------------------------------------

    fn item_index(&self, item_id: &ItemId) -> Result<usize, ListError> {
        self.items
            .iter()
            .position(|item| &item.id == item_id)
            .ok_or_else(|| ListError::ItemNotFound(item_id.clone()))
    }

    fn slot(&self, item_id: &ItemId, field: &TrackedField) -> Option<&PendingChange> {
        self.pending.get(&PendingKey {
            item_id: item_id.clone(),
            field: field.clone(),
        })
    }

    fn next_id(&mut self) -> EntryId {
        let id = EntryId::new(self.next_entry_id);
        self.next_entry_id += 1;
        id
    }

    /// Append a change entry and maintain the pending collection.
    fn record(&mut self, actor: &Actor, entry: ActivityEntry, at: DateTime<Utc>) {
        if actor.is_admin() {
            if let (Some(item_id), Some(field)) = (&entry.item_id, &entry.field) {
                let key = PendingKey {
                    item_id: item_id.clone(),
                    field: field.clone(),
                };
                if let Some(pending) = self.pending.get_mut(&key) {
                    if pending.acknowledge(&actor.id, at) {
                        debug!(
                            item = %key.item_id,
                            field = %key.field,
                            admin = %actor.id,
                            "admin overwrite superseded pending change"
                        );
                    }
                }
            }
        } else if let (Some(item_id), Some(field), Some(old), Some(new)) = (
            &entry.item_id,
            &entry.field,
            &entry.old_value,
            &entry.new_value,
        ) {
            let pending = PendingChange::customer_edit(
                item_id.clone(),
                field.clone(),
                old.clone(),
                new.clone(),
                actor.id.clone(),
                at,
            );
            self.pending.insert(pending.key(), pending);
        }
        self.log.push(entry);
    }
}

fn default_retention() -> Duration {
    Duration::days(i64::from(DEFAULT_RETENTION_DAYS))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
