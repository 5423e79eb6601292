//! Save and load whole list aggregates.
//!
//! One aggregate maps to one `lists` row plus its `list_items`,
//! `activity_log`, and `pending_changes` rows. Saving is a single
//! transaction guarded by the optimistic `version` column: the head update
//! carries `WHERE version = ?`, and zero affected rows aborts the save with
//! [`StoreError::VersionConflict`] before anything else is written.
//!
//! Items and pending rows are replaced wholesale inside the transaction; log
//! rows are upsert-appended, and the `ON CONFLICT` arm may only touch the
//! acknowledgment columns of an existing row. Nothing ever deletes log rows.

use chrono::{DateTime, Utc};
use rusqlite::{Row, Transaction, TransactionBehavior, params};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{Store, StoreError, corrupt};
use crate::model::delivery::Delivery;
use crate::model::field::{Period, TrackedField};
use crate::model::ids::{EntryId, ItemId, ListId};
use crate::model::item::ListItem;
use crate::model::list::{List, ListParts};
use crate::model::number::{BlankCustomerName, ListNumber};
use crate::track::{AckStamp, ActivityEntry, PendingChange, PendingKey};

impl Store {
    /// Persist an aggregate in one transaction.
    ///
    /// New lists (version 0) insert at version 1; existing lists bump their
    /// version by one. On success the in-memory aggregate observes the saved
    /// version.
    ///
    /// # Errors
    ///
    /// [`StoreError::VersionConflict`] when the stored version no longer
    /// matches (or a create raced another create);
    /// [`StoreError::BlankCustomerName`] when the aggregate's customer
    /// display name is blank. Nothing is written in either case.
    pub fn save_list(&mut self, list: &mut List) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let saved_version = write_list(&tx, list)?;
        tx.commit()?;
        list.set_version(saved_version);
        Ok(())
    }

    /// Load an aggregate, or `None` when the id is unknown.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupt`] when a stored enum string, JSON payload, or
    /// timestamp fails to parse.
    pub fn load_list(&self, id: &ListId) -> Result<Option<List>, StoreError> {
        let head = self.conn.query_row(
            "SELECT customer_id, customer_name, list_number, version, created_at_us
             FROM lists WHERE list_id = ?1",
            params![id.as_str()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            },
        );
        let (customer_id, customer_name, number, version, created_at_us) = match head {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let parts = ListParts {
            id: id.clone(),
            customer_id,
            customer_name,
            number: number.map(ListNumber::new),
            items: self.load_items(id)?,
            log: self.load_log(id)?,
            pending: self.load_pending(id)?,
            version: u64::try_from(version)
                .map_err(|_| corrupt(format!("lists.version is negative: {version}")))?,
            created_at: from_micros(created_at_us, "lists.created_at_us")?,
        };
        Ok(Some(List::from_parts(parts)))
    }

    /// Ids of lists with at least one `pending` slot, ascending.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn lists_needing_attention(&self) -> Result<Vec<ListId>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT list_id FROM pending_changes
             WHERE status = 'pending'
             ORDER BY list_id",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(ListId::new(row?));
        }
        Ok(ids)
    }

    /// SQL-level retention sweep across all lists.
    ///
    /// Deletes acknowledged pending rows whose stamp is strictly older than
    /// `cutoff`; `pending` rows and the activity log are untouched. The sweep
    /// bypasses the aggregates' optimistic versioning, so schedulers run it
    /// under a [`crate::lock::StoreLock`] when aggregates may be open
    /// elsewhere. Returns the number of purged rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub fn purge_acknowledged_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let purged = self.conn.execute(
            "DELETE FROM pending_changes
             WHERE status = 'acknowledged' AND acked_at_us < ?1",
            params![cutoff.timestamp_micros()],
        )?;
        if purged > 0 {
            info!(purged, "swept acknowledged pending changes");
        }
        Ok(purged)
    }

    fn load_items(&self, id: &ListId) -> Result<Vec<ListItem>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, name, quantity, unit, comment, deliveries
             FROM list_items WHERE list_id = ?1
             ORDER BY position",
        )?;
        let rows = stmt.query_map(params![id.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut items = Vec::new();
        for row in rows {
            let (item_id, name, quantity, unit, comment, deliveries_raw) = row?;
            let deliveries: BTreeMap<Period, Delivery> = serde_json::from_str(&deliveries_raw)
                .map_err(|err| {
                    corrupt(format!("list_items.deliveries for '{item_id}': {err}"))
                })?;
            items.push(ListItem {
                id: ItemId::new(item_id),
                name,
                quantity,
                unit,
                comment,
                deliveries,
            });
        }
        Ok(items)
    }

    fn load_log(&self, id: &ListId) -> Result<Vec<ActivityEntry>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT entry_id, message, actor_role, actor_id, item_id, field,
                    old_value, new_value, recorded_at_us, status, acked_by, acked_at_us
             FROM activity_log WHERE list_id = ?1
             ORDER BY entry_id",
        )?;
        let rows = stmt.query_map(params![id.as_str()], row_to_log_row)?;

        let mut log = Vec::new();
        for row in rows {
            log.push(entry_from_row(row?)?);
        }
        Ok(log)
    }

    fn load_pending(
        &self,
        id: &ListId,
    ) -> Result<BTreeMap<PendingKey, PendingChange>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, field, old_value, new_value, changed_by,
                    changed_at_us, status, acked_by, acked_at_us
             FROM pending_changes WHERE list_id = ?1",
        )?;
        let rows = stmt.query_map(params![id.as_str()], row_to_pending_row)?;

        let mut pending = BTreeMap::new();
        for row in rows {
            let change = pending_from_row(row?)?;
            pending.insert(change.key(), change);
        }
        Ok(pending)
    }
}

// ---------------------------------------------------------------------------
// Write path
// ---------------------------------------------------------------------------

fn write_list(tx: &Transaction<'_>, list: &List) -> Result<u64, StoreError> {
    if list.customer_name().trim().is_empty() {
        return Err(BlankCustomerName.into());
    }

    let expected = list.version();
    let saved_version = if expected == 0 {
        let inserted = tx.execute(
            "INSERT INTO lists
                 (list_id, customer_id, customer_name, list_number, version, created_at_us)
             VALUES (?1, ?2, ?3, ?4, 1, ?5)",
            params![
                list.id().as_str(),
                list.customer_id(),
                list.customer_name(),
                list.number().map(ListNumber::as_str),
                list.created_at().timestamp_micros(),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_primary_key_conflict(&err) => {
                warn!(list = %list.id(), "create raced an existing row");
                return Err(StoreError::VersionConflict {
                    list_id: list.id().clone(),
                    expected,
                });
            }
            Err(err) => return Err(err.into()),
        }
        1
    } else {
        let updated = tx.execute(
            "UPDATE lists SET customer_name = ?2, list_number = ?3, version = ?4
             WHERE list_id = ?1 AND version = ?5",
            params![
                list.id().as_str(),
                list.customer_name(),
                list.number().map(ListNumber::as_str),
                signed(expected + 1, "lists.version")?,
                signed(expected, "lists.version")?,
            ],
        )?;
        if updated == 0 {
            warn!(list = %list.id(), expected, "optimistic version check failed");
            return Err(StoreError::VersionConflict {
                list_id: list.id().clone(),
                expected,
            });
        }
        expected + 1
    };

    write_items(tx, list)?;
    write_pending(tx, list)?;
    write_log(tx, list)?;
    Ok(saved_version)
}

fn write_items(tx: &Transaction<'_>, list: &List) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM list_items WHERE list_id = ?1",
        params![list.id().as_str()],
    )?;

    let mut insert = tx.prepare(
        "INSERT INTO list_items
             (list_id, item_id, position, name, quantity, unit, comment, deliveries)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let mut position = 0_i64;
    for item in list.items() {
        insert.execute(params![
            list.id().as_str(),
            item.id.as_str(),
            position,
            item.name,
            item.quantity,
            item.unit,
            item.comment,
            serde_json::to_string(&item.deliveries)?,
        ])?;
        position += 1;
    }
    Ok(())
}

fn write_pending(tx: &Transaction<'_>, list: &List) -> Result<(), StoreError> {
    tx.execute(
        "DELETE FROM pending_changes WHERE list_id = ?1",
        params![list.id().as_str()],
    )?;

    let mut insert = tx.prepare(
        "INSERT INTO pending_changes
             (list_id, item_id, field, old_value, new_value,
              changed_by, changed_at_us, status, acked_by, acked_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )?;
    for change in list.pending_map().values() {
        let ack = change.ack.as_ref();
        insert.execute(params![
            list.id().as_str(),
            change.item_id.as_str(),
            change.field.to_string(),
            change.old_value.to_string(),
            change.new_value.to_string(),
            change.changed_by,
            change.changed_at.timestamp_micros(),
            change.status.as_str(),
            ack.map(|a| a.by.as_str()),
            ack.map(|a| a.at.timestamp_micros()),
        ])?;
    }
    Ok(())
}

fn write_log(tx: &Transaction<'_>, list: &List) -> Result<(), StoreError> {
    let mut upsert = tx.prepare(
        "INSERT INTO activity_log
             (list_id, entry_id, message, actor_role, actor_id, item_id, field,
              old_value, new_value, recorded_at_us, status, acked_by, acked_at_us)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT(list_id, entry_id) DO UPDATE SET
             status = excluded.status,
             acked_by = excluded.acked_by,
             acked_at_us = excluded.acked_at_us",
    )?;
    for entry in list.log_entries() {
        let ack = entry.ack.as_ref();
        upsert.execute(params![
            list.id().as_str(),
            signed(entry.id.get(), "activity_log.entry_id")?,
            entry.message,
            entry.actor_role.as_str(),
            entry.actor_id,
            entry.item_id.as_ref().map(ItemId::as_str),
            entry.field.as_ref().map(ToString::to_string),
            entry.old_value.as_ref().map(ToString::to_string),
            entry.new_value.as_ref().map(ToString::to_string),
            entry.recorded_at.timestamp_micros(),
            entry.status.as_str(),
            ack.map(|a| a.by.as_str()),
            ack.map(|a| a.at.timestamp_micros()),
        ])?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct LogRow {
    entry_id: i64,
    message: String,
    actor_role: String,
    actor_id: String,
    item_id: Option<String>,
    field: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    recorded_at_us: i64,
    status: String,
    acked_by: Option<String>,
    acked_at_us: Option<i64>,
}

fn row_to_log_row(row: &Row<'_>) -> rusqlite::Result<LogRow> {
    Ok(LogRow {
        entry_id: row.get(0)?,
        message: row.get(1)?,
        actor_role: row.get(2)?,
        actor_id: row.get(3)?,
        item_id: row.get(4)?,
        field: row.get(5)?,
        old_value: row.get(6)?,
        new_value: row.get(7)?,
        recorded_at_us: row.get(8)?,
        status: row.get(9)?,
        acked_by: row.get(10)?,
        acked_at_us: row.get(11)?,
    })
}

fn entry_from_row(row: LogRow) -> Result<ActivityEntry, StoreError> {
    let entry_id = u64::try_from(row.entry_id)
        .map_err(|_| corrupt(format!("activity_log.entry_id is negative: {}", row.entry_id)))?;
    Ok(ActivityEntry {
        id: EntryId::new(entry_id),
        message: row.message,
        actor_role: parse_stored(&row.actor_role, "activity_log.actor_role")?,
        actor_id: row.actor_id,
        item_id: row.item_id.map(ItemId::new),
        field: row
            .field
            .as_deref()
            .map(|raw| parse_stored::<TrackedField>(raw, "activity_log.field"))
            .transpose()?,
        old_value: row
            .old_value
            .as_deref()
            .map(|raw| parse_json(raw, "activity_log.old_value"))
            .transpose()?,
        new_value: row
            .new_value
            .as_deref()
            .map(|raw| parse_json(raw, "activity_log.new_value"))
            .transpose()?,
        recorded_at: from_micros(row.recorded_at_us, "activity_log.recorded_at_us")?,
        status: parse_stored(&row.status, "activity_log.status")?,
        ack: ack_stamp(row.acked_by, row.acked_at_us, "activity_log")?,
    })
}

struct PendingRow {
    item_id: String,
    field: String,
    old_value: String,
    new_value: String,
    changed_by: String,
    changed_at_us: i64,
    status: String,
    acked_by: Option<String>,
    acked_at_us: Option<i64>,
}

fn row_to_pending_row(row: &Row<'_>) -> rusqlite::Result<PendingRow> {
    Ok(PendingRow {
        item_id: row.get(0)?,
        field: row.get(1)?,
        old_value: row.get(2)?,
        new_value: row.get(3)?,
        changed_by: row.get(4)?,
        changed_at_us: row.get(5)?,
        status: row.get(6)?,
        acked_by: row.get(7)?,
        acked_at_us: row.get(8)?,
    })
}

fn pending_from_row(row: PendingRow) -> Result<PendingChange, StoreError> {
    Ok(PendingChange {
        item_id: ItemId::new(row.item_id),
        field: parse_stored(&row.field, "pending_changes.field")?,
        old_value: parse_json(&row.old_value, "pending_changes.old_value")?,
        new_value: parse_json(&row.new_value, "pending_changes.new_value")?,
        changed_by: row.changed_by,
        changed_at: from_micros(row.changed_at_us, "pending_changes.changed_at_us")?,
        status: parse_stored(&row.status, "pending_changes.status")?,
        ack: ack_stamp(row.acked_by, row.acked_at_us, "pending_changes")?,
    })
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn parse_stored<T>(raw: &str, column: &str) -> Result<T, StoreError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|err| corrupt(format!("{column}: {err}")))
}

fn parse_json(raw: &str, column: &str) -> Result<Value, StoreError> {
    serde_json::from_str(raw).map_err(|err| corrupt(format!("{column} is not valid JSON: {err}")))
}

fn from_micros(us: i64, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(us)
        .ok_or_else(|| corrupt(format!("{column} out of range: {us}")))
}

fn ack_stamp(
    by: Option<String>,
    at_us: Option<i64>,
    table: &str,
) -> Result<Option<AckStamp>, StoreError> {
    match (by, at_us) {
        (Some(by), Some(at_us)) => Ok(Some(AckStamp::new(
            by,
            from_micros(at_us, "acked_at_us")?,
        ))),
        (None, None) => Ok(None),
        _ => Err(corrupt(format!(
            "{table} carries a half-written acknowledgment stamp"
        ))),
    }
}

fn signed(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| corrupt(format!("{what} exceeds the storage range")))
}

/// Only a duplicate `list_id` means another writer created the row first;
/// any other failure (CHECK constraints included) is a storage error, not a
/// version conflict.
fn is_primary_key_conflict(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
