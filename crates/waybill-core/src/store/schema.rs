//! Canonical SQLite schema for the list store.
//!
//! The aggregate is decomposed into normalized rows for queryability:
//! - `lists` keeps the aggregate head plus the optimistic `version` column
//! - `list_items` holds line items in insertion order (`position`)
//! - `activity_log` is the append-only audit trail; existing rows may only
//!   change in their acknowledgment columns
//! - `pending_changes` enforces the one-slot-per-`(item, field)` rule with
//!   its primary key
//! - `list_number_seq` backs the per-customer list numbering sequence

/// Migration v1: core normalized tables.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS lists (
    list_id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL CHECK (length(trim(customer_id)) > 0),
    customer_name TEXT NOT NULL CHECK (length(trim(customer_name)) > 0),
    list_number TEXT,
    version INTEGER NOT NULL CHECK (version >= 1),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS list_items (
    list_id TEXT NOT NULL REFERENCES lists(list_id) ON DELETE CASCADE,
    item_id TEXT NOT NULL CHECK (length(trim(item_id)) > 0),
    position INTEGER NOT NULL CHECK (position >= 0),
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    unit TEXT,
    comment TEXT,
    deliveries TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (list_id, item_id)
);

CREATE TABLE IF NOT EXISTS activity_log (
    list_id TEXT NOT NULL REFERENCES lists(list_id) ON DELETE CASCADE,
    entry_id INTEGER NOT NULL CHECK (entry_id >= 1),
    message TEXT NOT NULL,
    actor_role TEXT NOT NULL CHECK (actor_role IN ('admin', 'customer')),
    actor_id TEXT NOT NULL,
    item_id TEXT,
    field TEXT,
    old_value TEXT,
    new_value TEXT,
    recorded_at_us INTEGER NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'acknowledged')),
    acked_by TEXT,
    acked_at_us INTEGER,
    PRIMARY KEY (list_id, entry_id),
    CHECK ((acked_by IS NULL) = (acked_at_us IS NULL))
);

CREATE TABLE IF NOT EXISTS pending_changes (
    list_id TEXT NOT NULL REFERENCES lists(list_id) ON DELETE CASCADE,
    item_id TEXT NOT NULL,
    field TEXT NOT NULL,
    old_value TEXT NOT NULL,
    new_value TEXT NOT NULL,
    changed_by TEXT NOT NULL,
    changed_at_us INTEGER NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'acknowledged')),
    acked_by TEXT,
    acked_at_us INTEGER,
    PRIMARY KEY (list_id, item_id, field),
    CHECK ((acked_by IS NULL) = (acked_at_us IS NULL))
);

CREATE TABLE IF NOT EXISTS list_number_seq (
    customer_id TEXT PRIMARY KEY,
    next_seq INTEGER NOT NULL CHECK (next_seq >= 2)
);
"#;

/// Migration v2: read-path indexes.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_activity_log_review
    ON activity_log(list_id, status, recorded_at_us DESC);

CREATE INDEX IF NOT EXISTS idx_pending_changes_status
    ON pending_changes(status, list_id);

CREATE INDEX IF NOT EXISTS idx_pending_changes_acked_at
    ON pending_changes(status, acked_at_us);
"#;

/// Indexes expected by the review/attention/retention query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_activity_log_review",
    "idx_pending_changes_status",
    "idx_pending_changes_acked_at",
];
