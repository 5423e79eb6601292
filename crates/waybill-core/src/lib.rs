//! waybill-core library.
//!
//! Shared customer order lists with tracked changes: every effective edit of
//! a business field is diffed and logged, customer edits raise pending
//! markers for the admin console, and the acknowledgment workflow resolves
//! them one way (`pending -> acknowledged`).
//!
//! # Layout
//!
//! - [`model`] — the [`model::List`] aggregate and its value types
//! - [`track`] — activity log entries and pending-change records
//! - [`store`] — SQLite persistence with optimistic versioning
//! - [`lock`] — advisory file locks around load-mutate-save spans
//! - [`config`] — TOML configuration with serde defaults
//! - [`error`] — the stable `E####` error-code taxonomy
//!
//! # Conventions
//!
//! - **Errors**: typed module errors (`ListError`, `StoreError`, `LockError`)
//!   that map into [`error::ErrorCode`]; `anyhow::Result` at setup seams.
//! - **Logging**: `tracing` macros; the library never installs a subscriber.

pub mod config;
pub mod error;
pub mod lock;
pub mod model;
pub mod store;
pub mod track;

pub use config::{TrackingConfig, load_config};
pub use error::ErrorCode;
pub use lock::{ListLock, LockError, StoreLock};
pub use model::{
    AckOutcome, Actor, ActorRole, Delivery, DeliveryPatch, DeliveryStatus, EntryId, FieldDelta,
    ItemField, ItemId, List, ListError, ListId, ListItem, ListNumber, Period, TrackedField,
    UpdateOutcome,
};
pub use store::{Store, StoreError};
pub use track::{AckStamp, ActivityEntry, ChangeStatus, PendingChange, PendingKey};
