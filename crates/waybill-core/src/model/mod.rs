//! Domain model: the list aggregate and its value types.
//!
//! [`list::List`] is the aggregate root; everything else here is the
//! vocabulary it speaks: actor roles, field identifiers, line items,
//! delivery records, and the one-time list number.

pub mod actor;
pub mod delivery;
pub mod field;
pub mod ids;
pub mod item;
pub mod list;
pub mod number;

pub use actor::{Actor, ActorRole, ParseRoleError};
pub use delivery::{Delivery, DeliveryPatch, DeliveryStatus, FieldDelta, ParseDeliveryStatusError};
pub use field::{InvalidPeriod, ItemField, ParseFieldError, Period, TrackedField};
pub use ids::{EntryId, ItemId, ListId};
pub use item::{InvalidValue, ListItem};
pub use list::{AckOutcome, List, ListError, UpdateOutcome};
pub use number::{BlankCustomerName, ListNumber};
