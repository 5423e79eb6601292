//! Property tests driving random edit/review/cleanup scripts against a
//! two-item list and checking the bookkeeping invariants that the scenario
//! tests in `workflow.rs` only probe pointwise.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use waybill_core::{AckOutcome, ItemId, List, ListId, ListItem, TrackedField};

use generators::*;

const ITEMS: [&str; 2] = ["a", "b"];

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
}

fn end_of(ops: &[Op]) -> DateTime<Utc> {
    start() + Duration::days(ops.len() as i64 + 1)
}

fn fixture() -> List {
    let mut list = List::new_at(ListId::new("l-prop"), "c-1", "Propwerk", start());
    list.add_item(ListItem::new(ItemId::new("a"), "Alpha crate", 5))
        .unwrap();
    let mut beta = ListItem::new(ItemId::new("b"), "Beta crate", 9);
    beta.unit = Some("kg".to_string());
    list.add_item(beta).unwrap();
    list
}

/// Replay a script, one day per step so retention windows mean something.
fn apply(list: &mut List, ops: &[Op]) {
    for (step, op) in ops.iter().enumerate() {
        let at = start() + Duration::days(step as i64 + 1);
        match op {
            Op::Field {
                item,
                field,
                value,
                actor,
            } => {
                list.update_field_at(&ItemId::new(ITEMS[*item]), *field, value, actor, at)
                    .unwrap();
            }
            Op::Delivery {
                item,
                period,
                patch,
                actor,
            } => {
                list.update_delivery_at(&ItemId::new(ITEMS[*item]), period, patch, actor, at)
                    .unwrap();
            }
            Op::Review { by } => {
                list.acknowledge_changes_at(by, None, at, Duration::days(7));
            }
            Op::Cleanup => {
                list.cleanup_acknowledged_at(at, Duration::days(7));
            }
        }
    }
}

proptest! {
    // Scripted runs are heavier than single-value checks; 1,000 cases keeps
    // the suite fast.
    #![proptest_config(proptest::test_runner::Config::with_cases(1000))]

    /// The storage layer round-trips field keys through their string form.
    #[test]
    fn tracked_field_keys_round_trip(field in arb_tracked_field()) {
        let parsed: TrackedField = field.to_string().parse().unwrap();
        prop_assert_eq!(parsed, field);
    }

    /// Admin-only scripts never leave anything for the weekly review: every
    /// entry is born acknowledged by its author and no slot ever opens.
    #[test]
    fn admin_only_scripts_leave_nothing_to_review(ops in arb_admin_edits()) {
        let mut list = fixture();
        apply(&mut list, &ops);

        prop_assert!(list.retained_field_changes().is_empty());
        prop_assert!(!list.has_pending_changes());
        prop_assert!(list.unacknowledged_customer_changes().is_empty());
        for entry in list.log_entries() {
            prop_assert!(entry.is_acknowledged());
            prop_assert_eq!(entry.ack.as_ref().map(|stamp| stamp.by.as_str()), Some("gert"));
        }
    }

    /// Whatever the script does, the collection holds at most one slot per
    /// `(item, field)` key.
    #[test]
    fn scripts_keep_at_most_one_slot_per_field(ops in arb_ops()) {
        let mut list = fixture();
        apply(&mut list, &ops);

        let slots = list.retained_field_changes();
        let keys: std::collections::BTreeSet<_> = slots
            .iter()
            .map(|slot| (slot.item_id.clone(), slot.field.clone()))
            .collect();
        prop_assert_eq!(keys.len(), slots.len());
    }

    /// Log ids are handed out densely in insertion order, saves are the only
    /// thing that bumps the version, and the rendered log is a permutation
    /// sorted newest-first.
    #[test]
    fn log_ids_stay_dense_and_insertion_ordered(ops in arb_ops()) {
        let mut list = fixture();
        apply(&mut list, &ops);

        prop_assert_eq!(list.version(), 0);

        let ids: Vec<u64> = list.log_entries().iter().map(|entry| entry.id.get()).collect();
        let expected: Vec<u64> = (1..=ids.len() as u64).collect();
        prop_assert_eq!(ids, expected);

        let rendered = list.activity_log();
        prop_assert_eq!(rendered.len(), list.log_entries().len());
        for pair in rendered.windows(2) {
            let newer = pair[0];
            let older = pair[1];
            prop_assert!(
                newer.recorded_at > older.recorded_at
                    || (newer.recorded_at == older.recorded_at && newer.id > older.id)
            );
        }
    }

    /// An unrestricted review flips exactly the entries and slots that were
    /// open beforehand and leaves nothing behind.
    #[test]
    fn full_review_resolves_every_open_marker(ops in arb_ops(), by in "[a-z]{3,8}") {
        let mut list = fixture();
        apply(&mut list, &ops);

        let open_logs = list.unacknowledged_customer_changes().len();
        let open_slots = list.pending_field_changes().len();

        let review = list.acknowledge_changes_at(&by, None, end_of(&ops), Duration::days(7));
        prop_assert_eq!(review.logs_acknowledged, open_logs);
        prop_assert_eq!(review.pending_acknowledged, open_slots);

        prop_assert!(!list.has_pending_changes());
        prop_assert!(list.unacknowledged_customer_changes().is_empty());
        for entry in list.log_entries() {
            prop_assert!(entry.is_acknowledged());
        }
    }

    /// Reviewing twice at the same instant reports zeros the second time and
    /// does not move the aggregate.
    #[test]
    fn repeat_review_reports_zeros(ops in arb_ops(), by in "[a-z]{3,8}") {
        let mut list = fixture();
        apply(&mut list, &ops);

        let now = end_of(&ops);
        list.acknowledge_changes_at(&by, None, now, Duration::days(7));
        let settled = list.clone();

        let repeat = list.acknowledge_changes_at(&by, None, now, Duration::days(7));
        prop_assert_eq!(repeat, AckOutcome::default());
        prop_assert_eq!(list, settled);
    }

    /// Retention cleanup only ever drops acknowledged slots; open markers and
    /// the activity log survive any cutoff.
    #[test]
    fn cleanup_never_drops_open_markers_or_log(ops in arb_ops()) {
        let mut list = fixture();
        apply(&mut list, &ops);

        let total = list.retained_field_changes().len();
        let open = list.pending_field_changes().len();
        let log_len = list.log_entries().len();

        let purged = list.cleanup_acknowledged_at(end_of(&ops) + Duration::days(30), Duration::days(7));
        prop_assert_eq!(purged, total - open);

        let remaining = list.retained_field_changes();
        prop_assert_eq!(remaining.len(), open);
        prop_assert!(remaining.iter().all(|slot| slot.is_pending()));
        prop_assert_eq!(list.log_entries().len(), log_len);
    }
}
