//! Per-customer list numbering sequence.

use rusqlite::{TransactionBehavior, params};
use tracing::debug;

use super::{Store, StoreError, corrupt};
use crate::model::number::ListNumber;

impl Store {
    /// Draw the next number for a customer and compose it with the name
    /// prefix, e.g. `MERT-3`.
    ///
    /// The sequence lives in its own row per customer and is bumped inside
    /// an immediate transaction, so concurrent creations for the same
    /// customer never observe the same value. The first call for a customer
    /// yields sequence 1.
    ///
    /// # Errors
    ///
    /// [`StoreError::BlankCustomerName`] when the trimmed display name is
    /// empty; otherwise an error if the sequence update fails.
    pub fn next_list_number(
        &mut self,
        customer_id: &str,
        customer_name: &str,
        prefix_len: usize,
    ) -> Result<ListNumber, StoreError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO list_number_seq (customer_id, next_seq) VALUES (?1, 2)
             ON CONFLICT(customer_id) DO UPDATE SET next_seq = next_seq + 1",
            params![customer_id],
        )?;
        let seq: i64 = tx.query_row(
            "SELECT next_seq - 1 FROM list_number_seq WHERE customer_id = ?1",
            params![customer_id],
            |row| row.get(0),
        )?;
        let seq = u64::try_from(seq)
            .map_err(|_| corrupt(format!("list_number_seq for '{customer_id}' is negative")))?;
        // compose before commit: a rejected name rolls the bump back
        let number = ListNumber::compose(customer_name, seq, prefix_len)?;
        tx.commit()?;

        debug!(customer = customer_id, %number, "drew list number");
        Ok(number)
    }
}
