//! Domain event types.

use serde::{Deserialize, Serialize};

/// Kind of mutation that produced an [`DomainEvent::ExpensesChanged`] event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseChangeKind {
    Inserted,
    Updated,
    Deleted,
    Cleared,
}

/// Domain events emitted by core services after successful commits.
///
/// Subscribers treat any event as "the expenses table changed" and re-run
/// their queries; the payload only narrows what changed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Expenses were inserted, updated, or deleted.
    ExpensesChanged {
        kind: ExpenseChangeKind,
        /// Affected ids. Empty for bulk deletes.
        expense_ids: Vec<i64>,
    },
}

impl DomainEvent {
    /// Creates an ExpensesChanged event.
    pub fn expenses_changed(kind: ExpenseChangeKind, expense_ids: Vec<i64>) -> Self {
        Self::ExpensesChanged { kind, expense_ids }
    }
}
