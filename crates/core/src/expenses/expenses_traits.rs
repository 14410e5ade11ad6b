//! Expense repository and service traits.
//!
//! These traits define the contract for expense operations without any
//! database-specific types, allowing for different storage implementations.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use rust_decimal::Decimal;

use super::expenses_model::{DateRange, Expense, NewExpense, TodayExpenses};
use crate::errors::Result;

/// Trait defining the contract for Expense repository operations.
///
/// Reads are served from the connection pool; writes are single-row
/// statements committed by the storage layer before the future resolves.
/// The repository stores whatever it is given, validation happens upstream.
#[async_trait]
pub trait ExpenseRepositoryTrait: Send + Sync {
    /// Lists every expense, newest first.
    fn list(&self) -> Result<Vec<Expense>>;

    /// Lists expenses created within the inclusive range, newest first.
    fn list_in_range(&self, range: DateRange) -> Result<Vec<Expense>>;

    /// Lists expenses created at or after `start`, newest first.
    fn list_since(&self, start: i64) -> Result<Vec<Expense>>;

    /// Retrieves an expense by its ID.
    fn get_by_id(&self, expense_id: i64) -> Result<Expense>;

    /// Sum of all amounts, zero when the table is empty.
    fn total_amount(&self) -> Result<Decimal>;

    /// Sum of amounts created within the inclusive range.
    fn total_amount_in_range(&self, range: DateRange) -> Result<Decimal>;

    /// Number of stored expenses.
    fn count(&self) -> Result<i64>;

    /// Inserts an expense, replacing any row that shares an explicit id.
    async fn insert(&self, new_expense: NewExpense) -> Result<Expense>;

    /// Updates description and amount of the expense with the same id.
    async fn update(&self, expense: Expense) -> Result<Expense>;

    /// Deletes an expense by its ID.
    ///
    /// Returns the number of deleted records.
    async fn delete(&self, expense_id: i64) -> Result<usize>;

    /// Deletes every expense. Returns the number of deleted records.
    async fn delete_all(&self) -> Result<usize>;
}

/// Trait defining the contract for Expense service operations.
#[async_trait]
pub trait ExpenseServiceTrait: Send + Sync {
    fn get_all_expenses(&self) -> Result<Vec<Expense>>;

    /// Expenses whose local calendar date equals the date of `now`.
    fn get_today_expenses(&self, now: DateTime<Local>) -> Result<TodayExpenses>;

    fn get_expenses_in_range(&self, range: DateRange) -> Result<Vec<Expense>>;

    fn get_total_amount(&self) -> Result<Decimal>;

    fn get_total_amount_in_range(&self, range: DateRange) -> Result<Decimal>;

    fn count_expenses(&self) -> Result<i64>;

    /// Records a new expense stamped with the current time.
    async fn add_expense(&self, description: &str, amount: Decimal) -> Result<Expense>;

    /// Inserts a fully specified expense.
    async fn create_expense(&self, new_expense: NewExpense) -> Result<Expense>;

    async fn update_expense(&self, expense: Expense) -> Result<Expense>;

    /// Deletes the record matching the identity of `expense`.
    async fn delete_expense(&self, expense: &Expense) -> Result<usize>;

    async fn delete_expense_by_id(&self, expense_id: i64) -> Result<usize>;

    async fn delete_all_expenses(&self) -> Result<usize>;
}
