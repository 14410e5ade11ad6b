//! Expense domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_EXPENSE_AMOUNT;
use crate::{errors::ValidationError, Error, Result};

/// Domain model representing a recorded expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount: Decimal,
    /// Creation instant in epoch milliseconds.
    pub created_at: i64,
}

/// Input model for recording a new expense.
///
/// When `id` is set the insert replaces any existing row with that id.
/// When `created_at` is unset the store stamps the current time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewExpense {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub description: String,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl NewExpense {
    pub fn new(description: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: None,
            description: description.into(),
            amount,
            created_at: None,
        }
    }

    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Validates the new expense data.
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.description, self.amount)
    }
}

impl Expense {
    /// Validates the editable fields before an update is submitted.
    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.description, self.amount)
    }
}

fn validate_fields(description: &str, amount: Decimal) -> Result<()> {
    if description.trim().is_empty() {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Expense description cannot be empty".to_string(),
        )));
    }
    if amount <= Decimal::ZERO {
        return Err(Error::Validation(ValidationError::InvalidInput(
            "Expense amount must be greater than zero".to_string(),
        )));
    }
    if amount > Decimal::from(MAX_EXPENSE_AMOUNT) {
        return Err(Error::Validation(ValidationError::InvalidInput(format!(
            "Expense amount cannot exceed {}",
            MAX_EXPENSE_AMOUNT
        ))));
    }
    Ok(())
}

/// Adds up amounts, failing instead of overflowing the decimal range.
pub fn sum_amounts<I>(amounts: I) -> Result<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    amounts
        .into_iter()
        .try_fold(Decimal::ZERO, |total, amount| total.checked_add(amount))
        .ok_or_else(|| Error::AmountOverflow("sum of expense amounts overflowed".to_string()))
}

/// Expenses recorded on the current local day together with their sum.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TodayExpenses {
    pub expenses: Vec<Expense>,
    pub total_amount: Decimal,
}

/// Inclusive range of epoch-millisecond instants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: i64,
    pub end: i64,
}

impl DateRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: i64) -> bool {
        instant >= self.start && instant <= self.end
    }
}
