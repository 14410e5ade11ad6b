//! Database models for expenses.

use diesel::prelude::*;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use spendbook_core::expenses::{Expense, NewExpense};
use spendbook_core::utils::time_utils::now_millis;

/// Parses a stored amount, accepting scientific notation written by older
/// versions. Unreadable values fall back to zero.
pub(crate) fn parse_amount_tolerant(value_str: &str, expense_id: i64) -> Decimal {
    if let Ok(d) = Decimal::from_str(value_str) {
        return d;
    }
    if let Ok(d) = Decimal::from_scientific(value_str) {
        return d;
    }
    match f64::from_str(value_str).ok().and_then(Decimal::from_f64) {
        Some(d) => d,
        None => {
            log::error!(
                "Failed to parse amount '{}' of expense {}. Falling back to ZERO.",
                value_str,
                expense_id
            );
            Decimal::ZERO
        }
    }
}

/// Database model for expenses
#[derive(
    Queryable,
    Identifiable,
    AsChangeset,
    Selectable,
    PartialEq,
    Serialize,
    Deserialize,
    Debug,
    Clone,
)]
#[diesel(table_name = crate::schema::expenses)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct ExpenseDB {
    pub id: i64,
    pub description: String,
    pub amount: String,
    pub created_at: i64,
}

/// Database model for inserting an expense
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::expenses)]
#[serde(rename_all = "camelCase")]
pub struct NewExpenseDB {
    pub id: Option<i64>,
    pub description: String,
    pub amount: String,
    pub created_at: i64,
}

// Conversion to domain models
impl From<ExpenseDB> for Expense {
    fn from(db: ExpenseDB) -> Self {
        Self {
            amount: parse_amount_tolerant(&db.amount, db.id),
            id: db.id,
            description: db.description,
            created_at: db.created_at,
        }
    }
}

impl From<NewExpense> for NewExpenseDB {
    fn from(domain: NewExpense) -> Self {
        Self {
            id: domain.id,
            description: domain.description,
            amount: domain.amount.to_string(),
            created_at: domain.created_at.unwrap_or_else(now_millis),
        }
    }
}

impl From<Expense> for ExpenseDB {
    fn from(domain: Expense) -> Self {
        Self {
            id: domain.id,
            description: domain.description,
            amount: domain.amount.to_string(),
            created_at: domain.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount_tolerant() {
        assert_eq!(parse_amount_tolerant("12.50", 1), dec!(12.50));
        assert_eq!(parse_amount_tolerant("1.5e2", 1), dec!(150));
        assert_eq!(parse_amount_tolerant("garbage", 1), Decimal::ZERO);
    }

    #[test]
    fn test_new_expense_defaults_created_at_to_now() {
        let before = now_millis();
        let db: NewExpenseDB = NewExpense::new("Coffee", dec!(3.20)).into();
        assert!(db.created_at >= before);
        assert_eq!(db.amount, "3.20");
        assert_eq!(db.id, None);
    }
}
