//! Add/edit form state with per-field validation.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::MAX_EXPENSE_AMOUNT;
use crate::errors::{Error, Result, ValidationError};
use crate::expenses::{Expense, NewExpense};

pub const DESCRIPTION_EMPTY_MESSAGE: &str = "Description cannot be empty";
pub const AMOUNT_EMPTY_MESSAGE: &str = "Amount cannot be empty";
pub const AMOUNT_NOT_A_NUMBER_MESSAGE: &str = "Enter a valid number";
pub const AMOUNT_NOT_POSITIVE_MESSAGE: &str = "Amount must be greater than 0";
pub const AMOUNT_TOO_LARGE_MESSAGE: &str = "Amount is too large";

/// Optional sign, digits with at most one decimal point, optional exponent.
fn is_decimal_literal(text: &str) -> bool {
    let signs = &['+', '-'][..];
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

    let unsigned = text.strip_prefix(signs).unwrap_or(text);
    let (mantissa, exponent) = match unsigned.split_once(&['e', 'E'][..]) {
        Some((mantissa, exponent)) => (mantissa, Some(exponent)),
        None => (unsigned, None),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let mantissa_ok = !(whole.is_empty() && fraction.is_empty())
        && all_digits(whole)
        && all_digits(fraction);
    let exponent_ok = exponent.map_or(true, |exponent| {
        let digits = exponent.strip_prefix(signs).unwrap_or(exponent);
        !digits.is_empty() && all_digits(digits)
    });
    mantissa_ok && exponent_ok
}

/// Parses user-entered amount text.
///
/// Accepts plain decimals (`12.50`) and scientific notation (`1.5e2`);
/// surrounding whitespace is ignored. Digit separators such as `1_000` are
/// rejected. The error carries the message shown
/// next to the field.
pub fn parse_amount(raw: &str) -> std::result::Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(AMOUNT_EMPTY_MESSAGE.to_string()));
    }
    let not_a_number = || ValidationError::DecimalParse(AMOUNT_NOT_A_NUMBER_MESSAGE.to_string());
    if !is_decimal_literal(trimmed) {
        return Err(not_a_number());
    }
    let amount = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| not_a_number())?;
    if amount <= Decimal::ZERO {
        return Err(ValidationError::InvalidInput(
            AMOUNT_NOT_POSITIVE_MESSAGE.to_string(),
        ));
    }
    if amount > Decimal::from(MAX_EXPENSE_AMOUNT) {
        return Err(ValidationError::InvalidInput(
            AMOUNT_TOO_LARGE_MESSAGE.to_string(),
        ));
    }
    Ok(amount)
}

fn validation_message(err: &ValidationError) -> String {
    match err {
        ValidationError::InvalidInput(msg)
        | ValidationError::MissingField(msg)
        | ValidationError::DecimalParse(msg) => msg.clone(),
    }
}

/// Editable form for a single expense.
///
/// Fields are validated as they are typed; an error message is `Some` while
/// the field is invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseForm {
    pub description: String,
    pub amount: String,
    pub description_error: Option<String>,
    pub amount_error: Option<String>,
}

impl ExpenseForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefills the form from an existing expense.
    pub fn from_expense(expense: &Expense) -> Self {
        let mut form = Self::new();
        form.update_description(expense.description.clone());
        form.update_amount(expense.amount.normalize().to_string());
        form
    }

    pub fn update_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.description_error = if self.description.trim().is_empty() {
            Some(DESCRIPTION_EMPTY_MESSAGE.to_string())
        } else {
            None
        };
    }

    pub fn update_amount(&mut self, amount: impl Into<String>) {
        self.amount = amount.into();
        self.amount_error = parse_amount(&self.amount)
            .err()
            .map(|e| validation_message(&e));
    }

    pub fn is_description_error(&self) -> bool {
        self.description_error.is_some()
    }

    pub fn is_amount_error(&self) -> bool {
        self.amount_error.is_some()
    }

    /// Amount as a decimal if the text is a valid positive number.
    pub fn parsed_amount(&self) -> Option<Decimal> {
        parse_amount(&self.amount).ok()
    }

    pub fn is_valid(&self) -> bool {
        !self.description.trim().is_empty()
            && self.parsed_amount().is_some()
            && !self.is_description_error()
            && !self.is_amount_error()
    }

    /// Builds the insert input with a trimmed description.
    pub fn to_new_expense(&self) -> Result<NewExpense> {
        let description = self.description.trim();
        if description.is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                DESCRIPTION_EMPTY_MESSAGE.to_string(),
            )));
        }
        let amount = parse_amount(&self.amount)?;
        Ok(NewExpense::new(description, amount))
    }

    /// Applies the form values to `expense`, keeping its id and creation time.
    pub fn apply_to(&self, expense: &Expense) -> Result<Expense> {
        let new_expense = self.to_new_expense()?;
        Ok(Expense {
            description: new_expense.description,
            amount: new_expense.amount,
            ..expense.clone()
        })
    }
}
