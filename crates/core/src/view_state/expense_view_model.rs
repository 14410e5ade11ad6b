use std::sync::Arc;

use log::{debug, error};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::watch;

use super::expense_form::ExpenseForm;
use super::live::{spawn_refresh_loop, LiveUpdates};
use crate::events::ChangeFeed;
use crate::expenses::{Expense, ExpenseServiceTrait};
use crate::utils::time_utils::{Clock, SystemClock};

/// Snapshot rendered by the "today" screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseUiState {
    pub expenses: Vec<Expense>,
    pub total_amount: Decimal,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub is_add_expense_dialog_visible: bool,
    pub editing_expense: Option<Expense>,
}

/// Holds today's expenses, the add/edit form and dialog visibility.
///
/// Store failures never propagate out of the view model; they are logged
/// and surfaced through `error_message` while the previous data is kept.
pub struct ExpenseViewModel {
    service: Arc<dyn ExpenseServiceTrait>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<ExpenseUiState>,
    form: watch::Sender<ExpenseForm>,
}

impl ExpenseViewModel {
    pub fn new(service: Arc<dyn ExpenseServiceTrait>) -> Self {
        let (state, _) = watch::channel(ExpenseUiState::default());
        let (form, _) = watch::channel(ExpenseForm::default());
        Self {
            service,
            clock: Arc::new(SystemClock),
            state,
            form,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Latest state snapshot.
    pub fn state(&self) -> ExpenseUiState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ExpenseUiState> {
        self.state.subscribe()
    }

    /// Latest form snapshot.
    pub fn form(&self) -> ExpenseForm {
        self.form.borrow().clone()
    }

    pub fn subscribe_form(&self) -> watch::Receiver<ExpenseForm> {
        self.form.subscribe()
    }

    /// Reloads today's expenses and total. A successful load dismisses any
    /// pending error message.
    pub fn refresh(&self) {
        self.state.send_modify(|s| s.is_loading = true);
        match self.service.get_today_expenses(self.clock.now()) {
            Ok(today) => {
                debug!(
                    "Loaded {} expenses for today, total {}",
                    today.expenses.len(),
                    today.total_amount
                );
                self.state.send_modify(|s| {
                    s.expenses = today.expenses;
                    s.total_amount = today.total_amount;
                    s.error_message = None;
                    s.is_loading = false;
                });
            }
            Err(e) => {
                error!("Failed to load today's expenses: {}", e);
                self.fail(format!("Failed to load expenses: {}", e));
            }
        }
    }

    /// Loads now and reloads after every committed change until the returned
    /// handle is dropped.
    pub fn spawn_live_updates(self: &Arc<Self>, feed: &ChangeFeed) -> LiveUpdates {
        let view_model = Arc::clone(self);
        spawn_refresh_loop("expenses", feed, move || view_model.refresh())
    }

    pub fn show_add_expense_dialog(&self) {
        self.state
            .send_modify(|s| s.is_add_expense_dialog_visible = true);
        self.form.send_replace(ExpenseForm::new());
    }

    pub fn hide_add_expense_dialog(&self) {
        self.state
            .send_modify(|s| s.is_add_expense_dialog_visible = false);
        self.form.send_replace(ExpenseForm::new());
    }

    pub fn update_description(&self, description: impl Into<String>) {
        let description = description.into();
        self.form.send_modify(|f| f.update_description(description));
    }

    pub fn update_amount(&self, amount: impl Into<String>) {
        let amount = amount.into();
        self.form.send_modify(|f| f.update_amount(amount));
    }

    /// Submits the form. Does nothing and returns false while the form is invalid.
    pub async fn add_expense(&self) -> bool {
        let form = self.form();
        if !form.is_valid() {
            return false;
        }
        let new_expense = match form.to_new_expense() {
            Ok(new_expense) => new_expense,
            Err(e) => {
                self.fail(format!("Failed to add expense: {}", e));
                return false;
            }
        };
        match self.service.create_expense(new_expense).await {
            Ok(expense) => {
                debug!("Added expense {}", expense.id);
                self.hide_add_expense_dialog();
                true
            }
            Err(e) => {
                error!("Failed to add expense: {}", e);
                self.fail(format!("Failed to add expense: {}", e));
                false
            }
        }
    }

    pub async fn update_expense(&self, expense: Expense) -> bool {
        match self.service.update_expense(expense).await {
            Ok(updated) => {
                debug!("Updated expense {}", updated.id);
                self.hide_edit_expense_dialog();
                true
            }
            Err(e) => {
                error!("Failed to update expense: {}", e);
                self.fail(format!("Failed to update expense: {}", e));
                false
            }
        }
    }

    /// Applies the form to the expense being edited and saves it.
    pub async fn save_edited_expense(&self) -> bool {
        let Some(editing) = self.state().editing_expense else {
            return false;
        };
        let form = self.form();
        if !form.is_valid() {
            return false;
        }
        match form.apply_to(&editing) {
            Ok(expense) => self.update_expense(expense).await,
            Err(e) => {
                self.fail(format!("Failed to update expense: {}", e));
                false
            }
        }
    }

    pub async fn delete_expense(&self, expense: &Expense) -> bool {
        match self.service.delete_expense(expense).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to delete expense {}: {}", expense.id, e);
                self.fail(format!("Failed to delete expense: {}", e));
                false
            }
        }
    }

    /// Opens the edit dialog with the form prefilled from `expense`.
    pub fn show_edit_expense_dialog(&self, expense: Expense) {
        self.form.send_replace(ExpenseForm::from_expense(&expense));
        self.state.send_modify(|s| s.editing_expense = Some(expense));
    }

    pub fn hide_edit_expense_dialog(&self) {
        self.state.send_modify(|s| s.editing_expense = None);
        self.form.send_replace(ExpenseForm::new());
    }

    pub fn clear_error_message(&self) {
        self.state.send_modify(|s| s.error_message = None);
    }

    fn fail(&self, message: String) {
        self.state.send_modify(|s| {
            s.is_loading = false;
            s.error_message = Some(message);
        });
    }
}
