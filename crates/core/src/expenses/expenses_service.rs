use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use log::debug;
use rust_decimal::Decimal;

use super::expenses_model::{sum_amounts, DateRange, Expense, NewExpense, TodayExpenses};
use super::expenses_traits::{ExpenseRepositoryTrait, ExpenseServiceTrait};
use crate::errors::Result;
use crate::events::{DomainEvent, DomainEventSink, ExpenseChangeKind, NoOpDomainEventSink};
use crate::reports::{current_period_range, ReportPeriod};

/// Service for recording and querying expenses
#[derive(Clone)]
pub struct ExpenseService {
    repository: Arc<dyn ExpenseRepositoryTrait>,
    event_sink: Arc<dyn DomainEventSink>,
}

impl ExpenseService {
    pub fn new(repository: Arc<dyn ExpenseRepositoryTrait>) -> Self {
        Self {
            repository,
            event_sink: Arc::new(NoOpDomainEventSink),
        }
    }

    /// Sets the domain event sink for this service.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.event_sink = event_sink;
        self
    }

    fn notify(&self, kind: ExpenseChangeKind, expense_ids: Vec<i64>) {
        self.event_sink
            .emit(DomainEvent::expenses_changed(kind, expense_ids));
    }
}

#[async_trait]
impl ExpenseServiceTrait for ExpenseService {
    fn get_all_expenses(&self) -> Result<Vec<Expense>> {
        self.repository.list()
    }

    fn get_today_expenses(&self, now: DateTime<Local>) -> Result<TodayExpenses> {
        let range = current_period_range(ReportPeriod::Daily, &now);
        let expenses = self.repository.list_in_range(range)?;
        let total_amount = sum_amounts(expenses.iter().map(|e| e.amount))?;
        Ok(TodayExpenses {
            expenses,
            total_amount,
        })
    }

    fn get_expenses_in_range(&self, range: DateRange) -> Result<Vec<Expense>> {
        self.repository.list_in_range(range)
    }

    fn get_total_amount(&self) -> Result<Decimal> {
        self.repository.total_amount()
    }

    fn get_total_amount_in_range(&self, range: DateRange) -> Result<Decimal> {
        self.repository.total_amount_in_range(range)
    }

    fn count_expenses(&self) -> Result<i64> {
        self.repository.count()
    }

    async fn add_expense(&self, description: &str, amount: Decimal) -> Result<Expense> {
        self.create_expense(NewExpense::new(description, amount))
            .await
    }

    async fn create_expense(&self, new_expense: NewExpense) -> Result<Expense> {
        new_expense.validate()?;
        debug!("Recording expense '{}'", new_expense.description);
        let expense = self.repository.insert(new_expense).await?;
        self.notify(ExpenseChangeKind::Inserted, vec![expense.id]);
        Ok(expense)
    }

    async fn update_expense(&self, expense: Expense) -> Result<Expense> {
        expense.validate()?;
        let updated = self.repository.update(expense).await?;
        self.notify(ExpenseChangeKind::Updated, vec![updated.id]);
        Ok(updated)
    }

    async fn delete_expense(&self, expense: &Expense) -> Result<usize> {
        self.delete_expense_by_id(expense.id).await
    }

    async fn delete_expense_by_id(&self, expense_id: i64) -> Result<usize> {
        let deleted = self.repository.delete(expense_id).await?;
        if deleted > 0 {
            self.notify(ExpenseChangeKind::Deleted, vec![expense_id]);
        }
        Ok(deleted)
    }

    async fn delete_all_expenses(&self) -> Result<usize> {
        let deleted = self.repository.delete_all().await?;
        debug!("Cleared {} expenses", deleted);
        if deleted > 0 {
            self.notify(ExpenseChangeKind::Cleared, Vec::new());
        }
        Ok(deleted)
    }
}
