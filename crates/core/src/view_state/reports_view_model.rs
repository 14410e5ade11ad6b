use std::sync::Arc;

use log::{debug, error, warn};
use serde::Serialize;
use tokio::sync::watch;

use super::live::{spawn_refresh_loop, LiveUpdates};
use crate::constants::REPORTS_PARTIAL_FAILURE_MESSAGE;
use crate::events::ChangeFeed;
use crate::expenses::{Expense, ExpenseServiceTrait};
use crate::reports::{PeriodStats, PeriodSummary, ReportPeriod, ReportsServiceTrait};
use crate::utils::time_utils::{Clock, SystemClock};

/// Snapshot rendered by the reports screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportsUiState {
    pub selected_period: ReportPeriod,
    pub daily_summaries: Vec<PeriodSummary>,
    pub weekly_summaries: Vec<PeriodSummary>,
    pub monthly_summaries: Vec<PeriodSummary>,
    pub yearly_summaries: Vec<PeriodSummary>,
    pub is_loading: bool,
    pub error_message: Option<String>,
    pub period_stats: PeriodStats,
    pub selected_period_expenses: Vec<Expense>,
    pub editing_expense: Option<Expense>,
}

impl ReportsUiState {
    pub fn summaries_for(&self, period: ReportPeriod) -> &[PeriodSummary] {
        match period {
            ReportPeriod::Daily => &self.daily_summaries,
            ReportPeriod::Weekly => &self.weekly_summaries,
            ReportPeriod::Monthly => &self.monthly_summaries,
            ReportPeriod::Yearly => &self.yearly_summaries,
        }
    }
}

/// Holds the four summary lists and the statistics of the selected period.
pub struct ReportsViewModel {
    reports: Arc<dyn ReportsServiceTrait>,
    expenses: Arc<dyn ExpenseServiceTrait>,
    clock: Arc<dyn Clock>,
    state: watch::Sender<ReportsUiState>,
}

impl ReportsViewModel {
    pub fn new(
        reports: Arc<dyn ReportsServiceTrait>,
        expenses: Arc<dyn ExpenseServiceTrait>,
    ) -> Self {
        let (state, _) = watch::channel(ReportsUiState::default());
        Self {
            reports,
            expenses,
            clock: Arc::new(SystemClock),
            state,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> ReportsUiState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ReportsUiState> {
        self.state.subscribe()
    }

    /// Reloads every summary list, then recomputes the selected period.
    /// Any earlier error message is replaced by the outcome of this load.
    pub fn refresh(&self) {
        self.state.send_modify(|s| s.is_loading = true);
        let summaries = self.reports.load_all_summaries(self.clock.now());
        let has_failures = summaries.has_failures();
        self.state.send_modify(|s| {
            s.daily_summaries = summaries.daily;
            s.weekly_summaries = summaries.weekly;
            s.monthly_summaries = summaries.monthly;
            s.yearly_summaries = summaries.yearly;
            s.error_message = None;
        });
        self.recompute_stats();
        self.state.send_modify(|s| {
            if has_failures {
                s.error_message = Some(REPORTS_PARTIAL_FAILURE_MESSAGE.to_string());
            }
            s.is_loading = false;
        });
    }

    pub fn spawn_live_updates(self: &Arc<Self>, feed: &ChangeFeed) -> LiveUpdates {
        let view_model = Arc::clone(self);
        spawn_refresh_loop("reports", feed, move || view_model.refresh())
    }

    pub fn select_period(&self, period: ReportPeriod) {
        self.state.send_modify(|s| s.selected_period = period);
        self.recompute_stats();
    }

    pub async fn delete_expense(&self, expense: &Expense) -> bool {
        match self.expenses.delete_expense(expense).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to delete expense {}: {}", expense.id, e);
                self.fail(format!("Failed to delete expense: {}", e));
                false
            }
        }
    }

    pub async fn update_expense(&self, expense: Expense) -> bool {
        match self.expenses.update_expense(expense).await {
            Ok(_) => {
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

    pub fn show_edit_expense_dialog(&self, expense: Expense) {
        self.state.send_modify(|s| s.editing_expense = Some(expense));
    }

    pub fn hide_edit_expense_dialog(&self) {
        self.state.send_modify(|s| s.editing_expense = None);
    }

    pub fn clear_error_message(&self) {
        self.state.send_modify(|s| s.error_message = None);
    }

    fn recompute_stats(&self) {
        let (period, stats) = {
            let state = self.state.borrow();
            let period = state.selected_period;
            let stats = self
                .reports
                .get_period_stats(period, state.summaries_for(period));
            (period, stats)
        };
        let stats = match stats {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Failed to compute {} stats: {}", period.display_name(), e);
                self.state.send_modify(|s| {
                    if s.selected_period == period {
                        s.period_stats = PeriodStats {
                            period_name: period.display_name().to_string(),
                            ..PeriodStats::default()
                        };
                        s.selected_period_expenses = Vec::new();
                    }
                    s.error_message = Some(format!("Failed to compute statistics: {}", e));
                });
                return;
            }
        };
        debug!(
            "{} stats over {} buckets: total {}",
            period.display_name(),
            stats.period_count,
            stats.total_amount
        );
        self.state.send_modify(|s| s.period_stats = stats.clone());

        match self
            .reports
            .get_current_period_report(period, stats, self.clock.now())
        {
            Ok(report) => self.state.send_modify(|s| {
                // A newer selection owns the stats now.
                if s.selected_period == period {
                    s.period_stats = report.stats;
                    s.selected_period_expenses = report.expenses;
                }
            }),
            Err(e) => {
                warn!(
                    "Failed to load current {} expenses: {}",
                    period.display_name(),
                    e
                );
                self.state.send_modify(|s| {
                    if s.selected_period == period {
                        s.selected_period_expenses = Vec::new();
                    }
                    s.error_message = Some(format!("Failed to load expenses: {}", e));
                });
            }
        }
    }

    fn fail(&self, message: String) {
        self.state.send_modify(|s| {
            s.is_loading = false;
            s.error_message = Some(message);
        });
    }
}
