use chrono::{DateTime, Local};

use super::reports_model::{
    PeriodStats, PeriodSummary, ReportPeriod, ReportSummaries, SelectedPeriodReport,
};
use crate::errors::Result;

/// Trait defining the contract for the reports service
pub trait ReportsServiceTrait: Send + Sync {
    /// Bucketed summary of one granularity over its trailing window, newest bucket first.
    fn get_summary(&self, period: ReportPeriod, now: DateTime<Local>) -> Result<Vec<PeriodSummary>>;

    /// Loads every granularity independently. A failing granularity is
    /// degraded to an empty list and recorded in `failed`.
    fn load_all_summaries(&self, now: DateTime<Local>) -> ReportSummaries;

    /// Statistics over the buckets of one granularity.
    /// Fails if the combined total leaves the decimal range.
    fn get_period_stats(
        &self,
        period: ReportPeriod,
        summaries: &[PeriodSummary],
    ) -> Result<PeriodStats>;

    /// Overwrites total and count of `stats` with the exact figures of the
    /// current day, week, month or year, and returns the expenses behind them.
    fn get_current_period_report(
        &self,
        period: ReportPeriod,
        stats: PeriodStats,
        now: DateTime<Local>,
    ) -> Result<SelectedPeriodReport>;
}
