//! Report domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::{DAILY_WINDOW_DAYS, MONTHLY_WINDOW_MONTHS, WEEKLY_WINDOW_WEEKS};
use crate::expenses::Expense;

/// Granularity of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl ReportPeriod {
    pub const ALL: [ReportPeriod; 4] = [
        ReportPeriod::Daily,
        ReportPeriod::Weekly,
        ReportPeriod::Monthly,
        ReportPeriod::Yearly,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ReportPeriod::Daily => "Daily",
            ReportPeriod::Weekly => "Weekly",
            ReportPeriod::Monthly => "Monthly",
            ReportPeriod::Yearly => "Yearly",
        }
    }
}

/// One bucket of a period report: the label of the bucket plus the sum and
/// count of the expenses that fall into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub period: ReportPeriod,
    /// `YYYY-MM-DD`, `YYYY-Www`, `YYYY-MM` or `YYYY` depending on `period`.
    pub label: String,
    pub total_amount: Decimal,
    pub expense_count: u32,
}

/// Aggregate statistics for the selected granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub total_amount: Decimal,
    pub total_expenses: u32,
    pub average_per_period: Decimal,
    pub period_count: u32,
    pub period_name: String,
}

/// All four summary lists, loaded best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummaries {
    pub daily: Vec<PeriodSummary>,
    pub weekly: Vec<PeriodSummary>,
    pub monthly: Vec<PeriodSummary>,
    pub yearly: Vec<PeriodSummary>,
    /// Granularities whose query failed and were degraded to an empty list.
    pub failed: Vec<ReportPeriod>,
}

impl ReportSummaries {
    pub fn for_period(&self, period: ReportPeriod) -> &[PeriodSummary] {
        match period {
            ReportPeriod::Daily => &self.daily,
            ReportPeriod::Weekly => &self.weekly,
            ReportPeriod::Monthly => &self.monthly,
            ReportPeriod::Yearly => &self.yearly,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Statistics for the current instance of a granularity together with the
/// expenses that make up its exact total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SelectedPeriodReport {
    pub stats: PeriodStats,
    pub expenses: Vec<Expense>,
}

/// Trailing windows used by the bucketed summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportWindows {
    pub daily_days: i64,
    pub weekly_weeks: i64,
    pub monthly_months: u32,
}

impl Default for ReportWindows {
    fn default() -> Self {
        Self {
            daily_days: DAILY_WINDOW_DAYS,
            weekly_weeks: WEEKLY_WINDOW_WEEKS,
            monthly_months: MONTHLY_WINDOW_MONTHS,
        }
    }
}
