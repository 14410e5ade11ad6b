use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use log::{debug, warn};
use rust_decimal::Decimal;

use super::period::{bucket_label, bucket_start, current_period_range, local_date, window_start};
use super::reports_model::{
    PeriodStats, PeriodSummary, ReportPeriod, ReportSummaries, ReportWindows, SelectedPeriodReport,
};
use super::reports_traits::ReportsServiceTrait;
use crate::constants::DISPLAY_DECIMAL_PRECISION;
use crate::errors::{Error, Result};
use crate::expenses::{sum_amounts, Expense, ExpenseRepositoryTrait};

pub struct ReportsService {
    repository: Arc<dyn ExpenseRepositoryTrait>,
    windows: ReportWindows,
}

impl ReportsService {
    pub fn new(repository: Arc<dyn ExpenseRepositoryTrait>) -> Self {
        Self::with_windows(repository, ReportWindows::default())
    }

    pub fn with_windows(repository: Arc<dyn ExpenseRepositoryTrait>, windows: ReportWindows) -> Self {
        ReportsService {
            repository,
            windows,
        }
    }

    pub fn windows(&self) -> &ReportWindows {
        &self.windows
    }
}

impl ReportsServiceTrait for ReportsService {
    fn get_summary(&self, period: ReportPeriod, now: DateTime<Local>) -> Result<Vec<PeriodSummary>> {
        debug!("Computing {} summary", period.display_name());
        let expenses = match window_start(period, &now, &self.windows) {
            Some(start) => self.repository.list_since(start)?,
            None => self.repository.list()?,
        };
        summarize(period, &expenses, &Local)
    }

    fn load_all_summaries(&self, now: DateTime<Local>) -> ReportSummaries {
        let mut summaries = ReportSummaries::default();
        for period in ReportPeriod::ALL {
            let buckets = match self.get_summary(period, now) {
                Ok(buckets) => buckets,
                Err(e) => {
                    warn!(
                        "Failed to load {} summary, showing it empty: {}",
                        period.display_name(),
                        e
                    );
                    summaries.failed.push(period);
                    Vec::new()
                }
            };
            match period {
                ReportPeriod::Daily => summaries.daily = buckets,
                ReportPeriod::Weekly => summaries.weekly = buckets,
                ReportPeriod::Monthly => summaries.monthly = buckets,
                ReportPeriod::Yearly => summaries.yearly = buckets,
            }
        }
        summaries
    }

    fn get_period_stats(
        &self,
        period: ReportPeriod,
        summaries: &[PeriodSummary],
    ) -> Result<PeriodStats> {
        compute_period_stats(period, summaries)
    }

    fn get_current_period_report(
        &self,
        period: ReportPeriod,
        stats: PeriodStats,
        now: DateTime<Local>,
    ) -> Result<SelectedPeriodReport> {
        let range = current_period_range(period, &now);
        debug!(
            "Loading exact {} figures for range {}..={}",
            period.display_name(),
            range.start,
            range.end
        );
        let expenses = self.repository.list_in_range(range)?;
        let total_amount = sum_amounts(expenses.iter().map(|e| e.amount))?;

        // Average and bucket count intentionally stay on the historical window.
        let stats = PeriodStats {
            total_amount,
            total_expenses: expenses.len() as u32,
            ..stats
        };
        Ok(SelectedPeriodReport { stats, expenses })
    }
}

/// Groups expenses into buckets of `period` in the calendar of `tz`.
///
/// Buckets are ordered newest first. Expenses whose instant cannot be
/// represented in `tz` are skipped. Fails if a bucket total leaves the
/// decimal range.
pub fn summarize<Tz: TimeZone>(
    period: ReportPeriod,
    expenses: &[Expense],
    tz: &Tz,
) -> Result<Vec<PeriodSummary>> {
    let mut buckets: BTreeMap<NaiveDate, (Decimal, u32)> = BTreeMap::new();
    for expense in expenses {
        let Some(date) = local_date(expense.created_at, tz) else {
            warn!(
                "Skipping expense {} with out-of-range timestamp {}",
                expense.id, expense.created_at
            );
            continue;
        };
        let bucket = buckets
            .entry(bucket_start(period, date))
            .or_insert((Decimal::ZERO, 0));
        bucket.0 = bucket.0.checked_add(expense.amount).ok_or_else(|| {
            Error::AmountOverflow(format!(
                "{} bucket total overflowed at expense {}",
                period.display_name(),
                expense.id
            ))
        })?;
        bucket.1 += 1;
    }

    Ok(buckets
        .into_iter()
        .rev()
        .map(|(start, (total_amount, expense_count))| PeriodSummary {
            period,
            label: bucket_label(period, start),
            total_amount,
            expense_count,
        })
        .collect())
}

/// Totals, counts and the per-bucket average of a summary list.
pub fn compute_period_stats(
    period: ReportPeriod,
    summaries: &[PeriodSummary],
) -> Result<PeriodStats> {
    let total_amount = sum_amounts(summaries.iter().map(|s| s.total_amount))?;
    let total_expenses: u32 = summaries.iter().map(|s| s.expense_count).sum();
    let period_count = summaries.len() as u32;
    let average_per_period = if period_count > 0 {
        (total_amount / Decimal::from(period_count)).round_dp(DISPLAY_DECIMAL_PRECISION)
    } else {
        Decimal::ZERO
    };

    Ok(PeriodStats {
        total_amount,
        total_expenses,
        average_per_period,
        period_count,
        period_name: period.display_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{DatabaseError, Error};
    use crate::expenses::{DateRange, NewExpense};
    use async_trait::async_trait;
    use chrono::{Duration, FixedOffset, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    // --- Mock ExpenseRepository ---
    #[derive(Default)]
    struct MockExpenseRepository {
        expenses: Mutex<Vec<Expense>>,
        fail_since: bool,
    }

    impl MockExpenseRepository {
        fn with(expenses: Vec<Expense>) -> Self {
            Self {
                expenses: Mutex::new(expenses),
                fail_since: false,
            }
        }

        fn sorted(&self, filter: impl Fn(&Expense) -> bool) -> Vec<Expense> {
            let mut out: Vec<Expense> = self
                .expenses
                .lock()
                .unwrap()
                .iter()
                .filter(|e| filter(e))
                .cloned()
                .collect();
            out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            out
        }
    }

    #[async_trait]
    impl ExpenseRepositoryTrait for MockExpenseRepository {
        fn list(&self) -> Result<Vec<Expense>> {
            Ok(self.sorted(|_| true))
        }

        fn list_in_range(&self, range: DateRange) -> Result<Vec<Expense>> {
            Ok(self.sorted(|e| range.contains(e.created_at)))
        }

        fn list_since(&self, start: i64) -> Result<Vec<Expense>> {
            if self.fail_since {
                return Err(Error::Database(DatabaseError::QueryFailed(
                    "disk I/O error".to_string(),
                )));
            }
            Ok(self.sorted(|e| e.created_at >= start))
        }

        fn get_by_id(&self, _expense_id: i64) -> Result<Expense> {
            unimplemented!()
        }

        fn total_amount(&self) -> Result<Decimal> {
            unimplemented!()
        }

        fn total_amount_in_range(&self, _range: DateRange) -> Result<Decimal> {
            unimplemented!()
        }

        fn count(&self) -> Result<i64> {
            unimplemented!()
        }

        async fn insert(&self, _new_expense: NewExpense) -> Result<Expense> {
            unimplemented!()
        }

        async fn update(&self, _expense: Expense) -> Result<Expense> {
            unimplemented!()
        }

        async fn delete(&self, _expense_id: i64) -> Result<usize> {
            unimplemented!()
        }

        async fn delete_all(&self) -> Result<usize> {
            unimplemented!()
        }
    }

    fn expense(id: i64, amount: Decimal, created_at: i64) -> Expense {
        Expense {
            id,
            description: format!("expense {}", id),
            amount,
            created_at,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp_millis()
    }

    #[test]
    fn test_summarize_daily_groups_and_orders_descending() {
        let expenses = vec![
            expense(1, dec!(10.00), at(2024, 3, 1, 9)),
            expense(2, dec!(20.50), at(2024, 3, 1, 18)),
            expense(3, dec!(5.25), at(2024, 3, 3, 12)),
        ];
        let buckets = summarize(ReportPeriod::Daily, &expenses, &Utc).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].label, "2024-03-03");
        assert_eq!(buckets[0].total_amount, dec!(5.25));
        assert_eq!(buckets[0].expense_count, 1);
        assert_eq!(buckets[1].label, "2024-03-01");
        assert_eq!(buckets[1].total_amount, dec!(30.50));
        assert_eq!(buckets[1].expense_count, 2);
    }

    #[test]
    fn test_summarize_uses_local_calendar() {
        // 23:00 UTC on the 1st is the 2nd at UTC+2
        let expenses = vec![expense(1, dec!(7), at(2024, 3, 1, 23))];
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = summarize(ReportPeriod::Daily, &expenses, &tz).unwrap();
        let utc = summarize(ReportPeriod::Daily, &expenses, &Utc).unwrap();
        assert_eq!(local[0].label, "2024-03-02");
        assert_eq!(utc[0].label, "2024-03-01");
    }

    #[test]
    fn test_summarize_weekly_monthly_yearly_labels() {
        let expenses = vec![
            expense(1, dec!(1), at(2023, 12, 31, 12)),
            expense(2, dec!(2), at(2024, 1, 1, 12)),
            expense(3, dec!(4), at(2024, 2, 15, 12)),
        ];
        let weekly = summarize(ReportPeriod::Weekly, &expenses, &Utc).unwrap();
        let labels: Vec<_> = weekly.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-W07", "2024-W01", "2023-W52"]);

        let monthly = summarize(ReportPeriod::Monthly, &expenses, &Utc).unwrap();
        let labels: Vec<_> = monthly.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["2024-02", "2024-01", "2023-12"]);

        let yearly = summarize(ReportPeriod::Yearly, &expenses, &Utc).unwrap();
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[0].label, "2024");
        assert_eq!(yearly[0].total_amount, dec!(6));
        assert_eq!(yearly[0].expense_count, 2);
        assert_eq!(yearly[1].label, "2023");
    }

    #[test]
    fn test_compute_period_stats() {
        let expenses = vec![
            expense(1, dec!(10), at(2024, 3, 1, 9)),
            expense(2, dec!(20), at(2024, 3, 2, 9)),
            expense(3, dec!(5), at(2024, 3, 2, 10)),
        ];
        let buckets = summarize(ReportPeriod::Daily, &expenses, &Utc).unwrap();
        let stats = compute_period_stats(ReportPeriod::Daily, &buckets).unwrap();
        assert_eq!(stats.total_amount, dec!(35));
        assert_eq!(stats.total_expenses, 3);
        assert_eq!(stats.period_count, 2);
        assert_eq!(stats.average_per_period, dec!(17.50));
        assert_eq!(stats.period_name, "Daily");
    }

    #[test]
    fn test_compute_period_stats_empty() {
        let stats = compute_period_stats(ReportPeriod::Weekly, &[]).unwrap();
        assert_eq!(stats.total_amount, Decimal::ZERO);
        assert_eq!(stats.total_expenses, 0);
        assert_eq!(stats.average_per_period, Decimal::ZERO);
        assert_eq!(stats.period_count, 0);
        assert_eq!(stats.period_name, "Weekly");
    }

    #[test]
    fn test_summarize_overflow_is_an_error() {
        let expenses = vec![
            expense(1, Decimal::MAX, at(2024, 3, 1, 9)),
            expense(2, Decimal::MAX, at(2024, 3, 1, 10)),
        ];
        let result = summarize(ReportPeriod::Daily, &expenses, &Utc);
        assert!(matches!(result, Err(Error::AmountOverflow(_))));

        // Separate buckets are fine on their own but not when totalled.
        let expenses = vec![
            expense(1, Decimal::MAX, at(2024, 3, 1, 9)),
            expense(2, Decimal::MAX, at(2024, 3, 2, 9)),
        ];
        let buckets = summarize(ReportPeriod::Daily, &expenses, &Utc).unwrap();
        assert_eq!(buckets.len(), 2);
        assert!(matches!(
            compute_period_stats(ReportPeriod::Daily, &buckets),
            Err(Error::AmountOverflow(_))
        ));
    }

    #[test]
    fn test_overflowing_granularity_degrades_like_a_failure() {
        let now = Local::now();
        let today = now.timestamp_millis();
        let repo = Arc::new(MockExpenseRepository::with(vec![
            expense(1, Decimal::MAX, today),
            expense(2, Decimal::MAX, today),
        ]));
        let service = ReportsService::new(repo);

        let summaries = service.load_all_summaries(now);
        assert_eq!(summaries.failed, ReportPeriod::ALL.to_vec());
        assert!(summaries.daily.is_empty());
        assert!(summaries.yearly.is_empty());

        let stats = service
            .get_period_stats(ReportPeriod::Daily, summaries.for_period(ReportPeriod::Daily))
            .unwrap();
        assert!(matches!(
            service.get_current_period_report(ReportPeriod::Daily, stats, now),
            Err(Error::AmountOverflow(_))
        ));
    }

    #[test]
    fn test_old_expense_is_outside_daily_window_but_in_yearly() {
        let now = Local::now();
        let forty_days_ago = (now - Duration::days(40)).timestamp_millis();
        let repo = Arc::new(MockExpenseRepository::with(vec![expense(
            1,
            dec!(12),
            forty_days_ago,
        )]));
        let service = ReportsService::new(repo);

        let daily = service.get_summary(ReportPeriod::Daily, now).unwrap();
        assert!(daily.is_empty());

        let yearly = service.get_summary(ReportPeriod::Yearly, now).unwrap();
        let year_label = local_date(forty_days_ago, &Local).unwrap().format("%Y").to_string();
        assert_eq!(yearly.len(), 1);
        assert_eq!(yearly[0].label, year_label);
        assert_eq!(yearly[0].total_amount, dec!(12));
    }

    #[test]
    fn test_failing_granularities_degrade_to_empty() {
        let now = Local::now();
        let repo = Arc::new(MockExpenseRepository {
            expenses: Mutex::new(vec![expense(1, dec!(3), now.timestamp_millis())]),
            fail_since: true,
        });
        let service = ReportsService::new(repo);

        let summaries = service.load_all_summaries(now);
        assert!(summaries.daily.is_empty());
        assert!(summaries.weekly.is_empty());
        assert!(summaries.monthly.is_empty());
        // Yearly has no window and reads the full list, so it still loads.
        assert_eq!(summaries.yearly.len(), 1);
        assert_eq!(
            summaries.failed,
            vec![ReportPeriod::Daily, ReportPeriod::Weekly, ReportPeriod::Monthly]
        );
    }

    #[test]
    fn test_current_period_report_overwrites_total_and_count_only() {
        let now = Local::now();
        let today = now.timestamp_millis();
        let repo = Arc::new(MockExpenseRepository::with(vec![
            expense(1, dec!(10.00), today),
            expense(2, dec!(20.50), today),
            expense(3, dec!(5.25), today),
        ]));
        let service = ReportsService::new(repo);

        let historical = PeriodStats {
            total_amount: dec!(999),
            total_expenses: 99,
            average_per_period: dec!(42),
            period_count: 7,
            period_name: "Daily".to_string(),
        };
        let report = service
            .get_current_period_report(ReportPeriod::Daily, historical, now)
            .unwrap();
        assert_eq!(report.stats.total_amount, dec!(35.75));
        assert_eq!(report.stats.total_expenses, 3);
        assert_eq!(report.stats.average_per_period, dec!(42));
        assert_eq!(report.stats.period_count, 7);
        assert_eq!(report.expenses.len(), 3);
    }

    #[test]
    fn test_weekly_with_no_expenses() {
        let now = Local::now();
        let service = ReportsService::new(Arc::new(MockExpenseRepository::default()));
        let summaries = service.load_all_summaries(now);
        let stats = service
            .get_period_stats(ReportPeriod::Weekly, summaries.for_period(ReportPeriod::Weekly))
            .unwrap();
        let report = service
            .get_current_period_report(ReportPeriod::Weekly, stats, now)
            .unwrap();
        assert_eq!(report.stats.total_amount, Decimal::ZERO);
        assert_eq!(report.stats.total_expenses, 0);
        assert_eq!(report.stats.average_per_period, Decimal::ZERO);
        assert_eq!(report.stats.period_count, 0);
        assert!(report.expenses.is_empty());
        assert!(!summaries.has_failures());
    }
}
