/// Trailing window of the daily summary, in days
pub const DAILY_WINDOW_DAYS: i64 = 30;

/// Trailing window of the weekly summary, in weeks
pub const WEEKLY_WINDOW_WEEKS: i64 = 12;

/// Trailing window of the monthly summary, in calendar months
pub const MONTHLY_WINDOW_MONTHS: u32 = 12;

/// Largest amount a single expense may carry
pub const MAX_EXPENSE_AMOUNT: i64 = 1_000_000_000_000;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Generic notification shown when one or more report granularities fail to load
pub const REPORTS_PARTIAL_FAILURE_MESSAGE: &str = "Some reports could not be loaded";
