//! Reports module - period summaries, statistics, and calendar helpers.

mod period;
mod reports_model;
mod reports_service;
mod reports_traits;

pub use period::{
    bucket_end, bucket_label, bucket_start, current_period_range, local_date, local_days_range,
    to_zoned, window_start,
};
pub use reports_model::{
    PeriodStats, PeriodSummary, ReportPeriod, ReportSummaries, ReportWindows, SelectedPeriodReport,
};
pub use reports_service::{compute_period_stats, summarize, ReportsService};
pub use reports_traits::ReportsServiceTrait;
