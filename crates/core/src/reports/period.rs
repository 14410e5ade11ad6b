//! Calendar arithmetic for report buckets and period boundaries.
//!
//! Every function is generic over the time zone so the same code drives the
//! bucketed summaries and the exact current-period range. The services pass
//! `chrono::Local`; tests pin a fixed offset. Weeks are ISO-8601 weeks
//! starting on Monday everywhere.

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone,
};

use super::reports_model::{ReportPeriod, ReportWindows};
use crate::expenses::DateRange;

/// Converts an epoch-millisecond instant into the given zone.
pub fn to_zoned<Tz: TimeZone>(instant: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    tz.timestamp_millis_opt(instant).earliest()
}

/// Local calendar date of an epoch-millisecond instant.
pub fn local_date<Tz: TimeZone>(instant: i64, tz: &Tz) -> Option<NaiveDate> {
    to_zoned(instant, tz).map(|dt| dt.date_naive())
}

/// First calendar day of the bucket containing `date`.
pub fn bucket_start(period: ReportPeriod, date: NaiveDate) -> NaiveDate {
    match period {
        ReportPeriod::Daily => date,
        ReportPeriod::Weekly => {
            date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        ReportPeriod::Monthly => date.with_day(1).unwrap_or(date),
        ReportPeriod::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date),
    }
}

/// Last calendar day of the bucket that starts on `start`.
pub fn bucket_end(period: ReportPeriod, start: NaiveDate) -> NaiveDate {
    match period {
        ReportPeriod::Daily => start,
        ReportPeriod::Weekly => start + Duration::days(6),
        ReportPeriod::Monthly => start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(start),
        ReportPeriod::Yearly => NaiveDate::from_ymd_opt(start.year(), 12, 31).unwrap_or(start),
    }
}

/// Label of the bucket that starts on `start`.
pub fn bucket_label(period: ReportPeriod, start: NaiveDate) -> String {
    match period {
        ReportPeriod::Daily => start.format("%Y-%m-%d").to_string(),
        ReportPeriod::Weekly => {
            let iso = start.iso_week();
            format!("{}-W{:02}", iso.year(), iso.week())
        }
        ReportPeriod::Monthly => start.format("%Y-%m").to_string(),
        ReportPeriod::Yearly => start.format("%Y").to_string(),
    }
}

/// Inclusive range, 00:00:00.000 on `first` to 23:59:59.999 on `last`, in `tz`.
pub fn local_days_range<Tz: TimeZone>(tz: &Tz, first: NaiveDate, last: NaiveDate) -> DateRange {
    let start = resolve_local(tz, first.and_time(NaiveTime::MIN), Boundary::Start);
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    let end = resolve_local(tz, last.and_time(end_of_day), Boundary::End);
    DateRange::new(start, end)
}

/// Exact range of the current day, week, month or year containing `now`.
pub fn current_period_range<Tz: TimeZone>(period: ReportPeriod, now: &DateTime<Tz>) -> DateRange {
    let start = bucket_start(period, now.date_naive());
    let end = bucket_end(period, start);
    local_days_range(&now.timezone(), start, end)
}

/// Earliest instant included in the trailing window of `period`.
///
/// Windows move by calendar days and months on the local wall clock, so a
/// DST change inside the window does not shift the boundary. Yearly
/// summaries have no window and return `None`, as does a window reaching
/// before the earliest representable date.
pub fn window_start<Tz: TimeZone>(
    period: ReportPeriod,
    now: &DateTime<Tz>,
    windows: &ReportWindows,
) -> Option<i64> {
    let days = |count: i64| Days::new(u64::try_from(count).unwrap_or(0));
    let local = now.naive_local();
    let start = match period {
        ReportPeriod::Daily => local.checked_sub_days(days(windows.daily_days)),
        ReportPeriod::Weekly => {
            local.checked_sub_days(days(windows.weekly_weeks.saturating_mul(7)))
        }
        ReportPeriod::Monthly => local.checked_sub_months(Months::new(windows.monthly_months)),
        ReportPeriod::Yearly => None,
    }?;
    Some(resolve_local(&now.timezone(), start, Boundary::Start))
}

#[derive(Clone, Copy)]
enum Boundary {
    Start,
    End,
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime, boundary: Boundary) -> i64 {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(earliest, latest) => match boundary {
            Boundary::Start => earliest.timestamp_millis(),
            Boundary::End => latest.timestamp_millis(),
        },
        LocalResult::None => {
            // Wall-clock time skipped by a DST transition; step out of the gap
            // towards the inside of the range.
            let shifted = match boundary {
                Boundary::Start => naive + Duration::hours(1),
                Boundary::End => naive - Duration::hours(1),
            };
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.timestamp_millis())
                .unwrap_or_else(|| naive.and_utc().timestamp_millis())
        }
    }
}
