//! Weekly period keys shared by the collectors, the processor and the read API.
//!
//! The week number is `ceil((day_of_year0 + weekday_of_jan1 + 1) / 7)` with
//! weeks starting on Sunday and the calendar year (not the ISO week-year) as
//! prefix. This is not ISO-8601 week numbering; every writer and reader must
//! agree on it, so nothing else in the workspace computes period keys.

use chrono::{Datelike, Duration, Local, NaiveDate};

/// Week number of `date` within its calendar year (1-based, Sunday-start).
pub fn week_number(date: NaiveDate) -> u32 {
    let jan1 = NaiveDate::from_yo_opt(date.year(), 1).unwrap_or(date);
    let first_weekday = jan1.weekday().num_days_from_sunday();
    (date.ordinal0() + first_weekday + 1).div_ceil(7)
}

/// Period key for `date`, e.g. `2025-W49`.
pub fn period_for(date: NaiveDate) -> String {
    format!("{}-W{:02}", date.year(), week_number(date))
}

/// Period key for the week before the one containing `date`.
pub fn previous_period(date: NaiveDate) -> String {
    period_for(date - Duration::days(7))
}

/// Period key for today in the local calendar.
pub fn current_period() -> String {
    period_for(Local::now().date_naive())
}
