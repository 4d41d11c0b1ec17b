//! Date bucket predicates shared by filtering, grouping, and renegotiation.
//!
//! Every predicate takes the evaluation date as an explicit `today`
//! parameter so callers (and tests) control the clock; only
//! [`local_today`] reads the wall clock.

use chrono::{Datelike, Duration, Local, NaiveDate};

/// Today's date in the machine's local timezone.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// A due date strictly before today is overdue.
pub fn is_overdue(due: NaiveDate, today: NaiveDate) -> bool {
    due < today
}

/// Number of whole days a due date lies in the past (0 when not overdue).
pub fn days_overdue(due: NaiveDate, today: NaiveDate) -> i64 {
    (today - due).num_days().max(0)
}

pub fn is_today(due: NaiveDate, today: NaiveDate) -> bool {
    due == today
}

pub fn is_tomorrow(due: NaiveDate, today: NaiveDate) -> bool {
    due == today + Duration::days(1)
}

/// Monday and Sunday of the week containing `today`.
pub fn current_week_bounds(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    (monday, monday + Duration::days(6))
}

/// True when `date` falls inside the Monday..=Sunday week containing `today`.
pub fn in_current_week(date: NaiveDate, today: NaiveDate) -> bool {
    let (monday, sunday) = current_week_bounds(today);
    date >= monday && date <= sunday
}

/// True when `date` falls inside the week after the one containing `today`.
pub fn in_next_week(date: NaiveDate, today: NaiveDate) -> bool {
    let (monday, sunday) = current_week_bounds(today);
    date >= monday + Duration::days(7) && date <= sunday + Duration::days(7)
}
