//! Counter bookkeeping for completed exercises.

use chrono::{DateTime, Datelike, Local, NaiveDate};
use kegel_core::Stats;

fn same_week(a: NaiveDate, b: NaiveDate) -> bool {
    a.iso_week() == b.iso_week()
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Counters as they read at `now`: periods that ended since the last
/// exercise count zero, and a streak broken by a missed day is zero.
#[must_use]
pub fn as_of(stats: &Stats, now: DateTime<Local>) -> Stats {
    let mut view = stats.clone();
    let Some(last) = stats.last_exercise_time else {
        return view;
    };
    let (last, today) = (last.date_naive(), now.date_naive());
    if last >= today {
        return view;
    }

    view.today_count = 0;
    if !same_week(last, today) {
        view.week_count = 0;
    }
    if !same_month(last, today) {
        view.month_count = 0;
    }
    if today.pred_opt() != Some(last) {
        view.streak_days = 0;
    }
    view
}

/// Count one completed exercise at `now`
pub fn record_completion(stats: &mut Stats, now: DateTime<Local>) {
    let today = now.date_naive();
    let last = stats.last_exercise_time.map(|t| t.date_naive());

    let continued = match last {
        Some(last) if last == today => stats.streak_days.max(1),
        Some(last) if today.pred_opt() == Some(last) => stats.streak_days.saturating_add(1),
        _ => 1,
    };

    *stats = as_of(stats, now);
    stats.today_count = stats.today_count.saturating_add(1);
    stats.week_count = stats.week_count.saturating_add(1);
    stats.month_count = stats.month_count.saturating_add(1);
    stats.total_count = stats.total_count.saturating_add(1);
    stats.streak_days = continued;
    stats.last_exercise_time = Some(now);
}
