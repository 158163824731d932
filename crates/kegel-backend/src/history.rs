//! Bounded log of finished sessions and the views built on it.

use chrono::{Datelike, Days, NaiveDate};
use kegel_core::{DailyCount, ExerciseSession, PerformanceMetrics};
use serde::{Deserialize, Serialize};

/// Oldest sessions are dropped past this many
pub const HISTORY_LIMIT: usize = 500;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Finished sessions in the order they were reported
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    sessions: Vec<ExerciseSession>,
}

impl History {
    /// Append `session`, replacing an earlier entry with the same id
    pub fn record(&mut self, session: ExerciseSession) {
        if let Some(existing) = self.sessions.iter_mut().find(|s| s.id == session.id) {
            *existing = session;
            return;
        }
        self.sessions.push(session);
        if self.sessions.len() > HISTORY_LIMIT {
            let excess = self.sessions.len() - HISTORY_LIMIT;
            self.sessions.drain(..excess);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Up to `limit` completed sessions, newest first
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<ExerciseSession> {
        self.sessions
            .iter()
            .rev()
            .filter(|s| s.completed)
            .take(limit)
            .cloned()
            .collect()
    }

    fn day(&self, date: NaiveDate) -> DailyCount {
        let (count, duration_secs) = self
            .sessions
            .iter()
            .filter(|s| s.completed && s.start_time.date_naive() == date)
            .fold((0u32, 0i64), |(count, secs), s| {
                (
                    count.saturating_add(1),
                    secs.saturating_add(s.elapsed_secs().unwrap_or(0)),
                )
            });
        DailyCount {
            date,
            count,
            duration_secs,
        }
    }

    /// One entry per day in `from..=to`
    #[must_use]
    pub fn daily(&self, from: NaiveDate, to: NaiveDate) -> Vec<DailyCount> {
        from.iter_days()
            .take_while(|date| *date <= to)
            .map(|date| self.day(date))
            .collect()
    }

    /// The seven days ending with `today`
    #[must_use]
    pub fn weekly_chart(&self, today: NaiveDate) -> Vec<DailyCount> {
        let from = today.checked_sub_days(Days::new(6)).unwrap_or(today);
        self.daily(from, today)
    }

    /// The first of `today`'s month through `today`
    #[must_use]
    pub fn monthly_chart(&self, today: NaiveDate) -> Vec<DailyCount> {
        let from = today.with_day(1).unwrap_or(today);
        self.daily(from, today)
    }

    /// Metrics over the kept log; `week_count` comes from the counters
    #[must_use]
    pub fn metrics(&self, week_count: u32) -> PerformanceMetrics {
        let completed: Vec<i64> = self
            .sessions
            .iter()
            .filter(|s| s.completed)
            .map(|s| s.elapsed_secs().unwrap_or(0))
            .collect();
        let total_exercises = count_u32(self.sessions.len());
        let completed_exercises = count_u32(completed.len());

        let average_duration_secs = if completed.is_empty() {
            0.0
        } else {
            completed.iter().sum::<i64>() as f64 / f64::from(completed_exercises)
        };
        let completion_rate = if total_exercises == 0 {
            0.0
        } else {
            f64::from(completed_exercises) / f64::from(total_exercises) * 100.0
        };

        PerformanceMetrics {
            average_duration_secs: round2(average_duration_secs),
            completion_rate: round2(completion_rate),
            average_daily_this_week: round2(f64::from(week_count) / 7.0),
            total_exercises,
            completed_exercises,
        }
    }
}
