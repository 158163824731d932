use anyhow::Result;
use clap::Args;
use kegel_core::{AppContext, DailyCount, ExerciseSession, PerformanceMetrics, Stats};
use serde::Serialize;
use tabled::{Table, Tabled};

use super::helpers::{format_secs, format_time};

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
    /// List recent completed sessions
    #[arg(long, conflicts_with_all = ["week", "month", "metrics"])]
    pub history: bool,
    /// How many sessions `--history` lists
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
    /// Completed sessions per day over the last seven days
    #[arg(long, conflicts_with_all = ["month", "metrics"])]
    pub week: bool,
    /// Completed sessions per day this month
    #[arg(long, conflicts_with = "metrics")]
    pub month: bool,
    /// Averages and completion rate
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Tabled)]
struct StatRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct HistoryRow {
    #[tabled(rename = "Started")]
    started: String,
    #[tabled(rename = "Reps")]
    repetitions: u32,
    #[tabled(rename = "Planned")]
    planned: String,
    #[tabled(rename = "Took")]
    elapsed: String,
}

#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Sessions")]
    count: u32,
    #[tabled(rename = "Time")]
    duration: String,
}

fn rows(stats: &Stats) -> Vec<StatRow> {
    let row = |metric, value: u32| StatRow {
        metric,
        value: value.to_string(),
    };
    vec![
        row("Today", stats.today_count),
        row("This week", stats.week_count),
        row("This month", stats.month_count),
        row("Total", stats.total_count),
        row("Streak (days)", stats.streak_days),
        StatRow {
            metric: "Last exercise",
            value: format_time(stats.last_exercise_time),
        },
    ]
}

fn history_rows(sessions: &[ExerciseSession]) -> Vec<HistoryRow> {
    sessions
        .iter()
        .map(|s| HistoryRow {
            started: format_time(Some(s.start_time)),
            repetitions: s.repetitions,
            planned: format_secs(i64::try_from(s.planned_secs()).unwrap_or(i64::MAX)),
            elapsed: s.elapsed_secs().map_or_else(|| "-".to_string(), format_secs),
        })
        .collect()
}

fn day_rows(days: &[DailyCount]) -> Vec<DayRow> {
    days.iter()
        .map(|d| DayRow {
            date: d.date.format("%a %Y-%m-%d").to_string(),
            count: d.count,
            duration: format_secs(d.duration_secs),
        })
        .collect()
}

fn metric_rows(metrics: &PerformanceMetrics) -> Vec<StatRow> {
    vec![
        StatRow {
            metric: "Average session",
            value: format!("{:.0}s", metrics.average_duration_secs),
        },
        StatRow {
            metric: "Completion rate",
            value: format!("{:.2}%", metrics.completion_rate),
        },
        StatRow {
            metric: "Daily average this week",
            value: format!("{:.2}", metrics.average_daily_this_week),
        },
        StatRow {
            metric: "Sessions recorded",
            value: metrics.total_exercises.to_string(),
        },
        StatRow {
            metric: "Sessions completed",
            value: metrics.completed_exercises.to_string(),
        },
    ]
}

fn print_view<T: Serialize, R: Tabled>(json: bool, data: &T, rows: Vec<R>) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else if rows.is_empty() {
        println!("Nothing recorded yet");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

pub async fn show_stats(context: &AppContext, args: &StatsArgs) -> Result<()> {
    let backend = context.backend();
    if args.history {
        let sessions = backend.get_exercise_history(args.limit).await?;
        return print_view(args.json, &sessions, history_rows(&sessions));
    }
    if args.week || args.month {
        let days = if args.week {
            backend.get_weekly_chart().await?
        } else {
            backend.get_monthly_chart().await?
        };
        return print_view(args.json, &days, day_rows(&days));
    }
    if args.metrics {
        let metrics = backend.get_performance_metrics().await?;
        return print_view(args.json, &metrics, metric_rows(&metrics));
    }

    let stats = context.session().reload_stats().await?;
    print_view(args.json, &stats, rows(&stats))
}
