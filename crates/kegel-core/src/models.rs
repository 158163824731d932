use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Response envelope shared by every backend command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Time-of-day window outside which reminders are suppressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHours {
    /// `HH:MM`
    pub start: String,
    /// `HH:MM`, inclusive
    pub end: String,
    pub enabled: bool,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start: "09:00".to_string(),
            end: "18:00".to_string(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    /// Minutes between reminders
    pub reminder_interval: u32,
    /// Seconds per repetition
    pub exercise_duration: u32,
    pub repetitions: u32,
    pub enable_sound: bool,
    pub enable_notifications: bool,
    pub theme: Theme,
    pub working_hours: WorkingHours,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            reminder_interval: 30,
            exercise_duration: 5,
            repetitions: 10,
            enable_sound: true,
            enable_notifications: true,
            theme: Theme::Light,
            working_hours: WorkingHours::default(),
        }
    }
}

/// Aggregate completion counters, owned by the backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub today_count: u32,
    pub week_count: u32,
    pub month_count: u32,
    pub total_count: u32,
    pub streak_days: u32,
    #[serde(default, deserialize_with = "optional_timestamp")]
    pub last_exercise_time: Option<DateTime<Local>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderStatus {
    pub enabled: bool,
    #[serde(
        rename = "nextReminder",
        default,
        deserialize_with = "optional_timestamp"
    )]
    pub next_reminder_at: Option<DateTime<Local>>,
    #[serde(rename = "interval")]
    pub interval_minutes: u32,
}

impl Default for ReminderStatus {
    fn default() -> Self {
        Self {
            enabled: false,
            next_reminder_at: None,
            interval_minutes: 30,
        }
    }
}

/// One timed exercise attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSession {
    pub id: Uuid,
    pub start_time: DateTime<Local>,
    /// Unset while the session is active
    pub end_time: Option<DateTime<Local>>,
    /// Seconds per repetition
    pub duration_secs: u32,
    pub repetitions: u32,
    pub completed: bool,
}

impl ExerciseSession {
    #[must_use]
    pub fn new(start_time: DateTime<Local>, duration_secs: u32, repetitions: u32) -> Self {
        Self {
            id: Uuid::now_v7(),
            start_time,
            end_time: None,
            duration_secs,
            repetitions,
            completed: false,
        }
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.end_time.is_some()
    }

    /// Wall-clock seconds from start to end, once finished
    #[must_use]
    pub fn elapsed_secs(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_seconds().max(0))
    }

    #[must_use]
    pub const fn planned_secs(&self) -> u64 {
        self.duration_secs as u64 * self.repetitions as u64
    }
}

/// Completed exercises on one calendar day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u32,
    /// Sum of elapsed seconds over the day's completed sessions
    pub duration_secs: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Mean elapsed seconds of completed sessions
    pub average_duration_secs: f64,
    /// Percent of recorded sessions that were completed
    pub completion_rate: f64,
    pub average_daily_this_week: f64,
    pub total_exercises: u32,
    pub completed_exercises: u32,
}

/// Accepts RFC 3339 strings, with `null` and `""` both meaning absent.
fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Local>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => DateTime::parse_from_rfc3339(value)
            .map(|t| Some(t.with_timezone(&Local)))
            .map_err(serde::de::Error::custom),
    }
}
