use super::*;
use chrono::{DateTime, Duration, Local, TimeZone};
use kegel_core::{DailyCount, FixedClock, PerformanceMetrics, ReminderStatus, WorkingHours};
use std::fs;

#[derive(Default)]
struct RecordingNotifier {
    shown: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingNotifier {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.shown
            .lock()
            .unwrap()
            .push((title.to_string(), body.to_string()));
        if self.fail {
            anyhow::bail!("no notification daemon");
        }
        Ok(())
    }
}

fn at(h: u32, m: u32) -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 5, 6, h, m, 0).unwrap()
}

struct Fixture {
    backend: LocalBackend,
    clock: Arc<FixedClock>,
    notifier: Arc<RecordingNotifier>,
}

fn fixture_with(backend: LocalBackend, notifier: RecordingNotifier) -> Fixture {
    let clock = Arc::new(FixedClock::new(at(10, 0)));
    let notifier = Arc::new(notifier);
    let backend = backend
        .with_clock(clock.clone())
        .with_notifier(notifier.clone());
    Fixture {
        backend,
        clock,
        notifier,
    }
}

fn fixture() -> Fixture {
    fixture_with(LocalBackend::in_memory(), RecordingNotifier::default())
}

fn data<T: serde::de::DeserializeOwned>(response: ApiResponse<Value>) -> T {
    assert!(response.success, "{}", response.message);
    serde_json::from_value(response.data.unwrap()).unwrap()
}

fn finished(f: &Fixture, completed: bool) -> ExerciseSession {
    let end = f.clock.now();
    let mut session = ExerciseSession::new(end - Duration::seconds(50), 5, 10);
    session.end_time = Some(end);
    session.completed = completed;
    session
}

fn complete(f: &Fixture, completed: bool) -> ApiResponse<Value> {
    f.backend.handle(&Command::CompleteExercise {
        session: finished(f, completed),
    })
}

fn on_disk(dir: &std::path::Path) -> Fixture {
    fixture_with(
        LocalBackend::open(dir).unwrap(),
        RecordingNotifier::default(),
    )
}

/// Make every later write of `file` fail
fn block_writes(dir: &std::path::Path, file: &str) {
    fs::create_dir(dir.join(format!("{file}.tmp"))).unwrap();
}

fn status(f: &Fixture) -> ReminderStatus {
    data(f.backend.handle(&Command::GetReminderStatus))
}

fn check(f: &Fixture) -> bool {
    data(f.backend.handle(&Command::CheckAndSendReminder))
}

// ============================================================================
// exercise and stats
// ============================================================================

#[test]
fn test_start_exercise_returns_timestamp() {
    let f = fixture();
    let started: String = data(f.backend.handle(&Command::StartExercise));
    assert_eq!(DateTime::parse_from_rfc3339(&started).unwrap(), at(10, 0));
}

#[test]
fn test_complete_exercise_updates_stats() {
    let f = fixture();
    let response = complete(&f, true);
    assert!(response.success);
    assert_eq!(response.data, None);

    let stats: Stats = data(f.backend.handle(&Command::GetStats));
    assert_eq!(stats.today_count, 1);
    assert_eq!(stats.total_count, 1);
    assert_eq!(stats.streak_days, 1);
    assert_eq!(stats.last_exercise_time, Some(at(10, 0)));
}

#[test]
fn test_abandoned_session_is_logged_but_not_counted() {
    let f = fixture();
    assert!(complete(&f, false).success);

    let stats: Stats = data(f.backend.handle(&Command::GetStats));
    assert_eq!(stats, Stats::default());
    let history: Vec<ExerciseSession> =
        data(f.backend.handle(&Command::GetExerciseHistory { limit: 10 }));
    assert!(history.is_empty());
    let metrics: PerformanceMetrics = data(f.backend.handle(&Command::GetPerformanceMetrics));
    assert_eq!(metrics.total_exercises, 1);
    assert_eq!(metrics.completed_exercises, 0);
}

#[test]
fn test_stats_read_as_of_today() {
    let f = fixture();
    complete(&f, true);
    f.clock.set(at(10, 0) + Duration::days(1));

    let stats: Stats = data(f.backend.handle(&Command::GetStats));
    assert_eq!(stats.today_count, 0);
    assert_eq!(stats.total_count, 1);
}

// ============================================================================
// settings
// ============================================================================

#[test]
fn test_update_settings_round_trip() {
    let f = fixture();
    let settings = UserSettings {
        repetitions: 15,
        ..UserSettings::default()
    };

    let response = f.backend.handle(&Command::UpdateSettings {
        settings: settings.clone(),
    });
    assert!(response.success);

    let loaded: UserSettings = data(f.backend.handle(&Command::GetSettings));
    assert_eq!(loaded, settings);
}

#[test]
fn test_invalid_settings_are_rejected() {
    let f = fixture();
    let settings = UserSettings {
        reminder_interval: 0,
        ..UserSettings::default()
    };

    let response = f.backend.handle(&Command::UpdateSettings { settings });
    assert!(!response.success);
    assert!(response.message.contains("interval"));

    let loaded: UserSettings = data(f.backend.handle(&Command::GetSettings));
    assert_eq!(loaded, UserSettings::default());
}

#[test]
fn test_settings_change_resets_reminder_mark() {
    let f = fixture();
    assert!(check(&f));

    f.clock.set(at(10, 5));
    let settings = UserSettings {
        reminder_interval: 10,
        ..UserSettings::default()
    };
    f.backend.handle(&Command::UpdateSettings { settings });

    let status = status(&f);
    assert_eq!(status.interval_minutes, 10);
    assert_eq!(status.next_reminder_at, Some(at(10, 15)));
    // Treated as a first check again
    assert!(check(&f));
}

// ============================================================================
// reminders
// ============================================================================

#[test]
fn test_first_check_sends_then_waits_an_interval() {
    let f = fixture();

    assert!(check(&f));
    assert_eq!(
        f.notifier.shown(),
        vec![(REMINDER_TITLE.to_string(), REMINDER_BODY.to_string())]
    );

    f.clock.set(at(10, 29));
    assert!(!check(&f));
    assert_eq!(status(&f).next_reminder_at, Some(at(10, 30)));

    f.clock.set(at(10, 30));
    assert!(check(&f));
    assert_eq!(f.notifier.shown().len(), 2);
}

#[test]
fn test_no_reminder_outside_working_hours() {
    let f = fixture();
    f.clock.set(at(19, 0));

    assert!(!check(&f));
    assert!(f.notifier.shown().is_empty());

    // Still due once the window opens
    f.clock.set(at(9, 0) + Duration::days(1));
    assert!(check(&f));
}

#[test]
fn test_disabled_working_hours_allow_any_time() {
    let f = fixture();
    let settings = UserSettings {
        working_hours: WorkingHours {
            enabled: false,
            ..WorkingHours::default()
        },
        ..UserSettings::default()
    };
    f.backend.handle(&Command::UpdateSettings { settings });
    f.clock.set(at(23, 30));

    assert!(check(&f));
}

#[test]
fn test_toggle_mirrors_notifications_setting() {
    let f = fixture();
    assert!(status(&f).enabled);

    let enabled: bool = data(f.backend.handle(&Command::ToggleReminder));
    assert!(!enabled);

    let settings: UserSettings = data(f.backend.handle(&Command::GetSettings));
    assert!(!settings.enable_notifications);
    let status = status(&f);
    assert!(!status.enabled);
    assert_eq!(status.next_reminder_at, None);
    assert!(!check(&f));
    assert!(f.notifier.shown().is_empty());

    let enabled: bool = data(f.backend.handle(&Command::ToggleReminder));
    assert!(enabled);
}

#[test]
fn test_failed_notification_is_not_fatal() {
    let f = fixture_with(LocalBackend::in_memory(), RecordingNotifier::failing());

    let response = f.backend.handle(&Command::CheckAndSendReminder);
    assert!(response.success);
    assert_eq!(response.data, Some(Value::Bool(false)));

    let response = f.backend.handle(&Command::ShowNotification {
        title: "Hi".to_string(),
        body: "there".to_string(),
    });
    assert!(!response.success);
    assert!(response.message.contains("no notification daemon"));
}

#[test]
fn test_show_notification_reaches_notifier() {
    let f = fixture();
    let response = f.backend.handle(&Command::ShowNotification {
        title: "Done".to_string(),
        body: "10 reps".to_string(),
    });

    assert!(response.success);
    assert_eq!(
        f.notifier.shown(),
        vec![("Done".to_string(), "10 reps".to_string())]
    );
}

// ============================================================================
// history
// ============================================================================

#[test]
fn test_history_newest_first() {
    let f = fixture();
    let first = finished(&f, true);
    f.backend.handle(&Command::CompleteExercise {
        session: first.clone(),
    });
    f.clock.set(at(11, 0));
    let second = finished(&f, true);
    f.backend.handle(&Command::CompleteExercise {
        session: second.clone(),
    });

    let history: Vec<ExerciseSession> =
        data(f.backend.handle(&Command::GetExerciseHistory { limit: 10 }));
    assert_eq!(history, vec![second.clone(), first]);

    let history: Vec<ExerciseSession> =
        data(f.backend.handle(&Command::GetExerciseHistory { limit: 1 }));
    assert_eq!(history, vec![second]);
}

#[test]
fn test_charts_and_metrics() {
    let f = fixture();
    complete(&f, true);
    complete(&f, true);
    complete(&f, false);

    let week: Vec<DailyCount> = data(f.backend.handle(&Command::GetWeeklyChart));
    assert_eq!(week.len(), 7);
    let today = week.last().unwrap();
    assert_eq!(today.date, at(10, 0).date_naive());
    assert_eq!(today.count, 2);
    assert_eq!(today.duration_secs, 100);

    let month: Vec<DailyCount> = data(f.backend.handle(&Command::GetMonthlyChart));
    assert_eq!(month.len(), 6);
    assert_eq!(month.iter().map(|d| d.count).sum::<u32>(), 2);

    let metrics: PerformanceMetrics = data(f.backend.handle(&Command::GetPerformanceMetrics));
    assert_eq!(metrics.total_exercises, 3);
    assert_eq!(metrics.completed_exercises, 2);
    assert!((metrics.average_duration_secs - 50.0).abs() < f64::EPSILON);
    assert!((metrics.average_daily_this_week - 0.29).abs() < 1e-9);
}

// ============================================================================
// failed writes
// ============================================================================

#[test]
fn test_rejected_completion_is_not_counted() {
    let dir = tempfile::tempdir().unwrap();
    let f = on_disk(dir.path());
    block_writes(dir.path(), STATS_FILE);

    let session = finished(&f, true);
    for _ in 0..2 {
        let response = f.backend.handle(&Command::CompleteExercise {
            session: session.clone(),
        });
        assert!(!response.success);
        assert!(response.message.contains("Failed to save stats"));
    }

    let stats: Stats = data(f.backend.handle(&Command::GetStats));
    assert_eq!(stats, Stats::default());
    let history: Vec<ExerciseSession> =
        data(f.backend.handle(&Command::GetExerciseHistory { limit: 10 }));
    assert!(history.is_empty());

    // Once the disk recovers the retry counts exactly once
    fs::remove_dir(dir.path().join("stats.json.tmp")).unwrap();
    assert!(f
        .backend
        .handle(&Command::CompleteExercise { session })
        .success);
    let stats: Stats = data(f.backend.handle(&Command::GetStats));
    assert_eq!(stats.total_count, 1);
}

#[test]
fn test_unsaved_history_does_not_reject_completion() {
    let dir = tempfile::tempdir().unwrap();
    let f = on_disk(dir.path());
    block_writes(dir.path(), HISTORY_FILE);

    assert!(complete(&f, true).success);

    let stats: Stats = data(f.backend.handle(&Command::GetStats));
    assert_eq!(stats.total_count, 1);
    assert!(!dir.path().join(HISTORY_FILE).exists());
}

#[test]
fn test_rejected_settings_update_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let f = on_disk(dir.path());
    block_writes(dir.path(), SETTINGS_FILE);
    let before = status(&f);

    let response = f.backend.handle(&Command::UpdateSettings {
        settings: UserSettings {
            reminder_interval: 10,
            ..UserSettings::default()
        },
    });

    assert!(!response.success);
    assert!(response.message.contains("Failed to save settings"));
    let settings: UserSettings = data(f.backend.handle(&Command::GetSettings));
    assert_eq!(settings, UserSettings::default());
    assert_eq!(status(&f), before);
}

#[test]
fn test_rejected_toggle_keeps_reminders_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let f = on_disk(dir.path());
    block_writes(dir.path(), SETTINGS_FILE);

    let response = f.backend.handle(&Command::ToggleReminder);

    assert!(!response.success);
    assert!(status(&f).enabled);
    let settings: UserSettings = data(f.backend.handle(&Command::GetSettings));
    assert!(settings.enable_notifications);
}

#[test]
fn test_unsaved_reminder_mark_still_holds_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    {
        let f = on_disk(dir.path());
        block_writes(dir.path(), SETTINGS_FILE);

        assert!(check(&f));
        assert_eq!(f.notifier.shown().len(), 1);
        f.clock.set(at(10, 10));
        assert!(!check(&f));
        assert_eq!(status(&f).next_reminder_at, Some(at(10, 30)));
    }

    // Nothing reached the disk, so a fresh backend treats it as a first check
    fs::remove_dir(dir.path().join("settings.json.tmp")).unwrap();
    let f = on_disk(dir.path());
    assert!(check(&f));
}

// ============================================================================
// raw commands
// ============================================================================

#[test]
fn test_handle_json() {
    let f = fixture();

    let response = f.backend.handle_json(r#"{"command": "get_settings"}"#);
    assert!(response.success);

    for raw in [
        r#"{"command": "launch_rocket"}"#,
        r#"{"command": "update_settings", "payload": {"settings": {"theme": "dark"}}}"#,
        "not json",
    ] {
        let response = f.backend.handle_json(raw);
        assert!(!response.success, "{raw}");
        assert!(response.message.starts_with("Malformed command"));
    }
}

// ============================================================================
// persistence
// ============================================================================

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let f = fixture_with(
            LocalBackend::open(dir.path()).unwrap(),
            RecordingNotifier::default(),
        );
        complete(&f, true);
        f.backend.handle(&Command::CheckAndSendReminder);
    }

    let f = fixture_with(
        LocalBackend::open(dir.path()).unwrap(),
        RecordingNotifier::default(),
    );
    let stats: Stats = data(f.backend.handle(&Command::GetStats));
    assert_eq!(stats.total_count, 1);
    let history: Vec<ExerciseSession> =
        data(f.backend.handle(&Command::GetExerciseHistory { limit: 10 }));
    assert_eq!(history.len(), 1);

    // The persisted reminder mark keeps the schedule
    f.clock.set(at(10, 10));
    assert!(!check(&f));
    assert_eq!(status(&f).next_reminder_at, Some(at(10, 30)));
}

#[test]
fn test_corrupt_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(SETTINGS_FILE), "][").unwrap();

    let f = fixture_with(
        LocalBackend::open(dir.path()).unwrap(),
        RecordingNotifier::default(),
    );
    let settings: UserSettings = data(f.backend.handle(&Command::GetSettings));
    assert_eq!(settings, UserSettings::default());
}

#[tokio::test]
async fn test_gateway_never_errors() {
    let f = fixture();
    let response = f.backend.execute(&Command::GetStats).await.unwrap();
    assert!(response.success);
}
