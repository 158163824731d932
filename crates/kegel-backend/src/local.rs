use anyhow::Result;
use async_trait::async_trait;
use kegel_core::{
    is_within_working_hours, ApiResponse, BackendGateway, Clock, Command, ExerciseSession,
    KegelError, Stats, SystemClock, UserSettings,
};
use serde::Serialize;
use serde_json::Value;
use std::{
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use crate::{
    history::History,
    notifier::{default_notifier, Notifier, REMINDER_BODY, REMINDER_TITLE},
    reminder::ReminderTimer,
    stats,
    store::{JsonStore, StoredSettings, HISTORY_FILE, SETTINGS_FILE, STATS_FILE},
};

struct BackendState {
    settings: UserSettings,
    stats: Stats,
    history: History,
    timer: ReminderTimer,
}

fn stored_settings(settings: &UserSettings, timer: &ReminderTimer) -> StoredSettings {
    StoredSettings {
        settings: settings.clone(),
        last_reminder_time: timer.last_reminder,
    }
}

fn respond<T: Serialize>(message: &str, data: T) -> ApiResponse<Value> {
    match serde_json::to_value(data) {
        Ok(value) => ApiResponse::ok(message, Some(value)),
        Err(e) => ApiResponse::rejected(format!("Failed to encode response: {e}")),
    }
}

/// Executes every [`Command`] in process, persisting to JSON files.
///
/// Write commands persist first and only then change the in-memory state,
/// so a `success: false` response leaves the backend as it was.
pub struct LocalBackend {
    store: JsonStore,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn Notifier>,
    state: Mutex<BackendState>,
}

impl LocalBackend {
    /// Open the backend over `dir`. Unreadable data files are logged and
    /// replaced by defaults, each on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn open(dir: &Path) -> Result<Self> {
        let store = JsonStore::open(dir)?;
        let stored: StoredSettings = store.load_or_default(SETTINGS_FILE);
        let stats = store.load_or_default(STATS_FILE);
        let history = store.load_or_default(HISTORY_FILE);
        Ok(Self::with_store(store, stored, stats, history))
    }

    /// Backend that keeps everything in memory
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_store(
            JsonStore::in_memory(),
            StoredSettings::default(),
            Stats::default(),
            History::default(),
        )
    }

    fn with_store(
        store: JsonStore,
        stored: StoredSettings,
        stats: Stats,
        history: History,
    ) -> Self {
        let timer = ReminderTimer::from_settings(&stored.settings, stored.last_reminder_time);
        Self {
            store,
            clock: Arc::new(SystemClock),
            notifier: default_notifier(),
            state: Mutex::new(BackendState {
                settings: stored.settings,
                stats,
                history,
                timer,
            }),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one command. Never fails: problems come back as `success: false`.
    pub fn handle(&self, command: &Command) -> ApiResponse<Value> {
        log::debug!("Handling {}", command.name());
        let now = self.clock.now();
        match command {
            Command::StartExercise => respond("Exercise started", now.to_rfc3339()),
            Command::CompleteExercise { session } => self.complete_exercise(session),
            Command::GetStats => respond("Stats loaded", stats::as_of(&self.state().stats, now)),
            Command::GetSettings => respond("Settings loaded", self.state().settings.clone()),
            Command::UpdateSettings { settings } => self.update_settings(settings),
            Command::GetReminderStatus => {
                respond("Reminder status loaded", self.state().timer.status(now))
            }
            Command::ToggleReminder => self.toggle_reminder(),
            Command::CheckAndSendReminder => self.check_and_send_reminder(),
            Command::ShowNotification { title, body } => self.show_notification(title, body),
            Command::GetExerciseHistory { limit } => {
                respond("History loaded", self.state().history.recent(*limit))
            }
            Command::GetWeeklyChart => respond(
                "Weekly chart loaded",
                self.state().history.weekly_chart(now.date_naive()),
            ),
            Command::GetMonthlyChart => respond(
                "Monthly chart loaded",
                self.state().history.monthly_chart(now.date_naive()),
            ),
            Command::GetPerformanceMetrics => {
                let state = self.state();
                let week_count = stats::as_of(&state.stats, now).week_count;
                respond("Metrics loaded", state.history.metrics(week_count))
            }
        }
    }

    /// Run a command given as `{"command": ..., "payload": ...}` JSON
    pub fn handle_json(&self, raw: &str) -> ApiResponse<Value> {
        match serde_json::from_str::<Command>(raw) {
            Ok(command) => self.handle(&command),
            Err(e) => {
                log::warn!("Rejected malformed command: {e}");
                ApiResponse::rejected(format!("Malformed command: {e}"))
            }
        }
    }

    fn save_settings(&self, stored: &StoredSettings) -> Result<(), String> {
        self.store.save(SETTINGS_FILE, stored).map_err(|e| {
            log::error!("Failed to save settings: {e:#}");
            format!("Failed to save settings: {e}")
        })
    }

    fn complete_exercise(&self, session: &ExerciseSession) -> ApiResponse<Value> {
        let now = self.clock.now();
        let mut state = self.state();

        if session.completed {
            let mut stats = state.stats.clone();
            stats::record_completion(&mut stats, now);
            if let Err(e) = self.store.save(STATS_FILE, &stats) {
                log::error!("Failed to save stats: {e:#}");
                return ApiResponse::rejected(format!("Failed to save stats: {e}"));
            }
            state.stats = stats;
        }

        state.history.record(session.clone());
        if let Err(e) = self.store.save(HISTORY_FILE, &state.history) {
            log::warn!("Exercise history not persisted: {e:#}");
        }
        ApiResponse::ok("Exercise completed", None)
    }

    fn update_settings(&self, settings: &UserSettings) -> ApiResponse<Value> {
        if let Err(e) = settings.validate() {
            return ApiResponse::rejected(e.to_string());
        }

        let mut state = self.state();
        // A changed interval takes effect from now
        let timer = ReminderTimer::from_settings(settings, None);
        if let Err(message) = self.save_settings(&stored_settings(settings, &timer)) {
            return ApiResponse::rejected(message);
        }
        state.settings = settings.clone();
        state.timer = timer;
        ApiResponse::ok("Settings updated", None)
    }

    fn toggle_reminder(&self) -> ApiResponse<Value> {
        let mut state = self.state();
        let enabled = !state.timer.enabled;
        let mut settings = state.settings.clone();
        settings.enable_notifications = enabled;
        let timer = ReminderTimer::from_settings(&settings, None);

        if let Err(message) = self.save_settings(&stored_settings(&settings, &timer)) {
            return ApiResponse::rejected(message);
        }
        state.settings = settings;
        state.timer = timer;
        drop(state);

        let message = if enabled {
            "Reminders enabled"
        } else {
            "Reminders disabled"
        };
        log::info!("{message}");
        respond(message, enabled)
    }

    fn check_and_send_reminder(&self) -> ApiResponse<Value> {
        let now = self.clock.now();
        let stored = {
            let mut state = self.state();
            if !state.timer.enabled || !state.timer.is_due(now) {
                return respond("Reminder check finished", false);
            }
            if !is_within_working_hours(&now, &state.settings.working_hours) {
                log::debug!("Reminder due outside working hours, holding it");
                return respond("Reminder check finished", false);
            }
            // Stamped even when the write below fails
            state.timer.last_reminder = Some(now);
            stored_settings(&state.settings, &state.timer)
        };

        let sent = match self.notifier.notify(REMINDER_TITLE, REMINDER_BODY) {
            Ok(()) => {
                log::info!("Reminder sent");
                true
            }
            Err(e) => {
                log::error!("Failed to show reminder: {e:#}");
                false
            }
        };
        if let Err(message) = self.save_settings(&stored) {
            log::warn!("Reminder time not persisted: {message}");
        }
        respond("Reminder check finished", sent)
    }

    fn show_notification(&self, title: &str, body: &str) -> ApiResponse<Value> {
        match self.notifier.notify(title, body) {
            Ok(()) => ApiResponse::ok("Notification shown", None),
            Err(e) => {
                log::error!("Failed to show notification: {e:#}");
                ApiResponse::rejected(format!("Failed to show notification: {e}"))
            }
        }
    }
}

#[async_trait]
impl BackendGateway for LocalBackend {
    async fn execute(&self, command: &Command) -> Result<ApiResponse<Value>, KegelError> {
        Ok(self.handle(command))
    }
}

#[cfg(test)]
mod tests;
