use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    clock::{Clock, SystemClock},
    config::AppConfig,
    error::KegelError,
    gateway::{BackendClient, BackendGateway},
    models::UserSettings,
    scheduler::ReminderScheduler,
    session::SessionController,
    settings::{SettingsPatch, SettingsStore},
};

/// Everything one running application needs, built once per process
pub struct AppContext {
    backend: BackendClient,
    settings: SettingsStore,
    session: SessionController,
    reminders: ReminderScheduler,
    reminders_available: AtomicBool,
}

impl AppContext {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>, clock: Arc<dyn Clock>) -> Self {
        let backend = BackendClient::new(gateway);
        let settings = SettingsStore::new(backend.clone());
        let session = SessionController::new(backend.clone(), clock.clone());
        let reminders = ReminderScheduler::new(backend.clone(), settings.clone(), clock);

        Self {
            backend,
            settings,
            session,
            reminders,
            reminders_available: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn from_config(gateway: Arc<dyn BackendGateway>, config: &AppConfig) -> Self {
        let mut context = Self::new(gateway, Arc::new(SystemClock));
        context.reminders = context.reminders.with_period(config.tick_interval());
        context
    }

    #[must_use]
    pub const fn backend(&self) -> &BackendClient {
        &self.backend
    }

    #[must_use]
    pub const fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    #[must_use]
    pub const fn session(&self) -> &SessionController {
        &self.session
    }

    #[must_use]
    pub const fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    /// False once `init` found no backend to poll reminders from
    #[must_use]
    pub fn reminders_available(&self) -> bool {
        self.reminders_available.load(Ordering::SeqCst)
    }

    /// Load settings, stats and reminder status, then start the reminder
    /// scheduler. Each load is best-effort; when no backend is reachable at
    /// all the scheduler is not started.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn init(&self) {
        if let Err(e) = self.settings.load().await {
            log::warn!("Using default settings: {e}");
        }
        if let Err(e) = self.session.reload_stats().await {
            log::warn!("Stats not loaded: {e}");
        }

        match self.reminders.refresh().await {
            Err(e) if e.is_unavailable() => {
                log::warn!("Reminders disabled in this context: {e}");
                self.reminders_available.store(false, Ordering::SeqCst);
                return;
            }
            Err(e) => log::warn!("Reminder status not loaded: {e}"),
            Ok(status) => log::debug!("Reminder status: {status:?}"),
        }

        self.reminders_available.store(true, Ordering::SeqCst);
        self.reminders.start();
    }

    /// Save a settings change and refresh the reminder status, since the
    /// backend reschedules reminders when settings change.
    ///
    /// # Errors
    ///
    /// Propagates validation and backend failures from the save.
    pub async fn save_settings(&self, patch: SettingsPatch) -> Result<UserSettings, KegelError> {
        let saved = self.settings.save(patch).await?;
        if self.reminders_available() {
            if let Err(e) = self.reminders.refresh().await {
                log::warn!("Reminder status refresh after settings change failed: {e}");
            }
        }
        Ok(saved)
    }

    /// Stop the reminder timer and abandon any session in progress
    pub fn shutdown(&self) {
        self.reminders.stop();
        self.session.cancel();
        log::info!("Application context shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::gateway::UnavailableGateway;
    use crate::testing::{Reply, ScriptedGateway};
    use chrono::{Local, TimeZone};
    use serde_json::json;
    use std::time::Duration;

    fn clock() -> Arc<FixedClock> {
        Arc::new(FixedClock::new(
            Local.with_ymd_and_hms(2024, 5, 6, 11, 0, 0).unwrap(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_loads_state_and_starts_scheduler() {
        let gateway = Arc::new(ScriptedGateway::new());
        gateway.push(
            "get_stats",
            Reply::Ok(json!({
                "todayCount": 1, "weekCount": 2, "monthCount": 3,
                "totalCount": 4, "streakDays": 1
            })),
        );
        let context = AppContext::new(gateway.clone(), clock());

        context.init().await;

        assert!(context.reminders_available());
        assert!(context.reminders().is_running());
        assert_eq!(context.session().stats().total_count, 4);
        assert!(context.reminders().status().enabled);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(gateway.count("check_and_send_reminder"), 1);

        context.shutdown();
        assert!(!context.reminders().is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_degrades_without_backend() {
        let context = AppContext::new(Arc::new(UnavailableGateway), clock());

        context.init().await;

        assert!(!context.reminders_available());
        assert!(!context.reminders().is_running());
        assert_eq!(context.settings().current(), UserSettings::default());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_session() {
        let gateway = Arc::new(ScriptedGateway::new());
        let context = AppContext::new(gateway.clone(), clock());
        context.session().begin(5, 10).await.unwrap();

        context.shutdown();

        assert!(!context.session().is_active());
        assert_eq!(gateway.count("complete_exercise"), 0);
    }

    #[tokio::test]
    async fn test_save_settings_refreshes_reminders() {
        let gateway = Arc::new(ScriptedGateway::new());
        let context = AppContext::new(gateway.clone(), clock());

        let saved = context
            .save_settings(SettingsPatch {
                reminder_interval: Some(15),
                ..SettingsPatch::default()
            })
            .await
            .unwrap();

        assert_eq!(saved.reminder_interval, 15);
        assert_eq!(gateway.count("update_settings"), 1);
        assert_eq!(gateway.count("get_reminder_status"), 1);
    }

    #[test]
    fn test_from_config_uses_tick_interval() {
        let config = AppConfig {
            tick_interval_seconds: 12,
            ..AppConfig::default()
        };
        let context = AppContext::from_config(Arc::new(ScriptedGateway::new()), &config);
        assert_eq!(context.reminders().period(), Duration::from_secs(12));
    }
}
