use chrono::Timelike;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    error::KegelError,
    gate::is_within_working_hours,
    gateway::BackendClient,
    models::{Theme, UserSettings, WorkingHours},
};

/// Partial settings update; `None` fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub reminder_interval: Option<u32>,
    pub exercise_duration: Option<u32>,
    pub repetitions: Option<u32>,
    pub enable_sound: Option<bool>,
    pub enable_notifications: Option<bool>,
    pub theme: Option<Theme>,
    pub working_hours: Option<WorkingHours>,
}

impl SettingsPatch {
    #[must_use]
    pub fn apply_to(self, base: &UserSettings) -> UserSettings {
        UserSettings {
            reminder_interval: self.reminder_interval.unwrap_or(base.reminder_interval),
            exercise_duration: self.exercise_duration.unwrap_or(base.exercise_duration),
            repetitions: self.repetitions.unwrap_or(base.repetitions),
            enable_sound: self.enable_sound.unwrap_or(base.enable_sound),
            enable_notifications: self
                .enable_notifications
                .unwrap_or(base.enable_notifications),
            theme: self.theme.unwrap_or(base.theme),
            working_hours: self
                .working_hours
                .unwrap_or_else(|| base.working_hours.clone()),
        }
    }
}

impl UserSettings {
    /// # Errors
    ///
    /// Returns a validation error for zero counts or malformed `HH:MM` bounds.
    pub fn validate(&self) -> Result<(), KegelError> {
        if self.reminder_interval == 0 {
            return Err(KegelError::validation("reminder interval must be at least 1 minute"));
        }
        if self.exercise_duration == 0 {
            return Err(KegelError::validation("exercise duration must be at least 1 second"));
        }
        if self.repetitions == 0 {
            return Err(KegelError::validation("repetitions must be at least 1"));
        }
        self.working_hours.bounds()?;
        Ok(())
    }
}

/// Process-wide holder of the user's settings, defaults until loaded
#[derive(Clone)]
pub struct SettingsStore {
    backend: BackendClient,
    current: Arc<RwLock<UserSettings>>,
}

impl SettingsStore {
    #[must_use]
    pub fn new(backend: BackendClient) -> Self {
        Self {
            backend,
            current: Arc::new(RwLock::new(UserSettings::default())),
        }
    }

    #[must_use]
    pub fn current(&self) -> UserSettings {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn working_hours(&self) -> WorkingHours {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .working_hours
            .clone()
    }

    #[must_use]
    pub fn is_working_time<T: Timelike>(&self, now: &T) -> bool {
        is_within_working_hours(now, &self.working_hours())
    }

    fn replace(&self, settings: UserSettings) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// Fetch settings from the backend. The held value is kept on failure.
    ///
    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn load(&self) -> Result<UserSettings, KegelError> {
        match self.backend.get_settings().await {
            Ok(settings) => {
                self.replace(settings.clone());
                log::debug!("Loaded settings: {settings:?}");
                Ok(settings)
            }
            Err(e) => {
                log::error!("Failed to load settings: {e}");
                Err(e)
            }
        }
    }

    /// Merge `patch` onto the held settings and persist through the backend.
    /// The held value only changes once the backend accepted it.
    ///
    /// # Errors
    ///
    /// Returns a validation error before contacting the backend when the
    /// merged settings are invalid, otherwise propagates backend failures.
    pub async fn save(&self, patch: SettingsPatch) -> Result<UserSettings, KegelError> {
        let updated = patch.apply_to(&self.current());
        updated.validate()?;
        if updated.working_hours.is_overnight() {
            log::warn!(
                "Working hours {}-{} end before they start; reminders will never fire inside them",
                updated.working_hours.start,
                updated.working_hours.end
            );
        }

        if let Err(e) = self.backend.update_settings(updated.clone()).await {
            log::error!("Failed to save settings: {e}");
            return Err(e);
        }

        self.replace(updated.clone());
        log::info!("Settings saved");
        Ok(updated)
    }

    /// Restore defaults locally without contacting the backend
    pub fn reset(&self) {
        self.replace(UserSettings::default());
    }
}
