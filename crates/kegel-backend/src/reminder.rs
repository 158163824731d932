use chrono::{DateTime, Duration, Local};
use kegel_core::{ReminderStatus, UserSettings};

/// Backend-side reminder state, derived from the settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderTimer {
    pub enabled: bool,
    pub interval_minutes: u32,
    /// Unset until the first check, and again after any settings change
    pub last_reminder: Option<DateTime<Local>>,
}

impl ReminderTimer {
    #[must_use]
    pub fn from_settings(
        settings: &UserSettings,
        last_reminder: Option<DateTime<Local>>,
    ) -> Self {
        Self {
            enabled: settings.enable_notifications,
            interval_minutes: settings.reminder_interval,
            last_reminder,
        }
    }

    fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    /// A reminder is due on the first check and whenever a full interval
    /// has passed since the last one
    #[must_use]
    pub fn is_due(&self, now: DateTime<Local>) -> bool {
        self.last_reminder
            .is_none_or(|last| now.signed_duration_since(last) >= self.interval())
    }

    #[must_use]
    pub fn status(&self, now: DateTime<Local>) -> ReminderStatus {
        let next_reminder_at = self.enabled.then(|| match self.last_reminder {
            Some(last) => (last + self.interval()).max(now),
            None => now + self.interval(),
        });
        ReminderStatus {
            enabled: self.enabled,
            next_reminder_at,
            interval_minutes: self.interval_minutes,
        }
    }
}
