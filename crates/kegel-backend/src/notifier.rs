use anyhow::Result;

pub const REMINDER_TITLE: &str = "kegel-helper";
pub const REMINDER_BODY: &str = "Time for your kegel exercise! Stay healthy, start now.";

/// Delivers user-facing notifications
pub trait Notifier: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the notification could not be shown.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Writes notifications to the log, for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        log::info!("[notification] {title}: {body}");
        Ok(())
    }
}

#[cfg(feature = "desktop")]
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

#[cfg(feature = "desktop")]
impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> Result<()> {
        notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .show()?;
        Ok(())
    }
}

/// Best notifier for this build
#[must_use]
pub fn default_notifier() -> std::sync::Arc<dyn Notifier> {
    #[cfg(feature = "desktop")]
    {
        std::sync::Arc::new(DesktopNotifier)
    }
    #[cfg(not(feature = "desktop"))]
    {
        std::sync::Arc::new(LogNotifier)
    }
}
