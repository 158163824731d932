//! Periodic reminder polling.
//!
//! Each tick refreshes the reminder status, asks the backend to evaluate and
//! possibly send a reminder when reminders are enabled and the clock is
//! inside working hours, then refreshes the status again. Failures are
//! logged and never stop the schedule.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError, RwLock,
    },
    time::Duration,
};

use crate::{
    clock::Clock,
    error::KegelError,
    gate::is_within_working_hours,
    gateway::BackendClient,
    models::ReminderStatus,
    settings::SettingsStore,
    task::{CancelFlag, RepeatingTask},
};

/// Time between two reminder checks
pub const REMINDER_TICK_INTERVAL: Duration = Duration::from_secs(30);

/// Outcome of one tick, mostly for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The previous tick had not finished yet
    Overlapped,
    /// The status refresh failed and nothing else was attempted
    StatusUnavailable,
    Disabled,
    OutsideWorkingHours,
    Checked { sent: bool },
    CheckFailed,
    /// The scheduler was stopped while the tick was in flight
    Discarded,
}

struct ReminderShared {
    backend: BackendClient,
    settings: SettingsStore,
    clock: Arc<dyn Clock>,
    status: RwLock<ReminderStatus>,
    tick_in_flight: AtomicBool,
}

/// Clears the in-flight flag however the tick ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ReminderShared {
    fn status(&self) -> ReminderStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store_status(&self, status: ReminderStatus) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = status;
    }

    fn set_enabled(&self, enabled: bool) {
        self.status
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .enabled = enabled;
    }

    async fn refresh(&self, flag: Option<&CancelFlag>) -> Result<ReminderStatus, KegelError> {
        let status = self.backend.get_reminder_status().await?;
        if !flag.is_some_and(CancelFlag::is_cancelled) {
            self.store_status(status.clone());
        }
        Ok(status)
    }

    async fn tick(&self, flag: Option<&CancelFlag>) -> TickOutcome {
        if self.tick_in_flight.swap(true, Ordering::AcqRel) {
            log::debug!("Previous reminder tick still running, skipping");
            return TickOutcome::Overlapped;
        }
        let _in_flight = InFlight(&self.tick_in_flight);

        let stale = || flag.is_some_and(CancelFlag::is_cancelled);

        let status = match self.refresh(flag).await {
            Ok(status) => status,
            Err(e) if e.is_unavailable() => {
                log::warn!("Reminder status unavailable: {e}");
                return TickOutcome::StatusUnavailable;
            }
            Err(e) => {
                log::error!("Reminder status refresh failed: {e}");
                self.status()
            }
        };
        if stale() {
            return TickOutcome::Discarded;
        }

        if !status.enabled {
            return TickOutcome::Disabled;
        }

        let hours = self.settings.working_hours();
        if !is_within_working_hours(&self.clock.now(), &hours) {
            log::debug!(
                "Outside working hours {}-{}, no reminder",
                hours.start,
                hours.end
            );
            return TickOutcome::OutsideWorkingHours;
        }

        let outcome = match self.backend.check_and_send_reminder().await {
            Ok(sent) => {
                if sent {
                    log::info!("Reminder check sent a reminder");
                }
                TickOutcome::Checked { sent }
            }
            Err(e) => {
                log::error!("Reminder check failed: {e}");
                TickOutcome::CheckFailed
            }
        };
        if stale() {
            return TickOutcome::Discarded;
        }

        if let Err(e) = self.refresh(flag).await {
            log::error!("Reminder status refresh after check failed: {e}");
        }
        if stale() {
            return TickOutcome::Discarded;
        }
        outcome
    }
}

/// Drives the recurring reminder check and keeps [`ReminderStatus`] fresh
pub struct ReminderScheduler {
    shared: Arc<ReminderShared>,
    timer: Mutex<Option<RepeatingTask>>,
    period: Duration,
}

impl ReminderScheduler {
    #[must_use]
    pub fn new(backend: BackendClient, settings: SettingsStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(ReminderShared {
                backend,
                settings,
                clock,
                status: RwLock::new(ReminderStatus::default()),
                tick_in_flight: AtomicBool::new(false),
            }),
            timer: Mutex::new(None),
            period: REMINDER_TICK_INTERVAL,
        }
    }

    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking every period. Replaces any timer already running, so
    /// calling this twice still leaves exactly one timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.take() {
            previous.cancel();
            log::debug!("Replacing running reminder timer");
        }

        let shared = self.shared.clone();
        *timer = Some(RepeatingTask::spawn(
            "reminder",
            self.period,
            move |flag| {
                let shared = shared.clone();
                async move {
                    let outcome = shared.tick(Some(&flag)).await;
                    log::debug!("Reminder tick: {outcome:?}");
                }
            },
        ));
        log::info!("Reminder scheduler started, checking every {:?}", self.period);
    }

    /// Cancel the timer. Safe to call when already stopped.
    pub fn stop(&self) {
        let previous = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(timer) = previous {
            timer.cancel();
            log::info!("Reminder scheduler stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|timer| !timer.is_cancelled())
    }

    #[must_use]
    pub fn status(&self) -> ReminderStatus {
        self.shared.status()
    }

    /// Fetch the reminder status once.
    ///
    /// # Errors
    ///
    /// Propagates backend rejections and transport failures; the held
    /// status is kept on failure.
    pub async fn refresh(&self) -> Result<ReminderStatus, KegelError> {
        self.shared.refresh(None).await
    }

    /// Run one full tick now, outside the timer.
    pub async fn check_now(&self) -> TickOutcome {
        self.shared.tick(None).await
    }

    /// Flip reminders on or off, then refresh the status once.
    ///
    /// # Errors
    ///
    /// Propagates failures of the toggle request itself. A failed follow-up
    /// refresh is only logged.
    pub async fn toggle(&self) -> Result<bool, KegelError> {
        let enabled = match self.shared.backend.toggle_reminder().await {
            Ok(enabled) => enabled,
            Err(e) => {
                log::error!("Failed to toggle reminders: {e}");
                return Err(e);
            }
        };
        self.shared.set_enabled(enabled);
        log::info!("Reminders {}", if enabled { "enabled" } else { "disabled" });

        if let Err(e) = self.refresh().await {
            log::warn!("Reminder status refresh after toggle failed: {e}");
        }
        Ok(enabled)
    }
}

impl Drop for ReminderScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
