pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod gate;
pub mod gateway;
pub mod models;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod task;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::AppConfig;
pub use context::AppContext;
pub use error::{ErrorKind, KegelError};
pub use gate::is_within_working_hours;
pub use gateway::{BackendClient, BackendGateway, Command, UnavailableGateway};
pub use models::{
    ApiResponse, DailyCount, ExerciseSession, PerformanceMetrics, ReminderStatus, Stats, Theme,
    UserSettings, WorkingHours,
};
pub use scheduler::{ReminderScheduler, TickOutcome, REMINDER_TICK_INTERVAL};
pub use session::{SessionController, SessionPhase, SessionSnapshot};
pub use settings::{SettingsPatch, SettingsStore};
