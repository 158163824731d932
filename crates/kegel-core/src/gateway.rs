//! Typed request/response boundary to the backend command executor.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::{
    error::KegelError,
    models::{
        ApiResponse, DailyCount, ExerciseSession, PerformanceMetrics, ReminderStatus, Stats,
        UserSettings,
    },
};

/// Every command the backend understands, with its payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload", rename_all = "snake_case")]
pub enum Command {
    StartExercise,
    /// Carries the finished session; only `completed` sessions are counted
    CompleteExercise { session: ExerciseSession },
    GetStats,
    GetSettings,
    UpdateSettings { settings: UserSettings },
    GetReminderStatus,
    ToggleReminder,
    CheckAndSendReminder,
    ShowNotification { title: String, body: String },
    /// Newest first, completed sessions only
    GetExerciseHistory { limit: usize },
    GetWeeklyChart,
    GetMonthlyChart,
    GetPerformanceMetrics,
}

impl Command {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StartExercise => "start_exercise",
            Self::CompleteExercise { .. } => "complete_exercise",
            Self::GetStats => "get_stats",
            Self::GetSettings => "get_settings",
            Self::UpdateSettings { .. } => "update_settings",
            Self::GetReminderStatus => "get_reminder_status",
            Self::ToggleReminder => "toggle_reminder",
            Self::CheckAndSendReminder => "check_and_send_reminder",
            Self::ShowNotification { .. } => "show_notification",
            Self::GetExerciseHistory { .. } => "get_exercise_history",
            Self::GetWeeklyChart => "get_weekly_chart",
            Self::GetMonthlyChart => "get_monthly_chart",
            Self::GetPerformanceMetrics => "get_performance_metrics",
        }
    }
}

/// External command executor.
///
/// One attempt per call: no retries, no caching. `Err` is reserved for
/// failures before a response exists (`Transport`) and for contexts with no
/// backend at all (`UnavailableContext`); an explicit backend refusal comes
/// back as `Ok` with `success == false`.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    async fn execute(&self, command: &Command) -> Result<ApiResponse<Value>, KegelError>;
}

/// Gateway for execution contexts with no backend reachable
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableGateway;

#[async_trait]
impl BackendGateway for UnavailableGateway {
    async fn execute(&self, command: &Command) -> Result<ApiResponse<Value>, KegelError> {
        log::warn!("{} called without a backend", command.name());
        Err(KegelError::UnavailableContext {
            command: command.name(),
        })
    }
}

/// Typed client over a [`BackendGateway`], one method per command
#[derive(Clone)]
pub struct BackendClient {
    gateway: Arc<dyn BackendGateway>,
}

impl BackendClient {
    #[must_use]
    pub fn new(gateway: Arc<dyn BackendGateway>) -> Self {
        Self { gateway }
    }

    async fn call<T: DeserializeOwned>(&self, command: Command) -> Result<Option<T>, KegelError> {
        let name = command.name();
        log::debug!("Executing backend command {name}");

        let response = self.gateway.execute(&command).await?;
        if !response.success {
            let message = if response.message.trim().is_empty() {
                format!("{name} failed")
            } else {
                response.message
            };
            return Err(KegelError::BackendRejection {
                command: name,
                message,
            });
        }

        match response.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => serde_json::from_value(data).map(Some).map_err(|e| {
                KegelError::transport(name, format!("malformed response data: {e}"))
            }),
        }
    }

    async fn call_required<T: DeserializeOwned>(&self, command: Command) -> Result<T, KegelError> {
        let name = command.name();
        self.call(command)
            .await?
            .ok_or_else(|| KegelError::transport(name, "response carried no data"))
    }

    async fn call_unit(&self, command: Command) -> Result<(), KegelError> {
        self.call::<IgnoredAny>(command).await.map(|_| ())
    }

    /// Returns the backend's session-start marker, if it sent one
    ///
    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn start_exercise(&self) -> Result<Option<String>, KegelError> {
        self.call(Command::StartExercise).await
    }

    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn complete_exercise(&self, session: &ExerciseSession) -> Result<(), KegelError> {
        self.call_unit(Command::CompleteExercise {
            session: session.clone(),
        })
        .await
    }

    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn get_stats(&self) -> Result<Stats, KegelError> {
        self.call_required(Command::GetStats).await
    }

    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn get_settings(&self) -> Result<UserSettings, KegelError> {
        self.call_required(Command::GetSettings).await
    }

    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn update_settings(&self, settings: UserSettings) -> Result<(), KegelError> {
        self.call_unit(Command::UpdateSettings { settings }).await
    }

    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn get_reminder_status(&self) -> Result<ReminderStatus, KegelError> {
        self.call_required(Command::GetReminderStatus).await
    }

    /// Returns the new `enabled` flag
    ///
    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn toggle_reminder(&self) -> Result<bool, KegelError> {
        self.call_required(Command::ToggleReminder).await
    }

    /// Returns whether a reminder was actually sent
    ///
    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn check_and_send_reminder(&self) -> Result<bool, KegelError> {
        Ok(self
            .call(Command::CheckAndSendReminder)
            .await?
            .unwrap_or(false))
    }

    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn show_notification(&self, title: &str, body: &str) -> Result<(), KegelError> {
        self.call_unit(Command::ShowNotification {
            title: title.to_string(),
            body: body.to_string(),
        })
        .await
    }

    /// Up to `limit` completed sessions, newest first
    ///
    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn get_exercise_history(
        &self,
        limit: usize,
    ) -> Result<Vec<ExerciseSession>, KegelError> {
        Ok(self
            .call(Command::GetExerciseHistory { limit })
            .await?
            .unwrap_or_default())
    }

    /// One entry per day for the last seven days, oldest first
    ///
    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn get_weekly_chart(&self) -> Result<Vec<DailyCount>, KegelError> {
        Ok(self.call(Command::GetWeeklyChart).await?.unwrap_or_default())
    }

    /// One entry per day from the first of the month through today
    ///
    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn get_monthly_chart(&self) -> Result<Vec<DailyCount>, KegelError> {
        Ok(self.call(Command::GetMonthlyChart).await?.unwrap_or_default())
    }

    /// # Errors
    ///
    /// Propagates backend rejections and transport failures.
    pub async fn get_performance_metrics(&self) -> Result<PerformanceMetrics, KegelError> {
        self.call_required(Command::GetPerformanceMetrics).await
    }
}
