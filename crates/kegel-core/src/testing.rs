//! Scripted in-memory gateway used by the unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};
use tokio::sync::Notify;

use crate::{
    error::KegelError,
    gateway::{BackendGateway, Command},
    models::{ApiResponse, PerformanceMetrics, Stats, UserSettings},
};

#[derive(Debug, Clone)]
pub enum Reply {
    Ok(Value),
    Reject(String),
    Transport(String),
}

/// Answers from per-command queues, falling back to a healthy default.
#[derive(Default)]
pub struct ScriptedGateway {
    commands: Mutex<Vec<Command>>,
    queued: Mutex<HashMap<&'static str, VecDeque<Reply>>>,
    held: Mutex<HashMap<&'static str, Arc<Notify>>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: &'static str, reply: Reply) {
        self.queued
            .lock()
            .unwrap()
            .entry(command)
            .or_default()
            .push_back(reply);
    }

    /// Make every `command` call wait until the returned handle is notified.
    pub fn hold(&self, command: &'static str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.held.lock().unwrap().insert(command, notify.clone());
        notify
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.commands.lock().unwrap().len()
    }

    pub fn count(&self, command: &str) -> usize {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.name() == command)
            .count()
    }

    fn default_reply(command: &Command) -> Reply {
        match command {
            Command::StartExercise => Reply::Ok(json!("2024-01-01T10:00:00+00:00")),
            Command::GetStats => Reply::Ok(serde_json::to_value(Stats::default()).unwrap()),
            Command::GetSettings => {
                Reply::Ok(serde_json::to_value(UserSettings::default()).unwrap())
            }
            Command::GetReminderStatus => Reply::Ok(json!({
                "enabled": true,
                "nextReminder": "",
                "interval": 30
            })),
            Command::ToggleReminder | Command::CheckAndSendReminder => Reply::Ok(json!(true)),
            Command::GetExerciseHistory { .. }
            | Command::GetWeeklyChart
            | Command::GetMonthlyChart => Reply::Ok(json!([])),
            Command::GetPerformanceMetrics => {
                Reply::Ok(serde_json::to_value(PerformanceMetrics::default()).unwrap())
            }
            Command::CompleteExercise { .. }
            | Command::UpdateSettings { .. }
            | Command::ShowNotification { .. } => Reply::Ok(Value::Null),
        }
    }
}

#[async_trait]
impl BackendGateway for ScriptedGateway {
    async fn execute(&self, command: &Command) -> Result<ApiResponse<Value>, KegelError> {
        self.commands.lock().unwrap().push(command.clone());

        let held = self.held.lock().unwrap().get(command.name()).cloned();
        if let Some(notify) = held {
            notify.notified().await;
        }

        let queued = self
            .queued
            .lock()
            .unwrap()
            .get_mut(command.name())
            .and_then(VecDeque::pop_front);

        match queued.unwrap_or_else(|| Self::default_reply(command)) {
            Reply::Ok(data) => Ok(ApiResponse::ok("ok", Some(data))),
            Reply::Reject(message) => Ok(ApiResponse::rejected(message)),
            Reply::Transport(message) => Err(KegelError::transport(command.name(), message)),
        }
    }
}
