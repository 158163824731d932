//! Exercise session state machine.
//!
//! `Idle -> Pending -> Active -> Pending -> Idle`, with `Pending` covering
//! the time a start or completion request is in flight. Every operation
//! checks the phase under a short lock and releases it before awaiting the
//! backend, so a second `begin` while one is pending is rejected instead of
//! queued.

use serde::Serialize;
use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    clock::Clock,
    error::KegelError,
    gateway::BackendClient,
    models::{ExerciseSession, Stats},
    task::RepeatingTask,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    /// A start or completion request is in flight
    Pending,
    Active,
}

/// Read-only copy of the session state for display
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub session: Option<ExerciseSession>,
    pub is_active: bool,
    pub current_repetition: u32,
    pub progress_percent: f64,
    pub loading: bool,
    pub last_error: Option<String>,
    pub stats: Stats,
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    session: Option<ExerciseSession>,
    current_repetition: u32,
    stats: Stats,
    stats_loading: bool,
    last_error: Option<String>,
    /// Bumped by `cancel`, so completions of requests issued before it are dropped
    epoch: u64,
    pacer: Option<RepeatingTask>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            phase: SessionPhase::Idle,
            session: None,
            current_repetition: 0,
            stats: Stats::default(),
            stats_loading: false,
            last_error: None,
            epoch: 0,
            pacer: None,
        }
    }

    fn progress_percent(&self) -> f64 {
        match &self.session {
            Some(session) if session.repetitions > 0 => {
                f64::from(self.current_repetition) / f64::from(session.repetitions) * 100.0
            }
            _ => 0.0,
        }
    }

    fn advance(&mut self) -> u32 {
        if self.phase != SessionPhase::Active {
            return self.current_repetition;
        }
        if let Some(session) = &self.session {
            if self.current_repetition < session.repetitions {
                self.current_repetition += 1;
            }
        }
        self.current_repetition
    }

    fn stop_pacer(&mut self) {
        if let Some(pacer) = self.pacer.take() {
            pacer.cancel();
        }
    }

    /// Drop the session and return to `Idle`
    fn clear(&mut self) {
        self.session = None;
        self.current_repetition = 0;
        self.stop_pacer();
        self.phase = SessionPhase::Idle;
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns the exercise session and its per-session counters
#[derive(Clone)]
pub struct SessionController {
    backend: BackendClient,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<SessionState>>,
}

impl SessionController {
    #[must_use]
    pub fn new(backend: BackendClient, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend,
            clock,
            state: Arc::new(Mutex::new(SessionState::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    /// True only when idle: neither active nor waiting on the backend
    #[must_use]
    pub fn can_begin(&self) -> bool {
        self.state().phase == SessionPhase::Idle
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state().session.is_some()
    }

    #[must_use]
    pub fn current_repetition(&self) -> u32 {
        self.state().current_repetition
    }

    /// `100 * current / target` while a session exists, otherwise 0
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        self.state().progress_percent()
    }

    #[must_use]
    pub fn stats(&self) -> Stats {
        self.state().stats.clone()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.state().last_error.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            phase: state.phase,
            session: state.session.clone(),
            is_active: state.session.is_some(),
            current_repetition: state.current_repetition,
            progress_percent: state.progress_percent(),
            loading: state.phase == SessionPhase::Pending || state.stats_loading,
            last_error: state.last_error.clone(),
            stats: state.stats.clone(),
        }
    }

    /// Start a session of `repetitions` repetitions, `duration_secs` each.
    ///
    /// # Errors
    ///
    /// Returns a validation error, without contacting the backend, when a
    /// session is already active or starting or when either argument is
    /// zero. Backend failures are recorded and returned; the controller is
    /// back to idle afterwards.
    pub async fn begin(
        &self,
        duration_secs: u32,
        repetitions: u32,
    ) -> Result<ExerciseSession, KegelError> {
        let epoch = {
            let mut state = self.state();
            if state.phase != SessionPhase::Idle {
                return Err(KegelError::validation(
                    "an exercise session is already active or starting",
                ));
            }
            if duration_secs == 0 {
                return Err(KegelError::validation("duration must be greater than zero"));
            }
            if repetitions == 0 {
                return Err(KegelError::validation("repetitions must be greater than zero"));
            }
            state.phase = SessionPhase::Pending;
            state.last_error = None;
            state.epoch
        };

        let result = self.backend.start_exercise().await;

        let mut state = self.state();
        if state.epoch != epoch {
            log::debug!("Session was cancelled while starting, dropping start response");
            return Err(KegelError::validation("session was cancelled while starting"));
        }

        match result {
            Ok(_) => {
                let session = ExerciseSession::new(self.clock.now(), duration_secs, repetitions);
                state.session = Some(session.clone());
                state.current_repetition = 0;
                state.phase = SessionPhase::Active;
                log::info!(
                    "Started exercise session {} ({repetitions} x {duration_secs}s)",
                    session.id
                );
                Ok(session)
            }
            Err(e) => {
                log::error!("Failed to start exercise: {e}");
                state.phase = SessionPhase::Idle;
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Count one more repetition. Local only, capped at the session target.
    pub fn advance_repetition(&self) -> u32 {
        self.state().advance()
    }

    /// Start the local pacing timer that advances one repetition every
    /// `duration_secs` seconds. Returns false when no session is active.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_pacer(&self) -> bool {
        let mut state = self.state();
        let Some(session) = state.session.as_ref() else {
            return false;
        };
        if state.phase != SessionPhase::Active {
            return false;
        }

        let period = Duration::from_secs(u64::from(session.duration_secs));
        let shared = self.state.clone();
        let pacer = RepeatingTask::spawn("pacer", period, move |flag| {
            let shared = shared.clone();
            async move {
                if flag.is_cancelled() {
                    return;
                }
                let repetition = lock(&shared).advance();
                log::debug!("Repetition {repetition}");
            }
        });

        state.stop_pacer();
        state.pacer = Some(pacer);
        true
    }

    /// Finish the active session.
    ///
    /// On success the finished session is returned and dropped from the
    /// controller; a completed session bumps today's and the total count
    /// until the next stats reload.
    ///
    /// # Errors
    ///
    /// Returns a validation error when no session is active. On backend
    /// failure the session stays active so the caller can retry.
    pub async fn finish(&self, completed: bool) -> Result<ExerciseSession, KegelError> {
        let (epoch, mut session) = {
            let mut state = self.state();
            let session = match (&state.phase, &state.session) {
                (SessionPhase::Active, Some(session)) => session.clone(),
                _ => return Err(KegelError::validation("no active exercise session to finish")),
            };
            state.phase = SessionPhase::Pending;
            state.last_error = None;
            (state.epoch, session)
        };
        session.end_time = Some(self.clock.now());
        session.completed = completed;

        let result = self.backend.complete_exercise(&session).await;

        let mut state = self.state();
        if state.epoch != epoch {
            log::debug!("Session was cancelled while finishing, dropping completion response");
            return Err(KegelError::validation("session was cancelled while finishing"));
        }

        if let Err(e) = result {
            log::error!("Failed to complete exercise: {e}");
            state.phase = SessionPhase::Active;
            state.last_error = Some(e.to_string());
            return Err(e);
        }

        if completed {
            state.stats.today_count = state.stats.today_count.saturating_add(1);
            state.stats.total_count = state.stats.total_count.saturating_add(1);
        }
        state.clear();

        log::info!(
            "Finished exercise session {} ({})",
            session.id,
            if completed { "completed" } else { "abandoned" }
        );
        Ok(session)
    }

    /// Abandon the current session locally. No backend call is made, and
    /// results of requests still in flight are discarded.
    pub fn cancel(&self) {
        let mut state = self.state();
        if let Some(session) = &state.session {
            log::info!("Cancelled exercise session {}", session.id);
        }
        state.clear();
        state.epoch = state.epoch.wrapping_add(1);
    }

    /// Replace the local counters with the backend's.
    ///
    /// # Errors
    ///
    /// Backend failures are recorded and returned; the counters are kept.
    pub async fn reload_stats(&self) -> Result<Stats, KegelError> {
        self.state().stats_loading = true;
        let result = self.backend.get_stats().await;

        let mut state = self.state();
        state.stats_loading = false;
        match result {
            Ok(stats) => {
                state.stats = stats.clone();
                Ok(stats)
            }
            Err(e) => {
                log::error!("Failed to load stats: {e}");
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
