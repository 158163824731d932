use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`KegelError`], kept separate for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected locally before anything reached the backend
    Validation,
    /// The backend answered with `success: false`
    BackendRejection,
    /// The call failed before a usable response was obtained
    Transport,
    /// No backend is reachable in this execution context
    UnavailableContext,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KegelError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("{command} rejected by backend: {message}")]
    BackendRejection {
        command: &'static str,
        message: String,
    },

    #[error("{command} failed: {message}")]
    Transport {
        command: &'static str,
        message: String,
    },

    #[error("{command} needs a backend, none is reachable here")]
    UnavailableContext { command: &'static str },
}

impl KegelError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn transport(command: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            command,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::BackendRejection { .. } => ErrorKind::BackendRejection,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::UnavailableContext { .. } => ErrorKind::UnavailableContext,
        }
    }

    /// True when the failure means the feature cannot work here at all,
    /// as opposed to a transient backend problem.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::UnavailableContext { .. })
    }
}
