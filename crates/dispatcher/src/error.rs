//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Actor no longer accepts operations
    #[error("actor '{actor}' is stopped")]
    Stopped { actor: String },

    /// `launch` called on an actor whose loop is already running
    #[error("actor '{actor}' is already launched")]
    AlreadyLaunched { actor: String },

    /// Operation dropped before it was executed
    #[error("operation discarded before execution")]
    Discarded,

    /// Callback panicked, no result was produced
    #[error("operation callback panicked on actor '{actor}'")]
    CallbackPanicked { actor: String },
}

impl DispatchError {
    pub fn stopped(actor: impl Into<String>) -> Self {
        Self::Stopped {
            actor: actor.into(),
        }
    }
}
