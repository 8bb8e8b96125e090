//! Error types for run setup and control.

use thiserror::Error;

/// Failure while preparing or driving a run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The simulation rejected its configuration or initial state.
    #[error(transparent)]
    Kernel(#[from] kernel::KernelError),

    /// Surface reconstruction rejected its settings or input.
    #[error(transparent)]
    Surface(#[from] surface::SurfaceError),

    /// Reading a config file or writing a mesh failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run config is not valid JSON for [`crate::RunConfig`].
    #[error("Failed to parse run config: {0}")]
    Json(#[from] serde_json::Error),

    /// No scene preset has this name.
    #[error("Unknown scene: {0}")]
    UnknownScene(String),

    /// A run-level setting is out of range.
    #[error("Invalid run config: {0}")]
    InvalidConfig(String),

    /// The background tick thread panicked.
    #[error("Simulation thread panicked")]
    ThreadPanicked,
}

/// Convenience alias for `Result<T, OrchestratorError>`.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
