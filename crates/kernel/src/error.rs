//! Error types for the simulation kernel.
//!
//! Only setup-time invariant violations surface as errors. Numerical
//! degeneracies during a tick are recovered where they are detected.

use thiserror::Error;

/// Setup error raised before a simulation is allowed to start.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    /// A configuration value is outside its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The initial particle set is empty.
    #[error("Particle set is empty")]
    EmptyParticleSet,

    /// Two per-particle inputs disagree on the particle count.
    #[error("Length mismatch: expected {expected} entries, found {found}")]
    LengthMismatch {
        /// Number of particles in the position array.
        expected: usize,
        /// Number of entries in the mismatched array.
        found: usize,
    },
}

/// Convenience alias for `Result<T, KernelError>`.
pub type KernelResult<T> = Result<T, KernelError>;
