//! Error types for surface reconstruction.

use thiserror::Error;

/// Setup error raised before a reconstruction pass runs.
///
/// Empty inputs and fields without an iso-crossing are not errors; they
/// produce an empty mesh.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SurfaceError {
    /// A reconstruction setting is outside its valid range.
    #[error("Invalid reconstruction settings: {0}")]
    InvalidConfig(String),

    /// Per-particle arrays of the snapshot disagree on the particle count.
    #[error("Snapshot length mismatch: expected {expected} entries, found {found}")]
    LengthMismatch {
        /// Number of particle positions.
        expected: usize,
        /// Number of entries in the mismatched array.
        found: usize,
    },
}

/// Convenience alias for `Result<T, SurfaceError>`.
pub type SurfaceResult<T> = Result<T, SurfaceError>;
