//! Error types for the sparse-ba library.
//!
//! All errors use the `thiserror` crate for automatic trait implementations.
//! Every error is unrecoverable for the current `compute` call; recovery
//! (e.g. increasing damping and retrying) belongs to the caller's outer
//! optimization loop.

use thiserror::Error;

/// Result type used throughout the sparse-ba library
pub type SbaResult<T> = Result<T, SbaError>;

/// Main error type for the sparse-ba library
#[derive(Debug, Clone, Error)]
pub enum SbaError {
    /// Mismatched array lengths or block shapes supplied at construction
    /// or compute time. Detected before any numeric work.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The stacked Jacobian has fewer rows than columns, so the normal
    /// equations cannot be invertible.
    #[error("under-determined system: {rows} residual rows < {cols} parameter columns")]
    UnderDetermined { rows: usize, cols: usize },

    /// A per-point Hessian block is not invertible. The point is observed
    /// from too few viewpoints, or the damping is too small to regularize it.
    #[error("point block {point} is singular; the point is insufficiently observed")]
    SingularPointBlock { point: usize },

    /// Cholesky factorization of the reduced viewpoint system failed.
    /// The Jacobian/visibility pattern does not satisfy the rank condition.
    #[error("reduced viewpoint system is singular")]
    SingularReducedSystem,
}
