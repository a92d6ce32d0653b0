//! Sparse bundle adjustment step solver.
//!
//! Computes one Gauss-Newton / Levenberg-Marquardt parameter update for a
//! sparse nonlinear least-squares problem with bipartite structure: a set
//! of viewpoints (poses, dimension `p`) jointly observing a set of points
//! (positions, dimension `q`) through a sparse subset of 2D observations.
//!
//! The point parameters are eliminated analytically via the Schur
//! complement, reducing the normal equations to a small dense system over
//! viewpoint parameters only; point updates are then recovered by
//! back-substitution. Per-observation weighting and Levenberg-Marquardt
//! damping are supported.
//!
//! The entry point is [`BundleAdjuster`]; the sparsity pattern is
//! described by a [`VisibilityIndex`] built once at construction. The
//! outer optimization loop (step acceptance, damping adaptation,
//! convergence testing) is the caller's responsibility.

pub mod error;
pub mod indices;
pub mod linalg;
pub mod logger;
pub mod solver;

pub use error::{SbaError, SbaResult};
pub use indices::VisibilityIndex;
pub use logger::{init_logger, init_logger_with_level};
pub use solver::BundleAdjuster;
