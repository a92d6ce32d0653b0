//! Block-sparse elimination pipeline for the bundle adjustment step.
//!
//! The normal equations of a bundle adjustment problem have a bipartite
//! block structure: per-viewpoint blocks `U_j`, per-point blocks `V_i`
//! and per-observation cross blocks `W_ij`. Because each `V_i` is small
//! and block-diagonal, the point parameters can be eliminated
//! analytically (Schur complement), reducing an `(mp + nq)`-dimensional
//! system to a dense `mp`-dimensional one with cost dominated by
//! `O(N·p·q + N·p²)` instead of `O((mp + nq)³)`.
//!
//! Stages, in dependency order:
//! - [`blocks`] — residual accumulators and Hessian block assembly,
//!   built with nalgebra
//! - [`schur`] — reduced-system assembly, dense Cholesky solve via faer,
//!   and back-substitution for the point updates
//!
//! All buffers produced here are call-local and recomputed from scratch
//! on every call; nothing is cached between optimizer iterations.

pub mod blocks;
pub mod schur;
