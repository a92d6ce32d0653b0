//! Residual accumulators and Hessian block assembly.
//!
//! Per-observation weights are handled upstream: the orchestrator
//! pre-multiplies `A`, `B` and the residuals by each observation's 2×2
//! weight matrix, so every contraction here is a plain transpose-product.
//! The `a`/`wa` (and `b`/`wb`) pairs below are therefore the same slice
//! in the unweighted case.

use nalgebra::{DMatrix, DVector, Matrix2xX, Vector2};
use rayon::prelude::*;

use crate::error::{SbaError, SbaResult};
use crate::indices::VisibilityIndex;

/// Raw residuals `ε_ij = observed_ij − predicted_ij`.
pub fn residuals(observed: &[Vector2<f64>], predicted: &[Vector2<f64>]) -> Vec<Vector2<f64>> {
    observed
        .iter()
        .zip(predicted)
        .map(|(o, p)| o - p)
        .collect()
}

/// Per-viewpoint residual accumulators `εa_j = Σ A_ijᵀ·(W·ε)_ij`.
pub fn viewpoint_residuals(
    index: &VisibilityIndex,
    a: &[Matrix2xX<f64>],
    weighted_eps: &[Vector2<f64>],
) -> Vec<DVector<f64>> {
    let p = a[0].ncols();
    (0..index.viewpoint_count())
        .map(|j| {
            let mut acc = DVector::zeros(p);
            for &ij in index.observations_of_viewpoint(j) {
                acc += a[ij].transpose() * weighted_eps[ij];
            }
            acc
        })
        .collect()
}

/// Per-point residual accumulators `εb_i = Σ B_ijᵀ·(W·ε)_ij`.
pub fn point_residuals(
    index: &VisibilityIndex,
    b: &[Matrix2xX<f64>],
    weighted_eps: &[Vector2<f64>],
) -> Vec<DVector<f64>> {
    let q = b[0].ncols();
    (0..index.point_count())
        .map(|i| {
            let mut acc = DVector::zeros(q);
            for &ij in index.observations_of_point(i) {
                acc += b[ij].transpose() * weighted_eps[ij];
            }
            acc
        })
        .collect()
}

/// Per-viewpoint Hessian blocks `U_j = Σ A_ijᵀ·(W·A)_ij + μ·I`.
pub fn viewpoint_hessians(
    index: &VisibilityIndex,
    a: &[Matrix2xX<f64>],
    wa: &[Matrix2xX<f64>],
    damping: f64,
) -> Vec<DMatrix<f64>> {
    let p = a[0].ncols();
    (0..index.viewpoint_count())
        .map(|j| {
            let mut u = DMatrix::zeros(p, p);
            for &ij in index.observations_of_viewpoint(j) {
                u += a[ij].transpose() * &wa[ij];
            }
            if damping > 0.0 {
                for d in 0..p {
                    u[(d, d)] += damping;
                }
            }
            u
        })
        .collect()
}

/// Inverted per-point Hessian blocks `V_i⁻¹` with
/// `V_i = Σ B_ijᵀ·(W·B)_ij + μ·I`.
///
/// Points are independent, so the inversions run in parallel. A point
/// whose block is not invertible fails the whole call with
/// [`SbaError::SingularPointBlock`] naming that point.
pub fn point_hessian_inverses(
    index: &VisibilityIndex,
    b: &[Matrix2xX<f64>],
    wb: &[Matrix2xX<f64>],
    damping: f64,
) -> SbaResult<Vec<DMatrix<f64>>> {
    let q = b[0].ncols();
    (0..index.point_count())
        .into_par_iter()
        .map(|i| {
            let mut v = DMatrix::zeros(q, q);
            for &ij in index.observations_of_point(i) {
                v += b[ij].transpose() * &wb[ij];
            }
            if damping > 0.0 {
                for d in 0..q {
                    v[(d, d)] += damping;
                }
            }
            v.try_inverse()
                .ok_or(SbaError::SingularPointBlock { point: i })
        })
        .collect()
}

/// Per-observation cross blocks `W_ij = A_ijᵀ·(W·B)_ij` (p×q).
///
/// Cross blocks are never damped.
pub fn cross_blocks(a: &[Matrix2xX<f64>], wb: &[Matrix2xX<f64>]) -> Vec<DMatrix<f64>> {
    a.iter()
        .zip(wb)
        .map(|(a_ij, wb_ij)| a_ij.transpose() * wb_ij)
        .collect()
}
