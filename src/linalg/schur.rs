//! Schur complement reduction, dense solve and back-substitution.
//!
//! Eliminating the point parameters turns the full normal equations into
//! a dense `mp × mp` system over viewpoints only:
//!
//! - diagonal block `(j,j)`: `U_j − Σ Y_ij·W_ijᵀ` over observations of `j`
//! - off-diagonal block `(j,k)`: `−Σ Y_ij·W_ikᵀ` over the aligned
//!   shared-point observation pairs of `j` and `k`, implicitly zero when
//!   the two viewpoints share no point
//!
//! with `Y_ij = W_ij·V_i⁻¹`. The reduced system is symmetric by
//! construction and is factorized with a dense Cholesky.

use faer::linalg::solvers::{Llt, Solve};
use faer::{Mat, Side};
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::error::{SbaError, SbaResult};
use crate::indices::VisibilityIndex;

/// Auxiliary blocks `Y_ij = W_ij · V_i⁻¹`, one per observation.
pub fn auxiliary_blocks(
    index: &VisibilityIndex,
    w: &[DMatrix<f64>],
    v_inv: &[DMatrix<f64>],
) -> Vec<DMatrix<f64>> {
    (0..index.observation_count())
        .map(|ij| &w[ij] * &v_inv[index.point_of(ij)])
        .collect()
}

/// Assemble the dense reduced Hessian `S` (mp × mp).
///
/// Viewpoint pairs with no shared point are skipped entirely; their
/// blocks stay zero without touching the accumulation path.
pub fn reduced_hessian(
    index: &VisibilityIndex,
    u: &[DMatrix<f64>],
    y: &[DMatrix<f64>],
    w: &[DMatrix<f64>],
) -> Mat<f64> {
    let m = index.viewpoint_count();
    let p = u[0].nrows();
    let mut s = Mat::<f64>::zeros(m * p, m * p);

    for j in 0..m {
        for k in 0..m {
            let shared = index.shared_observations(j, k);
            if shared.is_empty() {
                continue;
            }

            let mut block = DMatrix::<f64>::zeros(p, p);
            if j == k {
                block += &u[j];
            }
            for (ij, ik) in shared {
                block -= &y[ij] * w[ik].transpose();
            }

            for r in 0..p {
                for c in 0..p {
                    s[(j * p + r, k * p + c)] = block[(r, c)];
                }
            }
        }
    }
    s
}

/// Assemble the reduced right-hand side `e` (mp × 1):
/// `e_j = εa_j − Σ Y_ij·εb_i` over the observations of viewpoint `j`.
pub fn reduced_rhs(
    index: &VisibilityIndex,
    y: &[DMatrix<f64>],
    eps_a: &[DVector<f64>],
    eps_b: &[DVector<f64>],
) -> Mat<f64> {
    let m = index.viewpoint_count();
    let p = eps_a[0].len();
    let mut e = Mat::<f64>::zeros(m * p, 1);

    for (j, eps_a_j) in eps_a.iter().enumerate() {
        let mut e_j = eps_a_j.clone();
        for &ij in index.observations_of_viewpoint(j) {
            e_j -= &y[ij] * &eps_b[index.point_of(ij)];
        }
        for r in 0..p {
            e[(j * p + r, 0)] = e_j[r];
        }
    }
    e
}

/// Solve `S · flatten(Δa) = flatten(e)` and reshape the result to m × p.
///
/// `S` is symmetric, so a dense Cholesky factorization is used; failure
/// means the viewpoint coupling is rank-deficient.
pub fn solve_reduced(s: &Mat<f64>, e: &Mat<f64>, viewpoints: usize) -> SbaResult<DMatrix<f64>> {
    let p = s.nrows() / viewpoints;
    let cholesky =
        Llt::new(s.as_ref(), Side::Lower).map_err(|_| SbaError::SingularReducedSystem)?;
    let x = cholesky.solve(e);
    debug!(size = s.nrows(), "reduced viewpoint system solved");

    let mut delta_a = DMatrix::zeros(viewpoints, p);
    for j in 0..viewpoints {
        for c in 0..p {
            delta_a[(j, c)] = x[(j * p + c, 0)];
        }
    }
    Ok(delta_a)
}

/// Recover the point updates:
/// `Δb_i = V_i⁻¹ · (εb_i − Σ W_ijᵀ·Δa_j)` over the viewpoints observing `i`.
pub fn back_substitute(
    index: &VisibilityIndex,
    v_inv: &[DMatrix<f64>],
    w: &[DMatrix<f64>],
    eps_b: &[DVector<f64>],
    delta_a: &DMatrix<f64>,
) -> DMatrix<f64> {
    let n = index.point_count();
    let q = v_inv[0].nrows();
    let mut delta_b = DMatrix::zeros(n, q);

    for i in 0..n {
        let mut rhs = eps_b[i].clone();
        for &ij in index.observations_of_point(i) {
            let j = index.viewpoint_of(ij);
            rhs -= w[ij].transpose() * delta_a.row(j).transpose();
        }
        let update = &v_inv[i] * rhs;
        for c in 0..q {
            delta_b[(i, c)] = update[c];
        }
    }
    delta_b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::blocks;
    use nalgebra::Matrix2xX;

    fn deterministic_block(ij: usize, cols: usize) -> Matrix2xX<f64> {
        // Well-spread deterministic entries, full row rank
        Matrix2xX::from_fn(cols, |r, c| {
            ((ij * 7 + r * 3 + c * 5) % 11) as f64 * 0.25 + if r == c { 1.0 } else { 0.0 }
        })
    }

    fn pipeline_to_s(index: &VisibilityIndex, p: usize, q: usize) -> Mat<f64> {
        let count = index.observation_count();
        let a: Vec<_> = (0..count).map(|ij| deterministic_block(ij, p)).collect();
        let b: Vec<_> = (0..count).map(|ij| deterministic_block(ij + 1, q)).collect();

        let u = blocks::viewpoint_hessians(index, &a, &a, 0.0);
        let v_inv = blocks::point_hessian_inverses(index, &b, &b, 0.0).unwrap();
        let w = blocks::cross_blocks(&a, &b);
        let y = auxiliary_blocks(index, &w, &v_inv);
        reduced_hessian(index, &u, &y, &w)
    }

    #[test]
    fn test_reduced_hessian_is_symmetric() {
        let index = VisibilityIndex::new(
            &[0, 0, 0, 1, 1, 1, 2, 2, 2],
            &[0, 1, 2, 0, 1, 2, 0, 1, 2],
        )
        .unwrap();
        let s = pipeline_to_s(&index, 2, 2);

        for r in 0..s.nrows() {
            for c in 0..s.ncols() {
                assert!(
                    (s[(r, c)] - s[(c, r)]).abs() < 1e-9,
                    "S asymmetric at ({r}, {c})"
                );
            }
        }
    }

    #[test]
    fn test_disjoint_viewpoints_leave_zero_block() {
        // Viewpoints 0 and 2 share no point; 1 bridges both groups.
        let index = VisibilityIndex::new(
            &[0, 0, 1, 1, 1, 1, 2, 2],
            &[0, 1, 0, 1, 2, 3, 2, 3],
        )
        .unwrap();
        assert!(index.shared_observations(0, 2).is_empty());

        let p = 2;
        let s = pipeline_to_s(&index, p, 2);
        for r in 0..p {
            for c in 0..p {
                assert_eq!(s[(r, 2 * p + c)], 0.0);
                assert_eq!(s[(2 * p + r, c)], 0.0);
            }
        }
    }

    #[test]
    fn test_solve_reduced_identity() {
        // S = I, e = [1..4]: Δa is just e reshaped.
        let mut s = Mat::<f64>::zeros(4, 4);
        let mut e = Mat::<f64>::zeros(4, 1);
        for i in 0..4 {
            s[(i, i)] = 1.0;
            e[(i, 0)] = (i + 1) as f64;
        }

        let delta_a = solve_reduced(&s, &e, 2).unwrap();
        assert_eq!(delta_a.nrows(), 2);
        assert_eq!(delta_a.ncols(), 2);
        assert!((delta_a[(0, 1)] - 2.0).abs() < 1e-12);
        assert!((delta_a[(1, 0)] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_reduced_singular_fails() {
        let s = Mat::<f64>::zeros(4, 4);
        let e = Mat::<f64>::zeros(4, 1);
        assert!(matches!(
            solve_reduced(&s, &e, 2),
            Err(SbaError::SingularReducedSystem)
        ));
    }

    #[test]
    fn test_back_substitute_identity_blocks() {
        // Single viewpoint, single point, identity V⁻¹ and W:
        // Δb = εb − Wᵀ·Δa.
        let index = VisibilityIndex::new(&[0], &[0]).unwrap();
        let v_inv = vec![DMatrix::identity(2, 2)];
        let w = vec![DMatrix::identity(2, 2)];
        let eps_b = vec![DVector::from_vec(vec![3.0, 4.0])];
        let delta_a = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);

        let delta_b = back_substitute(&index, &v_inv, &w, &eps_b, &delta_a);
        assert!((delta_b[(0, 0)] - 2.0).abs() < 1e-12);
        assert!((delta_b[(0, 1)] - 3.0).abs() < 1e-12);
    }
}
