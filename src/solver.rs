//! Bundle adjustment step orchestrator.
//!
//! Wires the elimination pipeline into a single [`BundleAdjuster::compute`]
//! call: residual reduction and block assembly, Schur reduction to the
//! dense viewpoint system, its Cholesky solve, and back-substitution for
//! the point updates.

use std::borrow::Cow;

use nalgebra::{DMatrix, Matrix2, Matrix2xX, Vector2};
use tracing::debug;

use crate::error::{SbaError, SbaResult};
use crate::indices::VisibilityIndex;
use crate::linalg::{blocks, schur};

/// Sparse bundle adjustment step solver.
///
/// Construction takes the two parallel index arrays described in
/// [`VisibilityIndex`]; every per-observation argument of [`compute`]
/// follows the same ordering. The solver itself is immutable and holds
/// only the visibility index, so it can be shared across threads; all
/// per-call buffers are allocated inside `compute` and discarded on
/// return.
///
/// ```
/// use nalgebra::{Matrix2xX, Vector2};
/// use sparse_ba::BundleAdjuster;
///
/// // Two viewpoints observing three points each (p = 2, q = 1).
/// let solver = BundleAdjuster::new(&[0, 0, 0, 1, 1, 1], &[0, 1, 2, 0, 1, 2]).unwrap();
///
/// let observed = vec![Vector2::new(1.0, 2.0); 6];
/// let predicted = vec![Vector2::new(0.9, 2.1); 6];
/// let a: Vec<_> = (0..6)
///     .map(|ij| Matrix2xX::from_row_slice(&[1.0 + ij as f64, 0.5, 0.25, 2.0 + ij as f64]))
///     .collect();
/// let b: Vec<_> = (0..6)
///     .map(|ij| Matrix2xX::from_row_slice(&[1.0, 1.0 + (ij % 3) as f64]))
///     .collect();
///
/// let (delta_a, delta_b) = solver
///     .compute(&observed, &predicted, &a, &b, None, 0.0)
///     .unwrap();
/// assert_eq!(delta_a.nrows(), 2); // one pose update row per viewpoint
/// assert_eq!(delta_b.nrows(), 3); // one position update row per point
/// ```
///
/// [`compute`]: BundleAdjuster::compute
#[derive(Debug, Clone)]
pub struct BundleAdjuster {
    index: VisibilityIndex,
    validate: bool,
}

impl BundleAdjuster {
    /// Create a solver that validates `compute` arguments before any
    /// numeric work.
    pub fn new(viewpoint_indices: &[usize], point_indices: &[usize]) -> SbaResult<Self> {
        Ok(Self {
            index: VisibilityIndex::new(viewpoint_indices, point_indices)?,
            validate: true,
        })
    }

    /// Create a solver that skips the precondition checks in `compute`.
    ///
    /// Use this only when the caller already guarantees consistent
    /// argument shapes and the rank condition; malformed inputs then
    /// panic on out-of-bounds indexing instead of returning a
    /// configuration error. Singularity errors at block inversion or
    /// at the reduced solve are never suppressed.
    pub fn without_validation(
        viewpoint_indices: &[usize],
        point_indices: &[usize],
    ) -> SbaResult<Self> {
        Ok(Self {
            index: VisibilityIndex::new(viewpoint_indices, point_indices)?,
            validate: false,
        })
    }

    /// The visibility index built at construction.
    pub fn index(&self) -> &VisibilityIndex {
        &self.index
    }

    /// Compute one Gauss-Newton / Levenberg-Marquardt update.
    ///
    /// # Arguments
    /// * `observed` - Observed 2D measurements, one per observation
    /// * `predicted` - Measurements predicted by the caller's projection
    /// * `a` - Jacobian blocks of each prediction w.r.t. the observing
    ///   viewpoint's pose parameters (2×p each)
    /// * `b` - Jacobian blocks of each prediction w.r.t. the observed
    ///   point's parameters (2×q each)
    /// * `weights` - Optional symmetric positive-semidefinite 2×2 weight
    ///   per observation; identity when `None`
    /// * `damping` - Levenberg-Marquardt scalar `μ ≥ 0`, added to the
    ///   diagonal pose and point blocks only
    ///
    /// # Returns
    /// `(Δa, Δb)`: the m×p viewpoint updates and n×q point updates, row
    /// `j`/`i` holding the update for viewpoint `j` / point `i`.
    pub fn compute(
        &self,
        observed: &[Vector2<f64>],
        predicted: &[Vector2<f64>],
        a: &[Matrix2xX<f64>],
        b: &[Matrix2xX<f64>],
        weights: Option<&[Matrix2<f64>]>,
        damping: f64,
    ) -> SbaResult<(DMatrix<f64>, DMatrix<f64>)> {
        if self.validate {
            check_arguments(&self.index, observed, predicted, a, b, weights, damping)?;
        }
        debug!(
            viewpoints = self.index.viewpoint_count(),
            points = self.index.point_count(),
            observations = self.index.observation_count(),
            damping,
            weighted = weights.is_some(),
            "computing bundle adjustment update"
        );

        let epsilon = blocks::residuals(observed, predicted);

        // Fold the per-observation weights into A, B and ε once, so the
        // assembly stage only ever forms plain transpose-products.
        let (wa, wb, weps): (
            Cow<[Matrix2xX<f64>]>,
            Cow<[Matrix2xX<f64>]>,
            Cow<[Vector2<f64>]>,
        ) = match weights {
            Some(ws) => (
                Cow::Owned(a.iter().zip(ws).map(|(a_ij, w)| w * a_ij).collect()),
                Cow::Owned(b.iter().zip(ws).map(|(b_ij, w)| w * b_ij).collect()),
                Cow::Owned(epsilon.iter().zip(ws).map(|(e_ij, w)| w * e_ij).collect()),
            ),
            None => (Cow::Borrowed(a), Cow::Borrowed(b), Cow::Borrowed(&epsilon)),
        };

        let eps_a = blocks::viewpoint_residuals(&self.index, a, &weps);
        let eps_b = blocks::point_residuals(&self.index, b, &weps);
        let u = blocks::viewpoint_hessians(&self.index, a, &wa, damping);
        let v_inv = blocks::point_hessian_inverses(&self.index, b, &wb, damping)?;
        let w = blocks::cross_blocks(a, &wb);

        let y = schur::auxiliary_blocks(&self.index, &w, &v_inv);
        let s = schur::reduced_hessian(&self.index, &u, &y, &w);
        let e = schur::reduced_rhs(&self.index, &y, &eps_a, &eps_b);

        let delta_a = schur::solve_reduced(&s, &e, self.index.viewpoint_count())?;
        let delta_b = schur::back_substitute(&self.index, &v_inv, &w, &eps_b, &delta_a);

        debug!(
            delta_a_norm = delta_a.norm(),
            delta_b_norm = delta_b.norm(),
            "update computed"
        );
        Ok((delta_a, delta_b))
    }
}

/// Necessary (not sufficient) solvability condition: the stacked Jacobian
/// needs at least as many rows as columns for `JᵀJ` to be invertible.
pub fn can_solve(
    viewpoints: usize,
    points: usize,
    observations: usize,
    pose_params: usize,
    point_params: usize,
) -> bool {
    2 * observations >= pose_params * viewpoints + point_params * points
}

fn check_arguments(
    index: &VisibilityIndex,
    observed: &[Vector2<f64>],
    predicted: &[Vector2<f64>],
    a: &[Matrix2xX<f64>],
    b: &[Matrix2xX<f64>],
    weights: Option<&[Matrix2<f64>]>,
    damping: f64,
) -> SbaResult<()> {
    let count = index.observation_count();
    if observed.len() != count
        || predicted.len() != count
        || a.len() != count
        || b.len() != count
    {
        return Err(SbaError::Configuration(format!(
            "per-observation arrays must all have length {count}: \
             observed={}, predicted={}, A={}, B={}",
            observed.len(),
            predicted.len(),
            a.len(),
            b.len()
        )));
    }
    if let Some(ws) = weights {
        if ws.len() != count {
            return Err(SbaError::Configuration(format!(
                "weights must have length {count}: got {}",
                ws.len()
            )));
        }
    }
    if !damping.is_finite() || damping < 0.0 {
        return Err(SbaError::Configuration(format!(
            "damping must be a finite non-negative scalar: got {damping}"
        )));
    }

    let pose_params = a[0].ncols();
    let point_params = b[0].ncols();
    if pose_params == 0 || point_params == 0 {
        return Err(SbaError::Configuration(
            "Jacobian blocks must have at least one column".to_string(),
        ));
    }
    if let Some(ij) = a.iter().position(|block| block.ncols() != pose_params) {
        return Err(SbaError::Configuration(format!(
            "pose Jacobian block {ij} has {} columns, expected {pose_params}",
            a[ij].ncols()
        )));
    }
    if let Some(ij) = b.iter().position(|block| block.ncols() != point_params) {
        return Err(SbaError::Configuration(format!(
            "point Jacobian block {ij} has {} columns, expected {point_params}",
            b[ij].ncols()
        )));
    }

    if !can_solve(
        index.viewpoint_count(),
        index.point_count(),
        count,
        pose_params,
        point_params,
    ) {
        return Err(SbaError::UnderDetermined {
            rows: 2 * count,
            cols: pose_params * index.viewpoint_count() + point_params * index.point_count(),
        });
    }
    Ok(())
}
