//! Visibility index over (viewpoint, point) observation pairs.
//!
//! In general not every 3D point is observed from every viewpoint; points
//! drop out because of occlusion, motion blur, or the field of view. The
//! visible subset is described by two parallel index arrays with one entry
//! per observation. For example, with four points seen from three
//! viewpoints under the condition that viewpoint 0 sees all points,
//! viewpoint 1 sees points {0, 2, 3} and viewpoint 2 sees points {1, 2}:
//!
//! ```text
//! viewpoint_indices = [0, 0, 0, 0, 1, 1, 1, 2, 2]
//! point_indices     = [0, 1, 2, 3, 0, 2, 3, 1, 2]
//! ```
//!
//! The position of an entry in these arrays is the flat observation index
//! used by every per-observation array passed to
//! [`compute`](crate::solver::BundleAdjuster::compute).
//!
//! [`VisibilityIndex`] is built once by a single pass over the arrays and
//! is immutable afterwards, so it can be shared freely across concurrent
//! computations.

use std::collections::HashMap;

use crate::error::{SbaError, SbaResult};

/// Immutable bidirectional map between flat observation indices and
/// (viewpoint, point) pairs, with adjacency lists in both directions.
#[derive(Debug, Clone)]
pub struct VisibilityIndex {
    viewpoint_count: usize,
    point_count: usize,
    /// Observation index -> viewpoint index
    viewpoint_of: Vec<usize>,
    /// Observation index -> point index
    point_of: Vec<usize>,
    /// Viewpoint index -> ordered observation indices
    by_viewpoint: Vec<Vec<usize>>,
    /// Point index -> ordered observation indices
    by_point: Vec<Vec<usize>>,
    /// (point, viewpoint) -> observation index, for shared-point queries
    pair_lookup: HashMap<(usize, usize), usize>,
}

impl VisibilityIndex {
    /// Build the index from parallel per-observation index arrays.
    ///
    /// Both arrays must have the same non-zero length. Viewpoint and point
    /// labels are dense: the entity counts are `max label + 1`.
    pub fn new(viewpoint_indices: &[usize], point_indices: &[usize]) -> SbaResult<Self> {
        if viewpoint_indices.len() != point_indices.len() {
            return Err(SbaError::Configuration(format!(
                "index arrays must have equal length: {} viewpoint indices vs {} point indices",
                viewpoint_indices.len(),
                point_indices.len()
            )));
        }
        if viewpoint_indices.is_empty() {
            return Err(SbaError::Configuration(
                "at least one observation is required".to_string(),
            ));
        }

        let viewpoint_count = viewpoint_indices.iter().max().copied().unwrap_or(0) + 1;
        let point_count = point_indices.iter().max().copied().unwrap_or(0) + 1;

        let mut by_viewpoint = vec![Vec::new(); viewpoint_count];
        let mut by_point = vec![Vec::new(); point_count];
        let mut pair_lookup = HashMap::with_capacity(viewpoint_indices.len());

        for (ij, (&j, &i)) in viewpoint_indices.iter().zip(point_indices).enumerate() {
            if pair_lookup.insert((i, j), ij).is_some() {
                return Err(SbaError::Configuration(format!(
                    "duplicate observation of point {i} from viewpoint {j}"
                )));
            }
            by_viewpoint[j].push(ij);
            by_point[i].push(ij);
        }

        Ok(Self {
            viewpoint_count,
            point_count,
            viewpoint_of: viewpoint_indices.to_vec(),
            point_of: point_indices.to_vec(),
            by_viewpoint,
            by_point,
            pair_lookup,
        })
    }

    /// Number of viewpoints `m`
    pub fn viewpoint_count(&self) -> usize {
        self.viewpoint_count
    }

    /// Number of points `n`
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Total number of observations `N`
    pub fn observation_count(&self) -> usize {
        self.viewpoint_of.len()
    }

    /// Viewpoint observing a given observation
    pub fn viewpoint_of(&self, observation: usize) -> usize {
        self.viewpoint_of[observation]
    }

    /// Point observed by a given observation
    pub fn point_of(&self, observation: usize) -> usize {
        self.point_of[observation]
    }

    /// Ordered observation indices made from viewpoint `j`
    pub fn observations_of_viewpoint(&self, j: usize) -> &[usize] {
        &self.by_viewpoint[j]
    }

    /// Ordered observation indices of point `i`
    pub fn observations_of_point(&self, i: usize) -> &[usize] {
        &self.by_point[i]
    }

    /// Aligned observation pairs `(ij, ik)` over the points visible from
    /// both viewpoint `j` and viewpoint `k`.
    ///
    /// Empty when the two viewpoints share no point. For `j == k` every
    /// observation of `j` is paired with itself. Runs in time proportional
    /// to the number of observations of `j`.
    pub fn shared_observations(&self, j: usize, k: usize) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        for &ij in &self.by_viewpoint[j] {
            let i = self.point_of[ij];
            if let Some(&ik) = self.pair_lookup.get(&(i, k)) {
                pairs.push((ij, ik));
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_index() -> VisibilityIndex {
        // Viewpoint 0 sees points {0,1,2,3}, viewpoint 1 sees {0,2,3},
        // viewpoint 2 sees {1,2}.
        let viewpoint_indices = [0, 0, 0, 0, 1, 1, 1, 2, 2];
        let point_indices = [0, 1, 2, 3, 0, 2, 3, 1, 2];
        VisibilityIndex::new(&viewpoint_indices, &point_indices).unwrap()
    }

    #[test]
    fn test_counts() {
        let index = example_index();
        assert_eq!(index.viewpoint_count(), 3);
        assert_eq!(index.point_count(), 4);
        assert_eq!(index.observation_count(), 9);
    }

    #[test]
    fn test_adjacency() {
        let index = example_index();
        assert_eq!(index.observations_of_viewpoint(0), &[0, 1, 2, 3]);
        assert_eq!(index.observations_of_viewpoint(1), &[4, 5, 6]);
        assert_eq!(index.observations_of_viewpoint(2), &[7, 8]);
        assert_eq!(index.observations_of_point(0), &[0, 4]);
        assert_eq!(index.observations_of_point(2), &[2, 5, 8]);
    }

    #[test]
    fn test_observation_lookup() {
        let index = example_index();
        assert_eq!(index.viewpoint_of(5), 1);
        assert_eq!(index.point_of(5), 2);
        assert_eq!(index.viewpoint_of(8), 2);
        assert_eq!(index.point_of(8), 2);
    }

    #[test]
    fn test_shared_observations_aligned_by_point() {
        let index = example_index();
        // Viewpoints 0 and 1 share points {0, 2, 3}.
        assert_eq!(index.shared_observations(0, 1), vec![(0, 4), (2, 5), (3, 6)]);
        // Reversed query pairs the same points in viewpoint 1's order.
        assert_eq!(index.shared_observations(1, 0), vec![(4, 0), (5, 2), (6, 3)]);
        // Viewpoints 1 and 2 share only point 2.
        assert_eq!(index.shared_observations(1, 2), vec![(5, 8)]);
    }

    #[test]
    fn test_shared_observations_self() {
        let index = example_index();
        assert_eq!(
            index.shared_observations(1, 1),
            vec![(4, 4), (5, 5), (6, 6)]
        );
    }

    #[test]
    fn test_shared_observations_disjoint() {
        // Viewpoint 0 sees points {0,1}, viewpoint 1 sees points {2,3}.
        let index = VisibilityIndex::new(&[0, 0, 1, 1], &[0, 1, 2, 3]).unwrap();
        assert!(index.shared_observations(0, 1).is_empty());
        assert!(index.shared_observations(1, 0).is_empty());
    }

    #[test]
    fn test_mismatched_lengths_rejected() {
        let result = VisibilityIndex::new(&[0, 1], &[0]);
        assert!(matches!(result, Err(SbaError::Configuration(_))));
    }

    #[test]
    fn test_empty_rejected() {
        let result = VisibilityIndex::new(&[], &[]);
        assert!(matches!(result, Err(SbaError::Configuration(_))));
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let result = VisibilityIndex::new(&[0, 0], &[1, 1]);
        assert!(matches!(result, Err(SbaError::Configuration(_))));
    }
}
