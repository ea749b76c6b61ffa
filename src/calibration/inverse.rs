use std::fmt::Display;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::InteractionMatrix;
use crate::{ReconError, Result, Slopes};

type Mat = DMatrix<f64>;

/// Singular values truncation of the pseudo-inverse
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Truncation {
    /// Singular values below the given fraction of the largest one are discarded
    Relative(f64),
    /// The given number of smallest singular values are discarded
    Discard(usize),
}
impl Default for Truncation {
    fn default() -> Self {
        Truncation::Relative(1e-10)
    }
}
impl From<f64> for Truncation {
    fn from(value: f64) -> Self {
        Truncation::Relative(value)
    }
}
impl From<usize> for Truncation {
    fn from(value: usize) -> Self {
        Truncation::Discard(value)
    }
}

/// Slopes to modes matrix
///
/// Least-squares pseudo-inverse of the [InteractionMatrix]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlopeToModeMatrix {
    pub(crate) matrix: Mat,
    /// Singular values of the interaction matrix, sorted in decreasing order
    pub(crate) singular_values: Vec<f64>,
    /// Number of singular values kept in the pseudo-inverse
    pub(crate) rank: usize,
}
impl SlopeToModeMatrix {
    /// Computes the truncated SVD pseudo-inverse of the interaction matrix
    pub fn pseudo_inverse(imat: &InteractionMatrix, truncation: Truncation) -> Result<Self> {
        let mat = imat.as_matrix().clone();
        if mat.is_empty() {
            return Err(ReconError::SingularGeometry);
        }
        if !mat.iter().all(|x| x.is_finite()) {
            return Err(ReconError::InvalidConfig(
                "the interaction matrix has non-finite elements".into(),
            ));
        }
        let mat_svd = mat.svd(true, true);
        let mut singular_values: Vec<f64> = mat_svd.singular_values.iter().cloned().collect();
        singular_values.sort_by(|a, b| b.total_cmp(a));
        let n = singular_values.len();
        log::info!(
            "interaction matrix singular values range: [{:e},{:e}]",
            singular_values[n - 1],
            singular_values[0]
        );
        let threshold = match truncation {
            Truncation::Relative(rcond) if rcond >= 0f64 => rcond * singular_values[0],
            Truncation::Relative(rcond) => {
                return Err(ReconError::InvalidConfig(format!(
                    "negative singular value cutoff: {rcond}"
                )))
            }
            Truncation::Discard(0) => 0f64,
            Truncation::Discard(k) if k < n => singular_values[n - k],
            Truncation::Discard(_) => return Err(ReconError::SingularGeometry),
        };
        let rank = singular_values.iter().filter(|&&s| s > threshold).count();
        if rank == 0 {
            return Err(ReconError::SingularGeometry);
        }
        if rank < n {
            log::info!(
                "{} out of {} singular values discarded (threshold: {:e})",
                n - rank,
                n,
                threshold
            );
        }
        let matrix = mat_svd
            .pseudo_inverse(threshold)
            .map_err(|msg| ReconError::InvalidConfig(format!("pseudo-inverse: {msg}")))?;
        Ok(Self {
            matrix,
            singular_values,
            rank,
        })
    }
    /// Returns the number of rows and columns of the matrix
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }
    pub fn n_modes(&self) -> usize {
        self.matrix.nrows()
    }
    pub fn n_slopes(&self) -> usize {
        self.matrix.ncols()
    }
    pub fn as_matrix(&self) -> &Mat {
        &self.matrix
    }
    pub fn singular_values(&self) -> &[f64] {
        &self.singular_values
    }
    /// Number of directions kept after truncation
    pub fn rank(&self) -> usize {
        self.rank
    }
    /// Condition number of the kept directions
    pub fn condition_number(&self) -> f64 {
        self.singular_values[0] / self.singular_values[self.rank - 1]
    }
    /// Returns the mode coefficients of the slopes
    pub fn coefficients(&self, slopes: &Slopes) -> Result<Vec<f64>> {
        if slopes.len() != self.n_slopes() {
            return Err(ReconError::dimension("slopes", self.n_slopes(), slopes.len()));
        }
        let s: DVector<f64> = slopes.into();
        Ok((&self.matrix * s).as_slice().to_vec())
    }
}
impl Display for SlopeToModeMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (nrows, ncols) = self.shape();
        write!(
            f,
            "slopes to modes matrix: {nrows}x{ncols} (rank {}, condition number {:.3e})",
            self.rank,
            self.condition_number()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Normalization, SpotGeometry};

    fn imat(n_modes: usize) -> InteractionMatrix {
        InteractionMatrix::build(&SpotGeometry::default(), n_modes, &Normalization::default())
            .unwrap()
    }

    #[test]
    fn full_rank() {
        let s2z = SlopeToModeMatrix::pseudo_inverse(&imat(5), Truncation::default()).unwrap();
        assert_eq!(s2z.shape(), (5, 8));
        assert_eq!(s2z.rank(), 5);
        let a = imat(5);
        let identity = s2z.as_matrix() * a.as_matrix();
        assert!((identity - Mat::identity(5, 5)).amax() < 1e-12);
    }

    #[test]
    fn rank_deficient() {
        // more modes than slopes
        let a = imat(12);
        let s2z = SlopeToModeMatrix::pseudo_inverse(&a, Truncation::default()).unwrap();
        assert_eq!(s2z.shape(), (12, 8));
        assert!(s2z.rank() <= 8);
        assert!(s2z.as_matrix().iter().all(|x| x.is_finite()));
        // A·A⁺·A = A
        let aa = a.as_matrix() * s2z.as_matrix() * a.as_matrix();
        assert!((aa - a.as_matrix()).amax() < 1e-9);
    }

    #[test]
    fn discard() {
        let a = imat(5);
        let s2z = SlopeToModeMatrix::pseudo_inverse(&a, Truncation::Discard(2)).unwrap();
        assert_eq!(s2z.rank(), 3);
        assert!(matches!(
            SlopeToModeMatrix::pseudo_inverse(&a, Truncation::Discard(5)),
            Err(ReconError::SingularGeometry)
        ));
    }

    #[test]
    fn non_finite_interaction() {
        let mut a = imat(5);
        a.matrix[(3, 2)] = f64::NAN;
        assert!(matches!(
            SlopeToModeMatrix::pseudo_inverse(&a, Truncation::default()),
            Err(ReconError::InvalidConfig(_))
        ));
        a.matrix[(3, 2)] = f64::INFINITY;
        assert!(SlopeToModeMatrix::pseudo_inverse(&a, Truncation::default()).is_err());
    }

    #[test]
    fn singular_geometry() {
        let empty = InteractionMatrix::build(
            &SpotGeometry::new(Vec::<(f64, f64)>::new()),
            5,
            &Normalization::default(),
        )
        .unwrap();
        assert!(matches!(
            SlopeToModeMatrix::pseudo_inverse(&empty, Truncation::default()),
            Err(ReconError::SingularGeometry)
        ));
        assert!(matches!(
            SlopeToModeMatrix::pseudo_inverse(&imat(5), Truncation::Relative(1.)),
            Err(ReconError::SingularGeometry)
        ));
    }
}
