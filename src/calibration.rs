//!
//! # Modal calibration
//!
//! The interaction matrix maps the Zernike coefficients to the wavefront sensor slopes,
//! its pseudo-inverse maps the slopes back to the Zernike coefficients.
//!
//! ```
//! use zernike_recon::{InteractionMatrix, Normalization, SlopeToModeMatrix, SpotGeometry, Truncation};
//! let imat = InteractionMatrix::build(&SpotGeometry::default(), 5, &Normalization::default()).unwrap();
//! let s2z = SlopeToModeMatrix::pseudo_inverse(&imat, Truncation::default()).unwrap();
//! assert_eq!(s2z.shape(), (5, 8));
//! ```

use std::{fs::File, path::Path};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{ReconError, Result};

mod interaction;
mod inverse;

pub use interaction::{InteractionMatrix, Normalization};
pub use inverse::{SlopeToModeMatrix, Truncation};

/// Dense matrix with explicit shape, elements stored row-wise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseMatrix {
    pub nrows: usize,
    pub ncols: usize,
    pub data: Vec<f64>,
}
impl DenseMatrix {
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
    /// Returns the element at row `i` and column `j`
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i < self.nrows && j < self.ncols {
            self.data.get(i * self.ncols + j).copied()
        } else {
            None
        }
    }
}
impl From<&DMatrix<f64>> for DenseMatrix {
    fn from(value: &DMatrix<f64>) -> Self {
        let (nrows, ncols) = value.shape();
        Self {
            nrows,
            ncols,
            data: value.transpose().as_slice().to_vec(),
        }
    }
}
impl TryFrom<DenseMatrix> for DMatrix<f64> {
    type Error = ReconError;

    fn try_from(value: DenseMatrix) -> Result<Self> {
        let n = value.nrows * value.ncols;
        if value.data.len() != n {
            return Err(ReconError::dimension("matrix elements", n, value.data.len()));
        }
        Ok(DMatrix::from_row_slice(value.nrows, value.ncols, &value.data))
    }
}

impl TryFrom<DenseMatrix> for InteractionMatrix {
    type Error = ReconError;

    /// Rebuilds an interaction matrix with the x slopes in the first half of the rows
    fn try_from(value: DenseMatrix) -> Result<Self> {
        if value.nrows % 2 != 0 {
            return Err(ReconError::InvalidConfig(format!(
                "an interaction matrix has an even number of rows, found {}",
                value.nrows
            )));
        }
        let n_spots = value.nrows / 2;
        Ok(Self {
            matrix: value.try_into()?,
            n_spots,
        })
    }
}

/// Interaction and slopes to modes matrices of a reconstructor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixExport {
    pub n_spots: usize,
    pub n_modes: usize,
    pub interaction: DenseMatrix,
    pub slope_to_mode: DenseMatrix,
}
impl MatrixExport {
    pub fn new(imat: &InteractionMatrix, s2z: &SlopeToModeMatrix) -> Self {
        Self {
            n_spots: imat.n_spots(),
            n_modes: imat.n_modes(),
            interaction: imat.as_matrix().into(),
            slope_to_mode: s2z.as_matrix().into(),
        }
    }
    /// Returns the exported interaction matrix
    pub fn interaction_matrix(&self) -> Result<InteractionMatrix> {
        let expected = (2 * self.n_spots, self.n_modes);
        if self.interaction.shape() != expected {
            return Err(ReconError::InvalidConfig(format!(
                "interaction matrix shape {:?} does not match {} spots and {} modes",
                self.interaction.shape(),
                self.n_spots,
                self.n_modes
            )));
        }
        self.interaction.clone().try_into()
    }
    /// Writes the matrices into a pickle file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        serde_pickle::to_writer(&mut File::create(path.as_ref())?, self, Default::default())?;
        log::info!("matrices saved to {:?}", path.as_ref());
        Ok(())
    }
    /// Reads the matrices from a pickle file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(serde_pickle::from_reader(
            File::open(path.as_ref())?,
            Default::default(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major() {
        let m = DMatrix::from_row_slice(2, 3, &[1., 2., 3., 4., 5., 6.]);
        let dense = DenseMatrix::from(&m);
        assert_eq!(dense.shape(), (2, 3));
        assert_eq!(dense.data, vec![1., 2., 3., 4., 5., 6.]);
        assert_eq!(dense.get(1, 0), Some(4.));
        assert_eq!(dense.get(2, 0), None);
    }

    #[test]
    fn inconsistent_shape() {
        let dense = DenseMatrix {
            nrows: 2,
            ncols: 2,
            data: vec![1.; 3],
        };
        assert!(DMatrix::<f64>::try_from(dense.clone()).is_err());
        assert_eq!(dense.get(1, 1), None);
        assert_eq!(dense.get(1, 0), Some(1.));
        assert!(InteractionMatrix::try_from(dense).is_err());
    }

    #[test]
    fn interaction_rows() {
        let odd = DenseMatrix {
            nrows: 3,
            ncols: 1,
            data: vec![1.; 3],
        };
        assert!(matches!(
            InteractionMatrix::try_from(odd),
            Err(ReconError::InvalidConfig(_))
        ));
        let dense = DenseMatrix {
            nrows: 4,
            ncols: 1,
            data: vec![2., 2., 0., 0.],
        };
        let imat = InteractionMatrix::try_from(dense).unwrap();
        assert_eq!(imat.n_spots(), 2);
        assert_eq!(imat.n_modes(), 1);
    }
}
