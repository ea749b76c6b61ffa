use std::fmt::Display;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::{
    zernike::{DerivativeTable, Parity, ZernikeMode},
    ReconError, Result, RotationPolicy, Slopes, SpotGeometry,
};

type Mat = DMatrix<f64>;

/// Modal normalization of the interaction matrix columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Normalization {
    /// Global scale factor
    pub scale: f64,
    /// Sign applied to the modes with a negative azimuthal frequency
    pub flip: f64,
}
impl Default for Normalization {
    fn default() -> Self {
        Self {
            scale: 1f64,
            flip: 1f64,
        }
    }
}
impl Normalization {
    /// Returns the normalization coefficients of the first `n_modes` non-piston modes
    pub fn coefficients(&self, n_modes: usize) -> Vec<f64> {
        (0..n_modes)
            .map(ZernikeMode::from_index)
            .map(|mode| {
                if mode.m < 0 {
                    self.scale * self.flip
                } else {
                    self.scale
                }
            })
            .collect()
    }
}

/// Mode to slopes matrix
///
/// Column `k` holds the x slopes followed by the y slopes of the Zernike mode `j=k+2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionMatrix {
    pub(crate) matrix: Mat,
    pub(crate) n_spots: usize,
}
impl InteractionMatrix {
    /// Builds the interaction matrix of `n_modes` modes for the given spot geometry
    pub fn build(
        geometry: &SpotGeometry,
        n_modes: usize,
        normalization: &Normalization,
    ) -> Result<Self> {
        // the sine/cosine partner of the last mode may be needed to rotate the basis
        let table = DerivativeTable::build(n_modes + 2);
        Self::build_with_table(geometry, n_modes, normalization, &table)
    }
    /// Builds the interaction matrix using a pre-computed derivative table
    pub fn build_with_table(
        geometry: &SpotGeometry,
        n_modes: usize,
        normalization: &Normalization,
        table: &DerivativeTable,
    ) -> Result<Self> {
        let n_spots = geometry.n_spots();
        let points = geometry.sampling_points();
        let norm = normalization.coefficients(n_modes);
        let mut matrix = Mat::zeros(2 * n_spots, n_modes);
        for (k, nk) in norm.into_iter().enumerate() {
            let mode = ZernikeMode::from_index(k);
            let (dx, dy) = match geometry.policy() {
                RotationPolicy::Modes if geometry.rotation_angle() != 0f64 => {
                    rotated_derivative(table, &mode, geometry.rotation_angle().to_radians(), &points)?
                }
                _ => table.derivative(mode.j, &points)?,
            };
            for (i, (dxi, dyi)) in dx.into_iter().zip(dy).enumerate() {
                matrix[(i, k)] = nk * dxi;
                matrix[(i + n_spots, k)] = nk * dyi;
            }
        }
        log::info!(
            "interaction matrix: {} slopes x {} modes",
            matrix.nrows(),
            matrix.ncols()
        );
        Ok(Self { matrix, n_spots })
    }
    /// Returns the number of rows and columns of the interaction matrix
    pub fn shape(&self) -> (usize, usize) {
        self.matrix.shape()
    }
    pub fn n_spots(&self) -> usize {
        self.n_spots
    }
    pub fn n_modes(&self) -> usize {
        self.matrix.ncols()
    }
    pub fn as_matrix(&self) -> &Mat {
        &self.matrix
    }
    /// Returns the slopes of the wavefront with the given mode coefficients
    pub fn slopes(&self, coefficients: &[f64]) -> Result<Slopes> {
        if coefficients.len() != self.n_modes() {
            return Err(ReconError::dimension(
                "mode coefficients",
                self.n_modes(),
                coefficients.len(),
            ));
        }
        let z = nalgebra::DVector::from_column_slice(coefficients);
        Ok((&self.matrix * z).into())
    }
}
impl Display for InteractionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (nrows, ncols) = self.shape();
        write!(f, "interaction matrix: {nrows}x{ncols}")
    }
}

/// Derivatives of a mode of the modal basis rotated by `angle`
///
/// A cosine mode becomes `cos(|m|α)·Zc + sin(|m|α)·Zs` and
/// a sine mode `cos(|m|α)·Zs − sin(|m|α)·Zc`
fn rotated_derivative(
    table: &DerivativeTable,
    mode: &ZernikeMode,
    angle: f64,
    points: &[crate::PupilPoint],
) -> Result<(Vec<f64>, Vec<f64>)> {
    let (dx, dy) = table.derivative(mode.j, points)?;
    let Some(partner) = mode.partner() else {
        return Ok((dx, dy));
    };
    let (pdx, pdy) = table.derivative(partner.j, points)?;
    let (s, c) = (mode.m.unsigned_abs() as f64 * angle).sin_cos();
    let s = match mode.parity() {
        Parity::Sine => -s,
        _ => s,
    };
    let mix = |a: Vec<f64>, b: Vec<f64>| -> Vec<f64> {
        a.into_iter().zip(b).map(|(a, b)| c * a + s * b).collect()
    };
    Ok((mix(dx, pdx), mix(dy, pdy)))
}
