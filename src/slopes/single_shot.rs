use std::fmt::Display;

use serde::{Deserialize, Serialize};

use super::Slopes;
use crate::{ReconError, Result};

/// Status of a single-shot reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReturnCode {
    Success = 0,
    NoInput = 1,
    NotPairs = 2,
    CountMismatch = 3,
    NotANumber = 4,
}
impl ReturnCode {
    pub fn code(&self) -> u8 {
        *self as u8
    }
    pub fn message(&self) -> &'static str {
        match self {
            ReturnCode::Success => "success",
            ReturnCode::NoInput => "no input provided",
            ReturnCode::NotPairs => "input is not a list of x,y pairs",
            ReturnCode::CountMismatch => "input points do not match the number of spots",
            ReturnCode::NotANumber => "computed zernikes are NaN",
        }
    }
    pub fn is_success(&self) -> bool {
        *self == ReturnCode::Success
    }
}
impl Display for ReturnCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RC {}\nMSG {}", self.code(), self.message())
    }
}

/// Removes the mean position from interleaved coordinates `[x1,y1,...,xn,yn]`
///
/// The centered coordinates are returned as slopes, x first then y.
/// An odd number of coordinates is a [ReconError::DimensionMismatch].
pub fn subtract_mean(coords: &[f64]) -> Result<Slopes> {
    if coords.len() % 2 != 0 {
        return Err(ReconError::dimension(
            "interleaved coordinates",
            coords.len() + 1,
            coords.len(),
        ));
    }
    let (x, y): (Vec<f64>, Vec<f64>) = coords.chunks_exact(2).map(|xy| (xy[0], xy[1])).unzip();
    let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len().max(1) as f64;
    let (x_mean, y_mean) = (mean(&x), mean(&y));
    Ok(Slopes(
        x.into_iter()
            .map(|x| x - x_mean)
            .chain(y.into_iter().map(|y| y - y_mean))
            .collect(),
    ))
}

/// Centered spot positions of the calibration frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTemplate(Slopes);
impl CalibrationTemplate {
    /// Creates the template from the interleaved calibration spot coordinates
    pub fn from_coords(coords: &[f64]) -> Result<Self> {
        subtract_mean(coords).map(Self)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Computes the slopes of `n_spots` subapertures from a single frame of
    /// interleaved spot coordinates
    ///
    /// The coordinates are centered on their mean and the template is subtracted
    pub fn slopes(&self, coords: &[f64], n_spots: usize) -> std::result::Result<Slopes, ReturnCode> {
        if coords.is_empty() {
            return Err(ReturnCode::NoInput);
        }
        if coords.len() % 2 != 0 {
            return Err(ReturnCode::NotPairs);
        }
        if coords.len() != 2 * n_spots || self.len() != 2 * n_spots {
            return Err(ReturnCode::CountMismatch);
        }
        let mut slopes = subtract_mean(coords).map_err(|_| ReturnCode::NotPairs)?;
        slopes -= &self.0;
        Ok(slopes)
    }
}
