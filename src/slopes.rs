//!
//! # Wavefront sensor slopes
//!
//! Reduction of the raw spot centroids into calibration-relative slopes.
//! The slope vector concatenates the x slopes of all the subapertures
//! followed by the y slopes.

use std::{
    fmt::Display,
    ops::{Sub, SubAssign},
};

use serde::{Deserialize, Serialize};

use crate::{PupilPoint, ReconError, Result};

mod single_shot;
pub use single_shot::{subtract_mean, CalibrationTemplate, ReturnCode};

/// Wavefront sensor slopes
///
/// The first half of the vector holds the x slopes and the second half the y slopes
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Slopes(pub(crate) Vec<f64>);
impl Slopes {
    /// Creates the slopes from the x and y components
    pub fn from_xy(sx: &[f64], sy: &[f64]) -> Result<Self> {
        if sx.len() != sy.len() {
            return Err(ReconError::dimension("y slopes", sx.len(), sy.len()));
        }
        Ok(Self(sx.iter().chain(sy).cloned().collect()))
    }
    /// Returns the length of the slopes vector
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Returns the number of subapertures
    pub fn n_spots(&self) -> usize {
        self.0.len() / 2
    }
    /// x slopes
    pub fn sx(&self) -> &[f64] {
        &self.0[..self.n_spots()]
    }
    /// y slopes
    pub fn sy(&self) -> &[f64] {
        &self.0[self.n_spots()..]
    }
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}
impl Display for Slopes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} slopes", self.len())
    }
}
type V = nalgebra::DVector<f64>;
impl From<&Slopes> for V {
    /// Converts the slopes into a [nalgebra] vector
    fn from(value: &Slopes) -> Self {
        V::from_column_slice(&value.0)
    }
}
impl From<V> for Slopes {
    fn from(value: V) -> Self {
        Self(value.as_slice().to_vec())
    }
}
impl From<Slopes> for Vec<f64> {
    fn from(value: Slopes) -> Self {
        value.0
    }
}
impl From<Vec<f64>> for Slopes {
    fn from(value: Vec<f64>) -> Self {
        Self(value)
    }
}
impl<'a> From<&'a [f64]> for Slopes {
    fn from(value: &'a [f64]) -> Self {
        Self(value.to_vec())
    }
}
impl Sub for Slopes {
    type Output = Slopes;

    fn sub(self, rhs: Self) -> Self::Output {
        Slopes(
            self.0
                .into_iter()
                .zip(rhs.0)
                .map(|(x, y)| x - y)
                .collect(),
        )
    }
}
impl SubAssign<&Slopes> for Slopes {
    fn sub_assign(&mut self, rhs: &Slopes) {
        self.0.iter_mut().zip(&rhs.0).for_each(|(x, y)| *x -= y);
    }
}

/// Spot the subaperture displacements are measured from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CenterReference {
    /// The calibration center spot: global tip and tilt are measured
    #[default]
    Calibration,
    /// The input center spot: global tip and tilt are removed
    Input,
}

/// Slope computer for a fixed number of subapertures
///
/// The centroids of both the calibration and the input frames are
/// the center spot followed by the `n_spots` subaperture spots,
/// in the order of the spot geometry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeComputer {
    n_spots: usize,
    reference: CenterReference,
}
impl SlopeComputer {
    pub fn new(n_spots: usize) -> Self {
        Self {
            n_spots,
            reference: CenterReference::default(),
        }
    }
    pub fn reference(self, reference: CenterReference) -> Self {
        Self { reference, ..self }
    }
    pub fn n_spots(&self) -> usize {
        self.n_spots
    }
    /// Splits the raw x and y centroids into the calibration and the input spots
    ///
    /// `raw_x` and `raw_y` are the calibration block followed by the input block,
    /// each block being the center spot followed by the subaperture spots
    pub fn split(&self, raw_x: &[f64], raw_y: &[f64]) -> Result<(Vec<PupilPoint>, Vec<PupilPoint>)> {
        let n = 2 * (self.n_spots + 1);
        if raw_x.len() != n {
            return Err(ReconError::dimension("raw x centroids", n, raw_x.len()));
        }
        if raw_y.len() != n {
            return Err(ReconError::dimension("raw y centroids", n, raw_y.len()));
        }
        let mut points = raw_x
            .iter()
            .zip(raw_y)
            .map(|(&x, &y)| PupilPoint::new(x, y))
            .collect::<Vec<_>>();
        let input = points.split_off(self.n_spots + 1);
        Ok((points, input))
    }
    /// Computes the calibration-relative slopes
    ///
    /// Each input spot is compared to where it would be
    /// if it had moved like the reference center.
    pub fn compute(&self, cal_points: &[PupilPoint], input_points: &[PupilPoint]) -> Result<Slopes> {
        let n = self.n_spots + 1;
        if cal_points.len() != n {
            return Err(ReconError::dimension("calibration spots", n, cal_points.len()));
        }
        if input_points.len() != n {
            return Err(ReconError::dimension("input spots", n, input_points.len()));
        }
        let cal_center = cal_points[0];
        let center = match self.reference {
            CenterReference::Calibration => cal_center,
            CenterReference::Input => input_points[0],
        };
        let (sx, sy): (Vec<f64>, Vec<f64>) = cal_points[1..]
            .iter()
            .zip(&input_points[1..])
            .map(|(&cal, &input)| {
                let offset = cal - cal_center;
                let slope = input - center - offset;
                (slope.x, slope.y)
            })
            .unzip();
        Slopes::from_xy(&sx, &sy)
    }
}

/// Computes the calibration-relative slopes of `n_spots` subapertures
pub fn compute_slopes(
    cal_points: &[PupilPoint],
    input_points: &[PupilPoint],
    n_spots: usize,
) -> Result<Slopes> {
    SlopeComputer::new(n_spots).compute(cal_points, input_points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(xy: &[(f64, f64)]) -> Vec<PupilPoint> {
        xy.iter().map(|&p| p.into()).collect()
    }

    #[test]
    fn slopes_layout() {
        let cal = points(&[(10., 10.), (12., 12.), (12., 8.), (8., 12.), (8., 8.)]);
        let input = points(&[(11., 10.), (12.5, 12.), (12., 8.25), (8., 12.), (7., 8.)]);
        let slopes = compute_slopes(&cal, &input, 4).unwrap();
        assert_eq!(slopes.sx(), &[0.5, 0., 0., -1.]);
        assert_eq!(slopes.sy(), &[0., 0.25, 0., 0.]);
    }

    #[test]
    fn input_reference_removes_tip_tilt() {
        let cal = points(&[(0., 0.), (1., 1.), (1., -1.)]);
        let input = points(&[(0.5, -0.25), (1.5, 0.75), (1.5, -1.25)]);
        let slopes = SlopeComputer::new(2)
            .reference(CenterReference::Input)
            .compute(&cal, &input)
            .unwrap();
        assert_eq!(slopes.as_slice(), &[0f64; 4]);
        let slopes = compute_slopes(&cal, &input, 2).unwrap();
        assert_eq!(slopes.as_slice(), &[0.5, 0.5, -0.25, -0.25]);
    }

    #[test]
    fn wrong_number_of_spots() {
        let cal = points(&[(0., 0.), (1., 1.), (1., -1.)]);
        assert!(matches!(
            compute_slopes(&cal, &cal[..2], 2),
            Err(ReconError::DimensionMismatch {
                expected: 3,
                found: 2,
                ..
            })
        ));
        assert!(compute_slopes(&cal, &cal, 3).is_err());
    }

    #[test]
    fn split_raw_centroids() {
        let computer = SlopeComputer::new(2);
        let raw_x = [0., 1., 2., 3., 4., 5.];
        let raw_y = [6., 7., 8., 9., 10., 11.];
        let (cal, input) = computer.split(&raw_x, &raw_y).unwrap();
        assert_eq!(cal, points(&[(0., 6.), (1., 7.), (2., 8.)]));
        assert_eq!(input, points(&[(3., 9.), (4., 10.), (5., 11.)]));
        assert!(computer.split(&raw_x[..5], &raw_y).is_err());
        assert!(computer.split(&raw_x, &raw_y[1..]).is_err());
    }
}
