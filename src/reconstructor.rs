//!
//! # Modal reconstructor
//!
//! The reconstructor holds the interaction and the slopes to modes matrices of
//! a wavefront sensor geometry, and the latest measurement of the sensor.
//! The measurement is replaced wholesale on each update and the Zernike
//! coefficients are computed on request.
//!
//! ```
//! use zernike_recon::{Builder, FromBuilder, Reconstructor};
//! let recon = Reconstructor::builder().build().unwrap();
//! // center spot followed by the 4 subaperture spots, calibration then input
//! let raw_x = [0., 0.5, 0.5, -0.5, -0.5, 0., 0.6, 0.6, -0.4, -0.4];
//! let raw_y = [0., 0.5, -0.5, 0.5, -0.5, 0., 0.5, -0.5, 0.5, -0.5];
//! recon.update("t0", &raw_x, &raw_y).unwrap();
//! let wavefront = recon.current_coefficients();
//! assert!((wavefront.coefficients[0] - 0.05).abs() < 1e-12);
//! ```

use std::{
    fmt::Display,
    ops::Deref,
    path::Path,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

use crate::{
    calibration::{InteractionMatrix, MatrixExport, SlopeToModeMatrix},
    slopes::{CalibrationTemplate, ReturnCode, SlopeComputer},
    zernike::ZernikeMode,
    Result, Slopes, SpotGeometry,
};

mod builder;
pub use builder::{ReconstructorBuilder, ReconstructorBuilderError, TomlAccess};

/// Timestamped sensor slopes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub timestamp: String,
    pub slopes: Slopes,
}

/// Zernike coefficients, from tip onward
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Coefficients(Vec<f64>);
impl Coefficients {
    pub fn zeros(n_modes: usize) -> Self {
        Self(vec![0f64; n_modes])
    }
    pub fn has_nan(&self) -> bool {
        self.0.iter().any(|x| x.is_nan())
    }
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
    /// Returns the coefficients paired with their Zernike mode
    pub fn modes(&self) -> impl Iterator<Item = (ZernikeMode, f64)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(k, &c)| (ZernikeMode::from_index(k), c))
    }
}
impl Deref for Coefficients {
    type Target = [f64];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl From<Vec<f64>> for Coefficients {
    fn from(value: Vec<f64>) -> Self {
        Self(value)
    }
}
impl From<Coefficients> for Vec<f64> {
    fn from(value: Coefficients) -> Self {
        value.0
    }
}
impl Display for Coefficients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (mode, c) in self.modes() {
            match mode.name() {
                Some(name) => writeln!(f, "J = {}: {:+.6} ({})", mode.j, c, name)?,
                None => writeln!(f, "J = {}: {:+.6}", mode.j, c)?,
            }
        }
        Ok(())
    }
}

/// Non-fatal conditions of a reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Advisory {
    /// No measurement has been received yet, the coefficients are zero
    NoMeasurementYet,
    /// Some coefficients are NaN
    NumericalDegeneracy,
}

/// Reconstructed wavefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wavefront {
    /// Timestamp of the measurement the coefficients are computed from
    pub timestamp: Option<String>,
    pub coefficients: Coefficients,
    pub advisory: Option<Advisory>,
}
impl Wavefront {
    pub fn has_nan(&self) -> bool {
        self.coefficients.has_nan()
    }
    /// Returns `false` if no measurement has been received yet
    pub fn is_measured(&self) -> bool {
        self.advisory != Some(Advisory::NoMeasurementYet)
    }
}
impl Display for Wavefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.timestamp {
            Some(timestamp) => writeln!(f, "Timestamp: {timestamp}")?,
            None => writeln!(f, "Timestamp: none")?,
        }
        write!(f, "{}", self.coefficients)
    }
}

/// Slopes to Zernike modes reconstructor
///
/// A reconstructor is created with [ReconstructorBuilder], either from a spot
/// geometry or from an existing interaction matrix.
/// It is `Send` and `Sync`: measurements may be pushed from one thread
/// while the coefficients are read from others.
#[derive(Debug)]
pub struct Reconstructor {
    pub(crate) config: ReconstructorBuilder,
    /// Spot geometry, `None` for an imported interaction matrix
    pub(crate) geometry: Option<SpotGeometry>,
    pub(crate) modes: Vec<ZernikeMode>,
    pub(crate) slope_computer: SlopeComputer,
    pub(crate) interaction: InteractionMatrix,
    pub(crate) slope_to_mode: SlopeToModeMatrix,
    pub(crate) measurement: RwLock<Option<Arc<Measurement>>>,
}
impl Reconstructor {
    /// Creates a reconstructor from its configuration
    pub fn new(config: ReconstructorBuilder) -> Result<Self> {
        crate::Builder::build(config)
    }
    /// Updates the measurement from the raw centroids
    ///
    /// `raw_x` and `raw_y` are the calibration centroids followed by the input centroids,
    /// each block being the center spot followed by the subaperture spots.
    /// On error the previous measurement is kept.
    pub fn update<T: Into<String>>(&self, timestamp: T, raw_x: &[f64], raw_y: &[f64]) -> Result<()> {
        let (cal, input) = self.slope_computer.split(raw_x, raw_y)?;
        let slopes = self.slope_computer.compute(&cal, &input)?;
        self.update_slopes(timestamp, slopes)
    }
    /// Updates the measurement with calibration-relative slopes
    pub fn update_slopes<T: Into<String>>(&self, timestamp: T, slopes: Slopes) -> Result<()> {
        let n = 2 * self.n_spots();
        if slopes.len() != n {
            return Err(crate::ReconError::dimension("slopes", n, slopes.len()));
        }
        let measurement = Arc::new(Measurement {
            timestamp: timestamp.into(),
            slopes,
        });
        log::debug!("measurement update: {}", measurement.timestamp);
        *self.measurement.write().unwrap_or_else(|e| e.into_inner()) = Some(measurement);
        Ok(())
    }
    /// Returns the latest measurement
    pub fn latest(&self) -> Option<Arc<Measurement>> {
        self.measurement
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
    /// Converts slopes into Zernike coefficients
    pub fn convert(&self, slopes: &Slopes) -> Result<Coefficients> {
        self.slope_to_mode.coefficients(slopes).map(Coefficients)
    }
    /// Returns the Zernike coefficients of the latest measurement
    ///
    /// If no measurement has been received yet, the coefficients are zero
    /// and the wavefront carries the [Advisory::NoMeasurementYet] advisory
    pub fn current_coefficients(&self) -> Wavefront {
        let Some(measurement) = self.latest() else {
            log::warn!("no measurement yet, returning zero coefficients");
            return Wavefront {
                timestamp: None,
                coefficients: Coefficients::zeros(self.n_modes()),
                advisory: Some(Advisory::NoMeasurementYet),
            };
        };
        // the slopes length is checked at update
        let coefficients = self
            .convert(&measurement.slopes)
            .unwrap_or_else(|_| Coefficients(vec![f64::NAN; self.n_modes()]));
        let advisory = if coefficients.has_nan() {
            log::warn!("NaN Zernike coefficients at {}", measurement.timestamp);
            Some(Advisory::NumericalDegeneracy)
        } else {
            None
        };
        Wavefront {
            timestamp: Some(measurement.timestamp.clone()),
            coefficients,
            advisory,
        }
    }
    /// Computes the Zernike coefficients of a single frame of interleaved
    /// spot coordinates `[x1,y1,...,xn,yn]`
    ///
    /// The stored measurement is left untouched.
    /// The coefficients are zero unless the return code is either
    /// [ReturnCode::Success] or [ReturnCode::NotANumber].
    pub fn single_shot(&self, coords: &[f64], template: &CalibrationTemplate) -> (ReturnCode, Coefficients) {
        let slopes = match template.slopes(coords, self.n_spots()) {
            Ok(slopes) => slopes,
            Err(rc) => {
                log::warn!("single shot: {}", rc.message());
                return (rc, Coefficients::zeros(self.n_modes()));
            }
        };
        match self.convert(&slopes) {
            Ok(coefficients) if coefficients.has_nan() => (ReturnCode::NotANumber, coefficients),
            Ok(coefficients) => (ReturnCode::Success, coefficients),
            Err(_) => (ReturnCode::CountMismatch, Coefficients::zeros(self.n_modes())),
        }
    }
    /// Returns the interaction and the slopes to modes matrices
    pub fn export(&self) -> MatrixExport {
        MatrixExport::new(&self.interaction, &self.slope_to_mode)
    }
    /// Saves the interaction and the slopes to modes matrices into a pickle file
    pub fn dump<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.export().save(path)
    }
    pub fn config(&self) -> &ReconstructorBuilder {
        &self.config
    }
    pub fn geometry(&self) -> Option<&SpotGeometry> {
        self.geometry.as_ref()
    }
    pub fn modes(&self) -> &[ZernikeMode] {
        &self.modes
    }
    pub fn n_spots(&self) -> usize {
        self.interaction.n_spots()
    }
    pub fn n_modes(&self) -> usize {
        self.modes.len()
    }
    pub fn slope_computer(&self) -> &SlopeComputer {
        &self.slope_computer
    }
    pub fn interaction_matrix(&self) -> &InteractionMatrix {
        &self.interaction
    }
    pub fn slope_to_mode_matrix(&self) -> &SlopeToModeMatrix {
        &self.slope_to_mode
    }
}
impl Display for Reconstructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Zernike reconstructor: {} spots, {} modes",
            self.n_spots(),
            self.n_modes()
        )?;
        writeln!(f, " . {}", self.interaction)?;
        write!(f, " . {}", self.slope_to_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, FromBuilder, ReconError};

    fn raw(input_shift: (f64, f64)) -> (Vec<f64>, Vec<f64>) {
        let cal = [(0., 0.), (0.5, 0.5), (0.5, -0.5), (-0.5, 0.5), (-0.5, -0.5)];
        let (mut x, mut y): (Vec<f64>, Vec<f64>) = cal.iter().cloned().unzip();
        x.push(0.);
        y.push(0.);
        for &(cx, cy) in &cal[1..] {
            x.push(cx + input_shift.0);
            y.push(cy + input_shift.1);
        }
        (x, y)
    }

    #[test]
    fn no_measurement_yet() {
        let recon = Reconstructor::builder().build().unwrap();
        let wavefront = recon.current_coefficients();
        assert_eq!(wavefront.coefficients.as_slice(), &[0f64; 5]);
        assert_eq!(wavefront.advisory, Some(Advisory::NoMeasurementYet));
        assert!(!wavefront.is_measured());
        assert!(recon.latest().is_none());
    }

    #[test]
    fn tip_tilt() {
        let recon = Reconstructor::builder().build().unwrap();
        let (x, y) = raw((0.2, -0.1));
        recon.update("t1", &x, &y).unwrap();
        let wavefront = recon.current_coefficients();
        assert_eq!(wavefront.timestamp.as_deref(), Some("t1"));
        assert!(wavefront.advisory.is_none());
        let c = &wavefront.coefficients;
        assert!((c[0] - 0.1).abs() < 1e-12);
        assert!((c[1] + 0.05).abs() < 1e-12);
        assert!(c[2..].iter().all(|x| x.abs() < 1e-12));
    }

    #[test]
    fn rejected_update() {
        let recon = Reconstructor::builder().build().unwrap();
        let (x, y) = raw((0.2, 0.));
        recon.update("t1", &x, &y).unwrap();
        assert!(matches!(
            recon.update("t2", &x[..9], &y),
            Err(ReconError::DimensionMismatch { .. })
        ));
        assert!(recon.update_slopes("t3", Slopes::from(vec![0.; 6])).is_err());
        let latest = recon.latest().unwrap();
        assert_eq!(latest.timestamp, "t1");
    }

    #[test]
    fn single_shot() {
        let recon = Reconstructor::builder().build().unwrap();
        let cal = [0.5, 0.5, 0.5, -0.5, -0.5, 0.5, -0.5, -0.5];
        let template = CalibrationTemplate::from_coords(&cal).unwrap();
        let mut odd = cal.to_vec();
        odd.push(9.);
        assert!(CalibrationTemplate::from_coords(&odd).is_err());
        // focus: the spots move radially
        let coords: Vec<f64> = cal.iter().map(|x| 1.1 * x + 3.).collect();
        let (rc, c) = recon.single_shot(&coords, &template);
        assert!(rc.is_success());
        assert!(c[2] > 0.);
        assert!(c[0].abs() < 1e-12 && c[1].abs() < 1e-12);
        let (rc, c) = recon.single_shot(&coords[..7], &template);
        assert_eq!(rc, ReturnCode::NotPairs);
        assert_eq!(c.as_slice(), &[0f64; 5]);
        let nan = vec![f64::NAN; 8];
        let (rc, _) = recon.single_shot(&nan, &template);
        assert_eq!(rc, ReturnCode::NotANumber);
        assert!(recon.latest().is_none());
    }

    #[test]
    fn nan_advisory() {
        let recon = Reconstructor::builder().build().unwrap();
        let (mut x, y) = raw((0., 0.));
        x[6] = f64::NAN;
        recon.update("nan", &x, &y).unwrap();
        let wavefront = recon.current_coefficients();
        assert!(wavefront.has_nan());
        assert_eq!(wavefront.advisory, Some(Advisory::NumericalDegeneracy));
    }

    #[test]
    fn display() {
        let c = Coefficients::from(vec![0.5, -0.25]);
        assert_eq!(
            c.to_string(),
            "J = 2: +0.500000 (Tip)\nJ = 3: -0.250000 (Tilt)\n"
        );
    }
}
