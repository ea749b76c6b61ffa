//!
//! # Pupil geometry
//!
//! Subaperture positions are given in normalized pupil coordinates,
//! the pupil being the unit disk.

use serde::{Deserialize, Serialize};

/// A point on the pupil plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PupilPoint {
    pub x: f64,
    pub y: f64,
}
impl PupilPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
    /// Distance to the pupil center
    pub fn radius(&self) -> f64 {
        self.x.hypot(self.y)
    }
    /// Counter-clockwise rotation around the pupil center
    pub fn rotate(&self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self {
            x: c * self.x - s * self.y,
            y: s * self.x + c * self.y,
        }
    }
}
impl From<(f64, f64)> for PupilPoint {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}
impl From<[f64; 2]> for PupilPoint {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}
impl From<PupilPoint> for (f64, f64) {
    fn from(p: PupilPoint) -> Self {
        (p.x, p.y)
    }
}
impl std::ops::Sub for PupilPoint {
    type Output = PupilPoint;

    fn sub(self, rhs: Self) -> Self::Output {
        PupilPoint {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Where the rotation of the sensor with respect to the pupil is applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationPolicy {
    /// The spot positions are rotated before the derivatives are evaluated
    #[default]
    Geometry,
    /// The modal basis is rotated, mixing each cosine mode with its sine partner
    Modes,
}

/// Ordered subaperture positions of the wavefront sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotGeometry {
    pub(crate) positions: Vec<PupilPoint>,
    /// Rotation angle in degrees
    pub(crate) rotation: f64,
    pub(crate) policy: RotationPolicy,
}
impl Default for SpotGeometry {
    /// 4 spots on a square at (±0.5,±0.5)
    fn default() -> Self {
        Self::new(vec![
            PupilPoint::new(0.5, 0.5),
            PupilPoint::new(0.5, -0.5),
            PupilPoint::new(-0.5, 0.5),
            PupilPoint::new(-0.5, -0.5),
        ])
    }
}
impl SpotGeometry {
    pub fn new<P: Into<PupilPoint>>(positions: Vec<P>) -> Self {
        Self {
            positions: positions.into_iter().map(|p| p.into()).collect(),
            rotation: 0f64,
            policy: RotationPolicy::default(),
        }
    }
    /// Centers of a `n_side`×`n_side` regular grid of subapertures covering [-1,1]²
    ///
    /// The points are sorted along x first, then along y
    pub fn square_grid(n_side: usize) -> Self {
        let pitch = 2f64 / n_side as f64;
        let coordinate = |i: usize| -1f64 + pitch * (i as f64 + 0.5);
        Self::new(
            (0..n_side)
                .flat_map(|i| (0..n_side).map(move |j| (coordinate(i), coordinate(j))))
                .collect(),
        )
    }
    /// Same as [SpotGeometry::square_grid] but only the subapertures
    /// with their center inside the pupil are kept
    pub fn square_grid_in_pupil(n_side: usize) -> Self {
        let SpotGeometry {
            positions,
            rotation,
            policy,
        } = Self::square_grid(n_side);
        Self {
            positions: positions
                .into_iter()
                .filter(|p| p.radius() <= 1f64)
                .collect(),
            rotation,
            policy,
        }
    }
    /// Sets the rotation angle in degrees and where it is applied
    pub fn rotation(self, rotation: f64, policy: RotationPolicy) -> Self {
        Self {
            rotation,
            policy,
            ..self
        }
    }
    /// Number of subapertures
    pub fn n_spots(&self) -> usize {
        self.positions.len()
    }
    pub fn positions(&self) -> &[PupilPoint] {
        &self.positions
    }
    pub fn rotation_angle(&self) -> f64 {
        self.rotation
    }
    pub fn policy(&self) -> RotationPolicy {
        self.policy
    }
    /// Returns the positions where the derivatives are evaluated
    ///
    /// The positions are rotated only with [RotationPolicy::Geometry]
    pub fn sampling_points(&self) -> Vec<PupilPoint> {
        match self.policy {
            RotationPolicy::Geometry if self.rotation != 0f64 => {
                let angle = self.rotation.to_radians();
                self.positions.iter().map(|p| p.rotate(angle)).collect()
            }
            _ => self.positions.clone(),
        }
    }
}
