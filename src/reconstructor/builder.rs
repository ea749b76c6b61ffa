use std::{
    fs,
    path::{Path, PathBuf},
    sync::RwLock,
};

use serde::{Deserialize, Serialize};

use super::Reconstructor;
use crate::{
    calibration::{InteractionMatrix, Normalization, SlopeToModeMatrix, Truncation},
    slopes::{CenterReference, SlopeComputer},
    zernike::{DerivativeTable, ZernikeMode},
    Builder, FromBuilder, PupilPoint, ReconError, Result, RotationPolicy, SpotGeometry,
};

/// [Reconstructor] builder
///
/// Default properties:
///  * spot positions: (0.5,0.5), (0.5,-0.5), (-0.5,0.5), (-0.5,-0.5)
///  * number of modes: 5 (tip, tilt, focus and astigmatisms)
///  * rotation: 0 degree applied to the spot geometry
///  * scale: 1
///  * flip: 1
///  * truncation: singular values below 1e-10 of the largest one are discarded
///  * center reference: calibration center
///
/// # Examples
///
/// ```
/// use zernike_recon::{Builder, FromBuilder, Reconstructor};
/// let recon = Reconstructor::builder().n_modes(5).build().unwrap();
/// assert_eq!(recon.interaction_matrix().shape(), (8, 5));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructorBuilder {
    /// Number of subapertures, checked against the number of spot positions
    pub n_spots: Option<usize>,
    /// Number of Zernike modes, piston excluded
    pub n_modes: usize,
    /// Rotation angle in degrees
    pub rotation_angle: f64,
    pub rotation_policy: RotationPolicy,
    pub scale: f64,
    /// Sign of the modes with a negative azimuthal frequency, either 1 or -1
    pub flip: i32,
    pub center_reference: CenterReference,
    pub truncation: Truncation,
    pub spot_positions: Vec<PupilPoint>,
    /// Interaction matrix replacing the one of the spot geometry
    #[serde(skip)]
    pub interaction: Option<InteractionMatrix>,
}
impl Default for ReconstructorBuilder {
    fn default() -> Self {
        Self {
            n_spots: None,
            n_modes: 5,
            rotation_angle: 0f64,
            rotation_policy: RotationPolicy::default(),
            scale: 1f64,
            flip: 1,
            center_reference: CenterReference::default(),
            truncation: Truncation::default(),
            spot_positions: SpotGeometry::default().positions().to_vec(),
            interaction: None,
        }
    }
}
impl FromBuilder for Reconstructor {
    type ComponentBuilder = ReconstructorBuilder;
}

/// Configuration file operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TomlAccess {
    Read,
    Write,
}
impl std::fmt::Display for TomlAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TomlAccess::Read => write!(f, "read"),
            TomlAccess::Write => write!(f, "write"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReconstructorBuilderError {
    #[error("failed to {access} reconstructor configuration {path:?}")]
    Io {
        access: TomlAccess,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid reconstructor configuration")]
    Parse(#[from] toml::de::Error),
    #[error("reconstructor configuration is not representable in toml")]
    Format(#[from] toml::ser::Error),
}
impl ReconstructorBuilderError {
    fn io(access: TomlAccess, path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| Self::Io {
            access,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// ## `Reconstructor` builder
impl ReconstructorBuilder {
    /// Reads the configuration from a toml file
    ///
    /// Missing fields take their default values
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ReconstructorBuilderError> {
        let path = path.as_ref();
        let config = fs::read_to_string(path)
            .map_err(ReconstructorBuilderError::io(TomlAccess::Read, path))?;
        log::info!("reconstructor configuration loaded from {path:?}");
        Ok(toml::from_str(&config)?)
    }
    /// Writes the configuration into a toml file
    ///
    /// An imported interaction matrix is not part of the configuration file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> std::result::Result<(), ReconstructorBuilderError> {
        let path = path.as_ref();
        let config = toml::to_string_pretty(self)?;
        fs::write(path, config).map_err(ReconstructorBuilderError::io(TomlAccess::Write, path))
    }
    /// Uses an existing interaction matrix instead of the one of the spot geometry
    ///
    /// The number of modes is set to the number of columns of the matrix
    pub fn interaction_matrix(self, interaction: InteractionMatrix) -> Self {
        Self {
            n_modes: interaction.n_modes(),
            interaction: Some(interaction),
            ..self
        }
    }
    /// Set the number of Zernike modes, piston excluded
    pub fn n_modes(self, n_modes: usize) -> Self {
        Self { n_modes, ..self }
    }
    /// Set the expected number of subapertures
    pub fn n_spots(self, n_spots: usize) -> Self {
        Self {
            n_spots: Some(n_spots),
            ..self
        }
    }
    /// Set the subaperture positions on the unit disk
    pub fn spot_positions<P: Into<PupilPoint>>(self, spot_positions: Vec<P>) -> Self {
        Self {
            spot_positions: spot_positions.into_iter().map(|p| p.into()).collect(),
            ..self
        }
    }
    /// Set the subaperture positions from a [SpotGeometry]
    ///
    /// The geometry rotation is also copied
    pub fn spot_geometry(self, geometry: SpotGeometry) -> Self {
        Self {
            rotation_angle: geometry.rotation_angle(),
            rotation_policy: geometry.policy(),
            spot_positions: geometry.positions().to_vec(),
            ..self
        }
    }
    /// Set the rotation angle in degrees, applied to the spot geometry
    pub fn rotation(self, rotation_angle: f64) -> Self {
        Self {
            rotation_angle,
            ..self
        }
    }
    /// Set where the rotation is applied
    pub fn rotation_policy(self, rotation_policy: RotationPolicy) -> Self {
        Self {
            rotation_policy,
            ..self
        }
    }
    /// Set the global scale factor
    pub fn scale(self, scale: f64) -> Self {
        Self { scale, ..self }
    }
    /// Set the sign of the modes with a negative azimuthal frequency
    pub fn flip(self, flip: i32) -> Self {
        Self { flip, ..self }
    }
    /// Set the pseudo-inverse truncation
    pub fn truncation<T: Into<Truncation>>(self, truncation: T) -> Self {
        Self {
            truncation: truncation.into(),
            ..self
        }
    }
    /// Set the spot the subaperture displacements are measured from
    pub fn center_reference(self, center_reference: CenterReference) -> Self {
        Self {
            center_reference,
            ..self
        }
    }
    fn validate(&self) -> Result<()> {
        if self.n_modes == 0 {
            return Err(ReconError::InvalidConfig(
                "the number of modes must be at least 1".into(),
            ));
        }
        if self.flip.abs() != 1 {
            return Err(ReconError::InvalidConfig(format!(
                "flip must be 1 or -1, found {}",
                self.flip
            )));
        }
        if !self.scale.is_finite() || !self.rotation_angle.is_finite() {
            return Err(ReconError::InvalidConfig(format!(
                "scale ({}) and rotation angle ({}) must be finite",
                self.scale, self.rotation_angle
            )));
        }
        if let Some(p) = self
            .spot_positions
            .iter()
            .find(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(ReconError::InvalidConfig(format!(
                "spot positions must be finite, found ({},{})",
                p.x, p.y
            )));
        }
        if let Some(interaction) = &self.interaction {
            if interaction.n_modes() != self.n_modes {
                return Err(ReconError::InvalidConfig(format!(
                    "{} modes expected, the interaction matrix has {} columns",
                    self.n_modes,
                    interaction.n_modes()
                )));
            }
        }
        let n_given = self
            .interaction
            .as_ref()
            .map_or(self.spot_positions.len(), |interaction| interaction.n_spots());
        match self.n_spots {
            Some(n_spots) if n_spots != n_given => Err(ReconError::InvalidConfig(format!(
                "{} spots expected, {} given",
                n_spots, n_given
            ))),
            _ => Ok(()),
        }
    }
}

impl Builder for ReconstructorBuilder {
    type Component = Reconstructor;

    fn build(self) -> Result<Self::Component> {
        self.validate()?;
        let (geometry, interaction) = match &self.interaction {
            Some(interaction) => {
                log::info!("imported {interaction}");
                (None, interaction.clone())
            }
            None => {
                let geometry = SpotGeometry::new(self.spot_positions.clone())
                    .rotation(self.rotation_angle, self.rotation_policy);
                if geometry.n_spots() == 0 {
                    return Err(ReconError::SingularGeometry);
                }
                let normalization = Normalization {
                    scale: self.scale,
                    flip: self.flip as f64,
                };
                let table = DerivativeTable::build(self.n_modes + 2);
                let interaction = InteractionMatrix::build_with_table(
                    &geometry,
                    self.n_modes,
                    &normalization,
                    &table,
                )?;
                (Some(geometry), interaction)
            }
        };
        let n_spots = interaction.n_spots();
        let slope_to_mode = SlopeToModeMatrix::pseudo_inverse(&interaction, self.truncation)?;
        log::info!("{slope_to_mode}");
        if slope_to_mode.rank() < self.n_modes {
            log::warn!(
                "{} modes for {} spots: only {} independent directions are reconstructed",
                self.n_modes,
                n_spots,
                slope_to_mode.rank()
            );
        }
        Ok(Reconstructor {
            modes: (0..self.n_modes).map(ZernikeMode::from_index).collect(),
            slope_computer: SlopeComputer::new(n_spots).reference(self.center_reference),
            geometry,
            interaction,
            slope_to_mode,
            measurement: RwLock::new(None),
            config: self,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config() {
        assert!(matches!(
            Reconstructor::builder().n_modes(0).build(),
            Err(ReconError::InvalidConfig(_))
        ));
        assert!(matches!(
            Reconstructor::builder().flip(2).build(),
            Err(ReconError::InvalidConfig(_))
        ));
        assert!(matches!(
            Reconstructor::builder().n_spots(5).build(),
            Err(ReconError::InvalidConfig(_))
        ));
        assert!(matches!(
            Reconstructor::builder()
                .spot_positions(Vec::<(f64, f64)>::new())
                .build(),
            Err(ReconError::SingularGeometry)
        ));
    }

    #[test]
    fn non_finite_positions() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                Reconstructor::builder()
                    .spot_positions(vec![(0.5, 0.5), (0.5, -0.5), (-0.5, 0.5), (bad, -0.5)])
                    .build(),
                Err(ReconError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn non_finite_toml_positions() -> anyhow::Result<()> {
        let builder: ReconstructorBuilder = toml::from_str(
            r#"
            spot_positions = [{ x = 0.5, y = nan }, { x = -0.5, y = 0.5 }]
            "#,
        )?;
        assert!(matches!(builder.build(), Err(ReconError::InvalidConfig(_))));
        Ok(())
    }

    #[test]
    fn imported_interaction_matrix() {
        let recon = Reconstructor::builder().build().unwrap();
        let interaction = recon.interaction_matrix().clone();
        let imported = Reconstructor::builder()
            .spot_positions(Vec::<(f64, f64)>::new())
            .interaction_matrix(interaction.clone())
            .build()
            .unwrap();
        assert!(imported.geometry().is_none());
        assert_eq!(imported.n_spots(), 4);
        assert_eq!(
            imported.slope_to_mode_matrix().as_matrix(),
            recon.slope_to_mode_matrix().as_matrix()
        );
        assert!(matches!(
            Reconstructor::builder()
                .interaction_matrix(interaction.clone())
                .n_modes(3)
                .build(),
            Err(ReconError::InvalidConfig(_))
        ));
        assert!(matches!(
            Reconstructor::builder()
                .interaction_matrix(interaction)
                .n_spots(5)
                .build(),
            Err(ReconError::InvalidConfig(_))
        ));
    }

    #[test]
    fn toml() -> anyhow::Result<()> {
        let path = std::env::temp_dir().join("zernike_recon_builder.toml");
        let builder = ReconstructorBuilder::default()
            .n_modes(9)
            .rotation(12.5)
            .flip(-1)
            .truncation(1usize);
        builder.save(&path)?;
        let loaded = ReconstructorBuilder::load(&path)?;
        assert_eq!(builder, loaded);
        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn partial_toml() -> anyhow::Result<()> {
        let builder: ReconstructorBuilder = toml::from_str(
            r#"
            n_modes = 3
            scale = 2.0
            "#,
        )?;
        assert_eq!(builder.n_modes, 3);
        assert_eq!(builder.spot_positions.len(), 4);
        assert_eq!(builder.flip, 1);
        Ok(())
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            ReconstructorBuilder::load("does/not/exist.toml"),
            Err(ReconstructorBuilderError::Io {
                access: TomlAccess::Read,
                ..
            })
        ));
    }
}
