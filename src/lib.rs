//!
//! # Shack-Hartmann slopes to Zernike modes reconstructor
//!
//! The crate converts the spot centroids of a Shack-Hartmann wavefront sensor
//! into the coefficients of the Zernike modes (Noll ordering, piston excluded).
//!
//! The [Reconstructor] is created with its builder:
//! ```
//! use zernike_recon::{Builder, FromBuilder, Reconstructor};
//! let recon = Reconstructor::builder()
//!     .n_modes(5)
//!     .rotation(0.)
//!     .build()
//!     .unwrap();
//! println!("{recon}");
//! ```
//! The builder is also the configuration of the reconstructor
//! and it can be loaded from and saved to a toml file.
//!
//! The building blocks of the reconstructor are available on their own:
//!  - [zernike]: Zernike modes and the derivatives of the Zernike polynomials,
//!  - [geometry]: subaperture positions on the pupil,
//!  - [calibration]: interaction matrix and its pseudo-inverse,
//!  - [slopes]: reduction of the raw centroids into slopes.

pub mod calibration;
pub mod error;
pub mod geometry;
pub mod reconstructor;
pub mod slopes;
pub mod zernike;

#[doc(inline)]
pub use self::calibration::{
    DenseMatrix, InteractionMatrix, MatrixExport, Normalization, SlopeToModeMatrix, Truncation,
};
#[doc(inline)]
pub use self::error::ReconError;
#[doc(inline)]
pub use self::geometry::{PupilPoint, RotationPolicy, SpotGeometry};
#[doc(inline)]
pub use self::reconstructor::{
    Advisory, Coefficients, Measurement, Reconstructor, ReconstructorBuilder,
    ReconstructorBuilderError, Wavefront,
};
#[doc(inline)]
pub use self::slopes::{
    compute_slopes, CalibrationTemplate, CenterReference, ReturnCode, SlopeComputer, Slopes,
};
#[doc(inline)]
pub use self::zernike::ZernikeMode;

pub type Result<T> = std::result::Result<T, ReconError>;

/// Reconstructor components builder
pub trait Builder: Default + Sized {
    type Component;
    /// Returns the default builder
    fn new() -> Self {
        Default::default()
    }
    /// Builds the component
    fn build(self) -> Result<Self::Component>;
}

/// Reconstructor components associated builder
pub trait FromBuilder: Sized {
    type ComponentBuilder: Builder<Component = Self>;
    /// Returns the component builder
    fn builder() -> Self::ComponentBuilder {
        Self::ComponentBuilder::new()
    }
}
