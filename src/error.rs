use crate::reconstructor::ReconstructorBuilderError;

#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error("invalid Zernike mode index: {0}")]
    InvalidModeIndex(usize),
    #[error("invalid Zernike radial degree and azimuthal frequency: (n={0},m={1})")]
    InvalidMode(usize, i32),
    #[error("{what}: expected {expected} values, found {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("the interaction matrix has no singular value above the cutoff, change the spot geometry")]
    SingularGeometry,
    #[error("invalid reconstructor configuration: {0}")]
    InvalidConfig(String),
    #[error("cannot load or save `::zernike_recon::ReconstructorBuilder`")]
    Builder(#[from] ReconstructorBuilderError),
    #[error("cannot export matrices")]
    Export(#[from] serde_pickle::Error),
    #[error("matrix export I/O failed")]
    Io(#[from] std::io::Error),
}

impl ReconError {
    pub(crate) fn dimension(what: &'static str, expected: usize, found: usize) -> Self {
        Self::DimensionMismatch {
            what,
            expected,
            found,
        }
    }
}
