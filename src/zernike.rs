//!
//! # Zernike polynomials
//!
//! Noll ordered, RMS normalized Zernike polynomials over the unit disk:
//! the mode index mapper, the cartesian expansion of the polynomials and
//! the table of their partial derivatives.
//!
//! ```
//! use zernike_recon::{zernike::DerivativeTable, PupilPoint};
//! let table = DerivativeTable::build(3);
//! let (dx, dy) = table.derivative(2, &[PupilPoint::new(0.5, -0.5)]).unwrap();
//! assert_eq!((dx[0], dy[0]), (2., 0.));
//! ```

mod mode;
mod polynomial;
mod table;

pub use mode::{index_to_mode, mode_to_index, Parity, ZernikeMode};
pub use polynomial::{Monomial, Polynomial};
pub use table::{DerivativeTable, TableEntry};
