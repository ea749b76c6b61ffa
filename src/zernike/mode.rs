use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{ReconError, Result};

/// Conventional names of the first non-piston modes, starting at tip (j=2)
const MODE_NAMES: [&str; 10] = [
    "Tip",
    "Tilt",
    "Focus",
    "Astig1",
    "Astig2",
    "Coma1",
    "Coma2",
    "Trefoil1",
    "Trefoil2",
    "Spherical",
];

/// Angular dependency of a Zernike mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    /// m = 0
    Radial,
    /// m > 0, even Noll index
    Cosine,
    /// m < 0, odd Noll index
    Sine,
}

/// Maps a Noll index to the radial degree and the signed azimuthal frequency
///
/// Within a radial order the modes are sorted by ascending |m|,
/// even indices are the cosine terms (m ≥ 0) and odd indices the sine terms (m < 0).
///
/// ```
/// use zernike_recon::zernike::index_to_mode;
/// assert_eq!(index_to_mode(5).unwrap(), (2, -2));
/// ```
pub fn index_to_mode(j: usize) -> Result<(usize, i32)> {
    if j < 1 {
        return Err(ReconError::InvalidModeIndex(j));
    }
    let mut n = 0usize;
    let mut residual = j - 1;
    while residual > n {
        n += 1;
        residual -= n;
    }
    let abs_m = (n % 2) + 2 * ((residual + (n + 1) % 2) / 2);
    let m = if j % 2 == 0 {
        abs_m as i32
    } else {
        -(abs_m as i32)
    };
    Ok((n, m))
}

/// Maps a radial degree and a signed azimuthal frequency back to its Noll index
pub fn mode_to_index(n: usize, m: i32) -> Result<usize> {
    let abs_m = m.unsigned_abs() as usize;
    if abs_m > n || (n - abs_m) % 2 != 0 {
        return Err(ReconError::InvalidMode(n, m));
    }
    // first index of the radial order
    let j0 = n * (n + 1) / 2 + 1;
    (j0..j0 + n + 1)
        .find(|&j| matches!(index_to_mode(j), Ok((_, mj)) if mj == m))
        .ok_or(ReconError::InvalidMode(n, m))
}

/// Zernike mode descriptor
///
/// The working mode set excludes piston:
/// the linear index `k` starts at 0 for tip, i.e. the Noll index is `j = k + 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZernikeMode {
    /// Noll index
    pub j: usize,
    /// Radial degree
    pub n: usize,
    /// Signed azimuthal frequency
    pub m: i32,
}
impl ZernikeMode {
    /// Creates the mode from its Noll index
    pub fn from_noll(j: usize) -> Result<Self> {
        let (n, m) = index_to_mode(j)?;
        Ok(Self { j, n, m })
    }
    /// Creates the mode from its position `k` in the piston-free mode set
    pub fn from_index(k: usize) -> Self {
        let j = k + 2;
        // j ≥ 2 never fails
        let (n, m) = index_to_mode(j).unwrap_or((1, 1));
        Self { j, n, m }
    }
    /// Position of the mode in the piston-free mode set
    ///
    /// Piston has no position and returns `None`
    pub fn index(&self) -> Option<usize> {
        self.j.checked_sub(2)
    }
    pub fn parity(&self) -> Parity {
        match self.m {
            0 => Parity::Radial,
            m if m > 0 => Parity::Cosine,
            _ => Parity::Sine,
        }
    }
    /// Returns the mode with the same radial degree and the opposite azimuthal frequency
    ///
    /// Radial modes have no partner
    pub fn partner(&self) -> Option<Self> {
        if self.m == 0 {
            return None;
        }
        mode_to_index(self.n, -self.m)
            .ok()
            .map(|j| Self {
                j,
                n: self.n,
                m: -self.m,
            })
    }
    /// Conventional name of the mode, if any
    pub fn name(&self) -> Option<&'static str> {
        self.index().and_then(|k| MODE_NAMES.get(k).copied())
    }
    /// RMS normalization factor over the unit disk
    pub fn normalization(&self) -> f64 {
        let n = self.n as f64;
        if self.m == 0 {
            (n + 1.).sqrt()
        } else {
            (2. * (n + 1.)).sqrt()
        }
    }
}
impl Display for ZernikeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Z{} (n={},m={})", self.j, self.n, self.m)?;
        if let Some(name) = self.name() {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noll_table() {
        let noll = [
            (2, (1, 1)),
            (3, (1, -1)),
            (4, (2, 0)),
            (5, (2, -2)),
            (6, (2, 2)),
            (7, (3, -1)),
            (8, (3, 1)),
            (9, (3, -3)),
            (10, (3, 3)),
            (11, (4, 0)),
        ];
        for (j, nm) in noll {
            assert_eq!(index_to_mode(j).unwrap(), nm, "j={j}");
        }
    }

    #[test]
    fn piston() {
        assert_eq!(index_to_mode(1).unwrap(), (0, 0));
        assert!(ZernikeMode::from_noll(1).unwrap().index().is_none());
    }

    #[test]
    fn invalid_index() {
        assert!(matches!(
            index_to_mode(0),
            Err(ReconError::InvalidModeIndex(0))
        ));
    }

    #[test]
    fn inverse_mapping() {
        for j in 1..=66 {
            let (n, m) = index_to_mode(j).unwrap();
            assert_eq!(mode_to_index(n, m).unwrap(), j);
        }
        assert!(mode_to_index(2, 1).is_err());
        assert!(mode_to_index(1, 3).is_err());
    }

    #[test]
    fn partners() {
        let coma = ZernikeMode::from_noll(7).unwrap();
        assert_eq!(coma.parity(), Parity::Sine);
        assert_eq!(coma.partner().unwrap().j, 8);
        assert!(ZernikeMode::from_noll(11).unwrap().partner().is_none());
    }

    #[test]
    fn names() {
        assert_eq!(ZernikeMode::from_index(0).name(), Some("Tip"));
        assert_eq!(ZernikeMode::from_index(9).name(), Some("Spherical"));
        assert_eq!(ZernikeMode::from_index(10).name(), None);
    }
}
