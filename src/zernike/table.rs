use serde::{Deserialize, Serialize};

use super::{Polynomial, ZernikeMode};
use crate::{PupilPoint, ReconError, Result};

/// A Zernike polynomial and its partial derivatives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub mode: ZernikeMode,
    pub value: Polynomial,
    pub dx: Polynomial,
    pub dy: Polynomial,
}

/// Cartesian expansions of the Zernike polynomials and of their derivatives
///
/// The table is built once for Noll indices 1 to `max_mode_index` and
/// every evaluation afterwards is a weighted sum of monomials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivativeTable {
    entries: Vec<TableEntry>,
}
impl DerivativeTable {
    /// Builds the table for the Noll indices in `1..=max_mode_index`
    pub fn build(max_mode_index: usize) -> Self {
        let entries: Vec<_> = (1..=max_mode_index)
            .filter_map(|j| ZernikeMode::from_noll(j).ok())
            .map(|mode| {
                let value = Polynomial::zernike(&mode);
                TableEntry {
                    mode,
                    dx: value.dx(),
                    dy: value.dy(),
                    value,
                }
            })
            .collect();
        log::debug!(
            "Zernike derivative table: {} modes, {} terms",
            entries.len(),
            entries
                .iter()
                .map(|e| e.dx.len() + e.dy.len())
                .sum::<usize>()
        );
        Self { entries }
    }
    /// Largest Noll index in the table
    pub fn max_mode_index(&self) -> usize {
        self.entries.len()
    }
    /// Returns the table entry of the Noll index `j`
    pub fn entry(&self, j: usize) -> Result<&TableEntry> {
        j.checked_sub(1)
            .and_then(|i| self.entries.get(i))
            .ok_or(ReconError::InvalidModeIndex(j))
    }
    /// Evaluates the x and y derivatives of mode `j` at each point
    pub fn derivative(&self, j: usize, points: &[PupilPoint]) -> Result<(Vec<f64>, Vec<f64>)> {
        let entry = self.entry(j)?;
        Ok(points
            .iter()
            .map(|p| (entry.dx.eval(p.x, p.y), entry.dy.eval(p.x, p.y)))
            .unzip())
    }
    /// Evaluates mode `j` at each point
    pub fn value(&self, j: usize, points: &[PupilPoint]) -> Result<Vec<f64>> {
        let entry = self.entry(j)?;
        Ok(points.iter().map(|p| entry.value.eval(p.x, p.y)).collect())
    }
}
