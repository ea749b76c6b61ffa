use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Parity, ZernikeMode};

/// A term `coefficient · x^px · y^py`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Monomial {
    pub coefficient: f64,
    pub px: u32,
    pub py: u32,
}
impl Monomial {
    #[inline]
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        self.coefficient * x.powi(self.px as i32) * y.powi(self.py as i32)
    }
}

/// Bivariate polynomial in the cartesian pupil coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polynomial(Vec<Monomial>);
impl Polynomial {
    fn from_terms(terms: BTreeMap<(u32, u32), f64>) -> Self {
        Self(
            terms
                .into_iter()
                .filter(|(_, c)| *c != 0f64)
                .map(|((px, py), coefficient)| Monomial {
                    coefficient,
                    px,
                    py,
                })
                .collect(),
        )
    }
    /// Expands the RMS normalized Zernike polynomial of a mode
    ///
    /// Every term `r^(n-2s)·cos(mθ)` of the radial expansion is rewritten as
    /// `(x²+y²)^k·Re((x+iy)^|m|)` (`Im` for the sine terms) with `k=(n-2s-|m|)/2`,
    /// so the expansion is exact everywhere on the pupil, the origin included.
    pub fn zernike(mode: &ZernikeMode) -> Self {
        let ZernikeMode { n, m, .. } = *mode;
        let abs_m = m.unsigned_abs() as usize;
        let norm = mode.normalization();
        // terms of Re or Im of (x+iy)^|m|
        let angular: Vec<(u32, u32, f64)> = (0..=abs_m)
            .filter(|t| match mode.parity() {
                Parity::Sine => t % 2 == 1,
                _ => t % 2 == 0,
            })
            .map(|t| {
                let sign = if (t / 2) % 2 == 0 { 1f64 } else { -1f64 };
                ((abs_m - t) as u32, t as u32, sign * binomial(abs_m, t))
            })
            .collect();
        let mut terms = BTreeMap::new();
        for s in 0..=(n - abs_m) / 2 {
            let radial = radial_coefficient(n, abs_m, s);
            let k = (n - 2 * s - abs_m) / 2;
            for i in 0..=k {
                let ck = binomial(k, i);
                for &(ax, ay, ca) in &angular {
                    let px = ax + 2 * i as u32;
                    let py = ay + 2 * (k - i) as u32;
                    *terms.entry((px, py)).or_insert(0f64) += norm * radial * ck * ca;
                }
            }
        }
        Self::from_terms(terms)
    }
    /// Partial derivative with respect to x
    pub fn dx(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|t| t.px > 0)
                .map(|t| Monomial {
                    coefficient: t.coefficient * t.px as f64,
                    px: t.px - 1,
                    py: t.py,
                })
                .collect(),
        )
    }
    /// Partial derivative with respect to y
    pub fn dy(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|t| t.py > 0)
                .map(|t| Monomial {
                    coefficient: t.coefficient * t.py as f64,
                    px: t.px,
                    py: t.py - 1,
                })
                .collect(),
        )
    }
    #[inline]
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        self.0.iter().map(|t| t.eval(x, y)).sum()
    }
    /// Returns the number of non-zero terms
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn terms(&self) -> &[Monomial] {
        &self.0
    }
}

fn factorial(n: usize) -> f64 {
    (1..=n).fold(1f64, |f, i| f * i as f64)
}

fn binomial(n: usize, k: usize) -> f64 {
    (0..k).fold(1f64, |b, i| b * (n - i) as f64 / (i + 1) as f64)
}

/// Coefficient of `r^(n-2s)` in the radial polynomial R_n^m
fn radial_coefficient(n: usize, abs_m: usize, s: usize) -> f64 {
    let sign = if s % 2 == 0 { 1f64 } else { -1f64 };
    sign * factorial(n - s)
        / (factorial(s) * factorial((n + abs_m) / 2 - s) * factorial((n - abs_m) / 2 - s))
}
