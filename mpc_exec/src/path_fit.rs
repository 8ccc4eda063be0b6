//! # Path fitter
//!
//! Fits a polynomial `y = c0 + c1 x + c2 x^2 + ...` through the vehicle frame waypoints by linear
//! least squares. The design matrix holds the monomials of each point's X coordinate and the
//! system is solved through a Householder QR decomposition, which stays well behaved for the
//! overdetermined case where more waypoints are given than coefficients.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, DVector};

use util::maths::poly_eval;

use crate::frame::VehicleFrameWaypoints;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Order of the polynomial fitted to the reference path.
pub const POLY_ORDER: usize = 3;

/// Number of coefficients of the fitted polynomial.
pub const NUM_COEFFS: usize = POLY_ORDER + 1;

/// Relative size under which a diagonal element of R is treated as zero.
const RANK_TOLERANCE: f64 = 1e-10;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A fitted cubic, coefficients ordered lowest power first.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PolyModel {
    coeffs: [f64; NUM_COEFFS],
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FitError {
    #[error("Degenerate fit: {required} points are required for the fit but only {found} were given")]
    DegenerateFit { required: usize, found: usize },

    #[error("Number of x values ({xs}) doesn't match the number of y values ({ys})")]
    LengthMismatch { xs: usize, ys: usize },

    #[error("Degenerate fit: the points do not determine a unique polynomial")]
    RankDeficient,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PolyModel {
    /// Fit a cubic through the points.
    ///
    /// At least [`NUM_COEFFS`] points are needed, fewer is rejected with
    /// [`FitError::DegenerateFit`]. Points which cannot determine a unique polynomial (for
    /// instance too few distinct X values) are rejected with [`FitError::RankDeficient`].
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self, FitError> {
        if xs.len() != ys.len() {
            return Err(FitError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }

        if xs.len() < NUM_COEFFS {
            return Err(FitError::DegenerateFit {
                required: NUM_COEFFS,
                found: xs.len(),
            });
        }

        // Vandermonde design matrix, column j holds x^j
        let a = DMatrix::from_fn(xs.len(), NUM_COEFFS, |i, j| xs[i].powi(j as i32));
        let b = DVector::from_column_slice(ys);

        let qr = a.qr();
        let r = qr.r();

        let max_diag = r.diagonal().iter().fold(0f64, |m, d| m.max(d.abs()));
        if !max_diag.is_finite()
            || r
                .diagonal()
                .iter()
                .any(|d| d.abs() <= RANK_TOLERANCE * max_diag)
        {
            return Err(FitError::RankDeficient);
        }

        let qtb = qr.q().transpose() * b;
        let solution = r
            .solve_upper_triangular(&qtb)
            .ok_or(FitError::RankDeficient)?;

        if solution.iter().any(|c| !c.is_finite()) {
            return Err(FitError::RankDeficient);
        }

        let mut coeffs = [0.0; NUM_COEFFS];
        coeffs.copy_from_slice(solution.as_slice());

        Ok(Self { coeffs })
    }

    /// Fit the standard order polynomial through vehicle frame waypoints.
    pub fn fit_waypoints(waypoints: &VehicleFrameWaypoints) -> Result<Self, FitError> {
        Self::fit(&waypoints.xs_m_vf, &waypoints.ys_m_vf)
    }

    /// Build a model directly from its coefficients, lowest power first.
    pub fn from_coeffs(coeffs: [f64; NUM_COEFFS]) -> Self {
        Self { coeffs }
    }

    pub fn coeffs(&self) -> &[f64; NUM_COEFFS] {
        &self.coeffs
    }

    /// Evaluate the polynomial at `x`.
    pub fn eval(&self, x: f64) -> f64 {
        poly_eval(&self.coeffs, x)
    }

    /// Sample the polynomial at `count` evenly spaced X values starting at zero.
    ///
    /// Returns the X and Y values of the samples.
    pub fn sample(&self, count: usize, spacing: f64) -> (Vec<f64>, Vec<f64>) {
        (0..count)
            .map(|i| {
                let x = spacing * i as f64;
                (x, self.eval(x))
            })
            .unzip()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cubic(c: &[f64; NUM_COEFFS], x: f64) -> f64 {
        c[0] + c[1] * x + c[2] * x * x + c[3] * x * x * x
    }

    #[test]
    fn test_recovers_exact_cubic() {
        let truths = [
            [1.0, -0.5, 0.02, -0.001],
            [-3.2, 0.0, 0.0, 0.0005],
            [0.0, 1.0, 0.0, 0.0],
        ];

        for c in truths.iter() {
            for n in [4usize, 6, 12].iter() {
                let xs: Vec<f64> = (0..*n).map(|i| -5.0 + 2.5 * i as f64).collect();
                let ys: Vec<f64> = xs.iter().map(|&x| cubic(c, x)).collect();

                let model = PolyModel::fit(&xs, &ys).unwrap();
                for (fit, truth) in model.coeffs().iter().zip(c.iter()) {
                    assert!((fit - truth).abs() < 1e-6, "fit {:?} truth {:?}", model, c);
                }
            }
        }
    }

    #[test]
    fn test_least_squares_overdetermined() {
        // Noisy points, so no cubic passes through them all
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = (0..10).map(|i| if i % 2 == 0 { 2.5 } else { 1.5 }).collect();

        let model = PolyModel::fit(&xs, &ys).unwrap();

        // The least squares residual is orthogonal to every column of the design matrix
        let residuals: Vec<f64> = xs
            .iter()
            .zip(ys.iter())
            .map(|(&x, &y)| model.eval(x) - y)
            .collect();
        assert!(residuals.iter().any(|r| r.abs() > 0.1));
        for j in 0..NUM_COEFFS {
            let dot: f64 = xs
                .iter()
                .zip(residuals.iter())
                .map(|(x, r)| x.powi(j as i32) * r)
                .sum();
            assert_abs_diff_eq!(dot, 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_degenerate_fit() {
        assert_eq!(
            PolyModel::fit(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0]),
            Err(FitError::DegenerateFit {
                required: 4,
                found: 3
            })
        );
        assert_eq!(
            PolyModel::fit(&[], &[]),
            Err(FitError::DegenerateFit {
                required: 4,
                found: 0
            })
        );
    }

    #[test]
    fn test_rank_deficient() {
        // Enough points, but only two distinct x values
        let xs = [1.0, 1.0, 2.0, 2.0, 1.0];
        let ys = [0.0, 0.1, 0.5, 0.4, 0.2];
        assert_eq!(PolyModel::fit(&xs, &ys), Err(FitError::RankDeficient));

        let xs = [0.0, 1.0, f64::NAN, 3.0];
        assert_eq!(PolyModel::fit(&xs, &ys[..4]), Err(FitError::RankDeficient));
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(
            PolyModel::fit(&[0.0, 1.0, 2.0, 3.0], &[0.0, 1.0, 2.0]),
            Err(FitError::LengthMismatch { xs: 4, ys: 3 })
        );
    }

    #[test]
    fn test_always_four_coeffs() {
        // A constant line still yields a full cubic, with zero higher terms
        let xs: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let model = PolyModel::fit(&xs, &[1.5; 8]).unwrap();

        assert_eq!(model.coeffs().len(), NUM_COEFFS);
        assert_abs_diff_eq!(model.coeffs()[0], 1.5, epsilon = 1e-9);
        for c in model.coeffs()[1..].iter() {
            assert_abs_diff_eq!(*c, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_eval() {
        let model = PolyModel::from_coeffs([1.0, 2.0, 0.0, 1.0]);
        assert_eq!(model.eval(0.0), 1.0);
        assert_eq!(model.eval(2.0), 13.0);
        assert_eq!(model.eval(-1.0), -2.0);
    }

    #[test]
    fn test_sample() {
        let model = PolyModel::from_coeffs([1.0, 0.5, 0.0, 0.0]);
        let (xs, ys) = model.sample(25, 2.5);

        assert_eq!(xs.len(), 25);
        assert_eq!(ys.len(), 25);
        assert_eq!(xs[0], 0.0);
        assert_eq!(xs[1], 2.5);
        assert_eq!(xs[24], 60.0);
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_eq!(*y, 1.0 + 0.5 * x);
        }
    }
}
