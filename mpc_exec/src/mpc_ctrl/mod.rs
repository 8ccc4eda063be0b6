//! # Controller invocation module
//!
//! MpcCtrl hands the vehicle state and the fitted path to a predictive optimizer and decodes what
//! comes back. The optimizer itself sits behind the [`Optimizer`] trait; its result is a flat
//! sequence `[steering, throttle, x0, y0, x1, y1, ...]` where the tail is the predicted
//! trajectory in the vehicle frame.
//!
//! Real actuators do not respond instantly, so a command produced here is not released straight
//! away. Each solution is tagged with a release deadline, the arrival time of the telemetry plus
//! the configured actuation latency, and the transport must not send it before then. The wait is
//! a deferred completion rather than a sleep inside processing, so other sessions (and later
//! telemetry on the same session) are never held up by it.
//!
//! Optimizers may keep state between calls (warm starting), so an instance must never be shared
//! between sessions. Each session builds its own from an [`OptimizerFactory`].

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod kinematic;
mod latency;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

pub use kinematic::KinematicOptimizer;
pub use latency::*;
pub use params::*;
pub use state::*;

use crate::track_err::STATE_LEN;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A predictive optimizer.
pub trait Optimizer: Send {
    /// Solve for the actuation given the state `[x, y, psi, v, cte, epsi]` and the path
    /// coefficients (lowest power first).
    ///
    /// The result holds the steering command, the throttle command, then the predicted trajectory
    /// as interleaved x, y values.
    fn solve(
        &mut self,
        state: &[f64; STATE_LEN],
        coeffs: &[f64],
    ) -> Result<Vec<f64>, OptimizerError>;
}

/// Builds a fresh optimizer for each session.
pub type OptimizerFactory = Arc<dyn Fn() -> Box<dyn Optimizer> + Send + Sync>;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The decoded output of the optimizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlSolution {
    pub steering: f64,
    pub throttle: f64,

    /// Predicted trajectory X values, vehicle frame
    pub traj_x_m: Vec<f64>,

    /// Predicted trajectory Y values, vehicle frame
    pub traj_y_m: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by an optimizer implementation.
#[derive(Debug, thiserror::Error)]
pub enum OptimizerError {
    #[error("Invalid optimizer input: {0}")]
    InvalidInput(String),

    #[error("The optimizer failed to find a solution: {0}")]
    SolveFailed(String),
}

/// Violations of the optimizer's output contract.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OptimizerContract {
    #[error("Optimizer result has {0} elements, at least 2 (steering and throttle) are required")]
    TooShort(usize),

    #[error("Optimizer trajectory has an odd number of elements ({0}), x/y values must be paired")]
    OddTrajectory(usize),
}

/// Errors that can occur during MpcCtrl processing.
#[derive(Debug, thiserror::Error)]
pub enum MpcCtrlError {
    #[error("Optimizer error: {0}")]
    Optimizer(#[from] OptimizerError),

    #[error("Optimizer broke its output contract: {0}")]
    Contract(#[from] OptimizerContract),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlSolution {
    /// Decode a raw optimizer result.
    ///
    /// The trajectory part must pair up exactly, an odd trailing element is reported rather than
    /// dropped.
    pub fn decode(result: &[f64]) -> Result<Self, OptimizerContract> {
        if result.len() < 2 {
            return Err(OptimizerContract::TooShort(result.len()));
        }

        let traj = &result[2..];
        if traj.len() % 2 != 0 {
            return Err(OptimizerContract::OddTrajectory(traj.len()));
        }

        let (traj_x_m, traj_y_m) = traj.chunks_exact(2).map(|p| (p[0], p[1])).unzip();

        Ok(Self {
            steering: result[0],
            throttle: result[1],
            traj_x_m,
            traj_y_m,
        })
    }

    /// Number of predicted trajectory points.
    pub fn num_traj_points(&self) -> usize {
        self.traj_x_m.len()
    }
}
