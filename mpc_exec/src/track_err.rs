//! # Tracking error estimator
//!
//! With the vehicle at the origin of the frame the fitted path is expressed in, the cross track
//! error is simply the path's Y value at `x = 0` and the heading error is the negated angle of the
//! path's tangent there.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::path_fit::PolyModel;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of elements in the state vector passed to the optimizer.
pub const STATE_LEN: usize = 6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The state handed to the optimizer, in the vehicle frame.
///
/// Position and heading are always zero, the vehicle being the frame origin.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct VehicleState {
    pub x_m: f64,
    pub y_m: f64,
    pub psi_rad: f64,
    pub speed: f64,

    /// Cross track error
    pub cte_m: f64,

    /// Heading error
    pub epsi_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// Assemble the state from the fitted path and the current speed.
    pub fn from_model(model: &PolyModel, speed: f64) -> Self {
        Self {
            x_m: 0.0,
            y_m: 0.0,
            psi_rad: 0.0,
            speed,
            cte_m: cross_track_error(model),
            epsi_rad: heading_error(model),
        }
    }

    /// The state as the vector `[x, y, psi, v, cte, epsi]`.
    pub fn as_array(&self) -> [f64; STATE_LEN] {
        [
            self.x_m,
            self.y_m,
            self.psi_rad,
            self.speed,
            self.cte_m,
            self.epsi_rad,
        ]
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Cross track error, the path's Y value at the vehicle.
///
/// This is exactly the constant coefficient.
pub fn cross_track_error(model: &PolyModel) -> f64 {
    model.coeffs()[0]
}

/// Heading error, `-atan` of the path slope at the vehicle.
pub fn heading_error(model: &PolyModel) -> f64 {
    -model.coeffs()[1].atan()
}
