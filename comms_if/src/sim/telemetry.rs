//! Telemetry event sent by the simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::ProtocolError;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A snapshot of the vehicle's state and the upcoming reference waypoints.
///
/// Position, heading and waypoints are all given in the simulator's world frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// World X position
    pub x: f64,

    /// World Y position
    pub y: f64,

    /// Heading in radians
    pub psi: f64,

    /// Current speed
    pub speed: f64,

    /// Current steering angle in radians
    pub steering_angle: f64,

    /// Current throttle
    pub throttle: f64,

    /// World X coordinates of the reference waypoints
    pub ptsx: Vec<f64>,

    /// World Y coordinates of the reference waypoints
    pub ptsy: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Telemetry {
    /// Check that the waypoint sequences pair up.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.ptsx.len() != self.ptsy.len() {
            return Err(ProtocolError::WaypointLengthMismatch {
                ptsx: self.ptsx.len(),
                ptsy: self.ptsy.len(),
            });
        }

        Ok(())
    }

    /// Number of reference waypoints.
    pub fn num_waypoints(&self) -> usize {
        self.ptsx.len()
    }
}
