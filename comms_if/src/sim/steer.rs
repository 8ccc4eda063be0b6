//! Steering event sent back to the simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::STEER_EVENT;
use crate::net::encode_event;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actuation command along with the trajectories the simulator draws.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SteerCommand {
    /// Steering command
    pub steering_angle: f64,

    /// Throttle command
    pub throttle: f64,

    /// Predicted trajectory X, vehicle frame
    pub mpc_x: Vec<f64>,

    /// Predicted trajectory Y, vehicle frame
    pub mpc_y: Vec<f64>,

    /// Reference line X, vehicle frame
    pub next_x: Vec<f64>,

    /// Reference line Y, vehicle frame
    pub next_y: Vec<f64>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SteerCommand {
    /// Encode the command into a `42["steer",{...}]` frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        encode_event(STEER_EVENT, self)
    }
}
