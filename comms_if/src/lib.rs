//! # Communications interface crate.
//!
//! Provides the communications interface between the controller and the
//! driving simulator.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Network parameters and event framing
pub mod net;

/// Message definitions for the simulator (telemetry in, steering out)
pub mod sim;
