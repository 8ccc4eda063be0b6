//! # MPC library
//!
//! Everything between the simulator socket and the optimizer: decoding telemetry, moving the
//! waypoints into the vehicle frame, fitting the reference path, estimating the tracking errors,
//! invoking the optimizer and relaying the result back with the actuation latency applied.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Frame transform - moves world frame points into the vehicle frame and back
pub mod frame;

/// Session gateway - runs one simulator frame through the pipeline and builds the reply
pub mod gateway;

/// Controller invocation - calls the optimizer and schedules its command
pub mod mpc_ctrl;

/// Executable parameters
pub mod params;

/// Path fitter - least squares polynomial fit of the waypoints
pub mod path_fit;

/// Simulator server - websocket sessions and the static HTTP page
pub mod sim_server;

/// Tracking error estimator - builds the optimizer's state vector
pub mod track_err;
