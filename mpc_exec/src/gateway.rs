//! # Session gateway
//!
//! The gateway turns one inbound simulator frame into (at most) one outbound frame. Telemetry is
//! run through the whole pipeline:
//!
//! 1. Waypoints are moved into the vehicle frame.
//! 2. A cubic is fitted through them.
//! 3. Cross track and heading errors are taken from the fit to build the state.
//! 4. MpcCtrl invokes the optimizer and tags the solution with its release deadline.
//! 5. The solution and a sample of the fitted reference line are encoded as a `steer` event.
//!
//! Frames without a payload get the manual driving acknowledgement straight away. Anything which
//! cannot be processed is reported as a [`GatewayError`] and the event is dropped; the session
//! itself carries on.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info};
use serde::Deserialize;
use tokio::time::Instant;

use comms_if::sim::{Frame, ProtocolError, SteerCommand, Telemetry, MANUAL_REPLY};
use util::module::State;

use crate::{
    frame::{VehicleFrameWaypoints, VehiclePose},
    mpc_ctrl::{self, DeferredCommand, LatencyModel, MpcCtrl, MpcCtrlError, Optimizer},
    path_fit::{FitError, PolyModel, NUM_COEFFS},
    track_err::VehicleState,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the gateway.
#[derive(Deserialize, Debug, Clone)]
pub struct GatewayParams {
    /// Number of points in the reference line sample
    #[serde(default = "default_ref_line_count")]
    pub ref_line_count: usize,

    /// X spacing of the reference line sample
    #[serde(default = "default_ref_line_spacing")]
    pub ref_line_spacing: f64,
}

/// A reply frame along with the instant it may be sent.
pub type Reply = DeferredCommand<String>;

/// Per-session gateway, owning the session's controller and optimizer.
pub struct SessionGateway {
    mpc_ctrl: MpcCtrl,

    params: GatewayParams,

    /// Number of telemetry events which produced a command
    num_commands: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons an inbound event is dropped without a reply.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Could not fit the reference path: {0}")]
    Fit(#[from] FitError),

    #[error("Controller error: {0}")]
    Controller(#[from] MpcCtrlError),

    #[error("Could not encode the steer event: {0}")]
    Encode(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for GatewayParams {
    fn default() -> Self {
        Self {
            ref_line_count: default_ref_line_count(),
            ref_line_spacing: default_ref_line_spacing(),
        }
    }
}

impl SessionGateway {
    /// Create a gateway for a new session.
    pub fn new(
        optimizer: Box<dyn Optimizer>,
        latency: LatencyModel,
        params: GatewayParams,
    ) -> Self {
        let mpc_ctrl = match MpcCtrl::init((optimizer, latency)) {
            Ok(c) => c,
            Err(never) => match never {},
        };

        Self {
            mpc_ctrl,
            params,
            num_commands: 0,
        }
    }

    /// Handle one text frame received at `arrival`.
    ///
    /// Returns `Ok(None)` if the frame needs no reply (not an event, or an unknown event).
    pub fn handle_text(
        &mut self,
        text: &str,
        arrival: Instant,
    ) -> Result<Option<Reply>, GatewayError> {
        match Frame::decode(text)? {
            Frame::NotAnEvent => Ok(None),
            Frame::Manual => Ok(Some(DeferredCommand::immediate(
                arrival,
                String::from(MANUAL_REPLY),
            ))),
            Frame::Unknown(event) => {
                debug!("Ignoring unknown event \"{}\"", event);
                Ok(None)
            }
            Frame::Telemetry(telemetry) => self.handle_telemetry(&telemetry, arrival).map(Some),
        }
    }

    /// Run telemetry through the pipeline, producing the deferred `steer` frame.
    pub fn handle_telemetry(
        &mut self,
        telemetry: &Telemetry,
        arrival: Instant,
    ) -> Result<Reply, GatewayError> {
        // Reject short paths before they reach the fitter
        if telemetry.num_waypoints() < NUM_COEFFS {
            return Err(FitError::DegenerateFit {
                required: NUM_COEFFS,
                found: telemetry.num_waypoints(),
            }
            .into());
        }

        let pose = VehiclePose::from_telemetry(telemetry);
        let waypoints = VehicleFrameWaypoints::from_world(&telemetry.ptsx, &telemetry.ptsy, &pose);
        let model = PolyModel::fit_waypoints(&waypoints)?;
        let state = VehicleState::from_model(&model, telemetry.speed);

        let (next_x, next_y) = model.sample(self.params.ref_line_count, self.params.ref_line_spacing);

        let (solution, report) = self.mpc_ctrl.proc(&mpc_ctrl::InputData {
            state,
            model,
            arrival,
        })?;

        info!(
            "Angle: {:.5}, Acc: {:.5} (cte: {:.3}, epsi: {:.4})",
            solution.command.steering, solution.command.throttle, report.cte_m, report.epsi_rad
        );

        match serde_json::to_string(&report) {
            Ok(status) => debug!("MpcCtrl status: {}", status),
            Err(e) => debug!("Could not serialise the MpcCtrl status: {}", e),
        }

        let release_at = solution.release_at;
        let sol = solution.command;
        let cmd = SteerCommand {
            steering_angle: sol.steering,
            throttle: sol.throttle,
            mpc_x: sol.traj_x_m,
            mpc_y: sol.traj_y_m,
            next_x,
            next_y,
        };

        let frame = cmd.to_frame().map_err(GatewayError::Encode)?;
        self.num_commands += 1;

        Ok(DeferredCommand {
            release_at,
            command: frame,
        })
    }

    /// Number of commands this gateway has produced.
    pub fn num_commands(&self) -> u64 {
        self.num_commands
    }

    /// Number of optimizer solves made for this session.
    pub fn num_solves(&self) -> u64 {
        self.mpc_ctrl.num_solves()
    }
}

fn default_ref_line_count() -> usize {
    25
}

fn default_ref_line_spacing() -> f64 {
    2.5
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mpc_ctrl::OptimizerError;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    struct ScriptedOptimizer {
        result: Vec<f64>,
        calls: Arc<AtomicUsize>,
    }

    impl Optimizer for ScriptedOptimizer {
        fn solve(&mut self, _: &[f64; 6], _: &[f64]) -> Result<Vec<f64>, OptimizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    fn gateway(result: Vec<f64>) -> (SessionGateway, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let gw = SessionGateway::new(
            Box::new(ScriptedOptimizer {
                result,
                calls: calls.clone(),
            }),
            LatencyModel::from_millis(100),
            GatewayParams::default(),
        );
        (gw, calls)
    }

    fn telemetry_frame(ptsx: &str, ptsy: &str) -> String {
        format!(
            "42[\"telemetry\",{{\"x\":0,\"y\":0,\"psi\":0,\"speed\":12.5,\
             \"steering_angle\":0,\"throttle\":0,\"ptsx\":{},\"ptsy\":{}}}]",
            ptsx, ptsy
        )
    }

    fn payload(frame: &str) -> serde_json::Value {
        let body: serde_json::Value = serde_json::from_str(&frame[2..]).unwrap();
        assert_eq!(body[0], "steer");
        body[1].clone()
    }

    #[test]
    fn test_manual_reply() {
        let (mut gw, calls) = gateway(vec![0.0, 0.0]);
        let arrival = Instant::now();

        let reply = gw
            .handle_text("42[\"telemetry\",null]", arrival)
            .unwrap()
            .unwrap();

        assert_eq!(reply.command, "42[\"manual\",{}]");
        assert_eq!(reply.release_at, arrival);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_telemetry_reply() {
        let (mut gw, calls) = gateway(vec![0.1, 0.5, 10.0, 1.0, 20.0, 2.0]);
        let arrival = Instant::now();

        let reply = gw
            .handle_text(&telemetry_frame("[0,1,2,3]", "[0,1,2,3]"), arrival)
            .unwrap()
            .unwrap();

        assert_eq!(reply.release_at, arrival + Duration::from_millis(100));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(gw.num_commands(), 1);
        assert_eq!(gw.num_solves(), 1);

        let p = payload(&reply.command);
        assert_eq!(p["steering_angle"], 0.1);
        assert_eq!(p["throttle"], 0.5);
        assert_eq!(p["mpc_x"], serde_json::json!([10.0, 20.0]));
        assert_eq!(p["mpc_y"], serde_json::json!([1.0, 2.0]));

        // Reference line follows y = x, independent of the predicted trajectory
        let next_x: Vec<f64> = serde_json::from_value(p["next_x"].clone()).unwrap();
        let next_y: Vec<f64> = serde_json::from_value(p["next_y"].clone()).unwrap();
        assert_eq!(next_x.len(), 25);
        assert_eq!(next_y.len(), 25);
        for (i, (x, y)) in next_x.iter().zip(next_y.iter()).enumerate() {
            assert_eq!(*x, 2.5 * i as f64);
            assert!((y - x).abs() < 1e-6);
        }
        assert_eq!(next_x[24], 60.0);
    }

    #[test]
    fn test_degenerate_fit_not_invoked() {
        let (mut gw, calls) = gateway(vec![0.0, 0.0]);

        let err = gw
            .handle_text(&telemetry_frame("[0,1,2]", "[0,1,2]"), Instant::now())
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Fit(FitError::DegenerateFit {
                required: 4,
                found: 3
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_odd_optimizer_result() {
        let (mut gw, _) = gateway(vec![0.1, 0.5, 10.0, 1.0, 20.0]);

        let err = gw
            .handle_text(&telemetry_frame("[0,1,2,3]", "[0,1,2,3]"), Instant::now())
            .unwrap_err();

        assert!(matches!(
            err,
            GatewayError::Controller(MpcCtrlError::Contract(
                mpc_ctrl::OptimizerContract::OddTrajectory(3)
            ))
        ));
        assert_eq!(gw.num_commands(), 0);
    }

    #[test]
    fn test_ignored_frames() {
        let (mut gw, calls) = gateway(vec![0.0, 0.0]);

        assert!(gw.handle_text("42[\"reset\",{}]", Instant::now()).unwrap().is_none());
        assert!(gw.handle_text("2", Instant::now()).unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_malformed_frame() {
        let (mut gw, _) = gateway(vec![0.0, 0.0]);

        assert!(matches!(
            gw.handle_text("42[\"telemetry\",{\"x\":1}]", Instant::now()),
            Err(GatewayError::Protocol(ProtocolError::InvalidTelemetry(_)))
        ));
    }

    #[test]
    fn test_with_kinematic_optimizer() {
        let mut gw = SessionGateway::new(
            Box::new(crate::mpc_ctrl::KinematicOptimizer::new(Default::default())),
            LatencyModel::from_millis(100),
            GatewayParams::default(),
        );

        // Vehicle facing +X with the road running parallel 2 units to its left
        let frame = "42[\"telemetry\",{\"x\":5,\"y\":0,\"psi\":0,\"speed\":20,\
            \"steering_angle\":0,\"throttle\":0,\
            \"ptsx\":[0,10,20,30,40,50],\"ptsy\":[2,2,2,2,2,2]}]";

        let reply = gw.handle_text(frame, Instant::now()).unwrap().unwrap();
        let p = payload(&reply.command);

        assert!(p["steering_angle"].as_f64().unwrap() < 0.0);
        assert_eq!(p["mpc_x"].as_array().unwrap().len(), 10);
        assert_eq!(p["mpc_y"].as_array().unwrap().len(), 10);
    }
}
