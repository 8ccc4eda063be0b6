//! MpcCtrl module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::time::Instant as StdInstant;

use log::{debug, trace};
use serde::Serialize;
use tokio::time::Instant;

// Internal
use super::*;
use crate::{path_fit::PolyModel, track_err::VehicleState};
use util::{module::State, time::std_duration_to_millis};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Controller invocation state, owning one optimizer instance.
pub struct MpcCtrl {
    optimizer: Box<dyn Optimizer>,

    latency: LatencyModel,

    /// Number of successful solves
    num_solves: u64,
}

/// Data required by MpcCtrl for one invocation.
#[derive(Debug, Clone)]
pub struct InputData {
    /// The state derived from the current telemetry
    pub state: VehicleState,

    /// The fitted reference path
    pub model: PolyModel,

    /// When the telemetry this invocation answers was received
    pub arrival: Instant,
}

/// The status report for one invocation.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    pub cte_m: f64,
    pub epsi_rad: f64,
    pub num_traj_points: usize,
    pub solve_time_ms: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MpcCtrl {
    /// Number of successful optimizer invocations made by this instance.
    pub fn num_solves(&self) -> u64 {
        self.num_solves
    }
}

impl State for MpcCtrl {
    type InitData = (Box<dyn Optimizer>, LatencyModel);
    type InitError = std::convert::Infallible;

    type InputData = InputData;
    type OutputData = DeferredCommand<ControlSolution>;
    type StatusReport = StatusReport;
    type ProcError = MpcCtrlError;

    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError> {
        let (optimizer, latency) = init_data;

        Ok(Self {
            optimizer,
            latency,
            num_solves: 0,
        })
    }

    /// Invoke the optimizer and decode its result.
    ///
    /// The returned solution carries its release deadline, `arrival + latency`.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let state = input_data.state.as_array();
        trace!("MpcCtrl state: {:?}", state);

        let start = StdInstant::now();
        let result = self.optimizer.solve(&state, input_data.model.coeffs())?;
        let solve_time_ms = std_duration_to_millis(start.elapsed());

        let solution = ControlSolution::decode(&result)?;
        self.num_solves += 1;

        debug!(
            "Optimizer solved in {:.3} ms with {} predicted points",
            solve_time_ms,
            solution.num_traj_points()
        );

        let report = StatusReport {
            cte_m: input_data.state.cte_m,
            epsi_rad: input_data.state.epsi_rad,
            num_traj_points: solution.num_traj_points(),
            solve_time_ms,
        };

        Ok((self.latency.defer(input_data.arrival, solution), report))
    }
}
