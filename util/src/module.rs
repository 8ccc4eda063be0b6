//! Module interfaces
//!
//! Pipeline stages in `mpc_exec` which own state between invocations (an optimizer, counters)
//! are built and driven through [`State`].

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A stateful pipeline stage.
pub trait State: Sized {
    /// What the stage is built from
    type InitData;
    type InitError;

    /// What one invocation consumes
    type InputData;
    /// What one invocation produces
    type OutputData;
    /// Diagnostics about one invocation, for logging
    type StatusReport;
    type ProcError;

    /// Build the stage.
    fn init(init_data: Self::InitData) -> Result<Self, Self::InitError>;

    /// Run one invocation of the stage.
    ///
    /// On success returns the produced data along with a status report. An error leaves the stage
    /// usable for the next invocation.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
