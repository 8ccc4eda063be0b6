//! MpcCtrl parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for controller invocation
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Delay between telemetry arriving and the resulting command being released.
    ///
    /// Units: milliseconds
    #[serde(default = "default_latency_ms")]
    pub actuation_latency_ms: u64,

    /// Parameters of the built-in kinematic optimizer
    #[serde(default)]
    pub optimizer: super::kinematic::Params,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            actuation_latency_ms: default_latency_ms(),
            optimizer: Default::default(),
        }
    }
}

fn default_latency_ms() -> u64 {
    100
}
