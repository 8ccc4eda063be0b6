//! Executable parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// Internal
use crate::{gateway::GatewayParams, mpc_ctrl};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters loaded from `mpc_exec.toml`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ExecParams {
    /// Controller invocation and optimizer parameters, the `[mpc_ctrl]` table
    #[serde(default)]
    pub mpc_ctrl: mpc_ctrl::Params,

    /// Reply construction parameters, the `[gateway]` table
    #[serde(default)]
    pub gateway: GatewayParams,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_exec_params() {
        let params: ExecParams = util::params::from_str(
            r#"
            [mpc_ctrl]
            actuation_latency_ms = 80

            [mpc_ctrl.optimizer]
            ref_speed = 30.0
            horizon_steps = 5

            [gateway]
            ref_line_count = 10
            ref_line_spacing = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(params.mpc_ctrl.actuation_latency_ms, 80);
        assert_eq!(params.gateway.ref_line_count, 10);
        assert_eq!(params.gateway.ref_line_spacing, 5.0);
        assert_eq!(params.mpc_ctrl.optimizer.ref_speed, 30.0);
        assert_eq!(params.mpc_ctrl.optimizer.horizon_steps, 5);

        // Unset values fall back to their defaults
        assert_eq!(params.mpc_ctrl.optimizer.k_epsi, 1.0);
    }

    #[test]
    fn test_empty_exec_params() {
        let params: ExecParams = util::params::from_str("").unwrap();

        assert_eq!(params.mpc_ctrl.actuation_latency_ms, 100);
        assert_eq!(params.gateway.ref_line_count, 25);
        assert_eq!(params.gateway.ref_line_spacing, 2.5);
    }
}
