//! # Kinematic reference optimizer
//!
//! A lightweight stand-in for a full predictive optimizer, so that the executable can drive the
//! simulator on its own. It is not an MPC: steering comes from a proportional law on the cross
//! track and heading errors, throttle from a proportional law on speed, and the "prediction" is a
//! roll-out of the kinematic bicycle model under those constant commands.
//!
//! The steering output is smoothed against the previous solve, so instances carry warm-start
//! state and must not be shared between sessions.
//!
//! Sign conventions: the path and the prediction are in the vehicle frame (X forward, Y left), the
//! steering command is normalised to `[-1, 1]` with positive values steering right, as the
//! simulator expects.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use util::maths::{clamp, deg_to_rad};

use super::{Optimizer, OptimizerError};
use crate::{path_fit::POLY_ORDER, track_err::STATE_LEN};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the kinematic optimizer
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Params {
    /// Steering gain on cross track error
    pub k_cte: f64,

    /// Steering gain on heading error
    pub k_epsi: f64,

    /// Throttle gain on speed error
    pub k_speed: f64,

    /// Speed the throttle law drives toward
    pub ref_speed: f64,

    /// Magnitude limit of the normalised steering command
    pub steer_limit: f64,

    /// Magnitude limit of the throttle command
    pub throttle_limit: f64,

    /// Weight of the previous steering command in the new one, in `[0, 1)`
    pub steer_smoothing: f64,

    /// Physical steering angle at a normalised command of 1.
    ///
    /// Units: degrees
    pub max_steer_deg: f64,

    /// Distance from the front axle to the centre of gravity
    ///
    /// Units: meters
    pub lf_m: f64,

    /// Acceleration produced by a throttle of 1, per second
    pub accel_per_throttle: f64,

    /// Number of points in the predicted trajectory
    pub horizon_steps: usize,

    /// Time between predicted points
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// The kinematic optimizer.
#[derive(Debug, Clone)]
pub struct KinematicOptimizer {
    params: Params,

    /// Steering command of the previous solve
    prev_steering: Option<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            k_cte: 0.1,
            k_epsi: 1.0,
            k_speed: 0.1,
            ref_speed: 40.0,
            steer_limit: 1.0,
            throttle_limit: 1.0,
            steer_smoothing: 0.3,
            max_steer_deg: 25.0,
            lf_m: 2.67,
            accel_per_throttle: 5.0,
            horizon_steps: 10,
            dt_s: 0.1,
        }
    }
}

impl KinematicOptimizer {
    pub fn new(params: Params) -> Self {
        Self {
            params,
            prev_steering: None,
        }
    }

    /// Roll the kinematic bicycle model forward from the vehicle frame origin.
    fn predict(&self, speed: f64, steering: f64, throttle: f64) -> Vec<f64> {
        let p = &self.params;

        // Positive commands steer right, the model turns left for positive angles
        let delta_rad = -steering * deg_to_rad(p.max_steer_deg);
        let accel = throttle * p.accel_per_throttle;

        let mut traj = Vec::with_capacity(2 * p.horizon_steps);
        let (mut x, mut y, mut psi, mut v) = (0f64, 0f64, 0f64, speed);

        for _ in 0..p.horizon_steps {
            x += v * psi.cos() * p.dt_s;
            y += v * psi.sin() * p.dt_s;
            psi += v / p.lf_m * delta_rad * p.dt_s;
            v += accel * p.dt_s;

            traj.push(x);
            traj.push(y);
        }

        traj
    }
}

impl Optimizer for KinematicOptimizer {
    fn solve(
        &mut self,
        state: &[f64; STATE_LEN],
        coeffs: &[f64],
    ) -> Result<Vec<f64>, OptimizerError> {
        if coeffs.len() != POLY_ORDER + 1 {
            return Err(OptimizerError::InvalidInput(format!(
                "expected {} coefficients, got {}",
                POLY_ORDER + 1,
                coeffs.len()
            )));
        }
        if state.iter().chain(coeffs.iter()).any(|v| !v.is_finite()) {
            return Err(OptimizerError::InvalidInput(String::from(
                "state or coefficients are not finite",
            )));
        }

        let p = &self.params;
        let speed = state[3];
        let cte = state[4];
        let epsi = state[5];

        // Turning left (toward +Y) for a path to the left, or a path heading left, means a
        // negative (left) command.
        let raw_steering = -(p.k_cte * cte - p.k_epsi * epsi);
        let steering = match self.prev_steering {
            Some(prev) => p.steer_smoothing * prev + (1.0 - p.steer_smoothing) * raw_steering,
            None => raw_steering,
        };
        let steering = clamp(&steering, &-p.steer_limit, &p.steer_limit);

        let throttle = p.k_speed * (p.ref_speed - speed);
        let throttle = clamp(&throttle, &-p.throttle_limit, &p.throttle_limit);

        self.prev_steering = Some(steering);

        let mut result = vec![steering, throttle];
        result.extend(self.predict(speed, steering, throttle));

        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mpc_ctrl::ControlSolution;

    fn no_smoothing() -> Params {
        Params {
            steer_smoothing: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_on_path_goes_straight() {
        let mut opt = KinematicOptimizer::new(no_smoothing());
        let result = opt
            .solve(&[0.0, 0.0, 0.0, 40.0, 0.0, 0.0], &[0.0; 4])
            .unwrap();

        let sol = ControlSolution::decode(&result).unwrap();
        assert_eq!(sol.steering, 0.0);
        assert_eq!(sol.throttle, 0.0);
        assert_eq!(sol.num_traj_points(), 10);
        assert!(sol.traj_y_m.iter().all(|y| *y == 0.0));
        assert!((sol.traj_x_m[9] - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_steers_toward_path() {
        let mut opt = KinematicOptimizer::new(no_smoothing());

        // Path to the left, so steer left (negative) and the prediction bends to +Y
        let result = opt
            .solve(&[0.0, 0.0, 0.0, 20.0, 2.0, 0.0], &[2.0, 0.0, 0.0, 0.0])
            .unwrap();
        let sol = ControlSolution::decode(&result).unwrap();
        assert!(sol.steering < 0.0);
        assert!(sol.traj_y_m.last().copied().unwrap() > 0.0);

        // Path heading right (epsi > 0), so steer right
        let result = opt
            .solve(&[0.0, 0.0, 0.0, 20.0, 0.0, 0.2], &[0.0, -0.2, 0.0, 0.0])
            .unwrap();
        assert!(result[0] > 0.0);
    }

    #[test]
    fn test_outputs_clamped() {
        let mut opt = KinematicOptimizer::new(no_smoothing());
        let result = opt
            .solve(&[0.0, 0.0, 0.0, 0.0, -500.0, 0.0], &[-500.0, 0.0, 0.0, 0.0])
            .unwrap();

        assert_eq!(result[0], 1.0);
        assert_eq!(result[1], 1.0);
    }

    #[test]
    fn test_warm_start_smoothing() {
        let mut opt = KinematicOptimizer::new(Params {
            steer_smoothing: 0.5,
            ..Default::default()
        });

        let first = opt
            .solve(&[0.0, 0.0, 0.0, 10.0, -4.0, 0.0], &[-4.0, 0.0, 0.0, 0.0])
            .unwrap()[0];
        let second = opt
            .solve(&[0.0, 0.0, 0.0, 10.0, 0.0, 0.0], &[0.0; 4])
            .unwrap()[0];

        assert!((first - 0.4).abs() < 1e-12);
        assert!((second - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_input() {
        let mut opt = KinematicOptimizer::new(Params::default());

        assert!(matches!(
            opt.solve(&[0.0; 6], &[0.0; 3]),
            Err(OptimizerError::InvalidInput(_))
        ));
        assert!(matches!(
            opt.solve(&[0.0, 0.0, 0.0, f64::NAN, 0.0, 0.0], &[0.0; 4]),
            Err(OptimizerError::InvalidInput(_))
        ));
    }
}
