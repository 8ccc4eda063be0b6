//! # Frame transform
//!
//! Waypoints arrive in the simulator's World Frame (WF). Everything downstream works in the
//! Vehicle Frame (VF), which has its origin at the vehicle's current position and its X axis along
//! the vehicle's current heading. Moving a point from WF to VF is a translation by the vehicle
//! position followed by a rotation by the negated heading.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{Point2, Rotation2};

use comms_if::sim::Telemetry;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of the vehicle in the world frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VehiclePose {
    /// Position in the WF
    pub position_m_wf: Point2<f64>,

    /// Heading, the angle of the vehicle X axis to the WF X axis
    pub heading_rad: f64,
}

/// Reference waypoints expressed in the vehicle frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleFrameWaypoints {
    pub xs_m_vf: Vec<f64>,
    pub ys_m_vf: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehiclePose {
    pub fn new(x: f64, y: f64, heading_rad: f64) -> Self {
        Self {
            position_m_wf: Point2::new(x, y),
            heading_rad,
        }
    }

    /// Extract the pose from a telemetry snapshot.
    pub fn from_telemetry(telemetry: &Telemetry) -> Self {
        Self::new(telemetry.x, telemetry.y, telemetry.psi)
    }

    /// Express a WF point in the VF.
    pub fn to_vehicle(&self, point_m_wf: &Point2<f64>) -> Point2<f64> {
        let rel = point_m_wf.coords - self.position_m_wf.coords;
        Point2::from(Rotation2::new(-self.heading_rad) * rel)
    }

    /// Express a VF point in the WF. Inverse of [`VehiclePose::to_vehicle`].
    pub fn to_world(&self, point_m_vf: &Point2<f64>) -> Point2<f64> {
        self.position_m_wf + Rotation2::new(self.heading_rad) * point_m_vf.coords
    }
}

impl VehicleFrameWaypoints {
    /// Transform paired WF waypoint coordinates into the VF.
    ///
    /// Coordinates are paired by index; should the slices differ in length the extra elements of
    /// the longer one are ignored. The telemetry decoder rejects such input before it gets here.
    pub fn from_world(ptsx_wf: &[f64], ptsy_wf: &[f64], pose: &VehiclePose) -> Self {
        let (xs_m_vf, ys_m_vf) = ptsx_wf
            .iter()
            .zip(ptsy_wf.iter())
            .map(|(&x, &y)| {
                let p = pose.to_vehicle(&Point2::new(x, y));
                (p.x, p.y)
            })
            .unzip();

        Self { xs_m_vf, ys_m_vf }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_identity_pose() {
        let pose = VehiclePose::new(0.0, 0.0, 0.0);
        let wps = VehicleFrameWaypoints::from_world(
            &[0.0, 1.0, 2.0, 3.0],
            &[0.0, 1.0, 2.0, 3.0],
            &pose,
        );

        assert_eq!(wps.xs_m_vf, vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(wps.ys_m_vf, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rotation_direction() {
        // Facing +Y, a point straight ahead in the world lies on the VF X axis
        let pose = VehiclePose::new(1.0, 1.0, FRAC_PI_2);
        let p = pose.to_vehicle(&Point2::new(1.0, 3.0));
        assert_abs_diff_eq!(p, Point2::new(2.0, 0.0), epsilon = 1e-12);

        // And a point on the world +X side is to the vehicle's right (-Y)
        let p = pose.to_vehicle(&Point2::new(2.0, 1.0));
        assert_abs_diff_eq!(p, Point2::new(0.0, -1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_matches_explicit_rotation() {
        let (px, py, psi) = (12.3, -4.5, 0.7);
        let pose = VehiclePose::new(px, py, psi);
        let (wx, wy) = (20.0, 3.0);

        let x = wx - px;
        let y = wy - py;
        let ex = x * (-psi).cos() - y * (-psi).sin();
        let ey = x * (-psi).sin() + y * (-psi).cos();

        let p = pose.to_vehicle(&Point2::new(wx, wy));
        assert_abs_diff_eq!(p.x, ex, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, ey, epsilon = 1e-12);
    }

    #[test]
    fn test_round_trip() {
        let poses = [
            VehiclePose::new(0.0, 0.0, 0.0),
            VehiclePose::new(-32.16, 113.361, 3.733651),
            VehiclePose::new(179.3, -6.9, -PI),
            VehiclePose::new(1e3, 1e3, 12.0),
        ];
        let points = [
            Point2::new(0.0, 0.0),
            Point2::new(-43.49173, 105.941),
            Point2::new(250.0, -300.0),
        ];

        for pose in poses.iter() {
            for p in points.iter() {
                let back = pose.to_world(&pose.to_vehicle(p));
                assert!((back - *p).norm() < 1e-9, "pose {:?} point {:?}", pose, p);
            }
        }
    }
}
