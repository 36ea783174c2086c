//! Constant-velocity pose model
//!
//! State layout: [x, y, z, yaw, pitch, roll, ẋ, ẏ, ż, yaw˙, pitch˙, roll˙]

use serde::{Deserialize, Serialize};

use crate::types::linalg::*;

/// F(dt): identity with `dt` coupling each pose axis to its velocity
pub fn constant_velocity_transition(dt: f64) -> StateMatrix {
    let mut f = StateMatrix::identity();
    for i in 0..POSE_DIM {
        f[(i, i + POSE_DIM)] = dt;
    }
    f
}

/// H = [I₆ | 0₆]
pub fn pose_observation_matrix() -> ObservationMatrix {
    let mut h = ObservationMatrix::zeros();
    for i in 0..POSE_DIM {
        h[(i, i)] = 1.0;
    }
    h
}

/// Empirical process-noise model, mostly velocity driven.
///
/// For an axis with sigma σ and a = σ²·dt, the (pose, velocity) block is
///
///   [ a      a·c ]
///   [ a·c    a·b ]
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessNoiseModel {
    /// c: pose/velocity cross term
    pub position_velocity_coupling: f64,
    /// b: velocity variance factor
    pub velocity_gain: f64,
}

impl ProcessNoiseModel {
    pub fn new(position_velocity_coupling: f64, velocity_gain: f64) -> Self {
        Self { position_velocity_coupling, velocity_gain }
    }

    /// Nominal Q for one interval. Translation axes use `sigma_pos`,
    /// rotation axes use `sigma_rot`.
    pub fn covariance(&self, sigma_pos: f64, sigma_rot: f64, dt: f64) -> StateMatrix {
        let mut q = StateMatrix::zeros();
        for i in 0..POSE_DIM {
            let sigma = if i < 3 { sigma_pos } else { sigma_rot };
            let a = sigma * sigma * dt;
            let v = i + POSE_DIM;
            q[(i, i)] = a;
            q[(i, v)] = a * self.position_velocity_coupling;
            q[(v, i)] = a * self.position_velocity_coupling;
            q[(v, v)] = a * self.velocity_gain;
        }
        q
    }
}

impl Default for ProcessNoiseModel {
    fn default() -> Self {
        Self::new(1.0, 20.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_transition_layout() {
        let f = constant_velocity_transition(0.04);
        for r in 0..STATE_DIM {
            for c in 0..STATE_DIM {
                let expected = if r == c {
                    1.0
                } else if r < POSE_DIM && c == r + POSE_DIM {
                    0.04
                } else {
                    0.0
                };
                assert_eq!(f[(r, c)], expected, "F[{},{}]", r, c);
            }
        }
    }

    #[test]
    fn test_observation_selects_pose() {
        let h = pose_observation_matrix();
        let x = StateVector::from_fn(|i, _| i as f64 + 1.0);
        let z = h * x;
        assert_eq!(z, MeasurementVector::from_column_slice(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));
    }

    #[test]
    fn test_covariance_blocks() {
        let model = ProcessNoiseModel::default();
        let q = model.covariance(0.5, 2.0, 0.1);

        // Translation: a = 0.25·0.1
        assert_relative_eq!(q[(1, 1)], 0.025, epsilon = 1e-15);
        assert_relative_eq!(q[(1, 7)], 0.025, epsilon = 1e-15);
        assert_relative_eq!(q[(7, 1)], 0.025, epsilon = 1e-15);
        assert_relative_eq!(q[(7, 7)], 0.5, epsilon = 1e-15);

        // Rotation: a = 4·0.1
        assert_relative_eq!(q[(4, 4)], 0.4, epsilon = 1e-15);
        assert_relative_eq!(q[(10, 10)], 8.0, epsilon = 1e-12);

        // Axes are independent
        assert_eq!(q[(0, 1)], 0.0);
        assert_eq!(q[(0, 8)], 0.0);
        assert_eq!(q, q.transpose());
    }

    #[test]
    fn test_model_from_partial_json() {
        let model: ProcessNoiseModel = serde_json::from_str(r#"{"velocity_gain": 5.0}"#).unwrap();
        assert_eq!(model.position_velocity_coupling, 1.0);
        assert_eq!(model.velocity_gain, 5.0);
    }
}
