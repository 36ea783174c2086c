//! Linear algebra type system for the pose filter
//!
//! Provides compile-time dimension checking and clean type aliases
//! for the Kalman filter and its collaborators. Everything is stack-allocated.

use nalgebra::{SMatrix, SVector};

// ===== Dimensions =====
pub const POSE_DIM: usize = 6; // x, y, z, yaw, pitch, roll
pub const STATE_DIM: usize = 2 * POSE_DIM; // pose + velocities
pub const MEASURE_DIM: usize = POSE_DIM;

// ===== State Types =====
pub type StateVector = SVector<f64, STATE_DIM>;
pub type StateMatrix = SMatrix<f64, STATE_DIM, STATE_DIM>;

// ===== Measurement Types =====
pub type MeasurementVector = SVector<f64, MEASURE_DIM>;
pub type MeasurementCov = SMatrix<f64, MEASURE_DIM, MEASURE_DIM>;

/// Raw measurements, smoothed output and deadzone state share this layout.
pub type PoseVector = MeasurementVector;

// Observation model H: 6×12
pub type ObservationMatrix = SMatrix<f64, MEASURE_DIM, STATE_DIM>;

// Kalman gain K: 12×6
pub type KalmanGain = SMatrix<f64, STATE_DIM, MEASURE_DIM>;
