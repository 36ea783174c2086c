//! Linear Kalman Filter (12 states, 6 measurements)
//!
//! Plain discrete-time linear filter without any knowledge of what the
//! states mean. The caller owns the model matrices (F, H, Q, R) and writes
//! them directly before stepping the filter.
//!
//! Prediction:   x⁻ = F·x,  P⁻ = F·P·Fᵀ + Q
//! Correction:   S = H·P⁻·Hᵀ + R,  K = P⁻·Hᵀ·S⁻¹,  y = z − H·x⁻
//!               x = x⁻ + K·y,  P = P⁻ − K·H·P⁻

use crate::types::linalg::*;

#[derive(Clone, Debug, PartialEq)]
pub struct LinearKalmanFilter {
    /// Posterior state estimate
    pub state: StateVector,

    /// Prior state estimate (after time_update)
    pub state_prior: StateVector,

    /// Posterior state covariance P
    pub state_cov: StateMatrix,

    /// Prior state covariance P⁻
    pub state_cov_prior: StateMatrix,

    /// Process noise covariance Q
    pub process_noise_cov: StateMatrix,

    /// Measurement noise covariance R
    pub measurement_noise_cov: MeasurementCov,

    /// State transition F
    pub transition_matrix: StateMatrix,

    /// Observation model H
    pub measurement_matrix: ObservationMatrix,

    /// Gain of the last correction
    pub kalman_gain: KalmanGain,

    /// Innovation y of the last correction
    pub innovation: MeasurementVector,
}

/// Innovation statistics of the last correction, handed to the
/// process-noise scaler as plain data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InnovationStatistics {
    /// y = z − H·x⁻
    pub innovation: MeasurementVector,

    /// R
    pub measurement_noise_cov: MeasurementCov,

    /// H·P⁻·Hᵀ, the part of S explained by the state uncertainty
    pub predicted_measurement_cov: MeasurementCov,
}

impl LinearKalmanFilter {
    /// Create a filter with every matrix and vector zeroed
    pub fn new() -> Self {
        Self {
            state: StateVector::zeros(),
            state_prior: StateVector::zeros(),
            state_cov: StateMatrix::zeros(),
            state_cov_prior: StateMatrix::zeros(),
            process_noise_cov: StateMatrix::zeros(),
            measurement_noise_cov: MeasurementCov::zeros(),
            transition_matrix: StateMatrix::zeros(),
            measurement_matrix: ObservationMatrix::zeros(),
            kalman_gain: KalmanGain::zeros(),
            innovation: MeasurementVector::zeros(),
        }
    }

    /// Zero every matrix and vector
    pub fn init(&mut self) {
        *self = Self::new();
    }

    /// Predict step: propagate state and covariance through F and Q
    pub fn time_update(&mut self) {
        let f = self.transition_matrix;
        self.state_prior = f * self.state;
        self.state_cov_prior = f * self.state_cov * f.transpose() + self.process_noise_cov;
    }

    /// Update step: fold a measurement into the prior estimate.
    ///
    /// Never rejects input. A singular innovation covariance degrades the
    /// correction instead of failing it.
    pub fn measurement_update(&mut self, measurement: &MeasurementVector) {
        let h = self.measurement_matrix;
        let h_t = h.transpose();
        let p_prior = self.state_cov_prior;

        let innovation_cov = h * p_prior * h_t + self.measurement_noise_cov;
        let innovation_cov_inv = invert_innovation_cov(innovation_cov);

        self.kalman_gain = p_prior * h_t * innovation_cov_inv;
        self.innovation = measurement - h * self.state_prior;
        self.state = self.state_prior + self.kalman_gain * self.innovation;

        let cov = p_prior - self.kalman_gain * h * p_prior;
        // Symmetrize
        self.state_cov = (cov + cov.transpose()) * 0.5;
    }

    /// Statistics of the last correction for innovation-based adaptation
    pub fn innovation_statistics(&self) -> InnovationStatistics {
        let h = self.measurement_matrix;
        InnovationStatistics {
            innovation: self.innovation,
            measurement_noise_cov: self.measurement_noise_cov,
            predicted_measurement_cov: h * self.state_cov_prior * h.transpose(),
        }
    }
}

impl Default for LinearKalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

/// Invert S, falling back to the pseudo-inverse and finally to a zero
/// matrix (no correction) when S is singular.
fn invert_innovation_cov(innovation_cov: MeasurementCov) -> MeasurementCov {
    if let Some(inv) = innovation_cov.try_inverse() {
        return inv;
    }

    log::warn!("Innovation covariance is singular, using pseudo-inverse");
    innovation_cov
        .pseudo_inverse(f64::EPSILON)
        .unwrap_or_else(|_| MeasurementCov::zeros())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn pose_filter(dt: f64) -> LinearKalmanFilter {
        let mut kf = LinearKalmanFilter::new();
        kf.transition_matrix = StateMatrix::identity();
        for i in 0..POSE_DIM {
            kf.transition_matrix[(i, i + POSE_DIM)] = dt;
            kf.measurement_matrix[(i, i)] = 1.0;
            kf.measurement_noise_cov[(i, i)] = 1.0;
        }
        kf.process_noise_cov = StateMatrix::identity() * 0.01;
        kf.state_cov = StateMatrix::identity();
        kf
    }

    #[test]
    fn test_init_zeroes_everything() {
        let mut kf = pose_filter(0.1);
        kf.state[0] = 3.0;
        kf.init();
        assert_eq!(kf, LinearKalmanFilter::new());
        assert_eq!(kf.state_cov.norm(), 0.0);
    }

    #[test]
    fn test_time_update_integrates_velocity() {
        let mut kf = pose_filter(0.5);
        kf.state[0] = 1.0;
        kf.state[POSE_DIM] = 2.0; // vx

        kf.time_update();

        assert_abs_diff_eq!(kf.state_prior[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(kf.state_prior[POSE_DIM], 2.0, epsilon = 1e-12);
        // P⁻[0,0] = P[0,0] + dt²·P[6,6] + Q[0,0]
        assert_abs_diff_eq!(kf.state_cov_prior[(0, 0)], 1.0 + 0.25 + 0.01, epsilon = 1e-12);
        // Posterior untouched until a measurement arrives
        assert_eq!(kf.state[0], 1.0);
    }

    #[test]
    fn test_measurement_pulls_toward_observation() {
        let mut kf = pose_filter(0.1);
        let z = MeasurementVector::from_column_slice(&[1.0, -2.0, 0.5, 10.0, 0.0, -3.0]);

        kf.time_update();
        kf.measurement_update(&z);

        for i in 0..POSE_DIM {
            if z[i] != 0.0 {
                assert!(kf.state[i].abs() > 0.0);
                assert!(kf.state[i].abs() < z[i].abs());
                assert_eq!(kf.state[i].signum(), z[i].signum());
            }
            assert_eq!(kf.innovation[i], z[i]);
            assert!(kf.state_cov[(i, i)] < kf.state_cov_prior[(i, i)]);
        }
    }

    #[test]
    fn test_covariance_stays_symmetric() {
        let mut kf = pose_filter(0.033);
        for step in 0..200 {
            let t = step as f64 * 0.033;
            let z = MeasurementVector::from_fn(|i, _| (t * (i + 1) as f64).sin() * 5.0);
            kf.time_update();
            kf.measurement_update(&z);

            let asym = (kf.state_cov - kf.state_cov.transpose()).abs().max();
            assert!(asym <= 1e-12, "asymmetry {} at step {}", asym, step);
        }
    }

    #[test]
    fn test_singular_innovation_cov_skips_correction() {
        let mut kf = pose_filter(0.1);
        kf.measurement_noise_cov = MeasurementCov::zeros();
        kf.state_cov = StateMatrix::zeros();
        kf.process_noise_cov = StateMatrix::zeros();

        kf.time_update();
        kf.measurement_update(&MeasurementVector::repeat(1.0));

        assert!(kf.state.iter().all(|v| v.is_finite()));
        assert_eq!(kf.state, kf.state_prior);
    }

    #[test]
    fn test_innovation_statistics() {
        let mut kf = pose_filter(0.1);
        kf.time_update();
        kf.measurement_update(&MeasurementVector::repeat(2.0));

        let stats = kf.innovation_statistics();
        assert_eq!(stats.innovation, MeasurementVector::repeat(2.0));
        assert_eq!(stats.measurement_noise_cov, kf.measurement_noise_cov);
        // H·P⁻·Hᵀ picks the pose block of P⁻
        for i in 0..MEASURE_DIM {
            assert_eq!(
                stats.predicted_measurement_cov[(i, i)],
                kf.state_cov_prior[(i, i)]
            );
        }
    }
}
