//! Innovation-based adaptive process noise (Mehra)
//!
//! Tracks an exponentially weighted estimate of the innovation covariance
//! and compares it against what the filter itself predicts. The ratio
//! becomes a scale factor on a nominal process-noise covariance:
//!
//!   Ĉ ← f·y·yᵀ + (1−f)·Ĉ,       f = dt / (dt + window)
//!   α  = sqrt(tr(Ĉ − R) / tr(H·P⁻·Hᵀ)),  clamped to [MIN_ALPHA, MAX_ALPHA]
//!   Q  = α · Q_base

use crate::filters::kalman::InnovationStatistics;
use crate::types::linalg::*;

/// Scale used when the innovation carries no excess-noise signal
pub const MIN_ALPHA: f64 = 0.001;
pub const MAX_ALPHA: f64 = 1000.0;

#[derive(Clone, Debug, PartialEq)]
pub struct AdaptiveProcessNoiseScaler {
    /// Nominal process noise, rebuilt by the caller before every update
    pub base_cov: StateMatrix,

    /// Smoothed innovation covariance Ĉ
    pub innovation_cov_estimate: MeasurementCov,

    window_length: f64,
    alpha: f64,
}

impl AdaptiveProcessNoiseScaler {
    pub fn new(window_length: f64) -> Self {
        Self {
            base_cov: StateMatrix::zeros(),
            innovation_cov_estimate: MeasurementCov::zeros(),
            window_length,
            alpha: 1.0,
        }
    }

    /// Forget the innovation history. Window length is kept.
    pub fn reset(&mut self) {
        *self = Self::new(self.window_length);
    }

    pub fn set_window_length(&mut self, window_length: f64) {
        self.window_length = window_length;
    }

    pub fn window_length(&self) -> f64 {
        self.window_length
    }

    /// Scale factor applied by the last update (1.0 before any update)
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Fold the latest innovation into the estimate and return the process
    /// noise covariance the filter should use next.
    pub fn update(&mut self, stats: &InnovationStatistics, dt: f64) -> StateMatrix {
        let span = dt + self.window_length;
        let f = if span > 0.0 { dt / span } else { 1.0 };

        let y = stats.innovation;
        self.innovation_cov_estimate =
            y * y.transpose() * f + self.innovation_cov_estimate * (1.0 - f);

        let excess = (self.innovation_cov_estimate - stats.measurement_noise_cov).trace();
        let predicted = stats.predicted_measurement_cov.trace();
        self.alpha = process_noise_scale(excess, predicted);
        log::trace!("adaptive process noise alpha = {:.6}", self.alpha);

        self.base_cov * self.alpha
    }
}

/// α = clamp(sqrt(t1 / t2)) when both traces are positive, else MIN_ALPHA.
pub fn process_noise_scale(t1: f64, t2: f64) -> f64 {
    if t1 > 0.0 && t2 > 0.0 {
        let alpha = (t1 / t2).sqrt();
        if alpha.is_nan() {
            return MIN_ALPHA;
        }
        alpha.clamp(MIN_ALPHA, MAX_ALPHA)
    } else {
        MIN_ALPHA
    }
}
