// pose_filter.rs: Adaptive Kalman + deadzone smoothing loop
//
// Owns one LinearKalmanFilter, one AdaptiveProcessNoiseScaler and one
// DeadzoneFilter. Nothing here touches I/O: a raw pose goes in per caller
// tick, a smoothed pose comes out. Time comes from an injected Clock so the
// whole loop can be driven deterministically from tests or recorded logs.

use crate::clock::{Clock, ElapsedTimer, MonotonicClock};
use crate::filters::adaptive_noise::AdaptiveProcessNoiseScaler;
use crate::filters::deadzone::DeadzoneFilter;
use crate::filters::kalman::LinearKalmanFilter;
use crate::filters::motion_model::{constant_velocity_transition, pose_observation_matrix};
use crate::settings::FilterSettings;
use crate::types::linalg::*;

/// How a tick decides whether its input is a fresh measurement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MeasurementHint {
    /// Fresh iff any component differs from the last stored input
    #[default]
    Detect,
    /// Caller knows this is a fresh sample, even if identical
    New,
    /// Caller knows nothing arrived since the last tick
    Repeated,
}

// ─── The filter loop ─────────────────────────────────────────────────────────

pub struct PoseFilterLoop<C: Clock = MonotonicClock> {
    settings: FilterSettings,
    /// (pos, rot) slider values captured by the last reset
    applied_sliders: (f64, f64),

    kf: LinearKalmanFilter,
    noise_scaler: AdaptiveProcessNoiseScaler,
    dz_filter: DeadzoneFilter,

    // Timing
    timer: ElapsedTimer<C>,
    dt_since_last_input: f64,

    // Measurement memory
    last_input: PoseVector,
    last_was_new: bool,

    /// Running per-axis minimum of the pose variance since reset
    minimal_state_var: PoseVector,
    first_run: bool,
}

impl PoseFilterLoop<MonotonicClock> {
    /// Filter driven by the wall clock
    pub fn new(settings: FilterSettings) -> Self {
        Self::with_clock(settings, MonotonicClock::new())
    }
}

impl<C: Clock> PoseFilterLoop<C> {
    pub fn with_clock(settings: FilterSettings, clock: C) -> Self {
        let mut filter = Self {
            applied_sliders: (settings.noise_pos_slider_value, settings.noise_rot_slider_value),
            kf: LinearKalmanFilter::new(),
            noise_scaler: AdaptiveProcessNoiseScaler::new(settings.adaptivity_window_length),
            dz_filter: DeadzoneFilter::new(settings.deadzone_exponent),
            timer: ElapsedTimer::new(clock),
            dt_since_last_input: 0.0,
            last_input: PoseVector::zeros(),
            last_was_new: false,
            minimal_state_var: PoseVector::repeat(f64::INFINITY),
            first_run: true,
            settings,
        };
        filter.reset();
        filter
    }

    // ── Reset ────────────────────────────────────────────────────────────

    /// Rebuild every component from the current settings. The next tick is
    /// a warm-up tick.
    pub fn reset(&mut self) {
        let s = &self.settings;
        self.applied_sliders = (s.noise_pos_slider_value, s.noise_rot_slider_value);

        self.kf.init();
        self.kf.transition_matrix = constant_velocity_transition(s.nominal_dt);
        self.kf.measurement_matrix = pose_observation_matrix();

        let noise_pos = s.measurement_noise_position();
        let noise_rot = s.measurement_noise_rotation();
        for i in 0..3 {
            self.kf.measurement_noise_cov[(i, i)] = noise_pos;
            self.kf.measurement_noise_cov[(i + 3, i + 3)] = noise_rot;
        }

        self.noise_scaler.reset();
        self.noise_scaler.set_window_length(s.adaptivity_window_length);
        self.noise_scaler.base_cov = s.process_noise_model.covariance(
            s.process_sigma_pos,
            s.process_sigma_rot,
            s.nominal_dt,
        );
        self.kf.process_noise_cov = self.noise_scaler.base_cov;
        self.kf.state_cov = self.noise_scaler.base_cov;

        self.last_input = PoseVector::zeros();
        self.last_was_new = false;
        self.dt_since_last_input = 0.0;
        self.minimal_state_var = PoseVector::repeat(f64::INFINITY);

        self.dz_filter.reset();
        self.dz_filter.set_exponent(s.deadzone_exponent);

        self.first_run = true;
        self.timer.reset();

        log::debug!(
            "pose filter reset: R_pos={:.4}, R_rot={:.4}",
            noise_pos,
            noise_rot
        );
    }

    // ── Settings ─────────────────────────────────────────────────────────

    pub fn settings(&self) -> &FilterSettings {
        &self.settings
    }

    /// Slider edits made through this take effect (with a reset) on the
    /// next tick. Other fields are picked up live.
    pub fn settings_mut(&mut self) -> &mut FilterSettings {
        &mut self.settings
    }

    pub fn set_settings(&mut self, settings: FilterSettings) {
        self.settings = settings;
    }

    fn sliders_changed(&self) -> bool {
        let current = (self.settings.noise_pos_slider_value, self.settings.noise_rot_slider_value);
        current != self.applied_sliders
    }

    // ── Filtering ────────────────────────────────────────────────────────

    /// Filter one tick, detecting fresh measurements by value change.
    ///
    /// Returns `None` on the warm-up tick after construction or reset.
    pub fn filter(&mut self, input: &PoseVector) -> Option<PoseVector> {
        self.filter_with_hint(input, MeasurementHint::Detect)
    }

    pub fn filter_with_hint(
        &mut self,
        input: &PoseVector,
        hint: MeasurementHint,
    ) -> Option<PoseVector> {
        if self.sliders_changed() {
            log::info!(
                "noise sliders changed to ({}, {}), resetting",
                self.settings.noise_pos_slider_value,
                self.settings.noise_rot_slider_value
            );
            self.reset();
        }

        if self.first_run {
            // No valid dt yet
            self.timer.start();
            self.first_run = false;
            self.last_input = *input;
            return None;
        }

        let new_input = match hint {
            MeasurementHint::Detect => *input != self.last_input,
            MeasurementHint::New => true,
            MeasurementHint::Repeated => false,
        };
        self.last_was_new = new_input;

        self.dt_since_last_input += self.timer.elapsed_seconds();
        self.timer.start();

        if new_input {
            self.kalman_step(input);
        }

        let filtered: PoseVector = self.kf.state.fixed_rows::<POSE_DIM>(0).into_owned();
        self.update_deadzone_size();
        let output = self.dz_filter.filter(&filtered);

        if new_input {
            self.dt_since_last_input = 0.0;
            self.last_input = *input;
        }

        Some(output)
    }

    /// Predict over the time since the last measurement, then correct.
    fn kalman_step(&mut self, input: &PoseVector) {
        let dt = self.dt_since_last_input;
        let s = &self.settings;

        self.kf.transition_matrix = constant_velocity_transition(dt);
        self.noise_scaler.set_window_length(s.adaptivity_window_length);
        self.noise_scaler.base_cov =
            s.process_noise_model.covariance(s.process_sigma_pos, s.process_sigma_rot, dt);

        let stats = self.kf.innovation_statistics();
        self.kf.process_noise_cov = self.noise_scaler.update(&stats, dt);

        self.kf.time_update();
        self.kf.measurement_update(input);
    }

    /// dz = sqrt(var − min var) · scale, per axis
    fn update_deadzone_size(&mut self) {
        let cov = &self.kf.state_cov;
        let variance = PoseVector::from_fn(|i, _| cov[(i, i)]);
        self.minimal_state_var = self.minimal_state_var.zip_map(&variance, f64::min);

        let scale = self.settings.deadzone_scale;
        self.dz_filter.dz_size =
            (variance - self.minimal_state_var).map(|excess| excess.max(0.0).sqrt() * scale);
        self.dz_filter.set_exponent(self.settings.deadzone_exponent);
    }

    // ── Introspection ────────────────────────────────────────────────────

    pub fn kalman(&self) -> &LinearKalmanFilter {
        &self.kf
    }

    pub fn noise_scaler(&self) -> &AdaptiveProcessNoiseScaler {
        &self.noise_scaler
    }

    pub fn deadzone(&self) -> &DeadzoneFilter {
        &self.dz_filter
    }

    pub fn minimal_state_var(&self) -> &PoseVector {
        &self.minimal_state_var
    }

    pub fn dt_since_last_input(&self) -> f64 {
        self.dt_since_last_input
    }

    pub fn last_input(&self) -> &PoseVector {
        &self.last_input
    }

    /// True until the warm-up tick after construction or reset has run
    pub fn is_warming_up(&self) -> bool {
        self.first_run
    }

    /// Whether the last tick ran a Kalman correction
    pub fn received_new_measurement(&self) -> bool {
        self.last_was_new
    }

    pub fn clock(&self) -> &C {
        self.timer.clock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use approx::assert_abs_diff_eq;

    fn manual_filter() -> (PoseFilterLoop<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let filter = PoseFilterLoop::with_clock(FilterSettings::default(), clock.clone());
        (filter, clock)
    }

    #[test]
    fn test_reset_seeds_matrices() {
        let (filter, _) = manual_filter();
        let kf = filter.kalman();

        assert_eq!(kf.transition_matrix[(0, 6)], 0.03);
        assert_eq!(kf.measurement_matrix[(5, 5)], 1.0);
        assert_abs_diff_eq!(kf.measurement_noise_cov[(0, 0)], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(kf.measurement_noise_cov[(4, 4)], 0.1, epsilon = 1e-12);
        assert_eq!(kf.state_cov, filter.noise_scaler().base_cov);
        assert_eq!(kf.process_noise_cov, filter.noise_scaler().base_cov);
        // a = 0.25·0.03
        assert_abs_diff_eq!(kf.state_cov[(0, 0)], 0.0075, epsilon = 1e-12);
        assert!(filter.minimal_state_var().iter().all(|v| v.is_infinite()));
        assert!(filter.is_warming_up());
    }

    #[test]
    fn test_hint_overrides_detection() {
        let (mut filter, clock) = manual_filter();
        let pose = PoseVector::repeat(1.0);

        assert!(filter.filter(&pose).is_none());

        clock.advance(0.02);
        filter.filter_with_hint(&pose, MeasurementHint::New);
        assert!(filter.received_new_measurement());
        assert_eq!(filter.dt_since_last_input(), 0.0);

        clock.advance(0.02);
        filter.filter_with_hint(&PoseVector::repeat(2.0), MeasurementHint::Repeated);
        assert!(!filter.received_new_measurement());
        assert_abs_diff_eq!(filter.dt_since_last_input(), 0.02, epsilon = 1e-9);
        assert_eq!(*filter.last_input(), pose);
    }

    #[test]
    fn test_repeated_ticks_accumulate_dt() {
        let (mut filter, clock) = manual_filter();
        let a = PoseVector::repeat(0.5);
        let b = PoseVector::repeat(0.7);

        filter.filter(&a);
        for _ in 0..3 {
            clock.advance(0.01);
            filter.filter(&a);
        }
        assert_abs_diff_eq!(filter.dt_since_last_input(), 0.03, epsilon = 1e-9);

        // The correction predicts over the whole gap
        clock.advance(0.01);
        filter.filter(&b);
        assert_abs_diff_eq!(filter.kalman().transition_matrix[(2, 8)], 0.04, epsilon = 1e-9);
        assert_eq!(filter.dt_since_last_input(), 0.0);
    }

    #[test]
    fn test_no_new_measurement_keeps_state() {
        let (mut filter, clock) = manual_filter();
        filter.filter(&PoseVector::zeros());
        clock.advance(0.03);
        filter.filter(&PoseVector::repeat(3.0));

        let state = filter.kalman().state;
        clock.advance(0.03);
        filter.filter(&PoseVector::repeat(3.0));

        assert_eq!(filter.kalman().state, state);
    }

    #[test]
    fn test_live_settings_without_reset() {
        let (mut filter, clock) = manual_filter();
        filter.filter(&PoseVector::zeros());

        filter.settings_mut().deadzone_scale = 0.0;
        clock.advance(0.03);
        let out = filter.filter(&PoseVector::repeat(1.0)).unwrap();

        assert!(!filter.is_warming_up());
        assert_eq!(filter.deadzone().dz_size, PoseVector::zeros());
        // Pass-through deadzone: output is the raw Kalman pose
        assert_eq!(out, filter.kalman().state.fixed_rows::<POSE_DIM>(0).into_owned());
    }

    #[test]
    fn test_minimal_variance_never_increases() {
        let (mut filter, clock) = manual_filter();
        filter.filter(&PoseVector::zeros());

        let mut prev = PoseVector::repeat(f64::INFINITY);
        for step in 1..200 {
            clock.advance(if step % 7 == 0 { 0.2 } else { 1.0 / 60.0 });
            let z = PoseVector::repeat((step as f64 * 0.1).sin());
            filter.filter(&z);

            let min = *filter.minimal_state_var();
            for i in 0..POSE_DIM {
                assert!(min[i] <= prev[i]);
                assert!(min[i] <= filter.kalman().state_cov[(i, i)]);
                assert!(filter.deadzone().dz_size[i] >= 0.0);
            }
            prev = min;
        }
    }
}
