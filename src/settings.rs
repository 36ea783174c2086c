//! Tuning parameters of the pose filter.
//!
//! Only the two noise sliders are latched at reset; every other field is
//! read live on each tick.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{SettingsError, SettingsResult};
use crate::filters::motion_model::ProcessNoiseModel;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    // ── Measurement noise (reset on change) ──
    /// Slider in [0, 1] mapped to position measurement variance
    pub noise_pos_slider_value: f64,
    /// Slider in [0, 1] mapped to rotation measurement variance
    pub noise_rot_slider_value: f64,

    // ── Process noise ──
    pub process_sigma_pos: f64,
    pub process_sigma_rot: f64,
    pub process_noise_model: ProcessNoiseModel,

    // ── Adaptation ──
    /// Innovation covariance time constant (s)
    pub adaptivity_window_length: f64,

    // ── Deadzone ──
    /// Std-dev to deadzone size multiplier; 0 disables the deadzone
    pub deadzone_scale: f64,
    pub deadzone_exponent: f64,

    /// dt used to seed the model matrices at reset (s)
    pub nominal_dt: f64,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            noise_pos_slider_value: 0.5,
            noise_rot_slider_value: 0.5,
            process_sigma_pos: 0.5,
            process_sigma_rot: 0.5,
            process_noise_model: ProcessNoiseModel::default(),
            adaptivity_window_length: 0.25,
            deadzone_scale: 8.0,
            deadzone_exponent: 2.0,
            nominal_dt: 0.03,
        }
    }
}

impl FilterSettings {
    /// Position measurement variance (cm², or whatever the tracker emits)
    pub fn measurement_noise_position(&self) -> f64 {
        map_slider_value(self.noise_pos_slider_value)
    }

    /// Rotation measurement variance
    pub fn measurement_noise_rotation(&self) -> f64 {
        map_slider_value(self.noise_rot_slider_value)
    }

    pub fn validate(&self) -> SettingsResult<()> {
        for (name, value) in [
            ("noise_pos_slider_value", self.noise_pos_slider_value),
            ("noise_rot_slider_value", self.noise_rot_slider_value),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::SliderOutOfRange { name, value });
            }
        }

        for (name, value) in [
            ("process_sigma_pos", self.process_sigma_pos),
            ("process_sigma_rot", self.process_sigma_rot),
            ("adaptivity_window_length", self.adaptivity_window_length),
            ("deadzone_exponent", self.deadzone_exponent),
            ("nominal_dt", self.nominal_dt),
            (
                "process_noise_model.position_velocity_coupling",
                self.process_noise_model.position_velocity_coupling,
            ),
            ("process_noise_model.velocity_gain", self.process_noise_model.velocity_gain),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SettingsError::InvalidParameter { name, value });
            }
        }

        if !self.deadzone_scale.is_finite() || self.deadzone_scale < 0.0 {
            return Err(SettingsError::InvalidParameter {
                name: "deadzone_scale",
                value: self.deadzone_scale,
            });
        }

        Ok(())
    }

    /// Parse and validate. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> SettingsResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Map a [0, 1] slider onto four decades of variance: 0.001 … 10.
///
/// Each quarter of the slider covers one decade, linear inside it.
pub fn map_slider_value(value: f64) -> f64 {
    let v = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    let scaled = 4.0 * v;
    let decade = scaled.floor();
    let frac = scaled - decade;
    10f64.powf(decade - 3.0) * (1.0 + 9.0 * frac)
}
