//! Adaptive Kalman + deadzone smoothing for 6-DOF head-tracking poses.
//!
//! A raw `[x, y, z, yaw, pitch, roll]` pose goes into [`PoseFilterLoop`]
//! once per tracker frame or polling tick; a smoothed pose comes out.

pub mod clock;
pub mod error;
pub mod filters;
pub mod pose_filter;
pub mod settings;
pub mod types;

pub use clock::{Clock, ElapsedTimer, ManualClock, MonotonicClock};
pub use error::{SettingsError, SettingsResult};
pub use filters::adaptive_noise::AdaptiveProcessNoiseScaler;
pub use filters::deadzone::DeadzoneFilter;
pub use filters::kalman::{InnovationStatistics, LinearKalmanFilter};
pub use filters::motion_model::ProcessNoiseModel;
pub use pose_filter::{MeasurementHint, PoseFilterLoop};
pub use settings::{map_slider_value, FilterSettings};
pub use types::PoseVector;
