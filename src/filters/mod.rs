pub mod adaptive_noise;
pub mod deadzone;
pub mod kalman;
pub mod motion_model;
