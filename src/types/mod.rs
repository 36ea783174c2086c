pub mod linalg;

pub use linalg::*;

use serde::{Deserialize, Serialize};

/// One raw pose delivered by the upstream tracker.
///
/// `pose` is ordered `[x, y, z, yaw, pitch, roll]`. `new` is the optional
/// fresh-sample flag; when absent the filter falls back to change detection.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoseSample {
    #[serde(default)]
    pub timestamp: f64,
    pub pose: [f64; POSE_DIM],
    #[serde(default)]
    pub new: Option<bool>,
}

/// A recorded session of raw poses.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PoseLog {
    pub samples: Vec<PoseSample>,
}

/// One smoothed pose emitted by the filter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilteredPose {
    pub pose: [f64; POSE_DIM],
}

pub fn pose_from_array(values: &[f64; POSE_DIM]) -> PoseVector {
    PoseVector::from_column_slice(values)
}

pub fn pose_to_array(pose: &PoseVector) -> [f64; POSE_DIM] {
    let mut out = [0.0; POSE_DIM];
    out.copy_from_slice(pose.as_slice());
    out
}
