//! Soft-knee deadzone
//!
//! Per axis, with δ = input − last_output and f = (|δ| / dz)^exponent:
//!
//!   out = last_output + δ · f / (f + 1)
//!
//! Small steps relative to `dz_size` are suppressed, large ones pass almost
//! unchanged. An axis with `dz_size == 0` is a pass-through.

use crate::types::linalg::PoseVector;

#[derive(Clone, Debug, PartialEq)]
pub struct DeadzoneFilter {
    /// Per-axis deadzone size, sized by the caller every frame
    pub dz_size: PoseVector,

    /// Previous output
    pub last_output: PoseVector,

    exponent: f64,
}

impl DeadzoneFilter {
    pub fn new(exponent: f64) -> Self {
        Self {
            dz_size: PoseVector::zeros(),
            last_output: PoseVector::zeros(),
            exponent,
        }
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    pub fn set_exponent(&mut self, exponent: f64) {
        self.exponent = exponent;
    }

    /// Zero size and memory. Exponent is kept.
    pub fn reset(&mut self) {
        self.dz_size = PoseVector::zeros();
        self.last_output = PoseVector::zeros();
    }

    pub fn filter(&mut self, input: &PoseVector) -> PoseVector {
        let mut out = *input;
        for i in 0..out.len() {
            let dz = self.dz_size[i];
            if dz > 0.0 {
                let last = self.last_output[i];
                let delta = input[i] - last;
                let f = (delta.abs() / dz).powf(self.exponent);
                let response = if f.is_infinite() { delta } else { f / (f + 1.0) * delta };
                out[i] = last + response;
            }
        }
        self.last_output = out;
        out
    }
}
