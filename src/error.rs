use thiserror::Error;

/// Filter settings errors
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Slider {name} out of range [0, 1]: {value}")]
    SliderOutOfRange { name: &'static str, value: f64 },

    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type SettingsResult<T> = Result<T, SettingsError>;
