use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use pose_filter_rs::types::{pose_from_array, pose_to_array, FilteredPose, POSE_DIM};
use pose_filter_rs::{FilterSettings, MeasurementHint, PoseFilterLoop};

#[derive(Parser, Debug)]
#[command(name = "pose_filter")]
#[command(about = "Smooth a live stream of 6-DOF poses (JSON lines on stdin)", long_about = None)]
struct Args {
    /// Filter settings JSON (missing fields use defaults)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override position noise slider [0, 1]
    #[arg(long)]
    noise_pos: Option<f64>,

    /// Override rotation noise slider [0, 1]
    #[arg(long)]
    noise_rot: Option<f64>,
}

/// One input line: `{"pose": [x, y, z, yaw, pitch, roll], "new": true}`
#[derive(Deserialize)]
struct InputLine {
    pose: [f64; POSE_DIM],
    #[serde(default)]
    new: Option<bool>,
}

fn hint_for(new: Option<bool>) -> MeasurementHint {
    match new {
        Some(true) => MeasurementHint::New,
        Some(false) => MeasurementHint::Repeated,
        None => MeasurementHint::Detect,
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut settings = match &args.settings {
        Some(path) => FilterSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => FilterSettings::default(),
    };
    if let Some(v) = args.noise_pos {
        settings.noise_pos_slider_value = v;
    }
    if let Some(v) = args.noise_rot {
        settings.noise_rot_slider_value = v;
    }
    settings.validate()?;

    log::info!(
        "pose filter running: R_pos={:.4}, R_rot={:.4}",
        settings.measurement_noise_position(),
        settings.measurement_noise_rotation()
    );

    let mut filter = PoseFilterLoop::new(settings);
    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());

    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let input: InputLine = match serde_json::from_str(&line) {
            Ok(input) => input,
            Err(e) => {
                log::warn!("line {}: skipping malformed pose: {}", line_no + 1, e);
                continue;
            }
        };

        let pose = pose_from_array(&input.pose);
        if let Some(smoothed) = filter.filter_with_hint(&pose, hint_for(input.new)) {
            let record = FilteredPose { pose: pose_to_array(&smoothed) };
            serde_json::to_writer(&mut out, &record)?;
            writeln!(out)?;
            out.flush()?;
        }
    }

    Ok(())
}
