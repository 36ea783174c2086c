use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use flate2::read::GzDecoder;
use pose_filter_rs::types::{pose_from_array, pose_to_array, PoseLog, POSE_DIM};
use pose_filter_rs::{FilterSettings, ManualClock, MeasurementHint, PoseFilterLoop};
use serde_json::{json, Value};

#[derive(Parser, Debug)]
struct Args {
    /// Path to a recorded pose log (.json or .json.gz)
    #[arg(long, conflicts_with = "log_dir")]
    log: Option<PathBuf>,

    /// Directory of pose logs to batch replay
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Filter settings JSON (missing fields use defaults)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override position noise slider [0, 1]
    #[arg(long)]
    noise_pos: Option<f64>,

    /// Override rotation noise slider [0, 1]
    #[arg(long)]
    noise_rot: Option<f64>,

    /// Ignore per-sample "new" flags and detect fresh samples by value change
    #[arg(long, default_value_t = false)]
    detect_only: bool,
}

fn load_log(path: &Path) -> anyhow::Result<PoseLog> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn rmse_pairs(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = pairs.iter().map(|(a, b)| (a - b).powi(2)).sum();
    (sum_sq / pairs.len() as f64).sqrt()
}

/// Per-axis RMS of consecutive differences
fn jitter(series: &[[f64; POSE_DIM]]) -> Vec<f64> {
    (0..POSE_DIM)
        .map(|axis| {
            let steps: Vec<(f64, f64)> =
                series.windows(2).map(|w| (w[1][axis], w[0][axis])).collect();
            rmse_pairs(&steps)
        })
        .collect()
}

fn load_settings(args: &Args) -> anyhow::Result<FilterSettings> {
    let mut settings = match &args.settings {
        Some(path) => FilterSettings::load(path)?,
        None => FilterSettings::default(),
    };
    if let Some(v) = args.noise_pos {
        settings.noise_pos_slider_value = v;
    }
    if let Some(v) = args.noise_rot {
        settings.noise_rot_slider_value = v;
    }
    settings.validate()?;
    Ok(settings)
}

fn run_once(path: &Path, settings: &FilterSettings, args: &Args) -> anyhow::Result<Value> {
    let log_data = load_log(path)?;
    if log_data.samples.is_empty() {
        anyhow::bail!("{} has no samples", path.display());
    }

    let clock = ManualClock::new();
    let mut filter = PoseFilterLoop::with_clock(settings.clone(), clock.clone());
    let t0 = log_data.samples[0].timestamp;

    // Raw/filtered pairs only for ticks that produced output
    let mut raw = Vec::new();
    let mut filtered = Vec::new();
    let mut new_count = 0usize;

    for sample in &log_data.samples {
        clock.set_seconds(sample.timestamp - t0);

        let hint = match sample.new {
            Some(true) if !args.detect_only => MeasurementHint::New,
            Some(false) if !args.detect_only => MeasurementHint::Repeated,
            _ => MeasurementHint::Detect,
        };

        let pose = pose_from_array(&sample.pose);
        if let Some(out) = filter.filter_with_hint(&pose, hint) {
            if filter.received_new_measurement() {
                new_count += 1;
            }
            raw.push(sample.pose);
            filtered.push(pose_to_array(&out));
        }
    }

    let deviation: Vec<f64> = (0..POSE_DIM)
        .map(|axis| {
            let pairs: Vec<(f64, f64)> =
                filtered.iter().zip(&raw).map(|(f, r)| (f[axis], r[axis])).collect();
            rmse_pairs(&pairs)
        })
        .collect();

    log::info!(
        "{}: {} samples, {} outputs, {} new measurements",
        path.display(),
        log_data.samples.len(),
        filtered.len(),
        new_count
    );

    Ok(json!({
        "log": path.display().to_string(),
        "noise_pos_slider_value": settings.noise_pos_slider_value,
        "noise_rot_slider_value": settings.noise_rot_slider_value,
        "samples": log_data.samples.len(),
        "outputs": filtered.len(),
        "new_measurements": new_count,
        "raw_jitter": jitter(&raw),
        "filtered_jitter": jitter(&filtered),
        "rms_deviation": deviation,
        "final_alpha": filter.noise_scaler().alpha(),
        "final_pose": filtered.last(),
    }))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = load_settings(&args)?;
    let mut results = Vec::new();

    if let Some(dir) = args.log_dir.as_ref() {
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .filter(|path| {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                name.ends_with(".json") || name.ends_with(".json.gz")
            })
            .collect();
        paths.sort();

        for path in paths {
            match run_once(&path, &settings, &args) {
                Ok(res) => results.push(res),
                Err(e) => log::warn!("Failed {}: {}", path.display(), e),
            }
        }
    } else if let Some(log) = args.log.as_ref() {
        results.push(run_once(log, &settings, &args)?);
    } else {
        anyhow::bail!("Provide --log or --log-dir");
    }

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
