use assert_cmd::cargo::cargo_bin_cmd;
use pulsecal_lib::calibrate::{DelayPressureSample, LinearModel, ValidationStats};
use serde::Deserialize;
use std::{error::Error, fmt::Write as _, fs, path::Path};

const FS: f64 = 250.0;
const DURATION_S: f64 = 20.0;
const BEAT_HZ: f64 = 1.2;

#[derive(Deserialize)]
struct Extremum {
    index: usize,
    value: f64,
}

#[derive(Deserialize)]
struct Envelopes {
    minima: Vec<Extremum>,
    maxima: Vec<Extremum>,
}

#[derive(Deserialize)]
struct CalibrateOutput {
    low: LinearModel,
    high: LinearModel,
    samples: Vec<DelayPressureSample>,
    validation: ValidationStats,
    measured: Envelopes,
    predicted: Envelopes,
}

#[test]
fn calibrate_recovers_pressure_envelopes() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let ecg = dir.path().join("ecg.txt");
    let pleth = dir.path().join("pleth.txt");
    let abp = dir.path().join("abp.txt");
    let csv_path = dir.path().join("samples.csv");
    write_series(&ecg, &ecg_channel())?;
    write_series(&pleth, &pleth_channel())?;
    write_series(&abp, &abp_channel())?;

    let mut cmd = cargo_bin_cmd!("pulsecal");
    cmd.args([
        "calibrate",
        "--fs",
        "250",
        "--ecg-input",
        ecg.to_str().expect("utf8 path"),
        "--pleth-input",
        pleth.to_str().expect("utf8 path"),
        "--abp-input",
        abp.to_str().expect("utf8 path"),
        "--begin-percent",
        "0",
        "--end-percent",
        "50",
        "--samples-csv",
        csv_path.to_str().expect("utf8 path"),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let actual: CalibrateOutput = serde_json::from_slice(&output)?;

    assert!(!actual.low.degenerate);
    assert!(!actual.high.degenerate);
    assert!((actual.low.b - 80.0).abs() < 1.5, "low {:?}", actual.low);
    assert!((actual.high.b - 120.0).abs() < 1.5, "high {:?}", actual.high);
    assert!(actual.validation.low_error_percent < 2.0);
    assert!(actual.validation.high_error_percent < 2.0);
    assert!(!actual.samples.is_empty());
    assert!(actual.measured.maxima.len() >= actual.measured.minima.len());
    assert!(!actual.predicted.minima.is_empty());

    // No measured index may carry both extrema.
    for minimum in &actual.measured.minima {
        assert!(actual
            .measured
            .maxima
            .iter()
            .all(|maximum| maximum.index != minimum.index));
    }
    for extremum in actual.measured.minima.iter().chain(&actual.measured.maxima) {
        assert!(extremum.value != 0.0);
    }

    let csv_text = fs::read_to_string(&csv_path)?;
    // Header plus one row per accepted sample.
    assert_eq!(csv_text.lines().count(), actual.samples.len() + 1);
    Ok(())
}

#[test]
fn calibrate_rejects_inverted_window() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let series = dir.path().join("flat.txt");
    write_series(&series, &vec![0.0; 100])?;
    let path = series.to_str().expect("utf8 path");

    let mut cmd = cargo_bin_cmd!("pulsecal");
    cmd.args([
        "calibrate",
        "--ecg-input",
        path,
        "--pleth-input",
        path,
        "--abp-input",
        path,
        "--begin-percent",
        "80",
        "--end-percent",
        "20",
    ]);
    cmd.assert().failure();
    Ok(())
}

fn write_series(path: &Path, data: &[f64]) -> Result<(), Box<dyn Error>> {
    let mut text = String::new();
    for value in data {
        writeln!(text, "{}", value)?;
    }
    fs::write(path, text)?;
    Ok(())
}

fn gaussian(t: f64, center: f64, width: f64) -> f64 {
    (-0.5 * ((t - center) / width).powi(2)).exp()
}

fn beat_times() -> Vec<f64> {
    let mut times = Vec::new();
    let mut t = 0.5;
    while t < DURATION_S {
        times.push(t);
        t += 1.0 / BEAT_HZ;
    }
    times
}

fn transit_delay(k: usize) -> f64 {
    if k % 2 == 0 {
        0.18
    } else {
        0.22
    }
}

fn ecg_channel() -> Vec<f64> {
    let beats = beat_times();
    (0..(FS * DURATION_S) as usize)
        .map(|i| {
            let t = i as f64 / FS;
            beats.iter().map(|&b| gaussian(t, b, 0.02)).sum()
        })
        .collect()
}

fn pleth_channel() -> Vec<f64> {
    let beats = beat_times();
    (0..(FS * DURATION_S) as usize)
        .map(|i| {
            let t = i as f64 / FS;
            beats
                .iter()
                .enumerate()
                .map(|(k, &b)| gaussian(t, b + transit_delay(k), 0.03))
                .sum()
        })
        .collect()
}

fn abp_channel() -> Vec<f64> {
    let beats = beat_times();
    let half_beat = 0.5 / BEAT_HZ;
    (0..(FS * DURATION_S) as usize)
        .map(|i| {
            let t = i as f64 / FS;
            let mut value = 100.0;
            for (k, &b) in beats.iter().enumerate() {
                let arrival = b + transit_delay(k);
                value += 20.0 * gaussian(t, arrival, 0.05);
                value -= 20.0 * gaussian(t, arrival + half_beat, 0.05);
            }
            value
        })
        .collect()
}
