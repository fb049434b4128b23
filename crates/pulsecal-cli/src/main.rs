use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use csv::WriterBuilder;
use pulsecal_lib::{
    calibrate::{CalibrationSummary, CalibrationWindow, Calibrator},
    detect::{detect_peaks, estimate_delays, extract_envelope, Inversion},
    io::{edf as edf_io, text as text_io},
    signal::{EnvelopePair, TimeSeries},
};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "pulsecal",
    version,
    about = "Pulse-transit-time blood pressure calibration tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum InversionArg {
    Normal,
    Inverted,
    Auto,
}

impl From<InversionArg> for Inversion {
    fn from(arg: InversionArg) -> Self {
        match arg {
            InversionArg::Normal => Inversion::Normal,
            InversionArg::Inverted => Inversion::Inverted,
            InversionArg::Auto => Inversion::Auto,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect rate-coded peaks in one channel (text series, stdin, or EDF)
    FindPeaks {
        #[arg(long, default_value_t = 250.0)]
        fs: f64,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        edf: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        channel: usize,
        #[arg(long, default_value = "auto")]
        inversion: InversionArg,
    },
    /// Extract the per-beat min/max envelope of a pressure channel
    Envelope {
        #[arg(long, default_value_t = 250.0)]
        fs: f64,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        edf: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        channel: usize,
    },
    /// Estimate pulse transit delays between a reference and a target channel
    Delay {
        #[arg(long, default_value_t = 250.0)]
        ref_fs: f64,
        #[arg(long)]
        ref_input: Option<PathBuf>,
        #[arg(long, default_value_t = 250.0)]
        target_fs: f64,
        #[arg(long)]
        target_input: Option<PathBuf>,
        #[arg(long)]
        edf: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        ref_channel: usize,
        #[arg(long, default_value_t = 1)]
        target_channel: usize,
    },
    /// Calibrate delay→pressure models on a window and validate on the rest
    Calibrate {
        #[arg(long)]
        edf: Option<PathBuf>,
        #[arg(long)]
        ecg_input: Option<PathBuf>,
        #[arg(long)]
        pleth_input: Option<PathBuf>,
        #[arg(long)]
        abp_input: Option<PathBuf>,
        #[arg(long, default_value_t = 250.0)]
        fs: f64,
        #[arg(long, default_value_t = 0)]
        ecg_channel: usize,
        #[arg(long, default_value_t = 1)]
        pleth_channel: usize,
        #[arg(long, default_value_t = 2)]
        abp_channel: usize,
        #[arg(long, default_value_t = 0)]
        begin_percent: u32,
        #[arg(long, default_value_t = 50)]
        end_percent: u32,
        /// Write the accepted delay/pressure samples as CSV
        #[arg(long)]
        samples_csv: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::FindPeaks {
            fs,
            input,
            edf,
            channel,
            inversion,
        } => cmd_find_peaks(fs, input.as_deref(), edf.as_deref(), channel, inversion)?,
        Commands::Envelope {
            fs,
            input,
            edf,
            channel,
        } => cmd_envelope(fs, input.as_deref(), edf.as_deref(), channel)?,
        Commands::Delay {
            ref_fs,
            ref_input,
            target_fs,
            target_input,
            edf,
            ref_channel,
            target_channel,
        } => cmd_delay(
            ref_fs,
            ref_input.as_deref(),
            target_fs,
            target_input.as_deref(),
            edf.as_deref(),
            ref_channel,
            target_channel,
        )?,
        Commands::Calibrate {
            edf,
            ecg_input,
            pleth_input,
            abp_input,
            fs,
            ecg_channel,
            pleth_channel,
            abp_channel,
            begin_percent,
            end_percent,
            samples_csv,
        } => cmd_calibrate(
            edf.as_deref(),
            ecg_input.as_deref(),
            pleth_input.as_deref(),
            abp_input.as_deref(),
            fs,
            ecg_channel,
            pleth_channel,
            abp_channel,
            begin_percent,
            end_percent,
            samples_csv.as_deref(),
        )?,
    }
    Ok(())
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_f64_series(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_f64_series(&buf)
        }
    }
}

fn load_channel(
    fs: f64,
    input: Option<&Path>,
    edf: Option<&Path>,
    channel: usize,
) -> Result<TimeSeries> {
    if let Some(path) = edf {
        edf_io::load_edf_channel(path, channel)
    } else {
        let data = read_samples(input)?;
        Ok(TimeSeries { fs, data })
    }
}

#[derive(Serialize)]
struct PeakEvent {
    index: usize,
    bpm: u32,
}

#[derive(Serialize)]
struct ExtremumEvent {
    index: usize,
    value: f64,
}

#[derive(Serialize)]
struct EnvelopeEvents {
    minima: Vec<ExtremumEvent>,
    maxima: Vec<ExtremumEvent>,
}

#[derive(Serialize)]
struct DelayEvent {
    index: usize,
    delay_s: f64,
}

fn envelope_events(pair: &EnvelopePair) -> EnvelopeEvents {
    let collect = |values: &[f64]| {
        values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(index, &value)| ExtremumEvent { index, value })
            .collect()
    };
    EnvelopeEvents {
        minima: collect(&pair.minima),
        maxima: collect(&pair.maxima),
    }
}

fn cmd_find_peaks(
    fs: f64,
    input: Option<&Path>,
    edf: Option<&Path>,
    channel: usize,
    inversion: InversionArg,
) -> Result<()> {
    let ts = load_channel(fs, input, edf, channel)?;
    let train = detect_peaks(&ts, inversion.into());
    let events: Vec<PeakEvent> = train
        .peaks()
        .map(|(index, bpm)| PeakEvent { index, bpm })
        .collect();
    println!("{}", serde_json::to_string(&events)?);
    Ok(())
}

fn cmd_envelope(fs: f64, input: Option<&Path>, edf: Option<&Path>, channel: usize) -> Result<()> {
    let ts = load_channel(fs, input, edf, channel)?;
    let pair = extract_envelope(&ts);
    println!("{}", serde_json::to_string(&envelope_events(&pair))?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_delay(
    ref_fs: f64,
    ref_input: Option<&Path>,
    target_fs: f64,
    target_input: Option<&Path>,
    edf: Option<&Path>,
    ref_channel: usize,
    target_channel: usize,
) -> Result<()> {
    let (reference, target) = if let Some(path) = edf {
        let recording = edf_io::load_edf_recording(path)?;
        let fetch = |idx: usize| {
            recording
                .channels
                .get(idx)
                .cloned()
                .ok_or_else(|| anyhow!("EDF channel {} out of range", idx))
        };
        (fetch(ref_channel)?, fetch(target_channel)?)
    } else {
        let ref_data = ref_input
            .map(text_io::read_f64_series)
            .transpose()?
            .ok_or_else(|| anyhow!("--ref-input is required without --edf"))?;
        let target_data = target_input
            .map(text_io::read_f64_series)
            .transpose()?
            .ok_or_else(|| anyhow!("--target-input is required without --edf"))?;
        (
            TimeSeries {
                fs: ref_fs,
                data: ref_data,
            },
            TimeSeries {
                fs: target_fs,
                data: target_data,
            },
        )
    };

    let ref_train = detect_peaks(&reference, Inversion::Normal);
    let target_train = detect_peaks(&target, Inversion::Normal);
    let series = estimate_delays(&ref_train, reference.fs, &target_train, target.fs);
    let events: Vec<DelayEvent> = series
        .entries()
        .map(|(index, delay_s)| DelayEvent { index, delay_s })
        .collect();
    println!("{}", serde_json::to_string(&events)?);
    Ok(())
}

#[derive(Serialize)]
struct CalibrateOutput {
    #[serde(flatten)]
    summary: CalibrationSummary,
    measured: EnvelopeEvents,
    predicted: EnvelopeEvents,
}

#[allow(clippy::too_many_arguments)]
fn cmd_calibrate(
    edf: Option<&Path>,
    ecg_input: Option<&Path>,
    pleth_input: Option<&Path>,
    abp_input: Option<&Path>,
    fs: f64,
    ecg_channel: usize,
    pleth_channel: usize,
    abp_channel: usize,
    begin_percent: u32,
    end_percent: u32,
    samples_csv: Option<&Path>,
) -> Result<()> {
    let (mut calibrator, ecg, pleth, abp) = if let Some(path) = edf {
        let recording = edf_io::load_edf_recording(path)?;
        let mut calibrator = Calibrator::new(recording.channel_count());
        for (index, channel) in recording.channels.into_iter().enumerate() {
            calibrator.set_samples(index, channel);
        }
        (calibrator, ecg_channel, pleth_channel, abp_channel)
    } else {
        let mut calibrator = Calibrator::new(3);
        let load = |path: Option<&Path>, flag: &str| {
            path.map(text_io::read_f64_series)
                .transpose()?
                .map(|data| TimeSeries { fs, data })
                .ok_or_else(|| anyhow!("{} is required without --edf", flag))
        };
        calibrator.set_samples(0, load(ecg_input, "--ecg-input")?);
        calibrator.set_samples(1, load(pleth_input, "--pleth-input")?);
        calibrator.set_samples(2, load(abp_input, "--abp-input")?);
        (calibrator, 0, 1, 2)
    };

    let window = CalibrationWindow::new(begin_percent, end_percent)?;
    let summary = calibrator.calibrate(ecg, pleth, abp, window)?;

    if let Some(path) = samples_csv {
        write_samples_csv(path, &summary)?;
    }

    let abp_state = calibrator
        .channel(abp)
        .ok_or_else(|| anyhow!("ABP channel {} out of range", abp))?;
    let output = CalibrateOutput {
        measured: envelope_events(&abp_state.measured),
        predicted: envelope_events(&abp_state.predicted),
        summary,
    };
    println!("{}", serde_json::to_string(&output)?);
    Ok(())
}

fn write_samples_csv(path: &Path, summary: &CalibrationSummary) -> Result<()> {
    let mut writer = WriterBuilder::new().from_path(path)?;
    for sample in &summary.samples {
        writer.serialize(sample)?;
    }
    writer.flush()?;
    Ok(())
}
