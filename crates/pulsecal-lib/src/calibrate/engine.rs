use crate::calibrate::least_squares::{LeastSquares, LinearModel};
use crate::detect::delay::estimate_delays;
use crate::detect::envelope::extract_envelope;
use crate::detect::peaks::{detect_peaks, Inversion};
use crate::signal::{DelaySeries, EnvelopePair, PeakTrain, TimeSeries};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("channel {index} is out of range ({count} channels configured)")]
    ChannelOutOfRange { index: usize, count: usize },
    #[error("calibration window must satisfy 0 <= begin < end <= 100, got {begin}..{end}")]
    InvalidWindow { begin: u32, end: u32 },
}

/// Percentage range of the recording used to fit the delay→pressure models.
/// The complement is the held-out validation region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationWindow {
    begin_percent: u32,
    end_percent: u32,
}

impl CalibrationWindow {
    pub fn new(begin_percent: u32, end_percent: u32) -> Result<Self, CalibrationError> {
        if begin_percent >= end_percent || end_percent > 100 {
            return Err(CalibrationError::InvalidWindow {
                begin: begin_percent,
                end: end_percent,
            });
        }
        Ok(Self {
            begin_percent,
            end_percent,
        })
    }

    pub fn begin_percent(&self) -> u32 {
        self.begin_percent
    }

    pub fn end_percent(&self) -> u32 {
        self.end_percent
    }

    /// Half-open sample-index bounds over a channel of `len` samples.
    pub fn bounds(&self, len: usize) -> (usize, usize) {
        let begin = self.begin_percent as usize * len / 100;
        let end = self.end_percent as usize * len / 100;
        (begin, end)
    }

    pub fn contains(&self, index: usize, len: usize) -> bool {
        let (begin, end) = self.bounds(len);
        index >= begin && index < end
    }
}

/// One accepted regression sample: a transit delay paired with the measured
/// envelope extrema of the same beat. All three fields are nonzero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DelayPressureSample {
    pub delay_s: f64,
    pub min_pressure: f64,
    pub max_pressure: f64,
}

/// Mean absolute percentage error between measured and predicted extrema,
/// over the positions where both exist.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ValidationStats {
    pub low_error_percent: f64,
    pub low_points: usize,
    pub high_error_percent: f64,
    pub high_points: usize,
}

/// Outcome of one calibration pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub low: LinearModel,
    pub high: LinearModel,
    /// Accepted regression samples, in sample order.
    pub samples: Vec<DelayPressureSample>,
    pub validation: ValidationStats,
}

/// Everything derived for one channel. The arrays are parallel to the
/// channel's samples and fully overwritten on each calibration pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelState {
    pub series: TimeSeries,
    pub peaks: PeakTrain,
    pub delays: DelaySeries,
    pub measured: EnvelopePair,
    pub predicted: EnvelopePair,
}

impl ChannelState {
    fn assign(&mut self, series: TimeSeries) {
        let len = series.len();
        self.series = series;
        self.reset_derived(len);
    }

    fn reset_derived(&mut self, len: usize) {
        self.peaks = PeakTrain::zeros(len);
        self.delays = DelaySeries::zeros(len);
        self.measured = EnvelopePair::zeros(len);
        self.predicted = EnvelopePair::zeros(len);
    }
}

/// The calibration engine: owns the per-channel state and recomputes every
/// derived array from scratch on each `calibrate` call. Single-threaded;
/// callers serialize passes against buffer replacement.
#[derive(Debug, Clone, Default)]
pub struct Calibrator {
    channels: Vec<ChannelState>,
}

impl Calibrator {
    pub fn new(channel_count: usize) -> Self {
        Self {
            channels: (0..channel_count).map(|_| ChannelState::default()).collect(),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Replace a channel's sample buffer, resetting its derived arrays.
    /// Out-of-range indices are ignored: channels may be configured before
    /// a recording is loaded.
    pub fn set_samples(&mut self, index: usize, series: TimeSeries) {
        if let Some(channel) = self.channels.get_mut(index) {
            channel.assign(series);
        }
    }

    pub fn channel(&self, index: usize) -> Option<&ChannelState> {
        self.channels.get(index)
    }

    fn check_index(&self, index: usize) -> Result<(), CalibrationError> {
        if index >= self.channels.len() {
            return Err(CalibrationError::ChannelOutOfRange {
                index,
                count: self.channels.len(),
            });
        }
        Ok(())
    }

    /// Run the full pipeline: peak detection on the ECG and plethysmogram
    /// channels, envelope extraction on the ABP channel, delay estimation,
    /// the windowed least-squares fit of both pressure models, and the
    /// held-out prediction pass.
    pub fn calibrate(
        &mut self,
        ecg: usize,
        pleth: usize,
        abp: usize,
        window: CalibrationWindow,
    ) -> Result<CalibrationSummary, CalibrationError> {
        self.check_index(ecg)?;
        self.check_index(pleth)?;
        self.check_index(abp)?;

        for channel in self.channels.iter_mut() {
            let len = channel.series.len();
            channel.reset_derived(len);
        }

        let ecg_train = detect_peaks(&self.channels[ecg].series, Inversion::Normal);
        let pleth_train = detect_peaks(&self.channels[pleth].series, Inversion::Normal);
        debug!(
            "detected {} ECG and {} plethysmogram peaks",
            ecg_train.peaks().count(),
            pleth_train.peaks().count()
        );

        // The ABP channel's own peak trains stay internal to the envelope
        // extraction; only the extrema are kept.
        let measured = extract_envelope(&self.channels[abp].series);
        debug!(
            "ABP envelope: {} maxima, {} minima",
            measured.maxima_count(),
            measured.minima_count()
        );

        let ecg_fs = self.channels[ecg].series.fs;
        let pleth_fs = self.channels[pleth].series.fs;
        let abp_fs = self.channels[abp].series.fs;
        let delays = estimate_delays(&ecg_train, ecg_fs, &pleth_train, pleth_fs);

        let abp_len = self.channels[abp].series.len();
        let (summary, predicted) = run_regression(
            &measured,
            &delays,
            abp_fs,
            pleth_fs,
            abp_len,
            window,
        );

        self.channels[ecg].peaks = ecg_train;
        self.channels[pleth].peaks = pleth_train;
        self.channels[pleth].delays = delays;
        self.channels[abp].measured = measured;
        self.channels[abp].predicted = predicted;

        Ok(summary)
    }
}

/// Advance the plethysmogram-side cursor until its time catches up with the
/// ABP index, consuming the latest nonzero delay on the way.
fn advance_cursor(
    delays: &DelaySeries,
    cursor: &mut usize,
    latest: &mut f64,
    abp_index: usize,
    abp_fs: f64,
    pleth_fs: f64,
) {
    while *cursor < delays.len() && (*cursor as f64) * abp_fs < (abp_index as f64) * pleth_fs {
        if delays.delays[*cursor] != 0.0 {
            *latest = delays.delays[*cursor];
        }
        *cursor += 1;
    }
}

fn run_regression(
    measured: &EnvelopePair,
    delays: &DelaySeries,
    abp_fs: f64,
    pleth_fs: f64,
    abp_len: usize,
    window: CalibrationWindow,
) -> (CalibrationSummary, EnvelopePair) {
    let (begin, end) = window.bounds(abp_len);

    // Fitting pass: collect delay/pressure triples inside the window.
    let mut low_fit = LeastSquares::default();
    let mut high_fit = LeastSquares::default();
    let mut samples = Vec::new();
    let mut item = DelayPressureSample::default();
    let mut cursor = 0usize;
    for i in begin..end {
        if measured.minima[i] != 0.0 {
            item.min_pressure = measured.minima[i];
        }
        if measured.maxima[i] != 0.0 {
            item.max_pressure = measured.maxima[i];
        }
        advance_cursor(delays, &mut cursor, &mut item.delay_s, i, abp_fs, pleth_fs);
        if item.delay_s != 0.0 && item.min_pressure != 0.0 && item.max_pressure != 0.0 {
            debug!(
                "sample: delay {:.4} s, low {:.2}, high {:.2}",
                item.delay_s, item.min_pressure, item.max_pressure
            );
            low_fit.add(item.delay_s, item.min_pressure);
            high_fit.add(item.delay_s, item.max_pressure);
            samples.push(item);
            item = DelayPressureSample::default();
        }
    }

    let low = low_fit.fit();
    let high = high_fit.fit();
    info!("low  = {:.2} * t + {:.2} (n = {})", low.a, low.b, low.n);
    info!("high = {:.2} * t + {:.2} (n = {})", high.a, high.b, high.n);

    // Prediction pass over the full recording; written only outside the
    // fitting window.
    let mut predicted = EnvelopePair::zeros(abp_len);
    let mut cursor = 0usize;
    let mut delay = 0.0;
    let mut min_idx: Option<usize> = None;
    let mut max_idx: Option<usize> = None;
    for i in 0..abp_len {
        if measured.minima[i] != 0.0 {
            min_idx = Some(i);
        }
        if measured.maxima[i] != 0.0 {
            max_idx = Some(i);
        }
        advance_cursor(delays, &mut cursor, &mut delay, i, abp_fs, pleth_fs);
        if delay != 0.0 && !window.contains(i, abp_len) {
            if let (Some(mn), Some(mx)) = (min_idx, max_idx) {
                // A tracker may still point at an extremum just inside the
                // window right after crossing its edge; those positions stay
                // held out.
                if !window.contains(mn, abp_len) {
                    predicted.minima[mn] = low.predict(delay);
                }
                if !window.contains(mx, abp_len) {
                    predicted.maxima[mx] = high.predict(delay);
                }
                delay = 0.0;
                min_idx = None;
                max_idx = None;
            }
        }
    }

    let validation = validation_stats(measured, &predicted);
    (
        CalibrationSummary {
            low,
            high,
            samples,
            validation,
        },
        predicted,
    )
}

fn validation_stats(measured: &EnvelopePair, predicted: &EnvelopePair) -> ValidationStats {
    let (low_error_percent, low_points) = mape(&measured.minima, &predicted.minima);
    let (high_error_percent, high_points) = mape(&measured.maxima, &predicted.maxima);
    ValidationStats {
        low_error_percent,
        low_points,
        high_error_percent,
        high_points,
    }
}

fn mape(measured: &[f64], predicted: &[f64]) -> (f64, usize) {
    let mut total = 0.0;
    let mut count = 0usize;
    for (&m, &p) in measured.iter().zip(predicted) {
        if m != 0.0 && p != 0.0 {
            total += 100.0 * (m - p).abs() / m.abs();
            count += 1;
        }
    }
    if count == 0 {
        (0.0, 0)
    } else {
        (total / count as f64, count)
    }
}
