use crate::signal::{PeakTrain, TimeSeries};
use std::collections::VecDeque;

/// Slowest rate the detector will resolve (beats/minute). Sets the width of
/// the sliding normalization window and the maximum transit lag.
pub const MIN_HEART_RATE: f64 = 40.0;

/// Fastest rate the detector will resolve (beats/minute). Sets the
/// refractory period between two accepted peaks.
pub const MAX_HEART_RATE: f64 = 180.0;

/// Normalized threshold a sample must exceed to join a candidate run.
const BARRIER: f64 = 0.8;

/// Signal polarity handling for peak detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inversion {
    /// Peaks point upward.
    Normal,
    /// Peaks point downward; the normalized signal is flipped.
    Inverted,
    /// Flip when the majority of normalized samples sit above 0.5.
    Auto,
}

/// Detect periodic peaks and rate-code them.
///
/// Each sample is normalized against the min/max of the forward-looking
/// window `[i, i + maxInterval)` (the window freezes at its last full
/// position near the end of the buffer). Contiguous runs above the barrier
/// are collapsed to the run's maximum; that sample receives the
/// instantaneous rate in BPM derived from the distance to the previous
/// accepted maximum, or 0 for the first accepted peak. Empty and flat
/// buffers yield an all-zero train.
pub fn detect_peaks(ts: &TimeSeries, inversion: Inversion) -> PeakTrain {
    let n = ts.len();
    let mut train = PeakTrain::zeros(n);
    if n == 0 {
        return train;
    }

    let fs = ts.fs.max(1.0);
    let max_interval = ((fs / (MIN_HEART_RATE / 60.0)) as usize).max(1);
    let min_interval = ((fs / (MAX_HEART_RATE / 60.0)) as usize).max(1);

    let mut normalized = normalize(&ts.data, max_interval);
    let above_half = normalized.iter().filter(|&&v| v > 0.5).count();
    if inversion == Inversion::Inverted || (inversion == Inversion::Auto && above_half > n / 2) {
        for value in normalized.iter_mut() {
            *value = 1.0 - *value;
        }
    }

    let mut prev_max: Option<usize> = None;
    let mut run: Option<(usize, usize, f64)> = None; // (start, max index, max value)
    for i in 0..n {
        let refractory_ok = match prev_max {
            Some(prev) => i - prev > min_interval,
            None => true,
        };
        if normalized[i] > BARRIER && refractory_ok {
            match run {
                None => run = Some((i, i, normalized[i])),
                Some((start, max_idx, max_val)) => {
                    if normalized[i] > max_val {
                        run = Some((start, i, normalized[i]));
                    } else {
                        run = Some((start, max_idx, max_val));
                    }
                }
            }
        } else if let Some((start, max_idx, _)) = run.take() {
            finish_run(&mut train, &mut prev_max, fs, start, i, max_idx);
        }
    }
    if let Some((start, max_idx, _)) = run {
        finish_run(&mut train, &mut prev_max, fs, start, n, max_idx);
    }

    train
}

/// Commit one candidate run. Length-1 runs are discarded; the first kept
/// run updates the previous-maximum tracker without a rate (rate needs two
/// peaks).
fn finish_run(
    train: &mut PeakTrain,
    prev_max: &mut Option<usize>,
    fs: f64,
    start: usize,
    end: usize,
    max_idx: usize,
) {
    if end - start < 2 {
        return;
    }
    if let Some(prev) = *prev_max {
        train.bpm[max_idx] = (fs * 60.0 / (max_idx - prev) as f64).round() as u32;
    }
    *prev_max = Some(max_idx);
}

/// Map each sample to `(x - min) / (max - min)` over its forward-looking
/// window, or 0 where the window is flat.
fn normalize(data: &[f64], max_interval: usize) -> Vec<f64> {
    let n = data.len();
    let win = max_interval.min(n);
    let (mins, maxs) = sliding_min_max(data, win);
    let last = n - win;
    data.iter()
        .enumerate()
        .map(|(i, &x)| {
            let pos = i.min(last);
            let (lo, hi) = (mins[pos], maxs[pos]);
            if hi == lo {
                0.0
            } else {
                (x - lo) / (hi - lo)
            }
        })
        .collect()
}

/// Min and max for every window position `p` in `0..=n-win`, computed with
/// monotonic deques in O(n).
fn sliding_min_max(data: &[f64], win: usize) -> (Vec<f64>, Vec<f64>) {
    let n = data.len();
    let positions = n - win + 1;
    let mut mins = Vec::with_capacity(positions);
    let mut maxs = Vec::with_capacity(positions);
    let mut min_deque: VecDeque<usize> = VecDeque::new();
    let mut max_deque: VecDeque<usize> = VecDeque::new();
    for i in 0..n {
        while min_deque.back().is_some_and(|&b| data[b] >= data[i]) {
            min_deque.pop_back();
        }
        min_deque.push_back(i);
        while max_deque.back().is_some_and(|&b| data[b] <= data[i]) {
            max_deque.pop_back();
        }
        max_deque.push_back(i);
        if i + 1 >= win {
            let start = i + 1 - win;
            while min_deque.front().is_some_and(|&f| f < start) {
                min_deque.pop_front();
            }
            while max_deque.front().is_some_and(|&f| f < start) {
                max_deque.pop_front();
            }
            if let (Some(&lo), Some(&hi)) = (min_deque.front(), max_deque.front()) {
                mins.push(data[lo]);
                maxs.push(data[hi]);
            }
        }
    }
    (mins, maxs)
}
