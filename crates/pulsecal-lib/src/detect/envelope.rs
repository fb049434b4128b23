use crate::detect::peaks::{detect_peaks, Inversion};
use crate::signal::{EnvelopePair, TimeSeries};

/// Extract per-beat minima and maxima of a pressure-like channel.
///
/// Maxima come from a normal-polarity detection pass: the raw sample value
/// is recorded wherever that pass rated a peak. Minima come from an
/// inverted pass, constrained so that exactly one minimum survives between
/// two consecutive maxima: the running minimum since the last maximum is
/// committed each time a maximum boundary is crossed. A trailing candidate
/// with no maximum after it is dropped.
pub fn extract_envelope(ts: &TimeSeries) -> EnvelopePair {
    let n = ts.len();
    let mut pair = EnvelopePair::zeros(n);
    if n == 0 {
        return pair;
    }

    let max_train = detect_peaks(ts, Inversion::Normal);
    for (idx, _) in max_train.peaks() {
        pair.maxima[idx] = ts.data[idx];
    }

    let min_train = detect_peaks(ts, Inversion::Inverted);
    let mut candidate: Option<(usize, f64)> = None;
    for i in 0..n {
        if min_train.bpm[i] > 0 {
            let value = ts.data[i];
            if candidate.map_or(true, |(_, best)| value < best) {
                candidate = Some((i, value));
            }
        }
        if pair.maxima[i] != 0.0 {
            if let Some((idx, _)) = candidate.take() {
                // Never pair a minimum onto an index already holding a maximum.
                if pair.maxima[idx] == 0.0 {
                    pair.minima[idx] = ts.data[idx];
                }
            }
        }
    }

    pair
}
