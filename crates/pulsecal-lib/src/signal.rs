use serde::{Deserialize, Serialize};

/// Basic typed time series: one recording channel's samples at a uniform rate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        if self.fs > 0.0 {
            self.data.len() as f64 / self.fs
        } else {
            0.0
        }
    }
}

/// Rate-coded peak train aligned index-for-index with its channel.
///
/// An entry of 0 means "no peak here"; a positive entry is the instantaneous
/// heart rate in beats/minute, attributed to the sample holding the peak's
/// true maximum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakTrain {
    pub bpm: Vec<u32>,
}

impl PeakTrain {
    pub fn zeros(len: usize) -> Self {
        Self { bpm: vec![0; len] }
    }

    pub fn len(&self) -> usize {
        self.bpm.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bpm.is_empty()
    }

    /// Iterate `(sample index, rate in BPM)` over the rated peaks.
    pub fn peaks(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.bpm
            .iter()
            .enumerate()
            .filter(|(_, &rate)| rate > 0)
            .map(|(idx, &rate)| (idx, rate))
    }
}

/// Per-sample pulse transit delays, aligned with the target channel.
/// 0 means "no delay computed at this sample"; positive values are seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelaySeries {
    pub delays: Vec<f64>,
}

impl DelaySeries {
    pub fn zeros(len: usize) -> Self {
        Self {
            delays: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.delays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// Iterate `(target sample index, delay in seconds)` over computed entries.
    pub fn entries(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.delays
            .iter()
            .enumerate()
            .filter(|(_, &delay)| delay != 0.0)
            .map(|(idx, &delay)| (idx, delay))
    }
}

/// Per-beat extrema of a pressure-like channel, as two parallel sparse
/// arrays (0 = no extremum at this index). The same shape carries both the
/// measured envelope and the model-predicted one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvelopePair {
    pub minima: Vec<f64>,
    pub maxima: Vec<f64>,
}

impl EnvelopePair {
    pub fn zeros(len: usize) -> Self {
        Self {
            minima: vec![0.0; len],
            maxima: vec![0.0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.minima.len()
    }

    pub fn is_empty(&self) -> bool {
        self.minima.is_empty()
    }

    pub fn minima_count(&self) -> usize {
        self.minima.iter().filter(|&&v| v != 0.0).count()
    }

    pub fn maxima_count(&self) -> usize {
        self.maxima.iter().filter(|&&v| v != 0.0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_train_iterates_rated_peaks_only() {
        let mut train = PeakTrain::zeros(10);
        train.bpm[3] = 72;
        train.bpm[8] = 75;
        let peaks: Vec<(usize, u32)> = train.peaks().collect();
        assert_eq!(peaks, vec![(3, 72), (8, 75)]);
    }

    #[test]
    fn envelope_counts_skip_zero_sentinel() {
        let mut pair = EnvelopePair::zeros(5);
        pair.minima[1] = 80.0;
        pair.maxima[2] = 120.0;
        pair.maxima[4] = 118.0;
        assert_eq!(pair.minima_count(), 1);
        assert_eq!(pair.maxima_count(), 2);
    }
}
