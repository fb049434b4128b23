use crate::detect::peaks::MIN_HEART_RATE;
use crate::signal::{DelaySeries, PeakTrain};

/// Match a reference peak train (ECG) against a downstream target train
/// (plethysmogram) and record the per-beat transit delay.
///
/// For every rated reference peak, the target train is scanned forward from
/// the rate-aligned index for the first rated target peak strictly later in
/// time but within `60 / MIN_HEART_RATE` seconds. The delay lands at that
/// target index; reference peaks without a qualifying match contribute
/// nothing. The result is aligned with the target channel.
pub fn estimate_delays(
    reference: &PeakTrain,
    reference_fs: f64,
    target: &PeakTrain,
    target_fs: f64,
) -> DelaySeries {
    let target_len = target.len();
    let mut series = DelaySeries::zeros(target_len);
    if reference.is_empty() || target_len == 0 || reference_fs <= 0.0 || target_fs <= 0.0 {
        return series;
    }

    let max_time_lag = 60.0 / MIN_HEART_RATE;
    for (ref_idx, _) in reference.peaks() {
        let t_ref = ref_idx as f64 / reference_fs;
        let start = (ref_idx as f64 * target_fs / reference_fs) as usize;
        for tgt_idx in start..target_len {
            let lag = tgt_idx as f64 / target_fs - t_ref;
            if lag >= max_time_lag {
                break;
            }
            if lag > 0.0 && target.bpm[tgt_idx] > 0 {
                series.delays[tgt_idx] = lag;
                break;
            }
        }
    }

    series
}
