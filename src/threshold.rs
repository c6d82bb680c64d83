//! Noise floor estimation used to calibrate the spike encoder.
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::HfoError;
use crate::utils::{mean, TimeInterval};
use crate::{THRESHOLD_SAMPLE_RATIO, THRESHOLD_WINDOW_SIZE};

/// Parameters of the threshold estimator.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ThresholdParameters {
    /// The length of the windows the calibration signal is partitioned into.
    pub window_size: f64,
    /// The fraction of windows, sorted by peak amplitude, averaged to estimate the noise floor.
    pub sample_ratio: f64,
}

impl Default for ThresholdParameters {
    fn default() -> Self {
        ThresholdParameters {
            window_size: THRESHOLD_WINDOW_SIZE,
            sample_ratio: THRESHOLD_SAMPLE_RATIO,
        }
    }
}

impl ThresholdParameters {
    /// Create new threshold parameters.
    /// The function returns an error if the window size is not positive or the sample ratio is not in (0, 1).
    pub fn build(window_size: f64, sample_ratio: f64) -> Result<Self, HfoError> {
        if !(window_size > 0.0) {
            return Err(HfoError::InvalidParameter(format!(
                "the window size must be positive, got {}",
                window_size
            )));
        }
        if !(sample_ratio > 0.0 && sample_ratio < 1.0) {
            return Err(HfoError::InvalidParameter(format!(
                "the sample ratio must lie in (0, 1), got {}",
                sample_ratio
            )));
        }
        Ok(ThresholdParameters {
            window_size,
            sample_ratio,
        })
    }
}

/// Estimate a detection threshold from the noise floor of a calibration signal.
///
/// The time span `[min(times), max(times)]` is partitioned into consecutive windows of length
/// `window_size`, the last one possibly partial. The peak and (negated) trough amplitudes are
/// collected per window. The threshold is `scaling_factor` times the sum of the mean of the `k`
/// smallest peaks and the mean of the `k` smallest negated troughs, with
/// `k = max(round(num_windows * sample_ratio), 1)`.
///
/// # Errors
/// - `InvalidSignal` if the arrays are empty, mismatched, or if a time is negative.
/// - `InvalidParameter` if the signal spans no time, if the sample ratio is not in (0, 1),
///   if the window size is not positive, or if a window holds no sample.
/// - `DivisionByZero` if the window size yields no window at all.
pub fn find_threshold(
    signal: &[f64],
    times: &[f64],
    window_size: f64,
    sample_ratio: f64,
    scaling_factor: f64,
) -> Result<f64, HfoError> {
    if signal.is_empty() || times.is_empty() {
        return Err(HfoError::InvalidSignal(
            "the calibration signal is empty".to_string(),
        ));
    }
    if signal.len() != times.len() {
        return Err(HfoError::InvalidSignal(format!(
            "got {} amplitudes for {} sample times",
            signal.len(),
            times.len()
        )));
    }

    let (start, end) = times
        .iter()
        .copied()
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()
        .ok_or_else(|| HfoError::InvalidSignal("the calibration signal is empty".to_string()))?;
    if start < 0.0 || start.is_nan() {
        return Err(HfoError::InvalidSignal(format!(
            "sample times must be non-negative, found {}",
            start
        )));
    }
    let duration = end - start;
    if !(duration > 0.0) {
        return Err(HfoError::InvalidParameter(format!(
            "the calibration signal must span a positive duration, got {}",
            duration
        )));
    }
    if !(sample_ratio > 0.0 && sample_ratio < 1.0) {
        return Err(HfoError::InvalidParameter(format!(
            "the sample ratio must lie in (0, 1), got {}",
            sample_ratio
        )));
    }
    if !(window_size > 0.0) {
        return Err(HfoError::InvalidParameter(format!(
            "the window size must be positive, got {}",
            window_size
        )));
    }

    let num_windows = (duration / window_size).ceil();
    if !(num_windows >= 1.0) || !num_windows.is_finite() {
        return Err(HfoError::DivisionByZero(format!(
            "a window size of {} yields no window over {} seconds",
            window_size, duration
        )));
    }
    let num_windows = num_windows as usize;

    let extrema = |(max, min): (f64, f64), v: &f64| (max.max(*v), min.min(*v));
    let empty = (f64::NEG_INFINITY, f64::INFINITY);
    let sorted = times.windows(2).all(|w| w[0] <= w[1]);

    let mut peaks = Vec::with_capacity(num_windows);
    let mut troughs = Vec::with_capacity(num_windows);
    for i in 0..num_windows {
        let window_start = start + i as f64 * window_size;
        let window = TimeInterval::new(window_start, window_start + window_size);
        let (peak, trough) = if sorted {
            signal[window.index_range(times)].iter().fold(empty, extrema)
        } else {
            signal
                .iter()
                .zip(times.iter())
                .filter(|(_, t)| window.contains(**t))
                .map(|(v, _)| v)
                .fold(empty, extrema)
        };
        if peak == f64::NEG_INFINITY {
            return Err(HfoError::InvalidParameter(format!(
                "the window {:?} contains no sample",
                window
            )));
        }
        peaks.push(peak);
        troughs.push(-trough);
    }

    let k = ((num_windows as f64 * sample_ratio).round_ties_even() as usize).max(1);
    peaks.sort_by(|a, b| a.total_cmp(b));
    troughs.sort_by(|a, b| a.total_cmp(b));
    let noise_floor = mean(&peaks[..k]) + mean(&troughs[..k]);

    log::trace!(
        "Noise floor {} estimated over {} windows ({} averaged)",
        noise_floor,
        num_windows,
        k
    );

    Ok(scaling_factor * noise_floor)
}
