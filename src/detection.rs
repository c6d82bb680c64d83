//! Window-based HFO event detection from the output spike train of the network.
use serde::{Deserialize, Serialize};

use crate::error::HfoError;
use crate::utils::{check_strictly_increasing, TimeInterval};
use crate::{HFO_DETECTION_STEP_SIZE, HFO_DETECTION_WINDOW_SIZE};

/// Parameters of the sliding window detector.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WindowDetectorParameters {
    /// The time between the starts of two consecutive windows.
    pub step_size: f64,
    /// The length of each window.
    pub window_size: f64,
}

impl Default for WindowDetectorParameters {
    fn default() -> Self {
        WindowDetectorParameters {
            step_size: HFO_DETECTION_STEP_SIZE,
            window_size: HFO_DETECTION_WINDOW_SIZE,
        }
    }
}

impl WindowDetectorParameters {
    /// Create new window detector parameters.
    /// The function returns an error if the step is not positive or larger than the window.
    pub fn build(step_size: f64, window_size: f64) -> Result<Self, HfoError> {
        check_window(step_size, window_size)?;
        Ok(WindowDetectorParameters {
            step_size,
            window_size,
        })
    }
}

/// The HFO periods, i.e., the start and stop times of each run of active samples.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Periods {
    pub start: Vec<f64>,
    pub stop: Vec<f64>,
}

impl Periods {
    pub fn len(&self) -> usize {
        self.start.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TimeInterval> + '_ {
        self.start
            .iter()
            .zip(self.stop.iter())
            .map(|(&start, &stop)| TimeInterval::new(start, stop))
    }
}

/// The result of the HFO detection over one recording.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct HfoDetection {
    /// The number of HFO periods.
    pub total_amount: usize,
    /// The number of HFO periods per second.
    pub frequency: f64,
    /// The HFO periods, in signal time units.
    pub periods: Periods,
    /// The activity of every signal sample.
    pub detections: Vec<bool>,
}

impl HfoDetection {
    /// Returns the number of HFO periods per minute.
    pub fn rate_per_minute(&self) -> f64 {
        60.0 * self.frequency
    }
}

fn check_window(step_size: f64, window_size: f64) -> Result<(), HfoError> {
    if !(window_size > 0.0) {
        return Err(HfoError::InvalidParameter(format!(
            "the window size must be positive, got {}",
            window_size
        )));
    }
    if step_size > window_size {
        return Err(HfoError::InvalidParameter(format!(
            "the step size {} exceeds the window size {}",
            step_size, window_size
        )));
    }
    if step_size == 0.0 {
        return Err(HfoError::DivisionByZero(
            "the step size is zero".to_string(),
        ));
    }
    if !(step_size > 0.0) {
        return Err(HfoError::InvalidParameter(format!(
            "the step size must be positive, got {}",
            step_size
        )));
    }
    Ok(())
}

/// Detect HFO periods from the output spikes of the network.
///
/// Windows `[i * step_size, i * step_size + window_size]` slide over `[0, duration)`.
/// Every sample of `signal_times` inside a window holding at least one spike is marked active.
/// Marks accumulate across overlapping windows and are never cleared.
/// Each run of active samples is then reported as one period, bounded by the times of its first
/// and last samples.
///
/// # Example
/// ```rust
/// use rusty_hfo::detection::detect_hfo;
///
/// let detection = detect_hfo(1.0, &[0.5], &[0.5], 0.1, 0.5).unwrap();
/// assert_eq!(detection.total_amount, 1);
/// assert_eq!(detection.periods.start, vec![0.5]);
/// assert_eq!(detection.periods.stop, vec![0.5]);
/// ```
pub fn detect_hfo(
    duration: f64,
    spike_times: &[f64],
    signal_times: &[f64],
    step_size: f64,
    window_size: f64,
) -> Result<HfoDetection, HfoError> {
    check_window(step_size, window_size)?;
    if !(duration > 0.0) || !duration.is_finite() {
        return Err(HfoError::InvalidParameter(format!(
            "the duration must be positive and finite, got {}",
            duration
        )));
    }
    if signal_times.is_empty() {
        return Err(HfoError::InvalidSignal(
            "the signal has no sample".to_string(),
        ));
    }
    check_strictly_increasing(signal_times)?;

    let mut spike_times = spike_times.to_vec();
    spike_times.sort_by(|a, b| a.total_cmp(b));

    let mut detections = vec![false; signal_times.len()];
    let num_windows = (duration / step_size).ceil() as usize;
    for i in 0..num_windows {
        let start = i as f64 * step_size;
        let window = TimeInterval::new(start, start + window_size);
        if !window.index_range(&spike_times).is_empty() {
            detections[window.index_range(signal_times)]
                .iter_mut()
                .for_each(|active| *active = true);
        }
    }

    let periods = periods_from_detections(&detections, signal_times);
    let total_amount = periods.len();
    let frequency = total_amount as f64 / duration;

    log::debug!(
        "{} HFO periods detected over {} seconds ({} windows)",
        total_amount,
        duration,
        num_windows
    );

    Ok(HfoDetection {
        total_amount,
        frequency,
        periods,
        detections,
    })
}

/// Run-length encode the active samples into periods.
fn periods_from_detections(detections: &[bool], signal_times: &[f64]) -> Periods {
    let mut periods = Periods::default();
    let mut previous = false;
    for (i, &active) in detections.iter().enumerate() {
        match (previous, active) {
            (false, true) => periods.start.push(signal_times[i]),
            (true, false) => periods.stop.push(signal_times[i - 1]),
            _ => {}
        }
        previous = active;
    }
    if previous {
        periods.stop.push(signal_times[signal_times.len() - 1]);
    }
    periods
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_hfo_single_spike() {
        let detection = detect_hfo(1.0, &[0.5], &[0.5], 0.1, 0.5).unwrap();
        assert_eq!(detection.total_amount, 1);
        assert_eq!(detection.frequency, 1.0);
        assert_eq!(detection.periods.start, vec![0.5]);
        assert_eq!(detection.periods.stop, vec![0.5]);
        assert_eq!(detection.detections, vec![true]);
        assert_eq!(detection.rate_per_minute(), 60.0);
    }

    #[test]
    fn test_detect_hfo_no_spike() {
        let signal_times: Vec<f64> = (0..100).map(|i| i as f64 * 0.01).collect();
        let detection = detect_hfo(1.0, &[], &signal_times, 0.01, 0.05).unwrap();
        assert_eq!(detection.total_amount, 0);
        assert_eq!(detection.frequency, 0.0);
        assert!(detection.periods.is_empty());
        assert!(detection.periods.stop.is_empty());
        assert!(detection.detections.iter().all(|active| !active));

        // Spikes beyond the duration are never reached by a window.
        let detection = detect_hfo(0.2, &[5.0], &signal_times, 0.01, 0.05).unwrap();
        assert_eq!(detection.total_amount, 0);
    }

    #[test]
    fn test_detect_hfo_periods() {
        let signal_times: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let detection = detect_hfo(10.0, &[2.5, 7.5], &signal_times, 1.0, 1.0).unwrap();
        // Windows [2, 3] and [7, 8] hold a spike.
        assert_eq!(
            detection.detections,
            vec![false, false, true, true, false, false, false, true, true, false]
        );
        assert_eq!(detection.total_amount, 2);
        assert_eq!(detection.periods.start, vec![2.0, 7.0]);
        assert_eq!(detection.periods.stop, vec![3.0, 8.0]);
        assert_eq!(detection.frequency, 0.2);

        let intervals: Vec<TimeInterval> = detection.periods.iter().collect();
        assert_eq!(intervals[0], TimeInterval::new(2.0, 3.0));
    }

    #[test]
    fn test_detect_hfo_open_period_is_closed_at_last_sample() {
        let signal_times = [0.0, 1.0, 2.0, 3.0];
        let detection = detect_hfo(4.0, &[3.2, 0.1], &signal_times, 1.0, 2.0).unwrap();
        assert_eq!(detection.detections, vec![true, true, true, true]);
        assert_eq!(detection.total_amount, 1);
        assert_eq!(detection.periods.start, vec![0.0]);
        assert_eq!(detection.periods.stop, vec![3.0]);
    }

    #[test]
    fn test_detect_hfo_marks_accumulate() {
        // The window [1, 3] marks samples 1, 2 and 3, the following empty window [2, 4] clears none.
        let signal_times = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let detection = detect_hfo(3.0, &[1.0], &signal_times, 1.0, 2.0).unwrap();
        assert_eq!(
            detection.detections,
            vec![true, true, true, true, false, false]
        );
        assert_eq!(detection.periods.start, vec![0.0]);
        assert_eq!(detection.periods.stop, vec![3.0]);
    }

    #[test]
    fn test_detect_hfo_invalid_parameters() {
        assert!(matches!(
            detect_hfo(1.0, &[0.5], &[0.5], 0.6, 0.5),
            Err(HfoError::InvalidParameter(_))
        ));
        assert!(matches!(
            detect_hfo(0.0, &[0.5], &[0.5], 0.1, 0.5),
            Err(HfoError::InvalidParameter(_))
        ));
        assert!(matches!(
            detect_hfo(-1.0, &[0.5], &[0.5], 0.1, 0.5),
            Err(HfoError::InvalidParameter(_))
        ));
        assert!(matches!(
            detect_hfo(1.0, &[0.5], &[0.5], 0.0, 0.5),
            Err(HfoError::DivisionByZero(_))
        ));
        assert!(matches!(
            detect_hfo(1.0, &[0.5], &[0.5], 0.1, 0.0),
            Err(HfoError::InvalidParameter(_))
        ));
        assert!(matches!(
            detect_hfo(1.0, &[0.5], &[], 0.1, 0.5),
            Err(HfoError::InvalidSignal(_))
        ));
        assert!(matches!(
            detect_hfo(1.0, &[0.5], &[0.5, 0.4], 0.1, 0.5),
            Err(HfoError::InvalidSignal(_))
        ));
    }

    #[test]
    fn test_window_detector_parameters() {
        let parameters = WindowDetectorParameters::default();
        assert_eq!(parameters.step_size, 0.01);
        assert_eq!(parameters.window_size, 0.05);
        assert!(WindowDetectorParameters::build(0.1, 0.05).is_err());
        assert!(WindowDetectorParameters::build(0.05, 0.05).is_ok());
    }
}
