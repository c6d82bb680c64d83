//! Sampled signals, i.e., ordered sequences of (time, amplitude) samples.
use serde::{Deserialize, Serialize};

use crate::error::HfoError;
use crate::utils::{check_strictly_increasing, interpolate, linspace, TimeInterval};

/// A sampled signal with strictly increasing sample times.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Signal {
    times: Vec<f64>,
    amplitudes: Vec<f64>,
}

impl Signal {
    /// Create a signal from its sample times and amplitudes.
    /// The function returns an error if the arrays are empty or mismatched, if a value is not finite,
    /// or if the times are not strictly increasing.
    pub fn build(times: Vec<f64>, amplitudes: Vec<f64>) -> Result<Self, HfoError> {
        if times.is_empty() {
            return Err(HfoError::InvalidSignal(
                "a signal needs at least one sample".to_string(),
            ));
        }
        if times.len() != amplitudes.len() {
            return Err(HfoError::InvalidSignal(format!(
                "got {} sample times for {} amplitudes",
                times.len(),
                amplitudes.len()
            )));
        }
        if amplitudes.iter().any(|a| !a.is_finite()) {
            return Err(HfoError::InvalidSignal(
                "amplitudes must be finite".to_string(),
            ));
        }
        check_strictly_increasing(&times)?;

        Ok(Signal { times, amplitudes })
    }

    /// Create a uniformly sampled signal starting at `start` with the given sampling frequency.
    pub fn from_sampling_frequency(
        amplitudes: Vec<f64>,
        sampling_frequency: f64,
        start: f64,
    ) -> Result<Self, HfoError> {
        if sampling_frequency <= 0.0 || !sampling_frequency.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "sampling frequency must be positive, got {}",
                sampling_frequency
            )));
        }
        let times = (0..amplitudes.len())
            .map(|i| start + i as f64 / sampling_frequency)
            .collect();
        Signal::build(times, amplitudes)
    }

    /// Returns a signal on the same time axis with new amplitudes, e.g., a filtered version.
    pub fn with_amplitudes(&self, amplitudes: Vec<f64>) -> Result<Self, HfoError> {
        Signal::build(self.times.clone(), amplitudes)
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn amplitudes(&self) -> &[f64] {
        &self.amplitudes
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first_time(&self) -> f64 {
        self.times[0]
    }

    pub fn last_time(&self) -> f64 {
        self.times[self.times.len() - 1]
    }

    /// Returns the time span between the first and the last samples.
    pub fn duration(&self) -> f64 {
        self.last_time() - self.first_time()
    }

    /// Returns the sampling period, i.e., the time step between the first two samples.
    pub fn sampling_period(&self) -> Option<f64> {
        match self.times.len() {
            0 | 1 => None,
            _ => Some(self.times[1] - self.times[0]),
        }
    }

    /// Returns the sampling frequency, i.e., the inverse of the sampling period.
    pub fn sampling_frequency(&self) -> Option<f64> {
        self.sampling_period().map(|dt| 1.0 / dt)
    }

    /// Returns the prefix of the signal made of the samples at times not exceeding `time`.
    pub fn until(&self, time: f64) -> Result<Self, HfoError> {
        let interval = TimeInterval::new(f64::NEG_INFINITY, time);
        let range = interval.index_range(&self.times);
        if range.is_empty() {
            return Err(HfoError::InvalidSignal(format!(
                "no sample at or before time {}",
                time
            )));
        }
        Ok(Signal {
            times: self.times[range.clone()].to_vec(),
            amplitudes: self.amplitudes[range].to_vec(),
        })
    }

    /// Returns the amplitude at the given time by linear interpolation, clamped outside the signal.
    pub fn value_at(&self, time: f64) -> f64 {
        interpolate(&self.times, &self.amplitudes, &[time])[0]
    }

    /// Returns the signal linearly interpolated at `n` evenly spaced times spanning the signal.
    pub fn resample(&self, n: usize) -> Result<Self, HfoError> {
        if n < 2 {
            return Err(HfoError::InvalidParameter(format!(
                "resampling needs at least 2 points, got {}",
                n
            )));
        }
        let times = linspace(self.first_time(), self.last_time(), n);
        let amplitudes = interpolate(&self.times, &self.amplitudes, &times);
        Signal::build(times, amplitudes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build() {
        assert!(Signal::build(vec![0.0, 1.0], vec![1.0, 2.0]).is_ok());
        assert!(matches!(
            Signal::build(vec![], vec![]),
            Err(HfoError::InvalidSignal(_))
        ));
        assert!(matches!(
            Signal::build(vec![0.0, 1.0], vec![1.0]),
            Err(HfoError::InvalidSignal(_))
        ));
        assert!(matches!(
            Signal::build(vec![1.0, 0.0], vec![1.0, 2.0]),
            Err(HfoError::InvalidSignal(_))
        ));
        assert!(matches!(
            Signal::build(vec![0.0, 1.0], vec![1.0, f64::INFINITY]),
            Err(HfoError::InvalidSignal(_))
        ));
    }

    #[test]
    fn test_sampling_frequency() {
        let signal = Signal::from_sampling_frequency(vec![0.0; 5], 2000.0, 0.0).unwrap();
        assert_eq!(signal.sampling_period(), Some(1.0 / 2000.0));
        assert!((signal.sampling_frequency().unwrap() - 2000.0).abs() < 1e-9);
        assert!((signal.duration() - 4.0 / 2000.0).abs() < 1e-12);

        let single = Signal::build(vec![3.0], vec![1.0]).unwrap();
        assert_eq!(single.sampling_period(), None);
        assert!(Signal::from_sampling_frequency(vec![0.0], 0.0, 0.0).is_err());
    }

    #[test]
    fn test_until() {
        let signal = Signal::build(vec![0.0, 0.5, 1.0, 1.5], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let prefix = signal.until(1.0).unwrap();
        assert_eq!(prefix.times(), &[0.0, 0.5, 1.0]);
        assert_eq!(prefix.amplitudes(), &[1.0, 2.0, 3.0]);
        assert_eq!(signal.until(10.0).unwrap(), signal);
        assert!(signal.until(-0.1).is_err());
    }

    #[test]
    fn test_resample() {
        let signal = Signal::build(vec![0.0, 1.0, 2.0], vec![0.0, 4.0, 0.0]).unwrap();
        let resampled = signal.resample(5).unwrap();
        assert_eq!(resampled.times(), &[0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(resampled.amplitudes(), &[0.0, 2.0, 4.0, 2.0, 0.0]);
        assert!(signal.resample(1).is_err());
    }

    #[test]
    fn test_value_at() {
        let signal = Signal::build(vec![0.0, 1.0, 2.0], vec![0.0, 4.0, 0.0]).unwrap();
        assert_eq!(signal.value_at(0.25), 1.0);
        assert_eq!(signal.value_at(1.5), 2.0);
        assert_eq!(signal.value_at(-1.0), 0.0);
        assert_eq!(signal.value_at(5.0), 0.0);
    }
}
