//! Synthetic wideband recordings: Gaussian background noise with injected oscillatory bursts.
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::HfoError;
use crate::pipeline::IntervalData;
use crate::signal::Signal;

/// An oscillatory burst with a Hann envelope.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Burst {
    /// The start of the burst (in seconds).
    pub start: f64,
    /// The length of the burst (in seconds).
    pub duration: f64,
    /// The oscillation frequency (in Hz).
    pub frequency: f64,
    /// The peak amplitude.
    pub amplitude: f64,
}

impl Burst {
    pub fn new(start: f64, duration: f64, frequency: f64, amplitude: f64) -> Self {
        Burst {
            start,
            duration,
            frequency,
            amplitude,
        }
    }

    /// Returns the value of the burst at the given time, zero outside of it.
    pub fn value_at(&self, time: f64) -> f64 {
        let elapsed = time - self.start;
        if elapsed < 0.0 || elapsed > self.duration {
            return 0.0;
        }
        let envelope = 0.5 * (1.0 - (2.0 * PI * elapsed / self.duration).cos());
        self.amplitude * envelope * (2.0 * PI * self.frequency * elapsed).sin()
    }
}

/// A recipe for synthetic recordings.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SyntheticRecording {
    sampling_frequency: f64,
    duration: f64,
    noise_std: f64,
    bursts: Vec<Burst>,
}

impl SyntheticRecording {
    /// Create a recipe for recordings of the given duration, without burst.
    /// The function returns an error if the sampling frequency or the duration is not positive,
    /// or if the noise standard deviation is negative.
    pub fn build(sampling_frequency: f64, duration: f64, noise_std: f64) -> Result<Self, HfoError> {
        if !(sampling_frequency > 0.0) || !sampling_frequency.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "the sampling frequency must be positive, got {}",
                sampling_frequency
            )));
        }
        if !(duration > 0.0) || !duration.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "the duration must be positive, got {}",
                duration
            )));
        }
        if !(noise_std >= 0.0) || !noise_std.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "the noise standard deviation must be non-negative, got {}",
                noise_std
            )));
        }
        Ok(SyntheticRecording {
            sampling_frequency,
            duration,
            noise_std,
            bursts: vec![],
        })
    }

    /// Add a burst to the recipe.
    /// The function returns an error if the burst does not fit in the recording or if its
    /// frequency is beyond the Nyquist frequency.
    pub fn add_burst(&mut self, burst: Burst) -> Result<(), HfoError> {
        let end = burst.start + burst.duration;
        if !(burst.duration > 0.0) || burst.start < 0.0 || end > self.duration {
            return Err(HfoError::InvalidParameter(format!(
                "the burst [{}, {}] does not fit in a recording of {} seconds",
                burst.start, end, self.duration
            )));
        }
        if !(burst.frequency > 0.0 && burst.frequency < 0.5 * self.sampling_frequency) {
            return Err(HfoError::InvalidParameter(format!(
                "the burst frequency {} is not below the Nyquist frequency {}",
                burst.frequency,
                0.5 * self.sampling_frequency
            )));
        }
        self.bursts.push(burst);
        Ok(())
    }

    pub fn bursts(&self) -> &[Burst] {
        &self.bursts
    }

    pub fn num_samples(&self) -> usize {
        (self.duration * self.sampling_frequency).round() as usize
    }

    /// Returns the sample times, starting at zero.
    pub fn times(&self) -> Vec<f64> {
        (0..self.num_samples())
            .map(|i| i as f64 / self.sampling_frequency)
            .collect()
    }

    /// Sample a recording.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<Signal, HfoError> {
        let times = self.times();
        let amplitudes = self.sample_amplitudes(&times, rng)?;
        Signal::build(times, amplitudes)
    }

    /// Sample a recording interval with independent noise on every channel.
    pub fn sample_interval<R: Rng>(
        &self,
        number: usize,
        num_channels: usize,
        rng: &mut R,
    ) -> Result<IntervalData, HfoError> {
        let times = self.times();
        let signals = (0..num_channels)
            .map(|_| self.sample_amplitudes(&times, rng))
            .collect::<Result<Vec<_>, _>>()?;
        let labels = (0..num_channels).map(|c| format!("CH{}", c + 1)).collect();
        IntervalData::build(number, times, labels, signals)
    }

    fn sample_amplitudes<R: Rng>(&self, times: &[f64], rng: &mut R) -> Result<Vec<f64>, HfoError> {
        let noise = Normal::new(0.0, self.noise_std)
            .map_err(|e| HfoError::InvalidParameter(e.to_string()))?;
        Ok(times
            .iter()
            .map(|&t| {
                noise.sample(rng) + self.bursts.iter().map(|burst| burst.value_at(t)).sum::<f64>()
            })
            .collect())
    }
}
