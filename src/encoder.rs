//! Adaptive delta modulation (ADM) of sampled signals into UP/DOWN spike trains.
//!
//! Two interchangeable algorithms are available, see [`SignalToSpikeAlgorithm`]:
//! - `Default` upsamples the signal by linear interpolation and stamps spikes on the upsampled grid,
//!   the refractory period being counted in upsampled samples.
//! - `Realistic` computes the exact crossing instants by linear interpolation between samples,
//!   resampling the signal first if the refractory period is shorter than the sampling period.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::HfoError;
use crate::signal::Signal;
use crate::spike_train::SpikeTrain;
use crate::INTERPOLATION_FACTOR;

mod realistic;
mod upsampling;

/// The algorithm used to convert a signal into spikes.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalToSpikeAlgorithm {
    /// Linear interpolation upsampling, spikes on the upsampled grid.
    #[default]
    Default,
    /// Exact crossing instants, with resampling for sub-sample refractory periods.
    Realistic,
}

impl FromStr for SignalToSpikeAlgorithm {
    type Err = HfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(SignalToSpikeAlgorithm::Default),
            "realistic" => Ok(SignalToSpikeAlgorithm::Realistic),
            other => Err(HfoError::UnsupportedConfiguration(format!(
                "unknown signal to spike algorithm {}",
                other
            ))),
        }
    }
}

impl fmt::Display for SignalToSpikeAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SignalToSpikeAlgorithm::Default => write!(f, "default"),
            SignalToSpikeAlgorithm::Realistic => write!(f, "realistic"),
        }
    }
}

impl SignalToSpikeAlgorithm {
    /// Encode the signal into an UP/DOWN spike train.
    /// The interpolation factor (in samples per unit of time) is only used by the `Default` algorithm.
    pub fn encode(
        &self,
        signal: &Signal,
        threshold_up: f64,
        threshold_down: f64,
        refractory_period: f64,
        interpolation_factor: f64,
    ) -> Result<SpikeTrain, HfoError> {
        check_encoder_inputs(signal, threshold_up, threshold_down, refractory_period)?;
        let spike_train = match self {
            SignalToSpikeAlgorithm::Default => upsampling::encode(
                signal,
                threshold_up,
                threshold_down,
                refractory_period,
                interpolation_factor,
            )?,
            SignalToSpikeAlgorithm::Realistic => {
                realistic::encode(signal, threshold_up, threshold_down, refractory_period)?
            }
        };

        log::trace!(
            "{} encoder produced {} UP and {} DOWN spikes",
            self,
            spike_train.up().len(),
            spike_train.down().len()
        );

        Ok(spike_train)
    }
}

/// Parameters of the spike encoder.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct EncoderParameters {
    /// The rise that triggers an UP spike.
    pub threshold_up: f64,
    /// The fall that triggers a DOWN spike.
    pub threshold_down: f64,
    /// The minimum time between two consecutive spikes.
    pub refractory_period: f64,
    /// The number of upsampled points per unit of time.
    pub interpolation_factor: f64,
    /// The encoding algorithm.
    pub algorithm: SignalToSpikeAlgorithm,
}

impl EncoderParameters {
    /// Create new encoder parameters.
    /// The function returns an error if a threshold is negative or not finite, if the refractory
    /// period is negative or not finite, or if the interpolation factor is not positive.
    pub fn build(
        threshold_up: f64,
        threshold_down: f64,
        refractory_period: f64,
        interpolation_factor: f64,
        algorithm: SignalToSpikeAlgorithm,
    ) -> Result<Self, HfoError> {
        check_thresholds(threshold_up, threshold_down, refractory_period)?;
        check_interpolation_factor(interpolation_factor)?;
        Ok(EncoderParameters {
            threshold_up,
            threshold_down,
            refractory_period,
            interpolation_factor,
            algorithm,
        })
    }

    /// Create symmetric encoder parameters with the default interpolation factor.
    pub fn symmetric(
        threshold: f64,
        refractory_period: f64,
        algorithm: SignalToSpikeAlgorithm,
    ) -> Result<Self, HfoError> {
        EncoderParameters::build(
            threshold,
            threshold,
            refractory_period,
            INTERPOLATION_FACTOR,
            algorithm,
        )
    }

    /// Encode the signal with these parameters.
    pub fn encode(&self, signal: &Signal) -> Result<SpikeTrain, HfoError> {
        self.algorithm.encode(
            signal,
            self.threshold_up,
            self.threshold_down,
            self.refractory_period,
            self.interpolation_factor,
        )
    }
}

/// Encode the samples `(times, signal)` into an UP/DOWN spike train with the `Default` algorithm.
///
/// # Example
/// ```rust
/// use rusty_hfo::encoder::signal_to_spike;
///
/// let spike_train = signal_to_spike(&[0.0, 10.0, -20.0], &[0.0, 1.0, 2.0], 3.0, 0.5, 0.01, 10.0).unwrap();
/// assert_eq!(spike_train.up().len(), 3);
/// assert_eq!(spike_train.down().len(), 10);
/// ```
pub fn signal_to_spike(
    signal: &[f64],
    times: &[f64],
    threshold_up: f64,
    threshold_down: f64,
    refractory_period: f64,
    interpolation_factor: f64,
) -> Result<SpikeTrain, HfoError> {
    let signal = Signal::build(times.to_vec(), signal.to_vec())?;
    SignalToSpikeAlgorithm::Default.encode(
        &signal,
        threshold_up,
        threshold_down,
        refractory_period,
        interpolation_factor,
    )
}

fn check_thresholds(
    threshold_up: f64,
    threshold_down: f64,
    refractory_period: f64,
) -> Result<(), HfoError> {
    for (name, value) in [
        ("UP threshold", threshold_up),
        ("DOWN threshold", threshold_down),
        ("refractory period", refractory_period),
    ] {
        if !(value >= 0.0) || !value.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "the {} must be non-negative and finite, got {}",
                name, value
            )));
        }
    }
    Ok(())
}

fn check_interpolation_factor(interpolation_factor: f64) -> Result<(), HfoError> {
    if !(interpolation_factor > 0.0) || !interpolation_factor.is_finite() {
        return Err(HfoError::InvalidParameter(format!(
            "the interpolation factor must be positive and finite, got {}",
            interpolation_factor
        )));
    }
    Ok(())
}

fn check_encoder_inputs(
    signal: &Signal,
    threshold_up: f64,
    threshold_down: f64,
    refractory_period: f64,
) -> Result<(), HfoError> {
    check_thresholds(threshold_up, threshold_down, refractory_period)?;
    if signal.len() < 2 {
        return Err(HfoError::InvalidSignal(format!(
            "encoding needs at least 2 samples, got {}",
            signal.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!(
            "default".parse::<SignalToSpikeAlgorithm>(),
            Ok(SignalToSpikeAlgorithm::Default)
        );
        assert_eq!(
            " Realistic ".parse::<SignalToSpikeAlgorithm>(),
            Ok(SignalToSpikeAlgorithm::Realistic)
        );
        assert!(matches!(
            "brian".parse::<SignalToSpikeAlgorithm>(),
            Err(HfoError::UnsupportedConfiguration(_))
        ));
        assert_eq!(SignalToSpikeAlgorithm::Realistic.to_string(), "realistic");
    }

    #[test]
    fn test_encoder_parameters_validation() {
        let default = SignalToSpikeAlgorithm::Default;
        assert!(EncoderParameters::build(1.0, 1.0, 3e-4, 35000.0, default).is_ok());
        assert!(EncoderParameters::build(-1.0, 1.0, 3e-4, 35000.0, default).is_err());
        assert!(EncoderParameters::build(1.0, f64::NAN, 3e-4, 35000.0, default).is_err());
        assert!(EncoderParameters::build(1.0, 1.0, -3e-4, 35000.0, default).is_err());
        assert!(EncoderParameters::build(1.0, 1.0, 3e-4, 0.0, default).is_err());

        let parameters =
            EncoderParameters::symmetric(2.0, 1e-3, SignalToSpikeAlgorithm::Realistic).unwrap();
        assert_eq!(parameters.threshold_up, parameters.threshold_down);
        assert_eq!(parameters.interpolation_factor, INTERPOLATION_FACTOR);
    }

    #[test]
    fn test_signal_to_spike_reference() {
        let spike_train =
            signal_to_spike(&[0.0, 10.0, -20.0], &[0.0, 1.0, 2.0], 3.0, 0.5, 0.01, 10.0).unwrap();

        let expected_up = [6.0 / 19.0, 12.0 / 19.0, 18.0 / 19.0];
        assert_eq!(spike_train.up().len(), expected_up.len());
        for (t, e) in spike_train.up().iter().zip(expected_up.iter()) {
            assert!((t - e).abs() <= 1e-6 * e.abs());
        }

        let expected_down: Vec<f64> = (20..=38).step_by(2).map(|i| i as f64 / 19.0).collect();
        assert_eq!(spike_train.down().len(), 10);
        for (t, e) in spike_train.down().iter().zip(expected_down.iter()) {
            assert!((t - e).abs() <= 1e-6 * e.abs());
        }
        assert_eq!(spike_train.down()[9], 2.0);
    }

    #[test]
    fn test_signal_to_spike_invalid_inputs() {
        assert!(matches!(
            signal_to_spike(&[0.0], &[0.0], 1.0, 1.0, 0.1, 10.0),
            Err(HfoError::InvalidSignal(_))
        ));
        assert!(matches!(
            signal_to_spike(&[0.0, 1.0], &[1.0, 0.0], 1.0, 1.0, 0.1, 10.0),
            Err(HfoError::InvalidSignal(_))
        ));
        assert!(matches!(
            signal_to_spike(&[0.0, 1.0], &[0.0, 1.0], -1.0, 1.0, 0.1, 10.0),
            Err(HfoError::InvalidParameter(_))
        ));
        assert!(matches!(
            signal_to_spike(&[0.0, 1.0], &[0.0, 1.0], 1.0, 1.0, 0.1, 1.0),
            Err(HfoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_algorithms_agree_on_slow_ramp() {
        let times: Vec<f64> = (0..=100).map(|i| i as f64 * 0.01).collect();
        let amplitudes: Vec<f64> = times.iter().map(|t| 10.0 * t).collect();
        let signal = Signal::build(times, amplitudes).unwrap();

        let encode = |algorithm| {
            EncoderParameters::build(1.0, 1.0, 1e-3, 1000.0, algorithm)
                .unwrap()
                .encode(&signal)
                .unwrap()
        };
        let default = encode(SignalToSpikeAlgorithm::Default);
        let realistic = encode(SignalToSpikeAlgorithm::Realistic);

        assert!(default.down().is_empty());
        assert!(realistic.down().is_empty());
        assert_eq!(default.up().len(), 9);
        assert_eq!(realistic.up().len(), 9);
        for (t1, t2) in default.up().iter().zip(realistic.up().iter()) {
            assert!((t1 - t2).abs() < 1e-2);
        }
    }

    #[test]
    fn test_spike_trains_are_monotonic() {
        let times: Vec<f64> = (0..500).map(|i| i as f64 / 2000.0).collect();
        let amplitudes: Vec<f64> = times
            .iter()
            .map(|t| {
                let phase = 2.0 * std::f64::consts::PI * t;
                50.0 * (120.0 * phase).sin() + 20.0 * (310.0 * phase).cos()
            })
            .collect();
        let signal = Signal::build(times, amplitudes).unwrap();

        for algorithm in [SignalToSpikeAlgorithm::Default, SignalToSpikeAlgorithm::Realistic] {
            let spike_train = algorithm.encode(&signal, 5.0, 5.0, 3e-4, 35000.0).unwrap();
            assert!(!spike_train.is_empty());
            assert!(spike_train.up().windows(2).all(|w| w[0] <= w[1]));
            assert!(spike_train.down().windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
