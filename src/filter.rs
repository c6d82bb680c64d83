//! Digital Butterworth bandpass filters.
//!
//! The design follows the classical recipe: analog lowpass prototype, lowpass to bandpass
//! transformation, and bilinear transform with pre-warped cutoff frequencies.
//! The filter is applied forward only, with zero initial conditions.
use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::HfoError;
use crate::signal::Signal;

/// Sampling frequency of the normalized digital domain used during the design.
const NORMALIZED_SAMPLING_FREQUENCY: f64 = 2.0;

/// Parameters of a Butterworth bandpass filter.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FilterParameters {
    /// The lower cutoff frequency (in Hz).
    pub lowcut: f64,
    /// The upper cutoff frequency (in Hz).
    pub highcut: f64,
    /// The sampling frequency of the signal to filter (in Hz).
    pub sampling_frequency: f64,
    /// The order of the analog lowpass prototype.
    pub order: usize,
}

impl FilterParameters {
    /// Create new filter parameters.
    /// The function returns an error if the sampling frequency is zero or if a normalized cutoff
    /// frequency falls outside (0, 1).
    pub fn build(
        lowcut: f64,
        highcut: f64,
        sampling_frequency: f64,
        order: usize,
    ) -> Result<Self, HfoError> {
        let parameters = FilterParameters {
            lowcut,
            highcut,
            sampling_frequency,
            order,
        };
        parameters.normalized_cutoffs()?;
        Ok(parameters)
    }

    /// Returns the cutoff frequencies normalized by the Nyquist frequency.
    pub fn normalized_cutoffs(&self) -> Result<[f64; 2], HfoError> {
        if self.order == 0 {
            return Err(HfoError::InvalidParameter(
                "the filter order must be at least 1".to_string(),
            ));
        }
        if self.sampling_frequency == 0.0 {
            return Err(HfoError::DivisionByZero(
                "the sampling frequency is zero".to_string(),
            ));
        }
        let nyquist = 0.5 * self.sampling_frequency;
        let cutoffs = [self.lowcut / nyquist, self.highcut / nyquist];
        if let Some(wn) = cutoffs.iter().find(|wn| !(**wn > 0.0 && **wn < 1.0)) {
            return Err(HfoError::InvalidParameter(format!(
                "normalized cutoff frequencies must lie in (0, 1), got {}",
                wn
            )));
        }
        Ok(cutoffs)
    }
}

/// A digital IIR filter in transfer function form, i.e., numerator `b` and denominator `a`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ButterworthBandpass {
    b: Vec<f64>,
    a: Vec<f64>,
}

impl ButterworthBandpass {
    /// Design a Butterworth bandpass filter of order `2 * order`.
    pub fn design(parameters: &FilterParameters) -> Result<Self, HfoError> {
        let [low, high] = parameters.normalized_cutoffs()?;
        let order = parameters.order;
        let fs2 = 2.0 * NORMALIZED_SAMPLING_FREQUENCY;

        let warped_low = fs2 * (PI * low / NORMALIZED_SAMPLING_FREQUENCY).tan();
        let warped_high = fs2 * (PI * high / NORMALIZED_SAMPLING_FREQUENCY).tan();
        let bandwidth = warped_high - warped_low;
        let center = (warped_low * warped_high).sqrt();

        // Analog lowpass prototype: poles evenly spread on the left unit half-circle.
        let prototype: Vec<Complex<f64>> = (0..order)
            .map(|i| {
                let m = 2.0 * i as f64 - order as f64 + 1.0;
                -Complex::new(0.0, PI * m / (2.0 * order as f64)).exp()
            })
            .collect();

        let scaled: Vec<Complex<f64>> = prototype.iter().map(|&p| p * bandwidth / 2.0).collect();
        let offsets: Vec<Complex<f64>> = scaled
            .iter()
            .map(|&p| (p * p - center * center).sqrt())
            .collect();
        let analog_poles: Vec<Complex<f64>> = scaled
            .iter()
            .zip(offsets.iter())
            .map(|(&p, &d)| p + d)
            .chain(scaled.iter().zip(offsets.iter()).map(|(&p, &d)| p - d))
            .collect();
        let analog_gain = bandwidth.powi(order as i32);

        // Bilinear transform: the analog zeros at the origin map to 1, the ones at infinity to -1.
        let fs2c = Complex::new(fs2, 0.0);
        let poles: Vec<Complex<f64>> = analog_poles
            .iter()
            .map(|&p| (fs2c + p) / (fs2c - p))
            .collect();
        let zeros: Vec<Complex<f64>> = std::iter::repeat(Complex::new(1.0, 0.0))
            .take(order)
            .chain(std::iter::repeat(Complex::new(-1.0, 0.0)).take(order))
            .collect();
        let numerator = Complex::new(fs2.powi(order as i32), 0.0);
        let denominator = analog_poles
            .iter()
            .fold(Complex::new(1.0, 0.0), |acc, &p| acc * (fs2c - p));
        let gain = analog_gain * (numerator / denominator).re;

        let b = poly(&zeros).into_iter().map(|c| gain * c).collect();
        let a = poly(&poles);

        log::debug!(
            "Butterworth bandpass [{}, {}] Hz at {} Hz designed with {} coefficients",
            parameters.lowcut,
            parameters.highcut,
            parameters.sampling_frequency,
            2 * order + 1
        );

        Ok(ButterworthBandpass { b, a })
    }

    /// Returns the numerator coefficients.
    pub fn b(&self) -> &[f64] {
        &self.b
    }

    /// Returns the denominator coefficients.
    pub fn a(&self) -> &[f64] {
        &self.a
    }

    /// Filter the samples with the direct form II transposed structure, starting from rest.
    pub fn filter(&self, samples: &[f64]) -> Vec<f64> {
        let n = self.a.len().max(self.b.len());
        let a0 = self.a[0];
        let coefficient = |values: &[f64], i: usize| values.get(i).copied().unwrap_or(0.0) / a0;
        let b: Vec<f64> = (0..n).map(|i| coefficient(&self.b, i)).collect();
        let a: Vec<f64> = (0..n).map(|i| coefficient(&self.a, i)).collect();

        let mut state = vec![0.0; n - 1];
        samples
            .iter()
            .map(|&x| {
                let y = b[0] * x + state.first().copied().unwrap_or(0.0);
                for i in 0..n - 1 {
                    let next = state.get(i + 1).copied().unwrap_or(0.0);
                    state[i] = b[i + 1] * x + next - a[i + 1] * y;
                }
                y
            })
            .collect()
    }

    /// Filter a signal, keeping its time axis.
    pub fn apply(&self, signal: &Signal) -> Result<Signal, HfoError> {
        signal.with_amplitudes(self.filter(signal.amplitudes()))
    }
}

/// Returns the real coefficients of the monic polynomial with the given roots, highest degree first.
fn poly(roots: &[Complex<f64>]) -> Vec<f64> {
    let mut coefficients = vec![Complex::new(1.0, 0.0)];
    for root in roots {
        let mut next = vec![Complex::new(0.0, 0.0); coefficients.len() + 1];
        for (i, &c) in coefficients.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * *root;
        }
        coefficients = next;
    }
    coefficients.into_iter().map(|c| c.re).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (x, y) in actual.iter().zip(expected.iter()) {
            assert!(
                (x - y).abs() <= tol * (1.0 + y.abs()),
                "{:?} != {:?}",
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_parameters_validation() {
        assert!(FilterParameters::build(80.0, 250.0, 2000.0, 2).is_ok());
        assert!(matches!(
            FilterParameters::build(0.4, 0.4, 0.0, 5),
            Err(HfoError::DivisionByZero(_))
        ));
        assert!(matches!(
            FilterParameters::build(80.0, 1000.0, 2000.0, 2),
            Err(HfoError::InvalidParameter(_))
        ));
        assert!(matches!(
            FilterParameters::build(0.0, 250.0, 2000.0, 2),
            Err(HfoError::InvalidParameter(_))
        ));
        assert!(matches!(
            FilterParameters::build(80.0, 250.0, 2000.0, 0),
            Err(HfoError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_design_degenerate_band() {
        let parameters = FilterParameters::build(0.4, 0.4, 1.0, 5).unwrap();
        let filter = ButterworthBandpass::design(&parameters).unwrap();
        assert!(filter.b().iter().all(|c| c.abs() < 1e-12));
        assert_close(
            filter.a(),
            &[
                1.0,
                8.090169943749473,
                31.18033988749894,
                74.72135954999578,
                122.81152949374521,
                144.35254915624205,
                122.81152949374521,
                74.72135954999575,
                31.180339887498942,
                8.090169943749473,
                1.0,
            ],
            1e-8,
        );
        assert!(filter
            .filter(&[1.0, 2.0, 3.0])
            .iter()
            .all(|y| y.abs() < 1e-12));
    }

    #[test]
    fn test_design_coefficients() {
        let parameters = FilterParameters::build(0.4, 0.3, 0.9, 5).unwrap();
        let filter = ButterworthBandpass::design(&parameters).unwrap();
        assert_close(
            filter.b(),
            &[
                -0.02035849678161243,
                0.0,
                0.10179248390806216,
                0.0,
                -0.2035849678161243,
                0.0,
                0.2035849678161243,
                0.0,
                -0.10179248390806216,
                0.0,
                0.02035849678161243,
            ],
            1e-8,
        );
        assert_close(
            filter.a(),
            &[
                1.0,
                9.984966699256224,
                47.590057862702714,
                141.67098623913577,
                290.88049756918497,
                429.8709107982733,
                463.0560774898762,
                359.26791432996885,
                192.32998508453593,
                64.1980211025888,
                10.158159175259792,
            ],
            1e-8,
        );
    }

    #[test]
    fn test_filter() {
        let parameters = FilterParameters::build(0.2, 0.4, 0.9, 5).unwrap();
        let filter = ButterworthBandpass::design(&parameters).unwrap();
        assert_close(
            &filter.filter(&[1.0, 1.0, -1.0]),
            &[
                0.03323620484783379,
                -0.08709809041563582,
                -0.08528257369425868,
            ],
            1e-7,
        );

        let parameters = FilterParameters::build(0.4, 0.2, 0.9, 5).unwrap();
        let filter = ButterworthBandpass::design(&parameters).unwrap();
        assert_close(
            &filter.filter(&[340.0, 1354.0, 50.0]),
            &[-2140.503509660346, 17514.881893019854, -81064.75793357262],
            1e-7,
        );
    }

    #[test]
    fn test_filter_rejects_dc() {
        let parameters = FilterParameters::build(80.0, 250.0, 2000.0, 2).unwrap();
        let filter = ButterworthBandpass::design(&parameters).unwrap();
        let signal = Signal::from_sampling_frequency(vec![1.0; 4000], 2000.0, 0.0).unwrap();
        let filtered = filter.apply(&signal).unwrap();
        assert_eq!(filtered.times(), signal.times());
        assert!(filtered.amplitudes()[3999].abs() < 1e-6);
    }
}
