//! This crate provides tools for detecting high-frequency oscillations (HFOs) in electrophysiological
//! recordings with a spiking neural network (SNN).
//!
//! Each channel goes through the same steps: bandpass filtering into the ripple, fast ripple and
//! above fast ripple bands, amplitude-threshold calibration, delta-modulation encoding into UP/DOWN
//! spikes, simulation of the network, and sliding window detection on its output spikes.
//!
//! # Encoding Signals
//!
//! ```rust
//! use rusty_hfo::encoder::signal_to_spike;
//! use rusty_hfo::spike_train::concatenate_spikes;
//!
//! let spike_train = signal_to_spike(&[0.0, 10.0, -20.0], &[0.0, 1.0, 2.0], 3.0, 0.5, 0.01, 10.0).unwrap();
//! assert_eq!(spike_train.up().len(), 3);
//! assert_eq!(spike_train.down().len(), 10);
//!
//! // One input channel per spike array
//! let input = concatenate_spikes([spike_train.up(), spike_train.down()]);
//! assert_eq!(input.len(), 13);
//! assert!(input.times().windows(2).all(|w| w[0] <= w[1]));
//! ```
//!
//! # Calibrating Thresholds
//!
//! ```rust
//! use rusty_hfo::threshold::find_threshold;
//!
//! let threshold = find_threshold(&[0.0, 1.0], &[0.0, 1.0], 1.0, 0.9, 0.1).unwrap();
//! assert!((threshold - 0.1).abs() < 1e-12);
//! ```
//!
//! # Detecting HFOs
//!
//! ```rust
//! use rusty_hfo::detection::detect_hfo;
//!
//! let signal_times: Vec<f64> = (0..10).map(|i| i as f64).collect();
//! let detection = detect_hfo(10.0, &[2.5, 7.5], &signal_times, 1.0, 1.0).unwrap();
//! assert_eq!(detection.total_amount, 2);
//! assert_eq!(detection.periods.start, vec![2.0, 7.0]);
//! assert_eq!(detection.periods.stop, vec![3.0, 8.0]);
//! ```
//!
//! # Running the Pipeline
//!
//! The network itself is simulated outside of this crate, behind the [`simulator::Simulator`] trait.
//! The [`pipeline::HfoDetector`] drives the whole processing over recording intervals, sequentially
//! or with one simulator per channel in parallel.

pub mod config;
pub mod detection;
pub mod encoder;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod signal;
pub mod simulator;
pub mod spike_train;
pub mod synthetic;
pub mod threshold;
pub mod utils;

/// The length of the windows used for threshold calibration (in seconds).
pub const THRESHOLD_WINDOW_SIZE: f64 = 0.5;
/// The fraction of calibration windows averaged into the threshold.
pub const THRESHOLD_SAMPLE_RATIO: f64 = 1.0 / 6.0;
/// The calibration prefix of every recording (in seconds).
pub const CALIBRATION_TIME: f64 = 10.0;
/// The time between two consecutive detection windows (in seconds).
pub const HFO_DETECTION_STEP_SIZE: f64 = 0.01;
/// The length of each detection window (in seconds).
pub const HFO_DETECTION_WINDOW_SIZE: f64 = 0.05;
/// The simulation runs this long past the last sample (in seconds).
pub const EXTRA_SIMULATION_TIME: f64 = 0.05;
/// The upsampling factor of the delta-modulation encoder.
pub const INTERPOLATION_FACTOR: f64 = 35000.0;
/// The order of the Butterworth bandpass filters.
pub const FILTER_ORDER: usize = 2;
/// The number of neurons in the hidden layer of the network.
pub const NUM_HIDDEN_NEURONS: usize = 86;
/// The minimum number of channels to process in parallel.
pub const MIN_CHANNELS_PAR: usize = 4;
