//! HFO detection pipeline: filter, threshold, encode, simulate and detect, channel by channel.
use derivative::Derivative;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{Band, BandDefinition, DetectorConfig};
use crate::detection::{detect_hfo, HfoDetection};
use crate::error::HfoError;
use crate::filter::ButterworthBandpass;
use crate::signal::Signal;
use crate::simulator::{simulate, NetworkInput, Simulator};
use crate::spike_train::{ConcatenatedSpikes, SpikeTrain};
use crate::threshold::find_threshold;
use crate::utils::check_strictly_increasing;
use crate::{EXTRA_SIMULATION_TIME, MIN_CHANNELS_PAR};

/// The wideband recording of one channel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ChannelData {
    pub label: String,
    pub signal: Signal,
}

/// A recording interval, i.e., several channels sampled on a common time axis.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct IntervalData {
    number: usize,
    times: Vec<f64>,
    labels: Vec<String>,
    wideband_signals: Vec<Vec<f64>>,
}

impl IntervalData {
    /// Create a recording interval.
    /// The function returns an error if the time axis is empty or not strictly increasing,
    /// or if the labels and signals do not match the time axis.
    pub fn build(
        number: usize,
        times: Vec<f64>,
        labels: Vec<String>,
        wideband_signals: Vec<Vec<f64>>,
    ) -> Result<Self, HfoError> {
        if times.is_empty() {
            return Err(HfoError::InvalidSignal(format!(
                "interval {} has no sample",
                number
            )));
        }
        check_strictly_increasing(&times)?;
        if labels.len() != wideband_signals.len() {
            return Err(HfoError::InvalidSignal(format!(
                "interval {} has {} labels for {} channels",
                number,
                labels.len(),
                wideband_signals.len()
            )));
        }
        if let Some(label) = labels
            .iter()
            .zip(wideband_signals.iter())
            .find(|(_, signal)| signal.len() != times.len())
            .map(|(label, _)| label)
        {
            return Err(HfoError::InvalidSignal(format!(
                "channel {} of interval {} does not match the time axis",
                label, number
            )));
        }
        Ok(IntervalData {
            number,
            times,
            labels,
            wideband_signals,
        })
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn num_channels(&self) -> usize {
        self.wideband_signals.len()
    }

    /// Returns the data of the channel at the given (0-based) index.
    pub fn channel(&self, index: usize) -> Result<ChannelData, HfoError> {
        let amplitudes = self.wideband_signals.get(index).ok_or_else(|| {
            HfoError::InvalidParameter(format!(
                "interval {} has no channel {}",
                self.number,
                index + 1
            ))
        })?;
        Ok(ChannelData {
            label: self.labels[index].clone(),
            signal: Signal::build(self.times.clone(), amplitudes.clone())?,
        })
    }

    /// Returns the default simulation duration: the last sample time plus a short margin.
    pub fn default_duration(&self) -> f64 {
        self.times[self.times.len() - 1] + EXTRA_SIMULATION_TIME
    }
}

/// Identifies one channel of one interval in the detection results.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub interval: usize,
    /// The channel number, starting from 1.
    pub channel: usize,
    pub label: String,
    /// The simulation duration (in seconds).
    pub duration: f64,
}

/// The filtered signal of one band, its encoder threshold and its spikes.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BandSpikes {
    pub band: Band,
    pub threshold: f64,
    pub signal: Signal,
    pub spike_train: SpikeTrain,
}

/// The detection result of one channel, along with its intermediate band signals.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ChannelDetection {
    pub bands: Vec<BandSpikes>,
    pub network_input: NetworkInput,
    pub result: HfoDetection,
}

impl ChannelDetection {
    /// Returns the band signals and spikes of the band, if analyzed.
    pub fn band(&self, band: Band) -> Option<&BandSpikes> {
        self.bands.iter().find(|band_spikes| band_spikes.band == band)
    }
}

/// The detection of one channel of one interval.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DetectionRun {
    pub metadata: Metadata,
    pub detection: ChannelDetection,
}

/// Filter, calibrate and encode one band of a wideband signal.
pub fn encode_band(
    signal: &Signal,
    definition: &BandDefinition,
    config: &DetectorConfig,
) -> Result<BandSpikes, HfoError> {
    let sampling_frequency = signal.sampling_frequency().ok_or_else(|| {
        HfoError::InvalidSignal("filtering needs at least 2 samples".to_string())
    })?;
    let filter = ButterworthBandpass::design(
        &definition.filter_parameters(sampling_frequency, config.filter_order)?,
    )?;
    let filtered = filter.apply(signal)?;

    let calibration = filtered.until(config.calibration_time)?;
    let threshold = find_threshold(
        calibration.amplitudes(),
        calibration.times(),
        config.threshold.window_size,
        config.threshold.sample_ratio,
        definition.scaling_factor,
    )?
    .ceil();

    let spike_train = definition
        .encoder_parameters(threshold, config.algorithm, config.interpolation_factor)?
        .encode(&filtered)?;

    log::debug!(
        "{} band: threshold {}, {} spikes",
        definition.band,
        threshold,
        spike_train.num_spikes()
    );

    Ok(BandSpikes {
        band: definition.band,
        threshold,
        signal: filtered,
        spike_train,
    })
}

/// Assemble the network input of the measurement mode from the encoded bands.
/// The function returns an error if a band required by the measurement mode is missing.
pub fn network_input(
    bands: &[BandSpikes],
    config: &DetectorConfig,
) -> Result<NetworkInput, HfoError> {
    let mode = config.measurement_mode;
    let input_bands = mode.input_bands();
    let main =
        ConcatenatedSpikes::from_spike_trains(select_spike_trains(bands, &input_bands, config)?);
    let advanced_artifact_filter = match mode.advanced_artifact_filter_bands() {
        Some(required) => Some(ConcatenatedSpikes::from_spike_trains(select_spike_trains(
            bands, &required, config,
        )?)),
        None => None,
    };

    Ok(NetworkInput {
        main,
        num_input_channels: 2 * input_bands.len(),
        advanced_artifact_filter,
        artifact_filter: mode.uses_artifact_filter(),
        num_hidden_neurons: config.num_hidden_neurons,
    })
}

fn select_spike_trains<'a>(
    bands: &'a [BandSpikes],
    required: &[Band],
    config: &DetectorConfig,
) -> Result<Vec<&'a SpikeTrain>, HfoError> {
    required
        .iter()
        .map(|band| {
            bands
                .iter()
                .find(|band_spikes| band_spikes.band == *band)
                .map(|band_spikes| &band_spikes.spike_train)
                .ok_or_else(|| {
                    HfoError::UnsupportedConfiguration(format!(
                        "the {} measurement mode needs the {} band",
                        config.measurement_mode, band
                    ))
                })
        })
        .collect()
}

/// Run the whole detection on one channel.
///
/// Every configured band is filtered, calibrated on the first `calibration_time` seconds and encoded.
/// The bands of the measurement mode are merged into the network input, the network runs for
/// `duration` seconds, and its output spikes are turned into HFO periods on the channel time axis.
pub fn detect_channel<S: Simulator + ?Sized>(
    channel: &ChannelData,
    duration: f64,
    config: &DetectorConfig,
    simulator: &mut S,
) -> Result<ChannelDetection, HfoError> {
    let bands = config
        .bands
        .iter()
        .map(|definition| encode_band(&channel.signal, definition, config))
        .collect::<Result<Vec<_>, _>>()?;
    let network_input = network_input(&bands, config)?;
    let spike_times = simulate(simulator, &network_input, duration)?;
    let result = detect_hfo(
        duration,
        &spike_times,
        channel.signal.times(),
        config.window_detector.step_size,
        config.window_detector.window_size,
    )?;

    Ok(ChannelDetection {
        bands,
        network_input,
        result,
    })
}

/// What to do when the detection fails on one channel.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum ChannelErrorPolicy {
    /// Stop the run and return the error.
    #[default]
    Abort,
    /// Log the error and go on with the next channel.
    Skip,
}

/// Runs the detection over recording intervals, channel by channel.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct HfoDetector {
    config: DetectorConfig,
    /// The channel numbers (starting from 1) to analyze, all if none.
    channels: Option<Vec<usize>>,
    /// The interval numbers to analyze, all if none.
    intervals: Option<Vec<usize>>,
    error_policy: ChannelErrorPolicy,
    #[derivative(Debug = "ignore")]
    on_channel: Option<Box<dyn Fn(&DetectionRun) + Send + Sync>>,
}

impl HfoDetector {
    /// Create a detector from a configuration.
    /// The function returns an error if the configuration is invalid.
    pub fn build(config: DetectorConfig) -> Result<Self, HfoError> {
        config.validate()?;
        Ok(HfoDetector {
            config,
            channels: None,
            intervals: None,
            error_policy: ChannelErrorPolicy::default(),
            on_channel: None,
        })
    }

    /// Restrict the analysis to the given channel numbers, starting from 1.
    pub fn with_channels(mut self, channels: Vec<usize>) -> Self {
        self.channels = Some(channels);
        self
    }

    /// Restrict the analysis to the given interval numbers.
    pub fn with_intervals(mut self, intervals: Vec<usize>) -> Self {
        self.intervals = Some(intervals);
        self
    }

    pub fn with_error_policy(mut self, error_policy: ChannelErrorPolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Set a callback invoked with each channel result, in interval then channel order.
    pub fn with_callback<F>(mut self, on_channel: F) -> Self
    where
        F: Fn(&DetectionRun) + Send + Sync + 'static,
    {
        self.on_channel = Some(Box::new(on_channel));
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Returns the selected (interval, channel index) pairs in processing order.
    fn jobs<'a>(&self, intervals: &'a [IntervalData]) -> Vec<(&'a IntervalData, usize)> {
        let selected_intervals = self.intervals.as_deref();
        let selected_channels = self.channels.as_deref();
        intervals
            .iter()
            .filter(move |interval| {
                selected_intervals.map_or(true, |selected| selected.contains(&interval.number()))
            })
            .flat_map(move |interval| {
                (0..interval.num_channels())
                    .filter(move |index| {
                        selected_channels.map_or(true, |selected| selected.contains(&(index + 1)))
                    })
                    .map(move |index| (interval, index))
            })
            .collect()
    }

    fn run_job<S: Simulator + ?Sized>(
        &self,
        interval: &IntervalData,
        index: usize,
        simulator: &mut S,
    ) -> Result<DetectionRun, HfoError> {
        let channel = interval.channel(index)?;
        let duration = self
            .config
            .duration
            .unwrap_or_else(|| interval.default_duration());

        log::info!(
            "Detecting HFOs in interval {}, channel {} ({})",
            interval.number(),
            index + 1,
            channel.label
        );
        let detection = detect_channel(&channel, duration, &self.config, simulator)?;
        log::info!(
            "Interval {}, channel {}: {} HFOs ({:.2} per minute)",
            interval.number(),
            index + 1,
            detection.result.total_amount,
            detection.result.rate_per_minute()
        );

        Ok(DetectionRun {
            metadata: Metadata {
                interval: interval.number(),
                channel: index + 1,
                label: channel.label,
                duration,
            },
            detection,
        })
    }

    /// Apply the error policy to the result of one channel, handing a success to the callback.
    fn accept(
        &self,
        interval: usize,
        channel: usize,
        result: Result<DetectionRun, HfoError>,
    ) -> Result<Option<DetectionRun>, HfoError> {
        match (result, self.error_policy) {
            (Ok(run), _) => {
                if let Some(on_channel) = &self.on_channel {
                    on_channel(&run);
                }
                Ok(Some(run))
            }
            (Err(e), ChannelErrorPolicy::Abort) => Err(e),
            (Err(e), ChannelErrorPolicy::Skip) => {
                log::warn!(
                    "Skipping interval {}, channel {}: {}",
                    interval,
                    channel,
                    e
                );
                Ok(None)
            }
        }
    }

    /// Run the detection sequentially, sharing one simulator between all channels.
    /// The callback is invoked as soon as each channel completes.
    pub fn run<S: Simulator + ?Sized>(
        &self,
        intervals: &[IntervalData],
        simulator: &mut S,
    ) -> Result<Vec<DetectionRun>, HfoError> {
        let mut runs = vec![];
        for (interval, index) in self.jobs(intervals) {
            let result = self.run_job(interval, index, simulator);
            if let Some(run) = self.accept(interval.number(), index + 1, result)? {
                runs.push(run);
            }
        }
        Ok(runs)
    }

    /// Run the detection in parallel, with one simulator per channel built by `new_simulator`.
    /// Results are returned, and the callback invoked, in the same order as a sequential run.
    pub fn run_parallel<S, F>(
        &self,
        intervals: &[IntervalData],
        new_simulator: F,
    ) -> Result<Vec<DetectionRun>, HfoError>
    where
        S: Simulator,
        F: Fn() -> Result<S, HfoError> + Sync,
    {
        let jobs = self.jobs(intervals);
        let run = |(interval, index): &(&IntervalData, usize)| {
            let result = new_simulator()
                .and_then(|mut simulator| self.run_job(interval, *index, &mut simulator));
            (interval.number(), index + 1, result)
        };

        let results: Vec<_> = if jobs.len() >= MIN_CHANNELS_PAR {
            jobs.par_iter().map(run).collect()
        } else {
            jobs.iter().map(run).collect()
        };

        let mut runs = vec![];
        for (interval, channel, result) in results {
            if let Some(run) = self.accept(interval, channel, result)? {
                runs.push(run);
            }
        }
        Ok(runs)
    }
}
