//! Detector configuration: measurement modes, frequency bands and persistence.
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use std::str::FromStr;

use crate::detection::WindowDetectorParameters;
use crate::encoder::{EncoderParameters, SignalToSpikeAlgorithm};
use crate::error::HfoError;
use crate::filter::FilterParameters;
use crate::threshold::ThresholdParameters;
use crate::{CALIBRATION_TIME, FILTER_ORDER, INTERPOLATION_FACTOR, NUM_HIDDEN_NEURONS};

/// The frequency bands in which HFOs are analyzed.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// 80 to 250 Hz.
    Ripple,
    /// 250 to 500 Hz.
    FastRipple,
    /// 500 to 900 Hz.
    AboveFastRipple,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Ripple, Band::FastRipple, Band::AboveFastRipple];

    /// Returns the lower cutoff frequency (in Hz).
    pub fn lowcut(&self) -> f64 {
        match self {
            Band::Ripple => 80.0,
            Band::FastRipple => 250.0,
            Band::AboveFastRipple => 500.0,
        }
    }

    /// Returns the upper cutoff frequency (in Hz).
    pub fn highcut(&self) -> f64 {
        match self {
            Band::Ripple => 250.0,
            Band::FastRipple => 500.0,
            Band::AboveFastRipple => 900.0,
        }
    }

    /// Returns the refractory period of the spike encoder (in seconds).
    pub fn refractory_period(&self) -> f64 {
        match self {
            Band::Ripple | Band::FastRipple => 3e-4,
            Band::AboveFastRipple => 1e-3,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Band::Ripple => write!(f, "ripple"),
            Band::FastRipple => write!(f, "fast ripple"),
            Band::AboveFastRipple => write!(f, "above fast ripple"),
        }
    }
}

/// The recording technique, which determines the bands fed to the network and their scaling factors.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum MeasurementMode {
    /// Intracranial EEG: ripple and fast ripple bands.
    #[default]
    #[serde(rename = "iEEG")]
    Ieeg,
    /// Electrocorticography: fast ripple band, with artifact filter.
    #[serde(rename = "eCoG")]
    Ecog,
    /// Scalp EEG: ripple band, with artifact filter and advanced artifact filter.
    #[serde(rename = "scalp")]
    Scalp,
}

impl FromStr for MeasurementMode {
    type Err = HfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ieeg" => Ok(MeasurementMode::Ieeg),
            "ecog" => Ok(MeasurementMode::Ecog),
            "scalp" => Ok(MeasurementMode::Scalp),
            other => Err(HfoError::UnsupportedConfiguration(format!(
                "unknown measurement mode {}, expected one of iEEG, eCoG or scalp",
                other
            ))),
        }
    }
}

impl fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MeasurementMode::Ieeg => write!(f, "iEEG"),
            MeasurementMode::Ecog => write!(f, "eCoG"),
            MeasurementMode::Scalp => write!(f, "scalp"),
        }
    }
}

impl MeasurementMode {
    /// Returns the scaling factor of the threshold estimator for the band.
    pub fn scaling_factor(&self, band: Band) -> f64 {
        match (self, band) {
            (MeasurementMode::Ieeg, Band::Ripple) => 0.6,
            (MeasurementMode::Ecog, Band::Ripple) => 0.6,
            (MeasurementMode::Scalp, Band::Ripple) => 0.3,
            (MeasurementMode::Ecog, Band::FastRipple) => 0.5,
            (_, Band::FastRipple) => 0.3,
            (_, Band::AboveFastRipple) => 0.3,
        }
    }

    /// Returns the bands whose spikes feed the input layer, in channel order.
    pub fn input_bands(&self) -> Vec<Band> {
        match self {
            MeasurementMode::Ieeg => vec![Band::Ripple, Band::FastRipple],
            MeasurementMode::Ecog => vec![Band::FastRipple],
            MeasurementMode::Scalp => vec![Band::Ripple],
        }
    }

    /// Returns the bands whose spikes feed the advanced artifact filter, if any.
    pub fn advanced_artifact_filter_bands(&self) -> Option<Vec<Band>> {
        match self {
            MeasurementMode::Scalp => Some(vec![Band::AboveFastRipple]),
            _ => None,
        }
    }

    /// Returns true if the network carries the basic artifact filter.
    pub fn uses_artifact_filter(&self) -> bool {
        matches!(self, MeasurementMode::Ecog | MeasurementMode::Scalp)
    }
}

/// The processing parameters of one frequency band.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BandDefinition {
    pub band: Band,
    /// The lower cutoff frequency (in Hz).
    pub lowcut: f64,
    /// The upper cutoff frequency (in Hz).
    pub highcut: f64,
    /// The multiple of the noise floor used as encoder threshold.
    pub scaling_factor: f64,
    /// The refractory period of the spike encoder (in seconds).
    pub refractory_period: f64,
}

impl BandDefinition {
    /// Create the standard definition of the band for the measurement mode.
    pub fn new(band: Band, measurement_mode: MeasurementMode) -> Self {
        BandDefinition {
            band,
            lowcut: band.lowcut(),
            highcut: band.highcut(),
            scaling_factor: measurement_mode.scaling_factor(band),
            refractory_period: band.refractory_period(),
        }
    }

    /// Returns the filter parameters of the band for a signal sampled at the given frequency.
    pub fn filter_parameters(
        &self,
        sampling_frequency: f64,
        order: usize,
    ) -> Result<FilterParameters, HfoError> {
        FilterParameters::build(self.lowcut, self.highcut, sampling_frequency, order)
    }

    /// Returns the symmetric encoder parameters of the band for the given threshold.
    pub fn encoder_parameters(
        &self,
        threshold: f64,
        algorithm: SignalToSpikeAlgorithm,
        interpolation_factor: f64,
    ) -> Result<EncoderParameters, HfoError> {
        EncoderParameters::build(
            threshold,
            threshold,
            self.refractory_period,
            interpolation_factor,
            algorithm,
        )
    }

    fn validate(&self) -> Result<(), HfoError> {
        if !(self.lowcut > 0.0 && self.lowcut < self.highcut) || !self.highcut.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "the {} band must satisfy 0 < lowcut < highcut, got [{}, {}]",
                self.band, self.lowcut, self.highcut
            )));
        }
        if !self.scaling_factor.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "the {} scaling factor must be finite, got {}",
                self.band, self.scaling_factor
            )));
        }
        if !(self.refractory_period > 0.0) || !self.refractory_period.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "the {} refractory period must be positive, got {}",
                self.band, self.refractory_period
            )));
        }
        Ok(())
    }
}

/// The configuration of the HFO detector.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub measurement_mode: MeasurementMode,
    /// The duration (in seconds) at the start of the recording used to estimate the thresholds.
    pub calibration_time: f64,
    /// The spike encoding algorithm.
    pub algorithm: SignalToSpikeAlgorithm,
    /// The upsampling rate of the `default` encoding algorithm (in samples per second).
    pub interpolation_factor: f64,
    /// The order of the Butterworth prototype of every bandpass filter.
    pub filter_order: usize,
    /// The number of neurons in the hidden layer of the network.
    pub num_hidden_neurons: usize,
    pub threshold: ThresholdParameters,
    pub window_detector: WindowDetectorParameters,
    /// The analyzed bands, each filtered and encoded for every channel.
    pub bands: Vec<BandDefinition>,
    /// Overrides the simulation duration, which otherwise spans the recording plus a short margin.
    #[serde(default)]
    pub duration: Option<f64>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        DetectorConfig::new(MeasurementMode::default())
    }
}

impl DetectorConfig {
    /// Create the standard configuration of the measurement mode.
    pub fn new(measurement_mode: MeasurementMode) -> Self {
        DetectorConfig {
            measurement_mode,
            calibration_time: CALIBRATION_TIME,
            algorithm: SignalToSpikeAlgorithm::default(),
            interpolation_factor: INTERPOLATION_FACTOR,
            filter_order: FILTER_ORDER,
            num_hidden_neurons: NUM_HIDDEN_NEURONS,
            threshold: ThresholdParameters::default(),
            window_detector: WindowDetectorParameters::default(),
            bands: Band::ALL
                .iter()
                .map(|band| BandDefinition::new(*band, measurement_mode))
                .collect(),
            duration: None,
        }
    }

    /// Returns the definition of the band, if analyzed.
    pub fn band(&self, band: Band) -> Option<&BandDefinition> {
        self.bands.iter().find(|definition| definition.band == band)
    }

    /// Check the consistency of the configuration.
    /// The function returns an error if a parameter is out of range or if a band required by the
    /// measurement mode is not defined.
    pub fn validate(&self) -> Result<(), HfoError> {
        if !(self.calibration_time > 0.0) {
            return Err(HfoError::InvalidParameter(format!(
                "the calibration time must be positive, got {}",
                self.calibration_time
            )));
        }
        if !(self.interpolation_factor > 0.0) || !self.interpolation_factor.is_finite() {
            return Err(HfoError::InvalidParameter(format!(
                "the interpolation factor must be positive and finite, got {}",
                self.interpolation_factor
            )));
        }
        if self.filter_order == 0 {
            return Err(HfoError::InvalidParameter(
                "the filter order must be at least 1".to_string(),
            ));
        }
        ThresholdParameters::build(self.threshold.window_size, self.threshold.sample_ratio)?;
        WindowDetectorParameters::build(
            self.window_detector.step_size,
            self.window_detector.window_size,
        )?;
        if let Some(duration) = self.duration {
            if !(duration > 0.0) || !duration.is_finite() {
                return Err(HfoError::InvalidParameter(format!(
                    "the duration must be positive and finite, got {}",
                    duration
                )));
            }
        }
        for definition in self.bands.iter() {
            definition.validate()?;
        }
        let required = self
            .measurement_mode
            .input_bands()
            .into_iter()
            .chain(
                self.measurement_mode
                    .advanced_artifact_filter_bands()
                    .unwrap_or_default(),
            );
        for band in required {
            if self.band(band).is_none() {
                return Err(HfoError::UnsupportedConfiguration(format!(
                    "the {} measurement mode needs the {} band",
                    self.measurement_mode, band
                )));
            }
        }
        Ok(())
    }

    /// Save the configuration to a file in JSON format.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), HfoError> {
        let file = File::create(path).map_err(|e| HfoError::IOError(e.to_string()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &self).map_err(|e| HfoError::IOError(e.to_string()))
    }

    /// Load a configuration from a file in JSON format.
    /// The function returns an error if the file cannot be read or if the configuration is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, HfoError> {
        let file = File::open(path).map_err(|e| HfoError::IOError(e.to_string()))?;
        let reader = BufReader::new(file);
        let config: DetectorConfig =
            serde_json::from_reader(reader).map_err(|e| HfoError::IOError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_mode_from_str() {
        assert_eq!("iEEG".parse::<MeasurementMode>(), Ok(MeasurementMode::Ieeg));
        assert_eq!("ECOG".parse::<MeasurementMode>(), Ok(MeasurementMode::Ecog));
        assert_eq!("scalp".parse::<MeasurementMode>(), Ok(MeasurementMode::Scalp));
        assert!(matches!(
            "meg".parse::<MeasurementMode>(),
            Err(HfoError::UnsupportedConfiguration(_))
        ));
        assert_eq!(MeasurementMode::Ecog.to_string(), "eCoG");
    }

    #[test]
    fn test_scaling_factors() {
        let factors = |mode: MeasurementMode| Band::ALL.map(|band| mode.scaling_factor(band));
        assert_eq!(factors(MeasurementMode::Ieeg), [0.6, 0.3, 0.3]);
        assert_eq!(factors(MeasurementMode::Ecog), [0.6, 0.5, 0.3]);
        assert_eq!(factors(MeasurementMode::Scalp), [0.3, 0.3, 0.3]);
    }

    #[test]
    fn test_input_bands() {
        assert_eq!(
            MeasurementMode::Ieeg.input_bands(),
            vec![Band::Ripple, Band::FastRipple]
        );
        assert_eq!(MeasurementMode::Ecog.input_bands(), vec![Band::FastRipple]);
        assert_eq!(MeasurementMode::Scalp.input_bands(), vec![Band::Ripple]);
        assert_eq!(
            MeasurementMode::Scalp.advanced_artifact_filter_bands(),
            Some(vec![Band::AboveFastRipple])
        );
        assert_eq!(MeasurementMode::Ieeg.advanced_artifact_filter_bands(), None);
        assert!(!MeasurementMode::Ieeg.uses_artifact_filter());
        assert!(MeasurementMode::Ecog.uses_artifact_filter());
    }

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert_eq!(config.measurement_mode, MeasurementMode::Ieeg);
        assert_eq!(config.calibration_time, 10.0);
        assert_eq!(config.filter_order, 2);
        assert_eq!(config.bands.len(), 3);
        let ripple = config.band(Band::Ripple).unwrap();
        assert_eq!((ripple.lowcut, ripple.highcut), (80.0, 250.0));
        assert_eq!(ripple.refractory_period, 3e-4);
        assert_eq!(
            config.band(Band::AboveFastRipple).unwrap().refractory_period,
            1e-3
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let mut config = DetectorConfig::new(MeasurementMode::Scalp);
        config.bands.retain(|definition| definition.band != Band::AboveFastRipple);
        assert!(matches!(
            config.validate(),
            Err(HfoError::UnsupportedConfiguration(_))
        ));

        let mut config = DetectorConfig::default();
        config.window_detector.step_size = 0.1;
        assert!(matches!(
            config.validate(),
            Err(HfoError::InvalidParameter(_))
        ));

        let mut config = DetectorConfig::default();
        config.duration = Some(-1.0);
        assert!(config.validate().is_err());

        let mut config = DetectorConfig::default();
        config.bands[0].lowcut = 300.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_band_parameters() {
        let definition = BandDefinition::new(Band::FastRipple, MeasurementMode::Ecog);
        assert_eq!(definition.scaling_factor, 0.5);

        let filter = definition.filter_parameters(2000.0, 2).unwrap();
        assert_eq!((filter.lowcut, filter.highcut), (250.0, 500.0));
        assert!(matches!(
            BandDefinition::new(Band::AboveFastRipple, MeasurementMode::Ieeg)
                .filter_parameters(1000.0, 2),
            Err(HfoError::InvalidParameter(_))
        ));

        let encoder = definition
            .encoder_parameters(12.0, SignalToSpikeAlgorithm::Realistic, 35000.0)
            .unwrap();
        assert_eq!(encoder.threshold_up, 12.0);
        assert_eq!(encoder.threshold_down, 12.0);
        assert_eq!(encoder.refractory_period, 3e-4);
    }

    #[test]
    fn test_load_from_missing_file() {
        assert!(matches!(
            DetectorConfig::load_from("/nonexistent/config.json"),
            Err(HfoError::IOError(_))
        ));
    }
}
