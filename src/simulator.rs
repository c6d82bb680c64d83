//! Boundary with the external spiking neural network simulator.
//!
//! The detector never simulates neurons itself: it hands the encoded input spikes to a [`Simulator`]
//! and reads back the spike times of the output layer.
use serde::{Deserialize, Serialize};

use crate::error::HfoError;
use crate::spike_train::ConcatenatedSpikes;

/// The input of the network for one channel.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct NetworkInput {
    /// The spikes fed to the input layer, two channels (UP, DOWN) per frequency band.
    pub main: ConcatenatedSpikes,
    /// The number of input channels of the input layer.
    pub num_input_channels: usize,
    /// The spikes fed to the advanced artifact filter, if the measurement mode uses one.
    pub advanced_artifact_filter: Option<ConcatenatedSpikes>,
    /// Whether the basic artifact filter should be attached to the input layer.
    pub artifact_filter: bool,
    /// The number of neurons in the hidden layer.
    pub num_hidden_neurons: usize,
}

/// A spiking neural network simulator.
///
/// Implementations own their network and its lifecycle (creation, caching, reset between runs).
/// A simulator is used by one channel at a time; parallel runs build one simulator per channel.
pub trait Simulator {
    /// Load the input spikes and prepare the network for a run of the given duration (in seconds).
    fn prepare(&mut self, input: &NetworkInput, duration: f64) -> Result<(), HfoError>;

    /// Run the network for the given duration (in seconds) and return the output spike times.
    fn run(&mut self, duration: f64) -> Result<Vec<f64>, HfoError>;
}

impl<S: Simulator + ?Sized> Simulator for Box<S> {
    fn prepare(&mut self, input: &NetworkInput, duration: f64) -> Result<(), HfoError> {
        (**self).prepare(input, duration)
    }

    fn run(&mut self, duration: f64) -> Result<Vec<f64>, HfoError> {
        (**self).run(duration)
    }
}

/// Prepare and run the simulator, returning the output spike times sorted in ascending order.
/// The function returns an error if the simulator fails or reports a non-finite spike time.
pub fn simulate<S: Simulator + ?Sized>(
    simulator: &mut S,
    input: &NetworkInput,
    duration: f64,
) -> Result<Vec<f64>, HfoError> {
    simulator.prepare(input, duration)?;
    let mut spike_times = simulator.run(duration)?;
    if let Some(t) = spike_times.iter().find(|t| !t.is_finite()) {
        return Err(HfoError::SimulationError(format!(
            "the network emitted a spike at time {}",
            t
        )));
    }
    spike_times.sort_by(|a, b| a.total_cmp(b));

    log::debug!(
        "Network fed with {} input spikes emitted {} output spikes",
        input.main.len(),
        spike_times.len()
    );

    Ok(spike_times)
}

/// A simulator replaying output spike times recorded from an earlier run.
/// Only the spikes within the requested duration are returned.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct ReplaySimulator {
    output: Vec<f64>,
}

impl ReplaySimulator {
    pub fn new(output: Vec<f64>) -> Self {
        ReplaySimulator { output }
    }
}

impl Simulator for ReplaySimulator {
    fn prepare(&mut self, _input: &NetworkInput, duration: f64) -> Result<(), HfoError> {
        if !(duration > 0.0) {
            return Err(HfoError::SimulationError(format!(
                "cannot run the network for {} seconds",
                duration
            )));
        }
        Ok(())
    }

    fn run(&mut self, duration: f64) -> Result<Vec<f64>, HfoError> {
        Ok(self
            .output
            .iter()
            .copied()
            .filter(|t| *t <= duration)
            .collect())
    }
}
