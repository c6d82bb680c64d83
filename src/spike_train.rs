//! Spike train related structures.
use serde::{Deserialize, Serialize};

use crate::error::HfoError;

/// An UP/DOWN spike train produced by encoding one signal.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct SpikeTrain {
    up: Vec<f64>,
    down: Vec<f64>,
}

impl SpikeTrain {
    /// Create a new empty spike train.
    pub fn new_empty() -> Self {
        SpikeTrain::default()
    }

    /// Create a spike train from firing times known to be sorted, e.g., by a forward scan.
    pub(crate) fn new(up: Vec<f64>, down: Vec<f64>) -> Self {
        SpikeTrain { up, down }
    }

    /// Create a spike train from its UP and DOWN firing times.
    /// The function returns an error if a time is not finite or if a sequence is decreasing.
    pub fn build(up: Vec<f64>, down: Vec<f64>) -> Result<Self, HfoError> {
        for (name, times) in [("UP", &up), ("DOWN", &down)] {
            if times.iter().any(|t| !t.is_finite()) {
                return Err(HfoError::InvalidParameter(format!(
                    "{} spike times must be finite",
                    name
                )));
            }
            if times.windows(2).any(|w| w[1] < w[0]) {
                return Err(HfoError::InvalidParameter(format!(
                    "{} spike times must be non-decreasing",
                    name
                )));
            }
        }
        Ok(SpikeTrain { up, down })
    }

    /// Returns the firing times of the UP channel.
    pub fn up(&self) -> &[f64] {
        &self.up
    }

    /// Returns the firing times of the DOWN channel.
    pub fn down(&self) -> &[f64] {
        &self.down
    }

    pub fn num_spikes(&self) -> usize {
        self.up.len() + self.down.len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_spikes() == 0
    }
}

/// An input spike, i.e., a spike fed to one input neuron of the network.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct InputSpike {
    /// The time at which the spike is fed.
    pub time: f64,
    /// The ID of the input neuron receiving the spike.
    pub channel: usize,
}

impl PartialOrd for InputSpike {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.time.partial_cmp(&other.time)
    }
}

/// A time-sorted sequence of (time, channel) pairs merged from several spike arrays.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct ConcatenatedSpikes {
    times: Vec<f64>,
    channels: Vec<usize>,
}

impl ConcatenatedSpikes {
    pub fn new_empty() -> Self {
        ConcatenatedSpikes::default()
    }

    /// Merge UP then DOWN arrays of every spike train, in order, into one input stream.
    /// Train `i` feeds channels `2 * i` (UP) and `2 * i + 1` (DOWN).
    pub fn from_spike_trains<'a, I>(spike_trains: I) -> Self
    where
        I: IntoIterator<Item = &'a SpikeTrain>,
    {
        concatenate_spikes(
            spike_trains
                .into_iter()
                .flat_map(|spike_train| [spike_train.up(), spike_train.down()]),
        )
    }

    /// Returns the spike times, sorted in ascending order.
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Returns the channel of each spike.
    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = InputSpike> + '_ {
        self.times
            .iter()
            .zip(self.channels.iter())
            .map(|(&time, &channel)| InputSpike { time, channel })
    }
}

/// Merge spike arrays into one time-sorted stream, each array tagged by its index.
/// Ties keep the input order.
pub fn concatenate_spikes<I, A>(spike_arrays: I) -> ConcatenatedSpikes
where
    I: IntoIterator<Item = A>,
    A: AsRef<[f64]>,
{
    let mut spikes: Vec<InputSpike> = spike_arrays
        .into_iter()
        .enumerate()
        .flat_map(|(channel, times)| {
            times
                .as_ref()
                .iter()
                .map(|&time| InputSpike { time, channel })
                .collect::<Vec<_>>()
        })
        .collect();
    spikes.sort_by(|spike_1, spike_2| spike_1.time.total_cmp(&spike_2.time));

    let (times, channels) = spikes
        .into_iter()
        .map(|spike| (spike.time, spike.channel))
        .unzip();
    ConcatenatedSpikes { times, channels }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spike_train_build() {
        let spike_train = SpikeTrain::build(vec![0.1, 0.2, 0.2], vec![0.5]).unwrap();
        assert_eq!(spike_train.up(), &[0.1, 0.2, 0.2]);
        assert_eq!(spike_train.down(), &[0.5]);
        assert_eq!(spike_train.num_spikes(), 4);

        assert!(SpikeTrain::build(vec![0.2, 0.1], vec![]).is_err());
        assert!(SpikeTrain::build(vec![], vec![f64::NAN]).is_err());
        assert!(SpikeTrain::new_empty().is_empty());
    }

    #[test]
    fn test_concatenate_spikes() {
        let concatenated = concatenate_spikes([vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]);
        assert_eq!(concatenated.times(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(concatenated.channels(), &[0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_concatenate_spikes_interleaved() {
        let concatenated = concatenate_spikes([vec![1.0, 3.0, 5.0], vec![2.0, 3.0], vec![0.5]]);
        assert_eq!(concatenated.times(), &[0.5, 1.0, 2.0, 3.0, 3.0, 5.0]);
        assert_eq!(concatenated.channels(), &[2, 0, 1, 0, 1, 0]);
        assert_eq!(concatenated.len(), 6);
    }

    #[test]
    fn test_concatenate_spikes_empty() {
        let concatenated = concatenate_spikes(Vec::<Vec<f64>>::new());
        assert!(concatenated.is_empty());
        assert!(concatenated.channels().is_empty());

        let concatenated = concatenate_spikes([Vec::<f64>::new(), vec![]]);
        assert!(concatenated.is_empty());
    }

    #[test]
    fn test_concatenate_spikes_preserves_multiset() {
        let arrays = vec![vec![0.3, 0.1, 0.7], vec![0.2], vec![], vec![0.9, 0.05]];
        let concatenated = concatenate_spikes(&arrays);

        let mut expected: Vec<f64> = arrays.iter().flatten().copied().collect();
        expected.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(concatenated.len(), arrays.iter().map(|a| a.len()).sum::<usize>());
        assert_eq!(concatenated.times(), expected.as_slice());
    }

    #[test]
    fn test_from_spike_trains() {
        let ripple = SpikeTrain::build(vec![0.1], vec![0.4]).unwrap();
        let fast_ripple = SpikeTrain::build(vec![0.2, 0.4], vec![]).unwrap();
        let concatenated = ConcatenatedSpikes::from_spike_trains(&[ripple, fast_ripple]);
        assert_eq!(concatenated.times(), &[0.1, 0.2, 0.4, 0.4]);
        assert_eq!(concatenated.channels(), &[0, 2, 1, 2]);

        let spikes: Vec<InputSpike> = concatenated.iter().collect();
        assert_eq!(spikes[1], InputSpike { time: 0.2, channel: 2 });
    }
}
