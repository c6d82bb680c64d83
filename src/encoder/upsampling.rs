//! ADM on a linearly upsampled grid.
use crate::error::HfoError;
use crate::signal::Signal;
use crate::spike_train::SpikeTrain;

use super::check_interpolation_factor;

/// Encode the signal on an evenly spaced grid of `round(duration * interpolation_factor)` points.
///
/// A spike is emitted at the grid time of the first point rising strictly above `baseline + threshold_up`
/// (or falling strictly below `baseline - threshold_down`), and the baseline jumps to the amplitude of that point.
/// The next `floor(refractory_period * interpolation_factor)` grid points (at least one) are then skipped.
pub(crate) fn encode(
    signal: &Signal,
    threshold_up: f64,
    threshold_down: f64,
    refractory_period: f64,
    interpolation_factor: f64,
) -> Result<SpikeTrain, HfoError> {
    check_interpolation_factor(interpolation_factor)?;

    let num_points = (signal.duration() * interpolation_factor).round_ties_even();
    if !(num_points >= 2.0) || !num_points.is_finite() {
        return Err(HfoError::InvalidParameter(format!(
            "an interpolation factor of {} cannot resolve a signal lasting {}",
            interpolation_factor,
            signal.duration()
        )));
    }
    let upsampled = signal.resample(num_points as usize)?;
    let skip = ((refractory_period * interpolation_factor).floor() as usize).max(1);

    let times = upsampled.times();
    let amplitudes = upsampled.amplitudes();
    let mut baseline = signal.amplitudes()[0];
    let mut up = vec![];
    let mut down = vec![];

    let mut i = 0;
    while i < times.len() {
        let value = amplitudes[i];
        if baseline + threshold_up < value {
            up.push(times[i]);
            baseline = value;
            i += skip;
        } else if baseline - threshold_down > value {
            down.push(times[i]);
            baseline = value;
            i += skip;
        } else {
            i += 1;
        }
    }

    Ok(SpikeTrain::new(up, down))
}
