//! ADM with exact crossing instants.
//!
//! Between two samples the signal is assumed linear. Each time the segment reaches `baseline ± threshold`,
//! a spike is stamped at the interpolated crossing instant and the baseline moves to the crossing level.
//! During the refractory period no crossing is tested. When it ends, the baseline is reset to the
//! interpolated amplitude at that instant, so several spikes may fall between two samples.
use crate::error::HfoError;
use crate::signal::Signal;
use crate::spike_train::SpikeTrain;

pub(crate) fn encode(
    signal: &Signal,
    threshold_up: f64,
    threshold_down: f64,
    refractory_period: f64,
) -> Result<SpikeTrain, HfoError> {
    if !(refractory_period > 0.0) {
        return Err(HfoError::InvalidParameter(format!(
            "the refractory period must be positive, got {}",
            refractory_period
        )));
    }

    let signal = resample_for_refractory_period(signal, refractory_period)?;
    let (up, down) = crossing_scan(
        signal.times(),
        signal.amplitudes(),
        threshold_up,
        threshold_down,
        refractory_period,
    );
    Ok(SpikeTrain::new(up, down))
}

/// Resample the signal with the smallest integer factor bringing the sampling period below the refractory period.
fn resample_for_refractory_period(
    signal: &Signal,
    refractory_period: f64,
) -> Result<Signal, HfoError> {
    let sampling_period = match signal.sampling_period() {
        Some(dt) if dt > refractory_period => dt,
        _ => return Ok(signal.clone()),
    };

    let mut factor = (sampling_period / refractory_period).floor().max(1.0) as usize;
    while sampling_period / factor as f64 > refractory_period {
        factor += 1;
    }

    log::trace!(
        "Resampling signal by a factor {} to resolve a refractory period of {}",
        factor,
        refractory_period
    );
    signal.resample((signal.len() - 1) * factor + 1)
}

/// Scan the piecewise linear signal for threshold crossings.
/// Returns the UP and DOWN crossing instants.
fn crossing_scan(
    times: &[f64],
    amplitudes: &[f64],
    threshold_up: f64,
    threshold_down: f64,
    refractory_period: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut up = vec![];
    let mut down = vec![];
    let mut baseline = amplitudes[0];
    let mut resume: Option<f64> = None;

    for k in 1..times.len() {
        let (t0, t1) = (times[k - 1], times[k]);
        let (v0, v1) = (amplitudes[k - 1], amplitudes[k]);
        let slope = (v1 - v0) / (t1 - t0);

        // The crossing search starts from (from_time, from_value) on the segment.
        let mut from_time = t0;
        let mut from_value = v0;

        loop {
            if let Some(resume_time) = resume {
                if resume_time >= t1 {
                    break;
                }
                if resume_time > from_time {
                    from_time = resume_time;
                    from_value = v0 + (resume_time - t0) * slope;
                }
                baseline = from_value;
                resume = None;
            }

            let (level, spikes) = if v1 >= baseline + threshold_up {
                (baseline + threshold_up, &mut up)
            } else if v1 <= baseline - threshold_down {
                (baseline - threshold_down, &mut down)
            } else {
                break;
            };

            // A flat segment sitting on the level never crosses it.
            if slope == 0.0 {
                log::trace!("Flat segment [{}, {}] at level {} skipped", t0, t1, level);
                break;
            }

            let crossing = from_time + (level - from_value) / slope;
            spikes.push(crossing);
            baseline = level;
            from_time = crossing;
            from_value = level;
            resume = Some(crossing + refractory_period);
        }
    }

    (up, down)
}
