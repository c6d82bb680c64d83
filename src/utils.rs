//! Utility functions and types.
use serde::{Deserialize, Serialize};

use crate::error::HfoError;

/// A time interval.
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum TimeInterval {
    /// A closed interval [start, end].
    Closed { start: f64, end: f64 },
    /// An empty time interval.
    Empty,
}

impl TimeInterval {
    pub fn new(start: f64, end: f64) -> Self {
        if start > end || start.is_nan() || end.is_nan() {
            TimeInterval::Empty
        } else {
            TimeInterval::Closed { start, end }
        }
    }

    /// Returns true if the time lies inside the interval, bounds included.
    pub fn contains(&self, time: f64) -> bool {
        match self {
            TimeInterval::Closed { start, end } => time >= *start && time <= *end,
            TimeInterval::Empty => false,
        }
    }

    pub fn length(&self) -> f64 {
        match self {
            TimeInterval::Closed { start, end } => end - start,
            TimeInterval::Empty => 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TimeInterval::Empty)
    }

    /// Returns the index range of the sorted `times` lying inside the interval.
    pub fn index_range(&self, times: &[f64]) -> std::ops::Range<usize> {
        match self {
            TimeInterval::Closed { start, end } => {
                let first = times.partition_point(|t| t < start);
                let last = times.partition_point(|t| t <= end);
                first..last.max(first)
            }
            TimeInterval::Empty => 0..0,
        }
    }
}

/// Check that the times are finite and strictly increasing.
pub fn check_strictly_increasing(times: &[f64]) -> Result<(), HfoError> {
    if let Some(t) = times.iter().find(|t| !t.is_finite()) {
        return Err(HfoError::InvalidSignal(format!(
            "sample times must be finite, found {}",
            t
        )));
    }
    if let Some(i) = (1..times.len()).find(|&i| times[i] <= times[i - 1]) {
        return Err(HfoError::InvalidSignal(format!(
            "sample times must be strictly increasing, found {} after {}",
            times[i],
            times[i - 1]
        )));
    }
    Ok(())
}

/// Returns the arithmetic mean of the values, or NaN if there is none.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Returns `n` evenly spaced points from `start` to `end`, both included.
/// The last point is exactly `end`.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut points: Vec<f64> = (0..n).map(|i| start + i as f64 * step).collect();
            points[n - 1] = end;
            points
        }
    }
}

/// Linearly interpolates the samples `(times, values)` at the sorted query points.
/// Queries outside the sample range are clamped to the boundary values.
pub fn interpolate(times: &[f64], values: &[f64], queries: &[f64]) -> Vec<f64> {
    let mut segment = 0;
    queries
        .iter()
        .map(|&t| {
            if t <= times[0] {
                return values[0];
            }
            if t >= times[times.len() - 1] {
                return values[values.len() - 1];
            }
            while times[segment + 1] < t {
                segment += 1;
            }
            let (t0, t1) = (times[segment], times[segment + 1]);
            let (v0, v1) = (values[segment], values[segment + 1]);
            v0 + (t - t0) * (v1 - v0) / (t1 - t0)
        })
        .collect()
}
