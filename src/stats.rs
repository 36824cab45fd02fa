use clap::ValueEnum;
use serde::Serialize;

use crate::data::model::Channel;
use crate::error::{AnalysisError, Result};

/// Percentiles reported for every channel, in column order.
pub const PERCENTILES: [f64; 5] = [5.0, 25.0, 50.0, 99.0, 99.9];

// ---------------------------------------------------------------------------
// StatSummary
// ---------------------------------------------------------------------------

/// Descriptive statistics for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatSummary {
    pub mean: f64,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p99: f64,
    #[serde(rename = "p99.9")]
    pub p999: f64,
    pub max: f64,
    /// Samples the statistics were computed over.
    pub samples: usize,
}

impl StatSummary {
    /// Values in report column order: mean, percentiles, max.
    pub fn columns(&self) -> [f64; 7] {
        [
            self.mean, self.p5, self.p25, self.p50, self.p99, self.p999, self.max,
        ]
    }
}

/// What to do with negative samples of causally ordered channels.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyPolicy {
    /// Keep them in every statistic (they still get reported)
    #[default]
    Include,
    /// Drop them before summarising
    Exclude,
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// Summarise every sample of `channel`, negative ones included.
pub fn summarize(channel: &Channel) -> Result<StatSummary> {
    if channel.is_empty() {
        return Err(AnalysisError::EmptyChannel(channel.name.clone()));
    }
    summarize_values(&channel.name, &channel.values)
}

/// Summarise `values`; `name` only labels the error for an empty slice.
pub fn summarize_values(name: &str, values: &[f64]) -> Result<StatSummary> {
    if values.is_empty() {
        return Err(AnalysisError::EmptyChannel(name.to_string()));
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);

    let mean = mean(&sorted);
    let [p5, p25, p50, p99, p999] = PERCENTILES.map(|p| percentile(&sorted, p));
    let max = sorted[sorted.len() - 1];

    Ok(StatSummary {
        mean,
        p5,
        p25,
        p50,
        p99,
        p999,
        max,
        samples: sorted.len(),
    })
}

/// Arithmetic mean.  Falls back to summing pre-divided samples when the
/// plain sum overflows, which only happens for magnitudes near `f64::MAX`.
fn mean(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let sum: f64 = values.iter().sum();
    if sum.is_finite() {
        return sum / n;
    }
    values.iter().map(|v| v / n).sum()
}

/// Linear-interpolation percentile of an ascending, non-empty slice.
///
/// `rank = p / 100 * (n - 1)`; the result lies between the two samples
/// around `rank`, so ties are kept and the value never leaves the sample range.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    debug_assert!((0.0..=100.0).contains(&p));

    let last = sorted.len() - 1;
    let rank = (p / 100.0) * last as f64;
    let lo = (rank.floor() as usize).min(last);
    let hi = (rank.ceil() as usize).min(last);

    let (a, b) = (sorted[lo], sorted[hi]);
    if lo == hi {
        return a;
    }
    let t = rank - lo as f64;
    (a + (b - a) * t).clamp(a, b)
}
