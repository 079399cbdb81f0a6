//! Descriptive statistics of the `csat` field over a set of records.

use serde::Serialize;

use crate::analyzers::utility::{mean, median, sample_stddev};

/// Statistics of one group of scores. Only built from a non-empty slice,
/// so `count >= 1` and `min <= mean <= max` always hold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; `None` for single-record groups.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

impl GroupStats {
    /// Summarizes `scores`. Returns `None` for an empty slice.
    pub fn from_scores(scores: &[f64]) -> Option<Self> {
        let avg = mean(scores)?;
        let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(GroupStats {
            count: scores.len(),
            // Summation error can push sum / n just outside the observed range.
            mean: avg.clamp(min, max),
            median: median(scores)?,
            std: sample_stddev(scores, avg),
            min,
            max,
            sum: scores.iter().sum(),
        })
    }

    /// Value of `metric` for this group, if defined.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Mean => Some(self.mean),
            Metric::Median => Some(self.median),
            Metric::Std => self.std,
            Metric::Min => Some(self.min),
            Metric::Max => Some(self.max),
            Metric::Sum => Some(self.sum),
            Metric::Count => Some(self.count as f64),
        }
    }
}

/// A numeric column of [`GroupStats`] that groups can be ranked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Mean,
    Median,
    Std,
    Min,
    Max,
    Sum,
    Count,
}

pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 / total as f64) * 100.0
    }
}

/// Rounds to two decimals, for display values only.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(pct(50, 100), 50.0);
        assert_eq!(pct(1, 4), 25.0);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(100.0 / 3.0), 33.33);
        assert_eq!(round2(11.0 / 3.0), 3.67);
        assert_eq!(round2(1.5), 1.5);
    }

    #[test]
    fn test_from_scores_empty() {
        assert_eq!(GroupStats::from_scores(&[]), None);
    }

    #[test]
    fn test_from_scores_values() {
        let stats = GroupStats::from_scores(&[2.0, 4.0, 5.0]).unwrap();

        assert_eq!(stats.count, 3);
        assert_eq!(round2(stats.mean), 3.67);
        assert_eq!(stats.median, 4.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.sum, 11.0);
        assert!(stats.std.is_some());
    }

    #[test]
    fn test_mean_stays_within_min_and_max_for_fractional_scores() {
        for tenth in 10..=50 {
            let v = f64::from(tenth) / 10.0;
            for n in 2..=12 {
                let stats = GroupStats::from_scores(&vec![v; n]).unwrap();
                assert!(stats.min <= stats.mean, "v = {v}, n = {n}");
                assert!(stats.mean <= stats.max, "v = {v}, n = {n}");
            }
        }

        let stats = GroupStats::from_scores(&vec![1.1; 6]).unwrap();
        assert_eq!(stats.mean, 1.1);
        let stats = GroupStats::from_scores(&vec![4.1; 3]).unwrap();
        assert_eq!(stats.mean, 4.1);
    }

    #[test]
    fn test_single_score_has_no_std() {
        let stats = GroupStats::from_scores(&[4.0]).unwrap();
        assert_eq!(stats.std, None);
        assert_eq!(stats.metric(Metric::Std), None);
        assert_eq!(stats.metric(Metric::Count), Some(1.0));
    }
}
