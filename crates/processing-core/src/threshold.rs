//! Activity threshold: selects the frames worth highlighting.
//!
//! The threshold is `mean + multiplier * stddev`, computed once over the
//! whole signal. The standard deviation is the population flavor (divide
//! by `n`), matching `numpy.std` with its default `ddof = 0`.

use pawreel_common::error::{PawreelError, PawreelResult};
use serde::{Deserialize, Serialize};

/// Summary statistics of an activity signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActivityStats {
    pub mean: f64,
    /// Population standard deviation.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl ActivityStats {
    /// Compute statistics, or `None` for an empty signal.
    pub fn compute(activity: &[f64]) -> Option<Self> {
        if activity.is_empty() {
            return None;
        }

        let n = activity.len() as f64;
        let mean = activity.iter().sum::<f64>() / n;
        let variance = activity.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let min = activity.iter().copied().fold(f64::INFINITY, f64::min);
        let max = activity.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
        })
    }

    /// Whether every sample has the same value.
    pub fn is_flat(&self) -> bool {
        self.max == self.min
    }
}

/// Result of thresholding an activity signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSelection {
    /// Statistics of the signal; `None` when it was empty.
    pub stats: Option<ActivityStats>,
    /// The cut-off a frame must strictly exceed.
    pub threshold: f64,
    /// Sorted indices of interesting frames.
    pub frames: Vec<usize>,
}

impl ThresholdSelection {
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// Marks frames whose activity is strictly above the statistical threshold.
#[derive(Debug, Clone, Copy)]
pub struct ActivityThresholder {
    multiplier: f64,
}

impl ActivityThresholder {
    /// Create a thresholder. The multiplier must be finite and `>= 0`.
    pub fn new(multiplier: f64) -> PawreelResult<Self> {
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(PawreelError::config(format!(
                "threshold multiplier must be a finite value >= 0, got {multiplier}"
            )));
        }
        Ok(Self { multiplier })
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Threshold for a signal with the given statistics.
    pub fn threshold_for(&self, stats: &ActivityStats) -> f64 {
        stats.mean + self.multiplier * stats.std_dev
    }

    /// Select the interesting frames of `activity`.
    ///
    /// A flat signal yields an empty selection, whatever the multiplier.
    pub fn select(&self, activity: &[f64]) -> ThresholdSelection {
        let Some(stats) = ActivityStats::compute(activity) else {
            return ThresholdSelection {
                stats: None,
                threshold: 0.0,
                frames: vec![],
            };
        };

        let threshold = self.threshold_for(&stats);

        // Rounding in the mean of identical samples can land a hair below
        // the samples themselves; a flat signal has nothing above average.
        let frames = if stats.is_flat() {
            vec![]
        } else {
            activity
                .iter()
                .enumerate()
                .filter(|(_, v)| **v > threshold)
                .map(|(i, _)| i)
                .collect()
        };

        tracing::debug!(
            mean = stats.mean,
            std_dev = stats.std_dev,
            threshold,
            selected = frames.len(),
            "Applied activity threshold"
        );

        ThresholdSelection {
            stats: Some(stats),
            threshold,
            frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std_dev_hand_computed() {
        // mean = 2.5, population variance = 75 / 4 = 18.75
        let stats = ActivityStats::compute(&[0.0, 0.0, 0.0, 10.0]).unwrap();
        assert_eq!(stats.mean, 2.5);
        assert!((stats.std_dev - 18.75f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_population_flavor_changes_selection() {
        // Population: 2.5 + 1.5 * 4.330 = 8.995 -> frame 3 selected.
        // Sample flavor would give 2.5 + 1.5 * 5.0 = 10.0 -> nothing selected.
        let selection = ActivityThresholder::new(1.5)
            .unwrap()
            .select(&[0.0, 0.0, 0.0, 10.0]);
        assert_eq!(selection.frames, vec![3]);
        assert!((selection.threshold - (2.5 + 1.5 * 18.75f64.sqrt())).abs() < 1e-12);
    }

    #[test]
    fn test_zero_multiplier_selects_above_mean() {
        let activity = [1.0, 4.0, 2.0, 5.0, 3.0];
        let selection = ActivityThresholder::new(0.0).unwrap().select(&activity);
        // mean = 3.0; 3.0 itself is not strictly above.
        assert_eq!(selection.frames, vec![1, 3]);
    }

    #[test]
    fn test_flat_signal_is_empty() {
        let activity = vec![0.1; 97];
        for multiplier in [0.0, 0.5, 2.0] {
            let selection = ActivityThresholder::new(multiplier).unwrap().select(&activity);
            assert!(selection.is_empty(), "multiplier {multiplier}");
        }
    }

    #[test]
    fn test_empty_signal() {
        let selection = ActivityThresholder::new(1.0).unwrap().select(&[]);
        assert!(selection.is_empty());
        assert!(selection.stats.is_none());
    }

    #[test]
    fn test_frames_are_sorted() {
        let activity = [9.0, 0.0, 8.0, 0.0, 0.0, 7.0, 0.0];
        let selection = ActivityThresholder::new(0.5).unwrap().select(&activity);
        let mut sorted = selection.frames.clone();
        sorted.sort_unstable();
        assert_eq!(selection.frames, sorted);
        assert_eq!(selection.frames, vec![0, 2, 5]);
    }

    #[test]
    fn test_rejects_negative_multiplier() {
        assert!(ActivityThresholder::new(-1.0).is_err());
        assert!(ActivityThresholder::new(f64::INFINITY).is_err());
    }
}
