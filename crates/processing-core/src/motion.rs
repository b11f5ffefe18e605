//! Motion signal: per-frame activity from keypoint displacement.
//!
//! # Algorithm
//!
//! 1. **Displacement:** for each frame `i >= 1`, the Euclidean distance of
//!    every tracked part between frames `i - 1` and `i`, aggregated by mean
//!    (or sum) over the parts detected in both frames. Frame 0 is 0.
//! 2. **Gaps:** a frame with no usable part repeats the previous valid
//!    displacement, or 0 if there has been none yet.
//! 3. **Smoothing:** rolling average of width `window_size`. Near the edges
//!    only the neighbours that exist are averaged, so the signal is never
//!    biased towards zero at the boundaries.

use pawreel_common::config::{DisplacementAggregate, HighlightConfig, SmoothingAlignment};
use pawreel_common::error::{PawreelError, PawreelResult};
use pawreel_keypoint_model::keypoints::KeypointSeries;

/// Builds the smoothed activity signal for a keypoint series.
#[derive(Debug, Clone)]
pub struct MotionSignalBuilder {
    window_size: usize,
    confidence_floor: f64,
    aggregate: DisplacementAggregate,
    alignment: SmoothingAlignment,
}

impl MotionSignalBuilder {
    /// Create a builder with a trailing mean window and no confidence floor.
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size,
            confidence_floor: 0.0,
            aggregate: DisplacementAggregate::Mean,
            alignment: SmoothingAlignment::Trailing,
        }
    }

    /// Create a builder from highlight configuration.
    pub fn from_config(config: &HighlightConfig) -> Self {
        Self {
            window_size: config.rolling_window_size,
            confidence_floor: config.confidence_floor,
            aggregate: config.displacement_aggregate,
            alignment: config.smoothing_alignment,
        }
    }

    pub fn with_confidence_floor(mut self, floor: f64) -> Self {
        self.confidence_floor = floor;
        self
    }

    pub fn with_aggregate(mut self, aggregate: DisplacementAggregate) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn with_alignment(mut self, alignment: SmoothingAlignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Compute the smoothed activity signal, one value per frame.
    ///
    /// `parts` selects the tracked body parts; an empty slice tracks every
    /// part in the series.
    pub fn build(&self, series: &KeypointSeries, parts: &[String]) -> PawreelResult<Vec<f64>> {
        let raw = self.raw_displacement(series, parts)?;
        Ok(self.smooth(&raw))
    }

    /// Per-frame displacement before smoothing.
    pub fn raw_displacement(
        &self,
        series: &KeypointSeries,
        parts: &[String],
    ) -> PawreelResult<Vec<f64>> {
        if self.window_size == 0 {
            return Err(PawreelError::config("rolling window size must be at least 1"));
        }

        let slots = resolve_slots(series, parts)?;
        let frame_count = series.len();
        if frame_count == 0 {
            return Ok(vec![]);
        }

        let mut raw = Vec::with_capacity(frame_count);
        raw.push(0.0);

        let mut last_valid: Option<f64> = None;
        let mut gap_frames = 0usize;

        for frame in 1..frame_count {
            let mut total = 0.0;
            let mut valid_parts = 0usize;

            for &slot in &slots {
                let (Some(prev), Some(curr)) =
                    (series.slot(frame - 1, slot)?, series.slot(frame, slot)?)
                else {
                    continue;
                };
                if !prev.is_usable(self.confidence_floor) || !curr.is_usable(self.confidence_floor)
                {
                    continue;
                }
                total += prev.distance(&curr);
                valid_parts += 1;
            }

            let value = if valid_parts > 0 {
                let value = match self.aggregate {
                    DisplacementAggregate::Mean => total / valid_parts as f64,
                    DisplacementAggregate::Sum => total,
                };
                last_valid = Some(value);
                value
            } else {
                gap_frames += 1;
                last_valid.unwrap_or(0.0)
            };

            raw.push(value);
        }

        tracing::debug!(
            frames = frame_count,
            tracked_parts = slots.len(),
            gap_frames,
            "Computed raw displacement"
        );

        Ok(raw)
    }

    /// Rolling average over `window_size` frames using partial windows at
    /// the edges.
    pub fn smooth(&self, raw: &[f64]) -> Vec<f64> {
        let window = self.window_size.max(1);
        let len = raw.len();

        (0..len)
            .map(|i| {
                let (start, end) = match self.alignment {
                    SmoothingAlignment::Trailing => ((i + 1).saturating_sub(window), i + 1),
                    SmoothingAlignment::Centered => (
                        i.saturating_sub((window - 1) / 2),
                        (i + window / 2 + 1).min(len),
                    ),
                };
                let values = &raw[start..end];
                values.iter().sum::<f64>() / values.len() as f64
            })
            .collect()
    }
}

/// Map part names to series slots. Empty means every part.
fn resolve_slots(series: &KeypointSeries, parts: &[String]) -> PawreelResult<Vec<usize>> {
    if parts.is_empty() {
        return Ok((0..series.part_names().len()).collect());
    }
    parts.iter().map(|part| series.part_slot(part)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawreel_keypoint_model::keypoints::Keypoint;

    /// Build a series from per-part tracks of optional `(x, y)` positions.
    fn series(tracks: &[(&str, Vec<Option<(f64, f64)>>)]) -> KeypointSeries {
        let parts = tracks.iter().map(|(name, _)| name.to_string()).collect();
        let frame_count = tracks[0].1.len();
        let frames = (0..frame_count)
            .map(|i| {
                tracks
                    .iter()
                    .map(|(_, track)| track[i].map(|(x, y)| Keypoint::new(x, y)))
                    .collect()
            })
            .collect();
        KeypointSeries::from_frames(parts, frames).unwrap()
    }

    fn walk(steps: &[(f64, f64)]) -> Vec<Option<(f64, f64)>> {
        steps.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_constant_velocity_displacement() {
        let s = series(&[("nose", walk(&[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0), (9.0, 12.0)]))]);
        let raw = MotionSignalBuilder::new(1).raw_displacement(&s, &[]).unwrap();
        assert_eq!(raw, vec![0.0, 5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_window_of_one_equals_raw() {
        let s = series(&[(
            "nose",
            walk(&[(0.0, 0.0), (1.0, 0.0), (4.0, 0.0), (4.0, 2.0), (9.0, 2.0)]),
        )]);
        let builder = MotionSignalBuilder::new(1);
        let raw = builder.raw_displacement(&s, &[]).unwrap();
        let activity = builder.build(&s, &[]).unwrap();
        assert_eq!(activity, raw);
    }

    #[test]
    fn test_trailing_edges_use_partial_window() {
        let s = series(&[("nose", walk(&[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0), (9.0, 12.0)]))]);
        let activity = MotionSignalBuilder::new(2).build(&s, &[]).unwrap();
        // Frame 0 averages only itself; no zero padding before it.
        assert_eq!(activity, vec![0.0, 2.5, 5.0, 5.0]);
    }

    #[test]
    fn test_centered_edges_use_partial_window() {
        let s = series(&[("nose", walk(&[(0.0, 0.0), (3.0, 4.0), (6.0, 8.0), (9.0, 12.0)]))]);
        let activity = MotionSignalBuilder::new(3)
            .with_alignment(SmoothingAlignment::Centered)
            .build(&s, &[])
            .unwrap();
        assert_eq!(activity, vec![2.5, 10.0 / 3.0, 5.0, 5.0]);
    }

    #[test]
    fn test_signal_length_and_non_negative() {
        let s = series(&[
            (
                "nose",
                walk(&[(5.0, 5.0), (1.0, 9.0), (-3.0, 2.0), (7.0, -1.0), (0.0, 0.0)]),
            ),
            (
                "tail",
                vec![Some((0.0, 0.0)), None, Some((2.0, 2.0)), Some((2.0, 2.0)), None],
            ),
        ]);
        let activity = MotionSignalBuilder::new(3).build(&s, &[]).unwrap();
        assert_eq!(activity.len(), s.len());
        assert!(activity.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_missing_frame_repeats_previous_value() {
        let s = series(&[(
            "nose",
            vec![Some((0.0, 0.0)), Some((0.0, 2.0)), None, Some((0.0, 2.0))],
        )]);
        let raw = MotionSignalBuilder::new(1).raw_displacement(&s, &[]).unwrap();
        // Frames 2 and 3 both lack a usable pair and carry frame 1 forward.
        assert_eq!(raw, vec![0.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_missing_before_any_valid_value_is_zero() {
        let s = series(&[("nose", vec![None, Some((0.0, 0.0)), Some((0.0, 1.0))])]);
        let raw = MotionSignalBuilder::new(1).raw_displacement(&s, &[]).unwrap();
        assert_eq!(raw, vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_partial_detection_averages_present_parts() {
        let s = series(&[
            ("nose", walk(&[(0.0, 0.0), (4.0, 0.0)])),
            ("tail", vec![Some((0.0, 0.0)), None]),
        ]);
        let raw = MotionSignalBuilder::new(1).raw_displacement(&s, &[]).unwrap();
        assert_eq!(raw, vec![0.0, 4.0]);
    }

    #[test]
    fn test_mean_and_sum_aggregates() {
        let s = series(&[
            ("nose", walk(&[(0.0, 0.0), (2.0, 0.0)])),
            ("tail", walk(&[(0.0, 0.0), (0.0, 6.0)])),
        ]);
        let mean = MotionSignalBuilder::new(1).raw_displacement(&s, &[]).unwrap();
        assert_eq!(mean, vec![0.0, 4.0]);

        let sum = MotionSignalBuilder::new(1)
            .with_aggregate(DisplacementAggregate::Sum)
            .raw_displacement(&s, &[])
            .unwrap();
        assert_eq!(sum, vec![0.0, 8.0]);
    }

    #[test]
    fn test_tracked_parts_subset() {
        let s = series(&[
            ("nose", walk(&[(0.0, 0.0), (2.0, 0.0)])),
            ("tail", walk(&[(0.0, 0.0), (0.0, 6.0)])),
        ]);
        let raw = MotionSignalBuilder::new(1)
            .raw_displacement(&s, &["tail".to_string()])
            .unwrap();
        assert_eq!(raw, vec![0.0, 6.0]);
    }

    #[test]
    fn test_low_confidence_parts_are_excluded() {
        let frames = vec![
            vec![
                Some(Keypoint::new(0.0, 0.0).with_confidence(0.9)),
                Some(Keypoint::new(0.0, 0.0).with_confidence(0.9)),
            ],
            vec![
                Some(Keypoint::new(1.0, 0.0).with_confidence(0.9)),
                Some(Keypoint::new(100.0, 0.0).with_confidence(0.1)),
            ],
        ];
        let s = KeypointSeries::from_frames(vec!["nose".into(), "tail".into()], frames).unwrap();
        let raw = MotionSignalBuilder::new(1)
            .with_confidence_floor(0.5)
            .raw_displacement(&s, &[])
            .unwrap();
        assert_eq!(raw, vec![0.0, 1.0]);
    }

    #[test]
    fn test_unknown_part_is_out_of_range() {
        let s = series(&[("nose", walk(&[(0.0, 0.0), (1.0, 0.0)]))]);
        let err = MotionSignalBuilder::new(1)
            .build(&s, &["wing".to_string()])
            .unwrap_err();
        assert!(matches!(err, PawreelError::OutOfRange { .. }));
    }

    #[test]
    fn test_zero_window_is_config_error() {
        let s = series(&[("nose", walk(&[(0.0, 0.0)]))]);
        let err = MotionSignalBuilder::new(0).build(&s, &[]).unwrap_err();
        assert!(matches!(err, PawreelError::Config { .. }));
    }

    #[test]
    fn test_empty_series() {
        let s = KeypointSeries::from_frames(vec!["nose".into()], vec![]).unwrap();
        assert!(MotionSignalBuilder::new(5).build(&s, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_deterministic() {
        let s = series(&[(
            "nose",
            walk(&[(0.1, 0.7), (0.3, 0.2), (0.9, 0.4), (0.2, 0.8), (0.5, 0.5)]),
        )]);
        let builder = MotionSignalBuilder::new(3);
        assert_eq!(builder.build(&s, &[]).unwrap(), builder.build(&s, &[]).unwrap());
    }
}
