//! Window building: padded time ranges around interesting frames.
//!
//! # Algorithm
//!
//! 1. **Raw windows:** each interesting frame `i` becomes
//!    `[time(i) - pre_pad, time(i) + post_pad)`, clamped to `[0, duration)`.
//!    Windows left empty by clamping are dropped.
//! 2. **Sort** by start, ties broken by end.
//! 3. **Merge sweep:** a single left-to-right pass that extends the current
//!    window while the next one starts at or before its end. Touching
//!    windows (`end == start`) are merged.
//!
//! The result is sorted, pairwise disjoint with gaps between neighbours,
//! and covers exactly the union of the raw windows.

use pawreel_common::clock::FrameClock;
use pawreel_common::config::HighlightConfig;
use pawreel_keypoint_model::window::TimeWindow;

/// Expands interesting frames into merged highlight windows.
#[derive(Debug, Clone, Copy)]
pub struct WindowBuilder {
    pre_pad_secs: f64,
    post_pad_secs: f64,
}

impl WindowBuilder {
    pub fn new(pre_pad_secs: f64, post_pad_secs: f64) -> Self {
        Self {
            pre_pad_secs,
            post_pad_secs,
        }
    }

    pub fn from_config(config: &HighlightConfig) -> Self {
        Self::new(config.pre_pad_seconds, config.post_pad_seconds)
    }

    /// Build the merged window set for the given interesting frames.
    pub fn build_windows(
        &self,
        frames: &[usize],
        clock: &FrameClock,
        duration_secs: f64,
    ) -> Vec<TimeWindow> {
        let raw = self.raw_windows(frames, clock, duration_secs);
        let raw_count = raw.len();
        let merged = merge_windows(raw);

        tracing::debug!(
            interesting_frames = frames.len(),
            raw_windows = raw_count,
            merged_windows = merged.len(),
            "Built highlight windows"
        );

        merged
    }

    /// Padded and clamped windows, one per frame, before merging.
    pub fn raw_windows(
        &self,
        frames: &[usize],
        clock: &FrameClock,
        duration_secs: f64,
    ) -> Vec<TimeWindow> {
        frames
            .iter()
            .filter_map(|&frame| {
                let t = clock.frame_to_secs(frame);
                TimeWindow::clamped(t - self.pre_pad_secs, t + self.post_pad_secs, duration_secs)
            })
            .collect()
    }
}

/// Merge windows into a minimal, sorted, disjoint cover of their union.
///
/// Input order does not matter.
pub fn merge_windows(mut windows: Vec<TimeWindow>) -> Vec<TimeWindow> {
    windows.sort_by(TimeWindow::chronological_cmp);

    let mut merged: Vec<TimeWindow> = Vec::with_capacity(windows.len());
    let mut iter = windows.into_iter();
    let Some(mut current) = iter.next() else {
        return merged;
    };

    for next in iter {
        // Sorted by start, so this reduces to `next.start <= current.end`.
        if current.overlaps_or_touches(&next) {
            current.end_secs = current.end_secs.max(next.end_secs);
        } else {
            merged.push(current);
            current = next;
        }
    }
    merged.push(current);

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawreel_keypoint_model::window::total_duration;
    use proptest::prelude::*;

    fn w(start: f64, end: f64) -> TimeWindow {
        TimeWindow::new(start, end).unwrap()
    }

    fn clock30() -> FrameClock {
        FrameClock::new(30.0).unwrap()
    }

    #[test]
    fn test_overlapping_frames_merge() {
        // 5.0s and 5.5s at 30fps with 1s padding.
        let windows = WindowBuilder::new(1.0, 1.0).build_windows(&[150, 165], &clock30(), 60.0);
        assert_eq!(windows, vec![w(4.0, 6.5)]);
    }

    #[test]
    fn test_distant_frames_stay_separate() {
        let windows = WindowBuilder::new(1.0, 1.0).build_windows(&[150, 600], &clock30(), 60.0);
        assert_eq!(windows, vec![w(4.0, 6.0), w(19.0, 21.0)]);
    }

    #[test]
    fn test_start_is_clamped_to_zero() {
        // Frame 6 at 30fps is 0.2s.
        let windows = WindowBuilder::new(1.0, 1.0).build_windows(&[6], &clock30(), 60.0);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].start_secs, 0.0);
        assert!((windows[0].end_secs - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_end_is_clamped_to_duration() {
        let windows = WindowBuilder::new(0.5, 2.0).build_windows(&[290], &clock30(), 10.0);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].end_secs, 10.0);
    }

    #[test]
    fn test_windows_beyond_duration_are_dropped() {
        let windows = WindowBuilder::new(0.0, 1.0).build_windows(&[900], &clock30(), 10.0);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_zero_padding_windows_are_empty_and_dropped() {
        let windows = WindowBuilder::new(0.0, 0.0).build_windows(&[30, 60], &clock30(), 10.0);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_no_frames_no_windows() {
        let windows = WindowBuilder::new(1.0, 1.0).build_windows(&[], &clock30(), 10.0);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_touching_windows_merge() {
        // Exact boundary contact is treated as mergeable.
        let merged = merge_windows(vec![w(1.0, 2.0), w(2.0, 3.0)]);
        assert_eq!(merged, vec![w(1.0, 3.0)]);
    }

    #[test]
    fn test_contained_window_is_absorbed() {
        let merged = merge_windows(vec![w(1.0, 10.0), w(2.0, 3.0), w(11.0, 12.0)]);
        assert_eq!(merged, vec![w(1.0, 10.0), w(11.0, 12.0)]);
    }

    #[test]
    fn test_unsorted_input() {
        let merged = merge_windows(vec![w(8.0, 9.0), w(1.0, 2.0), w(1.5, 4.0)]);
        assert_eq!(merged, vec![w(1.0, 4.0), w(8.0, 9.0)]);
    }

    #[test]
    fn test_asymmetric_padding() {
        let windows = WindowBuilder::new(0.5, 2.0).build_windows(&[150], &clock30(), 60.0);
        assert_eq!(windows, vec![w(4.5, 7.0)]);
    }

    fn arb_windows() -> impl Strategy<Value = Vec<TimeWindow>> {
        prop::collection::vec((0u32..400, 1u32..40), 0..40).prop_map(|pairs| {
            // Quarter-second grid keeps touching boundaries exact.
            pairs
                .into_iter()
                .map(|(start, len)| w(start as f64 * 0.25, (start + len) as f64 * 0.25))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn merge_is_order_independent(
            windows in arb_windows(),
            seed in any::<u64>(),
        ) {
            let mut shuffled = windows.clone();
            // Deterministic Fisher-Yates driven by the seed.
            let mut state = seed | 1;
            for i in (1..shuffled.len()).rev() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                let j = (state % (i as u64 + 1)) as usize;
                shuffled.swap(i, j);
            }
            prop_assert_eq!(merge_windows(windows), merge_windows(shuffled));
        }

        #[test]
        fn merge_is_sorted_disjoint_and_minimal(windows in arb_windows()) {
            let merged = merge_windows(windows);
            for pair in merged.windows(2) {
                // Strict: touching neighbours would have been merged.
                prop_assert!(pair[0].end_secs < pair[1].start_secs);
            }
            for window in &merged {
                prop_assert!(window.start_secs < window.end_secs);
            }
        }

        #[test]
        fn merge_covers_exactly_the_union(windows in arb_windows()) {
            let merged = merge_windows(windows.clone());
            // Every raw window lies inside exactly one merged window.
            for raw in &windows {
                let covering = merged
                    .iter()
                    .filter(|m| m.start_secs <= raw.start_secs && raw.end_secs <= m.end_secs)
                    .count();
                prop_assert_eq!(covering, 1);
            }
            // Every merged boundary comes from some raw window.
            for m in &merged {
                prop_assert!(windows.iter().any(|r| r.start_secs == m.start_secs));
                prop_assert!(windows.iter().any(|r| r.end_secs == m.end_secs));
            }
        }

        #[test]
        fn merged_duration_drops_exactly_when_windows_overlap(windows in arb_windows()) {
            let raw_sum = total_duration(&windows);
            let merged = merge_windows(windows.clone());
            let merged_sum = total_duration(&merged);
            prop_assert!(merged_sum <= raw_sum + 1e-9);

            // Classify contact against the furthest end seen so far.
            let mut sorted = windows.clone();
            sorted.sort_by(TimeWindow::chronological_cmp);
            let mut overlaps = false;
            let mut touches = false;
            let mut running_end = f64::NEG_INFINITY;
            for window in &sorted {
                if window.start_secs < running_end {
                    overlaps = true;
                } else if window.start_secs == running_end {
                    touches = true;
                }
                running_end = running_end.max(window.end_secs);
            }

            if overlaps {
                prop_assert!(merged_sum < raw_sum - 1e-9);
            } else {
                prop_assert!((merged_sum - raw_sum).abs() < 1e-9);
                if touches {
                    prop_assert!(merged.len() < windows.len());
                } else {
                    prop_assert_eq!(merged.len(), windows.len());
                }
            }
        }
    }
}
