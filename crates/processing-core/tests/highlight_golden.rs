use std::path::PathBuf;

use pawreel_common::clock::FrameClock;
use pawreel_common::config::{HighlightConfig, SmoothingAlignment};
use pawreel_keypoint_model::keypoints::KeypointSeries;
use pawreel_keypoint_model::window::TimeWindow;
use pawreel_processing_core::highlight::HighlightAnalyzer;

fn load_fixture_series() -> KeypointSeries {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-run")
        .join("keypoints.jsonl");

    KeypointSeries::load(path).expect("fixture keypoints should parse")
}

fn assert_windows_eq(actual: &[TimeWindow], expected: &[(f64, f64)]) {
    assert_eq!(actual.len(), expected.len(), "windows: {actual:?}");
    for (window, (start, end)) in actual.iter().zip(expected) {
        assert!(
            (window.start_secs - start).abs() < 1e-9 && (window.end_secs - end).abs() < 1e-9,
            "expected [{start}, {end}), got {window:?}"
        );
    }
}

#[test]
fn fixture_shape() {
    let series = load_fixture_series();
    assert_eq!(series.len(), 500);
    assert_eq!(
        series.part_names(),
        &["left_ear", "nose", "right_ear", "tail_base"]
    );
    // Tail dropout recorded as null coordinates.
    assert_eq!(series.coordinates(210, "tail_base").unwrap(), None);
}

#[test]
fn default_config_finds_three_bursts() {
    let series = load_fixture_series();
    let clock = FrameClock::new(25.0).unwrap();
    let analysis = HighlightAnalyzer::with_defaults()
        .analyze(&series, &clock, 20.0)
        .unwrap();

    assert_eq!(analysis.activity.len(), 500);
    assert_eq!(analysis.interesting_frames.len(), 42);
    assert_eq!(analysis.interesting_frames.first(), Some(&100));
    assert_eq!(analysis.interesting_frames.last(), Some(&449));
    // Two bursts 3 frames apart collapse into one window.
    assert_windows_eq(
        &analysis.windows,
        &[(3.8, 4.8), (11.84, 12.84), (17.4, 18.16)],
    );

    let clips = analysis.clip_sequence().unwrap();
    assert_eq!(clips.len(), 3);
}

#[test]
fn filtered_parts_centered_window_and_confidence_floor() {
    let series = load_fixture_series();
    let clock = FrameClock::new(25.0).unwrap();
    let config = HighlightConfig {
        rolling_window_size: 3,
        threshold_multiplier: 1.0,
        pre_pad_seconds: 0.5,
        post_pad_seconds: 1.0,
        tracked_parts: vec!["nose".into(), "tail_base".into()],
        confidence_floor: 0.5,
        smoothing_alignment: SmoothingAlignment::Centered,
        ..Default::default()
    };
    let analysis = HighlightAnalyzer::new(config)
        .unwrap()
        .analyze(&series, &clock, 20.0)
        .unwrap();

    assert_eq!(analysis.interesting_frames.len(), 34);
    assert_windows_eq(
        &analysis.windows,
        &[(3.46, 5.48), (11.5, 13.52), (17.06, 18.84)],
    );
}

#[test]
fn analysis_is_deterministic() {
    let series = load_fixture_series();
    let clock = FrameClock::new(25.0).unwrap();
    let analyzer = HighlightAnalyzer::with_defaults();
    let first = analyzer.analyze(&series, &clock, 20.0).unwrap();
    let second = analyzer.analyze(&series, &clock, 20.0).unwrap();
    assert_eq!(first, second);
}
