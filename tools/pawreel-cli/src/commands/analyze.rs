//! Print the highlight windows of a keypoint file without touching video.

use std::path::PathBuf;

use pawreel_common::clock::FrameClock;
use pawreel_common::config::HighlightConfig;
use pawreel_keypoint_model::keypoints::KeypointSeries;
use pawreel_processing_core::highlight::HighlightAnalyzer;

pub fn run(
    keypoints: PathBuf,
    fps: f64,
    duration: Option<f64>,
    json: bool,
    config: HighlightConfig,
) -> anyhow::Result<()> {
    let series = KeypointSeries::load(&keypoints)
        .map_err(|e| anyhow::anyhow!("Failed to load keypoints: {e}"))?;
    let clock = FrameClock::new(fps)?;
    let duration = duration.unwrap_or_else(|| clock.duration_of(series.len()));

    let analyzer = HighlightAnalyzer::new(config)?;
    let analysis = analyzer.analyze(&series, &clock, duration)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("Analyzing keypoints at: {}", keypoints.display());
    println!("  Frames: {} @ {fps} fps ({duration:.2}s)", series.len());
    println!("  Parts: {}", series.part_names().join(", "));
    if let Some(stats) = &analysis.stats {
        println!(
            "  Activity: mean {:.4}, stddev {:.4}, max {:.4}",
            stats.mean, stats.std_dev, stats.max
        );
    }
    println!("  Threshold: {:.4}", analysis.threshold);
    println!("  Interesting frames: {}", analysis.interesting_frames.len());

    if analysis.is_empty() {
        println!("\nNo highlights found.");
        return Ok(());
    }

    println!("\nHighlight windows:");
    for (i, window) in analysis.windows.iter().enumerate() {
        println!(
            "  {:>3}. {:>8.3}s - {:>8.3}s ({:.2}s)",
            i + 1,
            window.start_secs,
            window.end_secs,
            window.duration_secs()
        );
    }
    println!(
        "\n{} window(s), {:.2}s of {duration:.2}s kept.",
        analysis.windows.len(),
        analysis.highlight_duration_secs()
    );

    Ok(())
}
