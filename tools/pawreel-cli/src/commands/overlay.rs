//! Burn the best-matching captions into a clip.

use std::path::PathBuf;
use std::time::Duration;

use pawreel_common::config::AppConfig;
use pawreel_render_engine::backend::MediaBackend;
use pawreel_render_engine::ffmpeg::FfmpegBackend;
use pawreel_render_engine::overlay::{run_overlay_job, CommandCaptionScorer, OverlayJob};

pub async fn run(clip: PathBuf, output: Option<PathBuf>, config: AppConfig) -> anyhow::Result<()> {
    println!("Captioning clip: {}", clip.display());

    if config.overlay.scorer_command.is_empty() {
        return Err(anyhow::anyhow!(
            "No caption scorer configured. Pass --scorer <CMD> or set overlay.scorer_command."
        ));
    }

    let backend = FfmpegBackend::new(config.render.clone());
    if !backend.is_available() {
        return Err(anyhow::anyhow!(
            "ffmpeg/ffprobe not found. Run `pawreel check` for details."
        ));
    }
    let scorer = CommandCaptionScorer::from_command(
        &config.overlay.scorer_command,
        Duration::from_secs(config.overlay.scorer_timeout_secs),
    )?;

    let output_path = output.unwrap_or_else(|| {
        let stem = clip.file_stem().and_then(|s| s.to_str()).unwrap_or("clip");
        clip.with_file_name(format!("{stem}_captioned.mp4"))
    });

    println!("  Candidates: {}", config.overlay.captions.len());
    println!("  Scorer: {}", config.overlay.scorer_command.join(" "));

    let job = OverlayJob {
        input_path: clip,
        output_path,
        config: config.overlay,
    };
    let report = run_overlay_job(&job, &backend, &scorer)
        .await
        .map_err(|e| anyhow::anyhow!("Overlay failed: {e}"))?;

    println!(
        "  Frames scored: {} ({} skipped)",
        report.frames_scored, report.frames_skipped
    );
    println!("  Captions:");
    for caption in &report.plan.captions {
        println!("    \"{}\" at ({:.2}, {:.2})", caption.text, caption.x, caption.y);
    }
    println!("\nCaptioned clip written: {}", report.output.display());

    Ok(())
}
