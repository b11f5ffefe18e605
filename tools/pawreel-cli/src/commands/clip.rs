//! Cut a highlight reel out of a video.

use std::path::PathBuf;
use std::sync::Arc;

use pawreel_common::config::AppConfig;
use pawreel_render_engine::backend::MediaBackend;
use pawreel_render_engine::ffmpeg::FfmpegBackend;
use pawreel_render_engine::pipeline::{run_highlight_job, HighlightJob};

pub async fn run(
    video: PathBuf,
    keypoints: PathBuf,
    output: Option<PathBuf>,
    config: AppConfig,
) -> anyhow::Result<()> {
    println!("Cutting highlights from: {}", video.display());

    let output_path = output.unwrap_or_else(|| default_output(&video));
    let backend = FfmpegBackend::new(config.render.clone());
    if !backend.is_available() {
        return Err(anyhow::anyhow!(
            "ffmpeg/ffprobe not found. Run `pawreel check` for details."
        ));
    }

    println!("  Keypoints: {}", keypoints.display());
    println!("  Output: {}", output_path.display());

    let job = HighlightJob {
        video_path: video,
        keypoints_path: keypoints,
        output_path,
        config,
    };

    let report = run_highlight_job(&job, Arc::new(backend))
        .await
        .map_err(|e| anyhow::anyhow!("Highlight job failed: {e}"))?;

    println!(
        "  Source: {:.2}s @ {} fps",
        report.media.duration_secs, report.media.fps
    );
    if report.used_fallback {
        println!("  No highlights found; used the full video.");
    } else {
        println!("  Windows: {}", report.analysis.windows.len());
    }
    for skipped in &report.assembly.skipped {
        println!(
            "  Skipped [{:.3}s, {:.3}s): {}",
            skipped.start_secs, skipped.end_secs, skipped.reason
        );
    }

    println!(
        "\nReel written: {} ({:.2}s)",
        report.assembly.output.path.display(),
        report.assembly.output.duration_secs
    );
    println!("Manifest: {}", report.manifest_path.display());

    Ok(())
}

fn default_output(video: &std::path::Path) -> PathBuf {
    let stem = video
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("video");
    video.with_file_name(format!("{stem}_highlights.mp4"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_sits_next_to_video() {
        assert_eq!(
            default_output(std::path::Path::new("/pets/rex.mov")),
            PathBuf::from("/pets/rex_highlights.mp4")
        );
    }
}
