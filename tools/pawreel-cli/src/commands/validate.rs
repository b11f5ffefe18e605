//! Check that a video and its keypoint file line up.

use std::path::PathBuf;

use pawreel_common::config::RenderConfig;
use pawreel_render_engine::ffmpeg::FfmpegBackend;
use pawreel_render_engine::pipeline::load_inputs;

pub async fn run(
    video: PathBuf,
    keypoints: PathBuf,
    tolerance: u64,
    render: RenderConfig,
) -> anyhow::Result<()> {
    println!("Validating inputs:");
    println!("  Video: {}", video.display());
    println!("  Keypoints: {}", keypoints.display());

    let backend = FfmpegBackend::new(render);
    match load_inputs(&video, &keypoints, tolerance, &backend).await {
        Ok((series, media)) => {
            println!(
                "  Resolution: {}x{} @ {} fps, {:.2}s",
                media.width, media.height, media.fps, media.duration_secs
            );
            println!("  Keypoint frames: {}", series.len());
            println!("  Parts: {}", series.part_names().join(", "));
            println!("\nInputs are consistent.");
            Ok(())
        }
        Err(e) => {
            println!("\nValidation failed:");
            println!("  - {e}");
            Err(anyhow::anyhow!("inputs are not consistent"))
        }
    }
}
