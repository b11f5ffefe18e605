//! Check system capabilities.

use pawreel_common::config::RenderConfig;
use pawreel_render_engine::backend::MediaBackend;
use pawreel_render_engine::ffmpeg::FfmpegBackend;

pub fn run(render: &RenderConfig) -> anyhow::Result<()> {
    println!("PawReel System Check");
    println!("{}", "=".repeat(50));

    let tools = [
        ("ffmpeg", &render.ffmpeg_path),
        ("ffprobe", &render.ffprobe_path),
    ];
    let mut all_ok = true;
    for (name, path) in tools {
        let found = std::process::Command::new(path)
            .arg("-version")
            .output()
            .ok()
            .filter(|o| o.status.success())
            .and_then(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .lines()
                    .next()
                    .map(str::to_string)
            });
        match found {
            Some(version) => println!("[OK] {name}: {version}"),
            None => {
                all_ok = false;
                println!("[MISSING] {name} ({path})");
            }
        }
    }

    let backend = FfmpegBackend::new(render.clone());
    println!(
        "[{}] Backend: {}",
        if backend.is_available() { "OK" } else { "WARN" },
        backend.name()
    );
    println!(
        "     Codec: {} (crf {}, preset {}){}",
        render.video_codec,
        render.crf,
        render.preset,
        if render.stream_copy { ", stream copy" } else { "" }
    );

    println!();
    if all_ok {
        println!("All required tools are available. PawReel is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg or set render paths in the config.");
    }

    Ok(())
}
