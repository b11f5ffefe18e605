//! ffmpeg-backed media operations.
//!
//! Every operation shells out to `ffmpeg`/`ffprobe`. Children are spawned
//! with `kill_on_drop`, so a caller-side timeout that drops the future also
//! terminates the process.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use pawreel_common::config::RenderConfig;
use pawreel_common::error::{PawreelError, PawreelResult};
use pawreel_keypoint_model::window::TimeWindow;
use serde::Deserialize;
use tokio::process::Command;

use crate::backend::{absolute_path, ClipHandle, MediaBackend, MediaInfo};

/// Media backend driving the ffmpeg command-line tools.
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    config: RenderConfig,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl FfmpegBackend {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Arguments for cutting one window out of `source`.
    pub fn extract_args(&self, source: &Path, window: &TimeWindow, dest: &Path) -> Vec<String> {
        let mut args = base_args();
        args.push("-ss".to_string());
        args.push(format!("{:.6}", window.start_secs));
        args.push("-i".to_string());
        args.push(source.display().to_string());
        args.push("-t".to_string());
        args.push(format!("{:.6}", window.duration_secs()));

        if self.config.stream_copy {
            args.push("-c".to_string());
            args.push("copy".to_string());
        } else {
            args.extend(self.encode_args());
            args.push("-c:a".to_string());
            args.push("aac".to_string());
        }

        args.push("-avoid_negative_ts".to_string());
        args.push("make_zero".to_string());
        args.push(dest.display().to_string());
        args
    }

    /// Arguments for joining the clips listed in `list_path`.
    pub fn concat_args(&self, list_path: &Path, dest: &Path) -> Vec<String> {
        let mut args = base_args();
        args.extend(
            ["-f", "concat", "-safe", "0", "-i"]
                .iter()
                .map(|s| s.to_string()),
        );
        args.push(list_path.display().to_string());
        args.push("-c".to_string());
        args.push("copy".to_string());
        args.push(dest.display().to_string());
        args
    }

    /// Dump every `every_nth` frame of `source` as JPEG into `dir`.
    ///
    /// Returns the written frame paths in frame order.
    pub async fn extract_frames(
        &self,
        source: &Path,
        dir: &Path,
        every_nth: u64,
    ) -> PawreelResult<Vec<PathBuf>> {
        tokio::fs::create_dir_all(dir).await?;

        let mut args = base_args();
        args.push("-i".to_string());
        args.push(source.display().to_string());
        args.push("-vf".to_string());
        args.push(format!("select='not(mod(n\\,{}))'", every_nth.max(1)));
        args.push("-fps_mode".to_string());
        args.push("vfr".to_string());
        args.push(dir.join("frame_%06d.jpg").display().to_string());

        self.run_ffmpeg(&args)
            .await
            .map_err(|e| PawreelError::overlay(format!("frame extraction failed: {e}")))?;

        let mut frames = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_frame = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with("frame_") && n.ends_with(".jpg"))
                .unwrap_or(false);
            if is_frame {
                frames.push(path);
            }
        }
        frames.sort();
        Ok(frames)
    }

    /// Re-encode `source` through a video filter graph into `dest`.
    pub async fn apply_video_filter(
        &self,
        source: &Path,
        filter: &str,
        dest: &Path,
    ) -> PawreelResult<()> {
        let mut args = base_args();
        args.push("-i".to_string());
        args.push(source.display().to_string());
        args.push("-vf".to_string());
        args.push(filter.to_string());
        args.extend(self.encode_args());
        args.push("-c:a".to_string());
        args.push("copy".to_string());
        args.push(dest.display().to_string());

        self.run_ffmpeg(&args).await
    }

    fn encode_args(&self) -> Vec<String> {
        vec![
            "-c:v".to_string(),
            self.config.video_codec.clone(),
            "-preset".to_string(),
            self.config.preset.clone(),
            "-crf".to_string(),
            self.config.crf.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]
    }

    async fn run_ffmpeg(&self, args: &[String]) -> PawreelResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let output = Command::new(&self.config.ffmpeg_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PawreelError::render(format!("Failed to start ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(PawreelError::render(format!(
                "ffmpeg failed (status {}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    async fn probe(&self, source: &Path) -> PawreelResult<MediaInfo> {
        if !source.exists() {
            return Err(PawreelError::FileNotFound {
                path: source.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,avg_frame_rate,nb_frames,duration:format=duration",
                "-of",
                "json",
            ])
            .arg(source)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PawreelError::render(format!("Failed to start ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(PawreelError::render(format!(
                "ffprobe failed for {}: {}",
                source.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_output(&output.stdout)
    }

    async fn extract(
        &self,
        source: &Path,
        window: &TimeWindow,
        dest: &Path,
    ) -> PawreelResult<ClipHandle> {
        let args = self.extract_args(source, window, dest);
        self.run_ffmpeg(&args).await.map_err(|e| {
            PawreelError::extraction(window.start_secs, window.end_secs, e.to_string())
        })?;

        if !dest.exists() {
            return Err(PawreelError::extraction(
                window.start_secs,
                window.end_secs,
                "ffmpeg reported success but wrote no file",
            ));
        }

        Ok(ClipHandle {
            path: dest.to_path_buf(),
            duration_secs: window.duration_secs(),
        })
    }

    async fn concatenate(&self, clips: &[ClipHandle], dest: &Path) -> PawreelResult<ClipHandle> {
        if clips.is_empty() {
            return Err(PawreelError::render("Nothing to concatenate"));
        }

        let list_path = dest.with_extension("concat.txt");
        tokio::fs::write(&list_path, concat_list(clips)?).await?;

        let args = self.concat_args(&list_path, dest);
        let result = self.run_ffmpeg(&args).await;
        if let Err(e) = tokio::fs::remove_file(&list_path).await {
            tracing::debug!(path = %list_path.display(), error = %e, "Could not remove concat list");
        }
        result?;

        Ok(ClipHandle {
            path: dest.to_path_buf(),
            duration_secs: clips.iter().map(|c| c.duration_secs).sum(),
        })
    }

    fn is_available(&self) -> bool {
        command_exists(&self.config.ffmpeg_path) && command_exists(&self.config.ffprobe_path)
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

fn base_args() -> Vec<String> {
    ["-y", "-hide_banner", "-loglevel", "error", "-nostdin"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Body of an ffmpeg concat-demuxer list file.
///
/// The demuxer resolves relative entries against the list file's own
/// directory, so every entry is written as an absolute path.
pub fn concat_list(clips: &[ClipHandle]) -> PawreelResult<String> {
    let mut list = String::new();
    for clip in clips {
        let path = absolute_path(&clip.path)?
            .display()
            .to_string()
            .replace('\'', "'\\''");
        list.push_str(&format!("file '{path}'\n"));
    }
    Ok(list)
}

/// Parse an ffprobe rational such as `30000/1001` or `25`.
pub fn parse_frame_rate(value: &str) -> Option<f64> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

fn parse_probe_output(stdout: &[u8]) -> PawreelResult<MediaInfo> {
    let probe: ProbeOutput = serde_json::from_slice(stdout)?;
    let stream = probe
        .streams
        .first()
        .ok_or_else(|| PawreelError::render("No video stream found"))?;

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .or_else(|| stream.avg_frame_rate.as_deref().and_then(parse_frame_rate))
        .ok_or_else(|| PawreelError::render("Video stream has no usable frame rate"))?;

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .ok_or_else(|| PawreelError::render("Video has no duration"))?;

    Ok(MediaInfo {
        duration_secs,
        fps,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        frame_count: stream.nb_frames.as_deref().and_then(|n| n.parse().ok()),
    })
}

fn command_exists(binary: &str) -> bool {
    std::process::Command::new(binary)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
