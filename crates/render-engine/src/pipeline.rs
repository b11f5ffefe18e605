//! End-to-end highlight job: keypoints and video in, reel and manifest out.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pawreel_common::clock::check_alignment;
use pawreel_common::config::{AppConfig, EmptyHighlightFallback};
use pawreel_common::error::{PawreelError, PawreelResult};
use pawreel_keypoint_model::clip::ClipSequence;
use pawreel_keypoint_model::keypoints::KeypointSeries;
use pawreel_keypoint_model::window::TimeWindow;
use pawreel_processing_core::highlight::{HighlightAnalysis, HighlightAnalyzer};
use pawreel_processing_core::threshold::ActivityStats;
use serde::{Deserialize, Serialize};

use crate::assembler::{AssemblyOptions, AssemblyReport, ClipAssembler, SkippedClip};
use crate::backend::{MediaBackend, MediaInfo};

/// Inputs of one highlight run.
#[derive(Debug, Clone)]
pub struct HighlightJob {
    pub video_path: PathBuf,
    pub keypoints_path: PathBuf,
    pub output_path: PathBuf,
    pub config: AppConfig,
}

/// Outcome of a highlight run.
#[derive(Debug, Clone)]
pub struct HighlightReport {
    pub media: MediaInfo,
    pub analysis: HighlightAnalysis,
    pub assembly: AssemblyReport,
    /// Whether the whole video was used because nothing crossed the
    /// threshold.
    pub used_fallback: bool,
    pub manifest_path: PathBuf,
}

/// Summary written next to the reel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightManifest {
    pub generated_at: String,
    pub source: PathBuf,
    pub keypoints: PathBuf,
    pub output: PathBuf,
    pub fps: f64,
    pub source_duration_secs: f64,
    pub keypoint_frames: usize,
    pub threshold: f64,
    pub stats: Option<ActivityStats>,
    pub interesting_frames: usize,
    pub windows: Vec<TimeWindow>,
    pub used_fallback: bool,
    pub skipped: Vec<SkippedClip>,
    pub reel_duration_secs: f64,
}

/// Location of the manifest for a reel written to `output`.
pub fn manifest_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".highlights.json");
    PathBuf::from(name)
}

/// Load the keypoints, probe the video, and check that their frame counts
/// agree within `tolerance_frames`.
///
/// This is the only place frame alignment is checked; later stages assume
/// it holds.
pub async fn load_inputs(
    video_path: &Path,
    keypoints_path: &Path,
    tolerance_frames: u64,
    backend: &dyn MediaBackend,
) -> PawreelResult<(KeypointSeries, MediaInfo)> {
    let series = KeypointSeries::load(keypoints_path)?;
    let media = backend.probe(video_path).await?;

    let video_frames = media.frame_count_estimate()?;
    check_alignment(series.len() as u64, video_frames, tolerance_frames)?;

    tracing::debug!(
        keypoint_frames = series.len(),
        video_frames,
        fps = media.fps,
        duration_secs = media.duration_secs,
        "Inputs aligned"
    );

    Ok((series, media))
}

/// Run the full pipeline for `job` on `backend`.
pub async fn run_highlight_job(
    job: &HighlightJob,
    backend: Arc<dyn MediaBackend>,
) -> PawreelResult<HighlightReport> {
    job.config.validate()?;

    let (series, media) = load_inputs(
        &job.video_path,
        &job.keypoints_path,
        job.config.highlight.frame_tolerance,
        backend.as_ref(),
    )
    .await?;

    let clock = media.clock()?;
    let analysis = HighlightAnalyzer::new(job.config.highlight.clone())?.analyze(
        &series,
        &clock,
        media.duration_secs,
    )?;

    let (sequence, used_fallback) = match analysis.clip_sequence() {
        Ok(sequence) => (sequence, false),
        Err(e)
            if e.is_recoverable()
                && job.config.highlight.on_empty == EmptyHighlightFallback::FullVideo =>
        {
            tracing::warn!(error = %e, "No highlights found, using the full video");
            let full = TimeWindow::new(0.0, media.duration_secs)
                .ok_or_else(|| PawreelError::render("Video has zero duration"))?;
            (ClipSequence::from_windows(&[full]), true)
        }
        Err(e) => return Err(e),
    };

    let assembler = ClipAssembler::new(
        Arc::clone(&backend),
        AssemblyOptions::from_config(&job.config.render),
    );
    let assembly = assembler
        .assemble(&sequence, &job.video_path, &job.output_path)
        .await?;

    let manifest = HighlightManifest {
        generated_at: chrono::Utc::now().to_rfc3339(),
        source: job.video_path.clone(),
        keypoints: job.keypoints_path.clone(),
        output: assembly.output.path.clone(),
        fps: media.fps,
        source_duration_secs: media.duration_secs,
        keypoint_frames: series.len(),
        threshold: analysis.threshold,
        stats: analysis.stats,
        interesting_frames: analysis.interesting_frames.len(),
        windows: analysis.windows.clone(),
        used_fallback,
        skipped: assembly.skipped.clone(),
        reel_duration_secs: assembly.output.duration_secs,
    };
    let manifest_path = manifest_path_for(&job.output_path);
    tokio::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?).await?;

    tracing::info!(
        manifest = %manifest_path.display(),
        windows = analysis.windows.len(),
        used_fallback,
        "Highlight job complete"
    );

    Ok(HighlightReport {
        media,
        analysis,
        assembly,
        used_fallback,
        manifest_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::tests::MockBackend;

    /// 90 frames of a still nose that jumps once at `burst`.
    fn write_keypoints(dir: &Path, burst: Option<usize>) -> PathBuf {
        std::fs::create_dir_all(dir).unwrap();
        let mut x = 10.0;
        let lines: Vec<String> = (0..90)
            .map(|i| {
                if Some(i) == burst {
                    x += 50.0;
                }
                format!(
                    r#"{{"frame":{i},"parts":{{"nose":{{"x":{x},"y":20.0,"likelihood":0.9}}}}}}"#
                )
            })
            .collect();
        let path = dir.join("keypoints.jsonl");
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    fn media(frame_count: u64) -> MediaInfo {
        MediaInfo {
            duration_secs: 3.0,
            fps: 30.0,
            width: 1280,
            height: 720,
            frame_count: Some(frame_count),
        }
    }

    fn job(name: &str, burst: Option<usize>) -> HighlightJob {
        let dir = std::env::temp_dir().join(format!("pawreel_test_job_{name}"));
        HighlightJob {
            video_path: PathBuf::from("rex.mp4"),
            keypoints_path: write_keypoints(&dir, burst),
            output_path: dir.join("reel.mp4"),
            config: AppConfig::default(),
        }
    }

    #[tokio::test]
    async fn test_job_extracts_burst_and_writes_manifest() {
        let job = job("burst", Some(45));
        let backend = Arc::new(MockBackend {
            info: Some(media(90)),
            ..Default::default()
        });

        let report = run_highlight_job(&job, backend.clone()).await.unwrap();

        assert!(!report.used_fallback);
        assert_eq!(report.analysis.interesting_frames, vec![45, 46, 47, 48, 49]);
        assert_eq!(report.analysis.windows.len(), 1);
        let window = report.analysis.windows[0];
        assert!((window.start_secs - 1.3).abs() < 1e-9);
        assert!((window.end_secs - (49.0 / 30.0 + 0.2)).abs() < 1e-9);
        assert_eq!(backend.extracted.lock().unwrap().len(), 1);

        let manifest: HighlightManifest =
            serde_json::from_str(&std::fs::read_to_string(&report.manifest_path).unwrap())
                .unwrap();
        assert_eq!(manifest.windows, report.analysis.windows);
        assert_eq!(manifest.keypoint_frames, 90);
        assert!(chrono::DateTime::parse_from_rfc3339(&manifest.generated_at).is_ok());
    }

    #[tokio::test]
    async fn test_frame_mismatch_rejected_before_extraction() {
        let job = job("mismatch", Some(45));
        let backend = Arc::new(MockBackend {
            info: Some(media(120)),
            ..Default::default()
        });

        let err = run_highlight_job(&job, backend.clone()).await.unwrap_err();
        assert!(matches!(
            err,
            PawreelError::InputMismatch {
                keypoint_frames: 90,
                video_frames: 120,
                ..
            }
        ));
        assert!(backend.extracted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mismatch_within_tolerance_accepted() {
        let job = job("tolerance", Some(45));
        let backend = Arc::new(MockBackend {
            info: Some(media(91)),
            ..Default::default()
        });
        assert!(run_highlight_job(&job, backend).await.is_ok());
    }

    #[tokio::test]
    async fn test_still_video_fails_with_empty_highlight() {
        let job = job("still", None);
        let backend = Arc::new(MockBackend {
            info: Some(media(90)),
            ..Default::default()
        });

        let err = run_highlight_job(&job, backend.clone()).await.unwrap_err();
        assert!(matches!(err, PawreelError::EmptyHighlight { frame_count: 90, .. }));
        assert!(backend.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_still_video_falls_back_to_full_video() {
        let mut job = job("still_fallback", None);
        job.config.highlight.on_empty = EmptyHighlightFallback::FullVideo;
        let backend = Arc::new(MockBackend {
            info: Some(media(90)),
            ..Default::default()
        });

        let report = run_highlight_job(&job, backend.clone()).await.unwrap();
        assert!(report.used_fallback);
        assert!(report.analysis.windows.is_empty());
        assert_eq!(
            *backend.extracted.lock().unwrap(),
            vec![TimeWindow::new(0.0, 3.0).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_missing_keypoints_file() {
        let job = HighlightJob {
            video_path: PathBuf::from("rex.mp4"),
            keypoints_path: PathBuf::from("/nonexistent/keypoints.jsonl"),
            output_path: PathBuf::from("reel.mp4"),
            config: AppConfig::default(),
        };
        let backend = Arc::new(MockBackend {
            info: Some(media(90)),
            ..Default::default()
        });
        let err = run_highlight_job(&job, backend).await.unwrap_err();
        assert!(matches!(err, PawreelError::FileNotFound { .. }));
    }

    #[test]
    fn test_manifest_path_appends_suffix() {
        assert_eq!(
            manifest_path_for(Path::new("/out/reel.mp4")),
            PathBuf::from("/out/reel.mp4.highlights.json")
        );
    }
}
