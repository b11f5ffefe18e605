//! Caption overlay: pick the captions that best describe a clip and burn
//! them into it.
//!
//! Scoring is delegated to a [`CaptionScorer`], normally an external
//! image/text similarity model run as a sidecar process. Compositing is an
//! ffmpeg `drawtext` filter graph.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use pawreel_common::config::OverlayConfig;
use pawreel_common::error::{PawreelError, PawreelResult};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::backend::MediaBackend;
use crate::ffmpeg::FfmpegBackend;

/// Scores caption candidates against sampled frames.
#[async_trait]
pub trait CaptionScorer: Send + Sync {
    /// One similarity score per caption, in caption order.
    async fn score(&self, frame: &Path, captions: &[String]) -> PawreelResult<Vec<f64>>;

    /// Score several frames at once, returning one row per frame that could
    /// be scored. Frames that fail are skipped with a warning.
    ///
    /// The default calls [`CaptionScorer::score`] once per frame.
    async fn score_batch(
        &self,
        frames: &[PathBuf],
        captions: &[String],
    ) -> PawreelResult<Vec<Vec<f64>>> {
        let mut rows = Vec::with_capacity(frames.len());
        for frame in frames {
            match self.score(frame, captions).await {
                Ok(row) => rows.push(row),
                Err(e) => {
                    tracing::warn!(frame = %frame.display(), error = %e, "Skipping frame that failed to score");
                }
            }
        }
        Ok(rows)
    }

    fn name(&self) -> &str;
}

/// Scorer that runs an external program.
///
/// The program receives `{"frames": [...], "captions": [...]}` on stdin and
/// must print `{"scores": [[...], ...]}` on stdout, one row per frame. A
/// row may be `null` for a frame the program could not read. A whole batch
/// is sent in one run, and the timeout covers that run.
#[derive(Debug, Clone)]
pub struct CommandCaptionScorer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

#[derive(Serialize)]
struct ScoreRequest<'a> {
    frames: Vec<String>,
    captions: &'a [String],
}

#[derive(Deserialize)]
struct ScoreResponse {
    scores: Vec<Option<Vec<f64>>>,
}

impl CommandCaptionScorer {
    /// Build from a command line such as `["python3", "score.py"]`.
    pub fn from_command(command: &[String], timeout: Duration) -> PawreelResult<Self> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| PawreelError::config("caption scorer command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            timeout,
        })
    }

    /// Run the program once over `frames`. The response must hold exactly
    /// one row per frame.
    async fn request_scores(
        &self,
        frames: &[PathBuf],
        captions: &[String],
    ) -> PawreelResult<Vec<Option<Vec<f64>>>> {
        let request = serde_json::to_vec(&ScoreRequest {
            frames: frames.iter().map(|f| f.display().to_string()).collect(),
            captions,
        })?;
        let stdout = self.run(&request).await?;

        let response: ScoreResponse = serde_json::from_slice(&stdout)
            .map_err(|e| PawreelError::overlay(format!("malformed scorer output: {e}")))?;
        if response.scores.len() != frames.len() {
            return Err(PawreelError::overlay(format!(
                "scorer returned {} rows for {} frames",
                response.scores.len(),
                frames.len()
            )));
        }
        Ok(response.scores)
    }

    async fn run(&self, request: &[u8]) -> PawreelResult<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PawreelError::overlay(format!("Failed to start {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request).await?;
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                PawreelError::overlay(format!(
                    "{} timed out after {}s",
                    self.program,
                    self.timeout.as_secs_f64()
                ))
            })??;

        if !output.status.success() {
            return Err(PawreelError::overlay(format!(
                "{} failed (status {}): {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

fn check_width(row: &[f64], captions: &[String]) -> PawreelResult<()> {
    if row.len() != captions.len() {
        return Err(PawreelError::overlay(format!(
            "scorer returned {} scores for {} captions",
            row.len(),
            captions.len()
        )));
    }
    Ok(())
}

#[async_trait]
impl CaptionScorer for CommandCaptionScorer {
    async fn score(&self, frame: &Path, captions: &[String]) -> PawreelResult<Vec<f64>> {
        let row = self
            .request_scores(&[frame.to_path_buf()], captions)
            .await?
            .into_iter()
            .next()
            .flatten()
            .ok_or_else(|| PawreelError::overlay("scorer returned no scores"))?;
        check_width(&row, captions)?;
        Ok(row)
    }

    async fn score_batch(
        &self,
        frames: &[PathBuf],
        captions: &[String],
    ) -> PawreelResult<Vec<Vec<f64>>> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        let rows = self.request_scores(frames, captions).await?;

        let mut scored = Vec::with_capacity(rows.len());
        for (frame, row) in frames.iter().zip(rows) {
            let checked = row
                .ok_or_else(|| PawreelError::overlay("scorer could not read frame"))
                .and_then(|row| check_width(&row, captions).map(|_| row));
            match checked {
                Ok(row) => scored.push(row),
                Err(e) => {
                    tracing::warn!(frame = %frame.display(), error = %e, "Skipping frame that failed to score");
                }
            }
        }
        Ok(scored)
    }

    fn name(&self) -> &str {
        &self.program
    }
}

/// Score every frame in one batch. Frames that fail are skipped; a failure
/// of the whole batch is an error.
pub async fn score_frames(
    scorer: &dyn CaptionScorer,
    frames: &[PathBuf],
    captions: &[String],
) -> PawreelResult<Vec<Vec<f64>>> {
    scorer.score_batch(frames, captions).await
}

/// Pick the `top_k` captions with the highest cumulative score.
///
/// Ties keep candidate order.
pub fn select_captions(
    scores: &[Vec<f64>],
    captions: &[String],
    top_k: usize,
) -> PawreelResult<Vec<String>> {
    if scores.is_empty() {
        return Err(PawreelError::overlay("no frame could be scored"));
    }
    if top_k > captions.len() {
        return Err(PawreelError::overlay(format!(
            "asked for {top_k} captions but only {} candidates exist",
            captions.len()
        )));
    }

    let mut cumulative = vec![0.0; captions.len()];
    for row in scores {
        if row.len() != captions.len() {
            return Err(PawreelError::overlay(format!(
                "score row has {} entries for {} captions",
                row.len(),
                captions.len()
            )));
        }
        for (total, score) in cumulative.iter_mut().zip(row) {
            *total += score;
        }
    }

    let mut ranked: Vec<usize> = (0..captions.len()).collect();
    // Stable sort keeps candidate order among equal totals.
    ranked.sort_by(|a, b| cumulative[*b].total_cmp(&cumulative[*a]));

    Ok(ranked
        .into_iter()
        .take(top_k)
        .map(|i| captions[i].clone())
        .collect())
}

/// Visual style of burned-in captions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayStyle {
    pub font_path: Option<PathBuf>,
    /// Font size as a fraction of frame height.
    pub font_scale: f64,
    pub text_color: [u8; 4],
    pub bg_tint_color: [u8; 3],
    /// Opacity of the box behind the text; 0 draws no box.
    pub bg_transparency: f64,
    pub draw_shadow: bool,
    pub shadow_color: [u8; 4],
    pub shadow_offset: (i32, i32),
    pub animate: bool,
    pub animation_interval: u64,
    pub animation_offset: f64,
}

impl OverlayStyle {
    pub fn from_config(config: &OverlayConfig) -> Self {
        Self {
            font_path: config.font_path.clone(),
            font_scale: config.font_scale,
            text_color: config.text_color,
            bg_tint_color: config.bg_tint_color,
            bg_transparency: config.bg_transparency,
            draw_shadow: config.draw_shadow,
            shadow_color: config.shadow_color,
            shadow_offset: config.shadow_offset,
            animate: config.animate,
            animation_interval: config.animation_interval.max(1),
            animation_offset: config.animation_offset,
        }
    }

    /// Font size in pixels for a frame of the given height.
    pub fn font_size(&self, frame_height: u32) -> u32 {
        ((frame_height as f64 * self.font_scale) as u32).max(1)
    }

    /// Horizontal offset, as a fraction of width, at output frame `index`.
    pub fn offset_at(&self, index: u64) -> f64 {
        if !self.animate {
            return 0.0;
        }
        let factor = ((index / self.animation_interval) % 2) as f64 * 2.0 - 1.0;
        self.animation_offset * factor
    }
}

/// A caption anchored at a relative position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacedCaption {
    pub text: String,
    /// Center of the text as fractions of frame width and height.
    pub x: f64,
    pub y: f64,
}

/// The captions chosen for a clip and how to draw them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayPlan {
    pub captions: Vec<PlacedCaption>,
    pub style: OverlayStyle,
}

impl OverlayPlan {
    /// Bind captions to base positions, in order.
    pub fn new(
        captions: Vec<String>,
        positions: &[(f64, f64)],
        style: OverlayStyle,
    ) -> PawreelResult<Self> {
        if captions.len() > positions.len() {
            return Err(PawreelError::overlay(format!(
                "{} captions but only {} positions",
                captions.len(),
                positions.len()
            )));
        }
        let captions = captions
            .into_iter()
            .zip(positions)
            .map(|(text, &(x, y))| PlacedCaption { text, x, y })
            .collect();
        Ok(Self { captions, style })
    }

    /// Caption centers at output frame `index`, animation applied.
    pub fn positions_at(&self, index: u64) -> Vec<(f64, f64)> {
        let offset = self.style.offset_at(index);
        self.captions.iter().map(|c| (c.x + offset, c.y)).collect()
    }
}

/// Build the ffmpeg `drawtext` filter chain for `plan`.
pub fn build_drawtext_filter(plan: &OverlayPlan, frame_height: u32) -> String {
    let style = &plan.style;
    let font_size = style.font_size(frame_height);
    // Captions alternate between these two placements every interval.
    let rest = plan.positions_at(0);
    let swung = plan.positions_at(style.animation_interval);

    plan.captions
        .iter()
        .zip(rest.iter().zip(&swung))
        .map(|(caption, (&(x0, y), &(x1, _)))| {
            let mut opts = vec![format!("text={}", escape_option_value(&caption.text))];
            opts.push("expansion=none".to_string());
            if let Some(font) = &style.font_path {
                opts.push(format!(
                    "fontfile={}",
                    escape_option_value(&font.display().to_string())
                ));
            }
            opts.push(format!("fontsize={font_size}"));
            opts.push(format!("fontcolor={}", rgba_color(style.text_color)));
            opts.push(format!(
                "x={}",
                escape_graph(&x_expression(x0, x1, style.animation_interval))
            ));
            opts.push(format!("y=h*{y:.4}-text_h/2"));

            if style.draw_shadow {
                opts.push(format!("shadowcolor={}", rgba_color(style.shadow_color)));
                opts.push(format!("shadowx={}", style.shadow_offset.0));
                opts.push(format!("shadowy={}", style.shadow_offset.1));
            }
            if style.bg_transparency > 0.0 {
                let [r, g, b] = style.bg_tint_color;
                opts.push("box=1".to_string());
                opts.push(format!(
                    "boxcolor=0x{r:02X}{g:02X}{b:02X}@{:.3}",
                    style.bg_transparency
                ));
                opts.push("boxborderw=0".to_string());
            }

            format!("drawtext={}", opts.join(":"))
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// Horizontal center that sits at `x0` during even intervals and at `x1`
/// during odd ones, `n` being the output frame number.
fn x_expression(x0: f64, x1: f64, interval: u64) -> String {
    let delta = x1 - x0;
    if delta == 0.0 {
        format!("w*{x0:.4}-text_w/2")
    } else {
        format!("w*({x0:.4}+{delta:.4}*mod(floor(n/{interval}),2))-text_w/2")
    }
}

fn rgba_color([r, g, b, a]: [u8; 4]) -> String {
    format!("0x{r:02X}{g:02X}{b:02X}@{:.3}", a as f64 / 255.0)
}

fn escape_with(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape for the filtergraph parser.
fn escape_graph(value: &str) -> String {
    escape_with(value, &['\\', '\'', '[', ']', ',', ';'])
}

/// Escape a filter option value, then the filtergraph around it.
fn escape_option_value(value: &str) -> String {
    escape_graph(&escape_with(value, &['\\', '\'', ':']))
}

/// Inputs of one caption overlay run.
#[derive(Debug, Clone)]
pub struct OverlayJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub config: OverlayConfig,
}

/// Outcome of a caption overlay run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayReport {
    pub plan: OverlayPlan,
    pub frames_scored: usize,
    pub frames_skipped: usize,
    pub output: PathBuf,
}

/// Score sampled frames of a clip, choose captions, and render them in.
pub async fn run_overlay_job(
    job: &OverlayJob,
    backend: &FfmpegBackend,
    scorer: &dyn CaptionScorer,
) -> PawreelResult<OverlayReport> {
    job.config.validate()?;
    let media = backend.probe(&job.input_path).await?;

    let mut frames_name = job.output_path.as_os_str().to_os_string();
    frames_name.push(".frames");
    let frames_dir = PathBuf::from(frames_name);

    let result: PawreelResult<OverlayReport> = async {
        let frames = backend
            .extract_frames(&job.input_path, &frames_dir, job.config.frame_interval)
            .await?;
        let scores = score_frames(scorer, &frames, &job.config.captions).await?;
        tracing::info!(
            frames = frames.len(),
            scored = scores.len(),
            scorer = scorer.name(),
            "Scored caption candidates"
        );

        let chosen = select_captions(&scores, &job.config.captions, job.config.top_k)?;
        let plan = OverlayPlan::new(
            chosen,
            &job.config.positions,
            OverlayStyle::from_config(&job.config),
        )?;
        let filter = build_drawtext_filter(&plan, media.height);
        backend
            .apply_video_filter(&job.input_path, &filter, &job.output_path)
            .await?;

        Ok(OverlayReport {
            plan,
            frames_scored: scores.len(),
            frames_skipped: frames.len() - scores.len(),
            output: job.output_path.clone(),
        })
    }
    .await;

    if let Err(e) = tokio::fs::remove_dir_all(&frames_dir).await {
        tracing::debug!(path = %frames_dir.display(), error = %e, "Could not remove sampled frames");
    }
    result
}
