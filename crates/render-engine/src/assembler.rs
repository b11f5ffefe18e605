//! Clip assembly: cut every highlight window out of the source and join
//! them into one reel.
//!
//! Extractions run on a bounded set of tokio tasks. Each one is wrapped in
//! a timeout; the ffmpeg child is killed when its future is dropped.
//! Results are put back into chronological order before concatenation, so
//! the reel order never depends on which extraction finished first.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use pawreel_common::config::{ExtractionPolicy, RenderConfig};
use pawreel_common::error::{PawreelError, PawreelResult};
use pawreel_keypoint_model::clip::{ClipRequest, ClipSequence};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinSet};

use crate::backend::{absolute_path, ClipHandle, MediaBackend};

/// Knobs for one assembly run.
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    pub extraction_timeout: Duration,
    pub policy: ExtractionPolicy,
    /// Maximum concurrent extractions (at least 1).
    pub max_parallel: usize,
    /// Directory for intermediate clips. Defaults to a hidden directory
    /// next to the output. Only a directory the assembler created itself
    /// is removed afterwards.
    pub work_dir: Option<PathBuf>,
    pub keep_intermediate: bool,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl AssemblyOptions {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            extraction_timeout: Duration::from_secs(config.extraction_timeout_secs),
            policy: config.extraction_policy,
            max_parallel: config.max_parallel_extractions.max(1),
            work_dir: None,
            keep_intermediate: config.keep_intermediate,
        }
    }
}

/// A window that was dropped under the skip policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedClip {
    pub index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
    pub reason: String,
}

/// Outcome of an assembly run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyReport {
    /// The written reel.
    pub output: ClipHandle,
    /// Number of clips that made it into the reel.
    pub extracted: usize,
    pub skipped: Vec<SkippedClip>,
}

/// Cuts and joins the windows of a [`ClipSequence`].
pub struct ClipAssembler {
    backend: Arc<dyn MediaBackend>,
    options: AssemblyOptions,
}

struct Extracted {
    request: ClipRequest,
    result: PawreelResult<ClipHandle>,
}

impl ClipAssembler {
    pub fn new(backend: Arc<dyn MediaBackend>, options: AssemblyOptions) -> Self {
        Self { backend, options }
    }

    pub fn options(&self) -> &AssemblyOptions {
        &self.options
    }

    /// Extract every clip of `sequence` from `source` and write the joined
    /// reel to `output`.
    ///
    /// An empty sequence fails with `EmptyHighlight` before anything is
    /// written.
    pub async fn assemble(
        &self,
        sequence: &ClipSequence,
        source: &Path,
        output: &Path,
    ) -> PawreelResult<AssemblyReport> {
        if sequence.is_empty() {
            return Err(PawreelError::empty_clip_sequence());
        }

        let work_dir = self.work_dir_for(output)?;
        let created = !tokio::fs::try_exists(&work_dir).await?;
        tokio::fs::create_dir_all(&work_dir).await?;

        tracing::info!(
            clips = sequence.len(),
            backend = self.backend.name(),
            parallel = self.options.max_parallel,
            reel_secs = sequence.total_duration_secs(),
            "Assembling highlight reel"
        );

        let result = self.assemble_in(sequence, source, output, &work_dir).await;

        if created && !self.options.keep_intermediate {
            if let Err(e) = tokio::fs::remove_dir_all(&work_dir).await {
                tracing::warn!(
                    path = %work_dir.display(),
                    error = %e,
                    "Failed to remove intermediate clips"
                );
            }
        }

        result
    }

    async fn assemble_in(
        &self,
        sequence: &ClipSequence,
        source: &Path,
        output: &Path,
        work_dir: &Path,
    ) -> PawreelResult<AssemblyReport> {
        let extension = output
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4")
            .to_string();

        let mut results = self
            .extract_all(sequence, source, work_dir, &extension)
            .await?;
        results.sort_by_key(|r| r.request.index);

        let mut clips = Vec::with_capacity(results.len());
        let mut skipped = Vec::new();
        for extracted in results {
            match extracted.result {
                Ok(handle) => clips.push(handle),
                Err(e) => match self.options.policy {
                    ExtractionPolicy::Abort => return Err(e),
                    ExtractionPolicy::SkipWithWarning => {
                        tracing::warn!(
                            index = extracted.request.index,
                            start = extracted.request.start_secs,
                            end = extracted.request.end_secs,
                            error = %e,
                            "Skipping clip that failed to extract"
                        );
                        skipped.push(SkippedClip {
                            index: extracted.request.index,
                            start_secs: extracted.request.start_secs,
                            end_secs: extracted.request.end_secs,
                            reason: e.to_string(),
                        });
                    }
                },
            }
        }

        if clips.is_empty() {
            let (start, end) = sequence
                .clips()
                .first()
                .map(|c| (c.start_secs, c.end_secs))
                .unwrap_or_default();
            return Err(PawreelError::extraction(
                start,
                end,
                format!("all {} clips failed to extract", sequence.len()),
            ));
        }

        let joined = if clips.len() == 1 {
            clips[0].clone()
        } else {
            let dest = work_dir.join(format!("reel.{extension}"));
            self.backend.concatenate(&clips, &dest).await?
        };
        let written = self.backend.write(&joined, output).await?;

        tracing::info!(
            output = %written.path.display(),
            clips = clips.len(),
            skipped = skipped.len(),
            duration_secs = written.duration_secs,
            "Highlight reel written"
        );

        Ok(AssemblyReport {
            output: written,
            extracted: clips.len(),
            skipped,
        })
    }

    /// Run all extractions. Under the abort policy a failure cancels every
    /// later window, while earlier ones still finish so the earliest
    /// failure is the one reported.
    async fn extract_all(
        &self,
        sequence: &ClipSequence,
        source: &Path,
        work_dir: &Path,
        extension: &str,
    ) -> PawreelResult<Vec<Extracted>> {
        let semaphore = Arc::new(Semaphore::new(self.options.max_parallel.max(1)));
        let mut tasks = JoinSet::new();
        let mut handles: Vec<AbortHandle> = Vec::with_capacity(sequence.len());

        for request in sequence.iter().copied() {
            let backend = Arc::clone(&self.backend);
            let semaphore = Arc::clone(&semaphore);
            let source = source.to_path_buf();
            let dest = work_dir.join(format!("clip_{:04}.{extension}", request.index));
            let timeout = self.options.extraction_timeout;

            handles.push(tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => extract_one(backend, &source, &request, &dest, timeout).await,
                    Err(e) => Err(PawreelError::extraction(
                        request.start_secs,
                        request.end_secs,
                        e.to_string(),
                    )),
                };
                Extracted { request, result }
            }));
        }

        let mut results = Vec::with_capacity(sequence.len());
        let mut first_failure: Option<usize> = None;
        while let Some(joined) = tasks.join_next().await {
            let extracted = match joined {
                Ok(extracted) => extracted,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => return Err(PawreelError::render(format!("extraction task failed: {e}"))),
            };

            if extracted.result.is_err() && self.options.policy == ExtractionPolicy::Abort {
                let index = extracted.request.index;
                if first_failure.map_or(true, |f| index < f) {
                    first_failure = Some(index);
                    for handle in &handles[index + 1..] {
                        handle.abort();
                    }
                }
            }
            results.push(extracted);
        }

        Ok(results)
    }

    /// Absolute directory for intermediate clips.
    fn work_dir_for(&self, output: &Path) -> PawreelResult<PathBuf> {
        if let Some(dir) = &self.options.work_dir {
            return absolute_path(dir);
        }
        let stem = output
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("reel");
        let parent = output.parent().unwrap_or_else(|| Path::new(""));
        absolute_path(&parent.join(format!(".{stem}.pawreel-work")))
    }
}

async fn extract_one(
    backend: Arc<dyn MediaBackend>,
    source: &Path,
    request: &ClipRequest,
    dest: &Path,
    timeout: Duration,
) -> PawreelResult<ClipHandle> {
    let window = request.window();
    tracing::debug!(
        index = request.index,
        start = window.start_secs,
        end = window.end_secs,
        "Extracting clip"
    );

    match tokio::time::timeout(timeout, backend.extract(source, &window, dest)).await {
        Ok(result) => result,
        Err(_) => Err(PawreelError::extraction(
            window.start_secs,
            window.end_secs,
            format!("timed out after {}s", timeout.as_secs_f64()),
        )),
    }
}
