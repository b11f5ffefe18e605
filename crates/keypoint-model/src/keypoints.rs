//! Keypoint series produced by an upstream pose-estimation model.
//!
//! Keypoints are stored in JSONL format, one row group per frame:
//!
//! ```text
//! {"frame": 0, "parts": {"nose": {"x": 10.0, "y": 4.0, "likelihood": 0.98}}}
//! {"frame": 1, "parts": {"nose": {"x": null, "y": null}}}
//! ```
//!
//! Frame indices are dense and start at zero. A part that is absent from a
//! row, or whose coordinates are null or non-finite, is a missing detection
//! for that frame rather than an input error.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use pawreel_common::error::{PawreelError, PawreelResult};
use serde::{Deserialize, Serialize};

/// A single detected body-part position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    /// Depth, for 3D pose models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    /// Detector confidence in [0, 1]. Absent means fully trusted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Keypoint {
    /// Create a 2D keypoint without a confidence score.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            confidence: None,
        }
    }

    /// Attach a confidence score.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Attach a depth coordinate.
    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Whether this keypoint is finite and at or above `confidence_floor`.
    pub fn is_usable(&self, confidence_floor: f64) -> bool {
        let finite = self.x.is_finite()
            && self.y.is_finite()
            && self.z.map(f64::is_finite).unwrap_or(true);
        finite && self.confidence.map(|c| c >= confidence_floor).unwrap_or(true)
    }

    /// Euclidean distance to another keypoint. Depth is only used when
    /// both points carry it.
    pub fn distance(&self, other: &Keypoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = match (self.z, other.z) {
            (Some(a), Some(b)) => a - b,
            _ => 0.0,
        };
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// One row group of the JSONL keypoint file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeypointRow {
    pub frame: u64,
    #[serde(default)]
    pub parts: BTreeMap<String, RawKeypoint>,
}

/// A keypoint as written by the pose tool, with nullable coordinates.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RawKeypoint {
    pub x: Option<f64>,
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
    #[serde(default, alias = "confidence")]
    pub likelihood: Option<f64>,
}

impl RawKeypoint {
    fn into_keypoint(self) -> Option<Keypoint> {
        let (x, y) = (self.x?, self.y?);
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        if self.z.map(|z| !z.is_finite()).unwrap_or(false) {
            return None;
        }
        Some(Keypoint {
            x,
            y,
            z: self.z,
            confidence: self.likelihood.filter(|c| c.is_finite()),
        })
    }
}

/// Dense, frame-indexed keypoint table.
///
/// Part slots are stable for the lifetime of the series: the sorted part
/// names of frame 0 first, followed by parts first seen in later frames.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointSeries {
    parts: Vec<String>,
    part_index: HashMap<String, usize>,
    frames: Vec<Vec<Option<Keypoint>>>,
}

impl KeypointSeries {
    /// Build a series from part names and per-frame slots.
    ///
    /// Every frame must hold exactly one slot per part.
    pub fn from_frames(
        parts: Vec<String>,
        frames: Vec<Vec<Option<Keypoint>>>,
    ) -> PawreelResult<Self> {
        let mut part_index = HashMap::with_capacity(parts.len());
        for (slot, name) in parts.iter().enumerate() {
            if part_index.insert(name.clone(), slot).is_some() {
                return Err(PawreelError::keypoints(format!(
                    "duplicate body part '{name}'"
                )));
            }
        }

        if let Some((frame, row)) = frames
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != parts.len())
        {
            return Err(PawreelError::keypoints(format!(
                "frame {frame} has {} slots, expected {}",
                row.len(),
                parts.len()
            )));
        }

        Ok(Self {
            parts,
            part_index,
            frames,
        })
    }

    /// Build a series from decoded JSONL rows.
    pub fn from_rows(rows: Vec<KeypointRow>) -> PawreelResult<Self> {
        let mut parts: Vec<String> = Vec::new();
        let mut part_index: HashMap<String, usize> = HashMap::new();

        for (expected, row) in rows.iter().enumerate() {
            if row.frame != expected as u64 {
                return Err(PawreelError::keypoints(format!(
                    "frame indices must be dense and start at 0: expected {expected}, found {}",
                    row.frame
                )));
            }
            for name in row.parts.keys() {
                if !part_index.contains_key(name) {
                    part_index.insert(name.clone(), parts.len());
                    parts.push(name.clone());
                }
            }
        }

        let frames = rows
            .into_iter()
            .map(|row| {
                let mut slots = vec![None; parts.len()];
                for (name, raw) in row.parts {
                    slots[part_index[&name]] = raw.into_keypoint();
                }
                slots
            })
            .collect();

        Ok(Self {
            parts,
            part_index,
            frames,
        })
    }

    /// Load a series from a JSONL file.
    pub fn load(path: impl AsRef<Path>) -> PawreelResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PawreelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        parse_keypoints(&content)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Part names in slot order.
    pub fn part_names(&self) -> &[String] {
        &self.parts
    }

    pub fn has_part(&self, part: &str) -> bool {
        self.part_index.contains_key(part)
    }

    /// Slot index for a part name.
    pub fn part_slot(&self, part: &str) -> PawreelResult<usize> {
        self.part_index
            .get(part)
            .copied()
            .ok_or_else(|| PawreelError::unknown_part(part))
    }

    /// Keypoint of `part` at `frame`, or `None` if it was not detected.
    pub fn coordinates(&self, frame: usize, part: &str) -> PawreelResult<Option<Keypoint>> {
        let slot = self.part_slot(part)?;
        self.slot(frame, slot)
    }

    /// Keypoint at a known slot.
    pub fn slot(&self, frame: usize, slot: usize) -> PawreelResult<Option<Keypoint>> {
        let row = self
            .frames
            .get(frame)
            .ok_or_else(|| PawreelError::frame_out_of_range(frame, self.frames.len()))?;
        row.get(slot).copied().ok_or_else(|| PawreelError::OutOfRange {
            message: format!("part slot {slot} is outside [0, {})", self.parts.len()),
        })
    }
}

/// Parse a keypoint series from JSONL content.
pub fn parse_keypoints(jsonl: &str) -> PawreelResult<KeypointSeries> {
    let rows = jsonl
        .lines()
        .map(str::trim)
        .enumerate()
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_no, line)| {
            serde_json::from_str::<KeypointRow>(line).map_err(|e| {
                PawreelError::keypoints(format!("line {}: {e}", line_no + 1))
            })
        })
        .collect::<PawreelResult<Vec<_>>>()?;

    KeypointSeries::from_rows(rows)
}
