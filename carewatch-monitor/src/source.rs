//! Frame sources
//!
//! Video capture is an external collaborator; the engine consumes frames
//! through the `FrameSource` trait. The shipped `ReplaySource` walks a
//! directory of still frames with optional landmark sidecar files, which
//! exercises the full pipeline headless (live camera inference stays out
//! of this crate).

use crate::classifier::{BoundingBox, Landmarks};
use crate::error::{Error, Result};
use image::RgbImage;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One frame handed to the engine: pixels plus whatever the upstream
/// extractor produced for it
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    /// None when the extractor found no person this frame
    pub landmarks: Option<Landmarks>,
    pub bounding_box: Option<BoundingBox>,
}

/// Pull-based frame supply. `Ok(None)` means the stream ended.
pub trait FrameSource: Send {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Sidecar document written next to each replay frame
/// (`frame0001.landmarks.json`)
#[derive(Debug, Deserialize)]
struct Sidecar {
    landmarks: Landmarks,
    #[serde(default)]
    bounding_box: Option<BoundingBox>,
}

/// Replays a directory of JPEG/PNG frames in filename order.
pub struct ReplaySource {
    frames: Vec<PathBuf>,
    position: usize,
}

impl ReplaySource {
    /// Scan a directory for frame images, sorted by filename
    pub fn open(dir: &Path) -> Result<Self> {
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)
            .map_err(|e| Error::Source(format!("cannot read {}: {}", dir.display(), e)))?
        {
            let path = entry?.path();
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase());
            if matches!(ext.as_deref(), Some("jpg") | Some("jpeg") | Some("png")) {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(Error::Source(format!(
                "no frames found in {}",
                dir.display()
            )));
        }

        debug!(count = frames.len(), dir = %dir.display(), "replay source opened");
        Ok(Self {
            frames,
            position: 0,
        })
    }

    fn sidecar_path(frame_path: &Path) -> PathBuf {
        frame_path.with_extension("landmarks.json")
    }

    fn load_sidecar(frame_path: &Path) -> Option<Sidecar> {
        let path = Self::sidecar_path(frame_path);
        if !path.exists() {
            return None;
        }
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable landmark sidecar, skipping");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(sidecar) => Some(sidecar),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "malformed landmark sidecar, skipping");
                None
            }
        }
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.frames.get(self.position) else {
            return Ok(None);
        };
        self.position += 1;

        let image = image::open(path)
            .map_err(|e| Error::Source(format!("cannot decode {}: {}", path.display(), e)))?
            .to_rgb8();

        let (landmarks, bounding_box) = match Self::load_sidecar(path) {
            Some(sidecar) => (Some(sidecar.landmarks), sidecar.bounding_box),
            None => (None, None),
        };

        Ok(Some(Frame {
            image,
            landmarks,
            bounding_box,
        }))
    }
}
