/// Capture session state
///
/// Everything the operator has told us about the current hole plus the
/// in-flight image pair. The workflow engine is the only mutator; the UI
/// reads snapshots.
use crate::camera::CameraId;
use crate::depth::DepthInterval;
use crate::error::{CoreError, Result};

/// Project metadata entered at setup. Both fields are non-empty after
/// trimming; the constructor is the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    project_name: String,
    borehole_name: String,
}

impl ProjectContext {
    pub fn new(project_name: &str, borehole_name: &str) -> Result<Self> {
        let project_name = project_name.trim();
        let borehole_name = borehole_name.trim();
        if project_name.is_empty() {
            return Err(CoreError::validation("project name is required"));
        }
        if borehole_name.is_empty() {
            return Err(CoreError::validation("borehole name is required"));
        }
        Ok(Self {
            project_name: project_name.to_string(),
            borehole_name: borehole_name.to_string(),
        })
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn borehole_name(&self) -> &str {
        &self.borehole_name
    }
}

/// Per-camera review verdict. `Pending` is a first-class state: a freshly
/// captured pair has two pending images, and nothing is written until both
/// reach `Accepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Pending,
    Accepted,
    Rejected,
}

/// The two images captured for one interval, awaiting review.
#[derive(Debug)]
pub struct CapturePair {
    images: [Vec<u8>; 2],
    status: [ReviewStatus; 2],
}

impl CapturePair {
    pub fn new(camera_1_image: Vec<u8>, camera_2_image: Vec<u8>) -> Self {
        Self {
            images: [camera_1_image, camera_2_image],
            status: [ReviewStatus::Pending, ReviewStatus::Pending],
        }
    }

    pub fn image(&self, camera: CameraId) -> &[u8] {
        &self.images[camera.index()]
    }

    pub fn status(&self, camera: CameraId) -> ReviewStatus {
        self.status[camera.index()]
    }

    pub fn set_status(&mut self, camera: CameraId, status: ReviewStatus) {
        self.status[camera.index()] = status;
    }

    /// True once both images passed review; only then may either be written.
    pub fn fully_accepted(&self) -> bool {
        self.status
            .iter()
            .all(|s| *s == ReviewStatus::Accepted)
    }
}

/// Session owned by the workflow engine: project context (absent until
/// setup is confirmed), the current interval, and any pending pair.
#[derive(Debug)]
pub struct CaptureSession {
    pub project: Option<ProjectContext>,
    pub interval: DepthInterval,
    pub pair: Option<CapturePair>,
}

impl CaptureSession {
    pub fn new(segment_length: f64) -> Result<Self> {
        Ok(Self {
            project: None,
            interval: DepthInterval::starting(segment_length)?,
            pair: None,
        })
    }

    /// Drop the pending pair, releasing both buffers.
    pub fn discard_pair(&mut self) {
        self.pair = None;
    }
}
