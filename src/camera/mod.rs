/// Camera capability interface
///
/// The workflow engine drives the cameras exclusively through the
/// `CameraProvider` trait, so the same machine runs against the rig's real
/// IMX219 pair (rpicam.rs) or a simulated pair on a development box (sim.rs).
pub mod rpicam;
pub mod sim;

use crate::error::Result;

/// Highest focus detent; detents run 0..=7 per camera.
pub const FOCUS_STEP_MAX: u8 = 7;

/// The two rig cameras. Internally 0-based, externally numbered 1 and 2
/// (the external number is what ends up in filenames and on screen).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraId {
    Cam1,
    Cam2,
}

impl CameraId {
    pub const ALL: [CameraId; 2] = [CameraId::Cam1, CameraId::Cam2];

    /// 0-based index for buffer arrays and hardware addressing.
    pub fn index(self) -> usize {
        match self {
            CameraId::Cam1 => 0,
            CameraId::Cam2 => 1,
        }
    }

    /// 1-based external number used in filenames and operator-facing text.
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

impl std::fmt::Display for CameraId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Camera {}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExposureDirection {
    Brighter,
    Darker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusDirection {
    Increase,
    Decrease,
}

/// Capability interface over the stereo pair.
///
/// Frame payloads are opaque JPEG bytes; the provider owns encoding quality
/// and exposure/focus state. Implementations must be `Send` because the UI
/// runs engine calls on a background task.
pub trait CameraProvider: Send {
    /// Capture a full-resolution frame from one camera.
    fn capture(&mut self, camera: CameraId) -> Result<Vec<u8>>;

    /// Grab a small preview frame. Never persisted.
    fn live_frame(&mut self, camera: CameraId) -> Result<Vec<u8>>;

    /// Step the manual shutter time for both cameras at once.
    fn set_exposure(&mut self, direction: ExposureDirection) -> Result<()>;

    /// Move one camera's focus by a single detent.
    ///
    /// Returns `Ok(false)` when the detent is already at a boundary (0 or
    /// `FOCUS_STEP_MAX`); the step is left unchanged and this is not an
    /// error.
    fn set_focus_step(&mut self, camera: CameraId, direction: FocusDirection) -> Result<bool>;

    /// Current focus detent for one camera, for display.
    fn focus_step(&self, camera: CameraId) -> u8;
}

/// Apply one detent move to a step value, honoring the 0..=FOCUS_STEP_MAX
/// range. Returns the new step and whether anything moved.
pub(crate) fn nudge_step(step: u8, direction: FocusDirection) -> (u8, bool) {
    match direction {
        FocusDirection::Increase if step < FOCUS_STEP_MAX => (step + 1, true),
        FocusDirection::Decrease if step > 0 => (step - 1, true),
        _ => (step, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_numbering() {
        assert_eq!(CameraId::Cam1.index(), 0);
        assert_eq!(CameraId::Cam2.index(), 1);
        assert_eq!(CameraId::Cam1.number(), 1);
        assert_eq!(CameraId::Cam2.number(), 2);
    }

    #[test]
    fn test_nudge_within_range() {
        assert_eq!(nudge_step(3, FocusDirection::Increase), (4, true));
        assert_eq!(nudge_step(3, FocusDirection::Decrease), (2, true));
    }

    #[test]
    fn test_nudge_at_boundaries() {
        // at 7, a further increase reports boundary-reached, not an error
        assert_eq!(nudge_step(FOCUS_STEP_MAX, FocusDirection::Increase), (FOCUS_STEP_MAX, false));
        assert_eq!(nudge_step(0, FocusDirection::Decrease), (0, false));
    }
}
