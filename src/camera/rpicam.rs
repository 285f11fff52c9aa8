/// Hardware provider for the rig's dual IMX219 modules.
///
/// Shells out to `rpicam-still`, which handles sensor setup and JPEG
/// encoding. Exposure and focus are held here and passed on every
/// invocation; the eight focus detents map linearly onto the lens-position
/// range in diopters.
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::CameraConfig;
use crate::error::{CoreError, Result};

use super::{nudge_step, CameraId, CameraProvider, ExposureDirection, FocusDirection, FOCUS_STEP_MAX};

/// Lens position at the far detent, diopters.
const LENS_POSITION_MAX: f32 = 10.0;

const PREVIEW_SIZE: (u32, u32) = (640, 480);

pub struct RpicamCamera {
    quality: u8,
    exposure_us: u32,
    exposure_range_us: [u32; 2],
    focus: [u8; 2],
    capture_timeout: Duration,
}

impl RpicamCamera {
    pub fn new(config: &CameraConfig, quality: u8) -> Self {
        Self {
            quality,
            exposure_us: config.initial_exposure_us,
            exposure_range_us: config.exposure_range_us,
            focus: [3, 3],
            capture_timeout: Duration::from_secs(config.capture_timeout_secs),
        }
    }

    /// Whether the rpicam userland is present on this machine.
    pub fn available() -> bool {
        Command::new("rpicam-still")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn lens_position(&self, camera: CameraId) -> f32 {
        f32::from(self.focus[camera.index()]) * LENS_POSITION_MAX / f32::from(FOCUS_STEP_MAX)
    }

    fn frame_path(&self, camera: CameraId) -> PathBuf {
        std::env::temp_dir().join(format!(
            "stereo-core-{}-cam{}.jpg",
            std::process::id(),
            camera.number()
        ))
    }

    fn grab(&self, camera: CameraId, size: Option<(u32, u32)>) -> Result<Vec<u8>> {
        let output = self.frame_path(camera);
        let mut cmd = Command::new("rpicam-still");
        cmd.arg("--camera")
            .arg(camera.index().to_string())
            .arg("--nopreview")
            .arg("--immediate")
            .arg("--quality")
            .arg(self.quality.to_string())
            .arg("--shutter")
            .arg(self.exposure_us.to_string())
            .arg("--lens-position")
            .arg(format!("{:.2}", self.lens_position(camera)))
            .arg("--output")
            .arg(&output);
        if let Some((width, height)) = size {
            cmd.arg("--width")
                .arg(width.to_string())
                .arg("--height")
                .arg(height.to_string());
        }

        self.run_with_timeout(cmd, camera)?;

        let bytes = std::fs::read(&output)
            .map_err(|e| CoreError::Capture(format!("{camera} wrote no frame: {e}")))?;
        let _ = std::fs::remove_file(&output);
        Ok(bytes)
    }

    /// Run an rpicam invocation, killing it if it outlives the configured
    /// acquisition timeout so a wedged sensor never hangs the workflow.
    fn run_with_timeout(&self, mut cmd: Command, camera: CameraId) -> Result<()> {
        cmd.stdout(Stdio::null()).stderr(Stdio::null());
        let mut child = cmd
            .spawn()
            .map_err(|e| CoreError::Capture(format!("failed to start rpicam-still: {e}")))?;

        let deadline = Instant::now() + self.capture_timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(CoreError::Capture(format!(
                        "rpicam-still for {camera} exited with {status}"
                    )));
                }
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(CoreError::Capture(format!(
                            "{camera} acquisition timed out after {:?}",
                            self.capture_timeout
                        )));
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
                Err(e) => {
                    return Err(CoreError::Capture(format!(
                        "failed waiting for rpicam-still: {e}"
                    )));
                }
            }
        }
    }
}

impl CameraProvider for RpicamCamera {
    fn capture(&mut self, camera: CameraId) -> Result<Vec<u8>> {
        self.grab(camera, None)
    }

    fn live_frame(&mut self, camera: CameraId) -> Result<Vec<u8>> {
        self.grab(camera, Some(PREVIEW_SIZE))
    }

    fn set_exposure(&mut self, direction: ExposureDirection) -> Result<()> {
        let [min, max] = self.exposure_range_us;
        let adjusted = match direction {
            ExposureDirection::Brighter => (f64::from(self.exposure_us) * 1.5).min(f64::from(max)),
            ExposureDirection::Darker => (f64::from(self.exposure_us) / 1.5).max(f64::from(min)),
        };
        self.exposure_us = adjusted as u32;
        debug!(exposure_us = self.exposure_us, "shutter time adjusted");
        Ok(())
    }

    fn set_focus_step(&mut self, camera: CameraId, direction: FocusDirection) -> Result<bool> {
        let (step, moved) = nudge_step(self.focus[camera.index()], direction);
        self.focus[camera.index()] = step;
        if moved {
            debug!(%camera, step, lens_position = self.lens_position(camera), "focus detent moved");
        }
        Ok(moved)
    }

    fn focus_step(&self, camera: CameraId) -> u8 {
        self.focus[camera.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lens_position_spans_full_range() {
        let mut camera = RpicamCamera::new(&CameraConfig::default(), 95);
        camera.focus = [0, FOCUS_STEP_MAX];
        assert_eq!(camera.lens_position(CameraId::Cam1), 0.0);
        assert_eq!(camera.lens_position(CameraId::Cam2), LENS_POSITION_MAX);
    }

    #[test]
    fn test_exposure_steps_are_multiplicative() {
        let mut camera = RpicamCamera::new(&CameraConfig::default(), 95);
        let before = camera.exposure_us;
        camera.set_exposure(ExposureDirection::Brighter).unwrap();
        assert_eq!(camera.exposure_us, (f64::from(before) * 1.5) as u32);
    }

    #[test]
    fn test_wedged_acquisition_is_killed_at_the_timeout() {
        let config = CameraConfig {
            capture_timeout_secs: 1,
            ..CameraConfig::default()
        };
        let camera = RpicamCamera::new(&config, 95);

        // stands in for an rpicam-still that never returns
        let mut cmd = Command::new("sleep");
        cmd.arg("60");

        let started = Instant::now();
        let err = camera.run_with_timeout(cmd, CameraId::Cam1).unwrap_err();

        assert!(matches!(err, CoreError::Capture(_)));
        assert!(err.to_string().contains("timed out"));
        // killed at the deadline, not waited out
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
