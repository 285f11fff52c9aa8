/// Simulated stereo pair for development machines without rig hardware.
///
/// Frames are synthetic gradients, JPEG-encoded at the configured quality.
/// Exposure changes scale the gradient brightness so BRIGHTER/DARKER are
/// visible on screen, and each camera gets a phase offset so the two images
/// of a pair are distinguishable during review.
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::config::CameraConfig;
use crate::error::{CoreError, Result};

use super::{nudge_step, CameraId, CameraProvider, ExposureDirection, FocusDirection};

const CAPTURE_SIZE: (u32, u32) = (1280, 960);
const PREVIEW_SIZE: (u32, u32) = (320, 240);

pub struct SimulatedCamera {
    quality: u8,
    exposure_us: f64,
    exposure_range_us: [u32; 2],
    baseline_exposure_us: f64,
    focus: [u8; 2],
    frame_counter: u32,
}

impl SimulatedCamera {
    pub fn new(config: &CameraConfig, quality: u8) -> Self {
        Self {
            quality,
            exposure_us: f64::from(config.initial_exposure_us),
            exposure_range_us: config.exposure_range_us,
            baseline_exposure_us: f64::from(config.initial_exposure_us),
            focus: [3, 3],
            frame_counter: 0,
        }
    }

    fn render(&mut self, camera: CameraId, (width, height): (u32, u32)) -> Result<Vec<u8>> {
        self.frame_counter = self.frame_counter.wrapping_add(1);
        let brightness = (self.exposure_us / self.baseline_exposure_us).clamp(0.1, 2.0);
        let phase = camera.index() as u32 * 64;
        let tick = (self.frame_counter % 256) as u32;

        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                let r = ((x * 255 / width + phase) % 256) as f64 * brightness;
                let g = ((y * 255 / height) % 256) as f64 * brightness;
                let b = ((x + y + tick) % 256) as f64 * brightness;
                pixels.push(r.min(255.0) as u8);
                pixels.push(g.min(255.0) as u8);
                pixels.push(b.min(255.0) as u8);
            }
        }

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .encode(&pixels, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| CoreError::Capture(format!("JPEG encode failed: {e}")))?;
        Ok(jpeg)
    }
}

impl CameraProvider for SimulatedCamera {
    fn capture(&mut self, camera: CameraId) -> Result<Vec<u8>> {
        self.render(camera, CAPTURE_SIZE)
    }

    fn live_frame(&mut self, camera: CameraId) -> Result<Vec<u8>> {
        self.render(camera, PREVIEW_SIZE)
    }

    fn set_exposure(&mut self, direction: ExposureDirection) -> Result<()> {
        let [min, max] = self.exposure_range_us;
        self.exposure_us = match direction {
            ExposureDirection::Brighter => (self.exposure_us * 1.5).min(f64::from(max)),
            ExposureDirection::Darker => (self.exposure_us / 1.5).max(f64::from(min)),
        };
        tracing::debug!(exposure_us = self.exposure_us, "simulated exposure adjusted");
        Ok(())
    }

    fn set_focus_step(&mut self, camera: CameraId, direction: FocusDirection) -> Result<bool> {
        let (step, moved) = nudge_step(self.focus[camera.index()], direction);
        self.focus[camera.index()] = step;
        Ok(moved)
    }

    fn focus_step(&self, camera: CameraId) -> u8 {
        self.focus[camera.index()]
    }
}
