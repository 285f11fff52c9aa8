/// Workflow state machine
///
/// The controller behind the operator panel. Every button press arrives as
/// a `WorkflowEvent`; `handle` validates it against the current state, runs
/// any camera or storage work, and returns an optional operator notice.
/// Side effects are confined to the capturing and saving phases, so every
/// other transition is a pure data update and the whole machine is testable
/// against a scripted camera and a temp-dir storage root.
use tracing::{error, info};

use crate::camera::{CameraId, CameraProvider, ExposureDirection, FocusDirection};
use crate::config::UiConfig;
use crate::depth::DepthInterval;
use crate::error::{CoreError, Result};
use crate::naming;
use crate::session::{CapturePair, CaptureSession, ProjectContext, ReviewStatus};
use crate::storage::StorageManager;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    /// Entering project and borehole names
    Setup,
    /// Core positioned under the cameras; depth and camera adjustments live
    Positioning,
    /// Two-camera acquisition in flight
    Capturing,
    /// Operator judging the camera 1 image
    ReviewCam1,
    /// Operator judging the camera 2 image
    ReviewCam2,
    /// Dual-destination write in flight
    Saving,
    /// Unrecoverable failure; waiting for operator acknowledgement
    Error,
}

impl WorkflowState {
    /// Operator-facing description shown in the header.
    pub fn describe(self) -> &'static str {
        match self {
            WorkflowState::Setup => "Enter project and borehole information",
            WorkflowState::Positioning => "Position core and set depth range - OK captures",
            WorkflowState::Capturing => "Capturing stereo pair...",
            WorkflowState::ReviewCam1 => "Review Camera 1 image quality",
            WorkflowState::ReviewCam2 => "Review Camera 2 image quality",
            WorkflowState::Saving => "Saving images...",
            WorkflowState::Error => "Operation failed - operator action required",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthAdjust {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewVerdict {
    Accept,
    Reject,
}

/// Operator input, decoupled from whichever widget produced it.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    ConfirmSetup {
        project: String,
        borehole: String,
        from_m: f64,
        to_m: f64,
    },
    ReturnToSetup,
    AdjustDepth(DepthAdjust),
    AdjustExposure(ExposureDirection),
    AdjustFocus {
        camera: CameraId,
        direction: FocusDirection,
    },
    TriggerCapture,
    Review(ReviewVerdict),
    RetrySave,
    AcknowledgeError,
}

impl WorkflowEvent {
    fn describe(&self) -> &'static str {
        match self {
            WorkflowEvent::ConfirmSetup { .. } => "project setup",
            WorkflowEvent::ReturnToSetup => "return to setup",
            WorkflowEvent::AdjustDepth(_) => "depth adjustment",
            WorkflowEvent::AdjustExposure(_) => "exposure adjustment",
            WorkflowEvent::AdjustFocus { .. } => "focus adjustment",
            WorkflowEvent::TriggerCapture => "capture",
            WorkflowEvent::Review(_) => "image review",
            WorkflowEvent::RetrySave => "save retry",
            WorkflowEvent::AcknowledgeError => "error acknowledgement",
        }
    }
}

/// Read-only view of the engine for rendering. The UI never touches the
/// engine's internals directly.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub state: WorkflowState,
    pub project_name: String,
    pub borehole_name: String,
    pub from_m: f64,
    pub to_m: f64,
    pub review_camera: Option<CameraId>,
    pub review_jpeg: Option<Vec<u8>>,
    pub focus_steps: [u8; 2],
    pub has_retained_pair: bool,
    pub last_error: Option<String>,
}

pub struct WorkflowEngine {
    state: WorkflowState,
    session: CaptureSession,
    camera: Box<dyn CameraProvider>,
    storage: StorageManager,
    segment_length: f64,
    depth_step: f64,
    last_error: Option<String>,
}

impl WorkflowEngine {
    pub fn new(
        camera: Box<dyn CameraProvider>,
        storage: StorageManager,
        ui: &UiConfig,
    ) -> Result<Self> {
        Ok(Self {
            state: WorkflowState::Setup,
            session: CaptureSession::new(ui.default_segment_length)?,
            camera,
            storage,
            segment_length: ui.default_segment_length,
            depth_step: ui.segment_adjustment_step,
            last_error: None,
        })
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn interval(&self) -> DepthInterval {
        self.session.interval
    }

    pub fn project(&self) -> Option<&ProjectContext> {
        self.session.project.as_ref()
    }

    pub fn storage_summary(&self) -> String {
        self.storage.status_summary()
    }

    /// Grab a live preview frame for the positioning display.
    pub fn live_frame(&mut self, camera: CameraId) -> Result<Vec<u8>> {
        self.camera.live_frame(camera)
    }

    pub fn snapshot(&self) -> Snapshot {
        let review_camera = match self.state {
            WorkflowState::ReviewCam1 => Some(CameraId::Cam1),
            WorkflowState::ReviewCam2 => Some(CameraId::Cam2),
            _ => None,
        };
        let review_jpeg = review_camera.and_then(|camera| {
            self.session
                .pair
                .as_ref()
                .map(|pair| pair.image(camera).to_vec())
        });
        Snapshot {
            state: self.state,
            project_name: self
                .session
                .project
                .as_ref()
                .map(|p| p.project_name().to_string())
                .unwrap_or_default(),
            borehole_name: self
                .session
                .project
                .as_ref()
                .map(|p| p.borehole_name().to_string())
                .unwrap_or_default(),
            from_m: self.session.interval.from_m(),
            to_m: self.session.interval.to_m(),
            review_camera,
            review_jpeg,
            focus_steps: [
                self.camera.focus_step(CameraId::Cam1),
                self.camera.focus_step(CameraId::Cam2),
            ],
            has_retained_pair: self.session.pair.is_some(),
            last_error: self.last_error.clone(),
        }
    }

    /// Apply one operator event.
    ///
    /// `Ok(Some(notice))` carries a line for the status log. Validation
    /// failures leave the state untouched; capture and save failures move
    /// the machine into `Error` with the session preserved before the error
    /// propagates.
    pub fn handle(&mut self, event: WorkflowEvent) -> Result<Option<String>> {
        match (self.state, event) {
            (
                WorkflowState::Setup,
                WorkflowEvent::ConfirmSetup {
                    project,
                    borehole,
                    from_m,
                    to_m,
                },
            ) => self.confirm_setup(&project, &borehole, from_m, to_m),

            (WorkflowState::Positioning, WorkflowEvent::ReturnToSetup) => {
                self.state = WorkflowState::Setup;
                Ok(Some("Returning to project setup".to_string()))
            }

            (WorkflowState::Positioning, WorkflowEvent::AdjustDepth(adjust)) => {
                let delta = match adjust {
                    DepthAdjust::Increase => self.depth_step,
                    DepthAdjust::Decrease => -self.depth_step,
                };
                self.session.interval.adjust_to(delta)?;
                Ok(Some(format!(
                    "Depth to adjusted to {:.2}m",
                    self.session.interval.to_m()
                )))
            }

            (WorkflowState::Positioning, WorkflowEvent::AdjustExposure(direction)) => {
                self.camera.set_exposure(direction)?;
                let label = match direction {
                    ExposureDirection::Brighter => "brighter",
                    ExposureDirection::Darker => "darker",
                };
                Ok(Some(format!("Exposure adjusted ({label})")))
            }

            (WorkflowState::Positioning, WorkflowEvent::AdjustFocus { camera, direction }) => {
                let moved = self.camera.set_focus_step(camera, direction)?;
                let step = self.camera.focus_step(camera);
                if moved {
                    Ok(Some(format!("{camera} focus step {step}")))
                } else {
                    Ok(Some(format!("{camera} focus already at boundary (step {step})")))
                }
            }

            (WorkflowState::Positioning, WorkflowEvent::TriggerCapture) => self.capture_pair(),

            (WorkflowState::ReviewCam1, WorkflowEvent::Review(ReviewVerdict::Accept)) => {
                if let Some(pair) = self.session.pair.as_mut() {
                    pair.set_status(CameraId::Cam1, ReviewStatus::Accepted);
                }
                self.state = WorkflowState::ReviewCam2;
                Ok(Some("Camera 1 accepted - review camera 2".to_string()))
            }

            (WorkflowState::ReviewCam2, WorkflowEvent::Review(ReviewVerdict::Accept)) => {
                if let Some(pair) = self.session.pair.as_mut() {
                    pair.set_status(CameraId::Cam2, ReviewStatus::Accepted);
                }
                self.save_pair()
            }

            (
                WorkflowState::ReviewCam1 | WorkflowState::ReviewCam2,
                WorkflowEvent::Review(ReviewVerdict::Reject),
            ) => {
                let camera = if self.state == WorkflowState::ReviewCam1 {
                    CameraId::Cam1
                } else {
                    CameraId::Cam2
                };
                if let Some(pair) = self.session.pair.as_mut() {
                    pair.set_status(camera, ReviewStatus::Rejected);
                }
                self.session.discard_pair();
                self.state = WorkflowState::Positioning;
                Ok(Some(
                    "Images discarded - reposition and capture again".to_string(),
                ))
            }

            (WorkflowState::Error, WorkflowEvent::RetrySave) => {
                let retryable = self
                    .session
                    .pair
                    .as_ref()
                    .is_some_and(|pair| pair.fully_accepted());
                if retryable {
                    self.save_pair()
                } else {
                    Err(CoreError::validation(
                        "no accepted images pending - acknowledge the error instead",
                    ))
                }
            }

            (WorkflowState::Error, WorkflowEvent::AcknowledgeError) => {
                self.session.discard_pair();
                self.last_error = None;
                self.state = WorkflowState::Positioning;
                Ok(Some("Error acknowledged - back to positioning".to_string()))
            }

            (state, event) => Err(CoreError::validation(format!(
                "{} is not available while {}",
                event.describe(),
                state.describe().to_lowercase()
            ))),
        }
    }

    fn confirm_setup(
        &mut self,
        project: &str,
        borehole: &str,
        from_m: f64,
        to_m: f64,
    ) -> Result<Option<String>> {
        let context = ProjectContext::new(project, borehole)?;
        // catch names that cannot survive filename sanitization before the
        // operator gets anywhere near a capture
        naming::sanitize(context.project_name())?;
        naming::sanitize(context.borehole_name())?;
        let interval = DepthInterval::new(from_m, to_m)?;

        info!(
            project = context.project_name(),
            borehole = context.borehole_name(),
            %interval,
            "project setup confirmed"
        );
        let notice = format!(
            "Project: {}, Borehole: {}",
            context.project_name(),
            context.borehole_name()
        );
        self.session.project = Some(context);
        self.session.interval = interval;
        self.state = WorkflowState::Positioning;
        Ok(Some(notice))
    }

    /// Acquire both frames into a fresh pending pair. Failure of either
    /// camera releases whatever was acquired and lands in `Error` with the
    /// project and interval untouched, ready for an operator retry.
    fn capture_pair(&mut self) -> Result<Option<String>> {
        self.state = WorkflowState::Capturing;
        info!(interval = %self.session.interval, "capturing stereo pair");

        let camera_1_image = match self.camera.capture(CameraId::Cam1) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(e),
        };
        let camera_2_image = match self.camera.capture(CameraId::Cam2) {
            Ok(bytes) => bytes,
            Err(e) => return self.fail(e),
        };

        self.session.pair = Some(CapturePair::new(camera_1_image, camera_2_image));
        self.state = WorkflowState::ReviewCam1;
        Ok(Some("Stereo pair captured - review camera 1".to_string()))
    }

    /// Persist the fully accepted pair to every storage target, then
    /// advance the interval. An internal-storage failure keeps the pair in
    /// memory so the operator can retry without re-capturing.
    fn save_pair(&mut self) -> Result<Option<String>> {
        self.state = WorkflowState::Saving;
        let Some(project) = self.session.project.clone() else {
            return self.fail(CoreError::validation("no project context at save time"));
        };
        let interval = self.session.interval;
        let Some(pair) = self.session.pair.take() else {
            return self.fail(CoreError::validation("no captured pair at save time"));
        };

        let mut all_backed_up = true;
        let mut usb_error = None;
        for camera in CameraId::ALL {
            let relative = match naming::resolve(
                project.project_name(),
                project.borehole_name(),
                interval.from_m(),
                interval.to_m(),
                camera,
            ) {
                Ok(path) => path,
                Err(e) => {
                    self.session.pair = Some(pair);
                    return self.fail(e);
                }
            };

            match self.storage.save(&relative, pair.image(camera)) {
                Ok(report) => {
                    if !report.backed_up() {
                        all_backed_up = false;
                        usb_error = usb_error.or(report.usb_error);
                    }
                }
                Err(e) => {
                    // keep the accepted pair for RetrySave
                    self.session.pair = Some(pair);
                    return self.fail(e);
                }
            }
        }

        self.session.interval = interval.advanced(self.segment_length);
        self.last_error = None;
        self.state = WorkflowState::Positioning;
        info!(saved = %interval, next = %self.session.interval, "stereo pair saved");

        let backup_note = match (all_backed_up, usb_error) {
            (true, _) => "internal storage and USB backup".to_string(),
            (false, Some(e)) => format!("internal storage (USB backup failed: {e})"),
            (false, None) => "internal storage (no USB drive for backup)".to_string(),
        };
        Ok(Some(format!(
            "Saved {interval} to {backup_note}. Next segment: {}",
            self.session.interval
        )))
    }

    /// Record a fatal failure and enter the error state. Session data stays
    /// intact; only explicit operator action discards anything.
    fn fail(&mut self, e: CoreError) -> Result<Option<String>> {
        error!(error = %e, "workflow operation failed");
        self.last_error = Some(e.to_string());
        self.state = WorkflowState::Error;
        Err(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use std::collections::VecDeque;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Camera with pre-seeded capture outcomes; defaults to distinct valid
    /// frames per camera once the script runs out.
    struct ScriptedCamera {
        script: VecDeque<std::result::Result<Vec<u8>, String>>,
        focus: [u8; 2],
    }

    impl ScriptedCamera {
        fn ok() -> Self {
            Self {
                script: VecDeque::new(),
                focus: [3, 3],
            }
        }

        fn failing(failures: usize) -> Self {
            let mut camera = Self::ok();
            for _ in 0..failures {
                camera.script.push_back(Err("lens fell off".to_string()));
            }
            camera
        }
    }

    impl CameraProvider for ScriptedCamera {
        fn capture(&mut self, camera: CameraId) -> Result<Vec<u8>> {
            match self.script.pop_front() {
                Some(Ok(bytes)) => Ok(bytes),
                Some(Err(message)) => Err(CoreError::Capture(message)),
                None => Ok(vec![0xFF, 0xD8, camera.number(), 0xFF, 0xD9]),
            }
        }

        fn live_frame(&mut self, camera: CameraId) -> Result<Vec<u8>> {
            Ok(vec![camera.number()])
        }

        fn set_exposure(&mut self, _direction: ExposureDirection) -> Result<()> {
            Ok(())
        }

        fn set_focus_step(&mut self, camera: CameraId, direction: FocusDirection) -> Result<bool> {
            let (step, moved) = crate::camera::nudge_step(self.focus[camera.index()], direction);
            self.focus[camera.index()] = step;
            Ok(moved)
        }

        fn focus_step(&self, camera: CameraId) -> u8 {
            self.focus[camera.index()]
        }
    }

    fn engine_at(internal: &Path, camera: ScriptedCamera) -> WorkflowEngine {
        let storage = StorageManager::new(&StorageConfig {
            internal_path: internal.to_path_buf(),
            usb_mount_paths: vec![],
            ..StorageConfig::default()
        })
        .unwrap();
        WorkflowEngine::new(Box::new(camera), storage, &UiConfig::default()).unwrap()
    }

    fn confirmed(engine: &mut WorkflowEngine) {
        engine
            .handle(WorkflowEvent::ConfirmSetup {
                project: "Geo Proj".to_string(),
                borehole: "BH01".to_string(),
                from_m: 0.0,
                to_m: 0.5,
            })
            .unwrap();
        assert_eq!(engine.state(), WorkflowState::Positioning);
    }

    #[test]
    fn test_setup_requires_nonempty_names() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());

        let err = engine
            .handle(WorkflowEvent::ConfirmSetup {
                project: "   ".to_string(),
                borehole: "BH01".to_string(),
                from_m: 0.0,
                to_m: 0.5,
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(engine.state(), WorkflowState::Setup);
    }

    #[test]
    fn test_setup_requires_valid_interval() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());

        let result = engine.handle(WorkflowEvent::ConfirmSetup {
            project: "P".to_string(),
            borehole: "B".to_string(),
            from_m: 0.5,
            to_m: 0.5,
        });
        assert!(result.is_err());
        assert_eq!(engine.state(), WorkflowState::Setup);
    }

    #[test]
    fn test_full_cycle_saves_both_images_and_advances() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());
        confirmed(&mut engine);

        engine.handle(WorkflowEvent::TriggerCapture).unwrap();
        assert_eq!(engine.state(), WorkflowState::ReviewCam1);

        engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Accept))
            .unwrap();
        assert_eq!(engine.state(), WorkflowState::ReviewCam2);

        let notice = engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Accept))
            .unwrap()
            .unwrap();
        assert_eq!(engine.state(), WorkflowState::Positioning);
        assert!(notice.contains("no USB drive"));

        for (camera, marker) in [(1u8, 1u8), (2, 2)] {
            let path = dir
                .path()
                .join(format!("Geo Proj/BH01/BH01-0_00-0_50-{camera}.jpg"));
            assert_eq!(fs::read(path).unwrap(), vec![0xFF, 0xD8, marker, 0xFF, 0xD9]);
        }

        // automatic advancement by one segment length
        assert_eq!(engine.interval().from_m(), 0.5);
        assert_eq!(engine.interval().to_m(), 1.0);
        assert!(!engine.snapshot().has_retained_pair);
    }

    #[test]
    fn test_reject_at_camera_1_returns_to_positioning() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());
        confirmed(&mut engine);

        engine.handle(WorkflowEvent::TriggerCapture).unwrap();
        engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Reject))
            .unwrap();

        assert_eq!(engine.state(), WorkflowState::Positioning);
        assert_eq!(engine.interval().from_m(), 0.0);
        assert_eq!(engine.interval().to_m(), 0.5);
        assert!(!engine.snapshot().has_retained_pair);
        // nothing was written
        assert!(!dir.path().join("Geo Proj").exists());
    }

    #[test]
    fn test_reject_at_camera_2_discards_pair() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());
        confirmed(&mut engine);

        engine.handle(WorkflowEvent::TriggerCapture).unwrap();
        engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Accept))
            .unwrap();
        engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Reject))
            .unwrap();

        assert_eq!(engine.state(), WorkflowState::Positioning);
        assert!(!engine.snapshot().has_retained_pair);
        assert!(!dir.path().join("Geo Proj").exists());
    }

    #[test]
    fn test_capture_failure_preserves_session() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::failing(1));
        confirmed(&mut engine);

        let err = engine.handle(WorkflowEvent::TriggerCapture).unwrap_err();
        assert!(matches!(err, CoreError::Capture(_)));
        assert_eq!(engine.state(), WorkflowState::Error);
        // project and interval survive for the retry
        assert_eq!(engine.project().unwrap().project_name(), "Geo Proj");
        assert_eq!(engine.interval().to_m(), 0.5);

        engine.handle(WorkflowEvent::AcknowledgeError).unwrap();
        assert_eq!(engine.state(), WorkflowState::Positioning);

        // second attempt with a healthy camera succeeds
        engine.handle(WorkflowEvent::TriggerCapture).unwrap();
        assert_eq!(engine.state(), WorkflowState::ReviewCam1);
    }

    #[test]
    fn test_second_camera_failure_releases_first_frame() {
        let dir = TempDir::new().unwrap();
        let mut camera = ScriptedCamera::ok();
        camera.script.push_back(Ok(vec![0xAA]));
        camera.script.push_back(Err("camera 2 unplugged".to_string()));
        let mut engine = engine_at(dir.path(), camera);
        confirmed(&mut engine);

        assert!(engine.handle(WorkflowEvent::TriggerCapture).is_err());
        assert_eq!(engine.state(), WorkflowState::Error);
        assert!(!engine.snapshot().has_retained_pair);
    }

    #[test]
    fn test_save_failure_retains_pair_for_retry() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());
        confirmed(&mut engine);

        // a file where the project directory must go makes the save fail
        fs::write(dir.path().join("Geo Proj"), b"in the way").unwrap();

        engine.handle(WorkflowEvent::TriggerCapture).unwrap();
        engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Accept))
            .unwrap();
        let err = engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Accept))
            .unwrap_err();
        assert!(matches!(err, CoreError::SaveFailed { .. }));
        assert_eq!(engine.state(), WorkflowState::Error);
        assert!(engine.snapshot().has_retained_pair);

        // clear the obstruction; operator-initiated retry completes the save
        fs::remove_file(dir.path().join("Geo Proj")).unwrap();
        engine.handle(WorkflowEvent::RetrySave).unwrap();
        assert_eq!(engine.state(), WorkflowState::Positioning);
        assert!(dir
            .path()
            .join("Geo Proj/BH01/BH01-0_00-0_50-1.jpg")
            .exists());
        assert_eq!(engine.interval().from_m(), 0.5);
        assert!(!engine.snapshot().has_retained_pair);
    }

    #[test]
    fn test_depth_adjustment_guards_invariant() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());
        engine
            .handle(WorkflowEvent::ConfirmSetup {
                project: "P".to_string(),
                borehole: "B".to_string(),
                from_m: 1.0,
                to_m: 1.05,
            })
            .unwrap();

        engine
            .handle(WorkflowEvent::AdjustDepth(DepthAdjust::Increase))
            .unwrap();
        assert_eq!(engine.interval().to_m(), 1.1);

        engine
            .handle(WorkflowEvent::AdjustDepth(DepthAdjust::Decrease))
            .unwrap();
        assert_eq!(engine.interval().to_m(), 1.05);

        // one more step down would collapse the interval
        assert!(engine
            .handle(WorkflowEvent::AdjustDepth(DepthAdjust::Decrease))
            .is_err());
        assert_eq!(engine.interval().to_m(), 1.05);
        assert_eq!(engine.state(), WorkflowState::Positioning);
    }

    #[test]
    fn test_camera_adjustments_keep_state() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());
        confirmed(&mut engine);

        engine
            .handle(WorkflowEvent::AdjustExposure(ExposureDirection::Brighter))
            .unwrap();
        assert_eq!(engine.state(), WorkflowState::Positioning);

        // walk camera 1 up to the boundary
        for _ in 0..4 {
            engine
                .handle(WorkflowEvent::AdjustFocus {
                    camera: CameraId::Cam1,
                    direction: FocusDirection::Increase,
                })
                .unwrap();
        }
        let notice = engine
            .handle(WorkflowEvent::AdjustFocus {
                camera: CameraId::Cam1,
                direction: FocusDirection::Increase,
            })
            .unwrap()
            .unwrap();
        assert!(notice.contains("boundary"));
        assert_eq!(engine.snapshot().focus_steps[0], 7);
        assert_eq!(engine.state(), WorkflowState::Positioning);
    }

    #[test]
    fn test_error_header_promises_no_particular_recovery() {
        // whether OK retries or acknowledges depends on a retained pair;
        // the header must fit both, the panel hint carries the specifics
        let header = WorkflowState::Error.describe();
        assert!(!header.contains("retries"));
        assert!(!header.contains("discards"));
    }

    #[test]
    fn test_events_rejected_outside_their_state() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());

        // capture before setup
        assert!(engine.handle(WorkflowEvent::TriggerCapture).is_err());
        assert_eq!(engine.state(), WorkflowState::Setup);

        confirmed(&mut engine);
        // review verdict while positioning
        assert!(engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Accept))
            .is_err());
        assert_eq!(engine.state(), WorkflowState::Positioning);
    }

    #[test]
    fn test_return_to_setup_and_reconfirm() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());
        confirmed(&mut engine);

        engine.handle(WorkflowEvent::ReturnToSetup).unwrap();
        assert_eq!(engine.state(), WorkflowState::Setup);

        engine
            .handle(WorkflowEvent::ConfirmSetup {
                project: "Other".to_string(),
                borehole: "BH02".to_string(),
                from_m: 10.0,
                to_m: 10.5,
            })
            .unwrap();
        assert_eq!(engine.state(), WorkflowState::Positioning);
        assert_eq!(engine.project().unwrap().borehole_name(), "BH02");
        assert_eq!(engine.interval().from_m(), 10.0);
    }

    #[test]
    fn test_review_snapshot_exposes_current_image() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_at(dir.path(), ScriptedCamera::ok());
        confirmed(&mut engine);
        engine.handle(WorkflowEvent::TriggerCapture).unwrap();

        let snap = engine.snapshot();
        assert_eq!(snap.review_camera, Some(CameraId::Cam1));
        assert_eq!(snap.review_jpeg.unwrap(), vec![0xFF, 0xD8, 1, 0xFF, 0xD9]);

        engine
            .handle(WorkflowEvent::Review(ReviewVerdict::Accept))
            .unwrap();
        let snap = engine.snapshot();
        assert_eq!(snap.review_camera, Some(CameraId::Cam2));
        assert_eq!(snap.review_jpeg.unwrap(), vec![0xFF, 0xD8, 2, 0xFF, 0xD9]);
    }
}
