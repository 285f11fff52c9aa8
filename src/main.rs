use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use iced::widget::{button, column, container, row, scrollable, text, text_input, Column};
use iced::{Alignment, Element, Length, Subscription, Task, Theme};
use tracing_subscriber::EnvFilter;

mod camera;
mod config;
mod depth;
mod error;
mod naming;
mod session;
mod storage;
mod workflow;

use camera::rpicam::RpicamCamera;
use camera::sim::SimulatedCamera;
use camera::{CameraId, CameraProvider, ExposureDirection, FocusDirection};
use config::Config;
use storage::StorageManager;
use workflow::{
    DepthAdjust, ReviewVerdict, Snapshot, WorkflowEngine, WorkflowEvent, WorkflowState,
};

/// Result of one engine call, delivered back from the background task.
#[derive(Debug, Clone)]
struct EngineReply {
    outcome: Result<Option<String>, String>,
    snapshot: Snapshot,
}

/// Main application state. The UI is a renderer of engine snapshots; every
/// button press becomes a `WorkflowEvent` and all transition logic lives in
/// the workflow engine.
struct CoreCameraApp {
    engine: Arc<Mutex<WorkflowEngine>>,
    window_title: String,
    snapshot: Snapshot,
    /// Timestamped operator status lines, newest last
    status_log: Vec<String>,
    storage_line: String,
    project_input: String,
    borehole_input: String,
    depth_from_input: String,
    depth_to_input: String,
    /// Which camera the FOCUS buttons currently drive
    focus_camera: CameraId,
    /// Latest live preview frame while positioning
    preview: Option<iced::widget::image::Handle>,
    /// An engine call is in flight; the machine state is the real lock,
    /// this just stops the UI queueing redundant work
    busy: bool,
    storage_refresh: Duration,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    ProjectChanged(String),
    BoreholeChanged(String),
    DepthFromChanged(String),
    DepthToChanged(String),
    OkPressed,
    NoPressed,
    DepthPlus,
    DepthMinus,
    Brighter,
    Darker,
    FocusCameraToggled,
    FocusIn,
    FocusOut,
    EngineReplied(EngineReply),
    StorageTick,
    StorageStatus(String),
    PreviewTick,
    PreviewFrame(Option<Vec<u8>>),
}

impl CoreCameraApp {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let config_path = std::env::args()
            .nth(1)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config.json"));
        let config = Config::load(&config_path)
            .expect("Failed to load configuration. Fix or remove the config file.");

        let storage = StorageManager::new(&config.storage)
            .expect("Failed to initialize internal storage. Check the root and permissions.");

        let quality = config.storage.image_quality;
        let camera: Box<dyn CameraProvider> =
            if config.camera.simulated || !RpicamCamera::available() {
                println!("📷 rpicam tooling not in use - running with simulated cameras");
                Box::new(SimulatedCamera::new(&config.camera, quality))
            } else {
                Box::new(RpicamCamera::new(&config.camera, quality))
            };

        let engine = WorkflowEngine::new(camera, storage, &config.ui)
            .expect("Failed to initialize workflow engine");
        let snapshot = engine.snapshot();

        let app = CoreCameraApp {
            engine: Arc::new(Mutex::new(engine)),
            window_title: config.ui.window_title.clone(),
            depth_from_input: format!("{:.2}", snapshot.from_m),
            depth_to_input: format!("{:.2}", snapshot.to_m),
            project_input: snapshot.project_name.clone(),
            borehole_input: snapshot.borehole_name.clone(),
            snapshot,
            status_log: Vec::new(),
            storage_line: "Storage: checking...".to_string(),
            focus_camera: CameraId::Cam1,
            preview: None,
            busy: false,
            storage_refresh: Duration::from_secs(config.ui.storage_refresh_secs),
        };

        let mut startup = Task::done(Message::StorageTick);
        if config.ui.fullscreen {
            // the rig runs kiosk-style on a fixed touchscreen
            startup = Task::batch([
                startup,
                iced::window::get_latest().and_then(|id| {
                    iced::window::change_mode(id, iced::window::Mode::Fullscreen)
                }),
            ]);
        }

        (app, startup)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::ProjectChanged(value) => {
                self.project_input = value;
                Task::none()
            }
            Message::BoreholeChanged(value) => {
                self.borehole_input = value;
                Task::none()
            }
            Message::DepthFromChanged(value) => {
                self.depth_from_input = value;
                Task::none()
            }
            Message::DepthToChanged(value) => {
                self.depth_to_input = value;
                Task::none()
            }

            Message::OkPressed => match self.snapshot.state {
                WorkflowState::Setup => self.confirm_setup(),
                WorkflowState::Positioning => self.dispatch(WorkflowEvent::TriggerCapture),
                WorkflowState::ReviewCam1 | WorkflowState::ReviewCam2 => {
                    self.dispatch(WorkflowEvent::Review(ReviewVerdict::Accept))
                }
                WorkflowState::Error => {
                    if self.snapshot.has_retained_pair {
                        self.dispatch(WorkflowEvent::RetrySave)
                    } else {
                        self.dispatch(WorkflowEvent::AcknowledgeError)
                    }
                }
                WorkflowState::Capturing | WorkflowState::Saving => Task::none(),
            },

            Message::NoPressed => match self.snapshot.state {
                WorkflowState::Positioning => self.dispatch(WorkflowEvent::ReturnToSetup),
                WorkflowState::ReviewCam1 | WorkflowState::ReviewCam2 => {
                    self.dispatch(WorkflowEvent::Review(ReviewVerdict::Reject))
                }
                WorkflowState::Error => self.dispatch(WorkflowEvent::AcknowledgeError),
                _ => Task::none(),
            },

            Message::DepthPlus => self.dispatch(WorkflowEvent::AdjustDepth(DepthAdjust::Increase)),
            Message::DepthMinus => {
                self.dispatch(WorkflowEvent::AdjustDepth(DepthAdjust::Decrease))
            }
            Message::Brighter => {
                self.dispatch(WorkflowEvent::AdjustExposure(ExposureDirection::Brighter))
            }
            Message::Darker => {
                self.dispatch(WorkflowEvent::AdjustExposure(ExposureDirection::Darker))
            }

            Message::FocusCameraToggled => {
                self.focus_camera = match self.focus_camera {
                    CameraId::Cam1 => CameraId::Cam2,
                    CameraId::Cam2 => CameraId::Cam1,
                };
                Task::none()
            }
            Message::FocusIn => self.dispatch(WorkflowEvent::AdjustFocus {
                camera: self.focus_camera,
                direction: FocusDirection::Increase,
            }),
            Message::FocusOut => self.dispatch(WorkflowEvent::AdjustFocus {
                camera: self.focus_camera,
                direction: FocusDirection::Decrease,
            }),

            Message::EngineReplied(reply) => {
                self.busy = false;
                self.snapshot = reply.snapshot;
                // keep the depth fields in step with automatic advancement
                self.depth_from_input = format!("{:.2}", self.snapshot.from_m);
                self.depth_to_input = format!("{:.2}", self.snapshot.to_m);
                match reply.outcome {
                    Ok(Some(notice)) => self.log_status(&notice),
                    Ok(None) => {}
                    Err(message) => self.log_status(&format!("ERROR: {message}")),
                }
                Task::none()
            }

            Message::StorageTick => {
                let engine = self.engine.clone();
                Task::perform(
                    async move {
                        tokio::task::spawn_blocking(move || {
                            let engine = engine.lock().expect("workflow engine mutex poisoned");
                            engine.storage_summary()
                        })
                        .await
                        .expect("storage status task panicked")
                    },
                    Message::StorageStatus,
                )
            }
            Message::StorageStatus(line) => {
                self.storage_line = line;
                Task::none()
            }

            Message::PreviewTick => {
                if self.snapshot.state != WorkflowState::Positioning || self.busy {
                    return Task::none();
                }
                let engine = self.engine.clone();
                let camera = self.focus_camera;
                Task::perform(
                    async move {
                        tokio::task::spawn_blocking(move || {
                            let mut engine = engine.lock().expect("workflow engine mutex poisoned");
                            engine.live_frame(camera).ok()
                        })
                        .await
                        .expect("preview task panicked")
                    },
                    Message::PreviewFrame,
                )
            }
            Message::PreviewFrame(frame) => {
                self.preview = frame.map(iced::widget::image::Handle::from_bytes);
                Task::none()
            }
        }
    }

    /// Parse the setup fields and send them to the engine as one event.
    fn confirm_setup(&mut self) -> Task<Message> {
        let (Ok(from_m), Ok(to_m)) = (
            self.depth_from_input.trim().parse::<f64>(),
            self.depth_to_input.trim().parse::<f64>(),
        ) else {
            self.log_status("ERROR: invalid depth values");
            return Task::none();
        };
        self.dispatch(WorkflowEvent::ConfirmSetup {
            project: self.project_input.clone(),
            borehole: self.borehole_input.clone(),
            from_m,
            to_m,
        })
    }

    /// Run one engine call on a blocking worker so capture and save never
    /// freeze the panel or tie up the async executor. The engine rejects
    /// anything that arrives for the wrong state, so a stray press while
    /// work is in flight is harmless.
    fn dispatch(&mut self, event: WorkflowEvent) -> Task<Message> {
        if self.busy {
            return Task::none();
        }
        self.busy = true;
        let engine = self.engine.clone();
        Task::perform(
            async move {
                tokio::task::spawn_blocking(move || {
                    let mut engine = engine.lock().expect("workflow engine mutex poisoned");
                    let outcome = engine.handle(event).map_err(|e| e.to_string());
                    EngineReply {
                        outcome,
                        snapshot: engine.snapshot(),
                    }
                })
                .await
                .expect("engine task panicked")
            },
            Message::EngineReplied,
        )
    }

    fn log_status(&mut self, message: &str) {
        let timestamp = chrono::Local::now().format("%H:%M:%S");
        self.status_log.push(format!("[{timestamp}] {message}"));
        // the panel shows a short tail; no point growing without bound
        if self.status_log.len() > 100 {
            self.status_log.remove(0);
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let header = column![
            text("Stereo Core Camera System").size(28),
            text(self.snapshot.state.describe()).size(16),
        ]
        .spacing(5)
        .align_x(Alignment::Center);

        let body: Element<Message> = match self.snapshot.state {
            WorkflowState::Setup => self.setup_panel(),
            WorkflowState::ReviewCam1 | WorkflowState::ReviewCam2 => self.review_panel(),
            WorkflowState::Error => self.error_panel(),
            _ => self.positioning_panel(),
        };

        let ok_label = match self.snapshot.state {
            WorkflowState::Positioning => "CAPTURE",
            WorkflowState::Error if self.snapshot.has_retained_pair => "RETRY SAVE",
            WorkflowState::Capturing | WorkflowState::Saving => "...",
            _ => "OK",
        };
        let actions = row![
            button(text(ok_label).size(20))
                .on_press(Message::OkPressed)
                .padding(15),
            button(text("NO").size(20))
                .on_press(Message::NoPressed)
                .padding(15),
        ]
        .spacing(20);

        let log_tail: Column<Message> = Column::with_children(
            self.status_log
                .iter()
                .rev()
                .take(6)
                .rev()
                .map(|line| text(line).size(12).into()),
        )
        .spacing(2);

        let status = column![
            text(&self.storage_line).size(13),
            scrollable(log_tail).height(Length::Fixed(90.0)),
        ]
        .spacing(5);

        let content = column![header, body, actions, status]
            .spacing(15)
            .padding(20)
            .align_x(Alignment::Center);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .into()
    }

    fn setup_panel(&self) -> Element<Message> {
        column![
            text_input("Enter project name...", &self.project_input)
                .on_input(Message::ProjectChanged)
                .padding(10),
            text_input("Enter borehole name...", &self.borehole_input)
                .on_input(Message::BoreholeChanged)
                .padding(10),
            row![
                text("Depth from (m):").size(14),
                text_input("0.00", &self.depth_from_input)
                    .on_input(Message::DepthFromChanged)
                    .width(Length::Fixed(100.0)),
                text("Depth to (m):").size(14),
                text_input("0.50", &self.depth_to_input)
                    .on_input(Message::DepthToChanged)
                    .width(Length::Fixed(100.0)),
            ]
            .spacing(10)
            .align_y(Alignment::Center),
        ]
        .spacing(10)
        .width(Length::Fixed(500.0))
        .into()
    }

    fn positioning_panel(&self) -> Element<Message> {
        let preview: Element<Message> = match &self.preview {
            Some(handle) => iced::widget::image(handle.clone())
                .width(Length::Fixed(480.0))
                .into(),
            None => text("Live preview starting...").size(14).into(),
        };

        let interval = row![
            text(format!(
                "{} / {}    {:.2}m - {:.2}m",
                self.snapshot.project_name,
                self.snapshot.borehole_name,
                self.snapshot.from_m,
                self.snapshot.to_m
            ))
            .size(16),
            button("−").on_press(Message::DepthMinus).padding(10),
            button("+").on_press(Message::DepthPlus).padding(10),
        ]
        .spacing(10)
        .align_y(Alignment::Center);

        let camera_controls = row![
            button("BRIGHTER").on_press(Message::Brighter).padding(10),
            button("DARKER").on_press(Message::Darker).padding(10),
            button(text(format!(
                "{} (step {})",
                self.focus_camera,
                self.snapshot.focus_steps[self.focus_camera.index()]
            )))
            .on_press(Message::FocusCameraToggled)
            .padding(10),
            button("FOCUS −").on_press(Message::FocusOut).padding(10),
            button("FOCUS +").on_press(Message::FocusIn).padding(10),
        ]
        .spacing(10);

        column![preview, interval, camera_controls]
            .spacing(10)
            .align_x(Alignment::Center)
            .into()
    }

    fn review_panel(&self) -> Element<Message> {
        let title = match self.snapshot.review_camera {
            Some(camera) => format!("{camera}"),
            None => "Review".to_string(),
        };
        let image: Element<Message> = match &self.snapshot.review_jpeg {
            Some(bytes) => {
                iced::widget::image(iced::widget::image::Handle::from_bytes(bytes.clone()))
                    .width(Length::Fixed(560.0))
                    .into()
            }
            None => text("No image").size(14).into(),
        };
        column![
            text(title).size(18),
            image,
            text("Check image quality and clarity. OK to accept, NO to retake.").size(14),
        ]
        .spacing(10)
        .align_x(Alignment::Center)
        .into()
    }

    fn error_panel(&self) -> Element<Message> {
        let detail = self
            .snapshot
            .last_error
            .as_deref()
            .unwrap_or("Unknown failure");
        let hint = if self.snapshot.has_retained_pair {
            "The captured images are still in memory. OK retries the save, NO discards them."
        } else {
            "OK or NO returns to positioning."
        };
        column![
            text("Operation failed").size(20),
            text(detail).size(14),
            text(hint).size(14),
        ]
        .spacing(10)
        .align_x(Alignment::Center)
        .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            iced::time::every(self.storage_refresh).map(|_| Message::StorageTick),
            iced::time::every(Duration::from_millis(500)).map(|_| Message::PreviewTick),
        ])
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    iced::application(
        |app: &CoreCameraApp| app.window_title.clone(),
        CoreCameraApp::update,
        CoreCameraApp::view,
    )
    .subscription(CoreCameraApp::subscription)
    .theme(CoreCameraApp::theme)
    .centered()
    .run_with(CoreCameraApp::new)
}
