//! Camera controller
//!
//! One controller per camera view. Construction spawns a tokio task that owns
//! all controller state and consumes a single queue carrying both hardware
//! events (from the named handlers) and commands (from `CameraController`).
//! Every state change happens inside that task, in queue order.

use super::device::DeviceSessionManager;
use super::hal::{Camera2Hal, ImageReader};
use super::handlers::{
    CaptureResultHandler, DeviceStateHandler, EventSink, HardwareEvent, ImageAvailableHandler,
    Message, RequestKind,
};
use super::image_writer::ImageWriter;
use super::metadata::{AfTrigger, CameraCharacteristics, CaptureResult, Surface};
use super::session::{self, FlashSettings, PreviewSessionBuilder};
use super::state_machine::{CaptureAction, CaptureState, CaptureStateMachine};
use crate::config::NaCameraConfig;
use crate::errors::CameraError;
use crate::permissions::{PermissionKind, PermissionProvider};
use crate::types::{CameraDeviceInfo, LensFacing, LockFocusStatus, PhotoCallback, Size};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Upper bound on `settle` round trips before giving up
const MAX_SETTLE_ROUNDS: usize = 10_000;

pub(crate) enum Command {
    Initialize,
    SurfaceAvailable(Surface),
    SurfaceDestroyed,
    LockFocus {
        callback: PhotoCallback,
        reply: oneshot::Sender<LockFocusStatus>,
    },
    SetFlashMode {
        enabled: bool,
        reply: oneshot::Sender<bool>,
    },
    SetTorchMode {
        enabled: bool,
        reply: oneshot::Sender<bool>,
    },
    SetDevicePosition {
        facing: LensFacing,
        reply: oneshot::Sender<bool>,
    },
    StartPreview {
        reply: oneshot::Sender<Result<(), CameraError>>,
    },
    StopPreview {
        reply: oneshot::Sender<Result<(), CameraError>>,
    },
    Status {
        reply: oneshot::Sender<ControllerStatus>,
    },
    /// Replies `true` when nothing else was queued at the time it was handled
    Sync {
        reply: oneshot::Sender<bool>,
    },
    Shutdown {
        reply: Option<oneshot::Sender<()>>,
    },
}

/// Snapshot of the controller state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub state: CaptureState,
    pub cameras: Vec<CameraDeviceInfo>,
    pub camera_id: Option<String>,
    pub facing: Option<LensFacing>,
    pub device_open: bool,
    pub session_ready: bool,
    pub flash_supported: bool,
    pub flash_enabled: bool,
    pub torch_enabled: bool,
    pub preview_running: bool,
    pub capture_pending: bool,
    pub jpeg_size: Option<Size>,
}

struct ControllerInner {
    sink: EventSink,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ControllerInner {
    fn drop(&mut self) {
        let _ = self
            .sink
            .send(Message::Command(Command::Shutdown { reply: None }));
    }
}

/// Handle to a running camera controller. Cheap to clone; the controller
/// shuts down when the last handle is dropped or `shutdown` is called.
#[derive(Clone)]
pub struct CameraController {
    inner: Arc<ControllerInner>,
}

impl std::fmt::Debug for CameraController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraController")
            .field("sink", &self.inner.sink)
            .finish()
    }
}

impl CameraController {
    /// Bind a controller to the current tokio runtime and begin the open
    /// sequence: enumerate cameras, pick the preferred facing, allocate the
    /// still reader and open the device.
    pub fn spawn(
        hal: Arc<dyn Camera2Hal>,
        config: NaCameraConfig,
        permissions: Arc<dyn PermissionProvider>,
    ) -> Result<Self, CameraError> {
        config.validate().map_err(CameraError::ConfigError)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            CameraError::InitializationError(format!("No tokio runtime available: {}", e))
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let queued = Arc::new(AtomicUsize::new(0));
        let sink = EventSink::new(tx, queued.clone());
        let core = ControllerCore::new(hal, config, permissions, sink.clone());
        let task = runtime.spawn(run_event_loop(core, rx, queued));

        let controller = Self {
            inner: Arc::new(ControllerInner {
                sink,
                task: Mutex::new(Some(task)),
            }),
        };
        controller.send(Command::Initialize)?;
        Ok(controller)
    }

    fn send(&self, command: Command) -> Result<(), CameraError> {
        self.inner
            .sink
            .send(Message::Command(command))
            .map_err(|_| stopped())
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CameraError> {
        let (tx, rx) = oneshot::channel();
        self.send(make(tx))?;
        rx.await.map_err(|_| stopped())
    }

    /// Preview surface became available; a session is created once the
    /// device is open too
    pub fn surface_available(&self, surface: Surface) -> Result<(), CameraError> {
        self.send(Command::SurfaceAvailable(surface))
    }

    pub fn surface_destroyed(&self) -> Result<(), CameraError> {
        self.send(Command::SurfaceDestroyed)
    }

    /// Start the focus lock and still capture sequence.
    ///
    /// `callback` runs exactly once on the controller task: with the saved
    /// file on success, with `None` on any failure or when the returned
    /// status is not `Started`. Refused with `NoSession` while the preview
    /// is stopped.
    pub async fn lock_focus(&self, callback: PhotoCallback) -> LockFocusStatus {
        let (tx, rx) = oneshot::channel();
        let command = Command::LockFocus {
            callback,
            reply: tx,
        };
        if let Err(Message::Command(Command::LockFocus { callback, .. })) =
            self.inner.sink.send(Message::Command(command))
        {
            log::error!("Camera controller has stopped, cannot lock focus");
            callback(None);
            return LockFocusStatus::NoDevice;
        }
        rx.await.unwrap_or(LockFocusStatus::NoDevice)
    }

    /// `lock_focus` and wait for the saved file
    pub async fn take_picture(&self) -> Option<PathBuf> {
        let (tx, rx) = oneshot::channel();
        let status = self
            .lock_focus(Box::new(move |path| {
                let _ = tx.send(path);
            }))
            .await;
        if !status.is_started() {
            log::warn!("Picture not started: {:?}", status);
        }
        rx.await.ok().flatten()
    }

    /// Returns the effective flash state; `false` when the camera has no flash
    pub async fn set_flash_mode(&self, enabled: bool) -> Result<bool, CameraError> {
        self.request(|reply| Command::SetFlashMode { enabled, reply })
            .await
    }

    pub async fn set_torch_mode(&self, enabled: bool) -> Result<bool, CameraError> {
        self.request(|reply| Command::SetTorchMode { enabled, reply })
            .await
    }

    pub async fn set_device_position(&self, facing: LensFacing) -> Result<bool, CameraError> {
        self.request(|reply| Command::SetDevicePosition { facing, reply })
            .await
    }

    pub async fn start_preview(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::StartPreview { reply })
            .await?
    }

    pub async fn stop_preview(&self) -> Result<(), CameraError> {
        self.request(|reply| Command::StopPreview { reply })
            .await?
    }

    pub async fn status(&self) -> Result<ControllerStatus, CameraError> {
        self.request(|reply| Command::Status { reply }).await
    }

    /// Wait until the queue has drained, including events posted while
    /// handling earlier ones
    pub async fn settle(&self) -> Result<(), CameraError> {
        for _ in 0..MAX_SETTLE_ROUNDS {
            if self.request(|reply| Command::Sync { reply }).await? {
                return Ok(());
            }
        }
        Err(CameraError::Busy(
            "Camera event queue did not drain".to_string(),
        ))
    }

    /// Close session and device and stop the event loop
    pub async fn shutdown(&self) {
        let _ = self.request(|reply| Command::Shutdown { reply: Some(reply) })
            .await;
        let task = self.inner.task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            if let Err(e) = task.await {
                log::error!("Camera controller task failed: {}", e);
            }
        }
    }
}

fn stopped() -> CameraError {
    CameraError::DeviceUnavailable("Camera controller has stopped".to_string())
}

async fn run_event_loop(
    mut core: ControllerCore,
    mut rx: mpsc::UnboundedReceiver<Message>,
    queued: Arc<AtomicUsize>,
) {
    log::info!("Camera controller started");
    while let Some(message) = rx.recv().await {
        queued.fetch_sub(1, Ordering::SeqCst);
        match message {
            Message::Hardware(event) => core.handle_event(event),
            Message::Command(Command::Sync { reply }) => {
                let _ = reply.send(queued.load(Ordering::SeqCst) == 0);
            }
            Message::Command(Command::Shutdown { reply }) => {
                core.shutdown();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
                break;
            }
            Message::Command(command) => core.handle_command(command).await,
        }
    }

    // Callers waiting on queued captures still get their single callback
    rx.close();
    while let Ok(message) = rx.try_recv() {
        if let Message::Command(Command::LockFocus { callback, reply }) = message {
            let _ = reply.send(LockFocusStatus::NoDevice);
            callback(None);
        }
    }
    log::info!("Camera controller stopped");
}

struct ControllerCore {
    hal: Arc<dyn Camera2Hal>,
    config: NaCameraConfig,
    permissions: Arc<dyn PermissionProvider>,
    sink: EventSink,
    devices: DeviceSessionManager,
    preview: PreviewSessionBuilder,
    machine: CaptureStateMachine,
    writer: ImageWriter,
    cameras: Vec<CameraDeviceInfo>,
    characteristics: Option<CameraCharacteristics>,
    reader: Option<Arc<dyn ImageReader>>,
    flash_enabled: bool,
    torch_enabled: bool,
    preview_running: bool,
    rebuild_pending: bool,
    pending: Option<PhotoCallback>,
}

impl ControllerCore {
    fn new(
        hal: Arc<dyn Camera2Hal>,
        config: NaCameraConfig,
        permissions: Arc<dyn PermissionProvider>,
        sink: EventSink,
    ) -> Self {
        let writer = ImageWriter::new(config.storage.clone(), permissions.clone());
        Self {
            preview: PreviewSessionBuilder::new(&config.preview),
            flash_enabled: config.camera.flash_enabled,
            hal,
            config,
            permissions,
            sink,
            devices: DeviceSessionManager::new(),
            machine: CaptureStateMachine::new(),
            writer,
            cameras: Vec::new(),
            characteristics: None,
            reader: None,
            torch_enabled: false,
            preview_running: true,
            rebuild_pending: false,
            pending: None,
        }
    }

    fn preview_handler(&self) -> CaptureResultHandler {
        CaptureResultHandler::new(self.sink.clone(), RequestKind::Preview)
    }

    fn flash_supported(&self) -> bool {
        self.characteristics
            .as_ref()
            .map(|c| c.flash_available)
            .unwrap_or(false)
    }

    fn flash_settings(&self) -> FlashSettings {
        FlashSettings {
            flash_enabled: self.flash_enabled,
            flash_supported: self.flash_supported(),
            torch_enabled: self.torch_enabled,
        }
    }

    fn capture_in_progress(&self) -> bool {
        !self.machine.is_idle() || self.pending.is_some()
    }

    async fn initialize(&mut self) {
        if !self.hal.has_camera_feature() {
            log::error!("No camera hardware on this device");
            return;
        }

        self.cameras = match self.enumerate() {
            Ok(cameras) => cameras,
            Err(e) => {
                log::error!("Failed to enumerate cameras: {}", e);
                return;
            }
        };
        log::info!("Found {} camera(s)", self.cameras.len());

        if !self.permissions.check(PermissionKind::Camera).is_granted() {
            let info = self.permissions.request(&PermissionKind::ALL).await;
            if !self.permissions.check(PermissionKind::Camera).is_granted() {
                log::error!("Camera permission denied: {}", info.message);
                return;
            }
        }

        let preferred = self.config.camera.preferred_facing;
        let camera_id = self
            .cameras
            .iter()
            .find(|c| c.facing == Some(preferred))
            .or_else(|| self.cameras.first())
            .map(|c| c.id.clone());

        match camera_id {
            Some(id) => {
                if let Err(e) = self.open_camera(&id) {
                    log::error!("Failed to open camera {}: {}", id, e);
                }
            }
            None => log::error!("No cameras available"),
        }
    }

    fn enumerate(&self) -> Result<Vec<CameraDeviceInfo>, CameraError> {
        let mut cameras = Vec::new();
        for id in self.hal.camera_ids()? {
            match self.hal.characteristics(&id) {
                Ok(chars) => cameras.push(chars.to_device_info(&id)),
                Err(e) => log::warn!("Skipping camera {}: {}", id, e),
            }
        }
        Ok(cameras)
    }

    /// Allocate the still reader for `camera_id` and begin opening it
    fn open_camera(&mut self, camera_id: &str) -> Result<(), CameraError> {
        let chars = self.hal.characteristics(camera_id)?;
        let size = chars.largest_jpeg_size(self.config.camera.default_jpeg_size());
        let reader = self.hal.new_image_reader(
            size,
            self.config.camera.max_images,
            ImageAvailableHandler::new(self.sink.clone()),
        )?;
        log::info!(
            "Camera {} still size {}, flash {}",
            camera_id,
            size,
            chars.flash_available
        );

        self.devices.open(
            self.hal.as_ref(),
            camera_id,
            DeviceStateHandler::new(self.sink.clone()),
        )?;
        self.characteristics = Some(chars);
        self.reader = Some(reader);
        Ok(())
    }

    fn create_session(&mut self) {
        if self.capture_in_progress() {
            log::warn!("Preview session replaced during capture, abandoning capture");
            self.finish(None);
            self.machine.reset();
        }
        let device = self.devices.device().cloned();
        let reader = self.reader.clone();
        if let Err(e) =
            self.preview
                .create_preview_session(device.as_ref(), reader.as_ref(), &self.sink)
        {
            log::error!("Failed to create preview session: {}", e);
        }
    }

    /// Session handles died with the device
    fn abandon_session(&mut self, reason: &str) {
        self.preview.invalidate();
        if self.capture_in_progress() {
            log::warn!("{}, abandoning capture", reason);
            self.finish(None);
        }
        self.machine.reset();
    }

    fn finish(&mut self, path: Option<PathBuf>) {
        if let Some(callback) = self.pending.take() {
            callback(path);
        }
    }

    fn handle_event(&mut self, event: HardwareEvent) {
        log::trace!("Hardware event {:?}", event);
        match event {
            HardwareEvent::DeviceOpened(device) => {
                if self.devices.on_opened(device) {
                    self.create_session();
                }
            }
            HardwareEvent::DeviceDisconnected(device) => {
                self.devices.on_disconnected(device);
                self.abandon_session("Camera disconnected");
            }
            HardwareEvent::DeviceError(device, code) => {
                self.devices.on_error(device, code);
                self.abandon_session("Camera error");
            }
            HardwareEvent::DeviceClosed(id) => {
                log::debug!("Camera {} closed", id);
            }
            HardwareEvent::SessionConfigured {
                generation,
                session,
            } => {
                if self.devices.device().is_none() {
                    log::debug!("Session configured without a device, closing");
                    session.close();
                    return;
                }
                let flash = self.flash_settings();
                let handler = self.preview_handler();
                match self.preview.on_configured(generation, session, flash, handler) {
                    Ok(true) if !self.preview_running => {
                        if let Err(e) = self.preview.stop_repeating() {
                            log::warn!("Failed to stop preview: {}", e);
                        }
                    }
                    Ok(_) => {}
                    Err(e) => log::error!("Failed to start preview: {}", e),
                }
            }
            HardwareEvent::SessionConfigureFailed { generation } => {
                self.preview.on_configure_failed(generation);
            }
            HardwareEvent::CaptureProgressed {
                kind: RequestKind::Preview,
                result,
            }
            | HardwareEvent::CaptureCompleted {
                kind: RequestKind::Preview,
                result,
            } => self.process_result(result),
            HardwareEvent::CaptureProgressed {
                kind: RequestKind::Still,
                ..
            } => {}
            HardwareEvent::CaptureCompleted {
                kind: RequestKind::Still,
                result,
            } => {
                log::info!("Still capture completed (frame {})", result.frame_number);
                self.unlock_focus();
            }
            HardwareEvent::CaptureFailed {
                kind: RequestKind::Still,
                failure,
            } => {
                log::warn!("Still capture failed: {}", failure.reason);
                self.finish(None);
                self.unlock_focus();
            }
            HardwareEvent::CaptureFailed {
                kind: RequestKind::Preview,
                failure,
            } => {
                log::warn!(
                    "Preview capture {} failed: {}",
                    failure.frame_number,
                    failure.reason
                );
            }
            HardwareEvent::ImageAvailable(reader) => match self.pending.take() {
                Some(callback) => {
                    callback(self.writer.on_image_available(reader.as_ref()));
                    self.rebuild_if_pending();
                }
                None => {
                    log::warn!("Image arrived with no capture pending, discarding");
                    self.writer.discard(reader.as_ref());
                }
            },
        }
    }

    fn process_result(&mut self, result: CaptureResult) {
        match self.machine.process(&result) {
            Some(CaptureAction::CaptureStill) => self.capture_still(),
            Some(CaptureAction::RunPrecapture) => {
                let handler = self.preview_handler();
                if let Err(e) = self.preview.trigger_precapture(handler) {
                    log::error!("Failed to run precapture: {}", e);
                    self.finish(None);
                    self.unlock_focus();
                }
            }
            None => {}
        }
    }

    fn capture_still(&mut self) {
        let request = match (self.devices.device(), &self.reader) {
            (Some(device), Some(reader)) => {
                session::build_still_request(device.as_ref(), reader.as_ref(), self.flash_settings())
            }
            _ => Err(CameraError::DeviceUnavailable(
                "Camera device unavailable".to_string(),
            )),
        };
        let handler = CaptureResultHandler::new(self.sink.clone(), RequestKind::Still);
        let issued = request.and_then(|request| self.preview.capture_still(request, handler));

        if let Err(e) = issued {
            log::error!("Failed to issue still capture: {}", e);
            self.finish(None);
            self.unlock_focus();
        }
    }

    /// Cancel the AF lock and resume the preview
    fn unlock_focus(&mut self) {
        if self.preview.session().is_some() {
            let handler = self.preview_handler();
            if let Err(e) = self.preview.trigger_autofocus(AfTrigger::Cancel, handler) {
                log::warn!("Failed to cancel autofocus: {}", e);
            }
        }
        self.machine.reset();
        if !self.rebuild_if_pending() {
            self.resume_preview();
        }
    }

    /// Apply a session rebuild deferred by a flash change during capture.
    /// Waits for the still image too, since a rebuild abandons it.
    fn rebuild_if_pending(&mut self) -> bool {
        if !self.rebuild_pending || self.capture_in_progress() {
            return false;
        }
        self.rebuild_pending = false;
        self.create_session();
        true
    }

    fn resume_preview(&mut self) {
        if !self.preview_running || self.preview.session().is_none() {
            return;
        }
        let flash = self.flash_settings();
        let handler = self.preview_handler();
        if let Err(e) = self.preview.resume_repeating(flash, handler) {
            log::error!("Failed to resume preview: {}", e);
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Initialize => self.initialize().await,
            Command::SurfaceAvailable(surface) => {
                log::info!("Preview surface available ({})", surface.size);
                self.preview.set_surface(surface);
                self.create_session();
            }
            Command::SurfaceDestroyed => {
                log::info!("Preview surface destroyed");
                self.preview.clear_surface();
                if self.capture_in_progress() {
                    self.finish(None);
                    self.machine.reset();
                }
                self.preview.close();
            }
            Command::LockFocus { callback, reply } => {
                let status = self.lock_focus();
                if status.is_started() {
                    self.pending = Some(callback);
                } else {
                    log::warn!("Lock focus refused: {:?}", status);
                    callback(None);
                }
                let _ = reply.send(status);
            }
            Command::SetFlashMode { enabled, reply } => {
                let _ = reply.send(self.set_flash_mode(enabled));
            }
            Command::SetTorchMode { enabled, reply } => {
                let _ = reply.send(self.set_torch_mode(enabled));
            }
            Command::SetDevicePosition { facing, reply } => {
                let _ = reply.send(self.set_device_position(facing));
            }
            Command::StartPreview { reply } => {
                let _ = reply.send(self.set_preview_running(true));
            }
            Command::StopPreview { reply } => {
                let _ = reply.send(self.set_preview_running(false));
            }
            Command::Status { reply } => {
                let _ = reply.send(self.status());
            }
            // Handled by the event loop
            Command::Sync { reply } => {
                let _ = reply.send(false);
            }
            Command::Shutdown { reply } => {
                self.shutdown();
                if let Some(reply) = reply {
                    let _ = reply.send(());
                }
            }
        }
    }

    fn lock_focus(&mut self) -> LockFocusStatus {
        if self.devices.device().is_none() {
            return LockFocusStatus::NoDevice;
        }
        if self.preview.session().is_none() {
            return LockFocusStatus::NoSession;
        }
        if self.capture_in_progress() {
            return LockFocusStatus::Busy;
        }
        // Only the repeating request keeps reporting AF and AE progress
        if !self.preview_running {
            log::warn!("Preview is stopped, start it before taking a picture");
            return LockFocusStatus::NoSession;
        }

        let handler = self.preview_handler();
        if let Err(e) = self.preview.trigger_autofocus(AfTrigger::Start, handler) {
            log::error!("Failed to trigger autofocus: {}", e);
            return LockFocusStatus::NoSession;
        }
        match self.machine.begin_lock() {
            Ok(()) => LockFocusStatus::Started,
            Err(_) => LockFocusStatus::Busy,
        }
    }

    fn set_flash_mode(&mut self, enabled: bool) -> bool {
        let supported = self.flash_supported();
        if enabled && !supported {
            log::error!("Flash is not supported on this camera");
        }
        self.flash_enabled = enabled;

        if self.capture_in_progress() {
            self.rebuild_pending = true;
        } else {
            self.create_session();
        }
        enabled && supported
    }

    fn set_torch_mode(&mut self, enabled: bool) -> bool {
        if !self.flash_supported() {
            if enabled {
                log::error!("Torch is not supported on this camera");
            }
            self.torch_enabled = false;
            return false;
        }
        self.torch_enabled = enabled;
        if !self.capture_in_progress() {
            self.resume_preview();
        }
        enabled
    }

    fn set_device_position(&mut self, facing: LensFacing) -> bool {
        let target = match self.cameras.iter().find(|c| c.facing == Some(facing)) {
            Some(camera) => camera.id.clone(),
            None => {
                log::error!("No {} camera available", facing);
                return false;
            }
        };
        if self.devices.camera_id() == Some(target.as_str()) {
            return true;
        }
        if self.capture_in_progress() || self.devices.is_open_in_flight() {
            log::warn!("Cannot switch camera while busy");
            return false;
        }

        log::info!("Switching to {} camera {}", facing, target);
        self.preview.close();
        if let Err(e) = self.devices.close() {
            log::error!("Failed to close camera: {}", e);
            return false;
        }
        self.torch_enabled = false;
        self.reader = None;
        self.characteristics = None;

        match self.open_camera(&target) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to open camera {}: {}", target, e);
                false
            }
        }
    }

    fn set_preview_running(&mut self, running: bool) -> Result<(), CameraError> {
        if self.devices.device().is_none() {
            log::error!("Camera device unavailable");
            return Err(CameraError::DeviceUnavailable(
                "Camera device unavailable".to_string(),
            ));
        }
        self.preview_running = running;
        if running {
            if !self.capture_in_progress() {
                self.resume_preview();
            }
            Ok(())
        } else {
            self.preview.stop_repeating()
        }
    }

    fn status(&self) -> ControllerStatus {
        let facing = self.characteristics.as_ref().and_then(|c| c.facing);
        ControllerStatus {
            state: self.machine.state(),
            cameras: self.cameras.clone(),
            camera_id: self.devices.camera_id().map(str::to_string),
            facing,
            device_open: self.devices.device().is_some(),
            session_ready: self.preview.session().is_some(),
            flash_supported: self.flash_supported(),
            flash_enabled: self.flash_enabled && self.flash_supported(),
            torch_enabled: self.torch_enabled,
            preview_running: self.preview_running,
            capture_pending: self.pending.is_some(),
            jpeg_size: self.reader.as_ref().map(|r| r.surface().size),
        }
    }

    fn shutdown(&mut self) {
        log::info!("Shutting down camera controller");
        self.finish(None);
        self.machine.reset();
        self.preview.close();
        if let Err(e) = self.devices.close() {
            log::error!("Failed to close camera: {}", e);
        }
        self.reader = None;
    }
}
