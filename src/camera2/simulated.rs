//! In-process Camera2 HAL
//!
//! Records every call as a `HalCall` and completes device and session
//! lifecycle callbacks immediately. Capture results are either driven by the
//! caller (`DriveMode::Manual`) or emitted on a timer (`DriveMode::Auto`).
//! Without a script, results follow a simple hardware model: AF locks after
//! an AF trigger, AE reports precapture for two frames after a precapture
//! trigger and is converged otherwise.

use super::hal::{Camera2Hal, CameraDevice, CaptureSession, Image, ImageReader};
use super::handlers::{
    CaptureResultHandler, DeviceStateHandler, ImageAvailableHandler, SessionStateHandler,
};
use super::metadata::{
    AePrecaptureTrigger, AeState, AfState, AfTrigger, CameraCharacteristics, CaptureFailure,
    CaptureRequest, CaptureRequestBuilder, CaptureResult, DeviceErrorCode, RequestTemplate,
    Surface, SurfaceKind,
};
use crate::errors::CameraError;
use crate::testing::synthetic_data::{phone_cameras, synthetic_jpeg};
use crate::types::Size;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

/// Frames reported as `AeState::Precapture` after a precapture trigger
const PRECAPTURE_FRAMES: u8 = 2;

/// A call made into the simulated hardware
#[derive(Debug, Clone, PartialEq)]
pub enum HalCall {
    OpenCamera(String),
    CloseDevice(String),
    NewImageReader { size: Size, max_images: usize },
    CreateSession { camera_id: String, outputs: Vec<Surface> },
    SetRepeating(CaptureRequest),
    Capture(CaptureRequest),
    StopRepeating,
    AbortCaptures,
    CloseSession,
}

/// How preview capture results are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// Only when the caller emits them
    Manual,
    /// One per interval while a preview request is active
    Auto { frame_interval: Duration },
}

#[derive(Debug, Clone)]
pub struct SimulatedOptions {
    pub cameras: Vec<(String, CameraCharacteristics)>,
    pub drive: DriveMode,
    pub has_camera_feature: bool,
    /// Deliver the still image before the still capture completion
    pub image_before_completion: bool,
}

impl Default for SimulatedOptions {
    fn default() -> Self {
        Self {
            cameras: phone_cameras(),
            drive: DriveMode::Manual,
            has_camera_feature: true,
            image_before_completion: false,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    calls: Vec<HalCall>,
    script: VecDeque<CaptureResult>,
    frame_number: u64,
    af_locked: bool,
    precapture_frames: u8,
    open: Option<(Arc<SimulatedDevice>, DeviceStateHandler)>,
    deferred_open: Option<(Arc<SimulatedDevice>, DeviceStateHandler)>,
    defer_opens: bool,
    fail_next_open: Option<DeviceErrorCode>,
    fail_next_session: bool,
    fail_next_still: bool,
    current_session: u64,
    preview_handler: Option<CaptureResultHandler>,
    repeating: bool,
    oneshot_pending: bool,
    reader: Option<Arc<SimulatedImageReader>>,
    ticker_started: bool,
}

impl SimState {
    fn next_frame(&mut self) -> u64 {
        self.frame_number += 1;
        self.frame_number
    }

    fn next_result(&mut self) -> CaptureResult {
        let frame = self.next_frame();
        if let Some(result) = self.script.pop_front() {
            return result.with_frame_number(frame);
        }
        let af = if self.af_locked {
            AfState::FocusedLocked
        } else {
            AfState::PassiveFocused
        };
        let ae = if self.precapture_frames > 0 {
            self.precapture_frames -= 1;
            AeState::Precapture
        } else {
            AeState::Converged
        };
        CaptureResult::new(Some(af), Some(ae)).with_frame_number(frame)
    }

    fn apply_triggers(&mut self, request: &CaptureRequest) {
        match request.af_trigger() {
            Some(AfTrigger::Start) => self.af_locked = true,
            Some(AfTrigger::Cancel) => self.af_locked = false,
            _ => {}
        }
        if request.ae_precapture_trigger() == Some(AePrecaptureTrigger::Start) {
            self.precapture_frames = PRECAPTURE_FRAMES;
        }
    }

    fn active_handler(&self) -> Option<CaptureResultHandler> {
        if self.repeating || self.oneshot_pending {
            self.preview_handler.clone()
        } else {
            None
        }
    }
}

#[derive(Debug)]
struct SimInner {
    options: SimulatedOptions,
    state: Mutex<SimState>,
    next_session_id: AtomicU64,
}

impl SimInner {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Scripted camera hardware
#[derive(Debug, Clone)]
pub struct SimulatedCamera2 {
    inner: Arc<SimInner>,
}

impl Default for SimulatedCamera2 {
    fn default() -> Self {
        Self::new(SimulatedOptions::default())
    }
}

impl SimulatedCamera2 {
    pub fn new(options: SimulatedOptions) -> Self {
        Self {
            inner: Arc::new(SimInner {
                options,
                state: Mutex::new(SimState::default()),
                next_session_id: AtomicU64::new(1),
            }),
        }
    }

    /// Phone layout, results emitted by the caller
    pub fn manual() -> Self {
        Self::default()
    }

    /// Phone layout, results emitted at roughly 30 fps
    pub fn auto() -> Self {
        Self::new(SimulatedOptions {
            drive: DriveMode::Auto {
                frame_interval: Duration::from_millis(33),
            },
            ..SimulatedOptions::default()
        })
    }

    pub fn options(&self) -> &SimulatedOptions {
        &self.inner.options
    }

    pub fn calls(&self) -> Vec<HalCall> {
        self.inner.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.inner.state().calls.clear();
    }

    /// Results returned before the built-in model takes over
    pub fn script(&self, results: impl IntoIterator<Item = CaptureResult>) {
        self.inner.state().script.extend(results);
    }

    pub fn open_camera_id(&self) -> Option<String> {
        self.inner.state().open.as_ref().map(|(d, _)| d.id.clone())
    }

    pub fn is_repeating(&self) -> bool {
        self.inner.state().repeating
    }

    /// Emit the next result to the active preview request
    pub fn emit_frame(&self) -> bool {
        let mut state = self.inner.state();
        let handler = match state.active_handler() {
            Some(handler) => handler,
            None => return false,
        };
        let result = state.next_result();
        state.oneshot_pending = false;
        handler.on_capture_completed(result);
        true
    }

    /// Deliver `result` as a completed preview result
    pub fn emit_result(&self, result: CaptureResult) -> bool {
        let mut state = self.inner.state();
        let handler = match state.preview_handler.clone() {
            Some(handler) => handler,
            None => return false,
        };
        let frame = state.next_frame();
        state.oneshot_pending = false;
        handler.on_capture_completed(result.with_frame_number(frame));
        true
    }

    /// Deliver `result` as a partial preview result
    pub fn emit_partial(&self, result: CaptureResult) -> bool {
        let state = self.inner.state();
        match &state.preview_handler {
            Some(handler) => {
                handler.on_capture_progressed(result.as_partial());
                true
            }
            None => false,
        }
    }

    /// Hold open completions until `complete_open`
    pub fn defer_opens(&self, defer: bool) {
        self.inner.state().defer_opens = defer;
    }

    pub fn complete_open(&self) -> bool {
        let (device, handler) = {
            let mut state = self.inner.state();
            match state.deferred_open.take() {
                Some((device, handler)) => {
                    state.open = Some((device.clone(), handler.clone()));
                    (device, handler)
                }
                None => return false,
            }
        };
        handler.on_opened(device);
        true
    }

    pub fn fail_next_open(&self, code: DeviceErrorCode) {
        self.inner.state().fail_next_open = Some(code);
    }

    pub fn fail_next_session(&self) {
        self.inner.state().fail_next_session = true;
    }

    pub fn fail_next_still(&self) {
        self.inner.state().fail_next_still = true;
    }

    /// Yank the open device
    pub fn disconnect(&self) -> bool {
        let mut state = self.inner.state();
        match state.open.take() {
            Some((device, handler)) => {
                state.preview_handler = None;
                state.repeating = false;
                handler.on_disconnected(device);
                true
            }
            None => false,
        }
    }

    pub fn device_error(&self, code: DeviceErrorCode) -> bool {
        let mut state = self.inner.state();
        match state.open.take() {
            Some((device, handler)) => {
                state.preview_handler = None;
                state.repeating = false;
                handler.on_error(device, code);
                true
            }
            None => false,
        }
    }

    /// (images acquired, images closed) on the current reader
    pub fn reader_stats(&self) -> (usize, usize) {
        match &self.inner.state().reader {
            Some(reader) => (
                reader.acquired.load(Ordering::SeqCst),
                reader.closed.load(Ordering::SeqCst),
            ),
            None => (0, 0),
        }
    }

    fn start_ticker(&self, state: &mut SimState) {
        let frame_interval = match self.inner.options.drive {
            DriveMode::Auto { frame_interval } => frame_interval,
            DriveMode::Manual => return,
        };
        if state.ticker_started {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                log::warn!("No tokio runtime, simulated frames will not be emitted");
                return;
            }
        };
        state.ticker_started = true;

        let weak = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            let mut interval = tokio::time::interval(frame_interval);
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(inner) => {
                        SimulatedCamera2 { inner }.emit_frame();
                    }
                    None => break,
                }
            }
            log::debug!("Simulated frame ticker stopped");
        });
    }
}

impl Camera2Hal for SimulatedCamera2 {
    fn has_camera_feature(&self) -> bool {
        self.inner.options.has_camera_feature
    }

    fn camera_ids(&self) -> Result<Vec<String>, CameraError> {
        Ok(self
            .inner
            .options
            .cameras
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn characteristics(&self, camera_id: &str) -> Result<CameraCharacteristics, CameraError> {
        self.inner
            .options
            .cameras
            .iter()
            .find(|(id, _)| id == camera_id)
            .map(|(_, chars)| chars.clone())
            .ok_or_else(|| CameraError::DeviceUnavailable(format!("Unknown camera {}", camera_id)))
    }

    fn open_camera(&self, camera_id: &str, handler: DeviceStateHandler) -> Result<(), CameraError> {
        self.characteristics(camera_id)?;

        let device = Arc::new(SimulatedDevice {
            id: camera_id.to_string(),
            inner: Arc::downgrade(&self.inner),
            closed: AtomicBool::new(false),
        });

        // Handlers may call back into the device, so they run unlocked
        let mut state = self.inner.state();
        state.calls.push(HalCall::OpenCamera(camera_id.to_string()));
        let failure = state.fail_next_open.take();
        if let Some(code) = failure {
            drop(state);
            handler.on_error(device, code);
        } else if state.defer_opens {
            state.deferred_open = Some((device, handler));
        } else {
            state.open = Some((device.clone(), handler.clone()));
            drop(state);
            handler.on_opened(device);
        }
        Ok(())
    }

    fn new_image_reader(
        &self,
        size: Size,
        max_images: usize,
        listener: ImageAvailableHandler,
    ) -> Result<Arc<dyn ImageReader>, CameraError> {
        let reader = Arc::new(SimulatedImageReader {
            surface: Surface::new(SurfaceKind::ImageReader, size),
            max_images,
            queue: Mutex::new(VecDeque::new()),
            outstanding: Arc::new(AtomicUsize::new(0)),
            acquired: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            listener,
        });
        let mut state = self.inner.state();
        state.calls.push(HalCall::NewImageReader { size, max_images });
        state.reader = Some(reader.clone());
        Ok(reader)
    }
}

#[derive(Debug)]
struct SimulatedDevice {
    id: String,
    inner: Weak<SimInner>,
    closed: AtomicBool,
}

impl SimulatedDevice {
    fn inner(&self) -> Result<Arc<SimInner>, CameraError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CameraError::DeviceError(format!(
                "Camera {} is closed",
                self.id
            )));
        }
        self.inner
            .upgrade()
            .ok_or_else(|| CameraError::DeviceUnavailable("Camera service gone".to_string()))
    }
}

impl CameraDevice for SimulatedDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn create_capture_request(
        &self,
        template: RequestTemplate,
    ) -> Result<CaptureRequestBuilder, CameraError> {
        self.inner()?;
        Ok(CaptureRequestBuilder::new(template))
    }

    fn create_capture_session(
        &self,
        outputs: Vec<Surface>,
        handler: SessionStateHandler,
    ) -> Result<(), CameraError> {
        let inner = self.inner()?;
        let mut state = inner.state();
        state.calls.push(HalCall::CreateSession {
            camera_id: self.id.clone(),
            outputs,
        });

        if state.fail_next_session {
            state.fail_next_session = false;
            drop(state);
            handler.on_configure_failed();
            return Ok(());
        }

        let id = inner.next_session_id.fetch_add(1, Ordering::SeqCst);
        state.current_session = id;
        state.preview_handler = None;
        state.repeating = false;
        state.oneshot_pending = false;
        drop(state);
        handler.on_configured(Arc::new(SimulatedSession {
            id,
            inner: Arc::downgrade(&inner),
            closed: AtomicBool::new(false),
        }));
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let inner = match self.inner.upgrade() {
            Some(inner) => inner,
            None => return,
        };
        let mut state = inner.state();
        state.calls.push(HalCall::CloseDevice(self.id.clone()));

        let is_open = state
            .open
            .as_ref()
            .map(|(d, _)| d.id == self.id)
            .unwrap_or(false);
        if is_open {
            if let Some((_, handler)) = state.open.take() {
                state.preview_handler = None;
                state.repeating = false;
                state.oneshot_pending = false;
                handler.on_closed(&self.id);
            }
        }
    }
}

#[derive(Debug)]
struct SimulatedSession {
    id: u64,
    inner: Weak<SimInner>,
    closed: AtomicBool,
}

impl SimulatedSession {
    fn inner(&self) -> Result<Arc<SimInner>, CameraError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CameraError::DeviceError(
                "Capture session is closed".to_string(),
            ));
        }
        self.inner
            .upgrade()
            .ok_or_else(|| CameraError::DeviceUnavailable("Camera service gone".to_string()))
    }

    fn deliver_still(inner: &Arc<SimInner>, state: &mut SimState, handler: CaptureResultHandler) {
        let frame = state.next_frame();
        if state.fail_next_still {
            state.fail_next_still = false;
            handler.on_capture_failed(CaptureFailure {
                frame_number: frame,
                reason: "Simulated capture failure".to_string(),
            });
            return;
        }

        let reader = match state.reader.clone() {
            Some(reader) => reader,
            None => {
                handler.on_capture_failed(CaptureFailure {
                    frame_number: frame,
                    reason: "No image reader".to_string(),
                });
                return;
            }
        };
        let jpeg = match synthetic_jpeg(frame, reader.surface.size) {
            Ok(jpeg) => jpeg,
            Err(e) => {
                handler.on_capture_failed(CaptureFailure {
                    frame_number: frame,
                    reason: e.to_string(),
                });
                return;
            }
        };
        reader.push(jpeg);

        let result =
            CaptureResult::new(Some(AfState::FocusedLocked), Some(AeState::Converged))
                .with_frame_number(frame);
        if inner.options.image_before_completion {
            reader.notify();
            handler.on_capture_completed(result);
        } else {
            handler.on_capture_completed(result);
            reader.notify();
        }
    }
}

impl CaptureSession for SimulatedSession {
    fn set_repeating_request(
        &self,
        request: CaptureRequest,
        handler: CaptureResultHandler,
    ) -> Result<(), CameraError> {
        let inner = self.inner()?;
        let mut state = inner.state();
        state.apply_triggers(&request);
        state.calls.push(HalCall::SetRepeating(request));
        state.preview_handler = Some(handler);
        state.repeating = true;
        SimulatedCamera2 {
            inner: inner.clone(),
        }
        .start_ticker(&mut state);
        Ok(())
    }

    fn capture(
        &self,
        request: CaptureRequest,
        handler: CaptureResultHandler,
    ) -> Result<(), CameraError> {
        let inner = self.inner()?;
        let mut state = inner.state();
        state.calls.push(HalCall::Capture(request.clone()));

        if request.template() == RequestTemplate::StillCapture {
            Self::deliver_still(&inner, &mut state, handler);
        } else {
            state.apply_triggers(&request);
            state.preview_handler = Some(handler);
            state.oneshot_pending = true;
        }
        Ok(())
    }

    fn stop_repeating(&self) -> Result<(), CameraError> {
        let inner = self.inner()?;
        let mut state = inner.state();
        state.calls.push(HalCall::StopRepeating);
        state.repeating = false;
        Ok(())
    }

    fn abort_captures(&self) -> Result<(), CameraError> {
        let inner = self.inner()?;
        let mut state = inner.state();
        state.calls.push(HalCall::AbortCaptures);
        state.oneshot_pending = false;
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            let mut state = inner.state();
            state.calls.push(HalCall::CloseSession);
            if state.current_session == self.id {
                state.preview_handler = None;
                state.repeating = false;
                state.oneshot_pending = false;
            }
        }
    }
}

#[derive(Debug)]
struct SimulatedImageReader {
    surface: Surface,
    max_images: usize,
    queue: Mutex<VecDeque<Bytes>>,
    outstanding: Arc<AtomicUsize>,
    acquired: AtomicUsize,
    closed: Arc<AtomicUsize>,
    listener: ImageAvailableHandler,
}

impl SimulatedImageReader {
    fn push(&self, jpeg: Bytes) {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.push_back(jpeg);
        while queue.len() > self.max_images {
            queue.pop_front();
        }
    }

    fn notify(self: &Arc<Self>) {
        self.listener
            .on_image_available(self.clone() as Arc<dyn ImageReader>);
    }
}

impl ImageReader for SimulatedImageReader {
    fn surface(&self) -> Surface {
        self.surface
    }

    fn max_images(&self) -> usize {
        self.max_images
    }

    fn acquire_latest_image(&self) -> Result<Option<Box<dyn Image>>, CameraError> {
        if self.outstanding.load(Ordering::SeqCst) >= self.max_images {
            return Err(CameraError::CaptureError(format!(
                "maxImages ({}) has already been acquired",
                self.max_images
            )));
        }
        let latest = {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            let latest = queue.pop_back();
            queue.clear();
            latest
        };
        Ok(latest.map(|jpeg| {
            self.outstanding.fetch_add(1, Ordering::SeqCst);
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Box::new(SimulatedImage {
                size: self.surface.size,
                planes: vec![jpeg],
                outstanding: self.outstanding.clone(),
                closed: self.closed.clone(),
            }) as Box<dyn Image>
        }))
    }
}

struct SimulatedImage {
    size: Size,
    planes: Vec<Bytes>,
    outstanding: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl Image for SimulatedImage {
    fn size(&self) -> Size {
        self.size
    }

    fn planes(&self) -> &[Bytes] {
        &self.planes
    }

    fn close(self: Box<Self>) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera2::handlers::{EventSink, HardwareEvent, Message};
    use tokio::sync::mpsc;

    fn sink() -> (EventSink, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventSink::new(tx, Arc::new(AtomicUsize::new(0))), rx)
    }

    #[test]
    fn test_unknown_camera_is_rejected() {
        let sim = SimulatedCamera2::manual();
        let (sink, _rx) = sink();
        let result = sim.open_camera("9", DeviceStateHandler::new(sink));
        assert!(matches!(result, Err(CameraError::DeviceUnavailable(_))));
        assert!(sim.calls().is_empty());
    }

    #[test]
    fn test_open_completes_immediately() {
        let sim = SimulatedCamera2::manual();
        let (sink, mut rx) = sink();
        sim.open_camera("0", DeviceStateHandler::new(sink)).unwrap();

        assert!(matches!(
            rx.try_recv(),
            Ok(Message::Hardware(HardwareEvent::DeviceOpened(_)))
        ));
        assert_eq!(sim.open_camera_id(), Some("0".to_string()));
        assert_eq!(sim.calls(), vec![HalCall::OpenCamera("0".to_string())]);
    }

    #[test]
    fn test_deferred_open() {
        let sim = SimulatedCamera2::manual();
        sim.defer_opens(true);
        let (sink, mut rx) = sink();
        sim.open_camera("1", DeviceStateHandler::new(sink)).unwrap();
        assert!(rx.try_recv().is_err());

        assert!(sim.complete_open());
        assert!(matches!(
            rx.try_recv(),
            Ok(Message::Hardware(HardwareEvent::DeviceOpened(_)))
        ));
        assert!(!sim.complete_open());
    }

    #[test]
    fn test_reader_limits_outstanding_images() {
        let sim = SimulatedCamera2::manual();
        let (sink, _rx) = sink();
        let reader = sim
            .new_image_reader(Size::new(16, 16), 1, ImageAvailableHandler::new(sink))
            .unwrap();
        let state = sim.inner.state();
        let concrete = state.reader.clone().unwrap();
        drop(state);

        concrete.push(Bytes::from_static(&[1]));
        concrete.push(Bytes::from_static(&[2]));
        let image = reader.acquire_latest_image().unwrap().unwrap();
        assert_eq!(image.planes()[0].as_ref(), &[2]);

        concrete.push(Bytes::from_static(&[3]));
        assert!(reader.acquire_latest_image().is_err());

        image.close();
        assert!(reader.acquire_latest_image().unwrap().is_some());
        assert_eq!(sim.reader_stats(), (2, 1));
    }

    #[test]
    fn test_default_model_locks_after_trigger() {
        let mut state = SimState::default();
        let unlocked = state.next_result();
        assert_eq!(unlocked.af_state, Some(AfState::PassiveFocused));

        let mut builder = CaptureRequestBuilder::new(RequestTemplate::Preview);
        builder
            .set_af_trigger(AfTrigger::Start)
            .set_ae_precapture_trigger(AePrecaptureTrigger::Start);
        state.apply_triggers(&builder.build());

        let first = state.next_result();
        assert_eq!(first.af_state, Some(AfState::FocusedLocked));
        assert_eq!(first.ae_state, Some(AeState::Precapture));
        state.next_result();
        assert_eq!(state.next_result().ae_state, Some(AeState::Converged));
        assert!(state.next_result().frame_number > first.frame_number);
    }
}
