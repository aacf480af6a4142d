//! Named handlers for each asynchronous hardware event source
//!
//! A HAL never calls back into the controller directly. It calls a handler
//! method, the handler posts a `HardwareEvent` onto the controller's queue,
//! and the controller processes events one at a time in arrival order.

use super::controller::Command;
use super::hal::{CameraDevice, CaptureSession, ImageReader};
use super::metadata::{CaptureFailure, CaptureResult, DeviceErrorCode};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Which request a capture callback belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Repeating preview request and one-shot requests built from the
    /// preview builder (AF trigger, precapture trigger, AF cancel)
    Preview,
    /// One-shot still capture into the image reader
    Still,
}

pub enum HardwareEvent {
    DeviceOpened(Arc<dyn CameraDevice>),
    DeviceDisconnected(Arc<dyn CameraDevice>),
    DeviceError(Arc<dyn CameraDevice>, DeviceErrorCode),
    DeviceClosed(String),
    SessionConfigured {
        generation: u64,
        session: Arc<dyn CaptureSession>,
    },
    SessionConfigureFailed {
        generation: u64,
    },
    CaptureProgressed {
        kind: RequestKind,
        result: CaptureResult,
    },
    CaptureCompleted {
        kind: RequestKind,
        result: CaptureResult,
    },
    CaptureFailed {
        kind: RequestKind,
        failure: CaptureFailure,
    },
    ImageAvailable(Arc<dyn ImageReader>),
}

impl fmt::Debug for HardwareEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareEvent::DeviceOpened(d) => write!(f, "DeviceOpened({})", d.id()),
            HardwareEvent::DeviceDisconnected(d) => write!(f, "DeviceDisconnected({})", d.id()),
            HardwareEvent::DeviceError(d, code) => write!(f, "DeviceError({}, {:?})", d.id(), code),
            HardwareEvent::DeviceClosed(id) => write!(f, "DeviceClosed({})", id),
            HardwareEvent::SessionConfigured { generation, .. } => {
                write!(f, "SessionConfigured(gen {})", generation)
            }
            HardwareEvent::SessionConfigureFailed { generation } => {
                write!(f, "SessionConfigureFailed(gen {})", generation)
            }
            HardwareEvent::CaptureProgressed { kind, result } => {
                write!(f, "CaptureProgressed({:?}, {:?})", kind, result)
            }
            HardwareEvent::CaptureCompleted { kind, result } => {
                write!(f, "CaptureCompleted({:?}, {:?})", kind, result)
            }
            HardwareEvent::CaptureFailed { kind, failure } => {
                write!(f, "CaptureFailed({:?}, {:?})", kind, failure)
            }
            HardwareEvent::ImageAvailable(_) => write!(f, "ImageAvailable"),
        }
    }
}

pub(crate) enum Message {
    Hardware(HardwareEvent),
    Command(Command),
}

/// Producer side of the controller's event queue
#[derive(Clone)]
pub struct EventSink {
    tx: UnboundedSender<Message>,
    queued: Arc<AtomicUsize>,
}

impl EventSink {
    pub(crate) fn new(tx: UnboundedSender<Message>, queued: Arc<AtomicUsize>) -> Self {
        Self { tx, queued }
    }

    /// Queue a message; hands it back when the loop has stopped
    pub(crate) fn send(&self, message: Message) -> Result<(), Message> {
        self.queued.fetch_add(1, Ordering::SeqCst);
        self.tx.send(message).map_err(|e| {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            e.0
        })
    }

    /// Returns the event when the controller is gone
    fn post(&self, event: HardwareEvent) -> Option<HardwareEvent> {
        match self.send(Message::Hardware(event)) {
            Ok(()) => None,
            Err(Message::Hardware(event)) => {
                log::debug!("Controller gone, dropping {:?}", event);
                Some(event)
            }
            Err(Message::Command(_)) => None,
        }
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSink")
            .field("queued", &self.queued.load(Ordering::SeqCst))
            .finish()
    }
}

/// `CameraDevice.StateCallback`
#[derive(Debug, Clone)]
pub struct DeviceStateHandler {
    sink: EventSink,
}

impl DeviceStateHandler {
    pub(crate) fn new(sink: EventSink) -> Self {
        Self { sink }
    }

    /// A device delivered after the controller stopped is closed here
    pub fn on_opened(&self, device: Arc<dyn CameraDevice>) {
        if let Some(HardwareEvent::DeviceOpened(device)) =
            self.sink.post(HardwareEvent::DeviceOpened(device))
        {
            device.close();
        }
    }

    pub fn on_disconnected(&self, device: Arc<dyn CameraDevice>) {
        self.sink.post(HardwareEvent::DeviceDisconnected(device));
    }

    pub fn on_error(&self, device: Arc<dyn CameraDevice>, code: DeviceErrorCode) {
        self.sink.post(HardwareEvent::DeviceError(device, code));
    }

    pub fn on_closed(&self, camera_id: &str) {
        self.sink.post(HardwareEvent::DeviceClosed(camera_id.to_string()));
    }
}

/// `CameraCaptureSession.StateCallback`, tagged with the session generation
/// it was created for so late callbacks from a replaced session are ignored
#[derive(Debug, Clone)]
pub struct SessionStateHandler {
    sink: EventSink,
    generation: u64,
}

impl SessionStateHandler {
    pub(crate) fn new(sink: EventSink, generation: u64) -> Self {
        Self { sink, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn on_configured(&self, session: Arc<dyn CaptureSession>) {
        if let Some(HardwareEvent::SessionConfigured { session, .. }) =
            self.sink.post(HardwareEvent::SessionConfigured {
                generation: self.generation,
                session,
            })
        {
            session.close();
        }
    }

    pub fn on_configure_failed(&self) {
        self.sink.post(HardwareEvent::SessionConfigureFailed {
            generation: self.generation,
        });
    }
}

/// `CameraCaptureSession.CaptureCallback`
#[derive(Debug, Clone)]
pub struct CaptureResultHandler {
    sink: EventSink,
    kind: RequestKind,
}

impl CaptureResultHandler {
    pub(crate) fn new(sink: EventSink, kind: RequestKind) -> Self {
        Self { sink, kind }
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn on_capture_progressed(&self, partial: CaptureResult) {
        self.sink.post(HardwareEvent::CaptureProgressed {
            kind: self.kind,
            result: partial,
        });
    }

    pub fn on_capture_completed(&self, result: CaptureResult) {
        self.sink.post(HardwareEvent::CaptureCompleted {
            kind: self.kind,
            result,
        });
    }

    pub fn on_capture_failed(&self, failure: CaptureFailure) {
        self.sink.post(HardwareEvent::CaptureFailed {
            kind: self.kind,
            failure,
        });
    }
}

/// `ImageReader.OnImageAvailableListener`
#[derive(Debug, Clone)]
pub struct ImageAvailableHandler {
    sink: EventSink,
}

impl ImageAvailableHandler {
    pub(crate) fn new(sink: EventSink) -> Self {
        Self { sink }
    }

    pub fn on_image_available(&self, reader: Arc<dyn ImageReader>) {
        self.sink.post(HardwareEvent::ImageAvailable(reader));
    }
}
