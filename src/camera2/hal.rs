//! Hardware seam for Camera2-style stacks
//!
//! Every call here is non-blocking. Outcomes come back later through the
//! handler passed in, on the controller's event loop. A native binding
//! implements these traits; `simulated::SimulatedCamera2` implements them
//! in-process.

use super::handlers::{
    CaptureResultHandler, DeviceStateHandler, ImageAvailableHandler, SessionStateHandler,
};
use super::metadata::{CameraCharacteristics, CaptureRequest, CaptureRequestBuilder, RequestTemplate, Surface};
use crate::errors::CameraError;
use crate::types::Size;
use bytes::Bytes;
use std::fmt::Debug;
use std::sync::Arc;

/// Camera manager: enumeration and device open
pub trait Camera2Hal: Send + Sync + Debug + 'static {
    /// `PackageManager.FEATURE_CAMERA`
    fn has_camera_feature(&self) -> bool;

    fn camera_ids(&self) -> Result<Vec<String>, CameraError>;

    fn characteristics(&self, camera_id: &str) -> Result<CameraCharacteristics, CameraError>;

    /// Begin opening `camera_id`; exactly one of `on_opened`, `on_error` or
    /// `on_disconnected` follows on `handler`.
    fn open_camera(&self, camera_id: &str, handler: DeviceStateHandler) -> Result<(), CameraError>;

    /// Allocate a JPEG reader holding at most `max_images` undelivered images
    fn new_image_reader(
        &self,
        size: Size,
        max_images: usize,
        listener: ImageAvailableHandler,
    ) -> Result<Arc<dyn ImageReader>, CameraError>;
}

/// An opened camera
pub trait CameraDevice: Send + Sync + Debug {
    fn id(&self) -> &str;

    fn create_capture_request(
        &self,
        template: RequestTemplate,
    ) -> Result<CaptureRequestBuilder, CameraError>;

    /// Negotiate a session over `outputs`; completion arrives on `handler`
    fn create_capture_session(
        &self,
        outputs: Vec<Surface>,
        handler: SessionStateHandler,
    ) -> Result<(), CameraError>;

    fn close(&self);
}

/// A configured pipeline from the device to a fixed set of surfaces
pub trait CaptureSession: Send + Sync + Debug {
    fn set_repeating_request(
        &self,
        request: CaptureRequest,
        handler: CaptureResultHandler,
    ) -> Result<(), CameraError>;

    fn capture(&self, request: CaptureRequest, handler: CaptureResultHandler)
        -> Result<(), CameraError>;

    fn stop_repeating(&self) -> Result<(), CameraError>;

    fn abort_captures(&self) -> Result<(), CameraError>;

    fn close(&self);
}

/// Source of decoded still images
pub trait ImageReader: Send + Sync + Debug {
    fn surface(&self) -> Surface;

    fn max_images(&self) -> usize;

    /// Latest undelivered image, dropping older ones. The returned image
    /// holds a slot in the reader until it is closed.
    fn acquire_latest_image(&self) -> Result<Option<Box<dyn Image>>, CameraError>;
}

/// A buffer borrowed from an `ImageReader`
pub trait Image: Send {
    fn size(&self) -> Size;

    /// Plane buffers; JPEG images carry a single plane
    fn planes(&self) -> &[Bytes];

    /// Return the buffer to the reader
    fn close(self: Box<Self>);
}
