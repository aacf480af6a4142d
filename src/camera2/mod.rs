//! Camera2 capture pipeline
//!
//! Device open, preview session, focus/exposure lock sequencing and still
//! capture, driven by hardware callbacks on a single event loop.

pub mod controller;
pub mod device;
pub mod hal;
pub mod handlers;
pub mod image_writer;
pub mod metadata;
pub mod session;
pub mod simulated;
pub mod state_machine;

pub use controller::{CameraController, ControllerStatus};
pub use hal::{Camera2Hal, CameraDevice, CaptureSession, Image, ImageReader};
pub use metadata::{
    AeMode, AeState, AfMode, AfState, CameraCharacteristics, CaptureRequest, CaptureResult,
    DeviceErrorCode, FlashMode, Surface, SurfaceKind,
};
pub use simulated::{DriveMode, HalCall, SimulatedCamera2, SimulatedOptions};
pub use state_machine::{CaptureAction, CaptureState, CaptureStateMachine};
