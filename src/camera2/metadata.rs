//! Capture request and capture result model
//!
//! Mirrors the subset of Camera2 metadata keys the capture sequence reads
//! and writes. Requests are built through `CaptureRequestBuilder` and are
//! immutable once built.

use crate::types::{CameraDeviceInfo, LensFacing, Size};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// `CONTROL_AF_STATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AfState {
    Inactive,
    PassiveScan,
    PassiveFocused,
    ActiveScan,
    FocusedLocked,
    NotFocusedLocked,
    PassiveUnfocused,
}

impl AfState {
    /// Focus has settled after an AF trigger, successfully or not
    pub fn is_locked(&self) -> bool {
        matches!(self, AfState::FocusedLocked | AfState::NotFocusedLocked)
    }
}

/// `CONTROL_AE_STATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AeState {
    Inactive,
    Searching,
    Converged,
    Locked,
    FlashRequired,
    Precapture,
}

/// `CONTROL_AF_MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfMode {
    Off,
    Auto,
    Macro,
    ContinuousVideo,
    ContinuousPicture,
}

/// `CONTROL_AE_MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AeMode {
    Off,
    On,
    OnAutoFlash,
    OnAlwaysFlash,
}

/// `FLASH_MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlashMode {
    Off,
    Single,
    Torch,
}

/// `CONTROL_AF_TRIGGER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfTrigger {
    Idle,
    Start,
    Cancel,
}

/// `CONTROL_AE_PRECAPTURE_TRIGGER`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AePrecaptureTrigger {
    Idle,
    Start,
    Cancel,
}

/// `CONTROL_MODE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    Off,
    Auto,
}

/// Request templates a device can hand out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestTemplate {
    Preview,
    StillCapture,
}

/// What a surface is fed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceKind {
    Preview,
    ImageReader,
}

/// Output target a capture session can write to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Surface {
    pub id: u64,
    pub kind: SurfaceKind,
    pub size: Size,
}

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

impl Surface {
    pub fn new(kind: SurfaceKind, size: Size) -> Self {
        Self {
            id: NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            size,
        }
    }

    pub fn preview(size: Size) -> Self {
        Self::new(SurfaceKind::Preview, size)
    }

    /// Same surface with a different default buffer size
    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }
}

/// Mutable bag of capture parameters
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequestBuilder {
    template: RequestTemplate,
    targets: Vec<Surface>,
    control_mode: Option<ControlMode>,
    af_mode: Option<AfMode>,
    ae_mode: Option<AeMode>,
    flash_mode: Option<FlashMode>,
    af_trigger: Option<AfTrigger>,
    ae_precapture_trigger: Option<AePrecaptureTrigger>,
}

impl CaptureRequestBuilder {
    pub fn new(template: RequestTemplate) -> Self {
        Self {
            template,
            targets: Vec::new(),
            control_mode: None,
            af_mode: None,
            ae_mode: None,
            flash_mode: None,
            af_trigger: None,
            ae_precapture_trigger: None,
        }
    }

    pub fn add_target(&mut self, surface: Surface) -> &mut Self {
        if !self.targets.iter().any(|s| s.id == surface.id) {
            self.targets.push(surface);
        }
        self
    }

    pub fn set_control_mode(&mut self, mode: ControlMode) -> &mut Self {
        self.control_mode = Some(mode);
        self
    }

    pub fn set_af_mode(&mut self, mode: AfMode) -> &mut Self {
        self.af_mode = Some(mode);
        self
    }

    pub fn set_ae_mode(&mut self, mode: AeMode) -> &mut Self {
        self.ae_mode = Some(mode);
        self
    }

    pub fn set_flash_mode(&mut self, mode: FlashMode) -> &mut Self {
        self.flash_mode = Some(mode);
        self
    }

    pub fn set_af_trigger(&mut self, trigger: AfTrigger) -> &mut Self {
        self.af_trigger = Some(trigger);
        self
    }

    pub fn set_ae_precapture_trigger(&mut self, trigger: AePrecaptureTrigger) -> &mut Self {
        self.ae_precapture_trigger = Some(trigger);
        self
    }

    pub fn build(&self) -> CaptureRequest {
        CaptureRequest {
            template: self.template,
            targets: self.targets.clone(),
            control_mode: self.control_mode,
            af_mode: self.af_mode,
            ae_mode: self.ae_mode,
            flash_mode: self.flash_mode,
            af_trigger: self.af_trigger,
            ae_precapture_trigger: self.ae_precapture_trigger,
        }
    }
}

/// Built, immutable capture request
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    template: RequestTemplate,
    targets: Vec<Surface>,
    control_mode: Option<ControlMode>,
    af_mode: Option<AfMode>,
    ae_mode: Option<AeMode>,
    flash_mode: Option<FlashMode>,
    af_trigger: Option<AfTrigger>,
    ae_precapture_trigger: Option<AePrecaptureTrigger>,
}

impl CaptureRequest {
    pub fn template(&self) -> RequestTemplate {
        self.template
    }

    pub fn targets(&self) -> &[Surface] {
        &self.targets
    }

    pub fn targets_kind(&self, kind: SurfaceKind) -> bool {
        self.targets.iter().any(|s| s.kind == kind)
    }

    pub fn control_mode(&self) -> Option<ControlMode> {
        self.control_mode
    }

    pub fn af_mode(&self) -> Option<AfMode> {
        self.af_mode
    }

    pub fn ae_mode(&self) -> Option<AeMode> {
        self.ae_mode
    }

    pub fn flash_mode(&self) -> Option<FlashMode> {
        self.flash_mode
    }

    pub fn af_trigger(&self) -> Option<AfTrigger> {
        self.af_trigger
    }

    pub fn ae_precapture_trigger(&self) -> Option<AePrecaptureTrigger> {
        self.ae_precapture_trigger
    }
}

/// Partial or complete result for one captured frame.
///
/// AF and AE state reporting is optional per device; `None` means the
/// device did not report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub frame_number: u64,
    pub partial: bool,
    pub af_state: Option<AfState>,
    pub ae_state: Option<AeState>,
}

impl CaptureResult {
    pub fn new(af_state: Option<AfState>, ae_state: Option<AeState>) -> Self {
        Self {
            frame_number: 0,
            partial: false,
            af_state,
            ae_state,
        }
    }

    pub fn with_frame_number(mut self, frame_number: u64) -> Self {
        self.frame_number = frame_number;
        self
    }

    pub fn as_partial(mut self) -> Self {
        self.partial = true;
        self
    }
}

/// Why the hardware dropped a capture request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFailure {
    pub frame_number: u64,
    pub reason: String,
}

/// `CameraDevice.StateCallback.ERROR_*`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceErrorCode {
    CameraInUse,
    MaxCamerasInUse,
    CameraDisabled,
    CameraDevice,
    CameraService,
}

/// Static properties of one camera
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCharacteristics {
    pub facing: Option<LensFacing>,
    pub flash_available: bool,
    /// `SCALER_STREAM_CONFIGURATION_MAP` JPEG output sizes, largest first
    pub jpeg_sizes: Vec<Size>,
}

impl CameraCharacteristics {
    /// Largest JPEG output size, or `fallback` when none are reported
    pub fn largest_jpeg_size(&self, fallback: Size) -> Size {
        self.jpeg_sizes.first().copied().unwrap_or(fallback)
    }

    pub fn to_device_info(&self, id: &str) -> CameraDeviceInfo {
        let mut info = CameraDeviceInfo::new(id)
            .with_flash(self.flash_available)
            .with_jpeg_sizes(self.jpeg_sizes.clone());
        info.facing = self.facing;
        info
    }
}
