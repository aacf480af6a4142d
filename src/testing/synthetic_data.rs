//! Synthetic stills and capture-result scripts
//!
//! Lets the capture pipeline run end to end without camera hardware.

use crate::camera2::metadata::{AeState, AfState, CameraCharacteristics, CaptureResult};
use crate::errors::CameraError;
use crate::platform::StillSource;
use crate::storage::encode_jpeg;
use crate::types::{CameraDeviceInfo, LensFacing, Size};
use bytes::Bytes;
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Gradient frame that changes with `frame_number`. The left half is
/// brighter than the right so horizontal flips are detectable.
pub fn synthetic_rgb_frame(frame_number: u64, size: Size) -> RgbImage {
    let base = (frame_number % 256) as u8;
    let half = size.width / 2;
    RgbImage::from_fn(size.width, size.height, |x, y| {
        let boost = if x < half { 128 } else { 0 };
        Rgb([
            base.wrapping_add((x % 128) as u8).saturating_add(boost),
            base.wrapping_add((y % 256) as u8),
            base.wrapping_add(((x + y) % 256) as u8),
        ])
    })
}

/// JPEG still of a synthetic frame
pub fn synthetic_jpeg(frame_number: u64, size: Size) -> Result<Bytes, CameraError> {
    encode_jpeg(&synthetic_rgb_frame(frame_number, size), 85)
}

/// A phone with a flash-equipped back camera "0" and a front camera "1"
pub fn phone_cameras() -> Vec<(String, CameraCharacteristics)> {
    vec![
        (
            "0".to_string(),
            CameraCharacteristics {
                facing: Some(LensFacing::Back),
                flash_available: true,
                jpeg_sizes: vec![Size::new(640, 480), Size::new(320, 240)],
            },
        ),
        (
            "1".to_string(),
            CameraCharacteristics {
                facing: Some(LensFacing::Front),
                flash_available: false,
                jpeg_sizes: vec![Size::new(320, 240)],
            },
        ),
    ]
}

/// `StillSource` producing synthetic stills for every camera in
/// `phone_cameras`
#[derive(Debug, Clone, Default)]
pub struct SyntheticStillSource {
    captures: Arc<AtomicU64>,
    fail_captures: Arc<AtomicBool>,
    exposure: Duration,
}

impl SyntheticStillSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block each capture for `exposure`
    pub fn with_exposure(mut self, exposure: Duration) -> Self {
        self.exposure = exposure;
        self
    }

    pub fn captures(&self) -> u64 {
        self.captures.load(Ordering::SeqCst)
    }

    pub fn fail_captures(&self, fail: bool) {
        self.fail_captures.store(fail, Ordering::SeqCst);
    }
}

impl StillSource for SyntheticStillSource {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn devices(&self) -> Result<Vec<CameraDeviceInfo>, CameraError> {
        Ok(phone_cameras()
            .into_iter()
            .map(|(id, chars)| chars.to_device_info(&id))
            .collect())
    }

    fn capture_jpeg(&self, device: &CameraDeviceInfo, _flash: bool) -> Result<Bytes, CameraError> {
        if !self.exposure.is_zero() {
            std::thread::sleep(self.exposure);
        }
        if self.fail_captures.load(Ordering::SeqCst) {
            return Err(CameraError::CaptureError(
                "Synthetic capture failure".to_string(),
            ));
        }
        let frame = self.captures.fetch_add(1, Ordering::SeqCst);
        let size = device.jpeg_sizes.first().copied().unwrap_or(Size::new(320, 240));
        synthetic_jpeg(frame, size)
    }

    fn set_torch(&self, _device: &CameraDeviceInfo, enabled: bool) -> Result<bool, CameraError> {
        Ok(enabled)
    }
}

/// AF locks while AE is still metering: lock, precapture, converge
pub fn precapture_script() -> Vec<CaptureResult> {
    vec![
        CaptureResult::new(Some(AfState::ActiveScan), Some(AeState::Searching)),
        CaptureResult::new(Some(AfState::FocusedLocked), Some(AeState::Searching)),
        CaptureResult::new(Some(AfState::FocusedLocked), Some(AeState::Precapture)),
        CaptureResult::new(Some(AfState::FocusedLocked), Some(AeState::Converged)),
    ]
}

/// Focus and exposure already settled on the first result
pub fn instant_lock_script() -> Vec<CaptureResult> {
    vec![CaptureResult::new(
        Some(AfState::FocusedLocked),
        Some(AeState::Converged),
    )]
}

/// A fixed-focus device that never reports AF state
pub fn fixed_focus_script() -> Vec<CaptureResult> {
    vec![CaptureResult::new(None, Some(AeState::Converged))]
}
