use super::StillSource;
use crate::errors::CameraError;
use crate::storage;
use crate::types::{CameraDeviceInfo, LensFacing, Size};
use bytes::Bytes;
use image::RgbImage;
use nokhwa::{
    pixel_format::RgbFormat,
    query,
    utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType},
    Camera,
};

/// Common webcam still sizes, largest first
const DESKTOP_JPEG_SIZES: [Size; 3] = [
    Size::new(1920, 1080),
    Size::new(1280, 720),
    Size::new(640, 480),
];

/// Desktop webcams through nokhwa. The stream is opened for each still and
/// a few frames are dropped while auto exposure settles.
#[derive(Debug, Clone)]
pub struct NokhwaStillSource {
    jpeg_quality: u8,
    warmup_frames: usize,
}

impl Default for NokhwaStillSource {
    fn default() -> Self {
        Self {
            jpeg_quality: 90,
            warmup_frames: 5,
        }
    }
}

impl NokhwaStillSource {
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn with_warmup_frames(mut self, frames: usize) -> Self {
        self.warmup_frames = frames;
        self
    }

    fn open(&self, device: &CameraDeviceInfo) -> Result<Camera, CameraError> {
        let index = device
            .id
            .parse::<u32>()
            .map_err(|_| CameraError::InitializationError("Invalid device ID".to_string()))?;

        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        Camera::new(CameraIndex::Index(index), requested).map_err(|e| {
            CameraError::InitializationError(format!("Failed to initialize camera: {}", e))
        })
    }

    fn grab_jpeg(&self, camera: &mut Camera) -> Result<Bytes, CameraError> {
        for _ in 0..self.warmup_frames {
            if let Err(e) = camera.frame() {
                log::debug!("Dropping warmup frame: {}", e);
            }
        }

        let frame = camera
            .frame()
            .map_err(|e| CameraError::CaptureError(format!("Failed to capture frame: {}", e)))?;
        let raw = frame.buffer_bytes();
        let width = frame.resolution().width_x;
        let height = frame.resolution().height_y;

        // MJPEG streams already hand out a JPEG
        if raw.len() >= 3 && raw[0] == 0xFF && raw[1] == 0xD8 && raw[2] == 0xFF {
            log::debug!("Using MJPEG frame as still ({} bytes)", raw.len());
            return Ok(Bytes::copy_from_slice(&raw));
        }

        let rgb = RgbImage::from_raw(width, height, raw.to_vec()).ok_or_else(|| {
            CameraError::CaptureError(format!(
                "Frame buffer does not match {}x{} RGB",
                width, height
            ))
        })?;
        storage::encode_jpeg(&rgb, self.jpeg_quality)
    }
}

impl StillSource for NokhwaStillSource {
    fn name(&self) -> &'static str {
        "nokhwa"
    }

    fn devices(&self) -> Result<Vec<CameraDeviceInfo>, CameraError> {
        let cameras = query(ApiBackend::Auto)
            .map_err(|e| CameraError::InitializationError(format!("Failed to query cameras: {}", e)))?;
        log::debug!("Found {} desktop cameras", cameras.len());

        Ok(cameras
            .into_iter()
            .map(|info| {
                CameraDeviceInfo::new(info.index().to_string())
                    .with_name(info.human_name())
                    .with_facing(LensFacing::External)
                    .with_jpeg_sizes(DESKTOP_JPEG_SIZES.to_vec())
            })
            .collect())
    }

    fn capture_jpeg(&self, device: &CameraDeviceInfo, flash: bool) -> Result<Bytes, CameraError> {
        if flash {
            log::warn!("Flash requested on {}, which has none", device.name);
        }

        let mut camera = self.open(device)?;
        camera
            .open_stream()
            .map_err(|e| CameraError::CaptureError(format!("Failed to start stream: {}", e)))?;

        let result = self.grab_jpeg(&mut camera);

        if let Err(e) = camera.stop_stream() {
            log::warn!("Failed to stop stream on {}: {}", device.name, e);
        }
        result
    }
}
