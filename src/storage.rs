//! Output location and naming for captured stills
//!
//! Stills go to `<public_root>/<album_name>/` when storage write permission is
//! granted and a public root is configured, otherwise to the app-private
//! directory. File names are `<prefix><timestamp>.jpg`.

use crate::config::StorageConfig;
use crate::errors::CameraError;
use bytes::Bytes;
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};

/// Build the file name for a still taken at `now`
pub fn photo_file_name(storage: &StorageConfig, now: DateTime<Local>) -> String {
    format!(
        "{}{}.jpg",
        storage.file_prefix,
        now.format(&storage.timestamp_format)
    )
}

/// Directory stills are written to, without touching the filesystem
pub fn output_directory(storage: &StorageConfig, write_granted: bool) -> PathBuf {
    match (&storage.public_root, write_granted) {
        (Some(root), true) => root.join(&storage.album_name),
        _ => storage.private_root.clone(),
    }
}

/// Resolve and create the output directory, then return the full file path
pub fn prepare_photo_path(
    storage: &StorageConfig,
    write_granted: bool,
    now: DateTime<Local>,
) -> Result<PathBuf, CameraError> {
    let dir = output_directory(storage, write_granted);
    ensure_directory(&dir)?;
    Ok(dir.join(photo_file_name(storage, now)))
}

fn ensure_directory(dir: &Path) -> Result<(), CameraError> {
    if dir.is_dir() {
        return Ok(());
    }
    log::debug!("Creating output directory {:?}", dir);
    fs::create_dir_all(dir).map_err(|e| {
        CameraError::StorageError(format!("Failed to create directory {:?}: {}", dir, e))
    })
}

/// Write encoded still bytes to `path`
pub fn write_photo(path: &Path, bytes: &[u8]) -> Result<(), CameraError> {
    fs::write(path, bytes)
        .map_err(|e| CameraError::StorageError(format!("Failed to write {:?}: {}", path, e)))
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Bytes, CameraError> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(image)
        .map_err(|e| CameraError::CaptureError(format!("JPEG encoding failed: {}", e)))?;
    Ok(Bytes::from(buffer))
}

/// Flip a JPEG still horizontally and re-encode it
pub fn mirror_jpeg(jpeg: &[u8], quality: u8) -> Result<Bytes, CameraError> {
    let decoded = image::load_from_memory(jpeg)
        .map_err(|e| CameraError::CaptureError(format!("Failed to decode JPEG: {}", e)))?;
    encode_jpeg(&decoded.fliph().to_rgb8(), quality)
}
