//! Image Reader / Writer
//!
//! Pulls the still out of the reader and writes it to storage. The acquired
//! image is closed exactly once whatever happens afterwards, since an unclosed
//! image holds a reader slot and stalls every later capture.

use super::hal::{Image, ImageReader};
use crate::config::StorageConfig;
use crate::permissions::{PermissionKind, PermissionProvider};
use crate::storage;
use chrono::Local;
use std::path::PathBuf;
use std::sync::Arc;

/// Closes the wrapped image when dropped
struct ImageGuard(Option<Box<dyn Image>>);

impl ImageGuard {
    fn jpeg_plane(&self) -> Option<Vec<u8>> {
        self.0
            .as_ref()
            .and_then(|image| image.planes().first())
            .map(|plane| plane.to_vec())
    }
}

impl Drop for ImageGuard {
    fn drop(&mut self) {
        if let Some(image) = self.0.take() {
            image.close();
        }
    }
}

pub struct ImageWriter {
    storage: StorageConfig,
    permissions: Arc<dyn PermissionProvider>,
}

impl ImageWriter {
    pub fn new(storage: StorageConfig, permissions: Arc<dyn PermissionProvider>) -> Self {
        Self {
            storage,
            permissions,
        }
    }

    /// Write the latest image to storage. `None` on any failure.
    pub fn on_image_available(&self, reader: &dyn ImageReader) -> Option<PathBuf> {
        let bytes = {
            let image = match reader.acquire_latest_image() {
                Ok(Some(image)) => ImageGuard(Some(image)),
                Ok(None) => {
                    log::warn!("Image available but reader returned none");
                    return None;
                }
                Err(e) => {
                    log::error!("Failed to acquire image: {}", e);
                    return None;
                }
            };
            match image.jpeg_plane() {
                Some(bytes) if !bytes.is_empty() => bytes,
                _ => {
                    log::error!("Acquired image has no JPEG data");
                    return None;
                }
            }
        };

        let write_granted = self
            .permissions
            .check(PermissionKind::WriteStorage)
            .is_granted();
        let path = match storage::prepare_photo_path(&self.storage, write_granted, Local::now()) {
            Ok(path) => path,
            Err(e) => {
                log::error!("Failed to prepare photo path: {}", e);
                return None;
            }
        };

        match storage::write_photo(&path, &bytes) {
            Ok(()) => {
                log::info!("Saved photo to {:?} ({} bytes)", path, bytes.len());
                Some(path)
            }
            Err(e) => {
                log::error!("Failed to save photo: {}", e);
                None
            }
        }
    }

    /// Acquire and close the latest image without writing it
    pub fn discard(&self, reader: &dyn ImageReader) {
        match reader.acquire_latest_image() {
            Ok(image) => drop(ImageGuard(image)),
            Err(e) => log::warn!("Failed to acquire image for discard: {}", e),
        }
    }
}
