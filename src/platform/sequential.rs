//! Backend for stacks that hand out finished stills
//!
//! AVFoundation-style sources have no convergence reporting to wait on: a
//! still is requested, the source returns JPEG bytes and the backend writes
//! them. Front-camera stills are optionally mirrored to match the preview.

use super::CameraBackend;
use crate::config::{NaCameraConfig, StorageConfig};
use crate::errors::CameraError;
use crate::permissions::{PermissionInfo, PermissionKind, PermissionProvider};
use crate::storage;
use crate::types::{
    CameraCapabilities, CameraDeviceInfo, LensFacing, LockFocusStatus, PhotoCallback, PhotoOptions,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Local;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Quality used when a mirrored still is re-encoded
const MIRROR_JPEG_QUALITY: u8 = 90;

/// Blocking source of JPEG stills
pub trait StillSource: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn devices(&self) -> Result<Vec<CameraDeviceInfo>, CameraError>;

    /// Capture one still; may block for the duration of the exposure
    fn capture_jpeg(&self, device: &CameraDeviceInfo, flash: bool) -> Result<Bytes, CameraError>;

    /// Returns the resulting torch state
    fn set_torch(&self, _device: &CameraDeviceInfo, _enabled: bool) -> Result<bool, CameraError> {
        Err(CameraError::UnsupportedOperation(
            "Torch control is not supported".to_string(),
        ))
    }
}

#[derive(Debug, Default)]
struct SequentialState {
    devices: Vec<CameraDeviceInfo>,
    active: Option<CameraDeviceInfo>,
    running: bool,
    flash: bool,
    torch: bool,
}

pub struct SequentialBackend {
    source: Arc<dyn StillSource>,
    storage: StorageConfig,
    permissions: Arc<dyn PermissionProvider>,
    state: Mutex<SequentialState>,
    capturing: Arc<AtomicBool>,
}

impl SequentialBackend {
    /// Enumerate devices and select the configured facing, falling back to
    /// the first device
    pub fn new(
        source: impl StillSource,
        config: &NaCameraConfig,
        permissions: Arc<dyn PermissionProvider>,
    ) -> Self {
        let devices = source.devices().unwrap_or_else(|e| {
            log::error!("Failed to list cameras on {}: {}", source.name(), e);
            Vec::new()
        });
        let preferred = config.camera.preferred_facing;
        let active = devices
            .iter()
            .find(|d| d.facing == Some(preferred))
            .or_else(|| devices.first())
            .cloned();
        if let Some(device) = &active {
            log::info!("{} selected camera {} ({})", source.name(), device.id, device.name);
        }

        let has_flash = active.as_ref().map(|d| d.has_flash).unwrap_or(false);
        Self {
            state: Mutex::new(SequentialState {
                running: active.is_some(),
                flash: config.camera.flash_enabled && has_flash,
                devices,
                active,
                torch: false,
            }),
            source: Arc::new(source),
            storage: config.storage.clone(),
            permissions,
            capturing: Arc::new(AtomicBool::new(false)),
        }
    }

    fn state(&self) -> MutexGuard<'_, SequentialState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Capture, optionally mirror, and write one still
fn capture_and_store(
    source: &dyn StillSource,
    device: &CameraDeviceInfo,
    flash: bool,
    mirror: bool,
    storage_config: &StorageConfig,
    write_granted: bool,
) -> Result<PathBuf, CameraError> {
    let mut jpeg = source.capture_jpeg(device, flash)?;
    if mirror && device.facing == Some(LensFacing::Front) {
        jpeg = storage::mirror_jpeg(&jpeg, MIRROR_JPEG_QUALITY)?;
    }
    let path = storage::prepare_photo_path(storage_config, write_granted, Local::now())?;
    storage::write_photo(&path, &jpeg)?;
    Ok(path)
}

#[async_trait]
impl CameraBackend for SequentialBackend {
    fn name(&self) -> &'static str {
        self.source.name()
    }

    fn devices_available(&self) -> bool {
        !self.state().devices.is_empty()
    }

    async fn request_permissions(&self) -> PermissionInfo {
        self.permissions.request(&PermissionKind::ALL).await
    }

    async fn capabilities(&self) -> Result<CameraCapabilities, CameraError> {
        let state = self.state();
        let active = state.active.as_ref().ok_or_else(|| {
            CameraError::DeviceUnavailable("Camera device unavailable".to_string())
        })?;

        let mut positions = Vec::new();
        for facing in state.devices.iter().filter_map(|d| d.facing) {
            if !positions.contains(&facing) {
                positions.push(facing);
            }
        }
        Ok(CameraCapabilities {
            has_flash: active.has_flash,
            has_torch: active.has_flash,
            positions,
            jpeg_sizes: active.jpeg_sizes.clone(),
            reports_convergence: false,
        })
    }

    async fn is_ready(&self) -> bool {
        let state = self.state();
        state.active.is_some() && state.running && !self.capturing.load(Ordering::SeqCst)
    }

    async fn start(&self) -> Result<(), CameraError> {
        let mut state = self.state();
        if state.active.is_none() {
            log::error!("Camera device unavailable");
            return Err(CameraError::DeviceUnavailable(
                "Camera device unavailable".to_string(),
            ));
        }
        state.running = true;
        Ok(())
    }

    async fn stop(&self) -> Result<(), CameraError> {
        let mut state = self.state();
        if state.active.is_none() {
            log::error!("Camera device unavailable");
            return Err(CameraError::DeviceUnavailable(
                "Camera device unavailable".to_string(),
            ));
        }
        state.running = false;
        Ok(())
    }

    async fn lock_focus(&self, options: PhotoOptions, callback: PhotoCallback) -> LockFocusStatus {
        let (device, flash, running) = {
            let state = self.state();
            (state.active.clone(), state.flash, state.running)
        };
        let device = match device {
            Some(device) => device,
            None => {
                callback(None);
                return LockFocusStatus::NoDevice;
            }
        };
        if !running {
            callback(None);
            return LockFocusStatus::NoSession;
        }
        if self.capturing.swap(true, Ordering::SeqCst) {
            callback(None);
            return LockFocusStatus::Busy;
        }

        let source = self.source.clone();
        let storage_config = self.storage.clone();
        let write_granted = self
            .permissions
            .check(PermissionKind::WriteStorage)
            .is_granted();
        let capturing = self.capturing.clone();
        let mirror = options.mirror_correction;

        tokio::spawn(async move {
            let result = tokio::task::spawn_blocking(move || {
                capture_and_store(
                    source.as_ref(),
                    &device,
                    flash,
                    mirror,
                    &storage_config,
                    write_granted,
                )
            })
            .await;

            let path = match result {
                Ok(Ok(path)) => {
                    log::info!("Saved photo to {:?}", path);
                    Some(path)
                }
                Ok(Err(e)) => {
                    log::error!("Failed to capture photo: {}", e);
                    None
                }
                Err(e) => {
                    log::error!("Capture task failed: {}", e);
                    None
                }
            };
            capturing.store(false, Ordering::SeqCst);
            callback(path);
        });
        LockFocusStatus::Started
    }

    async fn set_flash_mode(&self, enabled: bool) -> bool {
        let mut state = self.state();
        let has_flash = state.active.as_ref().map(|d| d.has_flash).unwrap_or(false);
        if enabled && !has_flash {
            log::error!("Flash is not supported on this camera");
        }
        state.flash = enabled && has_flash;
        state.flash
    }

    async fn flash_mode(&self) -> bool {
        self.state().flash
    }

    async fn set_torch_mode(&self, enabled: bool) -> bool {
        let active = self.state().active.clone();
        let device = match active {
            Some(device) if device.has_flash => device,
            _ => {
                if enabled {
                    log::error!("Torch is not supported on this camera");
                }
                return false;
            }
        };
        match self.source.set_torch(&device, enabled) {
            Ok(on) => {
                self.state().torch = on;
                on
            }
            Err(e) => {
                log::error!("Failed to set torch mode: {}", e);
                false
            }
        }
    }

    async fn torch_mode(&self) -> bool {
        self.state().torch
    }

    async fn set_device_position(&self, facing: LensFacing) -> bool {
        let mut state = self.state();
        let device = match state.devices.iter().find(|d| d.facing == Some(facing)) {
            Some(device) => device.clone(),
            None => {
                log::error!("No {} camera available", facing);
                return false;
            }
        };
        log::info!("Switching to {} camera {}", facing, device.id);
        state.flash = state.flash && device.has_flash;
        state.torch = false;
        state.active = Some(device);
        true
    }

    async fn device_position(&self) -> Option<LensFacing> {
        self.state().active.as_ref().and_then(|d| d.facing)
    }

    async fn has_device_position(&self, facing: LensFacing) -> bool {
        self.state().devices.iter().any(|d| d.facing == Some(facing))
    }

    async fn shutdown(&self) {
        let mut state = self.state();
        state.running = false;
        state.torch = false;
        log::info!("{} backend shut down", self.source.name());
    }
}
