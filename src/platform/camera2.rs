//! `CameraBackend` over the Camera2 controller
//!
//! Stills are delivered as the sensor produced them; `PhotoOptions` mirror
//! correction applies to sequential backends only.

use super::CameraBackend;
use crate::camera2::{Camera2Hal, CameraController, ControllerStatus, Surface};
use crate::config::NaCameraConfig;
use crate::errors::CameraError;
use crate::permissions::{PermissionInfo, PermissionKind, PermissionProvider};
use crate::types::{CameraCapabilities, LensFacing, LockFocusStatus, PhotoCallback, PhotoOptions};
use async_trait::async_trait;
use std::sync::Arc;

pub const BACKEND_NAME: &str = "camera2";

pub struct Camera2Backend {
    hal: Arc<dyn Camera2Hal>,
    permissions: Arc<dyn PermissionProvider>,
    controller: CameraController,
}

impl Camera2Backend {
    /// Spawn a controller on the current runtime and begin opening the
    /// preferred camera
    pub fn spawn(
        hal: Arc<dyn Camera2Hal>,
        config: NaCameraConfig,
        permissions: Arc<dyn PermissionProvider>,
    ) -> Result<Self, CameraError> {
        let controller = CameraController::spawn(hal.clone(), config, permissions.clone())?;
        Ok(Self {
            hal,
            permissions,
            controller,
        })
    }

    pub fn controller(&self) -> &CameraController {
        &self.controller
    }

    async fn status(&self) -> Option<ControllerStatus> {
        match self.controller.status().await {
            Ok(status) => Some(status),
            Err(e) => {
                log::error!("Failed to read camera status: {}", e);
                None
            }
        }
    }
}

fn capabilities_from(status: &ControllerStatus) -> CameraCapabilities {
    let mut positions = Vec::new();
    for facing in status.cameras.iter().filter_map(|c| c.facing) {
        if !positions.contains(&facing) {
            positions.push(facing);
        }
    }
    let jpeg_sizes = status
        .cameras
        .iter()
        .find(|c| Some(&c.id) == status.camera_id.as_ref())
        .map(|c| c.jpeg_sizes.clone())
        .unwrap_or_default();

    CameraCapabilities {
        has_flash: status.flash_supported,
        has_torch: status.flash_supported,
        positions,
        jpeg_sizes,
        reports_convergence: true,
    }
}

#[async_trait]
impl CameraBackend for Camera2Backend {
    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn devices_available(&self) -> bool {
        self.hal.has_camera_feature()
    }

    async fn request_permissions(&self) -> PermissionInfo {
        self.permissions.request(&PermissionKind::ALL).await
    }

    async fn capabilities(&self) -> Result<CameraCapabilities, CameraError> {
        let status = self.controller.status().await?;
        Ok(capabilities_from(&status))
    }

    async fn is_ready(&self) -> bool {
        self.status()
            .await
            .map(|s| s.device_open && s.session_ready && !s.capture_pending)
            .unwrap_or(false)
    }

    async fn start(&self) -> Result<(), CameraError> {
        self.controller.start_preview().await
    }

    async fn stop(&self) -> Result<(), CameraError> {
        self.controller.stop_preview().await
    }

    async fn lock_focus(&self, _options: PhotoOptions, callback: PhotoCallback) -> LockFocusStatus {
        self.controller.lock_focus(callback).await
    }

    async fn set_flash_mode(&self, enabled: bool) -> bool {
        self.controller
            .set_flash_mode(enabled)
            .await
            .unwrap_or_else(|e| {
                log::error!("Failed to set flash mode: {}", e);
                false
            })
    }

    async fn flash_mode(&self) -> bool {
        self.status().await.map(|s| s.flash_enabled).unwrap_or(false)
    }

    async fn set_torch_mode(&self, enabled: bool) -> bool {
        self.controller
            .set_torch_mode(enabled)
            .await
            .unwrap_or_else(|e| {
                log::error!("Failed to set torch mode: {}", e);
                false
            })
    }

    async fn torch_mode(&self) -> bool {
        self.status().await.map(|s| s.torch_enabled).unwrap_or(false)
    }

    async fn set_device_position(&self, facing: LensFacing) -> bool {
        self.controller
            .set_device_position(facing)
            .await
            .unwrap_or_else(|e| {
                log::error!("Failed to switch camera: {}", e);
                false
            })
    }

    async fn device_position(&self) -> Option<LensFacing> {
        self.status().await.and_then(|s| s.facing)
    }

    async fn has_device_position(&self, facing: LensFacing) -> bool {
        self.status()
            .await
            .map(|s| s.cameras.iter().any(|c| c.facing == Some(facing)))
            .unwrap_or(false)
    }

    async fn surface_available(&self, surface: Surface) -> Result<(), CameraError> {
        self.controller.surface_available(surface)
    }

    async fn surface_destroyed(&self) -> Result<(), CameraError> {
        self.controller.surface_destroyed()
    }

    async fn shutdown(&self) {
        self.controller.shutdown().await;
    }
}
