//! Camera backends and backend selection
//!
//! Every platform stack sits behind `CameraBackend`. Stacks that report
//! focus and exposure convergence go through the Camera2 controller; stacks
//! that hand out finished stills go through `SequentialBackend`.

pub mod camera2;
#[cfg(feature = "desktop")]
pub mod desktop;
pub mod sequential;

pub use camera2::Camera2Backend;
#[cfg(feature = "desktop")]
pub use desktop::NokhwaStillSource;
pub use sequential::{SequentialBackend, StillSource};

use crate::camera2::{Camera2Hal, SimulatedCamera2, SimulatedOptions, Surface};
use crate::config::NaCameraConfig;
use crate::errors::CameraError;
use crate::permissions::{PermissionInfo, PermissionProvider, StaticPermissions};
use crate::types::{
    CameraCapabilities, LensFacing, LockFocusStatus, PhotoCallback, PhotoOptions, Platform,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

const READY_POLL_INTERVAL: Duration = Duration::from_millis(20);

lazy_static::lazy_static! {
    static ref NATIVE_HAL: RwLock<Option<(Arc<dyn Camera2Hal>, Arc<dyn PermissionProvider>)>> = RwLock::new(None);
}

/// Capability interface implemented once per platform stack
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Short backend identifier
    fn name(&self) -> &'static str;

    /// Whether the device has any camera at all
    fn devices_available(&self) -> bool;

    async fn request_permissions(&self) -> PermissionInfo;

    async fn capabilities(&self) -> Result<CameraCapabilities, CameraError>;

    /// Device open and a capture could start now
    async fn is_ready(&self) -> bool;

    /// Poll `is_ready` until it holds or `timeout` elapses
    async fn wait_ready(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_ready().await {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                log::warn!("{} camera not ready after {:?}", self.name(), timeout);
                return false;
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Resume the live preview
    async fn start(&self) -> Result<(), CameraError>;

    /// Pause the live preview
    async fn stop(&self) -> Result<(), CameraError>;

    /// Begin a still capture. `callback` is invoked exactly once, with `None`
    /// on failure or when the returned status is not `Started`.
    async fn lock_focus(&self, options: PhotoOptions, callback: PhotoCallback) -> LockFocusStatus;

    /// Capture a still and wait for the saved file
    async fn take_picture(&self, options: PhotoOptions) -> Option<PathBuf> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let status = self
            .lock_focus(
                options,
                Box::new(move |path| {
                    let _ = tx.send(path);
                }),
            )
            .await;
        if !status.is_started() {
            log::warn!("Picture not started on {}: {:?}", self.name(), status);
        }
        rx.await.ok().flatten()
    }

    /// Returns the effective flash state
    async fn set_flash_mode(&self, enabled: bool) -> bool;

    async fn flash_mode(&self) -> bool;

    /// Returns the effective torch state
    async fn set_torch_mode(&self, enabled: bool) -> bool;

    async fn torch_mode(&self) -> bool;

    async fn set_device_position(&self, facing: LensFacing) -> bool;

    async fn device_position(&self) -> Option<LensFacing>;

    async fn has_device_position(&self, facing: LensFacing) -> bool;

    /// Host view produced its drawing surface
    async fn surface_available(&self, _surface: Surface) -> Result<(), CameraError> {
        Ok(())
    }

    async fn surface_destroyed(&self) -> Result<(), CameraError> {
        Ok(())
    }

    /// Release the device. The backend is unusable afterwards.
    async fn shutdown(&self);
}

/// Which backend was selected and how it behaves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformInfo {
    pub platform: Platform,
    pub backend: String,
    pub reports_convergence: bool,
}

/// Install the host's native Camera2 binding. `select_backend` prefers it
/// over every other backend.
pub fn register_native_hal(hal: Arc<dyn Camera2Hal>, permissions: Arc<dyn PermissionProvider>) {
    log::info!("Registered native Camera2 HAL");
    match NATIVE_HAL.write() {
        Ok(mut native) => *native = Some((hal, permissions)),
        Err(e) => log::error!("Failed to register native HAL: {}", e),
    }
}

fn native_hal() -> Option<(Arc<dyn Camera2Hal>, Arc<dyn PermissionProvider>)> {
    NATIVE_HAL.read().ok().and_then(|native| native.clone())
}

/// Whether the backend `select_backend` would pick has any camera. Nothing
/// is opened.
pub fn host_devices_available() -> bool {
    if let Some((hal, _)) = native_hal() {
        return hal.has_camera_feature();
    }
    match Platform::current() {
        Platform::Android => false,
        #[cfg(feature = "desktop")]
        Platform::Windows | Platform::MacOS | Platform::Linux => {
            match NokhwaStillSource::default().devices() {
                Ok(devices) => !devices.is_empty(),
                Err(e) => {
                    log::error!("Failed to list cameras: {}", e);
                    false
                }
            }
        }
        _ => SimulatedOptions::default().has_camera_feature,
    }
}

/// Permission provider of the backend `select_backend` would pick
pub fn host_permissions() -> Arc<dyn PermissionProvider> {
    if let Some((_, permissions)) = native_hal() {
        return permissions;
    }
    match Platform::current() {
        Platform::Android => Arc::new(StaticPermissions::denying_all()),
        #[cfg(feature = "desktop")]
        Platform::Windows | Platform::MacOS | Platform::Linux => {
            Arc::new(crate::permissions::HostPermissions)
        }
        _ => Arc::new(StaticPermissions::granting_all()),
    }
}

/// Pick the backend for the current platform and begin opening the camera
pub fn select_backend(config: NaCameraConfig) -> Result<Arc<dyn CameraBackend>, CameraError> {
    let platform = Platform::current();

    if let Some((hal, permissions)) = native_hal() {
        log::info!("Using native Camera2 backend on {}", platform.as_str());
        return Ok(Arc::new(Camera2Backend::spawn(hal, config, permissions)?));
    }

    if platform == Platform::Android {
        return Err(CameraError::InitializationError(
            "No Camera2 HAL registered".to_string(),
        ));
    }

    #[cfg(feature = "desktop")]
    {
        if matches!(platform, Platform::Windows | Platform::MacOS | Platform::Linux) {
            log::info!("Using nokhwa still backend on {}", platform.as_str());
            let backend =
                SequentialBackend::new(NokhwaStillSource::default(), &config, host_permissions());
            return Ok(Arc::new(backend));
        }
    }

    log::info!("Using simulated Camera2 backend on {}", platform.as_str());
    // No host view will hand over a surface, so preview offscreen
    let surface = Surface::preview(config.preview.buffer_size());
    let backend =
        Camera2Backend::spawn(Arc::new(SimulatedCamera2::auto()), config, host_permissions())?;
    backend.controller().surface_available(surface)?;
    Ok(Arc::new(backend))
}

pub fn backend_info(backend: &dyn CameraBackend) -> PlatformInfo {
    PlatformInfo {
        platform: Platform::current(),
        backend: backend.name().to_string(),
        reports_convergence: backend.name() == camera2::BACKEND_NAME,
    }
}
