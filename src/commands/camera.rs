use super::config::current_config;
use crate::platform::{
    backend_info, host_devices_available, select_backend, CameraBackend, PlatformInfo,
};
use crate::types::{CameraCapabilities, LensFacing, PhotoOptions};
use std::sync::Arc;
use tauri::command;
use tokio::sync::RwLock;

lazy_static::lazy_static! {
    static ref ACTIVE_BACKEND: Arc<RwLock<Option<Arc<dyn CameraBackend>>>> = Arc::new(RwLock::new(None));
}

pub(crate) async fn current_backend() -> Option<Arc<dyn CameraBackend>> {
    ACTIVE_BACKEND.read().await.clone()
}

pub(crate) async fn active_backend() -> Result<Arc<dyn CameraBackend>, String> {
    current_backend()
        .await
        .ok_or_else(|| "Camera has not been created".to_string())
}

/// Select a backend and begin opening the preferred camera. Any previous
/// camera is released first.
#[command]
pub async fn create_camera() -> Result<PlatformInfo, String> {
    let config = current_config()?;

    let mut active = ACTIVE_BACKEND.write().await;
    if let Some(previous) = active.take() {
        log::info!("Releasing previous {} camera", previous.name());
        previous.shutdown().await;
    }

    let backend = select_backend(config).map_err(|e| {
        log::error!("Failed to create camera: {}", e);
        format!("Failed to create camera: {}", e)
    })?;
    let info = backend_info(backend.as_ref());
    log::info!(
        "Camera created on {} using {}",
        info.platform.as_str(),
        info.backend
    );
    *active = Some(backend);
    Ok(info)
}

/// Whether the device has any camera. Answered before `create_camera` too.
#[command]
pub async fn devices_available() -> Result<bool, String> {
    Ok(match current_backend().await {
        Some(backend) => backend.devices_available(),
        None => host_devices_available(),
    })
}

/// Take a picture. Resolves to the saved file path, or `None` when the
/// capture failed.
#[command]
pub async fn lock_focus(mirror_correction: Option<bool>) -> Result<Option<String>, String> {
    let backend = active_backend().await?;
    let mut options = PhotoOptions::default();
    if let Some(mirror) = mirror_correction {
        options.mirror_correction = mirror;
    }

    let path = backend.take_picture(options).await;
    match &path {
        Some(path) => log::info!("Picture saved to {:?}", path),
        None => log::warn!("Picture was not taken"),
    }
    Ok(path.map(|p| p.to_string_lossy().into_owned()))
}

/// Returns the effective flash state
#[command]
pub async fn set_flash_mode(enabled: bool) -> Result<bool, String> {
    Ok(active_backend().await?.set_flash_mode(enabled).await)
}

#[command]
pub async fn get_flash_mode() -> Result<bool, String> {
    Ok(active_backend().await?.flash_mode().await)
}

/// Returns the effective torch state
#[command]
pub async fn set_torch_mode(enabled: bool) -> Result<bool, String> {
    Ok(active_backend().await?.set_torch_mode(enabled).await)
}

#[command]
pub async fn get_torch_mode() -> Result<bool, String> {
    Ok(active_backend().await?.torch_mode().await)
}

#[command]
pub async fn set_device_position(position: LensFacing) -> Result<bool, String> {
    log::info!("Switching to {} camera", position);
    Ok(active_backend().await?.set_device_position(position).await)
}

#[command]
pub async fn get_device_position() -> Result<Option<LensFacing>, String> {
    Ok(active_backend().await?.device_position().await)
}

#[command]
pub async fn has_device_position(position: LensFacing) -> Result<bool, String> {
    Ok(active_backend().await?.has_device_position(position).await)
}

#[command]
pub async fn get_capabilities() -> Result<CameraCapabilities, String> {
    active_backend()
        .await?
        .capabilities()
        .await
        .map_err(|e| format!("Failed to get capabilities: {}", e))
}

/// Resume the live preview
#[command]
pub async fn start_camera() -> Result<(), String> {
    active_backend()
        .await?
        .start()
        .await
        .map_err(|e| format!("Failed to start camera: {}", e))
}

/// Pause the live preview
#[command]
pub async fn stop_camera() -> Result<(), String> {
    active_backend()
        .await?
        .stop()
        .await
        .map_err(|e| format!("Failed to stop camera: {}", e))
}

/// Close the device and forget the backend
#[command]
pub async fn release_camera() -> Result<(), String> {
    let backend = ACTIVE_BACKEND.write().await.take();
    match backend {
        Some(backend) => {
            backend.shutdown().await;
            log::info!("{} camera released", backend.name());
            Ok(())
        }
        None => {
            log::warn!("No camera to release");
            Ok(())
        }
    }
}
