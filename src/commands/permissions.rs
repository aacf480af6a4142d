use super::camera::current_backend;
use crate::permissions::{PermissionInfo, PermissionKind, PermissionStatus};
use crate::platform::host_permissions;
use tauri::command;

/// Ask for camera and storage access, with or without a created camera.
/// A denial is reported, never retried.
#[command]
pub async fn request_permissions() -> Result<PermissionInfo, String> {
    log::info!("Requesting camera and storage permissions");
    let info = match current_backend().await {
        Some(backend) => backend.request_permissions().await,
        None => host_permissions().request(&PermissionKind::ALL).await,
    };

    match info.status {
        PermissionStatus::Granted => log::info!("Permissions granted"),
        _ => log::warn!("Permissions not granted: {}", info.message),
    }
    Ok(info)
}
