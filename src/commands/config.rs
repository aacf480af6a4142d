use super::camera::current_backend;
use crate::config::NaCameraConfig;
use std::sync::{Arc, RwLock};
use tauri::command;

lazy_static::lazy_static! {
    static ref GLOBAL_CONFIG: Arc<RwLock<NaCameraConfig>> = Arc::new(RwLock::new(NaCameraConfig::load_or_default()));
}

/// Snapshot of the configuration new cameras are created with
pub(crate) fn current_config() -> Result<NaCameraConfig, String> {
    let config = GLOBAL_CONFIG.read().map_err(|e| e.to_string())?;
    Ok(config.clone())
}

/// Persist `config` and make it the one `create_camera` uses. A running
/// camera keeps its reader size, lens and capture directory until it is
/// created again.
async fn store_config(config: NaCameraConfig) -> Result<(), String> {
    config
        .save_to_file(NaCameraConfig::default_path())
        .map_err(|e| format!("Failed to save config: {}", e))?;
    {
        let mut current = GLOBAL_CONFIG
            .write()
            .map_err(|e| format!("Failed to write config: {}", e))?;
        *current = config;
    }

    if let Some(backend) = current_backend().await {
        log::info!(
            "Config stored; the active {} camera picks it up on the next create_camera",
            backend.name()
        );
    }
    Ok(())
}

#[command]
pub async fn get_config() -> Result<NaCameraConfig, String> {
    current_config()
}

/// Validate and store a new configuration
#[command]
pub async fn update_config(new_config: NaCameraConfig) -> Result<(), String> {
    new_config.validate()?;
    log::info!(
        "Updating config: {} camera, {} images, captures under {:?}",
        new_config.camera.preferred_facing,
        new_config.camera.max_images,
        new_config.storage.private_root
    );
    store_config(new_config).await
}

/// Restore the defaults and return them
#[command]
pub async fn reset_config() -> Result<NaCameraConfig, String> {
    let defaults = NaCameraConfig::default();
    log::info!("Resetting config to defaults");
    store_config(defaults.clone()).await?;
    Ok(defaults)
}
