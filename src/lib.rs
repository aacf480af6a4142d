//! NaCamera: native camera view plugin for Tauri applications
//!
//! This crate drives a Camera2-style capture pipeline: it opens a camera,
//! runs a live preview, sequences autofocus and auto-exposure convergence
//! before a still capture, and writes the still as a timestamped JPEG.
//!
//! # Features
//! - Capture state machine with precapture metering
//! - Flash, torch and lens switching
//! - Backends for Camera2-style stacks and for sequential still sources
//! - Simulated hardware for tests and hosts without a camera stack
//! - Optional nokhwa still source for desktop webcams (`desktop`)
//! - Tauri command surface (`plugin`)
//!
//! # Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! nacamera = { version = "0.3", features = ["plugin"] }
//! tauri = { version = "2.0", features = ["protocol-asset"] }
//! ```
//!
//! Then in your Tauri app:
//! ```rust,ignore
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(nacamera::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
pub mod camera2;
#[cfg(feature = "plugin")]
pub mod commands;
pub mod config;
pub mod errors;
pub mod permissions;
pub mod platform;
pub mod storage;
pub mod types;

// Testing utilities - synthetic stills and simulated camera layouts
pub mod testing;

// Re-exports for convenience
pub use camera2::{CameraController, CaptureState, SimulatedCamera2, Surface};
pub use config::NaCameraConfig;
pub use errors::CameraError;
pub use permissions::{PermissionInfo, PermissionKind, PermissionProvider, PermissionStatus};
pub use platform::{select_backend, CameraBackend, PlatformInfo};
pub use types::{
    CameraCapabilities, CameraDeviceInfo, LensFacing, LockFocusStatus, PhotoCallback,
    PhotoOptions, Platform, Size,
};

#[cfg(feature = "plugin")]
use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the NaCamera plugin with all commands
#[cfg(feature = "plugin")]
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("nacamera")
        .invoke_handler(tauri::generate_handler![
            // Camera lifecycle
            commands::camera::create_camera,
            commands::camera::devices_available,
            commands::camera::start_camera,
            commands::camera::stop_camera,
            commands::camera::release_camera,
            commands::camera::get_capabilities,
            // Capture
            commands::camera::lock_focus,
            // Flash, torch and lens
            commands::camera::set_flash_mode,
            commands::camera::get_flash_mode,
            commands::camera::set_torch_mode,
            commands::camera::get_torch_mode,
            commands::camera::set_device_position,
            commands::camera::get_device_position,
            commands::camera::has_device_position,
            // Permissions
            commands::permissions::request_permissions,
            // Configuration
            commands::config::get_config,
            commands::config::update_config,
            commands::config::reset_config,
        ])
        .build()
}

/// Detect the current platform using the Platform enum
pub fn current_platform() -> Platform {
    Platform::current()
}

/// Initialize logging for the camera system
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "nacamera=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        platform: Platform::current(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub platform: Platform,
}
