//! Configuration management for NaCamera
//!
//! Provides configuration loading, saving, and validation for lens selection,
//! preview surface sizing, and where captured stills are written.

use crate::errors::CameraError;
use crate::types::{LensFacing, Size};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaCameraConfig {
    pub camera: CameraConfig,
    pub preview: PreviewConfig,
    pub storage: StorageConfig,
}

/// Camera-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Lens opened when the view is created
    pub preferred_facing: LensFacing,
    /// JPEG size used when the device reports none [width, height]
    pub default_jpeg_size: [u32; 2],
    /// Images the still reader may hold at once
    pub max_images: usize,
    /// Flash state applied to the first session
    pub flash_enabled: bool,
}

/// Live preview configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Default buffer size of the preview surface [width, height]
    pub buffer_size: [u32; 2],
    /// Use continuous-picture autofocus on the repeating request
    pub continuous_autofocus: bool,
}

/// Storage and file naming configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Shared external storage root; used only when write permission is granted
    pub public_root: Option<PathBuf>,
    /// App-private files directory
    pub private_root: PathBuf,
    /// Album directory created under the public root
    pub album_name: String,
    /// File name prefix for captured stills
    pub file_prefix: String,
    /// chrono format string for the timestamp part of the file name
    pub timestamp_format: String,
}

impl Default for NaCameraConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                preferred_facing: LensFacing::Back,
                default_jpeg_size: [640, 480],
                max_images: 2,
                flash_enabled: false,
            },
            preview: PreviewConfig {
                buffer_size: [800, 480],
                continuous_autofocus: true,
            },
            storage: StorageConfig {
                public_root: None,
                private_root: PathBuf::from("./captures"),
                album_name: "PanamaCamera".to_string(),
                file_prefix: "AIMG_".to_string(),
                timestamp_format: "%Y%m%d_%H%M%S".to_string(),
            },
        }
    }
}

impl CameraConfig {
    pub fn default_jpeg_size(&self) -> Size {
        Size::from(self.default_jpeg_size)
    }
}

impl PreviewConfig {
    pub fn buffer_size(&self) -> Size {
        Size::from(self.buffer_size)
    }
}

impl NaCameraConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| CameraError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: NaCameraConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.validate().map_err(CameraError::ConfigError)?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CameraError::ConfigError(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| CameraError::ConfigError(format!("Failed to write config file: {}", e)))?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("nacamera.toml")
    }

    /// Load from default location or fall back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.camera.default_jpeg_size().is_empty() {
            return Err("Invalid default JPEG size".to_string());
        }
        if self.camera.max_images == 0 || self.camera.max_images > 8 {
            return Err("Max images must be between 1 and 8".to_string());
        }

        if self.preview.buffer_size().is_empty() {
            return Err("Invalid preview buffer size".to_string());
        }

        if self.storage.album_name.trim().is_empty() {
            return Err("Album name must not be empty".to_string());
        }
        if self.storage.file_prefix.is_empty() {
            return Err("File prefix must not be empty".to_string());
        }
        if self.storage.timestamp_format.is_empty() {
            return Err("Timestamp format must not be empty".to_string());
        }

        Ok(())
    }
}
