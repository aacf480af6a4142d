//! Core types shared by every camera backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Host platform the plugin is running on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Android,
    IOS,
    MacOS,
    Windows,
    Linux,
    Unknown,
}

impl Platform {
    /// Detect the platform this binary was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "android") {
            Platform::Android
        } else if cfg!(target_os = "ios") {
            Platform::IOS
        } else if cfg!(target_os = "macos") {
            Platform::MacOS
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "linux") {
            Platform::Linux
        } else {
            Platform::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Android => "android",
            Platform::IOS => "ios",
            Platform::MacOS => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::Unknown => "unknown",
        }
    }

    /// Mobile platforms get the native capture stacks
    pub fn is_mobile(&self) -> bool {
        matches!(self, Platform::Android | Platform::IOS)
    }
}

/// Direction a camera lens faces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LensFacing {
    Back,
    Front,
    External,
}

impl LensFacing {
    pub fn as_str(&self) -> &'static str {
        match self {
            LensFacing::Back => "back",
            LensFacing::Front => "front",
            LensFacing::External => "external",
        }
    }

    /// The lens on the other side of the device, if there is one
    pub fn opposite(&self) -> Option<LensFacing> {
        match self {
            LensFacing::Back => Some(LensFacing::Front),
            LensFacing::Front => Some(LensFacing::Back),
            LensFacing::External => None,
        }
    }
}

impl fmt::Display for LensFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LensFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "back" => Ok(LensFacing::Back),
            "front" => Ok(LensFacing::Front),
            "external" => Ok(LensFacing::External),
            other => Err(format!("Unknown lens facing: {}", other)),
        }
    }
}

/// Pixel dimensions of a surface or image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<[u32; 2]> for Size {
    fn from(value: [u32; 2]) -> Self {
        Size::new(value[0], value[1])
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Camera device information as enumerated from the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraDeviceInfo {
    pub id: String,
    pub name: String,
    pub facing: Option<LensFacing>,
    pub has_flash: bool,
    /// JPEG output sizes, largest first
    pub jpeg_sizes: Vec<Size>,
}

impl CameraDeviceInfo {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: format!("Camera {}", id),
            id,
            facing: None,
            has_flash: false,
            jpeg_sizes: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_facing(mut self, facing: LensFacing) -> Self {
        self.facing = Some(facing);
        self
    }

    pub fn with_flash(mut self, has_flash: bool) -> Self {
        self.has_flash = has_flash;
        self
    }

    pub fn with_jpeg_sizes(mut self, sizes: Vec<Size>) -> Self {
        self.jpeg_sizes = sizes;
        self
    }
}

/// What the active camera can do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraCapabilities {
    pub has_flash: bool,
    pub has_torch: bool,
    pub positions: Vec<LensFacing>,
    pub jpeg_sizes: Vec<Size>,
    /// Whether the backend reports AF/AE convergence through capture results
    pub reports_convergence: bool,
}

/// Per-capture options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoOptions {
    /// Flip front-camera stills horizontally so they match the preview
    pub mirror_correction: bool,
}

impl Default for PhotoOptions {
    fn default() -> Self {
        Self {
            mirror_correction: true,
        }
    }
}

/// Immediate answer to a `lock_focus` request
///
/// The photo callback is invoked exactly once regardless of the status;
/// anything other than `Started` means it receives `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockFocusStatus {
    Started,
    NoDevice,
    NoSession,
    Busy,
}

impl LockFocusStatus {
    pub fn is_started(&self) -> bool {
        matches!(self, LockFocusStatus::Started)
    }
}

/// Completion callback for a still capture. `None` is the failure sentinel.
pub type PhotoCallback = Box<dyn FnOnce(Option<PathBuf>) + Send + 'static>;
