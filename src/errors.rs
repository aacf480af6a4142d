use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Camera initialization error: {0}")]
    InitializationError(String),
    #[error("Permission denied error: {0}")]
    PermissionDenied(String),
    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Camera device error: {0}")]
    DeviceError(String),
    #[error("Session configuration failed: {0}")]
    SessionConfigurationFailed(String),
    #[error("Capture error: {0}")]
    CaptureError(String),
    #[error("Camera control error: {0}")]
    ControlError(String),
    #[error("Camera busy: {0}")]
    Busy(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for CameraError {
    fn from(e: std::io::Error) -> Self {
        CameraError::StorageError(e.to_string())
    }
}
