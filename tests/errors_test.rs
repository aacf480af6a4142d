#[cfg(test)]
mod error_tests {
    use nacamera::errors::CameraError;
    use std::error::Error;

    #[test]
    fn test_camera_error_initialization() {
        let error = CameraError::InitializationError("No Camera2 HAL registered".to_string());
        assert!(error.to_string().contains("Camera initialization error"));
        assert!(error.to_string().contains("No Camera2 HAL registered"));
    }

    #[test]
    fn test_camera_error_session_configuration() {
        let error = CameraError::SessionConfigurationFailed("No configured preview session".to_string());
        assert_eq!(
            error.to_string(),
            "Session configuration failed: No configured preview session"
        );
    }

    #[test]
    fn test_camera_error_debug_format() {
        let error = CameraError::Busy("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("Busy"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_camera_error_implements_error_trait() {
        let error = CameraError::DeviceUnavailable("Error trait test".to_string());
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());
    }

    #[test]
    fn test_io_error_becomes_storage_error() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let error: CameraError = io.into();
        assert!(matches!(error, CameraError::StorageError(_)));
        assert!(error.to_string().starts_with("Storage error"));
    }

    #[test]
    fn test_all_error_variants() {
        let errors = vec![
            CameraError::InitializationError("Init error".to_string()),
            CameraError::PermissionDenied("Permission error".to_string()),
            CameraError::DeviceUnavailable("Unavailable".to_string()),
            CameraError::DeviceError("Device error".to_string()),
            CameraError::SessionConfigurationFailed("Session error".to_string()),
            CameraError::CaptureError("Capture error".to_string()),
            CameraError::ControlError("Control error".to_string()),
            CameraError::Busy("Busy".to_string()),
            CameraError::StorageError("Storage error".to_string()),
            CameraError::UnsupportedOperation("Unsupported error".to_string()),
            CameraError::ConfigError("Config error".to_string()),
        ];

        for error in errors {
            assert!(!error.to_string().is_empty());
            assert!(!format!("{:?}", error).is_empty());
            assert_eq!(error.clone(), error);
        }
    }

    #[test]
    fn test_error_in_result_context() {
        fn open() -> Result<(), CameraError> {
            Err(CameraError::DeviceError("CameraInUse".to_string()))
        }

        fn open_with_context() -> anyhow::Result<()> {
            open()?;
            Ok(())
        }

        let err = open_with_context().unwrap_err();
        assert!(err.to_string().contains("CameraInUse"));
        assert!(err.downcast_ref::<CameraError>().is_some());
    }
}
