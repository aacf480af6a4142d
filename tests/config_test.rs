//! Configuration file handling
//!
//! Run with: cargo test --test config_test

#[cfg(test)]
mod config_tests {
    use nacamera::camera2::SimulatedCamera2;
    use nacamera::permissions::StaticPermissions;
    use nacamera::{CameraController, CameraError, LensFacing, NaCameraConfig};
    use std::path::PathBuf;
    use std::sync::Arc;

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("nacamera.toml");

        let mut config = NaCameraConfig::default();
        config.camera.preferred_facing = LensFacing::Front;
        config.camera.flash_enabled = true;
        config.storage.public_root = Some(PathBuf::from("/storage/emulated/0"));
        config.save_to_file(&path).unwrap();

        let loaded = NaCameraConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = NaCameraConfig::load_from_file(dir.path().join("absent.toml")).unwrap();
        assert_eq!(loaded, NaCameraConfig::default());
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nacamera.toml");

        std::fs::write(&path, "camera = 12").unwrap();
        assert!(matches!(
            NaCameraConfig::load_from_file(&path),
            Err(CameraError::ConfigError(_))
        ));

        let mut config = NaCameraConfig::default();
        config.storage.file_prefix.clear();
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();
        let err = NaCameraConfig::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("File prefix"));
    }

    #[tokio::test]
    async fn test_controller_rejects_invalid_config() {
        let mut config = NaCameraConfig::default();
        config.camera.max_images = 0;
        let result = CameraController::spawn(
            Arc::new(SimulatedCamera2::manual()),
            config,
            Arc::new(StaticPermissions::granting_all()),
        );
        assert!(matches!(result, Err(CameraError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_preferred_facing_selects_front() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NaCameraConfig::default();
        config.camera.preferred_facing = LensFacing::Front;
        config.storage.private_root = dir.path().to_path_buf();

        let sim = SimulatedCamera2::manual();
        let controller = CameraController::spawn(
            Arc::new(sim.clone()),
            config,
            Arc::new(StaticPermissions::granting_all()),
        )
        .unwrap();
        controller.settle().await.unwrap();

        assert_eq!(sim.open_camera_id(), Some("1".to_string()));
        controller.shutdown().await;
    }

    #[test]
    fn test_controller_needs_runtime() {
        let result = CameraController::spawn(
            Arc::new(SimulatedCamera2::manual()),
            NaCameraConfig::default(),
            Arc::new(StaticPermissions::granting_all()),
        );
        assert!(matches!(result, Err(CameraError::InitializationError(_))));
    }
}
