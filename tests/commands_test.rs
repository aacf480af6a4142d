//! Tauri command surface. The active camera is process-wide, so the whole
//! lifecycle runs in one test.
//!
//! Run with: cargo test --features plugin --test commands_test

#![cfg(feature = "plugin")]

#[cfg(test)]
mod commands_tests {
    use nacamera::commands::{
        create_camera, devices_available, get_capabilities, get_config, get_device_position,
        get_flash_mode, get_torch_mode, has_device_position, release_camera,
        request_permissions, reset_config, set_device_position, set_flash_mode, set_torch_mode,
        start_camera, stop_camera, update_config,
    };
    use nacamera::{LensFacing, NaCameraConfig};
    use std::time::Duration;

    #[tokio::test]
    async fn test_camera_command_lifecycle() {
        // Availability and permissions answer before any camera is created
        let available = devices_available().await.unwrap();
        let permissions = request_permissions().await.unwrap();
        assert!(!permissions.message.is_empty());
        assert!(get_flash_mode().await.unwrap_err().contains("has not been created"));

        let config = get_config().await.unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.max_images, NaCameraConfig::default().camera.max_images);

        let info = create_camera().await.unwrap();
        assert!(!info.backend.is_empty());
        assert_eq!(devices_available().await.unwrap(), available);
        if !available {
            release_camera().await.unwrap();
            return;
        }

        let permissions = request_permissions().await.unwrap();
        assert!(!permissions.message.is_empty());

        if let Ok(caps) = get_capabilities().await {
            if caps.positions.contains(&LensFacing::Back) {
                assert!(has_device_position(LensFacing::Back).await.unwrap());
            }
            let flash = set_flash_mode(true).await.unwrap();
            assert!(!flash || caps.has_flash);
            assert_eq!(get_flash_mode().await.unwrap(), flash);
            set_flash_mode(false).await.unwrap();

            let torch = set_torch_mode(true).await.unwrap();
            assert!(!torch || caps.has_torch);
            assert_eq!(get_torch_mode().await.unwrap(), torch);
        }

        if has_device_position(LensFacing::Front).await.unwrap() {
            assert!(set_device_position(LensFacing::Front).await.unwrap());
            assert_eq!(
                get_device_position().await.unwrap(),
                Some(LensFacing::Front)
            );
        }

        let _ = stop_camera().await;
        let _ = start_camera().await;

        // Creating again replaces the previous camera
        create_camera().await.unwrap();
        release_camera().await.unwrap();
        assert!(get_device_position().await.is_err());
        assert_eq!(devices_available().await.unwrap(), available);

        // Releasing twice is harmless
        release_camera().await.unwrap();

        // Stored config is used by the next created camera
        let dir = tempfile::tempdir().unwrap();
        let mut front = NaCameraConfig::default();
        front.camera.preferred_facing = LensFacing::Front;
        front.storage.private_root = dir.path().to_path_buf();
        update_config(front.clone()).await.unwrap();
        assert_eq!(get_config().await.unwrap(), front);

        let mut invalid = front.clone();
        invalid.camera.max_images = 0;
        assert!(update_config(invalid).await.is_err());
        assert_eq!(get_config().await.unwrap(), front);

        let info = create_camera().await.unwrap();
        if info.backend == "camera2" {
            let mut position = None;
            for _ in 0..100 {
                position = get_device_position().await.unwrap();
                if position.is_some() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            assert_eq!(position, Some(LensFacing::Front));
        }
        release_camera().await.unwrap();

        assert_eq!(reset_config().await.unwrap(), NaCameraConfig::default());
        assert_eq!(get_config().await.unwrap(), NaCameraConfig::default());
        let _ = std::fs::remove_file(NaCameraConfig::default_path());
    }
}
