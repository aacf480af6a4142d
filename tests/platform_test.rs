//! Backend selection and the Camera2 backend
//!
//! Run with: cargo test --test platform_test

#[cfg(test)]
mod platform_tests {
    use nacamera::camera2::SimulatedCamera2;
    use nacamera::permissions::StaticPermissions;
    use nacamera::platform::{backend_info, Camera2Backend, CameraBackend};
    use nacamera::{LensFacing, NaCameraConfig, Platform, PhotoOptions, Size, Surface};
    use std::sync::Arc;
    use std::time::Duration;

    fn config(dir: &tempfile::TempDir) -> NaCameraConfig {
        let mut config = NaCameraConfig::default();
        config.storage.private_root = dir.path().join("captures");
        config
    }

    async fn auto_backend(dir: &tempfile::TempDir) -> Camera2Backend {
        let backend = Camera2Backend::spawn(
            Arc::new(SimulatedCamera2::auto()),
            config(dir),
            Arc::new(StaticPermissions::granting_all()),
        )
        .unwrap();
        backend
            .surface_available(Surface::preview(Size::new(800, 480)))
            .await
            .unwrap();
        assert!(backend.wait_ready(Duration::from_secs(5)).await);
        backend
    }

    #[cfg(all(target_os = "linux", not(feature = "desktop")))]
    #[tokio::test]
    async fn test_select_backend_falls_back_to_simulated_camera2() {
        let dir = tempfile::tempdir().unwrap();
        let backend = nacamera::select_backend(config(&dir)).unwrap();

        let info = backend_info(backend.as_ref());
        assert_eq!(info.platform, Platform::Linux);
        assert_eq!(info.backend, "camera2");
        assert!(info.reports_convergence);
        assert!(backend.devices_available());
        backend.shutdown().await;
    }

    #[cfg(all(target_os = "linux", not(feature = "desktop")))]
    #[tokio::test]
    async fn test_host_queries_open_no_camera() {
        use nacamera::platform::{host_devices_available, host_permissions};
        use nacamera::PermissionKind;

        assert!(host_devices_available());
        let info = host_permissions().request(&PermissionKind::ALL).await;
        assert!(info.is_granted());
    }

    #[tokio::test]
    async fn test_camera2_backend_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let backend = auto_backend(&dir).await;

        let caps = backend.capabilities().await.unwrap();
        assert!(caps.has_flash);
        assert!(caps.reports_convergence);
        assert_eq!(caps.positions, vec![LensFacing::Back, LensFacing::Front]);
        assert_eq!(caps.jpeg_sizes[0], Size::new(640, 480));
        assert_eq!(backend.device_position().await, Some(LensFacing::Back));
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_camera2_backend_takes_picture() {
        let dir = tempfile::tempdir().unwrap();
        let backend = auto_backend(&dir).await;

        let path = tokio::time::timeout(
            Duration::from_secs(5),
            backend.take_picture(PhotoOptions::default()),
        )
        .await
        .expect("capture timed out")
        .expect("photo path");
        assert!(path.starts_with(dir.path().join("captures")));
        backend.shutdown().await;
        assert!(!backend.is_ready().await);
    }

    #[tokio::test]
    async fn test_camera2_backend_switches_lens() {
        let dir = tempfile::tempdir().unwrap();
        let backend = auto_backend(&dir).await;

        assert!(backend.has_device_position(LensFacing::Front).await);
        assert!(!backend.has_device_position(LensFacing::External).await);
        assert!(backend.set_device_position(LensFacing::Front).await);
        assert!(backend.wait_ready(Duration::from_secs(5)).await);
        assert_eq!(backend.device_position().await, Some(LensFacing::Front));
        assert!(!backend.set_flash_mode(true).await);
        assert!(!backend.flash_mode().await);
        backend.shutdown().await;
    }

    #[tokio::test]
    async fn test_not_ready_without_surface() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Camera2Backend::spawn(
            Arc::new(SimulatedCamera2::manual()),
            config(&dir),
            Arc::new(StaticPermissions::granting_all()),
        )
        .unwrap();
        assert!(!backend.wait_ready(Duration::from_millis(100)).await);
        backend.shutdown().await;
    }
}
