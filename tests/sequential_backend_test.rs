//! Sequential backend tests over synthetic stills
//!
//! Run with: cargo test --test sequential_backend_test

#[cfg(test)]
mod sequential_backend_tests {
    use nacamera::permissions::StaticPermissions;
    use nacamera::platform::{CameraBackend, SequentialBackend};
    use nacamera::testing::SyntheticStillSource;
    use nacamera::{LensFacing, LockFocusStatus, NaCameraConfig, PermissionKind, PhotoOptions};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    fn backend(source: SyntheticStillSource, dir: &TempDir) -> SequentialBackend {
        let mut config = NaCameraConfig::default();
        config.storage.private_root = dir.path().join("captures");
        SequentialBackend::new(source, &config, Arc::new(StaticPermissions::granting_all()))
    }

    /// Mean red channel of the left and right halves
    fn half_brightness(path: &Path) -> (f64, f64) {
        let image = image::open(path).unwrap().to_rgb8();
        let half = image.width() / 2;
        let (mut left, mut right) = (0u64, 0u64);
        for (x, _, pixel) in image.enumerate_pixels() {
            if x < half {
                left += pixel[0] as u64;
            } else {
                right += pixel[0] as u64;
            }
        }
        let count = (half * image.height()) as f64;
        (left as f64 / count, right as f64 / count)
    }

    async fn lock(
        backend: &SequentialBackend,
        options: PhotoOptions,
    ) -> (LockFocusStatus, oneshot::Receiver<Option<PathBuf>>) {
        let (tx, rx) = oneshot::channel();
        let status = backend
            .lock_focus(
                options,
                Box::new(move |path| {
                    let _ = tx.send(path);
                }),
            )
            .await;
        (status, rx)
    }

    #[tokio::test]
    async fn test_selects_back_camera_and_reports_capabilities() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(SyntheticStillSource::new(), &dir);

        assert_eq!(backend.name(), "synthetic");
        assert!(backend.devices_available());
        assert!(backend.is_ready().await);
        assert_eq!(backend.device_position().await, Some(LensFacing::Back));
        assert!(backend.has_device_position(LensFacing::Front).await);
        assert!(!backend.has_device_position(LensFacing::External).await);

        let caps = backend.capabilities().await.unwrap();
        assert!(caps.has_flash);
        assert!(caps.has_torch);
        assert!(!caps.reports_convergence);
        assert_eq!(caps.positions, vec![LensFacing::Back, LensFacing::Front]);
    }

    #[tokio::test]
    async fn test_take_picture_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let source = SyntheticStillSource::new();
        let backend = backend(source.clone(), &dir);

        let path = backend
            .take_picture(PhotoOptions::default())
            .await
            .expect("photo path");
        assert!(path.starts_with(dir.path().join("captures")));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("AIMG_"));
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(source.captures(), 1);
        assert!(backend.is_ready().await);
    }

    #[tokio::test]
    async fn test_back_camera_is_never_mirrored() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(SyntheticStillSource::new(), &dir);

        let path = backend.take_picture(PhotoOptions::default()).await.unwrap();
        let (left, right) = half_brightness(&path);
        assert!(left > right, "left {} right {}", left, right);
    }

    #[tokio::test]
    async fn test_front_camera_mirror_correction() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(SyntheticStillSource::new(), &dir);
        assert!(backend.set_device_position(LensFacing::Front).await);

        let mirrored = backend
            .take_picture(PhotoOptions {
                mirror_correction: true,
            })
            .await
            .unwrap();
        let (left, right) = half_brightness(&mirrored);
        assert!(right > left, "left {} right {}", left, right);

        // Same second, so give the second still its own directory
        let dir = tempfile::tempdir().unwrap();
        let backend = self::backend(SyntheticStillSource::new(), &dir);
        assert!(backend.set_device_position(LensFacing::Front).await);
        let raw = backend
            .take_picture(PhotoOptions {
                mirror_correction: false,
            })
            .await
            .unwrap();
        let (left, right) = half_brightness(&raw);
        assert!(left > right, "left {} right {}", left, right);
    }

    #[tokio::test]
    async fn test_capture_failure_reports_none() {
        let dir = tempfile::tempdir().unwrap();
        let source = SyntheticStillSource::new();
        source.fail_captures(true);
        let backend = backend(source.clone(), &dir);

        let (status, rx) = lock(&backend, PhotoOptions::default()).await;
        assert_eq!(status, LockFocusStatus::Started);
        assert_eq!(rx.await.unwrap(), None);

        // Not left busy after a failure
        source.fail_captures(false);
        assert!(backend.take_picture(PhotoOptions::default()).await.is_some());
    }

    #[tokio::test]
    async fn test_second_capture_while_busy() {
        let dir = tempfile::tempdir().unwrap();
        let source = SyntheticStillSource::new().with_exposure(Duration::from_millis(200));
        let backend = backend(source, &dir);

        let (first, first_rx) = lock(&backend, PhotoOptions::default()).await;
        assert_eq!(first, LockFocusStatus::Started);
        assert!(!backend.is_ready().await);

        let (second, second_rx) = lock(&backend, PhotoOptions::default()).await;
        assert_eq!(second, LockFocusStatus::Busy);
        assert_eq!(second_rx.await.unwrap(), None);

        assert!(first_rx.await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_flash_follows_active_camera() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(SyntheticStillSource::new(), &dir);

        assert!(backend.set_flash_mode(true).await);
        assert!(backend.flash_mode().await);

        assert!(backend.set_device_position(LensFacing::Front).await);
        assert!(!backend.flash_mode().await);
        assert!(!backend.set_flash_mode(true).await);

        let caps = backend.capabilities().await.unwrap();
        assert!(!caps.has_flash);
    }

    #[tokio::test]
    async fn test_torch_requires_flash_unit() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(SyntheticStillSource::new(), &dir);

        assert!(backend.set_torch_mode(true).await);
        assert!(backend.torch_mode().await);
        assert!(!backend.set_torch_mode(false).await);
        assert!(!backend.torch_mode().await);

        assert!(backend.set_torch_mode(true).await);
        assert!(backend.set_device_position(LensFacing::Front).await);
        assert!(!backend.torch_mode().await);
        assert!(!backend.set_torch_mode(true).await);
    }

    #[tokio::test]
    async fn test_stopped_backend_refuses_capture() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(SyntheticStillSource::new(), &dir);

        backend.stop().await.unwrap();
        assert!(!backend.is_ready().await);
        let (status, rx) = lock(&backend, PhotoOptions::default()).await;
        assert_eq!(status, LockFocusStatus::NoSession);
        assert_eq!(rx.await.unwrap(), None);

        backend.start().await.unwrap();
        assert!(backend.wait_ready(Duration::from_secs(1)).await);
    }

    #[tokio::test]
    async fn test_shutdown_stops_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(SyntheticStillSource::new(), &dir);
        assert!(backend.set_torch_mode(true).await);

        backend.shutdown().await;
        assert!(!backend.is_ready().await);
        assert!(!backend.torch_mode().await);
    }

    #[tokio::test]
    async fn test_request_permissions_grants_all() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = NaCameraConfig::default();
        config.storage.private_root = dir.path().join("captures");
        let backend = SequentialBackend::new(
            SyntheticStillSource::new(),
            &config,
            Arc::new(StaticPermissions::with_granted(&[PermissionKind::Camera], true)),
        );

        let info = backend.request_permissions().await;
        assert!(info.is_granted());
    }
}
