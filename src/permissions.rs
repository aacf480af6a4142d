use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (parental controls, etc)
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Runtime permissions the plugin asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    Camera,
    ReadStorage,
    WriteStorage,
}

impl PermissionKind {
    /// Everything requested up front when the view is created
    pub const ALL: [PermissionKind; 3] = [
        PermissionKind::WriteStorage,
        PermissionKind::ReadStorage,
        PermissionKind::Camera,
    ];
}

/// Detailed permission information
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PermissionInfo {
    pub status: PermissionStatus,
    pub message: String,
    pub can_request: bool,
}

impl PermissionInfo {
    pub fn granted(message: impl Into<String>) -> Self {
        Self {
            status: PermissionStatus::Granted,
            message: message.into(),
            can_request: false,
        }
    }

    pub fn denied(message: impl Into<String>, can_request: bool) -> Self {
        Self {
            status: PermissionStatus::Denied,
            message: message.into(),
            can_request,
        }
    }

    pub fn is_granted(&self) -> bool {
        self.status == PermissionStatus::Granted
    }
}

/// OS permission dialog. Requests are delegated to the host; the plugin never
/// retries a denial on its own.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    fn check(&self, kind: PermissionKind) -> PermissionInfo;

    async fn request(&self, kinds: &[PermissionKind]) -> PermissionInfo;
}

/// Fixed grant set, used by simulated hardware and tests
#[derive(Debug, Default)]
pub struct StaticPermissions {
    granted: Mutex<HashSet<PermissionKind>>,
    grant_on_request: bool,
}

impl StaticPermissions {
    pub fn granting_all() -> Self {
        Self {
            granted: Mutex::new(PermissionKind::ALL.into_iter().collect()),
            grant_on_request: true,
        }
    }

    pub fn denying_all() -> Self {
        Self::default()
    }

    pub fn with_granted(kinds: &[PermissionKind], grant_on_request: bool) -> Self {
        Self {
            granted: Mutex::new(kinds.iter().copied().collect()),
            grant_on_request,
        }
    }
}

#[async_trait]
impl PermissionProvider for StaticPermissions {
    fn check(&self, kind: PermissionKind) -> PermissionInfo {
        let granted = self
            .granted
            .lock()
            .map(|g| g.contains(&kind))
            .unwrap_or(false);
        if granted {
            PermissionInfo::granted(format!("{:?} permission granted", kind))
        } else {
            PermissionInfo::denied(format!("{:?} permission not granted", kind), self.grant_on_request)
        }
    }

    async fn request(&self, kinds: &[PermissionKind]) -> PermissionInfo {
        if self.grant_on_request {
            if let Ok(mut granted) = self.granted.lock() {
                granted.extend(kinds.iter().copied());
            }
        }

        match kinds.iter().find(|k| !self.check(**k).is_granted()) {
            None => PermissionInfo::granted("All requested permissions granted"),
            Some(kind) => {
                log::warn!("Permission request denied for {:?}", kind);
                PermissionInfo::denied(format!("{:?} permission denied", kind), false)
            }
        }
    }
}

/// Desktop hosts have no runtime dialog; storage is always writable and
/// camera access is inferred from device nodes.
#[derive(Debug, Default)]
pub struct HostPermissions;

#[async_trait]
impl PermissionProvider for HostPermissions {
    fn check(&self, kind: PermissionKind) -> PermissionInfo {
        match kind {
            PermissionKind::ReadStorage | PermissionKind::WriteStorage => {
                PermissionInfo::granted("Host filesystem access")
            }
            PermissionKind::Camera => check_camera_host(),
        }
    }

    async fn request(&self, kinds: &[PermissionKind]) -> PermissionInfo {
        log::info!("Requesting host permissions: {:?}", kinds);
        match kinds.iter().map(|k| self.check(*k)).find(|i| !i.is_granted()) {
            Some(info) => info,
            None => PermissionInfo::granted("All requested permissions granted"),
        }
    }
}

#[cfg(target_os = "linux")]
fn check_camera_host() -> PermissionInfo {
    use std::path::Path;

    let video_devices: Vec<_> = (0..10)
        .map(|i| format!("/dev/video{}", i))
        .filter(|path| Path::new(path).exists())
        .collect();

    match video_devices.first() {
        None => PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "No video devices found at /dev/video*".to_string(),
            can_request: false,
        },
        Some(first) => match std::fs::File::open(first) {
            Ok(_) => PermissionInfo::granted(format!("Camera access granted ({})", first)),
            Err(e) => PermissionInfo::denied(
                format!("Cannot access {}: {} - run: sudo usermod -a -G video $USER", first, e),
                false,
            ),
        },
    }
}

#[cfg(not(target_os = "linux"))]
fn check_camera_host() -> PermissionInfo {
    PermissionInfo {
        status: PermissionStatus::NotDetermined,
        message: "Camera permission is managed by the operating system".to_string(),
        can_request: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(PermissionStatus::Granted.to_string(), "granted");
        assert_eq!(PermissionStatus::NotDetermined.to_string(), "not_determined");
    }

    #[test]
    fn test_static_permissions_check() {
        let perms = StaticPermissions::with_granted(&[PermissionKind::Camera], false);
        assert!(perms.check(PermissionKind::Camera).is_granted());
        assert!(!perms.check(PermissionKind::WriteStorage).is_granted());
    }

    #[tokio::test]
    async fn test_request_grants_when_allowed() {
        let perms = StaticPermissions::with_granted(&[], true);
        let info = perms.request(&PermissionKind::ALL).await;
        assert!(info.is_granted());
        assert!(perms.check(PermissionKind::WriteStorage).is_granted());
    }

    #[tokio::test]
    async fn test_request_denied_is_not_retried() {
        let perms = StaticPermissions::denying_all();
        let info = perms.request(&[PermissionKind::Camera]).await;
        assert_eq!(info.status, PermissionStatus::Denied);
        assert!(!info.can_request);
        assert!(!perms.check(PermissionKind::Camera).is_granted());
    }

    #[test]
    fn test_host_storage_always_granted() {
        let perms = HostPermissions;
        assert!(perms.check(PermissionKind::WriteStorage).is_granted());
    }
}
