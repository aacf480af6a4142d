//! Device Session Manager
//!
//! Owns the single open device handle. Open and close are serialized by a
//! binary permit: an open holds it until its completion callback arrives,
//! a close holds it across the close call.

use super::handlers::DeviceStateHandler;
use super::hal::{Camera2Hal, CameraDevice};
use super::metadata::DeviceErrorCode;
use crate::errors::CameraError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug)]
pub struct DeviceSessionManager {
    permit: Arc<Semaphore>,
    in_flight: Option<OwnedSemaphorePermit>,
    opening: Option<String>,
    close_when_opened: bool,
    device: Option<Arc<dyn CameraDevice>>,
}

impl Default for DeviceSessionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSessionManager {
    pub fn new() -> Self {
        Self {
            permit: Arc::new(Semaphore::new(1)),
            in_flight: None,
            opening: None,
            close_when_opened: false,
            device: None,
        }
    }

    pub fn device(&self) -> Option<&Arc<dyn CameraDevice>> {
        self.device.as_ref()
    }

    /// Camera id of the open device, or of the one being opened
    pub fn camera_id(&self) -> Option<&str> {
        self.device
            .as_ref()
            .map(|d| d.id())
            .or(self.opening.as_deref())
    }

    pub fn is_open_in_flight(&self) -> bool {
        self.opening.is_some()
    }

    pub fn available_permits(&self) -> usize {
        self.permit.available_permits()
    }

    /// Issue an open. The outcome arrives later on `handler`.
    ///
    /// Never waits for the permit: the caller is the event loop that
    /// delivers the completion releasing it.
    pub fn open(
        &mut self,
        hal: &dyn Camera2Hal,
        camera_id: &str,
        handler: DeviceStateHandler,
    ) -> Result<(), CameraError> {
        if self.device.is_some() {
            return Err(CameraError::Busy(format!(
                "Camera {} is already open",
                self.camera_id().unwrap_or_default()
            )));
        }
        let permit = self.permit.clone().try_acquire_owned().map_err(|_| {
            CameraError::Busy("Camera open or close already in progress".to_string())
        })?;

        log::info!("Opening camera {}", camera_id);
        // Permit is dropped, and so released, if the call fails
        hal.open_camera(camera_id, handler)?;

        self.in_flight = Some(permit);
        self.opening = Some(camera_id.to_string());
        self.close_when_opened = false;
        Ok(())
    }

    /// Open completed. Returns false when a close arrived in the meantime and
    /// the device was closed again right away.
    pub fn on_opened(&mut self, device: Arc<dyn CameraDevice>) -> bool {
        self.release();
        if self.close_when_opened {
            log::info!("Camera {} opened after close was requested, closing", device.id());
            self.close_when_opened = false;
            device.close();
            return false;
        }
        log::info!("Camera {} opened", device.id());
        self.device = Some(device);
        true
    }

    pub fn on_disconnected(&mut self, device: Arc<dyn CameraDevice>) {
        log::warn!("Camera {} disconnected", device.id());
        self.discard(device);
    }

    pub fn on_error(&mut self, device: Arc<dyn CameraDevice>, code: DeviceErrorCode) {
        log::error!("Camera {} error: {:?}", device.id(), code);
        self.discard(device);
    }

    /// Close the open device. A close during an in-flight open is deferred
    /// until the open completes.
    pub fn close(&mut self) -> Result<(), CameraError> {
        if self.opening.is_some() {
            log::info!("Close requested while opening, deferring");
            self.close_when_opened = true;
            return Ok(());
        }

        let _permit = self.permit.clone().try_acquire_owned().map_err(|_| {
            CameraError::Busy("Camera open or close already in progress".to_string())
        })?;
        if let Some(device) = self.device.take() {
            log::info!("Closing camera {}", device.id());
            device.close();
        }
        Ok(())
    }

    fn release(&mut self) {
        self.opening = None;
        self.in_flight = None;
    }

    fn discard(&mut self, device: Arc<dyn CameraDevice>) {
        self.release();
        self.close_when_opened = false;
        device.close();
        let is_current = self
            .device
            .as_ref()
            .map(|d| Arc::ptr_eq(d, &device) || d.id() == device.id())
            .unwrap_or(false);
        if is_current {
            self.device = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera2::handlers::{EventSink, Message};
    use crate::camera2::hal::CameraDevice;
    use crate::camera2::simulated::{HalCall, SimulatedCamera2};
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    fn handler() -> (DeviceStateHandler, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(tx, Arc::new(AtomicUsize::new(0)));
        (DeviceStateHandler::new(sink), rx)
    }

    fn opened_device(rx: &mut mpsc::UnboundedReceiver<Message>) -> Arc<dyn CameraDevice> {
        match rx.try_recv() {
            Ok(Message::Hardware(crate::camera2::handlers::HardwareEvent::DeviceOpened(d))) => d,
            _ => panic!("expected DeviceOpened"),
        }
    }

    #[test]
    fn test_permit_held_until_open_completes() {
        let hal = SimulatedCamera2::manual();
        let (handler, mut rx) = handler();
        let mut manager = DeviceSessionManager::new();

        manager.open(&hal, "0", handler.clone()).unwrap();
        assert_eq!(manager.available_permits(), 0);
        assert!(manager.is_open_in_flight());
        assert_eq!(manager.camera_id(), Some("0"));

        // Second open while the first is in flight is refused
        assert!(matches!(
            manager.open(&hal, "1", handler),
            Err(CameraError::Busy(_))
        ));

        assert!(manager.on_opened(opened_device(&mut rx)));
        assert_eq!(manager.available_permits(), 1);
        assert!(manager.device().is_some());
    }

    #[test]
    fn test_close_during_open_is_deferred() {
        let hal = SimulatedCamera2::manual();
        let (handler, mut rx) = handler();
        let mut manager = DeviceSessionManager::new();

        manager.open(&hal, "0", handler).unwrap();
        manager.close().unwrap();
        assert!(!manager.on_opened(opened_device(&mut rx)));
        assert!(manager.device().is_none());
        assert_eq!(manager.available_permits(), 1);
        assert!(hal.calls().contains(&HalCall::CloseDevice("0".to_string())));
    }

    #[test]
    fn test_error_releases_permit_and_discards_handle() {
        let hal = SimulatedCamera2::manual();
        let (handler, mut rx) = handler();
        let mut manager = DeviceSessionManager::new();

        manager.open(&hal, "0", handler).unwrap();
        let device = opened_device(&mut rx);
        manager.on_opened(device.clone());
        manager.on_error(device, DeviceErrorCode::CameraDevice);

        assert!(manager.device().is_none());
        assert_eq!(manager.available_permits(), 1);
        assert!(manager.camera_id().is_none());
    }

    #[test]
    fn test_failed_open_call_releases_permit() {
        let hal = SimulatedCamera2::manual();
        let (handler, _rx) = handler();
        let mut manager = DeviceSessionManager::new();

        assert!(manager.open(&hal, "missing", handler).is_err());
        assert_eq!(manager.available_permits(), 1);
        assert!(!manager.is_open_in_flight());
    }

    #[test]
    fn test_close_without_device_is_noop() {
        let mut manager = DeviceSessionManager::new();
        assert!(manager.close().is_ok());
        assert_eq!(manager.available_permits(), 1);
    }
}
