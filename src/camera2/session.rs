//! Preview Session Builder
//!
//! A session always targets the live preview surface and the still reader
//! surface, so a still capture never renegotiates the session. Sessions are
//! replaced wholesale: each request bumps the generation and configuration
//! callbacks for older generations are dropped.

use super::handlers::{CaptureResultHandler, EventSink, SessionStateHandler};
use super::hal::{CameraDevice, CaptureSession, ImageReader};
use super::metadata::{
    AeMode, AfMode, AfTrigger, AePrecaptureTrigger, CaptureRequest, CaptureRequestBuilder,
    ControlMode, FlashMode, RequestTemplate, Surface,
};
use crate::config::PreviewConfig;
use crate::errors::CameraError;
use crate::types::Size;
use std::sync::Arc;

/// Flash and torch settings applied to requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlashSettings {
    pub flash_enabled: bool,
    pub flash_supported: bool,
    pub torch_enabled: bool,
}

impl FlashSettings {
    fn flash_active(&self) -> bool {
        self.flash_enabled && self.flash_supported
    }

    fn torch_active(&self) -> bool {
        self.torch_enabled && self.flash_supported
    }

    /// AE and flash modes for the repeating preview request
    pub fn preview_modes(&self) -> (AeMode, FlashMode) {
        if self.flash_active() {
            (AeMode::OnAlwaysFlash, FlashMode::Torch)
        } else if self.torch_active() {
            (AeMode::On, FlashMode::Torch)
        } else {
            (AeMode::On, FlashMode::Off)
        }
    }

    /// AE and flash modes for the one-shot still request
    pub fn still_modes(&self) -> (AeMode, FlashMode) {
        if self.flash_active() {
            (AeMode::OnAlwaysFlash, FlashMode::Torch)
        } else {
            (AeMode::On, FlashMode::Off)
        }
    }
}

/// Outcome of a session creation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRequest {
    /// Creation issued; configuration arrives with this generation
    Requested { generation: u64 },
    /// Surface or device missing
    Skipped,
}

#[derive(Debug)]
pub struct PreviewSessionBuilder {
    buffer_size: Size,
    continuous_autofocus: bool,
    surface: Option<Surface>,
    generation: u64,
    builder: Option<CaptureRequestBuilder>,
    session: Option<Arc<dyn CaptureSession>>,
}

impl PreviewSessionBuilder {
    pub fn new(config: &PreviewConfig) -> Self {
        Self {
            buffer_size: config.buffer_size(),
            continuous_autofocus: config.continuous_autofocus,
            surface: None,
            generation: 0,
            builder: None,
            session: None,
        }
    }

    pub fn set_surface(&mut self, surface: Surface) {
        self.surface = Some(surface.with_size(self.buffer_size));
    }

    pub fn clear_surface(&mut self) {
        self.surface = None;
    }

    pub fn has_surface(&self) -> bool {
        self.surface.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn session(&self) -> Option<&Arc<dyn CaptureSession>> {
        self.session.as_ref()
    }

    /// Ask the device for a new session over the preview and reader surfaces.
    ///
    /// The previous session, if any, is closed.
    pub fn create_preview_session(
        &mut self,
        device: Option<&Arc<dyn CameraDevice>>,
        reader: Option<&Arc<dyn ImageReader>>,
        sink: &EventSink,
    ) -> Result<SessionRequest, CameraError> {
        let (surface, device) = match (self.surface, device) {
            (Some(surface), Some(device)) => (surface, device),
            _ => {
                log::debug!("Preview session skipped: surface or device not ready");
                return Ok(SessionRequest::Skipped);
            }
        };

        self.close();

        let mut builder = device.create_capture_request(RequestTemplate::Preview)?;
        builder.add_target(surface);

        let mut outputs = vec![surface];
        if let Some(reader) = reader {
            outputs.push(reader.surface());
        }

        self.generation += 1;
        self.builder = Some(builder);
        log::info!(
            "Creating preview session (generation {}) at {}",
            self.generation,
            surface.size
        );
        device.create_capture_session(
            outputs,
            SessionStateHandler::new(sink.clone(), self.generation),
        )?;
        Ok(SessionRequest::Requested {
            generation: self.generation,
        })
    }

    /// Session negotiated. Returns false when it belongs to a replaced
    /// generation, in which case it is closed and ignored.
    pub fn on_configured(
        &mut self,
        generation: u64,
        session: Arc<dyn CaptureSession>,
        flash: FlashSettings,
        handler: CaptureResultHandler,
    ) -> Result<bool, CameraError> {
        if generation != self.generation || self.builder.is_none() {
            log::debug!("Ignoring stale session generation {}", generation);
            session.close();
            return Ok(false);
        }

        self.session = Some(session);
        self.resume_repeating(flash, handler)?;
        log::info!("Preview session {} configured", generation);
        Ok(true)
    }

    pub fn on_configure_failed(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        log::warn!(
            "Preview session {} failed to configure; session left unusable",
            generation
        );
        self.session = None;
    }

    /// (Re)issue the repeating preview request with the current flash settings
    pub fn resume_repeating(
        &mut self,
        flash: FlashSettings,
        handler: CaptureResultHandler,
    ) -> Result<(), CameraError> {
        let continuous_autofocus = self.continuous_autofocus;
        let (session, builder) = self.parts()?;

        if continuous_autofocus {
            builder.set_af_mode(AfMode::ContinuousPicture);
        }
        let (ae_mode, flash_mode) = flash.preview_modes();
        builder
            .set_ae_mode(ae_mode)
            .set_flash_mode(flash_mode)
            .set_af_trigger(AfTrigger::Idle)
            .set_ae_precapture_trigger(AePrecaptureTrigger::Idle);

        session.set_repeating_request(builder.build(), handler)
    }

    pub fn stop_repeating(&mut self) -> Result<(), CameraError> {
        match &self.session {
            Some(session) => session.stop_repeating(),
            None => Ok(()),
        }
    }

    /// Issue a single preview-template request with the AF trigger set
    pub fn trigger_autofocus(
        &mut self,
        trigger: AfTrigger,
        handler: CaptureResultHandler,
    ) -> Result<(), CameraError> {
        let (session, builder) = self.parts()?;
        builder.set_af_trigger(trigger);
        let request = builder.build();
        builder.set_af_trigger(AfTrigger::Idle);
        session.capture(request, handler)
    }

    /// Issue a single preview-template request with the AE precapture trigger set
    pub fn trigger_precapture(&mut self, handler: CaptureResultHandler) -> Result<(), CameraError> {
        let (session, builder) = self.parts()?;
        builder.set_ae_precapture_trigger(AePrecaptureTrigger::Start);
        let request = builder.build();
        builder.set_ae_precapture_trigger(AePrecaptureTrigger::Idle);
        session.capture(request, handler)
    }

    /// Stop the preview, drop in-flight captures and issue `still`
    pub fn capture_still(
        &mut self,
        still: CaptureRequest,
        handler: CaptureResultHandler,
    ) -> Result<(), CameraError> {
        let (session, _) = self.parts()?;
        session.stop_repeating()?;
        session.abort_captures()?;
        session.capture(still, handler)
    }

    /// Close the current session; generation callbacks still in flight are
    /// ignored afterwards
    pub fn close(&mut self) {
        if let Some(session) = self.session.take() {
            log::debug!("Closing preview session {}", self.generation);
            session.close();
        }
        self.builder = None;
    }

    /// Drop everything tied to the current device
    pub fn invalidate(&mut self) {
        self.session = None;
        self.builder = None;
        self.generation += 1;
    }

    fn parts(
        &mut self,
    ) -> Result<(Arc<dyn CaptureSession>, &mut CaptureRequestBuilder), CameraError> {
        match (&self.session, self.builder.as_mut()) {
            (Some(session), Some(builder)) => Ok((session.clone(), builder)),
            _ => Err(CameraError::SessionConfigurationFailed(
                "No configured preview session".to_string(),
            )),
        }
    }
}

/// One-shot still request into the reader surface
pub fn build_still_request(
    device: &dyn CameraDevice,
    reader: &dyn ImageReader,
    flash: FlashSettings,
) -> Result<CaptureRequest, CameraError> {
    let mut builder = device.create_capture_request(RequestTemplate::StillCapture)?;
    let (ae_mode, flash_mode) = flash.still_modes();
    builder
        .add_target(reader.surface())
        .set_control_mode(ControlMode::Auto)
        .set_af_mode(AfMode::ContinuousPicture)
        .set_ae_mode(ae_mode)
        .set_flash_mode(flash_mode);
    Ok(builder.build())
}
