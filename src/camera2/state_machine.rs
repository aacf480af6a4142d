//! Focus and exposure lock sequencing
//!
//! Driven by every preview capture result, partial or complete, in arrival
//! order. Decides when the still capture may be issued.

use super::metadata::{AeState, CaptureResult};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    /// Showing preview, no capture in progress
    Preview,
    /// AF trigger issued, waiting for focus to lock
    WaitingLock,
    /// Precapture trigger issued, waiting for AE to start metering
    WaitingPrecapture,
    /// Waiting for AE metering to finish
    WaitingNonPrecapture,
    /// Still capture issued
    PictureTaken,
}

impl fmt::Display for CaptureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptureState::Preview => "PREVIEW",
            CaptureState::WaitingLock => "WAITING_LOCK",
            CaptureState::WaitingPrecapture => "WAITING_PRECAPTURE",
            CaptureState::WaitingNonPrecapture => "WAITING_NON_PRECAPTURE",
            CaptureState::PictureTaken => "PICTURE_TAKEN",
        };
        f.write_str(name)
    }
}

/// What the controller must do after a result was processed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureAction {
    /// Stop the preview and issue the one-shot still request
    CaptureStill,
    /// Issue a single request with the AE precapture trigger set
    RunPrecapture,
}

#[derive(Debug, Clone)]
pub struct CaptureStateMachine {
    state: CaptureState,
}

impl Default for CaptureStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureStateMachine {
    pub fn new() -> Self {
        Self {
            state: CaptureState::Preview,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == CaptureState::Preview
    }

    /// Enter `WaitingLock` after the AF trigger was issued.
    ///
    /// Only allowed from `Preview`; otherwise the current state is returned.
    pub fn begin_lock(&mut self) -> Result<(), CaptureState> {
        if self.state != CaptureState::Preview {
            return Err(self.state);
        }
        self.transition(CaptureState::WaitingLock);
        Ok(())
    }

    /// Back to `Preview` once focus is unlocked or the sequence was abandoned
    pub fn reset(&mut self) {
        if self.state != CaptureState::Preview {
            self.transition(CaptureState::Preview);
        }
    }

    /// Feed one capture result
    pub fn process(&mut self, result: &CaptureResult) -> Option<CaptureAction> {
        match self.state {
            CaptureState::Preview | CaptureState::PictureTaken => None,
            CaptureState::WaitingLock => match result.af_state {
                // Some devices never report AF state
                None => self.take_picture(),
                Some(af) if af.is_locked() => match result.ae_state {
                    None | Some(AeState::Converged) => self.take_picture(),
                    Some(_) => {
                        self.transition(CaptureState::WaitingPrecapture);
                        Some(CaptureAction::RunPrecapture)
                    }
                },
                Some(_) => None,
            },
            CaptureState::WaitingPrecapture => {
                if matches!(
                    result.ae_state,
                    None | Some(AeState::Precapture) | Some(AeState::FlashRequired)
                ) {
                    self.transition(CaptureState::WaitingNonPrecapture);
                }
                None
            }
            CaptureState::WaitingNonPrecapture => {
                if result.ae_state != Some(AeState::Precapture) {
                    self.take_picture()
                } else {
                    None
                }
            }
        }
    }

    fn take_picture(&mut self) -> Option<CaptureAction> {
        self.transition(CaptureState::PictureTaken);
        Some(CaptureAction::CaptureStill)
    }

    fn transition(&mut self, next: CaptureState) {
        log::debug!("Capture state {} -> {}", self.state, next);
        self.state = next;
    }
}
