//! Testing utilities for NaCamera
//!
//! Synthetic stills, simulated camera layouts and capture-result scripts
//! for running the capture pipeline without hardware.

pub mod synthetic_data;

pub use synthetic_data::{
    fixed_focus_script, instant_lock_script, phone_cameras, precapture_script,
    synthetic_jpeg, synthetic_rgb_frame, SyntheticStillSource,
};
