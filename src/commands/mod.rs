pub mod camera;
pub mod config;
pub mod permissions;

pub use camera::*;
pub use config::*;
pub use permissions::*;
