// Glyphpad - Touchpad symbol recognizer
// Module declarations

pub mod classifier;
pub mod config;
pub mod dispatch;
pub mod features;
pub mod gesture;
pub mod pipeline;
pub mod state;
pub mod touchpad;

pub use config::{Config, ConfigError};
