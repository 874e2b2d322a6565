//! # Core Module
//!
//! The [`Framework`] ties the subsystems together: it owns the
//! [`SceneManager`](crate::scene::SceneManager), the settings store and the
//! event system, and is configured through [`FrameworkConfig`].

pub mod config;
mod framework;

pub use config::{Config, ConfigError, FrameworkConfig};
pub use framework::{Framework, FrameworkError};
