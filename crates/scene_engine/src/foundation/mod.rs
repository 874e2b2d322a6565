//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and the tagged [`Variant`] value
//! - Handle collections
//! - Logging utilities

pub mod math;
pub mod variant;
pub mod collections;
pub mod logging;

pub use variant::{AssetReference, EntityReference, Variant, VariantType};
