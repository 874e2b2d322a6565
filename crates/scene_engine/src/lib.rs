//! # Scene Engine
//!
//! Scene, entity, component and attribute core of a networked virtual world
//! engine, with binary and structured-text scene serialization.
//!
//! ## Features
//!
//! - **Typed attributes**: components hold named attributes of registered
//!   value types, each with a binary and a textual form
//! - **Component registry**: built-in component types, custom factories and
//!   data-only placeholders for types loaded from unknown scene files
//! - **Entity forest**: entities with replicated, unacked or local ids and
//!   parent/child links
//! - **Scene persistence**: RON or JSON scene documents and a compact binary
//!   layout, both loaded all-or-nothing
//! - **Collaborators**: sectioned settings store and a JSON value tree
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut framework = Framework::new(FrameworkConfig::default())?;
//!     let key = framework.scene_mut().create_scene("main", false, true);
//!     let scene = framework.scene_mut().scene_mut("main").ok_or("no scene")?;
//!
//!     let mut entity = scene.create_entity(0, &["Placeable"], AttributeChange::Default, CreateFlags::default())?;
//!     entity.set_name("Crate", AttributeChange::Default)?;
//!
//!     scene.save_scene_document("main.ron", false, false)?;
//!     framework.process_events();
//!     assert!(key.is_some());
//!     Ok(())
//! }
//! ```

pub mod core;

pub mod config;
pub mod events;
pub mod foundation;
pub mod json;
pub mod scene;
pub mod serialization;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigApi, ConfigData, ConfigError},
        core::{Framework, FrameworkConfig, FrameworkError},
        events::{EventSystem, SceneEvent, SceneEventHandler, SceneEventType},
        foundation::{
            math::{Color, Quat, Transform, Vec2, Vec3, Vec4},
            AssetReference, EntityReference, Variant, VariantType,
        },
        json::{JsonError, JsonValue},
        scene::{
            Attribute, AttributeChange, Component, ComponentDesc, ComponentTypeRef, CreateFlags, Entity, EntityId,
            EntityMut, Scene, SceneConfig, SceneError, SceneManager,
        },
    };
}
