//! Scene module - entities, components and attributes
//!
//! A [`Scene`] owns a forest of [`Entity`] values keyed by [`EntityId`].
//! Entities own [`Component`]s, components own named [`Attribute`]s. Type
//! information lives in an [`AttributeRegistry`] and a [`ComponentRegistry`]
//! shared by all scenes of a [`SceneManager`].
//!
//! Scenes persist as structured text documents ([`SceneDocument`], RON or
//! JSON) or in a compact binary layout.

pub mod id_generator;

mod attribute;
mod attribute_registry;
mod binary;
mod component;
mod component_registry;
mod document;
mod entity;
mod scene_manager;
mod world;

#[cfg(test)]
mod tests;

pub use attribute::{
    decode_tagged, decode_value, encode_tagged, encode_value, Attribute, AttributeChange, AttributeError,
    AttributeOwner, ValueKind,
};
pub use attribute_registry::{AttributeRegistry, AttributeType, RegistryError};
pub use component::{Component, ComponentOwner};
pub use component_registry::{
    ensure_type_name_without_prefix, placeholder_type_id, type_name_hash, AttributeSchema, ComponentDesc,
    ComponentFactory, ComponentRegistry,
};
pub use document::{AttributeRecord, ComponentRecord, EntityRecord, SceneDocument};
pub use entity::{ComponentTypeRef, Entity, NAME_COMPONENT};
pub use id_generator::{ComponentId, EntityId, IdReusePolicy, UniqueIdGenerator};
pub use scene_manager::SceneManager;
pub use world::{CreateFlags, EntityMut, Scene, SceneConfig, SceneError};
