//! Scene storage: the entity forest, its id space and the change queue

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::events::{SceneEvent, SceneEventType};
use crate::foundation::collections::{read, shared, SceneKey, Shared};
use crate::foundation::logging::{debug, error};
use crate::foundation::variant::Variant;
use crate::serialization::codec::CodecError;

use super::attribute::{AttributeChange, AttributeError};
use super::attribute_registry::AttributeRegistry;
use super::component::Component;
use super::component_registry::ComponentRegistry;
use super::entity::{ComponentTypeRef, Entity, NAME_COMPONENT};
use super::id_generator::{ComponentId, EntityId, IdReusePolicy, UniqueIdGenerator};

bitflags! {
    /// Options for entity creation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CreateFlags: u8 {
        /// Take the id from the replicated ranges instead of the local one
        const REPLICATED = 1;
        /// Eagerly created components are replicated
        const COMPONENTS_REPLICATED = 1 << 1;
        /// Entity is skipped when saving
        const TEMPORARY = 1 << 2;
    }
}

impl Default for CreateFlags {
    fn default() -> Self {
        Self::REPLICATED | Self::COMPONENTS_REPLICATED
    }
}

/// Per-scene settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Authority scenes hand out replicated ids, others unacked ids
    pub authority: bool,
    /// Whether the scene is meant to be rendered
    pub view_enabled: bool,
    /// What happens to ids of removed entities
    pub id_reuse: IdReusePolicy,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            authority: true,
            view_enabled: false,
            id_reuse: IdReusePolicy::Monotonic,
        }
    }
}

impl SceneConfig {
    /// Set authority (builder pattern)
    #[must_use]
    pub const fn with_authority(mut self, authority: bool) -> Self {
        self.authority = authority;
        self
    }

    /// Set view flag (builder pattern)
    #[must_use]
    pub const fn with_view_enabled(mut self, view_enabled: bool) -> Self {
        self.view_enabled = view_enabled;
        self
    }

    /// Set id reuse policy (builder pattern)
    #[must_use]
    pub const fn with_id_reuse(mut self, id_reuse: IdReusePolicy) -> Self {
        self.id_reuse = id_reuse;
        self
    }
}

/// Scene errors
#[derive(Error, Debug)]
pub enum SceneError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Structured document could not be read or written
    #[error("Scene document error: {0}")]
    Document(String),

    /// Binary scene data is corrupt
    #[error("Binary scene data error: {0}")]
    Codec(#[from] CodecError),

    /// File extension names no known format
    #[error("Unsupported scene format: {0}")]
    UnsupportedFormat(String),

    /// No live entity with the id
    #[error("Entity {0} not found")]
    EntityNotFound(EntityId),

    /// Id already used by a live entity
    #[error("Entity id {0} is already in use")]
    IdInUse(EntityId),

    /// Id that can never name an entity
    #[error("Entity id {0} is reserved")]
    ReservedId(EntityId),

    /// Parent change would break the forest
    #[error("Cannot parent entity {child} to {parent}: {reason}")]
    InvalidParent {
        /// Entity being moved
        child: EntityId,
        /// Requested parent
        parent: EntityId,
        /// Why the change was refused
        reason: String,
    },

    /// Entity has no matching component
    #[error("Component {0} not found")]
    ComponentNotFound(String),

    /// Attribute rejected a value
    #[error(transparent)]
    Attribute(#[from] AttributeError),
}

impl From<ConfigError> for SceneError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => Self::Io(e),
            ConfigError::UnsupportedFormat(path) => Self::UnsupportedFormat(path),
            other => Self::Document(other.to_string()),
        }
    }
}

fn resolve_change(change: AttributeChange, mode: AttributeChange) -> AttributeChange {
    if change == AttributeChange::Default {
        mode
    } else {
        change
    }
}

/// A collection of entities forming a forest
///
/// Entities are stored by id. Every structural change is queued as a
/// [`SceneEvent`] unless made with [`AttributeChange::Disconnected`]; the
/// queue is emptied by [`Scene::drain_events`].
#[derive(Debug)]
pub struct Scene {
    pub(super) key: SceneKey,
    pub(super) name: String,
    pub(super) config: SceneConfig,
    pub(super) entities: BTreeMap<EntityId, Entity>,
    pub(super) ids: UniqueIdGenerator,
    pub(super) attribute_types: Shared<AttributeRegistry>,
    pub(super) component_types: Shared<ComponentRegistry>,
    pub(super) events: Vec<SceneEvent>,
}

impl Scene {
    /// Standalone scene with its own built-in registries
    pub fn new(name: &str, config: SceneConfig) -> Self {
        Self::with_registries(
            SceneKey::default(),
            name,
            config,
            shared(AttributeRegistry::with_builtins()),
            shared(ComponentRegistry::with_builtins()),
        )
    }

    pub(crate) fn with_registries(
        key: SceneKey,
        name: &str,
        config: SceneConfig,
        attribute_types: Shared<AttributeRegistry>,
        component_types: Shared<ComponentRegistry>,
    ) -> Self {
        Self {
            key,
            name: name.to_string(),
            ids: UniqueIdGenerator::new(config.id_reuse),
            config,
            entities: BTreeMap::new(),
            attribute_types,
            component_types,
            events: Vec::new(),
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key of this scene in the scene manager
    pub const fn key(&self) -> SceneKey {
        self.key
    }

    /// Scene settings
    pub const fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// True if this scene hands out replicated ids
    pub const fn is_authority(&self) -> bool {
        self.config.authority
    }

    /// True if the scene is meant to be rendered
    pub const fn view_enabled(&self) -> bool {
        self.config.view_enabled
    }

    /// Attribute registry shared with the scene manager
    pub fn attribute_registry(&self) -> Shared<AttributeRegistry> {
        Arc::clone(&self.attribute_types)
    }

    /// Component registry shared with the scene manager
    pub fn component_registry(&self) -> Shared<ComponentRegistry> {
        Arc::clone(&self.component_types)
    }

    /// Entity by id
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable handle to an entity
    pub fn entity_mut(&mut self, id: EntityId) -> Option<EntityMut<'_>> {
        if self.entities.contains_key(&id) {
            Some(EntityMut { scene: self, id })
        } else {
            None
        }
    }

    /// True if an entity with the id is live
    pub fn has_entity(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of live entities, nested ones included
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if the scene holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All live entities in id order
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Entities without a parent in id order
    pub fn root_level_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| e.parent().is_none())
    }

    /// Next unused id in the replicated range this scene allocates from
    pub fn next_free_id(&mut self) -> EntityId {
        loop {
            let id = if self.config.authority {
                self.ids.allocate_replicated()
            } else {
                self.ids.allocate_unacked()
            };
            if !self.entities.contains_key(&id) {
                return id;
            }
        }
    }

    /// Next unused local id
    pub fn next_free_id_local(&mut self) -> EntityId {
        loop {
            let id = self.ids.allocate_local();
            if !self.entities.contains_key(&id) {
                return id;
            }
        }
    }

    /// Create an entity with the given components
    ///
    /// An id of 0 allocates a fresh id from the range selected by
    /// [`CreateFlags::REPLICATED`]. Unknown component types are logged and
    /// skipped.
    pub fn create_entity(
        &mut self,
        id: EntityId,
        components: &[&str],
        change: AttributeChange,
        flags: CreateFlags,
    ) -> Result<EntityMut<'_>, SceneError> {
        let id = if id == 0 {
            if flags.contains(CreateFlags::REPLICATED) {
                self.next_free_id()
            } else {
                self.next_free_id_local()
            }
        } else {
            if self.entities.contains_key(&id) {
                error!("Cannot create entity with id {id}: the id is already in use");
                return Err(SceneError::IdInUse(id));
            }
            self.ids.claim(id);
            self.ids.reset_replicated_id(id);
            id
        };

        let mut entity = Entity::new(id, self.key);
        entity.set_temporary_flag(flags.contains(CreateFlags::TEMPORARY));
        self.entities.insert(id, entity);
        self.queue_event(SceneEvent::new(
            SceneEventType::EntityCreated,
            self.key,
            id,
            resolve_change(change, AttributeChange::Replicate),
        ));

        let mut handle = EntityMut { scene: self, id };
        let replicated = flags.contains(CreateFlags::COMPONENTS_REPLICATED);
        for type_name in components {
            handle.create_component(*type_name, "", change, replicated);
        }
        Ok(handle)
    }

    /// Create an entity with a local id
    pub fn create_local_entity(
        &mut self,
        components: &[&str],
        change: AttributeChange,
    ) -> Result<EntityMut<'_>, SceneError> {
        self.create_entity(0, components, change, CreateFlags::empty())
    }

    /// Create a replicated entity that is skipped when saving
    pub fn create_temporary_entity(
        &mut self,
        components: &[&str],
        change: AttributeChange,
    ) -> Result<EntityMut<'_>, SceneError> {
        self.create_entity(0, components, change, CreateFlags::default() | CreateFlags::TEMPORARY)
    }

    /// Remove an entity and its whole subtree
    ///
    /// Returns false if no entity has the id.
    pub fn remove_entity(&mut self, id: EntityId, change: AttributeChange) -> bool {
        let Some(parent) = self.entities.get(&id).map(Entity::parent) else {
            return false;
        };
        if let Some(parent) = parent.and_then(|p| self.entities.get_mut(&p)) {
            parent.remove_child_id(id);
        }
        self.remove_subtree(id, change);
        true
    }

    fn remove_subtree(&mut self, id: EntityId, change: AttributeChange) {
        let Some(entity) = self.entities.remove(&id) else {
            return;
        };
        for child in entity.children() {
            self.remove_subtree(*child, change);
        }
        for component in entity.components() {
            self.queue_event(
                SceneEvent::new(
                    SceneEventType::ComponentRemoved,
                    self.key,
                    id,
                    resolve_change(change, component.update_mode()),
                )
                .with_component(component.id()),
            );
        }
        self.ids.release(id);
        self.queue_event(SceneEvent::new(
            SceneEventType::EntityRemoved,
            self.key,
            id,
            resolve_change(change, AttributeChange::Replicate),
        ));
    }

    /// Remove every entity and reset id allocation
    pub fn remove_all_entities(&mut self, change: AttributeChange) {
        let change = resolve_change(change, AttributeChange::Replicate);
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            self.queue_event(SceneEvent::new(SceneEventType::EntityRemoved, self.key, id, change));
        }
        self.entities.clear();
        self.ids.reset();
        self.queue_event(SceneEvent::new(SceneEventType::SceneCleared, self.key, 0, change));
    }

    /// Move an entity to another id
    pub fn change_entity_id(&mut self, old_id: EntityId, new_id: EntityId) -> Result<(), SceneError> {
        if new_id == 0 {
            error!("Cannot change entity id {old_id} to 0: the id is reserved for allocation");
            return Err(SceneError::ReservedId(new_id));
        }
        if old_id == new_id {
            return Ok(());
        }
        if self.entities.contains_key(&new_id) {
            error!("Cannot change entity id {old_id} to {new_id}: the id is already in use");
            return Err(SceneError::IdInUse(new_id));
        }
        let mut entity = self.entities.remove(&old_id).ok_or(SceneError::EntityNotFound(old_id))?;
        entity.set_id(new_id);

        if let Some(parent) = entity.parent().and_then(|p| self.entities.get_mut(&p)) {
            parent.replace_child_id(old_id, new_id);
        }
        for child in entity.children() {
            if let Some(child) = self.entities.get_mut(child) {
                child.set_parent_id(Some(new_id));
            }
        }
        self.entities.insert(new_id, entity);
        self.ids.claim(new_id);
        self.ids.reset_replicated_id(new_id);
        self.ids.release(old_id);
        self.queue_event(SceneEvent::new(
            SceneEventType::EntityIdChanged,
            self.key,
            new_id,
            AttributeChange::Replicate,
        ));
        Ok(())
    }

    /// Reparent an entity; `None` makes it a root level entity
    pub fn set_parent(
        &mut self,
        child: EntityId,
        parent: Option<EntityId>,
        change: AttributeChange,
    ) -> Result<(), SceneError> {
        let old_parent = self.entities.get(&child).ok_or(SceneError::EntityNotFound(child))?.parent();
        if old_parent == parent {
            return Ok(());
        }
        if let Some(parent) = parent {
            if !self.entities.contains_key(&parent) {
                return Err(SceneError::EntityNotFound(parent));
            }
            let reason = if parent == child {
                Some("an entity cannot be its own parent")
            } else if self.is_ancestor(child, parent) {
                Some("the new parent is a descendant")
            } else {
                None
            };
            if let Some(reason) = reason {
                error!("Cannot parent entity {child} to {parent}: {reason}");
                return Err(SceneError::InvalidParent {
                    child,
                    parent,
                    reason: reason.to_string(),
                });
            }
        }

        if let Some(old) = old_parent.and_then(|p| self.entities.get_mut(&p)) {
            old.remove_child_id(child);
        }
        if let Some(new) = parent.and_then(|p| self.entities.get_mut(&p)) {
            new.add_child_id(child);
        }
        if let Some(entity) = self.entities.get_mut(&child) {
            entity.set_parent_id(parent);
        }
        self.queue_event(SceneEvent::new(
            SceneEventType::EntityParentChanged,
            self.key,
            child,
            resolve_change(change, AttributeChange::Replicate),
        ));
        Ok(())
    }

    fn is_ancestor(&self, ancestor: EntityId, mut id: EntityId) -> bool {
        while let Some(parent) = self.entities.get(&id).and_then(Entity::parent) {
            if parent == ancestor {
                return true;
            }
            id = parent;
        }
        false
    }

    /// First entity with exactly this name
    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        if name.is_empty() {
            return None;
        }
        self.entities.values().find(|e| e.name() == name)
    }

    /// True if no entity carries the name
    pub fn is_unique_name(&self, name: &str) -> bool {
        self.entity_by_name(name).is_none()
    }

    /// Entities whose name equals `name`
    pub fn find_entities_by_name(&self, name: &str, case_sensitive: bool) -> Vec<&Entity> {
        self.entities
            .values()
            .filter(|e| {
                if case_sensitive {
                    e.name() == name
                } else {
                    e.name().eq_ignore_ascii_case(name)
                }
            })
            .collect()
    }

    /// Entities whose name contains `substring`
    pub fn find_entities_containing(&self, substring: &str, case_sensitive: bool) -> Vec<&Entity> {
        let needle = substring.to_lowercase();
        self.entities
            .values()
            .filter(|e| {
                if case_sensitive {
                    e.name().contains(substring)
                } else {
                    e.name().to_lowercase().contains(&needle)
                }
            })
            .collect()
    }

    /// Entities with a component of a type, optionally with an instance name
    pub fn entities_with_component<'a>(
        &self,
        kind: impl Into<ComponentTypeRef<'a>>,
        name: Option<&str>,
    ) -> Vec<&Entity> {
        let kind = kind.into();
        self.entities
            .values()
            .filter(|e| e.component_index(kind, name).is_some())
            .collect()
    }

    /// Entities in a group
    pub fn entities_of_group(&self, group: &str) -> Vec<&Entity> {
        self.entities.values().filter(|e| e.group() == group).collect()
    }

    /// Every component of a type across the scene
    pub fn components<'a>(&self, kind: impl Into<ComponentTypeRef<'a>>) -> Vec<&Component> {
        let kind = kind.into();
        self.entities
            .values()
            .flat_map(|e| e.components().iter().filter(move |c| kind.matches(c)))
            .collect()
    }

    /// Queued events not yet drained
    pub fn pending_events(&self) -> &[SceneEvent] {
        &self.events
    }

    /// Take every queued event in order
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        std::mem::take(&mut self.events)
    }

    pub(super) fn queue_event(&mut self, event: SceneEvent) {
        if event.change != AttributeChange::Disconnected {
            self.events.push(event);
        }
    }

    /// Fresh, unowned component from the shared registries
    pub(super) fn instantiate_component(&self, kind: ComponentTypeRef<'_>) -> Option<Component> {
        let attributes = read(&self.attribute_types);
        let components = read(&self.component_types);
        let created = match kind {
            ComponentTypeRef::Name(name) => components.create_by_name(name, &attributes),
            ComponentTypeRef::Id(id) => components.create_by_id(id, &attributes),
        };
        if created.is_none() {
            error!("Failed to create component {kind:?}: no such component type registered");
        }
        created
    }

    /// Attach a component to a live entity
    pub(super) fn add_component(
        &mut self,
        entity: EntityId,
        component: Component,
        change: AttributeChange,
    ) -> Option<ComponentId> {
        let authority = self.config.authority;
        let target = self.entities.get_mut(&entity)?;
        let id = target.attach_component(component, authority);
        let mode = target.update_mode_of(id);
        self.queue_event(
            SceneEvent::new(SceneEventType::ComponentAdded, self.key, entity, resolve_change(change, mode))
                .with_component(id),
        );
        Some(id)
    }
}

/// Mutable access to one live entity of a scene
///
/// Changes made through the handle are queued as scene events.
#[derive(Debug)]
pub struct EntityMut<'a> {
    scene: &'a mut Scene,
    id: EntityId,
}

impl Deref for EntityMut<'_> {
    type Target = Entity;

    fn deref(&self) -> &Entity {
        // Handles are only created for live ids and the entity cannot be
        // removed while the handle borrows the scene.
        &self.scene.entities[&self.id]
    }
}

impl EntityMut<'_> {
    fn entity_mut(&mut self) -> Option<&mut Entity> {
        self.scene.entities.get_mut(&self.id)
    }

    /// Create a component and attach it
    ///
    /// Returns `None` and logs if the type is unknown.
    pub fn create_component<'k>(
        &mut self,
        kind: impl Into<ComponentTypeRef<'k>>,
        name: &str,
        change: AttributeChange,
        replicated: bool,
    ) -> Option<&mut Component> {
        let mut component = self.scene.instantiate_component(kind.into())?;
        component.set_name(name);
        component.set_replicated(replicated);
        let id = self.scene.add_component(self.id, component, change)?;
        self.entity_mut()?.component_mut_by_id(id)
    }

    /// Component of a type and name, created if missing
    ///
    /// An empty name matches any component of the type.
    pub fn get_or_create_component<'k>(
        &mut self,
        kind: impl Into<ComponentTypeRef<'k>>,
        name: &str,
        change: AttributeChange,
        replicated: bool,
    ) -> Option<&mut Component> {
        let kind = kind.into();
        let filter = (!name.is_empty()).then_some(name);
        if let Some(index) = self.component_index(kind, filter) {
            return self.entity_mut()?.components_mut().get_mut(index);
        }
        self.create_component(kind, name, change, replicated)
    }

    /// First component of a type
    pub fn component_mut<'k>(&mut self, kind: impl Into<ComponentTypeRef<'k>>) -> Option<&mut Component> {
        let index = self.component_index(kind.into(), None)?;
        self.entity_mut()?.components_mut().get_mut(index)
    }

    /// Set an attribute of the first component of a type
    pub fn set_attribute<'k>(
        &mut self,
        kind: impl Into<ComponentTypeRef<'k>>,
        attribute: &str,
        value: impl Into<Variant>,
        change: AttributeChange,
    ) -> Result<(), SceneError> {
        let kind = kind.into();
        let index = self
            .component_index(kind, None)
            .ok_or_else(|| SceneError::ComponentNotFound(format!("{kind:?} in entity {}", self.id)))?;
        let id = self.id;
        let component = self
            .entity_mut()
            .and_then(|e| e.components_mut().get_mut(index))
            .ok_or(SceneError::EntityNotFound(id))?;
        component.set(attribute, value)?;
        let (component_id, mode) = (component.id(), component.update_mode());
        let change = resolve_change(change, mode);
        self.queue_attribute_event(SceneEventType::AttributeChanged, component_id, attribute, change);
        Ok(())
    }

    fn queue_attribute_event(
        &mut self,
        event_type: SceneEventType,
        component: ComponentId,
        attribute: &str,
        change: AttributeChange,
    ) {
        let event = SceneEvent::new(event_type, self.scene.key, self.id, change)
            .with_component(component)
            .with_attribute(attribute);
        self.scene.queue_event(event);
    }

    /// Add an attribute to a component that supports dynamic attributes
    pub fn create_dynamic_attribute(
        &mut self,
        component: ComponentId,
        type_name: &str,
        attribute: &str,
        change: AttributeChange,
    ) -> bool {
        let registry = self.scene.attribute_registry();
        let attributes = read(&registry);
        let Some(target) = self.entity_mut().and_then(|e| e.component_mut_by_id(component)) else {
            return false;
        };
        if target.contains_attribute(attribute) {
            return true;
        }
        let mode = target.update_mode();
        if target.create_attribute(&attributes, type_name, attribute).is_none() {
            return false;
        }
        let change = resolve_change(change, mode);
        self.queue_attribute_event(SceneEventType::AttributeAdded, component, attribute, change);
        true
    }

    /// Remove an attribute from a component that supports dynamic attributes
    pub fn remove_dynamic_attribute(
        &mut self,
        component: ComponentId,
        attribute: &str,
        change: AttributeChange,
    ) -> bool {
        let Some(target) = self.entity_mut().and_then(|e| e.component_mut_by_id(component)) else {
            return false;
        };
        let mode = target.update_mode();
        if !target.remove_attribute(attribute) {
            return false;
        }
        let change = resolve_change(change, mode);
        self.queue_attribute_event(SceneEventType::AttributeRemoved, component, attribute, change);
        true
    }

    /// Detach a component matched by type and optional instance name
    pub fn remove_component<'k>(
        &mut self,
        kind: impl Into<ComponentTypeRef<'k>>,
        name: Option<&str>,
        change: AttributeChange,
    ) -> Option<Component> {
        let index = self.component_index(kind.into(), name)?;
        self.detach_at(index, change)
    }

    /// Detach a component by id; false if absent
    pub fn remove_component_by_id(&mut self, id: ComponentId, change: AttributeChange) -> bool {
        match self.components().iter().position(|c| c.id() == id) {
            Some(index) => self.detach_at(index, change).is_some(),
            None => false,
        }
    }

    /// Detach every component
    pub fn remove_all_components(&mut self, change: AttributeChange) {
        while let Some(last) = self.num_components().checked_sub(1) {
            if self.detach_at(last, change).is_none() {
                break;
            }
        }
    }

    fn detach_at(&mut self, index: usize, change: AttributeChange) -> Option<Component> {
        let component = self.entity_mut()?.detach_component(index);
        let event = SceneEvent::new(
            SceneEventType::ComponentRemoved,
            self.scene.key,
            self.id,
            resolve_change(change, component.update_mode()),
        )
        .with_component(component.id());
        self.scene.queue_event(event);
        Some(component)
    }

    fn set_name_attribute(&mut self, attribute: &str, value: &str, change: AttributeChange) -> Result<(), SceneError> {
        if self.component(NAME_COMPONENT).is_none() {
            let replicated = self.is_replicated();
            self.create_component(NAME_COMPONENT, "", change, replicated)
                .ok_or_else(|| SceneError::ComponentNotFound(NAME_COMPONENT.to_string()))?;
        }
        self.set_attribute(NAME_COMPONENT, attribute, value, change)
    }

    /// Set the entity name, creating the `Name` component if needed
    pub fn set_name(&mut self, name: &str, change: AttributeChange) -> Result<(), SceneError> {
        self.set_name_attribute("name", name, change)
    }

    /// Set the entity description
    pub fn set_description(&mut self, description: &str, change: AttributeChange) -> Result<(), SceneError> {
        self.set_name_attribute("description", description, change)
    }

    /// Set the entity group
    pub fn set_group(&mut self, group: &str, change: AttributeChange) -> Result<(), SceneError> {
        self.set_name_attribute("group", group, change)
    }

    /// Mark the entity temporary; its components follow
    pub fn set_temporary(&mut self, temporary: bool) {
        if let Some(entity) = self.entity_mut() {
            entity.set_temporary_flag(temporary);
        }
    }

    /// Create an entity parented to this one
    pub fn create_child(
        &mut self,
        id: EntityId,
        components: &[&str],
        change: AttributeChange,
        flags: CreateFlags,
    ) -> Result<EntityMut<'_>, SceneError> {
        let parent = self.id;
        let child = self.scene.create_entity(id, components, change, flags)?.id();
        self.scene.set_parent(child, Some(parent), change)?;
        debug!("Created child entity {child} of {parent}");
        Ok(EntityMut { scene: &mut *self.scene, id: child })
    }

    /// Reparent this entity
    pub fn set_parent(&mut self, parent: Option<EntityId>, change: AttributeChange) -> Result<(), SceneError> {
        self.scene.set_parent(self.id, parent, change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::id_generator::{FIRST_LOCAL_ID, FIRST_UNACKED_ID};

    fn scene() -> Scene {
        Scene::new("test", SceneConfig::default())
    }

    #[test]
    fn test_authority_allocates_replicated_ids() {
        let mut scene = scene();
        let a = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        let b = scene.create_local_entity(&[], AttributeChange::Default).unwrap().id();
        assert_eq!(a, 1);
        assert_eq!(b, FIRST_LOCAL_ID);
    }

    #[test]
    fn test_client_allocates_unacked_ids() {
        let mut scene = Scene::new("client", SceneConfig::default().with_authority(false));
        let entity = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
        assert_eq!(entity.id(), FIRST_UNACKED_ID);
        assert!(entity.is_unacked());
    }

    #[test]
    fn test_explicit_id_bumps_generator() {
        let mut scene = scene();
        scene.create_entity(10, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
        let next = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        assert_eq!(next, 11);
        assert!(matches!(
            scene.create_entity(10, &[], AttributeChange::Default, CreateFlags::default()),
            Err(SceneError::IdInUse(10))
        ));
    }

    #[test]
    fn test_create_entity_with_components() {
        let mut scene = scene();
        let (components, parent, owner) = {
            let entity = scene
                .create_entity(0, &["Placeable", "EC_Mesh", "Nope"], AttributeChange::Default, CreateFlags::default())
                .unwrap();
            (entity.num_components(), entity.parent(), entity.scene())
        };
        assert_eq!(components, 2);
        assert!(parent.is_none());
        assert_eq!(owner, scene.key());
    }

    #[test]
    fn test_remove_entity_removes_subtree() {
        let mut scene = scene();
        let root = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        let (child, grandchild) = {
            let mut root_handle = scene.entity_mut(root).unwrap();
            let mut child = root_handle
                .create_child(0, &["Placeable"], AttributeChange::Default, CreateFlags::default())
                .unwrap();
            let child_id = child.id();
            let grandchild = child
                .create_child(0, &[], AttributeChange::Default, CreateFlags::default())
                .unwrap()
                .id();
            (child_id, grandchild)
        };
        assert_eq!(scene.len(), 3);
        assert_eq!(scene.entity(grandchild).unwrap().parent(), Some(child));

        assert!(scene.remove_entity(child, AttributeChange::Default));
        assert_eq!(scene.len(), 1);
        assert!(scene.entity(root).unwrap().children().is_empty());
        assert!(!scene.remove_entity(child, AttributeChange::Default));
    }

    #[test]
    fn test_remove_all_resets_ids() {
        let mut scene = scene();
        for _ in 0..3 {
            scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
        }
        scene.remove_all_entities(AttributeChange::Default);
        assert!(scene.is_empty());
        let id = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        assert_eq!(id, 1);
    }

    #[test]
    fn test_reuse_freed_ids() {
        let mut scene = Scene::new("reuse", SceneConfig::default().with_id_reuse(IdReusePolicy::ReuseFreed));
        let a = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
        scene.remove_entity(a, AttributeChange::Default);
        let again = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        assert_eq!(again, a);
    }

    #[test]
    fn test_set_parent_rejects_cycles() {
        let mut scene = scene();
        let a = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        let b = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        scene.set_parent(b, Some(a), AttributeChange::Default).unwrap();

        assert!(matches!(
            scene.set_parent(a, Some(a), AttributeChange::Default),
            Err(SceneError::InvalidParent { .. })
        ));
        assert!(matches!(
            scene.set_parent(a, Some(b), AttributeChange::Default),
            Err(SceneError::InvalidParent { .. })
        ));
        assert_eq!(scene.entity(a).unwrap().parent(), None);

        scene.set_parent(b, None, AttributeChange::Default).unwrap();
        assert!(scene.entity(a).unwrap().children().is_empty());
        assert_eq!(scene.root_level_entities().count(), 2);
    }

    #[test]
    fn test_change_entity_id_keeps_links() {
        let mut scene = scene();
        let parent = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        let child = scene
            .entity_mut(parent)
            .unwrap()
            .create_child(0, &["Mesh"], AttributeChange::Default, CreateFlags::default())
            .unwrap()
            .id();

        scene.change_entity_id(parent, 100).unwrap();
        assert!(!scene.has_entity(parent));
        assert_eq!(scene.entity(child).unwrap().parent(), Some(100));
        assert_eq!(scene.entity(100).unwrap().children(), &[child]);

        scene.change_entity_id(child, 200).unwrap();
        assert_eq!(scene.entity(100).unwrap().children(), &[200]);
        let mesh = scene.entity(200).unwrap().component("Mesh").unwrap();
        assert_eq!(mesh.parent_entity(), Some(200));
    }

    #[test]
    fn test_change_entity_id_rejects_zero() {
        let mut scene = scene();
        let id = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        scene.drain_events();

        assert!(matches!(scene.change_entity_id(id, 0), Err(SceneError::ReservedId(0))));
        assert!(scene.has_entity(id));
        assert!(!scene.has_entity(0));
        assert!(scene.pending_events().is_empty());
    }

    #[test]
    fn test_names_and_groups() {
        let mut scene = scene();
        let id = {
            let mut entity = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
            entity.set_name("Crate", AttributeChange::Default).unwrap();
            entity.set_group("props", AttributeChange::Default).unwrap();
            entity.id()
        };
        assert_eq!(scene.entity_by_name("Crate").unwrap().id(), id);
        assert!(!scene.is_unique_name("Crate"));
        assert!(scene.is_unique_name("Barrel"));
        assert_eq!(scene.find_entities_by_name("crate", false).len(), 1);
        assert!(scene.find_entities_by_name("crate", true).is_empty());
        assert_eq!(scene.find_entities_containing("RAT", false).len(), 1);
        assert_eq!(scene.entities_of_group("props").len(), 1);
        assert_eq!(scene.entities_with_component("Name", None).len(), 1);
        assert_eq!(scene.components(26u32).len(), 1);
    }

    #[test]
    fn test_events_are_queued_unless_disconnected() {
        let mut scene = scene();
        let id = scene.create_entity(0, &["Placeable"], AttributeChange::Default, CreateFlags::default()).unwrap().id();
        let events = scene.drain_events();
        let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
        assert_eq!(kinds, vec![SceneEventType::EntityCreated, SceneEventType::ComponentAdded]);
        assert_eq!(events[0].change, AttributeChange::Replicate);

        scene
            .entity_mut(id)
            .unwrap()
            .set_attribute("Placeable", "visible", false, AttributeChange::Disconnected)
            .unwrap();
        assert!(scene.pending_events().is_empty());

        scene
            .entity_mut(id)
            .unwrap()
            .set_attribute("Placeable", "visible", true, AttributeChange::LocalOnly)
            .unwrap();
        let events = scene.drain_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].attribute.as_deref(), Some("visible"));
        assert_eq!(events[0].change, AttributeChange::LocalOnly);
    }

    #[test]
    fn test_set_attribute_type_mismatch() {
        let mut scene = scene();
        let mut entity = scene
            .create_entity(0, &["Placeable"], AttributeChange::Default, CreateFlags::default())
            .unwrap();
        let err = entity
            .set_attribute("Placeable", "visible", "yes", AttributeChange::Default)
            .unwrap_err();
        assert!(matches!(err, SceneError::Attribute(AttributeError::TypeMismatch { .. })));
        assert!(matches!(
            entity.set_attribute("Mesh", "castShadows", true, AttributeChange::Default),
            Err(SceneError::ComponentNotFound(_))
        ));
    }

    #[test]
    fn test_component_management() {
        let mut scene = scene();
        let mut entity = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
        assert!(entity.create_component("Unknown", "", AttributeChange::Default, true).is_none());

        entity.get_or_create_component("Light", "", AttributeChange::Default, true).unwrap();
        entity.get_or_create_component("Light", "", AttributeChange::Default, true).unwrap();
        assert_eq!(entity.num_components(), 1);

        entity.create_component("Light", "fill", AttributeChange::Default, true).unwrap();
        assert_eq!(entity.components_of_type("Light").len(), 2);

        let removed = entity.remove_component("Light", Some("fill"), AttributeChange::Default).unwrap();
        assert!(removed.parent_entity().is_none());
        entity.remove_all_components(AttributeChange::Default);
        assert_eq!(entity.num_components(), 0);
    }

    #[test]
    fn test_dynamic_attributes_raise_events() {
        let mut scene = scene();
        let mut entity = scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
        let component = entity
            .create_component("DynamicComponent", "", AttributeChange::Default, true)
            .unwrap()
            .id();
        assert!(entity.create_dynamic_attribute(component, "real", "speed", AttributeChange::Default));
        assert!(entity.remove_dynamic_attribute(component, "speed", AttributeChange::Default));
        assert!(!entity.remove_dynamic_attribute(component, "speed", AttributeChange::Default));

        let kinds: Vec<_> = scene.drain_events().into_iter().map(|e| e.event_type).collect();
        assert!(kinds.contains(&SceneEventType::AttributeAdded));
        assert!(kinds.contains(&SceneEventType::AttributeRemoved));
    }

    #[test]
    fn test_temporary_entity_components_are_temporary() {
        let mut scene = scene();
        let entity = scene.create_temporary_entity(&["Mesh"], AttributeChange::Default).unwrap();
        assert!(entity.is_temporary());
        assert!(entity.components()[0].is_temporary());
    }
}
