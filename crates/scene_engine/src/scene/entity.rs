//! Entities: identified containers of components within a scene

use std::fmt;

use crate::foundation::collections::SceneKey;

use super::attribute::AttributeChange;
use super::component::{Component, ComponentOwner};
use super::component_registry::ensure_type_name_without_prefix;
use super::id_generator::{is_local_id, is_replicated_id, is_unacked_id, ComponentId, EntityId, UniqueIdGenerator};

/// Type name of the component holding entity name, description and group
pub const NAME_COMPONENT: &str = "Name";

/// Component type given by name or id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentTypeRef<'a> {
    /// Type name, the legacy `EC_` prefix is ignored
    Name(&'a str),
    /// Type id
    Id(u32),
}

impl ComponentTypeRef<'_> {
    /// True if the component is of this type
    pub fn matches(&self, component: &Component) -> bool {
        match *self {
            Self::Name(name) => ensure_type_name_without_prefix(name).eq_ignore_ascii_case(component.type_name()),
            Self::Id(id) => component.type_id() == id,
        }
    }
}

impl<'a> From<&'a str> for ComponentTypeRef<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<u32> for ComponentTypeRef<'_> {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

/// A node of the scene's entity forest
///
/// Entities are owned by their [`Scene`](super::Scene) and are changed through
/// [`EntityMut`](super::EntityMut) so every change is reported as an event.
#[derive(Debug, Clone)]
pub struct Entity {
    id: EntityId,
    scene: SceneKey,
    parent: Option<EntityId>,
    children: Vec<EntityId>,
    components: Vec<Component>,
    component_ids: UniqueIdGenerator,
    temporary: bool,
}

impl Entity {
    pub(crate) fn new(id: EntityId, scene: SceneKey) -> Self {
        Self {
            id,
            scene,
            parent: None,
            children: Vec::new(),
            components: Vec::new(),
            component_ids: UniqueIdGenerator::default(),
            temporary: false,
        }
    }

    /// Id, unique within the scene
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Owning scene
    pub const fn scene(&self) -> SceneKey {
        self.scene
    }

    /// Parent entity, `None` for root level entities
    pub const fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    /// Child entity ids in creation order
    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    /// Number of direct children
    pub fn num_children(&self) -> usize {
        self.children.len()
    }

    /// Components in creation order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Number of components
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// Id below the local range
    pub const fn is_replicated(&self) -> bool {
        is_replicated_id(self.id)
    }

    /// Id in the local range
    pub const fn is_local(&self) -> bool {
        is_local_id(self.id)
    }

    /// Id in the unacked range
    pub const fn is_unacked(&self) -> bool {
        is_unacked_id(self.id)
    }

    /// Temporary entities are skipped when saving
    pub const fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// First component of a type
    pub fn component<'a>(&self, kind: impl Into<ComponentTypeRef<'a>>) -> Option<&Component> {
        let kind = kind.into();
        self.components.iter().find(|c| kind.matches(c))
    }

    /// Component of a type with the given instance name
    pub fn component_with_name<'a>(&self, kind: impl Into<ComponentTypeRef<'a>>, name: &str) -> Option<&Component> {
        let kind = kind.into();
        self.components.iter().find(|c| kind.matches(c) && c.name() == name)
    }

    /// Component by its id within this entity
    pub fn component_by_id(&self, id: ComponentId) -> Option<&Component> {
        self.components.iter().find(|c| c.id() == id)
    }

    /// Every component of a type
    pub fn components_of_type<'a>(&self, kind: impl Into<ComponentTypeRef<'a>>) -> Vec<&Component> {
        let kind = kind.into();
        self.components.iter().filter(|c| kind.matches(c)).collect()
    }

    fn name_attribute(&self, id: &str) -> &str {
        self.component(NAME_COMPONENT)
            .and_then(|c| c.get(id))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
    }

    /// Entity name, empty without a `Name` component
    pub fn name(&self) -> &str {
        self.name_attribute("name")
    }

    /// Entity description, empty without a `Name` component
    pub fn description(&self) -> &str {
        self.name_attribute("description")
    }

    /// Entity group, empty without a `Name` component
    pub fn group(&self) -> &str {
        self.name_attribute("group")
    }

    pub(crate) fn component_mut_by_id(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.id() == id)
    }

    pub(crate) fn component_index(&self, kind: ComponentTypeRef<'_>, name: Option<&str>) -> Option<usize> {
        self.components
            .iter()
            .position(|c| kind.matches(c) && name.map_or(true, |n| c.name() == n))
    }

    pub(crate) fn components_mut(&mut self) -> &mut [Component] {
        &mut self.components
    }

    /// Give the component an id in the range implied by its replication
    /// mode and append it
    pub(crate) fn attach_component(&mut self, mut component: Component, authority: bool) -> ComponentId {
        let id = loop {
            let candidate = match (component.is_replicated(), authority) {
                (false, _) => self.component_ids.allocate_local(),
                (true, true) => self.component_ids.allocate_replicated(),
                (true, false) => self.component_ids.allocate_unacked(),
            };
            if self.component_by_id(candidate).is_none() {
                break candidate;
            }
        };
        let owner = ComponentOwner { scene: self.scene, entity: self.id };
        component.attach(owner, id, self.temporary);
        self.components.push(component);
        id
    }

    pub(crate) fn detach_component(&mut self, index: usize) -> Component {
        let mut component = self.components.remove(index);
        self.component_ids.release(component.id());
        component.detach();
        component
    }

    pub(crate) fn set_id(&mut self, id: EntityId) {
        self.id = id;
        for component in &mut self.components {
            component.set_owner_entity(id);
        }
    }

    pub(crate) fn set_parent_id(&mut self, parent: Option<EntityId>) {
        self.parent = parent;
    }

    pub(crate) fn add_child_id(&mut self, child: EntityId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child_id(&mut self, child: EntityId) {
        self.children.retain(|c| *c != child);
    }

    pub(crate) fn replace_child_id(&mut self, old: EntityId, new: EntityId) {
        for child in &mut self.children {
            if *child == old {
                *child = new;
            }
        }
    }

    pub(crate) fn set_temporary_flag(&mut self, temporary: bool) {
        self.temporary = temporary;
        for component in &mut self.components {
            component.set_entity_temporary(temporary);
        }
    }

    pub(crate) fn update_mode_of(&self, component: ComponentId) -> AttributeChange {
        self.component_by_id(component)
            .map_or(AttributeChange::Replicate, Component::update_mode)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        if name.is_empty() {
            write!(f, "Entity ID {}", self.id)
        } else {
            write!(f, "Entity \"{name}\" (ID: {})", self.id)
        }
    }
}
