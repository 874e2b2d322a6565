//! Scene manager
//!
//! Owns every scene by [`SceneKey`] together with the attribute and component
//! registries they share. Registering a factory here makes it visible to all
//! scenes at once.

use std::collections::HashMap;

use crate::foundation::collections::{read, shared, write, HandleMap, SceneKey, Shared};
use crate::foundation::logging::{error, info};

use super::attribute::Attribute;
use super::attribute_registry::{AttributeRegistry, RegistryError};
use super::component::Component;
use super::component_registry::{ComponentDesc, ComponentFactory, ComponentRegistry};
use super::world::{Scene, SceneConfig};

/// Scene container and registry front-end
#[derive(Debug)]
pub struct SceneManager {
    scenes: HandleMap<Scene>,
    names: HashMap<String, SceneKey>,
    main_scene: Option<SceneKey>,
    attribute_types: Shared<AttributeRegistry>,
    component_types: Shared<ComponentRegistry>,
    defaults: SceneConfig,
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new(SceneConfig::default())
    }
}

impl SceneManager {
    /// Manager with the built-in attribute and component types
    ///
    /// `defaults` supplies the id reuse policy for scenes created later.
    pub fn new(defaults: SceneConfig) -> Self {
        Self {
            scenes: HandleMap::with_key(),
            names: HashMap::new(),
            main_scene: None,
            attribute_types: shared(AttributeRegistry::with_builtins()),
            component_types: shared(ComponentRegistry::with_builtins()),
            defaults,
        }
    }

    /// Create a scene; `None` if the name is taken
    pub fn create_scene(&mut self, name: &str, view_enabled: bool, authority: bool) -> Option<SceneKey> {
        if self.names.contains_key(name) {
            error!("Scene {name} already exists");
            return None;
        }
        let config = self
            .defaults
            .clone()
            .with_view_enabled(view_enabled)
            .with_authority(authority);
        let attributes = self.attribute_types.clone();
        let components = self.component_types.clone();
        let key = self
            .scenes
            .insert_with_key(|key| Scene::with_registries(key, name, config, attributes, components));
        self.names.insert(name.to_string(), key);
        if self.main_scene.is_none() {
            self.main_scene = Some(key);
        }
        info!("Created scene {name} (authority: {authority}, view: {view_enabled})");
        Some(key)
    }

    /// Scene by name
    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.names.get(name).and_then(|key| self.scenes.get(*key))
    }

    /// Mutable scene by name
    pub fn scene_mut(&mut self, name: &str) -> Option<&mut Scene> {
        let key = *self.names.get(name)?;
        self.scenes.get_mut(key)
    }

    /// Scene by key
    pub fn scene_by_key(&self, key: SceneKey) -> Option<&Scene> {
        self.scenes.get(key)
    }

    /// Mutable scene by key
    pub fn scene_by_key_mut(&mut self, key: SceneKey) -> Option<&mut Scene> {
        self.scenes.get_mut(key)
    }

    /// Remove a scene and everything in it
    pub fn remove_scene(&mut self, name: &str) -> bool {
        let Some(key) = self.names.remove(name) else {
            return false;
        };
        self.scenes.remove(key);
        if self.main_scene == Some(key) {
            self.main_scene = None;
        }
        info!("Removed scene {name}");
        true
    }

    /// All scenes
    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    pub(crate) fn scenes_mut(&mut self) -> impl Iterator<Item = &mut Scene> {
        self.scenes.values_mut()
    }

    /// Number of scenes
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// True if there are no scenes
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// The scene applications act on by default, initially the first one created
    pub fn main_scene(&self) -> Option<&Scene> {
        self.main_scene.and_then(|key| self.scenes.get(key))
    }

    /// Make a scene the main scene; false if no scene has that name
    pub fn set_main_scene(&mut self, name: &str) -> bool {
        match self.names.get(name) {
            Some(key) => {
                self.main_scene = Some(*key);
                true
            }
            None => false,
        }
    }

    /// Register a component factory for every scene
    pub fn register_component_factory(&self, factory: Box<dyn ComponentFactory>) -> Result<(), RegistryError> {
        write(&self.component_types).register_factory(factory)
    }

    /// Register a data-only component type, returning its type id
    pub fn register_placeholder_component_type(&self, desc: ComponentDesc) -> Result<u32, RegistryError> {
        write(&self.component_types).register_placeholder(desc)
    }

    /// Unattached component by type name
    pub fn create_component_by_name(&self, type_name: &str) -> Option<Component> {
        read(&self.component_types).create_by_name(type_name, &read(&self.attribute_types))
    }

    /// Unattached component by type id
    pub fn create_component_by_id(&self, type_id: u32) -> Option<Component> {
        read(&self.component_types).create_by_id(type_id, &read(&self.attribute_types))
    }

    /// Free-standing attribute by type name
    pub fn create_attribute(&self, type_name: &str, id: &str) -> Option<Attribute> {
        read(&self.attribute_types).create_by_name(type_name, id)
    }

    /// Free-standing attribute by type id
    pub fn create_attribute_by_id(&self, type_id: u32, id: &str) -> Option<Attribute> {
        read(&self.attribute_types).create_by_id(type_id, id)
    }

    /// Registered attribute type names
    pub fn attribute_types(&self) -> Vec<String> {
        read(&self.attribute_types).attribute_types()
    }

    /// Registered component type names, factories and placeholders
    pub fn component_types(&self) -> Vec<String> {
        read(&self.component_types).component_types()
    }

    /// Attribute type id, 0 if unknown
    pub fn attribute_type_id_for_name(&self, type_name: &str) -> u32 {
        read(&self.attribute_types).type_id_for_name(type_name)
    }

    /// Attribute type name for an id
    pub fn attribute_type_name_for_id(&self, type_id: u32) -> Option<String> {
        read(&self.attribute_types).type_name_for_id(type_id).map(str::to_string)
    }

    /// Component type id, 0 if unknown
    pub fn component_type_id_for_name(&self, type_name: &str) -> u32 {
        read(&self.component_types).type_id_for_name(type_name)
    }

    /// Component type name for an id
    pub fn component_type_name_for_id(&self, type_id: u32) -> Option<String> {
        read(&self.component_types).type_name_for_id(type_id).map(str::to_string)
    }

    /// True if a factory or placeholder provides the type
    pub fn is_component_type_registered(&self, type_name: &str) -> bool {
        read(&self.component_types).is_component_type_registered(type_name)
    }
}
