//! Structured text scene documents
//!
//! A [`SceneDocument`] mirrors the entity forest: entities with their
//! components, components with attribute values in text form. Documents are
//! written as RON by default and as JSON for `.json` paths.
//!
//! Loading is all-or-nothing. The whole document is parsed and every
//! component is built off-scene first; the scene is only touched once that
//! succeeded.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigFormat};
use crate::foundation::collections::{read, write};
use crate::foundation::logging::{error, info, warn};
use crate::foundation::variant::{EntityReference, Variant};

use super::attribute::AttributeChange;
use super::attribute_registry::AttributeRegistry;
use super::component::Component;
use super::component_registry::{
    ensure_type_name_without_prefix, placeholder_type_id, AttributeSchema, ComponentDesc, ComponentRegistry,
};
use super::entity::{ComponentTypeRef, Entity};
use super::id_generator::{is_local_id, EntityId};
use super::world::{CreateFlags, Scene, SceneError};

const fn default_true() -> bool {
    true
}

/// One attribute value in text form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Attribute id
    pub id: String,
    /// Human readable name
    #[serde(default)]
    pub name: String,
    /// Attribute type name
    #[serde(rename = "type", default)]
    pub type_name: String,
    /// Value text
    #[serde(default)]
    pub value: String,
}

/// One component with its attribute values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// Component type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Component type id, 0 if not recorded
    #[serde(default)]
    pub type_id: u32,
    /// Instance name
    #[serde(default)]
    pub name: String,
    /// Replicated flag
    #[serde(default = "default_true")]
    pub sync: bool,
    /// Temporary flag of the component itself
    #[serde(default)]
    pub temporary: bool,
    /// Attribute values in declaration order
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
}

/// One entity with its components and children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Entity id at save time
    pub id: EntityId,
    /// Replicated flag
    #[serde(default = "default_true")]
    pub sync: bool,
    /// Temporary flag
    #[serde(default)]
    pub temporary: bool,
    /// Components in creation order
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
    /// Child entities
    #[serde(default)]
    pub children: Vec<EntityRecord>,
}

/// Root of a scene document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Root level entities
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

impl Config for SceneDocument {}

impl SceneDocument {
    /// Total number of entity records, nested ones included
    pub fn entity_count(&self) -> usize {
        fn count(records: &[EntityRecord]) -> usize {
            records.iter().map(|r| 1 + count(&r.children)).sum()
        }
        count(&self.entities)
    }
}

pub(super) fn should_be_serialized(entity: &Entity, save_temporary: bool, save_local: bool) -> bool {
    (save_temporary || !entity.is_temporary()) && (save_local || !entity.is_local())
}

pub(super) fn component_should_be_serialized(component: &Component, save_temporary: bool, save_local: bool) -> bool {
    (save_temporary || !component.is_temporary()) && (save_local || !component.is_local())
}

/// Placeholder descriptor for a component type only known from a record
fn placeholder_desc(record: &ComponentRecord, attributes: &AttributeRegistry) -> ComponentDesc {
    let mut schema = Vec::new();
    for attribute in &record.attributes {
        if attribute.type_name.is_empty() {
            warn!(
                "Cannot store attribute {} of placeholder component {}: no type specified",
                attribute.id, record.type_name
            );
            continue;
        }
        let id = if attribute.id.is_empty() { &attribute.name } else { &attribute.id };
        let Some(probe) = attributes.create_by_name(&attribute.type_name, id) else {
            warn!("Unknown attribute type {} in placeholder component {}", attribute.type_name, record.type_name);
            continue;
        };
        let mut entry = AttributeSchema::new(&attribute.type_name, id, &attribute.name);
        entry.default = probe.parse_text(&attribute.value).ok();
        schema.push(entry);
    }
    ComponentDesc::new(ensure_type_name_without_prefix(&record.type_name), record.type_id, schema)
}

/// Keep the document's type id unless a different type already owns it, then
/// fall back to the id derived from the name
fn assign_placeholder_id(
    mut desc: ComponentDesc,
    components: &ComponentRegistry,
    pending: &[ComponentDesc],
) -> Result<ComponentDesc, SceneError> {
    let type_name = desc.type_name.clone();
    let is_free = |type_id: u32| {
        type_id != 0
            && type_id != u32::MAX
            && components.placeholder_id_available(type_id, &type_name)
            && !pending.iter().any(|d| d.type_id == type_id)
    };
    let derived = placeholder_type_id(&type_name);
    let type_id = [desc.type_id, derived]
        .into_iter()
        .find(|id| is_free(*id))
        .ok_or_else(|| {
            SceneError::Document(format!("no free type id for placeholder component {type_name}"))
        })?;
    if desc.type_id != 0 && type_id != desc.type_id {
        warn!(
            "Type id {} of component {type_name} is taken, using {type_id} instead",
            desc.type_id
        );
    }
    desc.type_id = type_id;
    Ok(desc)
}

impl Scene {
    /// Structured record of the scene
    ///
    /// Temporary and local entities and components are left out unless
    /// requested.
    pub fn to_document(&self, save_temporary: bool, save_local: bool) -> SceneDocument {
        SceneDocument {
            entities: self
                .root_level_entities()
                .filter(|e| should_be_serialized(e, save_temporary, save_local))
                .map(|e| self.entity_record(e, save_temporary, save_local))
                .collect(),
        }
    }

    fn entity_record(&self, entity: &Entity, save_temporary: bool, save_local: bool) -> EntityRecord {
        EntityRecord {
            id: entity.id(),
            sync: entity.is_replicated(),
            temporary: entity.is_temporary(),
            components: entity
                .components()
                .iter()
                .filter(|c| component_should_be_serialized(c, save_temporary, save_local))
                .map(Component::to_record)
                .collect(),
            children: entity
                .children()
                .iter()
                .filter_map(|id| self.entities.get(id))
                .filter(|e| should_be_serialized(e, save_temporary, save_local))
                .map(|e| self.entity_record(e, save_temporary, save_local))
                .collect(),
        }
    }

    /// Scene as RON text
    pub fn serialize_to_string(&self, save_temporary: bool, save_local: bool) -> Result<String, SceneError> {
        Ok(self
            .to_document(save_temporary, save_local)
            .to_string_as(ConfigFormat::Ron)?)
    }

    /// Write the scene document to a `.ron` or `.json` file
    pub fn save_scene_document(
        &self,
        path: impl AsRef<Path>,
        save_temporary: bool,
        save_local: bool,
    ) -> Result<(), SceneError> {
        let path = path.as_ref();
        let document = self.to_document(save_temporary, save_local);
        document.save_to_file(path)?;
        info!(
            "Saved {} entities of scene {} to {}",
            document.entity_count(),
            self.name,
            path.display()
        );
        Ok(())
    }

    /// Load a scene document file
    ///
    /// Returns the ids of every created entity. On error the scene is left
    /// unchanged.
    pub fn load_scene_document(
        &mut self,
        path: impl AsRef<Path>,
        clear_scene: bool,
        use_entity_ids_from_file: bool,
        change: AttributeChange,
    ) -> Result<Vec<EntityId>, SceneError> {
        let path = path.as_ref();
        let document = SceneDocument::load_from_file(path).map_err(|e| {
            error!("Failed to load scene document {}: {e}", path.display());
            SceneError::from(e)
        })?;
        self.apply_document(&document, clear_scene, use_entity_ids_from_file, change)
    }

    /// Create entities from RON text produced by [`Scene::serialize_to_string`]
    pub fn create_content_from_string(
        &mut self,
        text: &str,
        use_entity_ids: bool,
        change: AttributeChange,
    ) -> Result<Vec<EntityId>, SceneError> {
        let document = SceneDocument::parse_as(text, ConfigFormat::Ron)?;
        self.apply_document(&document, false, use_entity_ids, change)
    }

    /// Validate a document, optionally clear the scene, then create its content
    pub fn apply_document(
        &mut self,
        document: &SceneDocument,
        clear_scene: bool,
        use_entity_ids: bool,
        change: AttributeChange,
    ) -> Result<Vec<EntityId>, SceneError> {
        let placeholders = self.validate_document(document, use_entity_ids)?;
        {
            let mut components = write(&self.component_types);
            for desc in placeholders {
                components
                    .register_placeholder(desc)
                    .map_err(|e| SceneError::Document(e.to_string()))?;
            }
        }
        if clear_scene {
            self.remove_all_entities(change);
        }

        let mut id_map = HashMap::new();
        let mut created = Vec::new();
        for record in &document.entities {
            self.create_from_record(record, None, use_entity_ids, change, &mut id_map, &mut created)?;
        }
        if !use_entity_ids {
            self.remap_parent_refs(&created, &id_map);
        }
        info!("Created {} entities in scene {}", created.len(), self.name);
        Ok(created)
    }

    /// Build every component of the document off-scene
    ///
    /// Returns placeholder descriptors for component types the registry does
    /// not know.
    fn validate_document(
        &self,
        document: &SceneDocument,
        use_entity_ids: bool,
    ) -> Result<Vec<ComponentDesc>, SceneError> {
        let attributes = read(&self.attribute_types);
        let components = read(&self.component_types);
        let mut placeholders: Vec<ComponentDesc> = Vec::new();
        let mut seen = HashSet::new();
        let mut pending: Vec<&EntityRecord> = document.entities.iter().collect();

        while let Some(record) = pending.pop() {
            if use_entity_ids && record.id != 0 && !seen.insert(record.id) {
                return Err(SceneError::Document(format!("entity id {} appears more than once", record.id)));
            }
            for component_record in &record.components {
                let type_name = ensure_type_name_without_prefix(&component_record.type_name);
                if type_name.is_empty() {
                    return Err(SceneError::Document(format!(
                        "component without a type in entity {}",
                        record.id
                    )));
                }
                let mut component = match components.create_by_name(type_name, &attributes) {
                    Some(component) => component,
                    None => match placeholders.iter().find(|d| d.type_name.eq_ignore_ascii_case(type_name)) {
                        Some(desc) => desc.instantiate(&attributes),
                        None => {
                            let desc = placeholder_desc(component_record, &attributes);
                            let desc = assign_placeholder_id(desc, &components, &placeholders)?;
                            let component = desc.instantiate(&attributes);
                            placeholders.push(desc);
                            component
                        }
                    },
                };
                component.apply_record(component_record, &attributes).map_err(|e| {
                    error!("Invalid {type_name} component in entity {}: {e}", record.id);
                    SceneError::from(e)
                })?;
            }
            pending.extend(record.children.iter());
        }
        Ok(placeholders)
    }

    fn create_from_record(
        &mut self,
        record: &EntityRecord,
        parent: Option<EntityId>,
        use_entity_ids: bool,
        change: AttributeChange,
        id_map: &mut HashMap<EntityId, EntityId>,
        created: &mut Vec<EntityId>,
    ) -> Result<(), SceneError> {
        let mut flags = CreateFlags::empty();
        if record.sync {
            flags |= CreateFlags::REPLICATED;
        }
        if record.temporary {
            flags |= CreateFlags::TEMPORARY;
        }

        let requested = if use_entity_ids && record.id != 0 {
            if self.entities.contains_key(&record.id) {
                let fresh = if is_local_id(record.id) {
                    self.next_free_id_local()
                } else {
                    self.next_free_id()
                };
                warn!("Entity id {} is in use, moving the existing entity to {fresh}", record.id);
                self.change_entity_id(record.id, fresh)?;
            }
            record.id
        } else {
            0
        };

        let id = self.create_entity(requested, &[], change, flags)?.id();
        id_map.insert(record.id, id);
        created.push(id);
        if parent.is_some() {
            self.set_parent(id, parent, change)?;
        }

        let registry = self.attribute_registry();
        for component_record in &record.components {
            let kind = ComponentTypeRef::Name(&component_record.type_name);
            let Some(mut component) = self.instantiate_component(kind) else {
                continue;
            };
            component.set_name(component_record.name.clone());
            component.set_replicated(component_record.sync);
            component.set_temporary(component_record.temporary);
            if let Err(e) = component.apply_record(component_record, &read(&registry)) {
                error!("Failed to apply {} attributes in entity {id}: {e}", component.type_name());
            }
            self.add_component(id, component, change);
        }

        for child in &record.children {
            self.create_from_record(child, Some(id), use_entity_ids, change, id_map, created)?;
        }
        Ok(())
    }

    /// Point `Placeable.parentRef` at the new ids of reloaded entities
    fn remap_parent_refs(&mut self, created: &[EntityId], id_map: &HashMap<EntityId, EntityId>) {
        for id in created {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            for component in entity.components_mut() {
                if component.type_name() != "Placeable" {
                    continue;
                }
                let old = match component.get("parentRef") {
                    Some(Variant::EntityReference(reference)) => reference.id(),
                    _ => None,
                };
                let Some(new) = old.and_then(|old| id_map.get(&old)) else {
                    continue;
                };
                if let Err(e) = component.set("parentRef", EntityReference::from_id(*new)) {
                    error!("Failed to remap parent reference of entity {id}: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::world::SceneConfig;

    #[test]
    fn test_document_defaults() {
        let text = r#"(entities: [(id: 4, components: [(type: "Name", attributes: [(id: "name", value: "Box")])])])"#;
        let document = SceneDocument::parse_as(text, ConfigFormat::Ron).unwrap();
        let record = &document.entities[0];
        assert!(record.sync);
        assert!(!record.temporary);
        assert!(record.components[0].sync);
        assert_eq!(document.entity_count(), 1);
    }

    #[test]
    fn test_to_document_skips_temporary_and_local() {
        let mut scene = Scene::new("doc", SceneConfig::default());
        scene.create_entity(0, &["Name"], AttributeChange::Default, CreateFlags::default()).unwrap();
        scene.create_temporary_entity(&["Name"], AttributeChange::Default).unwrap();
        scene.create_local_entity(&["Name"], AttributeChange::Default).unwrap();

        assert_eq!(scene.to_document(false, false).entity_count(), 1);
        assert_eq!(scene.to_document(true, false).entity_count(), 2);
        assert_eq!(scene.to_document(true, true).entity_count(), 3);
    }

    #[test]
    fn test_unknown_component_becomes_placeholder() {
        let text = r#"(entities: [(id: 1, components: [(type: "EC_Weather", attributes: [
            (id: "rain", name: "Rain", type: "real", value: "0.75"),
        ])])])"#;
        let mut scene = Scene::new("doc", SceneConfig::default());
        scene.create_content_from_string(text, true, AttributeChange::Default).unwrap();

        let weather = scene.entity(1).unwrap().component("Weather").unwrap();
        assert_eq!(weather.get("rain"), Some(&Variant::Float(0.75)));
        assert!(read(&scene.component_registry()).is_placeholder_registered("Weather"));

        let saved = scene.serialize_to_string(false, false).unwrap();
        assert!(saved.contains("Weather"));
        assert!(saved.contains("0.75"));
    }

    #[test]
    fn test_fresh_ids_remap_parent_refs() {
        let text = r#"(entities: [
            (id: 5, components: [(type: "Placeable", attributes: [])]),
            (id: 6, components: [(type: "Placeable", attributes: [(id: "parentRef", type: "EntityReference", value: "5")])]),
        ])"#;
        let mut scene = Scene::new("doc", SceneConfig::default());
        scene.create_entity(0, &[], AttributeChange::Default, CreateFlags::default()).unwrap();
        let created = scene.create_content_from_string(text, false, AttributeChange::Default).unwrap();
        assert_eq!(created, vec![2, 3]);

        let placeable = scene.entity(3).unwrap().component("Placeable").unwrap();
        assert_eq!(
            placeable.get("parentRef"),
            Some(&Variant::EntityReference(EntityReference::from_id(2)))
        );
    }

    #[test]
    fn test_conflicting_id_moves_existing_entity() {
        let mut scene = Scene::new("doc", SceneConfig::default());
        let existing = scene
            .create_entity(0, &["Mesh"], AttributeChange::Default, CreateFlags::default())
            .unwrap()
            .id();
        let text = format!("(entities: [(id: {existing}, components: [(type: \"Light\")])])");
        scene.create_content_from_string(&text, true, AttributeChange::Default).unwrap();

        assert!(scene.entity(existing).unwrap().component("Light").is_some());
        assert_eq!(scene.len(), 2);
        assert_eq!(scene.components("Mesh").len(), 1);
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let text = "(entities: [(id: 3), (id: 3)])";
        let mut scene = Scene::new("doc", SceneConfig::default());
        assert!(matches!(
            scene.create_content_from_string(text, true, AttributeChange::Default),
            Err(SceneError::Document(_))
        ));
        assert!(scene.is_empty());
    }
}
