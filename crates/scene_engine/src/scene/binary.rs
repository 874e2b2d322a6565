//! Binary scene format
//!
//! Layout, little-endian throughout:
//! - u32 root entity count
//! - per entity: u32 id, u8 replicated, u32 `component count | child count << 16`
//! - per component: u32 type id, string name, u8 replicated, u32 data size, data
//! - then the entity's children, recursively
//!
//! Reading builds a [`SceneDocument`] first, so a corrupt buffer never
//! touches the scene. Nesting deeper than [`MAX_ENTITY_DEPTH`] is rejected.

use std::path::Path;

use crate::foundation::collections::read;
use crate::foundation::logging::{info, warn};
use crate::serialization::codec::{CodecError, DataDeserializer, DataSerializer};

use super::attribute::AttributeChange;
use super::attribute_registry::AttributeRegistry;
use super::component_registry::ComponentRegistry;
use super::document::{component_should_be_serialized, should_be_serialized, EntityRecord, SceneDocument};
use super::entity::Entity;
use super::id_generator::EntityId;
use super::world::{Scene, SceneError};

/// Deepest parent/child chain accepted when reading
pub const MAX_ENTITY_DEPTH: usize = 128;

fn count_u32(len: usize, max: usize) -> Result<u32, CodecError> {
    if len > max {
        return Err(CodecError::LengthOverflow { len, max });
    }
    u32::try_from(len).map_err(|_| CodecError::LengthOverflow { len, max })
}

impl Scene {
    /// Scene in binary form
    pub fn serialize_to_binary(&self, save_temporary: bool, save_local: bool) -> Result<Vec<u8>, SceneError> {
        let roots: Vec<&Entity> = self
            .root_level_entities()
            .filter(|e| should_be_serialized(e, save_temporary, save_local))
            .collect();
        let mut dest = DataSerializer::with_capacity(1024);
        dest.add_u32(count_u32(roots.len(), u32::MAX as usize)?);
        for entity in roots {
            self.write_entity(entity, &mut dest, save_temporary, save_local)?;
        }
        Ok(dest.into_bytes())
    }

    fn write_entity(
        &self,
        entity: &Entity,
        dest: &mut DataSerializer,
        save_temporary: bool,
        save_local: bool,
    ) -> Result<(), CodecError> {
        let components: Vec<_> = entity
            .components()
            .iter()
            .filter(|c| component_should_be_serialized(c, save_temporary, save_local))
            .collect();
        let children: Vec<&Entity> = entity
            .children()
            .iter()
            .filter_map(|id| self.entities.get(id))
            .filter(|e| should_be_serialized(e, save_temporary, save_local))
            .collect();

        dest.add_u32(entity.id());
        dest.add_bool(entity.is_replicated());
        let num_components = count_u32(components.len(), 0xffff)?;
        let num_children = count_u32(children.len(), 0xffff)?;
        dest.add_u32(num_components | (num_children << 16));

        let mut data = DataSerializer::new();
        for component in components {
            data.reset_fill();
            component.serialize_to_binary(&mut data)?;
            dest.add_u32(component.type_id());
            dest.add_string(component.name())?;
            dest.add_bool(component.is_replicated());
            dest.add_u32(count_u32(data.bytes_filled(), u32::MAX as usize)?);
            dest.add_bytes(data.data());
        }
        for child in children {
            self.write_entity(child, dest, save_temporary, save_local)?;
        }
        Ok(())
    }

    /// Parse binary scene data into a document without touching the scene
    pub fn parse_binary(&self, data: &[u8]) -> Result<SceneDocument, SceneError> {
        let attributes = read(&self.attribute_types);
        let components = read(&self.component_types);
        let mut source = DataDeserializer::new(data);
        let count = source.read_u32()?;
        let mut entities = Vec::new();
        for _ in 0..count {
            entities.push(read_entity(&mut source, &attributes, &components, 0)?);
        }
        if source.bytes_left() > 0 {
            warn!("{} trailing bytes after binary scene data", source.bytes_left());
        }
        Ok(SceneDocument { entities })
    }

    /// Create entities from data produced by [`Scene::serialize_to_binary`]
    pub fn create_content_from_binary(
        &mut self,
        data: &[u8],
        use_entity_ids: bool,
        change: AttributeChange,
    ) -> Result<Vec<EntityId>, SceneError> {
        let document = self.parse_binary(data)?;
        self.apply_document(&document, false, use_entity_ids, change)
    }

    /// Write the scene in binary form
    pub fn save_scene_binary(
        &self,
        path: impl AsRef<Path>,
        save_temporary: bool,
        save_local: bool,
    ) -> Result<(), SceneError> {
        let path = path.as_ref();
        let bytes = self.serialize_to_binary(save_temporary, save_local)?;
        std::fs::write(path, &bytes)?;
        info!("Saved scene {} to {} ({} bytes)", self.name, path.display(), bytes.len());
        Ok(())
    }

    /// Load a binary scene file; on error the scene is left unchanged
    pub fn load_scene_binary(
        &mut self,
        path: impl AsRef<Path>,
        clear_scene: bool,
        use_entity_ids_from_file: bool,
        change: AttributeChange,
    ) -> Result<Vec<EntityId>, SceneError> {
        let bytes = std::fs::read(path)?;
        let document = self.parse_binary(&bytes)?;
        self.apply_document(&document, clear_scene, use_entity_ids_from_file, change)
    }
}

fn read_entity(
    source: &mut DataDeserializer<'_>,
    attributes: &AttributeRegistry,
    components: &ComponentRegistry,
    depth: usize,
) -> Result<EntityRecord, SceneError> {
    if depth >= MAX_ENTITY_DEPTH {
        return Err(SceneError::Document(format!(
            "Entity nesting exceeds {MAX_ENTITY_DEPTH} levels at byte {}",
            source.bytes_read()
        )));
    }
    let id = source.read_u32()?;
    let sync = source.read_bool()?;
    let counts = source.read_u32()?;
    let num_components = counts & 0xffff;
    let num_children = counts >> 16;

    let mut records = Vec::new();
    for _ in 0..num_components {
        let type_id = source.read_u32()?;
        let name = source.read_string()?;
        let replicated = source.read_bool()?;
        let size = source.read_u32()? as usize;
        let data = source.read_bytes(size)?;

        let Some(mut component) = components.create_by_id(type_id, attributes) else {
            warn!("Skipping component with unknown type id {type_id} in entity {id}");
            continue;
        };
        component.deserialize_from_binary(&mut DataDeserializer::new(data), attributes)?;
        component.set_name(name);
        let mut record = component.to_record();
        record.sync = replicated;
        records.push(record);
    }

    let mut children = Vec::new();
    for _ in 0..num_children {
        children.push(read_entity(source, attributes, components, depth + 1)?);
    }
    Ok(EntityRecord {
        id,
        sync,
        temporary: false,
        components: records,
        children,
    })
}
