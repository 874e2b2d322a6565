//! Components: named, typed bags of attributes owned by an entity

use crate::foundation::collections::SceneKey;
use crate::foundation::logging::{error, warn};
use crate::foundation::variant::Variant;
use crate::serialization::codec::{short_len, CodecError, DataDeserializer, DataSerializer};

use super::attribute::{Attribute, AttributeChange, AttributeError, AttributeOwner};
use super::attribute_registry::AttributeRegistry;
use super::document::{AttributeRecord, ComponentRecord};
use super::id_generator::{is_local_id, is_unacked_id, ComponentId, EntityId};

/// Where an attached component lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentOwner {
    /// Scene of the owning entity
    pub scene: SceneKey,
    /// Owning entity
    pub entity: EntityId,
}

/// A typed collection of attributes
///
/// The attribute set is fixed by the component type. Only components whose
/// type supports dynamic attributes can add or remove attributes at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    id: ComponentId,
    type_id: u32,
    type_name: String,
    name: String,
    attributes: Vec<Attribute>,
    owner: Option<ComponentOwner>,
    replicated: bool,
    temporary: bool,
    entity_temporary: bool,
    update_mode: AttributeChange,
    dynamic: bool,
}

impl Component {
    pub(crate) fn new(type_id: u32, type_name: &str, dynamic: bool) -> Self {
        Self {
            id: 0,
            type_id,
            type_name: type_name.to_string(),
            name: String::new(),
            attributes: Vec::new(),
            owner: None,
            replicated: true,
            temporary: false,
            entity_temporary: false,
            update_mode: AttributeChange::Replicate,
            dynamic,
        }
    }

    /// Id within the owning entity, 0 while unattached
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Component type id
    pub const fn type_id(&self) -> u32 {
        self.type_id
    }

    /// Component type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Instance name, may be empty
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the instance name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// True if changes are replicated
    pub const fn is_replicated(&self) -> bool {
        self.replicated
    }

    /// Change replication; only possible before the component gets an id
    pub fn set_replicated(&mut self, replicated: bool) {
        if self.owner.is_some() {
            error!(
                "Cannot change replication of {} \"{}\" after it was added to an entity",
                self.type_name, self.name
            );
            return;
        }
        self.replicated = replicated;
    }

    /// True if the id is in the local range
    pub const fn is_local(&self) -> bool {
        is_local_id(self.id)
    }

    /// True if the id is a provisional replicated id
    pub const fn is_unacked(&self) -> bool {
        is_unacked_id(self.id)
    }

    /// True if this component or its entity is temporary
    pub const fn is_temporary(&self) -> bool {
        self.temporary || self.entity_temporary
    }

    /// Mark the component itself as temporary
    pub fn set_temporary(&mut self, temporary: bool) {
        self.temporary = temporary;
    }

    /// Change mode used when a change requests [`AttributeChange::Default`]
    pub const fn update_mode(&self) -> AttributeChange {
        self.update_mode
    }

    /// Set the default change mode
    pub fn set_update_mode(&mut self, mode: AttributeChange) {
        // Default would make the resolution recursive.
        if mode != AttributeChange::Default {
            self.update_mode = mode;
        }
    }

    /// True if attributes can be added at runtime
    pub const fn supports_dynamic_attributes(&self) -> bool {
        self.dynamic
    }

    /// Owning scene and entity, `None` while unattached
    pub const fn owner(&self) -> Option<ComponentOwner> {
        self.owner
    }

    /// Owning entity id
    pub fn parent_entity(&self) -> Option<EntityId> {
        self.owner.map(|o| o.entity)
    }

    /// Owning scene
    pub fn parent_scene(&self) -> Option<SceneKey> {
        self.owner.map(|o| o.scene)
    }

    /// All attributes in declaration order
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Number of attributes
    pub fn num_attributes(&self) -> usize {
        self.attributes.len()
    }

    fn attribute_index(&self, id: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a.id().eq_ignore_ascii_case(id))
    }

    /// Attribute by id, ignoring case
    pub fn attribute(&self, id: &str) -> Option<&Attribute> {
        self.attribute_index(id).map(|i| &self.attributes[i])
    }

    /// Mutable attribute by id, ignoring case
    pub fn attribute_mut(&mut self, id: &str) -> Option<&mut Attribute> {
        self.attribute_index(id).map(move |i| &mut self.attributes[i])
    }

    /// Attribute by human readable name, ignoring case
    pub fn attribute_by_name(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name().eq_ignore_ascii_case(name))
    }

    /// Value of an attribute
    pub fn get(&self, id: &str) -> Option<&Variant> {
        self.attribute(id).map(Attribute::value)
    }

    /// Set the value of an attribute
    pub fn set(&mut self, id: &str, value: impl Into<Variant>) -> Result<(), AttributeError> {
        self.attribute_mut(id)
            .ok_or_else(|| AttributeError::NotFound(id.to_string()))?
            .set(value)
    }

    pub(crate) fn add_attribute(&mut self, mut attribute: Attribute) {
        attribute.set_owner(self.attribute_owner());
        self.attributes.push(attribute);
    }

    /// Add an attribute at runtime
    ///
    /// Returns the existing attribute if one with the id is present. Fails
    /// for components without dynamic attribute support and for unknown
    /// attribute types.
    pub fn create_attribute(
        &mut self,
        registry: &AttributeRegistry,
        type_name: &str,
        id: &str,
    ) -> Option<&mut Attribute> {
        if !self.dynamic {
            error!("{} does not support dynamic attributes", self.type_name);
            return None;
        }
        if let Some(index) = self.attribute_index(id) {
            return Some(&mut self.attributes[index]);
        }
        let Some(mut attribute) = registry.create_by_name(type_name, id) else {
            error!(
                "Failed to create attribute of type \"{type_name}\" with id \"{id}\" in {} \"{}\"",
                self.type_name, self.name
            );
            return None;
        };
        attribute.set_dynamic(true);
        self.add_attribute(attribute);
        self.attributes.last_mut()
    }

    /// Remove a runtime attribute; returns false if absent or not removable
    pub fn remove_attribute(&mut self, id: &str) -> bool {
        if !self.dynamic {
            return false;
        }
        match self.attribute_index(id) {
            Some(index) => {
                self.attributes.remove(index);
                true
            }
            None => false,
        }
    }

    /// True if an attribute with the id exists
    pub fn contains_attribute(&self, id: &str) -> bool {
        self.attribute_index(id).is_some()
    }

    /// Remove every runtime attribute
    pub fn remove_all_attributes(&mut self) {
        if self.dynamic {
            self.attributes.clear();
        }
    }

    fn attribute_owner(&self) -> Option<AttributeOwner> {
        self.owner.map(|o| AttributeOwner {
            scene: o.scene,
            entity: o.entity,
            component: self.id,
        })
    }

    fn refresh_attribute_owners(&mut self) {
        let owner = self.attribute_owner();
        for attribute in &mut self.attributes {
            attribute.set_owner(owner);
        }
    }

    pub(crate) fn attach(&mut self, owner: ComponentOwner, id: ComponentId, entity_temporary: bool) {
        self.owner = Some(owner);
        self.id = id;
        self.entity_temporary = entity_temporary;
        self.refresh_attribute_owners();
    }

    pub(crate) fn detach(&mut self) {
        self.owner = None;
        self.entity_temporary = false;
        self.refresh_attribute_owners();
    }

    pub(crate) fn set_owner_entity(&mut self, entity: EntityId) {
        if let Some(owner) = &mut self.owner {
            owner.entity = entity;
        }
        self.refresh_attribute_owners();
    }

    pub(crate) fn set_entity_temporary(&mut self, temporary: bool) {
        self.entity_temporary = temporary;
    }

    /// Write every attribute value in binary form
    ///
    /// Fixed components write a count and the raw values. Dynamic components
    /// also write each attribute's id and type, with the value as text.
    pub fn serialize_to_binary(&self, dest: &mut DataSerializer) -> Result<(), CodecError> {
        dest.add_u8(short_len(self.attributes.len())?);
        for attribute in &self.attributes {
            if self.dynamic {
                dest.add_string(attribute.id())?;
                dest.add_string(attribute.type_name())?;
                dest.add_string(&attribute.to_text())?;
            } else {
                attribute.encode(dest)?;
            }
        }
        Ok(())
    }

    /// Read attribute values written by [`Component::serialize_to_binary`]
    ///
    /// Nothing is changed unless the whole payload decodes. Returns the ids
    /// of attributes whose value changed.
    pub fn deserialize_from_binary(
        &mut self,
        source: &mut DataDeserializer<'_>,
        registry: &AttributeRegistry,
    ) -> Result<Vec<String>, AttributeError> {
        let count = usize::from(source.read_u8()?);
        if self.dynamic {
            let mut records = Vec::with_capacity(count);
            for _ in 0..count {
                let id = source.read_string()?;
                let type_name = source.read_string()?;
                let value = source.read_string()?;
                records.push(AttributeRecord { name: id.clone(), id, type_name, value });
            }
            return self.apply_attribute_records(&records, registry);
        }

        if count != self.attributes.len() {
            return Err(AttributeError::CountMismatch {
                expected: self.attributes.len(),
                found: count,
            });
        }
        let values = self
            .attributes
            .iter()
            .map(|a| a.decode_value(source))
            .collect::<Result<Vec<_>, _>>()?;
        self.assign_values(values.into_iter().enumerate().collect())
    }

    /// Structured record of this component
    pub fn to_record(&self) -> ComponentRecord {
        ComponentRecord {
            type_name: self.type_name.clone(),
            type_id: self.type_id,
            name: self.name.clone(),
            sync: self.replicated,
            temporary: self.temporary,
            attributes: self
                .attributes
                .iter()
                .map(|a| AttributeRecord {
                    id: a.id().to_string(),
                    name: a.name().to_string(),
                    type_name: a.type_name().to_string(),
                    value: a.to_text(),
                })
                .collect(),
        }
    }

    /// Apply the attribute values of a record
    ///
    /// Only attributes present in the record are touched. A value that fails
    /// to parse aborts the whole call with nothing changed. Returns the ids
    /// of attributes whose value changed.
    pub fn apply_record(
        &mut self,
        record: &ComponentRecord,
        registry: &AttributeRegistry,
    ) -> Result<Vec<String>, AttributeError> {
        self.apply_attribute_records(&record.attributes, registry)
    }

    fn apply_attribute_records(
        &mut self,
        records: &[AttributeRecord],
        registry: &AttributeRegistry,
    ) -> Result<Vec<String>, AttributeError> {
        let mut updates = Vec::new();
        let mut created = Vec::new();
        for record in records {
            let index = self
                .attribute_index(&record.id)
                .or_else(|| self.attributes.iter().position(|a| a.name().eq_ignore_ascii_case(&record.name)));
            match index {
                Some(index) => updates.push((index, self.attributes[index].parse_text(&record.value)?)),
                None if self.dynamic => {
                    let mut attribute = registry.create_by_name(&record.type_name, &record.id).ok_or_else(|| {
                        AttributeError::Parse {
                            type_name: record.type_name.clone(),
                            text: record.value.clone(),
                        }
                    })?;
                    attribute.from_text(&record.value)?;
                    attribute.set_dynamic(true);
                    if !record.name.is_empty() {
                        attribute.set_name(&record.name);
                    }
                    created.push(attribute);
                }
                None => warn!(
                    "{} \"{}\" has no attribute \"{}\", ignoring its value",
                    self.type_name, self.name, record.id
                ),
            }
        }

        let mut changed = Vec::new();
        if self.dynamic {
            // Dynamic components mirror the record: attributes it lacks go away.
            let keep: Vec<bool> = (0..self.attributes.len())
                .map(|i| updates.iter().any(|(index, _)| *index == i))
                .collect();
            for (i, attribute) in self.attributes.iter().enumerate() {
                if !keep[i] {
                    changed.push(attribute.id().to_string());
                }
            }
            changed.extend(self.assign_values(updates)?);
            let mut i = 0;
            self.attributes.retain(|_| {
                i += 1;
                keep[i - 1]
            });
            for attribute in created {
                changed.push(attribute.id().to_string());
                self.add_attribute(attribute);
            }
            return Ok(changed);
        }

        changed.extend(self.assign_values(updates)?);
        Ok(changed)
    }

    fn assign_values(&mut self, updates: Vec<(usize, Variant)>) -> Result<Vec<String>, AttributeError> {
        // Every value was produced for its attribute's kind, so `set` cannot fail
        // halfway through.
        let mut changed = Vec::new();
        for (index, value) in updates {
            let attribute = &mut self.attributes[index];
            if attribute.value() != &value {
                attribute.set(value)?;
                changed.push(attribute.id().to_string());
            }
        }
        Ok(changed)
    }
}
