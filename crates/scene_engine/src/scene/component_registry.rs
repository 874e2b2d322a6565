//! Component type registry
//!
//! Component types are described by factories. The built-in types are plain
//! [`ComponentDesc`] descriptors; applications can register their own
//! [`ComponentFactory`] implementations. Types seen only in scene documents are
//! registered as placeholders so their data survives a load and save.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::foundation::logging::{error, info, warn};
use crate::foundation::math::{Color, Transform, Vec3};
use crate::foundation::variant::{AssetReference, EntityReference, Variant};

use super::attribute_registry::{AttributeRegistry, RegistryError};
use super::component::Component;

/// Prefix used by older scene content in front of component type names
pub const LEGACY_TYPE_PREFIX: &str = "EC_";

/// Marker bit set in every derived placeholder type id
pub const PLACEHOLDER_TYPE_ID_BIT: u32 = 0x10000;

/// One attribute in a component schema
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSchema {
    /// Attribute id, unique within the component
    pub id: String,
    /// Human readable name
    pub name: String,
    /// Attribute type name, resolved through the attribute registry
    pub type_name: String,
    /// Initial value; the type's zero value when `None`
    pub default: Option<Variant>,
}

impl AttributeSchema {
    /// Schema entry holding the type's zero value
    pub fn new(type_name: &str, id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            type_name: type_name.to_string(),
            default: None,
        }
    }

    /// Set the initial value
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Variant>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Description of a component type
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDesc {
    /// Type name without the legacy prefix
    pub type_name: String,
    /// Type id, never 0
    pub type_id: u32,
    /// Attributes in declaration order
    pub attributes: Vec<AttributeSchema>,
    /// True if attributes can be added and removed at runtime
    pub dynamic: bool,
}

impl ComponentDesc {
    /// Fixed-schema descriptor
    pub fn new(type_name: &str, type_id: u32, attributes: Vec<AttributeSchema>) -> Self {
        Self {
            type_name: type_name.to_string(),
            type_id,
            attributes,
            dynamic: false,
        }
    }

    /// Descriptor of a type whose attributes are managed at runtime
    pub fn dynamic(type_name: &str, type_id: u32) -> Self {
        Self {
            type_name: type_name.to_string(),
            type_id,
            attributes: Vec::new(),
            dynamic: true,
        }
    }

    /// Build a fresh, unowned component from this descriptor
    ///
    /// Attributes whose type the registry does not know are skipped with an
    /// error log.
    pub fn instantiate(&self, registry: &AttributeRegistry) -> Component {
        let mut component = Component::new(self.type_id, &self.type_name, self.dynamic);
        for schema in &self.attributes {
            let Some(mut attribute) = registry.create_by_name(&schema.type_name, &schema.id) else {
                error!(
                    "Unknown attribute type \"{}\" for attribute \"{}\" of {}",
                    schema.type_name, schema.id, self.type_name
                );
                continue;
            };
            attribute.set_name(&schema.name);
            if let Some(value) = &schema.default {
                if let Err(e) = attribute.set(value.clone()) {
                    error!("Bad default for {}.{}: {e}", self.type_name, schema.id);
                }
            }
            component.add_attribute(attribute);
        }
        component
    }
}

/// Creates components of one type
pub trait ComponentFactory: Send + Sync + fmt::Debug {
    /// Type name
    fn type_name(&self) -> &str;

    /// Type id
    fn type_id(&self) -> u32;

    /// Create a fresh, unowned component
    fn create(&self, attributes: &AttributeRegistry) -> Component;

    /// Descriptor backing this factory, if it has one
    fn desc(&self) -> Option<&ComponentDesc> {
        None
    }
}

impl ComponentFactory for ComponentDesc {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn type_id(&self) -> u32 {
        self.type_id
    }

    fn create(&self, attributes: &AttributeRegistry) -> Component {
        self.instantiate(attributes)
    }

    fn desc(&self) -> Option<&ComponentDesc> {
        Some(self)
    }
}

/// Strip the legacy `EC_` prefix from a type name
pub fn ensure_type_name_without_prefix(type_name: &str) -> &str {
    type_name.strip_prefix(LEGACY_TYPE_PREFIX).unwrap_or(type_name)
}

/// Case-insensitive SDBM hash of a type name
pub fn type_name_hash(type_name: &str) -> u32 {
    type_name.chars().fold(0u32, |hash, c| {
        let c = c.to_ascii_lowercase() as u32;
        c.wrapping_add(hash << 6).wrapping_add(hash << 16).wrapping_sub(hash)
    })
}

/// Type id given to a placeholder type whose document carries none
pub fn placeholder_type_id(type_name: &str) -> u32 {
    (type_name_hash(ensure_type_name_without_prefix(type_name)) & 0xffff) | PLACEHOLDER_TYPE_ID_BIT
}

/// Registry of component factories and placeholder types
#[derive(Debug)]
pub struct ComponentRegistry {
    factories: Vec<Box<dyn ComponentFactory>>,
    placeholders: BTreeMap<u32, ComponentDesc>,
    placeholder_ids: HashMap<String, u32>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ComponentRegistry {
    /// Registry without any types
    pub fn empty() -> Self {
        Self {
            factories: Vec::new(),
            placeholders: BTreeMap::new(),
            placeholder_ids: HashMap::new(),
        }
    }

    /// Registry holding the built-in component types
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for desc in builtin_descs() {
            if let Err(e) = registry.register_factory(Box::new(desc)) {
                error!("Failed to register built-in component: {e}");
            }
        }
        registry
    }

    /// Register a component factory
    ///
    /// Re-registering an identical descriptor is accepted. A factory whose
    /// name or id is already taken by a different registration is rejected
    /// and the first one stays.
    pub fn register_factory(&mut self, factory: Box<dyn ComponentFactory>) -> Result<(), RegistryError> {
        let name = factory.type_name().to_string();
        let type_id = factory.type_id();
        if name.is_empty() || name.trim() != name {
            error!("Component type name {name:?} is empty or contains surrounding whitespace");
            return Err(RegistryError::InvalidName(name));
        }
        if type_id == 0 {
            error!("Component type {name} has the reserved type id 0");
            return Err(RegistryError::InvalidTypeId(type_id));
        }

        let existing = self
            .factories
            .iter()
            .find(|f| f.type_id() == type_id || f.type_name().eq_ignore_ascii_case(&name));
        if let Some(existing) = existing {
            let identical = existing.type_id() == type_id
                && existing.type_name() == name
                && existing.desc().is_some()
                && existing.desc() == factory.desc();
            if identical {
                return Ok(());
            }
            let err = RegistryError::Conflict {
                name,
                type_id,
                reason: format!(
                    "already registered as {} (id {})",
                    existing.type_name(),
                    existing.type_id()
                ),
            };
            error!("Cannot register component factory: {err}");
            return Err(err);
        }

        // A real factory supersedes a placeholder of the same type.
        if let Some(id) = self.placeholder_ids.remove(&name.to_lowercase()) {
            self.placeholders.remove(&id);
        }
        self.placeholders.remove(&type_id);
        self.factories.push(factory);
        Ok(())
    }

    /// Register a placeholder type for a component only known from data
    ///
    /// A type id of 0 is derived from the name. Returns the id in effect.
    pub fn register_placeholder(&mut self, mut desc: ComponentDesc) -> Result<u32, RegistryError> {
        desc.type_name = ensure_type_name_without_prefix(&desc.type_name).to_string();
        if desc.type_name.is_empty() {
            error!("Empty type name in placeholder component description");
            return Err(RegistryError::InvalidName(desc.type_name));
        }
        if desc.type_id == 0 || desc.type_id == u32::MAX {
            desc.type_id = placeholder_type_id(&desc.type_name);
        }
        if self.factory_by_id(desc.type_id).is_some() {
            let err = RegistryError::Conflict {
                name: desc.type_name,
                type_id: desc.type_id,
                reason: "a component factory already uses this id".to_string(),
            };
            error!("Cannot register placeholder component type: {err}");
            return Err(err);
        }

        match self.placeholders.get(&desc.type_id) {
            None => info!("Registering placeholder component type {}", desc.type_name),
            Some(old) if !old.type_name.eq_ignore_ascii_case(&desc.type_name) => {
                let err = RegistryError::Conflict {
                    reason: format!("placeholder type {} already uses this id", old.type_name),
                    name: desc.type_name,
                    type_id: desc.type_id,
                };
                error!("Cannot register placeholder component type: {err}");
                return Err(err);
            }
            Some(_) => warn!("Re-registering placeholder component type {}", desc.type_name),
        }

        let type_id = desc.type_id;
        if let Some(previous) = self.placeholder_ids.insert(desc.type_name.to_lowercase(), type_id) {
            if previous != type_id {
                self.placeholders.remove(&previous);
            }
        }
        self.placeholders.insert(type_id, desc);
        Ok(type_id)
    }

    /// True if a placeholder named `type_name` could be registered with `type_id`
    pub fn placeholder_id_available(&self, type_id: u32, type_name: &str) -> bool {
        let type_name = ensure_type_name_without_prefix(type_name);
        if self.factory_by_id(type_id).is_some() {
            return false;
        }
        match self.placeholders.get(&type_id) {
            Some(desc) => desc.type_name.eq_ignore_ascii_case(type_name),
            None => true,
        }
    }

    fn factory(&self, type_name: &str) -> Option<&dyn ComponentFactory> {
        let type_name = ensure_type_name_without_prefix(type_name);
        self.factories
            .iter()
            .find(|f| f.type_name().eq_ignore_ascii_case(type_name))
            .map(AsRef::as_ref)
    }

    fn factory_by_id(&self, type_id: u32) -> Option<&dyn ComponentFactory> {
        self.factories.iter().find(|f| f.type_id() == type_id).map(AsRef::as_ref)
    }

    fn placeholder(&self, type_name: &str) -> Option<&ComponentDesc> {
        let id = self
            .placeholder_ids
            .get(&ensure_type_name_without_prefix(type_name).to_lowercase())?;
        self.placeholders.get(id)
    }

    /// Placeholder descriptor by type id
    pub fn placeholder_desc(&self, type_id: u32) -> Option<&ComponentDesc> {
        self.placeholders.get(&type_id)
    }

    /// Create an unowned component by type name, falling back to placeholders
    pub fn create_by_name(&self, type_name: &str, attributes: &AttributeRegistry) -> Option<Component> {
        if let Some(factory) = self.factory(type_name) {
            return Some(factory.create(attributes));
        }
        self.placeholder(type_name).map(|desc| desc.instantiate(attributes))
    }

    /// Create an unowned component by type id, falling back to placeholders
    pub fn create_by_id(&self, type_id: u32, attributes: &AttributeRegistry) -> Option<Component> {
        if let Some(factory) = self.factory_by_id(type_id) {
            return Some(factory.create(attributes));
        }
        self.placeholders.get(&type_id).map(|desc| desc.instantiate(attributes))
    }

    /// Type id for a name, 0 if unknown
    pub fn type_id_for_name(&self, type_name: &str) -> u32 {
        self.factory(type_name)
            .map(ComponentFactory::type_id)
            .or_else(|| self.placeholder(type_name).map(|d| d.type_id))
            .unwrap_or(0)
    }

    /// Type name for an id
    pub fn type_name_for_id(&self, type_id: u32) -> Option<&str> {
        self.factory_by_id(type_id)
            .map(ComponentFactory::type_name)
            .or_else(|| self.placeholders.get(&type_id).map(|d| d.type_name.as_str()))
    }

    /// Names of every registered type, factories first
    pub fn component_types(&self) -> Vec<String> {
        self.factories
            .iter()
            .map(|f| f.type_name().to_string())
            .chain(self.placeholders.values().map(|d| d.type_name.clone()))
            .collect()
    }

    /// True if a factory or a placeholder exists for the name
    pub fn is_component_type_registered(&self, type_name: &str) -> bool {
        self.is_component_factory_registered(type_name) || self.placeholder(type_name).is_some()
    }

    /// True if a real factory exists for the name
    pub fn is_component_factory_registered(&self, type_name: &str) -> bool {
        self.factory(type_name).is_some()
    }

    /// True if the name is known only as a placeholder
    pub fn is_placeholder_registered(&self, type_name: &str) -> bool {
        self.placeholder(type_name).is_some()
    }
}

fn builtin_descs() -> Vec<ComponentDesc> {
    let ones = Vec3::new(1.0, 1.0, 1.0);
    vec![
        ComponentDesc::new(
            "Name",
            26,
            vec![
                AttributeSchema::new("string", "name", "Name"),
                AttributeSchema::new("string", "description", "Description"),
                AttributeSchema::new("string", "group", "Group"),
            ],
        ),
        ComponentDesc::dynamic("DynamicComponent", 25),
        ComponentDesc::new(
            "Placeable",
            20,
            vec![
                AttributeSchema::new("Transform", "transform", "Transform"),
                AttributeSchema::new("bool", "drawDebug", "Show bounding box"),
                AttributeSchema::new("bool", "visible", "Visible").with_default(true),
                AttributeSchema::new("int", "selectionLayer", "Selection layer").with_default(1),
                AttributeSchema::new("EntityReference", "parentRef", "Parent entity ref")
                    .with_default(EntityReference::default()),
                AttributeSchema::new("string", "parentBone", "Parent bone name"),
            ],
        ),
        ComponentDesc::new(
            "Mesh",
            17,
            vec![
                AttributeSchema::new("Transform", "nodeTransformation", "Transform")
                    .with_default(Transform::identity()),
                AttributeSchema::new("AssetReference", "meshRef", "Mesh ref")
                    .with_default(AssetReference::default()),
                AttributeSchema::new("AssetReference", "skeletonRef", "Skeleton ref"),
                AttributeSchema::new("AssetReferenceList", "materialRefs", "Material refs"),
                AttributeSchema::new("real", "drawDistance", "Draw distance"),
                AttributeSchema::new("bool", "castShadows", "Cast shadows"),
                AttributeSchema::new("bool", "useInstancing", "Use instancing"),
            ],
        ),
        ComponentDesc::new(
            "Camera",
            15,
            vec![
                AttributeSchema::new("float3", "upVector", "Up vector").with_default(Vec3::y()),
                AttributeSchema::new("real", "nearPlane", "Near plane").with_default(0.1f32),
                AttributeSchema::new("real", "farPlane", "Far plane").with_default(2000.0f32),
                AttributeSchema::new("real", "verticalFov", "Vertical FOV").with_default(45.0f32),
                AttributeSchema::new("string", "aspectRatio", "Aspect ratio"),
            ],
        ),
        ComponentDesc::new(
            "Light",
            16,
            vec![
                // 0 point, 1 spot, 2 directional
                AttributeSchema::new("int", "type", "Type"),
                AttributeSchema::new("Color", "diffColor", "Diffuse color").with_default(Color::WHITE),
                AttributeSchema::new("Color", "specColor", "Specular color")
                    .with_default(Color::new(0.0, 0.0, 0.0, 1.0)),
                AttributeSchema::new("bool", "castShadows", "Cast shadows"),
                AttributeSchema::new("real", "range", "Range").with_default(25.0f32),
                AttributeSchema::new("real", "brightness", "Brightness").with_default(1.0f32),
                AttributeSchema::new("real", "constAtten", "Constant atten"),
                AttributeSchema::new("real", "linearAtten", "Linear atten").with_default(0.01f32),
                AttributeSchema::new("real", "quadraAtten", "Quadratic atten").with_default(0.01f32),
                AttributeSchema::new("real", "innerAngle", "Light inner angle").with_default(30.0f32),
                AttributeSchema::new("real", "outerAngle", "Light outer angle").with_default(40.0f32),
            ],
        ),
        ComponentDesc::new(
            "RigidBody",
            23,
            vec![
                AttributeSchema::new("real", "mass", "Mass"),
                AttributeSchema::new("int", "shapeType", "Shape type"),
                AttributeSchema::new("float3", "size", "Size").with_default(ones),
                AttributeSchema::new("AssetReference", "collisionMeshRef", "Collision mesh ref"),
                AttributeSchema::new("real", "friction", "Friction").with_default(0.5f32),
                AttributeSchema::new("real", "restitution", "Restitution"),
                AttributeSchema::new("real", "linearDamping", "Linear damping"),
                AttributeSchema::new("real", "angularDamping", "Angular damping"),
                AttributeSchema::new("float3", "linearFactor", "Linear factor").with_default(ones),
                AttributeSchema::new("float3", "angularFactor", "Angular factor").with_default(ones),
                AttributeSchema::new("bool", "kinematic", "Kinematic"),
                AttributeSchema::new("bool", "phantom", "Phantom"),
                AttributeSchema::new("bool", "drawDebug", "Draw debug"),
                AttributeSchema::new("float3", "linearVelocity", "Linear velocity"),
                AttributeSchema::new("float3", "angularVelocity", "Angular velocity"),
                AttributeSchema::new("int", "collisionLayer", "Collision layer").with_default(-1),
                AttributeSchema::new("int", "collisionMask", "Collision mask").with_default(-1),
                AttributeSchema::new("real", "rollingFriction", "Rolling friction").with_default(0.5f32),
                AttributeSchema::new("bool", "useGravity", "Use gravity").with_default(true),
            ],
        ),
        ComponentDesc::new(
            "Script",
            5,
            vec![
                AttributeSchema::new("AssetReferenceList", "scriptRef", "Script ref"),
                AttributeSchema::new("bool", "runOnLoad", "Run on load"),
                // 0 both, 1 client, 2 server
                AttributeSchema::new("int", "runMode", "Run mode"),
                AttributeSchema::new("string", "applicationName", "Script application name"),
                AttributeSchema::new("string", "className", "Script class name"),
            ],
        ),
    ]
}
