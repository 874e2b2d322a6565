//! Attribute type registry
//!
//! Maps attribute type names and ids to the value kind a fresh attribute of
//! that type holds. Names are matched case-insensitively, ids start at 1.

use std::collections::HashMap;
use thiserror::Error;

use crate::foundation::logging::error;
use crate::foundation::variant::VariantType;

use super::attribute::{Attribute, ValueKind};

/// Registry errors, shared by the attribute and component registries
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Type name is empty or has surrounding whitespace
    #[error("Invalid type name {0:?}")]
    InvalidName(String),

    /// Type id 0 is reserved
    #[error("Invalid type id {0}")]
    InvalidTypeId(u32),

    /// Name or id is already taken by a different registration
    #[error("Type {name:?} (id {type_id}) conflicts with existing registration: {reason}")]
    Conflict {
        /// Name being registered
        name: String,
        /// Id being registered
        type_id: u32,
        /// What clashed
        reason: String,
    },
}

/// One registered attribute type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeType {
    /// Type id, never 0
    pub id: u32,
    /// Canonical type name
    pub name: String,
    /// Value kinds attributes of this type accept
    pub kind: ValueKind,
}

/// Built-in attribute types in id order
const BUILTIN_TYPES: &[(&str, ValueKind)] = &[
    ("string", ValueKind::Fixed(VariantType::String)),
    ("int", ValueKind::Fixed(VariantType::Int)),
    ("real", ValueKind::Fixed(VariantType::Float)),
    ("Color", ValueKind::Fixed(VariantType::Color)),
    ("float2", ValueKind::Fixed(VariantType::Vector2)),
    ("float3", ValueKind::Fixed(VariantType::Vector3)),
    ("float4", ValueKind::Fixed(VariantType::Vector4)),
    ("bool", ValueKind::Fixed(VariantType::Bool)),
    ("uint", ValueKind::Fixed(VariantType::UInt)),
    ("Quat", ValueKind::Fixed(VariantType::Quaternion)),
    ("AssetReference", ValueKind::Fixed(VariantType::AssetReference)),
    ("AssetReferenceList", ValueKind::Fixed(VariantType::AssetReferenceList)),
    ("EntityReference", ValueKind::Fixed(VariantType::EntityReference)),
    ("Variant", ValueKind::Any),
    ("VariantList", ValueKind::Fixed(VariantType::VariantList)),
    ("Transform", ValueKind::Fixed(VariantType::Transform)),
    ("Point", ValueKind::Fixed(VariantType::Point)),
    ("IntRect", ValueKind::Fixed(VariantType::IntRect)),
    ("float3x3", ValueKind::Fixed(VariantType::Matrix3)),
    ("float3x4", ValueKind::Fixed(VariantType::Matrix3x4)),
    ("float4x4", ValueKind::Fixed(VariantType::Matrix4)),
];

/// Legacy names kept for old scene files
const DEPRECATED_ALIASES: &[(&str, &str)] = &[
    ("QVariant", "Variant"),
    ("QVariantList", "VariantList"),
    ("QPoint", "Point"),
];

/// Attribute type registry
#[derive(Debug, Clone)]
pub struct AttributeRegistry {
    types: Vec<AttributeType>,
    by_name: HashMap<String, u32>,
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl AttributeRegistry {
    /// Create a registry holding no types at all
    pub fn empty() -> Self {
        Self {
            types: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry holding the built-in types and their aliases
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        for (name, kind) in BUILTIN_TYPES {
            let id = registry.next_id();
            registry.insert(AttributeType { id, name: (*name).to_string(), kind: *kind });
        }
        for (alias, canonical) in DEPRECATED_ALIASES {
            let id = registry.type_id_for_name(canonical);
            registry.by_name.insert(alias.to_lowercase(), id);
        }
        registry
    }

    fn next_id(&self) -> u32 {
        self.types.iter().map(|t| t.id).max().unwrap_or(0) + 1
    }

    fn insert(&mut self, attribute_type: AttributeType) {
        self.by_name.insert(attribute_type.name.to_lowercase(), attribute_type.id);
        self.types.push(attribute_type);
    }

    /// Register a new attribute type and return its id
    ///
    /// Registering a known name with the same kind returns the existing id.
    /// A known name with a different kind is rejected and the first
    /// registration stays in effect.
    pub fn register(&mut self, name: &str, kind: ValueKind) -> Result<u32, RegistryError> {
        if name.is_empty() || name.trim() != name {
            error!("Attribute type name {name:?} is empty or contains surrounding whitespace");
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if let Some(existing) = self.attribute_type(name) {
            if existing.kind == kind {
                return Ok(existing.id);
            }
            let err = RegistryError::Conflict {
                name: name.to_string(),
                type_id: existing.id,
                reason: format!("already registered with kind {:?}", existing.kind),
            };
            error!("{err}");
            return Err(err);
        }
        let id = self.next_id();
        self.insert(AttributeType { id, name: name.to_string(), kind });
        Ok(id)
    }

    /// Look up a type by name or alias
    pub fn attribute_type(&self, name: &str) -> Option<&AttributeType> {
        let id = self.by_name.get(&name.to_lowercase())?;
        self.attribute_type_by_id(*id)
    }

    /// Look up a type by id
    pub fn attribute_type_by_id(&self, id: u32) -> Option<&AttributeType> {
        self.types.iter().find(|t| t.id == id)
    }

    /// Id for a type name or alias, 0 if unknown
    pub fn type_id_for_name(&self, name: &str) -> u32 {
        self.by_name.get(&name.to_lowercase()).copied().unwrap_or(0)
    }

    /// Canonical type name for an id
    pub fn type_name_for_id(&self, id: u32) -> Option<&str> {
        self.attribute_type_by_id(id).map(|t| t.name.as_str())
    }

    /// Canonical names of every registered type, in id order
    pub fn attribute_types(&self) -> Vec<String> {
        self.types.iter().map(|t| t.name.clone()).collect()
    }

    /// Create an unowned attribute of the named type
    pub fn create_by_name(&self, type_name: &str, attribute_id: &str) -> Option<Attribute> {
        self.attribute_type(type_name).map(|t| Self::instantiate(t, attribute_id))
    }

    /// Create an unowned attribute of the type with the given id
    pub fn create_by_id(&self, type_id: u32, attribute_id: &str) -> Option<Attribute> {
        self.attribute_type_by_id(type_id).map(|t| Self::instantiate(t, attribute_id))
    }

    fn instantiate(attribute_type: &AttributeType, attribute_id: &str) -> Attribute {
        Attribute::new(attribute_type.id, &attribute_type.name, attribute_type.kind, attribute_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::codec::DataSerializer;

    #[test]
    fn test_builtin_ids() {
        let registry = AttributeRegistry::with_builtins();
        assert_eq!(registry.type_id_for_name("string"), 1);
        assert_eq!(registry.type_id_for_name("Variant"), 14);
        assert_eq!(registry.type_id_for_name("Point"), 17);
        assert_eq!(registry.type_id_for_name("float4x4"), 21);
        assert_eq!(registry.type_id_for_name("nope"), 0);
        assert!(registry.create_by_id(0, "zero").is_none());
    }

    #[test]
    fn test_lookup_ignores_case() {
        let registry = AttributeRegistry::with_builtins();
        assert_eq!(registry.type_id_for_name("TRANSFORM"), registry.type_id_for_name("Transform"));
        assert!(registry.create_by_name("assetreference", "ref").is_some());
    }

    #[test]
    fn test_deprecated_aliases_share_ids() {
        let registry = AttributeRegistry::with_builtins();
        assert_eq!(registry.type_id_for_name("QVariant"), registry.type_id_for_name("Variant"));
        assert_eq!(registry.type_id_for_name("QVariantList"), registry.type_id_for_name("VariantList"));
        assert_eq!(registry.type_id_for_name("QPoint"), registry.type_id_for_name("Point"));
        assert_eq!(registry.attribute_types().len(), BUILTIN_TYPES.len());
    }

    #[test]
    fn test_create_by_name_and_id_agree() {
        let registry = AttributeRegistry::with_builtins();
        for type_name in registry.attribute_types() {
            let type_id = registry.type_id_for_name(&type_name);
            let by_name = registry.create_by_name(&type_name, "ByName").unwrap();
            let by_id = registry.create_by_id(type_id, "ById").unwrap();
            assert!(by_name.owner().is_none());
            assert!(by_id.owner().is_none());
            assert_eq!(by_name.type_id(), by_id.type_id());
            assert_eq!(by_name.type_name(), by_id.type_name());

            let mut ds_name = DataSerializer::new();
            let mut ds_id = DataSerializer::new();
            by_name.encode(&mut ds_name).unwrap();
            by_id.encode(&mut ds_id).unwrap();
            assert!(ds_name.bytes_filled() > 0, "{type_name} encoded to nothing");
            assert_eq!(ds_name.bytes_filled(), ds_id.bytes_filled());
        }
    }

    #[test]
    fn test_register_is_idempotent_for_same_kind() {
        let mut registry = AttributeRegistry::with_builtins();
        let id = registry.register("Velocity", ValueKind::Fixed(VariantType::Vector3)).unwrap();
        assert_eq!(id, 22);
        assert_eq!(registry.register("velocity", ValueKind::Fixed(VariantType::Vector3)), Ok(id));
    }

    #[test]
    fn test_register_conflict_keeps_first() {
        let mut registry = AttributeRegistry::with_builtins();
        let err = registry.register("int", ValueKind::Fixed(VariantType::Float)).unwrap_err();
        assert!(matches!(err, RegistryError::Conflict { type_id: 2, .. }));
        let attr = registry.create_by_name("int", "x").unwrap();
        assert_eq!(attr.kind(), ValueKind::Fixed(VariantType::Int));
    }

    #[test]
    fn test_register_rejects_bad_names() {
        let mut registry = AttributeRegistry::with_builtins();
        assert!(registry.register("", ValueKind::Any).is_err());
        assert!(registry.register(" padded ", ValueKind::Any).is_err());
    }
}
