//! Typed, serializable value slots owned by components

use thiserror::Error;

use crate::foundation::collections::SceneKey;
use crate::foundation::math::{
    Color, IntRect, IntVector2, Mat3, Mat3x4, Mat4, Point, Quat, Quaternion, Transform, Vec2, Vec3, Vec4,
};
use crate::foundation::variant::{AssetReference, EntityReference, Variant, VariantType};
use crate::serialization::codec::{short_len, CodecError, DataDeserializer, DataSerializer};

use super::id_generator::{ComponentId, EntityId};

/// How a change should be propagated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AttributeChange {
    /// Use the component's own update mode
    #[default]
    Default,
    /// Apply silently, no events are raised
    Disconnected,
    /// Raise events but never replicate
    LocalOnly,
    /// Raise events and replicate
    Replicate,
}

/// Value kinds an attribute type accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Exactly one kind
    Fixed(VariantType),
    /// Any kind; binary data carries a kind tag
    Any,
}

impl ValueKind {
    /// True if a value may be stored in a slot of this kind
    pub fn accepts(self, value: &Variant) -> bool {
        match self {
            Self::Fixed(kind) => value.variant_type() == kind,
            Self::Any => true,
        }
    }

    /// Initial value of a fresh slot
    pub fn default_value(self) -> Variant {
        match self {
            Self::Fixed(kind) => kind.default_value(),
            Self::Any => Variant::Empty,
        }
    }
}

/// Where an attached attribute lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeOwner {
    /// Scene of the owning entity
    pub scene: SceneKey,
    /// Owning entity
    pub entity: EntityId,
    /// Owning component
    pub component: ComponentId,
}

/// Attribute errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttributeError {
    /// Value kind does not match the attribute type
    #[error("Type mismatch: attribute expects {expected}, got {found}")]
    TypeMismatch {
        /// Kind the attribute holds
        expected: VariantType,
        /// Kind that was offered
        found: VariantType,
    },

    /// Binary data was corrupt or truncated
    #[error("Deserialization failed: {0}")]
    Decode(#[from] CodecError),

    /// Text did not describe a value of the attribute's type
    #[error("Cannot parse {type_name} from {text:?}")]
    Parse {
        /// Attribute type name
        type_name: String,
        /// Offending text
        text: String,
    },

    /// No attribute with the given id
    #[error("No attribute {0:?}")]
    NotFound(String),

    /// Binary attribute count differs from the component's schema
    #[error("Attribute count mismatch: expected {expected}, found {found}")]
    CountMismatch {
        /// Count the component holds
        expected: usize,
        /// Count found in the data
        found: usize,
    },
}

/// A named, typed value slot
///
/// The value's kind always matches the attribute type; see [`Attribute::set`].
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    id: String,
    name: String,
    type_id: u32,
    type_name: String,
    kind: ValueKind,
    value: Variant,
    owner: Option<AttributeOwner>,
    dynamic: bool,
}

impl Attribute {
    pub(crate) fn new(type_id: u32, type_name: &str, kind: ValueKind, id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            type_id,
            type_name: type_name.to_string(),
            kind,
            value: kind.default_value(),
            owner: None,
            dynamic: false,
        }
    }

    /// Identifier, unique within the owning component
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Human readable name, defaults to the id
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set the human readable name
    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// Attribute type id
    pub const fn type_id(&self) -> u32 {
        self.type_id
    }

    /// Attribute type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Accepted value kinds
    pub const fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Current value
    pub const fn value(&self) -> &Variant {
        &self.value
    }

    /// Owning component, `None` until attached
    pub const fn owner(&self) -> Option<AttributeOwner> {
        self.owner
    }

    /// True if the attribute was added to a dynamic component at runtime
    pub const fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub(crate) fn set_owner(&mut self, owner: Option<AttributeOwner>) {
        self.owner = owner;
    }

    pub(crate) fn set_dynamic(&mut self, dynamic: bool) {
        self.dynamic = dynamic;
    }

    /// Replace the value; a value of a different kind is rejected untouched
    pub fn set(&mut self, value: impl Into<Variant>) -> Result<(), AttributeError> {
        let value = value.into();
        if let ValueKind::Fixed(expected) = self.kind {
            if value.variant_type() != expected {
                return Err(AttributeError::TypeMismatch {
                    expected,
                    found: value.variant_type(),
                });
            }
        }
        self.value = value;
        Ok(())
    }

    /// Write the value in its type's binary layout
    pub fn encode(&self, dest: &mut DataSerializer) -> Result<(), CodecError> {
        match self.kind {
            ValueKind::Fixed(_) => encode_value(&self.value, dest),
            ValueKind::Any => encode_tagged(&self.value, dest),
        }
    }

    /// Read a value in this attribute's binary layout
    ///
    /// On failure the previous value is kept.
    pub fn decode(&mut self, source: &mut DataDeserializer<'_>) -> Result<(), AttributeError> {
        self.value = self.decode_value(source)?;
        Ok(())
    }

    /// Read a value in this attribute's binary layout without storing it
    pub fn decode_value(&self, source: &mut DataDeserializer<'_>) -> Result<Variant, AttributeError> {
        let value = match self.kind {
            ValueKind::Fixed(kind) => decode_value(kind, source)?,
            ValueKind::Any => decode_tagged(source)?,
        };
        Ok(value)
    }

    /// Textual form of the value
    ///
    /// Attributes that accept any kind prefix the text with the kind name,
    /// `Float:1.5`, so the kind survives a text round trip.
    pub fn to_text(&self) -> String {
        match self.kind {
            ValueKind::Fixed(_) => self.value.to_string(),
            ValueKind::Any if self.value.is_empty() => String::new(),
            ValueKind::Any => format!("{}:{}", self.value.type_name(), self.value),
        }
    }

    /// Parse text produced by [`Attribute::to_text`] without storing it
    pub fn parse_text(&self, text: &str) -> Result<Variant, AttributeError> {
        let parsed = match self.kind {
            ValueKind::Fixed(kind) => Variant::parse(kind, text),
            ValueKind::Any => Some(parse_tagged_text(text)),
        };
        parsed.ok_or_else(|| AttributeError::Parse {
            type_name: self.type_name.clone(),
            text: text.to_string(),
        })
    }

    /// Set the value from its textual form
    pub fn from_text(&mut self, text: &str) -> Result<(), AttributeError> {
        self.value = self.parse_text(text)?;
        Ok(())
    }
}

fn parse_tagged_text(text: &str) -> Variant {
    if text.is_empty() {
        return Variant::Empty;
    }
    text.split_once(':')
        .and_then(|(kind, rest)| Variant::parse(VariantType::from_name(kind)?, rest))
        .unwrap_or_else(|| Variant::String(text.to_string()))
}

/// Write a value prefixed with its kind tag
pub fn encode_tagged(value: &Variant, dest: &mut DataSerializer) -> Result<(), CodecError> {
    dest.add_u8(value.variant_type().tag());
    encode_value(value, dest)
}

/// Read a value prefixed with its kind tag
pub fn decode_tagged(source: &mut DataDeserializer<'_>) -> Result<Variant, CodecError> {
    let tag = source.read_u8()?;
    let kind = VariantType::from_tag(tag).ok_or(CodecError::UnknownTag(tag))?;
    decode_value(kind, source)
}

/// Write a value in the layout implied by its kind, without a tag
pub fn encode_value(value: &Variant, dest: &mut DataSerializer) -> Result<(), CodecError> {
    match value {
        Variant::Empty => {}
        Variant::Int(v) => dest.add_i32(*v),
        Variant::UInt(v) => dest.add_u32(*v),
        Variant::Bool(v) => dest.add_bool(*v),
        Variant::Float(v) => dest.add_f32(*v),
        Variant::Vector2(v) => dest.add_f32_slice(v.as_slice()),
        Variant::Vector3(v) => dest.add_f32_slice(v.as_slice()),
        Variant::Vector4(v) => dest.add_f32_slice(v.as_slice()),
        Variant::Quaternion(q) => dest.add_f32_slice(q.quaternion().coords.as_slice()),
        Variant::Color(c) => dest.add_f32_slice(&[c.r, c.g, c.b, c.a]),
        Variant::String(s) => dest.add_string(s)?,
        Variant::IntRect(r) => {
            for v in [r.left, r.top, r.right, r.bottom] {
                dest.add_i32(v);
            }
        }
        Variant::IntVector2(v) => {
            dest.add_i32(v.x);
            dest.add_i32(v.y);
        }
        Variant::Point(p) => {
            dest.add_i32(p.x);
            dest.add_i32(p.y);
        }
        Variant::Matrix3(m) => dest.add_f32_slice(m.transpose().as_slice()),
        Variant::Matrix3x4(m) => dest.add_f32_slice(m.transpose().as_slice()),
        Variant::Matrix4(m) => dest.add_f32_slice(m.transpose().as_slice()),
        Variant::Transform(t) => dest.add_f32_slice(&t.to_array()),
        Variant::AssetReference(r) => dest.add_short_string(&r.reference)?,
        Variant::AssetReferenceList(refs) => {
            dest.add_u8(short_len(refs.len())?);
            for r in refs {
                dest.add_short_string(&r.reference)?;
            }
        }
        Variant::EntityReference(r) => dest.add_string(&r.reference)?,
        Variant::VariantList(items) => {
            dest.add_u8(short_len(items.len())?);
            for item in items {
                encode_tagged(item, dest)?;
            }
        }
    }
    Ok(())
}

/// Read a value of the given kind, without a tag
pub fn decode_value(kind: VariantType, source: &mut DataDeserializer<'_>) -> Result<Variant, CodecError> {
    let value = match kind {
        VariantType::Empty => Variant::Empty,
        VariantType::Int => Variant::Int(source.read_i32()?),
        VariantType::UInt => Variant::UInt(source.read_u32()?),
        VariantType::Bool => Variant::Bool(source.read_bool()?),
        VariantType::Float => Variant::Float(source.read_f32()?),
        VariantType::Vector2 => Variant::Vector2(Vec2::from(source.read_f32_array::<2>()?)),
        VariantType::Vector3 => Variant::Vector3(Vec3::from(source.read_f32_array::<3>()?)),
        VariantType::Vector4 => Variant::Vector4(Vec4::from(source.read_f32_array::<4>()?)),
        VariantType::Quaternion => {
            let [x, y, z, w] = source.read_f32_array::<4>()?;
            Variant::Quaternion(Quat::new_unchecked(Quaternion::new(w, x, y, z)))
        }
        VariantType::Color => {
            let [r, g, b, a] = source.read_f32_array::<4>()?;
            Variant::Color(Color::new(r, g, b, a))
        }
        VariantType::String => Variant::String(source.read_string()?),
        VariantType::IntRect => Variant::IntRect(IntRect::new(
            source.read_i32()?,
            source.read_i32()?,
            source.read_i32()?,
            source.read_i32()?,
        )),
        VariantType::IntVector2 => Variant::IntVector2(IntVector2::new(source.read_i32()?, source.read_i32()?)),
        VariantType::Point => Variant::Point(Point::new(source.read_i32()?, source.read_i32()?)),
        VariantType::Matrix3 => Variant::Matrix3(Mat3::from_row_slice(&source.read_f32_array::<9>()?)),
        VariantType::Matrix3x4 => {
            Variant::Matrix3x4(Mat3x4::from_row_slice(&source.read_f32_array::<12>()?))
        }
        VariantType::Matrix4 => Variant::Matrix4(Mat4::from_row_slice(&source.read_f32_array::<16>()?)),
        VariantType::Transform => Variant::Transform(Transform::from_array(source.read_f32_array::<9>()?)),
        VariantType::AssetReference => Variant::AssetReference(AssetReference::new(source.read_short_string()?)),
        VariantType::AssetReferenceList => {
            let count = source.read_u8()?;
            let refs = (0..count)
                .map(|_| source.read_short_string().map(AssetReference::new))
                .collect::<Result<Vec<_>, _>>()?;
            Variant::AssetReferenceList(refs)
        }
        VariantType::EntityReference => Variant::EntityReference(EntityReference::new(source.read_string()?)),
        VariantType::VariantList => {
            let count = source.read_u8()?;
            let items = (0..count)
                .map(|_| decode_tagged(source))
                .collect::<Result<Vec<_>, _>>()?;
            Variant::VariantList(items)
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn attribute(kind: VariantType) -> Attribute {
        Attribute::new(1, kind.name(), ValueKind::Fixed(kind), "test")
    }

    #[test]
    fn test_set_rejects_wrong_kind() {
        let mut attr = attribute(VariantType::Int);
        attr.set(5).unwrap();
        let err = attr.set("five").unwrap_err();
        assert_eq!(
            err,
            AttributeError::TypeMismatch { expected: VariantType::Int, found: VariantType::String }
        );
        assert_eq!(attr.value(), &Variant::Int(5));
    }

    #[test]
    fn test_any_kind_accepts_everything() {
        let mut attr = Attribute::new(14, "Variant", ValueKind::Any, "anything");
        attr.set(1.5f32).unwrap();
        attr.set("text").unwrap();
        assert_eq!(attr.value(), &Variant::from("text"));
    }

    /// A value of the kind that differs from its default
    fn sample(kind: VariantType) -> Variant {
        match kind {
            VariantType::Empty => Variant::Empty,
            VariantType::Int => Variant::Int(i32::MIN),
            VariantType::Bool => Variant::Bool(true),
            VariantType::Float => Variant::Float(-3.25),
            VariantType::Vector2 => Variant::Vector2(Vec2::new(0.5, -0.25)),
            VariantType::Vector3 => Variant::Vector3(Vec3::new(1.0, -2.0, 3.5)),
            VariantType::Vector4 => Variant::Vector4(Vec4::new(1.0, 2.0, -3.0, 4.5)),
            VariantType::Quaternion => Variant::Quaternion(Quat::from_euler_angles(0.1, 0.2, 0.3)),
            VariantType::Color => Variant::Color(Color::new(0.1, 0.2, 0.3, 0.4)),
            VariantType::String => Variant::String("hällo".to_string()),
            VariantType::IntRect => Variant::IntRect(IntRect::new(1, 2, 3, 4)),
            VariantType::IntVector2 => Variant::IntVector2(IntVector2::new(-7, 8)),
            VariantType::Matrix3 => Variant::Matrix3(Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0)),
            VariantType::Matrix3x4 => Variant::Matrix3x4(Mat3x4::from_row_slice(&[
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
            ])),
            VariantType::Matrix4 => Variant::Matrix4(Mat4::from_row_slice(&[
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0,
            ])),
            VariantType::UInt => Variant::UInt(u32::MAX),
            VariantType::Transform => Variant::Transform(Transform::from_position(Vec3::new(9.0, 8.0, 7.0))),
            VariantType::Point => Variant::Point(Point::new(-1, 1)),
            VariantType::AssetReference => Variant::AssetReference(AssetReference::new("local://a.mesh")),
            VariantType::AssetReferenceList => {
                Variant::AssetReferenceList(vec![AssetReference::new("x"), AssetReference::new("y")])
            }
            VariantType::EntityReference => Variant::EntityReference(EntityReference::from_id(3)),
            VariantType::VariantList => {
                Variant::VariantList(vec![Variant::Int(1), Variant::from("two"), Variant::Bool(false)])
            }
        }
    }

    fn binary_roundtrip(source: &Attribute, target: &mut Attribute) {
        let mut ds = DataSerializer::new();
        source.encode(&mut ds).unwrap();
        let bytes = ds.into_bytes();
        let mut dd = DataDeserializer::new(&bytes);
        target.decode(&mut dd).unwrap();
        assert_eq!(dd.bytes_left(), 0, "{} left bytes behind", source.type_name());
    }

    #[test]
    fn test_binary_roundtrip_per_kind() {
        for kind in VariantType::ALL {
            let value = sample(kind);
            assert_eq!(value.variant_type(), kind);
            let mut attr = attribute(kind);
            attr.set(value.clone()).unwrap();

            let mut decoded = attribute(kind);
            if kind != VariantType::Empty {
                assert_ne!(decoded.value(), &value, "{kind} sample equals the default");
            }
            binary_roundtrip(&attr, &mut decoded);
            assert_eq!(decoded.value(), &value, "{kind} changed in a binary round trip");
            assert_eq!(decoded.to_text(), attr.to_text());
        }
    }

    #[test]
    fn test_any_kind_binary_roundtrip() {
        for kind in VariantType::ALL {
            let value = sample(kind);
            let mut attr = Attribute::new(14, "Variant", ValueKind::Any, "anything");
            attr.set(value.clone()).unwrap();

            let mut decoded = Attribute::new(14, "Variant", ValueKind::Any, "anything");
            decoded.set(7).unwrap();
            binary_roundtrip(&attr, &mut decoded);
            assert_eq!(decoded.value(), &value, "tagged {kind} changed in a binary round trip");
            assert_eq!(decoded.value().variant_type(), kind);
        }
    }

    #[test]
    fn test_matrix_binary_is_row_major() {
        let mut attr = attribute(VariantType::Matrix3);
        attr.set(Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0)).unwrap();
        let mut ds = DataSerializer::new();
        attr.encode(&mut ds).unwrap();
        let bytes = ds.into_bytes();
        let mut dd = DataDeserializer::new(&bytes);
        assert_relative_eq!(dd.read_f32().unwrap(), 1.0);
        assert_relative_eq!(dd.read_f32().unwrap(), 2.0);
    }

    #[test]
    fn test_truncated_decode_keeps_previous_value() {
        let mut attr = attribute(VariantType::Vector3);
        attr.set(Vec3::new(1.0, 2.0, 3.0)).unwrap();

        let mut ds = DataSerializer::new();
        ds.add_f32(5.0);
        ds.add_f32(6.0);
        let bytes = ds.into_bytes();
        let mut dd = DataDeserializer::new(&bytes);

        let err = attr.decode(&mut dd).unwrap_err();
        assert!(matches!(err, AttributeError::Decode(CodecError::UnexpectedEnd { .. })));
        assert_eq!(attr.value(), &Variant::Vector3(Vec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_oversized_string_prefix_fails() {
        let mut attr = attribute(VariantType::String);
        attr.set("keep").unwrap();
        let bytes = [0xff, 0x00, b'a'];
        let mut dd = DataDeserializer::new(&bytes);
        assert!(attr.decode(&mut dd).is_err());
        assert_eq!(attr.value(), &Variant::from("keep"));
    }

    #[test]
    fn test_any_kind_text_keeps_type() {
        let mut attr = Attribute::new(14, "Variant", ValueKind::Any, "anything");
        attr.set(Vec3::new(1.0, 2.0, 3.0)).unwrap();
        let text = attr.to_text();
        assert_eq!(text, "Vector3:1 2 3");

        let mut other = Attribute::new(14, "Variant", ValueKind::Any, "anything");
        other.from_text(&text).unwrap();
        assert_eq!(other.value(), attr.value());

        other.from_text("plain words").unwrap();
        assert_eq!(other.value(), &Variant::from("plain words"));
    }

    #[test]
    fn test_from_text_failure_keeps_value() {
        let mut attr = attribute(VariantType::Float);
        attr.set(2.5f32).unwrap();
        assert!(attr.from_text("not a number").is_err());
        assert_eq!(attr.value(), &Variant::Float(2.5));
    }
}
