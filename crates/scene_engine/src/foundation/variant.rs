//! Tagged value type shared by attributes and the config store
//!
//! A [`Variant`] holds one value out of a closed set of kinds. Every kind has a
//! textual form produced by `Display` and read back by [`Variant::parse`], so
//! values survive structured text documents and config files unchanged.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::math::{
    Color, IntRect, IntVector2, Mat3, Mat3x4, Mat4, Point, Quat, Quaternion, Transform, Vec2, Vec3, Vec4,
};

/// Separator used for the textual form of list kinds
pub const LIST_SEPARATOR: char = ';';

/// Kind tag of a [`Variant`]
///
/// The discriminants are written to binary streams when a value travels
/// without a statically known kind, so they must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum VariantType {
    /// No value
    Empty = 0,
    /// Signed 32-bit integer
    Int = 1,
    /// Boolean
    Bool = 2,
    /// 32-bit float
    Float = 3,
    /// 2D float vector
    Vector2 = 4,
    /// 3D float vector
    Vector3 = 5,
    /// 4D float vector
    Vector4 = 6,
    /// Rotation quaternion
    Quaternion = 7,
    /// RGBA color
    Color = 8,
    /// UTF-8 string
    String = 9,
    /// Integer rectangle
    IntRect = 10,
    /// Integer 2D vector
    IntVector2 = 11,
    /// 3x3 matrix
    Matrix3 = 12,
    /// 3x4 matrix
    Matrix3x4 = 13,
    /// 4x4 matrix
    Matrix4 = 14,
    /// Unsigned 32-bit integer
    UInt = 15,
    /// Position, euler rotation and scale
    Transform = 16,
    /// Integer point
    Point = 17,
    /// Reference to an asset
    AssetReference = 18,
    /// List of asset references
    AssetReferenceList = 19,
    /// Reference to an entity by name or id
    EntityReference = 20,
    /// Heterogeneous list of variants
    VariantList = 21,
}

impl VariantType {
    /// Every kind in tag order
    pub const ALL: [Self; 22] = [
        Self::Empty,
        Self::Int,
        Self::Bool,
        Self::Float,
        Self::Vector2,
        Self::Vector3,
        Self::Vector4,
        Self::Quaternion,
        Self::Color,
        Self::String,
        Self::IntRect,
        Self::IntVector2,
        Self::Matrix3,
        Self::Matrix3x4,
        Self::Matrix4,
        Self::UInt,
        Self::Transform,
        Self::Point,
        Self::AssetReference,
        Self::AssetReferenceList,
        Self::EntityReference,
        Self::VariantList,
    ];

    /// Stable name of the kind
    pub const fn name(self) -> &'static str {
        match self {
            Self::Empty => "None",
            Self::Int => "Int",
            Self::Bool => "Bool",
            Self::Float => "Float",
            Self::Vector2 => "Vector2",
            Self::Vector3 => "Vector3",
            Self::Vector4 => "Vector4",
            Self::Quaternion => "Quaternion",
            Self::Color => "Color",
            Self::String => "String",
            Self::IntRect => "IntRect",
            Self::IntVector2 => "IntVector2",
            Self::Matrix3 => "Matrix3",
            Self::Matrix3x4 => "Matrix3x4",
            Self::Matrix4 => "Matrix4",
            Self::UInt => "UInt",
            Self::Transform => "Transform",
            Self::Point => "Point",
            Self::AssetReference => "AssetReference",
            Self::AssetReferenceList => "AssetReferenceList",
            Self::EntityReference => "EntityReference",
            Self::VariantList => "VariantList",
        }
    }

    /// Look a kind up by its name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// Look a kind up by its binary tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.get(usize::from(tag)).copied()
    }

    /// Binary tag of the kind
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Zero value of this kind
    pub fn default_value(self) -> Variant {
        match self {
            Self::Empty => Variant::Empty,
            Self::Int => Variant::Int(0),
            Self::Bool => Variant::Bool(false),
            Self::Float => Variant::Float(0.0),
            Self::Vector2 => Variant::Vector2(Vec2::zeros()),
            Self::Vector3 => Variant::Vector3(Vec3::zeros()),
            Self::Vector4 => Variant::Vector4(Vec4::zeros()),
            Self::Quaternion => Variant::Quaternion(Quat::identity()),
            Self::Color => Variant::Color(Color::default()),
            Self::String => Variant::String(String::new()),
            Self::IntRect => Variant::IntRect(IntRect::default()),
            Self::IntVector2 => Variant::IntVector2(IntVector2::default()),
            Self::Matrix3 => Variant::Matrix3(Mat3::identity()),
            Self::Matrix3x4 => Variant::Matrix3x4(Mat3x4::identity()),
            Self::Matrix4 => Variant::Matrix4(Mat4::identity()),
            Self::UInt => Variant::UInt(0),
            Self::Transform => Variant::Transform(Transform::default()),
            Self::Point => Variant::Point(Point::default()),
            Self::AssetReference => Variant::AssetReference(AssetReference::default()),
            Self::AssetReferenceList => Variant::AssetReferenceList(Vec::new()),
            Self::EntityReference => Variant::EntityReference(EntityReference::default()),
            Self::VariantList => Variant::VariantList(Vec::new()),
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reference to an asset by its URL-like name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetReference {
    /// Asset reference string
    pub reference: String,
}

impl AssetReference {
    /// Create a new asset reference
    pub fn new(reference: impl Into<String>) -> Self {
        Self { reference: reference.into() }
    }
}

/// Reference to an entity, either by name or by decimal id
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityReference {
    /// Entity name or id as text
    pub reference: String,
}

impl EntityReference {
    /// Create a reference from a name or id string
    pub fn new(reference: impl Into<String>) -> Self {
        Self { reference: reference.into() }
    }

    /// Create a reference that points at an entity id
    pub fn from_id(id: u32) -> Self {
        Self { reference: id.to_string() }
    }

    /// The referenced entity id, if the reference is numeric
    pub fn id(&self) -> Option<u32> {
        self.reference.trim().parse().ok()
    }

    /// True if the reference points nowhere
    pub fn is_empty(&self) -> bool {
        self.reference.trim().is_empty()
    }
}

/// A value of one of the supported kinds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    /// No value
    #[default]
    Empty,
    /// Signed integer
    Int(i32),
    /// Boolean
    Bool(bool),
    /// Float
    Float(f32),
    /// 2D vector
    Vector2(Vec2),
    /// 3D vector
    Vector3(Vec3),
    /// 4D vector
    Vector4(Vec4),
    /// Rotation
    Quaternion(Quat),
    /// Color
    Color(Color),
    /// String
    String(String),
    /// Integer rectangle
    IntRect(IntRect),
    /// Integer 2D vector
    IntVector2(IntVector2),
    /// 3x3 matrix
    Matrix3(Mat3),
    /// 3x4 matrix
    Matrix3x4(Mat3x4),
    /// 4x4 matrix
    Matrix4(Mat4),
    /// Unsigned integer
    UInt(u32),
    /// Transform
    Transform(Transform),
    /// Integer point
    Point(Point),
    /// Asset reference
    AssetReference(AssetReference),
    /// List of asset references
    AssetReferenceList(Vec<AssetReference>),
    /// Entity reference
    EntityReference(EntityReference),
    /// List of variants
    VariantList(Vec<Variant>),
}

impl Variant {
    /// Kind tag of this value
    pub const fn variant_type(&self) -> VariantType {
        match self {
            Self::Empty => VariantType::Empty,
            Self::Int(_) => VariantType::Int,
            Self::Bool(_) => VariantType::Bool,
            Self::Float(_) => VariantType::Float,
            Self::Vector2(_) => VariantType::Vector2,
            Self::Vector3(_) => VariantType::Vector3,
            Self::Vector4(_) => VariantType::Vector4,
            Self::Quaternion(_) => VariantType::Quaternion,
            Self::Color(_) => VariantType::Color,
            Self::String(_) => VariantType::String,
            Self::IntRect(_) => VariantType::IntRect,
            Self::IntVector2(_) => VariantType::IntVector2,
            Self::Matrix3(_) => VariantType::Matrix3,
            Self::Matrix3x4(_) => VariantType::Matrix3x4,
            Self::Matrix4(_) => VariantType::Matrix4,
            Self::UInt(_) => VariantType::UInt,
            Self::Transform(_) => VariantType::Transform,
            Self::Point(_) => VariantType::Point,
            Self::AssetReference(_) => VariantType::AssetReference,
            Self::AssetReferenceList(_) => VariantType::AssetReferenceList,
            Self::EntityReference(_) => VariantType::EntityReference,
            Self::VariantList(_) => VariantType::VariantList,
        }
    }

    /// Name of this value's kind
    pub const fn type_name(&self) -> &'static str {
        self.variant_type().name()
    }

    /// True for [`Variant::Empty`]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Parse the textual form of a value of the given kind
    ///
    /// Returns `None` when the text does not describe a value of that kind.
    /// Variant lists parse their items as strings, since the textual form
    /// carries no per-item kind.
    pub fn parse(kind: VariantType, text: &str) -> Option<Self> {
        let value = match kind {
            VariantType::Empty => Self::Empty,
            VariantType::Int => Self::Int(text.trim().parse().ok()?),
            VariantType::UInt => Self::UInt(text.trim().parse().ok()?),
            VariantType::Bool => Self::Bool(parse_bool(text)?),
            VariantType::Float => Self::Float(text.trim().parse().ok()?),
            VariantType::Vector2 => Self::Vector2(Vec2::from(parse_array::<f32, 2>(text)?)),
            VariantType::Vector3 => Self::Vector3(Vec3::from(parse_array::<f32, 3>(text)?)),
            VariantType::Vector4 => Self::Vector4(Vec4::from(parse_array::<f32, 4>(text)?)),
            VariantType::Quaternion => {
                let [w, x, y, z] = parse_array::<f32, 4>(text)?;
                Self::Quaternion(Quat::new_unchecked(Quaternion::new(w, x, y, z)))
            }
            VariantType::Color => {
                let [r, g, b, a] = parse_array::<f32, 4>(text)?;
                Self::Color(Color::new(r, g, b, a))
            }
            VariantType::String => Self::String(text.to_string()),
            VariantType::IntRect => {
                let [l, t, r, b] = parse_array::<i32, 4>(text)?;
                Self::IntRect(IntRect::new(l, t, r, b))
            }
            VariantType::IntVector2 => {
                let [x, y] = parse_array::<i32, 2>(text)?;
                Self::IntVector2(IntVector2::new(x, y))
            }
            VariantType::Point => {
                let [x, y] = parse_array::<i32, 2>(text)?;
                Self::Point(Point::new(x, y))
            }
            VariantType::Matrix3 => Self::Matrix3(Mat3::from_row_slice(&parse_array::<f32, 9>(text)?)),
            VariantType::Matrix3x4 => {
                Self::Matrix3x4(Mat3x4::from_row_slice(&parse_array::<f32, 12>(text)?))
            }
            VariantType::Matrix4 => Self::Matrix4(Mat4::from_row_slice(&parse_array::<f32, 16>(text)?)),
            VariantType::Transform => Self::Transform(Transform::from_array(parse_array::<f32, 9>(text)?)),
            VariantType::AssetReference => Self::AssetReference(AssetReference::new(text)),
            VariantType::AssetReferenceList => {
                Self::AssetReferenceList(split_list(text).map(AssetReference::new).collect())
            }
            VariantType::EntityReference => Self::EntityReference(EntityReference::new(text)),
            VariantType::VariantList => {
                Self::VariantList(split_list(text).map(|s| Self::String(s.to_string())).collect())
            }
        };
        Some(value)
    }

    /// Integer value, converting from the other numeric kinds
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Unsigned integer value
    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Boolean value
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value
    pub const fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// String slice of string-like kinds
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::AssetReference(r) => Some(&r.reference),
            Self::EntityReference(r) => Some(&r.reference),
            _ => None,
        }
    }

    /// Transform value
    pub const fn as_transform(&self) -> Option<&Transform> {
        match self {
            Self::Transform(t) => Some(t),
            _ => None,
        }
    }

    /// Items of a variant list
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::VariantList(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Vector2(v) => write_joined(f, v.iter()),
            Self::Vector3(v) => write_joined(f, v.iter()),
            Self::Vector4(v) => write_joined(f, v.iter()),
            Self::Quaternion(q) => {
                let q = q.quaternion();
                write!(f, "{} {} {} {}", q.w, q.i, q.j, q.k)
            }
            Self::Color(c) => write!(f, "{} {} {} {}", c.r, c.g, c.b, c.a),
            Self::String(s) => f.write_str(s),
            Self::IntRect(r) => write!(f, "{} {} {} {}", r.left, r.top, r.right, r.bottom),
            Self::IntVector2(v) => write!(f, "{} {}", v.x, v.y),
            Self::Point(p) => write!(f, "{} {}", p.x, p.y),
            Self::Matrix3(m) => write_joined(f, m.transpose().iter()),
            Self::Matrix3x4(m) => write_joined(f, m.transpose().iter()),
            Self::Matrix4(m) => write_joined(f, m.transpose().iter()),
            Self::Transform(t) => write_joined(f, t.to_array().iter()),
            Self::AssetReference(r) => f.write_str(&r.reference),
            Self::AssetReferenceList(refs) => {
                let joined: Vec<&str> = refs.iter().map(|r| r.reference.as_str()).collect();
                f.write_str(&joined.join(&LIST_SEPARATOR.to_string()))
            }
            Self::EntityReference(r) => f.write_str(&r.reference),
            Self::VariantList(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "{LIST_SEPARATOR}")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

// Column-major storage transposed so iteration order is row-major.
fn write_joined<'a>(f: &mut fmt::Formatter<'_>, values: impl Iterator<Item = &'a f32>) -> fmt::Result {
    for (i, v) in values.enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

fn parse_array<T: FromStr + Copy + Default, const N: usize>(text: &str) -> Option<[T; N]> {
    let mut out = [T::default(); N];
    let mut parts = text.split_whitespace();
    for slot in &mut out {
        *slot = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

fn split_list(text: &str) -> impl Iterator<Item = &str> {
    let text = if text.is_empty() { None } else { Some(text) };
    text.into_iter().flat_map(|t| t.split(LIST_SEPARATOR))
}

macro_rules! impl_from_for_variant {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Self::$kind(value)
                }
            }
        )*
    };
}

impl_from_for_variant! {
    i32 => Int,
    u32 => UInt,
    bool => Bool,
    f32 => Float,
    Vec2 => Vector2,
    Vec3 => Vector3,
    Vec4 => Vector4,
    Quat => Quaternion,
    Color => Color,
    String => String,
    IntRect => IntRect,
    IntVector2 => IntVector2,
    Mat3 => Matrix3,
    Mat3x4 => Matrix3x4,
    Mat4 => Matrix4,
    Transform => Transform,
    Point => Point,
    AssetReference => AssetReference,
    EntityReference => EntityReference,
    Vec<Variant> => VariantList,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_values() -> Vec<Variant> {
        vec![
            Variant::Int(-1_234_567),
            Variant::UInt(4_000_000_000),
            Variant::Bool(true),
            Variant::Float(0.123_456_79),
            Variant::Vector2(Vec2::new(1.5, -2.25)),
            Variant::Vector3(Vec3::new(0.1, 0.2, 0.3)),
            Variant::Vector4(Vec4::new(1.0, 2.0, 3.0, 4.0)),
            Variant::Quaternion(Quat::from_euler_angles(0.3, 0.2, 0.1)),
            Variant::Color(Color::new(0.25, 0.5, 0.75, 1.0)),
            Variant::String("This [is] a = a test } { @ ?!".to_string()),
            Variant::IntRect(IntRect::new(-5, 6, 70, 800)),
            Variant::IntVector2(IntVector2::new(-3, 9)),
            Variant::Point(Point::new(12, -12)),
            Variant::Matrix3(Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.5)),
            Variant::Matrix3x4(Mat3x4::from_row_slice(&[
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
            ])),
            Variant::Matrix4(Mat4::new_translation(&Vec3::new(1.0, 2.0, 3.0))),
            Variant::Transform(Transform::from_position(Vec3::new(4.0, 5.0, 6.0))),
            Variant::AssetReference(AssetReference::new("local://box.mesh")),
            Variant::AssetReferenceList(vec![
                AssetReference::new("a.material"),
                AssetReference::new("b.material"),
            ]),
            Variant::EntityReference(EntityReference::from_id(42)),
        ]
    }

    #[test]
    fn test_text_roundtrip_preserves_kind_and_text() {
        for value in sample_values() {
            let text = value.to_string();
            let parsed = Variant::parse(value.variant_type(), &text)
                .unwrap_or_else(|| panic!("failed to parse {} from {text:?}", value.type_name()));
            assert_eq!(parsed.variant_type(), value.variant_type());
            assert_eq!(parsed.to_string(), text);
        }
    }

    #[test]
    fn test_matrix_text_is_row_major() {
        let m = Mat3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        assert_eq!(Variant::Matrix3(m).to_string(), "1 2 3 4 5 6 7 8 9");
    }

    #[test]
    fn test_parse_rejects_wrong_component_count() {
        assert!(Variant::parse(VariantType::Vector3, "1 2").is_none());
        assert!(Variant::parse(VariantType::Vector3, "1 2 3 4").is_none());
        assert!(Variant::parse(VariantType::Int, "abc").is_none());
        assert!(Variant::parse(VariantType::Bool, "maybe").is_none());
    }

    #[test]
    fn test_variant_list_text() {
        let list = Variant::VariantList(vec![Variant::Int(1), Variant::from("two")]);
        assert_eq!(list.to_string(), "1;two");
        let parsed = Variant::parse(VariantType::VariantList, "1;two").unwrap();
        assert_eq!(parsed.as_list().map(<[Variant]>::len), Some(2));
        assert_eq!(Variant::parse(VariantType::VariantList, "").unwrap(), Variant::VariantList(vec![]));
    }

    #[test]
    fn test_type_names_and_tags() {
        for kind in VariantType::ALL {
            assert_eq!(VariantType::from_name(kind.name()), Some(kind));
            assert_eq!(VariantType::from_tag(kind.tag()), Some(kind));
            assert_eq!(kind.default_value().variant_type(), kind);
        }
        assert_eq!(VariantType::from_name("matrix3x4"), Some(VariantType::Matrix3x4));
        assert!(VariantType::from_tag(200).is_none());
    }

    #[test]
    fn test_entity_reference_id() {
        assert_eq!(EntityReference::from_id(17).id(), Some(17));
        assert_eq!(EntityReference::new("Box").id(), None);
        assert!(EntityReference::default().is_empty());
    }
}
