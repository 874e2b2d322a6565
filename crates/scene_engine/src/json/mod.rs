//! # JSON Values
//!
//! A small tagged JSON tree parsed with `serde_json`. Objects keep their keys
//! in document order. Indexing a missing key or element yields
//! [`JsonValue::Null`] instead of panicking.

use std::fmt;
use std::ops::Index;

use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Kind of a [`JsonValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonType {
    /// `null`
    Null,
    /// `true` or `false`
    Bool,
    /// Any number
    Number,
    /// String
    String,
    /// Array
    Array,
    /// Object
    Object,
}

/// Parse failure with its position in the input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("JSON parse error at line {line}, column {column}: {message}")]
pub struct JsonError {
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
    /// What went wrong
    pub message: String,
}

impl From<serde_json::Error> for JsonError {
    fn from(e: serde_json::Error) -> Self {
        Self {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}

/// A parsed JSON value
#[derive(Debug, Clone, Default, PartialEq)]
pub enum JsonValue {
    /// `null`
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Number, always stored as a double
    Number(f64),
    /// String
    String(String),
    /// Array
    Array(Vec<JsonValue>),
    /// Object with keys in document order
    Object(Vec<(String, JsonValue)>),
}

static NULL: JsonValue = JsonValue::Null;

impl JsonValue {
    /// Parse JSON text; whitespace around every token is accepted
    pub fn parse(text: &str) -> Result<Self, JsonError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from(value))
    }

    /// Kind of this value
    pub const fn json_type(&self) -> JsonType {
        match self {
            Self::Null => JsonType::Null,
            Self::Bool(_) => JsonType::Bool,
            Self::Number(_) => JsonType::Number,
            Self::String(_) => JsonType::String,
            Self::Array(_) => JsonType::Array,
            Self::Object(_) => JsonType::Object,
        }
    }

    /// True for `null`
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// True for booleans
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// True for numbers
    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// True for strings
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// True for arrays
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// True for objects
    pub const fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Boolean value
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric value
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Array elements
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Object members in document order
    pub fn as_object(&self) -> Option<&[(String, Self)]> {
        match self {
            Self::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Member of an object by key
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_object()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of array elements or object members, 0 otherwise
    pub fn len(&self) -> usize {
        match self {
            Self::Array(items) => items.len(),
            Self::Object(members) => members.len(),
            _ => 0,
        }
    }

    /// True if [`JsonValue::len`] is 0
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compact JSON text; non-finite numbers become `null`
    pub fn to_json_string(&self) -> String {
        Value::from(self).to_string()
    }
}

impl From<Value> for JsonValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_f64().map_or(Self::Null, Self::Number),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(members) => Self::Object(members.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl From<&JsonValue> for Value {
    fn from(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(*b),
            JsonValue::Number(n) => Number::from_f64(*n).map_or(Self::Null, Self::Number),
            JsonValue::String(s) => Self::String(s.clone()),
            JsonValue::Array(items) => Self::Array(items.iter().map(Self::from).collect()),
            JsonValue::Object(members) => Self::Object(
                members
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from(v)))
                    .collect::<Map<String, Self>>(),
            ),
        }
    }
}

impl Index<&str> for JsonValue {
    type Output = Self;

    fn index(&self, key: &str) -> &Self {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for JsonValue {
    type Output = Self;

    fn index(&self, index: usize) -> &Self {
        self.as_array().and_then(|items| items.get(index)).unwrap_or(&NULL)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const STRING_DATA: &str = r#""  Json String Test\tHello World  ""#;

    fn object_data() -> String {
        format!(
            "{{\n\"Hello\":true  ,   \"World\"  \n:  10, \"Str\" :{STRING_DATA} , \"Arr\" : [1,2],\"Obj\":{{\"test\" : true}}  }}"
        )
    }

    fn array_data() -> String {
        format!(
            "[ \"Hello World\", 0  ,-1234,   1234.5678  ,  true,false,   \n   null, [ \"World Hello\", 10, false ]  \t , {}  \n]",
            object_data()
        )
    }

    fn assert_object(value: &JsonValue) {
        assert!(value.is_object());
        assert_eq!(value["Hello"].as_bool(), Some(true));
        assert_relative_eq!(value["World"].as_number().unwrap(), 10.0);
        assert_eq!(value["Str"].as_str().unwrap().len(), STRING_DATA.len() - 3);
        assert_relative_eq!(value["Arr"][1].as_number().unwrap(), 2.0);
        assert_eq!(value["Obj"]["test"].as_bool(), Some(true));
    }

    #[test]
    fn test_scalars_with_whitespace() {
        assert_eq!(JsonValue::parse(" \t \n     null   ").unwrap().json_type(), JsonType::Null);
        assert_eq!(JsonValue::parse(" \t \n     true   ").unwrap().as_bool(), Some(true));
        let number = JsonValue::parse("  \n    1238972313.12312412   ").unwrap();
        assert!(number.is_number());
        assert_relative_eq!(number.as_number().unwrap(), 1_238_972_313.123_124_1);
    }

    #[test]
    fn test_string_with_escaped_tab() {
        let value = JsonValue::parse(STRING_DATA).unwrap();
        assert!(value.is_string());
        assert_eq!(value.as_str(), Some("  Json String Test\tHello World  "));
    }

    #[test]
    fn test_object() {
        let value = JsonValue::parse(&object_data()).unwrap();
        assert_object(&value);
        let keys: Vec<&str> = value.as_object().unwrap().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["Hello", "World", "Str", "Arr", "Obj"]);
    }

    #[test]
    fn test_mixed_array() {
        let value = JsonValue::parse(&array_data()).unwrap();
        assert!(value.is_array());
        assert_eq!(value.len(), 9);
        assert_eq!(value[0].as_str(), Some("Hello World"));
        assert_relative_eq!(value[1].as_number().unwrap(), 0.0);
        assert_relative_eq!(value[2].as_number().unwrap(), -1234.0);
        assert_relative_eq!(value[3].as_number().unwrap(), 1234.5678);
        assert_eq!(value[4].as_bool(), Some(true));
        assert_eq!(value[5].as_bool(), Some(false));
        assert!(value[6].is_null());

        assert!(value[7].is_array());
        assert!(value[7][0].is_string());
        assert!(value[7][1].is_number());
        assert!(value[7][2].is_bool());

        assert_object(&value[8]);
    }

    #[test]
    fn test_missing_members_are_null() {
        let value = JsonValue::parse("{\"a\": [1]}").unwrap();
        assert!(value["b"].is_null());
        assert!(value["a"][5].is_null());
        assert!(value[0].is_null());
        assert!(value.get("b").is_none());
    }

    #[test]
    fn test_error_position() {
        let error = JsonValue::parse("{\"a\": 1,\n\"b\": }").unwrap_err();
        assert_eq!(error.line, 2);
        assert_eq!(error.column, 6);
        // leading zeros are not valid JSON
        assert!(JsonValue::parse("00010").is_err());
    }

    #[test]
    fn test_to_json_string_keeps_order() {
        let value = JsonValue::parse("{ \"z\": 1, \"a\": [true, null], \"m\": \"x\" }").unwrap();
        assert_eq!(value.to_json_string(), r#"{"z":1.0,"a":[true,null],"m":"x"}"#);
        assert_eq!(JsonValue::parse(&value.to_string()).unwrap(), value);
    }
}
