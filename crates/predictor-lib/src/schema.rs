//! JSON schema validation for predictor payloads
//!
//! Implements the subset of JSON Schema that predictors use to describe their
//! request shapes:
//! - `type` (a single type name or a list of names)
//! - `minItems`, `maxItems` and `items` for arrays (one schema for every item,
//!   or a list of positional schemas with any further items left unchecked)
//! - `properties`, `required` and `additionalProperties` for objects
//! - `minimum`, `maximum` for numbers and `enum` for any value
//!
//! `enum` compares numbers by value, so `1` matches an allowed `1.0`.
//!
//! Unknown keywords are ignored. A schema document is compiled once into a
//! [`Schema`] and can then be used to validate any number of values.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Primitive JSON types that a schema can require
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Array,
    Object,
    Number,
    Integer,
    Boolean,
    String,
    Null,
}

impl JsonType {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "array" => Some(JsonType::Array),
            "object" => Some(JsonType::Object),
            "number" => Some(JsonType::Number),
            "integer" => Some(JsonType::Integer),
            "boolean" => Some(JsonType::Boolean),
            "string" => Some(JsonType::String),
            "null" => Some(JsonType::Null),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::Array => "array",
            JsonType::Object => "object",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::String => "string",
            JsonType::Null => "null",
        }
    }

    /// Returns true if the value is an instance of this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            JsonType::Array => value.is_array(),
            JsonType::Object => value.is_object(),
            JsonType::Number => value.is_number(),
            JsonType::Integer => match value {
                Value::Number(n) => is_integral(n),
                _ => false,
            },
            JsonType::Boolean => value.is_boolean(),
            JsonType::String => value.is_string(),
            JsonType::Null => value.is_null(),
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_integral(n: &Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A schema document that could not be compiled
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("schema at `{path}` must be a JSON object")]
    NotAnObject { path: String },

    #[error("unknown type `{name}` in schema at `{path}`")]
    UnknownType { path: String, name: String },

    #[error("invalid `{keyword}` in schema at `{path}`: {reason}")]
    InvalidKeyword {
        path: String,
        keyword: &'static str,
        reason: String,
    },
}

/// A value that does not conform to its schema
///
/// `path` is a JSON pointer to the offending value (`/` for the root).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value at `{path}` {message}")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: display_path(path),
            message: message.into(),
        }
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

/// Append a JSON pointer segment, escaping `~` and `/`
fn child_path(path: &str, segment: &str) -> String {
    let escaped = segment.replace('~', "~0").replace('/', "~1");
    format!("{}/{}", path, escaped)
}

/// Structural equality where numbers compare by value
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}

#[derive(Debug, Clone)]
enum Items {
    Each(Box<Node>),
    Positional(Vec<Node>),
}

#[derive(Debug, Clone)]
struct Node {
    types: Vec<JsonType>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    items: Option<Items>,
    properties: BTreeMap<String, Node>,
    required: Vec<String>,
    additional_properties: bool,
    minimum: Option<f64>,
    maximum: Option<f64>,
    allowed: Option<Vec<Value>>,
}

impl Node {
    fn compile(value: &Value, path: &str) -> Result<Self, SchemaError> {
        let obj = value.as_object().ok_or_else(|| SchemaError::NotAnObject {
            path: display_path(path),
        })?;

        let min_items = count_keyword(obj, "minItems", path)?;
        let max_items = count_keyword(obj, "maxItems", path)?;
        if let (Some(min), Some(max)) = (min_items, max_items) {
            if min > max {
                return Err(invalid(
                    path,
                    "maxItems",
                    format!("{} is smaller than minItems {}", max, min),
                ));
            }
        }

        let items_path = child_path(path, "items");
        let items = match obj.get("items") {
            None => None,
            Some(Value::Array(schemas)) => Some(Items::Positional(
                schemas
                    .iter()
                    .enumerate()
                    .map(|(i, schema)| {
                        Node::compile(schema, &child_path(&items_path, &i.to_string()))
                    })
                    .collect::<Result<_, _>>()?,
            )),
            Some(schema) => Some(Items::Each(Box::new(Node::compile(schema, &items_path)?))),
        };

        let mut properties = BTreeMap::new();
        if let Some(props) = obj.get("properties") {
            let props = props
                .as_object()
                .ok_or_else(|| invalid(path, "properties", "expected an object"))?;
            let props_path = child_path(path, "properties");
            for (name, schema) in props {
                properties.insert(
                    name.clone(),
                    Node::compile(schema, &child_path(&props_path, name))?,
                );
            }
        }

        let required = match obj.get("required") {
            None => Vec::new(),
            Some(Value::Array(names)) => names
                .iter()
                .map(|n| {
                    n.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| invalid(path, "required", "expected a list of strings"))
                })
                .collect::<Result<_, _>>()?,
            Some(_) => return Err(invalid(path, "required", "expected a list of strings")),
        };

        let additional_properties = match obj.get("additionalProperties") {
            None => true,
            Some(Value::Bool(allowed)) => *allowed,
            Some(_) => {
                return Err(invalid(
                    path,
                    "additionalProperties",
                    "only boolean values are supported",
                ))
            }
        };

        let allowed = match obj.get("enum") {
            None => None,
            Some(Value::Array(values)) => Some(values.clone()),
            Some(_) => return Err(invalid(path, "enum", "expected a list")),
        };

        Ok(Self {
            types: type_keyword(obj, path)?,
            min_items,
            max_items,
            items,
            properties,
            required,
            additional_properties,
            minimum: bound_keyword(obj, "minimum", path)?,
            maximum: bound_keyword(obj, "maximum", path)?,
            allowed,
        })
    }

    fn check(&self, value: &Value, path: &str) -> Result<(), SchemaViolation> {
        if !self.types.is_empty() && !self.types.iter().any(|t| t.matches(value)) {
            return Err(SchemaViolation::new(
                path,
                format!("expected {}, found {}", self.expected_types(), type_name(value)),
            ));
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.iter().any(|a| json_equal(a, value)) {
                return Err(SchemaViolation::new(path, "is not one of the allowed values"));
            }
        }

        match value {
            Value::Array(items) => self.check_array(items, path),
            Value::Object(map) => self.check_object(map, path),
            Value::Number(n) => self.check_number(n, path),
            _ => Ok(()),
        }
    }

    fn check_array(&self, items: &[Value], path: &str) -> Result<(), SchemaViolation> {
        if let Some(min) = self.min_items {
            if items.len() < min {
                return Err(SchemaViolation::new(
                    path,
                    format!("has {} items, expected at least {}", items.len(), min),
                ));
            }
        }
        if let Some(max) = self.max_items {
            if items.len() > max {
                return Err(SchemaViolation::new(
                    path,
                    format!("has {} items, expected at most {}", items.len(), max),
                ));
            }
        }
        match &self.items {
            Some(Items::Each(schema)) => {
                for (index, item) in items.iter().enumerate() {
                    schema.check(item, &child_path(path, &index.to_string()))?;
                }
            }
            Some(Items::Positional(schemas)) => {
                for (index, (schema, item)) in schemas.iter().zip(items).enumerate() {
                    schema.check(item, &child_path(path, &index.to_string()))?;
                }
            }
            None => {}
        }
        Ok(())
    }

    fn check_object(&self, map: &Map<String, Value>, path: &str) -> Result<(), SchemaViolation> {
        for name in &self.required {
            if !map.contains_key(name) {
                return Err(SchemaViolation::new(
                    path,
                    format!("is missing required property `{}`", name),
                ));
            }
        }
        for (name, property) in &self.properties {
            if let Some(v) = map.get(name) {
                property.check(v, &child_path(path, name))?;
            }
        }
        if !self.additional_properties {
            if let Some(extra) = map.keys().find(|k| !self.properties.contains_key(*k)) {
                return Err(SchemaViolation::new(
                    path,
                    format!("has unexpected property `{}`", extra),
                ));
            }
        }
        Ok(())
    }

    fn check_number(&self, n: &Number, path: &str) -> Result<(), SchemaViolation> {
        let Some(v) = n.as_f64() else {
            return Ok(());
        };
        if let Some(min) = self.minimum {
            if v < min {
                return Err(SchemaViolation::new(
                    path,
                    format!("is {}, expected at least {}", v, min),
                ));
            }
        }
        if let Some(max) = self.maximum {
            if v > max {
                return Err(SchemaViolation::new(
                    path,
                    format!("is {}, expected at most {}", v, max),
                ));
            }
        }
        Ok(())
    }

    fn expected_types(&self) -> String {
        match self.types.as_slice() {
            [single] => single.to_string(),
            many => {
                let names: Vec<&str> = many.iter().map(JsonType::as_str).collect();
                format!("one of [{}]", names.join(", "))
            }
        }
    }
}

fn invalid(path: &str, keyword: &'static str, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidKeyword {
        path: display_path(path),
        keyword,
        reason: reason.into(),
    }
}

fn type_keyword(obj: &Map<String, Value>, path: &str) -> Result<Vec<JsonType>, SchemaError> {
    let parse = |name: &str| {
        JsonType::parse(name).ok_or_else(|| SchemaError::UnknownType {
            path: display_path(path),
            name: name.to_string(),
        })
    };

    match obj.get("type") {
        None => Ok(Vec::new()),
        Some(Value::String(name)) => Ok(vec![parse(name.as_str())?]),
        Some(Value::Array(names)) => names
            .iter()
            .map(|n| {
                n.as_str()
                    .ok_or_else(|| invalid(path, "type", "expected a list of type names"))
                    .and_then(parse)
            })
            .collect(),
        Some(_) => Err(invalid(path, "type", "expected a type name or a list of names")),
    }
}

fn count_keyword(
    obj: &Map<String, Value>,
    keyword: &'static str,
    path: &str,
) -> Result<Option<usize>, SchemaError> {
    match obj.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| invalid(path, keyword, "expected a non-negative integer")),
    }
}

fn bound_keyword(
    obj: &Map<String, Value>,
    keyword: &'static str,
    path: &str,
) -> Result<Option<f64>, SchemaError> {
    match obj.get(keyword) {
        None => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(path, keyword, "expected a number")),
    }
}

/// A compiled schema together with the document it was compiled from
///
/// Serializes back to the original document, so the schema a predictor
/// declares is exactly the schema clients are shown.
#[derive(Debug, Clone)]
pub struct Schema {
    document: Value,
    root: Node,
}

impl Schema {
    /// Compile a schema document
    pub fn from_value(document: Value) -> Result<Self, SchemaError> {
        let root = Node::compile(&document, "")?;
        Ok(Self { document, root })
    }

    /// The schema document as it was declared
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Validate a value against this schema, reporting the first violation
    pub fn validate(&self, value: &Value) -> Result<(), SchemaViolation> {
        self.root.check(value, "")
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.document == other.document
    }
}

impl TryFrom<Value> for Schema {
    type Error = SchemaError;

    fn try_from(document: Value) -> Result<Self, Self::Error> {
        Schema::from_value(document)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.document.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let document = Value::deserialize(deserializer)?;
        Schema::from_value(document).map_err(serde::de::Error::custom)
    }
}

/// Validate `value` against `schema`
pub fn validate(value: &Value, schema: &Schema) -> Result<(), SchemaViolation> {
    schema.validate(value)
}
