//! Feature, attribute and schema types shared by every stage of the pipeline

use crate::{Result, StackError};
use geo::LineString;
use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single attribute value of a feature
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The attribute type of this value, `None` for nulls
    pub fn attribute_type(&self) -> Option<AttributeType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(AttributeType::Bool),
            Value::Int(_) => Some(AttributeType::Int),
            Value::Float(_) => Some(AttributeType::Float),
            Value::String(_) => Some(AttributeType::String),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{s}\""),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

/// Declared type of a schema attribute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AttributeType {
    Bool,
    Int,
    Float,
    String,
}

/// Declared geometry type of a feature collection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GeometryType {
    LineString,
    MultiLineString,
    Point,
    Polygon,
    Other,
}

/// Name and type of one attribute column
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AttributeDescriptor {
    pub name: String,
    pub attribute_type: AttributeType,
}

/// Feature type: geometry type plus the ordered attribute columns
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Schema {
    pub name: String,
    pub geometry_type: GeometryType,
    pub attributes: Vec<AttributeDescriptor>,
}

impl Schema {
    /// Create a line string schema without attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            geometry_type: GeometryType::LineString,
            attributes: Vec::new(),
        }
    }

    /// Builder-style helper appending an attribute column
    pub fn with_attribute(mut self, name: impl Into<String>, attribute_type: AttributeType) -> Self {
        self.attributes.push(AttributeDescriptor {
            name: name.into(),
            attribute_type,
        });
        self
    }

    /// Derive a line string schema from the first non-null value of every attribute.
    ///
    /// Attributes that are null in every feature are typed as strings.
    pub fn infer(name: impl Into<String>, features: &[Feature]) -> Self {
        let mut schema = Schema::new(name);
        // Whether a column has seen a non-null value yet
        let mut typed: Vec<bool> = Vec::new();
        for feature in features {
            for (attr_name, value) in &feature.attributes {
                match schema.attributes.iter().position(|d| &d.name == attr_name) {
                    Some(i) => {
                        if let (false, Some(t)) = (typed[i], value.attribute_type()) {
                            schema.attributes[i].attribute_type = t;
                            typed[i] = true;
                        }
                    }
                    None => {
                        schema.attributes.push(AttributeDescriptor {
                            name: attr_name.clone(),
                            attribute_type: value.attribute_type().unwrap_or(AttributeType::String),
                        });
                        typed.push(!value.is_null());
                    }
                }
            }
        }
        schema
    }

    /// Look up an attribute column by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|d| d.name == name)
    }

    /// Fail unless the collection holds line strings
    pub fn assert_geometry_type(&self, expected: GeometryType) -> Result<()> {
        if self.geometry_type != expected {
            return Err(StackError::InvalidGeometryType {
                expected,
                found: self.geometry_type,
            });
        }
        Ok(())
    }

    /// Restrict the schema to the given attribute names, in the given order
    pub fn project(&self, names: &[String]) -> Result<Schema> {
        let mut attributes = Vec::with_capacity(names.len());
        for name in names {
            let descriptor = self
                .attribute(name)
                .ok_or_else(|| StackError::InvalidParameter {
                    name: "attributes",
                    reason: format!("the input schema has no attribute \"{name}\""),
                })?;
            attributes.push(descriptor.clone());
        }
        Ok(Schema {
            name: self.name.clone(),
            geometry_type: self.geometry_type,
            attributes,
        })
    }

    /// Output feature type: this schema plus the merge count and line width columns
    pub fn with_stack_attributes(&self, count_name: &str, width_name: &str) -> Result<Schema> {
        for name in [count_name, width_name] {
            if self.attribute(name).is_some() {
                return Err(StackError::AttributeCollision(name.to_string()));
            }
        }
        if count_name == width_name {
            return Err(StackError::AttributeCollision(width_name.to_string()));
        }
        Ok(self
            .clone()
            .with_attribute(count_name, AttributeType::Int)
            .with_attribute(width_name, AttributeType::Int))
    }
}

/// A line feature: identifier, geometry and attribute values
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Feature {
    pub id: String,
    pub geometry: LineString<f64>,
    pub attributes: BTreeMap<String, Value>,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: LineString<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style helper setting one attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// A usable line needs at least two points
    #[inline]
    pub fn has_valid_geometry(&self) -> bool {
        self.geometry.0.len() >= 2
    }
}

/// Output of the pipeline: features sharing one schema
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FeatureCollection {
    pub schema: Schema,
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            features: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }
}
