// JSON shape-declaration parser
//
// This module implements a parser for JSON shape declarations,
// converting them to built Tabula shapes. Nested shape references are
// resolved through a registry, and every parsed shape is registered so
// later declarations can nest it.

use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::blueprint::field::{DataType, FieldDecl};
use crate::blueprint::shape::{Shape, ShapeRegistry};
use crate::blueprint::value::{ScalarType, Value};
use crate::internal::error::{Error, Result};

/// Parser for JSON shape declarations.
#[derive(Debug, Default)]
pub struct ShapeParser {
    registry: ShapeRegistry,
}

impl ShapeParser {
    /// Creates a new shape parser with an empty registry.
    pub fn new() -> Self {
        Self {
            registry: ShapeRegistry::new(),
        }
    }

    /// Pre-registers a programmatically built shape so declarations can
    /// reference it as a nested type.
    pub fn register(&mut self, shape: Arc<Shape>) {
        self.registry.register(shape);
    }

    /// The registry of every shape this parser has seen.
    pub fn registry(&self) -> &ShapeRegistry {
        &self.registry
    }

    /// Parses a JSON shape declaration, registering and returning the
    /// built shape.
    pub fn parse_shape(&mut self, json: &JsonValue) -> Result<Arc<Shape>> {
        let obj = match json {
            JsonValue::Object(obj) => obj,
            _ => {
                return Err(Error::Definition(
                    "shape declaration must be a JSON object".to_string(),
                ));
            }
        };

        let name = self.get_string_field(obj, "name")?;
        let mut builder = Shape::builder(&name);

        if let Some(JsonValue::Object(metadata)) = obj.get("metadata") {
            for (key, value) in metadata {
                if let JsonValue::String(text) = value {
                    builder = builder.metadata(key, text);
                }
            }
        }

        let fields = match obj.get("fields") {
            Some(JsonValue::Array(fields)) => fields,
            Some(_) => {
                return Err(Error::Definition(format!(
                    "'fields' of shape '{}' must be an array",
                    name
                )));
            }
            None => {
                return Err(Error::Definition(format!(
                    "shape '{}' must declare fields",
                    name
                )));
            }
        };
        for field_json in fields {
            let (field_name, decl) = self.parse_field(&name, field_json)?;
            builder = builder.field(&field_name, decl);
        }

        let shape = builder.build()?;
        self.registry.register(shape.clone());
        Ok(shape)
    }

    /// Parses a JSON shape declaration from its text form.
    pub fn parse_shape_str(&mut self, text: &str) -> Result<Arc<Shape>> {
        let json: JsonValue = serde_json::from_str(text).map_err(|parse_error| {
            Error::Definition(format!("shape declaration is not valid JSON: {}", parse_error))
        })?;
        self.parse_shape(&json)
    }

    fn parse_field(
        &self,
        shape_name: &str,
        json: &JsonValue,
    ) -> Result<(String, FieldDecl)> {
        let obj = match json {
            JsonValue::Object(obj) => obj,
            _ => {
                return Err(Error::Definition(format!(
                    "field declarations of shape '{}' must be JSON objects",
                    shape_name
                )));
            }
        };

        let name = self.get_string_field(obj, "name")?;
        let type_name = self.get_string_field(obj, "type")?;
        let mut decl = FieldDecl::new(self.parse_type(&type_name)?);

        if let Some(JsonValue::String(label)) = obj.get("verbose_name") {
            decl = decl.verbose_name(label);
        }
        if let Some(JsonValue::Bool(required)) = obj.get("required") {
            decl = decl.required(*required);
        }
        if let Some(JsonValue::Bool(multi)) = obj.get("multi") {
            decl = decl.multi(*multi);
        }
        if let Some(default) = obj.get("default") {
            decl = decl.default(Value::from_json(default));
        }

        Ok((name, decl))
    }

    /// Maps a declared type name to a data type, falling back to
    /// registered shapes for nested composition.
    fn parse_type(&self, type_name: &str) -> Result<DataType> {
        let scalar = match type_name {
            "string" | "str" => Some(ScalarType::Str),
            "int" | "integer" => Some(ScalarType::Int),
            "float" | "number" => Some(ScalarType::Float),
            "bool" | "boolean" => Some(ScalarType::Bool),
            _ => None,
        };
        if let Some(scalar) = scalar {
            return Ok(DataType::Scalar(scalar));
        }
        match self.registry.get(type_name) {
            Some(shape) => Ok(DataType::Shape(shape)),
            None => Err(Error::Definition(format!(
                "unknown type '{}' in shape declaration",
                type_name
            ))),
        }
    }

    fn get_string_field(
        &self,
        obj: &serde_json::Map<String, JsonValue>,
        key: &str,
    ) -> Result<String> {
        match obj.get(key) {
            Some(JsonValue::String(text)) => Ok(text.clone()),
            Some(_) => Err(Error::Definition(format!("'{}' must be a string", key))),
            None => Err(Error::Definition(format!(
                "missing required '{}' in declaration",
                key
            ))),
        }
    }
}
