// Field specifications for the Tabula shape engine
//
// A field starts life as an unbound FieldDecl written by the caller and
// becomes an active Field only when a ShapeBuilder binds it to a shape,
// deriving its fullname and internal storage slot. The bound field owns
// check_and_clean, the single policy point every store routes through.

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::blueprint::coerce;
use crate::blueprint::shape::Shape;
use crate::blueprint::value::{ScalarType, Value};
use crate::internal::error::{Error, Result};

/// The declared type of a field: a castable scalar or a nested shape.
#[derive(Debug, Clone)]
pub enum DataType {
    Scalar(ScalarType),
    Shape(Arc<Shape>),
}

impl DataType {
    /// Returns the type name used in diagnostics.
    pub fn name(&self) -> String {
        match self {
            DataType::Scalar(scalar) => scalar.name().to_string(),
            DataType::Shape(shape) => shape.name().to_string(),
        }
    }
}

/// Per-instance default provider for a field.
#[derive(Clone)]
pub enum DefaultValue {
    /// A literal value, cloned for each instance so a shared container
    /// default is never aliased across instances.
    Literal(Value),
    /// A zero-argument factory invoked for each instance.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces this default's value for one instance.
    pub fn resolve(&self) -> Value {
        match self {
            DefaultValue::Literal(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// An unbound field declaration: type, cardinality, requiredness, default.
#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub verbose_name: Option<String>,
    pub data_type: DataType,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub multi: bool,
}

impl FieldDecl {
    /// Starts a declaration: required, single-valued, no default.
    pub fn new(data_type: DataType) -> Self {
        Self {
            verbose_name: None,
            data_type,
            required: true,
            default: None,
            multi: false,
        }
    }

    /// Declares a scalar-typed field.
    pub fn scalar(scalar: ScalarType) -> Self {
        Self::new(DataType::Scalar(scalar))
    }

    /// Declares a field nesting another shape.
    pub fn shape(shape: &Arc<Shape>) -> Self {
        Self::new(DataType::Shape(shape.clone()))
    }

    /// Sets the human-readable display label.
    pub fn verbose_name(mut self, label: &str) -> Self {
        self.verbose_name = Some(label.to_string());
        self
    }

    /// Sets the required flag.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets a literal default, cloned per instance.
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Literal(value));
        self
    }

    /// Sets a factory default, invoked per instance.
    pub fn default_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Factory(Arc::new(factory)));
        self
    }

    /// Sets the multiplicity: one value vs an ordered list of values.
    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
    }
}

/// A field specification bound to a shape.
///
/// Immutable once bound; carries the derived fullname used in
/// diagnostics and the internal storage slot name.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    fullname: String,
    internal_name: String,
    verbose_name: Option<String>,
    data_type: DataType,
    required: bool,
    default: Option<DefaultValue>,
    multi: bool,
}

impl Field {
    /// Binds a declaration to a shape, deriving names and normalizing the
    /// multi default to an empty list when none was declared.
    pub(crate) fn bind(shape_name: &str, name: &str, decl: FieldDecl) -> Self {
        let FieldDecl {
            verbose_name,
            data_type,
            required,
            default,
            multi,
        } = decl;
        let default = if multi && default.is_none() {
            Some(DefaultValue::Literal(Value::List(Vec::new())))
        } else {
            default
        };
        Self {
            name: name.to_string(),
            fullname: format!("{}.{}", shape_name.to_lowercase(), name),
            internal_name: format!("field__{}", name),
            verbose_name,
            data_type,
            required,
            default,
            multi,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    pub fn internal_name(&self) -> &str {
        &self.internal_name
    }

    pub fn verbose_name(&self) -> Option<&str> {
        self.verbose_name.as_deref()
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    pub fn multi(&self) -> bool {
        self.multi
    }

    /// Validates and normalizes a candidate value for this field.
    ///
    /// Multi fields only accept lists and check every item; single-valued
    /// fields reject lists outright. Nested shape fields never accept an
    /// implicit cast, the value must already be a record of the declared
    /// shape. Touches no instance state.
    pub fn check_and_clean(&self, value: Value) -> Result<Value> {
        let cleaned = if self.multi {
            let items = match value {
                Value::List(items) => items,
                other => {
                    return Err(Error::TypeMismatch(format!(
                        "{} should be a list, got {}",
                        self.fullname,
                        other.type_name()
                    )));
                }
            };
            let mut cleaned_items = Vec::with_capacity(items.len());
            for item in items {
                cleaned_items.push(self.clean_single(item)?);
            }
            Value::List(cleaned_items)
        } else {
            if matches!(value, Value::List(_)) {
                return Err(Error::TypeMismatch(format!(
                    "{} should not be a list",
                    self.fullname
                )));
            }
            self.clean_single(value)?
        };
        debug!("{} type check passed", self.fullname);
        Ok(cleaned)
    }

    fn clean_single(&self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        match &self.data_type {
            DataType::Scalar(scalar) => coerce::cast_scalar(*scalar, value, &self.fullname),
            DataType::Shape(shape) => match value {
                Value::Record(instance) if instance.is_of(shape) => Ok(Value::Record(instance)),
                other => Err(Error::CompositionTypeMismatch(format!(
                    "{} should be an instance of {}, got {}",
                    self.fullname,
                    self.data_type.name(),
                    other.type_name()
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(decl: FieldDecl) -> Field {
        Field::bind("TestShape", "field", decl)
    }

    #[test]
    fn test_bind_derives_names() {
        let field = bound(FieldDecl::scalar(ScalarType::Str));
        assert_eq!(field.name(), "field");
        assert_eq!(field.fullname(), "testshape.field");
        assert_eq!(field.internal_name(), "field__field");
    }

    #[test]
    fn test_multi_without_default_normalizes_to_empty_list() {
        let field = bound(FieldDecl::scalar(ScalarType::Int).multi(true));
        let default = field.default().unwrap().resolve();
        assert_eq!(default, Value::List(Vec::new()));
    }

    #[test]
    fn test_multi_rejects_scalar_value() {
        let field = bound(FieldDecl::scalar(ScalarType::Int).multi(true));
        let result = field.check_and_clean(Value::Int(1));
        assert!(matches!(result, Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_single_rejects_list_value() {
        let field = bound(FieldDecl::scalar(ScalarType::Int));
        let result = field.check_and_clean(Value::list([Value::Int(1)]));
        assert!(matches!(result, Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_multi_casts_each_item() {
        let field = bound(FieldDecl::scalar(ScalarType::Int).multi(true));
        let cleaned = field
            .check_and_clean(Value::list([
                Value::from("100"),
                Value::from(200),
                Value::from(300),
            ]))
            .unwrap();
        assert_eq!(
            cleaned,
            Value::list([Value::Int(100), Value::Int(200), Value::Int(300)])
        );
    }

    #[test]
    fn test_factory_default_resolves_per_call() {
        let field = bound(
            FieldDecl::scalar(ScalarType::Int).default_factory(|| Value::Int(7)),
        );
        assert_eq!(field.default().unwrap().resolve(), Value::Int(7));
    }
}
