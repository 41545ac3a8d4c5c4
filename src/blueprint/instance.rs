// Instances of record shapes
//
// Construction resolves every field in declaration order from supplied
// data or defaults, recursively building nested records and wiring their
// parent back-references, then generates the identifier for new
// instances and runs the required-field check. All reads and writes go
// through the uniform get/set accessor pair, which always routes stores
// through the field's coercion path.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::blueprint::field::{DataType, DefaultValue, Field};
use crate::blueprint::shape::{Shape, ID_FIELD};
use crate::blueprint::value::Value;
use crate::internal::error::{Error, Result};

struct InstanceData {
    shape: Arc<Shape>,
    /// Resolved values keyed by the field's internal slot name.
    storage: HashMap<String, Value>,
    /// Non-owning back-reference to the record this one is nested in.
    parent: Option<Weak<RefCell<InstanceData>>>,
    is_new: bool,
}

/// A realized record of a shape.
///
/// Cloning an `Instance` clones the handle, not the record; equality is
/// handle identity. Instances are single-threaded values and carry no
/// internal synchronization.
#[derive(Clone)]
pub struct Instance {
    data: Rc<RefCell<InstanceData>>,
}

impl Instance {
    /// Constructs an instance of `shape` from raw keyed data.
    ///
    /// `init` must be a map using field names as keys; values are
    /// primitive-compatible scalars, nested raw maps for shape-typed
    /// fields, or lists thereof. Undeclared keys are ignored. Any
    /// failure aborts construction entirely.
    pub fn create(shape: &Arc<Shape>, init: Value) -> Result<Self> {
        let entries = match init {
            Value::Map(entries) => entries,
            other => {
                return Err(Error::Definition(format!(
                    "init data for shape '{}' must be a map, got {}",
                    shape.name(),
                    other.type_name()
                )));
            }
        };
        let mut supplied: HashMap<String, Value> = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            supplied.insert(key, value);
        }

        let is_new = !supplied.contains_key(ID_FIELD);
        let instance = Self {
            data: Rc::new(RefCell::new(InstanceData {
                shape: shape.clone(),
                storage: HashMap::new(),
                parent: None,
                is_new,
            })),
        };
        instance.initialize(&mut supplied)?;
        Ok(instance)
    }

    /// Constructs an instance with no supplied data, from defaults alone.
    pub fn create_empty(shape: &Arc<Shape>) -> Result<Self> {
        Self::create(shape, Value::empty_map())
    }

    /// Constructs an instance from a decoded JSON object.
    pub fn create_from_json(shape: &Arc<Shape>, json: &serde_json::Value) -> Result<Self> {
        Self::create(shape, Value::from_json(json))
    }

    fn initialize(&self, supplied: &mut HashMap<String, Value>) -> Result<()> {
        let shape = self.shape();
        for field in shape.fields() {
            match supplied.remove(field.name()) {
                Some(raw) => {
                    let resolved = self.resolve_supplied(field, raw)?;
                    self.store(field, resolved)?;
                }
                None => {
                    let resolved = field.default().map_or(Value::Null, DefaultValue::resolve);
                    self.store(field, resolved)?;
                }
            }
        }

        if self.is_new() {
            self.generate_id(&shape)?;
        }

        // runs only after defaults and generation, so a required field
        // satisfied by either is not flagged
        for field in shape.fields() {
            let value = self.resolved_value(field);
            if value.is_null() && field.required() && field.default().is_none() {
                return Err(Error::RequiredFieldMissing(format!(
                    "{} is required but no value provided and no default value set",
                    field.fullname()
                )));
            }
        }
        Ok(())
    }

    /// Prepares one supplied raw value: nested shape fields construct
    /// their records recursively and adopt them; everything else passes
    /// through to the coercion path untouched.
    fn resolve_supplied(&self, field: &Field, raw: Value) -> Result<Value> {
        let nested = match field.data_type() {
            DataType::Shape(nested) => nested.clone(),
            DataType::Scalar(_) => return Ok(raw),
        };
        if field.multi() {
            let items = match raw {
                Value::List(items) => items,
                other => {
                    return Err(Error::TypeMismatch(format!(
                        "{} should be a list, got {}",
                        field.fullname(),
                        other.type_name()
                    )));
                }
            };
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(self.resolve_nested(&nested, item)?);
            }
            Ok(Value::List(resolved))
        } else {
            if matches!(raw, Value::List(_)) {
                return Err(Error::TypeMismatch(format!(
                    "{} should not be a list",
                    field.fullname()
                )));
            }
            self.resolve_nested(&nested, raw)
        }
    }

    fn resolve_nested(&self, nested: &Arc<Shape>, raw: Value) -> Result<Value> {
        match raw {
            Value::Map(_) => {
                let child = Instance::create(nested, raw)?;
                child.set_parent(self);
                Ok(Value::Record(child))
            }
            Value::Record(child) => {
                child.set_parent(self);
                Ok(Value::Record(child))
            }
            // anything else is left for the coercion path to reject
            other => Ok(other),
        }
    }

    fn set_parent(&self, parent: &Instance) {
        self.data.borrow_mut().parent = Some(Rc::downgrade(&parent.data));
    }

    fn generate_id(&self, shape: &Arc<Shape>) -> Result<()> {
        let id_field = shape.field(ID_FIELD).ok_or_else(|| {
            Error::Definition(format!("shape '{}' lacks an identifier field", shape.name()))
        })?;
        if !self.resolved_value(id_field).is_null() {
            return Err(Error::Definition(format!(
                "new instance of '{}' already carries an identifier",
                shape.name()
            )));
        }
        let template = shape.id_template().ok_or_else(|| {
            Error::MissingIdTemplate(format!(
                "cannot generate id for new instance of '{}' because id_template is not set in metadata",
                shape.name()
            ))
        })?;
        let rendered = self.render_id_template(template, shape)?;
        self.store(id_field, Value::Str(rendered))
    }

    /// Renders the identifier template, substituting `{field}`
    /// placeholders with the instance's resolved field values. `{{` and
    /// `}}` escape literal braces.
    fn render_id_template(&self, template: &str, shape: &Arc<Shape>) -> Result<String> {
        let mut rendered = String::with_capacity(template.len());
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' => {
                    if chars.peek() == Some(&'{') {
                        chars.next();
                        rendered.push('{');
                        continue;
                    }
                    let mut name = String::new();
                    let mut closed = false;
                    for inner in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(Error::Definition(format!(
                            "unclosed placeholder in id_template '{}'",
                            template
                        )));
                    }
                    let field = shape.field(&name).ok_or_else(|| {
                        Error::Definition(format!(
                            "id_template of shape '{}' references unknown field '{}'",
                            shape.name(),
                            name
                        ))
                    })?;
                    rendered.push_str(&template_display(&self.resolved_value(field)));
                }
                '}' => {
                    if chars.peek() == Some(&'}') {
                        chars.next();
                    }
                    rendered.push('}');
                }
                other => rendered.push(other),
            }
        }
        Ok(rendered)
    }

    fn store(&self, field: &Field, value: Value) -> Result<()> {
        let cleaned = field.check_and_clean(value)?;
        self.data
            .borrow_mut()
            .storage
            .insert(field.internal_name().to_string(), cleaned);
        Ok(())
    }

    /// Resolves a field's current value without caching a computed
    /// default. A stored null still falls back to the default, so a
    /// field explicitly cleared keeps presenting its default.
    pub(crate) fn resolved_value(&self, field: &Field) -> Value {
        let stored = self
            .data
            .borrow()
            .storage
            .get(field.internal_name())
            .cloned();
        match stored {
            Some(value) if !value.is_null() => value,
            _ => field.default().map_or(Value::Null, DefaultValue::resolve),
        }
    }

    /// Reads a field's currently resolved value.
    ///
    /// A default computed for a never-stored field is cached, so
    /// repeated reads observe one value.
    pub fn get(&self, name: &str) -> Result<Value> {
        let shape = self.shape();
        let field = shape.field(name).ok_or_else(|| {
            Error::UnknownField(format!("{} has no field '{}'", shape.name(), name))
        })?;
        let value = self.resolved_value(field);
        let mut data = self.data.borrow_mut();
        if !data.storage.contains_key(field.internal_name()) {
            data.storage
                .insert(field.internal_name().to_string(), value.clone());
        }
        Ok(value)
    }

    /// Writes a field, always re-running the coercion path.
    ///
    /// On error the previously stored value is untouched.
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        let shape = self.shape();
        let field = shape.field(name).ok_or_else(|| {
            Error::UnknownField(format!("{} has no field '{}'", shape.name(), name))
        })?;
        self.store(field, value)
    }

    /// The shape this instance realizes.
    pub fn shape(&self) -> Arc<Shape> {
        self.data.borrow().shape.clone()
    }

    /// True when the instance was constructed without a supplied
    /// identifier.
    pub fn is_new(&self) -> bool {
        self.data.borrow().is_new
    }

    /// The record this one is nested in, if it is still alive.
    pub fn parent(&self) -> Option<Instance> {
        self.data
            .borrow()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|data| Instance { data })
    }

    pub(crate) fn is_of(&self, shape: &Arc<Shape>) -> bool {
        Arc::ptr_eq(&self.data.borrow().shape, shape)
    }
}

/// How a resolved value renders inside an identifier template.
fn template_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        other => other.type_name().to_string(),
    }
}

impl PartialEq for Instance {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance<{}>", self.data.borrow().shape.name())
    }
}
