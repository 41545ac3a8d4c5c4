// Shape definitions for the Tabula shape engine
//
// A shape is built once from an ordered set of field declarations plus a
// metadata block, wrapped in an Arc and immutable thereafter. The builder
// binds every declaration, injects the identifier and timestamp fields
// and collects metadata; a registry shares built shapes by name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::blueprint::field::{Field, FieldDecl};
use crate::blueprint::instance::Instance;
use crate::blueprint::value::{ScalarType, Value};
use crate::internal::error::{Error, Result};

/// Field name reserved for the instance identifier.
pub const ID_FIELD: &str = "_id";

/// Field name reserved for the creation timestamp.
pub const TS_FIELD: &str = "_ts";

/// Metadata key holding the identifier format template.
pub const ID_TEMPLATE_KEY: &str = "id_template";

/// Per-shape hook deciding whether an instance takes part in serialization.
pub type SerializeHook = Arc<dyn Fn(&Instance) -> bool + Send + Sync>;

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() as i64)
}

/// A fully built record shape: ordered bound fields plus metadata.
pub struct Shape {
    name: String,
    fields: Vec<Field>,
    index: HashMap<String, usize>,
    metadata: HashMap<String, String>,
    serialize_hook: Option<SerializeHook>,
}

impl Shape {
    /// Starts building a shape with the given name.
    pub fn builder(name: &str) -> ShapeBuilder {
        ShapeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound fields in declaration order, injected fields included.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Looks up a bound field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.index.get(name).map(|position| &self.fields[*position])
    }

    /// The merged shape-level metadata.
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    /// The identifier template, if one is configured.
    pub fn id_template(&self) -> Option<&str> {
        self.metadata.get(ID_TEMPLATE_KEY).map(String::as_str)
    }

    pub(crate) fn serialize_allowed(&self, instance: &Instance) -> bool {
        self.serialize_hook.as_ref().map_or(true, |hook| hook(instance))
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shape")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Builder collecting field declarations and metadata for one shape.
pub struct ShapeBuilder {
    name: String,
    decls: Vec<(String, FieldDecl)>,
    metadata: HashMap<String, String>,
    serialize_hook: Option<SerializeHook>,
}

impl ShapeBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            decls: Vec::new(),
            metadata: HashMap::new(),
            serialize_hook: None,
        }
    }

    /// Declares a field. Declaration order is preserved.
    pub fn field(mut self, name: &str, decl: FieldDecl) -> Self {
        self.decls.push((name.to_string(), decl));
        self
    }

    /// Adds a metadata entry.
    pub fn metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Sets the identifier template used for newly created instances.
    pub fn id_template(self, template: &str) -> Self {
        self.metadata(ID_TEMPLATE_KEY, template)
    }

    /// Installs the hook consulted before serializing an instance.
    pub fn should_serialize<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Instance) -> bool + Send + Sync + 'static,
    {
        self.serialize_hook = Some(Arc::new(hook));
        self
    }

    /// Binds every declaration and produces the shared shape.
    ///
    /// The identifier and timestamp fields are injected ahead of the
    /// declared ones: a string identifier with no default, and an integer
    /// timestamp defaulting to the current unix time.
    pub fn build(self) -> Result<Arc<Shape>> {
        if self.name.is_empty() {
            return Err(Error::Definition("shape name must not be empty".to_string()));
        }

        let id_decl = FieldDecl::scalar(ScalarType::Str).verbose_name("Instance ID");
        let ts_decl = FieldDecl::scalar(ScalarType::Int)
            .verbose_name("Timestamp")
            .default_factory(|| Value::Int(unix_now()));

        let mut bound = Vec::with_capacity(self.decls.len() + 2);
        bound.push((ID_FIELD.to_string(), id_decl));
        bound.push((TS_FIELD.to_string(), ts_decl));
        bound.extend(self.decls);

        let mut fields = Vec::with_capacity(bound.len());
        let mut index = HashMap::with_capacity(bound.len());
        for (name, decl) in bound {
            if name.is_empty() {
                return Err(Error::Definition(format!(
                    "shape '{}' declares a field with an empty name",
                    self.name
                )));
            }
            if index.contains_key(&name) {
                return Err(Error::Definition(format!(
                    "duplicate field '{}' on shape '{}'",
                    name, self.name
                )));
            }
            index.insert(name.clone(), fields.len());
            fields.push(Field::bind(&self.name, &name, decl));
        }

        debug!("shape '{}' built with {} fields", self.name, fields.len());
        Ok(Arc::new(Shape {
            name: self.name,
            fields,
            index,
            metadata: self.metadata,
            serialize_hook: self.serialize_hook,
        }))
    }
}

/// A registry of built shapes, keyed by name. Registering a name again
/// replaces the earlier shape.
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: HashMap<String, Arc<Shape>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        Self {
            shapes: HashMap::new(),
        }
    }

    /// Registers a shape under its own name.
    pub fn register(&mut self, shape: Arc<Shape>) {
        debug!("registered shape '{}'", shape.name());
        self.shapes.insert(shape.name().to_string(), shape);
    }

    /// Gets a shape by name.
    pub fn get(&self, name: &str) -> Option<Arc<Shape>> {
        self.shapes.get(name).cloned()
    }
}
