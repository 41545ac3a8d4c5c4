// Blueprint module for the Tabula shape engine
//
// This module provides declarative record shapes: typed field
// specifications with cardinality, requiredness and defaults, built into
// shapes whose instances support construction from raw keyed data,
// coercion on every store, nested composition, identifier generation and
// selective serialization. It includes:
//
// 1. The dynamic value lattice shared by all of the above
// 2. A per-scalar-type coercion registry
// 3. Field specifications and default providers
// 4. The shape builder and shape registry
// 5. Instances with uniform get/set accessors
// 6. A JSON shape-declaration parser

// Re-export public types and functions
pub use self::field::{DataType, DefaultValue, Field, FieldDecl};
pub use self::instance::Instance;
pub use self::parser::ShapeParser;
pub use self::shape::{
    Shape, ShapeBuilder, ShapeRegistry, ID_FIELD, ID_TEMPLATE_KEY, TS_FIELD,
};
pub use self::value::{ScalarType, Value};

// Sub-modules
pub mod coerce;
pub mod field;
pub mod instance;
pub mod parser;
pub mod serialize;
pub mod shape;
pub mod value;
