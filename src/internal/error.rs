use thiserror::Error;

/// Unified error type for the Tabula library.
#[derive(Error, Debug)]
pub enum Error {
    /// A single-valued field received a list, or a multi field did not.
    #[error("Type Mismatch: {0}")]
    TypeMismatch(String),

    /// A value could not be converted to the declared scalar type.
    #[error("Cast Failure: {0}")]
    CastFailure(String),

    /// A raw value was assigned to a nested-shape field.
    #[error("Composition Type Mismatch: {0}")]
    CompositionTypeMismatch(String),

    /// A required field resolved to null with no default after construction.
    #[error("Required Field Missing: {0}")]
    RequiredFieldMissing(String),

    /// A new instance needs an identifier but no template is configured.
    #[error("Missing Id Template: {0}")]
    MissingIdTemplate(String),

    /// Structural misuse of the shape-definition surface.
    #[error("Definition Error: {0}")]
    Definition(String),

    /// A field name that is not declared on the shape.
    #[error("Unknown Field: {0}")]
    UnknownField(String),
}

/// A specialized `Result` type for Tabula operations.
pub type Result<T> = std::result::Result<T, Error>;
