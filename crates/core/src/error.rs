//! Value object error model.

use thiserror::Error;

/// Result type used for field layout registration.
pub type ValueObjectResult<T> = Result<T, ValueObjectError>;

/// Errors raised while describing or registering a value object's field layout.
///
/// Equality and hashing never fail: a type mismatch or an absent operand is
/// reported as "not equal". Only layout validation produces these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// The same field name was declared twice at one level of the chain.
    #[error("duplicate field `{field}` declared in {type_name}")]
    DuplicateField { type_name: String, field: String },

    /// A sample's layout differs from the one already registered for its type.
    #[error("field layout of {type_name} differs from the registered layout")]
    LayoutMismatch { type_name: String },

    /// The layout cache lock was poisoned by a panicking writer.
    #[error("layout cache lock poisoned")]
    Poisoned,
}

impl ValueObjectError {
    pub fn duplicate_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::DuplicateField {
            type_name: type_name.into(),
            field: field.into(),
        }
    }

    pub fn layout_mismatch(type_name: impl Into<String>) -> Self {
        Self::LayoutMismatch {
            type_name: type_name.into(),
        }
    }
}
