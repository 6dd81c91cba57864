//! `valueobj-core` — structural equality and hashing for value objects.
//!
//! A value object describes its comparable state as an ordered [`FieldSet`];
//! the [`ValueObject`] trait derives equality, object equality and a rolling
//! hash code from it. The [`value_object!`] macro wires a struct into
//! `PartialEq`, `Eq` and `Hash` so it works with `==` and hash-based containers.
//!
//! This crate contains **pure** logic (no IO, no global mutable state apart from
//! the optional write-once [`LayoutCache`]).

pub mod error;
pub mod field;
pub mod layout;
pub mod value_object;

pub use error::{ValueObjectError, ValueObjectResult};
pub use field::{Field, FieldSet, FieldValue, std_hash};
pub use layout::{FieldDescriptor, FieldLayout, LayoutCache};
pub use value_object::{ValueObject, ValueObjectDyn, object_equals_dyn, values_eq, values_ne};
