//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity** - they are defined entirely
//! by their field values. Two value objects of the same concrete type with the same
//! field values are equal; value objects of different concrete types never are.

use core::any::{Any, type_name};
use core::fmt;
use core::hash::{Hash, Hasher};

use crate::field::{Field, FieldSet};

/// Structural equality and hashing for immutable domain values.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (two entities with same ID are the same entity)
///
/// ## Field set
///
/// A type opts in by describing its comparable state in [`ValueObject::field_set`].
/// Equality walks both field sets pairwise; hashing folds the present fields into
/// a polynomial rolling hash. State left out of the field set is invisible to both.
///
/// Inheritance is expressed by composition: a "derived" value object holds its
/// base and appends the base's field set after its own.
///
/// ## Usage Pattern
///
/// ```ignore
/// #[derive(Debug, Clone)]
/// struct Money {
///     amount: i64,
///     currency: String,
/// }
///
/// value_object!(Money { amount, currency });
///
/// let m1 = Money { amount: 100, currency: "USD".to_string() };
/// let m2 = Money { amount: 100, currency: "USD".to_string() };
/// assert_eq!(m1, m2);
/// assert_eq!(m1.hash_code(), m2.hash_code());
/// ```
pub trait ValueObject: Clone + fmt::Debug + 'static {
    /// Starting value of [`ValueObject::hash_code`].
    const HASH_SEED: i32 = 17;

    /// Multiplier applied to the running hash before adding each field.
    const HASH_MULTIPLIER: i32 = 59;

    /// Own fields first, then inherited ones, in a fixed order.
    fn field_set(&self) -> FieldSet<'_>;

    /// Typed equality. `None` and instances of a different runtime type are never equal.
    fn value_equals(&self, other: Option<&Self>) -> bool {
        let Some(other) = other else {
            return false;
        };
        if self.type_id() != other.type_id() {
            return false;
        }

        let mine = self.field_set();
        let theirs = other.field_set();
        if mine.len() != theirs.len() {
            tracing::trace!(
                value_object = type_name::<Self>(),
                "field sets differ in length"
            );
            return false;
        }

        mine.iter()
            .zip(theirs.iter())
            .all(|(a, b)| fields_equal::<Self>(a, b))
    }

    /// Equality against an arbitrary value; a failed downcast means "not equal".
    fn object_equals(&self, obj: Option<&dyn Any>) -> bool {
        obj.and_then(|obj| obj.downcast_ref::<Self>())
            .is_some_and(|other| self.value_equals(Some(other)))
    }

    /// Rolling hash over present fields: `hash = hash * HASH_MULTIPLIER + field_hash`.
    ///
    /// Absent fields are skipped. A type with no fields hashes to `HASH_SEED`.
    fn hash_code(&self) -> i32 {
        self.field_set()
            .iter()
            .filter_map(Field::value)
            .fold(Self::HASH_SEED, |hash, value| {
                hash.wrapping_mul(Self::HASH_MULTIPLIER)
                    .wrapping_add(value.field_hash())
            })
    }
}

fn fields_equal<T: ValueObject>(a: &Field<'_>, b: &Field<'_>) -> bool {
    if a.name() != b.name() || a.declared_in() != b.declared_in() {
        tracing::trace!(
            value_object = type_name::<T>(),
            left = a.name(),
            right = b.name(),
            "field sets are not aligned"
        );
        return false;
    }

    let equal = match (a.value(), b.value()) {
        (None, None) => true,
        (Some(x), Some(y)) => x.field_eq(y),
        _ => false,
    };
    if !equal {
        tracing::trace!(
            value_object = type_name::<T>(),
            field = a.name(),
            declared_in = a.declared_in(),
            "value objects differ"
        );
    }
    equal
}

/// `==` over possibly-absent operands: both absent is equal, exactly one absent is not.
pub fn values_eq<T: ValueObject>(x: Option<&T>, y: Option<&T>) -> bool {
    match (x, y) {
        (None, None) => true,
        (Some(x), Some(y)) => x.value_equals(Some(y)),
        _ => false,
    }
}

/// `!=` over possibly-absent operands.
pub fn values_ne<T: ValueObject>(x: Option<&T>, y: Option<&T>) -> bool {
    !values_eq(x, y)
}

/// Object-safe view of a [`ValueObject`], for heterogeneous collections.
///
/// Implemented for every value object. `Box<dyn ValueObjectDyn>` is `Eq + Hash`,
/// comparing by concrete type and field values.
pub trait ValueObjectDyn: Any + fmt::Debug {
    /// Object-Equals against any value.
    fn equals_any(&self, other: &dyn Any) -> bool;

    fn dyn_hash_code(&self) -> i32;

    fn as_any_object(&self) -> &dyn Any;

    fn value_type_name(&self) -> &'static str;
}

impl<T: ValueObject> ValueObjectDyn for T {
    fn equals_any(&self, other: &dyn Any) -> bool {
        self.object_equals(Some(other))
    }

    fn dyn_hash_code(&self) -> i32 {
        self.hash_code()
    }

    fn as_any_object(&self) -> &dyn Any {
        self
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Object-Equals between two type-erased value objects.
pub fn object_equals_dyn(a: &dyn ValueObjectDyn, b: &dyn ValueObjectDyn) -> bool {
    a.equals_any(b.as_any_object())
}

impl PartialEq for dyn ValueObjectDyn {
    fn eq(&self, other: &Self) -> bool {
        object_equals_dyn(self, other)
    }
}

impl Eq for dyn ValueObjectDyn {}

impl Hash for dyn ValueObjectDyn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.dyn_hash_code());
    }
}

/// Implement [`ValueObject`], [`FieldValue`](crate::FieldValue), `PartialEq`, `Eq`
/// and `Hash` for a struct from the list of its own fields.
///
/// A base value object held in a field is named after `extends`; its fields are
/// appended after the struct's own.
///
/// ```ignore
/// value_object!(Money { amount, currency });
/// value_object!(DiscountedMoney { rate } extends money);
/// value_object!(Unit {});
/// ```
#[macro_export]
macro_rules! value_object {
    (@equality $ty:ident) => {
        impl $crate::FieldValue for $ty {
            fn field_eq(&self, other: &dyn $crate::FieldValue) -> bool {
                $crate::FieldValue::as_any(other)
                    .downcast_ref::<Self>()
                    .is_some_and(|other| $crate::ValueObject::value_equals(self, Some(other)))
            }

            fn field_hash(&self) -> i32 {
                $crate::ValueObject::hash_code(self)
            }

            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }
        }

        impl ::core::cmp::PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::ValueObject::value_equals(self, Some(other))
            }
        }

        impl ::core::cmp::Eq for $ty {}

        impl ::core::hash::Hash for $ty {
            fn hash<H: ::core::hash::Hasher>(&self, state: &mut H) {
                state.write_i32($crate::ValueObject::hash_code(self));
            }
        }
    };
    ($ty:ident { $($field:ident),* $(,)? } extends $base:ident) => {
        impl $crate::ValueObject for $ty {
            fn field_set(&self) -> $crate::FieldSet<'_> {
                $crate::FieldSet::of::<Self>()
                    $(.field(stringify!($field), &self.$field))*
                    .inherit($crate::ValueObject::field_set(&self.$base))
            }
        }

        $crate::value_object!(@equality $ty);
    };
    ($ty:ident { $($field:ident),* $(,)? }) => {
        impl $crate::ValueObject for $ty {
            fn field_set(&self) -> $crate::FieldSet<'_> {
                $crate::FieldSet::of::<Self>()
                    $(.field(stringify!($field), &self.$field))*
            }
        }

        $crate::value_object!(@equality $ty);
    };
}
