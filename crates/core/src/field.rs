//! Field model: type-erased field values and the ordered field set of an instance.
//!
//! A value object exposes its comparable state as a [`FieldSet`]: an ordered
//! sequence of named [`Field`]s borrowed from the instance. Each field value is
//! a `&dyn FieldValue`, which knows how to compare itself against another
//! field value and how to produce its own hash code.

use core::any::{Any, type_name};
use core::fmt;
use core::hash::{Hash, Hasher};
use std::collections::hash_map::DefaultHasher;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Seed used when folding sequences (`Vec<T>`, arrays) into one hash code.
const SEQUENCE_SEED: i32 = 17;
/// Multiplier used when folding sequences into one hash code.
const SEQUENCE_MULTIPLIER: i32 = 59;

/// A comparable, hashable field value with its type erased.
///
/// Implementations must keep `field_eq` and `field_hash` consistent: values
/// that compare equal must hash equal.
pub trait FieldValue: Any + fmt::Debug {
    /// The field's own equality. A value of a different concrete type is never equal.
    fn field_eq(&self, other: &dyn FieldValue) -> bool;

    /// The field's own hash code.
    fn field_hash(&self) -> i32;

    fn as_any(&self) -> &dyn Any;

    /// Returns the value to compare, or `None` when the field is absent.
    ///
    /// Only `Option` ever reports absence.
    fn as_present(&self) -> Option<&dyn FieldValue>
    where
        Self: Sized,
    {
        Some(self)
    }
}

/// Hash code of any `Hash` value, folded to 32 bits.
///
/// Stable within one build; not stable across toolchain versions.
pub fn std_hash<T: Hash + ?Sized>(value: &T) -> i32 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    let bits = hasher.finish();
    (bits ^ (bits >> 32)) as i32
}

fn sequence_hash<'a, I>(items: I) -> i32
where
    I: IntoIterator<Item = &'a dyn FieldValue>,
{
    items.into_iter().fold(SEQUENCE_SEED, |hash, item| {
        hash.wrapping_mul(SEQUENCE_MULTIPLIER)
            .wrapping_add(item.field_hash())
    })
}

fn downcast<'a, T: Any>(other: &'a dyn FieldValue) -> Option<&'a T> {
    other.as_any().downcast_ref::<T>()
}

macro_rules! impl_hashed_field_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl FieldValue for $t {
                fn field_eq(&self, other: &dyn FieldValue) -> bool {
                    downcast::<$t>(other).is_some_and(|other| self == other)
                }

                fn field_hash(&self) -> i32 {
                    std_hash(self)
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

impl_hashed_field_value!(
    i8, i16, i32, i64, i128, isize,
    u8, u16, u32, u64, u128, usize,
    bool, char, (),
    String, &'static str,
    Uuid, DateTime<Utc>, NaiveDate,
);

// NaN equals NaN and -0.0 equals 0.0 so that equality stays reflexive and
// consistent with the hash.
macro_rules! impl_float_field_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl FieldValue for $t {
                fn field_eq(&self, other: &dyn FieldValue) -> bool {
                    downcast::<$t>(other)
                        .is_some_and(|other| self == other || (self.is_nan() && other.is_nan()))
                }

                fn field_hash(&self) -> i32 {
                    let canonical = if self.is_nan() {
                        <$t>::NAN
                    } else if *self == 0.0 {
                        0.0
                    } else {
                        *self
                    };
                    std_hash(&canonical.to_bits())
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

impl_float_field_value!(f32, f64);

impl<T: FieldValue> FieldValue for Option<T> {
    fn field_eq(&self, other: &dyn FieldValue) -> bool {
        match (self, downcast::<Option<T>>(other)) {
            (None, Some(None)) => true,
            (Some(mine), Some(Some(theirs))) => mine.field_eq(theirs),
            _ => false,
        }
    }

    fn field_hash(&self) -> i32 {
        self.as_ref().map_or(0, FieldValue::field_hash)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_present(&self) -> Option<&dyn FieldValue> {
        self.as_ref().and_then(FieldValue::as_present)
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn field_eq(&self, other: &dyn FieldValue) -> bool {
        downcast::<Vec<T>>(other).is_some_and(|other| {
            self.len() == other.len()
                && self
                    .iter()
                    .zip(other)
                    .all(|(mine, theirs)| mine.field_eq(theirs))
        })
    }

    fn field_hash(&self) -> i32 {
        sequence_hash(self.iter().map(|item| item as &dyn FieldValue))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: FieldValue, const N: usize> FieldValue for [T; N] {
    fn field_eq(&self, other: &dyn FieldValue) -> bool {
        downcast::<[T; N]>(other).is_some_and(|other| {
            self.iter()
                .zip(other)
                .all(|(mine, theirs)| mine.field_eq(theirs))
        })
    }

    fn field_hash(&self) -> i32 {
        sequence_hash(self.iter().map(|item| item as &dyn FieldValue))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// One named entry of a [`FieldSet`].
#[derive(Clone, Copy)]
pub struct Field<'a> {
    name: &'static str,
    declared_in: &'static str,
    value: Option<&'a dyn FieldValue>,
}

impl<'a> Field<'a> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name of the level in the chain that declared this field.
    pub fn declared_in(&self) -> &'static str {
        self.declared_in
    }

    /// The field's value, or `None` when absent.
    pub fn value(&self) -> Option<&'a dyn FieldValue> {
        self.value
    }

    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }
}

impl fmt::Debug for Field<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("declared_in", &self.declared_in)
            .field("value", &self.value)
            .finish()
    }
}

/// Ordered field set of one value object instance.
///
/// Built most-derived level first: a level adds its own fields with
/// [`FieldSet::field`] and then appends its base's set with
/// [`FieldSet::inherit`]. The same order is used by equality and hashing.
///
/// ```ignore
/// fn field_set(&self) -> FieldSet<'_> {
///     FieldSet::of::<Self>()
///         .field("rate", &self.rate)
///         .inherit(self.money.field_set())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FieldSet<'a> {
    level: &'static str,
    fields: Vec<Field<'a>>,
}

impl<'a> FieldSet<'a> {
    /// Open the level declared by `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self {
            level: type_name::<T>(),
            fields: Vec::new(),
        }
    }

    /// Add one of this level's own fields.
    pub fn field<V: FieldValue>(mut self, name: &'static str, value: &'a V) -> Self {
        self.fields.push(Field {
            name,
            declared_in: self.level,
            value: value.as_present(),
        });
        self
    }

    /// Append the base level's fields after this level's own.
    pub fn inherit(mut self, base: FieldSet<'a>) -> Self {
        self.fields.extend(base.fields);
        self
    }

    /// Type name of the most-derived level.
    pub fn level(&self) -> &'static str {
        self.level
    }

    pub fn iter(&self) -> core::slice::Iter<'_, Field<'a>> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for FieldSet<'a> {
    type Item = Field<'a>;
    type IntoIter = std::vec::IntoIter<Field<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'s, 'a> IntoIterator for &'s FieldSet<'a> {
    type Item = &'s Field<'a>;
    type IntoIter = core::slice::Iter<'s, Field<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
