//! Field layouts and the per-type layout cache.
//!
//! A [`FieldLayout`] is the owned shape of a type's field set (names and
//! declaring levels, no values). It is identical for every instance of a type,
//! so it can be computed once and registered per `TypeId` for diagnostics.

use core::any::{TypeId, type_name};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::{ValueObjectError, ValueObjectResult};
use crate::value_object::ValueObject;

/// One field of a [`FieldLayout`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub declared_in: String,
}

/// Shape of a value object's field set, in enumeration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLayout {
    type_name: String,
    fields: Vec<FieldDescriptor>,
}

impl FieldLayout {
    /// Describe the field set of `value`'s type.
    pub fn of<T: ValueObject>(value: &T) -> Self {
        let fields = value
            .field_set()
            .iter()
            .map(|field| FieldDescriptor {
                name: field.name().to_string(),
                declared_in: field.declared_in().to_string(),
            })
            .collect();

        Self {
            type_name: type_name::<T>().to_string(),
            fields,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Declaring levels, most-derived first, without repeats.
    pub fn levels(&self) -> Vec<&str> {
        let mut levels: Vec<&str> = Vec::new();
        for field in &self.fields {
            if levels.last() != Some(&field.declared_in.as_str()) {
                levels.push(&field.declared_in);
            }
        }
        levels
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reject a field name declared twice at the same level.
    pub fn validate(&self) -> ValueObjectResult<()> {
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert((field.declared_in.as_str(), field.name.as_str())) {
                return Err(ValueObjectError::duplicate_field(
                    field.declared_in.clone(),
                    field.name.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Write-once registry of validated layouts, keyed by concrete type.
///
/// A diagnostics aid: equality and hashing build their field sets directly and
/// never read this registry. Each type's layout is inserted at most once; every
/// later registration, concurrent or not, is compared against that first layout.
#[derive(Debug, Default)]
pub struct LayoutCache {
    layouts: RwLock<HashMap<TypeId, Arc<FieldLayout>>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static LayoutCache {
        static GLOBAL: OnceLock<LayoutCache> = OnceLock::new();
        GLOBAL.get_or_init(LayoutCache::new)
    }

    /// Validate and register the layout of `T`, using `sample` to enumerate it.
    ///
    /// Registering an already-known type returns the registered layout, provided
    /// the sample's layout still matches it.
    pub fn register<T: ValueObject>(&self, sample: &T) -> ValueObjectResult<Arc<FieldLayout>> {
        let layout = FieldLayout::of(sample);

        if let Some(existing) = self.get::<T>()? {
            return Self::matching(existing, &layout);
        }

        if let Err(err) = layout.validate() {
            tracing::warn!(value_object = layout.type_name(), error = %err, "invalid field layout");
            return Err(err);
        }

        let mut layouts = self
            .layouts
            .write()
            .map_err(|_| ValueObjectError::Poisoned)?;

        match layouts.entry(TypeId::of::<T>()) {
            // Another registration won the race for the write lock.
            Entry::Occupied(entry) => Self::matching(Arc::clone(entry.get()), &layout),
            Entry::Vacant(entry) => {
                tracing::debug!(
                    value_object = layout.type_name(),
                    fields = layout.len(),
                    "registered value object layout"
                );
                Ok(Arc::clone(entry.insert(Arc::new(layout))))
            }
        }
    }

    fn matching(
        existing: Arc<FieldLayout>,
        layout: &FieldLayout,
    ) -> ValueObjectResult<Arc<FieldLayout>> {
        if *existing != *layout {
            tracing::warn!(
                value_object = layout.type_name(),
                "field layout differs from the registered layout"
            );
            return Err(ValueObjectError::layout_mismatch(layout.type_name()));
        }
        Ok(existing)
    }

    pub fn get<T: ValueObject>(&self) -> ValueObjectResult<Option<Arc<FieldLayout>>> {
        let layouts = self
            .layouts
            .read()
            .map_err(|_| ValueObjectError::Poisoned)?;

        Ok(layouts.get(&TypeId::of::<T>()).cloned())
    }

    pub fn len(&self) -> ValueObjectResult<usize> {
        let layouts = self
            .layouts
            .read()
            .map_err(|_| ValueObjectError::Poisoned)?;

        Ok(layouts.len())
    }

    pub fn is_empty(&self) -> ValueObjectResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldSet;

    #[derive(Debug, Clone)]
    struct Address {
        street: String,
        city: String,
    }

    crate::value_object!(Address { street, city });

    #[derive(Debug, Clone)]
    struct PostalAddress {
        address: Address,
        postcode: String,
    }

    crate::value_object!(PostalAddress { postcode } extends address);

    #[derive(Debug, Clone)]
    struct Broken {
        left: u8,
        right: u8,
    }

    impl ValueObject for Broken {
        fn field_set(&self) -> FieldSet<'_> {
            FieldSet::of::<Self>()
                .field("side", &self.left)
                .field("side", &self.right)
        }
    }

    fn address() -> Address {
        Address {
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
        }
    }

    #[test]
    fn layout_lists_fields_most_derived_first() {
        let postal = PostalAddress {
            address: address(),
            postcode: "12345".to_string(),
        };
        let layout = FieldLayout::of(&postal);

        let names: Vec<_> = layout.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["postcode", "street", "city"]);
        assert_eq!(
            layout.levels(),
            [type_name::<PostalAddress>(), type_name::<Address>()]
        );
        assert_eq!(layout.type_name(), type_name::<PostalAddress>());
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn duplicate_field_is_rejected() {
        let layout = FieldLayout::of(&Broken { left: 1, right: 2 });
        assert_eq!(
            layout.validate(),
            Err(ValueObjectError::duplicate_field(type_name::<Broken>(), "side"))
        );

        let cache = LayoutCache::new();
        assert!(cache.register(&Broken { left: 1, right: 2 }).is_err());
        assert_eq!(cache.is_empty(), Ok(true));
    }

    #[test]
    fn register_is_write_once() {
        let cache = LayoutCache::new();
        let first = cache.register(&address()).unwrap();
        let second = cache
            .register(&Address {
                street: "2 Side St".to_string(),
                city: "Shelbyville".to_string(),
            })
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), Ok(1));
        assert_eq!(cache.get::<Address>().unwrap(), Some(first));
        assert_eq!(cache.get::<PostalAddress>().unwrap(), None);
    }

    #[test]
    fn layout_serializes_for_diagnostics() {
        let layout = FieldLayout::of(&address());
        let json = serde_json::to_value(&layout).unwrap();
        assert_eq!(json["fields"][0]["name"], "street");
        let back: FieldLayout = serde_json::from_value(json).unwrap();
        assert_eq!(back, layout);
    }

    /// Field set depends on state, so two samples can disagree on layout.
    #[derive(Debug, Clone)]
    struct Shifting {
        extended: bool,
        base: u8,
        extra: u8,
    }

    impl ValueObject for Shifting {
        fn field_set(&self) -> FieldSet<'_> {
            let set = FieldSet::of::<Self>().field("base", &self.base);
            if self.extended {
                set.field("extra", &self.extra)
            } else {
                set
            }
        }
    }

    #[test]
    fn differing_sample_is_rejected_after_registration() {
        let cache = LayoutCache::new();
        let short = Shifting {
            extended: false,
            base: 1,
            extra: 0,
        };
        let long = Shifting {
            extended: true,
            ..short.clone()
        };

        let registered = cache.register(&short).unwrap();
        assert_eq!(
            cache.register(&long),
            Err(ValueObjectError::layout_mismatch(type_name::<Shifting>()))
        );
        assert_eq!(cache.get::<Shifting>().unwrap(), Some(registered));
    }

    #[test]
    fn concurrent_registrations_share_the_first_layout() {
        let cache = LayoutCache::new();
        let barrier = std::sync::Barrier::new(8);
        let (cache, barrier) = (&cache, &barrier);

        let layouts: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        barrier.wait();
                        cache.register(&address())
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap().unwrap())
                .collect()
        });

        assert!(layouts.iter().all(|layout| Arc::ptr_eq(layout, &layouts[0])));
        assert_eq!(cache.len(), Ok(1));
    }

    #[test]
    fn poisoned_lock_is_reported_by_every_accessor() {
        let cache = LayoutCache::new();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = cache.layouts.write().unwrap();
            panic!("writer panicked");
        }));

        assert_eq!(cache.len(), Err(ValueObjectError::Poisoned));
        assert_eq!(cache.is_empty(), Err(ValueObjectError::Poisoned));
        assert_eq!(cache.get::<Address>(), Err(ValueObjectError::Poisoned));
        assert_eq!(cache.register(&address()), Err(ValueObjectError::Poisoned));
    }
}
