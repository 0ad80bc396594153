use std::collections::HashMap;

use thiserror::Error;

/// Errors raised by [`QuantityStore`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("unknown quantity \"{name}\": it was never defined in this store")]
    UnknownQuantity { name: String },

    #[error("duplicate quantity \"{name}\": it is already defined in this store")]
    DuplicateQuantity { name: String },
}

/// A resolved location of a quantity in a [`QuantityStore`].
///
/// Slots are produced once, when a name is defined or resolved, and remain
/// valid for the lifetime of the store. Reading or writing through a slot
/// involves no name lookup, which keeps name-based configuration out of the
/// evaluation loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub(crate) usize);

/// A mutable mapping from quantity name to value.
///
/// The store represents the simulation state at a point in time: every named
/// scalar (parameter, state variable, or derived value) lives in exactly one
/// slot. Names are unique, and iteration follows insertion order, which keeps
/// dependency ordering and snapshots reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantityStore {
    names: Vec<String>,
    values: Vec<f64>,
    index: HashMap<String, usize>,
}

impl QuantityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a new quantity and returns its slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateQuantity`] if the name is already
    /// defined.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Result<Slot, StoreError> {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(StoreError::DuplicateQuantity { name });
        }

        let slot = self.values.len();
        self.index.insert(name.clone(), slot);
        self.names.push(name);
        self.values.push(value);
        Ok(Slot(slot))
    }

    /// Resolves a name to its slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownQuantity`] if the name is not defined.
    pub fn resolve(&self, name: &str) -> Result<Slot, StoreError> {
        self.index
            .get(name)
            .map(|&slot| Slot(slot))
            .ok_or_else(|| StoreError::UnknownQuantity {
                name: name.to_string(),
            })
    }

    /// Returns whether a quantity with this name is defined.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the current value of a named quantity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownQuantity`] if the name is not defined.
    pub fn get(&self, name: &str) -> Result<f64, StoreError> {
        self.resolve(name).map(|slot| self.values[slot.0])
    }

    /// Overwrites the value of a named quantity.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownQuantity`] if the name is not defined.
    pub fn set(&mut self, name: &str, value: f64) -> Result<(), StoreError> {
        let slot = self.resolve(name)?;
        self.values[slot.0] = value;
        Ok(())
    }

    /// Reads the value at a resolved slot.
    #[must_use]
    pub fn read(&self, slot: Slot) -> f64 {
        self.values[slot.0]
    }

    /// Writes the value at a resolved slot.
    pub fn write(&mut self, slot: Slot, value: f64) {
        self.values[slot.0] = value;
    }

    /// Returns the number of defined quantities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates over quantity names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Copies the store contents into an owned name → value map.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, f64> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get_and_set() {
        let mut store = QuantityStore::new();
        store.insert("lai", 2.8).unwrap();
        store.insert("temp", 21.5).unwrap();

        assert_eq!(store.get("lai"), Ok(2.8));
        assert_eq!(store.get("temp"), Ok(21.5));

        store.set("temp", 23.0).unwrap();
        assert_eq!(store.get("temp"), Ok(23.0));
    }

    #[test]
    fn slots_bypass_name_lookup() {
        let mut store = QuantityStore::new();
        let slot = store.insert("rh", 0.7).unwrap();

        assert_eq!(store.read(slot), 0.7);

        store.write(slot, 0.65);
        assert_eq!(store.get("rh"), Ok(0.65));
        assert_eq!(store.resolve("rh"), Ok(slot));
    }

    #[test]
    fn unknown_quantity_is_an_error() {
        let mut store = QuantityStore::new();

        assert_eq!(
            store.get("missing"),
            Err(StoreError::UnknownQuantity {
                name: "missing".to_string()
            })
        );
        assert_eq!(
            store.set("missing", 1.0),
            Err(StoreError::UnknownQuantity {
                name: "missing".to_string()
            })
        );
        assert!(!store.has("missing"));
    }

    #[test]
    fn duplicate_quantity_is_an_error() {
        let mut store = QuantityStore::new();
        store.insert("temp", 20.0).unwrap();

        assert_eq!(
            store.insert("temp", 25.0),
            Err(StoreError::DuplicateQuantity {
                name: "temp".to_string()
            })
        );

        // The original definition is untouched.
        assert_eq!(store.get("temp"), Ok(20.0));
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut store = QuantityStore::new();
        store.insert("c", 3.0).unwrap();
        store.insert("a", 1.0).unwrap();
        store.insert("b", 2.0).unwrap();

        let names: Vec<_> = store.names().collect();
        assert_eq!(names, vec!["c", "a", "b"]);

        let pairs: Vec<_> = store.iter().collect();
        assert_eq!(pairs, vec![("c", 3.0), ("a", 1.0), ("b", 2.0)]);
    }
}
