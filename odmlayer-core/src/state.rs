//! Persistence state embedded in every live schema instance.
//!
//! Materialization copies the registry's prototype [`DocumentState`] into the schema value. The
//! state binds the value to its collection and [`Model`], carries the population cache and the
//! `found`/`queried` flags, and holds a [`Virtual`] map of computed values.

use bson::Bson;
use std::{
    any::Any,
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use crate::{collection::Collection, model::Model};

/// A resolved related document, type-erased.
pub type Populated = Arc<dyn Any + Send + Sync>;

/// Where a document is in its lifecycle.
///
/// `Unmaterialized -> New -> Persisted -> Populated`. Population is monotonic: a populated
/// field is never dropped from the cache of the same instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// No state attached yet.
    Unmaterialized,
    /// Materialized, not written to the store.
    New,
    /// Written to or loaded from the store.
    Persisted,
    /// At least one relation field resolved.
    Populated,
}

/// Computed values kept next to a document but never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Virtual {
    values: BTreeMap<String, Bson>,
}

impl Virtual {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Bson> {
        self.values.get(name)
    }

    /// Stores a value, returning the previous one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Bson>) -> Option<Bson> {
        self.values.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<Bson> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Bson)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// The persistence-state record.
///
/// The default value is the "zero" state: no collection, no model, empty cache, every flag
/// false. That is what an unregistered schema ends up with after materialization.
#[derive(Clone, Default)]
pub struct DocumentState {
    collection: Option<Collection>,
    model: Option<Model>,
    populated: HashMap<String, Populated>,
    found: bool,
    queried: bool,
    persisted: bool,
    virtuals: Virtual,
}

impl DocumentState {
    /// Builds the prototype state of a registered schema.
    pub(crate) fn prototype(collection: Collection, found: bool, queried: bool) -> Self {
        Self {
            collection: Some(collection),
            found,
            queried,
            ..Self::default()
        }
    }

    pub fn collection(&self) -> Option<&Collection> {
        self.collection.as_ref()
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// `true` when the document was loaded from the store.
    ///
    /// Freshly materialized documents inherit this flag from the prototype, which is `true`
    /// unless the registry is configured otherwise.
    pub fn is_found(&self) -> bool {
        self.found
    }

    pub fn is_queried(&self) -> bool {
        self.queried
    }

    /// `true` once the document has been written to or read from the store.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn virtuals(&self) -> &Virtual {
        &self.virtuals
    }

    pub fn virtuals_mut(&mut self) -> &mut Virtual {
        &mut self.virtuals
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.model.is_none() {
            Lifecycle::Unmaterialized
        } else if !self.populated.is_empty() {
            Lifecycle::Populated
        } else if self.persisted {
            Lifecycle::Persisted
        } else {
            Lifecycle::New
        }
    }

    pub fn is_populated(&self, field: &str) -> bool {
        self.populated.contains_key(field)
    }

    /// Names of the fields resolved so far, sorted.
    pub fn populated_fields(&self) -> Vec<&str> {
        let mut fields = self.populated.keys().map(String::as_str).collect::<Vec<_>>();
        fields.sort_unstable();
        fields
    }

    /// Returns the cached related document for `field` if it holds a `T`.
    pub fn populated<T: Any + Send + Sync>(&self, field: &str) -> Option<Arc<T>> {
        self.populated
            .get(field)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Returns the cached related document for `field` without downcasting.
    pub fn populated_any(&self, field: &str) -> Option<&Populated> {
        self.populated.get(field)
    }

    pub(crate) fn bind(&mut self, model: Model) {
        self.model = Some(model);
        self.virtuals = Virtual::new();
    }

    pub(crate) fn set_found(&mut self, found: bool) {
        self.found = found;
    }

    pub(crate) fn set_queried(&mut self, queried: bool) {
        self.queried = queried;
    }

    pub(crate) fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    /// Inserts a cache entry unless one exists. Returns the entry now cached.
    pub(crate) fn cache(&mut self, field: &str, value: Populated) -> Populated {
        self.populated
            .entry(field.to_string())
            .or_insert(value)
            .clone()
    }
}

impl fmt::Debug for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentState")
            .field("collection", &self.collection.as_ref().map(Collection::name))
            .field("model", &self.model.as_ref().map(Model::schema_name))
            .field("populated", &self.populated_fields())
            .field("found", &self.found)
            .field("queried", &self.queried)
            .field("persisted", &self.persisted)
            .field("virtuals", &self.virtuals)
            .finish()
    }
}

impl PartialEq for DocumentState {
    /// States compare equal when they are bound to the same model and collection and carry the
    /// same flags, cached fields and virtual values.
    fn eq(&self, other: &Self) -> bool {
        self.model.as_ref().map(Model::schema_name) == other.model.as_ref().map(Model::schema_name)
            && self.collection.as_ref().map(Collection::name)
                == other.collection.as_ref().map(Collection::name)
            && self.found == other.found
            && self.queried == other.queried
            && self.persisted == other.persisted
            && self.populated_fields() == other.populated_fields()
            && self.virtuals == other.virtuals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_zero() {
        let state = DocumentState::default();

        assert!(state.collection().is_none());
        assert!(state.model().is_none());
        assert!(!state.is_found());
        assert!(!state.is_queried());
        assert!(!state.is_persisted());
        assert!(state.populated_fields().is_empty());
        assert_eq!(state.lifecycle(), Lifecycle::Unmaterialized);
    }

    #[test]
    fn cache_keeps_the_first_entry() {
        let mut state = DocumentState::default();

        let first = state.cache("author", Arc::new(String::from("ann")));
        let second = state.cache("author", Arc::new(String::from("bob")));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(state.populated::<String>("author").as_deref(), Some(&"ann".to_string()));
        assert!(state.populated::<u32>("author").is_none());
        assert_eq!(state.populated_fields(), vec!["author"]);
    }

    #[test]
    fn virtual_values() {
        let mut virtuals = Virtual::new();

        assert!(virtuals.set("full_name", "Ann Lee").is_none());
        assert_eq!(virtuals.get("full_name"), Some(&Bson::String("Ann Lee".into())));
        assert_eq!(virtuals.len(), 1);
        assert_eq!(virtuals.remove("full_name"), Some(Bson::String("Ann Lee".into())));
        assert!(virtuals.is_empty());
    }
}
