//! The schema registry and document materializer.
//!
//! The registry maps a schema's type name to its collection handle, [`Model`] and prototype
//! [`DocumentState`]. It has an explicit lifecycle:
//!
//! 1. **open**: a [`RegistryBuilder`] accepts registrations through `&mut self`, so the borrow
//!    checker rules out concurrent registration and registration racing with reads;
//! 2. **seal**: [`RegistryBuilder::seal`] freezes the table into a [`Registry`];
//! 3. **serve**: the sealed [`Registry`] is shared through an `Arc` and read without locks.
//!
//! Materialization and population work on `&mut S`, one writer per document instance.

use bson::{Bson, oid::ObjectId};
use std::{any, collections::HashMap, fmt, sync::Arc};

use crate::{
    backend::DynStoreBackend,
    collection::Collection,
    config::OdmConfig,
    error::{OdmError, OdmResult},
    id,
    model::Model,
    schema::{Relation, Schema, SchemaExt, SchemaOptions},
    state::{DocumentState, Populated},
};

/// Builds a cached related document from a stored record, for a schema known only by name.
type Hydrator = fn(&Model, Bson) -> OdmResult<Populated>;

fn hydrate_erased<S: Schema>(model: &Model, raw: Bson) -> OdmResult<Populated> {
    Ok(Arc::new(model.hydrate::<S>(raw)?))
}

/// One registered schema.
#[derive(Clone)]
pub struct RegistryEntry {
    schema_name: &'static str,
    collection: Collection,
    model: Model,
    prototype: DocumentState,
    hydrator: Hydrator,
}

impl RegistryEntry {
    pub fn schema_name(&self) -> &'static str {
        self.schema_name
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn prototype(&self) -> &DocumentState {
        &self.prototype
    }
}

impl fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("schema_name", &self.schema_name)
            .field("collection", &self.collection.name())
            .field("model", &self.model)
            .field("prototype", &self.prototype)
            .finish()
    }
}

/// The registry in its open phase.
#[derive(Debug)]
pub struct RegistryBuilder {
    backend: Arc<dyn DynStoreBackend>,
    config: OdmConfig,
    entries: HashMap<&'static str, RegistryEntry>,
}

impl RegistryBuilder {
    pub fn new(backend: Arc<dyn DynStoreBackend>, config: OdmConfig) -> Self {
        Self {
            backend,
            config,
            entries: HashMap::new(),
        }
    }

    pub fn config(&self) -> &OdmConfig {
        &self.config
    }

    /// Changes the tag key that marks relation fields.
    ///
    /// Only population reads the key, so the change applies to every schema, including those
    /// already registered.
    pub fn set_model_tag(&mut self, key: impl Into<String>) {
        self.config.model_tag = key.into();
    }

    /// Controls whether new documents inherit `found`/`queried` from the prototype.
    ///
    /// Applies to schemas registered after the call.
    pub fn set_inherit_prototype_flags(&mut self, inherit: bool) {
        self.config.inherit_prototype_flags = inherit;
    }

    pub fn is_registered(&self, schema_name: &str) -> bool {
        self.entries.contains_key(schema_name)
    }

    /// Registers schema `S` against a collection and returns its [`Model`].
    ///
    /// `prototype` is inspected once, to check that it serializes to a document carrying
    /// the identity field; it is not retained.
    ///
    /// # Errors
    ///
    /// - [`OdmError::DuplicateSchemaRegistration`] if a schema with the same type name exists
    /// - [`OdmError::InvalidSchemaKind`] if the prototype does not serialize to a document
    /// - [`OdmError::MissingIdentityField`] if the serialized prototype lacks `S::ID_FIELD`
    /// - [`OdmError::Store`] if the collection cannot be created
    pub async fn register<S: Schema>(
        &mut self,
        prototype: S,
        options: impl Into<SchemaOptions>,
    ) -> OdmResult<Model> {
        let options = options.into();
        let schema_name = S::schema_name();

        if self.entries.contains_key(schema_name) {
            return Err(OdmError::DuplicateSchemaRegistration(schema_name.to_string()));
        }

        let document = prototype.to_document()?;
        if !document.contains_key(S::ID_FIELD) {
            return Err(OdmError::MissingIdentityField(
                schema_name.to_string(),
                S::ID_FIELD.to_string(),
            ));
        }

        self.backend.create_collection(&options.collection).await?;

        let collection = Collection::new(&options.collection, self.backend.clone());
        let model = Model::new::<S>(
            collection.clone(),
            options.relations,
            self.config.inherit_prototype_flags,
        );

        self.entries.insert(
            schema_name,
            RegistryEntry {
                schema_name,
                collection,
                prototype: model.prototype(),
                model: model.clone(),
                hydrator: hydrate_erased::<S>,
            },
        );

        log::debug!("registered schema {} on collection {}", schema_name, options.collection);

        Ok(model)
    }

    /// Freezes the registry. No registration is possible afterwards.
    pub fn seal(self) -> Registry {
        for entry in self.entries.values() {
            for relation in entry.model.relations(&self.config.model_tag) {
                if !self.entries.contains_key(relation.target.as_str()) {
                    log::warn!(
                        "relation {}.{} targets unregistered schema {}",
                        entry.schema_name,
                        relation.field,
                        relation.target
                    );
                }
            }
        }

        log::debug!("sealed registry with {} schema(s)", self.entries.len());

        Registry {
            inner: Arc::new(RegistryInner {
                backend: self.backend,
                config: self.config,
                entries: self.entries,
            }),
        }
    }
}

/// The sealed, read-only registry. Cheap to clone and safe to share between tasks.
#[derive(Debug, Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

#[derive(Debug)]
struct RegistryInner {
    backend: Arc<dyn DynStoreBackend>,
    config: OdmConfig,
    entries: HashMap<&'static str, RegistryEntry>,
}

impl Registry {
    pub fn backend(&self) -> &Arc<dyn DynStoreBackend> {
        &self.inner.backend
    }

    pub fn config(&self) -> &OdmConfig {
        &self.inner.config
    }

    pub fn model_tag(&self) -> &str {
        &self.inner.config.model_tag
    }

    pub fn entry(&self, schema_name: &str) -> Option<&RegistryEntry> {
        self.inner.entries.get(schema_name)
    }

    /// Names of all registered schemas, sorted.
    pub fn schema_names(&self) -> Vec<&'static str> {
        let mut names = self.inner.entries.keys().copied().collect::<Vec<_>>();
        names.sort_unstable();
        names
    }

    /// Collection handle of a registered schema. Names are case sensitive.
    pub fn collection(&self, schema_name: &str) -> Option<&Collection> {
        self.entry(schema_name).map(RegistryEntry::collection)
    }

    /// Model of a registered schema. Names are case sensitive.
    pub fn model(&self, schema_name: &str) -> Option<&Model> {
        self.entry(schema_name).map(RegistryEntry::model)
    }

    /// Model of schema `S`.
    ///
    /// # Errors
    ///
    /// [`OdmError::UnregisteredSchema`] if `S` was never registered, or
    /// [`OdmError::SchemaMismatch`] if another type was registered under the same name.
    pub fn model_of<S: Schema>(&self) -> OdmResult<&Model> {
        let model = self
            .model(S::schema_name())
            .ok_or_else(|| OdmError::UnregisteredSchema(S::schema_name().to_string()))?;

        if !model.handles::<S>() {
            return Err(OdmError::SchemaMismatch(
                model.schema_name().to_string(),
                any::type_name::<S>().to_string(),
            ));
        }

        Ok(model)
    }

    /// Turns `doc` into a live document: attaches a copy of the prototype state and a fresh
    /// identifier.
    ///
    /// The identifier is always overwritten, so this must only be called on documents that
    /// were never persisted. If `S` is not registered (or another type holds its name), `doc`
    /// receives the empty default state and still a fresh identifier; the call does not fail.
    pub fn materialize<S: Schema>(&self, doc: &mut S) {
        match self.model_of::<S>().ok() {
            Some(model) => model.materialize_into(doc),
            None => {
                log::warn!("materializing unregistered schema {}", S::schema_name());
                doc.attach_state(DocumentState::default());
                doc.set_id(id::generate());
            }
        }
    }

    /// Resolves the relation field `field` of `doc` into the referenced `T` document.
    ///
    /// The result is cached in `doc`'s state under the field name; later calls for the same
    /// field return the cached value without touching the store. `Ok(None)` means the field
    /// holds no identifier or the referenced document does not exist; nothing is cached then.
    ///
    /// # Errors
    ///
    /// - [`OdmError::UnregisteredSchema`] if `S` or the relation target is not registered
    /// - [`OdmError::UnknownRelation`] if `field` is not a relation of `S`
    /// - [`OdmError::RelationTargetMismatch`] if the relation does not point at `T`
    /// - identifier errors if the field holds something other than an identifier
    /// - [`OdmError::Store`] on store faults
    pub async fn populate<S, T>(&self, doc: &mut S, field: &str) -> OdmResult<Option<Arc<T>>>
    where
        S: Schema,
        T: Schema,
    {
        let relation = self.relation_of::<S>(field)?;

        if relation.target != T::schema_name() {
            return Err(OdmError::RelationTargetMismatch(
                relation.field,
                relation.target,
                T::schema_name().to_string(),
            ));
        }

        // a same-named type would be hydrated as the registered one and never downcast
        if let Some(target) = self.entry(&relation.target) {
            if !target.model.handles::<T>() {
                return Err(OdmError::RelationTargetMismatch(
                    relation.field,
                    relation.target,
                    any::type_name::<T>().to_string(),
                ));
            }
        }

        if let Some(cached) = doc.state().populated::<T>(field) {
            log::debug!("populate {}.{}: cache hit", S::schema_name(), field);
            return Ok(Some(cached));
        }

        let Some(resolved) = self.resolve(&*doc, &relation).await? else {
            return Ok(None);
        };

        Ok(doc.state_mut().cache(field, resolved).downcast::<T>().ok())
    }

    /// Resolves every relation of `doc` that is not cached yet.
    ///
    /// Returns how many fields were newly populated.
    ///
    /// # Errors
    ///
    /// As for [`Registry::populate`]; fields resolved before an error stay cached.
    pub async fn populate_all<S: Schema>(&self, doc: &mut S) -> OdmResult<usize> {
        let model = self.model_of::<S>()?;
        let mut filled = 0;

        for relation in model.relations(self.model_tag()) {
            if doc.state().is_populated(&relation.field) {
                continue;
            }

            if let Some(resolved) = self.resolve(&*doc, &relation).await? {
                doc.state_mut().cache(&relation.field, resolved);
                filled += 1;
            }
        }

        Ok(filled)
    }

    fn relation_of<S: Schema>(&self, field: &str) -> OdmResult<Relation> {
        self.model_of::<S>()?
            .relation(field, self.model_tag())
            .ok_or_else(|| OdmError::UnknownRelation(S::schema_name().to_string(), field.to_string()))
    }

    async fn resolve<S: Schema>(&self, doc: &S, relation: &Relation) -> OdmResult<Option<Populated>> {
        let Some(foreign) = foreign_id(doc, &relation.field)? else {
            log::debug!("populate {}.{}: no identifier", S::schema_name(), relation.field);
            return Ok(None);
        };

        let target = self
            .entry(&relation.target)
            .ok_or_else(|| OdmError::UnregisteredSchema(relation.target.clone()))?;

        log::debug!(
            "populate {}.{}: loading {} {}",
            S::schema_name(),
            relation.field,
            relation.target,
            foreign
        );

        match target.collection.get_one(foreign).await? {
            Some(raw) => Ok(Some((target.hydrator)(&target.model, raw)?)),
            None => Ok(None),
        }
    }
}

/// Reads the identifier stored in `field` of `doc`. Missing, null and all-zero values mean
/// "no relation".
fn foreign_id<S: Schema>(doc: &S, field: &str) -> OdmResult<Option<ObjectId>> {
    let document = doc.to_document()?;

    let id = match document.get(field) {
        None | Some(Bson::Null) => return Ok(None),
        Some(value) => id::normalize(value)?,
    };

    Ok((!id::is_nil(&id)).then_some(id))
}
