//! Per-schema models.
//!
//! A [`Model`] is created once per registered schema and shared by every document of that
//! schema. It is bound to one [`Collection`] and performs schema-scoped operations in terms of
//! canonical identifiers: create, find, save, delete.
//!
//! ```ignore
//! let users = odm.model_of::<User>()?;
//!
//! let mut ann = User::new("Ann");
//! users.create(&mut ann)?;
//! users.save(&mut ann).await?;
//!
//! let loaded: Option<User> = users.find_by_id(&ann.id.to_hex()).await?;
//! ```

use bson::{Bson, oid::ObjectId};
use std::{
    any::{self, TypeId},
    fmt,
    sync::Arc,
};

use crate::{
    collection::Collection,
    error::{OdmError, OdmResult},
    id::{self, ToObjectId},
    query::{Filter, Query},
    schema::{FieldTag, Relation, Schema, SchemaExt},
    state::DocumentState,
};

/// Shared descriptor of one registered schema.
///
/// Cloning is cheap; clones compare equal and refer to the same model.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

#[derive(Debug)]
struct ModelInner {
    schema_type: TypeId,
    schema_name: &'static str,
    id_field: &'static str,
    collection: Collection,
    relations: Vec<Relation>,
    field_tags: &'static [FieldTag],
    inherit_prototype_flags: bool,
}

impl Model {
    pub(crate) fn new<S: Schema>(
        collection: Collection,
        relations: Vec<Relation>,
        inherit_prototype_flags: bool,
    ) -> Self {
        Self {
            inner: Arc::new(ModelInner {
                schema_type: TypeId::of::<S>(),
                schema_name: S::schema_name(),
                id_field: S::ID_FIELD,
                collection,
                relations,
                field_tags: S::field_tags(),
                inherit_prototype_flags,
            }),
        }
    }

    pub fn schema_name(&self) -> &'static str {
        self.inner.schema_name
    }

    /// Returns `true` if `S` is the Rust type this model was registered for.
    ///
    /// Two types sharing a schema name are still different schemas.
    pub fn handles<S: Schema>(&self) -> bool {
        self.inner.schema_type == TypeId::of::<S>()
    }

    /// Serialized name of the identity field.
    pub fn id_field(&self) -> &'static str {
        self.inner.id_field
    }

    pub fn collection(&self) -> &Collection {
        &self.inner.collection
    }

    /// Returns the relations of this schema.
    ///
    /// Explicit relations given at registration come first. Field tags keyed by `tag_key` are
    /// added for fields that have no explicit relation.
    pub fn relations(&self, tag_key: &str) -> Vec<Relation> {
        let mut relations = self.inner.relations.clone();

        for tag in self.inner.field_tags.iter().filter(|tag| tag.key == tag_key) {
            if !relations.iter().any(|r| r.field == tag.field) {
                relations.push(Relation::new(tag.field, tag.value));
            }
        }

        relations
    }

    /// Returns the relation declared on `field`, if any.
    pub fn relation(&self, field: &str, tag_key: &str) -> Option<Relation> {
        self.inner
            .relations
            .iter()
            .find(|r| r.field == field)
            .cloned()
            .or_else(|| {
                self.inner
                    .field_tags
                    .iter()
                    .find(|tag| tag.key == tag_key && tag.field == field)
                    .map(|tag| Relation::new(tag.field, tag.value))
            })
    }

    /// The template state copied into each new document: bound to this model's collection,
    /// `found` and `queried` set, empty cache.
    pub fn prototype(&self) -> DocumentState {
        let mut state = DocumentState::prototype(self.inner.collection.clone(), true, true);
        state.bind(self.clone());
        state
    }

    /// Attaches fresh state and a fresh identifier to `doc`.
    ///
    /// Any identifier already on `doc` is overwritten; only call this on documents that have
    /// never been persisted.
    pub(crate) fn materialize_into<S: Schema>(&self, doc: &mut S) {
        let mut state = self.prototype();

        if !self.inner.inherit_prototype_flags {
            state.set_found(false);
            state.set_queried(false);
        }

        doc.attach_state(state);
        doc.set_id(id::generate());
    }

    /// Materializes `doc` as a new, not yet persisted document.
    ///
    /// # Errors
    ///
    /// [`OdmError::SchemaMismatch`] if `S` is not this model's schema.
    pub fn create<S: Schema>(&self, doc: &mut S) -> OdmResult<()> {
        self.ensure_schema::<S>()?;
        self.materialize_into(doc);

        let state = doc.state_mut();
        state.set_found(false);
        state.set_persisted(false);

        Ok(())
    }

    /// Builds a schema instance from a stored record, keeping its stored identity.
    ///
    /// # Errors
    ///
    /// [`OdmError::SchemaMismatch`] if `S` is not this model's schema, or a serialization
    /// error if the record does not fit `S`.
    pub fn hydrate<S: Schema>(&self, raw: Bson) -> OdmResult<S> {
        self.ensure_schema::<S>()?;

        let mut doc = S::from_bson(raw)?;
        let mut state = self.prototype();
        state.set_found(true);
        state.set_queried(true);
        state.set_persisted(true);
        doc.attach_state(state);

        Ok(doc)
    }

    /// Looks up one document by identifier.
    ///
    /// Returns `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// Identifier normalization errors, [`OdmError::SchemaMismatch`], or store faults.
    pub async fn find_by_id<S, I>(&self, id: &I) -> OdmResult<Option<S>>
    where
        S: Schema,
        I: ToObjectId + ?Sized,
    {
        self.ensure_schema::<S>()?;
        let id = id::normalize(id)?;

        match self.inner.collection.get_one(id).await? {
            Some(raw) => Ok(Some(self.hydrate(raw)?)),
            None => Ok(None),
        }
    }

    /// Runs an ad-hoc query against the bound collection.
    pub async fn find<S: Schema>(&self, query: impl Into<Query>) -> OdmResult<Vec<S>> {
        self.ensure_schema::<S>()?;

        self.inner
            .collection
            .query(query.into())
            .await?
            .into_iter()
            .map(|raw| self.hydrate::<S>(raw))
            .collect()
    }

    /// Runs a query and returns its first result.
    pub async fn find_one<S: Schema>(&self, query: impl Into<Query>) -> OdmResult<Option<S>> {
        let mut query = query.into();
        query.limit = Some(1);

        Ok(self.find::<S>(query).await?.into_iter().next())
    }

    /// Returns `true` if a document with this identifier is stored.
    pub async fn exists<I: ToObjectId + ?Sized>(&self, id: &I) -> OdmResult<bool> {
        let id = id::normalize(id)?;

        Ok(self.inner.collection.get_one(id).await?.is_some())
    }

    /// Writes `doc` to the store: an insert the first time, an update afterwards.
    ///
    /// A document without state gets this model's state attached first. Its identifier is
    /// kept unless it is nil, in which case a fresh one is minted. After a successful write
    /// the identity is final.
    ///
    /// # Errors
    ///
    /// [`OdmError::SchemaMismatch`], serialization errors, or store faults such as a
    /// duplicate identifier.
    pub async fn save<S: Schema>(&self, doc: &mut S) -> OdmResult<()> {
        self.ensure_schema::<S>()?;

        if doc.state().model().is_none() {
            let mut state = self.prototype();
            state.set_found(false);
            doc.attach_state(state);

            if id::is_nil(doc.id()) {
                doc.set_id(id::generate());
            }
        }

        let id = *doc.id();
        let record = Bson::Document(doc.to_document()?);

        if doc.state().is_persisted() {
            self.inner.collection.update(vec![(id, record)]).await?;
        } else {
            self.inner.collection.insert(vec![(id, record)]).await?;
        }

        doc.state_mut().set_persisted(true);
        log::debug!("saved {} {}", self.inner.schema_name, id);

        Ok(())
    }

    pub async fn delete_by_id<I: ToObjectId + ?Sized>(&self, id: &I) -> OdmResult<()> {
        let id = id::normalize(id)?;
        self.inner.collection.delete(vec![id]).await?;

        Ok(())
    }

    /// Deletes `doc` from the store and marks it as no longer persisted.
    pub async fn remove<S: Schema>(&self, doc: &mut S) -> OdmResult<()> {
        self.ensure_schema::<S>()?;
        self.inner.collection.delete(vec![*doc.id()]).await?;
        doc.state_mut().set_persisted(false);

        Ok(())
    }

    /// Filter matching the document with identifier `id`.
    pub fn id_filter(&self, id: ObjectId) -> Query {
        Filter::id(self.inner.id_field, id).into()
    }

    fn ensure_schema<S: Schema>(&self) -> OdmResult<()> {
        if self.handles::<S>() {
            return Ok(());
        }

        let given = if S::schema_name() == self.inner.schema_name {
            any::type_name::<S>()
        } else {
            S::schema_name()
        };

        Err(OdmError::SchemaMismatch(
            self.inner.schema_name.to_string(),
            given.to_string(),
        ))
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Model {}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("schema", &self.inner.schema_name)
            .field("collection", &self.inner.collection.name())
            .field("relations", &self.inner.relations)
            .finish()
    }
}
