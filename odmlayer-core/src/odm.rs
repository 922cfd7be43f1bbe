//! Main entry point: the object-document mapper.
//!
//! This module exposes two types:
//!
//! - [`OdmBuilder`] - the open phase, where configuration is set and schemas are registered
//! - [`Odm`] - the sealed mapper, shared between tasks and read without locks
//!
//! # Example
//!
//! ```ignore
//! use odmlayer::prelude::*;
//! use odmlayer::memory::InMemoryStore;
//!
//! let mut builder = Odm::builder(InMemoryStore::new());
//! builder.register(User::default(), "users").await?;
//! builder.register(Post::default(), "posts").await?;
//! let odm = builder.seal();
//!
//! let mut post = Post::default();
//! odm.materialize(&mut post);
//! ```

use std::sync::Arc;

use crate::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::OdmConfig,
    error::OdmResult,
    id::{self, ToObjectId},
    model::Model,
    registry::{Registry, RegistryBuilder},
    schema::{Schema, SchemaOptions},
};
use bson::oid::ObjectId;

/// Configures a mapper and registers its schemas.
///
/// Registration takes `&mut self`, so it cannot overlap with itself or with reads.
/// [`OdmBuilder::seal`] ends the phase.
#[derive(Debug)]
pub struct OdmBuilder {
    registry: RegistryBuilder,
}

impl OdmBuilder {
    /// Creates a builder over the given backend with default configuration.
    pub fn new<B: StoreBackend + 'static>(backend: B) -> Self {
        Self::with_config(backend, OdmConfig::default())
    }

    pub fn with_config<B: StoreBackend + 'static>(backend: B, config: OdmConfig) -> Self {
        Self {
            registry: RegistryBuilder::new(Arc::new(backend), config),
        }
    }

    /// Builds the backend first, then creates a builder over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be built.
    pub async fn from_backend_builder<BB>(builder: BB) -> OdmResult<Self>
    where
        BB: StoreBackendBuilder,
        BB::Backend: 'static,
    {
        Ok(Self::new(builder.build().await?))
    }

    pub fn config(&self) -> &OdmConfig {
        self.registry.config()
    }

    /// Sets the tag key that marks relation fields. Defaults to `model`.
    pub fn model_tag(mut self, key: impl Into<String>) -> Self {
        self.registry.set_model_tag(key);
        self
    }

    pub fn set_model_tag(&mut self, key: impl Into<String>) {
        self.registry.set_model_tag(key);
    }

    /// Whether new documents copy `found`/`queried` from the prototype. Defaults to `true`.
    pub fn inherit_prototype_flags(mut self, inherit: bool) -> Self {
        self.registry.set_inherit_prototype_flags(inherit);
        self
    }

    pub fn is_registered(&self, schema_name: &str) -> bool {
        self.registry.is_registered(schema_name)
    }

    /// Registers schema `S` against a collection.
    ///
    /// `options` is either a collection name or a [`SchemaOptions`] carrying explicit
    /// relations.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register`].
    pub async fn register<S: Schema>(
        &mut self,
        prototype: S,
        options: impl Into<SchemaOptions>,
    ) -> OdmResult<Model> {
        self.registry.register(prototype, options).await
    }

    /// Ends registration and returns the sealed mapper.
    pub fn seal(self) -> Odm {
        Odm {
            registry: self.registry.seal(),
        }
    }
}

/// The sealed mapper.
///
/// Cheap to clone. All methods take `&self`; the only mutation is on caller-owned documents.
#[derive(Debug, Clone)]
pub struct Odm {
    registry: Registry,
}

impl Odm {
    /// Starts configuring a mapper over `backend`.
    pub fn builder<B: StoreBackend + 'static>(backend: B) -> OdmBuilder {
        OdmBuilder::new(backend)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn backend(&self) -> &Arc<dyn DynStoreBackend> {
        self.registry.backend()
    }

    /// Converts a 24-character lowercase hex string into an identifier.
    ///
    /// # Errors
    ///
    /// [`OdmError::InvalidIdentifierFormat`](crate::error::OdmError::InvalidIdentifierFormat)
    /// for anything else.
    pub fn object_id(&self, hex: &str) -> OdmResult<ObjectId> {
        id::object_id(hex)
    }

    pub fn collection(&self, schema_name: &str) -> Option<&Collection> {
        self.registry.collection(schema_name)
    }

    pub fn model(&self, schema_name: &str) -> Option<&Model> {
        self.registry.model(schema_name)
    }

    /// # Errors
    ///
    /// See [`Registry::model_of`].
    pub fn model_of<S: Schema>(&self) -> OdmResult<&Model> {
        self.registry.model_of::<S>()
    }

    /// See [`Registry::materialize`].
    pub fn materialize<S: Schema>(&self, doc: &mut S) {
        self.registry.materialize(doc);
    }

    /// Materializes `doc` as a new document through its model.
    ///
    /// Unlike [`Odm::materialize`] this fails for unregistered schemas.
    pub fn create<S: Schema>(&self, doc: &mut S) -> OdmResult<()> {
        self.model_of::<S>()?.create(doc)
    }

    pub async fn save<S: Schema>(&self, doc: &mut S) -> OdmResult<()> {
        self.model_of::<S>()?.save(doc).await
    }

    /// Looks up a document of schema `S` by identifier.
    pub async fn find_by_id<S, I>(&self, id: &I) -> OdmResult<Option<S>>
    where
        S: Schema,
        I: ToObjectId + ?Sized,
    {
        self.model_of::<S>()?.find_by_id(id).await
    }

    /// See [`Registry::populate`].
    pub async fn populate<S, T>(&self, doc: &mut S, field: &str) -> OdmResult<Option<Arc<T>>>
    where
        S: Schema,
        T: Schema,
    {
        self.registry.populate::<S, T>(doc, field).await
    }

    /// See [`Registry::populate_all`].
    pub async fn populate_all<S: Schema>(&self, doc: &mut S) -> OdmResult<usize> {
        self.registry.populate_all(doc).await
    }
}
