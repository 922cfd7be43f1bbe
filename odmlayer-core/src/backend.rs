//! Storage backend abstraction.
//!
//! The mapping layer never speaks a wire protocol itself. It delegates every read and write to
//! a [`StoreBackend`]: a collection-scoped, identifier-addressed document store that accepts and
//! returns raw BSON records.
//!
//! # Traits
//!
//! - [`StoreBackend`]: the capability set a store must provide
//! - [`DynStoreBackend`]: object-safe view used by the registry, auto-implemented
//! - [`StoreBackendBuilder`]: factory trait for creating backend instances
//!
//! # Contract
//!
//! - Reads of missing identifiers are omitted from the result, never reported as errors.
//! - Any fault (connectivity, malformed query, ...) is reported as a
//!   [`DocumentStoreError`](crate::error::DocumentStoreError); callers surface it unchanged.
//! - Implementations must be `Send + Sync`. No retry or timeout policy is expected from the
//!   mapping layer.
//!
//! ```ignore
//! use odmlayer::backend::StoreBackend;
//! use bson::{Bson, doc, oid::ObjectId};
//!
//! let id = ObjectId::new();
//! backend.create_collection("users").await?;
//! backend.insert_documents(vec![(id, Bson::Document(doc! { "name": "Ann" }))], "users").await?;
//! let found = backend.get_documents(vec![id], "users").await?;
//! ```

use async_trait::async_trait;
use bson::{Bson, oid::ObjectId};
use std::{any::Any, fmt::Debug};

use crate::{error::DocumentStoreResult, query::Query};

#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents. Fails if an identifier is already present.
    async fn insert_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Replaces existing documents. Fails if an identifier is absent.
    async fn update_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    async fn delete_documents(
        &self,
        ids: Vec<ObjectId>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Point reads. Identifiers without a stored document are skipped.
    async fn get_documents(
        &self,
        ids: Vec<ObjectId>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Creates the collection if it does not exist yet. Idempotent.
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
}

/// Object-safe view of a [`StoreBackend`].
///
/// Every `StoreBackend + 'static` implements this trait automatically. The registry keeps its
/// backend as `Arc<dyn DynStoreBackend>` so models and collection handles do not carry the
/// backend type around.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn update_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn delete_documents(
        &self,
        ids: Vec<ObjectId>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn get_documents(
        &self,
        ids: Vec<ObjectId>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    fn as_any(&self) -> &dyn Any;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn update_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::update_documents(self, documents, collection).await
    }

    async fn delete_documents(
        &self,
        ids: Vec<ObjectId>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::delete_documents(self, ids, collection).await
    }

    async fn get_documents(
        &self,
        ids: Vec<ObjectId>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::get_documents(self, ids, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::query_documents(self, query, collection).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(self, name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl dyn DynStoreBackend {
    /// Attempts to downcast to a concrete backend type.
    pub fn downcast_ref<B: StoreBackend + 'static>(&self) -> Option<&B> {
        self.as_any().downcast_ref::<B>()
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
