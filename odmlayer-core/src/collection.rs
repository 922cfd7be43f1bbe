//! Collection handles.
//!
//! A [`Collection`] is an owned, cheaply cloneable handle to one named collection of the
//! backing store. The registry hands one out per registered schema; models and document
//! states keep clones of it. All operations are raw BSON pass-throughs to the backend.

use bson::{Bson, oid::ObjectId};
use std::sync::Arc;

use crate::{
    backend::DynStoreBackend,
    error::DocumentStoreResult,
    query::Query,
};

#[derive(Debug, Clone)]
pub struct Collection {
    name: Arc<str>,
    backend: Arc<dyn DynStoreBackend>,
}

impl Collection {
    pub(crate) fn new(name: &str, backend: Arc<dyn DynStoreBackend>) -> Self {
        Self {
            name: Arc::from(name),
            backend,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the backend this collection lives in.
    pub fn backend(&self) -> &Arc<dyn DynStoreBackend> {
        &self.backend
    }

    /// Inserts new documents.
    ///
    /// # Errors
    ///
    /// Whatever the backend reports, e.g. an identifier that is already present.
    pub async fn insert(&self, documents: Vec<(ObjectId, Bson)>) -> DocumentStoreResult<()> {
        log::trace!("insert {} document(s) into {}", documents.len(), self.name);
        self.backend.insert_documents(documents, &self.name).await
    }

    /// Replaces existing documents.
    ///
    /// # Errors
    ///
    /// Whatever the backend reports, e.g. an identifier that is not present.
    pub async fn update(&self, documents: Vec<(ObjectId, Bson)>) -> DocumentStoreResult<()> {
        log::trace!("update {} document(s) in {}", documents.len(), self.name);
        self.backend.update_documents(documents, &self.name).await
    }

    pub async fn delete(&self, ids: Vec<ObjectId>) -> DocumentStoreResult<()> {
        log::trace!("delete {} document(s) from {}", ids.len(), self.name);
        self.backend.delete_documents(ids, &self.name).await
    }

    /// Point reads by identifier. Missing identifiers are omitted from the result.
    pub async fn get(&self, ids: Vec<ObjectId>) -> DocumentStoreResult<Vec<Bson>> {
        log::trace!("get {} document(s) from {}", ids.len(), self.name);
        self.backend.get_documents(ids, &self.name).await
    }

    /// Reads a single document, `None` if it does not exist.
    pub async fn get_one(&self, id: ObjectId) -> DocumentStoreResult<Option<Bson>> {
        Ok(self.get(vec![id]).await?.into_iter().next())
    }

    pub async fn query(&self, query: Query) -> DocumentStoreResult<Vec<Bson>> {
        log::trace!("query {}: {:?}", self.name, query.filter);
        self.backend.query_documents(query, &self.name).await
    }
}
