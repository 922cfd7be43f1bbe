//! In-memory storage implementation.
//!
//! Records are kept as BSON values in per-collection hash maps keyed by [`ObjectId`], behind an
//! async-aware read-write lock.

use async_trait::async_trait;
use bson::{Bson, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering as AtomicOrdering},
    },
};

use odmlayer_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Query, SortDirection},
};

use crate::evaluator::{DocumentEvaluator, sort_key};

type CollectionMap = HashMap<ObjectId, Bson>;
type StoreMap = HashMap<String, CollectionMap>;

/// Counts of backend calls served, shared by all clones of a store.
///
/// Handy for asserting that a code path did or did not reach the store.
#[derive(Debug, Default)]
pub struct OperationStats {
    inserts: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
    reads: AtomicUsize,
    queries: AtomicUsize,
}

impl OperationStats {
    pub fn inserts(&self) -> usize {
        self.inserts.load(AtomicOrdering::Relaxed)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(AtomicOrdering::Relaxed)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(AtomicOrdering::Relaxed)
    }

    /// Number of `get_documents` calls.
    pub fn reads(&self) -> usize {
        self.reads.load(AtomicOrdering::Relaxed)
    }

    pub fn queries(&self) -> usize {
        self.queries.load(AtomicOrdering::Relaxed)
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, AtomicOrdering::Relaxed);
    }
}

/// Thread-safe in-memory document store.
///
/// Clones share the same data and the same [`OperationStats`].
///
/// Queries scan every record of the collection; there are no indexes.
///
/// ```ignore
/// use odmlayer_memory::InMemoryStore;
/// use odmlayer::backend::StoreBackend;
/// use bson::{Bson, doc, oid::ObjectId};
///
/// let store = InMemoryStore::new();
/// let id = ObjectId::new();
/// store.insert_documents(vec![(id, Bson::Document(doc! { "name": "Ann" }))], "users").await?;
/// assert_eq!(store.get_documents(vec![id], "users").await?.len(), 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> (identifier -> record)
    store: Arc<RwLock<StoreMap>>,
    stats: Arc<OperationStats>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    pub fn stats(&self) -> &OperationStats {
        &self.stats
    }

    /// Number of records in `collection`, zero if it does not exist.
    pub async fn len(&self, collection: &str) -> usize {
        self.store
            .read()
            .await
            .get(collection)
            .map_or(0, HashMap::len)
    }

    pub async fn is_empty(&self, collection: &str) -> bool {
        self.len(collection).await == 0
    }
}

fn window(records: Vec<Bson>, query: &Query) -> Vec<Bson> {
    records
        .into_iter()
        .skip(query.offset.unwrap_or(0))
        .take(query.limit.unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        OperationStats::bump(&self.stats.inserts);

        let mut store = self.store.write().await;
        let collection_map = store.entry(collection.to_string()).or_default();

        if let Some((id, _)) = documents.iter().find(|(id, _)| collection_map.contains_key(id)) {
            return Err(DocumentStoreError::DocumentAlreadyExists(
                id.to_hex(),
                collection.to_string(),
            ));
        }

        collection_map.extend(documents);

        Ok(())
    }

    async fn update_documents(
        &self,
        documents: Vec<(ObjectId, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        OperationStats::bump(&self.stats.updates);

        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Err(DocumentStoreError::CollectionNotFound(collection.to_string()));
        };

        if let Some((id, _)) = documents.iter().find(|(id, _)| !collection_map.contains_key(id)) {
            return Err(DocumentStoreError::DocumentNotFound(
                id.to_hex(),
                collection.to_string(),
            ));
        }

        collection_map.extend(documents);

        Ok(())
    }

    async fn delete_documents(&self, ids: Vec<ObjectId>, collection: &str) -> DocumentStoreResult<()> {
        OperationStats::bump(&self.stats.deletes);

        let mut store = self.store.write().await;
        let Some(collection_map) = store.get_mut(collection) else {
            return Err(DocumentStoreError::CollectionNotFound(collection.to_string()));
        };

        if let Some(id) = ids.iter().find(|id| !collection_map.contains_key(*id)) {
            return Err(DocumentStoreError::DocumentNotFound(
                id.to_hex(),
                collection.to_string(),
            ));
        }

        for id in &ids {
            collection_map.remove(id);
        }

        Ok(())
    }

    async fn get_documents(&self, ids: Vec<ObjectId>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        OperationStats::bump(&self.stats.reads);

        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        Ok(ids
            .iter()
            .filter_map(|id| collection_map.get(id).cloned())
            .collect())
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        OperationStats::bump(&self.stats.queries);

        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut records = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(collection_map.values(), filter)?,
            None => collection_map.values().cloned().collect(),
        };

        if let Some(sort) = &query.sort {
            records.sort_by(|a, b| {
                let (left, right) = (sort_key(a, &sort.field), sort_key(b, &sort.field));

                match sort.direction {
                    SortDirection::Asc => left.partial_cmp(&right).unwrap_or(Ordering::Equal),
                    SortDirection::Desc => right.partial_cmp(&left).unwrap_or(Ordering::Equal),
                }
            });
        }

        Ok(window(records, &query))
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.store
            .write()
            .await
            .entry(name.to_string())
            .or_default();

        log::trace!("collection {} ready", name);

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self.store.read().await.keys().cloned().collect::<Vec<_>>();
        names.sort_unstable();

        Ok(names)
    }
}

/// Builder for [`InMemoryStore`]. Building never fails.
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    collections: Vec<String>,
}

impl InMemoryStoreBuilder {
    /// Creates `name` up front.
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collections.push(name.into());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let store = InMemoryStore::new();

        for name in &self.collections {
            store.create_collection(name).await?;
        }

        Ok(store)
    }
}
