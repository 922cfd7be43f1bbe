//! Main odmlayer crate: a schema registry and document materializer over document stores.
//!
//! This crate is the entry point for users of odmlayer. It re-exports the core types, the
//! `Schema` derive macro and the bundled storage backends.
//!
//! # Features
//!
//! - **Schema registry** - Register each schema type once, against a named collection
//! - **Materialization** - Attach persistence state and a fresh identifier to new documents
//! - **Relation population** - Resolve tagged identifier fields into related documents, cached
//!   per document
//! - **Pluggable backends** - Anything implementing `StoreBackend`; an in-memory store ships
//!   with the crate
//!
//! # Quick Start
//!
//! ```ignore
//! use odmlayer::{prelude::*, memory::InMemoryStore};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Schema)]
//! pub struct User {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub name: String,
//!     #[serde(skip)]
//!     pub document: DocumentState,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Schema)]
//! pub struct Post {
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub title: String,
//!     #[schema(tag(model = "User"))]
//!     pub author: Option<ObjectId>,
//!     #[serde(skip)]
//!     pub document: DocumentState,
//! }
//!
//! #[tokio::main]
//! async fn main() -> OdmResult<()> {
//!     let mut builder = Odm::builder(InMemoryStore::new());
//!     let users = builder.register(User::named("Ann"), "users").await?;
//!     builder.register(Post::titled("Hello"), "posts").await?;
//!     let odm = builder.seal();
//!
//!     let mut ann = User::named("Ann");
//!     users.create(&mut ann)?;
//!     users.save(&mut ann).await?;
//!
//!     let mut post = Post::titled("Hello");
//!     odm.materialize(&mut post);
//!     post.author = Some(ann.id);
//!
//!     let author = odm.populate::<Post, User>(&mut post, "author").await?;
//!     assert_eq!(author.map(|a| a.name.clone()), Some("Ann".to_string()));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing

#[allow(unused_extern_crates)]
extern crate self as odmlayer;

pub mod prelude;

pub use odmlayer_core::{
    backend, collection, config, error, id, model, odm, query, registry, schema, state,
};
pub use odmlayer_macros::Schema;

pub use bson;
pub use serde;

/// In-memory storage backend.
pub mod memory {
    pub use odmlayer_memory::{InMemoryStore, InMemoryStoreBuilder, OperationStats};
}
