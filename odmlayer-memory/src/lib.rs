//! In-memory document storage backend for odmlayer.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is meant for development,
//! tests, and small embedded deployments.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes behind an async-aware RwLock
//! - **Identifier keyed** - Records are addressed by `ObjectId`
//! - **Query support** - Filtering, sorting, offset and limit
//! - **Operation stats** - Counters of served calls, shared by clones
//!
//! # Quick Start
//!
//! ```ignore
//! use odmlayer::prelude::*;
//! use odmlayer::memory::InMemoryStore;
//!
//! #[tokio::main]
//! async fn main() -> OdmResult<()> {
//!     let mut builder = Odm::builder(InMemoryStore::new());
//!     let users = builder.register(User::default(), "users").await?;
//!     let odm = builder.seal();
//!
//!     let mut ann = User::named("Ann");
//!     users.create(&mut ann)?;
//!     users.save(&mut ann).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as odmlayer_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder, OperationStats};
