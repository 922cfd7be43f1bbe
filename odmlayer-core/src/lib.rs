//! Schema registry and document materializer over a pluggable document store.
//!
//! This crate is the core of the odmlayer project and provides:
//!
//! - **Identifiers** ([`id`]) - Normalization of text and BSON values into [`bson::oid::ObjectId`]
//! - **Schemas** ([`schema`]) - The capability trait schema structs implement or derive
//! - **Persistence state** ([`state`]) - The record embedded in every live document
//! - **Registry** ([`registry`]) - Registration, sealing, materialization and population
//! - **Models** ([`model`]) - Per-schema create, find, save and delete
//! - **Mapper** ([`odm`]) - The builder and sealed entry point most callers use
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Query and filtering API** ([`query`]) - Filter construction for ad-hoc lookups
//! - **Collections** ([`collection`]) - Raw handles to named collections
//! - **Configuration** ([`config`]) and **errors** ([`error`])
//!
//! # Example
//!
//! ```ignore
//! use odmlayer::prelude::*;
//!
//! let mut builder = Odm::builder(InMemoryStore::new());
//! let users = builder.register(User::default(), "users").await?;
//! let odm = builder.seal();
//!
//! let mut ann = User::named("Ann");
//! users.create(&mut ann)?;
//! users.save(&mut ann).await?;
//!
//! let found: Option<User> = odm.find_by_id(&ann.id.to_hex()).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as odmlayer_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod error;
pub mod id;
pub mod model;
pub mod odm;
pub mod query;
pub mod registry;
pub mod schema;
pub mod state;
