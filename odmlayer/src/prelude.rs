//! Convenient re-exports of commonly used types from odmlayer.
//!
//! ```ignore
//! use odmlayer::prelude::*;
//! ```
//!
//! This provides access to:
//! - the `Schema` trait and derive, plus `ObjectId` and `DocumentState` for schema fields
//! - the mapper, its builder, the registry and models
//! - store backend traits, query construction and collections
//! - error and result types

pub use bson::oid::ObjectId;
pub use serde::{Deserialize, Serialize};

pub use odmlayer_core::{
    backend::{DynStoreBackend, StoreBackend, StoreBackendBuilder},
    collection::Collection,
    config::OdmConfig,
    error::{DocumentStoreError, DocumentStoreResult, OdmError, OdmResult},
    id::ToObjectId,
    model::Model,
    odm::{Odm, OdmBuilder},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, Sort, SortDirection},
    registry::{Registry, RegistryBuilder},
    schema::{FieldTag, Relation, Schema, SchemaExt, SchemaOptions},
    state::{DocumentState, Lifecycle, Virtual},
};
pub use odmlayer_macros::Schema;
