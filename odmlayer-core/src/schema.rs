//! The capability trait every schema type implements.
//!
//! A schema is a plain struct the caller owns. To take part in materialization it exposes its
//! identity field and an embedded [`DocumentState`] through [`Schema`]. The trait is normally
//! derived:
//!
//! ```ignore
//! use odmlayer::prelude::*;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize, Schema)]
//! pub struct Post {
//!     #[schema(id)]
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     pub title: String,
//!     #[schema(tag(model = "User"))]
//!     pub author: ObjectId,
//!     #[schema(state)]
//!     #[serde(skip)]
//!     pub document: DocumentState,
//! }
//! ```
//!
//! The state field must be skipped by serde: it is never persisted.

use bson::{Bson, Document as BsonDocument, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};
use std::any::type_name;

use crate::{
    error::{OdmError, OdmResult},
    state::DocumentState,
};

/// Default name of the serialized identity field.
pub const DEFAULT_ID_FIELD: &str = "_id";

/// A `key = "value"` tag attached to a schema field.
///
/// Tags whose key equals the registry's model tag key (default `model`) declare the field as a
/// relation to the schema named by the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldTag {
    /// Serialized name of the tagged field.
    pub field: &'static str,
    pub key: &'static str,
    pub value: &'static str,
}

impl FieldTag {
    pub const fn new(field: &'static str, key: &'static str, value: &'static str) -> Self {
        Self { field, key, value }
    }
}

/// Capabilities a schema type provides to the registry and its models.
pub trait Schema: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Serialized name of the identity field.
    const ID_FIELD: &'static str = DEFAULT_ID_FIELD;

    /// Registry key of this schema. Defaults to the unqualified type name.
    fn schema_name() -> &'static str {
        short_type_name::<Self>()
    }

    fn id(&self) -> &ObjectId;

    fn set_id(&mut self, id: ObjectId);

    fn state(&self) -> &DocumentState;

    fn state_mut(&mut self) -> &mut DocumentState;

    /// Replaces the embedded persistence state.
    fn attach_state(&mut self, state: DocumentState) {
        *self.state_mut() = state;
    }

    /// Field tags declared on the schema.
    fn field_tags() -> &'static [FieldTag] {
        &[]
    }
}

/// Conversion helpers, implemented for every [`Schema`].
pub trait SchemaExt: Schema {
    fn to_bson(&self) -> OdmResult<Bson>;

    /// Serializes to a BSON document. Fails with [`OdmError::InvalidSchemaKind`] if the type
    /// does not serialize to a document.
    fn to_document(&self) -> OdmResult<BsonDocument>;

    fn from_bson(bson: Bson) -> OdmResult<Self>;

    fn to_json(&self) -> OdmResult<Value>;

    fn from_json(value: Value) -> OdmResult<Self>;
}

impl<S: Schema> SchemaExt for S {
    fn to_bson(&self) -> OdmResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn to_document(&self) -> OdmResult<BsonDocument> {
        match self.to_bson()? {
            Bson::Document(document) => Ok(document),
            other => Err(OdmError::InvalidSchemaKind(
                S::schema_name().to_string(),
                format!("{:?}", other.element_type()),
            )),
        }
    }

    fn from_bson(bson: Bson) -> OdmResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_json(&self) -> OdmResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> OdmResult<Self> {
        Ok(from_value(value)?)
    }
}

/// An explicit relationship: `field` holds the identifier of a `target` schema document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub field: String,
    pub target: String,
}

impl Relation {
    pub fn new(field: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            target: target.into(),
        }
    }
}

/// Registration options: the collection name plus explicit relation descriptors.
///
/// A plain `&str` converts into options with no explicit relations.
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    pub collection: String,
    pub relations: Vec<Relation>,
}

impl SchemaOptions {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            relations: Vec::new(),
        }
    }

    /// Declares `field` as a relation to the schema named `target`.
    pub fn relation(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations.push(Relation::new(field, target));
        self
    }
}

impl From<&str> for SchemaOptions {
    fn from(collection: &str) -> Self {
        SchemaOptions::new(collection)
    }
}

impl From<String> for SchemaOptions {
    fn from(collection: String) -> Self {
        SchemaOptions::new(collection)
    }
}

/// Unqualified name of `T`, without module path or generic arguments.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);

    base.rsplit("::").next().unwrap_or(base)
}
