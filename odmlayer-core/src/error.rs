//! Error types and result types for the mapping layer and its store backends.
//!
//! Two enums live here. [`DocumentStoreError`] is what a [`StoreBackend`](crate::backend::StoreBackend)
//! reports; the mapping layer never rewrites it. [`OdmError`] is what the mapping layer
//! reports, wrapping store faults unchanged in [`OdmError::Store`].
//!
//! Use [`OdmResult<T>`] as the return type for fallible mapping operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Errors reported by a document store backend.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested document was not found in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The stored record is not a document or has invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A specialized `Result` type for store backend operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

/// Errors reported by the mapping layer.
///
/// The variants fall into three groups:
///
/// - wiring errors (`InvalidSchemaKind`, `MissingIdentityField`, `UnsupportedIdentifierType`,
///   `DuplicateSchemaRegistration`, `SchemaMismatch`, `UnregisteredSchema`, `UnknownRelation`,
///   `RelationTargetMismatch`). These point at a bug in how schemas are declared or called and
///   should abort the offending call path. Retrying never helps.
/// - data errors (`InvalidIdentifierFormat`, `Serialization`), recoverable by the caller.
/// - store faults (`Store`), passed through exactly as the backend reported them.
///
/// A point lookup that matches nothing is not an error; it is `Ok(None)`.
#[derive(Error, Debug)]
pub enum OdmError {
    /// Identifier text is not 24 lowercase hex characters.
    #[error("Invalid identifier format: {0:?}")]
    InvalidIdentifierFormat(String),
    /// The value handed to the identifier normalizer is neither text nor an `ObjectId`.
    #[error("Unsupported identifier type: {0}")]
    UnsupportedIdentifierType(String),
    /// The schema prototype does not serialize to a document.
    #[error("Schema `{0}` must be a struct value, got {1}")]
    InvalidSchemaKind(String, String),
    /// The schema prototype has no identity field.
    /// The first argument is the schema name, the second is the expected field.
    #[error("Schema `{0}` must have an `{1}` field")]
    MissingIdentityField(String, String),
    /// A schema with the same type name is already registered.
    #[error("Schema `{0}` is already registered")]
    DuplicateSchemaRegistration(String),
    /// The schema type was never registered.
    #[error("Schema `{0}` is not registered")]
    UnregisteredSchema(String),
    /// A model was asked to handle a document of another schema.
    /// The first argument is the model's schema, the second is the document's.
    #[error("Model for `{0}` cannot handle documents of `{1}`")]
    SchemaMismatch(String, String),
    /// The field is not a relation of the schema.
    #[error("Field `{1}` of schema `{0}` is not a relation")]
    UnknownRelation(String, String),
    /// The relation points at a different schema than the one requested.
    /// Arguments: field, declared target, requested target.
    #[error("Relation `{0}` targets `{1}`, not `{2}`")]
    RelationTargetMismatch(String, String, String),
    /// Conversion between the schema type and BSON/JSON failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// A fault reported by the store backend.
    #[error(transparent)]
    Store(#[from] DocumentStoreError),
}

/// A specialized `Result` type for mapping operations.
pub type OdmResult<T> = Result<T, OdmError>;

impl From<BsonError> for OdmError {
    fn from(err: BsonError) -> Self {
        OdmError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for OdmError {
    fn from(err: SerdeJsonError) -> Self {
        OdmError::Serialization(err.to_string())
    }
}

impl OdmError {
    /// Returns `true` for errors caused by how schemas are declared or called.
    ///
    /// These are not recoverable at runtime and should not be retried.
    pub fn is_wiring_error(&self) -> bool {
        matches!(
            self,
            OdmError::UnsupportedIdentifierType(_)
                | OdmError::InvalidSchemaKind(..)
                | OdmError::MissingIdentityField(..)
                | OdmError::DuplicateSchemaRegistration(_)
                | OdmError::UnregisteredSchema(_)
                | OdmError::SchemaMismatch(..)
                | OdmError::UnknownRelation(..)
                | OdmError::RelationTargetMismatch(..)
        )
    }
}
