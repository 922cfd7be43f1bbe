//! Procedural macros for the odmlayer project.
//!
//! # `Schema`
//!
//! Derives `odmlayer::schema::Schema` for a struct with named fields.
//!
//! - `#[schema(name = "...")]` on the struct overrides the registry key (default: the type name)
//! - `#[schema(id)]` marks the identity field (default: a field named `id`)
//! - `#[schema(state)]` marks the embedded `DocumentState` (default: a field named `document`)
//! - `#[schema(tag(key = "value", ...))]` attaches field tags; `model = "Target"` declares a
//!   relation under the default tag key
//!
//! Field names are taken from `#[serde(rename = "...")]` when present, else from the struct's
//! `#[serde(rename_all = "...")]`, so tags and the identity field refer to the names the
//! document is stored under.
//!
//! ```rust,ignore
//! use odmlayer::prelude::*;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Schema)]
//! pub struct Post {
//!     #[schema(id)]
//!     #[serde(rename = "_id")]
//!     pub id: ObjectId,
//!     #[schema(tag(model = "User"))]
//!     pub author: Option<ObjectId>,
//!     #[schema(state)]
//!     #[serde(skip)]
//!     pub document: DocumentState,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as odmlayer_macros;

mod schema;

use proc_macro::TokenStream;
use syn::{Data, DeriveInput, parse_macro_input};

use crate::schema::generate_schema_for_struct;

#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let result = match &ast.data {
        Data::Struct(data) => generate_schema_for_struct(&ast, data),
        Data::Enum(_) | Data::Union(_) => Err(syn::Error::new_spanned(
            &ast.ident,
            "Schema can only be derived for structs with named fields",
        )),
    };

    result.unwrap_or_else(syn::Error::into_compile_error).into()
}
