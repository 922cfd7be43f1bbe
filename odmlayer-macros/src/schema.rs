use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, DataStruct, DeriveInput, Expr, ExprLit, Field, Fields, Ident, Lit, LitStr, Meta,
    Result, Token, ext::IdentExt, punctuated::Punctuated,
};

/// What `#[schema(...)]` says about one field.
#[derive(Default)]
struct FieldOptions {
    id: bool,
    state: bool,
    tags: Vec<(String, String)>,
}

pub(crate) fn generate_schema_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(ast, "expected a struct with named fields"));
    };

    let mut schema_name = name.unraw().to_string();
    let rename_all = serde_rename_all(&ast.attrs)?;

    for attr in ast.attrs.iter().filter(|attr| attr.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let s: LitStr = meta.value()?.parse()?;
                schema_name = s.value();
                Ok(())
            } else {
                Err(meta.error("unknown schema attribute, expected `name`"))
            }
        })?;
    }

    let mut id_field: Option<&Field> = None;
    let mut state_field: Option<&Field> = None;
    let mut tags = Vec::new();

    for field in &fields.named {
        let options = field_options(field)?;

        if options.id {
            if id_field.is_some() {
                return Err(syn::Error::new_spanned(field, "only one field can be `#[schema(id)]`"));
            }
            id_field = Some(field);
        }

        if options.state {
            if state_field.is_some() {
                return Err(syn::Error::new_spanned(field, "only one field can be `#[schema(state)]`"));
            }
            state_field = Some(field);
        }

        if !options.tags.is_empty() {
            let serialized = serialized_name(field, rename_all)?;
            for (key, value) in options.tags {
                tags.push(quote! {
                    ::odmlayer::schema::FieldTag::new(#serialized, #key, #value)
                });
            }
        }
    }

    let id_field = id_field
        .or_else(|| named(fields.named.iter(), "id"))
        .ok_or_else(|| syn::Error::new_spanned(ast, "no identity field, mark one with `#[schema(id)]`"))?;
    let state_field = state_field
        .or_else(|| named(fields.named.iter(), "document"))
        .ok_or_else(|| syn::Error::new_spanned(ast, "no state field, mark one with `#[schema(state)]`"))?;

    let id_ident = &id_field.ident;
    let id_serialized = serialized_name(id_field, rename_all)?;
    let state_ident = &state_field.ident;

    let field_tags = if tags.is_empty() {
        quote! {}
    } else {
        quote! {
            fn field_tags() -> &'static [::odmlayer::schema::FieldTag] {
                const TAGS: &[::odmlayer::schema::FieldTag] = &[#(#tags),*];
                TAGS
            }
        }
    };

    Ok(quote! {
        impl #impl_generics ::odmlayer::schema::Schema for #name #ty_generics #where_clause {
            const ID_FIELD: &'static str = #id_serialized;

            fn schema_name() -> &'static str {
                #schema_name
            }

            fn id(&self) -> &::odmlayer::bson::oid::ObjectId {
                &self.#id_ident
            }

            fn set_id(&mut self, id: ::odmlayer::bson::oid::ObjectId) {
                self.#id_ident = id;
            }

            fn state(&self) -> &::odmlayer::state::DocumentState {
                &self.#state_ident
            }

            fn state_mut(&mut self) -> &mut ::odmlayer::state::DocumentState {
                &mut self.#state_ident
            }

            #field_tags
        }
    })
}

fn named<'a>(mut fields: impl Iterator<Item = &'a Field>, name: &str) -> Option<&'a Field> {
    fields.find(|field| field.ident.as_ref().is_some_and(|ident| ident == name))
}

fn field_options(field: &Field) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                options.id = true;
                Ok(())
            } else if meta.path.is_ident("state") {
                options.state = true;
                Ok(())
            } else if meta.path.is_ident("tag") {
                meta.parse_nested_meta(|tag| {
                    let key = tag
                        .path
                        .get_ident()
                        .map(|ident| ident.unraw().to_string())
                        .ok_or_else(|| tag.error("tag keys must be plain identifiers"))?;
                    let value: LitStr = tag.value()?.parse()?;
                    options.tags.push((key, value.value()));
                    Ok(())
                })
            } else {
                Err(meta.error("unknown schema attribute, expected `id`, `state` or `tag(...)`"))
            }
        })?;
    }

    Ok(options)
}

/// Name the field is serialized under: its `#[serde(rename = "...")]` (or the `serialize`
/// half of `rename(...)`), else the field identifier with the struct's `rename_all` applied.
fn serialized_name(field: &Field, rename_all: Option<RenameRule>) -> Result<String> {
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        if let Some(rename) = serde_rename(attr)? {
            return Ok(rename);
        }
    }

    let ident = field
        .ident
        .as_ref()
        .map(|ident: &Ident| ident.unraw().to_string())
        .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;

    Ok(match rename_all {
        Some(rule) => rule.apply(&ident),
        None => ident,
    })
}

/// Struct-level `#[serde(rename_all = "...")]`, as serde applies it to field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Pascal,
    Camel,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

impl RenameRule {
    fn parse(s: &LitStr) -> Result<Self> {
        Ok(match s.value().as_str() {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "PascalCase" => Self::Pascal,
            "camelCase" => Self::Camel,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            other => {
                return Err(syn::Error::new_spanned(
                    s,
                    format!("unknown serde rename rule `{other}`"),
                ));
            }
        })
    }

    /// Field identifiers are snake_case to begin with.
    fn apply(self, field: &str) -> String {
        match self {
            Self::Lower | Self::Snake => field.to_string(),
            Self::Upper | Self::ScreamingSnake => field.to_ascii_uppercase(),
            Self::Kebab => field.replace('_', "-"),
            Self::ScreamingKebab => field.to_ascii_uppercase().replace('_', "-"),
            Self::Pascal => {
                let mut out = String::with_capacity(field.len());
                let mut capitalize = true;
                for ch in field.chars() {
                    if ch == '_' {
                        capitalize = true;
                    } else if capitalize {
                        out.push(ch.to_ascii_uppercase());
                        capitalize = false;
                    } else {
                        out.push(ch);
                    }
                }
                out
            }
            Self::Camel => {
                let pascal = Self::Pascal.apply(field);
                let mut chars = pascal.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
                    None => pascal,
                }
            }
        }
    }
}

fn serde_rename_all(attrs: &[Attribute]) -> Result<Option<RenameRule>> {
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("serde")) {
        let items = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;

        for item in items {
            match item {
                Meta::NameValue(pair) if pair.path.is_ident("rename_all") => {
                    if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = pair.value {
                        return RenameRule::parse(&s).map(Some);
                    }
                }
                Meta::List(list) if list.path.is_ident("rename_all") => {
                    let halves = list.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;

                    for half in halves {
                        let Meta::NameValue(pair) = half else {
                            continue;
                        };

                        if pair.path.is_ident("serialize") {
                            if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = pair.value {
                                return RenameRule::parse(&s).map(Some);
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Ok(None)
}

fn serde_rename(attr: &Attribute) -> Result<Option<String>> {
    let items = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;

    for item in items {
        match item {
            Meta::NameValue(pair) if pair.path.is_ident("rename") => {
                if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = pair.value {
                    return Ok(Some(s.value()));
                }
            }
            Meta::List(list) if list.path.is_ident("rename") => {
                let halves = list.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;

                for half in halves {
                    let Meta::NameValue(pair) = half else {
                        continue;
                    };

                    if pair.path.is_ident("serialize") {
                        if let Expr::Lit(ExprLit { lit: Lit::Str(s), .. }) = pair.value {
                            return Ok(Some(s.value()));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    Ok(None)
}
