use crate::node::attribute::Attribute;
use convert_case::{Case, Casing};
use serde::Serialize;
use std::collections::BTreeMap;

///
/// TypeOptions
///

#[derive(Clone, Copy, Debug, Serialize)]
pub struct TypeOptions {
    /// Entries may exist once per locale.
    pub localized: bool,
    /// Entries carry a draft/published dimension. When disabled every
    /// entry is stored as published.
    pub draft_and_publish: bool,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            localized: false,
            draft_and_publish: true,
        }
    }
}

///
/// ContentType
///

#[derive(Clone, Debug, Serialize)]
pub struct ContentType {
    pub ident: String,

    /// Physical table override; defaults to the snake_case ident.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,

    pub attributes: BTreeMap<String, Attribute>,
    pub options: TypeOptions,
}

impl ContentType {
    #[must_use]
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            collection: None,
            attributes: BTreeMap::new(),
            options: TypeOptions::default(),
        }
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    #[must_use]
    pub fn collection(mut self, table: impl Into<String>) -> Self {
        self.collection = Some(table.into());
        self
    }

    #[must_use]
    pub const fn localized(mut self) -> Self {
        self.options.localized = true;
        self
    }

    #[must_use]
    pub const fn without_draft_and_publish(mut self) -> Self {
        self.options.draft_and_publish = false;
        self
    }

    /// Physical table backing this content type.
    #[must_use]
    pub fn table_name(&self) -> String {
        self.collection
            .clone()
            .unwrap_or_else(|| self.ident.to_case(Case::Snake))
    }
}
