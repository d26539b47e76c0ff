use crate::node::attribute::Attribute;
use convert_case::{Case, Casing};
use serde::Serialize;
use std::collections::BTreeMap;

///
/// Component
///
/// Embeddable sub-schema. Component rows are owned by the entry that
/// embeds them and live in a dedicated per-component table.
///

#[derive(Clone, Debug, Serialize)]
pub struct Component {
    pub ident: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Component {
    #[must_use]
    pub fn new(ident: impl Into<String>) -> Self {
        Self {
            ident: ident.into(),
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    /// Component tables share a `components_` namespace to keep them
    /// apart from content-type tables.
    #[must_use]
    pub fn table_name(&self) -> String {
        format!("components_{}", self.ident.to_case(Case::Snake))
    }
}
