pub mod attribute;
pub mod component;
pub mod content_type;
pub mod relation;

pub use attribute::{Attribute, ComponentAttribute, DynamicZoneAttribute};
pub use component::Component;
pub use content_type::{ContentType, TypeOptions};
pub use relation::RelationDescriptor;

use std::collections::BTreeMap;

///
/// SchemaNode
///
/// A registered definition: a top-level content type or an embeddable
/// component. Both carry an attribute map; only content types have
/// locale/publication options.
///

#[derive(Clone, Debug, serde::Serialize)]
pub enum SchemaNode {
    Component(Component),
    ContentType(ContentType),
}

impl SchemaNode {
    #[must_use]
    pub const fn ident(&self) -> &String {
        match self {
            Self::Component(component) => &component.ident,
            Self::ContentType(content_type) => &content_type.ident,
        }
    }

    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, Attribute> {
        match self {
            Self::Component(component) => &component.attributes,
            Self::ContentType(content_type) => &content_type.attributes,
        }
    }

    /// Physical table backing this node.
    #[must_use]
    pub fn table_name(&self) -> String {
        match self {
            Self::Component(component) => component.table_name(),
            Self::ContentType(content_type) => content_type.table_name(),
        }
    }

    #[must_use]
    pub const fn is_content_type(&self) -> bool {
        matches!(self, Self::ContentType(_))
    }

    /// Look up a relation attribute on this node by name.
    #[must_use]
    pub fn relation(&self, attribute: &str) -> Option<&RelationDescriptor> {
        self.attributes()
            .get(attribute)
            .and_then(Attribute::as_relation)
    }
}
