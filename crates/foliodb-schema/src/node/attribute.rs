use crate::{
    node::relation::RelationDescriptor,
    types::{ScalarKind, SchemaRef},
};
use serde::Serialize;

///
/// Attribute
///
/// Exhaustive attribute descriptor. Declared once per schema and
/// immutable after registration.
///

#[derive(Clone, Debug, Serialize)]
pub enum Attribute {
    Scalar(ScalarKind),
    Relation(RelationDescriptor),
    Component(ComponentAttribute),
    DynamicZone(DynamicZoneAttribute),
}

impl Attribute {
    /// Shorthand for a non-repeatable component attribute.
    #[must_use]
    pub fn component(component: impl Into<SchemaRef>) -> Self {
        Self::Component(ComponentAttribute {
            component: component.into(),
            repeatable: false,
        })
    }

    /// Shorthand for a repeatable component attribute.
    #[must_use]
    pub fn repeatable_component(component: impl Into<SchemaRef>) -> Self {
        Self::Component(ComponentAttribute {
            component: component.into(),
            repeatable: true,
        })
    }

    /// Shorthand for a dynamic zone over the given component refs.
    #[must_use]
    pub fn dynamic_zone(components: impl IntoIterator<Item = SchemaRef>) -> Self {
        Self::DynamicZone(DynamicZoneAttribute {
            components: components.into_iter().collect(),
        })
    }

    #[must_use]
    pub const fn as_relation(&self) -> Option<&RelationDescriptor> {
        match self {
            Self::Relation(relation) => Some(relation),
            Self::Component(_) | Self::DynamicZone(_) | Self::Scalar(_) => None,
        }
    }

    #[must_use]
    pub const fn is_relation(&self) -> bool {
        matches!(self, Self::Relation(_))
    }
}

///
/// ComponentAttribute
///

#[derive(Clone, Debug, Serialize)]
pub struct ComponentAttribute {
    pub component: SchemaRef,
    pub repeatable: bool,
}

///
/// DynamicZoneAttribute
///
/// Polymorphic list field: each entry is one of the allowed component
/// types, discriminated per row.
///

#[derive(Clone, Debug, Serialize)]
pub struct DynamicZoneAttribute {
    pub components: Vec<SchemaRef>,
}
