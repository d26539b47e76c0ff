use crate::types::{RelationKind, SchemaRef};
use serde::Serialize;

///
/// RelationDescriptor
///
/// Declared relation attribute. `inversed_by` and `mapped_by` are
/// mutually exclusive; the side declaring `inversed_by` (or neither)
/// owns the physical linkage, the `mapped_by` side never does.
///

#[derive(Clone, Debug, Serialize)]
pub struct RelationDescriptor {
    pub kind: RelationKind,

    /// Fixed target schema. Absent for morph-to kinds, whose target
    /// varies per row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<SchemaRef>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inversed_by: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,

    /// Force a join column instead of a join table for owning *-to-one
    /// sides. Defaults to preferring a join table.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_join_table: Option<bool>,

    /// For MorphOne/MorphMany: the morph-to attribute on the target that
    /// holds the discriminator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub morph_by: Option<String>,
}

impl RelationDescriptor {
    #[must_use]
    pub fn new(kind: RelationKind, target: impl Into<SchemaRef>) -> Self {
        Self {
            kind,
            target: Some(target.into()),
            inversed_by: None,
            mapped_by: None,
            use_join_table: None,
            morph_by: None,
        }
    }

    /// A morph-to relation carries no fixed target.
    #[must_use]
    pub const fn morph_to(kind: RelationKind) -> Self {
        Self {
            kind,
            target: None,
            inversed_by: None,
            mapped_by: None,
            use_join_table: None,
            morph_by: None,
        }
    }

    #[must_use]
    pub fn inversed_by(mut self, attribute: impl Into<String>) -> Self {
        self.inversed_by = Some(attribute.into());
        self
    }

    #[must_use]
    pub fn mapped_by(mut self, attribute: impl Into<String>) -> Self {
        self.mapped_by = Some(attribute.into());
        self
    }

    #[must_use]
    pub const fn join_column(mut self) -> Self {
        self.use_join_table = Some(false);
        self
    }

    #[must_use]
    pub fn morph_by(mut self, attribute: impl Into<String>) -> Self {
        self.morph_by = Some(attribute.into());
        self
    }

    /// A relation owns the physical linkage unless it is the `mapped_by`
    /// side of a bidirectional pair.
    #[must_use]
    pub const fn is_owning(&self) -> bool {
        self.mapped_by.is_none()
    }

    #[must_use]
    pub const fn is_bidirectional(&self) -> bool {
        self.inversed_by.is_some() || self.mapped_by.is_some()
    }

    #[must_use]
    pub fn prefers_join_table(&self) -> bool {
        self.use_join_table.unwrap_or(true)
    }
}
