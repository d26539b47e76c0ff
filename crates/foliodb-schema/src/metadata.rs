//! Physical join metadata produced by the relation builder.
//!
//! All names here are deterministic functions of (source table, attribute
//! name, target table). Resolving the same registry twice yields
//! byte-identical names, which is what makes re-registration and
//! hot-reload safe.

use convert_case::{Case, Casing};
use serde::Serialize;

/// Primary-key column shared by every physical table.
pub const ID_COLUMN: &str = "id";

/// Discriminator column on morph join tables.
pub const MORPH_TYPE_COLUMN: &str = "morph_type";

/// Foreign-id column on morph join tables.
pub const MORPH_ID_COLUMN: &str = "morph_id";

///
/// JoinColumn
///
/// Foreign-key column on the owning side of a *-to-one relation stored
/// without a join table.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct JoinColumn {
    pub name: String,
    pub referenced_column: String,
    pub referenced_table: String,
}

impl JoinColumn {
    #[must_use]
    pub fn referencing(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            referenced_column: ID_COLUMN.to_string(),
            referenced_table: table.into(),
        }
    }
}

///
/// JoinTable
///
/// Synthetic two-column link table. To-many sides always carry an order
/// column so insertion order is retrievable.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct JoinTable {
    pub name: String,
    pub join_column: JoinColumn,
    pub inverse_join_column: JoinColumn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inverse_order_column: Option<String>,
    pub pivot_columns: Vec<String>,
}

impl JoinTable {
    /// The same table as seen from the non-owning side: join and inverse
    /// roles swapped, order columns swapped with them.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            name: self.name.clone(),
            join_column: self.inverse_join_column.clone(),
            inverse_join_column: self.join_column.clone(),
            order_column: self.inverse_order_column.clone(),
            inverse_order_column: self.order_column.clone(),
            pivot_columns: self
                .pivot_columns
                .iter()
                .rev()
                .cloned()
                .collect(),
        }
    }
}

///
/// MorphColumns
///
/// Type + id column pair attached directly to the declaring table for
/// morph-to-one relations.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MorphColumns {
    pub type_column: String,
    pub id_column: String,
}

///
/// MorphJoinTable
///
/// Join table variant carrying a type discriminator so each row may
/// point at a different target schema.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MorphJoinTable {
    pub name: String,
    pub join_column: JoinColumn,
    pub morph_columns: MorphColumns,
    pub order_column: String,
    pub pivot_columns: Vec<String>,
}

///
/// RelationMetadata
///
/// Fully-resolved physical linkage for one relation attribute. The
/// `Inverse*` variants are the mirrored view attached to the non-owning
/// side of a bidirectional pair; both sides always agree on the
/// underlying table and columns.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum RelationMetadata {
    JoinColumn(JoinColumn),
    InverseJoinColumn(JoinColumn),
    JoinTable(JoinTable),
    InverseJoinTable(JoinTable),
    MorphColumns(MorphColumns),
    MorphJoinTable(MorphJoinTable),
}

impl RelationMetadata {
    /// The owning side physically stores the linkage.
    #[must_use]
    pub const fn is_owner(&self) -> bool {
        matches!(
            self,
            Self::JoinColumn(_)
                | Self::JoinTable(_)
                | Self::MorphColumns(_)
                | Self::MorphJoinTable(_)
        )
    }

    #[must_use]
    pub const fn join_table(&self) -> Option<&JoinTable> {
        match self {
            Self::JoinTable(table) | Self::InverseJoinTable(table) => Some(table),
            Self::InverseJoinColumn(_)
            | Self::JoinColumn(_)
            | Self::MorphColumns(_)
            | Self::MorphJoinTable(_) => None,
        }
    }

    #[must_use]
    pub const fn join_column(&self) -> Option<&JoinColumn> {
        match self {
            Self::InverseJoinColumn(column) | Self::JoinColumn(column) => Some(column),
            Self::InverseJoinTable(_)
            | Self::JoinTable(_)
            | Self::MorphColumns(_)
            | Self::MorphJoinTable(_) => None,
        }
    }
}

///
/// SyntheticTable
///
/// A table definition created by the builder rather than declared by a
/// schema, registered into the resolved registry by name.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub enum SyntheticTable {
    Join(JoinTable),
    Morph(MorphJoinTable),
}

impl SyntheticTable {
    #[must_use]
    pub const fn name(&self) -> &String {
        match self {
            Self::Join(table) => &table.name,
            Self::Morph(table) => &table.name,
        }
    }
}

// ----------------------------------------------------------------------
// Naming
// ----------------------------------------------------------------------

/// Deterministic join-table name for (source table, attribute).
#[must_use]
pub fn join_table_name(source_table: &str, attribute: &str) -> String {
    format!("{source_table}_{}_links", attribute.to_case(Case::Snake))
}

/// Deterministic morph join-table name for (source table, attribute).
#[must_use]
pub fn morph_table_name(source_table: &str, attribute: &str) -> String {
    format!("{source_table}_{}_morphs", attribute.to_case(Case::Snake))
}

/// Foreign-key column for an attribute stored as a join column.
#[must_use]
pub fn fk_column_name(attribute: &str) -> String {
    format!("{}_id", attribute.to_case(Case::Snake))
}

/// Id column referencing a given table from inside a join table.
#[must_use]
pub fn table_id_column(table: &str) -> String {
    format!("{table}_id")
}

/// Order column recording the declared position of a to-many attribute.
#[must_use]
pub fn order_column_name(attribute: &str) -> String {
    format!("{}_order", attribute.to_case(Case::Snake))
}

/// Rename used when a self-referencing relation would otherwise produce
/// colliding column names.
#[must_use]
pub fn inverse_name(name: &str) -> String {
    format!("inv_{name}")
}
