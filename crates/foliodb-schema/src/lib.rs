//! Schema AST, registry, and relation metadata derivation.
//!
//! A [`registry::SchemaRegistry`] collects content-type and component
//! definitions, then `resolve()` derives the physical join structure for
//! every relation (join columns, join tables, morph tables, ordering
//! columns) and seals the graph into an immutable
//! [`registry::ResolvedRegistry`]. Configuration errors abort resolution;
//! a registry that resolves is guaranteed internally consistent.

pub mod build;
pub mod error;
pub mod metadata;
pub mod node;
pub mod registry;
pub mod types;
pub mod validate;

/// Maximum length for content-type and component identifiers.
pub const MAX_SCHEMA_NAME_LEN: usize = 64;

/// Maximum length for attribute identifiers.
pub const MAX_ATTRIBUTE_NAME_LEN: usize = 64;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        err,
        error::{ErrorTree, SchemaError},
        metadata::{
            JoinColumn, JoinTable, MorphColumns, MorphJoinTable, RelationMetadata, SyntheticTable,
        },
        node::*,
        registry::{ResolvedRegistry, ResolvedSchema, SchemaRegistry},
        types::{RelationKind, ScalarKind, SchemaRef},
    };
    pub use serde::Serialize;
}
