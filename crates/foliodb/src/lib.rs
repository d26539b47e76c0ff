//! ## Crate layout
//! - `schema`: schema AST, registry, and relation metadata derivation.
//! - `core`: row-store boundary, query transforms, entry persistence,
//!   and the document repository.
//!
//! The `prelude` module mirrors the surface a host application uses to
//! register schemas and drive document operations.

pub use foliodb_core as core;
pub use foliodb_schema as schema;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::{
        document::{DocumentRepository, DocumentResult, RepositoryOptions},
        entry::{Entry, JsonMap},
        error::{Error, ErrorClass, ErrorOrigin},
        event::{Event, EventAction, EventSink, NullSink, RecordingSink},
        query::{LocaleParam, Params, Populate},
        store::{Lookup, MemoryRowStore, RowStore as _, StoreTx as _},
        types::{DocumentId, EntryId, Locale, Status, Timestamp},
    };
    pub use crate::schema::{
        node::{Attribute, Component, ContentType, RelationDescriptor},
        registry::{ResolvedRegistry, SchemaRegistry},
        types::{RelationKind, ScalarKind, SchemaRef},
    };
    pub use serde_json::json;
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use serde_json::Value;

    // End-to-end smoke test over the public surface: register, resolve,
    // create, publish, read back.
    #[test]
    fn register_resolve_and_round_trip_a_document() {
        let mut registry = SchemaRegistry::new().default_locale("en");
        registry
            .register_content_type(
                "api::note",
                ContentType::new("notes")
                    .attribute("body", Attribute::Scalar(ScalarKind::Text)),
            )
            .expect("note should register");
        let registry = registry.resolve().expect("registry should resolve");

        let repository = DocumentRepository::new(MemoryRowStore::new(), registry);

        let Value::Object(payload) = json!({ "body": "hello" }) else {
            unreachable!();
        };
        let created = repository
            .create(&SchemaRef::new("api::note"), Params::new().with_data(payload))
            .expect("create should succeed");
        repository
            .publish(&SchemaRef::new("api::note"), created.document_id, None)
            .expect("publish should succeed");

        let found = repository
            .find_one(
                &SchemaRef::new("api::note"),
                created.document_id,
                Params::new().with_status(Status::Published),
            )
            .expect("read should succeed")
            .expect("published entry should exist");
        assert_eq!(found.field("body"), Some(&json!("hello")));
    }
}
