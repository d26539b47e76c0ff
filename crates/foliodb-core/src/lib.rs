//! Runtime: row-store boundary, query transform pipeline, entry
//! persistence, and the document repository.
//!
//! A document is a logical record addressed by a stable `DocumentId`;
//! each (locale, draft/published) combination of it is one physical
//! [`entry::Entry`]. The [`document::DocumentRepository`] orchestrates
//! those rows per operation inside a single store transaction and emits
//! lifecycle events strictly after commit.

pub mod document;
pub mod entries;
pub mod entry;
pub mod error;
pub mod event;
pub mod query;
pub mod store;
pub mod types;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        document::{DocumentRepository, DocumentResult, RepositoryOptions},
        entry::{Entry, JsonMap},
        error::{Error, ErrorClass, ErrorOrigin},
        event::{Event, EventAction, EventSink, NullSink, RecordingSink},
        query::{LocaleParam, Params},
        store::{Lookup, MemoryRowStore, RowStore, StoreTx},
        types::{DocumentId, EntryId, Locale, Status, Timestamp},
    };
}
