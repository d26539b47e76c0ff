//! Row-store boundary.
//!
//! The repository assumes an underlying store with snapshot
//! transactions, single-table CRUD by primary key, and conjunctive
//! filtered scans. [`MemoryRowStore`] is the bundled engine; anything
//! satisfying [`RowStore`] plugs in the same way.

pub mod memory;

pub use memory::MemoryRowStore;

use crate::{
    entry::Entry,
    error::{Error, ErrorClass, ErrorOrigin},
    types::{DocumentId, EntryId, Locale},
};
use thiserror::Error as ThisError;

///
/// StoreError
///
/// Raw storage failures. Mapped into the domain taxonomy at this
/// boundary; callers above the store never see these directly.
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("row '{id}' not found in table '{table}'")]
    RowNotFound { table: String, id: EntryId },

    #[error("row '{id}' already exists in table '{table}'")]
    DuplicateRow { table: String, id: EntryId },

    #[error("transaction conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::RowNotFound { .. } | Self::TableNotFound(_) => ErrorClass::NotFound,
            Self::Conflict(_) | Self::DuplicateRow { .. } => ErrorClass::Conflict,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::new(err.class(), ErrorOrigin::Store, err.to_string())
    }
}

///
/// LocaleLookup
///

#[derive(Clone, Debug, PartialEq)]
pub enum LocaleLookup {
    /// Exact match, including the non-localized `None` column value.
    Is(Option<Locale>),
    In(Vec<Locale>),
}

///
/// Lookup
///
/// Conjunctive row filter produced by the query transform pipeline.
/// Every populated clause must hold for a row to match.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Lookup {
    pub document_id: Option<DocumentId>,
    pub document_id_in: Option<Vec<DocumentId>>,
    pub locale: Option<LocaleLookup>,
    /// `Some(true)` selects published rows, `Some(false)` drafts.
    pub published: Option<bool>,
    /// Scalar equality clauses against the JSON payload.
    pub fields: Vec<(String, serde_json::Value)>,
}

impl Lookup {
    #[must_use]
    pub fn by_document(document_id: DocumentId) -> Self {
        Self {
            document_id: Some(document_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, entry: &Entry) -> bool {
        if let Some(document_id) = self.document_id {
            if entry.document_id != document_id {
                return false;
            }
        }
        if let Some(ids) = &self.document_id_in {
            if !ids.contains(&entry.document_id) {
                return false;
            }
        }
        if let Some(locale) = &self.locale {
            let matched = match locale {
                LocaleLookup::Is(value) => entry.locale == *value,
                LocaleLookup::In(values) => entry
                    .locale
                    .as_ref()
                    .is_some_and(|locale| values.contains(locale)),
            };
            if !matched {
                return false;
            }
        }
        if let Some(published) = self.published {
            if entry.is_published() != published {
                return false;
            }
        }
        self.fields
            .iter()
            .all(|(name, value)| entry.data.get(name) == Some(value))
    }
}

///
/// StoreTx
///
/// One transaction over the store. Dropping a transaction without
/// committing rolls back everything written through it.
///

pub trait StoreTx {
    fn insert(&mut self, table: &str, row: Entry) -> Result<(), Error>;

    fn update(&mut self, table: &str, row: Entry) -> Result<(), Error>;

    /// Remove a row, returning its last image.
    fn delete(&mut self, table: &str, id: EntryId) -> Result<Entry, Error>;

    fn get(&self, table: &str, id: EntryId) -> Result<Option<Entry>, Error>;

    /// All rows of a table matching the lookup, in primary-key order.
    fn scan(&self, table: &str, lookup: &Lookup) -> Result<Vec<Entry>, Error>;

    /// Make every write visible atomically.
    fn commit(self) -> Result<(), Error>;
}

///
/// RowStore
///

pub trait RowStore {
    type Tx: StoreTx;

    fn begin(&self) -> Result<Self::Tx, Error>;
}
