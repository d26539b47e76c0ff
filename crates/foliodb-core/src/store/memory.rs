//! In-memory row store with snapshot transactions.
//!
//! A transaction clones the table map, applies writes to the clone, and
//! swaps it back on commit if no other transaction committed in
//! between. All fallible checks happen against the working copy; the
//! swap itself cannot fail halfway, so readers never observe a partial
//! operation.

use crate::{
    entry::Entry,
    error::{Error, ErrorOrigin},
    store::{Lookup, RowStore, StoreError, StoreTx},
    types::EntryId,
};
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

type Tables = BTreeMap<String, BTreeMap<EntryId, Entry>>;

#[derive(Debug, Default)]
struct Shared {
    tables: Tables,
    version: u64,
}

///
/// MemoryRowStore
///

#[derive(Clone, Debug, Default)]
pub struct MemoryRowStore {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryRowStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Shared>, Error> {
        self.shared
            .lock()
            .map_err(|_| Error::internal(ErrorOrigin::Store, "row store mutex poisoned"))
    }

    /// Number of rows currently committed to a table.
    pub fn table_len(&self, table: &str) -> Result<usize, Error> {
        Ok(self.lock()?.tables.get(table).map_or(0, BTreeMap::len))
    }
}

impl RowStore for MemoryRowStore {
    type Tx = MemoryTx;

    fn begin(&self) -> Result<MemoryTx, Error> {
        let shared = self.lock()?;
        Ok(MemoryTx {
            store: self.clone(),
            working: shared.tables.clone(),
            base_version: shared.version,
        })
    }
}

///
/// MemoryTx
///

#[derive(Debug)]
pub struct MemoryTx {
    store: MemoryRowStore,
    working: Tables,
    base_version: u64,
}

impl StoreTx for MemoryTx {
    fn insert(&mut self, table: &str, row: Entry) -> Result<(), Error> {
        let rows = self.working.entry(table.to_string()).or_default();
        if rows.contains_key(&row.id) {
            return Err(StoreError::DuplicateRow {
                table: table.to_string(),
                id: row.id,
            }
            .into());
        }
        rows.insert(row.id, row);
        Ok(())
    }

    fn update(&mut self, table: &str, row: Entry) -> Result<(), Error> {
        let rows = self
            .working
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        if !rows.contains_key(&row.id) {
            return Err(StoreError::RowNotFound {
                table: table.to_string(),
                id: row.id,
            }
            .into());
        }
        rows.insert(row.id, row);
        Ok(())
    }

    fn delete(&mut self, table: &str, id: EntryId) -> Result<Entry, Error> {
        let rows = self
            .working
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;
        rows.remove(&id).ok_or_else(|| {
            StoreError::RowNotFound {
                table: table.to_string(),
                id,
            }
            .into()
        })
    }

    fn get(&self, table: &str, id: EntryId) -> Result<Option<Entry>, Error> {
        Ok(self
            .working
            .get(table)
            .and_then(|rows| rows.get(&id))
            .cloned())
    }

    fn scan(&self, table: &str, lookup: &Lookup) -> Result<Vec<Entry>, Error> {
        Ok(self
            .working
            .get(table)
            .map(|rows| {
                rows.values()
                    .filter(|entry| lookup.matches(entry))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn commit(self) -> Result<(), Error> {
        let mut shared = self.store.lock()?;
        if shared.version != self.base_version {
            return Err(StoreError::Conflict(format!(
                "store advanced from version {} to {} during the transaction",
                self.base_version, shared.version
            ))
            .into());
        }
        shared.tables = self.working;
        shared.version += 1;
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::MemoryRowStore;
    use crate::{
        entry::Entry,
        store::{Lookup, RowStore, StoreTx},
        types::{DocumentId, EntryId, Timestamp},
    };

    fn row() -> Entry {
        Entry {
            id: EntryId::generate(),
            document_id: DocumentId::generate(),
            locale: None,
            published_at: None,
            created_at: Timestamp::now(),
            updated_at: Timestamp::now(),
            data: serde_json::Map::new(),
        }
    }

    #[test]
    fn committed_writes_become_visible() {
        let store = MemoryRowStore::new();
        let entry = row();

        let mut tx = store.begin().expect("begin should succeed");
        tx.insert("articles", entry.clone()).expect("insert should succeed");
        tx.commit().expect("commit should succeed");

        let tx = store.begin().expect("begin should succeed");
        let found = tx.get("articles", entry.id).expect("get should succeed");
        assert_eq!(found, Some(entry));
    }

    #[test]
    fn dropped_transactions_roll_back() {
        let store = MemoryRowStore::new();

        {
            let mut tx = store.begin().expect("begin should succeed");
            tx.insert("articles", row()).expect("insert should succeed");
            // dropped without commit
        }

        assert_eq!(store.table_len("articles").expect("len should succeed"), 0);
    }

    #[test]
    fn concurrent_commits_conflict() {
        let store = MemoryRowStore::new();

        let mut first = store.begin().expect("begin should succeed");
        let mut second = store.begin().expect("begin should succeed");
        first.insert("articles", row()).expect("insert should succeed");
        second.insert("articles", row()).expect("insert should succeed");

        first.commit().expect("first commit should succeed");
        let err = second.commit().expect_err("second commit must conflict");
        assert!(err.is_conflict());
    }

    #[test]
    fn duplicate_insert_is_a_conflict() {
        let store = MemoryRowStore::new();
        let entry = row();

        let mut tx = store.begin().expect("begin should succeed");
        tx.insert("articles", entry.clone()).expect("insert should succeed");
        let err = tx.insert("articles", entry).expect_err("duplicate must fail");
        assert!(err.is_conflict());
    }

    #[test]
    fn scans_filter_by_lookup() {
        let store = MemoryRowStore::new();
        let keep = row();
        let drop = row();

        let mut tx = store.begin().expect("begin should succeed");
        tx.insert("articles", keep.clone()).expect("insert should succeed");
        tx.insert("articles", drop).expect("insert should succeed");

        let found = tx
            .scan("articles", &Lookup::by_document(keep.document_id))
            .expect("scan should succeed");
        assert_eq!(found, vec![keep]);
    }
}
