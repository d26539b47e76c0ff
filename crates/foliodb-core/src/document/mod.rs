//! Document repository.
//!
//! Atomicity invariant:
//! every operation resolves its inputs through the transform pipeline,
//! opens exactly one store transaction, applies all writes through the
//! entry service, and commits before any event leaves the buffer. An
//! error anywhere drops the transaction (rollback) and the buffered
//! events with it; readers never observe a partial operation.


use crate::{
    entries::{EntryService, NewEntry},
    entry::Entry,
    error::{Error, ErrorClass, ErrorOrigin},
    event::{EventAction, EventBuffer, EventSink, NullSink},
    query::{self, LocaleParam, Params, PipelineCtx, populate},
    store::{LocaleLookup, Lookup, RowStore, StoreTx},
    types::{DocumentId, Locale, Status, Timestamp},
};
use foliodb_schema::{
    registry::{ResolvedRegistry, ResolvedSchema},
    types::SchemaRef,
};

/// Default cap on related records resolved per populated field.
pub const DEFAULT_POPULATE_PAGE_SIZE: usize = 100;

///
/// RepositoryOptions
///

#[derive(Clone, Copy, Debug)]
pub struct RepositoryOptions {
    pub populate_page_size: usize,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            populate_page_size: DEFAULT_POPULATE_PAGE_SIZE,
        }
    }
}

///
/// DocumentResult
///

#[derive(Clone, Debug)]
pub struct DocumentResult {
    pub document_id: DocumentId,
    pub entries: Vec<Entry>,
}

///
/// DocumentRepository
///

pub struct DocumentRepository<S: RowStore> {
    store: S,
    registry: ResolvedRegistry,
    sink: Box<dyn EventSink>,
    options: RepositoryOptions,
}

impl<S: RowStore> DocumentRepository<S> {
    #[must_use]
    pub fn new(store: S, registry: ResolvedRegistry) -> Self {
        Self {
            store,
            registry,
            sink: Box::new(NullSink),
            options: RepositoryOptions::default(),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    #[must_use]
    pub const fn with_options(mut self, options: RepositoryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &ResolvedRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Full populate tree for a content type, for callers that want
    /// deep-populated reads.
    pub fn populate_tree(&self, path: &SchemaRef) -> Result<populate::Populate, Error> {
        let schema = self.content_type(path)?;
        let mut visiting = Vec::new();
        populate::build_tree(
            &self.registry,
            schema,
            self.options.populate_page_size,
            &mut visiting,
        )
    }

    fn content_type(&self, path: &SchemaRef) -> Result<&ResolvedSchema, Error> {
        Ok(self.registry.content_type(path)?)
    }

    const fn ctx<'a>(&'a self, schema: &'a ResolvedSchema) -> PipelineCtx<'a> {
        PipelineCtx {
            registry: &self.registry,
            schema,
            default_page_size: self.options.populate_page_size,
        }
    }

    // ─────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────

    pub fn find_many(&self, path: &SchemaRef, params: Params) -> Result<Vec<Entry>, Error> {
        let schema = self.content_type(path)?;
        let params = query::apply(&self.ctx(schema), query::READ, params)?;

        let tx = self.store.begin()?;
        let mut entries = tx.scan(&schema.table, &params.lookup)?;

        if let Some(tree) = &params.populate {
            populate::apply_populate(&tx, &self.registry, &mut entries, tree)?;
        }
        project_fields(&mut entries, params.fields.as_deref());

        Ok(entries)
    }

    pub fn find_first(&self, path: &SchemaRef, params: Params) -> Result<Option<Entry>, Error> {
        Ok(self.find_many(path, params)?.into_iter().next())
    }

    pub fn find_one(
        &self,
        path: &SchemaRef,
        document_id: DocumentId,
        mut params: Params,
    ) -> Result<Option<Entry>, Error> {
        params.document_id = Some(document_id);
        self.find_first(path, params)
    }

    pub fn count(&self, path: &SchemaRef, params: Params) -> Result<usize, Error> {
        let schema = self.content_type(path)?;
        let params = query::apply(&self.ctx(schema), query::READ, params)?;

        let tx = self.store.begin()?;
        Ok(tx.scan(&schema.table, &params.lookup)?.len())
    }

    // ─────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────

    /// Create a document. The first insert is always a draft; a
    /// requested `published` status chains into publish for the new
    /// document within the same transaction.
    pub fn create(&self, path: &SchemaRef, params: Params) -> Result<DocumentResult, Error> {
        let schema = self.content_type(path)?;
        let params = query::apply(&self.ctx(schema), query::WRITE, params)?;

        let Some(data) = params.data.clone() else {
            return Err(Error::validation(
                ErrorOrigin::Repository,
                "create requires a data payload",
            ));
        };
        let locale = single_locale(schema, &params)?;
        let requested = params.status.unwrap_or_default();
        let versioned = schema.options.draft_and_publish;

        let document_id = params.document_id.unwrap_or_else(DocumentId::generate);
        tracing::debug!(schema = %path, %document_id, "creating document");

        let service = EntryService::new(&self.registry);
        let mut tx = self.store.begin()?;
        let mut events = EventBuffer::new();

        // One draft per (document, locale).
        let duplicate_lookup = Lookup {
            document_id: Some(document_id),
            locale: Some(LocaleLookup::Is(locale.clone())),
            published: versioned.then_some(false),
            ..Lookup::default()
        };
        if !tx.scan(&schema.table, &duplicate_lookup)?.is_empty() {
            return Err(Error::new(
                ErrorClass::Conflict,
                ErrorOrigin::Repository,
                format!("document '{document_id}' already has an entry for this locale"),
            ));
        }

        let entry = service.create(
            &mut tx,
            schema,
            NewEntry {
                document_id,
                locale,
                // Unversioned schemas store every entry as published.
                published_at: (!versioned).then(Timestamp::now),
                data,
            },
        )?;
        events.push(EventAction::Create, path, entry.clone());

        let mut entries = vec![entry];
        if versioned && requested.is_published() {
            let draft_lookup = Lookup {
                document_id: Some(document_id),
                published: Some(false),
                ..Lookup::default()
            };
            entries.extend(self.publish_drafts(&mut tx, &mut events, schema, path, &draft_lookup)?);
        }

        tx.commit()?;
        events.drain_into(self.sink.as_ref());

        Ok(DocumentResult {
            document_id,
            entries,
        })
    }

    /// Update the draft entry for (document, locale). If only a
    /// published entry exists, a fresh draft is materialized from the
    /// payload instead of failing — see [`Self::materialize_draft`].
    pub fn update(
        &self,
        path: &SchemaRef,
        document_id: DocumentId,
        params: Params,
    ) -> Result<DocumentResult, Error> {
        let schema = self.content_type(path)?;
        let params = query::apply(&self.ctx(schema), query::WRITE, params)?;

        let Some(data) = params.data.clone() else {
            return Err(Error::validation(
                ErrorOrigin::Repository,
                "update requires a data payload",
            ));
        };
        let locale = single_locale(schema, &params)?;
        let requested = params.status.unwrap_or_default();
        let versioned = schema.options.draft_and_publish;
        tracing::debug!(schema = %path, %document_id, "updating document");

        let service = EntryService::new(&self.registry);
        let mut tx = self.store.begin()?;
        let mut events = EventBuffer::new();

        let draft_lookup = Lookup {
            document_id: Some(document_id),
            locale: Some(LocaleLookup::Is(locale.clone())),
            published: versioned.then_some(false),
            ..Lookup::default()
        };
        let current = tx.scan(&schema.table, &draft_lookup)?.into_iter().next();

        let entry = if let Some(draft) = current {
            let updated = service.update(&mut tx, schema, draft, data)?;
            events.push(EventAction::Update, path, updated.clone());
            updated
        } else {
            let published_lookup = Lookup {
                published: Some(true),
                ..draft_lookup.clone()
            };
            let published = tx.scan(&schema.table, &published_lookup)?.into_iter().next();
            match published {
                Some(_) if versioned => self.materialize_draft(
                    &mut tx,
                    &mut events,
                    schema,
                    path,
                    document_id,
                    locale,
                    data,
                )?,
                _ => {
                    return Err(Error::not_found(
                        ErrorOrigin::Repository,
                        format!("no entry for document '{document_id}' in this locale"),
                    ));
                }
            }
        };

        let mut entries = vec![entry];
        if versioned && requested.is_published() {
            let chain_lookup = Lookup {
                document_id: Some(document_id),
                locale: entries[0].locale.clone().map(|l| LocaleLookup::Is(Some(l))),
                published: Some(false),
                ..Lookup::default()
            };
            entries.extend(self.publish_drafts(&mut tx, &mut events, schema, path, &chain_lookup)?);
        }

        tx.commit()?;
        events.drain_into(self.sink.as_ref());

        Ok(DocumentResult {
            document_id,
            entries,
        })
    }

    /// Publish the document's drafts, replacing any published twin per
    /// locale. Locales without a draft are silently skipped.
    pub fn publish(
        &self,
        path: &SchemaRef,
        document_id: DocumentId,
        locales: Option<Vec<Locale>>,
    ) -> Result<DocumentResult, Error> {
        let schema = self.require_versioned(path, "publish")?;
        let lookup = self.versions_lookup(schema, document_id, locales)?;
        tracing::debug!(schema = %path, %document_id, "publishing document");

        let mut tx = self.store.begin()?;
        let mut events = EventBuffer::new();

        let draft_lookup = Lookup {
            published: Some(false),
            ..lookup
        };
        let entries = self.publish_drafts(&mut tx, &mut events, schema, path, &draft_lookup)?;

        tx.commit()?;
        events.drain_into(self.sink.as_ref());

        Ok(DocumentResult {
            document_id,
            entries,
        })
    }

    /// Delete published entries for the given locales. Drafts are
    /// untouched.
    pub fn unpublish(
        &self,
        path: &SchemaRef,
        document_id: DocumentId,
        locales: Option<Vec<Locale>>,
    ) -> Result<DocumentResult, Error> {
        let schema = self.require_versioned(path, "unpublish")?;
        let lookup = self.versions_lookup(schema, document_id, locales)?;
        tracing::debug!(schema = %path, %document_id, "unpublishing document");

        let service = EntryService::new(&self.registry);
        let mut tx = self.store.begin()?;
        let mut events = EventBuffer::new();

        let published_lookup = Lookup {
            published: Some(true),
            ..lookup
        };
        let mut entries = Vec::new();
        for entry in tx.scan(&schema.table, &published_lookup)? {
            service.delete(&mut tx, schema, &entry)?;
            events.push(EventAction::Unpublish, path, entry.clone());
            entries.push(entry);
        }

        tx.commit()?;
        events.drain_into(self.sink.as_ref());

        Ok(DocumentResult {
            document_id,
            entries,
        })
    }

    /// Replace each locale's draft with a copy of its published entry.
    /// Locales with no published entry are skipped, not errors.
    pub fn discard_draft(
        &self,
        path: &SchemaRef,
        document_id: DocumentId,
        locales: Option<Vec<Locale>>,
    ) -> Result<DocumentResult, Error> {
        let schema = self.require_versioned(path, "discard_draft")?;
        let lookup = self.versions_lookup(schema, document_id, locales)?;
        tracing::debug!(schema = %path, %document_id, "discarding drafts");

        let service = EntryService::new(&self.registry);
        let mut tx = self.store.begin()?;
        let mut events = EventBuffer::new();

        let published_lookup = Lookup {
            published: Some(true),
            ..lookup
        };
        let mut entries = Vec::new();
        for published in tx.scan(&schema.table, &published_lookup)? {
            let draft_lookup = Lookup {
                document_id: Some(document_id),
                locale: Some(LocaleLookup::Is(published.locale.clone())),
                published: Some(false),
                ..Lookup::default()
            };
            for draft in tx.scan(&schema.table, &draft_lookup)? {
                service.delete(&mut tx, schema, &draft)?;
            }

            let fresh = service.discard(&mut tx, schema, &published)?;
            events.push(EventAction::DraftDiscard, path, fresh.clone());
            entries.push(fresh);
        }

        tx.commit()?;
        events.drain_into(self.sink.as_ref());

        Ok(DocumentResult {
            document_id,
            entries,
        })
    }

    /// Copy a document under a new document id. Nested component rows
    /// are recreated with fresh ids; caller data overrides the copied
    /// payload per field.
    pub fn clone_document(
        &self,
        path: &SchemaRef,
        document_id: DocumentId,
        params: Params,
    ) -> Result<DocumentResult, Error> {
        let schema = self.content_type(path)?;
        let versioned = schema.options.draft_and_publish;
        tracing::debug!(schema = %path, %document_id, "cloning document");

        let service = EntryService::new(&self.registry);
        let mut tx = self.store.begin()?;
        let mut events = EventBuffer::new();

        // Clone sources: the drafts, or the published entries when the
        // schema has no draft dimension.
        let source_lookup = Lookup {
            document_id: Some(document_id),
            published: versioned.then_some(false),
            ..Lookup::default()
        };
        let sources = tx.scan(&schema.table, &source_lookup)?;
        if sources.is_empty() {
            return Err(Error::not_found(
                ErrorOrigin::Repository,
                format!("document '{document_id}' has no entries to clone"),
            ));
        }

        let new_id = DocumentId::generate();
        let mut entries = Vec::with_capacity(sources.len());
        for source in sources {
            let mut data = service.materialize_data(&tx, schema, &source.data)?;
            if let Some(overrides) = &params.data {
                for (key, value) in overrides {
                    data.insert(key.clone(), value.clone());
                }
            }

            let entry = service.create(
                &mut tx,
                schema,
                NewEntry {
                    document_id: new_id,
                    locale: source.locale.clone(),
                    published_at: (!versioned).then(Timestamp::now),
                    data,
                },
            )?;
            events.push(EventAction::Create, path, entry.clone());
            entries.push(entry);
        }

        tx.commit()?;
        events.drain_into(self.sink.as_ref());

        Ok(DocumentResult {
            document_id: new_id,
            entries,
        })
    }

    /// Delete a document's entries across statuses. Targeting only the
    /// draft version is a business-rule violation: a document is deleted
    /// as a whole, not one version of it.
    pub fn delete(
        &self,
        path: &SchemaRef,
        document_id: DocumentId,
        params: Params,
    ) -> Result<DocumentResult, Error> {
        let schema = self.content_type(path)?;

        if params.status == Some(Status::Draft) {
            return Err(Error::validation(
                ErrorOrigin::Repository,
                "cannot delete only the draft version of a document",
            ));
        }
        let published_only =
            params.status == Some(Status::Published) && schema.options.draft_and_publish;

        let mut params = params;
        params.document_id = Some(document_id);
        params.status = None;
        let params = query::apply(&self.ctx(schema), query::VERSIONS, params)?;
        tracing::debug!(schema = %path, %document_id, "deleting document");

        let service = EntryService::new(&self.registry);
        let mut tx = self.store.begin()?;
        let mut events = EventBuffer::new();

        let lookup = Lookup {
            published: published_only.then_some(true),
            ..params.lookup
        };
        let mut entries = Vec::new();
        for entry in tx.scan(&schema.table, &lookup)? {
            service.delete(&mut tx, schema, &entry)?;
            events.push(EventAction::Delete, path, entry.clone());
            entries.push(entry);
        }

        tx.commit()?;
        events.drain_into(self.sink.as_ref());

        Ok(DocumentResult {
            document_id,
            entries,
        })
    }

    // ─────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────

    fn require_versioned(
        &self,
        path: &SchemaRef,
        operation: &str,
    ) -> Result<&ResolvedSchema, Error> {
        let schema = self.content_type(path)?;
        if !schema.options.draft_and_publish {
            return Err(Error::unsupported(
                ErrorOrigin::Repository,
                format!("{operation} requires draft-and-publish on '{path}'"),
            ));
        }
        Ok(schema)
    }

    // Resolve a cross-status locale selection into a storage lookup.
    fn versions_lookup(
        &self,
        schema: &ResolvedSchema,
        document_id: DocumentId,
        locales: Option<Vec<Locale>>,
    ) -> Result<Lookup, Error> {
        let mut params = Params::new();
        params.document_id = Some(document_id);
        params.locale = match locales {
            Some(locales) => LocaleParam::Many(locales),
            None => LocaleParam::All,
        };
        let params = query::apply(&self.ctx(schema), query::VERSIONS, params)?;
        Ok(params.lookup)
    }

    // Publish every draft matched by the lookup, replacing published
    // twins per locale.
    fn publish_drafts<T: StoreTx>(
        &self,
        tx: &mut T,
        events: &mut EventBuffer,
        schema: &ResolvedSchema,
        path: &SchemaRef,
        draft_lookup: &Lookup,
    ) -> Result<Vec<Entry>, Error> {
        let service = EntryService::new(&self.registry);
        let drafts = tx.scan(&schema.table, draft_lookup)?;

        let mut published_entries = Vec::with_capacity(drafts.len());
        for draft in drafts {
            // Replace phase: drop the existing published twin.
            let replace_lookup = Lookup {
                document_id: Some(draft.document_id),
                locale: Some(LocaleLookup::Is(draft.locale.clone())),
                published: Some(true),
                ..Lookup::default()
            };
            for existing in tx.scan(&schema.table, &replace_lookup)? {
                service.delete(tx, schema, &existing)?;
            }

            // Derive phase: new published entry from the draft content.
            let published = service.publish(tx, schema, &draft)?;
            events.push(EventAction::Publish, path, published.clone());
            published_entries.push(published);
        }

        Ok(published_entries)
    }

    // The explicit lazy-materialization path: an update against a
    // published-only (document, locale) creates its draft on the fly.
    #[expect(clippy::too_many_arguments)]
    fn materialize_draft<T: StoreTx>(
        &self,
        tx: &mut T,
        events: &mut EventBuffer,
        schema: &ResolvedSchema,
        path: &SchemaRef,
        document_id: DocumentId,
        locale: Option<Locale>,
        data: crate::entry::JsonMap,
    ) -> Result<Entry, Error> {
        tracing::debug!(
            schema = %path,
            %document_id,
            "materializing draft for published-only document"
        );

        let service = EntryService::new(&self.registry);
        let entry = service.create(
            tx,
            schema,
            NewEntry {
                document_id,
                locale,
                published_at: None,
                data,
            },
        )?;
        events.push(EventAction::Create, path, entry.clone());

        Ok(entry)
    }
}

// Restrict returned payloads to the projected field list; identity
// columns live outside the payload and always survive.
fn project_fields(entries: &mut [Entry], fields: Option<&[String]>) {
    let Some(fields) = fields else {
        return;
    };
    for entry in entries {
        entry
            .data
            .retain(|key, _| fields.iter().any(|field| field == key));
    }
}

// Resolve the single write locale from pipeline output.
fn single_locale(schema: &ResolvedSchema, params: &Params) -> Result<Option<Locale>, Error> {
    if !schema.options.localized {
        return Ok(None);
    }
    match &params.locale {
        LocaleParam::One(locale) => Ok(Some(locale.clone())),
        LocaleParam::Default | LocaleParam::All | LocaleParam::Many(_) => Err(Error::validation(
            ErrorOrigin::Query,
            "write operations require a single locale",
        )),
    }
}
