//! Single-row persistence primitives.
//!
//! The repository treats each of these as atomic: every method runs
//! inside the caller's transaction and recursively persists or deletes
//! the component and dynamic-zone rows hanging off the entry payload.
//! Copies (publish, discard, clone) always re-create component rows
//! with fresh ids so versions never alias nested content.

use crate::{
    entry::{Entry, JsonMap},
    error::{Error, ErrorOrigin},
    query::populate::COMPONENT_KEY,
    store::StoreTx,
    types::{DocumentId, EntryId, Locale, Timestamp},
};
use foliodb_schema::{
    node::Attribute,
    registry::{ResolvedRegistry, ResolvedSchema},
    types::SchemaRef,
};
use serde_json::Value;

/// Payload keys managed by the engine, stripped from caller data before
/// any insert or merge.
const SYSTEM_FIELDS: &[&str] = &[
    "id",
    "document_id",
    "status",
    "published_at",
    "created_at",
    "updated_at",
];

///
/// NewEntry
///

#[derive(Clone, Debug)]
pub struct NewEntry {
    pub document_id: DocumentId,
    pub locale: Option<Locale>,
    pub published_at: Option<Timestamp>,
    pub data: JsonMap,
}

///
/// EntryService
///

#[derive(Clone, Copy)]
pub struct EntryService<'a> {
    registry: &'a ResolvedRegistry,
}

impl<'a> EntryService<'a> {
    #[must_use]
    pub const fn new(registry: &'a ResolvedRegistry) -> Self {
        Self { registry }
    }

    /// Insert a fresh entry row, persisting nested component values into
    /// their own tables first.
    pub fn create<T: StoreTx>(
        &self,
        tx: &mut T,
        schema: &ResolvedSchema,
        input: NewEntry,
    ) -> Result<Entry, Error> {
        let mut data = input.data;
        strip_system_fields(&mut data);

        // The pipeline copies the resolved locale into the payload; lift
        // it back out into the locale column.
        let locale = match data.remove("locale") {
            Some(Value::String(locale)) => Some(Locale::new(locale)),
            _ => input.locale,
        };

        self.persist_components(tx, schema, input.document_id, &mut data)?;

        let now = Timestamp::now();
        let entry = Entry {
            id: EntryId::generate(),
            document_id: input.document_id,
            locale,
            published_at: input.published_at,
            created_at: now,
            updated_at: now,
            data,
        };
        tx.insert(&schema.table, entry.clone())?;

        Ok(entry)
    }

    /// Merge new data over an existing entry. Component values present
    /// in the new data replace the old rows wholesale.
    pub fn update<T: StoreTx>(
        &self,
        tx: &mut T,
        schema: &ResolvedSchema,
        mut entry: Entry,
        data: JsonMap,
    ) -> Result<Entry, Error> {
        let mut data = data;
        strip_system_fields(&mut data);
        data.remove("locale");

        // Drop replaced component rows before persisting their successors.
        for name in data.keys() {
            if let Some(old_value) = entry.data.get(name) {
                self.delete_component_value(tx, schema, name, old_value)?;
            }
        }

        self.persist_components(tx, schema, entry.document_id, &mut data)?;

        for (name, value) in data {
            entry.data.insert(name, value);
        }
        entry.updated_at = Timestamp::now();
        tx.update(&schema.table, entry.clone())?;

        Ok(entry)
    }

    /// Delete an entry and cascade into its component rows.
    pub fn delete<T: StoreTx>(
        &self,
        tx: &mut T,
        schema: &ResolvedSchema,
        entry: &Entry,
    ) -> Result<(), Error> {
        for (name, value) in &entry.data {
            self.delete_component_value(tx, schema, name, value)?;
        }
        tx.delete(&schema.table, entry.id)?;
        Ok(())
    }

    /// Create the published twin of a draft: same document and locale,
    /// deep-copied content, fresh component rows.
    pub fn publish<T: StoreTx>(
        &self,
        tx: &mut T,
        schema: &ResolvedSchema,
        draft: &Entry,
    ) -> Result<Entry, Error> {
        let data = self.materialize_data(tx, schema, &draft.data)?;
        self.create(
            tx,
            schema,
            NewEntry {
                document_id: draft.document_id,
                locale: draft.locale.clone(),
                published_at: Some(Timestamp::now()),
                data,
            },
        )
    }

    /// Recreate a draft from the published content.
    pub fn discard<T: StoreTx>(
        &self,
        tx: &mut T,
        schema: &ResolvedSchema,
        published: &Entry,
    ) -> Result<Entry, Error> {
        let data = self.materialize_data(tx, schema, &published.data)?;
        self.create(
            tx,
            schema,
            NewEntry {
                document_id: published.document_id,
                locale: published.locale.clone(),
                published_at: None,
                data,
            },
        )
    }

    /// Resolve component references back into raw nested values with the
    /// ids stripped, so a re-persist allocates fresh rows.
    pub fn materialize_data<T: StoreTx>(
        &self,
        tx: &T,
        schema: &ResolvedSchema,
        data: &JsonMap,
    ) -> Result<JsonMap, Error> {
        let mut materialized = JsonMap::new();

        for (name, value) in data {
            let resolved = match schema.attribute(name).map(|a| &a.attribute) {
                Some(Attribute::Component(component)) => {
                    self.materialize_value(tx, &component.component, value)?
                }
                Some(Attribute::DynamicZone(_)) => self.materialize_zone(tx, value)?,
                _ => value.clone(),
            };
            materialized.insert(name.clone(), resolved);
        }

        Ok(materialized)
    }

    fn materialize_value<T: StoreTx>(
        &self,
        tx: &T,
        component: &SchemaRef,
        value: &Value,
    ) -> Result<Value, Error> {
        match value {
            Value::Object(reference) => self.materialize_row(tx, component, reference, None),
            Value::Array(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    if let Value::Object(reference) = item {
                        resolved.push(self.materialize_row(tx, component, reference, None)?);
                    }
                }
                Ok(Value::Array(resolved))
            }
            other => Ok(other.clone()),
        }
    }

    fn materialize_zone<T: StoreTx>(&self, tx: &T, value: &Value) -> Result<Value, Error> {
        let Value::Array(items) = value else {
            return Ok(value.clone());
        };

        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            let Value::Object(reference) = item else {
                continue;
            };
            let Some(component) = reference.get(COMPONENT_KEY).and_then(Value::as_str) else {
                continue;
            };
            let component = SchemaRef::new(component);
            resolved.push(self.materialize_row(
                tx,
                &component,
                reference,
                Some(component.as_str()),
            )?);
        }
        Ok(Value::Array(resolved))
    }

    // Inline one component row's content, recursively, without its id.
    fn materialize_row<T: StoreTx>(
        &self,
        tx: &T,
        component: &SchemaRef,
        reference: &JsonMap,
        discriminator: Option<&str>,
    ) -> Result<Value, Error> {
        let schema = self.registry.schema(component)?;

        let Some(id) = reference.get("id").and_then(Value::as_str) else {
            // Raw (never persisted) value: keep as-is.
            return Ok(Value::Object(reference.clone()));
        };
        let id = EntryId::parse(id)?;

        let Some(row) = tx.get(&schema.table, id)? else {
            return Err(Error::invariant(
                ErrorOrigin::Entry,
                format!("component row '{id}' missing from '{}'", schema.table),
            ));
        };

        let mut inlined = self.materialize_data(tx, schema, &row.data)?;
        if let Some(discriminator) = discriminator {
            inlined.insert(
                COMPONENT_KEY.to_string(),
                Value::String(discriminator.to_string()),
            );
        }
        Ok(Value::Object(inlined))
    }

    // Persist raw component/zone values into their tables, replacing the
    // payload values with row references.
    fn persist_components<T: StoreTx>(
        &self,
        tx: &mut T,
        schema: &ResolvedSchema,
        document_id: DocumentId,
        data: &mut JsonMap,
    ) -> Result<(), Error> {
        // Walk the attribute map rather than the payload so unknown keys
        // pass through untouched.
        let component_attrs: Vec<(String, Attribute)> = schema
            .attributes
            .iter()
            .filter(|(_, resolved)| {
                matches!(
                    resolved.attribute,
                    Attribute::Component(_) | Attribute::DynamicZone(_)
                )
            })
            .map(|(name, resolved)| (name.clone(), resolved.attribute.clone()))
            .collect();

        for (name, attribute) in component_attrs {
            let Some(value) = data.get_mut(&name) else {
                continue;
            };

            match attribute {
                Attribute::Component(component) => {
                    self.persist_value(tx, &component.component, document_id, value)?;
                }
                Attribute::DynamicZone(_) => {
                    self.persist_zone(tx, document_id, value)?;
                }
                Attribute::Relation(_) | Attribute::Scalar(_) => {}
            }
        }

        Ok(())
    }

    fn persist_value<T: StoreTx>(
        &self,
        tx: &mut T,
        component: &SchemaRef,
        document_id: DocumentId,
        value: &mut Value,
    ) -> Result<(), Error> {
        match value {
            Value::Object(raw) => {
                *value = self.persist_row(tx, component, document_id, raw.clone(), None)?;
            }
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(raw) = item {
                        *item = self.persist_row(tx, component, document_id, raw.clone(), None)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn persist_zone<T: StoreTx>(
        &self,
        tx: &mut T,
        document_id: DocumentId,
        value: &mut Value,
    ) -> Result<(), Error> {
        let Value::Array(items) = value else {
            return Ok(());
        };

        for item in items {
            let Value::Object(raw) = item else {
                continue;
            };
            let Some(component) = raw.get(COMPONENT_KEY).and_then(Value::as_str) else {
                return Err(Error::validation(
                    ErrorOrigin::Entry,
                    format!("dynamic zone entries require a '{COMPONENT_KEY}' discriminator"),
                ));
            };
            let component = SchemaRef::new(component);
            let discriminator = component.as_str().to_string();
            *item = self.persist_row(tx, &component, document_id, raw.clone(), Some(&discriminator))?;
        }
        Ok(())
    }

    // Insert one component row (recursing into nested components) and
    // return the reference that replaces the raw value.
    fn persist_row<T: StoreTx>(
        &self,
        tx: &mut T,
        component: &SchemaRef,
        document_id: DocumentId,
        mut raw: JsonMap,
        discriminator: Option<&str>,
    ) -> Result<Value, Error> {
        let schema = self.registry.schema(component)?;

        // An already-persisted reference stays a reference.
        if raw.len() <= 2 && raw.contains_key("id") {
            return Ok(Value::Object(raw));
        }

        raw.remove("id");
        raw.remove(COMPONENT_KEY);
        self.persist_components(tx, schema, document_id, &mut raw)?;

        let now = Timestamp::now();
        let row = Entry {
            id: EntryId::generate(),
            document_id,
            locale: None,
            published_at: None,
            created_at: now,
            updated_at: now,
            data: raw,
        };
        tx.insert(&schema.table, row.clone())?;

        let mut reference = JsonMap::new();
        reference.insert("id".to_string(), Value::String(row.id.to_string()));
        if let Some(discriminator) = discriminator {
            reference.insert(
                COMPONENT_KEY.to_string(),
                Value::String(discriminator.to_string()),
            );
        }
        Ok(Value::Object(reference))
    }

    // Cascade-delete the component rows referenced by one attribute
    // value. Missing rows are tolerated so deletes stay idempotent.
    fn delete_component_value<T: StoreTx>(
        &self,
        tx: &mut T,
        schema: &ResolvedSchema,
        attribute: &str,
        value: &Value,
    ) -> Result<(), Error> {
        match schema.attribute(attribute).map(|a| &a.attribute) {
            Some(Attribute::Component(component)) => {
                let component = component.component.clone();
                self.delete_references(tx, Some(&component), value)
            }
            Some(Attribute::DynamicZone(_)) => self.delete_references(tx, None, value),
            _ => Ok(()),
        }
    }

    fn delete_references<T: StoreTx>(
        &self,
        tx: &mut T,
        component: Option<&SchemaRef>,
        value: &Value,
    ) -> Result<(), Error> {
        match value {
            Value::Object(reference) => self.delete_row(tx, component, reference),
            Value::Array(items) => {
                for item in items {
                    if let Value::Object(reference) = item {
                        self.delete_row(tx, component, reference)?;
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn delete_row<T: StoreTx>(
        &self,
        tx: &mut T,
        component: Option<&SchemaRef>,
        reference: &JsonMap,
    ) -> Result<(), Error> {
        // Zone references carry their own discriminator.
        let resolved;
        let component = match component {
            Some(component) => component,
            None => {
                let Some(discriminator) = reference.get(COMPONENT_KEY).and_then(Value::as_str)
                else {
                    return Ok(());
                };
                resolved = SchemaRef::new(discriminator);
                &resolved
            }
        };

        let Some(id) = reference.get("id").and_then(Value::as_str) else {
            return Ok(());
        };
        let Ok(id) = EntryId::parse(id) else {
            return Ok(());
        };

        let schema = self.registry.schema(component)?;
        let Some(row) = tx.get(&schema.table, id)? else {
            return Ok(());
        };

        // Nested components first, then the row itself.
        for (name, value) in &row.data {
            self.delete_component_value(tx, schema, name, value)?;
        }
        tx.delete(&schema.table, id)?;

        Ok(())
    }
}

// Remove engine-managed keys from caller payloads.
fn strip_system_fields(data: &mut JsonMap) {
    for field in SYSTEM_FIELDS {
        data.remove(*field);
    }
}
