//! Deep populate construction and application.
//!
//! Construction walks the schema recursively and is a pure transform:
//! relations project a minimal allow-listed field set, components
//! recurse into their own schema, and dynamic zones produce one
//! fragment per allowed component type (a discriminated-union
//! populate). Application resolves the tree against a store
//! transaction, bounded per field by the configured page size.

use crate::{
    entry::Entry,
    error::{Error, ErrorOrigin},
    query::{Params, PipelineCtx},
    store::{LocaleLookup, Lookup, StoreTx},
    types::{DocumentId, EntryId},
};
use foliodb_schema::{
    node::Attribute,
    registry::{ResolvedRegistry, ResolvedSchema},
    types::SchemaRef,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// Minimal projection applied to populated relations.
pub const RELATION_FIELDS: &[&str] = &["document_id", "locale", "published_at"];

/// Discriminator key identifying the concrete component of a
/// dynamic-zone value.
pub const COMPONENT_KEY: &str = "__component";

///
/// Populate
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Populate(pub BTreeMap<String, PopulateNode>);

///
/// PopulateNode
///

#[derive(Clone, Debug, PartialEq)]
pub enum PopulateNode {
    Relation {
        target: SchemaRef,
        fields: Vec<String>,
        page_size: usize,
    },
    Component {
        component: SchemaRef,
        populate: Populate,
    },
    DynamicZone {
        fragments: BTreeMap<SchemaRef, Populate>,
    },
}

/// Build the full populate tree for the schema and store it on the
/// params.
pub fn deep_populate(ctx: &PipelineCtx<'_>, mut params: Params) -> Result<Params, Error> {
    let page_size = params.populate_page_size.unwrap_or(ctx.default_page_size);
    let mut visiting = Vec::new();
    params.populate = Some(build_tree(ctx.registry, ctx.schema, page_size, &mut visiting)?);
    Ok(params)
}

/// Recursively derive the populate tree for one schema.
pub fn build_tree(
    registry: &ResolvedRegistry,
    schema: &ResolvedSchema,
    page_size: usize,
    visiting: &mut Vec<SchemaRef>,
) -> Result<Populate, Error> {
    let mut nodes = BTreeMap::new();

    for (name, resolved) in &schema.attributes {
        match &resolved.attribute {
            Attribute::Relation(relation) => {
                // Morph-to relations have no fixed target to populate.
                let Some(target) = &relation.target else {
                    continue;
                };
                nodes.insert(
                    name.clone(),
                    PopulateNode::Relation {
                        target: target.clone(),
                        fields: RELATION_FIELDS.iter().map(ToString::to_string).collect(),
                        page_size,
                    },
                );
            }
            Attribute::Component(component) => {
                let populate =
                    component_tree(registry, &component.component, page_size, visiting)?;
                nodes.insert(
                    name.clone(),
                    PopulateNode::Component {
                        component: component.component.clone(),
                        populate,
                    },
                );
            }
            Attribute::DynamicZone(zone) => {
                let mut fragments = BTreeMap::new();
                for component in &zone.components {
                    let populate = component_tree(registry, component, page_size, visiting)?;
                    fragments.insert(component.clone(), populate);
                }
                nodes.insert(name.clone(), PopulateNode::DynamicZone { fragments });
            }
            Attribute::Scalar(_) => {}
        }
    }

    Ok(Populate(nodes))
}

// Recurse into a component schema, stopping on cycles.
fn component_tree(
    registry: &ResolvedRegistry,
    component: &SchemaRef,
    page_size: usize,
    visiting: &mut Vec<SchemaRef>,
) -> Result<Populate, Error> {
    if visiting.contains(component) {
        return Ok(Populate::default());
    }

    visiting.push(component.clone());
    let schema = registry.schema(component)?;
    let populate = build_tree(registry, schema, page_size, visiting)?;
    visiting.pop();

    Ok(populate)
}

/// Resolve a populate tree against entries already loaded from the
/// store.
pub fn apply_populate<T: StoreTx>(
    tx: &T,
    registry: &ResolvedRegistry,
    entries: &mut [Entry],
    populate: &Populate,
) -> Result<(), Error> {
    for entry in entries.iter_mut() {
        populate_entry(tx, registry, entry, populate)?;
    }
    Ok(())
}

fn populate_entry<T: StoreTx>(
    tx: &T,
    registry: &ResolvedRegistry,
    entry: &mut Entry,
    populate: &Populate,
) -> Result<(), Error> {
    for (name, node) in &populate.0 {
        let Some(value) = entry.data.get(name).cloned() else {
            continue;
        };

        let populated = match node {
            PopulateNode::Relation {
                target,
                fields,
                page_size,
            } => populate_relation(tx, registry, entry, target, fields, *page_size, value)?,
            PopulateNode::Component {
                component,
                populate,
            } => populate_component(tx, registry, component, populate, value)?,
            PopulateNode::DynamicZone { fragments } => {
                populate_zone(tx, registry, fragments, value)?
            }
        };

        entry.data.insert(name.clone(), populated);
    }

    Ok(())
}

fn populate_relation<T: StoreTx>(
    tx: &T,
    registry: &ResolvedRegistry,
    parent: &Entry,
    target: &SchemaRef,
    fields: &[String],
    page_size: usize,
    value: Value,
) -> Result<Value, Error> {
    let schema = registry.schema(target)?;

    // Collect referenced document ids, bounded by the page size.
    let references: Vec<DocumentId> = match &value {
        Value::Object(map) => reference_id(map).into_iter().collect(),
        Value::Array(items) => items
            .iter()
            .take(page_size)
            .filter_map(|item| item.as_object().and_then(reference_id))
            .collect(),
        _ => Vec::new(),
    };

    if references.is_empty() {
        return Ok(value);
    }

    // Populated targets mirror the parent's version: same status when
    // the target is versioned, same locale when it is localized.
    let lookup = Lookup {
        document_id_in: Some(references),
        published: schema
            .options
            .draft_and_publish
            .then_some(parent.is_published()),
        locale: match (schema.options.localized, &parent.locale) {
            (true, Some(locale)) => Some(LocaleLookup::Is(Some(locale.clone()))),
            _ => None,
        },
        ..Lookup::default()
    };

    let found = tx.scan(&schema.table, &lookup)?;
    let projected: Vec<Value> = found
        .iter()
        .map(|related| project_relation(related, fields))
        .collect();

    if value.is_array() {
        Ok(Value::Array(projected))
    } else {
        Ok(projected.into_iter().next().unwrap_or(Value::Null))
    }
}

// Minimal allow-listed projection of one related entry.
fn project_relation(related: &Entry, fields: &[String]) -> Value {
    let mut projected = serde_json::Map::new();
    for field in fields {
        let value = match field.as_str() {
            "document_id" => Value::String(related.document_id.to_string()),
            "locale" => related
                .locale
                .as_ref()
                .map_or(Value::Null, |locale| Value::String(locale.as_str().to_string())),
            "published_at" => related
                .published_at
                .map_or(Value::Null, |at| Value::String(at.to_rfc3339())),
            other => related.data.get(other).cloned().unwrap_or(Value::Null),
        };
        projected.insert(field.clone(), value);
    }
    Value::Object(projected)
}

fn populate_component<T: StoreTx>(
    tx: &T,
    registry: &ResolvedRegistry,
    component: &SchemaRef,
    populate: &Populate,
    value: Value,
) -> Result<Value, Error> {
    match value {
        Value::Object(map) => inline_component_row(tx, registry, component, populate, &map),
        Value::Array(items) => {
            let mut inlined = Vec::with_capacity(items.len());
            for item in items {
                let Value::Object(map) = item else {
                    continue;
                };
                inlined.push(inline_component_row(tx, registry, component, populate, &map)?);
            }
            Ok(Value::Array(inlined))
        }
        other => Ok(other),
    }
}

// Fetch a component row by its reference and inline its payload.
fn inline_component_row<T: StoreTx>(
    tx: &T,
    registry: &ResolvedRegistry,
    component: &SchemaRef,
    populate: &Populate,
    reference: &serde_json::Map<String, Value>,
) -> Result<Value, Error> {
    let schema = registry.schema(component)?;

    let Some(id) = reference.get("id").and_then(Value::as_str) else {
        return Ok(Value::Object(reference.clone()));
    };
    let id = EntryId::parse(id)?;

    let Some(mut row) = tx.get(&schema.table, id)? else {
        return Err(Error::invariant(
            ErrorOrigin::Query,
            format!("component row '{id}' missing from '{}'", schema.table),
        ));
    };

    populate_entry(tx, registry, &mut row, populate)?;

    let mut inlined = serde_json::Map::new();
    inlined.insert("id".to_string(), Value::String(id.to_string()));
    for (key, value) in row.data {
        inlined.insert(key, value);
    }
    Ok(Value::Object(inlined))
}

fn populate_zone<T: StoreTx>(
    tx: &T,
    registry: &ResolvedRegistry,
    fragments: &BTreeMap<SchemaRef, Populate>,
    value: Value,
) -> Result<Value, Error> {
    let Value::Array(items) = value else {
        return Ok(value);
    };

    let mut inlined = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(map) = item else {
            continue;
        };
        let Some(component) = map.get(COMPONENT_KEY).and_then(Value::as_str) else {
            continue;
        };
        let component = SchemaRef::new(component);

        // Each zone entry resolves through its own fragment.
        let Some(populate) = fragments.get(&component) else {
            continue;
        };

        let Value::Object(mut row) =
            inline_component_row(tx, registry, &component, populate, &map)?
        else {
            continue;
        };
        row.insert(
            COMPONENT_KEY.to_string(),
            Value::String(component.as_str().to_string()),
        );
        inlined.push(Value::Object(row));
    }

    Ok(Value::Array(inlined))
}

// Extract the document id of a relation reference object.
fn reference_id(map: &serde_json::Map<String, Value>) -> Option<DocumentId> {
    map.get("document_id")
        .and_then(Value::as_str)
        .and_then(|raw| DocumentId::parse(raw).ok())
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{PopulateNode, deep_populate};
    use crate::query::{Params, PipelineCtx, tests::resolved};

    #[test]
    fn deep_populate_covers_relations_components_and_zones() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 25,
        };

        let params = deep_populate(&ctx, Params::new()).expect("transform should apply");
        let populate = params.populate.expect("populate tree should be built");

        let Some(PopulateNode::Relation {
            target, page_size, ..
        }) = populate.0.get("author")
        else {
            panic!("author should populate as a relation");
        };
        assert_eq!(target, &"api::author".into());
        assert_eq!(*page_size, 25);

        let Some(PopulateNode::Component { component, .. }) = populate.0.get("seo") else {
            panic!("seo should populate as a component");
        };
        assert_eq!(component, &"shared::seo".into());

        let Some(PopulateNode::DynamicZone { fragments }) = populate.0.get("blocks") else {
            panic!("blocks should populate as a dynamic zone");
        };
        // One fragment per allowed component, keyed by component ref.
        assert_eq!(fragments.len(), 2);
        assert!(fragments.contains_key(&"shared::quote".into()));
        assert!(fragments.contains_key(&"shared::rich_text".into()));
    }

    #[test]
    fn page_size_override_wins_over_the_default() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 100,
        };

        let mut params = Params::new();
        params.populate_page_size = Some(5);
        let params = deep_populate(&ctx, params).expect("transform should apply");

        let populate = params.populate.expect("populate tree should be built");
        let Some(PopulateNode::Relation { page_size, .. }) = populate.0.get("author") else {
            panic!("author should populate as a relation");
        };
        assert_eq!(*page_size, 5);
    }
}
