//! Id projection.
//!
//! Callers address other documents by `document_id`; storage filters
//! and relation payloads use that same stable id as the foreign key.
//! This transform moves ids between the two shapes and guarantees
//! `document_id` survives any field projection.

use crate::{
    error::Error,
    query::{Params, PipelineCtx},
    types::DocumentId,
};
use serde_json::Value;

/// Field name carrying the stable document id in projections and
/// relation payloads.
pub const DOCUMENT_ID_FIELD: &str = "document_id";

pub fn project_ids(ctx: &PipelineCtx<'_>, mut params: Params) -> Result<Params, Error> {
    // Route the addressed document into the lookup.
    if let Some(document_id) = params.document_id {
        params.lookup.document_id = Some(document_id);
    }

    // Split filters: document-id filters become key lookups, the rest
    // stay payload clauses.
    for (field, value) in std::mem::take(&mut params.filters) {
        if field == DOCUMENT_ID_FIELD {
            if let Value::String(raw) = &value {
                params.lookup.document_id = Some(DocumentId::parse(raw)?);
                continue;
            }
        }
        params.lookup.fields.push((field, value));
    }

    // A projected field list must always include the document id.
    if let Some(fields) = params.fields.as_mut() {
        if !fields.iter().any(|field| field == DOCUMENT_ID_FIELD) {
            fields.push(DOCUMENT_ID_FIELD.to_string());
        }
    }

    // Normalize relation payloads: bare document-id strings become
    // reference objects.
    if let Some(data) = params.data.as_mut() {
        for (name, attribute) in &ctx.schema.attributes {
            if !attribute.attribute.is_relation() {
                continue;
            }
            if let Some(value) = data.get_mut(name) {
                normalize_reference(value);
            }
        }
    }

    Ok(params)
}

// `"01ABC…"` → `{"document_id": "01ABC…"}`, recursively over lists.
fn normalize_reference(value: &mut Value) {
    match value {
        Value::String(raw) => {
            let mut reference = serde_json::Map::new();
            reference.insert(DOCUMENT_ID_FIELD.to_string(), Value::String(raw.clone()));
            *value = Value::Object(reference);
        }
        Value::Array(items) => {
            for item in items {
                normalize_reference(item);
            }
        }
        _ => {}
    }
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::project_ids;
    use crate::{
        query::{Params, PipelineCtx, tests::resolved},
        types::DocumentId,
    };
    use serde_json::{Value, json};

    #[test]
    fn document_id_filters_become_key_lookups() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 100,
        };

        let id = DocumentId::generate();
        let params = Params::new().with_filter("document_id", Value::String(id.to_string()));
        let params = project_ids(&ctx, params).expect("transform should apply");

        assert_eq!(params.lookup.document_id, Some(id));
        assert!(params.lookup.fields.is_empty());
    }

    #[test]
    fn projected_field_lists_always_keep_the_document_id() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 100,
        };

        let params = Params::new().with_fields(vec!["title".to_string()]);
        let params = project_ids(&ctx, params).expect("transform should apply");

        let fields = params.fields.expect("fields should survive");
        assert!(fields.iter().any(|field| field == "document_id"));
    }

    #[test]
    fn bare_relation_ids_are_normalized_into_references() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 100,
        };

        let id = DocumentId::generate();
        let mut data = serde_json::Map::new();
        data.insert("author".to_string(), Value::String(id.to_string()));
        data.insert("title".to_string(), Value::String("A".to_string()));

        let params = project_ids(&ctx, Params::new().with_data(data))
            .expect("transform should apply");
        let data = params.data.expect("data should survive");

        assert_eq!(
            data.get("author"),
            Some(&json!({ "document_id": id.to_string() }))
        );
        // Scalars are left untouched.
        assert_eq!(data.get("title"), Some(&Value::String("A".to_string())));
    }
}
