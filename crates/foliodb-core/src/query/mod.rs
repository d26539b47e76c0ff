//! Query transform pipeline.
//!
//! A pipeline is an ordered list of pure transforms with the fixed
//! signature `fn(&PipelineCtx, Params) -> Result<Params, Error>`,
//! composed by a fold and applied left-to-right. Each transform is
//! independently testable; none touches the store.

pub mod fields;
pub mod locale;
pub mod populate;
pub mod status;

pub use populate::{Populate, PopulateNode};

use crate::{
    entry::JsonMap,
    error::Error,
    store::Lookup,
    types::{DocumentId, Locale, Status},
};
use foliodb_schema::registry::{ResolvedRegistry, ResolvedSchema};

///
/// LocaleParam
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum LocaleParam {
    /// Resolve to the registry default (localized schemas only).
    #[default]
    Default,
    /// No locale filtering.
    All,
    One(Locale),
    Many(Vec<Locale>),
}

///
/// Params
///
/// High-level operation request. Transforms refine it into a storage
/// [`Lookup`] plus normalized payload/populate state.
///

#[derive(Clone, Debug, Default)]
pub struct Params {
    pub document_id: Option<DocumentId>,
    pub data: Option<JsonMap>,
    pub locale: LocaleParam,
    pub status: Option<Status>,
    pub fields: Option<Vec<String>>,
    pub populate: Option<Populate>,
    /// Scalar equality filters against the payload.
    pub filters: Vec<(String, serde_json::Value)>,
    /// Cap on related records resolved per populated field.
    pub populate_page_size: Option<usize>,

    /// Storage lookup accumulated by the transforms.
    pub lookup: Lookup,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_data(mut self, data: JsonMap) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locale = LocaleParam::One(locale.into());
        self
    }

    #[must_use]
    pub fn with_locales(mut self, locales: Vec<Locale>) -> Self {
        self.locale = LocaleParam::Many(locales);
        self
    }

    #[must_use]
    pub const fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }
}

///
/// PipelineCtx
///
/// Read-only context shared by every transform in a run.
///

#[derive(Clone, Copy)]
pub struct PipelineCtx<'a> {
    pub registry: &'a ResolvedRegistry,
    pub schema: &'a ResolvedSchema,
    pub default_page_size: usize,
}

/// Fixed transform signature: pure, store-free, composable.
pub type Transform = fn(&PipelineCtx<'_>, Params) -> Result<Params, Error>;

/// Apply transforms left-to-right over the params.
pub fn apply(
    ctx: &PipelineCtx<'_>,
    transforms: &[Transform],
    params: Params,
) -> Result<Params, Error> {
    transforms
        .iter()
        .try_fold(params, |params, transform| transform(ctx, params))
}

/// Read path: status and locale filters plus id projection.
pub const READ: &[Transform] = &[
    status::resolve_status,
    locale::resolve_locale,
    fields::project_ids,
];

/// Write path: read transforms plus locale copy-down into the payload.
pub const WRITE: &[Transform] = &[
    status::resolve_status,
    locale::resolve_locale,
    locale::copy_locale_into_data,
    fields::project_ids,
];

/// Cross-status path used by publish/unpublish/discard: locale list
/// lookup without a status default.
pub const VERSIONS: &[Transform] = &[locale::resolve_locale_list, fields::project_ids];

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::{LocaleParam, Params, PipelineCtx, apply};
    use crate::{error::ErrorOrigin, types::Status};
    use foliodb_schema::{
        node::{Attribute, Component, ContentType, RelationDescriptor},
        registry::{ResolvedRegistry, SchemaRegistry},
        types::{RelationKind, ScalarKind},
    };

    // Shared fixture graph used across the transform tests.
    pub(crate) fn resolved() -> ResolvedRegistry {
        let mut registry = SchemaRegistry::new().default_locale("en");
        registry
            .register_content_type(
                "api::article",
                ContentType::new("articles")
                    .localized()
                    .attribute("title", Attribute::Scalar(ScalarKind::String))
                    .attribute(
                        "author",
                        Attribute::Relation(
                            RelationDescriptor::new(RelationKind::ManyToOne, "api::author")
                                .inversed_by("articles"),
                        ),
                    )
                    .attribute("seo", Attribute::component("shared::seo"))
                    .attribute(
                        "blocks",
                        Attribute::dynamic_zone([
                            "shared::quote".into(),
                            "shared::rich_text".into(),
                        ]),
                    ),
            )
            .expect("article should register");
        registry
            .register_content_type(
                "api::author",
                ContentType::new("authors")
                    .attribute("name", Attribute::Scalar(ScalarKind::String))
                    .attribute(
                        "articles",
                        Attribute::Relation(
                            RelationDescriptor::new(RelationKind::OneToMany, "api::article")
                                .mapped_by("author"),
                        ),
                    ),
            )
            .expect("author should register");
        registry
            .register_component(
                "shared::seo",
                Component::new("seo")
                    .attribute("meta_title", Attribute::Scalar(ScalarKind::String)),
            )
            .expect("seo should register");
        registry
            .register_component(
                "shared::quote",
                Component::new("quote").attribute("body", Attribute::Scalar(ScalarKind::Text)),
            )
            .expect("quote should register");
        registry
            .register_component(
                "shared::rich_text",
                Component::new("rich_text")
                    .attribute("body", Attribute::Scalar(ScalarKind::RichText)),
            )
            .expect("rich_text should register");
        registry.resolve().expect("fixture registry should resolve")
    }

    #[test]
    fn transforms_apply_left_to_right() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 100,
        };

        let params = apply(&ctx, super::READ, Params::new()).expect("pipeline should apply");

        // Status defaulted to draft, locale defaulted from the registry.
        assert_eq!(params.status, Some(Status::Draft));
        assert_eq!(params.lookup.published, Some(false));
        assert_eq!(params.locale, LocaleParam::One("en".into()));
    }

    #[test]
    fn failing_transform_short_circuits() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 100,
        };

        let failing: super::Transform = |_, _| {
            Err(crate::error::Error::validation(
                ErrorOrigin::Query,
                "boom",
            ))
        };
        let counting: super::Transform = |_, mut params| {
            params.filters.push(("reached".into(), serde_json::Value::Null));
            Ok(params)
        };

        let err = apply(&ctx, &[failing, counting], Params::new())
            .expect_err("pipeline must stop at the first failure");
        assert!(err.is_validation());
    }
}
