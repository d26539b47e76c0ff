//! Schema registry: mutable collection phase, then a one-shot resolve
//! into an immutable, validated graph.
//!
//! The registry is an explicit handle passed into every consumer; there
//! is no process-global schema state.

use crate::{
    build::{self, BuiltRelation},
    error::SchemaError,
    metadata::{RelationMetadata, SyntheticTable},
    node::{Attribute, Component, ContentType, SchemaNode, TypeOptions},
    types::SchemaRef,
    validate,
};
use std::collections::BTreeMap;

/// Fallback locale applied when a registry does not configure one.
pub const DEFAULT_LOCALE: &str = "en";

///
/// RegistryOptions
///

#[derive(Clone, Debug)]
pub struct RegistryOptions {
    pub default_locale: String,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

///
/// SchemaRegistry
///
/// Collection phase: definitions are registered, nothing is derived yet.
/// `resolve` performs validation and metadata derivation exactly once
/// and seals the result.
///

#[derive(Debug, Default)]
pub struct SchemaRegistry {
    nodes: BTreeMap<SchemaRef, SchemaNode>,
    options: RegistryOptions,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn default_locale(mut self, locale: impl Into<String>) -> Self {
        self.options.default_locale = locale.into();
        self
    }

    pub fn register_content_type(
        &mut self,
        path: impl Into<SchemaRef>,
        content_type: ContentType,
    ) -> Result<(), SchemaError> {
        self.register(path.into(), SchemaNode::ContentType(content_type))
    }

    pub fn register_component(
        &mut self,
        path: impl Into<SchemaRef>,
        component: Component,
    ) -> Result<(), SchemaError> {
        self.register(path.into(), SchemaNode::Component(component))
    }

    fn register(&mut self, path: SchemaRef, node: SchemaNode) -> Result<(), SchemaError> {
        if self.nodes.contains_key(&path) {
            return Err(SchemaError::AlreadyRegistered(path));
        }
        self.nodes.insert(path, node);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, path: &SchemaRef) -> Option<&SchemaNode> {
        self.nodes.get(path)
    }

    pub(crate) fn nodes(&self) -> impl Iterator<Item = (&SchemaRef, &SchemaNode)> {
        self.nodes.iter()
    }

    /// Validate the graph, derive relation metadata, and seal the result.
    ///
    /// Configuration errors abort resolution entirely: the system must
    /// not start with an inconsistent relation graph.
    pub fn resolve(self) -> Result<ResolvedRegistry, SchemaError> {
        // Phase 1: node-local invariants (idents, direction exclusivity).
        validate::validate_nodes(&self)
            .result()
            .map_err(SchemaError::Validation)?;

        // Phase 2: cross-schema invariants (bidirectional consistency).
        let mut errs = crate::error::ErrorTree::new();
        validate::validate_bidirectional(&self, &mut errs);
        errs.result().map_err(SchemaError::Validation)?;

        // Phase 3: metadata derivation, fail-fast per attribute.
        let mut relation_metadata: BTreeMap<(SchemaRef, String), RelationMetadata> =
            BTreeMap::new();
        let mut synthetic: BTreeMap<String, SyntheticTable> = BTreeMap::new();

        for (path, node) in self.nodes() {
            let table = node.table_name();
            for (attribute, descriptor) in node.attributes() {
                let Attribute::Relation(relation) = descriptor else {
                    continue;
                };

                let built: BuiltRelation =
                    build::build_relation(path, &table, attribute, relation, &self)?;

                if let Some(metadata) = built.metadata {
                    relation_metadata.insert((path.clone(), attribute.clone()), metadata);
                }
                if let Some(binding) = built.inverse {
                    relation_metadata
                        .insert((binding.schema, binding.attribute), binding.metadata);
                }
                if let Some(table_def) = built.synthetic {
                    let name = table_def.name().clone();
                    if synthetic.insert(name.clone(), table_def).is_some() {
                        return Err(SchemaError::DuplicateJoinTable(name));
                    }
                }
            }
        }

        // Phase 4: assemble the immutable graph.
        let schemas = self
            .nodes
            .into_iter()
            .map(|(path, node)| {
                let resolved = ResolvedSchema::assemble(&path, node, &mut relation_metadata);
                (path, resolved)
            })
            .collect();

        Ok(ResolvedRegistry {
            schemas,
            synthetic,
            options: self.options,
        })
    }
}

///
/// ResolvedAttribute
///

#[derive(Clone, Debug)]
pub struct ResolvedAttribute {
    pub attribute: Attribute,
    /// Physical linkage, present on relation attributes that carry or
    /// mirror join metadata.
    pub relation: Option<RelationMetadata>,
}

///
/// ResolvedSchema
///

#[derive(Clone, Debug)]
pub struct ResolvedSchema {
    pub path: SchemaRef,
    pub ident: String,
    pub table: String,
    pub attributes: BTreeMap<String, ResolvedAttribute>,
    pub options: TypeOptions,
    pub is_content_type: bool,
}

impl ResolvedSchema {
    fn assemble(
        path: &SchemaRef,
        node: SchemaNode,
        relation_metadata: &mut BTreeMap<(SchemaRef, String), RelationMetadata>,
    ) -> Self {
        let ident = node.ident().clone();
        let table = node.table_name();
        let is_content_type = node.is_content_type();
        let options = match &node {
            SchemaNode::ContentType(content_type) => content_type.options,
            SchemaNode::Component(_) => TypeOptions {
                localized: false,
                draft_and_publish: false,
            },
        };

        let attributes = match node {
            SchemaNode::ContentType(content_type) => content_type.attributes,
            SchemaNode::Component(component) => component.attributes,
        }
        .into_iter()
        .map(|(name, attribute)| {
            let relation = relation_metadata.remove(&(path.clone(), name.clone()));
            (name, ResolvedAttribute { attribute, relation })
        })
        .collect();

        Self {
            path: path.clone(),
            ident,
            table,
            attributes,
            options,
            is_content_type,
        }
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&ResolvedAttribute> {
        self.attributes.get(name)
    }
}

///
/// ResolvedRegistry
///
/// Immutable, validated schema graph. Read-only after resolve; safe to
/// share without locking.
///

#[derive(Debug)]
pub struct ResolvedRegistry {
    schemas: BTreeMap<SchemaRef, ResolvedSchema>,
    synthetic: BTreeMap<String, SyntheticTable>,
    options: RegistryOptions,
}

impl ResolvedRegistry {
    pub fn schema(&self, path: &SchemaRef) -> Result<&ResolvedSchema, SchemaError> {
        self.schemas
            .get(path)
            .ok_or_else(|| SchemaError::UnknownSchema(path.clone()))
    }

    pub fn content_type(&self, path: &SchemaRef) -> Result<&ResolvedSchema, SchemaError> {
        let schema = self.schema(path)?;
        if !schema.is_content_type {
            return Err(SchemaError::NotAContentType(path.clone()));
        }
        Ok(schema)
    }

    pub fn schemas(&self) -> impl Iterator<Item = (&SchemaRef, &ResolvedSchema)> {
        self.schemas.iter()
    }

    pub fn synthetic_tables(&self) -> impl Iterator<Item = (&String, &SyntheticTable)> {
        self.synthetic.iter()
    }

    #[must_use]
    pub fn synthetic_table(&self, name: &str) -> Option<&SyntheticTable> {
        self.synthetic.get(name)
    }

    #[must_use]
    pub fn default_locale(&self) -> &str {
        &self.options.default_locale
    }
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::SchemaRegistry;
    use crate::{
        error::SchemaError,
        metadata::{RelationMetadata, SyntheticTable},
        node::{Attribute, Component, ContentType, RelationDescriptor},
        types::{RelationKind, ScalarKind, SchemaRef},
    };

    // A small blog graph: articles own the author relation, authors see
    // the mirrored inverse side.
    fn blog_registry() -> SchemaRegistry {
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
                    .attribute("seo", Attribute::component("shared::seo")),
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
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = blog_registry();
        let err = registry
            .register_content_type("api::article", ContentType::new("articles"))
            .expect_err("duplicate path must be rejected");
        assert!(matches!(err, SchemaError::AlreadyRegistered(_)));
    }

    #[test]
    fn resolve_mirrors_owner_metadata_onto_the_mapped_side() {
        let resolved = blog_registry().resolve().expect("registry should resolve");

        let article = resolved
            .schema(&SchemaRef::new("api::article"))
            .expect("article should resolve");
        let owner = article
            .attribute("author")
            .and_then(|a| a.relation.as_ref())
            .expect("owner metadata should exist");
        assert!(owner.is_owner());

        let author = resolved
            .schema(&SchemaRef::new("api::author"))
            .expect("author should resolve");
        let mirrored = author
            .attribute("articles")
            .and_then(|a| a.relation.as_ref())
            .expect("mirrored metadata should exist");
        assert!(!mirrored.is_owner());

        // Both sides agree on the physical table, roles swapped.
        let owner_table = owner.join_table().expect("owner uses a join table");
        let mirrored_table = mirrored.join_table().expect("mirror uses the same table");
        assert_eq!(owner_table.name, mirrored_table.name);
        assert_eq!(owner_table.join_column, mirrored_table.inverse_join_column);
        assert_eq!(owner_table.inverse_join_column, mirrored_table.join_column);
    }

    #[test]
    fn resolve_registers_synthetic_tables_by_deterministic_name() {
        let resolved = blog_registry().resolve().expect("registry should resolve");

        let table = resolved
            .synthetic_table("articles_author_links")
            .expect("link table should be registered");
        let SyntheticTable::Join(join) = table else {
            panic!("expected a plain join table");
        };
        assert_eq!(join.join_column.referenced_table, "articles");
        assert_eq!(join.inverse_join_column.referenced_table, "authors");
    }

    #[test]
    fn resolving_the_same_definitions_twice_is_byte_identical() {
        let first = blog_registry().resolve().expect("first resolve");
        let second = blog_registry().resolve().expect("second resolve");

        let first_names: Vec<_> = first.synthetic_tables().map(|(name, _)| name.clone()).collect();
        let second_names: Vec<_> = second.synthetic_tables().map(|(name, _)| name.clone()).collect();
        assert_eq!(first_names, second_names);

        for (path, schema) in first.schemas() {
            let other = second.schema(path).expect("schema should exist in both");
            for (name, attribute) in &schema.attributes {
                let mirrored = other.attribute(name).expect("attribute should exist in both");
                assert_eq!(attribute.relation, mirrored.relation, "{path}.{name}");
            }
        }
    }

    #[test]
    fn mapped_side_without_an_owner_fails_validation() {
        let mut registry = SchemaRegistry::new();
        registry
            .register_content_type(
                "api::article",
                ContentType::new("articles")
                    .attribute("title", Attribute::Scalar(ScalarKind::String)),
            )
            .expect("article should register");
        registry
            .register_content_type(
                "api::author",
                ContentType::new("authors").attribute(
                    "articles",
                    Attribute::Relation(
                        RelationDescriptor::new(RelationKind::OneToMany, "api::article")
                            .mapped_by("author"),
                    ),
                ),
            )
            .expect("author should register");

        let err = registry.resolve().expect_err("dangling mapped_by must fail");
        assert!(matches!(err, SchemaError::Validation(_)));
    }

    #[test]
    fn one_to_many_owner_aborts_resolution() {
        let mut registry = SchemaRegistry::new();
        registry
            .register_content_type(
                "api::author",
                ContentType::new("authors").attribute(
                    "articles",
                    Attribute::Relation(
                        RelationDescriptor::new(RelationKind::OneToMany, "api::article")
                            .inversed_by("author"),
                    ),
                ),
            )
            .expect("author should register");
        registry
            .register_content_type(
                "api::article",
                ContentType::new("articles").attribute(
                    "author",
                    Attribute::Relation(
                        RelationDescriptor::new(RelationKind::ManyToOne, "api::author")
                            .mapped_by("articles"),
                    ),
                ),
            )
            .expect("article should register");

        let err = registry.resolve().expect_err("owning one-to-many must fail");
        assert!(matches!(err, SchemaError::OneToManyOwner { .. }));
    }

    #[test]
    fn unknown_schema_lookup_is_typed() {
        let resolved = blog_registry().resolve().expect("registry should resolve");
        let err = resolved
            .schema(&SchemaRef::new("api::missing"))
            .expect_err("unknown path must be rejected");
        assert!(matches!(err, SchemaError::UnknownSchema(_)));
    }
}
