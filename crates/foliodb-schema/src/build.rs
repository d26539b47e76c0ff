//! Relation metadata derivation.
//!
//! `build_relation` is a pure function of (attribute, declaring schema,
//! registry): it returns the resolved physical metadata for the declaring
//! side, the mirrored metadata for the inverse side of a bidirectional
//! pair, and any synthetic join table to register. It never mutates its
//! inputs; composition into the immutable resolved graph happens in
//! `registry::SchemaRegistry::resolve`.

use crate::{
    error::SchemaError,
    metadata::{
        JoinColumn, JoinTable, MORPH_ID_COLUMN, MORPH_TYPE_COLUMN, MorphColumns, MorphJoinTable,
        RelationMetadata, SyntheticTable, fk_column_name, inverse_name, join_table_name,
        morph_table_name, order_column_name, table_id_column,
    },
    node::{RelationDescriptor, SchemaNode},
    registry::SchemaRegistry,
    types::{RelationKind, SchemaRef},
};

///
/// InverseBinding
///
/// Mirrored metadata destined for the inverse attribute of a
/// bidirectional pair.
///

#[derive(Clone, Debug)]
pub struct InverseBinding {
    pub schema: SchemaRef,
    pub attribute: String,
    pub metadata: RelationMetadata,
}

///
/// BuiltRelation
///

#[derive(Clone, Debug, Default)]
pub struct BuiltRelation {
    /// Metadata for the declaring attribute. `None` for non-owning sides
    /// (the owner mirrors onto them) and for morph-owner kinds.
    pub metadata: Option<RelationMetadata>,
    pub inverse: Option<InverseBinding>,
    pub synthetic: Option<SyntheticTable>,
}

impl BuiltRelation {
    const fn none() -> Self {
        Self {
            metadata: None,
            inverse: None,
            synthetic: None,
        }
    }

    const fn local(metadata: RelationMetadata) -> Self {
        Self {
            metadata: Some(metadata),
            inverse: None,
            synthetic: None,
        }
    }
}

/// Derive physical join metadata for one relation attribute.
pub fn build_relation(
    source: &SchemaRef,
    source_table: &str,
    attribute: &str,
    relation: &RelationDescriptor,
    registry: &SchemaRegistry,
) -> Result<BuiltRelation, SchemaError> {
    match relation.kind {
        RelationKind::OneToOne => build_one_to_one(source, source_table, attribute, relation, registry),
        RelationKind::OneToMany => build_one_to_many(source, source_table, attribute, relation, registry),
        RelationKind::ManyToOne => build_many_to_one(source, source_table, attribute, relation, registry),
        RelationKind::ManyToMany => build_many_to_many(source, source_table, attribute, relation, registry),
        RelationKind::MorphToOne => Ok(build_morph_to_one(attribute)),
        RelationKind::MorphToMany => Ok(build_morph_to_many(source_table, attribute)),
        RelationKind::MorphMany | RelationKind::MorphOne => {
            validate_morph_owner(source, attribute, relation, registry)?;
            Ok(BuiltRelation::none())
        }
    }
}

// Resolve the fixed target of a non-morph-to relation, or fail fast.
fn resolve_target<'a>(
    source: &SchemaRef,
    attribute: &str,
    relation: &RelationDescriptor,
    registry: &'a SchemaRegistry,
) -> Result<(&'a SchemaNode, String), SchemaError> {
    let target = relation
        .target
        .as_ref()
        .ok_or_else(|| SchemaError::MissingTargetRef {
            schema: source.clone(),
            attribute: attribute.to_string(),
        })?;

    let node = registry
        .get(target)
        .ok_or_else(|| SchemaError::MissingTarget {
            schema: source.clone(),
            attribute: attribute.to_string(),
            target: target.clone(),
        })?;

    let table = node.table_name();
    Ok((node, table))
}

fn build_one_to_one(
    source: &SchemaRef,
    source_table: &str,
    attribute: &str,
    relation: &RelationDescriptor,
    registry: &SchemaRegistry,
) -> Result<BuiltRelation, SchemaError> {
    let (_, target_table) = resolve_target(source, attribute, relation, registry)?;

    // The mapped_by side carries no physical metadata of its own; the
    // owner mirrors onto it during resolve.
    if !relation.is_owning() {
        return Ok(BuiltRelation::none());
    }

    if relation.prefers_join_table() {
        let table = link_table(source_table, &target_table, attribute, relation);
        return Ok(with_join_table(relation, table));
    }

    Ok(with_join_column(source_table, attribute, &target_table, relation))
}

fn build_one_to_many(
    source: &SchemaRef,
    source_table: &str,
    attribute: &str,
    relation: &RelationDescriptor,
    registry: &SchemaRegistry,
) -> Result<BuiltRelation, SchemaError> {
    let (_, target_table) = resolve_target(source, attribute, relation, registry)?;

    // A one-to-many side may never own a bidirectional pair; raise before
    // any table is created.
    if relation.inversed_by.is_some() {
        return Err(SchemaError::OneToManyOwner {
            schema: source.clone(),
            attribute: attribute.to_string(),
        });
    }

    // Non-owning side of a many-to-one pair: the owner mirrors onto it.
    if !relation.is_owning() {
        return Ok(BuiltRelation::none());
    }

    let table = link_table(source_table, &target_table, attribute, relation);
    Ok(with_join_table(relation, table))
}

fn build_many_to_one(
    source: &SchemaRef,
    source_table: &str,
    attribute: &str,
    relation: &RelationDescriptor,
    registry: &SchemaRegistry,
) -> Result<BuiltRelation, SchemaError> {
    let (_, target_table) = resolve_target(source, attribute, relation, registry)?;

    if relation.prefers_join_table() {
        let table = link_table(source_table, &target_table, attribute, relation);
        return Ok(with_join_table(relation, table));
    }

    Ok(with_join_column(source_table, attribute, &target_table, relation))
}

fn build_many_to_many(
    source: &SchemaRef,
    source_table: &str,
    attribute: &str,
    relation: &RelationDescriptor,
    registry: &SchemaRegistry,
) -> Result<BuiltRelation, SchemaError> {
    let (_, target_table) = resolve_target(source, attribute, relation, registry)?;

    // The mapped_by side is mirrored by the owner.
    if !relation.is_owning() {
        return Ok(BuiltRelation::none());
    }

    let table = link_table(source_table, &target_table, attribute, relation);
    Ok(with_join_table(relation, table))
}

fn build_morph_to_one(attribute: &str) -> BuiltRelation {
    // Idempotent by construction: the column pair is a pure function of
    // the attribute name.
    BuiltRelation::local(RelationMetadata::MorphColumns(MorphColumns {
        type_column: format!("{}_type", fk_stem(attribute)),
        id_column: format!("{}_id", fk_stem(attribute)),
    }))
}

fn build_morph_to_many(source_table: &str, attribute: &str) -> BuiltRelation {
    let join_column = JoinColumn::referencing(table_id_column(source_table), source_table);
    let table = MorphJoinTable {
        name: morph_table_name(source_table, attribute),
        pivot_columns: vec![join_column.name.clone(), MORPH_ID_COLUMN.to_string()],
        join_column,
        morph_columns: MorphColumns {
            type_column: MORPH_TYPE_COLUMN.to_string(),
            id_column: MORPH_ID_COLUMN.to_string(),
        },
        order_column: order_column_name(attribute),
    };

    BuiltRelation {
        metadata: Some(RelationMetadata::MorphJoinTable(table.clone())),
        inverse: None,
        synthetic: Some(SyntheticTable::Morph(table)),
    }
}

// Validate the morph_by attribute referenced by a MorphOne/MorphMany side.
fn validate_morph_owner(
    source: &SchemaRef,
    attribute: &str,
    relation: &RelationDescriptor,
    registry: &SchemaRegistry,
) -> Result<(), SchemaError> {
    let (target_node, _) = resolve_target(source, attribute, relation, registry)?;

    let Some(morph_by) = &relation.morph_by else {
        return Ok(());
    };

    let target = relation.target.clone().unwrap_or_else(|| SchemaRef::new(""));
    let Some(morph_attr) = target_node.relation(morph_by) else {
        return Err(SchemaError::MissingMorphBy {
            schema: source.clone(),
            attribute: attribute.to_string(),
            target,
            morph_by: morph_by.clone(),
        });
    };

    if !morph_attr.kind.is_morph_to() {
        return Err(SchemaError::InvalidMorphBy {
            schema: source.clone(),
            attribute: attribute.to_string(),
            target,
            morph_by: morph_by.clone(),
        });
    }

    Ok(())
}

// ----------------------------------------------------------------------
// Construction helpers
// ----------------------------------------------------------------------

// Snake-case stem shared by the morph type/id column pair.
fn fk_stem(attribute: &str) -> String {
    use convert_case::{Case, Casing};
    attribute.to_case(Case::Snake)
}

// Build the synthetic link table for an owning relation side.
fn link_table(
    source_table: &str,
    target_table: &str,
    attribute: &str,
    relation: &RelationDescriptor,
) -> JoinTable {
    let self_referencing = source_table == target_table;

    let join_column = JoinColumn::referencing(table_id_column(source_table), source_table);

    let mut inverse_column_name = table_id_column(target_table);
    if self_referencing {
        inverse_column_name = inverse_name(&inverse_column_name);
    }
    let inverse_join_column = JoinColumn::referencing(inverse_column_name, target_table);

    let order_column = relation
        .kind
        .is_to_many()
        .then(|| order_column_name(attribute));

    let inverse_order_column = inverse_order_column(attribute, relation, self_referencing);

    JoinTable {
        name: join_table_name(source_table, attribute),
        pivot_columns: vec![join_column.name.clone(), inverse_join_column.name.clone()],
        join_column,
        inverse_join_column,
        order_column,
        inverse_order_column,
    }
}

// The inverse order column exists when the opposite side is a to-many
// view of this table: a declared inverse attribute, or the mirrored
// direction of a self-referencing many-to-many.
fn inverse_order_column(
    attribute: &str,
    relation: &RelationDescriptor,
    self_referencing: bool,
) -> Option<String> {
    let inverse_is_to_many = relation
        .kind
        .expected_inverse()
        .is_some_and(RelationKind::is_to_many);

    if let Some(inverse_attribute) = &relation.inversed_by {
        return inverse_is_to_many.then(|| order_column_name(inverse_attribute));
    }

    if self_referencing && relation.kind == RelationKind::ManyToMany {
        return Some(inverse_name(&order_column_name(attribute)));
    }

    None
}

fn with_join_table(relation: &RelationDescriptor, table: JoinTable) -> BuiltRelation {
    let inverse = relation.inversed_by.as_ref().and_then(|inverse_attribute| {
        relation.target.as_ref().map(|target| InverseBinding {
            schema: target.clone(),
            attribute: inverse_attribute.clone(),
            metadata: RelationMetadata::InverseJoinTable(table.inverted()),
        })
    });

    BuiltRelation {
        metadata: Some(RelationMetadata::JoinTable(table.clone())),
        inverse,
        synthetic: Some(SyntheticTable::Join(table)),
    }
}

fn with_join_column(
    source_table: &str,
    attribute: &str,
    target_table: &str,
    relation: &RelationDescriptor,
) -> BuiltRelation {
    let column = JoinColumn::referencing(fk_column_name(attribute), target_table);

    // The mirrored view points back at the owning table through the same
    // physical column.
    let inverse = relation.inversed_by.as_ref().and_then(|inverse_attribute| {
        relation.target.as_ref().map(|target| InverseBinding {
            schema: target.clone(),
            attribute: inverse_attribute.clone(),
            metadata: RelationMetadata::InverseJoinColumn(JoinColumn::referencing(
                column.name.clone(),
                source_table,
            )),
        })
    });

    BuiltRelation {
        metadata: Some(RelationMetadata::JoinColumn(column)),
        inverse,
        synthetic: None,
    }
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::build_relation;
    use crate::{
        error::SchemaError,
        metadata::RelationMetadata,
        node::{Attribute, Component, ContentType, RelationDescriptor},
        registry::SchemaRegistry,
        types::{RelationKind, ScalarKind, SchemaRef},
    };

    fn registry() -> SchemaRegistry {
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
                ContentType::new("authors").attribute("name", Attribute::Scalar(ScalarKind::String)),
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

    fn article() -> SchemaRef {
        SchemaRef::new("api::article")
    }

    #[test]
    fn one_to_one_join_column_mirrors_inverse_side() {
        let registry = registry();
        let relation = RelationDescriptor::new(RelationKind::OneToOne, "api::author")
            .inversed_by("article")
            .join_column();

        let built = build_relation(&article(), "articles", "author", &relation, &registry)
            .expect("build should succeed");

        let Some(RelationMetadata::JoinColumn(column)) = built.metadata else {
            panic!("expected a join column on the owning side");
        };
        assert_eq!(column.name, "author_id");
        assert_eq!(column.referenced_table, "authors");
        assert_eq!(column.referenced_column, "id");

        let binding = built.inverse.expect("inverse side should be mirrored");
        assert_eq!(binding.schema, SchemaRef::new("api::author"));
        assert_eq!(binding.attribute, "article");
        let RelationMetadata::InverseJoinColumn(mirrored) = binding.metadata else {
            panic!("expected a mirrored inverse join column");
        };
        assert_eq!(mirrored.name, "author_id");
        assert_eq!(mirrored.referenced_table, "articles");
        assert!(built.synthetic.is_none());
    }

    #[test]
    fn one_to_one_defaults_to_join_table_without_order_columns() {
        let registry = registry();
        let relation = RelationDescriptor::new(RelationKind::OneToOne, "api::author");

        let built = build_relation(&article(), "articles", "author", &relation, &registry)
            .expect("build should succeed");

        let Some(RelationMetadata::JoinTable(table)) = built.metadata else {
            panic!("expected a join table");
        };
        assert_eq!(table.name, "articles_author_links");
        assert_eq!(table.join_column.name, "articles_id");
        assert_eq!(table.inverse_join_column.name, "authors_id");
        assert!(table.order_column.is_none());
        assert!(table.inverse_order_column.is_none());
        assert_eq!(table.pivot_columns, vec!["articles_id", "authors_id"]);
        assert!(built.synthetic.is_some());
    }

    #[test]
    fn unidirectional_one_to_many_carries_an_order_column() {
        let registry = registry();
        let relation = RelationDescriptor::new(RelationKind::OneToMany, "api::author");

        let built = build_relation(&article(), "articles", "reviewers", &relation, &registry)
            .expect("build should succeed");

        let Some(RelationMetadata::JoinTable(table)) = built.metadata else {
            panic!("expected a join table");
        };
        assert_eq!(table.order_column.as_deref(), Some("reviewers_order"));
        assert!(table.inverse_order_column.is_none());
    }

    #[test]
    fn bidirectional_one_to_many_owner_is_a_configuration_error() {
        let registry = registry();
        let relation =
            RelationDescriptor::new(RelationKind::OneToMany, "api::author").inversed_by("article");

        let err = build_relation(&article(), "articles", "reviewers", &relation, &registry)
            .expect_err("owning one-to-many must be rejected");

        assert!(matches!(err, SchemaError::OneToManyOwner { .. }));
    }

    #[test]
    fn many_to_one_owns_the_bidirectional_pair() {
        let registry = registry();
        let relation =
            RelationDescriptor::new(RelationKind::ManyToOne, "api::author").inversed_by("articles");

        let built = build_relation(&article(), "articles", "author", &relation, &registry)
            .expect("build should succeed");

        let Some(RelationMetadata::JoinTable(table)) = built.metadata else {
            panic!("expected a join table");
        };
        // The to-one side itself is unordered; its one-to-many inverse is
        // the ordered view.
        assert!(table.order_column.is_none());
        assert_eq!(table.inverse_order_column.as_deref(), Some("articles_order"));

        let binding = built.inverse.expect("inverse side should be mirrored");
        let RelationMetadata::InverseJoinTable(inverted) = binding.metadata else {
            panic!("expected a mirrored inverse join table");
        };
        assert_eq!(inverted.name, table.name);
        assert_eq!(inverted.join_column, table.inverse_join_column);
        assert_eq!(inverted.inverse_join_column, table.join_column);
        assert_eq!(inverted.order_column, table.inverse_order_column);
    }

    #[test]
    fn non_owning_sides_produce_no_metadata() {
        let registry = registry();
        let relation =
            RelationDescriptor::new(RelationKind::OneToMany, "api::article").mapped_by("author");

        let built = build_relation(
            &SchemaRef::new("api::author"),
            "authors",
            "articles",
            &relation,
            &registry,
        )
        .expect("build should succeed");

        assert!(built.metadata.is_none());
        assert!(built.inverse.is_none());
        assert!(built.synthetic.is_none());
    }

    #[test]
    fn self_referencing_many_to_many_disambiguates_all_columns() {
        let registry = registry();
        let relation = RelationDescriptor::new(RelationKind::ManyToMany, "api::article");

        let built = build_relation(&article(), "articles", "related", &relation, &registry)
            .expect("build should succeed");

        let Some(RelationMetadata::JoinTable(table)) = built.metadata else {
            panic!("expected a join table");
        };
        assert_eq!(table.join_column.name, "articles_id");
        assert_eq!(table.inverse_join_column.name, "inv_articles_id");
        assert_ne!(table.join_column.name, table.inverse_join_column.name);

        let order = table.order_column.expect("order column should exist");
        let inverse_order = table
            .inverse_order_column
            .expect("inverse order column should exist");
        assert_eq!(order, "related_order");
        assert_eq!(inverse_order, "inv_related_order");
        assert_ne!(order, inverse_order);
    }

    #[test]
    fn bidirectional_many_to_many_swaps_roles_on_the_inverse() {
        let registry = registry();
        let relation =
            RelationDescriptor::new(RelationKind::ManyToMany, "api::author").inversed_by("articles");

        let built = build_relation(&article(), "articles", "authors", &relation, &registry)
            .expect("build should succeed");

        let Some(RelationMetadata::JoinTable(table)) = built.metadata else {
            panic!("expected a join table");
        };
        assert_eq!(table.order_column.as_deref(), Some("authors_order"));
        assert_eq!(table.inverse_order_column.as_deref(), Some("articles_order"));

        let binding = built.inverse.expect("inverse side should be mirrored");
        let RelationMetadata::InverseJoinTable(inverted) = binding.metadata else {
            panic!("expected a mirrored inverse join table");
        };
        assert_eq!(inverted.order_column.as_deref(), Some("articles_order"));
        assert_eq!(inverted.inverse_order_column.as_deref(), Some("authors_order"));
    }

    #[test]
    fn morph_to_one_attaches_a_type_and_id_column_pair() {
        let registry = registry();
        let relation = RelationDescriptor::morph_to(RelationKind::MorphToOne);

        let built = build_relation(&article(), "articles", "owner", &relation, &registry)
            .expect("build should succeed");

        let Some(RelationMetadata::MorphColumns(columns)) = built.metadata else {
            panic!("expected morph columns");
        };
        assert_eq!(columns.type_column, "owner_type");
        assert_eq!(columns.id_column, "owner_id");
        assert!(built.synthetic.is_none());
    }

    #[test]
    fn morph_to_many_creates_a_discriminated_join_table() {
        let registry = registry();
        let relation = RelationDescriptor::morph_to(RelationKind::MorphToMany);

        let built = build_relation(&article(), "articles", "tags", &relation, &registry)
            .expect("build should succeed");

        let Some(RelationMetadata::MorphJoinTable(table)) = built.metadata else {
            panic!("expected a morph join table");
        };
        assert_eq!(table.name, "articles_tags_morphs");
        assert_eq!(table.morph_columns.type_column, "morph_type");
        assert_eq!(table.morph_columns.id_column, "morph_id");
        assert_eq!(table.order_column, "tags_order");
        assert!(built.synthetic.is_some());
    }

    #[test]
    fn morph_one_requires_the_named_morph_by_attribute() {
        let mut registry = registry();
        registry
            .register_content_type(
                "api::image",
                ContentType::new("images")
                    .attribute(
                        "owner",
                        Attribute::Relation(RelationDescriptor::morph_to(
                            RelationKind::MorphToOne,
                        )),
                    )
                    .attribute(
                        "gallery",
                        Attribute::Relation(RelationDescriptor::new(
                            RelationKind::ManyToOne,
                            "api::article",
                        )),
                    ),
            )
            .expect("image should register");

        let valid = RelationDescriptor::new(RelationKind::MorphOne, "api::image").morph_by("owner");
        build_relation(&article(), "articles", "cover", &valid, &registry)
            .expect("valid morph_by should build");

        let missing =
            RelationDescriptor::new(RelationKind::MorphOne, "api::image").morph_by("holder");
        let err = build_relation(&article(), "articles", "cover", &missing, &registry)
            .expect_err("missing morph_by attribute must be rejected");
        assert!(matches!(err, SchemaError::MissingMorphBy { .. }));

        let scalar =
            RelationDescriptor::new(RelationKind::MorphOne, "api::article").morph_by("title");
        let err = build_relation(&article(), "images", "cover", &scalar, &registry)
            .expect_err("non-relation morph_by must be rejected");
        assert!(matches!(err, SchemaError::MissingMorphBy { .. }));

        let wrong_kind =
            RelationDescriptor::new(RelationKind::MorphMany, "api::image").morph_by("gallery");
        let err = build_relation(&article(), "articles", "images", &wrong_kind, &registry)
            .expect_err("non-morph morph_by must be rejected");
        assert!(matches!(err, SchemaError::InvalidMorphBy { .. }));
    }

    #[test]
    fn missing_target_schema_fails_fast() {
        let registry = registry();
        let relation = RelationDescriptor::new(RelationKind::ManyToOne, "api::missing");

        let err = build_relation(&article(), "articles", "author", &relation, &registry)
            .expect_err("unknown target must be rejected");
        assert!(matches!(err, SchemaError::MissingTarget { .. }));
    }

    #[test]
    fn building_twice_produces_identical_metadata() {
        let registry = registry();
        let relation =
            RelationDescriptor::new(RelationKind::ManyToMany, "api::author").inversed_by("articles");

        let first = build_relation(&article(), "articles", "authors", &relation, &registry)
            .expect("build should succeed");
        let second = build_relation(&article(), "articles", "authors", &relation, &registry)
            .expect("build should succeed");

        assert_eq!(first.metadata, second.metadata);
        assert_eq!(
            first.synthetic.map(|t| t.name().clone()),
            second.synthetic.map(|t| t.name().clone())
        );
    }

    mod naming_properties {
        use crate::metadata::{
            inverse_name, join_table_name, morph_table_name, order_column_name, table_id_column,
        };
        use proptest::prelude::*;

        proptest! {
            // Physical names must be pure functions of their inputs and
            // self-referencing columns must never collide.
            #[test]
            fn names_are_deterministic_and_collision_free(
                table in "[a-z][a-z_]{0,20}",
                attribute in "[a-z][a-z_]{0,20}",
            ) {
                prop_assert_eq!(
                    join_table_name(&table, &attribute),
                    join_table_name(&table, &attribute)
                );
                prop_assert_eq!(
                    morph_table_name(&table, &attribute),
                    morph_table_name(&table, &attribute)
                );
                prop_assert_ne!(
                    table_id_column(&table),
                    inverse_name(&table_id_column(&table))
                );
                prop_assert_ne!(
                    order_column_name(&attribute),
                    inverse_name(&order_column_name(&attribute))
                );
            }
        }
    }
}
