//! Registration-time validation, staged and deterministic.
//!
//! Phase 1 checks node-local invariants; phase 2 checks cross-schema
//! relation consistency. Both accumulate into an [`ErrorTree`] so one
//! resolve reports every problem at once.

use crate::{
    MAX_ATTRIBUTE_NAME_LEN, MAX_SCHEMA_NAME_LEN,
    err,
    error::ErrorTree,
    node::{Attribute, RelationDescriptor, SchemaNode},
    registry::SchemaRegistry,
    types::SchemaRef,
};
use convert_case::{Case, Casing};

/// Validate node-local invariants across the whole registry.
pub(crate) fn validate_nodes(registry: &SchemaRegistry) -> ErrorTree {
    let mut errs = ErrorTree::new();

    for (path, node) in registry.nodes() {
        validate_ident(path, node, &mut errs);

        for (attribute, descriptor) in node.attributes() {
            validate_attribute_name(path, attribute, &mut errs);

            match descriptor {
                Attribute::Relation(relation) => {
                    validate_relation_shape(path, attribute, relation, &mut errs);
                }
                Attribute::DynamicZone(zone) => {
                    if !node.is_content_type() {
                        err!(
                            errs,
                            "'{path}.{attribute}': dynamic zones cannot be nested inside components"
                        );
                    }
                    if zone.components.is_empty() {
                        err!(errs, "'{path}.{attribute}': dynamic zone allows no components");
                    }
                }
                Attribute::Component(_) | Attribute::Scalar(_) => {}
            }
        }
    }

    errs
}

fn validate_ident(path: &SchemaRef, node: &SchemaNode, errs: &mut ErrorTree) {
    let ident = node.ident();
    if ident.is_empty() {
        err!(errs, "'{path}': schema ident is empty");
    }
    if ident.len() > MAX_SCHEMA_NAME_LEN {
        err!(errs, "'{path}': schema ident exceeds {MAX_SCHEMA_NAME_LEN} characters");
    }
}

fn validate_attribute_name(path: &SchemaRef, attribute: &str, errs: &mut ErrorTree) {
    if attribute.is_empty() {
        err!(errs, "'{path}': attribute name is empty");
    }
    if attribute.len() > MAX_ATTRIBUTE_NAME_LEN {
        err!(
            errs,
            "'{path}.{attribute}': attribute name exceeds {MAX_ATTRIBUTE_NAME_LEN} characters"
        );
    }
    if !attribute.is_case(Case::Snake) && !attribute.is_case(Case::Lower) {
        err!(errs, "'{path}.{attribute}': attribute names must be snake_case");
    }
}

fn validate_relation_shape(
    path: &SchemaRef,
    attribute: &str,
    relation: &RelationDescriptor,
    errs: &mut ErrorTree,
) {
    if relation.inversed_by.is_some() && relation.mapped_by.is_some() {
        err!(
            errs,
            "'{path}.{attribute}': 'inversed_by' and 'mapped_by' are mutually exclusive"
        );
    }

    if relation.kind.requires_target() && relation.target.is_none() {
        err!(errs, "'{path}.{attribute}': relation requires a target schema");
    }

    if relation.kind.is_morph_to() && relation.target.is_some() {
        err!(
            errs,
            "'{path}.{attribute}': morph-to relations must not declare a fixed target"
        );
    }

    if relation.morph_by.is_some() && relation.kind.is_morph_to() {
        err!(errs, "'{path}.{attribute}': 'morph_by' belongs on the owning morph side");
    }
}

/// Validate bidirectional pairs: both sides must exist, agree on kinds,
/// and point back at each other. This also closes the non-owning-side
/// gap: a `mapped_by` side whose owner is missing fails here rather than
/// surfacing as a broken query later.
pub(crate) fn validate_bidirectional(registry: &SchemaRegistry, errs: &mut ErrorTree) {
    for (path, node) in registry.nodes() {
        for (attribute, descriptor) in node.attributes() {
            let Attribute::Relation(relation) = descriptor else {
                continue;
            };

            // Targets missing entirely are reported by the build phase.
            let Some(target_node) = relation.target.as_ref().and_then(|t| registry.get(t)) else {
                continue;
            };

            if let Some(inverse_attribute) = &relation.inversed_by {
                check_opposite(
                    path,
                    attribute,
                    relation,
                    target_node,
                    inverse_attribute,
                    Direction::InversedBy,
                    errs,
                );
            }

            if let Some(inverse_attribute) = &relation.mapped_by {
                check_opposite(
                    path,
                    attribute,
                    relation,
                    target_node,
                    inverse_attribute,
                    Direction::MappedBy,
                    errs,
                );
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Direction {
    InversedBy,
    MappedBy,
}

fn check_opposite(
    path: &SchemaRef,
    attribute: &str,
    relation: &RelationDescriptor,
    target_node: &SchemaNode,
    inverse_attribute: &str,
    direction: Direction,
    errs: &mut ErrorTree,
) {
    let label = match direction {
        Direction::InversedBy => "inversed_by",
        Direction::MappedBy => "mapped_by",
    };

    let Some(opposite) = target_node.relation(inverse_attribute) else {
        err!(
            errs,
            "'{path}.{attribute}': {label} '{inverse_attribute}' does not exist on the target as a relation"
        );
        return;
    };

    if let Some(expected) = relation.kind.expected_inverse() {
        if opposite.kind != expected {
            err!(
                errs,
                "'{path}.{attribute}': inverse '{inverse_attribute}' must be {expected}, found {found}",
                found = opposite.kind
            );
        }
    } else {
        err!(errs, "'{path}.{attribute}': {label} is not valid on a morph relation");
        return;
    }

    let points_back = match direction {
        Direction::InversedBy => opposite.mapped_by.as_deref() == Some(attribute),
        Direction::MappedBy => opposite.inversed_by.as_deref() == Some(attribute),
    };
    if !points_back {
        err!(
            errs,
            "'{path}.{attribute}': inverse '{inverse_attribute}' does not point back via {opposite_label}",
            opposite_label = match direction {
                Direction::InversedBy => "mapped_by",
                Direction::MappedBy => "inversed_by",
            }
        );
    }
}
