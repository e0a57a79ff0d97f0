//! Curation passes over a discovered model.
//!
//! Two in-place operations (technical-field cleanup, manual relationship
//! insertion) plus the suffix-based relationship heuristic. The heuristic is
//! deliberately conservative: it only links `<name>_id` (and, weaker,
//! `<name>id`) attributes to an entity called `<name>`, and it never rescans
//! an attribute once a rule has matched.

use std::collections::{HashMap, HashSet};

use crate::{Attribute, DataModel, Entity, Relationship};

/// Housekeeping fields that carry no modeling signal.
pub const TECHNICAL_NAMES: [&str; 6] = [
    "created_at",
    "updated_at",
    "version",
    "_class",
    "_etag",
    "deleted",
];

/// Confidence assigned to `<name>_id` matches.
const CONFIDENCE_SUFFIX_UNDERSCORE_ID: f64 = 0.70;
/// Confidence assigned to bare `<name>id` matches.
const CONFIDENCE_SUFFIX_ID: f64 = 0.55;

/// Remove denylisted technical attributes from every entity, in place.
///
/// Idempotent: a second run finds nothing left to remove.
pub fn auto_cleanup(model: &mut DataModel) {
    for entity in &mut model.entities {
        entity
            .attributes
            .retain(|a| !TECHNICAL_NAMES.contains(&a.name.to_lowercase().as_str()));
    }
}

/// Suggest foreign-key-like relationships from attribute naming conventions.
///
/// The result is deduplicated (against the model's existing relationships and
/// within itself, first occurrence winning) but *not* merged into the model;
/// the caller decides what to keep.
///
/// Rule precedence: the `_id` suffix is checked first; the bare `id` suffix
/// only applies when the attribute does not end in `_id`. An attribute
/// literally named `id` never matches either rule. Ties between candidates
/// are broken purely by iteration order (entities, then attributes).
pub fn suggest_relationships(model: &DataModel) -> Vec<Relationship> {
    let entity_by_name: HashMap<String, &Entity> = model
        .entities
        .iter()
        .map(|e| (e.name.to_lowercase(), e))
        .collect();

    let mut suggestions: Vec<Relationship> = Vec::new();
    for entity in &model.entities {
        for attr in &entity.attributes {
            let lowered = attr.name.to_lowercase();
            if lowered == "id" {
                continue;
            }
            if let Some(base) = lowered.strip_suffix("_id") {
                if let Some(target) = entity_by_name.get(base) {
                    suggestions.push(auto_relationship(
                        entity,
                        attr,
                        target,
                        CONFIDENCE_SUFFIX_UNDERSCORE_ID,
                    ));
                }
            } else if let Some(base) = lowered.strip_suffix("id") {
                if let Some(target) = entity_by_name.get(base) {
                    suggestions.push(auto_relationship(entity, attr, target, CONFIDENCE_SUFFIX_ID));
                }
            }
        }
    }

    let mut seen: HashSet<String> = model.relationships.iter().map(|r| r.id.clone()).collect();
    suggestions
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

fn auto_relationship(
    entity: &Entity,
    attr: &Attribute,
    target: &Entity,
    confidence: f64,
) -> Relationship {
    Relationship {
        id: Relationship::derive_id(&entity.id, &attr.name, &target.id, "id"),
        from_entity: entity.id.clone(),
        from_field: attr.name.clone(),
        to_entity: target.id.clone(),
        to_field: "id".to_string(),
        confidence,
        source: "auto".to_string(),
    }
}

/// Record a user-declared relationship with full confidence.
///
/// Endpoint existence is the caller's responsibility: check both ids with
/// [`DataModel::find_entity`] before calling.
pub fn add_manual_relationship(
    model: &mut DataModel,
    from_entity: &str,
    from_field: &str,
    to_entity: &str,
    to_field: &str,
) -> Relationship {
    let rel = Relationship {
        id: Relationship::derive_id(from_entity, from_field, to_entity, to_field),
        from_entity: from_entity.to_string(),
        from_field: from_field.to_string(),
        to_entity: to_entity.to_string(),
        to_field: to_field.to_string(),
        confidence: 1.0,
        source: "manual".to_string(),
    };
    model.relationships.push(rel.clone());
    rel
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Attribute;

    fn entity(id: &str, name: &str, attrs: &[(&str, &str)]) -> Entity {
        Entity {
            id: id.to_string(),
            name: name.to_string(),
            source_system: "postgres".to_string(),
            source_type: "table".to_string(),
            attributes: attrs
                .iter()
                .map(|(n, t)| Attribute {
                    name: n.to_string(),
                    type_name: t.to_string(),
                    nullable: false,
                    source: "postgres".to_string(),
                })
                .collect(),
            tags: vec![],
        }
    }

    #[test]
    fn auto_cleanup_removes_technical_fields() {
        let mut model = DataModel {
            entities: vec![entity(
                "pg:orders",
                "orders",
                &[("id", "uuid"), ("created_at", "timestamp"), ("Updated_At", "timestamp")],
            )],
            ..DataModel::default()
        };
        auto_cleanup(&mut model);
        let names: Vec<&str> = model.entities[0]
            .attributes
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["id"]);
    }

    #[test]
    fn auto_cleanup_twice_is_a_no_op() {
        let mut model = DataModel {
            entities: vec![entity(
                "pg:orders",
                "orders",
                &[("id", "uuid"), ("version", "int"), ("amount", "numeric")],
            )],
            ..DataModel::default()
        };
        auto_cleanup(&mut model);
        let after_first = model.clone();
        auto_cleanup(&mut model);
        assert_eq!(model, after_first);
    }

    #[test]
    fn suggest_relationships_from_underscore_id_suffix() {
        let model = DataModel {
            entities: vec![
                entity("pg:orders", "orders", &[("customer_id", "uuid")]),
                entity("pg:customer", "customer", &[("id", "uuid")]),
            ],
            ..DataModel::default()
        };

        let rels = suggest_relationships(&model);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].id, "rel:pg:orders:customer_id->pg:customer:id");
        assert_eq!(rels[0].from_entity, "pg:orders");
        assert_eq!(rels[0].from_field, "customer_id");
        assert_eq!(rels[0].to_entity, "pg:customer");
        assert_eq!(rels[0].to_field, "id");
        assert_eq!(rels[0].confidence, 0.70);
        assert_eq!(rels[0].source, "auto");
    }

    #[test]
    fn suggest_relationships_from_bare_id_suffix_is_weaker() {
        let model = DataModel {
            entities: vec![
                entity("pg:orders", "orders", &[("customerid", "uuid")]),
                entity("pg:customer", "customer", &[("id", "uuid")]),
            ],
            ..DataModel::default()
        };

        let rels = suggest_relationships(&model);
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].confidence, 0.55);
    }

    #[test]
    fn attribute_named_id_never_links_to_itself() {
        let model = DataModel {
            entities: vec![entity("pg:customer", "customer", &[("id", "uuid")])],
            ..DataModel::default()
        };
        assert!(suggest_relationships(&model).is_empty());
    }

    #[test]
    fn matching_is_case_insensitive() {
        let model = DataModel {
            entities: vec![
                entity("pg:orders", "orders", &[("Customer_ID", "uuid")]),
                entity("pg:customer", "Customer", &[("id", "uuid")]),
            ],
            ..DataModel::default()
        };

        let rels = suggest_relationships(&model);
        assert_eq!(rels.len(), 1);
        // The id keeps the attribute's original spelling.
        assert_eq!(rels[0].id, "rel:pg:orders:Customer_ID->pg:customer:id");
    }

    #[test]
    fn rerun_against_merged_model_suggests_nothing_new() {
        let mut model = DataModel {
            entities: vec![
                entity("pg:orders", "orders", &[("customer_id", "uuid")]),
                entity("pg:customer", "customer", &[("id", "uuid")]),
            ],
            ..DataModel::default()
        };

        let first = suggest_relationships(&model);
        assert_eq!(first.len(), 1);
        model.relationships.extend(first);

        assert!(suggest_relationships(&model).is_empty());
    }

    #[test]
    fn duplicate_candidates_keep_first_occurrence() {
        // Two entities named the same (different sources) pointing at one
        // target produce distinct ids; the same entity listed twice does not.
        let orders = entity("pg:orders", "orders", &[("customer_id", "uuid")]);
        let model = DataModel {
            entities: vec![
                orders.clone(),
                orders,
                entity("pg:customer", "customer", &[("id", "uuid")]),
            ],
            ..DataModel::default()
        };

        let rels = suggest_relationships(&model);
        assert_eq!(rels.len(), 1);
    }

    #[test]
    fn manual_relationship_has_full_confidence() {
        let mut model = DataModel {
            entities: vec![
                entity("pg:orders", "orders", &[]),
                entity("mg:customer", "customer", &[]),
            ],
            ..DataModel::default()
        };

        let rel = add_manual_relationship(&mut model, "pg:orders", "customer_ref", "mg:customer", "id");
        assert_eq!(rel.confidence, 1.0);
        assert_eq!(rel.source, "manual");
        assert_eq!(rel.id, "rel:pg:orders:customer_ref->mg:customer:id");
        assert_eq!(model.relationships.len(), 1);
    }

    #[test]
    fn find_entity_signals_absence() {
        let model = DataModel {
            entities: vec![entity("pg:orders", "orders", &[])],
            ..DataModel::default()
        };
        assert!(model.find_entity("pg:orders").is_some());
        assert!(model.find_entity("pg:missing").is_none());
    }
}
