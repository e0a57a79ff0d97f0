//! Data model document for the navigator.
//!
//! Entities, attributes and relationships discovered from live databases,
//! plus the aggregate [`DataModel`] that every phase reads and writes.
//! The serde shape *is* the on-disk contract:
//! `{entities, relationships, metadata}`; the persisted JSON round-trips
//! exactly through these types.

pub mod curation;
pub mod io;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single column/field with an inferred or declared type.
///
/// Immutable once discovered; cleanup may remove it from its entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub source: String,
}

fn default_nullable() -> bool {
    true
}

impl Attribute {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            source: String::new(),
        }
    }
}

/// A discovered table or collection: a named bag of attributes.
///
/// Ids are namespaced by source (`pg:<table>` / `mg:<collection>`) so the two
/// backends can never collide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub source_system: String,
    pub source_type: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Entity {
    /// Append `tag` unless the entity already carries it.
    ///
    /// Returns whether the tag was added, so guidance merging stays idempotent.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }
}

/// An inferred or manually declared foreign-key-like link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub from_entity: String,
    pub from_field: String,
    pub to_entity: String,
    pub to_field: String,
    /// Heuristic certainty in [0, 1]; not a statistical probability.
    pub confidence: f64,
    /// `"auto"` for heuristic suggestions, `"manual"` for user-declared links.
    pub source: String,
}

impl Relationship {
    /// Deterministic id shared by heuristic and manual relationships.
    ///
    /// Uniqueness is enforced on this string, so the same endpoints + fields
    /// can never be recorded twice.
    pub fn derive_id(from_entity: &str, from_field: &str, to_entity: &str, to_field: &str) -> String {
        format!("rel:{from_entity}:{from_field}->{to_entity}:{to_field}")
    }
}

/// The aggregate root: everything discovery, curation and guidance produce.
///
/// `metadata` is a free-form map (discovery logs, LLM outputs, sample caches).
/// Relationship endpoints *should* reference existing entity ids, but this is
/// not enforced here: the viewer tolerates dangling references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataModel {
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl DataModel {
    /// Exact id lookup. Absence is a signal, not an error: callers decide how
    /// to reject unknown ids.
    pub fn find_entity(&self, entity_id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == entity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_tag_is_idempotent() {
        let mut entity = Entity {
            id: "pg:orders".into(),
            name: "orders".into(),
            source_system: "postgres".into(),
            source_type: "table".into(),
            attributes: vec![],
            tags: vec![],
        };
        assert!(entity.add_tag("polymorphic-table"));
        assert!(!entity.add_tag("polymorphic-table"));
        assert_eq!(entity.tags, vec!["polymorphic-table".to_string()]);
    }

    #[test]
    fn relationship_id_is_deterministic() {
        let id = Relationship::derive_id("pg:orders", "customer_id", "pg:customer", "id");
        assert_eq!(id, "rel:pg:orders:customer_id->pg:customer:id");
    }

    #[test]
    fn model_json_round_trips() {
        let mut metadata = Map::new();
        metadata.insert("version".into(), serde_json::json!(1));
        let model = DataModel {
            entities: vec![Entity {
                id: "pg:orders".into(),
                name: "orders".into(),
                source_system: "postgres".into(),
                source_type: "table".into(),
                attributes: vec![Attribute {
                    name: "id".into(),
                    type_name: "uuid".into(),
                    nullable: false,
                    source: "postgres".into(),
                }],
                tags: vec!["core".into()],
            }],
            relationships: vec![Relationship {
                id: Relationship::derive_id("pg:orders", "customer_id", "pg:customer", "id"),
                from_entity: "pg:orders".into(),
                from_field: "customer_id".into(),
                to_entity: "pg:customer".into(),
                to_field: "id".into(),
                confidence: 0.7,
                source: "auto".into(),
            }],
            metadata,
        };

        let json = serde_json::to_string(&model).unwrap();
        let restored: DataModel = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, model);
        // The attribute type is serialized under the wire name `type`.
        assert!(json.contains("\"type\":\"uuid\""));
    }

    #[test]
    fn deserialization_fills_optional_fields() {
        let json = r#"{
            "entities": [{
                "id": "mg:events",
                "name": "events",
                "source_system": "mongo",
                "source_type": "collection"
            }]
        }"#;
        let model: DataModel = serde_json::from_str(json).unwrap();
        assert!(model.entities[0].attributes.is_empty());
        assert!(model.entities[0].tags.is_empty());
        assert!(model.relationships.is_empty());
        assert!(model.metadata.is_empty());
    }
}
