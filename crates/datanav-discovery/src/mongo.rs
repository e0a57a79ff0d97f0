//! MongoDB backend.
//!
//! Collections have no declared schema, so the attribute set is inferred from
//! a bounded scan: every key seen in the first `sample_size` documents, typed
//! by its dominant BSON type. A smaller `sample_records` slice is anonymized
//! and kept for deep discovery.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use mongodb::bson::{Bson, Document};
use mongodb::options::FindOptions;
use mongodb::sync::Client;
use serde_json::Value;

use datanav_model::{Attribute, Entity};

use crate::anonymize::anonymize_record;
use crate::{MongoConfig, SourceScan};

pub fn scan_mongo(config: &MongoConfig) -> Result<SourceScan> {
    let client = Client::with_uri_str(&config.uri)
        .with_context(|| format!("failed to connect to mongodb at {}", config.uri))?;
    let db = client.database(&config.dbname);

    let mut names = db
        .list_collection_names(None)
        .with_context(|| format!("failed to list collections of {}", config.dbname))?;
    names.sort();

    let mut scan = SourceScan::default();
    for name in names {
        let collection = db.collection::<Document>(&name);

        let count = collection
            .count_documents(None, None)
            .with_context(|| format!("failed to count documents of {name}"))?;

        // Schema pass: collect every key and its observed values.
        let mut values_by_key: BTreeMap<String, Vec<Bson>> = BTreeMap::new();
        let cursor = collection
            .find(None, FindOptions::builder().limit(config.sample_size).build())
            .with_context(|| format!("failed to scan documents of {name}"))?;
        for document in cursor {
            let document = document.with_context(|| format!("failed to read a document of {name}"))?;
            for (key, value) in document {
                values_by_key.entry(key).or_default().push(value);
            }
        }

        // Deep-sample pass: anonymized records for prompts and the model file.
        let cursor = collection
            .find(
                None,
                FindOptions::builder().limit(config.sample_records).build(),
            )
            .with_context(|| format!("failed to sample documents of {name}"))?;
        let mut samples: Vec<Value> = Vec::new();
        for document in cursor {
            let document = document.with_context(|| format!("failed to read a document of {name}"))?;
            let value = serde_json::to_value(&document)
                .with_context(|| format!("failed to convert a document of {name} to JSON"))?;
            samples.push(anonymize_record(&value));
        }

        let attributes: Vec<Attribute> = values_by_key
            .iter()
            .map(|(key, values)| Attribute {
                name: key.clone(),
                type_name: dominant_type(values),
                nullable: false,
                source: "mongo".to_string(),
            })
            .collect();

        tracing::debug!(collection = %name, documents = count, samples = samples.len(), "scanned mongodb collection");

        scan.entities.push(Entity {
            id: format!("mg:{name}"),
            name: name.clone(),
            source_system: "mongo".to_string(),
            source_type: "collection".to_string(),
            attributes,
            tags: vec![],
        });
        scan.counts.insert(name.clone(), count);
        scan.samples.insert(name, samples);
    }

    Ok(scan)
}

/// The most frequent non-null BSON type among the observed values; ties are
/// broken by first appearance. `"unknown"` when every value was null.
fn dominant_type(values: &[Bson]) -> String {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for value in values {
        if matches!(value, Bson::Null) {
            continue;
        }
        let type_name = bson_type_name(value);
        match counts.iter_mut().find(|(name, _)| *name == type_name) {
            Some((_, count)) => *count += 1,
            None => counts.push((type_name, 1)),
        }
    }
    let mut best: Option<(&'static str, usize)> = None;
    for (name, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((name, count));
        }
    }
    best.map(|(name, _)| name.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn bson_type_name(value: &Bson) -> &'static str {
    match value {
        Bson::Double(_) => "double",
        Bson::String(_) => "string",
        Bson::Array(_) => "array",
        Bson::Document(_) => "document",
        Bson::Boolean(_) => "bool",
        Bson::Int32(_) => "int",
        Bson::Int64(_) => "long",
        Bson::ObjectId(_) => "objectId",
        Bson::DateTime(_) => "date",
        Bson::Decimal128(_) => "decimal",
        Bson::Binary(_) => "binary",
        Bson::Timestamp(_) => "timestamp",
        _ => "other",
    }
}
