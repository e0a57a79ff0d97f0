//! Live schema discovery.
//!
//! Connects to PostgreSQL/MongoDB, extracts entities plus row counts and a
//! bounded sample of records per entity, anonymizes anything
//! personal-data-shaped before it leaves this crate, and assembles the
//! aggregate model, optionally running the LLM guidance pass over the
//! discovered entities.
//!
//! Each backend sits behind a cargo feature (both on by default) so a build
//! without a driver fails with a rebuild instruction instead of a link error.
//! Everything here is blocking and strictly sequential.

pub mod anonymize;

#[cfg(feature = "mongo-backend")]
mod mongo;
#[cfg(feature = "postgres-backend")]
mod pg;

#[cfg(feature = "mongo-backend")]
pub use mongo::scan_mongo;
#[cfg(feature = "postgres-backend")]
pub use pg::scan_postgres;

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use datanav_llm::{analyze_entity_samples, apply_llm_guidance, LlmCaller, LlmConfig};
use datanav_model::{DataModel, Entity};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub schema: String,
    #[serde(default = "default_sample_records")]
    pub sample_records: i64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "postgres".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            schema: "public".to_string(),
            sample_records: default_sample_records(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub dbname: String,
    /// Documents scanned per collection to infer the attribute set.
    #[serde(default = "default_sample_size")]
    pub sample_size: i64,
    /// Anonymized documents kept per collection for deep discovery.
    #[serde(default = "default_sample_records")]
    pub sample_records: i64,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            dbname: "test".to_string(),
            sample_size: default_sample_size(),
            sample_records: default_sample_records(),
        }
    }
}

fn default_sample_records() -> i64 {
    50
}

fn default_sample_size() -> i64 {
    200
}

/// Everything one source contributes: entities, per-table/collection record
/// counts, and anonymized samples keyed by the bare table/collection name.
#[derive(Debug, Clone, Default)]
pub struct SourceScan {
    pub entities: Vec<Entity>,
    pub counts: BTreeMap<String, u64>,
    pub samples: BTreeMap<String, Vec<Value>>,
}

/// The optional guidance leg of discovery: a config plus an injected caller.
pub struct GuidancePass<'a> {
    pub config: &'a LlmConfig,
    pub caller: &'a dyn LlmCaller,
}

#[cfg(not(feature = "postgres-backend"))]
pub fn scan_postgres(_config: &PostgresConfig) -> Result<SourceScan> {
    anyhow::bail!(
        "PostgreSQL support is not compiled into this build; \
         rebuild datanav with the `postgres-backend` feature (enabled by default)"
    )
}

#[cfg(not(feature = "mongo-backend"))]
pub fn scan_mongo(_config: &MongoConfig) -> Result<SourceScan> {
    anyhow::bail!(
        "MongoDB support is not compiled into this build; \
         rebuild datanav with the `mongo-backend` feature (enabled by default)"
    )
}

/// Run the configured scans and assemble the model.
pub fn discover_model(
    postgres: Option<&PostgresConfig>,
    mongo: Option<&MongoConfig>,
    llm: Option<GuidancePass<'_>>,
) -> Result<DataModel> {
    let pg_scan = postgres.map(scan_postgres).transpose()?;
    let mg_scan = mongo.map(scan_mongo).transpose()?;
    assemble_model(pg_scan, mg_scan, llm)
}

/// Build the aggregate model from per-source scans.
///
/// Metadata layout (all keys optional except `version` and `discovery_log`):
/// `discovery_count_log`, `interpretation_prompt`,
/// `interpretation_instructions`, `llm_batches`, `llm_sample_insights`,
/// `deep_discovery_samples`.
pub fn assemble_model(
    postgres: Option<SourceScan>,
    mongo: Option<SourceScan>,
    llm: Option<GuidancePass<'_>>,
) -> Result<DataModel> {
    let mut model = DataModel::default();
    model.metadata.insert("version".to_string(), json!(1));

    let mut discovery_log: Vec<String> = Vec::new();
    let mut count_lines: Vec<String> = Vec::new();
    // Deep samples are keyed by entity id so guidance can look them up later.
    let mut deep_samples: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    if let Some(scan) = postgres {
        discovery_log.push(format!(
            "step 1/4 - analyzed {} sql tables in the postgres database",
            scan.counts.len()
        ));
        for (name, count) in &scan.counts {
            count_lines.push(format!("postgres.{name}: {count} rows"));
        }
        for (name, docs) in scan.samples {
            deep_samples.insert(format!("pg:{name}"), docs);
        }
        model.entities.extend(scan.entities);
    }

    if let Some(scan) = mongo {
        discovery_log.push(format!(
            "step 2/4 - analyzed {} mongodb collections in the database",
            scan.counts.len()
        ));
        for (name, count) in &scan.counts {
            count_lines.push(format!("mongo.{name}: {count} rows"));
        }
        for (name, docs) in scan.samples {
            deep_samples.insert(format!("mg:{name}"), docs);
        }
        model.entities.extend(scan.entities);
    }

    if !count_lines.is_empty() {
        model
            .metadata
            .insert("discovery_count_log".to_string(), json!(count_lines));
        discovery_log.push(
            "step 3/4 - completed COUNT(*)/count_documents queries for every entity".to_string(),
        );
    }

    if let Some(pass) = llm.filter(|p| !p.config.user_prompt.trim().is_empty()) {
        let guidance = apply_llm_guidance(&mut model.entities, pass.config, pass.caller)
            .context("LLM guidance over the discovered schema failed")?;
        model.metadata.insert(
            "interpretation_prompt".to_string(),
            json!(pass.config.user_prompt),
        );
        model.metadata.insert(
            "interpretation_instructions".to_string(),
            json!(guidance.instructions),
        );
        model
            .metadata
            .insert("llm_batches".to_string(), json!(guidance.raw_responses.len()));

        let mut sample_insights = serde_json::Map::new();
        for entity in &model.entities {
            let Some(samples) = deep_samples.get(&entity.id) else {
                continue;
            };
            if samples.is_empty() {
                continue;
            }
            let insights = analyze_entity_samples(
                &entity.name,
                &entity.source_system,
                samples,
                pass.config,
                pass.caller,
            )
            .with_context(|| format!("sample analysis for {} failed", entity.id))?;
            if !insights.is_empty() {
                sample_insights.insert(entity.id.clone(), json!(insights));
            }
        }
        if !sample_insights.is_empty() {
            model.metadata.insert(
                "llm_sample_insights".to_string(),
                Value::Object(sample_insights),
            );
            discovery_log.push(
                "step 4/4 - ran deep discovery over anonymized records with LLM support"
                    .to_string(),
            );
        }
    }

    if !deep_samples.is_empty() {
        model.metadata.insert(
            "deep_discovery_samples".to_string(),
            json!(deep_samples),
        );
    }
    model
        .metadata
        .insert("discovery_log".to_string(), json!(discovery_log));

    Ok(model)
}
