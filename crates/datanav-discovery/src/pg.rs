//! PostgreSQL backend.
//!
//! Schema comes from `information_schema.columns`; row counts and samples use
//! one `COUNT(*)` and one bounded `SELECT` per table. Samples are fetched as
//! `row_to_json` so arbitrary column types arrive as plain JSON, then masked
//! before they are stored anywhere.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use postgres::NoTls;
use serde_json::Value;

use datanav_model::{Attribute, Entity};

use crate::anonymize::anonymize_record;
use crate::{PostgresConfig, SourceScan};

const COLUMNS_QUERY: &str = "SELECT c.table_name::text, c.column_name::text, \
     c.data_type::text, c.is_nullable::text \
     FROM information_schema.columns c \
     WHERE c.table_schema = $1 \
     ORDER BY c.table_name, c.ordinal_position";

pub fn scan_postgres(config: &PostgresConfig) -> Result<SourceScan> {
    let mut client = postgres::Config::new()
        .host(&config.host)
        .port(config.port)
        .dbname(&config.dbname)
        .user(&config.user)
        .password(&config.password)
        .connect(NoTls)
        .with_context(|| {
            format!(
                "failed to connect to postgres at {}:{}/{}",
                config.host, config.port, config.dbname
            )
        })?;

    let rows = client
        .query(COLUMNS_QUERY, &[&config.schema])
        .with_context(|| format!("failed to read columns of schema {}", config.schema))?;

    // Rows arrive ordered by table then ordinal position, so both the table
    // order and the attribute order match the catalog.
    let mut by_table: BTreeMap<String, Vec<Attribute>> = BTreeMap::new();
    for row in rows {
        let table: String = row.get(0);
        let column: String = row.get(1);
        let data_type: String = row.get(2);
        let is_nullable: String = row.get(3);
        by_table.entry(table).or_default().push(Attribute {
            name: column,
            type_name: data_type,
            nullable: is_nullable == "YES",
            source: "postgres".to_string(),
        });
    }

    let mut scan = SourceScan::default();
    for (table, attributes) in by_table {
        let qualified = format!(
            "{}.{}",
            quote_ident(&config.schema),
            quote_ident(&table)
        );

        let count_row = client
            .query_one(&format!("SELECT COUNT(*) FROM {qualified}"), &[])
            .with_context(|| format!("failed to count rows of {qualified}"))?;
        let count: i64 = count_row.get(0);

        let sample_rows = client
            .query(
                &format!("SELECT row_to_json(t) FROM (SELECT * FROM {qualified} LIMIT $1) t"),
                &[&config.sample_records],
            )
            .with_context(|| format!("failed to sample rows of {qualified}"))?;
        let samples: Vec<Value> = sample_rows
            .iter()
            .map(|row| anonymize_record(&row.get::<_, Value>(0)))
            .collect();

        tracing::debug!(table = %table, rows = count, samples = samples.len(), "scanned postgres table");

        scan.entities.push(Entity {
            id: format!("pg:{table}"),
            name: table.clone(),
            source_system: "postgres".to_string(),
            source_type: "table".to_string(),
            attributes,
            tags: vec![],
        });
        scan.counts.insert(table.clone(), count.max(0) as u64);
        scan.samples.insert(table, samples);
    }

    Ok(scan)
}

/// Double-quote an identifier for interpolation into COUNT/SELECT statements
/// (the catalog query itself is parameterized).
fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
