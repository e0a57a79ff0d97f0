//! Phase orchestration and the interactive menu.
//!
//! Every phase is also reachable as a plain subcommand so the tool can run
//! scripted; the menu just loops over the same functions and keeps going
//! when a phase fails.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use dialoguer::{Confirm, Input};

use datanav_discovery::{discover_model, GuidancePass, MongoConfig, PostgresConfig};
use datanav_llm::{HttpCaller, LlmConfig, TlsSettings};
use datanav_model::curation::{add_manual_relationship, auto_cleanup, suggest_relationships};
use datanav_model::io::{load_model, save_model};

use crate::profile::{load_saved_config, save_config, SavedConfig};
use crate::viewer::write_viewer;

pub const DEFAULT_MODEL_PATH: &str = "output/model.json";
pub const DEFAULT_CONFIG_PATH: &str = "output/config.json";
pub const DEFAULT_VIEWER_PATH: &str = "output/viewer.html";

pub fn phase_discovery() -> Result<()> {
    println!("\n{}", "== phase 1: connection and discovery ==".bold());
    let saved = load_or_interview()?;

    // TLS overrides are resolved once here, not inside the transport.
    let caller = HttpCaller::new(TlsSettings::from_env());
    let llm_pass = saved
        .llm
        .as_ref()
        .filter(|config| !config.user_prompt.trim().is_empty())
        .map(|config| GuidancePass {
            config,
            caller: &caller,
        });

    let model = discover_model(saved.postgres.as_ref(), saved.mongo.as_ref(), llm_pass)?;
    save_model(&model, Path::new(DEFAULT_MODEL_PATH))?;
    println!("model discovered and saved to {DEFAULT_MODEL_PATH}");
    Ok(())
}

pub fn phase_curation() -> Result<()> {
    println!("\n{}", "== phase 2: cleanup and relationships ==".bold());
    let mut model = load_model(Path::new(DEFAULT_MODEL_PATH))?;

    auto_cleanup(&mut model);
    println!("automatic cleanup done (technical fields removed)");

    let auto_rels = suggest_relationships(&model);
    println!("relationships suggested automatically: {}", auto_rels.len());
    model.relationships.extend(auto_rels);

    loop {
        println!("\navailable entities:");
        for entity in &model.entities {
            println!("- {} ({} fields)", entity.id, entity.attributes.len());
        }

        if !Confirm::new()
            .with_prompt("add a manual relationship?")
            .default(false)
            .interact()?
        {
            break;
        }

        let from_entity: String = Input::new().with_prompt("from_entity (id)").interact_text()?;
        let to_entity: String = Input::new().with_prompt("to_entity (id)").interact_text()?;
        if model.find_entity(&from_entity).is_none() || model.find_entity(&to_entity).is_none() {
            println!("{}", "entity not found".red());
            continue;
        }
        let from_field: String = Input::new().with_prompt("from_field").interact_text()?;
        let to_field: String = Input::new()
            .with_prompt("to_field")
            .default("id".to_string())
            .interact_text()?;

        let rel = add_manual_relationship(&mut model, &from_entity, &from_field, &to_entity, &to_field);
        println!("added manual relationship: {}", rel.id);
    }

    save_model(&model, Path::new(DEFAULT_MODEL_PATH))?;
    println!("curated model saved to {DEFAULT_MODEL_PATH}");
    Ok(())
}

pub fn phase_viewer(open_browser: bool) -> Result<()> {
    println!("\n{}", "== phase 3: navigable E/R viewer ==".bold());
    let model = load_model(Path::new(DEFAULT_MODEL_PATH))?;
    let path = Path::new(DEFAULT_VIEWER_PATH);
    write_viewer(&model, path)?;
    println!("viewer written to {}", path.display());
    if open_browser {
        open::that(path).with_context(|| format!("failed to open {}", path.display()))?;
    }
    Ok(())
}

pub fn phase_show_json() -> Result<()> {
    let model = load_model(Path::new(DEFAULT_MODEL_PATH))?;
    println!("{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}

pub fn interactive_menu() -> Result<()> {
    loop {
        println!("\n{}", "=== Data Model Navigator ===".bold());
        println!("1) discovery from PostgreSQL/Mongo");
        println!("2) curation: cleanup + relationships");
        println!("3) generate the E/R viewer");
        println!("4) show the model JSON");
        println!("0) exit");

        let choice: String = Input::new().with_prompt("pick a phase").interact_text()?;
        let result = match choice.trim() {
            "0" => return Ok(()),
            "1" => phase_discovery(),
            "2" => phase_curation(),
            "3" => {
                let open_browser = Confirm::new()
                    .with_prompt("open the browser automatically?")
                    .default(false)
                    .interact()?;
                phase_viewer(open_browser)
            }
            "4" => phase_show_json(),
            _ => {
                println!("invalid choice");
                continue;
            }
        };

        if let Err(err) = result {
            if is_missing_file(&err) {
                println!(
                    "{}",
                    format!("model file {DEFAULT_MODEL_PATH} not found; run phase 1 first").yellow()
                );
            } else {
                println!("{}", format!("error: {err:#}").red());
            }
        }
    }
}

fn is_missing_file(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<std::io::Error>()
            .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound)
    })
}

/// Reuse the saved profile when present; otherwise run the interview and
/// offer to persist the answers.
fn load_or_interview() -> Result<SavedConfig> {
    let path = Path::new(DEFAULT_CONFIG_PATH);
    if path.exists() {
        let saved = load_saved_config(path)?;
        println!("using saved connection profile from {}", path.display());
        return Ok(saved);
    }

    let saved = interview()?;
    if Confirm::new()
        .with_prompt(format!("save these answers to {DEFAULT_CONFIG_PATH} for next time?"))
        .default(true)
        .interact()?
    {
        save_config(&saved, path)?;
    }
    Ok(saved)
}

fn interview() -> Result<SavedConfig> {
    let postgres = if Confirm::new()
        .with_prompt("connect to PostgreSQL?")
        .default(true)
        .interact()?
    {
        Some(PostgresConfig {
            host: Input::new()
                .with_prompt("pg host")
                .default("localhost".to_string())
                .interact_text()?,
            port: Input::new().with_prompt("pg port").default(5432u16).interact_text()?,
            dbname: Input::new()
                .with_prompt("pg dbname")
                .default("postgres".to_string())
                .interact_text()?,
            user: Input::new()
                .with_prompt("pg user")
                .default("postgres".to_string())
                .interact_text()?,
            password: Input::new()
                .with_prompt("pg password")
                .default("postgres".to_string())
                .interact_text()?,
            schema: Input::new()
                .with_prompt("pg schema")
                .default("public".to_string())
                .interact_text()?,
            ..PostgresConfig::default()
        })
    } else {
        None
    };

    let mongo = if Confirm::new()
        .with_prompt("connect to MongoDB?")
        .default(true)
        .interact()?
    {
        Some(MongoConfig {
            uri: Input::new()
                .with_prompt("mongo URI")
                .default("mongodb://localhost:27017".to_string())
                .interact_text()?,
            dbname: Input::new()
                .with_prompt("mongo dbname")
                .default("test".to_string())
                .interact_text()?,
            sample_size: Input::new()
                .with_prompt("mongo sample size")
                .default(200i64)
                .interact_text()?,
            ..MongoConfig::default()
        })
    } else {
        None
    };

    let llm = if Confirm::new()
        .with_prompt("load an LLM interpretation prompt?")
        .default(false)
        .interact()?
    {
        let user_prompt: String = Input::new().with_prompt("interpretation prompt").interact_text()?;
        let batch_size: usize = Input::new()
            .with_prompt("entity batch size per LLM call (0 = single call over the whole schema)")
            .default(0usize)
            .interact_text()?;
        let api_key: String = Input::new()
            .with_prompt("api key (empty = use OPENAI_API_KEY)")
            .allow_empty(true)
            .default(String::new())
            .interact_text()?;
        Some(LlmConfig {
            batch_size,
            api_key: Some(api_key.trim().to_string()).filter(|k| !k.is_empty()),
            ..LlmConfig::new(user_prompt)
        })
    } else {
        None
    };

    Ok(SavedConfig { postgres, mongo, llm })
}
