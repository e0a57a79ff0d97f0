//! The guidance protocol itself: batching, prompt construction, response
//! parsing, and merging hints back into the model.
//!
//! The endpoint is instructed (via the system message) to answer with a
//! specific JSON object per operation. Responses may still arrive wrapped in
//! a markdown code fence; the fence is stripped before parsing and anything
//! else non-JSON surfaces as [`LlmError::Parse`].

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use datanav_model::{DataModel, Entity};

use crate::caller::LlmCaller;
use crate::error::LlmError;
use crate::LlmConfig;

/// Deduplicated operator instructions plus every raw response text, kept for
/// audit/debug.
#[derive(Debug, Clone, Default)]
pub struct GuidanceOutcome {
    pub instructions: Vec<String>,
    pub raw_responses: Vec<String>,
}

const GUIDANCE_SYSTEM_PROMPT: &str = "You are a data modeling assistant. You receive the \
technical schema of tables/collections and a functional prompt from the operator. Reply ONLY \
with valid JSON of the form: {\"instructions\": [\"...\"], \"entity_hints\": \
{\"<entity_name>\": {\"tags\": [\"...\"], \"notes\": \"...\"}}}. Instructions must be concise \
operational rules for interpreting the data, without analyzing individual records.";

const SAMPLES_SYSTEM_PROMPT: &str = "You are a data modeling assistant. You receive \
already-anonymized records from one table/collection. Reply ONLY with valid JSON of the form: \
{\"insights\": [\"...\"]}. Insights must highlight possible structural or semantic variants \
(for example fields populated only for some records) that are useful for data modeling.";

const CORRECTION_SYSTEM_PROMPT: &str = "You are a data modeling assistant. You receive the \
JSON of a data model and an operator prompt with correction requests. Reply ONLY with valid \
JSON of the form {\"model\": {\"entities\": [], \"relationships\": [], \"metadata\": {}}}. \
Keep the fields present in the schema and apply only corrections consistent with the prompt.";

#[derive(Debug, Default, Deserialize)]
struct EntityHint {
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Deserialize)]
struct GuidanceReply {
    #[serde(default)]
    instructions: Vec<String>,
    #[serde(default)]
    entity_hints: HashMap<String, EntityHint>,
}

#[derive(Debug, Deserialize)]
struct InsightsReply {
    #[serde(default)]
    insights: Vec<String>,
}

/// Annotate entities with endpoint-provided tags/notes and collect global
/// interpretation instructions.
///
/// Entities are partitioned into sequential batches of `config.batch_size`
/// (a single batch when 0), order preserved, no overlap. Tag and note merging
/// is idempotent, so re-running guidance never duplicates annotations.
/// Instructions are deduplicated across batches, first seen wins.
pub fn apply_llm_guidance(
    entities: &mut [Entity],
    config: &LlmConfig,
    caller: &dyn LlmCaller,
) -> Result<GuidanceOutcome, LlmError> {
    if entities.is_empty() {
        return Ok(GuidanceOutcome::default());
    }

    let batch = if config.batch_size == 0 {
        entities.len()
    } else {
        config.batch_size
    };
    let total_batches = entities.len().div_ceil(batch);

    let mut instructions: Vec<String> = Vec::new();
    let mut raw_responses: Vec<String> = Vec::new();

    for (index, chunk) in entities.chunks_mut(batch).enumerate() {
        tracing::debug!(
            batch = index + 1,
            total_batches,
            entities = chunk.len(),
            "submitting guidance batch"
        );
        let payload = chat_payload(
            config,
            GUIDANCE_SYSTEM_PROMPT,
            &format!(
                "Operator prompt:\n{}\n\nTechnical schema (batch):\n{}",
                config.user_prompt,
                schema_snippet(chunk)?
            ),
        );

        let response_text = caller.call(&payload, config)?;
        let reply: GuidanceReply = serde_json::from_str(&strip_code_fences(&response_text))?;
        raw_responses.push(response_text);

        for instruction in reply.instructions {
            if !instructions.contains(&instruction) {
                instructions.push(instruction);
            }
        }
        merge_hints(chunk, &reply.entity_hints);
    }

    Ok(GuidanceOutcome {
        instructions,
        raw_responses,
    })
}

/// Ask the endpoint for observations about one entity's anonymized records.
///
/// Never issues a network call for an empty sample set. Blank insight strings
/// are filtered out of the result.
pub fn analyze_entity_samples(
    entity_name: &str,
    entity_source: &str,
    samples: &[Value],
    config: &LlmConfig,
    caller: &dyn LlmCaller,
) -> Result<Vec<String>, LlmError> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let payload = chat_payload(
        config,
        SAMPLES_SYSTEM_PROMPT,
        &format!(
            "General operator prompt:\n{}\n\nEntity: {} ({})\nAnonymized records (max {}):\n{}",
            config.user_prompt,
            entity_name,
            entity_source,
            samples.len(),
            serde_json::to_string(samples)?
        ),
    );

    let response_text = caller.call(&payload, config)?;
    let reply: InsightsReply = serde_json::from_str(&strip_code_fences(&response_text))?;
    Ok(reply
        .insights
        .into_iter()
        .filter(|s| !s.trim().is_empty())
        .collect())
}

/// Ask the endpoint for a corrected version of the whole model document.
///
/// The response must carry a `model` JSON object; the returned model is a
/// wholesale replacement, not a field-level merge.
pub fn correct_data_model_json(
    model: &DataModel,
    config: &LlmConfig,
    caller: &dyn LlmCaller,
) -> Result<DataModel, LlmError> {
    let payload = chat_payload(
        config,
        CORRECTION_SYSTEM_PROMPT,
        &format!(
            "Operator prompt:\n{}\n\nCurrent model JSON:\n{}",
            config.user_prompt,
            serde_json::to_string(model)?
        ),
    );

    let response_text = caller.call(&payload, config)?;
    let parsed: Value = serde_json::from_str(&strip_code_fences(&response_text))?;
    let corrected = parsed
        .get("model")
        .ok_or_else(|| LlmError::Contract("response is missing the `model` field".to_string()))?;
    if !corrected.is_object() {
        return Err(LlmError::Contract(
            "`model` field is not a JSON object".to_string(),
        ));
    }
    Ok(serde_json::from_value(corrected.clone())?)
}

fn chat_payload(config: &LlmConfig, system: &str, user: &str) -> Value {
    json!({
        "model": config.model,
        "temperature": 0,
        "response_format": {"type": "json_object"},
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user},
        ],
    })
}

/// Compact schema snippet submitted with each batch: just enough structure
/// for the endpoint to reason about, nothing record-level.
fn schema_snippet(entities: &[Entity]) -> Result<String, LlmError> {
    let compact: Vec<Value> = entities
        .iter()
        .map(|entity| {
            json!({
                "id": entity.id,
                "name": entity.name,
                "source": entity.source_system,
                "type": entity.source_type,
                "attributes": entity
                    .attributes
                    .iter()
                    .map(|attr| {
                        json!({
                            "name": attr.name,
                            "type": attr.type_name,
                            "nullable": attr.nullable,
                        })
                    })
                    .collect::<Vec<Value>>(),
            })
        })
        .collect();
    Ok(serde_json::to_string(&compact)?)
}

/// Strip one surrounding markdown fence (```/```json) if present.
fn strip_code_fences(text: &str) -> String {
    let cleaned = text.trim();
    if !cleaned.starts_with("```") {
        return cleaned.to_string();
    }
    let mut lines: Vec<&str> = cleaned.lines().collect();
    if lines.first().is_some_and(|l| l.starts_with("```")) {
        lines.remove(0);
    }
    if lines.last().is_some_and(|l| l.starts_with("```")) {
        lines.pop();
    }
    lines.join("\n").trim().to_string()
}

/// Hint names match entity names case-insensitively. Tags append once; notes
/// become a single `note:<text>` tag under the same idempotence rule.
fn merge_hints(chunk: &mut [Entity], hints: &HashMap<String, EntityHint>) {
    if hints.is_empty() {
        return;
    }
    let by_name: HashMap<String, &EntityHint> = hints
        .iter()
        .map(|(name, hint)| (name.to_lowercase(), hint))
        .collect();

    for entity in chunk.iter_mut() {
        let Some(hint) = by_name.get(&entity.name.to_lowercase()) else {
            continue;
        };
        for tag in &hint.tags {
            if !tag.is_empty() {
                entity.add_tag(tag);
            }
        }
        let notes = hint.notes.trim();
        if !notes.is_empty() {
            entity.add_tag(&format!("note:{notes}"));
        }
    }
}
