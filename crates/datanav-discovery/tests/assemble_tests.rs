//! Model assembly tests over hand-built scans: no live databases, and a
//! scripted caller instead of the network.

use std::cell::RefCell;
use std::collections::BTreeMap;

use serde_json::{json, Value};

use datanav_discovery::{assemble_model, GuidancePass, SourceScan};
use datanav_llm::{LlmCaller, LlmConfig, LlmError};
use datanav_model::{Attribute, Entity};

struct ScriptedCaller {
    responses: RefCell<Vec<String>>,
    calls: RefCell<usize>,
}

impl ScriptedCaller {
    fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        let mut responses: Vec<String> = responses.into_iter().map(Into::into).collect();
        responses.reverse();
        Self {
            responses: RefCell::new(responses),
            calls: RefCell::new(0),
        }
    }
}

impl LlmCaller for ScriptedCaller {
    fn call(&self, _payload: &Value, _config: &LlmConfig) -> Result<String, LlmError> {
        *self.calls.borrow_mut() += 1;
        self.responses
            .borrow_mut()
            .pop()
            .ok_or_else(|| LlmError::Network("scripted caller ran out of responses".to_string()))
    }
}

fn orders_scan(samples: Vec<Value>) -> SourceScan {
    SourceScan {
        entities: vec![Entity {
            id: "pg:orders".to_string(),
            name: "orders".to_string(),
            source_system: "postgres".to_string(),
            source_type: "table".to_string(),
            attributes: vec![Attribute {
                name: "id".to_string(),
                type_name: "integer".to_string(),
                nullable: false,
                source: "postgres".to_string(),
            }],
            tags: vec![],
        }],
        counts: BTreeMap::from([("orders".to_string(), 42u64)]),
        samples: BTreeMap::from([("orders".to_string(), samples)]),
    }
}

#[test]
fn empty_assembly_still_carries_version_and_log() {
    let model = assemble_model(None, None, None).unwrap();
    assert!(model.entities.is_empty());
    assert_eq!(model.metadata["version"], json!(1));
    assert_eq!(model.metadata["discovery_log"], json!([]));
    assert!(!model.metadata.contains_key("discovery_count_log"));
    assert!(!model.metadata.contains_key("deep_discovery_samples"));
}

#[test]
fn counts_and_logs_are_recorded() {
    let samples = vec![json!({"id": 1, "customer_email": "***"})];
    let model = assemble_model(Some(orders_scan(samples)), None, None).unwrap();

    assert_eq!(model.entities.len(), 1);
    assert_eq!(
        model.metadata["discovery_count_log"],
        json!(["postgres.orders: 42 rows"])
    );
    let log: Vec<String> =
        serde_json::from_value(model.metadata["discovery_log"].clone()).unwrap();
    assert!(log.iter().any(|step| step.contains("analyzed 1 sql tables")));
    assert!(log.iter().any(|step| step.contains("COUNT(*)")));
    assert!(model.metadata["deep_discovery_samples"]["pg:orders"].is_array());
}

#[test]
fn guidance_pass_records_instructions_and_insights() {
    let samples = vec![json!({"type": "A"}), json!({"type": "B"})];
    let caller = ScriptedCaller::new([
        r#"{"instructions": ["rule one"], "entity_hints": {}}"#,
        r#"{"insights": ["field type is only set on a subset of records"]}"#,
    ]);
    let config = LlmConfig::new("analyze the differences");

    let model = assemble_model(
        Some(orders_scan(samples)),
        None,
        Some(GuidancePass {
            config: &config,
            caller: &caller,
        }),
    )
    .unwrap();

    assert_eq!(
        model.metadata["interpretation_prompt"],
        json!("analyze the differences")
    );
    assert_eq!(
        model.metadata["interpretation_instructions"],
        json!(["rule one"])
    );
    assert_eq!(model.metadata["llm_batches"], json!(1));
    assert_eq!(
        model.metadata["llm_sample_insights"]["pg:orders"],
        json!(["field type is only set on a subset of records"])
    );
    let log: Vec<String> =
        serde_json::from_value(model.metadata["discovery_log"].clone()).unwrap();
    assert!(log.iter().any(|step| step.contains("deep discovery")));
}

#[test]
fn blank_prompt_skips_the_guidance_pass() {
    let caller = ScriptedCaller::new(Vec::<String>::new());
    let config = LlmConfig::new("   ");

    let model = assemble_model(
        Some(orders_scan(vec![])),
        None,
        Some(GuidancePass {
            config: &config,
            caller: &caller,
        }),
    )
    .unwrap();

    assert_eq!(*caller.calls.borrow(), 0);
    assert!(!model.metadata.contains_key("interpretation_prompt"));
}

#[test]
fn entities_without_samples_get_no_analysis_call() {
    // One guidance call for the schema batch, none for samples.
    let caller = ScriptedCaller::new([r#"{"instructions": [], "entity_hints": {}}"#]);
    let config = LlmConfig::new("prompt");

    let model = assemble_model(
        Some(orders_scan(vec![])),
        None,
        Some(GuidancePass {
            config: &config,
            caller: &caller,
        }),
    )
    .unwrap();

    assert_eq!(*caller.calls.borrow(), 1);
    assert!(!model.metadata.contains_key("llm_sample_insights"));
}

#[test]
fn mongo_scan_lands_under_its_own_namespace() {
    let scan = SourceScan {
        entities: vec![Entity {
            id: "mg:events".to_string(),
            name: "events".to_string(),
            source_system: "mongo".to_string(),
            source_type: "collection".to_string(),
            attributes: vec![],
            tags: vec![],
        }],
        counts: BTreeMap::from([("events".to_string(), 7u64)]),
        samples: BTreeMap::from([("events".to_string(), vec![json!({"kind": "click"})])]),
    };

    let model = assemble_model(None, Some(scan), None).unwrap();
    assert_eq!(
        model.metadata["discovery_count_log"],
        json!(["mongo.events: 7 rows"])
    );
    assert!(model.metadata["deep_discovery_samples"]["mg:events"].is_array());
    let log: Vec<String> =
        serde_json::from_value(model.metadata["discovery_log"].clone()).unwrap();
    assert!(log.iter().any(|step| step.contains("mongodb collections")));
}
