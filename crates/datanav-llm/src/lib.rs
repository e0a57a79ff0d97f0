//! LLM guidance over a discovered data model.
//!
//! The external text-generation service is untrusted in two ways:
//! - transport can fail (network, auth, TLS interception), and
//! - responses are free text that merely *promises* to be structured JSON.
//!
//! Both are modeled explicitly: transport is a pluggable [`LlmCaller`]
//! strategy, and every response is parsed into typed results with
//! [`LlmError`] carrying the exact contract that was violated.
//!
//! All calls are sequential and blocking; a batch's round-trip completes
//! before the next batch is submitted. There are no retries: the first
//! failure is terminal for the running operation.

mod caller;
mod error;
mod guidance;
mod tls;

pub use caller::{LlmCaller, API_KEY_ENV};
#[cfg(feature = "http")]
pub use caller::HttpCaller;
pub use error::LlmError;
pub use guidance::{
    analyze_entity_samples, apply_llm_guidance, correct_data_model_json, GuidanceOutcome,
};
pub use tls::{TlsSettings, ALLOW_INSECURE_ENV, CA_BUNDLE_ENV, CA_BUNDLE_FALLBACK_ENV};

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Configuration for one guidance session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// The operator's functional prompt, interpolated into every request.
    pub user_prompt: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bearer credential; when absent the `OPENAI_API_KEY` env var is used.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Entities per request; 0 means a single call covering the whole schema.
    #[serde(default)]
    pub batch_size: usize,
    /// Opt-in only. Never the default, even behind broken corporate proxies.
    #[serde(default)]
    pub allow_insecure_tls: bool,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

impl LlmConfig {
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            user_prompt: user_prompt.into(),
            model: default_model(),
            endpoint: default_endpoint(),
            api_key: None,
            batch_size: 0,
            allow_insecure_tls: false,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::new("")
    }
}
