use thiserror::Error;

/// Failure modes of the guidance protocol, one variant per caller-visible
/// contract. `TlsCertificate` is split out from `Network` so the CLI can show
/// the remediation text instead of a bare handshake error.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no LLM credential: set OPENAI_API_KEY or configure api_key")]
    MissingApiKey,
    #[error("{0}")]
    TlsCertificate(String),
    #[error("network error calling LLM endpoint: {0}")]
    Network(String),
    #[error("LLM endpoint returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    #[error("LLM response is not the expected JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("LLM response violates the contract: {0}")]
    Contract(String),
}
