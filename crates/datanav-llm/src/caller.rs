//! Pluggable LLM transport.
//!
//! The protocol layer only needs "given a request payload and a config,
//! return the response text"; everything HTTP-shaped lives behind the
//! [`LlmCaller`] trait so tests can substitute a scripted caller.

use serde_json::Value;

use crate::error::LlmError;
use crate::LlmConfig;

/// Env credential consulted when the config carries no api key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Strategy for submitting one chat-completion payload.
///
/// Implementations return the `choices[0].message.content` text verbatim;
/// parsing the nested JSON contract is the protocol layer's job.
pub trait LlmCaller {
    fn call(&self, payload: &Value, config: &LlmConfig) -> Result<String, LlmError>;
}

/// Credential precedence: explicit config key, then the env var. Resolution
/// happens before any socket is opened so a missing key is never reported as
/// a network failure.
pub(crate) fn resolve_api_key(
    configured: Option<&str>,
    from_env: Option<String>,
) -> Result<String, LlmError> {
    configured
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| from_env.map(|k| k.trim().to_string()).filter(|k| !k.is_empty()))
        .ok_or(LlmError::MissingApiKey)
}

#[cfg(feature = "http")]
pub use http::HttpCaller;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use serde_json::Value;

    use super::{resolve_api_key, LlmCaller, API_KEY_ENV};
    use crate::error::LlmError;
    use crate::tls::{certificate_help, TlsSettings};
    use crate::LlmConfig;

    /// Fixed per-request socket timeout; a hung endpoint stalls the whole
    /// flow for at most this long.
    const REQUEST_TIMEOUT_SECS: u64 = 30;

    /// Production transport: blocking POST with bearer auth.
    pub struct HttpCaller {
        tls: TlsSettings,
    }

    impl HttpCaller {
        pub fn new(tls: TlsSettings) -> Self {
            Self { tls }
        }

        fn build_client(&self, config: &LlmConfig) -> Result<reqwest::blocking::Client, LlmError> {
            let mut builder =
                reqwest::blocking::Client::builder().timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS));

            if self.tls.allow_insecure || config.allow_insecure_tls {
                builder = builder.danger_accept_invalid_certs(true);
            } else if let Some(path) = &self.tls.ca_bundle {
                let pem = std::fs::read(path).map_err(|e| {
                    LlmError::TlsCertificate(format!(
                        "failed to read CA bundle {}: {e}",
                        path.display()
                    ))
                })?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    LlmError::TlsCertificate(format!(
                        "CA bundle {} is not valid PEM: {e}",
                        path.display()
                    ))
                })?;
                builder = builder.add_root_certificate(cert);
            }

            builder
                .build()
                .map_err(|e| LlmError::Network(format!("failed to build http client: {e}")))
        }
    }

    impl LlmCaller for HttpCaller {
        fn call(&self, payload: &Value, config: &LlmConfig) -> Result<String, LlmError> {
            let api_key = resolve_api_key(
                config.api_key.as_deref(),
                std::env::var(API_KEY_ENV).ok(),
            )?;
            let client = self.build_client(config)?;

            tracing::debug!(endpoint = %config.endpoint, model = %config.model, "submitting LLM request");
            let response = client
                .post(&config.endpoint)
                .bearer_auth(api_key)
                .json(payload)
                .send()
                .map_err(classify_transport_error)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            let data: Value = response
                .json()
                .map_err(|e| LlmError::Network(format!("endpoint returned unreadable JSON: {e}")))?;
            let content = data["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| {
                    LlmError::Contract(
                        "endpoint response is missing choices[0].message.content".to_string(),
                    )
                })?;
            Ok(content.to_string())
        }
    }

    /// Certificate-verification failures get the remediation text; anything
    /// else stays a plain network error.
    fn classify_transport_error(err: reqwest::Error) -> LlmError {
        let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(&err);
        while let Some(current) = cause {
            let text = current.to_string().to_lowercase();
            if text.contains("certificate") || text.contains("unknownissuer") || text.contains("self signed")
            {
                return LlmError::TlsCertificate(certificate_help());
            }
            cause = current.source();
        }
        LlmError::Network(err.to_string())
    }
}
