//! TLS trust configuration for the HTTP transport.
//!
//! Corporate TLS-intercepting proxies are the common reason certificate
//! verification fails against a public endpoint. Instead of reading the
//! environment at call time, settings are resolved once at process start and
//! handed to the caller explicitly.

use std::path::PathBuf;

pub const CA_BUNDLE_ENV: &str = "DATANAV_CA_BUNDLE";
pub const CA_BUNDLE_FALLBACK_ENV: &str = "SSL_CERT_FILE";
pub const ALLOW_INSECURE_ENV: &str = "DATANAV_ALLOW_INSECURE_TLS";

#[derive(Debug, Clone, Default)]
pub struct TlsSettings {
    /// Extra PEM bundle trusted in addition to the system roots.
    pub ca_bundle: Option<PathBuf>,
    /// Disables certificate verification entirely. Opt-in only.
    pub allow_insecure: bool,
}

impl TlsSettings {
    /// Resolve from `DATANAV_CA_BUNDLE` (or `SSL_CERT_FILE`) and
    /// `DATANAV_ALLOW_INSECURE_TLS`.
    pub fn from_env() -> Self {
        let ca_bundle = non_empty_env(CA_BUNDLE_ENV)
            .or_else(|| non_empty_env(CA_BUNDLE_FALLBACK_ENV))
            .map(PathBuf::from);
        Self {
            ca_bundle,
            allow_insecure: env_truthy(ALLOW_INSECURE_ENV),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepted true spellings: `1`, `true`, `yes`, `on` (any case).
pub(crate) fn env_truthy(name: &str) -> bool {
    let value = std::env::var(name).unwrap_or_default();
    truthy(&value)
}

fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Remediation text shown when certificate verification fails.
pub(crate) fn certificate_help() -> String {
    format!(
        "HTTPS connection to the LLM endpoint failed: the certificate could not be verified. \
         This usually means a corporate TLS-intercepting proxy or an out-of-date local CA store. \
         If you have the proxy's CA certificate in PEM form, point {CA_BUNDLE_ENV} \
         (or {CA_BUNDLE_FALLBACK_ENV}) at it; ask IT for the proxy's root/intermediate \
         certificate if you do not know where to find it. \
         Only as a temporary last resort, outside production, set {ALLOW_INSECURE_ENV}=1 \
         to disable certificate verification."
    )
}
