//! Process configuration and the model credential source.
//!
//! Everything comes from environment variables (optionally loaded from a
//! `.env` file at startup). The API credential is not part of
//! `GatewayConfig`: it is read through a `CredentialSource` on every model
//! call and never leaves the server.

use std::net::SocketAddr;

use crate::pipeline::summary::{validate_model_name, DEFAULT_API_BASE, DEFAULT_MODEL};

/// Application-level constants
pub const APP_NAME: &str = "Medi";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable holding the Gemini API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medi_lib=info,medi_gateway=info,tower_http=warn"
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid {var}: {value:?} ({reason})")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Gateway server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub api_base_url: String,
    pub default_model: String,
    pub timeout_secs: u64,
}

impl GatewayConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read settings through `lookup` (testable without touching the environment).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_raw = get("MEDI_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "MEDI_BIND_ADDR",
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        let timeout_secs = match get("GEMINI_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: "GEMINI_TIMEOUT_SECS",
                        value: raw,
                        reason: "must be greater than zero".into(),
                    })
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: "GEMINI_TIMEOUT_SECS",
                        value: raw,
                        reason: e.to_string(),
                    })
                }
            },
        };

        let default_model = get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());
        validate_model_name(&default_model).map_err(|e| ConfigError::Invalid {
            var: "GEMINI_MODEL",
            value: default_model.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            bind_addr,
            api_base_url: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.into()),
            default_model,
            timeout_secs,
        })
    }
}

/// Where the model API key comes from. Consulted once per model call.
pub trait CredentialSource {
    fn api_key(&self) -> Option<String>;
}

/// Reads `GEMINI_API_KEY` from the process environment at call time.
pub struct EnvCredentials;

impl CredentialSource for EnvCredentials {
    fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Fixed credential, for tests and embedding.
pub struct StaticCredentials(Option<String>);

impl StaticCredentials {
    pub fn new(key: &str) -> Self {
        Self(Some(key.to_string()))
    }

    pub fn missing() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentials {
    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.api_base_url, DEFAULT_API_BASE);
        assert_eq!(cfg.default_model, "gemini-2.0-flash");
        assert_eq!(cfg.timeout_secs, 60);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = GatewayConfig::from_lookup(lookup(&[
            ("MEDI_BIND_ADDR", "127.0.0.1:8080"),
            ("GEMINI_API_BASE", "http://localhost:9999"),
            ("GEMINI_MODEL", "gemini-1.5-flash"),
            ("GEMINI_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.api_base_url, "http://localhost:9999");
        assert_eq!(cfg.default_model, "gemini-1.5-flash");
        assert_eq!(cfg.timeout_secs, 15);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let cfg = GatewayConfig::from_lookup(lookup(&[("GEMINI_MODEL", "  ")])).unwrap();
        assert_eq!(cfg.default_model, DEFAULT_MODEL);
    }

    #[test]
    fn invalid_timeout_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("GEMINI_TIMEOUT_SECS", "soon")])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_TIMEOUT_SECS"));
        assert!(GatewayConfig::from_lookup(lookup(&[("GEMINI_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn invalid_model_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("GEMINI_MODEL", "../files?x=1")])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_MODEL"));
        assert!(GatewayConfig::from_lookup(lookup(&[("GEMINI_MODEL", "models/gemini-1.5-pro")])).is_ok());
    }

    #[test]
    fn invalid_bind_addr_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("MEDI_BIND_ADDR", "localhost")])).unwrap_err();
        assert!(err.to_string().contains("MEDI_BIND_ADDR"));
    }

    #[test]
    fn static_credentials() {
        assert_eq!(StaticCredentials::new("abc").api_key().as_deref(), Some("abc"));
        assert!(StaticCredentials::missing().api_key().is_none());
    }

    #[test]
    fn app_name_is_medi() {
        assert_eq!(APP_NAME, "Medi");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
