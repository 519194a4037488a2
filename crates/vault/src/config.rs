//! Configuration loading and validation for the vault service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::KeyRing;
use crate::records::IvTables;

/// Validated vault service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Current AES-256 key as 64 hex characters. **Required.**
    pub encryption_secret_key: String,

    /// Legacy AES-256 key as 64 hex characters. Falls back to the built-in
    /// development key when unset.
    #[serde(default)]
    pub encryption_secret_key0: Option<String>,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Comma-separated list of tables that have `_iv` columns.
    #[serde(default = "default_iv_tables")]
    pub iv_tables: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP endpoint for span export. Spans are not exported when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_listen_port() -> u16 {
    3000
}
fn default_iv_tables() -> String {
    "insulindata,fooddata,exercisedata,mooddata,periodrecords".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_secret_key", &"[REDACTED]")
            .field(
                "encryption_secret_key0",
                &self.encryption_secret_key0.as_ref().map(|_| "[REDACTED]"),
            )
            .field("listen_port", &self.listen_port)
            .field("iv_tables", &self.iv_tables)
            .field("log_level", &self.log_level)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .finish()
    }
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Decode both keys.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if a key is not 64 hex characters.
    pub fn key_ring(&self) -> Result<KeyRing> {
        KeyRing::from_hex(
            &self.encryption_secret_key,
            self.encryption_secret_key0.as_deref(),
        )
        .context("invalid encryption key configuration")
    }

    /// Tables that have `_iv` columns.
    pub fn iv_tables(&self) -> IvTables {
        IvTables::parse(&self.iv_tables)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.encryption_secret_key, "ENCRYPTION_SECRET_KEY")?;
        self.key_ring()?;
        if self.listen_port == 0 {
            anyhow::bail!("LISTEN_PORT must be > 0");
        }
        if self.otel_exporter_otlp_endpoint.as_deref().is_some_and(|e| e.trim().is_empty()) {
            anyhow::bail!("OTEL_EXPORTER_OTLP_ENDPOINT must not be blank when set");
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "db0fdd8f597a24d13796c50d79cc2ea1965d6ab0301cdda78782e2e0d8e48dcc";

    fn valid() -> Config {
        Config {
            encryption_secret_key: KEY.into(),
            encryption_secret_key0: None,
            listen_port: default_listen_port(),
            iv_tables: default_iv_tables(),
            log_level: default_log_level(),
            otel_exporter_otlp_endpoint: None,
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 3000);
        assert_eq!(default_log_level(), "info");
        assert_eq!(IvTables::parse(&default_iv_tables()).len(), 5);
    }

    #[test]
    fn validate_accepts_valid_config() {
        let cfg = valid();
        assert!(cfg.validate().is_ok());
        assert!(cfg.key_ring().unwrap().legacy_is_default());
    }

    #[test]
    fn validate_rejects_empty_key() {
        let cfg = Config {
            encryption_secret_key: "".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_short_key() {
        let cfg = Config {
            encryption_secret_key: KEY[..32].into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_legacy_key() {
        let cfg = Config {
            encryption_secret_key0: Some("12345678901234567890123456789012".into()),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_otlp_endpoint() {
        let cfg = Config {
            otel_exporter_otlp_endpoint: Some(" ".into()),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_keys() {
        let cfg = Config {
            encryption_secret_key0: Some(KEY.into()),
            ..valid()
        };
        let out = format!("{cfg:?}");
        assert!(!out.contains(KEY));
        assert!(out.contains("REDACTED"));
    }
}
