//! Pipeline configuration.
//!
//! Defaults describe the production Aadhaar secure QR (RSA-2048, V2 layout).
//! Values can be overridden from JSON or from environment variables:
//!
//! - `ANON_AADHAAR_ISSUER` - issuer id resolved through the key store (default: `uidai`)
//! - `ANON_AADHAAR_KEY_BITS` - issuer RSA key size (default: 2048)
//! - `ANON_AADHAAR_WORD_BITS` - circuit word width (default: 64)
//! - `ANON_AADHAAR_MAX_MESSAGE_BYTES` - padded message capacity (default: 1536)
//! - `ANON_AADHAAR_SCHEME_VERSION` - supported document version tag (default: `V2`)
//! - `ANON_AADHAAR_VERIFY_SIGNATURE` - `1`/`true` to pre-check signatures off-circuit
//! - `ANON_AADHAAR_NULLIFIER_SCOPE` - application scope label for user nullifiers
//! - `ANON_AADHAAR_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! - `ANON_AADHAAR_LOG_JSON` - `1`/`true` for JSON log output

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::nullifier::NullifierScope;
use crate::witness::padding::BLOCK_BYTES;

const ENV_PREFIX: &str = "ANON_AADHAAR_";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("nullifier scope must be configured explicitly")]
    MissingNullifierScope,

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings shared by extraction, argument building and proving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub issuer: String,
    pub key_bits: usize,
    pub word_bits: u32,
    pub max_message_bytes: usize,
    pub scheme_version: String,
    pub verify_signature: bool,
    pub nullifier_scope: Option<String>,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            issuer: "uidai".to_string(),
            key_bits: 2048,
            word_bits: 64,
            max_message_bytes: 512 * 3,
            scheme_version: "V2".to_string(),
            verify_signature: false,
            nullifier_scope: None,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl PipelineConfig {
    /// Number of words the signature and modulus are split into.
    pub fn word_count(&self) -> usize {
        self.key_bits.div_ceil(self.word_bits as usize)
    }

    /// Load from a JSON document; missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `ANON_AADHAAR_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut config = Self::default();

        if let Some(issuer) = var("ISSUER") {
            config.issuer = issuer;
        }
        if let Some(bits) = var("KEY_BITS") {
            config.key_bits = parse_number("KEY_BITS", &bits)?;
        }
        if let Some(bits) = var("WORD_BITS") {
            config.word_bits = parse_number("WORD_BITS", &bits)?;
        }
        if let Some(max) = var("MAX_MESSAGE_BYTES") {
            config.max_message_bytes = parse_number("MAX_MESSAGE_BYTES", &max)?;
        }
        if let Some(version) = var("SCHEME_VERSION") {
            config.scheme_version = version;
        }
        if let Some(flag) = var("VERIFY_SIGNATURE") {
            config.verify_signature = parse_flag(&flag);
        }
        if let Some(scope) = var("NULLIFIER_SCOPE") {
            config.nullifier_scope = Some(scope);
        }
        if let Some(level) = var("LOG_LEVEL") {
            config.log_level = level;
        }
        if let Some(flag) = var("LOG_JSON") {
            config.log_json = parse_flag(&flag);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject geometry the extractor and circuit cannot agree on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key_bits == 0 || self.key_bits % 8 != 0 {
            return Err(ConfigError::InvalidValue(
                "key_bits".into(),
                format!("{} is not a positive multiple of 8", self.key_bits),
            ));
        }
        if self.word_bits == 0 || self.word_bits > 248 {
            return Err(ConfigError::InvalidValue(
                "word_bits".into(),
                format!("{} must be in 1..=248 to fit a field element", self.word_bits),
            ));
        }
        if self.max_message_bytes == 0 || self.max_message_bytes % BLOCK_BYTES != 0 {
            return Err(ConfigError::InvalidValue(
                "max_message_bytes".into(),
                format!(
                    "{} is not a positive multiple of {}",
                    self.max_message_bytes, BLOCK_BYTES
                ),
            ));
        }
        if self.scheme_version.is_empty() {
            return Err(ConfigError::InvalidValue(
                "scheme_version".into(),
                "must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// The configured nullifier scope. Never defaulted.
    pub fn nullifier_scope(&self) -> Result<NullifierScope, ConfigError> {
        self.nullifier_scope
            .as_deref()
            .map(NullifierScope::from_label)
            .ok_or(ConfigError::MissingNullifierScope)
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidValue(format!("{}{}", ENV_PREFIX, name), value.to_string())
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes")
}
