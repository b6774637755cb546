use commonware_codec::DecodeExt;
use commonware_cryptography::{
    ed25519::{PrivateKey, PublicKey},
    Signer,
};
use commonware_utils::{from_hex_formatted, hex};
use serde::{Deserialize, Serialize};
use sqlchain_types::{DatabaseId, NodeId, Policy};
use std::{fmt, str::FromStr};
use thiserror::Error;
use tracing::Level;

pub mod commands;

#[derive(Clone, PartialEq, Eq)]
pub struct HexBytes(Vec<u8>);

impl HexBytes {
    pub fn from_hex_formatted(value: &str) -> Option<Self> {
        from_hex_formatted(value).map(Self)
    }
}

impl AsRef<[u8]> for HexBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Serialize for HexBytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&hex(self.as_ref()))
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        let bytes = from_hex_formatted(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a hex string"))?;
        Ok(Self(bytes))
    }
}

/// Configuration loaded from the `--config` YAML file.
#[derive(Deserialize, Serialize)]
pub struct Config {
    pub private_key: HexBytes,
    pub node_id: String,
    pub database_id: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Debug switch: skip signer/signee matching and signature checks.
    #[serde(default)]
    pub bypass_signature: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} is invalid: {value}")]
    InvalidDecode {
        field: &'static str,
        value: String,
        #[source]
        source: commonware_codec::Error,
    },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must not be empty")]
    Empty { field: &'static str },
    #[error("{field} is too long ({len} > {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}

pub struct ValidatedConfig {
    pub signer: PrivateKey,
    pub public_key: PublicKey,
    pub node_id: NodeId,
    pub database_id: DatabaseId,
    pub log_level: Level,
    pub policy: Policy,
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedConfig")
            .field("signer", &"<redacted>")
            .field("public_key", &self.public_key)
            .field("node_id", &self.node_id)
            .field("database_id", &self.database_id)
            .field("log_level", &self.log_level)
            .field("policy", &self.policy)
            .finish()
    }
}

struct RedactedConfig<'a>(&'a Config);

impl fmt::Debug for RedactedConfig<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = self.0;
        f.debug_struct("Config")
            .field("private_key", &"<redacted>")
            .field("node_id", &cfg.node_id)
            .field("database_id", &cfg.database_id)
            .field("log_level", &cfg.log_level)
            .field("bypass_signature", &cfg.bypass_signature)
            .finish()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn redact_value(field: &'static str, value: String) -> String {
    match field {
        "private_key" => "<redacted>".to_string(),
        _ => value,
    }
}

fn decode_bytes<T: DecodeExt<()>>(field: &'static str, value: &HexBytes) -> Result<T, ConfigError> {
    T::decode(value.as_ref()).map_err(|source| ConfigError::InvalidDecode {
        field,
        value: redact_value(field, hex(value.as_ref())),
        source,
    })
}

fn ensure_identifier(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Empty { field });
    }
    let max = sqlchain_types::codec::MAX_ID_LENGTH;
    if value.len() > max {
        return Err(ConfigError::TooLong {
            field,
            len: value.len(),
            max,
        });
    }
    Ok(())
}

impl Config {
    pub fn redacted_debug(&self) -> impl fmt::Debug + '_ {
        RedactedConfig(self)
    }

    pub fn parse_signer(&self) -> Result<PrivateKey, ConfigError> {
        decode_bytes("private_key", &self.private_key)
    }

    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let signer = self.parse_signer()?;
        self.validate_with_signer(signer)
    }

    pub fn validate_with_signer(self, signer: PrivateKey) -> Result<ValidatedConfig, ConfigError> {
        ensure_identifier("node_id", &self.node_id)?;
        ensure_identifier("database_id", &self.database_id)?;
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;

        Ok(ValidatedConfig {
            public_key: signer.public_key(),
            signer,
            node_id: NodeId::from(self.node_id),
            database_id: DatabaseId::from(self.database_id),
            log_level,
            policy: Policy {
                bypass_signature: self.bypass_signature,
            },
        })
    }
}

#[cfg(test)]
mod tests;
