// src/model/creative.rs

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// An ad asset eligible to be served when a bid wins.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Creative {
    /// Catalog id, emitted as the bid's `crid`. Agent configs
    /// historically carry this as an integer, the wire wants a string;
    /// both forms are accepted.
    #[serde(deserialize_with = "string_or_int")]
    pub id: String,
    /// Size, e.g. "728x90".
    pub format: String,
    pub name: String,
}

fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!(
            "creative id must be a string or integer, got {}",
            other
        ))),
    }
}

/// Static creative catalog. Built once at startup, immutable
/// thereafter, shared read-only by every concurrent request.
#[derive(Debug, Clone)]
pub struct CreativeCatalog {
    creatives: Vec<Creative>,
}

impl CreativeCatalog {
    /// An empty catalog is a startup-fatal misconfiguration: a bidder
    /// with nothing to serve must not come up.
    pub fn new(creatives: Vec<Creative>) -> Result<Self, ConfigError> {
        if creatives.is_empty() {
            return Err(ConfigError::Invalid(
                "creative catalog must not be empty".to_string(),
            ));
        }
        Ok(Self { creatives })
    }

    pub fn len(&self) -> usize {
        self.creatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatives.is_empty()
    }

    /// Creative at `ndx` in catalog order, wrapping modulo the catalog
    /// size. This is the round-robin lookup used by the strategies.
    pub fn pick(&self, ndx: usize) -> &Creative {
        &self.creatives[ndx % self.creatives.len()]
    }
}
