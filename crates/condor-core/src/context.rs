//! Evaluation context: the parameter bag a manifest is rendered from.
//!
//! A context has two sections, `properties` and `env`, each a free-form
//! mapping. It can be built in code or loaded from a TOML or JSON file:
//!
//! ```toml
//! [properties]
//! zone = "us-central1-a"
//! count = 3
//! email = "admin@example.com"
//! instancetype = "n1-standard-1"
//!
//! [env]
//! project = "my-proj"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::{ManifestError, ManifestResult};
use crate::manifest::ReplicaCount;

pub const PROPERTIES: &str = "properties";
pub const ENV: &str = "env";

/// Errors raised while loading a context file.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid TOML context: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON context: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode context: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContext {
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub env: Map<String, Value>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_property(key, value);
        self
    }

    pub fn with_env(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set_env(key, value);
        self
    }

    pub fn set_property(&mut self, key: &str, value: impl Into<Value>) {
        self.properties.insert(key.to_string(), value.into());
    }

    pub fn set_env(&mut self, key: &str, value: impl Into<Value>) {
        self.env.insert(key.to_string(), value.into());
    }

    /// Look up a required property.
    pub fn property(&self, key: &str) -> ManifestResult<&Value> {
        self.properties.get(key).ok_or_else(|| ManifestError::MissingField {
            section: PROPERTIES,
            key: key.to_string(),
        })
    }

    /// Look up a required environment value.
    pub fn env_value(&self, key: &str) -> ManifestResult<&Value> {
        self.env.get(key).ok_or_else(|| ManifestError::MissingField {
            section: ENV,
            key: key.to_string(),
        })
    }

    /// Load a context file. `.json` files are parsed as JSON, anything
    /// else as TOML.
    pub fn from_file(path: &Path) -> Result<Self, ContextError> {
        let content = std::fs::read_to_string(path).map_err(|source| ContextError::Read {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ContextError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ContextError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ContextError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a context with example values for every required field.
    pub fn scaffold() -> Self {
        EvaluationContext::new()
            .with_property("zone", "us-central1-a")
            .with_property("count", 3)
            .with_property("email", "admin@example.com")
            .with_property("instancetype", "n1-standard-1")
            .with_env("project", "my-proj")
    }
}

/// The five values a manifest is parameterized by, resolved from a context.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub zone: String,
    pub count: ReplicaCount,
    pub project: String,
    pub email: String,
    pub instance_type: String,
}

impl ClusterParams {
    /// Resolve every required field, failing on the first one absent.
    pub fn from_context(ctx: &EvaluationContext) -> ManifestResult<Self> {
        Ok(ClusterParams {
            zone: as_text(ctx.property("zone")?),
            count: ReplicaCount::from_json(ctx.property("count")?),
            project: as_text(ctx.env_value("project")?),
            email: as_text(ctx.property("email")?),
            instance_type: as_text(ctx.property("instancetype")?),
        })
    }
}

/// Coerce a context value to the text substituted into the manifest.
fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
