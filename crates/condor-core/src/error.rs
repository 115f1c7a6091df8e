//! Error types for manifest generation.

use thiserror::Error;

/// Result type alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors that can occur while generating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A required key is absent from the evaluation context.
    #[error("missing required field '{section}.{key}'")]
    MissingField { section: &'static str, key: String },

    /// A symbolic reference names a resource not declared before it.
    #[error("resource '{from}' references undeclared resource '{target}'")]
    DanglingReference { from: String, target: String },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

impl ManifestError {
    /// The dotted path of the missing field, if this is a missing-field error.
    pub fn missing_field(&self) -> Option<String> {
        match self {
            ManifestError::MissingField { section, key } => Some(format!("{section}.{key}")),
            _ => None,
        }
    }
}
