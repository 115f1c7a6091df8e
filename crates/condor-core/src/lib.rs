pub mod context;
pub mod error;
pub mod generator;
pub mod manifest;
pub mod scripts;

pub use context::{ClusterParams, ContextError, EvaluationContext};
pub use error::{ManifestError, ManifestResult};
pub use generator::{build_manifest, generate_config, generate_config_with, GeneratorOptions};
pub use manifest::Manifest;
