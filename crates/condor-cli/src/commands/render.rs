use std::path::Path;

use anyhow::Context;
use condor_core::{generate_config_with, EvaluationContext, GeneratorOptions};
use tracing::info;

/// Per-field values given on the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub zone: Option<String>,
    pub count: Option<u32>,
    pub email: Option<String>,
    pub instance_type: Option<String>,
    pub project: Option<String>,
}

impl Overrides {
    fn apply(self, ctx: &mut EvaluationContext) {
        if let Some(zone) = self.zone {
            ctx.set_property("zone", zone);
        }
        if let Some(count) = self.count {
            ctx.set_property("count", count);
        }
        if let Some(email) = self.email {
            ctx.set_property("email", email);
        }
        if let Some(instance_type) = self.instance_type {
            ctx.set_property("instancetype", instance_type);
        }
        if let Some(project) = self.project {
            ctx.set_env("project", project);
        }
    }
}

/// Build the evaluation context from an optional file plus overrides.
fn load_context(context: Option<&str>, overrides: Overrides) -> anyhow::Result<EvaluationContext> {
    let mut ctx = match context {
        Some(path) => EvaluationContext::from_file(Path::new(path))
            .with_context(|| format!("Failed to load context {path}"))?,
        None => EvaluationContext::new(),
    };
    overrides.apply(&mut ctx);
    Ok(ctx)
}

pub fn render(
    context: Option<&str>,
    overrides: Overrides,
    output: Option<&str>,
    legacy_output_name: bool,
) -> anyhow::Result<()> {
    let ctx = load_context(context, overrides)?;
    let options = GeneratorOptions { legacy_output_name };
    let manifest = generate_config_with(&ctx, &options)?;

    match output {
        Some(path) => {
            std::fs::write(path, &manifest)
                .with_context(|| format!("Failed to write {path}"))?;
            info!(path = %path, bytes = manifest.len(), "Wrote manifest");
        }
        None => print!("{manifest}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const CONTEXT: &str = r#"
[properties]
zone = "us-central1-a"
count = 3
email = "admin@example.com"
instancetype = "n1-standard-1"

[env]
project = "my-proj"
"#;

    #[test]
    fn test_overrides_replace_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("condor.toml");
        fs::write(&path, CONTEXT).unwrap();

        let overrides = Overrides {
            count: Some(10),
            project: Some("other".to_string()),
            ..Default::default()
        };
        let ctx = load_context(path.to_str(), overrides).unwrap();
        assert_eq!(ctx.property("count").unwrap(), 10);
        assert_eq!(ctx.property("zone").unwrap(), "us-central1-a");
        assert_eq!(ctx.env_value("project").unwrap(), "other");
    }

    #[test]
    fn test_flags_only_context() {
        let overrides = Overrides {
            zone: Some("asia-east1-a".to_string()),
            count: Some(2),
            email: Some("a@b.c".to_string()),
            instance_type: Some("n1-standard-2".to_string()),
            project: Some("p".to_string()),
        };
        let ctx = load_context(None, overrides).unwrap();
        assert!(condor_core::generate_config(&ctx).is_ok());
    }

    #[test]
    fn test_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx_path = dir.path().join("condor.toml");
        let out_path = dir.path().join("condor.yaml");
        fs::write(&ctx_path, CONTEXT).unwrap();

        render(
            ctx_path.to_str(),
            Overrides::default(),
            out_path.to_str(),
            false,
        )
        .unwrap();

        let yaml = fs::read_to_string(&out_path).unwrap();
        assert!(yaml.contains("targetSize: 3"));
        assert!(yaml.contains("CONDOR_ADMIN=admin@example.com"));
    }

    #[test]
    fn test_render_reports_missing_field() {
        let dir = tempfile::tempdir().unwrap();
        let ctx_path = dir.path().join("condor.toml");
        fs::write(&ctx_path, "[properties]\nzone = \"z\"\n").unwrap();

        let err = render(ctx_path.to_str(), Overrides::default(), None, false).unwrap_err();
        assert!(err.to_string().contains("missing required field"));
    }

    #[test]
    fn test_render_missing_context_file() {
        let err = render(Some("/nonexistent/condor.toml"), Overrides::default(), None, false)
            .unwrap_err();
        assert!(err.to_string().contains("Failed to load context"));
    }
}
