use std::path::Path;

use anyhow::bail;
use condor_core::EvaluationContext;

pub fn init(path: &str, force: bool) -> anyhow::Result<()> {
    let output = Path::new(path);
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }

    let content = EvaluationContext::scaffold().to_toml_string()?;
    std::fs::write(output, content)?;
    println!("✓ Generated {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("condor.toml");
        init(path.to_str().unwrap(), false).unwrap();

        let ctx = EvaluationContext::from_file(&path).unwrap();
        assert!(condor_core::generate_config(&ctx).is_ok());
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("condor.toml");
        std::fs::write(&path, "# keep me\n").unwrap();

        let result = init(path.to_str().unwrap(), false);
        assert!(result.unwrap_err().to_string().contains("--force"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# keep me\n");

        init(path.to_str().unwrap(), true).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[properties]"));
    }
}
