//! Manifest commands - create a skeleton, validate documents

use std::path::{Path, PathBuf};

use crate::display;
use crate::error::{CliError, Result};
use crate::settings::validate_manifest_path;

/// Print a skeleton manifest with one blank chart per name
pub fn create(chart_names: &[String]) -> Result<()> {
    let names: Vec<String> = chart_names
        .iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    let document = loftsman_core::create(&names)?;
    print!("---\n{}", document);
    Ok(())
}

/// Read and validate a manifest file, returning it with its raw text
pub fn load(path: &Path) -> Result<(loftsman_core::Manifest, String)> {
    validate_manifest_path(path)?;
    let content = std::fs::read_to_string(path)?;
    let manifest = loftsman_core::validate(&content)?;
    Ok((manifest, content))
}

/// Validate every path, reporting each; fails when any is invalid
pub fn validate(paths: &[PathBuf]) -> Result<()> {
    let mut failed = 0;
    for path in paths {
        validate_manifest_path(path)?;
        let content = std::fs::read_to_string(path)?;
        match loftsman_core::validate(&content) {
            Ok(manifest) => display::print_valid(path, &manifest),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "manifest invalid");
                display::print_invalid(path, &e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::validation(format!(
            "{} of {} manifest(s) failed validation",
            failed,
            paths.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_valid_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.yaml");
        std::fs::write(
            &path,
            "apiVersion: manifests/v1beta1\nmetadata:\n  name: platform\nspec:\n  charts: []\n",
        )
        .unwrap();

        let (manifest, content) = load(&path).unwrap();
        assert_eq!(manifest.name(), "platform");
        assert!(content.starts_with("apiVersion"));
    }

    #[test]
    fn test_validate_counts_failures() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.yaml");
        let bad = dir.path().join("bad.yaml");
        std::fs::write(
            &good,
            "apiVersion: manifests/v1beta1\nmetadata:\n  name: platform\nspec:\n  charts: []\n",
        )
        .unwrap();
        std::fs::write(&bad, "apiVersion: manifests/v0\n").unwrap();

        let err = validate(&[good, bad]).unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 manifest(s) failed validation");
    }
}
