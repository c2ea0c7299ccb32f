//! Integration tests for CLI commands
//!
//! These only exercise paths that fail or finish before any cluster
//! connection is made.

use std::process::Command;

/// Helper to run loftsman command
fn loftsman(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_loftsman"))
        .args(args)
        .env_remove("LOFTSMAN_MANIFEST_PATH")
        .env_remove("LOFTSMAN_CHARTS_REPO")
        .env_remove("LOFTSMAN_CHARTS_PATH")
        .output()
        .expect("Failed to execute loftsman")
}

/// Get the fixtures path
fn fixtures_path() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures")
}

fn fixture(name: &str) -> String {
    format!("{}/{}", fixtures_path(), name)
}

mod manifest_create {
    use super::*;

    #[test]
    fn test_create_skeleton() {
        let output = loftsman(&["manifest", "create", "--chart-names", "cray-dns,cray-proxy"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.starts_with("---\n"));
        assert!(stdout.contains("apiVersion: manifests/v1beta1"));
        assert!(stdout.contains("name: cray-dns"));
        assert!(stdout.contains("name: cray-proxy"));
    }

    #[test]
    fn test_created_skeleton_validates() {
        let output = loftsman(&["manifest", "create", "--chart-names", "a,b"]);
        assert!(output.status.success());

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("manifest.yaml");
        std::fs::write(&path, &output.stdout).unwrap();

        let validated = loftsman(&["manifest", "validate", path.to_str().unwrap()]);
        assert!(
            validated.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&validated.stderr)
        );
    }
}

mod manifest_validate {
    use super::*;

    #[test]
    fn test_validate_valid_manifest() {
        let output = loftsman(&["manifest", "validate", &fixture("valid-manifest.yaml")]);

        assert!(output.status.success(), "Expected success for valid manifest");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("is valid!"));
        assert!(stdout.contains("2 chart(s)"));
    }

    #[test]
    fn test_validate_missing_namespace() {
        let output = loftsman(&["manifest", "validate", &fixture("missing-namespace.yaml")]);

        assert_eq!(output.status.code(), Some(2));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("manifest validation errors:"));
        assert!(stdout.contains("(1)"));
        assert!(stdout.contains("namespace"));
    }

    #[test]
    fn test_validate_unsupported_version() {
        let output = loftsman(&["manifest", "validate", &fixture("unsupported-version.yaml")]);

        assert_eq!(output.status.code(), Some(2));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("the manifest apiVersion is not supported: manifests/v1alpha9"));
    }

    #[test]
    fn test_validate_unparseable() {
        let output = loftsman(&["manifest", "validate", &fixture("invalid-yaml.yaml")]);

        assert_eq!(output.status.code(), Some(2));
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("could not parse the manifest"));
    }

    #[test]
    fn test_validate_several_paths() {
        let output = loftsman(&[
            "manifest",
            "validate",
            &fixture("valid-manifest.yaml"),
            &fixture("missing-namespace.yaml"),
        ]);

        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("1 of 2 manifest(s) failed validation"));
    }

    #[test]
    fn test_validate_missing_file() {
        let output = loftsman(&["manifest", "validate", &fixture("does-not-exist.yaml")]);

        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("manifest path"));
    }

    #[test]
    fn test_validate_requires_path() {
        let output = loftsman(&["manifest", "validate"]);
        assert!(!output.status.success());
    }
}

mod ship_command {
    use super::*;

    #[test]
    fn test_ship_rejects_repo_and_path() {
        let output = loftsman(&[
            "ship",
            "--manifest-path",
            &fixture("valid-manifest.yaml"),
            "--charts-repo",
            "https://charts.local",
            "--charts-path",
            fixtures_path(),
        ]);

        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("both charts-repo and charts-path are set"));
    }

    #[test]
    fn test_ship_invalid_manifest() {
        let output = loftsman(&["ship", "--manifest-path", &fixture("missing-namespace.yaml")]);

        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("manifest validation errors:"));
    }

    #[test]
    fn test_ship_requires_manifest_path() {
        let output = loftsman(&["ship"]);
        assert!(!output.status.success());
    }
}

mod avast_command {
    use super::*;

    #[test]
    fn test_avast_requires_manifest() {
        let output = loftsman(&["avast"]);

        assert_eq!(output.status.code(), Some(2));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Unable to determine manifest name"));
    }
}

#[test]
fn test_help_lists_commands() {
    let output = loftsman(&["--help"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["manifest", "ship", "avast"] {
        assert!(stdout.contains(command), "missing {} in help", command);
    }
}
