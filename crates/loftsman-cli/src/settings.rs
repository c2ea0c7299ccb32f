//! Settings validation
//!
//! Turns the `ship` chart-source flags into the default chart location and
//! checks manifest paths before anything talks to the cluster.

use loftsman_helm::{ChartLocation, RepoCredentials};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::{CliError, Result};

/// Chart source flags of `ship`
#[derive(Debug, Clone, Default)]
pub struct ChartsSource {
    pub repo: Option<String>,
    pub path: Option<PathBuf>,
    pub repo_username: Option<String>,
    pub repo_password: Option<String>,
}

impl ChartsSource {
    /// Default location for charts that name no source, if one was given
    pub fn default_location(&self) -> Result<Option<ChartLocation>> {
        let repo = self.repo.as_deref().filter(|r| !r.is_empty());
        let path = self.path.as_deref().filter(|p| !p.as_os_str().is_empty());

        match (repo, path) {
            (Some(_), Some(_)) => Err(CliError::validation(
                "both charts-repo and charts-path are set, you should use one or the other",
            )),
            (None, Some(path)) => {
                if !path.is_dir() {
                    return Err(CliError::validation(format!(
                        "charts-path {} not found",
                        path.display()
                    )));
                }
                Ok(Some(ChartLocation::directory(path)))
            }
            (Some(repo), None) => {
                let url = Url::parse(repo).map_err(|e| {
                    CliError::validation(format!("charts-repo {} is not a valid URL: {}", repo, e))
                })?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(CliError::validation(format!(
                        "charts-repo {} must be an http or https URL",
                        repo
                    )));
                }
                Ok(Some(ChartLocation::Repository {
                    name: None,
                    url: repo.to_string(),
                    credentials: self.credentials(),
                }))
            }
            (None, None) => Ok(None),
        }
    }

    /// Credentials, only when both username and password are set
    fn credentials(&self) -> Option<RepoCredentials> {
        match (self.repo_username.as_deref(), self.repo_password.as_deref()) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some(RepoCredentials::new(user, password))
            }
            _ => None,
        }
    }
}

/// Check that a manifest path points at a file
pub fn validate_manifest_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(CliError::validation("manifest path is required"));
    }
    if !path.is_file() {
        return Err(CliError::validation(format!(
            "manifest path {} not found",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_repo_and_path_conflict() {
        let source = ChartsSource {
            repo: Some("https://charts.local".to_string()),
            path: Some(PathBuf::from("/tmp")),
            ..Default::default()
        };
        let err = source.default_location().unwrap_err();
        assert!(err.to_string().starts_with("both charts-repo and charts-path are set"));
    }

    #[test]
    fn test_charts_path() {
        let dir = TempDir::new().unwrap();
        let source = ChartsSource {
            path: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert_eq!(
            source.default_location().unwrap(),
            Some(ChartLocation::directory(dir.path()))
        );

        let missing = ChartsSource {
            path: Some(dir.path().join("nope")),
            ..Default::default()
        };
        assert!(missing.default_location().unwrap_err().to_string().ends_with("not found"));
    }

    #[test]
    fn test_charts_repo() {
        let source = ChartsSource {
            repo: Some("https://charts.local/repository/charts".to_string()),
            repo_username: Some("admin".to_string()),
            ..Default::default()
        };
        match source.default_location().unwrap() {
            Some(ChartLocation::Repository { url, credentials, .. }) => {
                assert_eq!(url, "https://charts.local/repository/charts");
                assert!(credentials.is_none());
            }
            other => panic!("unexpected location: {:?}", other),
        }

        let with_creds = ChartsSource {
            repo_password: Some("hunter2".to_string()),
            ..source
        };
        assert!(matches!(
            with_creds.default_location().unwrap(),
            Some(ChartLocation::Repository { credentials: Some(_), .. })
        ));
    }

    #[test]
    fn test_invalid_repo_url() {
        for repo in ["not a url", "ftp://charts.local"] {
            let source = ChartsSource {
                repo: Some(repo.to_string()),
                ..Default::default()
            };
            assert!(source.default_location().is_err(), "{} accepted", repo);
        }
    }

    #[test]
    fn test_no_default_source() {
        assert_eq!(ChartsSource::default().default_location().unwrap(), None);
    }

    #[test]
    fn test_manifest_path() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("manifest.yaml");
        std::fs::write(&file, "apiVersion: manifests/v1beta1\n").unwrap();

        assert!(validate_manifest_path(&file).is_ok());
        assert!(validate_manifest_path(dir.path()).is_err());
        assert!(validate_manifest_path(Path::new("")).is_err());
    }
}
