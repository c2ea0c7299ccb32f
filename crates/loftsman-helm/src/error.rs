//! Error types for helm and chart catalog operations

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HelmError {
    // ============ Execution Errors ============
    #[error("Failed to run {binary}: {message}")]
    Spawn { binary: String, message: String },

    #[error("`{command}` failed ({}): {stderr}", exit_label(.code))]
    CommandFailed {
        /// Command line with secrets masked
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Helm v3 client binary is required to run the Loftsman tool, found: {output}")]
    UnsupportedClient { output: String },

    #[error("error parsing release status info for {release}: {message}")]
    StatusParse { release: String, message: String },

    // ============ Catalog Errors ============
    #[error("Invalid charts repository URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP error: {status} - {url}")]
    Http { status: u16, url: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Invalid repository index at {url}: {message}")]
    IndexParse { url: String, message: String },

    #[error("Unable to read charts directory {path}: {message}")]
    Directory { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    }
}

impl From<reqwest::Error> for HelmError {
    fn from(e: reqwest::Error) -> Self {
        match (e.status(), e.url()) {
            (Some(status), Some(url)) => HelmError::Http {
                status: status.as_u16(),
                url: url.to_string(),
            },
            _ => HelmError::Network {
                message: e.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, HelmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = HelmError::CommandFailed {
            command: "helm uninstall dns --namespace services --no-hooks".to_string(),
            code: Some(1),
            stderr: "Error: uninstall: Release not loaded: dns".to_string(),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"`helm uninstall dns --namespace services --no-hooks` failed (exit status 1): Error: uninstall: Release not loaded: dns"
        );

        let killed = HelmError::CommandFailed {
            command: "helm version --client".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("terminated by signal"));
    }
}
