//! Display formatting for CLI output

use console::style;
use loftsman_core::{CoreError, Manifest, ReleaseError};
use std::path::Path;

/// Warning shown before an avast asks for confirmation
pub fn avast_warning(manifest_name: &str) -> String {
    format!(
        "WARNING: loftsman avast is currently used for unlocking stuck ship runs only, so those that might have\n         \
         encountered fatal errors and left the loftsman cluster state stuck in the running position.\n         \
         If you have other loftsman ship runs going for the manifest, {}, please cancel them by simply\n         \
         killing the process. Use avast only to recover from bad loftsman states.",
        manifest_name
    )
}

pub const AVAST_PROMPT: &str =
    "Do you want to continue? (only a response of 'yes' will continue with the avast operation): ";

/// A manifest that passed validation
pub fn print_valid(path: &Path, manifest: &Manifest) {
    println!(
        "{} {} is valid! ({} {}, {} chart(s))",
        style("✓").green().bold(),
        path.display(),
        manifest.api_version(),
        style(manifest.name()).cyan(),
        manifest.chart_count()
    );
}

/// A manifest that failed validation, violations numbered
pub fn print_invalid(path: &Path, error: &CoreError) {
    println!("{} {}", style("✗").red().bold(), path.display());
    let violations = error.violations();
    if violations.is_empty() {
        println!("    {}", error);
        return;
    }
    println!("    manifest validation errors:");
    for (i, violation) in violations.iter().enumerate() {
        println!("    {} {}", style(format!("({})", i + 1)).dim(), violation);
    }
}

/// Per-chart failures at the end of a failed ship
pub fn print_release_errors(errors: &[ReleaseError]) {
    eprintln!();
    for error in errors {
        eprintln!(
            "  {} {} v{} ({}): {}",
            style("✗").red(),
            style(&error.chart).bold(),
            error.version,
            error.namespace,
            error.error.to_string().trim()
        );
    }
    eprintln!();
}

pub fn print_ship_success(manifest: &Manifest) {
    eprintln!(
        "\n{} Shipped manifest {} ({} chart(s))",
        style("✓").green().bold(),
        style(manifest.name()).cyan(),
        manifest.chart_count()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avast_warning_names_manifest() {
        let warning = avast_warning("platform");
        assert!(warning.starts_with("WARNING: loftsman avast"));
        assert!(warning.contains("for the manifest, platform, please cancel"));
        assert_eq!(warning.lines().count(), 4);
    }
}
