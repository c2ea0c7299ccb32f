//! Avast command - clear the lock of a stuck ship

use console::style;
use loftsman_helm::{Catalog, HelmCli};
use loftsman_kube::{AvastOutcome, KubeError, KubeStore, ShipLog, Shipper};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use super::{GlobalSettings, manifest};
use crate::display;
use crate::error::Result;

/// Read one line and accept only an exact `yes`
pub fn read_confirmation(input: &mut impl BufRead) -> io::Result<bool> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']) == "yes")
}

fn confirm(manifest_name: &str) -> io::Result<bool> {
    println!("{}", style(display::avast_warning(manifest_name)).yellow());
    print!("{}", display::AVAST_PROMPT);
    io::stdout().flush()?;
    read_confirmation(&mut io::stdin().lock())
}

/// Name of the manifest to avast, from its file or given directly
fn manifest_name(manifest_path: Option<&Path>, manifest_name: Option<&str>) -> Result<String> {
    if let Some(path) = manifest_path.filter(|p| !p.as_os_str().is_empty()) {
        let (manifest, _) = manifest::load(path)?;
        return Ok(manifest.name().to_string());
    }
    match manifest_name {
        Some(name) if !name.is_empty() => Ok(name.to_string()),
        _ => Err(KubeError::MissingManifestName.into()),
    }
}

pub async fn run(
    global: &GlobalSettings,
    manifest_path: Option<&Path>,
    name: Option<&str>,
) -> Result<()> {
    let name = manifest_name(manifest_path, name)?;

    let helm = HelmCli::new(&global.helm_binary)
        .with_kubeconfig(global.kubeconfig.clone())
        .with_kube_context(global.kube_context.clone());
    let store = KubeStore::connect(global.kubeconfig.as_deref(), global.kube_context.as_deref()).await?;
    let shipper = Shipper::new(Arc::new(store), Arc::new(helm), Arc::new(Catalog::new()?))
        .with_namespace(&global.namespace);

    let log = ShipLog::new().with_console();
    match shipper.avast(&name, confirm, &log).await? {
        AvastOutcome::Avasted => println!(
            "{} Cleared the active ship for manifest {}",
            style("✓").green().bold(),
            style(&name).cyan()
        ),
        AvastOutcome::Declined => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;

    #[test]
    fn test_only_exact_yes_confirms() {
        let cases = [
            ("yes\n", true),
            ("yes\r\n", true),
            ("yes", true),
            ("Yes\n", false),
            ("y\n", false),
            (" yes\n", false),
            ("\n", false),
            ("", false),
        ];
        for (input, expected) in cases {
            let mut reader = io::Cursor::new(input.as_bytes());
            assert_eq!(read_confirmation(&mut reader).unwrap(), expected, "{:?}", input);
        }
    }

    #[test]
    fn test_manifest_name_required() {
        let err = manifest_name(None, None).unwrap_err();
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_ERROR);
        assert_eq!(manifest_name(None, Some("platform")).unwrap(), "platform");
    }
}
