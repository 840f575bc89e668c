//! Registries command
//!
//! Lists the registries a set of specs reference and where a credential for
//! each was found. Secrets are never printed.

use std::path::PathBuf;

use crate::config::LauncherConfig;
use crate::domain::{extract_registries, spec, HostContext, RegistrySet};
use crate::error::{LaunchError, StoreError};
use crate::infrastructure::{CredentialStore, DockerConfigStore};
use crate::services::resolver::CredentialResolver;
use crate::ui;

/// Lookup result for one registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStatus {
    pub registry: String,
    /// Stored address the credential was found under
    pub server_address: Option<String>,
    pub username: Option<String>,
}

/// Resolve every registry without keeping the secrets
pub fn report<S: CredentialStore + ?Sized>(
    registries: &RegistrySet,
    resolver: &CredentialResolver<'_, S>,
) -> Result<Vec<RegistryStatus>, StoreError> {
    registries
        .iter()
        .map(|registry| {
            let found = resolver.resolve(registry)?;
            Ok(RegistryStatus {
                registry: registry.to_string(),
                server_address: found.as_ref().map(|c| c.server_address.clone()),
                username: found.map(|c| c.username),
            })
        })
        .collect()
}

pub fn execute(
    host: &HostContext,
    config: &LauncherConfig,
    files: &[PathBuf],
) -> Result<i32, LaunchError> {
    let specs = spec::load_all(files)?;
    let aliases = config.registry.aliases();
    let registries = extract_registries(&specs, &aliases);

    let store = DockerConfigStore::discover(host)?;
    let resolver = CredentialResolver::new(&store, &aliases);
    let statuses = report(&registries, &resolver)?;

    ui::print_header("registries");
    ui::print_info(&format!("Credential store: {}", store.path().display()));
    println!();

    for status in &statuses {
        let line = match (&status.server_address, &status.username) {
            (Some(address), Some(username)) => ui::status_line(
                true,
                &status.registry,
                &format!("found under {} as {}", address, username),
            ),
            _ => ui::status_line(false, &status.registry, "no stored credential"),
        };
        println!("{}", line);
    }

    let found = statuses
        .iter()
        .filter(|s| s.server_address.is_some())
        .count();
    println!();
    if found == statuses.len() {
        ui::print_success(&format!("Credentials found for all {} registries", found));
    } else {
        ui::print_warning(&format!(
            "Credentials found for {} of {} registries",
            found,
            statuses.len()
        ));
    }

    Ok(0)
}
