//! Launch service - orchestrates one delegate run
//!
//! Specs are read, their registries resolved against the credential store
//! and the resulting bundle handed to the delegate container. Any failure up
//! to the bundle stops the run before a process is spawned.

use std::ffi::OsString;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::config::LauncherConfig;
use crate::domain::{
    assemble, extract_registries, spec, CredentialBundle, DelegateInvocation, HostContext,
    InvocationOptions,
};
use crate::error::{LaunchError, StoreError};
use crate::infrastructure::{docker, CredentialStore, DockerConfigStore, DockerEngine};
use crate::services::resolver::CredentialResolver;
use crate::tools::{tool_path, tools};

/// One delegate run as requested on the command line
#[derive(Debug, Clone, Default)]
pub struct LaunchRequest {
    /// Deployment specs driving credential resolution
    pub spec_files: Vec<PathBuf>,
    /// Arguments handed to the delegate after the image
    pub forwarded: Vec<OsString>,
    /// Delegate image override
    pub image: Option<String>,
    pub disable_banner: bool,
    pub interactive: bool,
}

/// Service for launching the delegate
pub struct LaunchService<'a> {
    host: &'a HostContext,
    config: &'a LauncherConfig,
}

impl<'a> LaunchService<'a> {
    pub fn new(host: &'a HostContext, config: &'a LauncherConfig) -> Self {
        Self { host, config }
    }

    /// Build the credential bundle for a set of spec files
    ///
    /// Returns `Ok(None)` when there are no spec files or nothing resolved.
    /// The store is only opened once the specs have been read.
    pub fn prepare_bundle<S, F>(
        &self,
        spec_files: &[PathBuf],
        open_store: F,
    ) -> Result<Option<CredentialBundle>, LaunchError>
    where
        S: CredentialStore,
        F: FnOnce() -> Result<S, StoreError>,
    {
        if spec_files.is_empty() {
            debug!("No deployment specs, skipping credential resolution");
            return Ok(None);
        }

        let specs = spec::load_all(spec_files)?;
        let aliases = self.config.registry.aliases();
        let registries = extract_registries(&specs, &aliases);
        debug!("Registries referenced: {}", registries.len());

        let store = open_store()?;
        let credentials = CredentialResolver::new(&store, &aliases).resolve_all(&registries)?;
        let bundle = assemble(credentials);

        if bundle.is_empty() {
            info!("No stored credentials for the referenced registries");
            return Ok(None);
        }
        info!("Resolved credentials for {} registries", bundle.len());
        Ok(Some(bundle))
    }

    /// Engine command line for a request
    pub fn invocation(
        &self,
        program: &str,
        request: &LaunchRequest,
        with_bundle: bool,
    ) -> DelegateInvocation {
        let settings = self.config.delegate.settings(request.image.as_deref());
        let options = InvocationOptions {
            disable_banner: request.disable_banner,
            with_bundle: with_bundle && !request.interactive,
            interactive: request.interactive,
        };
        DelegateInvocation::build(program, &settings, self.host, &options, &request.forwarded)
    }

    /// Run the delegate for a request and return its exit code
    pub async fn execute(&self, request: &LaunchRequest) -> Result<i32, LaunchError> {
        let bundle = self.prepare_bundle(&request.spec_files, || {
            DockerConfigStore::discover(self.host)
        })?;

        let payload = match bundle {
            Some(bundle) => Some(bundle.to_json()?),
            None => None,
        };

        let engine = DockerEngine::new(tool_path(self.host, tools::DOCKER));
        engine.check_version().await?;

        let invocation = self.invocation(engine.program(), request, payload.is_some());
        debug!(
            "Launching delegate {} with {} forwarded arguments",
            self.config.delegate.settings(request.image.as_deref()).image,
            request.forwarded.len()
        );

        Ok(docker::launch(&invocation, payload).await?)
    }
}
