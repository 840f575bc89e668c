//! Delegate invocation
//!
//! Builds the container-engine argument vector that runs the delegate image:
//! labels, environment and bind mounts derived from the [`HostContext`],
//! followed by the image and the forwarded command line.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::host::HostContext;

/// Root of the delegate's filesystem layout inside the container
pub const CONTAINER_ROOT: &str = "/deckhand";

// Delegate-facing environment variables
pub const HOME_ENV: &str = "DECKHAND_HOME";
pub const KUBECONF_ENV: &str = "DECKHAND_KUBECONF";
pub const DOCKERCONF_ENV: &str = "DECKHAND_DOCKERCONF";
pub const DOCKER_CONFIG_DIR_ENV: &str = "DOCKER_CONFIG";
pub const REGISTRY_CONFIG_ENV: &str = "DECKHAND_REGISTRY_CONFIG";
pub const DOCKER_HOST_ENV: &str = "DOCKER_HOST";
pub const HOST_FS_ENV: &str = "DECKHAND_HOST_FS";
pub const WORKFLOW_LOGGER_DISABLED_ENV: &str = "WORKFLOW_LOGGER_DISABLED";
pub const IMAGE_CLEANUP_POLICY_ENV: &str = "DECKHAND_IMAGE_CLEANUP_POLICY";
pub const LB_READY_TIMEOUT_ENV: &str = "DECKHAND_LB_READY_TIMEOUT";
pub const LOG_LEVEL_ENV: &str = "DECKHAND_LOG_LEVEL";
pub const LOG_SIZE_ENV: &str = "DECKHAND_LOG_SIZE";

/// Variables copied from the host only when set
const PASS_THROUGH_ENV: &[&str] = &[
    IMAGE_CLEANUP_POLICY_ENV,
    LB_READY_TIMEOUT_ENV,
    LOG_LEVEL_ENV,
    LOG_SIZE_ENV,
];

/// A bind mount into the delegate container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

impl Mount {
    pub fn read_only(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: true,
        }
    }

    pub fn read_write(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    /// Render as a `-v` value: `source:target[:ro]`
    pub fn render(&self) -> String {
        let mut rendered = format!("{}:{}", self.source.display(), self.target);
        if self.read_only {
            rendered.push_str(":ro");
        }
        rendered
    }
}

/// Render a `key=value` option
pub fn build_option(key: &str, value: &str) -> String {
    format!("{}={}", key, value)
}

/// Settings for the delegate container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateSettings {
    /// Delegate image reference
    pub image: String,
    /// Container network mode
    pub network: String,
    /// Labels applied to the container
    pub labels: BTreeMap<String, String>,
}

/// Fully built delegate command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateInvocation {
    /// Container engine binary
    pub program: String,
    /// Arguments passed to the engine
    pub args: Vec<OsString>,
    /// Connect the launcher's own stdin to the delegate
    pub interactive: bool,
}

/// Options that vary per invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationOptions {
    /// Suppress the delegate's banner output
    pub disable_banner: bool,
    /// A credential bundle will be written to the delegate's stdin
    pub with_bundle: bool,
    /// Connect the launcher's stdin to the delegate
    pub interactive: bool,
}

fn host_path(base: &Path, relative: &[&str]) -> PathBuf {
    relative.iter().fold(base.to_path_buf(), |p, s| p.join(s))
}

fn container_path(relative: &str) -> String {
    format!("{}/{}", CONTAINER_ROOT, relative)
}

fn deckhand_dir(host: &HostContext) -> PathBuf {
    host.var(HOME_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| host_path(&host.home, &[".deckhand"]))
}

/// Environment handed to the delegate
pub fn delegate_env(host: &HostContext, options: &InvocationOptions) -> BTreeMap<String, String> {
    let mut envs = BTreeMap::new();

    // Same paths the mounts are taken from
    envs.insert(HOME_ENV.to_string(), deckhand_dir(host).display().to_string());
    envs.insert(
        KUBECONF_ENV.to_string(),
        host.kube_config_file().display().to_string(),
    );
    envs.insert(
        DOCKERCONF_ENV.to_string(),
        host.docker_config_file().display().to_string(),
    );
    envs.insert(
        DOCKER_HOST_ENV.to_string(),
        host.var(DOCKER_HOST_ENV)
            .map(str::to_string)
            .unwrap_or_else(|| host.default_docker_host()),
    );

    envs.insert(
        DOCKER_CONFIG_DIR_ENV.to_string(),
        container_path(".docker"),
    );

    if options.with_bundle {
        envs.insert(REGISTRY_CONFIG_ENV.to_string(), "true".to_string());
    }

    if host.os.is_windows() {
        envs.insert(
            HOST_FS_ENV.to_string(),
            host.os.path_separator().to_string(),
        );
    }

    if options.disable_banner {
        envs.insert(WORKFLOW_LOGGER_DISABLED_ENV.to_string(), "true".to_string());
    }

    for key in PASS_THROUGH_ENV {
        if let Some(value) = host.var(key) {
            envs.insert(key.to_string(), value.to_string());
        }
    }

    envs
}

/// Bind mounts handed to the delegate
pub fn delegate_mounts(host: &HostContext) -> Vec<Mount> {
    let mut mounts = vec![
        Mount::read_only(
            host.docker_config_file(),
            container_path(".docker/config.json"),
        ),
        Mount::read_only(host.kube_config_file(), container_path(".kube/config")),
        Mount::read_only(host.cwd.clone(), container_path("app")),
        Mount::read_write(
            deckhand_dir(host).join("deckhand"),
            container_path("deckhand"),
        ),
    ];

    if !host.os.is_windows() {
        let socket = host.docker_socket.display().to_string();
        mounts.push(Mount::read_only(host.docker_socket.clone(), socket));
    }

    mounts
}

impl DelegateInvocation {
    /// Assemble the engine command line
    ///
    /// Layout: `run --rm --net=<network> -i`, then `--label`, `-e` and `-v`
    /// flags, the image, and finally the forwarded arguments.
    pub fn build(
        program: impl Into<String>,
        settings: &DelegateSettings,
        host: &HostContext,
        options: &InvocationOptions,
        forwarded: &[OsString],
    ) -> Self {
        let mut args: Vec<OsString> = vec![
            "run".into(),
            "--rm".into(),
            format!("--net={}", settings.network).into(),
            // Keep the container's stdin open for the bundle or the terminal
            "-i".into(),
        ];

        for (key, value) in &settings.labels {
            args.push("--label".into());
            args.push(build_option(key, value).into());
        }

        for (key, value) in delegate_env(host, options) {
            args.push("-e".into());
            args.push(build_option(&key, &value).into());
        }

        for mount in delegate_mounts(host) {
            args.push("-v".into());
            args.push(mount.render().into());
        }

        args.push(settings.image.clone().into());
        args.extend(forwarded.iter().cloned());

        Self {
            program: program.into(),
            args,
            interactive: options.interactive,
        }
    }
}
