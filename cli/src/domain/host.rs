//! Host context
//!
//! Captures everything the launcher needs to know about the machine it runs
//! on (home directory, working directory, OS, docker socket, environment)
//! once at startup, so the rest of the code never reads ambient process state.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use super::delegate::{DOCKERCONF_ENV, KUBECONF_ENV};

/// Name of the docker client configuration file
pub const DOCKER_CONFIG_FILE: &str = "config.json";

/// Default docker daemon socket on Unix hosts
pub const UNIX_DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Docker daemon address reachable from a container on Docker Desktop for Windows
pub const WINDOWS_DOCKER_HOST: &str = "tcp://host.docker.internal:2375";

/// Host operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsKind {
    Unix,
    Windows,
}

impl OsKind {
    /// Detect the OS this binary was compiled for
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Self::Windows)
    }

    /// Native path separator for this OS
    pub fn path_separator(&self) -> &'static str {
        match self {
            Self::Unix => "/",
            Self::Windows => "\\",
        }
    }
}

/// Snapshot of the host the launcher runs on
#[derive(Debug, Clone)]
pub struct HostContext {
    /// Current user's home directory
    pub home: PathBuf,
    /// Working directory at startup
    pub cwd: PathBuf,
    /// Host OS family
    pub os: OsKind,
    /// Docker daemon socket (mounted into the delegate on Unix)
    pub docker_socket: PathBuf,
    /// Environment variables at startup
    vars: HashMap<String, String>,
}

impl HostContext {
    /// Build the context from the running process
    pub fn detect() -> Result<Self> {
        let home = dirs::home_dir().context("Failed to determine home directory")?;
        let cwd = std::env::current_dir().context("Failed to get current directory")?;

        Ok(Self {
            home,
            cwd,
            os: OsKind::current(),
            docker_socket: PathBuf::from(UNIX_DOCKER_SOCKET),
            // Non-UTF-8 entries cannot name anything the launcher reads
            vars: std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
                .collect(),
        })
    }

    /// Build a context with explicit values and an empty environment
    #[cfg(test)]
    pub fn new(home: impl Into<PathBuf>, cwd: impl Into<PathBuf>, os: OsKind) -> Self {
        Self {
            home: home.into(),
            cwd: cwd.into(),
            os,
            docker_socket: PathBuf::from(UNIX_DOCKER_SOCKET),
            vars: HashMap::new(),
        }
    }

    /// Builder: set an environment variable
    #[cfg(test)]
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// Look up an environment variable, treating empty values as unset
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Look up a boolean flag variable ("1", "true", "yes")
    pub fn flag(&self, key: &str) -> bool {
        self.var(key)
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    /// Docker client configuration directory (`DOCKER_CONFIG` or `~/.docker`)
    pub fn docker_config_dir(&self) -> PathBuf {
        self.var("DOCKER_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.home.join(".docker"))
    }

    /// Docker client `config.json` read for credentials and mounted into the delegate
    ///
    /// `DECKHAND_DOCKERCONF` names the file directly; otherwise it is
    /// `config.json` under [`docker_config_dir`](Self::docker_config_dir).
    pub fn docker_config_file(&self) -> PathBuf {
        self.var(DOCKERCONF_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.docker_config_dir().join(DOCKER_CONFIG_FILE))
    }

    /// Kubernetes client config (`DECKHAND_KUBECONF` or `~/.kube/config`)
    pub fn kube_config_file(&self) -> PathBuf {
        self.var(KUBECONF_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| self.home.join(".kube").join("config"))
    }

    /// Default docker daemon address for this OS
    pub fn default_docker_host(&self) -> String {
        if self.os.is_windows() {
            WINDOWS_DOCKER_HOST.to_string()
        } else {
            format!("unix://{}", self.docker_socket.display())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_config_dir_default() {
        let host = HostContext::new("/home/dev", "/work", OsKind::Unix);
        assert_eq!(
            host.docker_config_dir(),
            PathBuf::from("/home/dev/.docker")
        );
    }

    #[test]
    fn test_docker_config_dir_override() {
        let host = HostContext::new("/home/dev", "/work", OsKind::Unix)
            .with_var("DOCKER_CONFIG", "/etc/docker-client");
        assert_eq!(
            host.docker_config_dir(),
            PathBuf::from("/etc/docker-client")
        );
    }

    #[test]
    fn test_empty_var_is_unset() {
        let host = HostContext::new("/home/dev", "/work", OsKind::Unix).with_var("DOCKER_CONFIG", "");
        assert_eq!(host.var("DOCKER_CONFIG"), None);
        assert_eq!(
            host.docker_config_dir(),
            PathBuf::from("/home/dev/.docker")
        );
    }

    #[test]
    fn test_docker_config_file_follows_overrides() {
        let host = HostContext::new("/home/dev", "/work", OsKind::Unix);
        assert_eq!(
            host.docker_config_file(),
            PathBuf::from("/home/dev/.docker/config.json")
        );

        let host = host.with_var("DOCKER_CONFIG", "/etc/docker-client");
        assert_eq!(
            host.docker_config_file(),
            PathBuf::from("/etc/docker-client/config.json")
        );

        let host = host.with_var(DOCKERCONF_ENV, "/srv/ci/docker.json");
        assert_eq!(host.docker_config_file(), PathBuf::from("/srv/ci/docker.json"));
    }

    #[test]
    fn test_kube_config_file() {
        let host = HostContext::new("/home/dev", "/work", OsKind::Unix);
        assert_eq!(host.kube_config_file(), PathBuf::from("/home/dev/.kube/config"));

        let host = host.with_var(KUBECONF_ENV, "/etc/kube/admin.conf");
        assert_eq!(host.kube_config_file(), PathBuf::from("/etc/kube/admin.conf"));
    }

    #[test]
    fn test_default_docker_host() {
        let unix = HostContext::new("/home/dev", "/work", OsKind::Unix);
        assert_eq!(unix.default_docker_host(), "unix:///var/run/docker.sock");

        let windows = HostContext::new("C:\\Users\\dev", "C:\\work", OsKind::Windows);
        assert_eq!(windows.default_docker_host(), WINDOWS_DOCKER_HOST);
    }

    #[test]
    fn test_flag() {
        let host = HostContext::new("/home/dev", "/work", OsKind::Unix)
            .with_var("DECKHAND_DEBUG", "TRUE")
            .with_var("OTHER", "0");
        assert!(host.flag("DECKHAND_DEBUG"));
        assert!(!host.flag("OTHER"));
        assert!(!host.flag("MISSING"));
    }
}
