//! Local registry credential store
//!
//! Reads the docker client configuration (`config.json`) and answers
//! per-address credential lookups. Addresses routed to a credential helper
//! (`credsStore` / `credHelpers`) are answered by running
//! `docker-credential-<name> get`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use tracing::debug;

use crate::domain::host::DOCKER_CONFIG_FILE;
use crate::domain::HostContext;
use crate::error::StoreError;
use crate::tools::{tool_path, tools};

/// Message credential helpers print when nothing is stored for an address
const HELPER_NOT_FOUND: &str = "credentials not found in native keychain";

/// Helper username marking the secret as an identity token, not a password
const IDENTITY_TOKEN_USERNAME: &str = "<token>";

/// A credential as stored for one server address
#[derive(Clone, PartialEq, Eq)]
pub struct StoredAuth {
    pub username: String,
    pub password: String,
    pub server_address: String,
}

impl std::fmt::Debug for StoredAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredAuth")
            .field("username", &self.username)
            .field("server_address", &self.server_address)
            .finish_non_exhaustive()
    }
}

/// Read-only keyed lookup of stored registry credentials
pub trait CredentialStore {
    /// Look up the credential stored for `server_address`
    ///
    /// `Ok(None)` means nothing is stored; `Err` means the store itself failed.
    fn get(&self, server_address: &str) -> Result<Option<StoredAuth>, StoreError>;
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    auths: BTreeMap<String, AuthEntry>,
    #[serde(default, rename = "credsStore")]
    creds_store: Option<String>,
    #[serde(default, rename = "credHelpers")]
    cred_helpers: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct AuthEntry {
    #[serde(default)]
    auth: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct HelperResponse {
    #[serde(default)]
    username: String,
    #[serde(default)]
    secret: String,
}

/// Strip scheme and path from a stored address, e.g.
/// `"https://index.docker.io/v1/"` -> `"index.docker.io"`
pub fn convert_to_hostname(address: &str) -> &str {
    let stripped = address
        .strip_prefix("http://")
        .or_else(|| address.strip_prefix("https://"))
        .unwrap_or(address);
    stripped.split('/').next().unwrap_or(stripped)
}

fn decode_auth(path: &Path, key: &str, encoded: &str) -> Result<(String, String), StoreError> {
    let malformed = |message: String| StoreError::Malformed {
        path: path.to_path_buf(),
        message,
    };

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|e| malformed(format!("invalid auth for {}: {}", key, e)))?;
    let decoded = String::from_utf8(decoded)
        .map_err(|_| malformed(format!("auth for {} is not UTF-8", key)))?;

    match decoded.split_once(':') {
        Some((user, password)) => Ok((user.to_string(), password.to_string())),
        None => Err(malformed(format!("invalid auth for {}: missing ':'", key))),
    }
}

/// Credential store backed by a docker client config directory
#[derive(Debug)]
pub struct DockerConfigStore {
    path: PathBuf,
    auths: BTreeMap<String, StoredAuth>,
    creds_store: Option<String>,
    cred_helpers: BTreeMap<String, String>,
    /// Resolved binary for each referenced helper name
    helper_programs: BTreeMap<String, String>,
}

impl DockerConfigStore {
    /// Load the store from the host's docker config file
    pub fn discover(host: &HostContext) -> Result<Self, StoreError> {
        Self::load_file(host.docker_config_file(), host)
    }

    /// Load a docker config file
    ///
    /// A missing file is an empty store; an unreadable or malformed file is an error.
    pub fn load_file(path: PathBuf, host: &HostContext) -> Result<Self, StoreError> {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No docker config at {}, using empty store", path.display());
                String::new()
            }
            Err(e) => {
                return Err(StoreError::Unreadable {
                    path,
                    message: e.to_string(),
                })
            }
        };

        Self::parse(&content, path, host)
    }

    fn parse(content: &str, path: PathBuf, host: &HostContext) -> Result<Self, StoreError> {
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_json::from_str(content).map_err(|e| StoreError::Malformed {
                path: path.clone(),
                message: e.to_string(),
            })?
        };

        let mut auths = BTreeMap::new();
        for (key, entry) in file.auths {
            let (mut username, mut password) = match entry.auth.as_deref() {
                Some(encoded) if !encoded.is_empty() => decode_auth(&path, &key, encoded)?,
                _ => (String::new(), String::new()),
            };
            if let Some(u) = entry.username.filter(|u| !u.is_empty()) {
                username = u;
            }
            if let Some(p) = entry.password.filter(|p| !p.is_empty()) {
                password = p;
            }
            auths.insert(
                key.clone(),
                StoredAuth {
                    username,
                    password,
                    server_address: key,
                },
            );
        }

        let creds_store = file.creds_store.filter(|s| !s.is_empty());
        let helper_programs = creds_store
            .iter()
            .chain(file.cred_helpers.values())
            .map(|name| {
                let tool = format!("{}{}", tools::CREDENTIAL_HELPER_PREFIX, name);
                (name.clone(), tool_path(host, &tool))
            })
            .collect();

        Ok(Self {
            path,
            auths,
            creds_store,
            cred_helpers: file.cred_helpers,
            helper_programs,
        })
    }

    /// Path of the loaded config file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Credential helper responsible for `server_address`, if any
    fn helper_for(&self, server_address: &str) -> Option<&str> {
        let hostname = convert_to_hostname(server_address);
        self.cred_helpers
            .get(server_address)
            .or_else(|| self.cred_helpers.get(hostname))
            .or(self.creds_store.as_ref())
            .map(String::as_str)
    }

    /// Look up `server_address` in the `auths` section
    fn file_get(&self, server_address: &str) -> Option<StoredAuth> {
        if let Some(auth) = self.auths.get(server_address) {
            return Some(auth.clone());
        }
        // Legacy keys may carry a scheme or path
        self.auths
            .iter()
            .find(|(key, _)| convert_to_hostname(key) == server_address)
            .map(|(_, auth)| auth.clone())
    }

    fn helper_get(&self, helper: &str, server_address: &str) -> Result<Option<StoredAuth>, StoreError> {
        let program = self
            .helper_programs
            .get(helper)
            .cloned()
            .unwrap_or_else(|| format!("{}{}", tools::CREDENTIAL_HELPER_PREFIX, helper));

        let helper_err = |message: String| StoreError::Helper {
            helper: helper.to_string(),
            server_address: server_address.to_string(),
            message,
        };

        debug!("Querying credential helper {} for {}", helper, server_address);

        let mut child = Command::new(&program)
            .arg("get")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| helper_err(format!("failed to run {}: {}", program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A helper may exit before reading stdin
            match stdin.write_all(server_address.as_bytes()) {
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    return Err(helper_err(format!("failed to write to helper: {}", e)));
                }
                _ => {}
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| helper_err(format!("failed to wait for helper: {}", e)))?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stdout.contains(HELPER_NOT_FOUND) || stderr.contains(HELPER_NOT_FOUND) {
                return Ok(None);
            }
            let message = if stdout.trim().is_empty() {
                stderr.trim().to_string()
            } else {
                stdout.trim().to_string()
            };
            return Err(helper_err(message));
        }

        let response: HelperResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| helper_err(format!("invalid helper response: {}", e)))?;

        // Identity tokens cannot be encoded as basic auth
        if response.username == IDENTITY_TOKEN_USERNAME {
            debug!(
                "Credential helper {} holds an identity token for {}, skipping",
                helper, server_address
            );
            return Ok(None);
        }

        Ok(Some(StoredAuth {
            username: response.username,
            password: response.secret,
            server_address: server_address.to_string(),
        }))
    }
}

impl CredentialStore for DockerConfigStore {
    fn get(&self, server_address: &str) -> Result<Option<StoredAuth>, StoreError> {
        match self.helper_for(server_address) {
            Some(helper) => self.helper_get(helper, server_address),
            None => Ok(self.file_get(server_address)),
        }
    }
}
