//! Runtime tool path resolution
//!
//! For each external tool (e.g., `docker`), we:
//! 1. Check for an environment variable `{TOOL}_BIN` (e.g., `DOCKER_BIN`)
//! 2. Look the tool up on PATH
//! 3. Fall back to the bare name and let the spawn fail with a clear error
//!
//! Non-alphanumeric characters in the tool name become `_`, so the
//! credential helper `docker-credential-pass` reads `DOCKER_CREDENTIAL_PASS_BIN`.

use crate::domain::HostContext;

/// Get the environment variable that overrides a tool's path
pub fn tool_env_var(tool: &str) -> String {
    let sanitized: String = tool
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_BIN", sanitized)
}

/// Get the path to an external tool
///
/// # Examples
///
/// ```rust,ignore
/// // With DOCKER_BIN="/usr/local/bin/docker"
/// assert_eq!(tool_path(&host, "docker"), "/usr/local/bin/docker");
/// ```
pub fn tool_path(host: &HostContext, tool: &str) -> String {
    if let Some(path) = host.var(&tool_env_var(tool)) {
        return path.to_string();
    }
    which::which(tool)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| tool.to_string())
}

/// Common tool names
pub mod tools {
    pub const DOCKER: &str = "docker";
    /// Prefix of docker credential helper binaries (`docker-credential-<name>`)
    pub const CREDENTIAL_HELPER_PREFIX: &str = "docker-credential-";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::host::OsKind;

    fn host() -> HostContext {
        HostContext::new("/home/dev", "/work", OsKind::Unix)
    }

    #[test]
    fn test_tool_env_var() {
        assert_eq!(tool_env_var("docker"), "DOCKER_BIN");
        assert_eq!(
            tool_env_var("docker-credential-pass"),
            "DOCKER_CREDENTIAL_PASS_BIN"
        );
    }

    #[test]
    fn test_tool_path_from_env() {
        let host = host().with_var("DOCKER_BIN", "/opt/docker/bin/docker");
        assert_eq!(tool_path(&host, "docker"), "/opt/docker/bin/docker");
    }

    #[test]
    fn test_tool_path_fallback() {
        assert_eq!(
            tool_path(&host(), "deckhand-missing-tool"),
            "deckhand-missing-tool"
        );
    }
}
