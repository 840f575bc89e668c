//! Centralized error types for deckhand
//!
//! Uses thiserror for typed errors that can be matched on,
//! while still being compatible with anyhow for propagation.

use std::path::PathBuf;

use thiserror::Error;

/// Exit code when a deployment spec cannot be read or parsed
pub const EXIT_SPEC_ERROR: i32 = 65;
/// Exit code when the credential bundle cannot be encoded
pub const EXIT_ENCODING_ERROR: i32 = 70;
/// Exit code when the container engine is missing or the delegate cannot be spawned
pub const EXIT_UNAVAILABLE: i32 = 69;
/// Exit code when the credential store cannot be read
pub const EXIT_STORE_ERROR: i32 = 74;
/// Exit code when the launcher configuration is invalid
pub const EXIT_CONFIG_ERROR: i32 = 78;

/// Top-level error type for launcher operations
///
/// Every variant is fatal and is raised before the delegate is spawned,
/// except `Handoff`, which covers failing to spawn it at all.
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Spec error: {0}")]
    Spec(#[from] SpecError),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("Bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("Launch error: {0}")]
    Handoff(#[from] HandoffError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl LaunchError {
    /// Process exit code reported for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Spec(_) => EXIT_SPEC_ERROR,
            Self::Store(_) => EXIT_STORE_ERROR,
            Self::Bundle(_) => EXIT_ENCODING_ERROR,
            Self::Handoff(_) => EXIT_UNAVAILABLE,
            Self::Config(_) => EXIT_CONFIG_ERROR,
        }
    }
}

/// Deployment spec errors
#[derive(Error, Debug)]
pub enum SpecError {
    #[error("Spec file not readable: {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Spec file malformed: {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

/// Credential store errors
///
/// A registry with no stored credential is not an error; lookups return `None`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Malformed credential config {path}: {message}")]
    Malformed { path: PathBuf, message: String },

    #[error("Credential helper {helper} failed for {server_address}: {message}")]
    Helper {
        helper: String,
        server_address: String,
        message: String,
    },
}

/// Credential bundle errors
#[derive(Error, Debug)]
pub enum BundleError {
    #[error("Failed to encode credential bundle: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Delegate process errors
#[derive(Error, Debug)]
pub enum HandoffError {
    #[error("Container engine `{program}` not available: {message}")]
    EngineUnavailable { program: String, message: String },

    #[error("Container engine version {found} is too old, {required} or newer is required")]
    EngineTooOld { found: u32, required: u32 },

    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to wait for `{program}`: {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Failed to parse config {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}
