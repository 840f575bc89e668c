//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - Docker client configuration and credential helpers
//! - The container engine that runs the delegate

pub mod credstore;
pub mod docker;

// Re-export commonly used types
pub use credstore::{CredentialStore, DockerConfigStore};
pub use docker::DockerEngine;
