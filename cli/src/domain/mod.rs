//! Domain layer - pure business logic
//!
//! This module contains business logic with no external I/O
//! (apart from reading deployment spec files).
//! Types and functions here can be unit tested without mocking.

pub mod credential;
pub mod delegate;
pub mod host;
pub mod registry;
pub mod spec;

// Re-export commonly used types
pub use credential::{assemble, Credential, CredentialBundle};
pub use delegate::{DelegateInvocation, DelegateSettings, InvocationOptions};
pub use host::HostContext;
pub use registry::{extract_registries, RegistryAliases, RegistrySet};
