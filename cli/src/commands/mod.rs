//! One module per CLI command

pub mod registries;
pub mod run;
