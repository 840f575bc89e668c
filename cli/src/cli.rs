//! CLI definitions for deckhand
//!
//! The command tree mirrors the delegate's own. Apart from the launcher
//! options stripped by [`forwarded_args`], arguments reach the delegate
//! unchanged.

use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "deckhand",
    version,
    about = "Runs the deployment delegate container with local registry credentials",
    long_about = "Reads the given service specs, resolves credentials for every registry they\nreference from the local docker configuration, and hands them to the delegate\ncontainer on its standard input."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Delegate image to run instead of the configured one
    #[arg(long, env = "DECKHAND_IMAGE", global = true)]
    pub image: Option<String>,

    /// Suppress the delegate's banner
    #[arg(long, global = true)]
    pub disable_banner: bool,

    /// Attach the terminal to the delegate (no credential bundle is delivered)
    #[arg(long, global = true)]
    pub interactive: bool,

    /// Enable debug logging for the launcher
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a resource
    Deploy {
        #[command(subcommand)]
        command: DeployCommands,
    },

    /// Generate a resource
    Generate {
        #[command(subcommand)]
        command: GenerateCommands,
    },

    /// Undeploy a resource
    Undeploy {
        #[command(subcommand)]
        command: UndeployCommands,
    },

    /// Show the registries referenced by service specs and whether credentials are stored
    /// Runs locally; the delegate is not started
    Registries {
        /// Service spec files
        #[arg(short = 'f', long = "files", required = true, value_delimiter = ',', num_args = 1..)]
        files: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DeployCommands {
    /// Deploy services from the given service specs
    Service(ServiceDeployArgs),
}

#[derive(Subcommand, Debug)]
pub enum GenerateCommands {
    /// Perform 'generate' on services
    Service {
        #[command(subcommand)]
        command: GenerateServiceCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum GenerateServiceCommands {
    /// Generate manifests from the given service specs
    Manifests(ManifestArgs),
}

#[derive(Subcommand, Debug)]
pub enum UndeployCommands {
    /// Undeploy an app from the cluster
    App {
        /// Application name
        #[arg(short = 'a', long = "app", required = true)]
        app: String,

        /// Kubernetes namespace
        #[arg(short = 'n', long = "namespace", required = true)]
        namespace: String,
    },

    /// Undeploy services of an app
    Service {
        /// Service names
        #[arg(short = 's', long = "service", required = true, value_delimiter = ',', num_args = 1..)]
        services: Vec<String>,

        /// Application name
        #[arg(short = 'a', long = "app", required = true)]
        app: String,

        /// Kubernetes namespace
        #[arg(short = 'n', long = "namespace", required = true)]
        namespace: String,
    },
}

/// Arguments shared by commands that act on service specs
#[derive(Args, Debug)]
pub struct SpecArgs {
    /// Service spec files
    #[arg(short = 'f', long = "files", required = true, value_delimiter = ',', num_args = 1..)]
    pub files: Vec<PathBuf>,

    /// Profile files
    #[arg(short = 'p', long = "profile", value_delimiter = ',')]
    pub profiles: Vec<PathBuf>,

    /// Profile name, resolved by the delegate
    #[arg(short = 'P', long = "profile-name")]
    pub profile_name: Option<String>,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(Args, Debug)]
pub struct ServiceDeployArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Application name
    #[arg(short = 'a', long = "app", required = true)]
    pub app: String,

    /// Kubernetes namespace
    #[arg(short = 'n', long = "namespace", required = true)]
    pub namespace: String,
}

#[derive(Args, Debug)]
pub struct ManifestArgs {
    #[command(flatten)]
    pub spec: SpecArgs,

    /// Application name
    #[arg(short = 'a', long = "app", required = true)]
    pub app: String,
}

impl Commands {
    /// Spec files that drive credential resolution
    pub fn spec_files(&self) -> &[PathBuf] {
        match self {
            Commands::Deploy {
                command: DeployCommands::Service(args),
            } => &args.spec.files,
            Commands::Generate {
                command:
                    GenerateCommands::Service {
                        command: GenerateServiceCommands::Manifests(args),
                    },
            } => &args.spec.files,
            Commands::Undeploy { .. } => &[],
            Commands::Registries { files } => files,
        }
    }
}

/// Options consumed by the launcher itself
const LAUNCHER_FLAGS: &[&str] = &["--disable-banner", "--interactive", "--debug"];
const IMAGE_FLAG: &str = "--image";

/// Arguments to hand to the delegate
///
/// `raw` excludes the program name. Launcher options are removed wherever
/// they appear before a `--` terminator; everything else keeps its order.
/// Arguments are passed through as given, including non-UTF-8 ones.
pub fn forwarded_args(raw: &[OsString]) -> Vec<OsString> {
    let mut forwarded = Vec::with_capacity(raw.len());
    let mut iter = raw.iter();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            forwarded.push(arg.clone());
            forwarded.extend(iter.cloned());
            break;
        }
        if is_launcher_flag(arg) {
            continue;
        }
        if arg == IMAGE_FLAG {
            iter.next();
            continue;
        }
        forwarded.push(arg.clone());
    }

    forwarded
}

fn is_launcher_flag(arg: &OsStr) -> bool {
    // Launcher options are ASCII, so a non-UTF-8 argument is never one
    let Some(arg) = arg.to_str() else {
        return false;
    };
    LAUNCHER_FLAGS.contains(&arg)
        || arg
            .strip_prefix(IMAGE_FLAG)
            .is_some_and(|rest| rest.starts_with('='))
}
