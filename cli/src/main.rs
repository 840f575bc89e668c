use std::ffi::OsString;

use clap::Parser;

mod cli;
mod commands;
mod config;
mod tools;

mod domain;
mod error;
mod infrastructure;
mod services;
mod ui;

use cli::{Cli, Commands};
use commands::{registries, run};
use config::LauncherConfig;
use domain::HostContext;
use error::{LaunchError, EXIT_CONFIG_ERROR};

/// Host variable that turns on debug logging, like `--debug`
const DEBUG_ENV: &str = "DECKHAND_DEBUG";

/// Log filter from `LOGGING` / `LOG_LEVEL`, else debug or quiet
fn log_level(host: &HostContext, debug: bool) -> String {
    host.var("LOGGING")
        .or_else(|| host.var("LOG_LEVEL"))
        .map(str::to_string)
        .unwrap_or_else(|| {
            if debug || host.flag(DEBUG_ENV) {
                "debug".to_string()
            } else {
                "warn".to_string()
            }
        })
}

async fn dispatch(cli: Cli, raw: Vec<OsString>, host: &HostContext) -> Result<i32, LaunchError> {
    let config = LauncherConfig::load(host)?;

    match &cli.command {
        Commands::Registries { files } => registries::execute(host, &config, files),
        Commands::Deploy { .. } | Commands::Generate { .. } | Commands::Undeploy { .. } => {
            let request = run::request(&cli, &raw);
            run::execute(host, &config, request).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let raw: Vec<OsString> = std::env::args_os().skip(1).collect();

    let host = match HostContext::detect() {
        Ok(host) => host,
        Err(e) => {
            ui::print_error(&format!("{:#}", e));
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level(&host, cli.debug))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_ansi(false)
        .init();

    let code = match dispatch(cli, raw, &host).await {
        Ok(code) => code,
        Err(e) => {
            ui::print_error(&e.to_string());
            e.exit_code()
        }
    };

    std::process::exit(code);
}
