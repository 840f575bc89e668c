//! Delegate commands (deploy, generate, undeploy)
//!
//! Every delegate command takes the same path: resolve credentials for the
//! referenced specs, then run the delegate with the forwarded arguments.

use std::ffi::OsString;

use tracing::debug;

use crate::cli::{forwarded_args, Cli};
use crate::config::LauncherConfig;
use crate::domain::HostContext;
use crate::error::LaunchError;
use crate::services::launch_service::{LaunchRequest, LaunchService};

/// Build the launch request for a parsed command line
///
/// `raw` is the command line without the program name.
pub fn request(cli: &Cli, raw: &[OsString]) -> LaunchRequest {
    LaunchRequest {
        spec_files: cli.command.spec_files().to_vec(),
        forwarded: forwarded_args(raw),
        image: cli.image.clone(),
        disable_banner: cli.disable_banner,
        interactive: cli.interactive,
    }
}

/// Run the delegate and return its exit code
pub async fn execute(
    host: &HostContext,
    config: &LauncherConfig,
    request: LaunchRequest,
) -> Result<i32, LaunchError> {
    debug!("Delegate arguments: {:?}", request.forwarded);
    LaunchService::new(host, config).execute(&request).await
}
