//! Command-line commands
//!
//! Each command returns the process exit status on success. Errors are
//! printed with their remediation hint by the binary.

pub mod deploy;
pub mod grants;
pub mod init;
pub mod listings;
pub mod output;
pub mod register;
pub mod validate;

use clap::Subcommand;
use tracing::info;

use crate::app::context::AppContext;
use crate::errors::CliError;
use crate::utils::version_info;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Scaffold lifecycle/ with environment files, service folders and the manifest
    Init(init::InitArgs),

    /// Register the application in IAM and print its service credential
    Register,

    /// Deploy services and follow deployments
    Deploy {
        #[command(subcommand)]
        subcommand: deploy::DeploySubcommand,
    },

    /// Validate services remotely, or locally against registry schemas
    Validate(validate::ValidateArgs),

    /// Cancel a deployment during its validation phase
    Cancel { deployment_id: String },

    /// Applications registered in your account
    Applications {
        #[command(subcommand)]
        subcommand: listings::ApplicationsSubcommand,
    },

    /// Deployment details and history
    Deployments {
        #[command(subcommand)]
        subcommand: listings::DeploymentsSubcommand,
    },

    /// Messaging service
    Ms {
        #[command(subcommand)]
        subcommand: grants::MessagingSubcommand,
    },

    /// Show the CLI version
    Version,
}

/// Run a command against the context
pub async fn execute(ctx: &AppContext, command: Command) -> Result<u8, CliError> {
    match command {
        Command::Init(args) => init::run(ctx, args).await,
        Command::Register => register::run(ctx).await,
        Command::Deploy { subcommand } => deploy::run(ctx, subcommand).await,
        Command::Validate(args) => validate::run(ctx, args).await,
        Command::Cancel { deployment_id } => cancel(ctx, &deployment_id).await,
        Command::Applications { subcommand } => listings::run_applications(ctx, subcommand).await,
        Command::Deployments { subcommand } => listings::run_deployments(ctx, subcommand).await,
        Command::Ms { subcommand } => grants::run(ctx, subcommand).await,
        Command::Version => {
            let version = version_info();
            println!(
                "cx-cli version {} ({}, built {})",
                version.version, version.git_hash, version.build_time
            );
            Ok(0)
        }
    }
}

async fn cancel(ctx: &AppContext, deployment_id: &str) -> Result<u8, CliError> {
    output::heading(&format!("Trying to cancel deployment {}", deployment_id));
    let deployment = ctx.deployment_client().await?;
    deployment.cancel_deployment(deployment_id).await?;
    output::success(&format!("Deployment {} canceled successfully.", deployment_id));
    Ok(0)
}

/// Resolves on Ctrl+C; never resolves when the signal cannot be installed
pub async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received"),
        Err(_) => std::future::pending::<()>().await,
    }
}
