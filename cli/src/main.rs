//! cx-cli - Entry Point
//!
//! Command-line client for the CXP lifecycle platform.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::{debug, error};

use lifecycle_cli::app::context::AppContext;
use lifecycle_cli::app::options::AppOptions;
use lifecycle_cli::commands::{execute, Command};
use lifecycle_cli::errors::CliError;
use lifecycle_cli::logs::{init_logging, LogLevel};
use lifecycle_cli::storage::settings::Environment;

#[derive(Debug, Parser)]
#[command(
    name = "cx-cli",
    about = "Command-line client for the CXP lifecycle platform",
    version,
    propagate_version = true
)]
struct Cli {
    /// Target environment: sandbox (sbx), dev, nprd or prod
    #[arg(long, short = 'e', global = true)]
    env: Option<Environment>,

    /// Credentials file, or a directory holding credentials.json
    #[arg(long, global = true)]
    creds_path: Option<PathBuf>,

    /// Project root containing lifecycle/
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    let options = AppOptions {
        env: cli.env,
        creds_path: cli.creds_path,
        project_dir: cli.project_dir,
        log_level: cli.log_level,
        log_json: cli.log_json,
        ..Default::default()
    };

    let ctx = match AppContext::load(options).await {
        Ok(ctx) => ctx,
        Err(e) => return report(e),
    };

    let _guard = match init_logging(ctx.log_options()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            None
        }
    };
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    match execute(&ctx, cli.command).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => report(e),
    }
}

fn report(err: CliError) -> ExitCode {
    error!("{}", err);
    if let CliError::UploadFailed(failures) = &err {
        for failure in failures {
            eprintln!("{}", format!("  {}", failure).red());
        }
    }
    eprintln!("{} {}", "Error:".bright_red().bold(), err.to_string().bright_red());
    eprintln!("{}", err.hint().yellow());
    ExitCode::from(err.exit_code())
}
