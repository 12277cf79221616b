use clap::{Args, Subcommand};
use colored::Colorize;
use lifecycle_api::models::StatusMap;

use crate::app::context::AppContext;
use crate::commands::interrupted;
use crate::commands::output::{heading, notice, success, upload_line};
use crate::deploy::run::{start_run, RunKind, RunRequest, StartedRun};
use crate::deploy::status::{self, ServiceState};
use crate::deploy::upload::ServiceSelection;
use crate::deploy::watch::{watch_run, WatchOutcome};
use crate::errors::CliError;
use crate::http::client::HttpClient;

pub const EXAMPLE_NOTICE: &str =
    "❕ Files with \".example\" in their name are not uploaded, they are treated as example files.\n";

#[derive(Debug, Subcommand)]
pub enum DeploySubcommand {
    /// Upload the selected services and deploy them
    Run(RunArgs),

    /// Show the status of a deployment
    GetStatus {
        deployment_id: String,

        /// Stream status updates until every service finishes
        #[arg(long, short = 'w')]
        watch: bool,
    },
}

/// Service selection shared by `deploy run` and `validate`
#[derive(Debug, Args)]
pub struct SelectionArgs {
    /// Comma-separated services to include
    #[arg(long, value_delimiter = ',', conflicts_with = "all")]
    pub services: Option<Vec<String>>,

    /// Include every service of the manifest (the default)
    #[arg(long, short = 'a', alias = "deploy-all")]
    pub all: bool,
}

impl SelectionArgs {
    pub fn selection(&self) -> ServiceSelection {
        match &self.services {
            Some(names) if !self.all => ServiceSelection::Only(names.clone()),
            _ => ServiceSelection::All,
        }
    }
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Watch the deployment after triggering it
    #[arg(long, short = 'w')]
    pub watch: bool,
}

pub async fn run(ctx: &AppContext, subcommand: DeploySubcommand) -> Result<u8, CliError> {
    match subcommand {
        DeploySubcommand::Run(args) => {
            let selection = args.selection.selection();
            deploy(ctx, RunKind::Deploy, selection, args.watch).await
        }
        DeploySubcommand::GetStatus {
            deployment_id,
            watch,
        } => get_status(ctx, &deployment_id, watch).await,
    }
}

/// Start a run, print its progress and optionally watch it
pub async fn deploy(
    ctx: &AppContext,
    kind: RunKind,
    selection: ServiceSelection,
    watch: bool,
) -> Result<u8, CliError> {
    let manifest = ctx.load_manifest().await?;
    let clients = ctx.run_clients().await?;
    let request = RunRequest {
        kind,
        selection,
        env_vars: ctx.env_vars().await?,
        concurrency: ctx.settings.upload_concurrency,
    };

    notice(EXAMPLE_NOTICE);
    let started = start_run(
        &clients,
        &ctx.project,
        &manifest,
        request,
        &ctx.retry_policy(),
        |progress| println!("{}", upload_line(progress)),
    )
    .await?;

    let Some(started) = started else {
        println!("{}", "No services selected.".bright_magenta());
        return Ok(0);
    };
    report_started(&started);

    if !watch {
        return Ok(0);
    }
    let run_id = started.run_id.to_string();
    watch_and_report(&clients.deployment, &run_id, started.services()).await
}

fn report_started(started: &StartedRun) {
    if let Some(preflight) = &started.preflight {
        if preflight.studio_created {
            success("Application created in Developer Studio.");
        }
        if !preflight.changes.is_empty() {
            notice("Metadata changes to apply:");
            for change in &preflight.changes {
                println!("  {}", change);
            }
        }
    }
    for service in &started.summary.skipped {
        notice(&format!(
            "No files detected for '{}' (only .example files found). Skipped.",
            service
        ));
    }
    println!(
        "{}",
        format!("Services: {}", started.services().join(", ")).bright_yellow()
    );
    success(&format!(
        "{} {} initiated successfully.",
        capitalize(started.kind.label()),
        started.run_id
    ));
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

async fn get_status(ctx: &AppContext, deployment_id: &str, watch: bool) -> Result<u8, CliError> {
    let deployment = ctx.deployment_client().await?;
    if watch {
        return watch_and_report(&deployment, deployment_id, &[]).await;
    }

    heading(&format!("Getting status for deployment {}", deployment_id));
    let snapshot = deployment.deployment_status(deployment_id).await?;
    if snapshot.services.is_empty() {
        notice("No services found for this deployment.");
        return Ok(0);
    }
    print_services(&snapshot.services);
    Ok(0)
}

fn print_services(services: &StatusMap) {
    for (service, status) in services {
        println!("{}", status::render(service, status));
    }
}

/// Watch a run until it finishes, the stream closes or the user interrupts
///
/// Returns the exit status of the outcome.
pub async fn watch_and_report(
    deployment: &HttpClient,
    run_id: &str,
    expected: &[String],
) -> Result<u8, CliError> {
    heading(&format!(
        "Streaming deployment status for ID: {} (Ctrl+C to exit)",
        run_id
    ));
    heading(&"=".repeat(50));

    let outcome = watch_run(deployment, run_id, expected, interrupted(), |service, status| {
        println!("{}", status::render(service, status));
    })
    .await?;

    match &outcome {
        WatchOutcome::Completed(services) if status::all_succeeded(services) => {
            success("\nAll services completed successfully.");
        }
        WatchOutcome::Completed(services) => {
            println!("{}", "\nSome services failed:".bright_red());
            print_failed(services);
        }
        WatchOutcome::Partial(services) => {
            notice("\nStream closed before every service finished. Final status:");
            print_services(services);
            print_failed(services);
        }
        WatchOutcome::Closed => {
            notice("\nStream closed before any service finished.");
        }
        WatchOutcome::NotFound => {
            println!("{}", "\nDeployment not found.".bright_red());
        }
        WatchOutcome::Cancelled => {
            heading("\nStopped watching deployment status.");
        }
    }
    Ok(outcome.exit_code())
}

fn print_failed(services: &StatusMap) {
    for (service, status) in services {
        if ServiceState::classify(&status.deployment_status) == ServiceState::Failed {
            println!("{}", status::describe(service, status).red());
        }
    }
}
