use clap::Args;

use crate::app::context::AppContext;
use crate::commands::output::{heading, notice, success};
use crate::errors::CliError;
use crate::scaffold::init::{init_project, ApplicationInput};

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Application display name
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub description: Option<String>,

    /// Lead developer email
    #[arg(long)]
    pub email: String,

    /// Application version (semver)
    #[arg(long, default_value = "1.0.0")]
    pub app_version: String,

    /// GitHub repository URL
    #[arg(long)]
    pub github_url: String,

    /// Services to scaffold, all offered services when omitted
    #[arg(long, value_delimiter = ',')]
    pub services: Option<Vec<String>>,
}

pub async fn run(ctx: &AppContext, args: InitArgs) -> Result<u8, CliError> {
    let input = ApplicationInput {
        display_name: args.name,
        description: args.description,
        lead_developer_email: args.email,
        app_version: args.app_version,
        github_url: args.github_url,
    };

    heading("Initializing lifecycle project...");
    let backend = ctx.backend_client().await?;
    let report = init_project(&backend, &ctx.project, input, args.services).await?;

    for path in &report.env_files_created {
        println!("Created {}", path.display());
    }
    for path in &report.templates_written {
        println!("Created {}", path.display());
    }
    for schema in &report.templates_missing {
        notice(&format!("Template {} is unavailable, left its folder empty", schema));
    }
    success(&format!(
        "Initialized services: {}",
        report.services.join(", ")
    ));
    success(&format!("Wrote {}", report.manifest_path.display()));
    Ok(0)
}
