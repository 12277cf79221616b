//! Application and deployment listings

use clap::Subcommand;
use colored::Colorize;
use lifecycle_api::models::{ApplicationList, DeploymentList, DeploymentRecord};
use serde_json::Value;

use crate::app::context::AppContext;
use crate::commands::output::{
    heading, listing_color, notice, or_dash, print_json, print_table, timestamp,
};
use crate::errors::CliError;

#[derive(Debug, Subcommand)]
pub enum ApplicationsSubcommand {
    /// List applications registered in your account
    List {
        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum DeploymentsSubcommand {
    /// Show one deployment, or the current deployment of the local application
    Get {
        deployment_id: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Deployment history of an application, the local one by default
    History {
        app_id: Option<String>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },
}

pub async fn run_applications(
    ctx: &AppContext,
    subcommand: ApplicationsSubcommand,
) -> Result<u8, CliError> {
    let ApplicationsSubcommand::List { json } = subcommand;
    let deployment = ctx.deployment_client().await?;
    let raw: Value = deployment.list_applications().await?;
    if json {
        print_json(&raw)?;
        return Ok(0);
    }

    let list: ApplicationList = serde_json::from_value(raw)?;
    heading(&format!(
        "Applications (total {}):",
        list.total.unwrap_or(list.items.len())
    ));
    let rows: Vec<Vec<String>> = list
        .items
        .iter()
        .map(|app| {
            vec![
                or_dash(app.name()),
                or_dash(app.id()),
                or_dash(app.status()),
                or_dash(app.version()),
                or_dash(app.lead_developer()),
                timestamp(app.last_deployment_time()),
            ]
        })
        .collect();
    print_table(
        &["Name", "ID", "Status", "Version", "Lead Developer", "Last Deployment"],
        &rows,
        Some(2),
    );
    Ok(0)
}

pub async fn run_deployments(
    ctx: &AppContext,
    subcommand: DeploymentsSubcommand,
) -> Result<u8, CliError> {
    let deployment = ctx.deployment_client().await?;
    match subcommand {
        DeploymentsSubcommand::Get {
            deployment_id: Some(id),
            json,
        } => {
            let raw: Value = deployment.get_deployment(&id).await?;
            show_deployment(raw, json)?;
        }
        DeploymentsSubcommand::Get {
            deployment_id: None,
            json,
        } => {
            let app_id = ctx.load_manifest().await?.require_app_id()?;
            match deployment.current_deployment::<Value>(&app_id).await? {
                Some(raw) => show_deployment(raw, json)?,
                None => notice("No successful deployments found for this application."),
            }
        }
        DeploymentsSubcommand::History { app_id, json } => {
            let app_id = match app_id {
                Some(id) => id,
                None => ctx.load_manifest().await?.require_app_id()?,
            };
            let raw: Value = deployment.deployment_history(&app_id).await?;
            let list: DeploymentList = serde_json::from_value(raw.clone())?;
            heading(&format!(
                "Deployment history for application {} (total {}):",
                app_id,
                list.total.unwrap_or(list.items.len())
            ));
            if json {
                print_json(&raw)?;
            } else {
                print_history(&list.items);
            }
        }
    }
    Ok(0)
}

fn show_deployment(raw: Value, json: bool) -> Result<(), CliError> {
    if json {
        heading("Deployment Details:");
        return print_json(&raw);
    }
    let record: DeploymentRecord = serde_json::from_value(raw)?;
    print_deployment(&record);
    Ok(())
}

fn colored_status(status: Option<&str>) -> String {
    match status {
        Some(s) if !s.is_empty() => match listing_color(s) {
            Some(color) => s.color(color).to_string(),
            None => s.to_string(),
        },
        _ => "-".to_string(),
    }
}

fn print_deployment(record: &DeploymentRecord) {
    println!();
    heading("Deployment Details:");
    println!("Deployment ID: {}", or_dash(record.display_id()));
    println!("Application ID: {}", or_dash(record.application_id.as_deref()));
    println!("Status: {}", colored_status(record.status.as_deref()));
    println!("Version: {}", or_dash(record.version.as_deref()));
    println!("Deployed By: {}", or_dash(record.deployed_by.as_deref()));
    println!("Deployment Time: {}", timestamp(record.started_at()));
    println!("Deployment Complete Time: {}", timestamp(record.finished_at()));

    if !record.requested_core_services.is_empty() {
        println!();
        heading("Requested Core Services:");
        for (service, status) in &record.requested_core_services {
            println!("{}", format!("- {}", service).bright_white());
            println!("    Status: {}", status.deployment_status);
            if let Some(path) = &status.configuration_file_path {
                println!("    Config Path: {}", path);
            }
            if let Some(reason) = status.reason() {
                println!("    Failure Reason: {}", reason);
            }
            if let Some(topics) = status.num_of_topics {
                println!("    Num of Topics: {}", topics);
            }
            if let Some(topic_statuses) = &status.topic_statuses {
                println!("    Topic Statuses:");
                for (topic, value) in topic_statuses {
                    println!("      - {}: {}", topic, value);
                }
            }
        }
    }
    println!();
}

fn print_history(items: &[DeploymentRecord]) {
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|d| {
            vec![
                or_dash(d.display_id()),
                or_dash(d.status.as_deref()),
                or_dash(d.version.as_deref()),
                or_dash(d.deployed_by.as_deref()),
                timestamp(d.started_at()),
                timestamp(d.finished_at()),
            ]
        })
        .collect();
    print_table(
        &["Deployment ID", "Status", "Version", "Deployed By", "Started", "Completed"],
        &rows,
        Some(1),
    );
}
