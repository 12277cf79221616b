//! Messaging service topic grants

use clap::Subcommand;
use colored::Colorize;
use lifecycle_api::models::{CreateGrantRequest, GrantRole};

use crate::app::context::AppContext;
use crate::commands::output::{heading, notice, success};
use crate::errors::CliError;
use crate::http::messaging::{GrantCreated, GrantDeleted};

#[derive(Debug, Subcommand)]
pub enum MessagingSubcommand {
    /// Manage topic grants
    Grants {
        #[command(subcommand)]
        subcommand: GrantsSubcommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum GrantsSubcommand {
    /// Grant an application access to a topic
    Create {
        /// Topic name, e.g. cx.myapp.events.v1
        topic: String,

        #[arg(long, short = 'a')]
        app_id: String,

        /// producer or consumer
        #[arg(long, short = 'r')]
        role: GrantRole,

        /// Consumer group, required for consumers; '*' allows every group
        #[arg(long, short = 'g')]
        group: Option<String>,
    },

    /// Revoke an application's access to a topic
    Delete {
        topic: String,

        #[arg(long, short = 'a')]
        app_id: String,

        #[arg(long, short = 'r')]
        role: GrantRole,
    },

    /// List the grants of a topic
    List { topic: String },
}

/// Grant request, checking the consumer group requirement
pub fn grant_request(
    app_id: String,
    role: GrantRole,
    group: Option<String>,
) -> Result<CreateGrantRequest, CliError> {
    let group = group.filter(|g| !g.trim().is_empty());
    if role == GrantRole::Consumer && group.is_none() {
        return Err(CliError::ValidationError(
            "Consumer group is required for consumer role. Use --group <name>, or --group '*' to allow all consumer groups".to_string(),
        ));
    }
    Ok(CreateGrantRequest {
        app_id,
        role,
        consumer_group: group,
    })
}

pub async fn run(ctx: &AppContext, subcommand: MessagingSubcommand) -> Result<u8, CliError> {
    let MessagingSubcommand::Grants { subcommand } = subcommand;
    match subcommand {
        GrantsSubcommand::Create {
            topic,
            app_id,
            role,
            group,
        } => {
            let request = grant_request(app_id, role, group)?;
            let messaging = ctx.messaging_client().await?;
            heading(&format!(
                "Creating {} grant for {} on topic {}...",
                role, request.app_id, topic
            ));
            match messaging.create_grant(&topic, &request).await? {
                GrantCreated::Created => success("Grant created successfully."),
                GrantCreated::AlreadyExists => notice("Grant already exists."),
            }
        }
        GrantsSubcommand::Delete {
            topic,
            app_id,
            role,
        } => {
            let messaging = ctx.messaging_client().await?;
            heading(&format!(
                "Deleting {} grant for {} on topic {}...",
                role, app_id, topic
            ));
            match messaging.delete_grant(&topic, &app_id, role).await? {
                GrantDeleted::Deleted => success("Grant deleted successfully."),
                GrantDeleted::NotFound => notice("Grant not found."),
            }
        }
        GrantsSubcommand::List { topic } => {
            let messaging = ctx.messaging_client().await?;
            heading(&format!("Fetching grants for topic {}...", topic));
            let Some(list) = messaging.list_grants(&topic).await? else {
                notice(&format!("Topic not found: {}", topic));
                return Ok(0);
            };
            if list.grants.is_empty() {
                notice("No grants found for this topic.");
                return Ok(0);
            }

            println!("{}", format!("\nGrants for topic: {}", topic).bright_magenta().bold());
            println!("{}", "-".repeat(60));
            for grant in &list.grants {
                let role = grant.role.as_deref().unwrap_or("N/A");
                println!("  App ID: {}", grant.app_id.as_deref().unwrap_or("N/A"));
                let role_line = format!("    Role: {}", role);
                if role == GrantRole::Producer.as_str() {
                    println!("{}", role_line.bright_green());
                } else {
                    println!("{}", role_line.bright_cyan());
                }
                if role == GrantRole::Consumer.as_str() {
                    println!(
                        "    Group: {}",
                        grant.consumer_group.as_deref().unwrap_or("-")
                    );
                }
                println!();
            }
        }
    }
    Ok(0)
}
