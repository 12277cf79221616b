use colored::Colorize;
use secrecy::ExposeSecret;
use tracing::info;

use crate::app::context::AppContext;
use crate::commands::output::{heading, notice, success};
use crate::errors::CliError;
use crate::register::flow::{assign_platform_roles, register_application, service_credential};

/// Register the manifest's application and print its service credential
pub async fn run(ctx: &AppContext) -> Result<u8, CliError> {
    heading("📦 Registering a new application...");
    let mut manifest = ctx.load_manifest().await?;
    let iam = ctx.iam_client().await?;
    let deployment = ctx.deployment_client().await?;
    info!("Registering against {} ({})", iam.base_url(), ctx.env);

    let registration =
        register_application(&iam, &deployment, &manifest.application, &ctx.retry_policy()).await?;
    let application = registration.application;

    manifest.application.application_uid = Some(application.id.clone());
    let manifest_file = ctx.project.manifest_file();
    manifest.save(&manifest_file).await?;
    success(&format!(
        "📄 Updated application_uid in config file: {}",
        manifest_file.path().display()
    ));

    let roles = ctx.settings.roles_for(ctx.env);
    for service in assign_platform_roles(&iam, &application, roles).await? {
        success(&format!("Assigned {} role", service));
    }

    let credential = service_credential(&application)?;
    println!(
        "{}",
        format!(
            "🔒 Your Service account secret is: {}",
            credential.expose_secret()
        )
        .green()
    );
    notice("⚠️ The secret will be shown only once.");
    Ok(0)
}
