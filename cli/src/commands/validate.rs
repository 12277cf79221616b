use clap::Args;
use colored::Colorize;

use crate::app::context::AppContext;
use crate::commands::deploy::{deploy, SelectionArgs};
use crate::commands::output::{heading, notice, success};
use crate::deploy::run::RunKind;
use crate::deploy::schema_check::{validate_services, ValidationReport};
use crate::deploy::upload::resolve_selection;
use crate::errors::CliError;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    /// Check files against registry schemas without uploading
    #[arg(long)]
    pub local: bool,
}

pub async fn run(ctx: &AppContext, args: ValidateArgs) -> Result<u8, CliError> {
    if !args.local {
        return deploy(ctx, RunKind::DryRun, args.selection.selection(), true).await;
    }

    let manifest = ctx.load_manifest().await?;
    if manifest.core_services.is_empty() {
        return Err(CliError::ConfigError(
            "No core services found in configuration. Run 'init' first.".to_string(),
        ));
    }
    let services = resolve_selection(&manifest, &args.selection.selection())?;
    if services.is_empty() {
        println!("{}", "No services selected for validation.".bright_magenta());
        return Ok(0);
    }

    heading(&format!("\n🔍 Validating services: {}", services.join(", ")));
    notice("❕ Files with \".example\" in their name are skipped, they are treated as example files.\n");

    let backend = ctx.backend_client().await?;
    let report = validate_services(&backend, &ctx.project, &manifest, &services).await?;
    print_report(&report);

    let errors = report.error_count();
    println!();
    if errors == 0 {
        success(&format!(
            "✅ Validated {} file(s), no errors found.",
            report.files_validated()
        ));
        Ok(0)
    } else {
        println!(
            "{}",
            format!(
                "❌ Validated {} file(s), {} error(s) found.",
                report.files_validated(),
                errors
            )
            .bright_red()
        );
        Ok(1)
    }
}

fn print_report(report: &ValidationReport) {
    for service in &report.missing_folders {
        notice(&format!("\n⚠️  Service folder not found for {}", service));
    }
    for service in &report.services {
        heading(&format!("\n📁 {}", service.service));
        for group in &service.groups {
            println!("    {} ({})", group.label, group.schema_name);
            if let Some(error) = &group.schema_error {
                println!("{}", format!("        ❌ {}", error).red());
                continue;
            }
            for file in &group.files {
                if file.errors.is_empty() {
                    println!("{}", format!("        ✅ {}", file.path.display()).green());
                    continue;
                }
                println!("{}", format!("        ❌ {}", file.path.display()).red());
                for error in &file.errors {
                    println!("{}", format!("            - {}", error).yellow());
                }
            }
        }
    }
}
