//! Project scaffolding (`cx-cli init`)
//!
//! Creates the `lifecycle/` tree, placeholder environment files, one folder
//! per selected service with example templates from the schema registry, and
//! the manifest. Existing files are never overwritten.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use async_trait::async_trait;
use lifecycle_api::models::SchemaDocument;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::errors::CliError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::storage::layout::ProjectLayout;
use crate::storage::manifest::{ApplicationMetadata, LifecycleConfig};
use crate::storage::settings::Environment;

/// Registry document describing the manifest itself
pub const CONFIG_SCHEMA: &str = "config.json";

const DATA_FABRIC_COMMANDS: &str = "#Create Connector connectors/connectors.example.json\n";

const GITHUB_HOSTS: [&str; 2] = ["github.com", "wwwin-github.cisco.com"];

static EMAIL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^[\w\.-]+@[\w\.-]+\.\w+$"));

static SEMVER: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"^(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(?:-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(?:\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?$",
    )
});

static SERVICE_ALTERNATION: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^\^\((.*?)\)\$$"));

fn pattern(
    regex: &'static LazyLock<Result<Regex, regex::Error>>,
) -> Result<&'static Regex, CliError> {
    LazyLock::force(regex)
        .as_ref()
        .map_err(|e| CliError::Internal(format!("validation pattern: {}", e)))
}

/// Where example templates come from
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn document(&self, name: &str) -> Result<Option<SchemaDocument>, CliError>;
}

#[async_trait]
impl TemplateSource for HttpClient {
    async fn document(&self, name: &str) -> Result<Option<SchemaDocument>, CliError> {
        self.fetch_schema(name).await
    }
}

/// Application metadata supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ApplicationInput {
    pub display_name: String,
    pub description: Option<String>,
    pub lead_developer_email: String,
    pub app_version: String,
    pub github_url: String,
}

pub fn validate_email(email: &str) -> Result<(), CliError> {
    if pattern(&EMAIL)?.is_match(email) {
        Ok(())
    } else {
        Err(CliError::ValidationError(format!("Invalid email format: {}", email)))
    }
}

pub fn validate_semver(version: &str) -> Result<(), CliError> {
    if pattern(&SEMVER)?.is_match(version) {
        Ok(())
    } else {
        Err(CliError::ValidationError(format!(
            "Invalid semantic version '{}' (e.g. 1.2.3)",
            version
        )))
    }
}

pub fn validate_github_url(url: &str) -> Result<(), CliError> {
    let invalid = || {
        CliError::ValidationError(format!(
            "Invalid GitHub URL '{}'. Must start with https://github.com/ or https://wwwin-github.cisco.com/",
            url
        ))
    };
    let parsed = Url::parse(url).map_err(|_| invalid())?;
    let host_ok = parsed
        .host_str()
        .map(|h| GITHUB_HOSTS.contains(&h))
        .unwrap_or(false);
    let path_ok = !parsed.path().trim_matches('/').is_empty();
    if parsed.scheme() == "https" && host_ok && path_ok && parsed.port().is_none() {
        Ok(())
    } else {
        Err(invalid())
    }
}

impl ApplicationInput {
    pub fn validate(&self) -> Result<(), CliError> {
        if self.display_name.trim().is_empty() {
            return Err(CliError::ValidationError(
                "Display name must not be empty".to_string(),
            ));
        }
        validate_email(&self.lead_developer_email)?;
        validate_semver(&self.app_version)?;
        validate_github_url(&self.github_url)
    }

    /// Merge into existing metadata, keeping the registration id
    fn apply(self, metadata: &mut ApplicationMetadata) {
        metadata.display_name = Some(self.display_name);
        metadata.description = self.description;
        metadata.lead_developer_email = Some(self.lead_developer_email);
        metadata.app_version = Some(self.app_version);
        metadata.github_url = Some(self.github_url);
    }
}

/// Services offered by the manifest schema
///
/// Read from the `core_services.patternProperties` keys, either a single
/// `^(a|b|c)$` alternation or one anchored pattern per service.
pub fn offered_services(schema: &Value) -> Result<Vec<String>, CliError> {
    let Some(patterns) = schema
        .pointer("/properties/core_services/patternProperties")
        .and_then(Value::as_object)
    else {
        return Ok(Vec::new());
    };
    let keys: Vec<&String> = patterns.keys().collect();

    if let Some(first) = keys.first().filter(|k| k.starts_with("^(")) {
        let services = pattern(&SERVICE_ALTERNATION)?
            .captures(first)
            .map(|caps| caps[1].split('|').map(str::to_string).collect())
            .unwrap_or_default();
        return Ok(services);
    }
    Ok(keys
        .into_iter()
        .map(|k| k.trim_matches(|c| c == '^' || c == '$').to_string())
        .collect())
}

/// One example template of a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Path relative to the service folder
    pub relative_path: String,
    pub schema_name: String,
    pub yaml: bool,
}

/// Templates scaffolded for a service
pub fn templates_for(service: &str) -> Vec<Template> {
    match service {
        "data_fabric" => {
            let mut templates: Vec<Template> =
                ["connectors", "etl_instances", "etl_templates", "tables"]
                    .into_iter()
                    .map(|folder| {
                        let yaml = folder.starts_with("etl_");
                        let ext = if yaml { "yaml" } else { "json" };
                        let path = format!("{}/{}.example.{}", folder, folder, ext);
                        Template {
                            relative_path: path.clone(),
                            schema_name: path,
                            yaml,
                        }
                    })
                    .collect();
            let model = "data_models/sample/sample_model.example.json".to_string();
            templates.push(Template {
                relative_path: model.clone(),
                schema_name: model,
                yaml: false,
            });
            templates
        }
        "iam" | "baqs" => vec![Template {
            relative_path: format!("{}.json", service),
            schema_name: format!("{}.json", service),
            yaml: false,
        }],
        _ => Vec::new(),
    }
}

/// What `init_project` did
#[derive(Debug, Clone, Default)]
pub struct InitReport {
    pub env_files_created: Vec<PathBuf>,
    pub templates_written: Vec<PathBuf>,
    /// Templates the registry could not provide
    pub templates_missing: Vec<String>,
    pub services: Vec<String>,
    pub manifest_path: PathBuf,
}

fn render_template(document: SchemaDocument, yaml: bool) -> Result<String, CliError> {
    let value = if document.example.is_empty() {
        serde_json::to_value(&document)?
    } else {
        Value::Object(document.example)
    };
    if yaml {
        Ok(serde_yaml::to_string(&value)?)
    } else {
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

async fn create_env_files(
    project: &ProjectLayout,
    report: &mut InitReport,
) -> Result<(), CliError> {
    project.envs_dir().create().await?;
    for env in [Environment::Dev, Environment::Nprd, Environment::Prod] {
        let file = project.env_file(env);
        let contents = format!("# Example: CONNECTOR_NAME={}-connector\n", env);
        if file.write_if_missing(&contents).await? {
            report.env_files_created.push(file.path().to_path_buf());
        }
    }
    Ok(())
}

async fn scaffold_service(
    source: &dyn TemplateSource,
    service_dir: &Dir,
    service: &str,
    report: &mut InitReport,
) -> Result<(), CliError> {
    service_dir.create().await?;
    if service == "data_fabric" {
        service_dir
            .file("commands.txt")
            .write_if_missing(DATA_FABRIC_COMMANDS)
            .await?;
    }

    for template in templates_for(service) {
        let file = service_dir.file(&template.relative_path);
        if file.exists().await {
            debug!("Keeping existing {}", file.path().display());
            continue;
        }
        match source.document(&template.schema_name).await? {
            Some(document) => {
                let contents = render_template(document, template.yaml)?;
                file.write_string(&contents).await?;
                report.templates_written.push(file.path().to_path_buf());
            }
            None => {
                warn!("Failed to fetch template {}", template.schema_name);
                if let Some(parent) = file.path().parent() {
                    Dir::new(parent).create().await?;
                }
                report.templates_missing.push(template.schema_name);
            }
        }
    }
    Ok(())
}

/// Scaffold a lifecycle project
///
/// `services` defaults to every service the manifest schema offers.
pub async fn init_project(
    source: &dyn TemplateSource,
    project: &ProjectLayout,
    input: ApplicationInput,
    services: Option<Vec<String>>,
) -> Result<InitReport, CliError> {
    input.validate()?;

    let mut report = InitReport::default();
    project.lifecycle_dir().create().await?;
    create_env_files(project, &mut report).await?;

    let config_schema = source.document(CONFIG_SCHEMA).await?.ok_or_else(|| {
        CliError::NotFound(format!(
            "Schema {} is unavailable; check the environment and your credentials",
            CONFIG_SCHEMA
        ))
    })?;
    let schema_value = match &config_schema.json_schema {
        Some(schema) => schema.clone(),
        None => Value::Object(config_schema.example.clone()),
    };
    let offered = offered_services(&schema_value)?;

    let selected = match services {
        Some(services) => services,
        None => offered.clone(),
    };
    if !offered.is_empty() {
        let unknown: Vec<&str> = selected
            .iter()
            .filter(|s| !offered.contains(s))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(CliError::ValidationError(format!(
                "Unknown core services: {} (available: {})",
                unknown.join(", "),
                offered.join(", ")
            )));
        }
    }

    let manifest_file = project.manifest_file();
    let mut manifest = if manifest_file.exists().await {
        LifecycleConfig::load(&manifest_file).await?
    } else {
        LifecycleConfig::default()
    };

    let mut core_services = BTreeMap::new();
    for service in &selected {
        let folder = format!("lifecycle/{}", service);
        scaffold_service(source, &project.service_dir(&folder), service, &mut report).await?;
        core_services.insert(service.clone(), folder);
    }

    input.apply(&mut manifest.application);
    manifest.core_services.extend(core_services);
    manifest.save(&manifest_file).await?;
    info!("Wrote {}", manifest_file.path().display());

    report.services = selected;
    report.manifest_path = manifest_file.path().to_path_buf();
    Ok(report)
}
