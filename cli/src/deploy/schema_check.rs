//! Local validation of service files against registry schemas

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use jsonschema::Validator;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::deploy::upload::is_example;
use crate::errors::CliError;
use crate::filesys::dir::Dir;
use crate::filesys::file::File;
use crate::http::client::HttpClient;
use crate::inject;
use crate::storage::layout::ProjectLayout;
use crate::storage::manifest::LifecycleConfig;

const DATA_FABRIC: &str = "data_fabric";

/// Folder-per-kind layout of the data fabric service
const DATA_FABRIC_FOLDERS: [(&str, &str); 4] = [
    ("connectors", "data_fabric/connector"),
    ("etl_instances", "data_fabric/etl_instance"),
    ("etl_templates", "data_fabric/etl_template"),
    ("tables", "data_fabric/table"),
];

const DATA_MODEL_FOLDERS: [(&str, &str); 3] = [
    ("entity", "data_fabric/data_model_entity"),
    ("relationship", "data_fabric/data_model_relationship"),
    ("type", "data_fabric/data_model_type"),
];

/// Where JSON schemas come from
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// The `jsonSchema` document registered under `name`
    async fn json_schema(&self, name: &str) -> Result<Option<Value>, CliError>;
}

#[async_trait]
impl SchemaSource for HttpClient {
    async fn json_schema(&self, name: &str) -> Result<Option<Value>, CliError> {
        Ok(self
            .fetch_schema(name)
            .await?
            .and_then(|doc| doc.json_schema)
            .filter(|schema| !schema.is_null()))
    }
}

/// Files validated against one schema
#[derive(Debug, Clone)]
pub struct ValidationGroup {
    /// Folder shown in the report, relative to the service folder
    pub label: String,
    pub schema_name: String,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GroupReport {
    pub label: String,
    pub schema_name: String,
    /// Set when the schema could not be fetched or compiled
    pub schema_error: Option<String>,
    pub files: Vec<FileReport>,
}

#[derive(Debug, Clone)]
pub struct ServiceReport {
    pub service: String,
    pub groups: Vec<GroupReport>,
}

/// Result of a local validation run
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub services: Vec<ServiceReport>,
    /// Services whose folder does not exist
    pub missing_folders: Vec<String>,
}

impl ValidationReport {
    pub fn files_validated(&self) -> usize {
        self.groups().map(|g| g.files.len()).sum()
    }

    /// Validation errors, counting an unavailable schema as one
    pub fn error_count(&self) -> usize {
        self.groups()
            .map(|g| {
                usize::from(g.schema_error.is_some())
                    + g.files.iter().map(|f| f.errors.len()).sum::<usize>()
            })
            .sum()
    }

    fn groups(&self) -> impl Iterator<Item = &GroupReport> {
        self.services.iter().flat_map(|s| s.groups.iter())
    }
}

fn is_candidate(path: &Path) -> bool {
    inject::is_structured(path) && !is_example(path)
}

/// Structured, non-example files directly inside a folder
async fn direct_files(dir: &Dir) -> Result<Vec<PathBuf>, CliError> {
    Ok(dir
        .list_files()
        .await?
        .into_iter()
        .filter(|p| is_candidate(p))
        .collect())
}

/// Group the files of a service by the schema they are checked against
pub async fn plan_groups(service: &str, bundle: &Dir) -> Result<Vec<ValidationGroup>, CliError> {
    if service != DATA_FABRIC {
        let files = bundle
            .walk_files()
            .await?
            .into_iter()
            .filter(|p| is_candidate(p))
            .collect();
        return Ok(vec![ValidationGroup {
            label: String::new(),
            schema_name: service.to_string(),
            files,
        }]);
    }

    let mut groups = Vec::new();
    for (folder, schema_name) in DATA_FABRIC_FOLDERS {
        let dir = bundle.subdir(folder);
        if !dir.exists().await {
            continue;
        }
        groups.push(ValidationGroup {
            label: folder.to_string(),
            schema_name: schema_name.to_string(),
            files: direct_files(&dir).await?,
        });
    }

    let models = bundle.subdir("data_models");
    for model in models.list_dirs().await.unwrap_or_default() {
        let model_name = File::new(&model).name();
        let model_dir = Dir::new(&model);
        for (folder, schema_name) in DATA_MODEL_FOLDERS {
            let dir = model_dir.subdir(folder);
            if !dir.exists().await {
                continue;
            }
            groups.push(ValidationGroup {
                label: format!("data_models/{}/{}", model_name, folder),
                schema_name: schema_name.to_string(),
                files: direct_files(&dir).await?,
            });
        }
    }

    Ok(groups)
}

/// Parse a JSON or YAML file into a JSON value
async fn load_instance(path: &Path) -> Result<Value, CliError> {
    let file = File::new(path);
    let contents = file.read_string().await?;
    if file.extension().as_deref() == Some("json") {
        Ok(serde_json::from_str(&contents)?)
    } else {
        Ok(serde_yaml::from_str(&contents)?)
    }
}

/// Validate one file, returning its error messages
pub async fn validate_file(path: &Path, validator: &Validator) -> Vec<String> {
    match load_instance(path).await {
        Ok(instance) => validator
            .iter_errors(&instance)
            .map(|e| e.to_string())
            .collect(),
        Err(e) => {
            debug!("Failed to parse {}: {}", path.display(), e);
            vec!["Failed to parse file".to_string()]
        }
    }
}

/// Compiles each schema once per run
struct ValidatorCache<'a> {
    source: &'a dyn SchemaSource,
    compiled: HashMap<String, Result<Validator, String>>,
}

impl<'a> ValidatorCache<'a> {
    async fn get(&mut self, name: &str) -> &Result<Validator, String> {
        if !self.compiled.contains_key(name) {
            let compiled = match self.source.json_schema(name).await {
                Ok(Some(schema)) => Validator::new(&schema)
                    .map_err(|e| format!("Schema error for {}: {}", name, e)),
                Ok(None) => Err(format!("Could not fetch schema for {}", name)),
                Err(e) => Err(format!("Could not fetch schema for {}: {}", name, e)),
            };
            self.compiled.insert(name.to_string(), compiled);
        }
        &self.compiled[name]
    }
}

/// Validate the selected services of a project
pub async fn validate_services(
    source: &dyn SchemaSource,
    project: &ProjectLayout,
    manifest: &LifecycleConfig,
    services: &[String],
) -> Result<ValidationReport, CliError> {
    let mut report = ValidationReport::default();
    let mut cache = ValidatorCache {
        source,
        compiled: HashMap::new(),
    };

    for service in services {
        let folder = manifest
            .core_services
            .get(service)
            .cloned()
            .unwrap_or_else(|| format!("lifecycle/{}", service));
        let bundle = project.service_dir(&folder);
        if !bundle.exists().await {
            warn!("Service folder not found: {}", bundle.path().display());
            report.missing_folders.push(service.clone());
            continue;
        }

        info!("Validating {}", service);
        let mut groups = Vec::new();
        for group in plan_groups(service, &bundle).await? {
            let mut group_report = GroupReport {
                label: group.label,
                schema_name: group.schema_name,
                schema_error: None,
                files: Vec::new(),
            };
            match cache.get(&group_report.schema_name).await {
                Err(message) => {
                    warn!("{}", message);
                    group_report.schema_error = Some(message.clone());
                }
                Ok(validator) => {
                    for path in group.files {
                        let errors = validate_file(&path, validator).await;
                        let relative = path
                            .strip_prefix(bundle.path())
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|_| path.clone());
                        group_report.files.push(FileReport {
                            path: relative,
                            errors,
                        });
                    }
                }
            }
            groups.push(group_report);
        }

        report.services.push(ServiceReport {
            service: service.clone(),
            groups,
        });
    }

    Ok(report)
}
