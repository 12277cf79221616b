//! Service bundle upload orchestration
//!
//! Every non-example file of the selected services is uploaded to object
//! storage through a presigned URL, followed by the lifecycle manifest.
//! Uploads run concurrently on a bounded pool; a failing file never cancels
//! its siblings and failures are reported together once all tasks finished.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use lifecycle_api::models::ServicePayload;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::CliError;
use crate::filesys::file::File;
use crate::inject::{self, EnvVars};
use crate::storage::layout::{ProjectLayout, MANIFEST_FILE};
use crate::storage::manifest::LifecycleConfig;
use crate::utils::join_storage_key;

/// Files whose name contains this marker are never uploaded or validated
pub const EXAMPLE_MARKER: &str = ".example";

/// Root of every storage key written by the CLI
pub const STORAGE_NAMESPACE: &str = "lifecycle";

/// Service name shown for the manifest upload
const MANIFEST_SERVICE: &str = "lifecycle";

/// Destination of uploaded bytes
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// Presigned upload URL for a storage key
    async fn presign(&self, key: &str) -> Result<String, CliError>;

    /// Upload a body to a presigned URL
    async fn put_object(&self, url: &str, body: Vec<u8>) -> Result<(), CliError>;
}

/// Services to include in a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceSelection {
    All,
    Only(Vec<String>),
}

/// One file to upload
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub service: String,
    pub file_path: PathBuf,
    pub storage_key: String,
    pub bundle_root: PathBuf,
}

impl UploadTask {
    fn file_name(&self) -> String {
        File::new(&self.file_path).name()
    }
}

/// Progress of one finished upload task
#[derive(Debug, Clone)]
pub struct UploadProgress {
    pub completed: usize,
    pub total: usize,
    pub service: String,
    pub file: String,
    pub error: Option<String>,
}

/// Result of a successful upload pass
#[derive(Debug, Clone, Default)]
pub struct UploadSummary {
    /// Service name to key prefix, for the deployment payload
    pub services: BTreeMap<String, ServicePayload>,
    /// Services included in the run, in selection order
    pub included: Vec<String>,
    /// Selected services dropped because they had no uploadable files
    pub skipped: Vec<String>,
    /// Tasks uploaded, including the manifest
    pub files_uploaded: usize,
}

/// Outcome of [`upload_services`]
#[derive(Debug, Clone)]
pub enum UploadOutcome {
    /// The selection was empty; nothing was uploaded
    NothingSelected,
    Uploaded(UploadSummary),
}

/// Parameters of one upload pass
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub run_id: Uuid,
    pub app_id: String,
    pub selection: ServiceSelection,
    pub env_vars: Arc<EnvVars>,
    pub concurrency: usize,
}

/// Upload tasks and payload of a run, before anything is sent
#[derive(Debug, Clone)]
pub struct UploadPlan {
    pub tasks: Vec<UploadTask>,
    pub summary: UploadSummary,
}

/// Key prefix of a service bundle
pub fn service_key_prefix(app_id: &str, run_id: &Uuid, service: &str) -> String {
    join_storage_key([STORAGE_NAMESPACE, app_id, run_id.to_string().as_str(), service])
}

/// Whether a file is an example template
pub fn is_example(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().contains(EXAMPLE_MARKER))
        .unwrap_or(false)
}

/// Resolve the selection against the manifest
///
/// Returns an empty list for an empty selection; unknown names are an error.
pub fn resolve_selection(
    manifest: &LifecycleConfig,
    selection: &ServiceSelection,
) -> Result<Vec<String>, CliError> {
    match selection {
        ServiceSelection::All => Ok(manifest.service_names()),
        ServiceSelection::Only(names) => {
            let unknown: Vec<&str> = names
                .iter()
                .filter(|n| !manifest.core_services.contains_key(*n))
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                return Err(CliError::ConfigError(format!(
                    "Unknown services: {} (configured: {})",
                    unknown.join(", "),
                    manifest.service_names().join(", ")
                )));
            }
            let mut resolved: Vec<String> = Vec::new();
            for name in names {
                if !resolved.contains(name) {
                    resolved.push(name.clone());
                }
            }
            Ok(resolved)
        }
    }
}

/// Build the upload tasks of a run
///
/// Returns `None` when the selection is empty.
pub async fn plan_uploads(
    project: &ProjectLayout,
    manifest: &LifecycleConfig,
    run_id: &Uuid,
    app_id: &str,
    selection: &ServiceSelection,
) -> Result<Option<UploadPlan>, CliError> {
    let services = resolve_selection(manifest, selection)?;
    if services.is_empty() {
        return Ok(None);
    }
    info!("Selected services: {}", services.join(", "));

    let mut tasks = Vec::new();
    let mut summary = UploadSummary::default();

    for service in services {
        let folder = &manifest.core_services[&service];
        let bundle = project.service_dir(folder);
        let key_prefix = service_key_prefix(app_id, run_id, &service);

        let files: Vec<PathBuf> = bundle
            .walk_files()
            .await?
            .into_iter()
            .filter(|p| !is_example(p))
            .collect();

        if files.is_empty() {
            warn!(
                "No files detected for '{}' (only .example files found). Skipping.",
                service
            );
            summary.skipped.push(service);
            continue;
        }

        for file_path in files {
            let relative = file_path
                .strip_prefix(bundle.path())
                .unwrap_or(&file_path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>();
            let mut parts = vec![key_prefix.clone()];
            parts.extend(relative);

            tasks.push(UploadTask {
                service: service.clone(),
                storage_key: join_storage_key(&parts),
                file_path,
                bundle_root: bundle.path().to_path_buf(),
            });
        }

        summary.services.insert(
            service.clone(),
            ServicePayload {
                configuration_file_path: key_prefix,
            },
        );
        summary.included.push(service);
    }

    if summary.included.is_empty() {
        error!("No services with files to upload");
        return Err(CliError::NoUploadableFiles);
    }

    let manifest_file = project.manifest_file();
    tasks.push(UploadTask {
        service: MANIFEST_SERVICE.to_string(),
        storage_key: join_storage_key([
            STORAGE_NAMESPACE,
            app_id,
            run_id.to_string().as_str(),
            MANIFEST_FILE,
        ]),
        file_path: manifest_file.path().to_path_buf(),
        bundle_root: project.lifecycle_dir().path().to_path_buf(),
    });

    Ok(Some(UploadPlan { tasks, summary }))
}

/// Read a task's file and inject placeholders into structured documents
async fn prepare_body(task: &UploadTask, env_vars: &EnvVars) -> Result<Vec<u8>, CliError> {
    let file = File::new(&task.file_path);
    if inject::is_structured(&task.file_path) {
        let contents = file.read_string().await?;
        inject::inject_document(&task.file_path, &contents, env_vars)
    } else {
        file.read_bytes().await
    }
}

/// Upload one task, returning a failure message instead of an error
async fn run_task(
    uploader: &dyn ObjectUploader,
    task: &UploadTask,
    env_vars: &EnvVars,
) -> Result<(), String> {
    let path = task.file_path.display();
    let url = uploader
        .presign(&task.storage_key)
        .await
        .map_err(|e| format!("Failed to generate presigned URL for {}: {}", path, e))?;
    let body = prepare_body(task, env_vars)
        .await
        .map_err(|e| format!("Error preparing {}: {}", path, e))?;
    uploader
        .put_object(&url, body)
        .await
        .map_err(|e| format!("Upload failed for {}: {}", path, e))?;
    debug!("Uploaded {} to {}", path, task.storage_key);
    Ok(())
}

/// Run all tasks on a bounded pool
///
/// `on_progress` is called in completion order. Returns every failure
/// message; an empty list means all uploads succeeded.
pub async fn execute_uploads<F>(
    uploader: Arc<dyn ObjectUploader>,
    tasks: Vec<UploadTask>,
    env_vars: Arc<EnvVars>,
    concurrency: usize,
    mut on_progress: F,
) -> Vec<String>
where
    F: FnMut(&UploadProgress),
{
    let total = tasks.len();
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut pending = FuturesUnordered::new();

    for task in tasks {
        let service = task.service.clone();
        let file = task.file_name();
        let uploader = Arc::clone(&uploader);
        let env_vars = Arc::clone(&env_vars);
        let sem = Arc::clone(&semaphore);

        let handle = tokio::spawn(async move {
            let _permit = sem
                .acquire_owned()
                .await
                .map_err(|e| format!("Upload pool closed: {}", e))?;
            run_task(uploader.as_ref(), &task, &env_vars).await
        });

        pending.push(async move {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(format!("Upload of {}/{} aborted: {}", service, file, e)),
            };
            (service, file, result)
        });
    }

    let mut completed = 0;
    let mut failures = Vec::new();
    while let Some((service, file, result)) = pending.next().await {
        completed += 1;
        let error = result.err();
        match &error {
            None => info!("[{}/{}] uploaded {}/{}", completed, total, service, file),
            Some(message) => {
                error!("[{}/{}] {}", completed, total, message);
                failures.push(message.clone());
            }
        }
        on_progress(&UploadProgress {
            completed,
            total,
            service,
            file,
            error,
        });
    }

    failures
}

/// Upload the selected service bundles and the manifest of a run
pub async fn upload_services<F>(
    uploader: Arc<dyn ObjectUploader>,
    project: &ProjectLayout,
    manifest: &LifecycleConfig,
    request: UploadRequest,
    on_progress: F,
) -> Result<UploadOutcome, CliError>
where
    F: FnMut(&UploadProgress),
{
    let plan = plan_uploads(
        project,
        manifest,
        &request.run_id,
        &request.app_id,
        &request.selection,
    )
    .await?;
    let Some(UploadPlan { tasks, mut summary }) = plan else {
        info!("No services selected");
        return Ok(UploadOutcome::NothingSelected);
    };

    let total = tasks.len();
    info!(
        "Uploading {} files across {} services",
        total,
        summary.included.len()
    );

    let failures = execute_uploads(
        uploader,
        tasks,
        request.env_vars,
        request.concurrency,
        on_progress,
    )
    .await;

    if !failures.is_empty() {
        return Err(CliError::UploadFailed(failures));
    }

    summary.files_uploaded = total;
    Ok(UploadOutcome::Uploaded(summary))
}
