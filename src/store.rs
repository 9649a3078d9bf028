//! Flat JSON job store.
//!
//! One file holds every job record, keyed by job id. The store offers no
//! locking and no history: a save rewrites the whole file (temp file +
//! rename, so a crash never leaves half a file behind).
//!
//! Besides CRUD, this is where the job-level rules live that the template
//! core deliberately does not know about: which page count to use when the
//! caller did not say, and whether a job has reached the stage an operation
//! needs.

use crate::error::DeckError;
use crate::fragment::count_page_assets;
use crate::model::TemplateKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Lifecycle of a job, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Uploaded,
    Converting,
    Converted,
    Generated,
    Failed,
}

/// Everything recorded about one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    /// Original PDF path or URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<usize>,
    /// Directory holding `page-N.*` fragments and assets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragments_dir: Option<PathBuf>,
    /// Directory of the last generated site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Uploaded,
            source: None,
            title: None,
            page_count: None,
            fragments_dir: None,
            output_dir: None,
            template: None,
            error: None,
        }
    }
}

/// All job records, backed by one JSON file.
#[derive(Debug)]
pub struct JobStore {
    path: PathBuf,
    jobs: BTreeMap<String, JobRecord>,
}

impl JobStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, DeckError> {
        let path = path.into();
        let jobs = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| DeckError::StoreCorrupt {
                path: path.clone(),
                detail: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(DeckError::StoreCorrupt {
                    path,
                    detail: e.to_string(),
                })
            }
        };
        debug!("Opened job store {} ({} jobs)", path.display(), jobs.len());
        Ok(Self { path, jobs })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, id: &str) -> Option<&JobRecord> {
        self.jobs.get(id)
    }

    /// Like [`JobStore::get`], but a missing job is an error.
    pub fn require(&self, id: &str) -> Result<&JobRecord, DeckError> {
        self.get(id).ok_or_else(|| DeckError::JobNotFound { id: id.to_string() })
    }

    /// Insert or replace the record with the same id.
    pub fn upsert(&mut self, record: JobRecord) {
        self.jobs.insert(record.id.clone(), record);
    }

    pub fn remove(&mut self, id: &str) -> Option<JobRecord> {
        self.jobs.remove(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Mark job `id` as failed with `error` and persist the store.
    ///
    /// An unknown id gets a fresh record so the failure is not lost.
    pub async fn mark_failed(&mut self, id: &str, error: &str) -> Result<(), DeckError> {
        let mut record = self
            .jobs
            .remove(id)
            .unwrap_or_else(|| JobRecord::new(id));
        record.status = JobStatus::Failed;
        record.error = Some(error.to_string());
        self.upsert(record);
        warn!("Job {} failed: {}", id, error);
        self.save().await
    }

    /// Rewrite the store file atomically.
    pub async fn save(&self) -> Result<(), DeckError> {
        let json = serde_json::to_vec_pretty(&self.jobs)
            .map_err(|e| DeckError::Internal(format!("serialise job store: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DeckError::OutputWriteFailed {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &json)
            .await
            .map_err(|e| DeckError::OutputWriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| DeckError::OutputWriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        info!("Saved {} jobs to {}", self.jobs.len(), self.path.display());
        Ok(())
    }
}

/// Page count for a generation request.
///
/// Precedence: the explicit request value, then the value recorded on the
/// job, then the number of page assets in `assets_dir`, then 1. Zero never
/// counts as "known".
pub async fn resolve_page_count(
    explicit: Option<usize>,
    record: Option<&JobRecord>,
    assets_dir: Option<&Path>,
) -> Result<usize, DeckError> {
    if let Some(n) = explicit.filter(|&n| n > 0) {
        return Ok(n);
    }
    if let Some(n) = record.and_then(|r| r.page_count).filter(|&n| n > 0) {
        return Ok(n);
    }
    if let Some(dir) = assets_dir {
        let n = count_page_assets(dir).await?;
        if n > 0 {
            return Ok(n);
        }
    }
    Ok(1)
}

/// Reject operations that need converted page fragments.
pub fn ensure_converted(record: &JobRecord) -> Result<&Path, DeckError> {
    let not_ready = |reason: &str| DeckError::JobNotReady {
        id: record.id.clone(),
        reason: reason.to_string(),
    };
    match record.status {
        JobStatus::Converted | JobStatus::Generated => record
            .fragments_dir
            .as_deref()
            .ok_or_else(|| not_ready("conversion recorded no fragment directory")),
        JobStatus::Failed => Err(not_ready(
            record.error.as_deref().unwrap_or("conversion failed"),
        )),
        JobStatus::Uploaded | JobStatus::Converting => {
            Err(not_ready("PDF has not been converted yet"))
        }
    }
}

/// Reject download and deploy requests for jobs without a generated site.
pub fn ensure_generated(record: &JobRecord) -> Result<&Path, DeckError> {
    let not_ready = |reason: String| DeckError::JobNotReady {
        id: record.id.clone(),
        reason,
    };
    if record.status != JobStatus::Generated {
        return Err(not_ready("site has not been generated yet".to_string()));
    }
    let dir = record
        .output_dir
        .as_deref()
        .ok_or_else(|| not_ready("generation recorded no output directory".to_string()))?;
    if !dir.join(crate::output::INDEX_PATH).is_file() {
        return Err(not_ready(format!(
            "generated site is missing from '{}'",
            dir.display()
        )));
    }
    Ok(dir)
}
