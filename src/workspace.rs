//! Upload and output directory maintenance.
//!
//! The pipeline itself never touches the upload or processed directories
//! beyond its own job; everything around it (staging incoming archives,
//! shipping finished outputs, wiping the workspace) lives here.

use crate::models::{PackageJob, ProcessorConfig, TargetVersion, sanitize_filename};
use crate::outputs::OutputLocks;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::{Cursor, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// File name suggested for a collected batch
pub const BATCH_ARCHIVE_NAME: &str = "scorm_batch.zip";

/// An archive copied into the upload directory, ready to become a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedUpload {
    /// Unique path inside the upload directory
    pub path: Utf8PathBuf,
    /// Sanitized name the caller supplied; drives the output name
    pub original_name: String,
}

impl StagedUpload {
    pub fn into_job(self, target: TargetVersion) -> PackageJob {
        PackageJob::new(&self.path, target).with_original_name(&self.original_name)
    }
}

/// Result of [`Workspace::collect_batch`]
#[derive(Debug, Clone, Default)]
pub struct CollectedBatch {
    /// Deflated archive holding every collected output
    pub archive: Vec<u8>,
    pub collected: Vec<String>,
    /// Requested names with no matching output
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub removed: usize,
    pub failures: Vec<String>,
}

/// Upload and processed directories shared by all jobs of a process
#[derive(Debug)]
pub struct Workspace {
    upload_dir: Utf8PathBuf,
    processed_dir: Utf8PathBuf,
    /// Held from read to delete; shared with the orchestrator so an output
    /// is never moved into place mid-collection
    output_locks: Arc<OutputLocks>,
}

impl Workspace {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self::with_output_locks(config, Arc::new(OutputLocks::new()))
    }

    pub fn with_output_locks(config: &ProcessorConfig, output_locks: Arc<OutputLocks>) -> Self {
        Self {
            upload_dir: config.upload_dir.clone(),
            processed_dir: config.processed_dir.clone(),
            output_locks,
        }
    }

    pub fn output_locks(&self) -> &Arc<OutputLocks> {
        &self.output_locks
    }

    pub fn upload_dir(&self) -> &Utf8Path {
        &self.upload_dir
    }

    pub fn processed_dir(&self) -> &Utf8Path {
        &self.processed_dir
    }

    /// Copy an archive into the upload directory under a unique name.
    ///
    /// The original file is left untouched; the staged copy is consumed by
    /// the job that processes it.
    pub fn stage_upload(&self, source: &Utf8Path) -> Result<StagedUpload> {
        let name = source.file_name().unwrap_or("package.zip");
        let staged = self.staged_path(name)?;
        fs::copy(source, &staged.path)
            .with_context(|| format!("Failed to stage {} as {}", source, staged.path))?;
        tracing::info!("Staged upload {} as {}", source, staged.path);
        Ok(staged)
    }

    /// Store uploaded bytes in the upload directory under a unique name
    pub fn stage_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<StagedUpload> {
        let staged = self.staged_path(file_name)?;
        fs::write(&staged.path, bytes)
            .with_context(|| format!("Failed to write upload {}", staged.path))?;
        tracing::info!("Stored upload {} ({} bytes)", staged.path, bytes.len());
        Ok(staged)
    }

    fn staged_path(&self, file_name: &str) -> Result<StagedUpload> {
        fs::create_dir_all(&self.upload_dir)
            .with_context(|| format!("Failed to create upload directory: {}", self.upload_dir))?;
        let original_name = match sanitize_filename(file_name) {
            name if name.is_empty() => "package.zip".to_string(),
            name => name,
        };
        let path = self
            .upload_dir
            .join(format!("{}_{}", Uuid::new_v4().simple(), original_name));
        Ok(StagedUpload {
            path,
            original_name,
        })
    }

    /// Pack the named outputs into one archive and delete them.
    ///
    /// Names are sanitized first; names with no output are reported as
    /// missing. Every item is locked from the moment it is read until it is
    /// deleted, and nothing is deleted before the archive is complete, so
    /// two concurrent collectors never both ship an item and a failed
    /// collection loses nothing.
    pub fn collect_batch<S: AsRef<str>>(&self, names: &[S]) -> Result<CollectedBatch> {
        let mut safe_names: Vec<String> = names
            .iter()
            .map(|n| sanitize_filename(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        // Sorted acquisition order keeps concurrent collectors deadlock free
        safe_names.sort();
        safe_names.dedup();

        let locks: Vec<Arc<Mutex<()>>> = safe_names
            .iter()
            .map(|n| self.output_locks.lock_for(n))
            .collect();
        let batch = {
            let _guards: Vec<MutexGuard<'_, ()>> = locks
                .iter()
                .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner))
                .collect();
            self.collect_locked(&safe_names)
        };
        drop(locks);
        self.output_locks.prune();
        batch
    }

    fn collect_locked(&self, names: &[String]) -> Result<CollectedBatch> {
        let mut batch = CollectedBatch::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for name in names {
            let path = self.processed_dir.join(name);
            if !path.is_file() {
                batch.missing.push(name.clone());
                continue;
            }
            let contents = fs::read(&path).with_context(|| format!("Failed to read {}", path))?;
            writer
                .start_file(name.as_str(), options)
                .with_context(|| format!("Failed to add {} to batch", name))?;
            writer
                .write_all(&contents)
                .with_context(|| format!("Failed to add {} to batch", name))?;
            batch.collected.push(name.clone());
        }

        batch.archive = writer
            .finish()
            .context("Failed to finish batch archive")?
            .into_inner();

        for name in &batch.collected {
            let path = self.processed_dir.join(name);
            fs::remove_file(&path).with_context(|| format!("Failed to delete {}", path))?;
        }

        tracing::info!(
            collected = batch.collected.len(),
            missing = batch.missing.len(),
            "Collected batch"
        );
        Ok(batch)
    }

    /// Remove every entry of the upload and processed directories.
    ///
    /// Individual failures are logged and counted, never fatal.
    pub fn purge(&self) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        for dir in [&self.upload_dir, &self.processed_dir] {
            tracing::info!("Purging directory: {}", dir);
            if !dir.exists() {
                continue;
            }
            let entries =
                fs::read_dir(dir).with_context(|| format!("Failed to list directory: {}", dir))?;
            for entry in entries {
                let entry = entry.with_context(|| format!("Failed to list directory: {}", dir))?;
                let path = entry.path();
                let removed = match entry.file_type() {
                    Ok(kind) if kind.is_dir() => fs::remove_dir_all(&path),
                    Ok(_) => fs::remove_file(&path),
                    Err(e) => Err(e),
                };
                match removed {
                    Ok(()) => report.removed += 1,
                    Err(e) => {
                        tracing::error!("Failed to delete {}. Reason: {}", path.display(), e);
                        report.failures.push(path.display().to_string());
                    }
                }
            }
        }
        tracing::info!("Workspace purged: {} entries removed", report.removed);
        Ok(report)
    }
}
