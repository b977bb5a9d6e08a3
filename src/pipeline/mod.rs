//! Job orchestration.
//!
//! The [`Orchestrator`] runs one [`PackageJob`] through every stage in order,
//! stops at the first fatal error and always finishes with exactly one
//! terminal progress event. It owns the job's working directory through a
//! [`WorkingTree`] guard and deletes the uploaded source archive when the job
//! ends, whatever the outcome.
//!
//! # Threading
//!
//! A job is synchronous end to end. [`Orchestrator::spawn`] moves it onto a
//! tokio blocking thread and hands back the receiving end of a bounded
//! progress channel, so each job gets its own execution unit and the consumer
//! pulls events at its own pace.
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(Arc::new(config));
//! let (mut events, handle) = orchestrator.spawn(job);
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.to_line());
//! }
//! let report = handle.await?;
//! ```

mod state;
mod working_tree;

pub use state::{PipelineState, StagePlan};
pub use working_tree::WorkingTree;

use crate::error::{PipelineError, ResourceContext};
use crate::metrics::Metrics;
use crate::models::{PackageJob, ProcessorConfig, TargetVersion};
use crate::outputs::{OutputClaim, OutputLocks};
use crate::progress::{ChannelSink, EventSink, ProgressEvent, ProgressReporter};
use crate::services::{
    ScriptPatch, SettingsEdit, TreeCleaner, apply_license, detect_engine_stage, edit_settings,
    extract_archive, patch_scripts, prepare_logo, repack_tree, switch_manifest, validate_manifests,
    validate_package,
};
use crate::tree::PackageTree;
use camino::Utf8PathBuf;
use std::any::Any;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed { message: String },
}

/// Summary of a finished job, returned alongside the streamed events
#[derive(Debug, Clone)]
pub struct JobReport {
    pub job_id: Uuid,
    pub original_name: String,
    pub outcome: JobOutcome,
    /// Output archive, set only on success
    pub output: Option<Utf8PathBuf>,
    pub warnings: Vec<String>,
    /// Non-fatal errors; the fatal one of a failed job is in `outcome`
    pub errors: Vec<String>,
    /// States passed through, ending with `Done` or `Failed`
    pub states: Vec<PipelineState>,
    pub duration: Duration,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.outcome == JobOutcome::Succeeded
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            JobOutcome::Failed { message } => Some(message),
            JobOutcome::Succeeded => None,
        }
    }

    pub fn final_state(&self) -> Option<PipelineState> {
        self.states.last().copied()
    }

    /// Succeeded with nothing to report
    pub fn is_clean(&self) -> bool {
        self.succeeded() && self.warnings.is_empty() && self.errors.is_empty()
    }
}

/// Runs jobs against a shared configuration
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<ProcessorConfig>,
    metrics: Arc<Metrics>,
    output_locks: Arc<OutputLocks>,
}

impl Orchestrator {
    pub fn new(config: Arc<ProcessorConfig>) -> Self {
        Self::with_metrics(config, Arc::new(Metrics::new()))
    }

    pub fn with_metrics(config: Arc<ProcessorConfig>, metrics: Arc<Metrics>) -> Self {
        Self {
            config,
            metrics,
            output_locks: Arc::new(OutputLocks::new()),
        }
    }

    /// Share output names and locks with a [`Workspace`](crate::Workspace)
    /// collecting from the same processed directory
    pub fn with_output_locks(mut self, output_locks: Arc<OutputLocks>) -> Self {
        self.output_locks = output_locks;
        self
    }

    pub fn output_locks(&self) -> &Arc<OutputLocks> {
        &self.output_locks
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Run `job` on a blocking thread, streaming its events through a
    /// bounded channel. Must be called from within a tokio runtime.
    ///
    /// The channel closes once the job has ended and cleaned up. Dropping
    /// the receiver does not stop the job.
    pub fn spawn(&self, job: PackageJob) -> (mpsc::Receiver<ProgressEvent>, JoinHandle<JobReport>) {
        let (tx, rx) = mpsc::channel(self.config.event_capacity());
        let orchestrator = self.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let mut sink = ChannelSink::new(tx, Arc::clone(&orchestrator.metrics));
            orchestrator.run(job, &mut sink)
        });
        (rx, handle)
    }

    /// Run `job` to completion on the current thread.
    ///
    /// The working directory `<processed_dir>/_work_<job id>` is created
    /// exclusively for this job and removed afterwards, as is the source
    /// archive.
    pub fn run(&self, job: PackageJob, sink: &mut dyn EventSink) -> JobReport {
        let span = tracing::info_span!("job", id = %job.id, archive = %job.original_name);
        let _entered = span.enter();

        let working_dir = job.working_dir(&self.config.processed_dir);
        let report = match WorkingTree::create(working_dir.clone()) {
            Ok(mut working) => self.run_with_tree(&job, &mut *working, sink),
            Err(e) => {
                let error = PipelineError::resource(
                    format!("Could not create working directory {}", working_dir),
                    e,
                );
                let mut progress = ProgressReporter::new(sink);
                let mut states = vec![PipelineState::Extracting];
                self.finish(&job, Err(error.to_string()), &mut progress, &mut states, Instant::now())
            }
        };

        remove_source_archive(&job);
        report
    }

    /// Run every stage of `job` against an already prepared `tree`.
    ///
    /// The output is named [`PackageJob::output_name`] unless another job is
    /// still producing that name, in which case the job-tagged
    /// [`PackageJob::owned_output_name`] is used. Emits the terminal event
    /// but leaves cleanup of `tree` and of the source archive to the caller;
    /// [`Orchestrator::run`] does both.
    pub fn run_with_tree(
        &self,
        job: &PackageJob,
        tree: &mut dyn PackageTree,
        sink: &mut dyn EventSink,
    ) -> JobReport {
        let started = Instant::now();
        let mut progress = ProgressReporter::new(sink);
        let mut states = Vec::new();
        let claim = self
            .output_locks
            .claim(job.output_name(), job.owned_output_name());

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_stages(job, &claim, tree, &mut progress, &mut states)
        }));
        let result = match result {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                tracing::error!(
                    kind = e.kind(),
                    state = %states.last().copied().unwrap_or(PipelineState::Extracting),
                    "Stage failed: {}",
                    e
                );
                Err(e.to_string())
            }
            Err(payload) => {
                let message = format!("Internal error: {}", panic_message(&*payload));
                tracing::error!("Job panicked: {}", message);
                Err(message)
            }
        };

        self.finish(job, result, &mut progress, &mut states, started)
    }

    fn run_stages(
        &self,
        job: &PackageJob,
        claim: &OutputClaim,
        tree: &mut dyn PackageTree,
        progress: &mut ProgressReporter<'_>,
        states: &mut Vec<PipelineState>,
    ) -> Result<Utf8PathBuf, PipelineError> {
        let mut enter = |state: PipelineState| {
            tracing::debug!(state = %state, "Entering state");
            states.push(state);
        };

        enter(PipelineState::Extracting);
        extract_archive(&job.source_archive, &job.original_name, tree, progress)?;

        enter(PipelineState::Validating);
        validate_package(tree, progress)?;

        enter(PipelineState::DetectingEngine);
        let variant = detect_engine_stage(tree, progress);

        enter(PipelineState::Cleaning);
        TreeCleaner::new().clean(tree, progress);

        let mut logo_path = None;
        if let Some(logo) = &job.logo {
            enter(PipelineState::Branding);
            logo_path = Some(prepare_logo(tree, logo, variant, progress)?.config_path);
        }

        if let Some(key) = &job.license_key {
            enter(PipelineState::Licensing);
            apply_license(tree, key, variant, progress)?;
        }

        enter(PipelineState::ValidatingManifests);
        validate_manifests(tree, progress)?;

        enter(PipelineState::SwitchingManifest);
        switch_manifest(tree, job.target_version, progress)?;

        enter(PipelineState::EditingSettings);
        let edit = SettingsEdit {
            target: job.target_version,
            variant,
            logo_path: logo_path.as_deref(),
            license_key: job.license_key.as_deref(),
        };
        edit_settings(tree, &edit, progress)?;

        if job.target_version == TargetVersion::Scorm2004 {
            enter(PipelineState::PatchingScripts);
            let patch = ScriptPatch {
                customer_variant: job.customer_variant,
                reference_script: &self.config.customer_script_path,
                extended_fixes: self.config.extended_script_fixes,
            };
            patch_scripts(tree, &patch, progress)?;
        }

        enter(PipelineState::Repackaging);
        fs::create_dir_all(&self.config.processed_dir).resource_context(|| {
            format!("Could not create {}", self.config.processed_dir)
        })?;
        let output = self.config.processed_dir.join(claim.name());
        repack_tree(tree, &output, &claim.lock(), progress)?;

        Ok(output)
    }

    fn finish(
        &self,
        job: &PackageJob,
        result: Result<Utf8PathBuf, String>,
        progress: &mut ProgressReporter<'_>,
        states: &mut Vec<PipelineState>,
        started: Instant,
    ) -> JobReport {
        let duration = started.elapsed();
        // Taken before a fatal error is reported through the same channel
        let errors = progress.errors().to_vec();
        let (outcome, output) = match result {
            Ok(output) => {
                states.push(PipelineState::Done);
                let file_name = output
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| job.output_name());
                progress.terminal(ProgressEvent::done(&file_name));
                self.metrics.record_job_succeeded(duration);
                (JobOutcome::Succeeded, Some(output))
            }
            Err(message) => {
                states.push(PipelineState::Failed);
                progress.error(message.clone());
                progress.terminal(ProgressEvent::failed(&message));
                self.metrics.record_job_failed(duration);
                (JobOutcome::Failed { message }, None)
            }
        };

        let warnings = progress.warnings().to_vec();
        self.metrics.record_warnings(warnings.len());
        self.metrics.record_errors(errors.len());
        tracing::info!(
            succeeded = outcome == JobOutcome::Succeeded,
            warnings = warnings.len(),
            errors = errors.len(),
            elapsed_ms = duration.as_millis() as u64,
            "Job finished"
        );

        JobReport {
            job_id: job.id,
            original_name: job.original_name.clone(),
            outcome,
            output,
            warnings,
            errors,
            states: std::mem::take(states),
            duration,
        }
    }
}

fn remove_source_archive(job: &PackageJob) {
    match fs::remove_file(&job.source_archive) {
        Ok(()) => tracing::debug!("Removed source archive {}", job.source_archive),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Could not remove source archive {}: {}", job.source_archive, e),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unexpected panic".to_string()
    }
}
