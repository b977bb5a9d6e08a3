use crate::models::{PackageJob, TargetVersion};
use std::fmt;

/// States of a job's pipeline.
///
/// A job walks the states in declaration order, skipping the optional ones
/// its [`StagePlan`] leaves out, and ends in exactly one of the two terminal
/// states. `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineState {
    Extracting,
    Validating,
    DetectingEngine,
    Cleaning,
    Branding,
    Licensing,
    ValidatingManifests,
    SwitchingManifest,
    EditingSettings,
    PatchingScripts,
    Repackaging,
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Successor after a normal completion, `None` from a terminal state
    pub fn next(self, plan: &StagePlan) -> Option<Self> {
        let next = match self {
            Self::Extracting => Self::Validating,
            Self::Validating => Self::DetectingEngine,
            Self::DetectingEngine => Self::Cleaning,
            Self::Cleaning => Self::Branding,
            Self::Branding => Self::Licensing,
            Self::Licensing => Self::ValidatingManifests,
            Self::ValidatingManifests => Self::SwitchingManifest,
            Self::SwitchingManifest => Self::EditingSettings,
            Self::EditingSettings => Self::PatchingScripts,
            Self::PatchingScripts => Self::Repackaging,
            Self::Repackaging => Self::Done,
            Self::Done | Self::Failed => return None,
        };
        if plan.includes(next) {
            Some(next)
        } else {
            next.next(plan)
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extracting => "extracting",
            Self::Validating => "validating",
            Self::DetectingEngine => "detecting-engine",
            Self::Cleaning => "cleaning",
            Self::Branding => "branding",
            Self::Licensing => "licensing",
            Self::ValidatingManifests => "validating-manifests",
            Self::SwitchingManifest => "switching-manifest",
            Self::EditingSettings => "editing-settings",
            Self::PatchingScripts => "patching-scripts",
            Self::Repackaging => "repackaging",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Which optional states a job passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePlan {
    pub branding: bool,
    pub licensing: bool,
    pub patching_scripts: bool,
}

impl StagePlan {
    pub fn for_job(job: &PackageJob) -> Self {
        Self {
            branding: job.logo.is_some(),
            licensing: job.license_key.is_some(),
            patching_scripts: job.target_version == TargetVersion::Scorm2004,
        }
    }

    pub fn includes(&self, state: PipelineState) -> bool {
        match state {
            PipelineState::Branding => self.branding,
            PipelineState::Licensing => self.licensing,
            PipelineState::PatchingScripts => self.patching_scripts,
            _ => true,
        }
    }

    /// Full happy path from `Extracting` to `Done`
    pub fn states(&self) -> Vec<PipelineState> {
        let mut states = vec![PipelineState::Extracting];
        let mut current = PipelineState::Extracting;
        while let Some(next) = current.next(self) {
            states.push(next);
            current = next;
        }
        states
    }
}
